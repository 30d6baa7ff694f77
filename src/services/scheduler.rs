//! Daily sweep: one watchlist briefing per stored client.
//!
//! Runs from a cron schedule in server mode, or once via the `daily` CLI
//! mode. Per-client failures are logged and never stop the sweep.

use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::llm::Priority;
use crate::store::DocumentStore;

use super::pipeline::ReportPipeline;

#[derive(Clone)]
pub struct DailySweep {
    pipeline: Arc<ReportPipeline>,
    store: Arc<dyn DocumentStore>,
}

impl DailySweep {
    pub fn new(pipeline: Arc<ReportPipeline>, store: Arc<dyn DocumentStore>) -> Self {
        Self { pipeline, store }
    }

    /// Generate a watchlist briefing for every client that has one.
    /// Returns the number of reports generated.
    pub async fn run_once(&self) -> usize {
        let clients = match self.store.list_clients().await {
            Ok(clients) => clients,
            Err(e) => {
                error!("📅 [SWEEP] Could not list clients, skipping sweep: {}", e);
                return 0;
            }
        };

        info!("📅 [SWEEP] Starting daily sweep over {} clients", clients.len());
        let mut generated = 0;

        for client in clients {
            if client.watchlist.is_empty() {
                continue;
            }

            match self
                .pipeline
                .generate_watchlist(
                    &client.client_id,
                    client.watchlist.clone(),
                    None,
                    Priority::Normal,
                )
                .await
            {
                Ok(report) => {
                    info!(
                        "📅 [SWEEP] Generated {} / {} (audio: {:?})",
                        report.client_id, report.trading_date, report.audio_gcs_path
                    );
                    generated += 1;
                }
                Err(e) => {
                    warn!("📅 [SWEEP] Generation failed for {}: {}", client.client_id, e);
                }
            }
        }

        info!("📅 [SWEEP] Daily sweep finished ({} reports)", generated);
        generated
    }

    pub async fn start(&self, cron_expression: &str) -> Result<(), Box<dyn std::error::Error>> {
        let scheduler = JobScheduler::new().await?;
        let sweep = self.clone();

        let job = Job::new_async(cron_expression, move |_uuid, _l| {
            let sweep = sweep.clone();
            Box::pin(async move {
                sweep.run_once().await;
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("📅 [SWEEP] Daily sweep scheduled: {}", cron_expression);

        // Keep scheduler alive in background
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            }
        });

        Ok(())
    }
}
