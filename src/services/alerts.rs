//! Periodic alert check against the latest ticker snapshots.
//!
//! Matching stamps `last_triggered` on the rule. Delivery of notifications is
//! outside this service.

use std::sync::Arc;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::store::types::{AlertCondition, TickerSummary};
use crate::store::DocumentStore;

pub fn condition_matches(
    condition: AlertCondition,
    threshold: f64,
    summary: &TickerSummary,
) -> bool {
    match condition {
        AlertCondition::PriceAbove => summary.last_price.map(|p| p > threshold).unwrap_or(false),
        AlertCondition::PriceBelow => summary.last_price.map(|p| p < threshold).unwrap_or(false),
        AlertCondition::PercentChangeAbove => summary
            .percent_change
            .map(|c| c > threshold)
            .unwrap_or(false),
        AlertCondition::PercentChangeBelow => summary
            .percent_change
            .map(|c| c < threshold)
            .unwrap_or(false),
    }
}

#[derive(Clone)]
pub struct AlertMonitor {
    store: Arc<dyn DocumentStore>,
}

impl AlertMonitor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Evaluate all active alerts once. Returns the number triggered.
    pub async fn check_once(&self) -> usize {
        let alerts = match self.store.list_alerts(None).await {
            Ok(alerts) => alerts,
            Err(e) => {
                error!("🔔 [ALERTS] Could not list alerts: {}", e);
                return 0;
            }
        };

        let mut triggered = 0;

        for alert in alerts.into_iter().filter(|a| a.active) {
            let summary = match self.store.get_ticker_summary(&alert.ticker).await {
                Ok(Some(summary)) => summary,
                Ok(None) => continue,
                Err(e) => {
                    warn!("🔔 [ALERTS] Snapshot lookup failed for {}: {}", alert.ticker, e);
                    continue;
                }
            };

            if condition_matches(alert.condition, alert.threshold, &summary) {
                info!(
                    "🔔 [ALERTS] Triggered {:?} {} for {} (client: {})",
                    alert.condition, alert.threshold, alert.ticker, alert.client_id
                );
                let mut stamped = alert.clone();
                stamped.last_triggered = Some(Utc::now().to_rfc3339());
                if let Err(e) = self.store.update_alert(stamped).await {
                    warn!("🔔 [ALERTS] Could not stamp alert {}: {}", alert.id, e);
                }
                triggered += 1;
            }
        }

        triggered
    }

    pub async fn start(&self, cron_expression: &str) -> Result<(), Box<dyn std::error::Error>> {
        let scheduler = JobScheduler::new().await?;
        let monitor = self.clone();

        let job = Job::new_async(cron_expression, move |_uuid, _l| {
            let monitor = monitor.clone();
            Box::pin(async move {
                let n = monitor.check_once().await;
                if n > 0 {
                    info!("🔔 [ALERTS] {} alert(s) triggered this pass", n);
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("🔔 [ALERTS] Alert monitor scheduled: {}", cron_expression);

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            }
        });

        Ok(())
    }
}
