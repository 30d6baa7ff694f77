//! Unit tests for the in-memory store backend - report keys, pagination, alerts.

#[cfg(test)]
mod memory_tests {
    use crate::store::memory::{MemoryObjectStore, MemoryStore};
    use crate::store::types::*;
    use crate::store::{DocumentStore, ObjectStore, DEFAULT_PAGE_SIZE};

    fn record(client: &str, date: &str) -> ReportRecord {
        ReportRecord {
            client_id: client.to_string(),
            trading_date: date.to_string(),
            tickers: vec!["SMCI".to_string()],
            summary_text: format!("summary for {}", date),
            key_insights: vec!["insight".to_string()],
            email_status: EmailStatus::Pending,
            audio_gcs_path: None,
            market_context: None,
            raw_payload: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn upsert_defaults_created_at_and_email_status() {
        let store = MemoryStore::new();
        let stored = store.upsert_report(record("acme", "2025-12-04")).await.unwrap();

        assert!(stored.created_at.is_some());
        assert_eq!(stored.email_status, EmailStatus::Pending);
    }

    #[tokio::test]
    async fn upsert_preserves_explicit_created_at() {
        let store = MemoryStore::new();
        let mut r = record("acme", "2025-12-04");
        r.created_at = Some("2025-12-04T21:00:00Z".to_string());

        let stored = store.upsert_report(r).await.unwrap();
        assert_eq!(stored.created_at.as_deref(), Some("2025-12-04T21:00:00Z"));
    }

    #[tokio::test]
    async fn second_upsert_overwrites_same_key() {
        let store = MemoryStore::new();
        store.upsert_report(record("acme", "2025-12-04")).await.unwrap();

        let mut second = record("acme", "2025-12-04");
        second.summary_text = "revised".to_string();
        store.upsert_report(second).await.unwrap();

        let fetched = store.get_report("acme", "2025-12-04").await.unwrap().unwrap();
        assert_eq!(fetched.summary_text, "revised");
        assert_eq!(fetched.trading_date, "2025-12-04");

        // Still exactly one document for the key
        let page = store.list_reports(ReportQuery::default()).await.unwrap();
        assert_eq!(page.reports.len(), 1);
    }

    #[tokio::test]
    async fn same_date_different_clients_do_not_collide() {
        let store = MemoryStore::new();
        store.upsert_report(record("acme", "2025-12-04")).await.unwrap();
        store.upsert_report(record("globex", "2025-12-04")).await.unwrap();

        assert!(store.get_report("acme", "2025-12-04").await.unwrap().is_some());
        assert!(store.get_report("globex", "2025-12-04").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn set_audio_path_on_missing_report_errors() {
        let store = MemoryStore::new();
        let result = store
            .set_audio_path("acme", "2025-12-04", "gs://b/reports/acme/2025-12-04/report.wav")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn list_orders_by_trading_date_descending() {
        let store = MemoryStore::new();
        for date in ["2025-12-01", "2025-12-03", "2025-12-02"] {
            store.upsert_report(record("acme", date)).await.unwrap();
        }

        let page = store.list_reports(ReportQuery::default()).await.unwrap();
        let dates: Vec<&str> = page.reports.iter().map(|r| r.trading_date.as_str()).collect();
        assert_eq!(dates, vec!["2025-12-03", "2025-12-02", "2025-12-01"]);
        assert!(!page.has_more);
        assert_eq!(page.last_date.as_deref(), Some("2025-12-01"));
    }

    #[tokio::test]
    async fn list_filters_by_client() {
        let store = MemoryStore::new();
        store.upsert_report(record("acme", "2025-12-01")).await.unwrap();
        store.upsert_report(record("globex", "2025-12-02")).await.unwrap();

        let page = store
            .list_reports(ReportQuery {
                client_id: Some("acme".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.reports.len(), 1);
        assert_eq!(page.reports[0].client_id, "acme");
    }

    #[tokio::test]
    async fn pagination_cursor_walks_the_full_set() {
        let store = MemoryStore::new();
        for day in 1..=5 {
            store
                .upsert_report(record("acme", &format!("2025-12-{:02}", day)))
                .await
                .unwrap();
        }

        let first = store
            .list_reports(ReportQuery { limit: 2, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(first.reports.len(), 2);
        assert!(first.has_more);
        assert_eq!(first.last_date.as_deref(), Some("2025-12-04"));

        let second = store
            .list_reports(ReportQuery {
                limit: 2,
                start_after: first.last_date.clone(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second.reports.len(), 2);
        assert!(second.has_more);

        let third = store
            .list_reports(ReportQuery {
                limit: 2,
                start_after: second.last_date.clone(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(third.reports.len(), 1);
        assert!(!third.has_more);
    }

    #[tokio::test]
    async fn zero_limit_uses_default_page_size() {
        let store = MemoryStore::new();
        for day in 1..=25 {
            store
                .upsert_report(record("acme", &format!("2025-11-{:02}", day)))
                .await
                .unwrap();
        }

        let page = store.list_reports(ReportQuery::default()).await.unwrap();
        assert_eq!(page.reports.len(), DEFAULT_PAGE_SIZE);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn client_profile_lifecycle() {
        let store = MemoryStore::new();
        assert!(store.get_client("acme").await.unwrap().is_none());

        let mut profile = ClientProfile::new("acme");
        profile.watchlist = vec!["SMCI".to_string(), "NVDA".to_string()];
        store.upsert_client(profile).await.unwrap();

        let fetched = store.get_client("acme").await.unwrap().unwrap();
        assert_eq!(fetched.watchlist.len(), 2);
        assert!(fetched.updated_at.is_some());
        assert_eq!(store.list_clients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn alert_lifecycle() {
        let store = MemoryStore::new();
        let alert = AlertRule {
            id: "a1".to_string(),
            client_id: "acme".to_string(),
            ticker: "SMCI".to_string(),
            condition: AlertCondition::PriceAbove,
            threshold: 50.0,
            notify_email: "ops@acme.test".to_string(),
            last_triggered: None,
            active: true,
        };

        store.insert_alert(alert.clone()).await.unwrap();
        assert_eq!(store.list_alerts(Some("acme")).await.unwrap().len(), 1);
        assert!(store.list_alerts(Some("globex")).await.unwrap().is_empty());

        let mut triggered = alert.clone();
        triggered.last_triggered = Some("2025-12-04T15:00:00Z".to_string());
        store.update_alert(triggered).await.unwrap();
        let listed = store.list_alerts(None).await.unwrap();
        assert!(listed[0].last_triggered.is_some());

        store.delete_alert("a1").await.unwrap();
        assert!(store.list_alerts(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ticker_summary_upsert_and_get() {
        let store = MemoryStore::new();
        let summary = TickerSummary {
            ticker: "SMCI".to_string(),
            last_price: Some(42.5),
            percent_change: Some(3.1),
            last_trading_date: "2025-12-04".to_string(),
            mention_count: 1,
            updated_at: "2025-12-04T22:00:00Z".to_string(),
        };

        store.upsert_ticker_summary(summary).await.unwrap();
        let fetched = store.get_ticker_summary("SMCI").await.unwrap().unwrap();
        assert_eq!(fetched.last_price, Some(42.5));
        assert!(store.get_ticker_summary("NVDA").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn object_store_returns_gs_uri() {
        let objects = MemoryObjectStore::new("briefs".to_string());
        let uri = objects
            .put("reports/acme/2025-12-04/report.wav", vec![1, 2, 3], "audio/wav")
            .await
            .unwrap();

        assert_eq!(uri, "gs://briefs/reports/acme/2025-12-04/report.wav");
        assert_eq!(objects.object_count(), 1);
        assert_eq!(objects.get("reports/acme/2025-12-04/report.wav").unwrap(), vec![1, 2, 3]);
    }
}
