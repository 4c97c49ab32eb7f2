use super::model::{Report, ReportId, ReportSummary, StatusUpdate};
use super::store::{page, sort_newest_first, ReportStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Process-local report store
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: RwLock<HashMap<ReportId, Report>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a record, standing in for an external actor deleting it
    pub async fn remove(&self, id: &ReportId) -> Option<Report> {
        self.reports.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reports.read().await.is_empty()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn create(&self, report: Report) -> Result<(), StoreError> {
        let mut reports = self.reports.write().await;
        if reports.contains_key(&report.report_id) {
            return Err(StoreError::AlreadyExists(report.report_id));
        }
        debug!(report_id = %report.report_id, "Stored new report");
        reports.insert(report.report_id, report);
        Ok(())
    }

    async fn get(&self, id: &ReportId) -> Result<Option<Report>, StoreError> {
        Ok(self.reports.read().await.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &ReportId,
        update: StatusUpdate,
    ) -> Result<Report, StoreError> {
        let mut reports = self.reports.write().await;
        let report = reports.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        report
            .apply(update, Utc::now())
            .map_err(|(from, to)| StoreError::InvalidTransition { id: *id, from, to })?;
        Ok(report.clone())
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<ReportSummary>, StoreError> {
        let mut summaries: Vec<ReportSummary> =
            self.reports.read().await.values().map(Report::summary).collect();
        sort_newest_first(&mut summaries);
        Ok(page(summaries, skip, limit))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::model::{ReportResult, ReportStatus};
    use chrono::Duration;

    fn pending(url: &str) -> Report {
        Report::pending(ReportId::new(), url, None, vec![])
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryReportStore::new();
        let report = pending("https://github.com/a/b");
        let id = report.report_id;
        store.create(report.clone()).await.unwrap();

        assert_eq!(store.get(&id).await.unwrap(), Some(report));
        assert!(store.get(&ReportId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_rejected() {
        let store = MemoryReportStore::new();
        let report = pending("https://github.com/a/b");
        store.create(report.clone()).await.unwrap();
        let err = store.create(report).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at() {
        let store = MemoryReportStore::new();
        let report = pending("https://github.com/a/b");
        let id = report.report_id;
        let created = report.updated_at;
        store.create(report).await.unwrap();

        let updated = store
            .update_status(&id, StatusUpdate::processing())
            .await
            .unwrap();
        assert_eq!(updated.status, ReportStatus::Processing);
        assert!(updated.updated_at >= created);
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let store = MemoryReportStore::new();
        let err = store
            .update_status(&ReportId::new(), StatusUpdate::processing())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_rejects_backward_transition() {
        let store = MemoryReportStore::new();
        let report = pending("https://github.com/a/b");
        let id = report.report_id;
        store.create(report).await.unwrap();
        store
            .update_status(&id, StatusUpdate::processing())
            .await
            .unwrap();
        store
            .update_status(
                &id,
                StatusUpdate::completed(ReportResult::Raw("x".into()), Some("not json".into())),
            )
            .await
            .unwrap();

        let err = store
            .update_status(&id, StatusUpdate::failed("late"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Completed);
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_and_pages() {
        let store = MemoryReportStore::new();
        let base = Utc::now();
        for i in 0..5 {
            let mut report = pending(&format!("https://github.com/a/{}", i));
            report.created_at = base + Duration::seconds(i);
            store.create(report).await.unwrap();
        }

        let all = store.list(0, 100).await.unwrap();
        let urls: Vec<&str> = all.iter().map(|s| s.source_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://github.com/a/4",
                "https://github.com/a/3",
                "https://github.com/a/2",
                "https://github.com/a/1",
                "https://github.com/a/0",
            ]
        );

        let second_page = store.list(2, 2).await.unwrap();
        assert_eq!(second_page.len(), 2);
        assert_eq!(second_page[0].source_url, "https://github.com/a/2");
        assert!(store.list(10, 5).await.unwrap().is_empty());
    }
}
