use crate::report::Report;
use async_trait::async_trait;
use common::{Error, Result};
use dashmap::DashMap;
use tracing::debug;

pub const REPORT_NOT_FOUND: &str = "Report not found.";

/// Hand-off point between a finished run and whoever renders it.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Stores the report under its own id and returns that id.
    async fn store(&self, report: Report) -> Result<String>;
    /// Removes and returns the report. A second fetch of the same id fails.
    async fn fetch(&self, id: &str) -> Result<Report>;
}

#[derive(Default)]
pub struct InMemoryReportStore {
    reports: DashMap<String, Report>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn store(&self, report: Report) -> Result<String> {
        let id = report.id().to_string();
        debug!(report_id = %id, "Storing report");
        self.reports.insert(id.clone(), report);
        Ok(id)
    }

    async fn fetch(&self, id: &str) -> Result<Report> {
        self.reports
            .remove(id)
            .map(|(_, report)| report)
            .ok_or_else(|| Error::NotFound(REPORT_NOT_FOUND.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportAggregator;
    use serde_json::json;

    fn report() -> Report {
        ReportAggregator::from_payload(json!([{
            "entityLabel": "Account (Account)",
            "fieldLabel": "Name",
            "status": "Success",
            "nonNullCount": 1,
            "totalCount": 1,
            "nonNullPercentage": 1.0
        }]))
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_consumes_report() {
        let store = InMemoryReportStore::new();
        let report = report();
        let id = store.store(report.clone()).await.unwrap();
        assert_eq!(id, report.id());

        assert_eq!(store.fetch(&id).await.unwrap(), report);
        assert!(matches!(store.fetch(&id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = InMemoryReportStore::new();
        let err = store.fetch("report-0-abcdef").await.unwrap_err();
        assert_eq!(err.to_string(), format!("Not found: {}", REPORT_NOT_FOUND));
    }
}
