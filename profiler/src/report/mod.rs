pub mod aggregator;

pub use aggregator::ReportAggregator;

use crate::models::{DistributionResult, ResultEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    Summary,
    Distribution,
}

/// Results of a report, homogeneous in shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "results", rename_all = "lowercase")]
pub enum ReportResults {
    Summary(Vec<ResultEntry>),
    Distribution(Vec<DistributionResult>),
}

impl ReportResults {
    pub fn mode(&self) -> ReportMode {
        match self {
            ReportResults::Summary(_) => ReportMode::Summary,
            ReportResults::Distribution(_) => ReportMode::Distribution,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReportResults::Summary(entries) => entries.len(),
            ReportResults::Distribution(results) => results.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A finished report. Built only through [`ReportAggregator`], never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    report_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    results: ReportResults,
}

impl Report {
    pub(crate) fn new(generated_at: DateTime<Utc>, results: ReportResults) -> Self {
        Self {
            report_id: generate_report_id(generated_at),
            generated_at,
            results,
        }
    }

    pub fn id(&self) -> &str {
        &self.report_id
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn mode(&self) -> ReportMode {
        self.results.mode()
    }

    pub fn results(&self) -> &ReportResults {
        &self.results
    }

    /// "Generated on ..." line shown above the table.
    pub fn generated_line(&self) -> String {
        format!(
            "Generated on {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// `report-{millis}-{6 random chars}`.
pub fn generate_report_id(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("report-{}-{}", at.timestamp_millis(), &suffix[..6])
}
