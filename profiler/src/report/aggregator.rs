use super::{Report, ReportResults};
use crate::models::{DistributionResult, ResultEntry};
use crate::processor::RunOutcome;
use chrono::{DateTime, TimeZone, Utc};
use common::{Error, Result};
use serde_json::Value;
use tracing::debug;

/// Builds canonical reports. The mode is fixed here, once.
pub struct ReportAggregator;

impl ReportAggregator {
    pub fn summary(entries: Vec<ResultEntry>) -> Result<Report> {
        Self::build(Utc::now(), ReportResults::Summary(entries))
    }

    pub fn distribution(results: Vec<DistributionResult>) -> Result<Report> {
        Self::build(Utc::now(), ReportResults::Distribution(results))
    }

    pub fn from_outcome(outcome: RunOutcome) -> Result<Report> {
        Self::summary(outcome.entries)
    }

    /// Accepts `{generatedAt?, results: [...]}` or a bare result array. The
    /// payload is a distribution report when its entries carry a `rows`
    /// sequence; a payload where only some entries do is rejected.
    pub fn from_payload(payload: Value) -> Result<Report> {
        let (generated_at, items) = match payload {
            Value::Array(items) => (None, items),
            Value::Object(mut map) => {
                let generated_at = map.get("generatedAt").and_then(parse_timestamp);
                match map.remove("results") {
                    Some(Value::Array(items)) => (generated_at, items),
                    Some(_) => {
                        return Err(Error::InvalidInput("`results` must be an array".to_string()));
                    }
                    None => (generated_at, Vec::new()),
                }
            }
            _ => {
                return Err(Error::InvalidInput(
                    "report payload must be an object or an array".to_string(),
                ));
            }
        };

        let with_rows = items.iter().filter(|item| has_rows(item)).count();
        let results = if with_rows == 0 {
            let entries = items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<std::result::Result<Vec<ResultEntry>, _>>()?;
            ReportResults::Summary(entries)
        } else if with_rows == items.len() {
            let results = items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<std::result::Result<Vec<DistributionResult>, _>>()?;
            ReportResults::Distribution(results)
        } else {
            return Err(Error::MixedReportModes);
        };

        Self::build(generated_at.unwrap_or_else(Utc::now), results)
    }

    fn build(generated_at: DateTime<Utc>, results: ReportResults) -> Result<Report> {
        if results.is_empty() {
            return Err(Error::EmptyReport("no results were produced".to_string()));
        }
        let report = Report::new(generated_at, results);
        debug!(
            report_id = report.id(),
            mode = ?report.mode(),
            results = report.results().len(),
            "Aggregated report"
        );
        Ok(report)
    }
}

fn has_rows(item: &Value) -> bool {
    item.get("rows").is_some_and(Value::is_array)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(millis) = value.as_i64() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
