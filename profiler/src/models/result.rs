use super::field::FieldMetadata;
use super::selection::FieldRef;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SKIP_METADATA_UNAVAILABLE: &str = "field metadata unavailable.";
pub const SKIP_NOT_FILTERABLE: &str = "textarea/address fields cannot be used as filter criteria.";

/// Outcome of a single field, rendered in the status column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EntryStatus {
    Success,
    Skipped(String),
    Error(String),
    /// Status text supplied by an external payload that fits no other shape.
    Other(String),
}

impl EntryStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, EntryStatus::Success)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Success => write!(f, "Success"),
            EntryStatus::Skipped(reason) => write!(f, "Skipped: {}", reason),
            EntryStatus::Error(message) => write!(f, "Error: {}", message),
            EntryStatus::Other(text) => write!(f, "{}", text),
        }
    }
}

impl From<EntryStatus> for String {
    fn from(status: EntryStatus) -> Self {
        status.to_string()
    }
}

impl From<String> for EntryStatus {
    fn from(text: String) -> Self {
        if text == "Success" {
            EntryStatus::Success
        } else if let Some(reason) = text.strip_prefix("Skipped: ") {
            EntryStatus::Skipped(reason.to_string())
        } else if let Some(message) = text.strip_prefix("Error: ") {
            EntryStatus::Error(message.to_string())
        } else {
            EntryStatus::Other(text)
        }
    }
}

/// Per-run working record for one selection.
#[derive(Debug, Clone)]
pub struct BatchDetail {
    pub entity: String,
    pub field: String,
    pub key: String,
    pub entity_label: String,
    pub field_label: String,
    pub metadata: Option<FieldMetadata>,
}

impl BatchDetail {
    pub fn new(field_ref: &FieldRef, entity_label: &str, metadata: Option<FieldMetadata>) -> Self {
        let field_label = metadata
            .as_ref()
            .map(|m| m.label.clone())
            .unwrap_or_else(|| field_ref.field.clone());
        Self {
            entity: field_ref.entity.clone(),
            field: field_ref.field.clone(),
            key: field_ref.key(),
            entity_label: entity_label.to_string(),
            field_label,
            metadata,
        }
    }

    /// Why this detail never reaches the network, if it doesn't.
    pub fn skip_reason(&self) -> Option<&'static str> {
        match &self.metadata {
            None => Some(SKIP_METADATA_UNAVAILABLE),
            Some(meta) if !meta.is_filterable() => Some(SKIP_NOT_FILTERABLE),
            Some(_) => None,
        }
    }
}

/// Cardinality numbers read from a query plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryPlan {
    pub non_null_count: u64,
    pub total_count: u64,
    pub non_null_percentage: f64,
}

impl QueryPlan {
    pub fn new(non_null_count: u64, total_count: u64) -> Self {
        let non_null_percentage = if total_count == 0 {
            0.0
        } else {
            non_null_count as f64 / total_count as f64
        };
        Self {
            non_null_count,
            total_count,
            non_null_percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlanOutcome {
    Plan(QueryPlan),
    Error(String),
}

/// One row of a summary report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    #[serde(default, alias = "sobject")]
    pub entity: String,
    #[serde(alias = "sobjectLabel")]
    pub entity_label: String,
    #[serde(default)]
    pub field: String,
    pub field_label: String,
    pub non_null_count: Option<u64>,
    #[serde(alias = "sobjectCount")]
    pub total_count: Option<u64>,
    pub non_null_percentage: Option<f64>,
    pub status: EntryStatus,
}

impl ResultEntry {
    fn blank(detail: &BatchDetail, status: EntryStatus) -> Self {
        Self {
            entity: detail.entity.clone(),
            entity_label: detail.entity_label.clone(),
            field: detail.field.clone(),
            field_label: detail.field_label.clone(),
            non_null_count: None,
            total_count: None,
            non_null_percentage: None,
            status,
        }
    }

    pub fn skipped(detail: &BatchDetail, reason: &str) -> Self {
        Self::blank(detail, EntryStatus::Skipped(reason.to_string()))
    }

    pub fn failed(detail: &BatchDetail, message: &str) -> Self {
        Self::blank(detail, EntryStatus::Error(message.to_string()))
    }

    pub fn from_plan(detail: &BatchDetail, plan: QueryPlan) -> Self {
        Self {
            non_null_count: Some(plan.non_null_count),
            total_count: Some(plan.total_count),
            non_null_percentage: Some(plan.non_null_percentage),
            ..Self::blank(detail, EntryStatus::Success)
        }
    }

    pub fn from_outcome(detail: &BatchDetail, outcome: QueryPlanOutcome) -> Self {
        match outcome {
            QueryPlanOutcome::Plan(plan) => Self::from_plan(detail, plan),
            QueryPlanOutcome::Error(message) => Self::failed(detail, &message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRow {
    #[serde(default)]
    pub value: Option<String>,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub value: Option<String>,
    pub count: u64,
    pub percentage: f64,
}

/// Per-value breakdown of one field, optionally with a monthly timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionResult {
    #[serde(alias = "sobjectLabel")]
    pub entity_label: String,
    pub field_label: String,
    #[serde(default)]
    pub record_count: Option<u64>,
    pub status: EntryStatus,
    pub rows: Vec<DistributionRow>,
    #[serde(default)]
    pub timeline: Option<Vec<TimelinePoint>>,
}

/// Display text for a distribution bucket; null values get their own bucket.
pub fn bucket_label(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "(blank)",
    }
}
