use crate::models::{DistributionResult, ResultEntry};
use crate::report::ReportResults;
use common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Sortable table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Entity,
    Field,
    TotalCount,
    NonNullCount,
    NonNullPercentage,
    Status,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Entity => "entity",
            SortKey::Field => "field",
            SortKey::TotalCount => "totalCount",
            SortKey::NonNullCount => "nonNullCount",
            SortKey::NonNullPercentage => "nonNullPercentage",
            SortKey::Status => "status",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "entity" | "sobject" | "object" => Ok(SortKey::Entity),
            "field" => Ok(SortKey::Field),
            "totalcount" | "sobjectcount" | "recordcount" | "total" => Ok(SortKey::TotalCount),
            "nonnullcount" | "nonnull" => Ok(SortKey::NonNullCount),
            "nonnullpercentage" | "percentage" | "fillrate" => Ok(SortKey::NonNullPercentage),
            "status" => Ok(SortKey::Status),
            _ => Err(Error::InvalidInput(format!("unknown sort key `{}`", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(Error::InvalidInput(format!("unknown sort direction `{}`", s))),
        }
    }
}

/// Active column and direction of a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    pub key: Option<SortKey>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self {
            key: Some(key),
            direction,
        }
    }

    /// Header click: the active key flips direction, a new key starts ascending.
    pub fn select(&mut self, key: SortKey) {
        if self.key == Some(key) {
            self.direction = self.direction.flipped();
        } else {
            self.key = Some(key);
            self.direction = SortDirection::Asc;
        }
    }

    /// Sorted copy of `results`; unchanged order when no key is active.
    pub fn apply(&self, results: &ReportResults) -> ReportResults {
        let Some(key) = self.key else {
            return results.clone();
        };
        match results {
            ReportResults::Summary(entries) => {
                ReportResults::Summary(sort_results(entries, key, self.direction))
            }
            ReportResults::Distribution(items) => {
                ReportResults::Distribution(sort_results(items, key, self.direction))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Number(f64),
    Text(String),
}

impl SortValue {
    fn text(value: &str) -> Option<Self> {
        Some(SortValue::Text(value.to_lowercase()))
    }

    fn number(value: Option<f64>) -> Option<Self> {
        value.filter(|n| !n.is_nan()).map(SortValue::Number)
    }

    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            (a, b) => a.as_text().cmp(&b.as_text()),
        }
    }

    fn as_text(&self) -> String {
        match self {
            SortValue::Number(n) => n.to_string(),
            SortValue::Text(t) => t.clone(),
        }
    }
}

/// Anything that can appear as a row of a sortable report table.
pub trait Sortable {
    /// `None` means the row has no value for that column.
    fn sort_value(&self, key: SortKey) -> Option<SortValue>;
}

impl Sortable for ResultEntry {
    fn sort_value(&self, key: SortKey) -> Option<SortValue> {
        match key {
            SortKey::Entity => SortValue::text(&self.entity_label),
            SortKey::Field => SortValue::text(&self.field_label),
            SortKey::TotalCount => SortValue::number(self.total_count.map(|c| c as f64)),
            SortKey::NonNullCount => SortValue::number(self.non_null_count.map(|c| c as f64)),
            SortKey::NonNullPercentage => SortValue::number(self.non_null_percentage),
            SortKey::Status => SortValue::text(&self.status.to_string()),
        }
    }
}

impl Sortable for DistributionResult {
    fn sort_value(&self, key: SortKey) -> Option<SortValue> {
        match key {
            SortKey::Entity => SortValue::text(&self.entity_label),
            SortKey::Field => SortValue::text(&self.field_label),
            SortKey::TotalCount => SortValue::number(self.record_count.map(|c| c as f64)),
            SortKey::NonNullCount | SortKey::NonNullPercentage => None,
            SortKey::Status => SortValue::text(&self.status.to_string()),
        }
    }
}

/// Orders two optional values. Missing values trail in both directions.
pub fn compare_values(a: Option<&SortValue>, b: Option<&SortValue>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match direction {
            SortDirection::Asc => a.compare(b),
            SortDirection::Desc => b.compare(a),
        },
    }
}

/// Stable sort of a copy of `rows`.
pub fn sort_results<T>(rows: &[T], key: SortKey, direction: SortDirection) -> Vec<T>
where
    T: Sortable + Clone,
{
    let mut keyed: Vec<(Option<SortValue>, &T)> =
        rows.iter().map(|row| (row.sort_value(key), row)).collect();
    keyed.sort_by(|(a, _), (b, _)| compare_values(a.as_ref(), b.as_ref(), direction));
    keyed.into_iter().map(|(_, row)| row.clone()).collect()
}
