use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Field types that cannot appear in a `WHERE field != null` filter.
const NON_FILTERABLE_TYPES: [&str; 2] = ["textarea", "address"];

/// A queryable entity (sObject) of the org.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub name: String,
    pub label: String,
}

impl EntityInfo {
    pub fn new(name: &str, label: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            label: label.filter(|l| !l.is_empty()).unwrap_or(name).to_string(),
        }
    }

    /// `Label (Name)`, the form used in pickers and report tables.
    pub fn display_key(&self) -> String {
        format!("{} ({})", self.label, self.name)
    }

    fn contains_term(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(term) || self.label.to_lowercase().contains(term)
    }

    fn equals_term(&self, term: &str) -> bool {
        self.name.to_lowercase() == term || self.label.to_lowercase() == term
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
}

impl FieldMetadata {
    pub fn new(name: &str, label: Option<&str>, field_type: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            label: label.filter(|l| !l.is_empty()).unwrap_or(name).to_string(),
            field_type: field_type.map(str::to_string),
        }
    }

    /// Whether the field may be used as a non-null filter criterion. Fields
    /// without a declared type are given the benefit of the doubt.
    pub fn is_filterable(&self) -> bool {
        match &self.field_type {
            Some(t) => !NON_FILTERABLE_TYPES.contains(&t.to_lowercase().as_str()),
            None => true,
        }
    }
}

fn compare_labels(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

pub fn sort_entities(entities: &mut [EntityInfo]) {
    entities.sort_by(|a, b| compare_labels(&a.label, &b.label));
}

pub fn sort_fields(fields: &mut [FieldMetadata]) {
    fields.sort_by(|a, b| compare_labels(&a.label, &b.label));
}

/// Case-insensitive substring filter on name or label. A blank term keeps
/// everything.
pub fn filter_entities<'a>(entities: &'a [EntityInfo], term: &str) -> Vec<&'a EntityInfo> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return entities.iter().collect();
    }
    entities.iter().filter(|e| e.contains_term(&term)).collect()
}

/// Exact (case-insensitive) name or label match, used when processing is
/// requested with filter text but no explicit selection.
pub fn find_entity<'a>(entities: &'a [EntityInfo], term: &str) -> Option<&'a EntityInfo> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return None;
    }
    entities.iter().find(|e| e.equals_term(&term))
}
