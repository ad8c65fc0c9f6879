use crate::models::{EntityInfo, FieldRef, SelectionSet};
use crate::render::{SortDirection, SortKey, SortState};
use common::{Error, Result};
use serde::{Deserialize, Serialize};

// Request models
#[derive(Debug, Default, Deserialize)]
pub struct EntityQuery {
    pub filter: Option<String>,
}

/// Body of `POST /api/reports`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    #[serde(default)]
    pub entities: Vec<String>,
    /// `Entity:Field` keys.
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

impl ProfileRequest {
    pub fn selection(&self) -> Result<SelectionSet> {
        let mut selection = SelectionSet::new();
        for entity in self.entities.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
            selection.add_entity(entity);
        }
        for key in &self.fields {
            let field_ref = FieldRef::parse(key)
                .ok_or_else(|| Error::InvalidInput(format!("invalid field key `{}`", key)))?;
            selection.add_field(&field_ref);
        }
        Ok(selection)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl ReportQuery {
    pub fn sort_state(&self) -> Result<SortState> {
        let direction = self
            .direction
            .as_deref()
            .map(str::parse::<SortDirection>)
            .transpose()?
            .unwrap_or_default();
        Ok(match self.sort.as_deref().filter(|s| !s.is_empty()) {
            Some(key) => SortState::new(key.parse::<SortKey>()?, direction),
            None => SortState::default(),
        })
    }
}

// Response models
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub name: String,
    pub label: String,
    pub display: String,
}

impl From<EntityInfo> for EntitySummary {
    fn from(entity: EntityInfo) -> Self {
        Self {
            display: entity.display_key(),
            name: entity.name,
            label: entity.label,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCreated {
    pub report_id: String,
}
