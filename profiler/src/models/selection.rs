use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A chosen (entity, field) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub entity: String,
    pub field: String,
}

impl FieldRef {
    pub fn new(entity: &str, field: &str) -> Self {
        Self {
            entity: entity.to_string(),
            field: field.to_string(),
        }
    }

    /// Identity key, `entity:field`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.entity, self.field)
    }

    /// Parses an `entity:field` key. Both halves must be non-empty.
    pub fn parse(key: &str) -> Option<Self> {
        let (entity, field) = key.split_once(':')?;
        if entity.is_empty() || field.is_empty() || field.contains(':') {
            return None;
        }
        Some(Self::new(entity, field))
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.field)
    }
}

/// Entities and fields picked for profiling, in selection order.
///
/// An entity with no explicit fields stands for "all of its fields" when the
/// selection is expanded for a run.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    entities: Vec<String>,
    fields: HashMap<String, Vec<String>>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn fields_for(&self, entity: &str) -> &[String] {
        self.fields.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_entity(&mut self, entity: &str) -> bool {
        if self.entities.iter().any(|e| e == entity) {
            return false;
        }
        self.entities.push(entity.to_string());
        true
    }

    /// Removes the entity together with any fields chosen for it.
    pub fn remove_entity(&mut self, entity: &str) -> bool {
        let before = self.entities.len();
        self.entities.retain(|e| e != entity);
        self.fields.remove(entity);
        self.entities.len() != before
    }

    /// Adds a field, selecting its entity as well if needed.
    pub fn add_field(&mut self, field_ref: &FieldRef) -> bool {
        self.add_entity(&field_ref.entity);
        let fields = self.fields.entry(field_ref.entity.clone()).or_default();
        if fields.contains(&field_ref.field) {
            return false;
        }
        fields.push(field_ref.field.clone());
        true
    }

    pub fn remove_field(&mut self, field_ref: &FieldRef) -> bool {
        let Some(fields) = self.fields.get_mut(&field_ref.entity) else {
            return false;
        };
        let before = fields.len();
        fields.retain(|f| f != &field_ref.field);
        let removed = fields.len() != before;
        if fields.is_empty() {
            self.fields.remove(&field_ref.entity);
        }
        removed
    }

    /// Expands `targets` into field pairs. Entities without explicit fields
    /// contribute every field returned by `described`.
    pub fn pairs<F>(&self, targets: &[String], described: F) -> Vec<FieldRef>
    where
        F: Fn(&str) -> Vec<String>,
    {
        let mut pairs = Vec::new();
        for entity in targets {
            let explicit = self.fields_for(entity);
            let fields = if explicit.is_empty() {
                described(entity)
            } else {
                explicit.to_vec()
            };
            pairs.extend(fields.iter().map(|field| FieldRef::new(entity, field)));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trip_and_rejects_malformed() {
        let field_ref = FieldRef::new("Account", "Industry");
        assert_eq!(field_ref.key(), "Account:Industry");
        assert_eq!(FieldRef::parse("Account:Industry"), Some(field_ref));
        assert_eq!(FieldRef::parse("Account"), None);
        assert_eq!(FieldRef::parse(":Industry"), None);
        assert_eq!(FieldRef::parse("Account:"), None);
    }

    #[test]
    fn test_duplicate_fields_are_ignored() {
        let mut selection = SelectionSet::new();
        assert!(selection.add_field(&FieldRef::new("Account", "Name")));
        assert!(!selection.add_field(&FieldRef::new("Account", "Name")));
        assert_eq!(selection.entities(), &["Account".to_string()]);
        assert_eq!(selection.fields_for("Account"), &["Name".to_string()]);
    }

    #[test]
    fn test_removing_entity_drops_its_fields() {
        let mut selection = SelectionSet::new();
        selection.add_field(&FieldRef::new("Account", "Name"));
        selection.add_entity("Contact");
        assert!(selection.remove_entity("Account"));
        assert!(selection.fields_for("Account").is_empty());
        assert_eq!(selection.entities(), &["Contact".to_string()]);
        assert!(!selection.remove_entity("Account"));
    }

    #[test]
    fn test_removing_last_field_restores_all_fields_expansion() {
        let mut selection = SelectionSet::new();
        let name = FieldRef::new("Account", "Name");
        selection.add_field(&name);
        assert!(selection.remove_field(&name));
        assert!(!selection.remove_field(&name));

        let pairs = selection.pairs(selection.entities(), |_| vec!["Id".into(), "Name".into()]);
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_pairs_prefer_explicit_fields() {
        let mut selection = SelectionSet::new();
        selection.add_field(&FieldRef::new("Account", "Industry"));
        selection.add_entity("Contact");

        let pairs = selection.pairs(selection.entities(), |entity| match entity {
            "Contact" => vec!["Email".into(), "Phone".into()],
            _ => vec!["Id".into()],
        });
        let keys: Vec<_> = pairs.iter().map(FieldRef::key).collect();
        assert_eq!(keys, vec!["Account:Industry", "Contact:Email", "Contact:Phone"]);
    }
}
