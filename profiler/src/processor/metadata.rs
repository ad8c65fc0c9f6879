use crate::client::OrgClient;
use crate::models::{FieldMetadata, sort_fields};
use common::{Error, Result};
use dashmap::DashMap;
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

type FieldList = Arc<Vec<FieldMetadata>>;

/// Session-scoped memo of entity describes.
///
/// Each entity gets one cell; concurrent callers for the same entity await
/// the same describe instead of issuing their own. A failed describe leaves
/// the cell empty so a later call may try again.
pub struct MetadataCache {
    client: Arc<dyn OrgClient>,
    entries: DashMap<String, Arc<OnceCell<FieldList>>>,
}

impl MetadataCache {
    pub fn new(client: Arc<dyn OrgClient>) -> Self {
        Self {
            client,
            entries: DashMap::new(),
        }
    }

    /// Fields of `entity`, ordered by label.
    pub async fn describe(&self, entity: &str) -> Result<FieldList> {
        let cell = self.entries.entry(entity.to_string()).or_default().clone();

        let fields = cell
            .get_or_try_init(|| async {
                let mut fields = self.client.describe(entity).await?;
                sort_fields(&mut fields);
                debug!(entity, fields = fields.len(), "Cached entity describe");
                Ok::<_, Error>(Arc::new(fields))
            })
            .await?;

        Ok(Arc::clone(fields))
    }

    /// Describes every entity not yet cached, concurrently, and waits for all
    /// of them. The first failure is returned.
    pub async fn ensure_loaded(&self, entities: &[String]) -> Result<()> {
        try_join_all(entities.iter().map(|entity| self.describe(entity))).await?;
        Ok(())
    }

    pub fn cached(&self, entity: &str) -> Option<FieldList> {
        self.entries
            .get(entity)
            .and_then(|cell| cell.get().map(Arc::clone))
    }

    pub fn field(&self, entity: &str, name: &str) -> Option<FieldMetadata> {
        self.cached(entity)?.iter().find(|f| f.name == name).cloned()
    }

    pub fn field_names(&self, entity: &str) -> Vec<String> {
        self.cached(entity)
            .map(|fields| fields.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SubRequest, SubResponse};
    use crate::models::EntityInfo;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct DescribeCounter {
        calls: Mutex<HashMap<String, usize>>,
    }

    #[async_trait]
    impl OrgClient for DescribeCounter {
        async fn list_entities(&self) -> Result<Vec<EntityInfo>> {
            Ok(Vec::new())
        }

        async fn describe(&self, entity: &str) -> Result<Vec<FieldMetadata>> {
            *self.calls.lock().unwrap().entry(entity.to_string()).or_default() += 1;
            tokio::time::sleep(Duration::from_millis(10)).await;
            if entity == "Missing__c" {
                return Err(Error::Api {
                    status: 404,
                    body: "NOT_FOUND".into(),
                });
            }
            Ok(vec![
                FieldMetadata::new("Name", Some("Name"), Some("string")),
                FieldMetadata::new("Description", Some("description"), Some("textarea")),
                FieldMetadata::new("Amount", Some("Amount"), Some("currency")),
            ])
        }

        async fn composite(&self, _requests: &[SubRequest]) -> Result<Vec<SubResponse>> {
            Ok(Vec::new())
        }
    }

    fn cache() -> (Arc<DescribeCounter>, MetadataCache) {
        let client = Arc::new(DescribeCounter::default());
        let cache = MetadataCache::new(client.clone());
        (client, cache)
    }

    #[tokio::test]
    async fn test_concurrent_describes_share_one_call() {
        let (client, cache) = cache();
        let (a, b) = tokio::join!(cache.describe("Account"), cache.describe("Account"));
        assert_eq!(a.unwrap().len(), 3);
        assert_eq!(b.unwrap().len(), 3);
        cache.describe("Account").await.unwrap();
        assert_eq!(client.calls.lock().unwrap()["Account"], 1);
    }

    #[tokio::test]
    async fn test_fields_are_ordered_by_label() {
        let (_, cache) = cache();
        let names: Vec<_> = cache
            .describe("Account")
            .await
            .unwrap()
            .iter()
            .map(|f| f.name.clone())
            .collect();
        assert_eq!(names, vec!["Amount", "Description", "Name"]);
    }

    #[tokio::test]
    async fn test_ensure_loaded_describes_each_entity_once() {
        let (client, cache) = cache();
        let entities = vec!["Account".to_string(), "Contact".to_string(), "Account".to_string()];
        cache.ensure_loaded(&entities).await.unwrap();
        cache.ensure_loaded(&entities).await.unwrap();

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls["Account"], 1);
        assert_eq!(calls["Contact"], 1);
        assert!(cache.field("Contact", "Description").is_some());
        assert!(cache.field("Contact", "Nope").is_none());
    }

    #[tokio::test]
    async fn test_failed_describe_is_not_memoized() {
        let (client, cache) = cache();
        let entities = vec!["Account".to_string(), "Missing__c".to_string()];
        assert!(cache.ensure_loaded(&entities).await.is_err());
        assert!(cache.cached("Missing__c").is_none());
        assert!(cache.field_names("Missing__c").is_empty());

        assert!(cache.describe("Missing__c").await.is_err());
        assert_eq!(client.calls.lock().unwrap()["Missing__c"], 2);
    }
}
