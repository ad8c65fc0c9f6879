pub mod batch;
pub mod metadata;
pub mod plan;

pub use batch::{BatchOrchestrator, RunOutcome};
pub use metadata::MetadataCache;

use crate::models::{BatchDetail, FieldRef};

/// Turns selected pairs into run details, attaching whatever metadata the
/// cache holds. `entity_label` resolves an entity name to its display key.
pub fn build_details<L>(pairs: &[FieldRef], cache: &MetadataCache, entity_label: L) -> Vec<BatchDetail>
where
    L: Fn(&str) -> String,
{
    pairs
        .iter()
        .map(|pair| {
            let metadata = cache.field(&pair.entity, &pair.field);
            BatchDetail::new(pair, &entity_label(&pair.entity), metadata)
        })
        .collect()
}
