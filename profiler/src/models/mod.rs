mod field;
mod result;
mod selection;

pub use field::{
    EntityInfo, FieldMetadata, filter_entities, find_entity, sort_entities, sort_fields,
};
pub use result::{
    BatchDetail, DistributionResult, DistributionRow, EntryStatus, QueryPlan, QueryPlanOutcome,
    ResultEntry, SKIP_METADATA_UNAVAILABLE, SKIP_NOT_FILTERABLE, TimelinePoint, bucket_label,
};
pub use selection::{FieldRef, SelectionSet};
