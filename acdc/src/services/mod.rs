//! Batch services: resolution, loading, reconciliation and execution

pub mod batch_executor;
pub mod entity_loader;
pub mod entity_resolver;
pub mod progress;
pub mod reconciler;
pub mod title_sources;

pub use batch_executor::{BatchError, BatchOutcome, BatchRun, BatchSummary, StopSignal};
pub use entity_loader::{load_entities, STATEMENT_PROPS};
pub use entity_resolver::{chunk_count, resolve_titles, ResolvedTitle};
pub use progress::{Progress, ProgressTracker};
pub use reconciler::{
    merge_into_existing, plan_entity, reconcile_additions, reconcile_removals, AddOperation,
    EntityPlan, RemoveOperation,
};
pub use title_sources::{category_files, PagePile, PagePileClient, PagePileError};
