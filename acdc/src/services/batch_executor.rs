//! Batch edit execution
//!
//! A [`BatchRun`] owns everything one publish needs: the titles and
//! statement sections snapshotted from the specification, the per-entity GUID
//! counters, the progress counters and the stop signal. Writes are issued
//! strictly in order (entity, then add properties, then remove properties,
//! then operations) and one at a time.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use acdc_common::datamodel::{EntityId, EntityRecord, GuidSequence, PropertyId};
use acdc_common::events::{BatchEvent, EventBus};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::entity_loader::{load_entities, STATEMENT_PROPS};
use super::entity_resolver::{resolve_titles, ResolvedTitle};
use super::progress::{Progress, ProgressTracker};
use super::reconciler::{plan_entity, AddOperation, EntityPlan, RemoveOperation};
use crate::input::{BatchSpecification, StatementSection};
use crate::mediawiki::{WikiApi, WikiError};

/// User-initiated stop request
///
/// Settable from anywhere; the executor consumes it (reads and clears)
/// before each write.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Consume a pending request
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Invalid batch: {0}")]
    Invalid(String),

    #[error("Title lookup failed: {0}")]
    Resolve(#[source] WikiError),

    #[error("Loading entity data failed: {0}")]
    Load(#[source] WikiError),

    #[error("Editing {title} ({entity_id}) failed: {source}")]
    Write {
        title: String,
        entity_id: EntityId,
        #[source]
        source: WikiError,
    },

    /// Statements would have to be added to a page that does not exist
    #[error("{0} does not exist")]
    MissingPage(String),

    #[error("A batch run is already in progress")]
    AlreadyRunning,

    #[error("No batch run is in progress")]
    NotRunning,
}

impl BatchError {
    pub fn is_edit_conflict(&self) -> bool {
        matches!(self, BatchError::Write { source, .. } if source.is_edit_conflict())
    }
}

/// Counters describing what a run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub files_processed: usize,
    /// Writes issued (in a dry run: writes that would have been issued)
    pub writes: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Finished(BatchSummary),
    /// Stop was requested; writes already made are kept
    Stopped(BatchSummary),
}

impl BatchOutcome {
    pub fn summary(&self) -> &BatchSummary {
        match self {
            BatchOutcome::Finished(summary) | BatchOutcome::Stopped(summary) => summary,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, BatchOutcome::Finished(_))
    }
}

/// State of one publish operation
pub struct BatchRun {
    run_id: Uuid,
    titles: Vec<String>,
    add_sections: Vec<StatementSection>,
    remove_sections: Vec<StatementSection>,
    tags: Vec<String>,
    dry_run: bool,
    stop: StopSignal,
    event_bus: Option<EventBus>,
    guid_counters: HashMap<EntityId, u64>,
    progress: ProgressTracker,
    completed_titles: Vec<String>,
    writes: usize,
}

impl BatchRun {
    pub fn new(spec: &BatchSpecification, stop: StopSignal) -> Self {
        let mut seen = HashSet::new();
        let titles: Vec<String> = spec
            .titles()
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect();

        // Empty sections declare nothing and produce no operations
        let add_sections: Vec<StatementSection> = spec
            .add_sections()
            .iter()
            .filter(|s| !s.statements.is_empty())
            .cloned()
            .collect();
        let remove_sections: Vec<StatementSection> = spec
            .remove_sections()
            .iter()
            .filter(|s| !s.statements.is_empty())
            .cloned()
            .collect();

        let progress = ProgressTracker::new(titles.len(), spec.statements_per_entity());

        Self {
            run_id: Uuid::new_v4(),
            titles,
            add_sections,
            remove_sections,
            tags: Vec::new(),
            dry_run: false,
            stop,
            event_bus: None,
            guid_counters: HashMap::new(),
            progress,
            completed_titles: Vec::new(),
            writes: 0,
        }
    }

    /// Change tags attached to every write
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Resolve, load and reconcile, but only log the writes
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn progress(&self) -> Progress {
        self.progress.snapshot()
    }

    /// Titles whose operations all completed, in processing order
    pub fn completed_titles(&self) -> &[String] {
        &self.completed_titles
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Execute the run against `api`
    ///
    /// Lookup failures abort before any write. A write failure aborts the
    /// remainder; earlier writes stay applied. [`completed_titles`] reflects
    /// what finished regardless of the outcome.
    ///
    /// [`completed_titles`]: BatchRun::completed_titles
    pub async fn execute(&mut self, api: &dyn WikiApi) -> Result<BatchOutcome, BatchError> {
        let started = Instant::now();
        info!(
            run_id = %self.run_id,
            "Starting batch: {} files, {} statements per file{}",
            self.titles.len(),
            self.statements_per_entity(),
            if self.dry_run { " (dry run)" } else { "" }
        );
        self.emit(BatchEvent::BatchStarted {
            run_id: self.run_id,
            files: self.titles.len(),
            statements_per_file: self.statements_per_entity(),
            timestamp: Utc::now(),
        });

        let result = self.execute_inner(api).await;
        let summary = BatchSummary {
            run_id: self.run_id,
            files_processed: self.completed_titles.len(),
            writes: self.writes,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        match &result {
            Ok(true) => {
                info!(
                    run_id = %self.run_id,
                    "Batch completed: {} files, {} writes in {} ms",
                    summary.files_processed, summary.writes, summary.duration_ms
                );
                self.emit(BatchEvent::BatchCompleted {
                    run_id: self.run_id,
                    files_processed: summary.files_processed,
                    writes: summary.writes,
                    duration_ms: summary.duration_ms,
                    timestamp: Utc::now(),
                });
            }
            Ok(false) => {
                info!(
                    run_id = %self.run_id,
                    "Batch stopped after {} files, {} writes",
                    summary.files_processed, summary.writes
                );
                self.emit(BatchEvent::BatchStopped {
                    run_id: self.run_id,
                    files_processed: summary.files_processed,
                    writes: summary.writes,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                error!(run_id = %self.run_id, "Batch failed: {}", e);
                self.emit(BatchEvent::BatchFailed {
                    run_id: self.run_id,
                    error: e.to_string(),
                    files_processed: summary.files_processed,
                    writes: summary.writes,
                    timestamp: Utc::now(),
                });
            }
        }

        match result? {
            true => Ok(BatchOutcome::Finished(summary)),
            false => Ok(BatchOutcome::Stopped(summary)),
        }
    }

    /// Returns `Ok(false)` when stopped
    async fn execute_inner(&mut self, api: &dyn WikiApi) -> Result<bool, BatchError> {
        let resolved = {
            let progress = &mut self.progress;
            let event_bus = &self.event_bus;
            let run_id = self.run_id;
            resolve_titles(api, &self.titles, || {
                progress.finished_lookup_call();
                emit_progress(event_bus, run_id, progress.snapshot());
            })
            .await
            .map_err(BatchError::Resolve)?
        };

        // Adding to a page that does not exist cannot succeed; refuse before any write
        if !self.add_sections.is_empty() {
            if let Some(missing) = resolved.iter().find(|r| r.entity_id.is_none()) {
                return Err(BatchError::MissingPage(missing.title.clone()));
            }
        }

        let mut entity_ids: Vec<EntityId> = Vec::new();
        for id in resolved.iter().filter_map(|r| r.entity_id.as_ref()) {
            if !entity_ids.contains(id) {
                entity_ids.push(id.clone());
            }
        }

        let entities = {
            let progress = &mut self.progress;
            let event_bus = &self.event_bus;
            let run_id = self.run_id;
            load_entities(api, &entity_ids, STATEMENT_PROPS, || {
                progress.finished_lookup_call();
                emit_progress(event_bus, run_id, progress.snapshot());
            })
            .await
            .map_err(BatchError::Load)?
        };
        self.progress.finished_loading();
        self.emit_progress();

        let mut processed: HashSet<EntityId> = HashSet::new();
        for entry in resolved {
            self.progress.start_entity();
            let entity_writes = self.writes;

            if !self.process_entity(api, &entry, &entities, &mut processed).await? {
                return Ok(false);
            }

            self.progress.finished_entity();
            self.completed_titles.push(entry.title.clone());
            self.emit(BatchEvent::EntityCompleted {
                run_id: self.run_id,
                title: entry.title,
                entity_id: entry.entity_id.map(|id| id.to_string()),
                writes: self.writes - entity_writes,
                timestamp: Utc::now(),
            });
            self.emit_progress();

            tokio::task::yield_now().await;
        }

        self.progress.finished();
        self.emit_progress();
        Ok(true)
    }

    /// Returns `Ok(false)` when stopped
    async fn process_entity(
        &mut self,
        api: &dyn WikiApi,
        entry: &ResolvedTitle,
        entities: &HashMap<EntityId, EntityRecord>,
        processed: &mut HashSet<EntityId>,
    ) -> Result<bool, BatchError> {
        // Only reachable for removal-only batches
        let Some(entity_id) = entry.entity_id.clone() else {
            debug!("{} does not exist, nothing to remove", entry.title);
            return Ok(true);
        };

        // Several titles can normalize to the same page
        if !processed.insert(entity_id.clone()) {
            debug!(entity_id = %entity_id, "{} already processed", entry.title);
            return Ok(true);
        }

        let empty = EntityRecord::empty(entity_id.clone());
        let record = entities.get(&entity_id).unwrap_or(&empty);
        let base_revision = record.last_revision;

        let plan = self.plan(record);
        debug!(
            entity_id = %entity_id,
            "{}: {} operations",
            entry.title,
            plan.write_count()
        );

        for (property, operations) in &plan.additions {
            let declared = declared_count(&self.add_sections, property);
            self.progress.start_property(declared);
            for operation in operations {
                if self.stop.take() {
                    return Ok(false);
                }
                self.write_addition(api, entry, &entity_id, operation, base_revision)
                    .await?;
            }
            self.progress.finished_property();
        }

        for (property, operations) in &plan.removals {
            let declared = declared_count(&self.remove_sections, property);
            self.progress.start_property(declared);
            for operation in operations {
                if self.stop.take() {
                    return Ok(false);
                }
                self.write_removal(api, entry, &entity_id, operation, base_revision)
                    .await?;
            }
            self.progress.finished_property();
        }

        Ok(true)
    }

    fn plan(&mut self, record: &EntityRecord) -> EntityPlan {
        let counter = self.guid_counters.entry(record.id.clone()).or_insert(0);
        let mut guids = GuidSequence::new(self.run_id, &record.id, counter);
        plan_entity(
            record,
            &self.add_sections,
            &self.remove_sections,
            &mut guids,
        )
    }

    async fn write_addition(
        &mut self,
        api: &dyn WikiApi,
        entry: &ResolvedTitle,
        entity_id: &EntityId,
        operation: &AddOperation,
        base_revision: Option<u64>,
    ) -> Result<(), BatchError> {
        let statement = operation.statement();
        let verb = if operation.is_create() { "create" } else { "update" };

        if self.dry_run {
            info!(entity_id = %entity_id, "[dry run] {} {} on {}", verb, statement.main_snak, entry.title);
        } else {
            debug!(entity_id = %entity_id, guid = %statement.id, "{} {}", verb, statement.main_snak);
            api.set_claim(statement, base_revision, &self.tags)
                .await
                .map_err(|source| BatchError::Write {
                    title: entry.title.clone(),
                    entity_id: entity_id.clone(),
                    source,
                })?;
        }

        self.writes += 1;
        self.progress.finished_write();
        self.emit_progress();
        Ok(())
    }

    async fn write_removal(
        &mut self,
        api: &dyn WikiApi,
        entry: &ResolvedTitle,
        entity_id: &EntityId,
        operation: &RemoveOperation,
        base_revision: Option<u64>,
    ) -> Result<(), BatchError> {
        if self.dry_run {
            info!(entity_id = %entity_id, "[dry run] remove {} from {}", operation.main_snak, entry.title);
        } else {
            debug!(entity_id = %entity_id, guid = %operation.guid, "remove {}", operation.main_snak);
            api.remove_claims(std::slice::from_ref(&operation.guid), base_revision, &self.tags)
                .await
                .map_err(|source| BatchError::Write {
                    title: entry.title.clone(),
                    entity_id: entity_id.clone(),
                    source,
                })?;
        }

        self.writes += 1;
        self.progress.finished_write();
        self.emit_progress();
        Ok(())
    }

    fn statements_per_entity(&self) -> usize {
        self.add_sections
            .iter()
            .chain(self.remove_sections.iter())
            .map(|s| s.statements.len())
            .sum()
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }

    fn emit_progress(&self) {
        emit_progress(&self.event_bus, self.run_id, self.progress.snapshot());
    }
}

fn emit_progress(event_bus: &Option<EventBus>, run_id: Uuid, progress: Progress) {
    if let Some(bus) = event_bus {
        bus.emit_lossy(BatchEvent::BatchProgress {
            run_id,
            completed: progress.completed,
            total: progress.total,
            percentage: progress.percentage(),
            timestamp: Utc::now(),
        });
    }
}

fn declared_count(sections: &[StatementSection], property: &PropertyId) -> usize {
    sections
        .iter()
        .find(|s| &s.property == property)
        .map(|s| s.statements.len())
        .unwrap_or(0)
}
