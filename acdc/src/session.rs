//! Batch controller
//!
//! Composes the specification reducer, validation, title sources and the
//! executor behind one handle shared by the HTTP surface and the CLI. The
//! controller is either editing (events accepted, publish possible) or
//! saving (only stop accepted).

use std::sync::Arc;

use acdc_common::events::EventBus;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::input::{
    titles::filter_suggestions, validate, BatchSpecification, SpecificationEvent, Validity,
};
use crate::mediawiki::WikiApi;
use crate::services::{
    category_files, BatchError, BatchOutcome, BatchRun, PagePile, StopSignal,
};

/// Titles gathered from a category are added in batches of this size
const CATEGORY_BATCH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControllerMode {
    Editing,
    Saving,
}

/// Serializable view of the controller
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub mode: ControllerMode,
    pub titles: usize,
    pub statements_per_file: usize,
    pub can_submit: bool,
    pub last_run_id: Option<Uuid>,
    pub last_error: Option<String>,
}

/// Result of offering a PagePile to the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagePileLoad {
    pub id: u64,
    pub files: usize,
    /// Large pile not loaded because it was not confirmed
    pub needs_confirmation: bool,
    pub added: usize,
}

struct ControllerState {
    spec: BatchSpecification,
    validity: Validity,
    mode: ControllerMode,
    last_run_id: Option<Uuid>,
    last_error: Option<String>,
}

#[derive(Clone)]
pub struct BatchController {
    state: Arc<RwLock<ControllerState>>,
    api: Arc<dyn WikiApi>,
    event_bus: EventBus,
    stop: StopSignal,
    tags: Vec<String>,
}

impl BatchController {
    pub fn new(api: Arc<dyn WikiApi>, event_bus: EventBus, tags: Vec<String>) -> Self {
        let spec = BatchSpecification::new();
        let validity = validate(&spec);
        Self {
            state: Arc::new(RwLock::new(ControllerState {
                spec,
                validity,
                mode: ControllerMode::Editing,
                last_run_id: None,
                last_error: None,
            })),
            api,
            event_bus,
            stop: StopSignal::new(),
            tags,
        }
    }

    pub async fn specification(&self) -> BatchSpecification {
        self.state.read().await.spec.clone()
    }

    pub async fn validity(&self) -> Validity {
        self.state.read().await.validity.clone()
    }

    pub async fn mode(&self) -> ControllerMode {
        self.state.read().await.mode
    }

    pub async fn status(&self) -> ControllerStatus {
        let state = self.state.read().await;
        ControllerStatus {
            mode: state.mode,
            titles: state.spec.titles().len(),
            statements_per_file: state.spec.statements_per_entity(),
            can_submit: state.mode == ControllerMode::Editing && state.validity.can_submit,
            last_run_id: state.last_run_id,
            last_error: state.last_error.clone(),
        }
    }

    /// Apply an input event, returning the new validity
    pub async fn dispatch(&self, event: SpecificationEvent) -> Result<Validity, BatchError> {
        let mut state = self.state.write().await;
        if state.mode == ControllerMode::Saving {
            return Err(BatchError::AlreadyRunning);
        }

        let next = state
            .spec
            .apply(event)
            .map_err(|e| BatchError::Invalid(e.to_string()))?;
        state.validity = validate(&next);
        state.spec = next;
        Ok(state.validity.clone())
    }

    /// Start a batch run in the background
    pub async fn publish(&self, dry_run: bool) -> Result<Uuid, BatchError> {
        let run = self.begin(dry_run).await?;
        let run_id = run.run_id();

        let controller = self.clone();
        let worker = tokio::spawn(async move {
            info!(run_id = %run_id, "Background batch task started");
            controller.finish(run, dry_run).await
        });

        // A panicking worker never reaches `finish`; leave Saving here instead
        let controller = self.clone();
        tokio::spawn(async move {
            match worker.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(run_id = %run_id, error = %e, "Background batch task failed"),
                Err(e) => {
                    error!(run_id = %run_id, error = %e, "Background batch task aborted");
                    controller.abandon_run(format!("Batch task aborted: {}", e)).await;
                }
            }
        });

        Ok(run_id)
    }

    /// Run a batch to completion
    pub async fn run(&self, dry_run: bool) -> Result<BatchOutcome, BatchError> {
        let run = self.begin(dry_run).await?;
        self.finish(run, dry_run).await
    }

    /// Ask the running batch to stop before its next write
    pub async fn stop(&self) -> Result<(), BatchError> {
        if self.mode().await != ControllerMode::Saving {
            return Err(BatchError::NotRunning);
        }
        info!("Stop requested");
        self.stop.request();
        Ok(())
    }

    /// Handle for requesting a stop without going through the controller
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Add every file of a category
    pub async fn load_category(&self, category: &str) -> Result<usize, BatchError> {
        self.ensure_editing().await?;

        let mut added = 0;
        let mut pending = Vec::new();
        let mut files = Box::pin(category_files(self.api.as_ref(), category));
        while let Some(title) = files.next().await {
            pending.push(title.map_err(BatchError::Resolve)?);
            if pending.len() >= CATEGORY_BATCH {
                added += self.add_titles(std::mem::take(&mut pending)).await?;
                tokio::task::yield_now().await;
            }
        }
        added += self.add_titles(pending).await?;

        info!("Loaded {} files from {}", added, category);
        Ok(added)
    }

    /// Add the files of a PagePile; large piles need `confirm_large`
    pub async fn load_pagepile(
        &self,
        pile: PagePile,
        confirm_large: bool,
    ) -> Result<PagePileLoad, BatchError> {
        let files = pile.files.len();
        if pile.is_large() && !confirm_large {
            return Ok(PagePileLoad {
                id: pile.id,
                files,
                needs_confirmation: true,
                added: 0,
            });
        }

        let added = self.add_titles(pile.files).await?;
        Ok(PagePileLoad {
            id: pile.id,
            files,
            needs_confirmation: false,
            added,
        })
    }

    /// File titles starting with `prefix` that are not collected yet
    pub async fn suggestions(&self, prefix: &str) -> Result<Vec<String>, BatchError> {
        let prefix = crate::input::ensure_file_namespace(prefix.trim());
        let found = self
            .api
            .search_titles(&prefix)
            .await
            .map_err(BatchError::Resolve)?;
        let spec = self.specification().await;
        Ok(filter_suggestions(found, spec.titles()))
    }

    async fn add_titles(&self, titles: Vec<String>) -> Result<usize, BatchError> {
        if titles.is_empty() {
            return Ok(0);
        }
        let before = self.state.read().await.spec.titles().len();
        self.dispatch(SpecificationEvent::AddTitles { titles }).await?;
        let after = self.state.read().await.spec.titles().len();
        Ok(after - before)
    }

    async fn ensure_editing(&self) -> Result<(), BatchError> {
        match self.mode().await {
            ControllerMode::Editing => Ok(()),
            ControllerMode::Saving => Err(BatchError::AlreadyRunning),
        }
    }

    async fn begin(&self, dry_run: bool) -> Result<BatchRun, BatchError> {
        let mut state = self.state.write().await;
        if state.mode == ControllerMode::Saving {
            return Err(BatchError::AlreadyRunning);
        }

        let validity = validate(&state.spec);
        if !validity.can_submit {
            let reason = if validity.errors.is_empty() {
                "at least one file and one statement are required".to_string()
            } else {
                validity
                    .errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            return Err(BatchError::Invalid(reason));
        }

        // Discard a stop requested while nothing was running
        self.stop.take();

        let run = BatchRun::new(&state.spec, self.stop.clone())
            .with_tags(self.tags.clone())
            .with_event_bus(self.event_bus.clone())
            .dry_run(dry_run);

        state.mode = ControllerMode::Saving;
        state.last_run_id = Some(run.run_id());
        state.last_error = None;
        Ok(run)
    }

    async fn abandon_run(&self, reason: String) {
        let mut state = self.state.write().await;
        state.validity = validate(&state.spec);
        state.mode = ControllerMode::Editing;
        state.last_error = Some(reason);
    }

    async fn finish(&self, mut run: BatchRun, dry_run: bool) -> Result<BatchOutcome, BatchError> {
        let result = run.execute(self.api.as_ref()).await;

        let mut state = self.state.write().await;
        if !dry_run {
            for title in run.completed_titles() {
                match state.spec.apply(SpecificationEvent::TitleCompleted {
                    title: title.clone(),
                }) {
                    Ok(next) => state.spec = next,
                    Err(e) => warn!("Could not drop completed title {}: {}", title, e),
                }
            }
        }
        state.validity = validate(&state.spec);
        state.mode = ControllerMode::Editing;
        state.last_error = result.as_ref().err().map(ToString::to_string);

        result
    }
}
