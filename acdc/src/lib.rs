//! acdc library interface
//!
//! Batch add/remove of structured-data statements across wiki file pages.
//! Exposes the building blocks used by the binary and the integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod input;
pub mod mediawiki;
pub mod services;
pub mod session;

pub use crate::error::{ApiError, ApiResult};
pub use crate::session::BatchController;

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use acdc_common::events::EventBus;
use services::PagePileClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: BatchController,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Absent when PagePile loading is not configured
    pub pagepile: Option<Arc<PagePileClient>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(controller: BatchController, event_bus: EventBus) -> Self {
        Self {
            controller,
            event_bus,
            pagepile: None,
            startup_time: Utc::now(),
        }
    }

    pub fn with_pagepile(mut self, client: PagePileClient) -> Self {
        self.pagepile = Some(Arc::new(client));
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::batch_routes())
        .route("/batch/events", get(api::batch_event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
