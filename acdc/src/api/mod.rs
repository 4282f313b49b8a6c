//! HTTP API handlers
//!
//! REST endpoints drive the batch controller; progress streams over SSE.

pub mod batch;
pub mod health;
pub mod sse;

pub use batch::batch_routes;
pub use health::health_routes;
pub use sse::batch_event_stream;
