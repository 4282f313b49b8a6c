//! # AC/DC Common Library
//!
//! Shared code for the AC/DC batch statement editor:
//! - Structured-data model (entities, snaks, qualifiers, statements)
//! - Wikibase JSON wire format for statements
//! - Batch event types and the broadcast event bus
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod datamodel;
pub mod error;
pub mod events;

pub use datamodel::{
    DataValue, DesiredStatement, EntityId, Guid, PropertyId, QualifierSet, Rank, Snak,
    SnakValue, Statement, StatementGroup,
};
pub use error::{Error, Result};
