//! Structured-data model for file entities
//!
//! Mirrors the subset of the Wikibase data model that batch statement
//! editing needs: identifiers, snaks, qualifier sets, statements with rank,
//! and per-property statement groups. Conversion to and from the Wikibase
//! JSON serialization lives in [`wire`].

mod entity;
mod guid;
mod ids;
mod qualifiers;
mod snak;
mod statement;
mod wire;

pub use entity::{EntityRecord, StatementGroup};
pub use guid::{statement_guid, Guid, GuidSequence};
pub use ids::{EntityId, PropertyId};
pub use qualifiers::QualifierSet;
pub use snak::{DataValue, Snak, SnakValue};
pub use statement::{DesiredStatement, Rank, Statement};
