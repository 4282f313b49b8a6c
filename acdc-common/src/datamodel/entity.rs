//! Entity records as delivered by a batch entity fetch

use std::collections::BTreeMap;

use serde::Deserialize;

use super::ids::{EntityId, PropertyId};
use super::statement::Statement;
use super::wire::EntityJson;

/// All statements of one entity sharing one property
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementGroup {
    pub statements: Vec<Statement>,
}

impl StatementGroup {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn as_slice(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Current state of one entity: base revision plus statement groups
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "EntityJson")]
pub struct EntityRecord {
    pub id: EntityId,
    /// Revision observed at load time; `None` when the entity does not exist yet
    pub last_revision: Option<u64>,
    /// The backing store reported the entity as missing
    pub missing: bool,
    pub statements: BTreeMap<PropertyId, StatementGroup>,
}

impl EntityRecord {
    /// Record without any structured data
    pub fn empty(id: EntityId) -> Self {
        Self {
            id,
            last_revision: None,
            missing: true,
            statements: BTreeMap::new(),
        }
    }

    /// Existing statements for `property`, in stored order (empty if none)
    pub fn statements_for(&self, property: &PropertyId) -> &[Statement] {
        self.statements
            .get(property)
            .map(StatementGroup::as_slice)
            .unwrap_or(&[])
    }

    pub fn statement_count(&self) -> usize {
        self.statements.values().map(StatementGroup::len).sum()
    }
}
