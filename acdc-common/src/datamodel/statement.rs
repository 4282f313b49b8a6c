//! Statements and ranks

use serde::{Deserialize, Serialize};

use super::guid::Guid;
use super::ids::PropertyId;
use super::qualifiers::QualifierSet;
use super::snak::Snak;
use super::wire::StatementJson;

/// Relative prominence of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Preferred,
    #[default]
    Normal,
    Deprecated,
}

/// A statement as stored on an entity
///
/// `references` are carried through verbatim; this crate never edits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StatementJson", into = "StatementJson")]
pub struct Statement {
    pub id: Guid,
    pub main_snak: Snak,
    pub qualifiers: QualifierSet,
    pub rank: Rank,
    pub references: Vec<serde_json::Value>,
}

impl Statement {
    /// Build a new statement from a desired one, under a freshly assigned GUID
    pub fn from_desired(id: Guid, desired: &DesiredStatement) -> Self {
        Self {
            id,
            main_snak: desired.main_snak.clone(),
            qualifiers: desired.qualifiers.clone(),
            rank: desired.rank,
            references: Vec::new(),
        }
    }

    pub fn property(&self) -> &PropertyId {
        &self.main_snak.property
    }

    /// Main snak, qualifiers and rank all equal those of `desired`
    pub fn matches_desired(&self, desired: &DesiredStatement) -> bool {
        self.main_snak == desired.main_snak
            && self.qualifiers == desired.qualifiers
            && self.rank == desired.rank
    }
}

/// A statement as declared by the user, before it is bound to an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredStatement {
    pub main_snak: Snak,
    #[serde(default)]
    pub qualifiers: QualifierSet,
    #[serde(default)]
    pub rank: Rank,
}

impl DesiredStatement {
    pub fn new(main_snak: Snak) -> Self {
        Self {
            main_snak,
            qualifiers: QualifierSet::new(),
            rank: Rank::Normal,
        }
    }

    pub fn with_qualifier(mut self, qualifier: Snak) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = rank;
        self
    }

    pub fn property(&self) -> &PropertyId {
        &self.main_snak.property
    }
}
