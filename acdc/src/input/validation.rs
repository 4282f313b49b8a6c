//! Specification validation
//!
//! Pure function of a [`BatchSpecification`] snapshot, recomputed after
//! every input event. Errors block publishing; they never reach the network.

use acdc_common::datamodel::{PropertyId, Snak};
use serde::Serialize;

use super::specification::{BatchSpecification, SectionKind, StatementSection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// Two add statements for one property share a main value
    DuplicateAddValue { property: PropertyId, value: String },
    /// Two remove statements for one property share a main value
    DuplicateRemoveValue { property: PropertyId, value: String },
    /// A remove statement carries qualifiers
    QualifiersOnRemoval { property: PropertyId, value: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::DuplicateAddValue { property, value } => {
                write!(f, "Duplicate value to add for {}: {}", property, value)
            }
            ValidationError::DuplicateRemoveValue { property, value } => {
                write!(f, "Duplicate value to remove for {}: {}", property, value)
            }
            ValidationError::QualifiersOnRemoval { property, value } => write!(
                f,
                "Statements to remove cannot have qualifiers ({}: {})",
                property, value
            ),
        }
    }
}

/// Derived validity of a specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validity {
    pub can_submit: bool,
    pub errors: Vec<ValidationError>,
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a specification
///
/// Publishing additionally needs at least one title and one statement.
/// The same value appearing on both the add and remove side is not
/// detected.
pub fn validate(spec: &BatchSpecification) -> Validity {
    let mut errors = Vec::new();

    for section in spec.sections(SectionKind::Add) {
        for value in duplicate_main_snaks(section) {
            errors.push(ValidationError::DuplicateAddValue {
                property: section.property.clone(),
                value: value.to_string(),
            });
        }
    }

    for section in spec.sections(SectionKind::Remove) {
        for value in duplicate_main_snaks(section) {
            errors.push(ValidationError::DuplicateRemoveValue {
                property: section.property.clone(),
                value: value.to_string(),
            });
        }
        for statement in section.statements.iter().filter(|s| !s.qualifiers.is_empty()) {
            errors.push(ValidationError::QualifiersOnRemoval {
                property: section.property.clone(),
                value: statement.main_snak.to_string(),
            });
        }
    }

    let can_submit =
        errors.is_empty() && !spec.titles().is_empty() && spec.statements_per_entity() > 0;

    Validity { can_submit, errors }
}

/// Main snaks occurring more than once in a section, each reported once
fn duplicate_main_snaks(section: &StatementSection) -> Vec<&Snak> {
    let statements = &section.statements;
    let mut duplicates: Vec<&Snak> = Vec::new();

    for (i, first) in statements.iter().enumerate() {
        for second in &statements[i + 1..] {
            if first.main_snak == second.main_snak && !duplicates.contains(&&first.main_snak) {
                duplicates.push(&first.main_snak);
            }
        }
    }

    duplicates
}
