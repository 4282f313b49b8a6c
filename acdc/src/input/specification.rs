//! Batch specification snapshots and the events that change them
//!
//! A [`BatchSpecification`] is never mutated in place: every
//! [`SpecificationEvent`] produces a new snapshot via
//! [`BatchSpecification::apply`], and derived state (validity, progress
//! totals) is always recomputed from the current snapshot.

use acdc_common::datamodel::{DesiredStatement, PropertyId};
use acdc_common::{Error, Result};
use serde::{Deserialize, Serialize};

use super::titles::ensure_file_namespace;

/// Add or remove side of the specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Add,
    Remove,
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionKind::Add => write!(f, "add"),
            SectionKind::Remove => write!(f, "remove"),
        }
    }
}

/// Declared statements for one property on one side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSection {
    pub property: PropertyId,
    #[serde(default)]
    pub statements: Vec<DesiredStatement>,
}

impl StatementSection {
    pub fn new(property: PropertyId) -> Self {
        Self {
            property,
            statements: Vec::new(),
        }
    }
}

/// Input events accepted by the specification reducer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpecificationEvent {
    /// Append titles (File namespace added, duplicates ignored)
    AddTitles { titles: Vec<String> },
    RemoveTitle { title: String },
    ClearTitles,
    /// Open an empty section for a property
    AddProperty {
        section: SectionKind,
        property: PropertyId,
    },
    RemoveProperty {
        section: SectionKind,
        property: PropertyId,
    },
    /// Append one statement, opening its property section if needed
    AddStatement {
        section: SectionKind,
        statement: DesiredStatement,
    },
    RemoveStatement {
        section: SectionKind,
        property: PropertyId,
        index: usize,
    },
    /// Replace every statement of one section
    SetStatements {
        section: SectionKind,
        property: PropertyId,
        statements: Vec<DesiredStatement>,
    },
    /// A batch run finished this title
    TitleCompleted { title: String },
}

/// Immutable snapshot of what a batch run should do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSpecification {
    titles: Vec<String>,
    add: Vec<StatementSection>,
    remove: Vec<StatementSection>,
}

impl BatchSpecification {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a sequence of events into a fresh specification
    pub fn from_events(events: impl IntoIterator<Item = SpecificationEvent>) -> Result<Self> {
        events
            .into_iter()
            .try_fold(Self::new(), |spec, event| spec.apply(event))
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn sections(&self, kind: SectionKind) -> &[StatementSection] {
        match kind {
            SectionKind::Add => &self.add,
            SectionKind::Remove => &self.remove,
        }
    }

    pub fn add_sections(&self) -> &[StatementSection] {
        &self.add
    }

    pub fn remove_sections(&self) -> &[StatementSection] {
        &self.remove
    }

    pub fn section(&self, kind: SectionKind, property: &PropertyId) -> Option<&StatementSection> {
        self.sections(kind).iter().find(|s| &s.property == property)
    }

    /// Declared statements across both sides, i.e. writes per entity at most
    pub fn statements_per_entity(&self) -> usize {
        self.add
            .iter()
            .chain(self.remove.iter())
            .map(|s| s.statements.len())
            .sum()
    }

    /// Produce the snapshot that results from `event`
    pub fn apply(&self, event: SpecificationEvent) -> Result<Self> {
        let mut next = self.clone();

        match event {
            SpecificationEvent::AddTitles { titles } => {
                for title in titles {
                    let title = ensure_file_namespace(title.trim());
                    if title.len() > "File:".len() && !next.titles.contains(&title) {
                        next.titles.push(title);
                    }
                }
            }
            SpecificationEvent::RemoveTitle { title }
            | SpecificationEvent::TitleCompleted { title } => {
                next.titles.retain(|t| t != &title);
            }
            SpecificationEvent::ClearTitles => next.titles.clear(),
            SpecificationEvent::AddProperty { section, property } => {
                let sections = next.sections_mut(section);
                if !sections.iter().any(|s| s.property == property) {
                    sections.push(StatementSection::new(property));
                }
            }
            SpecificationEvent::RemoveProperty { section, property } => {
                next.sections_mut(section).retain(|s| s.property != property);
            }
            SpecificationEvent::AddStatement { section, statement } => {
                let target = next.section_entry(section, statement.property());
                target.statements.push(statement);
            }
            SpecificationEvent::RemoveStatement {
                section,
                property,
                index,
            } => {
                let target = next
                    .sections_mut(section)
                    .iter_mut()
                    .find(|s| s.property == property)
                    .ok_or_else(|| {
                        Error::InvalidInput(format!("No {} section for {}", section, property))
                    })?;
                if index >= target.statements.len() {
                    return Err(Error::InvalidInput(format!(
                        "Statement index {} out of range for {} section {}",
                        index, section, property
                    )));
                }
                target.statements.remove(index);
            }
            SpecificationEvent::SetStatements {
                section,
                property,
                statements,
            } => {
                if let Some(stray) = statements.iter().find(|s| s.property() != &property) {
                    return Err(Error::InvalidInput(format!(
                        "Statement for {} does not belong in the {} section",
                        stray.property(),
                        property
                    )));
                }
                next.section_entry(section, &property).statements = statements;
            }
        }

        Ok(next)
    }

    fn sections_mut(&mut self, kind: SectionKind) -> &mut Vec<StatementSection> {
        match kind {
            SectionKind::Add => &mut self.add,
            SectionKind::Remove => &mut self.remove,
        }
    }

    fn section_entry(&mut self, kind: SectionKind, property: &PropertyId) -> &mut StatementSection {
        let sections = self.sections_mut(kind);
        let index = match sections.iter().position(|s| &s.property == property) {
            Some(index) => index,
            None => {
                sections.push(StatementSection::new(property.clone()));
                sections.len() - 1
            }
        };
        &mut sections[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acdc_common::datamodel::Snak;

    fn p(id: &str) -> PropertyId {
        PropertyId::parse(id).unwrap()
    }

    #[test]
    fn test_add_titles_normalizes_and_dedupes() {
        let spec = BatchSpecification::new()
            .apply(SpecificationEvent::AddTitles {
                titles: vec!["A.jpg".into(), "File:A.jpg".into(), " ".into(), "B.jpg".into()],
            })
            .unwrap();
        assert_eq!(spec.titles(), &["File:A.jpg", "File:B.jpg"]);
    }

    #[test]
    fn test_apply_leaves_previous_snapshot_untouched() {
        let before = BatchSpecification::new();
        let after = before
            .apply(SpecificationEvent::AddTitles {
                titles: vec!["A.jpg".into()],
            })
            .unwrap();
        assert!(before.titles().is_empty());
        assert_eq!(after.titles().len(), 1);
    }

    #[test]
    fn test_add_statement_opens_section() {
        let spec = BatchSpecification::new()
            .apply(SpecificationEvent::AddStatement {
                section: SectionKind::Add,
                statement: DesiredStatement::new(Snak::item(p("P180"), "Q146")),
            })
            .unwrap();
        let section = spec.section(SectionKind::Add, &p("P180")).unwrap();
        assert_eq!(section.statements.len(), 1);
        assert!(spec.remove_sections().is_empty());
        assert_eq!(spec.statements_per_entity(), 1);
    }

    #[test]
    fn test_remove_statement_out_of_range() {
        let spec = BatchSpecification::new()
            .apply(SpecificationEvent::AddProperty {
                section: SectionKind::Remove,
                property: p("P1"),
            })
            .unwrap();
        let result = spec.apply(SpecificationEvent::RemoveStatement {
            section: SectionKind::Remove,
            property: p("P1"),
            index: 0,
        });
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_set_statements_rejects_foreign_property() {
        let result = BatchSpecification::new().apply(SpecificationEvent::SetStatements {
            section: SectionKind::Add,
            property: p("P1"),
            statements: vec![DesiredStatement::new(Snak::item(p("P2"), "Q1"))],
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_title_completed_removes_title() {
        let spec = BatchSpecification::from_events([
            SpecificationEvent::AddTitles {
                titles: vec!["A.jpg".into(), "B.jpg".into()],
            },
            SpecificationEvent::TitleCompleted {
                title: "File:A.jpg".into(),
            },
        ])
        .unwrap();
        assert_eq!(spec.titles(), &["File:B.jpg"]);
    }

    #[test]
    fn test_event_json_shape() {
        let event: SpecificationEvent = serde_json::from_str(
            r#"{"type":"add_property","section":"remove","property":"P180"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            SpecificationEvent::AddProperty {
                section: SectionKind::Remove,
                property: p("P180"),
            }
        );
    }
}
