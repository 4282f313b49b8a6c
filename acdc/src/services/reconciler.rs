//! Statement reconciliation
//!
//! Compares the statements an entity already has for one property with the
//! statements the user wants added or removed, and computes the writes needed
//! to converge. Everything here is pure: the caller fetched the entity state
//! once up front and executes the returned operations afterwards.

use acdc_common::datamodel::{
    DesiredStatement, EntityRecord, Guid, GuidSequence, PropertyId, Rank, Snak, Statement,
};
use tracing::warn;

use crate::input::StatementSection;

/// One write that adds information to an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOperation {
    /// Brand-new statement under a freshly derived GUID
    Create(Statement),
    /// Replacement of an existing statement, same GUID
    Update(Statement),
}

impl AddOperation {
    pub fn statement(&self) -> &Statement {
        match self {
            AddOperation::Create(statement) | AddOperation::Update(statement) => statement,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, AddOperation::Create(_))
    }
}

/// Deletion of one existing statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOperation {
    pub guid: Guid,
    pub main_snak: Snak,
}

/// Operations for one entity, grouped by property in section order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityPlan {
    pub additions: Vec<(PropertyId, Vec<AddOperation>)>,
    pub removals: Vec<(PropertyId, Vec<RemoveOperation>)>,
}

impl EntityPlan {
    pub fn write_count(&self) -> usize {
        self.additions.iter().map(|(_, ops)| ops.len()).sum::<usize>()
            + self.removals.iter().map(|(_, ops)| ops.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.write_count() == 0
    }
}

/// Compute add operations for one property
///
/// `existing` is the entity's current statement group for the property and
/// `desired` the add section for it. Each desired statement is matched
/// against the first existing statement with an equal main snak; unmatched
/// ones become creates, matched ones become merge-updates unless already
/// satisfied.
pub fn reconcile_additions(
    existing: &[Statement],
    desired: &[DesiredStatement],
    guids: &mut GuidSequence<'_>,
) -> Vec<AddOperation> {
    let mut operations = Vec::new();

    for wanted in desired {
        let Some(current) = existing.iter().find(|s| s.main_snak == wanted.main_snak) else {
            operations.push(AddOperation::Create(Statement::from_desired(
                guids.next_guid(),
                wanted,
            )));
            continue;
        };

        if current.matches_desired(wanted) {
            continue;
        }

        let candidate = merge_into_existing(current, wanted);
        if candidate != *current {
            operations.push(AddOperation::Update(candidate));
        }
    }

    operations
}

/// Merge a desired statement into a copy of a matching existing one
///
/// The copy keeps its GUID, references and any qualifier property the
/// desired statement does not mention; qualifier properties it does mention
/// take the desired snak list. Rank only moves away from Normal.
pub fn merge_into_existing(existing: &Statement, desired: &DesiredStatement) -> Statement {
    let mut candidate = existing.clone();
    candidate.qualifiers.merge(&desired.qualifiers);

    if desired.rank != Rank::Normal && existing.rank == Rank::Normal {
        candidate.rank = desired.rank;
    }

    candidate
}

/// Compute remove operations for one property
///
/// Matching is by main snak only; qualifiers and rank of the existing
/// statements are ignored. More than one match is unexpected but not fatal:
/// every match is removed.
pub fn reconcile_removals(
    existing: &[Statement],
    to_remove: &[DesiredStatement],
) -> Vec<RemoveOperation> {
    let mut operations = Vec::new();

    for unwanted in to_remove {
        let matches: Vec<&Statement> = existing
            .iter()
            .filter(|s| s.main_snak == unwanted.main_snak)
            .collect();

        if matches.len() > 1 {
            warn!(
                property = %unwanted.property(),
                "{} statements match '{}', removing all of them",
                matches.len(),
                unwanted.main_snak
            );
        }

        operations.extend(matches.into_iter().map(|s| RemoveOperation {
            guid: s.id.clone(),
            main_snak: s.main_snak.clone(),
        }));
    }

    operations
}

/// Reconcile every add and remove section against one entity
pub fn plan_entity(
    record: &EntityRecord,
    add_sections: &[StatementSection],
    remove_sections: &[StatementSection],
    guids: &mut GuidSequence<'_>,
) -> EntityPlan {
    let additions = add_sections
        .iter()
        .map(|section| {
            let existing = record.statements_for(&section.property);
            (
                section.property.clone(),
                reconcile_additions(existing, &section.statements, guids),
            )
        })
        .collect();

    let removals = remove_sections
        .iter()
        .map(|section| {
            let existing = record.statements_for(&section.property);
            (
                section.property.clone(),
                reconcile_removals(existing, &section.statements),
            )
        })
        .collect();

    EntityPlan {
        additions,
        removals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acdc_common::datamodel::{EntityId, QualifierSet};
    use uuid::Uuid;

    fn p(id: &str) -> PropertyId {
        PropertyId::parse(id).unwrap()
    }

    fn existing(guid: &str, property: &str, item: &str) -> Statement {
        Statement {
            id: Guid::parse(guid).unwrap(),
            main_snak: Snak::item(p(property), item),
            qualifiers: QualifierSet::new(),
            rank: Rank::Normal,
            references: Vec::new(),
        }
    }

    #[test]
    fn test_subset_qualifiers_are_a_no_op() {
        let mut current = existing("M1$g1", "P1", "Q10");
        current.qualifiers.push(Snak::item(p("P2"), "Q20"));
        current.qualifiers.push(Snak::item(p("P3"), "Q30"));

        let wanted = DesiredStatement::new(Snak::item(p("P1"), "Q10"))
            .with_qualifier(Snak::item(p("P2"), "Q20"));

        let entity = EntityId::parse("M1").unwrap();
        let mut counter = 0;
        let mut guids = GuidSequence::new(Uuid::nil(), &entity, &mut counter);
        let ops = reconcile_additions(&[current], &[wanted], &mut guids);
        assert!(ops.is_empty());
        assert_eq!(counter, 0);
    }

    #[test]
    fn test_rank_never_demoted() {
        let mut current = existing("M1$g1", "P1", "Q10");
        current.rank = Rank::Preferred;
        let wanted = DesiredStatement::new(Snak::item(p("P1"), "Q10"));

        let merged = merge_into_existing(&current, &wanted);
        assert_eq!(merged.rank, Rank::Preferred);
        assert_eq!(merged, current);
    }

    #[test]
    fn test_deprecated_not_overridden_by_preferred() {
        let mut current = existing("M1$g1", "P1", "Q10");
        current.rank = Rank::Deprecated;
        let wanted =
            DesiredStatement::new(Snak::item(p("P1"), "Q10")).with_rank(Rank::Preferred);

        assert_eq!(merge_into_existing(&current, &wanted).rank, Rank::Deprecated);
    }

    #[test]
    fn test_references_preserved_on_update() {
        let mut current = existing("M1$g1", "P1", "Q10");
        current.references = vec![serde_json::json!({"hash": "abc", "snaks": {}})];
        let wanted = DesiredStatement::new(Snak::item(p("P1"), "Q10"))
            .with_qualifier(Snak::item(p("P2"), "Q20"));

        let merged = merge_into_existing(&current, &wanted);
        assert_eq!(merged.references, current.references);
        assert_eq!(merged.id, current.id);
    }

    #[test]
    fn test_removal_ignores_qualifiers_and_rank() {
        let mut current = existing("M1$g1", "P1", "Q10");
        current.rank = Rank::Preferred;
        current.qualifiers.push(Snak::item(p("P2"), "Q20"));

        let ops = reconcile_removals(
            &[current],
            &[DesiredStatement::new(Snak::item(p("P1"), "Q10"))],
        );
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].guid.as_str(), "M1$g1");
    }

    #[test]
    fn test_removal_of_absent_value_is_empty() {
        let ops = reconcile_removals(
            &[existing("M1$g1", "P1", "Q10")],
            &[DesiredStatement::new(Snak::item(p("P1"), "Q99"))],
        );
        assert!(ops.is_empty());
    }
}
