//! Qualifier sets

use serde::{Deserialize, Serialize};

use super::ids::PropertyId;
use super::snak::Snak;

/// Qualifiers attached to a statement
///
/// Grouped by qualifier property. The order of the groups is kept for
/// serialization (`qualifiers-order`) but is irrelevant for equality; the
/// order of snaks inside one group is significant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Snak>", into = "Vec<Snak>")]
pub struct QualifierSet {
    groups: Vec<(PropertyId, Vec<Snak>)>,
}

impl QualifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of qualifier snaks
    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, snaks)| snaks.len()).sum()
    }

    /// Append a qualifier to the group of its property
    pub fn push(&mut self, snak: Snak) {
        match self.groups.iter_mut().find(|(p, _)| *p == snak.property) {
            Some((_, snaks)) => snaks.push(snak),
            None => self.groups.push((snak.property.clone(), vec![snak])),
        }
    }

    pub fn get(&self, property: &PropertyId) -> Option<&[Snak]> {
        self.groups
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, snaks)| snaks.as_slice())
    }

    /// Qualifier properties in group order
    pub fn properties(&self) -> impl Iterator<Item = &PropertyId> {
        self.groups.iter().map(|(p, _)| p)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&PropertyId, &[Snak])> {
        self.groups.iter().map(|(p, snaks)| (p, snaks.as_slice()))
    }

    /// All qualifier snaks, group by group
    pub fn iter(&self) -> impl Iterator<Item = &Snak> {
        self.groups.iter().flat_map(|(_, snaks)| snaks.iter())
    }

    /// Merge `incoming` on top of this set
    ///
    /// Groups whose property only exists here are kept as they are. For a
    /// property present in `incoming`, its snak list replaces the existing
    /// list for that property; new properties are appended in incoming order.
    pub fn merge(&mut self, incoming: &QualifierSet) {
        for (property, snaks) in &incoming.groups {
            match self.groups.iter_mut().find(|(p, _)| p == property) {
                Some((_, existing)) => *existing = snaks.clone(),
                None => self.groups.push((property.clone(), snaks.clone())),
            }
        }
    }
}

impl PartialEq for QualifierSet {
    fn eq(&self, other: &Self) -> bool {
        self.groups.len() == other.groups.len()
            && self
                .groups
                .iter()
                .all(|(property, snaks)| other.get(property) == Some(snaks.as_slice()))
    }
}

impl Eq for QualifierSet {}

impl FromIterator<Snak> for QualifierSet {
    fn from_iter<T: IntoIterator<Item = Snak>>(iter: T) -> Self {
        let mut set = QualifierSet::new();
        for snak in iter {
            set.push(snak);
        }
        set
    }
}

impl From<Vec<Snak>> for QualifierSet {
    fn from(snaks: Vec<Snak>) -> Self {
        snaks.into_iter().collect()
    }
}

impl From<QualifierSet> for Vec<Snak> {
    fn from(set: QualifierSet) -> Self {
        set.groups.into_iter().flat_map(|(_, snaks)| snaks).collect()
    }
}
