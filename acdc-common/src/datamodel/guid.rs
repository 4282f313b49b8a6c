//! Statement GUIDs

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::EntityId;
use crate::{Error, Result};

/// Globally unique statement identifier: `<entity ID>$<UUID>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Guid(String);

impl Guid {
    pub fn new(entity_id: &EntityId, uuid: Uuid) -> Self {
        Self(format!(
            "{}${}",
            entity_id,
            uuid.hyphenated().to_string().to_uppercase()
        ))
    }

    pub fn parse(input: &str) -> Result<Self> {
        match input.split_once('$') {
            Some((entity, rest)) if !entity.is_empty() && !rest.is_empty() => {
                Ok(Self(input.to_string()))
            }
            _ => Err(Error::InvalidId(format!("not a statement GUID: {:?}", input))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Entity part of the GUID (before the `$`)
    pub fn entity_part(&self) -> &str {
        self.0.split_once('$').map(|(entity, _)| entity).unwrap_or("")
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Guid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Guid::parse(&value)
    }
}

impl From<Guid> for String {
    fn from(value: Guid) -> Self {
        value.0
    }
}

/// GUID of the `counter`-th statement created on `entity_id` within one batch run
///
/// Deterministic for a given run namespace; distinct namespaces (one per run)
/// keep GUIDs unique across runs.
pub fn statement_guid(run_namespace: &Uuid, entity_id: &EntityId, counter: u64) -> Guid {
    let name = format!("{}#{}", entity_id, counter);
    Guid::new(entity_id, Uuid::new_v5(run_namespace, name.as_bytes()))
}

/// Hands out GUIDs for one entity, advancing a counter owned by the batch run
pub struct GuidSequence<'a> {
    run_namespace: Uuid,
    entity_id: &'a EntityId,
    counter: &'a mut u64,
}

impl<'a> GuidSequence<'a> {
    pub fn new(run_namespace: Uuid, entity_id: &'a EntityId, counter: &'a mut u64) -> Self {
        Self {
            run_namespace,
            entity_id,
            counter,
        }
    }

    pub fn next_guid(&mut self) -> Guid {
        let guid = statement_guid(&self.run_namespace, self.entity_id, *self.counter);
        *self.counter += 1;
        guid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_is_deterministic() {
        let ns = Uuid::new_v4();
        let entity = EntityId::for_page(42);
        assert_eq!(statement_guid(&ns, &entity, 0), statement_guid(&ns, &entity, 0));
        assert_ne!(statement_guid(&ns, &entity, 0), statement_guid(&ns, &entity, 1));
    }

    #[test]
    fn test_guid_scoped_to_entity_and_run() {
        let ns = Uuid::new_v4();
        let a = statement_guid(&ns, &EntityId::for_page(1), 0);
        let b = statement_guid(&ns, &EntityId::for_page(2), 0);
        let c = statement_guid(&Uuid::new_v4(), &EntityId::for_page(1), 0);

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.entity_part(), "M1");
        assert!(a.as_str().starts_with("M1$"));
    }

    #[test]
    fn test_sequence_never_reuses_counter() {
        let ns = Uuid::new_v4();
        let entity = EntityId::for_page(7);
        let mut counter = 0;

        let first = GuidSequence::new(ns, &entity, &mut counter).next_guid();
        let second = GuidSequence::new(ns, &entity, &mut counter).next_guid();

        assert_ne!(first, second);
        assert_eq!(counter, 2);
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        assert!(Guid::parse("M1$ABC").is_ok());
        assert!(Guid::parse("M1ABC").is_err());
        assert!(Guid::parse("$ABC").is_err());
    }
}
