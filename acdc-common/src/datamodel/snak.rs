//! Snaks: a property paired with a value (or the explicit absence of one)

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{EntityId, PropertyId};
use super::wire::SnakJson;

/// Value carried by a value snak
///
/// Entity references and plain strings are modelled explicitly; every other
/// data value type (time, quantity, coordinates, ...) is carried through as
/// its raw JSON so it compares structurally and round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue {
    /// Reference to another entity (`wikibase-entityid`), e.g. `Q146`
    EntityId(String),
    /// Plain string value (`string`)
    String(String),
    /// Any other data value type
    Other {
        value_type: String,
        value: serde_json::Value,
    },
}

impl DataValue {
    pub fn item(id: impl Into<String>) -> Self {
        DataValue::EntityId(id.into())
    }

    pub fn entity(id: &EntityId) -> Self {
        DataValue::EntityId(id.to_string())
    }

    /// Wikibase data value type name
    pub fn value_type(&self) -> &str {
        match self {
            DataValue::EntityId(_) => "wikibase-entityid",
            DataValue::String(_) => "string",
            DataValue::Other { value_type, .. } => value_type,
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::EntityId(id) => f.write_str(id),
            DataValue::String(s) => write!(f, "{:?}", s),
            DataValue::Other { value_type, value } => write!(f, "{}:{}", value_type, value),
        }
    }
}

/// Value part of a snak
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnakValue {
    Value(DataValue),
    NoValue,
    /// "Unknown value" snaks only appear in existing data and are passed through untouched
    SomeValue,
}

/// A property/value pair, used both as a statement's main snak and as a qualifier
///
/// Equality is structural: property plus value. Snak hashes and datatype
/// annotations delivered by the API are not part of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SnakJson", into = "SnakJson")]
pub struct Snak {
    pub property: PropertyId,
    pub value: SnakValue,
}

impl Snak {
    pub fn value(property: PropertyId, value: DataValue) -> Self {
        Self {
            property,
            value: SnakValue::Value(value),
        }
    }

    pub fn no_value(property: PropertyId) -> Self {
        Self {
            property,
            value: SnakValue::NoValue,
        }
    }

    /// Value snak referencing an item, e.g. `P180: Q146`
    pub fn item(property: PropertyId, item_id: impl Into<String>) -> Self {
        Self::value(property, DataValue::item(item_id))
    }

    pub fn string(property: PropertyId, value: impl Into<String>) -> Self {
        Self::value(property, DataValue::String(value.into()))
    }
}

impl fmt::Display for Snak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            SnakValue::Value(value) => write!(f, "{}: {}", self.property, value),
            SnakValue::NoValue => write!(f, "{}: <no value>", self.property),
            SnakValue::SomeValue => write!(f, "{}: <unknown value>", self.property),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: &str) -> PropertyId {
        PropertyId::parse(id).unwrap()
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(Snak::item(p("P1"), "Q10"), Snak::item(p("P1"), "Q10"));
        assert_ne!(Snak::item(p("P1"), "Q10"), Snak::item(p("P1"), "Q11"));
        assert_ne!(Snak::item(p("P1"), "Q10"), Snak::item(p("P2"), "Q10"));
        assert_ne!(Snak::item(p("P1"), "Q10"), Snak::no_value(p("P1")));
        assert_ne!(Snak::item(p("P1"), "Q10"), Snak::string(p("P1"), "Q10"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Snak::item(p("P1"), "Q10").to_string(), "P1: Q10");
        assert_eq!(Snak::no_value(p("P3")).to_string(), "P3: <no value>");
        assert_eq!(Snak::string(p("P2"), "x").to_string(), "P2: \"x\"");
    }
}
