//! Wikibase JSON serialization of snaks, statements and entities
//!
//! Shapes follow `wbgetentities` output and `wbsetclaim` input. Snak hashes
//! and datatype annotations are accepted on input and dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use super::entity::{EntityRecord, StatementGroup};
use super::guid::Guid;
use super::ids::{EntityId, PropertyId};
use super::qualifiers::QualifierSet;
use super::snak::{DataValue, Snak, SnakValue};
use super::statement::{Rank, Statement};
use crate::Error;

// ============================================================================
// Snaks
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SnakJson {
    snaktype: String,
    property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datavalue: Option<DataValueJson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DataValueJson {
    value: Value,
    #[serde(rename = "type")]
    value_type: String,
}

impl TryFrom<SnakJson> for Snak {
    type Error = Error;

    fn try_from(json: SnakJson) -> Result<Self, Self::Error> {
        let property = PropertyId::parse(&json.property)?;
        let value = match json.snaktype.as_str() {
            "value" => {
                let datavalue = json.datavalue.ok_or_else(|| {
                    Error::InvalidInput(format!("value snak for {} has no datavalue", property))
                })?;
                SnakValue::Value(datavalue.into())
            }
            "novalue" => SnakValue::NoValue,
            "somevalue" => SnakValue::SomeValue,
            other => {
                return Err(Error::InvalidInput(format!(
                    "unsupported snak type {:?} for {}",
                    other, property
                )))
            }
        };
        Ok(Snak { property, value })
    }
}

impl From<Snak> for SnakJson {
    fn from(snak: Snak) -> Self {
        let (snaktype, datavalue) = match snak.value {
            SnakValue::Value(value) => ("value", Some(value.into())),
            SnakValue::NoValue => ("novalue", None),
            SnakValue::SomeValue => ("somevalue", None),
        };
        SnakJson {
            snaktype: snaktype.to_string(),
            property: snak.property.into(),
            datavalue,
        }
    }
}

impl From<DataValueJson> for DataValue {
    fn from(json: DataValueJson) -> Self {
        match json.value_type.as_str() {
            "wikibase-entityid" => match entity_id_from_value(&json.value) {
                Some(id) => DataValue::EntityId(id),
                None => DataValue::Other {
                    value_type: json.value_type,
                    value: json.value,
                },
            },
            "string" => match json.value {
                Value::String(s) => DataValue::String(s),
                value => DataValue::Other {
                    value_type: json.value_type,
                    value,
                },
            },
            _ => DataValue::Other {
                value_type: json.value_type,
                value: json.value,
            },
        }
    }
}

impl From<DataValue> for DataValueJson {
    fn from(value: DataValue) -> Self {
        match value {
            DataValue::EntityId(id) => DataValueJson {
                value: entity_id_value(&id),
                value_type: "wikibase-entityid".to_string(),
            },
            DataValue::String(s) => DataValueJson {
                value: Value::String(s),
                value_type: "string".to_string(),
            },
            DataValue::Other { value_type, value } => DataValueJson { value, value_type },
        }
    }
}

fn entity_type_prefix(entity_type: &str) -> Option<char> {
    match entity_type {
        "item" => Some('Q'),
        "property" => Some('P'),
        "lexeme" => Some('L'),
        "mediainfo" => Some('M'),
        _ => None,
    }
}

fn entity_id_from_value(value: &Value) -> Option<String> {
    if let Some(id) = value.get("id").and_then(Value::as_str) {
        return Some(id.to_string());
    }
    let numeric_id = value.get("numeric-id")?.as_u64()?;
    let prefix = entity_type_prefix(value.get("entity-type")?.as_str()?)?;
    Some(format!("{}{}", prefix, numeric_id))
}

fn entity_id_value(id: &str) -> Value {
    let entity_type = match id.chars().next() {
        Some('Q') => Some("item"),
        Some('P') => Some("property"),
        Some('L') => Some("lexeme"),
        Some('M') => Some("mediainfo"),
        _ => None,
    };
    let numeric_id = id.get(1..).and_then(|digits| digits.parse::<u64>().ok());
    match (entity_type, numeric_id) {
        (Some(entity_type), Some(numeric_id)) => json!({
            "entity-type": entity_type,
            "numeric-id": numeric_id,
            "id": id,
        }),
        _ => json!({ "id": id }),
    }
}

// ============================================================================
// Statements
// ============================================================================

fn statement_type() -> String {
    "statement".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StatementJson {
    mainsnak: SnakJson,
    #[serde(rename = "type", default = "statement_type")]
    kind: String,
    id: String,
    #[serde(default)]
    rank: Rank,
    #[serde(
        default,
        deserialize_with = "map_or_empty_list",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    qualifiers: BTreeMap<String, Vec<SnakJson>>,
    #[serde(
        rename = "qualifiers-order",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    qualifiers_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    references: Vec<Value>,
}

impl TryFrom<StatementJson> for Statement {
    type Error = Error;

    fn try_from(mut json: StatementJson) -> Result<Self, Self::Error> {
        let mut qualifiers = QualifierSet::new();
        let mut ordered: Vec<Vec<SnakJson>> = Vec::new();
        for property in &json.qualifiers_order {
            if let Some(snaks) = json.qualifiers.remove(property) {
                ordered.push(snaks);
            }
        }
        // properties missing from qualifiers-order follow in key order
        ordered.extend(std::mem::take(&mut json.qualifiers).into_values());
        for snak in ordered.into_iter().flatten() {
            qualifiers.push(Snak::try_from(snak)?);
        }

        Ok(Statement {
            id: Guid::parse(&json.id)?,
            main_snak: Snak::try_from(json.mainsnak)?,
            qualifiers,
            rank: json.rank,
            references: json.references,
        })
    }
}

impl From<Statement> for StatementJson {
    fn from(statement: Statement) -> Self {
        let qualifiers_order: Vec<String> = statement
            .qualifiers
            .properties()
            .map(|p| p.to_string())
            .collect();
        let mut qualifiers: BTreeMap<String, Vec<SnakJson>> = BTreeMap::new();
        for snak in Vec::<Snak>::from(statement.qualifiers) {
            qualifiers
                .entry(snak.property.to_string())
                .or_default()
                .push(snak.into());
        }

        StatementJson {
            mainsnak: statement.main_snak.into(),
            kind: statement_type(),
            id: statement.id.into(),
            rank: statement.rank,
            qualifiers,
            qualifiers_order,
            references: statement.references,
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct EntityJson {
    id: String,
    #[serde(default)]
    lastrevid: Option<u64>,
    #[serde(default)]
    missing: Option<Value>,
    #[serde(default, alias = "claims", deserialize_with = "map_or_empty_list")]
    statements: BTreeMap<String, Vec<StatementJson>>,
}

impl TryFrom<EntityJson> for EntityRecord {
    type Error = Error;

    fn try_from(json: EntityJson) -> Result<Self, Self::Error> {
        let mut statements = BTreeMap::new();
        for (property, group) in json.statements {
            let property = PropertyId::parse(&property)?;
            let group = group
                .into_iter()
                .map(Statement::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            statements.insert(property, StatementGroup::new(group));
        }

        Ok(EntityRecord {
            id: EntityId::parse(&json.id)?,
            last_revision: json.lastrevid,
            missing: json.missing.is_some(),
            statements,
        })
    }
}

/// PHP serializes empty objects as `[]`; accept both shapes
fn map_or_empty_list<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList<T> {
        Map(BTreeMap<String, T>),
        List(Vec<Value>),
    }

    match MapOrList::<T>::deserialize(deserializer)? {
        MapOrList::Map(map) => Ok(map),
        MapOrList::List(list) if list.is_empty() => Ok(BTreeMap::new()),
        MapOrList::List(_) => Err(serde::de::Error::custom(
            "expected an object or an empty list",
        )),
    }
}
