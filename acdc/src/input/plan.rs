//! Batch plan files
//!
//! A plan describes one batch non-interactively. Format is picked by file
//! extension (`.json`, anything else is TOML):
//!
//! ```toml
//! files = ["File:Example.jpg", "Other.png"]
//! category = "Category:Maps"     # optional
//! pagepile = 12345               # optional
//!
//! [[add]]
//! property = "P180"
//! value = "Q146"
//! rank = "preferred"
//! qualifiers = [{ property = "P462", value = "Q23444" }]
//!
//! [[remove]]
//! property = "P180"
//! value = "Q5"
//! ```

use std::path::Path;

use acdc_common::datamodel::{DataValue, DesiredStatement, PropertyId, Rank, Snak};
use acdc_common::{Error, Result};
use serde::{Deserialize, Serialize};

use super::specification::{BatchSpecification, SectionKind, SpecificationEvent};

/// Kind of value a plan entry declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanValue {
    #[default]
    Item,
    String,
    NoValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanQualifier {
    pub property: String,
    pub value: Option<String>,
    #[serde(default)]
    pub value_type: PlanValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStatement {
    pub property: String,
    pub value: Option<String>,
    #[serde(default)]
    pub value_type: PlanValue,
    #[serde(default)]
    pub rank: Rank,
    #[serde(default)]
    pub qualifiers: Vec<PlanQualifier>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    #[serde(default)]
    pub files: Vec<String>,
    pub category: Option<String>,
    pub pagepile: Option<u64>,
    #[serde(default)]
    pub add: Vec<PlanStatement>,
    #[serde(default)]
    pub remove: Vec<PlanStatement>,
}

impl BatchPlan {
    /// Reducer events equivalent to this plan's files and statements
    ///
    /// Category and PagePile sources are not expanded here; they need the
    /// network and are loaded by the caller.
    pub fn events(&self) -> Result<Vec<SpecificationEvent>> {
        let mut events = Vec::new();
        if !self.files.is_empty() {
            events.push(SpecificationEvent::AddTitles {
                titles: self.files.clone(),
            });
        }
        for entry in &self.add {
            events.push(SpecificationEvent::AddStatement {
                section: SectionKind::Add,
                statement: entry.to_desired()?,
            });
        }
        for entry in &self.remove {
            events.push(SpecificationEvent::AddStatement {
                section: SectionKind::Remove,
                statement: entry.to_desired()?,
            });
        }
        Ok(events)
    }

    pub fn to_specification(&self) -> Result<BatchSpecification> {
        BatchSpecification::from_events(self.events()?)
    }
}

impl PlanStatement {
    pub fn to_desired(&self) -> Result<DesiredStatement> {
        let main_snak = build_snak(&self.property, self.value.as_deref(), self.value_type)?;
        let mut desired = DesiredStatement::new(main_snak).with_rank(self.rank);
        for qualifier in &self.qualifiers {
            desired = desired.with_qualifier(build_snak(
                &qualifier.property,
                qualifier.value.as_deref(),
                qualifier.value_type,
            )?);
        }
        Ok(desired)
    }
}

fn build_snak(property: &str, value: Option<&str>, value_type: PlanValue) -> Result<Snak> {
    let property = PropertyId::parse(property)?;
    let value = value.map(str::trim).filter(|v| !v.is_empty());

    match (value_type, value) {
        (PlanValue::NoValue, None) => Ok(Snak::no_value(property)),
        (PlanValue::NoValue, Some(v)) => Err(Error::InvalidInput(format!(
            "{}: novalue entries must not carry a value (got '{}')",
            property, v
        ))),
        (PlanValue::Item, Some(v)) => {
            let id = v.to_uppercase();
            let valid = id.len() > 1
                && id.starts_with(['Q', 'M', 'P', 'L'])
                && id[1..].chars().all(|c| c.is_ascii_digit());
            if !valid {
                return Err(Error::InvalidInput(format!(
                    "{}: '{}' is not an entity ID",
                    property, v
                )));
            }
            Ok(Snak::value(property, DataValue::item(id)))
        }
        (PlanValue::String, Some(v)) => Ok(Snak::string(property, v)),
        (_, None) => Err(Error::InvalidInput(format!("{}: value missing", property))),
    }
}

/// Read a plan from a `.toml` or `.json` file
pub fn load_plan(path: &Path) -> Result<BatchPlan> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        toml::from_str(&content).map_err(|e| {
            Error::InvalidInput(format!("Parse {} failed: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acdc_common::datamodel::SnakValue;

    #[test]
    fn test_toml_plan_to_specification() {
        let plan: BatchPlan = toml::from_str(
            r#"
            files = ["Example.jpg", "File:Other.png"]

            [[add]]
            property = "P180"
            value = "q146"
            rank = "preferred"
            qualifiers = [{ property = "P462", value = "Q23444" }]

            [[remove]]
            property = "P1163"
            value = "image/jpeg"
            value_type = "string"
            "#,
        )
        .unwrap();

        let spec = plan.to_specification().unwrap();
        assert_eq!(spec.titles(), &["File:Example.jpg", "File:Other.png"]);

        let add = &spec.add_sections()[0];
        assert_eq!(add.property.as_str(), "P180");
        assert_eq!(add.statements[0].rank, Rank::Preferred);
        assert_eq!(add.statements[0].main_snak.to_string(), "P180: Q146");
        assert_eq!(add.statements[0].qualifiers.len(), 1);

        let remove = &spec.remove_sections()[0];
        assert_eq!(remove.statements[0].main_snak.to_string(), "P1163: \"image/jpeg\"");
    }

    #[test]
    fn test_novalue_entry() {
        let entry = PlanStatement {
            property: "P180".into(),
            value: None,
            value_type: PlanValue::NoValue,
            rank: Rank::Normal,
            qualifiers: Vec::new(),
        };
        assert_eq!(entry.to_desired().unwrap().main_snak.value, SnakValue::NoValue);
    }

    #[test]
    fn test_invalid_entries_rejected() {
        assert!(build_snak("P180", None, PlanValue::Item).is_err());
        assert!(build_snak("P180", Some("cat"), PlanValue::Item).is_err());
        assert!(build_snak("X180", Some("Q1"), PlanValue::Item).is_err());
        assert!(build_snak("P180", Some("Q1"), PlanValue::NoValue).is_err());
    }
}
