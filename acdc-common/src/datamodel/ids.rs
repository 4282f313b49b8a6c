//! Entity and property identifiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Stable identifier of an entity, e.g. `M12345` for the structured data of a file page
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// MediaInfo entity ID of the file page with the given page ID
    pub fn for_page(page_id: u64) -> Self {
        Self(format!("M{}", page_id))
    }

    pub fn parse(input: &str) -> Result<Self> {
        let normalized = normalize_id(input);
        if is_prefixed_number(&normalized, |c| c.is_ascii_uppercase()) {
            Ok(Self(normalized))
        } else {
            Err(Error::InvalidId(format!("not an entity ID: {:?}", input)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Entity type letter (`M`, `Q`, `P`, ...)
    pub fn kind(&self) -> char {
        self.0.chars().next().unwrap_or('?')
    }

    /// Numeric part of the ID
    pub fn numeric_id(&self) -> u64 {
        self.0[1..].parse().unwrap_or(0)
    }
}

/// Identifier of a statement property, e.g. `P180`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyId(String);

impl PropertyId {
    pub fn parse(input: &str) -> Result<Self> {
        let normalized = normalize_id(input);
        if is_prefixed_number(&normalized, |c| c == 'P') {
            Ok(Self(normalized))
        } else {
            Err(Error::InvalidId(format!("not a property ID: {:?}", input)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize_id(input: &str) -> String {
    let trimmed = input.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// `<letter><digits>` without leading zero
fn is_prefixed_number(id: &str, letter: impl Fn(char) -> bool) -> bool {
    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let digits = chars.as_str();
    letter(first)
        && !digits.is_empty()
        && !digits.starts_with('0')
        && digits.chars().all(|c| c.is_ascii_digit())
}

macro_rules! id_conversions {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                Self::parse(&value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }
    };
}

id_conversions!(EntityId);
id_conversions!(PropertyId);
