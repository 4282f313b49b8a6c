//! MediaWiki / Wikibase API access
//!
//! [`WikiApi`] is the narrow interface the batch core depends on: batched
//! title lookup, batched entity fetch, conditional statement writes, and the
//! listing helpers used to collect titles. [`MediaWikiClient`] implements it
//! against the action API over HTTP.

mod client;

pub use client::MediaWikiClient;

use std::collections::BTreeMap;

use acdc_common::datamodel::{EntityId, EntityRecord, Guid, Statement};
use async_trait::async_trait;
use thiserror::Error;

/// Maximum number of titles or IDs per lookup request
pub const PAGE_SIZE_LIMIT: usize = 50;

/// API client errors
#[derive(Debug, Error)]
pub enum WikiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {0}: {1}")]
    Http(u16, String),

    /// Write rejected because the entity changed since the base revision
    #[error("Edit conflict: {0}")]
    EditConflict(String),

    #[error("API error {code}: {info}")]
    Api { code: String, info: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl WikiError {
    /// Build the error for an API error code, singling out edit conflicts
    pub fn from_api(code: impl Into<String>, info: impl Into<String>) -> Self {
        let code = code.into();
        let info = info.into();
        match code.as_str() {
            "editconflict" | "edit-conflict" => WikiError::EditConflict(info),
            "assertuserfailed" | "assertnameduserfailed" | "notloggedin" => WikiError::Auth(info),
            _ => WikiError::Api { code, info },
        }
    }

    pub fn is_edit_conflict(&self) -> bool {
        matches!(self, WikiError::EditConflict(_))
    }
}

/// One page returned by a title query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub title: String,
    /// `None` when the page does not exist (or the title is invalid)
    pub page_id: Option<u64>,
}

/// Result of one batched title query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub pages: Vec<PageInfo>,
    /// Title normalizations applied by the wiki, `(from, to)`
    pub normalized: Vec<(String, String)>,
}

/// Opaque continuation parameters of a paginated list query
pub type Continuation = BTreeMap<String, String>;

/// One page of category members
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMembers {
    pub titles: Vec<String>,
    pub continuation: Option<Continuation>,
}

/// Capabilities of the wiki consumed by the batch core
#[async_trait]
pub trait WikiApi: Send + Sync {
    /// Look up at most [`PAGE_SIZE_LIMIT`] titles
    async fn query_pages(&self, titles: &[String]) -> Result<PageQuery, WikiError>;

    /// Fetch at most [`PAGE_SIZE_LIMIT`] entities
    ///
    /// Entities unknown to the store come back with `missing` set.
    async fn get_entities(
        &self,
        ids: &[EntityId],
        props: &[&str],
    ) -> Result<Vec<EntityRecord>, WikiError>;

    /// Create or replace one statement, conditioned on `base_revision`
    async fn set_claim(
        &self,
        statement: &Statement,
        base_revision: Option<u64>,
        tags: &[String],
    ) -> Result<(), WikiError>;

    /// Delete statements by GUID, conditioned on `base_revision`
    async fn remove_claims(
        &self,
        guids: &[Guid],
        base_revision: Option<u64>,
        tags: &[String],
    ) -> Result<(), WikiError>;

    /// One page of file members of `category`
    async fn category_members(
        &self,
        category: &str,
        continuation: Option<&Continuation>,
    ) -> Result<CategoryMembers, WikiError>;

    /// Titles starting with `prefix` (namespace included)
    async fn search_titles(&self, prefix: &str) -> Result<Vec<String>, WikiError>;
}
