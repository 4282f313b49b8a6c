//! Test Helper Utilities
//!
//! In-memory `WikiApi` that records every call and applies writes to its own
//! entity state, so a batch can be re-run against the result.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use acdc::mediawiki::{CategoryMembers, Continuation, PageInfo, PageQuery, WikiApi, WikiError};
use acdc::services::StopSignal;
use acdc_common::datamodel::{
    DesiredStatement, EntityId, EntityRecord, Guid, PropertyId, QualifierSet, Rank, Snak,
    Statement, StatementGroup,
};
use async_trait::async_trait;

/// One recorded API call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    QueryPages(Vec<String>),
    GetEntities(Vec<EntityId>),
    SetClaim {
        statement: Statement,
        base_revision: Option<u64>,
        tags: Vec<String>,
    },
    RemoveClaims {
        guids: Vec<Guid>,
        base_revision: Option<u64>,
        tags: Vec<String>,
    },
    CategoryMembers(String),
    Search(String),
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(self, Call::SetClaim { .. } | Call::RemoveClaims { .. })
    }
}

#[derive(Default)]
pub struct FakeWiki {
    pages: HashMap<String, u64>,
    normalizations: HashMap<String, String>,
    entities: Mutex<HashMap<EntityId, EntityRecord>>,
    categories: HashMap<String, Vec<Vec<String>>>,
    search_results: Vec<String>,
    calls: Mutex<Vec<Call>>,
    fail_write: Option<(usize, String)>,
    stop_after_writes: Mutex<Option<(usize, StopSignal)>>,
    fail_queries: bool,
    panic_on_write: bool,
}

impl FakeWiki {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing page without structured data
    pub fn with_page(mut self, title: &str, page_id: u64) -> Self {
        self.pages.insert(title.to_string(), page_id);
        self
    }

    /// Existing statement on the entity of `page_id` (revision starts at 100)
    pub fn with_statement(self, page_id: u64, statement: Statement) -> Self {
        {
            let id = EntityId::for_page(page_id);
            let mut entities = self.entities.lock().unwrap();
            let record = entities.entry(id.clone()).or_insert_with(|| EntityRecord {
                id,
                last_revision: Some(100),
                missing: false,
                statements: BTreeMap::new(),
            });
            record
                .statements
                .entry(statement.property().clone())
                .or_insert_with(|| StatementGroup::new(Vec::new()))
                .statements
                .push(statement);
        }
        self
    }

    pub fn with_normalization(mut self, from: &str, to: &str) -> Self {
        self.normalizations.insert(from.to_string(), to.to_string());
        self
    }

    /// Category listing served in the given pages (continuation between them)
    pub fn with_category(mut self, category: &str, pages: Vec<Vec<&str>>) -> Self {
        self.categories.insert(
            category.to_string(),
            pages
                .into_iter()
                .map(|page| page.into_iter().map(str::to_string).collect())
                .collect(),
        );
        self
    }

    pub fn with_search_results(mut self, titles: &[&str]) -> Self {
        self.search_results = titles.iter().map(|t| t.to_string()).collect();
        self
    }

    /// The `n`-th write (0-based) fails with the given API error code
    pub fn fail_write(mut self, n: usize, code: &str) -> Self {
        self.fail_write = Some((n, code.to_string()));
        self
    }

    /// Request a stop on `signal` once `n` writes succeeded
    pub fn stop_after_writes(self, n: usize, signal: StopSignal) -> Self {
        self.arm_stop(n, signal);
        self
    }

    /// Same as [`FakeWiki::stop_after_writes`] for an already shared fake
    pub fn arm_stop(&self, n: usize, signal: StopSignal) {
        *self.stop_after_writes.lock().unwrap() = Some((n, signal));
    }

    /// Every write panics instead of returning
    pub fn panicking_writes(mut self) -> Self {
        self.panic_on_write = true;
        self
    }

    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn query_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::QueryPages(titles) => Some(titles),
                _ => None,
            })
            .collect()
    }

    pub fn entity(&self, page_id: u64) -> Option<EntityRecord> {
        self.entities
            .lock()
            .unwrap()
            .get(&EntityId::for_page(page_id))
            .cloned()
    }

    pub fn statements(&self, page_id: u64, property: &str) -> Vec<Statement> {
        self.entity(page_id)
            .map(|e| e.statements_for(&p(property)).to_vec())
            .unwrap_or_default()
    }

    fn record(&self, call: Call) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        calls.iter().filter(|c| c.is_write()).count()
    }

    fn check_write(&self, write_number: usize) -> Result<(), WikiError> {
        if self.panic_on_write {
            panic!("write {} panicked", write_number);
        }
        if let Some((n, code)) = &self.fail_write {
            if write_number == n + 1 {
                return Err(WikiError::from_api(code.clone(), "injected failure"));
            }
        }
        Ok(())
    }

    fn after_write(&self, write_number: usize) {
        if let Some((n, signal)) = self.stop_after_writes.lock().unwrap().as_ref() {
            if write_number == *n {
                signal.request();
            }
        }
    }
}

#[async_trait]
impl WikiApi for FakeWiki {
    async fn query_pages(&self, titles: &[String]) -> Result<PageQuery, WikiError> {
        self.record(Call::QueryPages(titles.to_vec()));
        if self.fail_queries {
            return Err(WikiError::Network("connection refused".to_string()));
        }

        let mut query = PageQuery::default();
        for title in titles {
            let canonical = match self.normalizations.get(title) {
                Some(to) => {
                    query.normalized.push((title.clone(), to.clone()));
                    to.clone()
                }
                None => title.clone(),
            };
            if query.pages.iter().all(|p| p.title != canonical) {
                query.pages.push(PageInfo {
                    page_id: self.pages.get(&canonical).copied(),
                    title: canonical,
                });
            }
        }
        Ok(query)
    }

    async fn get_entities(
        &self,
        ids: &[EntityId],
        _props: &[&str],
    ) -> Result<Vec<EntityRecord>, WikiError> {
        self.record(Call::GetEntities(ids.to_vec()));
        let entities = self.entities.lock().unwrap();
        Ok(ids
            .iter()
            .map(|id| {
                entities
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| EntityRecord::empty(id.clone()))
            })
            .collect())
    }

    async fn set_claim(
        &self,
        statement: &Statement,
        base_revision: Option<u64>,
        tags: &[String],
    ) -> Result<(), WikiError> {
        let n = self.record(Call::SetClaim {
            statement: statement.clone(),
            base_revision,
            tags: tags.to_vec(),
        });
        self.check_write(n)?;

        {
            let entity_id = EntityId::parse(statement.id.entity_part())
                .map_err(|e| WikiError::Parse(e.to_string()))?;
            let mut entities = self.entities.lock().unwrap();
            let record = entities
                .entry(entity_id.clone())
                .or_insert_with(|| EntityRecord::empty(entity_id));
            record.missing = false;
            record.last_revision = Some(record.last_revision.unwrap_or(0) + 1);
            let group = record
                .statements
                .entry(statement.property().clone())
                .or_insert_with(|| StatementGroup::new(Vec::new()));
            match group.statements.iter_mut().find(|s| s.id == statement.id) {
                Some(existing) => *existing = statement.clone(),
                None => group.statements.push(statement.clone()),
            }
        }

        self.after_write(n);
        Ok(())
    }

    async fn remove_claims(
        &self,
        guids: &[Guid],
        base_revision: Option<u64>,
        tags: &[String],
    ) -> Result<(), WikiError> {
        let n = self.record(Call::RemoveClaims {
            guids: guids.to_vec(),
            base_revision,
            tags: tags.to_vec(),
        });
        self.check_write(n)?;

        {
            let mut entities = self.entities.lock().unwrap();
            for record in entities.values_mut() {
                let mut touched = false;
                for group in record.statements.values_mut() {
                    let before = group.statements.len();
                    group.statements.retain(|s| !guids.contains(&s.id));
                    touched |= group.statements.len() != before;
                }
                record.statements.retain(|_, group| !group.is_empty());
                if touched {
                    record.last_revision = Some(record.last_revision.unwrap_or(0) + 1);
                }
            }
        }

        self.after_write(n);
        Ok(())
    }

    async fn category_members(
        &self,
        category: &str,
        continuation: Option<&Continuation>,
    ) -> Result<CategoryMembers, WikiError> {
        self.record(Call::CategoryMembers(category.to_string()));
        let pages = self.categories.get(category).cloned().unwrap_or_default();
        let index: usize = continuation
            .and_then(|c| c.get("cmcontinue"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let titles = pages.get(index).cloned().unwrap_or_default();
        let continuation = (index + 1 < pages.len()).then(|| {
            let mut next = Continuation::new();
            next.insert("cmcontinue".to_string(), (index + 1).to_string());
            next.insert("continue".to_string(), "-||".to_string());
            next
        });
        Ok(CategoryMembers {
            titles,
            continuation,
        })
    }

    async fn search_titles(&self, prefix: &str) -> Result<Vec<String>, WikiError> {
        self.record(Call::Search(prefix.to_string()));
        Ok(self
            .search_results
            .iter()
            .filter(|t| t.starts_with(prefix))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Data builders
// ============================================================================

pub fn p(id: &str) -> PropertyId {
    PropertyId::parse(id).unwrap()
}

pub fn guid(value: &str) -> Guid {
    Guid::parse(value).unwrap()
}

/// Existing `property: item` statement with no qualifiers, rank Normal
pub fn item_statement(guid_value: &str, property: &str, item: &str) -> Statement {
    Statement {
        id: guid(guid_value),
        main_snak: Snak::item(p(property), item),
        qualifiers: QualifierSet::new(),
        rank: Rank::Normal,
        references: Vec::new(),
    }
}

pub fn desired(property: &str, item: &str) -> DesiredStatement {
    DesiredStatement::new(Snak::item(p(property), item))
}
