//! Title → entity resolution
//!
//! MediaInfo entity IDs are derived from page IDs (`M` + page id), so one
//! `action=query&titles=` request per chunk of titles is enough.

use std::collections::HashMap;

use acdc_common::datamodel::EntityId;
use tracing::debug;

use crate::mediawiki::{WikiApi, WikiError, PAGE_SIZE_LIMIT};

/// Number of lookup requests needed for `count` items
pub fn chunk_count(count: usize) -> usize {
    count.div_ceil(PAGE_SIZE_LIMIT)
}

/// Resolution result for one input title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTitle {
    pub title: String,
    /// `None` when the page does not exist yet
    pub entity_id: Option<EntityId>,
}

/// Resolve titles to entity IDs
///
/// Returns one entry per input title, in input order (duplicates included).
/// `on_request` is called after every lookup request. Any request failure
/// aborts the whole resolution.
pub async fn resolve_titles(
    api: &dyn WikiApi,
    titles: &[String],
    mut on_request: impl FnMut() + Send,
) -> Result<Vec<ResolvedTitle>, WikiError> {
    let mut resolved = Vec::with_capacity(titles.len());

    for chunk in titles.chunks(PAGE_SIZE_LIMIT) {
        let query = api.query_pages(chunk).await?;
        on_request();

        let normalized: HashMap<&str, &str> = query
            .normalized
            .iter()
            .map(|(from, to)| (from.as_str(), to.as_str()))
            .collect();
        let page_ids: HashMap<&str, Option<u64>> = query
            .pages
            .iter()
            .map(|page| (page.title.as_str(), page.page_id))
            .collect();

        for title in chunk {
            let canonical = normalized.get(title.as_str()).copied().unwrap_or(title.as_str());
            let entity_id = page_ids
                .get(canonical)
                .copied()
                .flatten()
                .map(EntityId::for_page);
            resolved.push(ResolvedTitle {
                title: title.clone(),
                entity_id,
            });
        }
    }

    debug!(
        "Resolved {} titles ({} without a page)",
        resolved.len(),
        resolved.iter().filter(|r| r.entity_id.is_none()).count()
    );

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(0), 0);
        assert_eq!(chunk_count(1), 1);
        assert_eq!(chunk_count(50), 1);
        assert_eq!(chunk_count(51), 2);
        assert_eq!(chunk_count(120), 3);
    }
}
