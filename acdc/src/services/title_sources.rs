//! Bulk title sources: category members and PagePiles
//!
//! Both produce plain file titles; once collected they are no different from
//! titles typed in by hand.

use futures::stream::Stream;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::input::titles::{ensure_category_namespace, is_file_title};
use crate::mediawiki::{WikiApi, WikiError};

/// PagePiles at least this large need explicit confirmation before loading
pub const LARGE_PAGEPILE_THRESHOLD: usize = 100;

/// Lazily list the file members of a category
///
/// Each call starts a fresh listing, so the stream can be restarted by
/// calling again. Pages are fetched only as the stream is polled.
pub fn category_files<'a>(
    api: &'a dyn WikiApi,
    category: &str,
) -> impl Stream<Item = Result<String, WikiError>> + Send + 'a {
    let category = ensure_category_namespace(category);

    async_stream::try_stream! {
        let mut continuation = None;
        loop {
            let page = api.category_members(&category, continuation.as_ref()).await?;
            debug!("{}: {} members in this batch", category, page.titles.len());

            for title in page.titles.into_iter().filter(|t| is_file_title(t)) {
                yield title;
            }

            match page.continuation {
                Some(next) => continuation = Some(next),
                None => break,
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum PagePileError {
    #[error("PagePile request failed: {0}")]
    Network(String),

    #[error("PagePile response could not be parsed: {0}")]
    Parse(String),

    #[error("PagePile {id} belongs to {wiki}, not {expected}")]
    WrongWiki {
        id: u64,
        wiki: String,
        expected: String,
    },
}

/// Files of one PagePile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePile {
    pub id: u64,
    pub files: Vec<String>,
}

impl PagePile {
    /// Whether the caller should confirm before adding these files
    pub fn is_large(&self) -> bool {
        self.files.len() >= LARGE_PAGEPILE_THRESHOLD
    }
}

#[derive(Debug, Deserialize)]
struct PagePileData {
    wiki: String,
    #[serde(default)]
    pages: Vec<String>,
}

/// Client for the PagePile tool
pub struct PagePileClient {
    client: reqwest::Client,
    api_url: String,
    wiki_db_name: String,
}

impl PagePileClient {
    pub fn new(settings: &Settings) -> Result<Self, PagePileError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PagePileError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_url: settings.pagepile_url.clone(),
            wiki_db_name: settings.wiki_db_name.clone(),
        })
    }

    /// Fetch a PagePile, keeping only File pages
    pub async fn fetch(&self, id: u64) -> Result<PagePile, PagePileError> {
        info!("Loading PagePile {}", id);
        let id_param = id.to_string();

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "get_data"),
                ("id", id_param.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| PagePileError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PagePileError::Network(format!(
                "PagePile returned {}",
                response.status()
            )));
        }

        let data: PagePileData = response
            .json()
            .await
            .map_err(|e| PagePileError::Parse(e.to_string()))?;

        let pile = filter_pile(id, data, &self.wiki_db_name)?;
        if pile.is_large() {
            warn!("PagePile {} contains {} files", id, pile.files.len());
        }
        Ok(pile)
    }
}

fn filter_pile(id: u64, data: PagePileData, expected_wiki: &str) -> Result<PagePile, PagePileError> {
    if data.wiki != expected_wiki {
        return Err(PagePileError::WrongWiki {
            id,
            wiki: data.wiki,
            expected: expected_wiki.to_string(),
        });
    }

    Ok(PagePile {
        id,
        files: data.pages.into_iter().filter(|p| is_file_title(p)).collect(),
    })
}
