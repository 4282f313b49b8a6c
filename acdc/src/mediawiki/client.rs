// MediaWiki action API client
//
// Reads go out immediately. Writes pass through a governor quota and carry a
// CSRF token, the bot flag, change tags and (when logged in) assertuser.

use super::{CategoryMembers, Continuation, PageInfo, PageQuery, WikiApi, WikiError};
use crate::config::Settings;
use acdc_common::datamodel::{EntityId, EntityRecord, Guid, Statement};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// File namespace number, used for category listing and prefix search
const FILE_NAMESPACE: &str = "6";

/// Maximum prefix search results
const SEARCH_LIMIT: &str = "10";

pub struct MediaWikiClient {
    client: reqwest::Client,
    api_url: String,
    username: Option<String>,
    csrf_token: Mutex<Option<String>>,
    write_limiter: DefaultDirectRateLimiter,
}

impl MediaWikiClient {
    pub fn new(settings: &Settings) -> Result<Self, WikiError> {
        let per_second = NonZeroU32::new(settings.max_writes_per_second).unwrap_or(NonZeroU32::MIN);
        let write_limiter = RateLimiter::direct(Quota::per_second(per_second));

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(60))
            .cookie_store(true)
            .build()
            .map_err(|e| WikiError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            username: None,
            csrf_token: Mutex::new(None),
            write_limiter,
        })
    }

    /// Log in with a bot password
    ///
    /// Session cookies are kept by the client; subsequent writes assert this
    /// user so that an expired session fails instead of editing anonymously.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), WikiError> {
        let tokens: TokensResponse = self
            .get(&[("action", "query"), ("meta", "tokens"), ("type", "login")])
            .await?;
        let login_token = tokens
            .query
            .tokens
            .logintoken
            .ok_or_else(|| WikiError::Parse("Login token missing from response".to_string()))?;

        let params = [
            ("action", "login"),
            ("lgname", username),
            ("lgpassword", password),
            ("lgtoken", login_token.as_str()),
        ];
        let response: LoginResponse = serde_json::from_value(self.post(&params).await?)
            .map_err(|e| WikiError::Parse(format!("Failed to parse login response: {}", e)))?;

        if response.login.result != "Success" {
            return Err(WikiError::Auth(
                response
                    .login
                    .reason
                    .unwrap_or_else(|| response.login.result.clone()),
            ));
        }

        let name = response
            .login
            .lgusername
            .unwrap_or_else(|| username.split('@').next().unwrap_or(username).to_string());
        info!("Logged in to {} as {}", self.api_url, name);
        self.username = Some(name);
        *self.csrf_token.lock().await = None;
        Ok(())
    }

    /// User name asserted on writes, if logged in
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    async fn get<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T, WikiError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&common_params())
            .query(params)
            .send()
            .await
            .map_err(|e| WikiError::Network(e.to_string()))?;

        let body = parse_body(response).await?;
        serde_json::from_value(body).map_err(|e| WikiError::Parse(e.to_string()))
    }

    async fn post(&self, params: &[(&str, &str)]) -> Result<Value, WikiError> {
        let mut form: Vec<(&str, &str)> = common_params().to_vec();
        form.extend_from_slice(params);

        let response = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| WikiError::Network(e.to_string()))?;

        parse_body(response).await
    }

    async fn csrf_token(&self) -> Result<String, WikiError> {
        let mut cached = self.csrf_token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let tokens: TokensResponse = self
            .get(&[("action", "query"), ("meta", "tokens"), ("type", "csrf")])
            .await?;
        let token = tokens
            .query
            .tokens
            .csrftoken
            .ok_or_else(|| WikiError::Parse("CSRF token missing from response".to_string()))?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// POST a write action, retrying once with a fresh token on `badtoken`
    async fn write(&self, params: &[(&str, &str)]) -> Result<Value, WikiError> {
        self.write_limiter.until_ready().await;

        let mut retried = false;
        loop {
            let token = self.csrf_token().await?;
            let mut form: Vec<(&str, &str)> = params.to_vec();
            form.push(("bot", "1"));
            form.push(("token", token.as_str()));
            if let Some(user) = self.username.as_deref() {
                form.push(("assertuser", user));
            }

            match self.post(&form).await {
                Err(WikiError::Api { code, .. }) if code == "badtoken" && !retried => {
                    warn!("CSRF token rejected, fetching a new one");
                    *self.csrf_token.lock().await = None;
                    retried = true;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl WikiApi for MediaWikiClient {
    async fn query_pages(&self, titles: &[String]) -> Result<PageQuery, WikiError> {
        debug!("Querying {} titles", titles.len());
        let joined = titles.join("|");
        let response: QueryResponse<PagesQuery> = self
            .get(&[("action", "query"), ("titles", joined.as_str())])
            .await?;

        let query = response.query.unwrap_or_default();
        Ok(PageQuery {
            pages: query
                .pages
                .into_iter()
                .map(|page| PageInfo {
                    page_id: if page.missing || page.invalid {
                        None
                    } else {
                        page.pageid
                    },
                    title: page.title,
                })
                .collect(),
            normalized: query
                .normalized
                .into_iter()
                .map(|n| (n.from, n.to))
                .collect(),
        })
    }

    async fn get_entities(
        &self,
        ids: &[EntityId],
        props: &[&str],
    ) -> Result<Vec<EntityRecord>, WikiError> {
        debug!("Fetching {} entities", ids.len());
        let joined_ids = ids
            .iter()
            .map(EntityId::as_str)
            .collect::<Vec<_>>()
            .join("|");
        let joined_props = props.join("|");
        let response: EntitiesResponse = self
            .get(&[
                ("action", "wbgetentities"),
                ("ids", joined_ids.as_str()),
                ("props", joined_props.as_str()),
            ])
            .await?;

        let mut records = Vec::with_capacity(response.entities.len());
        for (key, value) in response.entities {
            let record: EntityRecord = serde_json::from_value(value)
                .map_err(|e| WikiError::Parse(format!("Entity {}: {}", key, e)))?;
            records.push(record);
        }
        Ok(records)
    }

    async fn set_claim(
        &self,
        statement: &Statement,
        base_revision: Option<u64>,
        tags: &[String],
    ) -> Result<(), WikiError> {
        let claim = serde_json::to_string(statement)
            .map_err(|e| WikiError::Parse(format!("Failed to serialize statement: {}", e)))?;
        let base = base_revision.map(|r| r.to_string());
        let joined_tags = tags.join("|");

        let mut params = vec![("action", "wbsetclaim"), ("claim", claim.as_str())];
        if let Some(base) = base.as_deref() {
            params.push(("baserevid", base));
        }
        if !tags.is_empty() {
            params.push(("tags", joined_tags.as_str()));
        }

        debug!("wbsetclaim {}", statement.id);
        self.write(&params).await?;
        Ok(())
    }

    async fn remove_claims(
        &self,
        guids: &[Guid],
        base_revision: Option<u64>,
        tags: &[String],
    ) -> Result<(), WikiError> {
        let joined_guids = guids.iter().map(Guid::as_str).collect::<Vec<_>>().join("|");
        let base = base_revision.map(|r| r.to_string());
        let joined_tags = tags.join("|");

        let mut params = vec![("action", "wbremoveclaims"), ("claim", joined_guids.as_str())];
        if let Some(base) = base.as_deref() {
            params.push(("baserevid", base));
        }
        if !tags.is_empty() {
            params.push(("tags", joined_tags.as_str()));
        }

        debug!("wbremoveclaims {}", joined_guids);
        self.write(&params).await?;
        Ok(())
    }

    async fn category_members(
        &self,
        category: &str,
        continuation: Option<&Continuation>,
    ) -> Result<CategoryMembers, WikiError> {
        let cmtitle = if category.starts_with("Category:") {
            category.to_string()
        } else {
            format!("Category:{}", category)
        };

        let mut params = vec![
            ("action", "query"),
            ("list", "categorymembers"),
            ("cmtitle", cmtitle.as_str()),
            ("cmnamespace", FILE_NAMESPACE),
            ("cmtype", "file"),
            ("cmlimit", "max"),
        ];
        if let Some(continuation) = continuation {
            params.extend(continuation.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let response: QueryResponse<CategoryMembersQuery> = self.get(&params).await?;
        Ok(CategoryMembers {
            titles: response
                .query
                .map(|q| q.categorymembers.into_iter().map(|m| m.title).collect())
                .unwrap_or_default(),
            continuation: response.continuation.map(continuation_strings),
        })
    }

    async fn search_titles(&self, prefix: &str) -> Result<Vec<String>, WikiError> {
        let search = format!("prefix:{}", prefix);
        let response: QueryResponse<SearchQuery> = self
            .get(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", search.as_str()),
                ("srnamespace", FILE_NAMESPACE),
                ("srlimit", SEARCH_LIMIT),
                ("srinfo", ""),
                ("srprop", ""),
            ])
            .await?;

        Ok(response
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }
}

fn common_params() -> [(&'static str, &'static str); 3] {
    [
        ("format", "json"),
        ("formatversion", "2"),
        ("errorformat", "plaintext"),
    ]
}

async fn parse_body(response: reqwest::Response) -> Result<Value, WikiError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(WikiError::Http(status.as_u16(), text));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| WikiError::Parse(format!("Response is not JSON: {}", e)))?;
    check_api_error(&body)?;
    Ok(body)
}

/// Map an API error body (either error format) to a [`WikiError`]
fn check_api_error(body: &Value) -> Result<(), WikiError> {
    if let Some(first) = body
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
    {
        let code = first.get("code").and_then(Value::as_str).unwrap_or("unknown");
        let text = first
            .get("text")
            .or_else(|| first.get("*"))
            .and_then(Value::as_str)
            .unwrap_or("");
        return Err(WikiError::from_api(code, text));
    }

    if let Some(error) = body.get("error") {
        let code = error.get("code").and_then(Value::as_str).unwrap_or("unknown");
        let info = error
            .get("info")
            .or_else(|| error.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("");
        return Err(WikiError::from_api(code, info));
    }

    Ok(())
}

fn continuation_strings(raw: HashMap<String, Value>) -> Continuation {
    raw.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect()
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct QueryResponse<Q> {
    query: Option<Q>,
    #[serde(rename = "continue")]
    continuation: Option<HashMap<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct PagesQuery {
    #[serde(default)]
    normalized: Vec<Normalization>,
    #[serde(default)]
    pages: Vec<PageEntry>,
}

#[derive(Debug, Deserialize)]
struct Normalization {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct PageEntry {
    title: String,
    pageid: Option<u64>,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
}

#[derive(Debug, Deserialize)]
struct CategoryMembersQuery {
    #[serde(default)]
    categorymembers: Vec<TitleEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<TitleEntry>,
}

#[derive(Debug, Deserialize)]
struct TitleEntry {
    title: String,
}

#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TokensResponse {
    query: TokensQuery,
}

#[derive(Debug, Deserialize)]
struct TokensQuery {
    tokens: Tokens,
}

#[derive(Debug, Deserialize)]
struct Tokens {
    logintoken: Option<String>,
    csrftoken: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    login: LoginResult,
}

#[derive(Debug, Deserialize)]
struct LoginResult {
    result: String,
    reason: Option<String>,
    lgusername: Option<String>,
}
