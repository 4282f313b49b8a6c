//! Settings resolution for the acdc binary
//!
//! Every setting resolves with Command line → ENV → TOML priority, falling
//! back to built-in defaults. Credentials are optional: without them the
//! tool can still collect titles and run dry runs, but writes will be
//! rejected by the wiki.

use acdc_common::config::{
    default_tags_for, parse_tag_list, resolve_setting, TomlConfig, DEFAULT_API_URL,
    DEFAULT_MAX_WRITES_PER_SECOND, DEFAULT_PAGEPILE_URL, DEFAULT_WIKI_DB_NAME,
};
use acdc_common::{Error, Result};
use tracing::info;

/// Default User-Agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!(
    "ACDC/",
    env!("CARGO_PKG_VERSION"),
    " (batch structured data editor)"
);

/// Values given on the command line (all optional)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tags: Option<String>,
}

/// Fully resolved runtime settings
#[derive(Clone)]
pub struct Settings {
    pub api_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Change tags attached to every write
    pub tags: Vec<String>,
    pub user_agent: String,
    pub max_writes_per_second: u32,
    /// Database name PagePiles must belong to
    pub wiki_db_name: String,
    pub pagepile_url: String,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("tags", &self.tags)
            .field("user_agent", &self.user_agent)
            .field("max_writes_per_second", &self.max_writes_per_second)
            .field("wiki_db_name", &self.wiki_db_name)
            .field("pagepile_url", &self.pagepile_url)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            username: None,
            password: None,
            tags: default_tags_for(DEFAULT_API_URL),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_writes_per_second: DEFAULT_MAX_WRITES_PER_SECOND,
            wiki_db_name: DEFAULT_WIKI_DB_NAME.to_string(),
            pagepile_url: DEFAULT_PAGEPILE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Whether bot-password credentials are available
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

/// Resolve settings from command line, environment and TOML config
///
/// **Environment variables:** `ACDC_API_URL`, `ACDC_USERNAME`,
/// `ACDC_PASSWORD`, `ACDC_TAGS` (comma separated)
pub fn resolve_settings(cli: &CliOverrides, toml_config: &TomlConfig) -> Result<Settings> {
    let api_url = resolve_setting(
        "API URL",
        cli.api_url.as_deref(),
        "ACDC_API_URL",
        toml_config.api_url.as_deref(),
    )
    .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
        return Err(Error::Config(format!(
            "API URL must be an http(s) URL, got '{}'",
            api_url
        )));
    }

    let username = resolve_setting(
        "Username",
        cli.username.as_deref(),
        "ACDC_USERNAME",
        toml_config.username.as_deref(),
    );
    let password = resolve_setting(
        "Password",
        cli.password.as_deref(),
        "ACDC_PASSWORD",
        toml_config.password.as_deref(),
    );

    if username.is_some() != password.is_some() {
        return Err(Error::Config(
            "Username and password must be configured together".to_string(),
        ));
    }

    let toml_tags = toml_config.tags.as_ref().map(|tags| tags.join(","));
    let tags = match resolve_setting(
        "Change tags",
        cli.tags.as_deref(),
        "ACDC_TAGS",
        toml_tags.as_deref(),
    ) {
        Some(list) => parse_tag_list(&list),
        None => default_tags_for(&api_url),
    };

    let max_writes_per_second = toml_config
        .max_writes_per_second
        .unwrap_or(DEFAULT_MAX_WRITES_PER_SECOND);
    if max_writes_per_second == 0 {
        return Err(Error::Config(
            "max_writes_per_second must be at least 1".to_string(),
        ));
    }

    let settings = Settings {
        api_url,
        username,
        password,
        tags,
        user_agent: toml_config
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        max_writes_per_second,
        wiki_db_name: toml_config
            .wiki_db_name
            .clone()
            .unwrap_or_else(|| DEFAULT_WIKI_DB_NAME.to_string()),
        pagepile_url: toml_config
            .pagepile_url
            .clone()
            .unwrap_or_else(|| DEFAULT_PAGEPILE_URL.to_string()),
    };

    info!(
        "Using API {} (tags: [{}], authenticated: {})",
        settings.api_url,
        settings.tags.join(", "),
        settings.has_credentials()
    );

    Ok(settings)
}
