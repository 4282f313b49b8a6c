//! Configuration loading
//!
//! Settings come from four tiers, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

/// Default MediaWiki action API endpoint
pub const DEFAULT_API_URL: &str = "https://commons.wikimedia.org/w/api.php";

/// Default PagePile endpoint
pub const DEFAULT_PAGEPILE_URL: &str = "https://pagepile.toolforge.org/api.php";

/// Database name of the default wiki (used to check PagePile ownership)
pub const DEFAULT_WIKI_DB_NAME: &str = "commonswiki";

/// Default write quota
pub const DEFAULT_MAX_WRITES_PER_SECOND: u32 = 5;

/// Hosts on which edits are tagged with [`ACDC_CHANGE_TAG`] by default
const TAGGED_HOSTS: &[&str] = &["commons.wikimedia.org", "test-commons.wikimedia.org"];

/// Change tag registered for AC/DC edits on Wikimedia Commons
pub const ACDC_CHANGE_TAG: &str = "ACDC";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub api_url: Option<String>,
    pub username: Option<String>,
    /// Bot password (Special:BotPasswords)
    pub password: Option<String>,
    pub tags: Option<Vec<String>>,
    pub user_agent: Option<String>,
    pub max_writes_per_second: Option<u32>,
    pub wiki_db_name: Option<String>,
    pub pagepile_url: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. `info` or `acdc=debug`
    pub level: Option<String>,
}

/// Default location of the config file for this platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("acdc").join("config.toml"))
}

/// Load a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file if it exists; a missing file yields the defaults
pub fn load_toml_config_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    match path {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            load_toml_config(path)
        }
        _ => Ok(TomlConfig::default()),
    }
}

/// Resolve one setting across command line, environment and TOML
///
/// Blank values count as unset. Logs a warning when more than one tier
/// provides a value, since the lower tiers are then silently ignored.
pub fn resolve_setting(
    name: &str,
    cli_value: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
) -> Option<String> {
    let env_value = std::env::var(env_var_name).ok();
    let candidates = [
        ("command line", cli_value),
        ("environment", env_value.as_deref()),
        ("TOML", toml_value),
    ];

    let present: Vec<(&str, &str)> = candidates
        .iter()
        .filter_map(|(source, value)| {
            (*value)
                .filter(|v| !v.trim().is_empty())
                .map(|v| (*source, v))
        })
        .collect();

    if present.len() > 1 {
        let sources: Vec<&str> = present.iter().map(|(source, _)| *source).collect();
        warn!(
            "{} found in multiple sources: {}. Using {}.",
            name,
            sources.join(", "),
            sources[0]
        );
    }

    present.first().map(|(_, value)| value.trim().to_string())
}

/// Change tags applied to edits on `api_url` when none are configured
pub fn default_tags_for(api_url: &str) -> Vec<String> {
    let host = api_url
        .split("://")
        .nth(1)
        .unwrap_or(api_url)
        .split('/')
        .next()
        .unwrap_or("");
    if TAGGED_HOSTS.contains(&host) {
        vec![ACDC_CHANGE_TAG.to_string()]
    } else {
        Vec::new()
    }
}

/// Parse a comma separated tag list (as used in `ACDC_TAGS`)
pub fn parse_tag_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
