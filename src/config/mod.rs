//! Configuration management.
//!
//! Configuration is read from a TOML file and can be overridden with
//! environment variables prefixed `RESEARCH_FANOUT__`, using `__` between
//! section and key:
//!
//! ```toml
//! [api_keys]
//! core = "your-core-api-key"
//! pubmed = "optional-ncbi-key"
//!
//! [endpoints]
//! arxiv = "https://export.arxiv.org/api/query"
//!
//! [http]
//! timeout_secs = 30
//! connect_timeout_secs = 10
//!
//! [search]
//! default_max_results = 10
//! ```
//!
//! ```bash
//! export RESEARCH_FANOUT__HTTP__TIMEOUT_SECS=5
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::DEFAULT_MAX_RESULTS;

/// Environment variable holding the CORE bearer token
pub const CORE_API_KEY_ENV: &str = "CORE_API_KEY";
/// Environment variable holding the optional NCBI E-utilities key
pub const NCBI_API_KEY_ENV: &str = "NCBI_API_KEY";
/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "RESEARCH_FANOUT_CONFIG";

const ENV_PREFIX: &str = "RESEARCH_FANOUT";
const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR_NAME: &str = "research-fanout";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API keys for providers that use them
    pub api_keys: ApiKeys,

    /// Provider endpoints
    pub endpoints: Endpoints,

    /// HTTP client settings
    pub http: HttpConfig,

    /// Search defaults
    pub search: SearchConfig,
}

impl Config {
    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Copy of this configuration with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mask = |key: &Option<String>| key.as_ref().map(|_| "********".to_string());
        Self {
            api_keys: ApiKeys {
                core: mask(&self.api_keys.core),
                pubmed: mask(&self.api_keys.pubmed),
            },
            ..self.clone()
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    /// CORE bearer token (required for CORE searches)
    pub core: Option<String>,

    /// NCBI E-utilities key (optional, raises PubMed rate limits)
    pub pubmed: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            core: non_blank_env(CORE_API_KEY_ENV),
            pubmed: non_blank_env(NCBI_API_KEY_ENV),
        }
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Provider endpoint URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// arXiv Atom query endpoint
    pub arxiv: String,

    /// PubMed ESearch endpoint
    pub pubmed_search: String,

    /// PubMed EFetch endpoint
    pub pubmed_fetch: String,

    /// CORE API v3 base URL
    pub core: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            arxiv: "https://export.arxiv.org/api/query".to_string(),
            pubmed_search: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi".to_string(),
            pubmed_fetch: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi".to_string(),
            core: "https://api.core.ac.uk/v3".to_string(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout, per remote call
    pub timeout_secs: u64,

    /// TCP connect timeout
    pub connect_timeout_secs: u64,

    /// User agent sent to every provider
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))
                .to_string(),
        }
    }
}

/// Search defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Per-provider cap used when a request does not set one
    pub default_max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Load configuration from a TOML file, then apply environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path).format(config::FileFormat::Toml))
        .add_source(env_source())
        .build()?;

    settings.try_deserialize()
}

/// Get the configuration from environment variables and defaults only
pub fn get_config() -> Result<Config, config::ConfigError> {
    config::Config::builder()
        .add_source(env_source())
        .build()?
        .try_deserialize()
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

/// Locate a config file: `$RESEARCH_FANOUT_CONFIG`, then `./research-fanout.toml`,
/// then `<config dir>/research-fanout/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from) {
        if path.is_file() {
            return Some(path);
        }
    }

    let local = PathBuf::from(format!("{}.toml", APP_DIR_NAME));
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}
