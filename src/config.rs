use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Remote endpoints used to fetch entity data and run SPARQL queries.
///
/// URL templates carry a `$1` placeholder for the URL-encoded argument.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_entity_data_url")]
    pub entity_data_url: String,
    #[serde(default = "default_sorted_properties_url")]
    pub sorted_properties_url: String,
    #[serde(default = "default_sparql_url")]
    pub sparql_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            entity_data_url: default_entity_data_url(),
            sorted_properties_url: default_sorted_properties_url(),
            sparql_url: default_sparql_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_entity_data_url() -> String {
    "https://www.wikidata.org/wiki/Special:EntityData/$1.json".to_string()
}

fn default_sorted_properties_url() -> String {
    "https://www.wikidata.org/w/index.php?title=MediaWiki:Wikibase-SortedProperties&action=raw&sp_ver=1"
        .to_string()
}

fn default_sparql_url() -> String {
    "https://query.wikidata.org/bigdata/namespace/wdq/sparql?format=json&query=$1".to_string()
}

fn default_user_agent() -> String {
    "wikibase-similar-entity".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Relaxation search tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Maximum serialized length of a single SPARQL query, in bytes.
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
    /// Candidates must have fewer statements than `round(conditions * factor)`.
    #[serde(default = "default_statement_count_factor")]
    pub statement_count_factor: f64,
    /// Drop-one phase only runs below this many conditions.
    #[serde(default = "default_drop_one_max_conditions")]
    pub drop_one_max_conditions: usize,
    /// Retention fractions for progressive dilution, descending.
    #[serde(default = "default_dilution_fractions")]
    pub dilution_fractions: Vec<f64>,
    /// Upper bound on random subsets drawn per fraction.
    #[serde(default = "default_max_samples_per_fraction")]
    pub max_samples_per_fraction: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            max_query_length: default_max_query_length(),
            statement_count_factor: default_statement_count_factor(),
            drop_one_max_conditions: default_drop_one_max_conditions(),
            dilution_fractions: default_dilution_fractions(),
            max_samples_per_fraction: default_max_samples_per_fraction(),
        }
    }
}

fn default_limit() -> usize {
    3
}

fn default_max_limit() -> usize {
    25
}

fn default_max_query_length() -> usize {
    4000
}

fn default_statement_count_factor() -> f64 {
    1.25
}

fn default_drop_one_max_conditions() -> usize {
    15
}

fn default_dilution_fractions() -> Vec<f64> {
    vec![0.75, 0.65, 0.55, 0.4, 0.3, 0.2]
}

fn default_max_samples_per_fraction() -> usize {
    14
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in SIMILAR_ENTITIES_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (optional, defaults otherwise)
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config = match std::env::var("SIMILAR_ENTITIES_CONFIG") {
            Ok(path) => Self::from_file(PathBuf::from(path))?,
            Err(_) => {
                let local = PathBuf::from("config.toml");
                if local.is_file() {
                    Self::from_file(local)?
                } else {
                    log::debug!("No config.toml found, using defaults");
                    Config::default()
                }
            }
        };

        config.validate()?;

        Ok(config)
    }

    fn from_file(config_path: PathBuf) -> Result<Self> {
        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for (name, template) in [
            ("endpoints.entity_data_url", &self.endpoints.entity_data_url),
            ("endpoints.sparql_url", &self.endpoints.sparql_url),
        ] {
            if !template.contains("$1") {
                anyhow::bail!("{} must contain the $1 placeholder", name);
            }
        }

        if self.endpoints.timeout_secs == 0 {
            anyhow::bail!("endpoints.timeout_secs must be greater than 0");
        }

        let search = &self.search;
        if search.max_limit == 0 {
            anyhow::bail!("search.max_limit must be greater than 0");
        }

        if search.default_limit == 0 || search.default_limit > search.max_limit {
            anyhow::bail!("search.default_limit must be between 1 and search.max_limit");
        }

        if search.max_query_length == 0 {
            anyhow::bail!("search.max_query_length must be greater than 0");
        }

        if !(search.statement_count_factor > 0.0) {
            anyhow::bail!("search.statement_count_factor must be greater than 0");
        }

        if search
            .dilution_fractions
            .iter()
            .any(|f| !(*f > 0.0 && *f < 1.0))
        {
            anyhow::bail!("search.dilution_fractions must all be between 0.0 and 1.0 (exclusive)");
        }

        if search.dilution_fractions.windows(2).any(|w| w[0] <= w[1]) {
            anyhow::bail!("search.dilution_fractions must be strictly descending");
        }

        Ok(())
    }
}
