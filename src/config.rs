use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::request::{DEFAULT_SEARCH_URL, DEFAULT_SUMMARY_URL};

pub const CONFIG_FILE_NAME: &str = "molsearch.json";
pub const API_KEY_ENV: &str = "NCBI_API_KEY";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub search_url: Option<String>,
    #[serde(default)]
    pub summary_url: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub title_item: Option<String>,
    #[serde(default)]
    pub accession_item: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub title_batch_size: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub title_failure: Option<TitleFailurePolicy>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleFailurePolicy {
    #[default]
    Strict,
    /// Complete anyway, keeping the titles parsed before the fault.
    Degrade,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub search_url: String,
    pub summary_url: String,
    pub database: String,
    pub title_item: String,
    pub accession_item: String,
    pub max_results: usize,
    pub title_batch_size: usize,
    /// Bounds every request, including how long a cancelled fetch can keep
    /// its connection open.
    pub timeout_secs: u64,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub title_failure: TitleFailurePolicy,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            summary_url: DEFAULT_SUMMARY_URL.to_string(),
            database: "structure".to_string(),
            title_item: "PdbDescr".to_string(),
            accession_item: "PdbAcc".to_string(),
            max_results: 100,
            title_batch_size: 200,
            timeout_secs: 30,
            api_key: None,
            title_failure: TitleFailurePolicy::Strict,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SearchError> {
        let config = match path {
            Some(path) => Self::read(Path::new(path))?,
            None => match Self::discover() {
                Some(found) => Self::read(&found)?,
                None => Config::default(),
            },
        };
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::resolve_config(config, env_key.as_deref())
    }

    pub fn resolve_config(
        config: Config,
        env_api_key: Option<&str>,
    ) -> Result<ResolvedConfig, SearchError> {
        let defaults = ResolvedConfig::default();
        let api_key = env_api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .or_else(|| {
                config
                    .api_key
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty())
            });

        let resolved = ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(defaults.schema_version),
            search_url: config.search_url.unwrap_or(defaults.search_url),
            summary_url: config.summary_url.unwrap_or(defaults.summary_url),
            database: config.database.unwrap_or(defaults.database),
            title_item: config.title_item.unwrap_or(defaults.title_item),
            accession_item: config.accession_item.unwrap_or(defaults.accession_item),
            max_results: config.max_results.unwrap_or(defaults.max_results),
            title_batch_size: config.title_batch_size.unwrap_or(defaults.title_batch_size),
            timeout_secs: config.timeout_secs.unwrap_or(defaults.timeout_secs),
            api_key,
            title_failure: config.title_failure.unwrap_or_default(),
        };
        validate(&resolved)?;
        Ok(resolved)
    }

    fn read(path: &Path) -> Result<Config, SearchError> {
        let content =
            fs::read_to_string(path).map_err(|_| SearchError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| SearchError::ConfigParse(err.to_string()))
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }
        ProjectDirs::from("", "", "molsearch")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .filter(|path| path.is_file())
    }
}

fn validate(config: &ResolvedConfig) -> Result<(), SearchError> {
    for (key, value) in [
        ("search_url", &config.search_url),
        ("summary_url", &config.summary_url),
        ("database", &config.database),
        ("title_item", &config.title_item),
        ("accession_item", &config.accession_item),
    ] {
        if value.trim().is_empty() {
            return Err(SearchError::InvalidConfig(format!("{key} must not be empty")));
        }
    }
    if config.max_results == 0 {
        return Err(SearchError::InvalidConfig(
            "max_results must be at least 1".to_string(),
        ));
    }
    if config.title_batch_size == 0 {
        return Err(SearchError::InvalidConfig(
            "title_batch_size must be at least 1".to_string(),
        ));
    }
    if config.timeout_secs == 0 {
        return Err(SearchError::InvalidConfig(
            "timeout_secs must be at least 1".to_string(),
        ));
    }
    Ok(())
}
