use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

pub const CONFIG_FILE: &str = "kira-ppi.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub hippie_url: Option<String>,
    #[serde(default)]
    pub uniprot_url: Option<String>,
    #[serde(default)]
    pub hgnc_url: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
}

/// Source locations and database path after defaults are applied. `None`
/// source locations mean the built-in URLs.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub hippie_url: Option<String>,
    pub uniprot_url: Option<String>,
    pub hgnc_url: Option<String>,
    pub database: Option<Utf8PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `kira-ppi.json` in the current directory when present.
    /// A missing default file yields the built-in defaults; a missing explicit
    /// path is an error.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KiraError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        if !config_path.exists() {
            return match path {
                Some(_) => Err(KiraError::MissingConfig(config_path)),
                None => Self::resolve_config(Config::default()),
            };
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KiraError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KiraError> {
        let non_empty = |value: Option<String>| {
            value
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            hippie_url: non_empty(config.hippie_url),
            uniprot_url: non_empty(config.uniprot_url),
            hgnc_url: non_empty(config.hgnc_url),
            database: non_empty(config.database).map(Utf8PathBuf::from),
        })
    }
}
