use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::identity::DuplicatePolicy;
use crate::images::DEFAULT_MAX_IMAGE_BYTES;
use crate::view::SortKey;

pub const CONFIG_FILE: &str = "artist-catalog.json";
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub max_image_bytes: Option<u64>,
    #[serde(default)]
    pub duplicate_policy: Option<DuplicatePolicy>,
    #[serde(default)]
    pub default_sort: Option<SortKey>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub data_dir: Utf8PathBuf,
    pub max_image_bytes: u64,
    pub duplicate_policy: DuplicatePolicy,
    pub default_sort: SortKey,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `path`, or `artist-catalog.json` in the current directory when no
    /// path is given. Only the implicit file may be missing; defaults apply
    /// then.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CatalogError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CatalogError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CatalogError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CatalogError> {
        let schema_version = config.schema_version.unwrap_or(SCHEMA_VERSION);
        if schema_version != SCHEMA_VERSION {
            return Err(CatalogError::UnsupportedSchemaVersion(schema_version));
        }

        let data_dir = match config.data_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => default_data_dir()?,
        };

        Ok(ResolvedConfig {
            schema_version,
            data_dir,
            max_image_bytes: config.max_image_bytes.unwrap_or(DEFAULT_MAX_IMAGE_BYTES),
            duplicate_policy: config.duplicate_policy.unwrap_or_default(),
            default_sort: config.default_sort.unwrap_or_default(),
        })
    }
}

/// `<platform data dir>/artist-catalog/images`.
pub fn default_data_dir() -> Result<Utf8PathBuf, CatalogError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.data_dir().join("artist-catalog").join("images")).ok()
        })
        .ok_or_else(|| CatalogError::Filesystem("unable to resolve data directory".to_string()))
}
