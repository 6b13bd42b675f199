//! CLI configuration

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use depcache_core::limits::validate_traversal_depth;
use depcache_core::TraversalConfig;
use serde::{Deserialize, Serialize};

const KEYS: &[&str] = &[
    "cache_dir",
    "repository",
    "traversal.max_depth",
    "traversal.internal_id_prefix",
    "traversal.excluded_properties",
    "traversal.excluded_targets",
    "traversal.localization_properties",
];

/// Directory holding the config file
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("depcache")
}

/// Get default cache directory
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("depcache")
}

/// Config file location, honoring an explicit override
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_config_dir().join("config.toml"))
}

/// Configuration for the CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Root of the item repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<PathBuf>,

    pub traversal: TraversalConfig,
}

impl Config {
    /// Load from `path`, or defaults if the file does not exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn keys() -> &'static [&'static str] {
        KEYS
    }

    /// Value of a dotted key; `Ok(None)` when the key is unset
    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let t = &self.traversal;
        let value = match key {
            "cache_dir" => self.cache_dir.as_ref().map(|p| p.display().to_string()),
            "repository" => self.repository.as_ref().map(|p| p.display().to_string()),
            "traversal.max_depth" => Some(t.max_depth.to_string()),
            "traversal.internal_id_prefix" => Some(t.internal_id_prefix.clone()),
            "traversal.excluded_properties" => Some(join(&t.excluded_properties)),
            "traversal.excluded_targets" => Some(join(&t.excluded_targets)),
            "traversal.localization_properties" => Some(join(&t.localization_properties)),
            _ => anyhow::bail!("Unknown config key: {}", key),
        };
        Ok(value)
    }

    /// Set a dotted key. Lists are comma-separated; an empty path unsets it.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let t = &mut self.traversal;
        match key {
            "cache_dir" => self.cache_dir = optional_path(value),
            "repository" => self.repository = optional_path(value),
            "traversal.max_depth" => {
                let depth: usize = value
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid depth: {}", value))?;
                validate_traversal_depth(depth)?;
                t.max_depth = depth;
            }
            "traversal.internal_id_prefix" => t.internal_id_prefix = value.trim().to_string(),
            "traversal.excluded_properties" => t.excluded_properties = split(value),
            "traversal.excluded_targets" => t.excluded_targets = split(value),
            "traversal.localization_properties" => t.localization_properties = split(value),
            _ => anyhow::bail!(
                "Unknown config key: {}. Available keys: {}",
                key,
                KEYS.join(", ")
            ),
        }
        Ok(())
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    (!value.is_empty()).then(|| PathBuf::from(value))
}

fn split(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().cloned().collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_set() {
        let mut config = Config::default();
        assert_eq!(config.get("cache_dir").unwrap(), None);
        assert_eq!(config.get("traversal.max_depth").unwrap().as_deref(), Some("64"));

        config.set("repository", "/work/items").unwrap();
        config.set("traversal.localization_properties", "m_Key, m_Title,,").unwrap();
        config.set("traversal.max_depth", "12").unwrap();

        assert_eq!(config.repository, Some(PathBuf::from("/work/items")));
        assert_eq!(
            config.get("traversal.localization_properties").unwrap().as_deref(),
            Some("m_Key,m_Title")
        );
        assert_eq!(config.traversal.max_depth, 12);

        config.set("repository", " ").unwrap();
        assert_eq!(config.repository, None);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        assert!(config.set("traversal.max_depth", "deep").is_err());
        assert!(config.set("traversal.max_depth", "100000").is_err());
        assert!(config.set("nope", "1").is_err());
        assert!(config.get("nope").is_err());
    }

    #[test]
    fn test_every_key_readable() {
        let config = Config::default();
        for key in Config::keys() {
            assert!(config.get(key).is_ok(), "{}", key);
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("config.toml");

        assert_eq!(Config::load_from(&path).unwrap(), Config::default());

        let mut config = Config::default();
        config.set("cache_dir", "/tmp/cache").unwrap();
        config.set("traversal.excluded_targets", "Engine.dll").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[traversal]\nmax_depth = 8\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.traversal.max_depth, 8);
        assert_eq!(config.traversal.internal_id_prefix, "000000");
        assert!(config.cache_dir.is_none());
    }
}
