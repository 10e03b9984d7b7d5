use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::services::policy::{ContentClass, PolicySet, SanitizePolicy};
use crate::services::slug::SlugScript;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub slug: SlugConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub policies: PolicyOverrides,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            pool_size: default_pool_size(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SlugConfig {
    #[serde(default)]
    pub script: SlugScript,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentConfig {
    /// Length of the summary derived for posts created without one.
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            excerpt_length: default_excerpt_length(),
        }
    }
}

/// Replacement allow-lists. A class left out keeps its built-in policy.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PolicyOverrides {
    pub post: Option<SanitizePolicy>,
    pub comment: Option<SanitizePolicy>,
    pub inline: Option<SanitizePolicy>,
}

fn default_database_path() -> String {
    "data/penmark.db".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_excerpt_length() -> usize {
    200
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Could not read config file '{}': {}. Run with --config to point at penmark.toml",
                path.display(),
                e
            )
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!("{} not found, using default configuration", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            anyhow::bail!("database.pool_size must be greater than 0");
        }
        if self.content.excerpt_length == 0 {
            anyhow::bail!("content.excerpt_length must be greater than 0");
        }
        if self.content.excerpt_length > 10000 {
            anyhow::bail!("content.excerpt_length must be 10000 or less");
        }
        Ok(())
    }

    pub fn policy_set(&self) -> PolicySet {
        let overrides = [
            (ContentClass::Post, &self.policies.post),
            (ContentClass::Comment, &self.policies.comment),
            (ContentClass::Inline, &self.policies.inline),
        ];
        overrides
            .into_iter()
            .fold(PolicySet::default(), |set, (class, policy)| match policy {
                Some(policy) => {
                    tracing::info!(class = %class, "using configured allow-list");
                    set.with(class, policy.clone())
                }
                None => set,
            })
    }
}
