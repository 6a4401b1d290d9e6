use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::path::{Path, PathBuf};

use super::BlogcheckConfig;
use super::smart_load;

const REPO_CONFIG_FILES: [&str; 4] = [
    "blogcheck.toml",
    "blogcheck.json",
    "blogcheck.yaml",
    "blogcheck.yml",
];

impl BlogcheckConfig {
    /// Load defaults, user and repository files (or only `custom_config`), then
    /// the environment
    pub fn load_with_custom_config(custom_config: Option<&Path>) -> Result<Self> {
        let config: BlogcheckConfig = Self::figment(custom_config)?
            .extract()
            .context("Failed to load configuration")?;
        config.validate()?;
        tracing::trace!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Build the layered figment without extracting it
    pub fn figment(custom_config: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(BlogcheckConfig::default()));

        if let Some(custom_path) = custom_config {
            if !custom_path.is_file() {
                anyhow::bail!("Config file not found: {}", custom_path.display());
            }
            tracing::debug!("Using config file {}", custom_path.display());
            figment = figment.merge(smart_load::auto(custom_path));
        } else {
            if let Some(user_toml) = Self::user_config_path() {
                figment = figment
                    .merge(Toml::file(&user_toml))
                    .merge(Json::file(user_toml.with_extension("json")))
                    .merge(Yaml::file(user_toml.with_extension("yaml")))
                    .merge(Yaml::file(user_toml.with_extension("yml")));
            }
            for file in REPO_CONFIG_FILES {
                figment = figment.merge(smart_load::auto(file));
            }
        }

        // Environment variables always have highest priority
        Ok(figment.merge(Env::prefixed("BLOGCHECK_").split("__")))
    }

    fn user_config_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config/blogcheck/config.toml"))
    }

    /// Render the configuration in the requested format
    pub fn render(&self, format: &str) -> Result<String> {
        match format {
            "toml" => toml::to_string_pretty(self)
                .context("Failed to serialize configuration as TOML"),
            "json" => serde_json::to_string_pretty(self)
                .context("Failed to serialize configuration as JSON"),
            "yaml" | "yml" => {
                serde_yml::to_string(self).context("Failed to serialize configuration as YAML")
            }
            other => anyhow::bail!("Unsupported format: {other} (expected toml, json or yaml)"),
        }
    }
}
