//! `mnemo` configuration file.

use mnemo_core::MemoryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Contents of `config.toml`. Every table is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub default: DefaultConfig,
    pub api_keys: ApiKeysConfig,
    /// Pipeline settings handed to the memory manager as-is
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultConfig {
    pub db_path: Option<String>,
    /// Chat model, e.g. `gpt-4o-mini`
    pub model: Option<String>,
    /// OpenAI-compatible endpoint override
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub openai: Option<String>,
}

impl CliConfig {
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Missing, unreadable or malformed files all yield the defaults.
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        path.filter(|path| path.exists())
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// `~/.config/mnemo/config.toml` on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mnemo").join("config.toml"))
    }

    /// Export the configured key unless the environment already has one.
    ///
    /// # Safety
    /// Mutates the process environment. Call it first thing in main(), before any
    /// task is spawned.
    pub fn apply_api_key_env(&self) {
        if let Some(key) = &self.api_keys.openai
            && std::env::var(OPENAI_API_KEY_ENV).is_err()
        {
            // SAFETY: called once at startup before any task reads the environment
            unsafe { std::env::set_var(OPENAI_API_KEY_ENV, key) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::TriggerStrategy;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = CliConfig::load_from_path(Some(dir.path().join("config.toml")));
        assert_eq!(config.memory, MemoryConfig::default());
        assert!(config.api_keys.openai.is_none());
    }

    #[test]
    fn partial_memory_table_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[default]
model = "gpt-4o"

[memory]
async_processing = false

[memory.summary_trigger]
strategy = "ByMessageCount"
message_threshold = 4
"#,
        )
        .unwrap();

        let config = CliConfig::load_from_path(Some(path));
        assert_eq!(config.default.model.as_deref(), Some("gpt-4o"));
        assert!(!config.memory.async_processing);
        assert_eq!(config.memory.memory_limit, 30);
        assert_eq!(
            config.memory.summary_trigger.strategy,
            TriggerStrategy::ByMessageCount
        );
        assert_eq!(config.memory.summary_trigger.message_threshold, 4);
        assert_eq!(config.memory.summary_trigger.min_interval_secs, 600);
    }

    #[test]
    fn invalid_toml_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "memory = [not toml").unwrap();

        let config = CliConfig::load_from_path(Some(path));
        assert_eq!(config.memory, MemoryConfig::default());
    }
}
