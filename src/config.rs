//! Configuration for the quiz trainer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Config {
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(self)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "quiz-trainer")
            .map(|d| d.config_dir().join("config.toml"))
    }

    /// Where question data, results, and the log file live. Resolution
    /// order: `QUIZ_TRAINER_DATA_DIR`, the config override, the platform
    /// data directory, the current directory.
    pub fn data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var("QUIZ_TRAINER_DATA_DIR") {
            if !dir.trim().is_empty() {
                return PathBuf::from(dir);
            }
        }
        if let Some(dir) = &self.storage.data_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "quiz-trainer")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn questions_path(&self) -> PathBuf {
        self.data_dir().join("questions.json")
    }

    pub fn results_path(&self) -> PathBuf {
        self.data_dir().join("results.txt")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir().join("quiz-trainer.log")
    }

    /// Resolve the API key from the configured environment variable, once,
    /// at startup. The rest of the program never reads the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Optional override for the data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Weighting strategy for practice mode ("accuracy" or "miss-count").
    #[serde(default = "default_strategy")]
    pub strategy: String,
}

fn default_strategy() -> String {
    "accuracy".to_string()
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.selection.strategy, "accuracy");
        assert_eq!(config.llm.timeout_secs, 30);
        assert!(config.llm.endpoint.starts_with("https://"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[selection]\nstrategy = \"miss-count\"\n").unwrap();
        assert_eq!(config.selection.strategy, "miss-count");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn test_paths_derive_from_data_dir() {
        let config: Config = toml::from_str("[storage]\ndata_dir = \"/tmp/quiz\"\n").unwrap();
        // The env override takes precedence over config; skip when set.
        if std::env::var("QUIZ_TRAINER_DATA_DIR").is_err() {
            assert_eq!(config.questions_path(), PathBuf::from("/tmp/quiz/questions.json"));
            assert_eq!(config.results_path(), PathBuf::from("/tmp/quiz/results.txt"));
        }
    }
}
