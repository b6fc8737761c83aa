//! Configuration system (layered: defaults > TOML file > env).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::{AgentLoopConfig, TruncationPolicy};
use crate::error::AgentError;
use crate::types::GenerationSettings;

pub const CONFIG_ENV: &str = "VAMPI_CONFIG";

/// Model endpoint settings.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl std::fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: Some(8_000),
            temperature: Some(0.4),
        }
    }
}

/// Loop behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionSettings {
    pub logs_dir: Option<PathBuf>,
    pub max_clarifications: usize,
    pub max_history_messages: usize,
    pub recent_window: usize,
    pub result_preview_chars: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            logs_dir: None,
            max_clarifications: 5,
            max_history_messages: 80,
            recent_window: 20,
            result_preview_chars: 2_000,
        }
    }
}

/// Top-level settings, as read from `vampi.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentSettings {
    pub openai: OpenAiSettings,
    pub execution: ExecutionSettings,
}

impl AgentSettings {
    /// Load defaults, then the TOML file at `path` (or `$VAMPI_CONFIG`), then
    /// environment overrides. A `.env` file is honoured if present.
    pub fn load(path: Option<&Path>) -> Result<Self, AgentError> {
        let _ = dotenvy::dotenv();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        let mut settings = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration file");
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    AgentError::Configuration(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        settings.apply_env_with(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, AgentError> {
        toml::from_str(raw).map_err(|e| AgentError::Configuration(format!("invalid config: {e}")))
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.openai.base_url = Some(url);
        }
        if let Some(model) = non_empty("VAMPI_MODEL") {
            self.openai.model = model;
        }
        if let Some(dir) = non_empty("VAMPI_LOGS_DIR") {
            self.execution.logs_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        let exec = &self.execution;
        if exec.max_history_messages == 0 {
            return Err(AgentError::Configuration(
                "execution.max_history_messages must be at least 1".into(),
            ));
        }
        if exec.recent_window >= exec.max_history_messages {
            return Err(AgentError::Configuration(format!(
                "execution.recent_window ({}) must be smaller than max_history_messages ({})",
                exec.recent_window, exec.max_history_messages
            )));
        }
        if self.openai.model.trim().is_empty() {
            return Err(AgentError::Configuration("openai.model must not be empty".into()));
        }
        Ok(())
    }

    pub fn api_key(&self) -> Result<&str, AgentError> {
        self.openai
            .api_key
            .as_deref()
            .ok_or_else(|| AgentError::Authentication("OPENAI_API_KEY is not set".into()))
    }

    /// Configured logs directory, else the platform data dir, else `./logs`.
    pub fn logs_dir(&self) -> PathBuf {
        if let Some(dir) = &self.execution.logs_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("dev", "vampi", "vampi")
            .map(|dirs| dirs.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    pub fn truncation_policy(&self) -> TruncationPolicy {
        TruncationPolicy {
            max_messages: self.execution.max_history_messages,
            recent_window: self.execution.recent_window,
        }
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            max_tokens: self.openai.max_tokens,
            temperature: self.openai.temperature,
            ..Default::default()
        }
    }

    /// Loop configuration for a session in `workspace`.
    pub fn loop_config(&self, workspace: impl Into<PathBuf>) -> AgentLoopConfig {
        AgentLoopConfig::builder()
            .model(self.openai.model.clone())
            .settings(self.generation_settings())
            .workspace(workspace)
            .max_clarifications(self.execution.max_clarifications)
            .truncation(self.truncation_policy())
            .result_preview_chars(self.execution.result_preview_chars)
            .logs_dir(self.logs_dir())
            .build()
    }
}
