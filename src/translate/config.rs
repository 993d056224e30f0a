//! Adapter configuration
//!
//! [`AdapterConfig`] holds the per-adapter settings (prompts, overrides,
//! streaming flag, error prefix). [`HostDefaults`] holds the backend and model
//! the host environment currently uses; overrides in the config win over them.
//!
//! # Environment
//!
//! | Variable | Field |
//! | --- | --- |
//! | `IMMERSIVE_TRANSLATE_SYSTEM_PROMPT` | `system_prompt` |
//! | `IMMERSIVE_TRANSLATE_USER_PROMPT` | `user_prompt_template` |
//! | `IMMERSIVE_TRANSLATE_BACKEND` | `backend` |
//! | `IMMERSIVE_TRANSLATE_MODEL` | `model` |
//! | `IMMERSIVE_TRANSLATE_STREAM` | `stream` |
//! | `IMMERSIVE_TRANSLATE_ERROR_PREFIX` | `error_prefix` |
//! | `LLM_DEFAULT_BACKEND` | `HostDefaults::backend` |
//! | `LLM_DEFAULT_MODEL` | `HostDefaults::model` |

use crate::translate::error::{AdapterError, AdapterResult};
use crate::translate::prompt::validate_template;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional translator. \
Translate the user's text faithfully, keep the original formatting, \
and reply with the translation only.";

pub const DEFAULT_USER_PROMPT_TEMPLATE: &str =
    "Translate the following text into the target language:\n\n%s";

pub const DEFAULT_ERROR_PREFIX: &str = "[immersive-translate]";

/// Settings for one [`TranslateAdapter`](crate::translate::TranslateAdapter)
///
/// Missing fields in a config file take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub system_prompt: String,
    /// Must contain exactly one `%s`
    pub user_prompt_template: String,
    /// Backend override; `None` falls back to the host default
    pub backend: Option<String>,
    /// Model override; `None` falls back to the host default
    pub model: Option<String>,
    pub stream: bool,
    pub error_prefix: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt_template: DEFAULT_USER_PROMPT_TEMPLATE.to_string(),
            backend: None,
            model: None,
            stream: false,
            error_prefix: DEFAULT_ERROR_PREFIX.to_string(),
        }
    }
}

impl AdapterConfig {
    /// Defaults overlaid with any `IMMERSIVE_TRANSLATE_*` variables that are set
    pub fn from_env() -> AdapterResult<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("IMMERSIVE_TRANSLATE_SYSTEM_PROMPT") {
            config.system_prompt = value;
        }
        if let Ok(value) = std::env::var("IMMERSIVE_TRANSLATE_USER_PROMPT") {
            config.user_prompt_template = value;
        }
        config.backend = non_empty_var("IMMERSIVE_TRANSLATE_BACKEND");
        config.model = non_empty_var("IMMERSIVE_TRANSLATE_MODEL");
        if let Ok(value) = std::env::var("IMMERSIVE_TRANSLATE_STREAM") {
            config.stream = parse_flag(&value).ok_or_else(|| {
                AdapterError::ConfigError(format!(
                    "IMMERSIVE_TRANSLATE_STREAM must be a boolean, got '{}'",
                    value
                ))
            })?;
        }
        if let Ok(value) = std::env::var("IMMERSIVE_TRANSLATE_ERROR_PREFIX") {
            config.error_prefix = value;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> AdapterResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AdapterError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            AdapterError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the user prompt template has exactly one `%s`
    pub fn validate(&self) -> AdapterResult<()> {
        validate_template(&self.user_prompt_template)
    }

    /// Override the host's default backend
    ///
    /// # Arguments
    /// * `backend` - Name the request library knows the backend by (e.g. "openai")
    ///
    /// # Example
    /// ```ignore
    /// let config = AdapterConfig::default()
    ///     .with_backend("deepseek")
    ///     .with_model("deepseek-chat");
    /// ```
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Override the host's default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Replace the template [`Content::Input`](crate::translate::Content::Input) is filled into
    ///
    /// Not validated here; [`TranslateAdapter::new`](crate::translate::TranslateAdapter::new)
    /// rejects a template without exactly one `%s`.
    pub fn with_user_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.user_prompt_template = template.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Text leading every failure message, e.g. `"[immersive-translate]"`
    pub fn with_error_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.error_prefix = prefix.into();
        self
    }
}

/// Backend and model the host environment uses when no override is set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDefaults {
    pub backend: Option<String>,
    pub model: Option<String>,
}

impl HostDefaults {
    /// # Arguments
    /// * `backend` - Backend used when the adapter config sets none
    /// * `model` - Model used when the adapter config sets none; may stay unset
    pub fn new(backend: Option<String>, model: Option<String>) -> Self {
        Self { backend, model }
    }

    /// Read `LLM_DEFAULT_BACKEND` and `LLM_DEFAULT_MODEL`; blank counts as unset
    pub fn from_env() -> Self {
        Self {
            backend: non_empty_var("LLM_DEFAULT_BACKEND"),
            model: non_empty_var("LLM_DEFAULT_MODEL"),
        }
    }
}

/// Backend and model a single request goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveTarget {
    pub backend: String,
    pub model: Option<String>,
}

/// Resolve overrides against host defaults
///
/// A backend is required; a missing model is fine.
pub fn resolve_target(config: &AdapterConfig, host: &HostDefaults) -> AdapterResult<EffectiveTarget> {
    let backend = config
        .backend
        .clone()
        .or_else(|| host.backend.clone())
        .ok_or(AdapterError::NoBackend)?;
    let model = config.model.clone().or_else(|| host.model.clone());

    Ok(EffectiveTarget { backend, model })
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
