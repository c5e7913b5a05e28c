use anyhow::{bail, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::util::{is_local_endpoint_url, non_blank, parse_clamped};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_TRACE_PATH: &str = "/tmp/dualstream-trace.jsonl";
pub const DEFAULT_PROMPT: &str =
    "Use the greet tool to greet Alice, then tell me what the tool reported.";

const DEFAULT_MAX_STEPS: usize = 1;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TOOL_DELAY_MS: u64 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    pub fn label(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
        }
    }
}

/// Credential env vars in priority order. The first one set picks the provider.
pub const CREDENTIAL_SOURCES: [(&str, Provider); 2] = [
    ("ANTHROPIC_API_KEY", Provider::Anthropic),
    ("OPENAI_API_KEY", Provider::OpenAi),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no API key found")]
    MissingCredentials,
}

impl ConfigError {
    /// Lines printed to stderr before exiting with status 1.
    pub fn stderr_lines(&self) -> Vec<String> {
        match self {
            ConfigError::MissingCredentials => {
                let names: Vec<&str> = CREDENTIAL_SOURCES.iter().map(|(name, _)| *name).collect();
                vec![
                    "Error: no API key found.".to_string(),
                    format!("Set {} to choose a model.", names.join(" or ")),
                ]
            }
        }
    }
}

/// Startup settings. `Debug` redacts the API key.
#[derive(Clone)]
pub struct Config {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub api_url: String,
    pub anthropic_version: String,
    pub prompt: String,
    pub max_steps: usize,
    pub max_tokens: u32,
    pub tool_step_delay: Duration,
    pub trace_path: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("anthropic_version", &self.anthropic_version)
            .field("prompt", &self.prompt)
            .field("max_steps", &self.max_steps)
            .field("max_tokens", &self.max_tokens)
            .field("tool_step_delay", &self.tool_step_delay)
            .field("trace_path", &self.trace_path)
            .finish()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));

        let Some((provider, api_key)) = CREDENTIAL_SOURCES
            .iter()
            .find_map(|(name, provider)| get(name).map(|key| (*provider, key)))
        else {
            return Err(ConfigError::MissingCredentials.into());
        };

        let (model, api_url) = match provider {
            Provider::Anthropic => (
                get("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
                get("ANTHROPIC_API_URL").unwrap_or_else(|| DEFAULT_ANTHROPIC_URL.to_string()),
            ),
            Provider::OpenAi => (
                get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                get("OPENAI_API_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            ),
        };

        let max_steps = get("DUALSTREAM_MAX_STEPS")
            .and_then(|v| parse_clamped::<usize>(&v, 1, 8))
            .unwrap_or(DEFAULT_MAX_STEPS);
        let max_tokens = get("DUALSTREAM_MAX_TOKENS")
            .and_then(|v| parse_clamped::<u32>(&v, 128, 8192))
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let tool_delay_ms = get("DUALSTREAM_TOOL_DELAY_MS")
            .and_then(|v| parse_clamped::<u64>(&v, 0, 5_000))
            .unwrap_or(DEFAULT_TOOL_DELAY_MS);

        Ok(Self {
            provider,
            api_key,
            model,
            api_url,
            anthropic_version: get("ANTHROPIC_VERSION")
                .unwrap_or_else(|| "2023-06-01".to_string()),
            prompt: get("DUALSTREAM_PROMPT").unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            max_steps,
            max_tokens,
            tool_step_delay: Duration::from_millis(tool_delay_ms),
            trace_path: get("DUALSTREAM_TRACE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TRACE_PATH)),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid API URL '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if self.provider == Provider::Anthropic
            && !self.is_local_endpoint()
            && !self.model.starts_with("claude-")
        {
            bail!(
                "Invalid model name: '{}'. Expected a model starting with 'claude-'",
                self.model
            );
        }

        Ok(())
    }

    /// Model name as shown in the status row, e.g. `openai:gpt-4o-mini`.
    pub fn display_model(&self) -> String {
        format!("{}:{}", self.provider.label(), self.model)
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }
}
