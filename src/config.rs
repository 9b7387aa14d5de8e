use clap::Parser;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "moonshotai/kimi-k2-instruct-0905";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 16384;
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_PROVIDER: &str = "groq";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:7187";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GROQ_API_KEY environment variable is not set (get a key at https://console.groq.com/)")]
    MissingApiKey,
    #[error("max output tokens must be greater than zero")]
    ZeroMaxTokens,
}

/// Command line for the gateway binary. Every flag can also come from the
/// environment (after `.env` loading).
#[derive(Debug, Clone, Parser)]
#[command(
    name = "messages2chat",
    version,
    about = "Anthropic Messages API gateway for OpenAI-compatible tool-calling backends"
)]
pub struct Cli {
    /// Backend model used for every request
    #[arg(long, env = "MESSAGES2CHAT_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Maximum output tokens forwarded to the backend
    #[arg(
        long = "max-tokens",
        env = "MESSAGES2CHAT_MAX_TOKENS",
        default_value_t = DEFAULT_MAX_OUTPUT_TOKENS
    )]
    pub max_tokens: u32,

    /// Base URL of the Chat Completions API
    #[arg(long = "base-url", env = "GROQ_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Provider label used to prefix the model in responses
    #[arg(long, env = "MESSAGES2CHAT_PROVIDER", default_value = DEFAULT_PROVIDER)]
    pub provider: String,

    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,

    /// Backend API key
    #[arg(long = "api-key", env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Immutable process-wide settings, built once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Label in front of the model name in responses (`groq/<model>`).
    pub provider: String,
    pub model: String,
    /// Output-token ceiling.
    pub max_output_tokens: u32,
    pub api_key: String,
    /// Without trailing slash.
    pub base_url: String,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ProxyConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let api_key = cli
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?
            .to_string();
        if cli.max_tokens == 0 {
            return Err(ConfigError::ZeroMaxTokens);
        }
        Ok(Self {
            provider: cli.provider.trim().to_string(),
            model: cli.model.trim().to_string(),
            max_output_tokens: cli.max_tokens,
            api_key,
            base_url: cli.base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    /// Model name as reported back to callers.
    pub fn qualified_model(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}
