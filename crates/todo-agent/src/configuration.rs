use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::agent::{AgentConfig, DEFAULT_MAX_ROUNDS, DEFAULT_SYSTEM_PROMPT};
use crate::providers::configs::{
    AnthropicProviderConfig, OpenAiProviderConfig, ProviderConfig, ANTHROPIC_HOST,
    ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS, OPENAI_HOST, OPENAI_MODEL,
};
use crate::providers::factory::ProviderType;
use crate::todo::client::{TodoApiError, TodoClient, TODO_API_BASE};

pub const ENV_PREFIX: &str = "TODO_AGENT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration; set the {env_var} environment variable")]
    MissingEnvVar { env_var: String },

    #[error("Invalid server address: {0}")]
    InvalidAddress(#[from] AddrParseError),

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets the given settings field.
/// Bare field names belong to the `provider` section, the only one without defaults.
pub fn to_env_var(field: &str) -> String {
    let path = match field {
        "provider" => "provider.type".to_string(),
        f if f.contains('.') => f.to_string(),
        f => format!("provider.{}", f),
    };
    format!("{}_{}", ENV_PREFIX, path.replace('.', "__").to_uppercase())
}

/// `~/.config/todo-agent`, shared by the config file and saved sessions
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("todo-agent"))
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Deserialize)]
pub struct TodoApiSettings {
    #[serde(default = "default_todo_api_base")]
    pub base_url: String,
    #[serde(default = "default_todo_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TodoApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_todo_api_base(),
            timeout_secs: default_todo_timeout_secs(),
        }
    }
}

impl TodoApiSettings {
    pub fn client(&self) -> Result<TodoClient, TodoApiError> {
        TodoClient::new(&self.base_url, Duration::from_secs(self.timeout_secs))
    }
}

/// Timeouts of zero disable the corresponding limit
#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub parallel_tool_calls: bool,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            model_timeout_secs: default_model_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            parallel_tool_calls: false,
            system_prompt: None,
        }
    }
}

impl AgentSettings {
    pub fn to_config(&self) -> AgentConfig {
        let limit = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        AgentConfig {
            max_rounds: self.max_rounds,
            model_timeout: limit(self.model_timeout_secs),
            tool_timeout: limit(self.tool_timeout_secs),
            parallel_tool_calls: self.parallel_tool_calls,
            system_prompt: self
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    Anthropic {
        #[serde(default = "default_anthropic_host")]
        host: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_anthropic_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default = "default_max_tokens")]
        max_tokens: Option<i32>,
    },
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::Anthropic { .. } => ProviderType::Anthropic,
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
        }
    }

    /// The vendor's conventional variable, consulted when no key is configured
    pub fn vendor_api_key_var(&self) -> &'static str {
        match self {
            ProviderSettings::Anthropic { .. } => "ANTHROPIC_API_KEY",
            ProviderSettings::OpenAi { .. } => "OPENAI_API_KEY",
        }
    }

    pub fn into_config(self) -> Result<ProviderConfig, ConfigError> {
        let fallback_var = self.vendor_api_key_var();
        let resolve_key = |api_key: Option<String>| {
            api_key
                .filter(|k| !k.is_empty())
                .or_else(|| std::env::var(fallback_var).ok().filter(|k| !k.is_empty()))
                .ok_or_else(|| ConfigError::MissingEnvVar {
                    env_var: fallback_var.to_string(),
                })
        };

        match self {
            ProviderSettings::Anthropic {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => Ok(ProviderConfig::Anthropic(AnthropicProviderConfig {
                host,
                api_key: resolve_key(api_key)?,
                model,
                temperature,
                max_tokens,
            })),
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => Ok(ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key: resolve_key(api_key)?,
                model,
                temperature,
                max_tokens,
            })),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub todo_api: TodoApiSettings,
    #[serde(default)]
    pub agent: AgentSettings,
}

impl Settings {
    /// Defaults, then `~/.config/todo-agent/config.toml` if present, then the environment
    pub fn new() -> Result<Self, ConfigError> {
        let file = config_dir().map(|dir| dir.join("config.toml"));
        Self::load(file.as_deref())
    }

    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("provider.type", ProviderType::Anthropic.to_string())?;

        if let Some(path) = config_file {
            tracing::debug!(path = %path.display(), "reading config file");
            builder = builder.add_source(File::from(path).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // "missing field `api_key`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_todo_api_base() -> String {
    TODO_API_BASE.to_string()
}

fn default_todo_timeout_secs() -> u64 {
    30
}

fn default_max_rounds() -> usize {
    DEFAULT_MAX_ROUNDS
}

fn default_model_timeout_secs() -> u64 {
    600
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_anthropic_host() -> String {
    ANTHROPIC_HOST.to_string()
}

fn default_anthropic_model() -> String {
    ANTHROPIC_MODEL.to_string()
}

fn default_max_tokens() -> Option<i32> {
    Some(DEFAULT_MAX_TOKENS)
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_openai_model() -> String {
    OPENAI_MODEL.to_string()
}
