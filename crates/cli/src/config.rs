//! Configuration loading from skiff.toml, and credential resolution.

use runtime::{ConversationConfig, RetryPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant exploring a source repository \
with the tools provided. Read before you answer, and be concise.";
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const NETRC_MACHINE: &str = "api.anthropic.com";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub conversation: ConversationSection,

    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Model backend configuration.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum output tokens per model call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Anthropic API key. Falls back to the environment, then ~/.netrc.
    pub api_key: Option<String>,

    /// Override for the API base URL.
    pub base_url: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key: None,
            base_url: None,
        }
    }
}

/// Loop limits and prompts.
#[derive(Debug, Deserialize)]
pub struct ConversationSection {
    #[serde(default = "default_system")]
    pub system: String,

    /// Tool-dispatch rounds allowed per prompt; 0 disables the limit.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Deadline per model call; 0 disables it.
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    pub tool_timeout_secs: Option<u64>,
}

impl Default for ConversationSection {
    fn default() -> Self {
        Self {
            system: default_system(),
            max_tool_rounds: default_max_tool_rounds(),
            max_retries: default_max_retries(),
            model_timeout_secs: default_model_timeout_secs(),
            tool_timeout_secs: None,
        }
    }
}

/// Filesystem tool settings.
#[derive(Debug, Deserialize)]
pub struct ToolsConfig {
    /// Directory the tools operate in.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_search_max_results")]
    pub search_max_results: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            search_max_results: default_search_max_results(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    runtime::DEFAULT_MAX_TOKENS
}

fn default_system() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_max_tool_rounds() -> usize {
    runtime::DEFAULT_MAX_TOOL_ROUNDS
}

fn default_model_timeout_secs() -> u64 {
    runtime::DEFAULT_MODEL_TIMEOUT.as_secs()
}

fn default_max_retries() -> u32 {
    RetryPolicy::default().max_retries
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_search_max_results() -> usize {
    fstools::DEFAULT_MAX_RESULTS
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load the file if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Engine configuration derived from the file.
    pub fn conversation_config(&self) -> ConversationConfig {
        let section = &self.conversation;
        let mut config = ConversationConfig::new(&self.backend.model)
            .max_tokens(self.backend.max_tokens)
            .max_tool_rounds((section.max_tool_rounds > 0).then_some(section.max_tool_rounds))
            .retry(RetryPolicy {
                max_retries: section.max_retries,
                ..RetryPolicy::default()
            })
            .model_timeout(
                (section.model_timeout_secs > 0)
                    .then(|| Duration::from_secs(section.model_timeout_secs)),
            );
        if !section.system.is_empty() {
            config = config.system(&section.system);
        }
        if let Some(secs) = section.tool_timeout_secs {
            config = config.tool_timeout(Duration::from_secs(secs));
        }
        config
    }
}

/// Anthropic credentials, resolved on first use.
///
/// Built once at startup and passed to whoever needs the key. The lookup
/// (config, then `ANTHROPIC_API_KEY`, then the `api.anthropic.com` entry in
/// `~/.netrc`) runs on the first successful call to [`api_key`](Self::api_key)
/// and its result is cached in the `OnceLock` for the life of the value.
pub struct Credentials {
    configured: Option<String>,
    netrc_path: Option<PathBuf>,
    api_key: OnceLock<String>,
}

impl Credentials {
    pub fn new(configured: Option<String>) -> Self {
        let netrc_path = std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".netrc"));
        Self {
            configured,
            netrc_path,
            api_key: OnceLock::new(),
        }
    }

    /// The API key, looked up on first call.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        if let Some(key) = self.api_key.get() {
            return Ok(key);
        }
        let env = std::env::var(API_KEY_ENV).ok();
        let netrc = self
            .netrc_path
            .as_deref()
            .and_then(|path| std::fs::read_to_string(path).ok());
        let key = resolve_api_key(self.configured.as_deref(), env.as_deref(), netrc.as_deref())?;
        Ok(self.api_key.get_or_init(|| key))
    }
}

fn resolve_api_key(
    configured: Option<&str>,
    env: Option<&str>,
    netrc: Option<&str>,
) -> Result<String, ConfigError> {
    configured
        .filter(|key| !key.is_empty())
        .or(env.filter(|key| !key.is_empty()))
        .map(str::to_string)
        .or_else(|| netrc.and_then(|contents| netrc_password(contents, NETRC_MACHINE)))
        .ok_or(ConfigError::MissingCredentials)
}

/// Password of the named machine in a netrc file.
fn netrc_password(contents: &str, machine: &str) -> Option<String> {
    let without_macros = strip_macdefs(contents);
    let mut tokens = without_macros.split_whitespace();
    let mut in_machine = false;

    while let Some(token) = tokens.next() {
        match token {
            "machine" => in_machine = tokens.next() == Some(machine),
            "default" => in_machine = false,
            "password" => {
                let value = tokens.next()?;
                if in_machine {
                    return Some(value.to_string());
                }
            }
            "login" | "account" | "port" => {
                tokens.next();
            }
            _ => {}
        }
    }
    None
}

/// Drop `macdef` bodies, which run from the definition line to the next
/// blank line and may contain arbitrary words.
fn strip_macdefs(contents: &str) -> String {
    let mut kept = String::with_capacity(contents.len());
    let mut in_macro = false;

    for line in contents.lines() {
        if in_macro {
            in_macro = !line.trim().is_empty();
            continue;
        }
        match line.split_whitespace().position(|word| word == "macdef") {
            Some(at) => {
                let before: Vec<_> = line.split_whitespace().take(at).collect();
                kept.push_str(&before.join(" "));
                in_macro = true;
            }
            None => kept.push_str(line),
        }
        kept.push('\n');
    }
    kept
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error(
        "no API key: set backend.api_key, ANTHROPIC_API_KEY, or a netrc entry for api.anthropic.com"
    )]
    MissingCredentials,
}
