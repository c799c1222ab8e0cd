//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory (or
//! an explicit path), then applies `PAYSOKO_*`, `NEO4J_*` and `LLM_API_KEY`
//! env overrides. Secrets are never sourced from TOML.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    pub enabled: bool,
}

/// HTTP channel configuration (service endpoint + web UI).
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    /// Socket address to bind the HTTP channel to.
    pub bind: String,
}

/// Comms subsystem configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub http: HttpConfig,
}

/// Anthropic Messages API configuration (`[llm.anthropic]`).
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// Base URL; `/v1/messages` is appended.
    pub api_base_url: String,
    pub model: String,
    /// Required by the Messages API on every request.
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

/// OpenAI / OpenAI-compatible provider configuration (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"anthropic"`, `"openai"`, `"dummy"`).
    /// Maps to `default` in `[llm]`.
    pub provider: String,
    pub anthropic: AnthropicConfig,
    pub openai: OpenAiConfig,
}

impl LlmConfig {
    /// Model name of the active provider, for logs and health output.
    pub fn active_model(&self) -> &str {
        match self.provider.as_str() {
            "openai" | "openai-compatible" => &self.openai.model,
            "dummy" => "dummy",
            _ => &self.anthropic.model,
        }
    }
}

/// Neo4j connection settings. Credentials come from `NEO4J_USERNAME` /
/// `NEO4J_PASSWORD` only.
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    /// HTTP base URI, e.g. `http://localhost:7474`.
    pub uri: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub neo4j: Neo4jConfig,
}

/// Full-text index names used for entity mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNames {
    pub location: String,
    pub service: String,
    pub appointment: String,
}

impl Default for IndexNames {
    fn default() -> Self {
        Self {
            location: "locationIndex".into(),
            service: "serviceIndex".into(),
            appointment: "appointmentIndex".into(),
        }
    }
}

/// QA pipeline and interaction-log settings.
#[derive(Debug, Clone)]
pub struct QaConfig {
    /// CSV interaction log (already resolved against `work_dir`).
    pub log_file: PathBuf,
    /// Tone used by the interactive UIs until the user picks another.
    pub default_tone: String,
    pub indexes: IndexNames,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    /// Working directory for persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub comms: CommsConfig,
    pub llm: LlmConfig,
    /// API key from `LLM_API_KEY`; `None` for keyless local models.
    pub llm_api_key: Option<String>,
    pub graph: GraphConfig,
    pub qa: QaConfig,
}

impl Config {
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    pub fn comms_http_should_load(&self) -> bool {
        self.comms.http.enabled
    }
}

/// Environment-sourced values, gathered once so tests can pass them directly
/// instead of mutating the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub work_dir: Option<String>,
    pub log_level: Option<String>,
    pub llm_api_key: Option<String>,
    pub neo4j_uri: Option<String>,
    pub neo4j_database: Option<String>,
    pub neo4j_username: Option<String>,
    pub neo4j_password: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            work_dir: env::var("PAYSOKO_WORK_DIR").ok(),
            log_level: env::var("PAYSOKO_LOG_LEVEL").ok(),
            llm_api_key: env::var("LLM_API_KEY").ok(),
            neo4j_uri: env::var("NEO4J_URI").ok(),
            neo4j_database: env::var("NEO4J_DATABASE").ok(),
            neo4j_username: env::var("NEO4J_USERNAME").ok(),
            neo4j_password: env::var("NEO4J_PASSWORD").ok(),
        }
    }
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    service: RawService,
    #[serde(default)]
    comms: RawComms,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    graph: RawGraph,
    #[serde(default)]
    qa: RawQa,
}

#[derive(Deserialize)]
struct RawService {
    name: String,
    work_dir: String,
    log_level: String,
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
    #[serde(default)]
    http: RawHttp,
}

#[derive(Deserialize, Default)]
struct RawPty {
    /// Defaults to `false`: the console is opted into with `-i`.
    #[serde(default)]
    enabled: bool,
}

#[derive(Deserialize)]
struct RawHttp {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_http_bind")]
    bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self { enabled: true, bind: default_http_bind() }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    anthropic: RawAnthropicConfig,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            anthropic: RawAnthropicConfig::default(),
            openai: RawOpenAiConfig::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawAnthropicConfig {
    #[serde(default = "default_anthropic_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_anthropic_model")]
    model: String,
    #[serde(default = "default_anthropic_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_temperature")]
    temperature: f32,
    #[serde(default = "default_llm_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawAnthropicConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_anthropic_api_base_url(),
            model: default_anthropic_model(),
            max_tokens: default_anthropic_max_tokens(),
            temperature: default_temperature(),
            timeout_seconds: default_llm_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_temperature")]
    temperature: f32,
    #[serde(default = "default_llm_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_temperature(),
            timeout_seconds: default_llm_timeout_seconds(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawGraph {
    #[serde(default)]
    neo4j: RawNeo4j,
}

#[derive(Deserialize)]
struct RawNeo4j {
    #[serde(default = "default_neo4j_uri")]
    uri: String,
    #[serde(default = "default_neo4j_database")]
    database: String,
    #[serde(default = "default_neo4j_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawNeo4j {
    fn default() -> Self {
        Self {
            uri: default_neo4j_uri(),
            database: default_neo4j_database(),
            timeout_seconds: default_neo4j_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawQa {
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_tone")]
    default_tone: String,
    #[serde(default = "default_location_index")]
    location_index: String,
    #[serde(default = "default_service_index")]
    service_index: String,
    #[serde(default = "default_appointment_index")]
    appointment_index: String,
}

impl Default for RawQa {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            default_tone: default_tone(),
            location_index: default_location_index(),
            service_index: default_service_index(),
            appointment_index: default_appointment_index(),
        }
    }
}

fn default_true() -> bool { true }
fn default_http_bind() -> String { "127.0.0.1:8000".to_string() }
fn default_llm_provider() -> String { "anthropic".to_string() }
fn default_anthropic_api_base_url() -> String { "https://api.anthropic.com".to_string() }
fn default_anthropic_model() -> String { "claude-3-opus-20240229".to_string() }
fn default_anthropic_max_tokens() -> u32 { 1024 }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_temperature() -> f32 { 0.0 }
fn default_llm_timeout_seconds() -> u64 { 60 }
fn default_neo4j_uri() -> String { "http://localhost:7474".to_string() }
fn default_neo4j_database() -> String { "neo4j".to_string() }
fn default_neo4j_timeout_seconds() -> u64 { 30 }
fn default_log_file() -> String { "qa_logs.csv".to_string() }
fn default_tone() -> String { "Professional and formal".to_string() }
fn default_location_index() -> String { IndexNames::default().location }
fn default_service_index() -> String { IndexNames::default().service }
fn default_appointment_index() -> String { IndexNames::default().appointment }

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load config from `path` (or `config/default.toml`), then apply env overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let path = Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH));
    load_from(path, &EnvOverrides::from_env())
}

/// Loader that accepts an explicit path and overrides.
pub fn load_from(path: &Path, overrides: &EnvOverrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
    parse(&raw, overrides)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))
}

fn parse(raw: &str, overrides: &EnvOverrides) -> Result<Config, String> {
    let parsed: RawConfig = toml::from_str(raw).map_err(|e| e.to_string())?;

    let s = parsed.service;
    let work_dir = expand_home(overrides.work_dir.as_deref().unwrap_or(&s.work_dir));
    let log_level = overrides.log_level.clone().unwrap_or(s.log_level);

    let log_file = {
        let p = expand_home(&parsed.qa.log_file);
        if p.is_absolute() { p } else { work_dir.join(p) }
    };

    let neo4j = parsed.graph.neo4j;

    Ok(Config {
        name: s.name,
        work_dir,
        log_level,
        comms: CommsConfig {
            pty: PtyConfig { enabled: parsed.comms.pty.enabled },
            http: HttpConfig {
                enabled: parsed.comms.http.enabled,
                bind: parsed.comms.http.bind,
            },
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            anthropic: AnthropicConfig {
                api_base_url: parsed.llm.anthropic.api_base_url,
                model: parsed.llm.anthropic.model,
                max_tokens: parsed.llm.anthropic.max_tokens,
                temperature: parsed.llm.anthropic.temperature,
                timeout_seconds: parsed.llm.anthropic.timeout_seconds,
            },
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        llm_api_key: overrides.llm_api_key.clone(),
        graph: GraphConfig {
            neo4j: Neo4jConfig {
                uri: overrides.neo4j_uri.clone().unwrap_or(neo4j.uri),
                database: overrides.neo4j_database.clone().unwrap_or(neo4j.database),
                username: overrides.neo4j_username.clone(),
                password: overrides.neo4j_password.clone(),
                timeout_seconds: neo4j.timeout_seconds,
            },
        },
        qa: QaConfig {
            log_file,
            default_tone: parsed.qa.default_tone,
            indexes: IndexNames {
                location: parsed.qa.location_index,
                service: parsed.qa.service_index,
                appointment: parsed.qa.appointment_index,
            },
        },
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests: dummy LLM, no secrets, no external calls.
#[cfg(test)]
impl Config {
    pub fn test_default(work_dir: &Path) -> Self {
        Self {
            name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            comms: CommsConfig {
                pty: PtyConfig { enabled: false },
                http: HttpConfig { enabled: false, bind: default_http_bind() },
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                anthropic: AnthropicConfig {
                    api_base_url: "http://localhost:0".into(),
                    model: "test-model".into(),
                    max_tokens: 64,
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            llm_api_key: None,
            graph: GraphConfig {
                neo4j: Neo4jConfig {
                    uri: "http://localhost:0".into(),
                    database: "neo4j".into(),
                    username: None,
                    password: None,
                    timeout_seconds: 1,
                },
            },
            qa: QaConfig {
                log_file: work_dir.join("qa_logs.csv"),
                default_tone: default_tone(),
                indexes: IndexNames::default(),
            },
        }
    }
}
