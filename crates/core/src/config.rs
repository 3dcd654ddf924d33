use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Key lookup with optional profile prefix.
///
/// When a profile is set (e.g. `PROD`), every key is first looked up as
/// `{PROFILE}_{KEY}`, falling back to `{KEY}`. Empty values count as unset.
struct Lookup<'a> {
    profile: &'a str,
    source: &'a dyn Fn(&str) -> Option<String>,
}

impl Lookup<'_> {
    fn opt(&self, key: &str) -> Option<String> {
        if !self.profile.is_empty() {
            let prefixed = format!("{}_{}", self.profile, key);
            if let Some(v) = (self.source)(&prefixed).filter(|s| !s.is_empty()) {
                return Some(v);
            }
        }
        (self.source)(key).filter(|s| !s.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.opt(key) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
            }),
            None => Ok(default),
        }
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub mcp: McpConfig,
    pub llm: LlmConfig,
    pub resolver: ResolverConfig,
    pub log: LogConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from the `RELAY_PROFILE` env var.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env::var("RELAY_PROFILE").unwrap_or_default().to_uppercase();
        let source = |key: &str| env::var(key).ok();
        Self::build(&profile, &source)
    }

    /// Build config from an explicit key/value map. Used by tests and
    /// embedders that do not want to touch the process environment.
    pub fn from_vars(profile: &str, vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let source = |key: &str| vars.get(key).cloned();
        Self::build(&profile.to_uppercase(), &source)
    }

    fn build(profile: &str, source: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let l = Lookup { profile, source };
        Ok(Self {
            profile: profile.to_string(),
            server: ServerConfig::from_lookup(&l)?,
            mcp: McpConfig::from_lookup(&l),
            llm: LlmConfig::from_lookup(&l)?,
            resolver: ResolverConfig::from_lookup(&l)?,
            log: LogConfig::from_lookup(&l)?,
        })
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// The tool-provider script path. This is the one setting without a default.
    pub fn require_server_script(&self) -> Result<&PathBuf, ConfigError> {
        self.mcp
            .server_script_path
            .as_ref()
            .ok_or(ConfigError::Missing("SERVER_SCRIPT_PATH"))
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  mcp:       script={}",
            self.mcp
                .server_script_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unset)".to_string())
        );
        tracing::info!(
            "  llm:       model={}, max_tokens={}, key={}",
            self.llm.anthropic_model,
            self.llm.max_tokens,
            if self.llm.is_configured() { "set" } else { "missing" }
        );
        tracing::info!("  resolver:  max_cycles={}", self.resolver.max_cycles);
        tracing::info!(
            "  log:       file={}, console={}",
            self.log.file.display(),
            self.log.console_stream
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "mcp": { "server_script_path": self.mcp.server_script_path },
            "llm": {
                "model": self.llm.anthropic_model,
                "max_tokens": self.llm.max_tokens,
                "configured": self.llm.is_configured(),
            },
            "resolver": { "max_cycles": self.resolver.max_cycles },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_lookup(l: &Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            host: l.or("HOST", "0.0.0.0"),
            port: l.parsed("PORT", 8000)?,
        })
    }
}

// ── MCP tool provider ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Script launched as the tool provider (`.py` or `.js`).
    pub server_script_path: Option<PathBuf>,
}

impl McpConfig {
    fn from_lookup(l: &Lookup<'_>) -> Self {
        Self {
            server_script_path: l.opt("SERVER_SCRIPT_PATH").map(PathBuf::from),
        }
    }
}

// ── LLM (Anthropic) ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
    /// Fixed per-call token ceiling.
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_lookup(l: &Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            anthropic_api_key: l.opt("ANTHROPIC_API_KEY"),
            anthropic_model: l.or("ANTHROPIC_MODEL", "claude-3-5-sonnet-latest"),
            anthropic_base_url: l.or("ANTHROPIC_BASE_URL", "https://api.anthropic.com"),
            max_tokens: l.parsed("LLM_MAX_TOKENS", 1000)?,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.anthropic_api_key.is_some()
    }
}

// ── Resolver ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum model calls per resolution; 0 disables the limit.
    pub max_cycles: usize,
}

impl ResolverConfig {
    fn from_lookup(l: &Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            max_cycles: l.parsed("RELAY_MAX_CYCLES", 25)?,
        })
    }

    pub fn cycle_limit(&self) -> Option<usize> {
        (self.max_cycles > 0).then_some(self.max_cycles)
    }
}

// ── Logging ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub file: PathBuf,
    /// Minimum level for the file sink (e.g. "debug").
    pub file_level: String,
    /// Minimum level for the console sink (e.g. "info").
    pub console_level: String,
    /// Stream the console sink writes to. Stderr keeps stdout free for
    /// command output.
    pub console_stream: ConsoleStream,
}

impl LogConfig {
    fn from_lookup(l: &Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            file: PathBuf::from(l.or("LOG_FILE", "mcp_client.log")),
            file_level: l.or("LOG_FILE_LEVEL", "debug"),
            console_level: l.or("LOG_CONSOLE_LEVEL", "info"),
            console_stream: l.parsed("LOG_CONSOLE_STREAM", ConsoleStream::Stderr)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

impl std::str::FromStr for ConsoleStream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(ConsoleStream::Stdout),
            "stderr" => Ok(ConsoleStream::Stderr),
            other => Err(format!("unknown console stream: {other}")),
        }
    }
}

impl std::fmt::Display for ConsoleStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsoleStream::Stdout => f.write_str("stdout"),
            ConsoleStream::Stderr => f.write_str("stderr"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars("", &HashMap::new()).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm.max_tokens, 1000);
        assert_eq!(config.resolver.cycle_limit(), Some(25));
        assert_eq!(config.log.file_level, "debug");
        assert_eq!(config.log.console_level, "info");
        assert_eq!(config.log.console_stream, ConsoleStream::Stderr);
        assert!(!config.llm.is_configured());
        assert_eq!(config.profile_label(), "default");
    }

    #[test]
    fn test_missing_server_script() {
        let config = Config::from_vars("", &HashMap::new()).unwrap();
        let err = config.require_server_script().unwrap_err();
        assert!(err.to_string().contains("SERVER_SCRIPT_PATH"));
    }

    #[test]
    fn test_server_script_set() {
        let config = Config::from_vars("", &vars(&[("SERVER_SCRIPT_PATH", "tools/server.py")])).unwrap();
        assert_eq!(
            config.require_server_script().unwrap(),
            &PathBuf::from("tools/server.py")
        );
    }

    #[test]
    fn test_profile_prefix_wins() {
        let config = Config::from_vars(
            "prod",
            &vars(&[("PORT", "9000"), ("PROD_PORT", "9100"), ("ANTHROPIC_API_KEY", "sk-test")]),
        )
        .unwrap();
        assert_eq!(config.profile, "PROD");
        assert_eq!(config.server.port, 9100);
        // Falls back to the unprefixed key.
        assert!(config.llm.is_configured());
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = Config::from_vars("", &vars(&[("LLM_MAX_TOKENS", "lots")])).unwrap_err();
        match err {
            ConfigError::Invalid { key, value } => {
                assert_eq!(key, "LLM_MAX_TOKENS");
                assert_eq!(value, "lots");
            }
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_console_stream_setting() {
        let config = Config::from_vars("", &vars(&[("LOG_CONSOLE_STREAM", "STDOUT")])).unwrap();
        assert_eq!(config.log.console_stream, ConsoleStream::Stdout);

        let err = Config::from_vars("", &vars(&[("LOG_CONSOLE_STREAM", "tty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "LOG_CONSOLE_STREAM"));
    }

    #[test]
    fn test_zero_cycles_disables_limit() {
        let config = Config::from_vars("", &vars(&[("RELAY_MAX_CYCLES", "0")])).unwrap();
        assert_eq!(config.resolver.cycle_limit(), None);
    }

    #[test]
    fn test_redacted_summary_hides_key() {
        let config = Config::from_vars("", &vars(&[("ANTHROPIC_API_KEY", "sk-secret")])).unwrap();
        let summary = config.redacted_summary().to_string();
        assert!(!summary.contains("sk-secret"));
        assert!(summary.contains("\"configured\":true"));
    }
}
