//! Runtime configuration for prompt-relay.
//!
//! Configuration is loaded from an optional JSON file and then overridden by
//! command-line flags and environment variables. Everything is fixed once the
//! process starts serving.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "prompt-relay", about = "HTTP relay for the GLM chat-completion API")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address, overrides `server.listen`.
    #[arg(long)]
    pub listen: Option<String>,

    /// API key for the upstream service.
    #[arg(long, env = "ZHIPU_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Upstream model name, overrides `upstream.model`.
    #[arg(long, env = "GLM_MODEL_NAME")]
    pub model: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Upstream chat-completion API configuration.
    pub upstream: UpstreamConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:5006").
    pub listen: String,

    /// Directory holding the front end. `index.html` in it is served at `/`.
    pub static_dir: PathBuf,

    /// Maximum request body size in bytes. Unlimited when unset.
    pub max_body_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5006".to_string(),
            static_dir: PathBuf::from("static"),
            max_body_bytes: None,
        }
    }
}

/// Upstream API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL; `/chat/completions` is appended.
    pub api_base: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f64,

    /// Maximum number of tokens in the reply.
    pub max_tokens: u32,

    /// API key. Usually supplied through `ZHIPU_API_KEY` rather than the file.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: "https://open.bigmodel.cn/api/paas/v4".to_string(),
            model: "glm-4".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Load the file named by `cli.config` and apply the command-line overrides.
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = Self::load(&cli.config)?;
        config.apply_overrides(cli);
        Ok(config)
    }

    /// Apply CLI/env values on top of the file configuration.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.server.listen = listen.clone();
        }
        if let Some(model) = &cli.model {
            self.upstream.model = model.clone();
        }
        if cli.api_key.is_some() {
            self.upstream.api_key = cli.api_key.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["prompt-relay"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.server.listen, "0.0.0.0:5006");
        assert_eq!(cfg.upstream.model, "glm-4");
        assert_eq!(cfg.upstream.temperature, 0.7);
        assert_eq!(cfg.upstream.max_tokens, 2048);
        assert!(cfg.upstream.api_key.is_none());
        assert!(cfg.server.max_body_bytes.is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(cfg.upstream.api_base, "https://open.bigmodel.cn/api/paas/v4");
    }

    #[test]
    fn test_partial_file_keeps_field_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"upstream": {{"model": "glm-4-flash"}}}}"#).unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.upstream.model, "glm-4-flash");
        assert_eq!(cfg.upstream.max_tokens, 2048);
        assert_eq!(cfg.server.static_dir, PathBuf::from("static"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut cfg = Config::default();
        cfg.apply_overrides(&cli(&[
            "--listen",
            "127.0.0.1:9000",
            "--model",
            "glm-4-air",
            "--api-key",
            "secret",
        ]));
        assert_eq!(cfg.server.listen, "127.0.0.1:9000");
        assert_eq!(cfg.upstream.model, "glm-4-air");
        assert_eq!(cfg.upstream.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_env_reaches_upstream_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("absent.json");

        std::env::set_var("ZHIPU_API_KEY", "env-key");
        std::env::set_var("GLM_MODEL_NAME", "glm-4-plus");
        let parsed = cli(&["--config", config_path.to_str().unwrap()]);
        std::env::remove_var("ZHIPU_API_KEY");
        std::env::remove_var("GLM_MODEL_NAME");

        let cfg = Config::from_cli(&parsed).unwrap();
        assert_eq!(cfg.upstream.api_key.as_deref(), Some("env-key"));
        assert_eq!(cfg.upstream.model, "glm-4-plus");
    }
}
