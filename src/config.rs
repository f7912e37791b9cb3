use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_MODEL_NAME: &str = "gpt-4.1";
pub const DEFAULT_MODEL_PROVIDER: &str = "OPENAI";
const DEFAULT_CONFIG_PATH: &str = "prompt_shim.toml";
pub const DEFAULT_LOG_FILTER: &str = "prompt_shim=info";
const MAX_RETRIES_CAP: u32 = 10;

/// Main configuration loaded from prompt_shim.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShimConfig {
    /// Directory receiving one transcript file per intercepted call
    pub output_dir: PathBuf,
    /// Print transcripts to stdout as well as writing them to disk
    pub console_echo: bool,
    /// Attempts made by `call_llm` before falling back to a default response
    pub max_retries: u32,
    /// Global model used when an agent has no model of its own
    pub model: ModelSelection,
    /// Per-agent model configuration, keyed by agent name
    pub agents: HashMap<String, AgentModelConfig>,
}

/// Model name and provider reported for a call
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelSelection {
    pub name: String,
    pub provider: String,
}

impl ModelSelection {
    /// Model for `agent`: its own entry when both name and provider are set,
    /// otherwise the global model.
    pub fn resolve(config: &ShimConfig, agent: Option<&str>) -> Self {
        agent
            .and_then(|name| config.agents.get(name))
            .and_then(|cfg| match (&cfg.model_name, &cfg.model_provider) {
                (Some(name), Some(provider)) if !name.is_empty() && !provider.is_empty() => {
                    Some(Self {
                        name: name.clone(),
                        provider: provider.clone(),
                    })
                }
                _ => None,
            })
            .unwrap_or_else(|| config.model.clone())
    }
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL_NAME.to_string(),
            provider: DEFAULT_MODEL_PROVIDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AgentModelConfig {
    pub model_name: Option<String>,
    pub model_provider: Option<String>,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./outputs"),
            console_echo: true,
            max_retries: 3,
            model: ModelSelection::default(),
            agents: HashMap::new(),
        }
    }
}

impl ShimConfig {
    /// Load configuration from TOML file and environment variables
    /// Uses PROMPT_SHIM_CONFIG environment variable or defaults to "prompt_shim.toml"
    pub fn load() -> anyhow::Result<Self> {
        Self::load_env_file();

        let config_path =
            std::env::var("PROMPT_SHIM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config: ShimConfig = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load `.env` (or `SHIM_ENV_FILE`). Variables already set are kept, so
    /// calling this more than once is harmless.
    pub fn load_env_file() {
        if let Ok(env_path) = std::env::var("SHIM_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::dotenv();
        }
    }

    /// tracing filter for the binary: `SHIM_LOG`, else [`DEFAULT_LOG_FILTER`].
    /// Read before `load` so config warnings reach an installed subscriber.
    pub fn log_filter<F>(lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup("SHIM_LOG")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }

    /// Apply SHIM_* overrides from `lookup` (env-first).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("SHIM_OUTPUT_DIR").filter(|v| !v.trim().is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(name) = lookup("SHIM_MODEL_NAME").filter(|v| !v.trim().is_empty()) {
            self.model.name = name;
        }
        if let Some(provider) = lookup("SHIM_MODEL_PROVIDER").filter(|v| !v.trim().is_empty()) {
            self.model.provider = provider;
        }
        if let Some(retries) = lookup("SHIM_MAX_RETRIES").and_then(|v| v.parse::<u32>().ok()) {
            self.max_retries = retries;
        }
        if let Some(echo) = lookup("SHIM_CONSOLE_ECHO") {
            if echo == "0" || echo.eq_ignore_ascii_case("false") {
                self.console_echo = false;
            } else if echo == "1" || echo.eq_ignore_ascii_case("true") {
                self.console_echo = true;
            }
        }

        if self.max_retries == 0 {
            self.max_retries = 1;
        } else if self.max_retries > MAX_RETRIES_CAP {
            tracing::warn!(
                "max_retries {} exceeds max {}, clamping",
                self.max_retries,
                MAX_RETRIES_CAP
            );
            self.max_retries = MAX_RETRIES_CAP;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ShimConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("./outputs"));
        assert_eq!(config.model.name, "gpt-4.1");
        assert_eq!(config.model.provider, "OPENAI");
        assert_eq!(config.max_retries, 3);
        assert!(config.console_echo);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ShimConfig::default();
        config.apply_env(env(&[
            ("SHIM_OUTPUT_DIR", "/tmp/shim"),
            ("SHIM_MODEL_NAME", "claude-sonnet"),
            ("SHIM_MODEL_PROVIDER", "ANTHROPIC"),
            ("SHIM_CONSOLE_ECHO", "false"),
        ]));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/shim"));
        assert_eq!(config.model.name, "claude-sonnet");
        assert_eq!(config.model.provider, "ANTHROPIC");
        assert!(!config.console_echo);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_clamp_warning_reaches_subscriber_built_from_log_filter() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(ShimConfig::log_filter(env(&[]))))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut config = ShimConfig::default();
            config.apply_env(env(&[("SHIM_MAX_RETRIES", "50")]));
        });

        let logged = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("max_retries 50 exceeds max 10"), "{}", logged);
    }

    #[test]
    fn test_log_filter_from_env_or_default() {
        assert_eq!(
            ShimConfig::log_filter(env(&[("SHIM_LOG", "prompt_shim=debug")])),
            "prompt_shim=debug"
        );
        assert_eq!(ShimConfig::log_filter(env(&[("SHIM_LOG", "  ")])), DEFAULT_LOG_FILTER);
        assert_eq!(ShimConfig::log_filter(env(&[])), "prompt_shim=info");
    }

    #[test]
    fn test_max_retries_clamped() {
        let mut config = ShimConfig::default();
        config.apply_env(env(&[("SHIM_MAX_RETRIES", "0")]));
        assert_eq!(config.max_retries, 1);

        config.apply_env(env(&[("SHIM_MAX_RETRIES", "50")]));
        assert_eq!(config.max_retries, 10);

        config.apply_env(env(&[("SHIM_MAX_RETRIES", "not-a-number")]));
        assert_eq!(config.max_retries, 10);
    }

    #[test]
    fn test_toml_agents_and_model_resolution() {
        let config: ShimConfig = toml::from_str(
            r#"
            output_dir = "runs"

            [model]
            name = "gpt-4o"
            provider = "OPENAI"

            [agents.risk_manager]
            model_name = "llama3"
            model_provider = "OLLAMA"

            [agents.half_configured]
            model_name = "orphan"
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("runs"));
        assert_eq!(config.max_retries, 3);
        assert_eq!(
            ModelSelection::resolve(&config, Some("risk_manager")),
            ModelSelection {
                name: "llama3".into(),
                provider: "OLLAMA".into()
            }
        );
        assert_eq!(ModelSelection::resolve(&config, Some("half_configured")).name, "gpt-4o");
        assert_eq!(ModelSelection::resolve(&config, Some("missing")).name, "gpt-4o");
        assert_eq!(ModelSelection::resolve(&config, None).provider, "OPENAI");
    }
}
