use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterMode {
    Rules,
    Llm,
}

impl std::str::FromStr for InterpreterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rules" | "" => Ok(InterpreterMode::Rules),
            "llm" => Ok(InterpreterMode::Llm),
            other => Err(format!("Invalid INTERPRETER: {other}. Must be 'rules' or 'llm'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub system_prompt_file: Option<PathBuf>,
}

/// Session and server settings, read once and handed to each component.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub server_url: String,
    pub tool_timeout: Duration,
    pub output_dir: PathBuf,
    pub interpreter: Result<InterpreterMode, String>,
    pub llm: LlmConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            system_prompt_file: None,
        }
    }
}

/// Built-in settings, without looking at the environment.
impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            server_url: "http://localhost:5000".into(),
            tool_timeout: Duration::from_secs(30),
            output_dir: PathBuf::from("."),
            interpreter: Ok(InterpreterMode::Rules),
            llm: LlmConfig::default(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(d.port);
        let tool_timeout = std::env::var("TOOL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(d.tool_timeout);

        Self {
            port,
            server_url: non_empty_var("AUTOSAR_SERVER_URL").unwrap_or(d.server_url),
            tool_timeout,
            output_dir: non_empty_var("OUTPUT_DIR").map(PathBuf::from).unwrap_or(d.output_dir),
            interpreter: std::env::var("INTERPRETER").unwrap_or_default().parse(),
            llm: LlmConfig {
                api_key: non_empty_var("OPENAI_API_KEY"),
                base_url: non_empty_var("OPENAI_BASE_URL").unwrap_or(d.llm.base_url),
                model: non_empty_var("OPENAI_MODEL").unwrap_or(d.llm.model),
                system_prompt_file: non_empty_var("SYSTEM_PROMPT_FILE").map(PathBuf::from),
            },
        }
    }

    /// Check settings that would otherwise fail later at session start.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("PORT cannot be 0".into());
        }
        let mode = self.interpreter.clone()?;
        if mode == InterpreterMode::Llm && self.llm.api_key.is_none() {
            return Err("OPENAI_API_KEY is required when INTERPRETER=llm".into());
        }
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(format!("AUTOSAR_SERVER_URL must be an http(s) URL: {}", self.server_url));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "PORT",
        "AUTOSAR_SERVER_URL",
        "TOOL_TIMEOUT_SECS",
        "OUTPUT_DIR",
        "INTERPRETER",
        "OPENAI_API_KEY",
        "OPENAI_BASE_URL",
        "OPENAI_MODEL",
        "SYSTEM_PROMPT_FILE",
    ];

    fn clear() {
        for v in VARS {
            std::env::remove_var(v);
        }
    }

    #[test]
    #[serial]
    fn defaults_to_local_server_and_rules() {
        clear();
        let cfg = Config::from_env();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.server_url, "http://localhost:5000");
        assert_eq!(cfg.tool_timeout, Duration::from_secs(30));
        assert_eq!(cfg.output_dir, PathBuf::from("."));
        assert_eq!(cfg.interpreter, Ok(InterpreterMode::Rules));
        assert!(cfg.llm.api_key.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    #[serial]
    fn parses_env_overrides() {
        clear();
        std::env::set_var("PORT", "9090");
        std::env::set_var("AUTOSAR_SERVER_URL", "http://ecu-host:8000");
        std::env::set_var("TOOL_TIMEOUT_SECS", "5");
        std::env::set_var("INTERPRETER", "llm");
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        let cfg = Config::from_env();
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.server_url, "http://ecu-host:8000");
        assert_eq!(cfg.tool_timeout, Duration::from_secs(5));
        assert_eq!(cfg.interpreter, Ok(InterpreterMode::Llm));
        assert_eq!(cfg.llm.api_key.as_deref(), Some("sk-test"));
        assert!(cfg.validate().is_ok());
        clear();
    }

    #[test]
    #[serial]
    fn llm_mode_without_key_is_invalid() {
        clear();
        std::env::set_var("INTERPRETER", "llm");
        let err = Config::from_env().validate().unwrap_err();
        assert!(err.contains("OPENAI_API_KEY"));
        clear();
    }

    #[test]
    #[serial]
    fn unknown_interpreter_is_invalid() {
        clear();
        std::env::set_var("INTERPRETER", "magic");
        let err = Config::from_env().validate().unwrap_err();
        assert!(err.contains("Invalid INTERPRETER"));
        clear();
    }

    #[test]
    #[serial]
    fn default_ignores_environment() {
        clear();
        std::env::set_var("PORT", "9191");
        std::env::set_var("INTERPRETER", "magic");
        let cfg = Config::default();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.interpreter, Ok(InterpreterMode::Rules));
        assert!(cfg.validate().is_ok());
        clear();
    }

    #[test]
    #[serial]
    fn zero_port_and_bad_timeout() {
        clear();
        std::env::set_var("PORT", "0");
        std::env::set_var("TOOL_TIMEOUT_SECS", "abc");
        let cfg = Config::from_env();
        assert_eq!(cfg.tool_timeout, Duration::from_secs(30));
        assert!(cfg.validate().unwrap_err().contains("PORT cannot be 0"));
        clear();
    }
}
