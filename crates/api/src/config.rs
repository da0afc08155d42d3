use chrono::NaiveDate;
use std::str::FromStr;

use preprocess::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
    /// Problems found while loading, reported once logging is up
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Fixed "today" for resolving relative dates. Unset means the local date.
    pub reference_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:3000".to_string(),
            },
            llm: LlmConfig {
                model: DEFAULT_MODEL.to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
                request_timeout_secs: DEFAULT_TIMEOUT_SECS,
                reference_date: None,
            },
            logging: LoggingConfig {
                format: LogFormat::Pretty,
            },
            warnings: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, starting from the defaults.
    /// Values that fail to parse are skipped and noted in `warnings`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(addr) = get("APP_BIND_ADDR") {
            config.server.bind_addr = addr;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            config.llm.model = model;
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Some(raw) = get("GEMINI_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.llm.request_timeout_secs = secs,
                _ => config
                    .warnings
                    .push(format!("Ignoring invalid GEMINI_TIMEOUT_SECS: {}", raw)),
            }
        }
        if let Some(raw) = get("PREPROCESS_TODAY") {
            match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(date) => config.llm.reference_date = Some(date),
                Err(e) => config
                    .warnings
                    .push(format!("Ignoring invalid PREPROCESS_TODAY {}: {}", raw, e)),
            }
        }
        if let Some(raw) = get("LOG_FORMAT") {
            match raw.parse() {
                Ok(format) => config.logging.format = format,
                Err(e) => config.warnings.push(format!("Ignoring invalid LOG_FORMAT: {}", e)),
            }
        }

        config
    }
}
