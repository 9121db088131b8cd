use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Overrides `service.base_url` when set.
pub const API_BASE_ENV: &str = "LEGALEASE_API_BASE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub highlight: Highlight,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub history: History,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Loads `path` when given, otherwise falls back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn apply_env(&mut self) {
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            self.apply_base_url(&base);
        }
    }

    pub fn apply_base_url(&mut self, base: &str) {
        let base = base.trim();
        if !base.is_empty() {
            self.service.base_url = base.to_string();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}
impl Default for Service {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            timeout_seconds: 120,
            user_agent: concat!("legalease/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_upload_bytes: u64,
    pub accepted_extensions: Vec<String>,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            accepted_extensions: vec!["pdf".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Highlight {
    /// Raised to 3 if set lower.
    pub min_term_chars: usize,
    /// Capped at 20 if set higher.
    pub max_terms: usize,
    /// Compiled pattern budget in bytes; long clauses need more than regex's default.
    pub regex_size_limit: usize,
}
impl Default for Highlight {
    fn default() -> Self {
        Self {
            min_term_chars: 3,
            max_terms: 20,
            regex_size_limit: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub citation_preview_chars: usize,
    pub pretty_json: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            citation_preview_chars: 120,
            pretty_json: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct History {
    pub persist_session: bool,
    pub session_file: String,
}
impl Default for History {
    fn default() -> Self {
        Self {
            persist_session: true,
            session_file: ".legalease/qa-history.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: ".legalease/legalease.log".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}
