pub mod cli;
pub mod model_config;

use crate::utils::error::{ApiError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{validate_path, validate_positive_number, Validate};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PREDICT_COMMAND: &str = "python3 main.py {config}";
pub const DEFAULT_TIMEOUT_SECS: u64 = 6 * 60 * 60;
pub const DEFAULT_PORT: u16 = 5000;
pub const LOG_LEVELS: [&str; 6] = ["TRACE", "DEBUG", "INFO", "WARNING", "WARN", "ERROR"];

/// Module metadata, taken from the crate manifest.
#[derive(Debug, Clone)]
pub struct ApiMetadata {
    pub name: &'static str,
    pub authors: Vec<String>,
    pub author_emails: Vec<String>,
    pub summary: &'static str,
    pub license: &'static str,
    pub version: &'static str,
}

impl ApiMetadata {
    pub fn from_manifest() -> Self {
        let (authors, author_emails) = split_authors(env!("CARGO_PKG_AUTHORS"));
        Self {
            name: env!("CARGO_PKG_NAME"),
            authors,
            author_emails,
            summary: env!("CARGO_PKG_DESCRIPTION"),
            license: env!("CARGO_PKG_LICENSE"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Splits a cargo authors string (`Name <mail>:Other <mail>`) into names and emails.
pub fn split_authors(raw: &str) -> (Vec<String>, Vec<String>) {
    let mut names = Vec::new();
    let mut emails = Vec::new();
    for author in raw.split(':').map(str::trim).filter(|a| !a.is_empty()) {
        match (author.find('<'), author.rfind('>')) {
            (Some(open), Some(close)) if open < close => {
                names.push(author[..open].trim().to_string());
                emails.push(author[open + 1..close].trim().to_string());
            }
            _ => names.push(author.to_string()),
        }
    }
    (names, emails)
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_path: PathBuf,
    pub data_path: PathBuf,
    pub models_path: PathBuf,
    pub model_home: PathBuf,
    pub config_template: String,
    pub predict_command: String,
    pub train_command: Option<String>,
    pub timeout: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
    pub host: String,
    pub port: u16,
    pub metadata: ApiMetadata,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_path = match var("API_BASE_PATH") {
            Some(p) => PathBuf::from(p),
            None => std::env::current_dir()?,
        };
        let path_or = |key: &str, default: &str| {
            var(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| base_path.join(default))
        };

        let timeout_secs = match var("MEDSLIK_TIMEOUT_SECS") {
            Some(raw) => parse_number::<u64>("MEDSLIK_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let port = match var("API_PORT") {
            Some(raw) => parse_number::<u16>("API_PORT", &raw)?,
            None => DEFAULT_PORT,
        };
        let log_format = match var("API_LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|reason| ApiError::InvalidConfigValueError {
                    field: "API_LOG_FORMAT".to_string(),
                    value: raw.clone(),
                    reason,
                })?,
            None => LogFormat::Compact,
        };

        Ok(Self {
            data_path: path_or("DATA_PATH", "data"),
            models_path: path_or("MODELS_PATH", "models"),
            model_home: path_or("MODEL_HOME", "WITOIL_iMagine"),
            config_template: var("MODEL_CONFIG_TEMPLATE").unwrap_or_else(|| "config.toml".to_string()),
            predict_command: var("MEDSLIK_COMMAND")
                .unwrap_or_else(|| DEFAULT_PREDICT_COMMAND.to_string()),
            train_command: var("MEDSLIK_TRAIN_COMMAND"),
            timeout: Duration::from_secs(timeout_secs),
            log_level: var("API_LOG_LEVEL")
                .unwrap_or_else(|| "INFO".to_string())
                .to_ascii_uppercase(),
            log_format,
            host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            base_path,
            metadata: ApiMetadata::from_manifest(),
        })
    }

    pub fn template_path(&self) -> PathBuf {
        self.model_home.join(&self.config_template)
    }

    pub fn case_dir(&self, name: &str) -> PathBuf {
        self.model_home.join("cases").join(name)
    }

    /// Where the model writes the figures of simulation `name`.
    pub fn figures_dir(&self, name: &str) -> PathBuf {
        self.case_dir(name).join("out_files").join("figures")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `tracing` level name for `API_LOG_LEVEL` (`WARNING` → `warn`).
    pub fn tracing_level(&self) -> &'static str {
        match self.log_level.as_str() {
            "TRACE" => "trace",
            "DEBUG" => "debug",
            "WARNING" | "WARN" => "warn",
            "ERROR" => "error",
            _ => "info",
        }
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ApiError::InvalidConfigValueError {
            field: field.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

fn validate_command(field: &str, template: &str, required: &[&str]) -> Result<()> {
    if template.split_whitespace().next().is_none() {
        return Err(ApiError::InvalidConfigValueError {
            field: field.to_string(),
            value: template.to_string(),
            reason: "Command cannot be empty".to_string(),
        });
    }
    for placeholder in required {
        if !template.contains(placeholder) {
            return Err(ApiError::InvalidConfigValueError {
                field: field.to_string(),
                value: template.to_string(),
                reason: format!("Command must contain the {} placeholder", placeholder),
            });
        }
    }
    Ok(())
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Validate for ApiConfig {
    fn validate(&self) -> Result<()> {
        validate_path("DATA_PATH", &path_str(&self.data_path))?;
        validate_path("MODELS_PATH", &path_str(&self.models_path))?;
        validate_path("MODEL_HOME", &path_str(&self.model_home))?;
        validate_path("MODEL_CONFIG_TEMPLATE", &self.config_template)?;

        validate_command("MEDSLIK_COMMAND", &self.predict_command, &["{config}"])?;
        if let Some(train) = &self.train_command {
            validate_command("MEDSLIK_TRAIN_COMMAND", train, &["{model}"])?;
        }

        validate_positive_number("MEDSLIK_TIMEOUT_SECS", self.timeout.as_secs(), 1)?;

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ApiError::InvalidConfigValueError {
                field: "API_LOG_LEVEL".to_string(),
                value: self.log_level.clone(),
                reason: format!("Valid levels: {}", LOG_LEVELS.join(", ")),
            });
        }

        if self.host.trim().is_empty() {
            return Err(ApiError::MissingConfigError {
                field: "API_HOST".to_string(),
            });
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}
