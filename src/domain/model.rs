use crate::utils::error::{ApiError, Result};
use crate::utils::validation::{
    validate_bounds, validate_each_in_range, validate_length, validate_non_empty_string,
    validate_path_segment, Validate,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Minimum / maximum number of entries in per-spill lists.
pub const SPILL_LIST_MIN: usize = 1;
pub const SPILL_LIST_MAX: usize = 5;

pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// An oil is either an API gravity number or the exact name of an oil in the model's database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OilSpec {
    Api(f64),
    Name(String),
}

impl From<&OilSpec> for toml::Value {
    fn from(oil: &OilSpec) -> Self {
        match oil {
            OilSpec::Api(api) => toml::Value::Float(*api),
            OilSpec::Name(name) => toml::Value::String(name.clone()),
        }
    }
}

/// Prediction arguments; field names follow the model's configuration keys.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictArgs {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub start_datetime: Option<NaiveDateTime>,
    #[serde(default = "default_sim_length")]
    pub sim_length: f64,

    #[serde(default = "default_spill_lat")]
    pub spill_lat: Vec<f64>,
    #[serde(default = "default_spill_lon")]
    pub spill_lon: Vec<f64>,
    #[serde(default = "default_zero_list")]
    pub spill_duration: Vec<f64>,
    #[serde(default = "default_spill_rate")]
    pub spill_rate: Vec<f64>,
    #[serde(default = "default_zero_list")]
    pub slick_age: Vec<f64>,
    #[serde(default = "default_oil")]
    pub oil: Vec<OilSpec>,

    #[serde(default)]
    pub area_spill: bool,
    #[serde(default)]
    pub area_vertex: bool,
    #[serde(default)]
    pub multiple_slick: bool,

    #[serde(default)]
    pub copernicus_user: Option<String>,
    #[serde(default, skip_serializing)]
    pub copernicus_password: Option<String>,
    #[serde(default, skip_serializing)]
    pub cds_token: Option<String>,

    #[serde(default)]
    pub set_domain: bool,
    #[serde(default = "default_lat")]
    pub lat: Vec<f64>,
    #[serde(default = "default_lon")]
    pub lon: Vec<f64>,
    #[serde(default = "default_delta")]
    pub delta: Vec<f64>,
    #[serde(default = "default_plot_lon")]
    pub plot_lon: Vec<f64>,
    #[serde(default = "default_plot_lat")]
    pub plot_lat: Vec<f64>,

    /// Usually filled from the HTTP `Accept` header.
    #[serde(default)]
    pub accept: Option<String>,
}

fn default_name() -> String {
    "my_experiment".to_string()
}
fn default_sim_length() -> f64 {
    24.0
}
fn default_spill_lat() -> Vec<f64> {
    vec![35.25]
}
fn default_spill_lon() -> Vec<f64> {
    vec![35.90]
}
fn default_zero_list() -> Vec<f64> {
    vec![0.0]
}
fn default_spill_rate() -> Vec<f64> {
    vec![27.78]
}
fn default_oil() -> Vec<OilSpec> {
    vec![OilSpec::Api(28.0)]
}
fn default_lat() -> Vec<f64> {
    vec![31.0, 38.0]
}
fn default_lon() -> Vec<f64> {
    vec![32.0, 37.0]
}
fn default_delta() -> Vec<f64> {
    vec![0.75]
}
fn default_plot_lon() -> Vec<f64> {
    vec![35.5, 36.5]
}
fn default_plot_lat() -> Vec<f64> {
    vec![35.0, 36.0]
}

impl PredictArgs {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ApiError::validation("body", e.to_string()))
    }

    /// Arguments file for batch runs; `.json` is parsed as JSON, anything else as TOML.
    /// In TOML, `start_datetime` must be a quoted string.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json(serde_json::from_str(&content)?)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ApiError::validation("body", e.to_string()))
    }

    pub fn start_datetime_string(&self) -> Option<String> {
        self.start_datetime
            .map(|dt| dt.format(DATETIME_FORMAT).to_string())
    }

    /// Parsed `accept`; a missing value is a validation error.
    pub fn content_type(&self) -> Result<ContentType> {
        let accept = self
            .accept
            .as_deref()
            .ok_or_else(|| ApiError::validation("accept", "Missing data for required field."))?;
        ContentType::from_accept(accept)
    }

    /// Merges the HTTP `Accept` header into `accept`.
    ///
    /// A header that only says `*/*` (curl and most clients send it by default)
    /// does not override a media type given in the body.
    pub fn apply_accept_header(&mut self, header: &str) {
        if self.accept.is_some() && ContentType::is_wildcard_only(header) {
            return;
        }
        self.accept = Some(header.to_string());
    }

    fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str> {
        let value = value
            .as_deref()
            .ok_or_else(|| ApiError::validation(field, "Missing data for required field."))?;
        validate_non_empty_string(field, value)?;
        Ok(value)
    }

    pub fn copernicus_user(&self) -> Result<&str> {
        Self::required("copernicus_user", &self.copernicus_user)
    }

    pub fn copernicus_password(&self) -> Result<&str> {
        Self::required("copernicus_password", &self.copernicus_password)
    }

    pub fn cds_token(&self) -> Result<&str> {
        Self::required("cds_token", &self.cds_token)
    }
}

impl Validate for PredictArgs {
    fn validate(&self) -> Result<()> {
        validate_path_segment("name", &self.name)?;

        if self.start_datetime.is_none() {
            return Err(ApiError::validation(
                "start_datetime",
                "Missing data for required field.",
            ));
        }

        if !(self.sim_length.is_finite() && self.sim_length > 0.0) {
            return Err(ApiError::validation(
                "sim_length",
                "Simulation length must be a positive number of hours",
            ));
        }

        validate_length("spill_lat", &self.spill_lat, SPILL_LIST_MIN, SPILL_LIST_MAX)?;
        validate_each_in_range("spill_lat", &self.spill_lat, -90.0, 90.0)?;
        validate_length("spill_lon", &self.spill_lon, SPILL_LIST_MIN, SPILL_LIST_MAX)?;
        validate_each_in_range("spill_lon", &self.spill_lon, -180.0, 180.0)?;
        if self.spill_lat.len() != self.spill_lon.len() {
            return Err(ApiError::validation(
                "spill_lon",
                format!(
                    "Expected {} longitudes to match spill_lat, got {}",
                    self.spill_lat.len(),
                    self.spill_lon.len()
                ),
            ));
        }

        for (field, values) in [
            ("spill_duration", &self.spill_duration),
            ("spill_rate", &self.spill_rate),
            ("slick_age", &self.slick_age),
        ] {
            validate_length(field, values, SPILL_LIST_MIN, SPILL_LIST_MAX)?;
            validate_each_in_range(field, values, 0.0, f64::MAX)?;
        }

        validate_length("oil", &self.oil, SPILL_LIST_MIN, SPILL_LIST_MAX)?;
        for oil in &self.oil {
            match oil {
                OilSpec::Api(api) if !api.is_finite() => {
                    return Err(ApiError::validation("oil", "API gravity must be finite"))
                }
                OilSpec::Name(name) => validate_non_empty_string("oil", name)?,
                _ => {}
            }
        }

        self.copernicus_user()?;
        self.copernicus_password()?;
        self.cds_token()?;

        validate_bounds("lat", &self.lat)?;
        validate_each_in_range("lat", &self.lat, -90.0, 90.0)?;
        validate_bounds("lon", &self.lon)?;
        validate_each_in_range("lon", &self.lon, -180.0, 180.0)?;

        validate_length("delta", &self.delta, SPILL_LIST_MIN, SPILL_LIST_MAX)?;
        if self.delta.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
            return Err(ApiError::validation("delta", "Domain length must be positive"));
        }

        validate_length("plot_lon", &self.plot_lon, 2, 2)?;
        validate_length("plot_lat", &self.plot_lat, 2, 2)?;

        self.content_type()?;
        Ok(())
    }
}

// 密碼與 token 不輸出到日誌
impl std::fmt::Debug for PredictArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("PredictArgs")
            .field("name", &self.name)
            .field("start_datetime", &self.start_datetime)
            .field("sim_length", &self.sim_length)
            .field("spill_lat", &self.spill_lat)
            .field("spill_lon", &self.spill_lon)
            .field("spill_duration", &self.spill_duration)
            .field("spill_rate", &self.spill_rate)
            .field("slick_age", &self.slick_age)
            .field("oil", &self.oil)
            .field("area_spill", &self.area_spill)
            .field("area_vertex", &self.area_vertex)
            .field("multiple_slick", &self.multiple_slick)
            .field("copernicus_user", &self.copernicus_user)
            .field("copernicus_password", &redacted(&self.copernicus_password))
            .field("cds_token", &redacted(&self.cds_token))
            .field("set_domain", &self.set_domain)
            .field("lat", &self.lat)
            .field("lon", &self.lon)
            .field("delta", &self.delta)
            .field("plot_lon", &self.plot_lon)
            .field("plot_lat", &self.plot_lat)
            .field("accept", &self.accept)
            .finish()
    }
}

/// Training arguments as received; names are resolved against the configured directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainArgs {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default = "default_epochs")]
    pub epochs: i64,
}

fn default_epochs() -> i64 {
    1
}

impl TrainArgs {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ApiError::validation("body", e.to_string()))
    }
}

impl Validate for TrainArgs {
    fn validate(&self) -> Result<()> {
        let model_name = self
            .model_name
            .as_deref()
            .ok_or_else(|| ApiError::validation("model_name", "Missing data for required field."))?;
        validate_path_segment("model_name", model_name)?;
        if let Some(dataset) = &self.dataset {
            validate_path_segment("dataset", dataset)?;
        }
        if self.epochs < 1 {
            return Err(ApiError::validation(
                "epochs",
                "Must be greater than or equal to 1.",
            ));
        }
        Ok(())
    }
}

/// Training arguments after `model_name` / `dataset` were checked on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrainArgs {
    pub model_path: PathBuf,
    pub dataset_path: Option<PathBuf>,
    pub epochs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    pub id: String,
    pub name: String,
    pub author: Vec<String>,
    #[serde(rename = "author-email")]
    pub author_email: Vec<String>,
    pub description: String,
    pub license: String,
    pub version: String,
    pub datasets: Vec<String>,
    pub models: Vec<String>,
}

/// Response formats the predict endpoint can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Png,
    Mp4,
    Json,
    Zip,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Png,
        ContentType::Mp4,
        ContentType::Json,
        ContentType::Zip,
    ];

    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Png => "image/png",
            ContentType::Mp4 => "video/mp4",
            ContentType::Json => "application/json",
            ContentType::Zip => "application/zip",
        }
    }

    /// File extensions of the artifacts this format is built from.
    pub fn artifact_extensions(&self) -> &'static [&'static str] {
        match self {
            ContentType::Png => &["png"],
            ContentType::Mp4 => &["mp4"],
            ContentType::Json | ContentType::Zip => &[],
        }
    }

    fn media_ranges(header: &str) -> impl Iterator<Item = &str> {
        header
            .split(',')
            .map(|part| part.split(';').next().unwrap_or("").trim())
            .filter(|media| !media.is_empty())
    }

    /// True when the header names no concrete media type, only `*/*`.
    pub fn is_wildcard_only(header: &str) -> bool {
        let mut ranges = Self::media_ranges(header).peekable();
        ranges.peek().is_some() && ranges.all(|media| media == "*/*")
    }

    /// Picks the first supported media type from an `Accept` header value.
    /// `*/*` maps to JSON.
    pub fn from_accept(header: &str) -> Result<Self> {
        let mut saw_wildcard = false;
        for media in Self::media_ranges(header) {
            if media == "*/*" {
                saw_wildcard = true;
                continue;
            }
            if let Some(ct) = ContentType::ALL
                .iter()
                .find(|ct| ct.mime().eq_ignore_ascii_case(media))
            {
                return Ok(*ct);
            }
        }
        if saw_wildcard {
            return Ok(ContentType::Json);
        }
        Err(ApiError::NotAcceptable {
            media_type: header.to_string(),
        })
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime())
    }
}

/// External command line to execute for one model entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// Figures directory produced by one simulation plus the files found in it.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub name: String,
    pub result_dir: PathBuf,
    pub artifacts: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RenderedResponse {
    pub content_type: ContentType,
    pub filename: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainSummary {
    pub model_name: String,
    pub dataset: Option<String>,
    pub epochs: u32,
    pub exit_code: Option<i32>,
    pub duration_secs: f64,
    pub output_tail: Vec<String>,
}
