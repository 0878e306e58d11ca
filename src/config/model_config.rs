use crate::domain::model::PredictArgs;
use crate::utils::error::{ApiError, Result};
use std::path::Path;
use toml::{Table, Value};

/// The Medslik-II `config.toml` document.
///
/// Only the keys a prediction request controls are touched; everything else in the
/// template (run options, input file paths, plot switches) is written back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    table: Table,
}

fn floats(values: &[f64]) -> Value {
    Value::Array(values.iter().map(|v| Value::Float(*v)).collect())
}

impl ModelConfig {
    /// 從 TOML 檔案載入模板
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ApiError::ConfigError {
            message: format!("cannot read model template {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses the template verbatim; strings such as `${VAR}` are data, not placeholders.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table = content.parse::<Table>()?;
        Ok(Self { table })
    }

    fn section_mut(&mut self, name: &str) -> Result<&mut Table> {
        let entry = self
            .table
            .entry(name.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        entry.as_table_mut().ok_or_else(|| ApiError::ConfigError {
            message: format!("[{}] in the model template is not a table", name),
        })
    }

    fn set(&mut self, section: &str, key: &str, value: Value) -> Result<()> {
        self.section_mut(section)?.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.table.get(section)?.as_table()?.get(key)
    }

    /// Overwrites the request-controlled keys with `args`.
    pub fn apply_predict_args(&mut self, args: &PredictArgs) -> Result<()> {
        let start = args
            .start_datetime_string()
            .ok_or_else(|| ApiError::validation("start_datetime", "Missing data for required field."))?;
        let start: toml::value::Datetime = start
            .parse()
            .map_err(|e| ApiError::validation("start_datetime", format!("{}", e)))?;

        self.set("simulation", "name", Value::String(args.name.clone()))?;
        self.set("simulation", "start_datetime", Value::Datetime(start))?;
        self.set("simulation", "sim_length", Value::Float(args.sim_length))?;
        self.set("simulation", "spill_lat", floats(&args.spill_lat))?;
        self.set("simulation", "spill_lon", floats(&args.spill_lon))?;
        self.set("simulation", "spill_duration", floats(&args.spill_duration))?;
        self.set("simulation", "spill_rate", floats(&args.spill_rate))?;
        self.set("simulation", "slick_age", floats(&args.slick_age))?;
        self.set(
            "simulation",
            "oil",
            Value::Array(args.oil.iter().map(Value::from).collect()),
        )?;
        self.set("simulation", "area_spill", Value::Boolean(args.area_spill))?;
        self.set("simulation", "area_vertex", Value::Boolean(args.area_vertex))?;
        self.set("simulation", "multiple_slick", Value::Boolean(args.multiple_slick))?;

        self.set(
            "download",
            "copernicus_user",
            Value::String(args.copernicus_user()?.to_string()),
        )?;
        self.set(
            "download",
            "copernicus_password",
            Value::String(args.copernicus_password()?.to_string()),
        )?;
        self.set("download", "cds_token", Value::String(args.cds_token()?.to_string()))?;

        self.set("input_files", "set_domain", Value::Boolean(args.set_domain))?;
        self.set("input_files", "lat", floats(&args.lat))?;
        self.set("input_files", "lon", floats(&args.lon))?;
        self.set("input_files", "delta", floats(&args.delta))?;

        self.set("plot_options", "plot_lon", floats(&args.plot_lon))?;
        self.set("plot_options", "plot_lat", floats(&args.plot_lat))?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(&self.table)?)
    }

    /// Writes the document, creating parent directories as needed.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
