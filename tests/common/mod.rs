#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;
use witoil_api::domain::model::{Invocation, RunOutput};
use witoil_api::domain::ports::ModelRunner;
use witoil_api::{ApiConfig, ApiError, Result};

pub const TEMPLATE: &str = r#"
[simulation]
name = "template_case"
experiment_path = "WITOIL_iMagine/cases/"
start_datetime = 2020-01-01T00:00:00
sim_length = 12.0
spill_lat = [0.0]
spill_lon = [0.0]

[download]
download_curr = true
download_wind = true

[input_files]
set_domain = false

[run_options]
run_model = true
postprocessing = true

[plot_options]
plotting = true
"#;

/// What the fake model does when invoked.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Writes the listed files into the case figures directory.
    WriteFigures(Vec<(&'static str, &'static str)>),
    Fail(&'static str),
    /// Blocks until notified, then succeeds without writing anything.
    WaitFor(Arc<Notify>),
}

/// Records every invocation instead of running the external model.
#[derive(Clone)]
pub struct RecordingRunner {
    pub calls: Arc<Mutex<Vec<Invocation>>>,
    behaviour: Behaviour,
}

impl RecordingRunner {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            behaviour,
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

fn success() -> RunOutput {
    RunOutput {
        exit_code: Some(0),
        stdout: "epoch 1 done\nfinished".to_string(),
        stderr: String::new(),
        duration: Duration::from_millis(5),
    }
}

#[async_trait]
impl ModelRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<RunOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        match &self.behaviour {
            Behaviour::WriteFigures(files) => {
                // predict passes .../cases/<name>/config.toml somewhere in its arguments
                let config = invocation
                    .args
                    .iter()
                    .map(PathBuf::from)
                    .find(|arg| arg.extension().map(|e| e == "toml").unwrap_or(false));
                if let Some(config) = config {
                    let figures = config.parent().unwrap().join("out_files").join("figures");
                    std::fs::create_dir_all(&figures)?;
                    for (name, data) in files {
                        std::fs::write(figures.join(name), data.as_bytes())?;
                    }
                }
                Ok(success())
            }
            Behaviour::WaitFor(release) => {
                release.notified().await;
                Ok(success())
            }
            Behaviour::Fail(message) => Err(ApiError::ModelFailed {
                status: "exit status: 1".to_string(),
                stderr_tail: message.to_string(),
            }),
        }
    }
}

pub struct TestEnv {
    pub dir: TempDir,
    pub config: ApiConfig,
}

impl TestEnv {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Lays out data/, models/ and a model home with a config template under a temp dir.
pub fn test_env(extra: &[(&str, &str)]) -> TestEnv {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("data")).unwrap();
    std::fs::create_dir_all(root.join("models").join("baseline")).unwrap();
    std::fs::create_dir_all(root.join("WITOIL_iMagine")).unwrap();
    std::fs::write(root.join("WITOIL_iMagine").join("config.toml"), TEMPLATE).unwrap();
    std::fs::write(root.join("data").join("currents_2021.nc"), b"").unwrap();
    std::fs::write(root.join("data").join("_scratch"), b"").unwrap();

    let base = root.to_string_lossy().into_owned();
    let extra: Vec<(String, String)> = extra
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = ApiConfig::from_lookup(|key| {
        if key == "API_BASE_PATH" {
            return Some(base.clone());
        }
        extra.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    })
    .unwrap();

    TestEnv { dir, config }
}

pub fn predict_body(name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "start_datetime": "2021-08-21T03:43:00",
        "sim_length": 48.0,
        "spill_lat": [35.25],
        "spill_lon": [35.90],
        "copernicus_user": "user",
        "copernicus_password": "secret-password",
        "cds_token": "secret-token"
    })
}
