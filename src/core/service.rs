use crate::config::model_config::ModelConfig;
use crate::config::ApiConfig;
use crate::core::responses;
use crate::domain::model::{
    Invocation, ModelMetadata, PredictArgs, PredictionResult, RenderedResponse,
    ResolvedTrainArgs, TrainArgs, TrainSummary,
};
use crate::domain::ports::ModelRunner;
use crate::utils::error::{ApiError, Result};
use crate::utils::fs::{files_with_extension, ls_dirs, ls_files};
use crate::utils::validation::Validate;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Extensions collected from a simulation's figures directory.
pub const ARTIFACT_EXTENSIONS: [&str; 5] = ["png", "mp4", "gif", "jpg", "pdf"];

const OUTPUT_TAIL_LINES: usize = 20;

/// Expands a whitespace separated command template, replacing `{key}` placeholders per token.
pub fn build_invocation(template: &str, replacements: &[(&str, String)], cwd: &Path) -> Result<Invocation> {
    let mut tokens = template.split_whitespace().map(|token| {
        replacements
            .iter()
            .fold(token.to_string(), |acc, (key, value)| {
                acc.replace(&format!("{{{}}}", key), value)
            })
    });
    let program = tokens
        .next()
        .ok_or_else(|| ApiError::config("model command is empty"))?;
    Ok(Invocation {
        program,
        args: tokens.collect(),
        cwd: cwd.to_path_buf(),
    })
}

/// Runs filesystem work off the async worker threads.
async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await?
}

/// Marks a simulation name as running until dropped.
struct CaseClaim<'a> {
    running: &'a Mutex<HashSet<String>>,
    name: String,
}

impl Drop for CaseClaim<'_> {
    fn drop(&mut self) {
        self.running
            .lock()
            .expect("running cases lock poisoned")
            .remove(&self.name);
    }
}

/// Writes the case config and empties the figures directory of any earlier run.
fn prepare_case(
    template: PathBuf,
    args: PredictArgs,
    config_path: PathBuf,
    figures_dir: PathBuf,
) -> Result<()> {
    let mut model_config = ModelConfig::from_file(template)?;
    model_config.apply_predict_args(&args)?;
    model_config.write_to(&config_path)?;

    if figures_dir.exists() {
        tracing::debug!("Clearing previous figures in {}", figures_dir.display());
        std::fs::remove_dir_all(&figures_dir)?;
    }
    Ok(())
}

/// The model's train/predict/metadata operations, backed by an external runner.
pub struct ModelService<R: ModelRunner> {
    config: ApiConfig,
    runner: R,
    // one case directory per name, so a name runs at most once at a time
    running: Mutex<HashSet<String>>,
}

impl<R: ModelRunner> ModelService<R> {
    pub fn new(config: ApiConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            running: Mutex::new(HashSet::new()),
        }
    }

    fn claim_case(&self, name: &str) -> Result<CaseClaim<'_>> {
        let mut running = self.running.lock().expect("running cases lock poisoned");
        if !running.insert(name.to_string()) {
            tracing::warn!("Simulation '{}' is already running", name);
            return Err(ApiError::CaseBusy {
                name: name.to_string(),
            });
        }
        Ok(CaseClaim {
            running: &self.running,
            name: name.to_string(),
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        self.config.metadata.name
    }

    pub fn get_metadata(&self) -> Result<ModelMetadata> {
        tracing::info!("Collecting metadata from: {}", self.name());
        let meta = &self.config.metadata;
        let datasets_pattern = Regex::new("^[A-Za-z0-9]").map_err(|e| ApiError::config(e.to_string()))?;

        let metadata = ModelMetadata {
            id: meta.name.to_string(),
            name: meta.name.to_string(),
            author: meta.authors.clone(),
            author_email: meta.author_emails.clone(),
            description: meta.summary.to_string(),
            license: meta.license.to_string(),
            version: meta.version.to_string(),
            datasets: ls_files(&self.config.data_path, &datasets_pattern)?,
            models: ls_dirs(&self.config.models_path)?,
        };
        tracing::debug!("Package model metadata: {:?}", metadata);
        Ok(metadata)
    }

    /// Writes the per-simulation config, runs the model and collects its figures.
    pub async fn run_prediction(&self, args: &PredictArgs) -> Result<PredictionResult> {
        args.validate()?;
        tracing::debug!("Predict with args: {:?}", args);
        let _claim = self.claim_case(&args.name)?;

        let config_path = self.config.case_dir(&args.name).join("config.toml");
        let result_dir = self.config.figures_dir(&args.name);
        blocking({
            let template = self.config.template_path();
            let args = args.clone();
            let config_path = config_path.clone();
            let result_dir = result_dir.clone();
            move || prepare_case(template, args, config_path, result_dir)
        })
        .await?;
        tracing::info!("📝 Simulation config written to {}", config_path.display());

        let invocation = build_invocation(
            &self.config.predict_command,
            &[("config", config_path.to_string_lossy().into_owned())],
            &self.config.model_home,
        )?;
        self.runner.run(&invocation).await?;

        let artifacts = blocking({
            let result_dir = result_dir.clone();
            move || files_with_extension(&result_dir, &ARTIFACT_EXTENSIONS)
        })
        .await?;
        tracing::debug!("Predict result: {} ({} artifacts)", result_dir.display(), artifacts.len());

        Ok(PredictionResult {
            name: args.name.clone(),
            result_dir,
            artifacts,
        })
    }

    pub async fn predict(&self, args: &PredictArgs) -> Result<RenderedResponse> {
        let result = self.run_prediction(args).await.inspect_err(|e| {
            tracing::error!("Error calculating predictions: {}", e);
        })?;
        let content_type = args.content_type()?;
        tracing::info!("Returning content_type for: {}", content_type);
        blocking(move || responses::render(&result, content_type)).await
    }

    /// Checks `model_name` and `dataset` against the configured directories.
    pub fn resolve_train_args(&self, args: &TrainArgs) -> Result<ResolvedTrainArgs> {
        args.validate()?;
        let model_name = args.model_name.as_deref().unwrap_or_default();

        if !ls_dirs(&self.config.models_path)?.iter().any(|m| m == model_name) {
            return Err(ApiError::validation(
                "model_name",
                format!("Checkpoint `{}` not found.", model_name),
            ));
        }

        let dataset_path = match &args.dataset {
            Some(dataset) => {
                let path = self.config.data_path.join(dataset);
                if !path.exists() {
                    return Err(ApiError::validation(
                        "dataset",
                        format!("Dataset `{}` not found.", dataset),
                    ));
                }
                Some(path)
            }
            None => None,
        };

        Ok(ResolvedTrainArgs {
            model_path: self.config.models_path.join(model_name),
            dataset_path,
            epochs: u32::try_from(args.epochs)
                .map_err(|_| ApiError::validation("epochs", "Value is too large"))?,
        })
    }

    pub async fn train(&self, args: &TrainArgs) -> Result<TrainSummary> {
        let resolved = self.resolve_train_args(args)?;
        let template = self.config.train_command.as_deref().ok_or_else(|| ApiError::Unsupported {
            message: format!("{} has no training entry point", self.name()),
        })?;
        tracing::info!("🏋️ Training {} for {} epoch(s)", resolved.model_path.display(), resolved.epochs);

        let invocation = build_invocation(
            template,
            &[
                ("model", resolved.model_path.to_string_lossy().into_owned()),
                (
                    "dataset",
                    resolved
                        .dataset_path
                        .as_ref()
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                ),
                ("epochs", resolved.epochs.to_string()),
            ],
            &self.config.model_home,
        )?;
        let output = self.runner.run(&invocation).await.inspect_err(|e| {
            tracing::error!("Error during training: {}", e);
        })?;

        Ok(TrainSummary {
            model_name: args.model_name.clone().unwrap_or_default(),
            dataset: args.dataset.clone(),
            epochs: resolved.epochs,
            exit_code: output.exit_code,
            duration_secs: output.duration.as_secs_f64(),
            output_tail: crate::adapters::command_runner::tail_lines(&output.stdout, OUTPUT_TAIL_LINES),
        })
    }
}
