use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use witoil_api::utils::{logger, validation::Validate};
use witoil_api::{ApiConfig, CommandRunner, ModelService, PredictArgs};

#[derive(Parser)]
#[command(name = "witoil-predict")]
#[command(about = "Run one Medslik-II prediction from an arguments file, without HTTP")]
struct Args {
    /// Path to the prediction arguments (TOML, or JSON with a .json extension)
    #[arg(short, long, default_value = "spill.toml")]
    args: PathBuf,

    /// Response format, overrides `accept` from the arguments file
    #[arg(long)]
    accept: Option<String>,

    /// Where to write the rendered result
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Validate and show what would run, without starting the model
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ApiConfig::from_env().context("reading configuration from the environment")?;
    logger::init_logger(config.tracing_level(), config.log_format, args.verbose);

    tracing::info!("📁 Loading prediction arguments from: {}", args.args.display());

    let mut predict_args = match PredictArgs::from_file(&args.args) {
        Ok(predict_args) => predict_args,
        Err(e) => {
            eprintln!("❌ Failed to load arguments file '{}': {}", args.args.display(), e);
            eprintln!("💡 Make sure the file exists and is valid TOML or JSON");
            std::process::exit(1);
        }
    };
    if let Some(accept) = &args.accept {
        predict_args.accept = Some(accept.clone());
    }

    // 驗證配置與參數
    for result in [config.validate(), predict_args.validate()] {
        if let Err(e) = result {
            tracing::error!("❌ Validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    }

    display_summary(&config, &predict_args);

    if args.dry_run {
        println!("🔍 DRY RUN MODE - the model was not started");
        return Ok(());
    }

    let content_type = predict_args.content_type()?;
    let service = ModelService::new(config.clone(), CommandRunner::new(config.timeout));

    match service.predict(&predict_args).await {
        Ok(rendered) => {
            let output = args.output.unwrap_or_else(|| {
                PathBuf::from(
                    rendered
                        .filename
                        .clone()
                        .unwrap_or_else(|| format!("{}.json", predict_args.name)),
                )
            });
            std::fs::write(&output, &rendered.body)
                .with_context(|| format!("writing {}", output.display()))?;
            tracing::info!("✅ Prediction completed ({})", content_type);
            println!("✅ Prediction completed successfully!");
            println!("📁 Output saved to: {}", output.display());
        }
        Err(e) => {
            tracing::error!("❌ Prediction failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(if e.is_client_error() { 2 } else { 1 });
        }
    }

    Ok(())
}

fn display_summary(config: &ApiConfig, args: &PredictArgs) {
    println!("📋 Prediction Summary:");
    println!("  Simulation: {}", args.name);
    println!(
        "  Start: {}",
        args.start_datetime_string().unwrap_or_default()
    );
    println!("  Length: {} h", args.sim_length);
    println!("  Spill points: {}", args.spill_lat.len());
    println!("  Model home: {}", config.model_home.display());
    println!("  Command: {}", config.predict_command);
    println!("  Results: {}", config.figures_dir(&args.name).display());
    println!();
}
