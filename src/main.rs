use anyhow::Result;
use clap::Parser;
use witoil_api::utils::{logger, validation::Validate};
use witoil_api::{server, ApiConfig, CliArgs, CommandRunner, ModelService};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    args.apply(&mut config);

    // 初始化日誌
    logger::init_logger(config.tracing_level(), config.log_format, args.verbose);

    tracing::info!("Starting {} v{}", config.metadata.name, config.metadata.version);
    if args.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if !config.template_path().is_file() {
        tracing::warn!(
            "Model template {} not found; predictions will fail until MODEL_HOME is populated",
            config.template_path().display()
        );
    }

    let runner = CommandRunner::new(config.timeout);
    let host = config.host.clone();
    let port = config.port;
    let service = ModelService::new(config, runner);

    let addr = server::start_server(service, &host, port).await?;
    tracing::info!("📡 Serving Medslik-II on http://{}/v2/", addr);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, exiting");

    Ok(())
}
