use crate::config::ApiConfig;
use crate::utils::logger::LogFormat;
use clap::Parser;

/// Command line overrides on top of the environment configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "witoil-api")]
#[command(about = "Serve the Medslik-II oil spill model over HTTP")]
pub struct CliArgs {
    /// Host to bind to (overrides API_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on, 0 = auto-assign (overrides API_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log format: compact or json (overrides API_LOG_FORMAT)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    pub fn apply(&self, config: &mut ApiConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
    }
}
