use clap::Parser;
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};
use hawaii_climate_core::{find_config_file, load_config, ConfigSource, DEFAULT_API_PORT};
use log::LevelFilter;
use std::env;
use time::{format_description::well_known::Iso8601, OffsetDateTime};

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "Hawaii climate API - read-only queries over the historical climate dataset"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $HAWAII_CLIMATE_CONFIG, ./climate.toml,
    /// $XDG_CONFIG_HOME/hawaii-climate/climate.toml, /etc/hawaii-climate/climate.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "HAWAII_CLIMATE_LEVEL")]
    pub level: Option<String>,

    /// Host to listen on (use 0.0.0.0 for all interfaces)
    #[arg(short, long, env = "HAWAII_CLIMATE_HOST")]
    #[serde(alias = "host")]
    pub domain: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "HAWAII_CLIMATE_PORT")]
    pub port: Option<String>,

    /// Public URL for API responses
    #[arg(short, long, env = "HAWAII_CLIMATE_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Directory containing the dataset parquet files
    /// (observations.parquet and stations.parquet)
    #[arg(long, env = "HAWAII_CLIMATE_DATA_DIR")]
    pub data_dir: Option<String>,
}

impl Cli {
    /// Get the effective configuration value with defaults
    pub fn host(&self) -> String {
        self.domain
            .clone()
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }

    pub fn port(&self) -> String {
        self.port
            .clone()
            .unwrap_or_else(|| DEFAULT_API_PORT.to_string())
    }

    pub fn remote_url(&self) -> String {
        self.remote_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host(), self.port()))
    }

    pub fn data_dir(&self) -> String {
        self.data_dir
            .clone()
            .unwrap_or_else(|| "./climate_data".to_string())
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> Cli {
    let cli_args = Cli::parse();

    // Determine config file path
    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("HAWAII_CLIMATE_CONFIG", "climate.toml")
    };

    if let Some(path) = source.path() {
        log::info!("Loading config from: {}", path.display());
    }

    let file_config: Cli = load_config(&source).unwrap_or_default();

    // CLI args override file config (env vars are handled by clap)
    Cli {
        config: cli_args.config,
        level: cli_args.level.or(file_config.level),
        domain: cli_args.domain.or(file_config.domain),
        port: cli_args.port.or(file_config.port),
        remote_url: cli_args.remote_url.or(file_config.remote_url),
        data_dir: cli_args.data_dir.or(file_config.data_dir),
    }
}

pub fn get_log_level(cli: &Cli) -> LevelFilter {
    let level_str = cli
        .level
        .clone()
        .or_else(|| env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    match level_str.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

pub fn setup_logger() -> Dispatch {
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Cyan)
        .info(Color::Blue)
        .warn(Color::Yellow)
        .error(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}: {}",
                OffsetDateTime::now_utc().format(&Iso8601::DEFAULT).unwrap(),
                colors.color(record.level()),
                record.target(),
                message
            ));
        })
        .chain(std::io::stdout())
}
