use anyhow::Result;
use clap::Parser;
use pvcast::commands::{self, OutputFormat, SiteArgs, WeatherKind};
use pvcast::config::{Config, Overrides};
use pvcast::runtime::RealRuntime;
use std::path::PathBuf;

/// pvcast - solar PV power forecasts
///
/// Forecast the power output of a PV site for the next 48 hours from
/// Open-Meteo weather data and a gradient-boosted tree model.
///
/// If the HF_TOKEN environment variable is set, it is used to download models
/// from private model hub repositories. Variables may also be set in a `.env` file.
///
/// Examples:
///   pvcast model fetch owner/pv-model model.json
///   pvcast forecast --model model.json --lat 51.75 --lon -1.25 --capacity-kwp 1.25
///   pvcast lint requirements.txt
#[derive(Parser, Debug)]
#[command(author, version = env!("PVCAST_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Cache directory for weather and models (also via PVCAST_CACHE_DIR)
    #[arg(long = "cache-dir", value_name = "PATH", global = true)]
    cache_dir: Option<PathBuf>,

    /// Open-Meteo forecast API URL (also via PVCAST_FORECAST_URL)
    #[arg(long = "forecast-url", value_name = "URL", global = true)]
    forecast_url: Option<String>,

    /// Open-Meteo archive API URL (also via PVCAST_ARCHIVE_URL)
    #[arg(long = "archive-url", value_name = "URL", global = true)]
    archive_url: Option<String>,

    /// Model hub URL (also via PVCAST_HUB_URL)
    #[arg(long = "hub-url", value_name = "URL", global = true)]
    hub_url: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Forecast power output for the next 48 hours
    Forecast(ForecastArgs),

    /// Fetch weather data for a location
    Weather(WeatherArgs),

    /// Manage power models
    #[command(subcommand)]
    Model(ModelCommands),

    /// Check a requirements manifest for syntax, duplicates and invalid versions
    Lint(LintArgs),
}

#[derive(clap::Args, Debug)]
struct ForecastArgs {
    /// XGBoost JSON model file
    #[arg(long, value_name = "PATH")]
    model: PathBuf,

    /// Site description as JSON (latitude, longitude, capacity_kwp, tilt, orientation)
    #[arg(long, value_name = "FILE", conflicts_with_all = ["latitude", "longitude", "capacity_kwp"])]
    site: Option<PathBuf>,

    #[arg(long = "lat", allow_negative_numbers = true)]
    latitude: Option<f64>,

    #[arg(long = "lon", allow_negative_numbers = true)]
    longitude: Option<f64>,

    /// Installed capacity in kWp
    #[arg(long = "capacity-kwp")]
    capacity_kwp: Option<f64>,

    /// Panel tilt in degrees from horizontal [default: 35]
    #[arg(long)]
    tilt: Option<f64>,

    /// Panel orientation in degrees clockwise from north [default: 180]
    #[arg(long)]
    orientation: Option<f64>,

    /// Forecast start (RFC 3339, 'YYYY-MM-DD HH:MM' or 'YYYY-MM-DD', UTC); defaults to now
    #[arg(long, value_name = "TIMESTAMP")]
    start: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(clap::Args, Debug)]
struct WeatherArgs {
    #[arg(value_enum)]
    kind: WeatherKind,

    #[arg(long = "lat", allow_negative_numbers = true)]
    latitude: f64,

    #[arg(long = "lon", allow_negative_numbers = true)]
    longitude: f64,

    /// First day, YYYY-MM-DD
    #[arg(long = "start-date")]
    start_date: String,

    /// Last day (inclusive), YYYY-MM-DD
    #[arg(long = "end-date")]
    end_date: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(clap::Subcommand, Debug)]
enum ModelCommands {
    /// Download a model file into the cache and print its path
    Fetch {
        /// Hub repository in the format "owner/name"
        #[arg(value_name = "OWNER/NAME")]
        repo: String,

        /// File within the repository
        filename: String,

        #[arg(long, default_value = "main")]
        revision: String,

        /// Download again even if the file is cached
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug)]
struct LintArgs {
    /// Manifest to check
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Also print every requirement in normalized form
    #[arg(long)]
    list: bool,
}

/// Default log filter for the number of `-v` flags. `RUST_LOG` still wins.
fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level(cli.verbose)),
    )
    .init();

    let overrides = Overrides {
        cache_dir: cli.cache_dir,
        forecast_url: cli.forecast_url,
        archive_url: cli.archive_url,
        hub_url: cli.hub_url,
    };
    let config = || Config::new(RealRuntime, overrides.clone());
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Forecast(args) => {
            let config = config()?;
            let site_args = SiteArgs {
                file: args.site,
                latitude: args.latitude,
                longitude: args.longitude,
                capacity_kwp: args.capacity_kwp,
                tilt: args.tilt,
                orientation: args.orientation,
            };
            let site = commands::resolve_site(config.runtime.as_ref(), &site_args)?;
            commands::forecast(
                &config,
                &site,
                &args.model,
                args.start.as_deref(),
                args.format,
                &mut stdout,
            )
            .await?
        }
        Commands::Weather(args) => {
            commands::weather(
                &config()?,
                args.kind,
                args.latitude,
                args.longitude,
                &args.start_date,
                &args.end_date,
                args.format,
                &mut stdout,
            )
            .await?
        }
        Commands::Model(ModelCommands::Fetch {
            repo,
            filename,
            revision,
            force,
        }) => {
            commands::fetch_model(&config()?, &repo, &filename, &revision, force, &mut stdout)
                .await?
        }
        Commands::Lint(args) => commands::lint(&RealRuntime, &args.path, args.list, &mut stdout)?,
    }
    Ok(())
}
