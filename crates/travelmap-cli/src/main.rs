mod collect;
mod detect;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use travelmap_core::{AppConfig, Gender};

#[derive(Debug, Parser)]
#[command(name = "travelmap-cli")]
#[command(about = "Travel map collection and detection tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations.
    Migrate,
    /// Register every channel in the seed file.
    Seed {
        /// Defaults to `TRAVELMAP_CHANNELS_PATH`.
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Run a collection workflow.
    Collect {
        #[command(subcommand)]
        command: CollectCommands,
    },
    /// Register a channel by id or search query and collect its uploads.
    AddChannel {
        query: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = parse_gender)]
        gender: Option<Gender>,
    },
    /// Print the countries detected in a title. Touches no storage.
    Detect {
        title: String,
        #[arg(long, env = "TRAVELMAP_HOME_COUNTRY", default_value = "KR")]
        home: String,
        /// Print JSON instead of one line per country.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum CollectCommands {
    /// Collect new uploads for every registered channel.
    All,
    /// Collect one channel, registering it first if needed.
    Channel { query: String },
    /// Refresh channel statistics and store new uploads without detection.
    Update,
    /// Tag and mark processed every unprocessed video.
    Process,
}

fn parse_gender(raw: &str) -> Result<Gender, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "male" => Ok(Gender::Male),
        "female" => Ok(Gender::Female),
        "mixed" => Ok(Gender::Mixed),
        other => Err(format!(
            "unknown gender '{other}' (expected male, female or mixed)"
        )),
    }
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = travelmap_db::PoolConfig::from_app_config(config);
    let pool = travelmap_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        None => {
            println!("travelmap-cli: no command given; see --help");
            Ok(())
        }
        Some(Commands::Detect { title, home, json }) => {
            init_tracing("warn")?;
            detect::run_detect(&title, &home, json)
        }
        Some(command) => run_with_database(command).await,
    }
}

async fn run_with_database(command: Commands) -> anyhow::Result<()> {
    let config = travelmap_core::load_app_config()?;
    init_tracing(&config.log_level)?;
    let pool = connect(&config).await?;

    match command {
        Commands::Migrate => {
            let applied = travelmap_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Seed { path } => {
            let path = path.unwrap_or_else(|| config.channels_path.clone());
            let collector = collect::build_collector(&config, pool.clone())?;
            collect::run_seed(&collector, &pool, &path).await?;
        }
        Commands::Collect { command } => {
            let collector = collect::build_collector(&config, pool)?;
            match command {
                CollectCommands::All => collect::run_collect_all(&collector).await?,
                CollectCommands::Channel { query } => {
                    collect::run_collect_channel(&collector, &query).await?;
                }
                CollectCommands::Update => collect::run_update_all(&collector).await?,
                CollectCommands::Process => collect::run_process(&collector).await?,
            }
        }
        Commands::AddChannel {
            query,
            name,
            gender,
        } => {
            let collector = collect::build_collector(&config, pool)?;
            collect::run_add_channel(&collector, &query, name.as_deref(), gender).await?;
        }
        Commands::Detect { title, home, json } => detect::run_detect(&title, &home, json)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
