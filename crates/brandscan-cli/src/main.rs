mod scan;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "brandscan")]
#[command(about = "Brand health scan command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run a scan to completion on this process and print the result
    Scan(ScanArgs),
    /// Re-check a job against the analysis service and print its state
    Status {
        job_id: Uuid,
    },
    /// Run one pass of a background sweep
    Sweep {
        #[command(subcommand)]
        command: SweepCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[derive(Debug, Subcommand)]
enum SweepCommands {
    /// Advance jobs waiting on the analysis service
    Recheck,
    /// Fail jobs stuck in processing or waiting too long on analysis
    Stale,
    /// Delete expired cache entries
    PurgeCache,
}

#[derive(Debug, Args)]
struct ScanArgs {
    #[arg(long)]
    brand: String,
    #[arg(long)]
    website: String,
    #[arg(long)]
    instagram: Option<String>,
    #[arg(long)]
    x: Option<String>,
    #[arg(long)]
    linkedin: Option<String>,
    #[arg(long)]
    tiktok: Option<String>,
    #[arg(long)]
    industry: Option<String>,
    #[arg(long)]
    market: Option<String>,
    #[arg(long)]
    callback_url: Option<String>,
    /// Keep the job in memory instead of the database (no cache reuse)
    #[arg(long, default_value_t = false)]
    no_db: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("brandscan: no command given, see --help");
        return Ok(());
    };

    let config = brandscan_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Scan(args) = &command {
        if args.no_db {
            return scan::run_scan_in_memory(&config, args.to_request()).await;
        }
    }

    let pool_config = brandscan_db::PoolConfig::from_app_config(&config);
    let pool = brandscan_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            brandscan_db::health_check(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = brandscan_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Scan(args) => scan::run_scan(&config, pool, args.to_request()).await?,
        Commands::Status { job_id } => scan::run_status(&config, pool, job_id).await?,
        Commands::Sweep { command } => scan::run_sweep(&config, pool, &command).await?,
    }

    Ok(())
}

impl ScanArgs {
    fn to_request(&self) -> brandscan_core::ScanRequest {
        brandscan_core::ScanRequest {
            brand_name: self.brand.clone(),
            website_url: self.website.clone(),
            social: brandscan_core::SocialHandles {
                instagram: self.instagram.clone(),
                x: self.x.clone(),
                linkedin: self.linkedin.clone(),
                tiktok: self.tiktok.clone(),
            },
            industry: self.industry.clone(),
            market: self.market.clone(),
            callback_url: self.callback_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests;
