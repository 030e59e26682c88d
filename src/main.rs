use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use sales_etl::config::EtlConfig;
use sales_etl::constants;
use sales_etl::logging;
use sales_etl::pipeline::{Pipeline, PipelineResult};

#[derive(Parser)]
#[command(name = "sales_etl")]
#[command(about = "Merge regional order exports into a SQLite sales table")]
#[command(version = "0.1.0")]
struct Cli {
    /// Optional TOML config; built-in defaults apply when it does not exist
    #[arg(long, global = true, default_value = constants::CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, transform, load and validate (the default)
    Run {
        /// Region A export (.xlsx, .xls, .ods or .csv)
        #[arg(long)]
        region_a: Option<PathBuf>,
        /// Region B export (.xlsx, .xls, .ods or .csv)
        #[arg(long)]
        region_b: Option<PathBuf>,
        /// SQLite database file to replace the sales table in
        #[arg(long)]
        database: Option<PathBuf>,
        /// Print the run summary as JSON when finished
        #[arg(long)]
        json: bool,
    },
    /// Only run the validation queries against an existing database
    Validate {
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

fn print_summary(result: &PipelineResult) {
    println!("\n📊 Pipeline Results:");
    println!("   Region A rows: {}", result.region_a_rows);
    println!("   Region B rows: {}", result.region_b_rows);
    println!("   Duplicates dropped: {}", result.transform.duplicates_dropped());
    println!("   Non-positive net sales dropped: {}", result.transform.non_positive_dropped());
    println!("   Rows retained: {}", result.transform.retained_rows);
    println!("   Loaded: {}", if result.load.is_loaded() { "yes" } else { "no" });
    println!("   Validated: {}", if result.validation.is_some() { "yes" } else { "no" });
}

fn main() -> anyhow::Result<()> {
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();
    let mut config = EtlConfig::load(&cli.config)?;

    match cli.command.unwrap_or(Commands::Run {
        region_a: None,
        region_b: None,
        database: None,
        json: false,
    }) {
        Commands::Run {
            region_a,
            region_b,
            database,
            json,
        } => {
            if let Some(path) = region_a {
                config.sources.region_a = path;
            }
            if let Some(path) = region_b {
                config.sources.region_b = path;
            }
            if let Some(path) = database {
                config.database.path = path;
            }

            println!("🔄 Running sales ETL...");
            let result = Pipeline::new(config).run().inspect_err(|e| {
                error!("Extraction failed, nothing was loaded: {}", e);
            })?;

            print_summary(&result);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Commands::Validate { database } => {
            if let Some(path) = database {
                config.database.path = path;
            }
            info!("Validating {}", config.database.path.display());
            Pipeline::new(config).validate_only();
        }
    }

    Ok(())
}
