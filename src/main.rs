use clap::{Parser, Subcommand};
use tracing::error;

mod config;
mod constants;
mod error;
mod gateway;
mod logging;
mod pipeline;
mod table;

use crate::config::PipelineConfig;
use crate::gateway::{FsStore, ObjectStore};
use crate::pipeline::stages;

#[derive(Parser)]
#[command(name = "fintx_pipeline")]
#[command(about = "Financial-transactions dataset sampling, merge and cleaning pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Optional TOML config file overriding the built-in defaults
    #[arg(long, global = true)]
    config: Option<String>,

    /// Root directory backing the object store
    #[arg(long, global = true, default_value = "store")]
    store_root: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample the raw transactions and fraud labels down to size
    Sample,
    /// Join transactions, cards, users, merchant codes and fraud labels
    Merge,
    /// Deduplicate, coerce, impute and encode the merged dataset
    Clean,
    /// Flag amount anomalies and write grouped fraud aggregates
    Annotate,
    /// Log the schema and first rows of each configured source
    Inspect,
    /// Run every stage in order
    Run,
}

fn load_config(path: Option<&str>) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(PipelineConfig::load(p)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn print_summary(summary: &stages::StageSummary) {
    println!("\n📊 Stage results for {}:", summary.stage);
    println!("   Rows in: {}", summary.rows_in);
    println!("   Rows out: {}", summary.rows_out);
    println!("   Warnings: {}", summary.warning_count);
    for output in &summary.outputs {
        println!("   Output: {}", output);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let store = FsStore::new(&cli.store_root);
    let store: &dyn ObjectStore = &store;

    let result = match cli.command {
        Commands::Sample => {
            println!("🔄 Running sampling stage...");
            stages::run_sample(store, &config).map(|s| vec![s])
        }
        Commands::Merge => {
            println!("🔗 Running merge stage...");
            stages::run_merge(store, &config).map(|s| vec![s])
        }
        Commands::Clean => {
            println!("🧹 Running cleaning stage...");
            stages::run_clean(store, &config).map(|s| vec![s])
        }
        Commands::Annotate => {
            println!("🚩 Running annotation stage...");
            stages::run_annotate(store, &config).map(|s| vec![s])
        }
        Commands::Inspect => {
            println!("🔍 Inspecting configured sources...");
            stages::run_inspect(store, &config).map(|s| vec![s])
        }
        Commands::Run => {
            println!("🚀 Running full pipeline (sample + merge + clean + annotate)...");
            stages::run_all(store, &config).map(|run| {
                println!("\n✅ Pipeline run {} completed", run.id);
                run.stages
            })
        }
    };

    match result {
        Ok(summaries) => {
            for summary in &summaries {
                print_summary(summary);
            }
        }
        Err(e) => {
            error!("Stage failed: {}", e);
            println!("❌ Stage failed: {}", e);
            return Err(e.into());
        }
    }
    Ok(())
}
