use std::path::PathBuf;

use anyhow::Context;
use barbcut_cloud::BlobConfig;
use barbcut_migrate::{MigrationContext, MigrationRegistry, MigrationRunner, StatusReport};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Subcommand)]
enum Command {
    /// Apply every pending migration
    Up,
    /// Roll back the most recently applied migration
    Down,
    /// Show the current version and pending migrations
    Status,
}

/// Run data migrations against the barbcut document and blob stores
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory containing the style catalogue (`data.json` and images)
    #[arg(long, env = "STYLES_DATA_DIR", default_value = "./assets/data/images")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "barbcut_migrate=info,barbcut_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").ok();
    let store = barbcut_db::connect(database_url.as_deref())
        .await
        .context("Failed to connect to the document store")?;
    let blob_config = BlobConfig::from_env().context("Invalid blob store configuration")?;
    let blobs = barbcut_cloud::connect(&blob_config)
        .await
        .context("Failed to open the blob store")?;

    let registry = MigrationRegistry::builtin()?;
    let runner = MigrationRunner::new(
        registry,
        MigrationContext {
            store,
            blobs,
            bucket: blob_config.bucket,
            data_dir: cli.data_dir,
        },
    );

    let outcome = match cli.command {
        Command::Up => runner.up().await.map(|applied| {
            println!("Applied {} migration(s)", applied.len());
            for id in applied {
                println!("  + {id}");
            }
        }),
        Command::Down => runner.down().await.map(|rolled_back| match rolled_back {
            Some(id) => println!("Rolled back {id}"),
            None => println!("Nothing to roll back"),
        }),
        Command::Status => Ok(()),
    };

    match runner.status().await {
        Ok(report) => print_summary(&report),
        Err(e) => tracing::error!(error = %e, "Failed to read migration status"),
    }

    outcome.context("Migration command failed")
}

fn print_summary(report: &StatusReport) {
    println!("Current version: {}", report.current_version);
    if let Some(last) = &report.last_migration {
        println!("Last migration:  {last}");
    }
    println!("Total migrations: {}", report.total_migrations);
    if report.pending.is_empty() {
        println!("Pending: none");
    } else {
        println!("Pending:");
        for id in &report.pending {
            println!("  - {id}");
        }
    }
}
