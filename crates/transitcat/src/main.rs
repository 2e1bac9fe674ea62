use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use transitcat_core::{db, orchestrator, pipeline, profiles};

#[derive(Parser, Debug)]
#[command(author, version, about = "Transit feed catalog importer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the catalog for one agency from its feed directories
    Import(ImportArgs),
    /// Run database migrations
    Migrate,
    /// List the compiled-in agency profiles
    Agencies,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Feed root; defaults to ./<agency>
    source: Option<PathBuf>,
    /// Agency profile slug
    #[arg(long, env = "TRANSITCAT_AGENCY", default_value = "mta")]
    agency: String,
    /// Compute and print the report without touching the database
    #[arg(long)]
    dry_run: bool,
    /// Skip running migrations before loading
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Import(args) => handle_import(args).await,
        Command::Migrate => {
            let pool = connect_pool().await?;
            db::run_migrations(&pool).await?;
            info!("Database migrations applied");
            Ok(())
        }
        Command::Agencies => {
            for profile in profiles::all_profiles() {
                println!("{}\t{}\t{}", profile.slug, profile.name, profile.mode_keys().join(","));
            }
            Ok(())
        }
    }
}

async fn handle_import(args: ImportArgs) -> Result<()> {
    let profile = profiles::profile(&args.agency)?;
    let source = pipeline::resolve_source_dir(profile, args.source)?;

    let outcome = if args.dry_run {
        orchestrator::run_import(None, profile, &source).await
    } else {
        let pool = connect_pool().await?;
        if args.skip_migrations {
            warn!("Skipping migrations before loading");
        } else {
            db::run_migrations(&pool).await?;
        }
        orchestrator::run_import(Some(&pool), profile, &source).await
    };
    let report = outcome
        .with_context(|| format!("import of '{}' from {} failed", profile.slug, source.display()))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to serialize import report")?
    );
    Ok(())
}

async fn connect_pool() -> Result<db::DbPool> {
    db::connect(&db::database_url_from_env()).await
}
