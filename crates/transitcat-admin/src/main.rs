use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use tracing::info;
use tracing_subscriber::EnvFilter;
use transitcat_core::{catalog, db, profiles};
use transitcat_feed::reduce_stop_times;

#[derive(Parser, Debug)]
#[command(author, version, about = "Transit catalog administrative tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Strip a stop_times table down to its trip_id/stop_id pairs
    ReduceStopTimes(ReduceArgs),
    /// Print what the catalog currently holds for an agency
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct ReduceArgs {
    /// Path to the input stop_times.txt
    input: PathBuf,
    /// Path to the reduced output file
    output: PathBuf,
    /// Keep only unique (trip_id, stop_id) rows
    #[arg(long)]
    dedupe: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Agency profile slug
    #[arg(long, env = "TRANSITCAT_AGENCY", default_value = "mta")]
    agency: String,
    /// List stations (or one station's routes) for this mode
    #[arg(long)]
    mode: Option<String>,
    /// Substring matched against station ids and names
    #[arg(long, requires = "mode")]
    search: Option<String>,
    /// Show the station matching this canonical or child id, with its routes
    #[arg(long, requires = "mode", conflicts_with = "search")]
    station: Option<String>,
    /// List every route of the mode instead of stations
    #[arg(long, requires = "mode", conflicts_with_all = ["search", "station"])]
    routes: bool,
    #[arg(long, default_value_t = 25)]
    limit: i64,
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
        Command::ReduceStopTimes(args) => handle_reduce(args),
        Command::Inspect(args) => handle_inspect(args).await,
    }
}

fn handle_reduce(args: ReduceArgs) -> Result<()> {
    let summary = reduce_stop_times(&args.input, &args.output, args.dedupe)
        .with_context(|| format!("failed to reduce {}", args.input.display()))?;
    info!(rows_in = summary.rows_in, rows_out = summary.rows_out, "Stop times reduced");
    println!("Input rows: {}", summary.rows_in);
    println!("Output rows: {}", summary.rows_out);
    println!("Wrote: {}", args.output.display());
    Ok(())
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header.to_vec());
    table
}

async fn handle_inspect(args: InspectArgs) -> Result<()> {
    let agency = profiles::profile(&args.agency)?.slug;
    let pool = db::connect(&db::database_url_from_env()).await?;

    let Some(mode) = args.mode.as_deref() else {
        let mut table = new_table(&["mode", "stations", "routes", "route stops"]);
        for count in catalog::mode_counts(&pool, agency).await? {
            table.add_row(vec![
                count.mode,
                count.stations.to_string(),
                count.routes.to_string(),
                count.route_stops.to_string(),
            ]);
        }
        println!("{table}");
        return Ok(());
    };

    if let Some(stop_id) = args.station.as_deref() {
        let Some(station) = catalog::find_station(&pool, agency, mode, stop_id).await? else {
            bail!("no {mode} station matches '{stop_id}' for {agency}");
        };
        println!(
            "{} {} ({} child ids: {})",
            station.stop_id,
            station.stop_name,
            station.child_stop_ids.0.len(),
            station.child_stop_ids.0.join(", ")
        );
        let mut table = new_table(&["operator", "route", "short name", "long name", "type"]);
        for route in catalog::routes_for_station(&pool, agency, mode, &station.stop_id).await? {
            table.add_row(vec![
                route.operator,
                route.route_id,
                route.route_short_name,
                route.route_long_name,
                route.route_type.to_string(),
            ]);
        }
        println!("{table}");
        return Ok(());
    }

    if args.routes {
        let mut table = new_table(&["operator", "route", "short name", "long name", "type", "color"]);
        for route in catalog::routes_for_mode(&pool, agency, mode).await? {
            table.add_row(vec![
                route.operator,
                route.route_id,
                route.route_short_name,
                route.route_long_name,
                route.route_type.to_string(),
                route.route_color.unwrap_or_default(),
            ]);
        }
        println!("{table}");
        return Ok(());
    }

    let stations =
        catalog::list_stations(&pool, agency, mode, args.search.as_deref(), args.limit).await?;
    let mut table = new_table(&["operator", "stop id", "name", "lat", "lon", "children"]);
    for station in stations {
        table.add_row(vec![
            station.operator,
            station.stop_id,
            station.stop_name,
            station.stop_lat.map(|lat| lat.to_string()).unwrap_or_default(),
            station.stop_lon.map(|lon| lon.to_string()).unwrap_or_default(),
            station.child_stop_ids.0.len().to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
