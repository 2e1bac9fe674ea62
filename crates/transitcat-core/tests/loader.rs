#![cfg(feature = "runtime")]

use std::collections::BTreeSet;
use std::env;
use std::path::Path;

use anyhow::Result;
use tokio::runtime::Runtime;
use transitcat_core::catalog::{find_station, list_stations, mode_counts, routes_for_station};
use transitcat_core::db::{self, DbPool};
use transitcat_core::loader::replace_catalog;
use transitcat_core::model::{CatalogSet, Scope, ScopeRows, Station};
use transitcat_core::orchestrator::run_import;
use transitcat_core::profiles::profile;

const AGENCY: &str = "mta";

fn test_database_url(test: &str) -> Option<String> {
    match env::var("TRANSITCAT_TEST_DATABASE_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping {test} because TRANSITCAT_TEST_DATABASE_URL is not set");
            None
        }
    }
}

async fn fresh_pool(database_url: &str) -> Result<DbPool> {
    let pool = db::connect(database_url).await?;
    db::run_migrations(&pool).await?;
    sqlx::query("TRUNCATE TABLE catalog_route_stops, catalog_routes, catalog_stations")
        .execute(&pool)
        .await?;
    Ok(pool)
}

fn station(id: &str) -> Station {
    Station {
        stop_id: id.to_string(),
        stop_name: format!("Station {id}"),
        stop_lat: None,
        stop_lon: None,
        parent_station: None,
        child_stop_ids: BTreeSet::from([id.to_string()]),
    }
}

fn subway_catalog(stations: Vec<Station>) -> CatalogSet {
    let mut catalog = CatalogSet::new("mta", vec!["subway", "bus"]);
    catalog.scopes.insert(
        Scope::new("subway", ""),
        ScopeRows {
            stations,
            ..ScopeRows::default()
        },
    );
    catalog
}

async fn station_ids(pool: &DbPool) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT stop_id FROM catalog_stations WHERE agency = $1 ORDER BY stop_id",
    )
    .bind(AGENCY)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

#[test]
fn replace_swaps_the_whole_mode_and_rolls_back_on_failure() -> Result<()> {
    let Some(database_url) = test_database_url("replace_swaps_the_whole_mode_and_rolls_back_on_failure")
    else {
        return Ok(());
    };

    let rt = Runtime::new()?;
    rt.block_on(async move {
        let pool = fresh_pool(&database_url).await?;

        replace_catalog(&pool, &subway_catalog(vec![station("S1")])).await?;
        assert_eq!(station_ids(&pool).await?, vec!["S1"]);

        let summary = replace_catalog(&pool, &subway_catalog(vec![station("S2")])).await?;
        assert_eq!(summary.stations, 1);
        assert_eq!(station_ids(&pool).await?, vec!["S2"]);

        // Two rows with the same key violate the primary key mid-load.
        let broken = subway_catalog(vec![station("S3"), station("S3")]);
        assert!(replace_catalog(&pool, &broken).await.is_err());
        assert_eq!(station_ids(&pool).await?, vec!["S2"]);

        Ok(())
    })
}

#[test]
fn fixture_import_is_idempotent_and_queryable() -> Result<()> {
    let Some(database_url) = test_database_url("fixture_import_is_idempotent_and_queryable") else {
        return Ok(());
    };

    let rt = Runtime::new()?;
    rt.block_on(async move {
        let pool = fresh_pool(&database_url).await?;
        let mta = profile(AGENCY)?;
        let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/mta");

        let first = run_import(Some(&pool), mta, &source).await?;
        let counts_after_first = mode_counts(&pool, AGENCY).await?;
        let second = run_import(Some(&pool), mta, &source).await?;
        let counts_after_second = mode_counts(&pool, AGENCY).await?;

        assert!(!first.dry_run);
        assert_eq!(first.counts, second.counts);
        assert_eq!(counts_after_first, counts_after_second);
        let first_loaded = first.loaded.expect("first run loads");
        let second_loaded = second.loaded.expect("second run loads");
        assert_eq!(first_loaded.deleted, 0);
        assert_eq!(
            second_loaded.deleted,
            first_loaded.stations + first_loaded.routes + first_loaded.route_stops
        );
        assert_eq!(first_loaded.route_stops, second_loaded.route_stops);

        let platform = find_station(&pool, AGENCY, "subway", "A100S")
            .await?
            .expect("platform resolves to its station");
        assert_eq!(platform.stop_id, "A100");

        let found = list_stations(&pool, AGENCY, "subway", Some("dyck"), 10).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].stop_id, "A101");

        let routes = routes_for_station(&pool, AGENCY, "subway", "A100").await?;
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].route_id, "A");

        Ok(())
    })
}
