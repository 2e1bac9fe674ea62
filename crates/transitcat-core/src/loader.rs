// crates/transitcat-core/src/loader.rs

use serde::Serialize;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Transaction};
use tracing::info;

use crate::db::DbPool;
use crate::error::Result;
use crate::model::{CatalogSet, Route, RouteStop, Scope, Station};

/// Rows bound per INSERT statement.
pub const INSERT_BATCH_SIZE: usize = 1000;

/// Serializes concurrent catalog loads; released with the transaction.
const CATALOG_LOCK_KEY: i64 = 0x7472_616e_7369_7463;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    pub deleted: u64,
    pub stations: u64,
    pub routes: u64,
    pub route_stops: u64,
}

/// Replaces every row of the agency's declared modes with `catalog` inside a
/// single transaction. On any error the transaction is dropped, which rolls
/// it back and leaves the previous catalog in place.
pub async fn replace_catalog(pool: &DbPool, catalog: &CatalogSet) -> Result<LoadSummary> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(CATALOG_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    let mut summary = LoadSummary {
        deleted: delete_modes(&mut tx, catalog.agency, &catalog.modes).await?,
        ..LoadSummary::default()
    };

    for (scope, rows) in &catalog.scopes {
        summary.stations += insert_stations(&mut tx, catalog.agency, scope, &rows.stations).await?;
    }
    for (scope, rows) in &catalog.scopes {
        summary.routes += insert_routes(&mut tx, catalog.agency, scope, &rows.routes).await?;
    }
    for (scope, rows) in &catalog.scopes {
        summary.route_stops +=
            insert_route_stops(&mut tx, catalog.agency, scope, &rows.route_stops).await?;
    }

    tx.commit().await?;

    info!(
        agency = catalog.agency,
        deleted = summary.deleted,
        stations = summary.stations,
        routes = summary.routes,
        route_stops = summary.route_stops,
        "Catalog replaced"
    );
    Ok(summary)
}

/// Children first: route stops reference stations.
async fn delete_modes(
    tx: &mut Transaction<'_, Postgres>,
    agency: &str,
    modes: &[&'static str],
) -> Result<u64> {
    let modes: Vec<String> = modes.iter().map(|mode| mode.to_string()).collect();
    let mut deleted = 0;
    for table in ["catalog_route_stops", "catalog_routes", "catalog_stations"] {
        let result = sqlx::query(&format!(
            "DELETE FROM {table} WHERE agency = $1 AND mode = ANY($2)"
        ))
        .bind(agency)
        .bind(&modes)
        .execute(&mut **tx)
        .await?;
        deleted += result.rows_affected();
    }
    Ok(deleted)
}

async fn insert_stations(
    tx: &mut Transaction<'_, Postgres>,
    agency: &str,
    scope: &Scope,
    stations: &[Station],
) -> Result<u64> {
    let mut inserted = 0;
    for chunk in stations.chunks(INSERT_BATCH_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            INSERT INTO catalog_stations (
                agency,
                mode,
                operator,
                stop_id,
                stop_name,
                stop_lat,
                stop_lon,
                parent_station,
                child_stop_ids
            )
            "#,
        );
        query_builder.push_values(chunk, |mut b, station| {
            b.push_bind(agency)
                .push_bind(scope.mode)
                .push_bind(&scope.operator)
                .push_bind(&station.stop_id)
                .push_bind(&station.stop_name)
                .push_bind(station.stop_lat)
                .push_bind(station.stop_lon)
                .push_bind(&station.parent_station)
                .push_bind(Json(&station.child_stop_ids));
        });
        inserted += query_builder.build().execute(&mut **tx).await?.rows_affected();
    }
    Ok(inserted)
}

async fn insert_routes(
    tx: &mut Transaction<'_, Postgres>,
    agency: &str,
    scope: &Scope,
    routes: &[Route],
) -> Result<u64> {
    let mut inserted = 0;
    for chunk in routes.chunks(INSERT_BATCH_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            INSERT INTO catalog_routes (
                agency,
                mode,
                operator,
                route_id,
                agency_id,
                route_short_name,
                route_long_name,
                route_desc,
                route_type,
                route_url,
                route_color,
                route_text_color,
                route_sort_order
            )
            "#,
        );
        query_builder.push_values(chunk, |mut b, route| {
            b.push_bind(agency)
                .push_bind(scope.mode)
                .push_bind(&scope.operator)
                .push_bind(&route.route_id)
                .push_bind(&route.agency_id)
                .push_bind(&route.route_short_name)
                .push_bind(&route.route_long_name)
                .push_bind(&route.route_desc)
                .push_bind(route.route_type)
                .push_bind(&route.route_url)
                .push_bind(&route.route_color)
                .push_bind(&route.route_text_color)
                .push_bind(route.route_sort_order);
        });
        inserted += query_builder.build().execute(&mut **tx).await?.rows_affected();
    }
    Ok(inserted)
}

async fn insert_route_stops(
    tx: &mut Transaction<'_, Postgres>,
    agency: &str,
    scope: &Scope,
    route_stops: &[RouteStop],
) -> Result<u64> {
    let mut inserted = 0;
    for chunk in route_stops.chunks(INSERT_BATCH_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            INSERT INTO catalog_route_stops (
                agency,
                mode,
                operator,
                route_id,
                direction_id,
                stop_id,
                route_stop_sort_order
            )
            "#,
        );
        query_builder.push_values(chunk, |mut b, route_stop| {
            b.push_bind(agency)
                .push_bind(scope.mode)
                .push_bind(&scope.operator)
                .push_bind(&route_stop.route_id)
                .push_bind(route_stop.direction_id)
                .push_bind(&route_stop.stop_id)
                .push_bind(route_stop.route_stop_sort_order);
        });
        inserted += query_builder.build().execute(&mut **tx).await?.rows_affected();
    }
    Ok(inserted)
}
