//! Read-only accessors over the loaded catalog.

use serde::Serialize;
use sqlx::types::Json;

use crate::db::DbPool;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct StationRecord {
    pub operator: String,
    pub stop_id: String,
    pub stop_name: String,
    pub stop_lat: Option<f64>,
    pub stop_lon: Option<f64>,
    pub parent_station: Option<String>,
    pub child_stop_ids: Json<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RouteRecord {
    pub operator: String,
    pub route_id: String,
    pub route_short_name: String,
    pub route_long_name: String,
    pub route_type: i32,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
    pub route_sort_order: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ModeCount {
    pub mode: String,
    pub stations: i64,
    pub routes: i64,
    pub route_stops: i64,
}

const STATION_COLUMNS: &str =
    "operator, stop_id, stop_name, stop_lat, stop_lon, parent_station, child_stop_ids";

/// Stations whose id or name contains `search` (case-insensitive), by name.
pub async fn list_stations(
    pool: &DbPool,
    agency: &str,
    mode: &str,
    search: Option<&str>,
    limit: i64,
) -> Result<Vec<StationRecord>> {
    let search = search.map(str::trim).filter(|term| !term.is_empty());
    let stations = sqlx::query_as::<_, StationRecord>(&format!(
        r#"
            SELECT {STATION_COLUMNS}
            FROM catalog_stations
            WHERE agency = $1
              AND mode = $2
              AND (
                $3::text IS NULL
                OR strpos(lower(stop_id), lower($3)) > 0
                OR strpos(lower(stop_name), lower($3)) > 0
              )
            ORDER BY stop_name, operator, stop_id
            LIMIT $4
        "#
    ))
    .bind(agency)
    .bind(mode)
    .bind(search)
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;
    Ok(stations)
}

/// Resolves a canonical id or any raw child id to its station.
pub async fn find_station(
    pool: &DbPool,
    agency: &str,
    mode: &str,
    stop_id: &str,
) -> Result<Option<StationRecord>> {
    let station = sqlx::query_as::<_, StationRecord>(&format!(
        r#"
            SELECT {STATION_COLUMNS}
            FROM catalog_stations
            WHERE agency = $1
              AND mode = $2
              AND (stop_id = $3 OR child_stop_ids @> jsonb_build_array($3::text))
            ORDER BY (stop_id = $3) DESC, operator, stop_id
            LIMIT 1
        "#
    ))
    .bind(agency)
    .bind(mode)
    .bind(stop_id)
    .fetch_optional(pool)
    .await?;
    Ok(station)
}

/// Routes with at least one association to the station.
pub async fn routes_for_station(
    pool: &DbPool,
    agency: &str,
    mode: &str,
    station_id: &str,
) -> Result<Vec<RouteRecord>> {
    let routes = sqlx::query_as::<_, RouteRecord>(
        r#"
            SELECT DISTINCT
                r.operator,
                r.route_id,
                r.route_short_name,
                r.route_long_name,
                r.route_type,
                r.route_color,
                r.route_text_color,
                r.route_sort_order
            FROM catalog_route_stops rs
            JOIN catalog_routes r
              ON r.agency = rs.agency
             AND r.mode = rs.mode
             AND r.operator = rs.operator
             AND r.route_id = rs.route_id
            WHERE rs.agency = $1
              AND rs.mode = $2
              AND rs.stop_id = $3
            ORDER BY r.operator, r.route_id
        "#,
    )
    .bind(agency)
    .bind(mode)
    .bind(station_id)
    .fetch_all(pool)
    .await?;
    Ok(routes)
}

pub async fn routes_for_mode(pool: &DbPool, agency: &str, mode: &str) -> Result<Vec<RouteRecord>> {
    let routes = sqlx::query_as::<_, RouteRecord>(
        r#"
            SELECT
                operator,
                route_id,
                route_short_name,
                route_long_name,
                route_type,
                route_color,
                route_text_color,
                route_sort_order
            FROM catalog_routes
            WHERE agency = $1 AND mode = $2
            ORDER BY route_sort_order NULLS LAST, operator, route_id
        "#,
    )
    .bind(agency)
    .bind(mode)
    .fetch_all(pool)
    .await?;
    Ok(routes)
}

/// Row counts per mode currently loaded for `agency`.
pub async fn mode_counts(pool: &DbPool, agency: &str) -> Result<Vec<ModeCount>> {
    let counts = sqlx::query_as::<_, ModeCount>(
        r#"
            WITH modes AS (
                SELECT mode FROM catalog_stations WHERE agency = $1
                UNION
                SELECT mode FROM catalog_routes WHERE agency = $1
            )
            SELECT
                m.mode,
                (SELECT COUNT(*) FROM catalog_stations s WHERE s.agency = $1 AND s.mode = m.mode) AS "stations",
                (SELECT COUNT(*) FROM catalog_routes r WHERE r.agency = $1 AND r.mode = m.mode) AS "routes",
                (SELECT COUNT(*) FROM catalog_route_stops rs WHERE rs.agency = $1 AND rs.mode = m.mode) AS "route_stops"
            FROM modes m
            ORDER BY m.mode
        "#,
    )
    .bind(agency)
    .fetch_all(pool)
    .await?;
    Ok(counts)
}
