use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

pub type DbPool = Pool<Postgres>;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_DATABASE: &str = "commutelive";
const DEFAULT_USER: &str = "postgres";

/// Establish a new Postgres connection pool for the import and admin tools.
pub async fn connect(database_url: &str) -> Result<DbPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .with_context(|| "failed to connect to Postgres")
}

/// Run database migrations embedded at compile-time.
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .with_context(|| "failed to run database migrations")
}

/// `DATABASE_URL`, then `TRANSITCAT_DATABASE_URL`, then a URL composed from
/// the `POSTGRES_*` variables used by the compose deployment.
pub fn database_url_from_env() -> String {
    database_url_from(|key| env::var(key).ok().filter(|value| !value.trim().is_empty()))
}

fn database_url_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    if let Some(url) = lookup("DATABASE_URL").or_else(|| lookup("TRANSITCAT_DATABASE_URL")) {
        return url;
    }

    let host = lookup("POSTGRES_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = lookup("POSTGRES_PORT")
        .and_then(|port| port.trim().parse::<u16>().ok())
        .or_else(|| {
            // "127.0.0.1:5433" style bindings end with the published port.
            lookup("POSTGRES_PORT_BIND")
                .and_then(|bind| bind.rsplit(':').next().and_then(|port| port.trim().parse::<u16>().ok()))
        })
        .unwrap_or(DEFAULT_PORT);
    let database = lookup("POSTGRES_DB").unwrap_or_else(|| DEFAULT_DATABASE.to_string());
    let user = lookup("POSTGRES_USER").unwrap_or_else(|| DEFAULT_USER.to_string());

    match lookup("POSTGRES_PASSWORD") {
        Some(password) => format!("postgres://{user}:{password}@{host}:{port}/{database}"),
        None => format!("postgres://{user}@{host}:{port}/{database}"),
    }
}
