pub mod catalog;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod loader;
pub mod locator;
pub mod model;
#[cfg(feature = "runtime")]
pub mod orchestrator;
pub mod pipeline;
pub mod profiles;
pub mod report;
pub mod route_stops;
pub mod routes;
pub mod stations;
