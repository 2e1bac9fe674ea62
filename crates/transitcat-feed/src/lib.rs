pub mod errors;
pub mod fingerprint;
pub mod reduce;
pub mod schema;
pub mod table;
pub mod values;

pub use errors::TableError;
pub use fingerprint::{Fingerprint, FingerprintReader};
pub use reduce::{reduce_stop_times, ReduceSummary};
pub use schema::{
    RoutesTable, StopTimesTable, StopsTable, TripsTable, REQUIRED_FEED_FILES, ROUTES_FILE,
    STOPS_FILE, STOP_TIMES_FILE, TRIPS_FILE,
};
pub use table::{Column, Header, Row, TableReader, TableSchema, TableSummary};

#[cfg(test)]
mod tests;
