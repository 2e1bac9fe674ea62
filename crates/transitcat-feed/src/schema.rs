use crate::table::{Column, Header, TableSchema};

pub const STOPS_FILE: &str = "stops.txt";
pub const ROUTES_FILE: &str = "routes.txt";
pub const TRIPS_FILE: &str = "trips.txt";
pub const STOP_TIMES_FILE: &str = "stop_times.txt";

/// Files a directory must hold to count as a feed.
pub const REQUIRED_FEED_FILES: [&str; 4] = [STOPS_FILE, ROUTES_FILE, TRIPS_FILE, STOP_TIMES_FILE];

#[derive(Debug, Clone, Copy)]
pub struct StopsTable {
    pub stop_id: Column,
    pub stop_name: Column,
    pub stop_lat: Column,
    pub stop_lon: Column,
    pub parent_station: Column,
    pub location_type: Column,
}

impl TableSchema for StopsTable {
    const REQUIRED: &'static [&'static str] = &["stop_id", "stop_name"];

    fn bind(header: &Header) -> Self {
        Self {
            stop_id: header.column("stop_id"),
            stop_name: header.column("stop_name"),
            stop_lat: header.column("stop_lat"),
            stop_lon: header.column("stop_lon"),
            parent_station: header.column("parent_station"),
            location_type: header.column("location_type"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RoutesTable {
    pub route_id: Column,
    pub agency_id: Column,
    pub route_short_name: Column,
    pub route_long_name: Column,
    pub route_desc: Column,
    pub route_type: Column,
    pub route_url: Column,
    pub route_color: Column,
    pub route_text_color: Column,
    pub route_sort_order: Column,
}

impl TableSchema for RoutesTable {
    const REQUIRED: &'static [&'static str] = &["route_id"];

    fn bind(header: &Header) -> Self {
        Self {
            route_id: header.column("route_id"),
            agency_id: header.column("agency_id"),
            route_short_name: header.column("route_short_name"),
            route_long_name: header.column("route_long_name"),
            route_desc: header.column("route_desc"),
            route_type: header.column("route_type"),
            route_url: header.column("route_url"),
            route_color: header.column("route_color"),
            route_text_color: header.column("route_text_color"),
            route_sort_order: header.column("route_sort_order"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TripsTable {
    pub trip_id: Column,
    pub route_id: Column,
    pub direction_id: Column,
}

impl TableSchema for TripsTable {
    const REQUIRED: &'static [&'static str] = &["trip_id", "route_id"];

    fn bind(header: &Header) -> Self {
        Self {
            trip_id: header.column("trip_id"),
            route_id: header.column("route_id"),
            direction_id: header.column("direction_id"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StopTimesTable {
    pub trip_id: Column,
    pub stop_id: Column,
    pub stop_sequence: Column,
}

impl TableSchema for StopTimesTable {
    const REQUIRED: &'static [&'static str] = &["trip_id", "stop_id"];

    fn bind(header: &Header) -> Self {
        Self {
            trip_id: header.column("trip_id"),
            stop_id: header.column("stop_id"),
            stop_sequence: header.column("stop_sequence"),
        }
    }
}
