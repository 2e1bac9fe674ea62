use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

/// Canonical transport modes that raw route type codes collapse into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Tram,
    Subway,
    Rail,
    Bus,
    Ferry,
    Cable,
}

impl TransportMode {
    /// Basic route type code written when a feed omits or garbles its own.
    pub fn default_route_type(&self) -> i32 {
        match self {
            TransportMode::Tram => 0,
            TransportMode::Subway => 1,
            TransportMode::Rail => 2,
            TransportMode::Bus => 3,
            TransportMode::Ferry => 4,
            TransportMode::Cable => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Tram => "tram",
            TransportMode::Subway => "subway",
            TransportMode::Rail => "rail",
            TransportMode::Bus => "bus",
            TransportMode::Ferry => "ferry",
            TransportMode::Cable => "cable",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slice of the catalog one agency mode (and operator, where feeds are
/// shared) owns. `operator` is empty for agencies without operator scoping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    pub mode: &'static str,
    pub operator: String,
}

impl Scope {
    pub fn new(mode: &'static str, operator: impl Into<String>) -> Self {
        Self {
            mode,
            operator: operator.into(),
        }
    }

    pub fn label(&self) -> String {
        if self.operator.is_empty() {
            self.mode.to_string()
        } else {
            format!("{}/{}", self.operator, self.mode)
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub stop_id: String,
    pub stop_name: String,
    pub stop_lat: Option<f64>,
    pub stop_lon: Option<f64>,
    pub parent_station: Option<String>,
    /// Always contains `stop_id`.
    pub child_stop_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub route_id: String,
    pub agency_id: Option<String>,
    pub route_short_name: String,
    pub route_long_name: String,
    pub route_desc: Option<String>,
    pub route_type: i32,
    pub route_url: Option<String>,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
    pub route_sort_order: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RouteStopKey {
    pub route_id: String,
    pub direction_id: i16,
    pub stop_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteStop {
    pub route_id: String,
    pub direction_id: i16,
    pub stop_id: String,
    pub route_stop_sort_order: Option<i32>,
}

/// Final rows for one scope, sorted for reproducible loads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeRows {
    pub stations: Vec<Station>,
    pub routes: Vec<Route>,
    pub route_stops: Vec<RouteStop>,
}

/// Complete replacement set for one import run.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSet {
    pub agency: &'static str,
    /// Every mode whose rows the load replaces, whether or not it produced rows.
    pub modes: Vec<&'static str>,
    pub scopes: BTreeMap<Scope, ScopeRows>,
}

impl CatalogSet {
    pub fn new(agency: &'static str, modes: Vec<&'static str>) -> Self {
        Self {
            agency,
            modes,
            scopes: BTreeMap::new(),
        }
    }
}
