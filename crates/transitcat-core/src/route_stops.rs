use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use tracing::info;
use transitcat_feed::values::{normalize_route_id, parse_optional_i32};
use transitcat_feed::{StopTimesTable, TableError, TableReader, TableSummary, TripsTable};

use crate::diagnostics::Diagnostics;
use crate::model::{RouteStop, RouteStopKey};
use crate::profiles::{DirectionRule, ModeSpec};
use crate::routes::RouteCatalog;
use crate::stations::StopIndex;

/// Stop-time rows between progress log lines.
pub const PROGRESS_EVERY: u64 = 500_000;

#[derive(Debug, Clone)]
pub struct TripTarget {
    pub mode: &'static ModeSpec,
    pub route_id: String,
    pub direction_id: i16,
}

#[derive(Debug)]
pub enum TripLookup<'a> {
    Found(&'a TripTarget),
    /// The trip exists but its route was not classified into any mode.
    Ignored,
    /// Unknown trip id, including trips whose row had no route id.
    Missing,
}

/// trip_id to (mode, route, direction) for one dataset.
#[derive(Debug, Default)]
pub struct TripIndex {
    trips: HashMap<String, Option<TripTarget>>,
}

impl TripIndex {
    pub fn read(
        path: &Path,
        routes: &RouteCatalog<'_>,
        direction: DirectionRule,
    ) -> Result<(Self, TableSummary), TableError> {
        let mut index = TripIndex::default();
        let summary = TableReader::open(path)?.for_each_row(|cols: &TripsTable, row| {
            let Some(trip_id) = row.value(cols.trip_id) else {
                return;
            };
            let route_id = normalize_route_id(row.get(cols.route_id));
            if route_id.is_empty() {
                return;
            }
            let target = routes.mode_of(&route_id).map(|mode| TripTarget {
                mode,
                direction_id: direction.normalize(row.get(cols.direction_id)),
                route_id,
            });
            index.trips.entry(trip_id.to_string()).or_insert(target);
        })?;
        Ok((index, summary))
    }

    pub fn insert(&mut self, trip_id: impl Into<String>, target: Option<TripTarget>) {
        self.trips.entry(trip_id.into()).or_insert(target);
    }

    pub fn resolve(&self, trip_id: &str) -> TripLookup<'_> {
        match self.trips.get(trip_id) {
            Some(Some(target)) => TripLookup::Found(target),
            Some(None) => TripLookup::Ignored,
            None => TripLookup::Missing,
        }
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}

/// Route-stop associations of one mode, keeping the smallest known sequence.
#[derive(Debug, Default)]
pub struct RouteStopAccumulator {
    entries: HashMap<RouteStopKey, Option<i32>>,
}

impl RouteStopAccumulator {
    pub fn observe(&mut self, key: RouteStopKey, sequence: Option<i32>) {
        let slot = self.entries.entry(key).or_insert(sequence);
        *slot = match (*slot, sequence) {
            (Some(current), Some(seen)) => Some(current.min(seen)),
            (current, seen) => current.or(seen),
        };
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows ordered by route, direction, sequence (unknown last), then station.
    pub fn into_route_stops(self) -> Vec<RouteStop> {
        let mut rows: Vec<RouteStop> = self
            .entries
            .into_iter()
            .map(|(key, sequence)| RouteStop {
                route_id: key.route_id,
                direction_id: key.direction_id,
                stop_id: key.stop_id,
                route_stop_sort_order: sequence,
            })
            .collect();
        rows.sort_by(|a, b| {
            a.route_id
                .cmp(&b.route_id)
                .then(a.direction_id.cmp(&b.direction_id))
                .then_with(|| match (a.route_stop_sort_order, b.route_stop_sort_order) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then_with(|| a.stop_id.cmp(&b.stop_id))
        });
        rows
    }
}

#[derive(Debug, Default)]
pub struct ModeAssociations {
    pub route_stops: RouteStopAccumulator,
    /// Station keys referenced by at least one resolved stop time.
    pub served_stations: HashSet<String>,
    pub diagnostics: Diagnostics,
}

/// Per-mode association state of one unit. A stop time whose trip is
/// unknown cannot be attributed to a mode and lands in `unscoped`, unless
/// the unit has a single fixed mode.
#[derive(Debug, Default)]
pub struct Associations {
    by_mode: BTreeMap<&'static str, ModeAssociations>,
    fixed: Option<&'static str>,
    pub unscoped: Diagnostics,
}

impl Associations {
    pub fn new(fixed: Option<&'static ModeSpec>) -> Self {
        Self {
            fixed: fixed.map(|spec| spec.key),
            ..Self::default()
        }
    }

    pub fn mode(&self, key: &str) -> Option<&ModeAssociations> {
        self.by_mode.get(key)
    }

    pub fn is_served(&self, mode: &str, station_key: &str) -> bool {
        self.by_mode
            .get(mode)
            .is_some_and(|state| state.served_stations.contains(station_key))
    }

    fn missing_trip(&mut self, trip_id: &str) {
        match self.fixed {
            Some(key) => self.by_mode.entry(key).or_default().diagnostics.missing_trip(trip_id),
            None => self.unscoped.missing_trip(trip_id),
        }
    }

    pub fn into_modes(self) -> (BTreeMap<&'static str, ModeAssociations>, Diagnostics) {
        (self.by_mode, self.unscoped)
    }
}

/// Joins one dataset's stop times with its trips and stops.
pub fn associate_stop_times(
    path: &Path,
    label: &str,
    stops: &StopIndex,
    trips: &TripIndex,
    associations: &mut Associations,
) -> Result<TableSummary, TableError> {
    let mut seen: u64 = 0;
    TableReader::open(path)?.for_each_row(|cols: &StopTimesTable, row| {
        seen += 1;
        if seen % PROGRESS_EVERY == 0 {
            info!(unit = label, rows = seen, "stop_times progress");
        }

        let (Some(trip_id), Some(raw_stop_id)) = (row.value(cols.trip_id), row.value(cols.stop_id))
        else {
            return;
        };
        let target = match trips.resolve(trip_id) {
            TripLookup::Found(target) => target,
            TripLookup::Ignored => return,
            TripLookup::Missing => {
                associations.missing_trip(trip_id);
                return;
            }
        };

        let state = associations.by_mode.entry(target.mode.key).or_default();
        let Some(station_key) = stops.station_key(raw_stop_id, target.mode.hierarchy) else {
            state.diagnostics.missing_stop(raw_stop_id);
            return;
        };

        if !state.served_stations.contains(station_key) {
            state.served_stations.insert(station_key.to_string());
        }
        state.route_stops.observe(
            RouteStopKey {
                route_id: target.route_id.clone(),
                direction_id: target.direction_id,
                stop_id: station_key.to_string(),
            },
            parse_optional_i32(row.get(cols.stop_sequence)),
        );
    })
}
