use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use transitcat_feed::values::{parse_coordinate, parse_optional_i32};
use transitcat_feed::{Row, StopsTable, TableError, TableReader, TableSummary};

use crate::model::Station;
use crate::profiles::HierarchyRule;

/// Parent chains longer than this are treated as broken.
const MAX_HIERARCHY_DEPTH: usize = 8;

/// One raw row of a stops table.
#[derive(Debug, Clone, PartialEq)]
pub struct StopRecord {
    pub stop_id: String,
    pub stop_name: Option<String>,
    pub stop_lat: Option<f64>,
    pub stop_lon: Option<f64>,
    pub parent_station: Option<String>,
    pub location_type: Option<i32>,
}

impl StopRecord {
    fn from_row(cols: &StopsTable, row: &Row<'_>) -> Option<Self> {
        let stop_id = row.value(cols.stop_id)?;
        Some(Self {
            stop_id: stop_id.to_string(),
            stop_name: row.value(cols.stop_name).map(str::to_string),
            stop_lat: parse_coordinate(row.get(cols.stop_lat)),
            stop_lon: parse_coordinate(row.get(cols.stop_lon)),
            parent_station: row.value(cols.parent_station).map(str::to_string),
            location_type: parse_optional_i32(row.get(cols.location_type)),
        })
    }

    /// `location_type = 1`, or an untyped/plain stop with no parent above it.
    fn is_station_shaped(&self) -> bool {
        match self.location_type {
            Some(1) => true,
            None | Some(0) => self.parent_station.is_none(),
            Some(_) => false,
        }
    }
}

/// All stop rows of one dataset in file order, indexed by raw id.
#[derive(Debug, Default)]
pub struct StopIndex {
    rows: Vec<StopRecord>,
    by_id: HashMap<String, usize>,
    declared_parents: HashSet<String>,
}

impl StopIndex {
    pub fn read(path: &Path) -> Result<(Self, TableSummary), TableError> {
        let mut index = StopIndex::default();
        let summary = TableReader::open(path)?.for_each_row(|cols: &StopsTable, row| {
            if let Some(record) = StopRecord::from_row(cols, row) {
                index.push(record);
            }
        })?;
        Ok((index, summary))
    }

    pub fn from_records(records: impl IntoIterator<Item = StopRecord>) -> Self {
        let mut index = StopIndex::default();
        for record in records {
            index.push(record);
        }
        index
    }

    fn push(&mut self, record: StopRecord) {
        let position = self.rows.len();
        self.by_id.entry(record.stop_id.clone()).or_insert(position);
        if let Some(parent) = &record.parent_station {
            if !self.declared_parents.contains(parent) {
                self.declared_parents.insert(parent.clone());
            }
        }
        self.rows.push(record);
    }

    pub fn get(&self, stop_id: &str) -> Option<&StopRecord> {
        self.by_id.get(stop_id).map(|&idx| &self.rows[idx])
    }

    pub fn rows(&self) -> &[StopRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Canonical station key for a raw id.
    ///
    /// Under `DeclaredParent` a parent id without a row of its own is still a
    /// station key, since a placeholder station is built for it. Any other id
    /// without a row resolves to `None`.
    pub fn station_key(&self, raw_stop_id: &str, rule: HierarchyRule) -> Option<&str> {
        match self.get(raw_stop_id) {
            Some(stop) => Some(self.key_for(stop, rule)),
            None if rule == HierarchyRule::DeclaredParent => self
                .declared_parents
                .get(raw_stop_id)
                .map(String::as_str),
            None => None,
        }
    }

    pub fn key_for<'a>(&'a self, stop: &'a StopRecord, rule: HierarchyRule) -> &'a str {
        match rule {
            HierarchyRule::Flat => stop.stop_id.as_str(),
            HierarchyRule::DeclaredParent => stop
                .parent_station
                .as_deref()
                .unwrap_or(stop.stop_id.as_str()),
            HierarchyRule::NearestStation => self.nearest_station(stop),
        }
    }

    fn nearest_station<'a>(&'a self, stop: &'a StopRecord) -> &'a str {
        let mut current = stop;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            if current.is_station_shaped() {
                return &current.stop_id;
            }
            let Some(parent) = current
                .parent_station
                .as_deref()
                .and_then(|parent_id| self.get(parent_id))
            else {
                break;
            };
            current = parent;
        }
        &stop.stop_id
    }
}

#[derive(Debug)]
struct StationDraft {
    stop_name: Option<String>,
    stop_lat: Option<f64>,
    stop_lon: Option<f64>,
    parent_station: Option<String>,
    child_stop_ids: BTreeSet<String>,
}

/// Canonical stations of one scope, merged across every dataset of a run.
#[derive(Debug, Default)]
pub struct StationAccumulator {
    stations: HashMap<String, StationDraft>,
}

impl StationAccumulator {
    /// Folds one raw stop into the station `key`.
    ///
    /// The first observation creates the station; later ones only fill
    /// attributes that are still empty. `key_row` is the key's own stop row,
    /// absent when a declared parent was never published, in which case the
    /// station starts as a placeholder named after its id.
    pub fn observe(
        &mut self,
        key: &str,
        key_row: Option<&StopRecord>,
        stop: &StopRecord,
        rule: HierarchyRule,
    ) {
        let draft = self
            .stations
            .entry(key.to_string())
            .or_insert_with(|| StationDraft {
                stop_name: None,
                stop_lat: None,
                stop_lon: None,
                parent_station: key_row
                    .and_then(|row| row.parent_station.clone())
                    .filter(|parent| parent != key),
                child_stop_ids: BTreeSet::from([key.to_string()]),
            });

        if draft.stop_name.is_none() {
            draft.stop_name = stop.stop_name.clone();
        }
        if draft.stop_lat.is_none() {
            draft.stop_lat = stop.stop_lat;
        }
        if draft.stop_lon.is_none() {
            draft.stop_lon = stop.stop_lon;
        }
        if rule.is_hierarchical() && !draft.child_stop_ids.contains(&stop.stop_id) {
            draft.child_stop_ids.insert(stop.stop_id.clone());
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.stations.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Final station rows sorted by id.
    pub fn into_stations(self) -> Vec<Station> {
        let mut stations: Vec<Station> = self
            .stations
            .into_iter()
            .map(|(stop_id, draft)| Station {
                stop_name: draft.stop_name.unwrap_or_else(|| stop_id.clone()),
                stop_lat: draft.stop_lat,
                stop_lon: draft.stop_lon,
                parent_station: draft.parent_station,
                child_stop_ids: draft.child_stop_ids,
                stop_id,
            })
            .collect();
        stations.sort_by(|a, b| a.stop_id.cmp(&b.stop_id));
        stations
    }
}

/// Folds every stop of `index` whose key passes `include` into `stations`.
pub fn materialize_stations<F>(
    index: &StopIndex,
    rule: HierarchyRule,
    stations: &mut StationAccumulator,
    mut include: F,
) where
    F: FnMut(&str) -> bool,
{
    for stop in index.rows() {
        let key = index.key_for(stop, rule);
        if include(key) {
            stations.observe(key, index.get(key), stop, rule);
        }
    }
}
