// crates/transitcat-core/src/pipeline.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};
use transitcat_feed::{Fingerprint, ROUTES_FILE, STOPS_FILE, STOP_TIMES_FILE, TRIPS_FILE};

use crate::diagnostics::Diagnostics;
use crate::error::{ImportError, Result};
use crate::locator::{require_datasets, require_single_dataset};
use crate::model::{CatalogSet, Scope, ScopeRows};
use crate::profiles::{AgencyProfile, DatasetCount, Layout, ModeDir, ModeSpec};
use crate::report::{DatasetSummary, RowCounts};
use crate::route_stops::{associate_stop_times, Associations, TripIndex};
use crate::routes::{RouteAccumulator, RouteCatalog};
use crate::stations::{materialize_stations, StationAccumulator, StopIndex};

/// Datasets processed together into one set of scopes.
///
/// A unit with a `fixed_mode` was read from a mode directory; a unit without
/// one is a merged feed whose routes are classified row by row.
#[derive(Debug, Clone)]
pub struct FeedUnit {
    pub label: String,
    pub operator: String,
    pub fixed_mode: Option<&'static ModeSpec>,
    pub datasets: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct UnitOutput {
    pub label: String,
    pub scopes: BTreeMap<Scope, ScopeRows>,
    pub diagnostics: BTreeMap<Scope, Diagnostics>,
    pub unscoped: Diagnostics,
    pub datasets: Vec<DatasetSummary>,
}

fn mode_spec(profile: &AgencyProfile, key: &str) -> Result<&'static ModeSpec> {
    profile.mode(key).ok_or_else(|| {
        ImportError::Config(format!(
            "agency '{}' lays out mode '{key}' but does not declare it",
            profile.slug
        ))
    })
}

fn mode_datasets(profile: &AgencyProfile, dir: &ModeDir, root: &Path, scope: &str) -> Result<Vec<PathBuf>> {
    match dir.datasets {
        DatasetCount::Single => Ok(vec![require_single_dataset(root, profile.required_files, scope)?]),
        DatasetCount::Many => require_datasets(root, profile.required_files, scope),
    }
}

/// Sorted, non-hidden subdirectories of `root`.
fn operator_dirs(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut operators = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }
        operators.push((name, entry.path()));
    }
    operators.sort();
    Ok(operators)
}

/// Resolves the agency's directory layout under `root` into feed units.
///
/// Every dataset is located before any file is parsed, so a missing or
/// ambiguous dataset fails the run up front.
pub fn plan_units(profile: &AgencyProfile, root: &Path) -> Result<Vec<FeedUnit>> {
    let units = match profile.layout {
        Layout::Merged => vec![FeedUnit {
            label: profile.slug.to_string(),
            operator: String::new(),
            fixed_mode: None,
            datasets: vec![require_single_dataset(root, profile.required_files, profile.slug)?],
        }],
        Layout::PerMode(dirs) => {
            let mut units = Vec::with_capacity(dirs.len());
            for dir in dirs {
                let spec = mode_spec(profile, dir.mode)?;
                units.push(FeedUnit {
                    label: spec.key.to_string(),
                    operator: String::new(),
                    fixed_mode: Some(spec),
                    datasets: mode_datasets(profile, dir, &root.join(dir.dir), spec.key)?,
                });
            }
            units
        }
        Layout::PerOperator(dirs) => {
            if !root.is_dir() {
                return Err(ImportError::DatasetNotFound {
                    scope: profile.slug.to_string(),
                    root: root.to_path_buf(),
                });
            }
            let mut units = Vec::new();
            for (operator, operator_root) in operator_dirs(root)? {
                for dir in dirs {
                    let mode_root = operator_root.join(dir.dir);
                    if !mode_root.is_dir() {
                        debug!(operator = %operator, mode = dir.mode, "operator does not publish mode");
                        continue;
                    }
                    let spec = mode_spec(profile, dir.mode)?;
                    let scope = Scope::new(spec.key, operator.clone());
                    units.push(FeedUnit {
                        label: scope.label(),
                        datasets: mode_datasets(profile, dir, &mode_root, &scope.label())?,
                        operator: operator.clone(),
                        fixed_mode: Some(spec),
                    });
                }
            }
            if units.is_empty() {
                return Err(ImportError::DatasetNotFound {
                    scope: profile.slug.to_string(),
                    root: root.to_path_buf(),
                });
            }
            units
        }
    };
    Ok(units)
}

/// Runs the read stages for one unit: routes across every dataset first,
/// then stops, trips, stop times and stations per dataset.
pub fn import_unit(profile: &AgencyProfile, unit: &FeedUnit) -> Result<UnitOutput> {
    let mut routes = RouteCatalog::new(profile, unit.fixed_mode);
    let mut route_summaries = Vec::with_capacity(unit.datasets.len());
    for dataset in &unit.datasets {
        route_summaries.push(routes.read(&dataset.join(ROUTES_FILE))?);
    }

    let mut associations = Associations::new(unit.fixed_mode);
    let mut stations: BTreeMap<&'static str, StationAccumulator> = BTreeMap::new();
    let mut datasets = Vec::with_capacity(unit.datasets.len());

    for (dataset, routes_summary) in unit.datasets.iter().zip(route_summaries) {
        let started = Instant::now();
        let (stops, stops_summary) = StopIndex::read(&dataset.join(STOPS_FILE))?;
        let (trips, trips_summary) =
            TripIndex::read(&dataset.join(TRIPS_FILE), &routes, profile.direction)?;
        let stop_times_summary = associate_stop_times(
            &dataset.join(STOP_TIMES_FILE),
            &unit.label,
            &stops,
            &trips,
            &mut associations,
        )?;

        match unit.fixed_mode {
            Some(spec) => materialize_stations(
                &stops,
                spec.hierarchy,
                stations.entry(spec.key).or_default(),
                |_| true,
            ),
            None => {
                for spec in profile.modes {
                    materialize_stations(
                        &stops,
                        spec.hierarchy,
                        stations.entry(spec.key).or_default(),
                        |key| associations.is_served(spec.key, key),
                    );
                }
            }
        }

        info!(
            unit = %unit.label,
            dataset = %dataset.display(),
            stops = stops_summary.rows,
            trips = trips_summary.rows,
            stop_times = stop_times_summary.rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dataset read"
        );

        datasets.push(DatasetSummary {
            unit: unit.label.clone(),
            path: dataset.display().to_string(),
            fingerprint: Fingerprint::combine([
                &stops_summary.fingerprint,
                &routes_summary.fingerprint,
                &trips_summary.fingerprint,
                &stop_times_summary.fingerprint,
            ]),
            rows: RowCounts {
                stops: stops_summary.rows,
                routes: routes_summary.rows,
                trips: trips_summary.rows,
                stop_times: stop_times_summary.rows,
            },
        });
    }

    let (mut routes_by_mode, mut conflicts) = routes.into_parts();
    let (mut associations_by_mode, unscoped) = associations.into_modes();
    let specs: Vec<&'static ModeSpec> = match unit.fixed_mode {
        Some(spec) => vec![spec],
        None => profile.modes.iter().collect(),
    };

    let mut scopes = BTreeMap::new();
    let mut diagnostics = BTreeMap::new();
    for spec in specs {
        let scope = Scope::new(spec.key, unit.operator.clone());
        let mut found = conflicts.remove(spec.key).unwrap_or_default();
        let route_stops = match associations_by_mode.remove(spec.key) {
            Some(state) => {
                found.merge(&state.diagnostics);
                state.route_stops.into_route_stops()
            }
            None => Vec::new(),
        };
        let rows = ScopeRows {
            stations: stations
                .remove(spec.key)
                .map(StationAccumulator::into_stations)
                .unwrap_or_default(),
            routes: routes_by_mode
                .remove(spec.key)
                .map(RouteAccumulator::into_routes)
                .unwrap_or_default(),
            route_stops,
        };
        debug!(
            scope = %scope,
            stations = rows.stations.len(),
            routes = rows.routes.len(),
            route_stops = rows.route_stops.len(),
            "Scope computed"
        );
        diagnostics.insert(scope.clone(), found);
        scopes.insert(scope, rows);
    }

    Ok(UnitOutput {
        label: unit.label.clone(),
        scopes,
        diagnostics,
        unscoped,
        datasets,
    })
}

/// Everything a run computed before it touches the database.
#[derive(Debug)]
pub struct ComputedImport {
    pub catalog: CatalogSet,
    pub diagnostics: BTreeMap<Scope, Diagnostics>,
    pub unscoped: Diagnostics,
    pub datasets: Vec<DatasetSummary>,
}

impl ComputedImport {
    pub fn new(profile: &'static AgencyProfile) -> Self {
        Self {
            catalog: CatalogSet::new(profile.slug, profile.mode_keys()),
            diagnostics: BTreeMap::new(),
            unscoped: Diagnostics::default(),
            datasets: Vec::new(),
        }
    }

    /// Folds a unit's output in. Units are absorbed in plan order and must
    /// not share a scope; a profile that lays out one mode twice is rejected.
    pub fn absorb(&mut self, output: UnitOutput) -> Result<()> {
        if let Some(scope) = output
            .scopes
            .keys()
            .find(|scope| self.catalog.scopes.contains_key(*scope))
        {
            return Err(ImportError::Config(format!(
                "feed unit {} produced scope {scope} a previous unit already produced",
                output.label
            )));
        }
        self.catalog.scopes.extend(output.scopes);
        for (scope, found) in output.diagnostics {
            self.diagnostics.entry(scope).or_default().merge(&found);
        }
        self.unscoped.merge(&output.unscoped);
        self.datasets.extend(output.datasets);
        Ok(())
    }
}

/// Plans and reads every unit on the calling thread.
pub fn compute_import(profile: &'static AgencyProfile, root: &Path) -> Result<ComputedImport> {
    let units = plan_units(profile, root)?;
    let mut computed = ComputedImport::new(profile);
    for unit in &units {
        computed.absorb(import_unit(profile, unit)?)?;
    }
    Ok(computed)
}

/// `source`, or `./<agency slug>` under the working directory.
pub fn resolve_source_dir(profile: &AgencyProfile, source: Option<PathBuf>) -> Result<PathBuf> {
    match source {
        Some(path) => Ok(path),
        None => Ok(std::env::current_dir()?.join(profile.default_source_dir())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::profile;

    fn unit_with_scope(label: &str, stop_id: &str) -> UnitOutput {
        let station = crate::model::Station {
            stop_id: stop_id.to_string(),
            stop_name: stop_id.to_string(),
            stop_lat: None,
            stop_lon: None,
            parent_station: None,
            child_stop_ids: [stop_id.to_string()].into_iter().collect(),
        };
        UnitOutput {
            label: label.to_string(),
            scopes: BTreeMap::from([(
                Scope::new("bus", ""),
                ScopeRows {
                    stations: vec![station],
                    ..ScopeRows::default()
                },
            )]),
            diagnostics: BTreeMap::new(),
            unscoped: Diagnostics::default(),
            datasets: Vec::new(),
        }
    }

    #[test]
    fn duplicate_scope_is_rejected_without_overwriting() {
        let mut computed = ComputedImport::new(profile("mta").expect("mta profile"));
        computed.absorb(unit_with_scope("bus", "100001")).expect("first unit");

        let err = computed
            .absorb(unit_with_scope("bus-extra", "200001"))
            .expect_err("duplicate scope");
        assert!(matches!(err, ImportError::Config(ref message) if message.contains("bus-extra")));

        let bus = &computed.catalog.scopes[&Scope::new("bus", "")];
        assert_eq!(bus.stations.len(), 1);
        assert_eq!(bus.stations[0].stop_id, "100001");
    }
}
