use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use transitcat_core::error::ImportError;
use transitcat_core::model::{Scope, ScopeRows};
use transitcat_core::pipeline::{compute_import, plan_units, ComputedImport};
use transitcat_core::profiles::profile;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn compute(agency: &str) -> ComputedImport {
    let profile = profile(agency).expect("known agency");
    compute_import(profile, &fixture(agency)).expect("compute import")
}

fn scope<'a>(computed: &'a ComputedImport, mode: &'static str, operator: &str) -> &'a ScopeRows {
    computed
        .catalog
        .scopes
        .get(&Scope::new(mode, operator))
        .unwrap_or_else(|| panic!("missing scope {operator}/{mode}"))
}

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn per_mode_layout_plans_one_unit_per_mode_directory() {
    let mta = profile("mta").expect("mta");
    let units = plan_units(mta, &fixture("mta")).expect("plan");

    let labels: Vec<_> = units.iter().map(|unit| unit.label.as_str()).collect();
    assert_eq!(labels, vec!["subway", "lirr", "mnr", "bus"]);
    let bus = &units[3];
    assert_eq!(bus.datasets.len(), 2);
    assert!(bus.datasets[0].ends_with("bronx"));
    assert!(bus.datasets[1].ends_with("queens"));
}

#[test]
fn declared_parents_fan_in_platform_ids() {
    let computed = compute("mta");
    let subway = scope(&computed, "subway", "");

    let station_ids: Vec<_> = subway.stations.iter().map(|s| s.stop_id.as_str()).collect();
    assert_eq!(station_ids, vec!["A100", "A101"]);
    assert_eq!(subway.stations[0].child_stop_ids, ids(&["A100", "A100N", "A100S"]));
    assert_eq!(subway.stations[1].stop_name, "Dyckman St");
}

#[test]
fn route_stops_keep_minimum_sequence_in_a_stable_order() {
    let computed = compute("mta");
    let subway = scope(&computed, "subway", "");

    let rows: Vec<_> = subway
        .route_stops
        .iter()
        .map(|row| {
            (
                row.route_id.as_str(),
                row.direction_id,
                row.stop_id.as_str(),
                row.route_stop_sort_order,
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            ("A", 0, "A101", Some(1)),
            ("A", 0, "A100", Some(2)),
            ("A", 1, "A100", Some(1)),
            ("A", 1, "A101", Some(2)),
        ]
    );
}

#[test]
fn unresolved_references_are_counted_per_occurrence() {
    let computed = compute("mta");
    let warnings = computed.diagnostics[&Scope::new("subway", "")].warnings();

    assert_eq!(warnings.missing_stop_refs, 3);
    assert_eq!(warnings.sample_missing_stop_ids, vec!["Z999"]);
    assert_eq!(warnings.missing_trip_refs, 1);
    assert_eq!(warnings.sample_missing_trip_ids, vec!["GHOST"]);
    assert!(computed.diagnostics[&Scope::new("bus", "")].is_clean());
}

#[test]
fn routes_default_to_the_directory_mode_type() {
    let computed = compute("mta");

    let subway = &scope(&computed, "subway", "").routes;
    assert_eq!(subway.len(), 1);
    assert_eq!(subway[0].route_id, "A");
    assert_eq!(subway[0].route_type, 1);
    assert_eq!(subway[0].route_short_name, "A");
    assert!(subway[0].route_desc.is_some());

    let lirr = &scope(&computed, "lirr", "").routes;
    assert_eq!(lirr[0].route_type, 2);
    assert_eq!(lirr[0].route_long_name, "Babylon Branch");
}

#[test]
fn bus_divisions_merge_before_load() {
    let computed = compute("mta");
    let bus = scope(&computed, "bus", "");

    let station_ids: Vec<_> = bus.stations.iter().map(|s| s.stop_id.as_str()).collect();
    assert_eq!(station_ids, vec!["100001", "100002", "200001"]);
    assert_eq!(bus.stations[0].stop_name, "GRAND CONCOURSE/E 161 ST");
    assert!(bus
        .stations
        .iter()
        .all(|station| station.child_stop_ids == ids(&[station.stop_id.as_str()])));

    let route_ids: Vec<_> = bus.routes.iter().map(|r| r.route_id.as_str()).collect();
    assert_eq!(route_ids, vec!["BX1", "Q1"]);
    assert_eq!(bus.routes[0].route_color.as_deref(), Some("00AEEF"));
    assert_eq!(bus.routes[1].route_type, 3);
    assert_eq!(computed.datasets.iter().filter(|d| d.unit == "bus").count(), 2);
}

#[test]
fn merged_feed_branches_rows_per_mode() {
    let computed = compute("cta");
    let subway = scope(&computed, "subway", "");
    let bus = scope(&computed, "bus", "");

    assert_eq!(subway.stations.len(), 1);
    assert_eq!(subway.stations[0].stop_id, "40380");
    assert_eq!(subway.stations[0].child_stop_ids, ids(&["30074", "30075", "40380"]));
    assert_eq!(subway.routes[0].route_id, "BRN");
    assert_eq!(subway.route_stops.len(), 2);

    let bus_stations: Vec<_> = bus.stations.iter().map(|s| s.stop_id.as_str()).collect();
    assert_eq!(bus_stations, vec!["1106", "1107"]);
    assert_eq!(bus.routes.len(), 1);

    assert_eq!(computed.unscoped.warnings().missing_trip_refs, 1);
    assert!(computed.diagnostics.values().all(|found| found.is_clean()));
}

#[test]
fn operator_layout_scopes_rows_by_operator() {
    let computed = compute("bay511");
    let scopes: Vec<_> = computed.catalog.scopes.keys().map(Scope::label).collect();
    assert_eq!(scopes, vec!["AC/bus", "BA/rail"]);

    let rail = scope(&computed, "rail", "BA");
    assert_eq!(rail.stations.len(), 2);
    assert_eq!(rail.stations[0].child_stop_ids, ids(&["12TH", "12TH_1"]));
    assert_eq!(rail.routes[0].route_type, 1);

    let bus = scope(&computed, "bus", "AC");
    assert_eq!(bus.routes[0].route_id, "51A");
    assert_eq!(bus.route_stops.len(), 2);
}

#[test]
fn every_station_contains_its_own_id_and_route_stop_keys_are_unique() {
    for agency in ["mta", "cta", "bay511"] {
        let computed = compute(agency);
        for (scope, rows) in &computed.catalog.scopes {
            for station in &rows.stations {
                assert!(
                    station.child_stop_ids.contains(&station.stop_id),
                    "{agency} {scope} {}",
                    station.stop_id
                );
            }
            let mut keys = HashSet::new();
            for row in &rows.route_stops {
                assert!(
                    keys.insert((&row.route_id, row.direction_id, &row.stop_id)),
                    "duplicate route stop in {agency} {scope}"
                );
            }
        }
    }
}

#[test]
fn identical_input_computes_identical_catalogs() {
    for agency in ["mta", "cta", "bay511"] {
        let first = compute(agency);
        let second = compute(agency);
        assert_eq!(first.catalog, second.catalog);
        let fingerprints = |computed: &ComputedImport| {
            computed
                .datasets
                .iter()
                .map(|dataset| dataset.fingerprint.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(fingerprints(&first), fingerprints(&second));
    }
}

#[test]
fn missing_mode_dataset_is_fatal() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let err = plan_units(profile("njt").expect("njt"), tmp.path()).expect_err("no feeds");
    assert!(matches!(err, ImportError::DatasetNotFound { ref scope, .. } if scope == "rail"));
}
