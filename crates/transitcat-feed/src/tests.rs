use std::io::Cursor;
use std::path::PathBuf;

use crate::errors::TableError;
use crate::fingerprint::Fingerprint;
use crate::schema::{RoutesTable, StopTimesTable, StopsTable};
use crate::table::TableReader;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn reader(content: &str) -> TableReader<Cursor<Vec<u8>>> {
    TableReader::from_reader("inline.txt", Cursor::new(content.as_bytes().to_vec()))
}

#[test]
fn reads_fixture_with_bom_and_blank_lines() {
    let mut ids = Vec::new();
    let mut parents = Vec::new();
    let summary = TableReader::open(&fixture("stops.txt"))
        .expect("open stops fixture")
        .for_each_row(|cols: &StopsTable, row| {
            ids.push(row.get(cols.stop_id).to_string());
            parents.push(row.value(cols.parent_station).map(str::to_string));
        })
        .expect("stream stops fixture");

    assert_eq!(summary.rows, 3);
    assert_eq!(ids, vec!["101", "101N", "101S"]);
    assert_eq!(parents, vec![None, Some("101".into()), Some("101".into())]);
}

#[test]
fn quoted_fields_keep_commas_and_escaped_quotes() {
    let content = "route_id,route_long_name,route_desc\n\
                   A,\"8 Avenue, Express\",\"Runs \"\"local\"\" late nights\"\n";
    let mut seen = Vec::new();
    reader(content)
        .for_each_row(|cols: &RoutesTable, row| {
            seen.push((
                row.get(cols.route_long_name).to_string(),
                row.get(cols.route_desc).to_string(),
            ));
        })
        .expect("stream routes");

    assert_eq!(
        seen,
        vec![(
            "8 Avenue, Express".to_string(),
            "Runs \"local\" late nights".to_string()
        )]
    );
}

#[test]
fn header_is_located_by_name_not_position() {
    let content = "stop_sequence,stop_id,arrival_time,trip_id\n4,A100S,08:00:00,T1\n";
    let mut seen = Vec::new();
    reader(content)
        .for_each_row(|cols: &StopTimesTable, row| {
            seen.push((
                row.get(cols.trip_id).to_string(),
                row.get(cols.stop_id).to_string(),
                row.get(cols.stop_sequence).to_string(),
            ));
        })
        .expect("stream stop times");

    assert_eq!(seen, vec![("T1".into(), "A100S".into(), "4".into())]);
}

#[test]
fn missing_required_column_fails_before_any_row() {
    let content = "trip_id,arrival_time\nT1,08:00:00\n";
    let mut calls = 0;
    let err = reader(content)
        .for_each_row(|_: &StopTimesTable, _| calls += 1)
        .expect_err("stop_id is required");

    assert_eq!(calls, 0);
    match err {
        TableError::MissingColumns { table, missing } => {
            assert_eq!(table, "inline.txt");
            assert_eq!(missing, vec!["stop_id"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn optional_columns_read_empty_when_absent_or_short() {
    let content = "stop_id,stop_name,stop_lat\nX1,Only Name\n";
    let mut seen = Vec::new();
    reader(content)
        .for_each_row(|cols: &StopsTable, row| {
            assert!(!cols.parent_station.is_present());
            seen.push((
                row.get(cols.stop_lat).to_string(),
                row.value(cols.parent_station).is_none(),
            ));
        })
        .expect("stream short row");

    assert_eq!(seen, vec![(String::new(), true)]);
}

#[test]
fn empty_file_has_no_header() {
    let err = reader("\n\n   \n")
        .for_each_row(|_: &StopsTable, _| {})
        .expect_err("no header");
    assert!(matches!(err, TableError::MissingHeader { .. }));
}

#[test]
fn missing_file_reports_open_error() {
    let err = TableReader::open(&fixture("does_not_exist.txt")).err().expect("open fails");
    assert!(matches!(err, TableError::Open { ref table, .. } if table.ends_with("does_not_exist.txt")));
}

#[test]
fn fingerprint_covers_every_byte() {
    let content = "stop_id,stop_name\nA,Alpha\n";
    let first = reader(content)
        .for_each_row(|_: &StopsTable, _| {})
        .expect("first pass");
    let second = reader(content)
        .for_each_row(|_: &StopsTable, _| {})
        .expect("second pass");
    let changed = reader("stop_id,stop_name\nA,Alpha \n")
        .for_each_row(|_: &StopsTable, _| {})
        .expect("changed pass");

    assert_eq!(first.fingerprint, second.fingerprint);
    assert_ne!(first.fingerprint, changed.fingerprint);
    assert_eq!(
        first.fingerprint.as_str(),
        blake3::hash(content.as_bytes()).to_hex().as_str()
    );

    let combined = Fingerprint::combine([&first.fingerprint, &changed.fingerprint]);
    let reversed = Fingerprint::combine([&changed.fingerprint, &first.fingerprint]);
    assert_ne!(combined, reversed);
}

#[test]
fn scratch_directory_file_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("trips.txt");
    std::fs::write(&path, "stop_id,stop_name\r\nB,\"Bravo\"\r\n").expect("write table");

    let mut names = Vec::new();
    TableReader::open(&path)
        .expect("open scratch table")
        .for_each_row(|cols: &StopsTable, row| names.push(row.get(cols.stop_name).to_string()))
        .expect("stream scratch table");
    assert_eq!(names, vec!["Bravo"]);
}
