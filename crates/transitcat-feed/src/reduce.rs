use std::collections::HashSet;
use std::fs;
use std::path::Path;

use csv::Writer;

use crate::errors::TableError;
use crate::schema::StopTimesTable;
use crate::table::TableReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceSummary {
    pub rows_in: u64,
    pub rows_out: u64,
}

fn same_file(input: &Path, output: &Path) -> bool {
    match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(input), Ok(output)) => input == output,
        _ => false,
    }
}

/// Copies the `trip_id`/`stop_id` pairs of a stop-times table into a
/// two-column file. Rows missing either id are dropped; with `dedupe` only
/// the first occurrence of each pair is written.
pub fn reduce_stop_times(input: &Path, output: &Path, dedupe: bool) -> Result<ReduceSummary, TableError> {
    let table = output.display().to_string();
    if same_file(input, output) {
        return Err(TableError::SameFile { table });
    }
    let reader = TableReader::open(input)?;

    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| TableError::Open {
            table: table.clone(),
            source,
        })?;
    }
    let write_error = |source| TableError::Write {
        table: table.clone(),
        source,
    };
    let mut writer = Writer::from_path(output).map_err(write_error)?;
    writer.write_record(["trip_id", "stop_id"]).map_err(write_error)?;

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut rows_out = 0u64;
    let mut failed: Option<csv::Error> = None;

    let summary = reader.for_each_row(|cols: &StopTimesTable, row| {
        if failed.is_some() {
            return;
        }
        let (Some(trip_id), Some(stop_id)) = (row.value(cols.trip_id), row.value(cols.stop_id))
        else {
            return;
        };
        if dedupe && !seen.insert((trip_id.to_string(), stop_id.to_string())) {
            return;
        }
        match writer.write_record([trip_id, stop_id]) {
            Ok(()) => rows_out += 1,
            Err(err) => failed = Some(err),
        }
    })?;

    if let Some(err) = failed {
        return Err(write_error(err));
    }
    writer
        .flush()
        .map_err(|source| write_error(csv::Error::from(source)))?;

    Ok(ReduceSummary {
        rows_in: summary.rows,
        rows_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOP_TIMES: &str = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
        T1,06:00:00,06:00:00,40380,1\n\
        T1,06:00:00,06:00:00,40380,1\n\
        T1,06:02:00,06:02:00,,2\n\
        T2,07:00:00,07:00:00,40380,1\n";

    #[test]
    fn keeps_only_the_id_columns() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = tmp.path().join("stop_times.txt");
        let output = tmp.path().join("out/reduced.csv");
        fs::write(&input, STOP_TIMES).expect("write input");

        let summary = reduce_stop_times(&input, &output, false).expect("reduce");
        assert_eq!(summary, ReduceSummary { rows_in: 4, rows_out: 3 });
        assert_eq!(
            fs::read_to_string(&output).expect("read output"),
            "trip_id,stop_id\nT1,40380\nT1,40380\nT2,40380\n"
        );
    }

    #[test]
    fn dedupe_drops_repeated_pairs() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = tmp.path().join("stop_times.txt");
        let output = tmp.path().join("reduced.csv");
        fs::write(&input, STOP_TIMES).expect("write input");

        let summary = reduce_stop_times(&input, &output, true).expect("reduce");
        assert_eq!(summary.rows_out, 2);
    }

    #[test]
    fn refuses_to_overwrite_its_input() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = tmp.path().join("stop_times.txt");
        fs::write(&input, STOP_TIMES).expect("write input");

        let err = reduce_stop_times(&input, &input, false).expect_err("same file");
        assert!(matches!(err, TableError::SameFile { .. }));
        assert_eq!(fs::read_to_string(&input).expect("input intact"), STOP_TIMES);
    }

    #[test]
    fn requires_both_id_columns() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = tmp.path().join("stop_times.txt");
        fs::write(&input, "trip_id,stop_sequence\nT1,1\n").expect("write input");

        let err = reduce_stop_times(&input, &tmp.path().join("out.csv"), false)
            .expect_err("missing stop_id");
        assert!(matches!(err, TableError::MissingColumns { ref missing, .. } if missing == &["stop_id"]));
    }
}
