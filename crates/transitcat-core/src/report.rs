use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use transitcat_feed::Fingerprint;
use uuid::Uuid;

use crate::diagnostics::{Diagnostics, Warnings};
use crate::loader::LoadSummary;
use crate::model::{CatalogSet, Scope};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowCounts {
    pub stops: u64,
    pub routes: u64,
    pub trips: u64,
    pub stop_times: u64,
}

/// One feed directory read during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub unit: String,
    pub path: String,
    /// Combined blake3 digest of the four feed files, in read order.
    pub fingerprint: Fingerprint,
    pub rows: RowCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeCounts {
    pub stations: usize,
    pub routes: usize,
    pub route_stops: usize,
}

/// Summary printed after every run. Not persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub run_id: Uuid,
    pub agency: &'static str,
    pub source_dir: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub datasets: Vec<DatasetSummary>,
    /// Datasets read per feed unit (a mode, `operator/mode`, or the merged feed).
    pub dataset_counts: BTreeMap<String, usize>,
    /// Keyed by scope label (`mode` or `operator/mode`).
    pub counts: BTreeMap<String, ScopeCounts>,
    pub warnings: BTreeMap<String, Warnings>,
    /// Stop times whose trip is unknown in feeds that mix several modes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unscoped_warnings: Option<Warnings>,
    /// Rows written by the loader; absent on dry runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded: Option<LoadSummary>,
}

impl ImportReport {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        run_id: Uuid,
        source_dir: &Path,
        dry_run: bool,
        started_at: DateTime<Utc>,
        catalog: &CatalogSet,
        diagnostics: &BTreeMap<Scope, Diagnostics>,
        unscoped: &Diagnostics,
        datasets: Vec<DatasetSummary>,
    ) -> Self {
        let counts = catalog
            .scopes
            .iter()
            .map(|(scope, rows)| {
                (
                    scope.label(),
                    ScopeCounts {
                        stations: rows.stations.len(),
                        routes: rows.routes.len(),
                        route_stops: rows.route_stops.len(),
                    },
                )
            })
            .collect();

        let mut warnings: BTreeMap<String, Warnings> = catalog
            .scopes
            .keys()
            .map(|scope| (scope.label(), Warnings::default()))
            .collect();
        for (scope, found) in diagnostics {
            warnings.insert(scope.label(), found.warnings());
        }

        let mut dataset_counts = BTreeMap::new();
        for dataset in &datasets {
            *dataset_counts.entry(dataset.unit.clone()).or_insert(0) += 1;
        }

        Self {
            run_id,
            agency: catalog.agency,
            source_dir: source_dir.display().to_string(),
            dry_run,
            started_at,
            finished_at: started_at,
            datasets,
            dataset_counts,
            counts,
            warnings,
            unscoped_warnings: (!unscoped.is_clean()).then(|| unscoped.warnings()),
            loaded: None,
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn has_warnings(&self) -> bool {
        self.unscoped_warnings.is_some()
            || self.warnings.values().any(|found| {
                found.missing_trip_refs > 0
                    || found.missing_stop_refs > 0
                    || found.route_mode_conflicts > 0
            })
    }
}
