// crates/transitcat-core/src/orchestrator.rs

use std::path::Path;

use chrono::Utc;
use futures::future::join_all;
use tokio::task;
use tracing::info;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{ImportError, Result};
use crate::loader::replace_catalog;
use crate::pipeline::{import_unit, plan_units, ComputedImport};
use crate::profiles::AgencyProfile;
use crate::report::ImportReport;

/// Reads every feed unit on the blocking pool. Units share nothing while
/// they run and are merged in plan order afterwards.
pub async fn compute_parallel(profile: &'static AgencyProfile, root: &Path) -> Result<ComputedImport> {
    let units = plan_units(profile, root)?;
    info!(
        agency = profile.slug,
        units = units.len(),
        datasets = units.iter().map(|unit| unit.datasets.len()).sum::<usize>(),
        "Feed units planned"
    );

    let handles = units.into_iter().map(|unit| {
        let label = unit.label.clone();
        (label, task::spawn_blocking(move || import_unit(profile, &unit)))
    });
    let (labels, handles): (Vec<_>, Vec<_>) = handles.unzip();
    let results = join_all(handles).await;

    let mut computed = ComputedImport::new(profile);
    for (label, joined) in labels.into_iter().zip(results) {
        let output = joined.map_err(|err| ImportError::Worker {
            unit: label,
            message: err.to_string(),
        })??;
        computed.absorb(output)?;
    }
    Ok(computed)
}

/// Computes the full catalog for `profile` from `source_dir` and, unless
/// `pool` is `None`, replaces the stored catalog with it.
pub async fn run_import(
    pool: Option<&DbPool>,
    profile: &'static AgencyProfile,
    source_dir: &Path,
) -> Result<ImportReport> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(%run_id, agency = profile.slug, source = %source_dir.display(), "Import started");

    let computed = compute_parallel(profile, source_dir).await?;

    let mut report = ImportReport::build(
        run_id,
        source_dir,
        pool.is_none(),
        started_at,
        &computed.catalog,
        &computed.diagnostics,
        &computed.unscoped,
        computed.datasets.clone(),
    );

    if let Some(pool) = pool {
        report.loaded = Some(replace_catalog(pool, &computed.catalog).await?);
    } else {
        info!(%run_id, "Dry run; catalog left untouched");
    }

    let report = report.finish();
    info!(
        %run_id,
        warnings = report.has_warnings(),
        elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
        "Import finished"
    );
    Ok(report)
}
