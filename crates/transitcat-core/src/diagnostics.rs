use serde::Serialize;

/// Offending ids kept per category, regardless of input size.
pub const SAMPLE_LIMIT: usize = 50;

/// Occurrence counter plus the first few distinct offending ids, in the order
/// they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampledCounter {
    count: u64,
    sample: Vec<String>,
}

impl SampledCounter {
    pub fn record(&mut self, id: &str) {
        self.count += 1;
        if self.sample.len() < SAMPLE_LIMIT && !self.sample.iter().any(|seen| seen == id) {
            self.sample.push(id.to_string());
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sample(&self) -> &[String] {
        &self.sample
    }

    pub fn merge(&mut self, other: &SampledCounter) {
        self.count += other.count;
        for id in &other.sample {
            if self.sample.len() >= SAMPLE_LIMIT {
                break;
            }
            if !self.sample.contains(id) {
                self.sample.push(id.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    missing_trip_refs: SampledCounter,
    missing_stop_refs: SampledCounter,
    route_mode_conflicts: SampledCounter,
}

impl Diagnostics {
    pub fn missing_trip(&mut self, trip_id: &str) {
        self.missing_trip_refs.record(trip_id);
    }

    pub fn missing_stop(&mut self, raw_stop_id: &str) {
        self.missing_stop_refs.record(raw_stop_id);
    }

    pub fn route_mode_conflict(&mut self, route_id: &str) {
        self.route_mode_conflicts.record(route_id);
    }

    pub fn merge(&mut self, other: &Diagnostics) {
        self.missing_trip_refs.merge(&other.missing_trip_refs);
        self.missing_stop_refs.merge(&other.missing_stop_refs);
        self.route_mode_conflicts.merge(&other.route_mode_conflicts);
    }

    pub fn is_clean(&self) -> bool {
        self.missing_trip_refs.count() == 0
            && self.missing_stop_refs.count() == 0
            && self.route_mode_conflicts.count() == 0
    }

    pub fn warnings(&self) -> Warnings {
        Warnings {
            missing_trip_refs: self.missing_trip_refs.count(),
            missing_stop_refs: self.missing_stop_refs.count(),
            route_mode_conflicts: self.route_mode_conflicts.count(),
            sample_missing_trip_ids: self.missing_trip_refs.sample().to_vec(),
            sample_missing_stop_ids: self.missing_stop_refs.sample().to_vec(),
            sample_conflicting_route_ids: self.route_mode_conflicts.sample().to_vec(),
        }
    }
}

/// Read-only view of [`Diagnostics`] for the import report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warnings {
    pub missing_trip_refs: u64,
    pub missing_stop_refs: u64,
    pub route_mode_conflicts: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_missing_trip_ids: Vec<String>,
    pub sample_missing_stop_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_conflicting_route_ids: Vec<String>,
}
