use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::debug;
use transitcat_feed::values::{normalize_route_id, parse_optional_i32};
use transitcat_feed::{Row, RoutesTable, TableError, TableReader, TableSummary};

use crate::diagnostics::Diagnostics;
use crate::model::{Route, TransportMode};
use crate::profiles::{AgencyProfile, ModeSpec};

/// Collapses a basic or extended route type code into a canonical mode.
/// Air, taxi, self-drive and miscellaneous groups have no catalog mode.
pub fn classify_route_type(code: i32) -> Option<TransportMode> {
    match code {
        0 => Some(TransportMode::Tram),
        1 => Some(TransportMode::Subway),
        2 | 12 => Some(TransportMode::Rail),
        3 | 11 => Some(TransportMode::Bus),
        4 => Some(TransportMode::Ferry),
        5..=7 => Some(TransportMode::Cable),
        100..=199 | 300..=399 => Some(TransportMode::Rail),
        200..=299 | 700..=899 => Some(TransportMode::Bus),
        400..=699 => Some(TransportMode::Subway),
        900..=999 => Some(TransportMode::Tram),
        1000..=1099 | 1200..=1299 => Some(TransportMode::Ferry),
        1300..=1499 => Some(TransportMode::Cable),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Classified {
    pub mode: &'static ModeSpec,
    pub route_type: i32,
}

/// Decides which catalog mode a route row belongs to.
///
/// Units read from a mode directory have a fixed mode and only need the
/// default type code; merged feeds classify each row by its type code and
/// fall back to the agency's id/description hints.
#[derive(Debug, Clone, Copy)]
pub struct RouteClassifier<'p> {
    profile: &'p AgencyProfile,
    fixed: Option<&'static ModeSpec>,
}

impl<'p> RouteClassifier<'p> {
    pub fn new(profile: &'p AgencyProfile, fixed: Option<&'static ModeSpec>) -> Self {
        Self { profile, fixed }
    }

    pub fn classify(&self, route_id: &str, raw_type: &str, description: &str) -> Option<Classified> {
        let code = parse_optional_i32(raw_type);
        let canonical = code.and_then(classify_route_type);

        if let Some(spec) = self.fixed {
            let route_type = match (code, canonical) {
                (Some(code), Some(_)) => code,
                _ => spec.default_route_type,
            };
            return Some(Classified {
                mode: spec,
                route_type,
            });
        }

        match (code, canonical) {
            (Some(code), Some(mode)) => self.profile.mode_for(mode).map(|spec| Classified {
                mode: spec,
                route_type: code,
            }),
            _ => self
                .profile
                .hinted_mode(route_id, description)
                .map(|spec| Classified {
                    mode: spec,
                    route_type: spec.default_route_type,
                }),
        }
    }
}

fn route_from_row(cols: &RoutesTable, row: &Row<'_>, route_id: String, route_type: i32) -> Route {
    Route {
        route_id,
        agency_id: row.value(cols.agency_id).map(str::to_string),
        route_short_name: row.get(cols.route_short_name).to_string(),
        route_long_name: row.get(cols.route_long_name).to_string(),
        route_desc: row.value(cols.route_desc).map(str::to_string),
        route_type,
        route_url: row.value(cols.route_url).map(str::to_string),
        route_color: row.value(cols.route_color).map(str::to_string),
        route_text_color: row.value(cols.route_text_color).map(str::to_string),
        route_sort_order: parse_optional_i32(row.get(cols.route_sort_order)),
    }
}

fn fill_text(slot: &mut String, incoming: &str) {
    if slot.is_empty() && !incoming.is_empty() {
        *slot = incoming.to_string();
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, incoming: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(incoming);
    }
}

/// Fills every still-empty descriptive field of `route`; never touches the type.
fn backfill(route: &mut Route, incoming: &Route) {
    fill(&mut route.agency_id, &incoming.agency_id);
    fill_text(&mut route.route_short_name, &incoming.route_short_name);
    fill_text(&mut route.route_long_name, &incoming.route_long_name);
    fill(&mut route.route_desc, &incoming.route_desc);
    fill(&mut route.route_url, &incoming.route_url);
    fill(&mut route.route_color, &incoming.route_color);
    fill(&mut route.route_text_color, &incoming.route_text_color);
    fill(&mut route.route_sort_order, &incoming.route_sort_order);
}

/// Routes of one catalog mode keyed by normalized route id.
#[derive(Debug, Default)]
pub struct RouteAccumulator {
    routes: HashMap<String, Route>,
}

impl RouteAccumulator {
    /// First non-empty value wins. A type still at the mode default is
    /// replaced by a later explicit code.
    pub fn upsert(&mut self, incoming: Route, default_route_type: i32) {
        match self.routes.get_mut(&incoming.route_id) {
            None => {
                self.routes.insert(incoming.route_id.clone(), incoming);
            }
            Some(existing) => {
                backfill(existing, &incoming);
                if existing.route_type == default_route_type
                    && incoming.route_type != default_route_type
                {
                    existing.route_type = incoming.route_type;
                }
            }
        }
    }

    fn remove(&mut self, route_id: &str) -> Option<Route> {
        self.routes.remove(route_id)
    }

    pub fn get(&self, route_id: &str) -> Option<&Route> {
        self.routes.get(route_id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn into_routes(self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.routes.into_values().collect();
        routes.sort_by(|a, b| a.route_id.cmp(&b.route_id));
        routes
    }
}

/// Every classified route of a unit, read across all of its datasets before
/// any trip is resolved.
#[derive(Debug)]
pub struct RouteCatalog<'p> {
    classifier: RouteClassifier<'p>,
    profile: &'p AgencyProfile,
    by_mode: BTreeMap<&'static str, RouteAccumulator>,
    assignments: HashMap<String, &'static ModeSpec>,
    diagnostics: BTreeMap<&'static str, Diagnostics>,
}

impl<'p> RouteCatalog<'p> {
    pub fn new(profile: &'p AgencyProfile, fixed: Option<&'static ModeSpec>) -> Self {
        Self {
            classifier: RouteClassifier::new(profile, fixed),
            profile,
            by_mode: BTreeMap::new(),
            assignments: HashMap::new(),
            diagnostics: BTreeMap::new(),
        }
    }

    pub fn read(&mut self, path: &Path) -> Result<TableSummary, TableError> {
        TableReader::open(path)?.for_each_row(|cols: &RoutesTable, row| self.observe_row(cols, row))
    }

    fn observe_row(&mut self, cols: &RoutesTable, row: &Row<'_>) {
        let route_id = normalize_route_id(row.get(cols.route_id));
        if route_id.is_empty() {
            return;
        }
        let Some(classified) =
            self.classifier
                .classify(&route_id, row.get(cols.route_type), row.get(cols.route_desc))
        else {
            debug!(route_id = %route_id, route_type = row.get(cols.route_type), "unclassified route");
            return;
        };
        let route = route_from_row(cols, row, route_id, classified.route_type);
        self.insert(route, classified.mode);
    }

    /// Adds a classified route, settling mode collisions by agency priority.
    pub fn insert(&mut self, route: Route, mode: &'static ModeSpec) {
        let current = self.assignments.get(&route.route_id).copied();
        match current {
            Some(existing) if existing.key != mode.key => {
                let winner = if self.profile.priority_rank(mode.key)
                    < self.profile.priority_rank(existing.key)
                {
                    mode
                } else {
                    existing
                };
                self.diagnostics
                    .entry(winner.key)
                    .or_default()
                    .route_mode_conflict(&route.route_id);

                if winner.key == existing.key {
                    if let Some(kept) = self
                        .by_mode
                        .get_mut(existing.key)
                        .and_then(|routes| routes.routes.get_mut(&route.route_id))
                    {
                        backfill(kept, &route);
                    }
                    return;
                }

                let displaced = self
                    .by_mode
                    .get_mut(existing.key)
                    .and_then(|routes| routes.remove(&route.route_id));
                let mut promoted = route;
                if let Some(displaced) = displaced {
                    backfill(&mut promoted, &displaced);
                }
                self.assignments.insert(promoted.route_id.clone(), mode);
                self.by_mode
                    .entry(mode.key)
                    .or_default()
                    .upsert(promoted, mode.default_route_type);
            }
            _ => {
                self.assignments.insert(route.route_id.clone(), mode);
                self.by_mode
                    .entry(mode.key)
                    .or_default()
                    .upsert(route, mode.default_route_type);
            }
        }
    }

    /// Catalog mode for a trip's route; units with a fixed mode claim every route.
    pub fn mode_of(&self, route_id: &str) -> Option<&'static ModeSpec> {
        self.classifier
            .fixed
            .or_else(|| self.assignments.get(route_id).copied())
    }

    pub fn routes(&self, mode: &str) -> Option<&RouteAccumulator> {
        self.by_mode.get(mode)
    }

    pub fn into_parts(
        self,
    ) -> (
        BTreeMap<&'static str, RouteAccumulator>,
        BTreeMap<&'static str, Diagnostics>,
    ) {
        (self.by_mode, self.diagnostics)
    }
}
