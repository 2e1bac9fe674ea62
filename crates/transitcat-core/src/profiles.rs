//! Compiled-in agency profiles.
//!
//! Every agency runs the same pipeline; a profile only says where its feeds
//! live on disk and how its raw ids, directions, and route types are read.

use once_cell::sync::Lazy;
use transitcat_feed::{values::parse_optional_i64, REQUIRED_FEED_FILES};

use crate::error::{ImportError, Result};
use crate::model::TransportMode;

/// How raw stop rows collapse into canonical stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyRule {
    /// Every stop is its own station.
    Flat,
    /// Nearest ancestor shaped like a station, else the stop itself.
    NearestStation,
    /// The declared `parent_station`, trusted even when it has no row.
    DeclaredParent,
}

impl HierarchyRule {
    pub fn is_hierarchical(&self) -> bool {
        !matches!(self, HierarchyRule::Flat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionRule {
    /// `N`/`0` and `S`/`1`; subway feeds that publish compass letters.
    Compass,
    /// Plain `0`/`1`.
    Numeric,
}

impl DirectionRule {
    /// Anything unrecognised reads as direction 0.
    pub fn normalize(&self, raw: &str) -> i16 {
        let raw = raw.trim();
        if let DirectionRule::Compass = self {
            if raw.eq_ignore_ascii_case("n") {
                return 0;
            }
            if raw.eq_ignore_ascii_case("s") {
                return 1;
            }
        }
        match parse_optional_i64(raw) {
            Some(1) => 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModeSpec {
    /// Catalog mode key, also the value of the `mode` column.
    pub key: &'static str,
    /// Canonical modes this catalog mode claims in merged feeds.
    pub accepts: &'static [TransportMode],
    pub default_route_type: i32,
    pub hierarchy: HierarchyRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetCount {
    Single,
    Many,
}

/// A mode subdirectory in a per-mode or per-operator layout.
#[derive(Debug, Clone, Copy)]
pub struct ModeDir {
    pub dir: &'static str,
    pub mode: &'static str,
    pub datasets: DatasetCount,
}

#[derive(Debug, Clone, Copy)]
pub enum Layout {
    /// `<root>/<mode dir>/...`, one mode per directory.
    PerMode(&'static [ModeDir]),
    /// One feed holding every mode; routes are classified row by row.
    Merged,
    /// `<root>/<operator>/<mode dir>/...`; every operator is its own scope.
    PerOperator(&'static [ModeDir]),
}

#[derive(Debug, Clone, Copy)]
pub enum HintMatch {
    RouteIdPrefix(&'static str),
    DescriptionContains(&'static str),
}

/// Fallback signal for routes whose type code does not classify.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierHint {
    pub matcher: HintMatch,
    pub mode: &'static str,
}

impl ClassifierHint {
    pub fn matches(&self, route_id: &str, description: &str) -> bool {
        match self.matcher {
            HintMatch::RouteIdPrefix(prefix) => route_id.starts_with(prefix),
            HintMatch::DescriptionContains(needle) => description
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgencyProfile {
    pub slug: &'static str,
    pub name: &'static str,
    pub required_files: &'static [&'static str],
    pub layout: Layout,
    pub modes: &'static [ModeSpec],
    pub direction: DirectionRule,
    pub hints: &'static [ClassifierHint],
    /// Mode keys, strongest first, for routes claimed by more than one mode.
    pub priority: &'static [&'static str],
}

impl AgencyProfile {
    pub fn mode(&self, key: &str) -> Option<&'static ModeSpec> {
        let modes: &'static [ModeSpec] = self.modes;
        modes.iter().find(|spec| spec.key == key)
    }

    pub fn mode_keys(&self) -> Vec<&'static str> {
        self.modes.iter().map(|spec| spec.key).collect()
    }

    /// Lower ranks win; modes missing from the priority list rank last.
    pub fn priority_rank(&self, key: &str) -> usize {
        self.priority
            .iter()
            .position(|candidate| *candidate == key)
            .unwrap_or(self.priority.len())
    }

    /// Catalog mode claiming a canonical mode in merged feeds.
    pub fn mode_for(&self, mode: TransportMode) -> Option<&'static ModeSpec> {
        let modes: &'static [ModeSpec] = self.modes;
        let mut candidates: Vec<&'static ModeSpec> = modes
            .iter()
            .filter(|spec| spec.accepts.contains(&mode))
            .collect();
        candidates.sort_by_key(|spec| self.priority_rank(spec.key));
        candidates.into_iter().next()
    }

    pub fn hinted_mode(&self, route_id: &str, description: &str) -> Option<&'static ModeSpec> {
        self.hints
            .iter()
            .find(|hint| hint.matches(route_id, description))
            .and_then(|hint| self.mode(hint.mode))
    }

    pub fn default_source_dir(&self) -> &'static str {
        self.slug
    }
}

const MTA_MODES: &[ModeSpec] = &[
    ModeSpec {
        key: "subway",
        accepts: &[TransportMode::Subway],
        default_route_type: 1,
        hierarchy: HierarchyRule::DeclaredParent,
    },
    ModeSpec {
        key: "bus",
        accepts: &[TransportMode::Bus],
        default_route_type: 3,
        hierarchy: HierarchyRule::Flat,
    },
    ModeSpec {
        key: "lirr",
        accepts: &[TransportMode::Rail],
        default_route_type: 2,
        hierarchy: HierarchyRule::DeclaredParent,
    },
    ModeSpec {
        key: "mnr",
        accepts: &[TransportMode::Rail],
        default_route_type: 2,
        hierarchy: HierarchyRule::DeclaredParent,
    },
];

const MTA_DIRS: &[ModeDir] = &[
    ModeDir {
        dir: "subway",
        mode: "subway",
        datasets: DatasetCount::Single,
    },
    ModeDir {
        dir: "lirr",
        mode: "lirr",
        datasets: DatasetCount::Single,
    },
    ModeDir {
        dir: "mnr",
        mode: "mnr",
        datasets: DatasetCount::Single,
    },
    // One feed per bus division, merged before the load.
    ModeDir {
        dir: "bus",
        mode: "bus",
        datasets: DatasetCount::Many,
    },
];

const CTA_MODES: &[ModeSpec] = &[
    ModeSpec {
        key: "subway",
        accepts: &[TransportMode::Subway],
        default_route_type: 1,
        hierarchy: HierarchyRule::NearestStation,
    },
    ModeSpec {
        key: "bus",
        accepts: &[TransportMode::Bus],
        default_route_type: 3,
        hierarchy: HierarchyRule::Flat,
    },
];

const MBTA_MODES: &[ModeSpec] = &[
    ModeSpec {
        key: "subway",
        accepts: &[TransportMode::Subway, TransportMode::Tram],
        default_route_type: 1,
        hierarchy: HierarchyRule::NearestStation,
    },
    ModeSpec {
        key: "rail",
        accepts: &[TransportMode::Rail],
        default_route_type: 2,
        hierarchy: HierarchyRule::NearestStation,
    },
    ModeSpec {
        key: "ferry",
        accepts: &[TransportMode::Ferry],
        default_route_type: 4,
        hierarchy: HierarchyRule::Flat,
    },
    ModeSpec {
        key: "bus",
        accepts: &[TransportMode::Bus],
        default_route_type: 3,
        hierarchy: HierarchyRule::Flat,
    },
];

const MBTA_HINTS: &[ClassifierHint] = &[
    ClassifierHint {
        matcher: HintMatch::RouteIdPrefix("CR-"),
        mode: "rail",
    },
    ClassifierHint {
        matcher: HintMatch::RouteIdPrefix("BOAT-"),
        mode: "ferry",
    },
    ClassifierHint {
        matcher: HintMatch::DescriptionContains("rapid transit"),
        mode: "subway",
    },
    ClassifierHint {
        matcher: HintMatch::DescriptionContains("commuter rail"),
        mode: "rail",
    },
    ClassifierHint {
        matcher: HintMatch::DescriptionContains("bus"),
        mode: "bus",
    },
];

const NJT_MODES: &[ModeSpec] = &[
    ModeSpec {
        key: "rail",
        accepts: &[TransportMode::Rail],
        default_route_type: 2,
        hierarchy: HierarchyRule::NearestStation,
    },
    ModeSpec {
        key: "bus",
        accepts: &[TransportMode::Bus],
        default_route_type: 3,
        hierarchy: HierarchyRule::Flat,
    },
];

const NJT_DIRS: &[ModeDir] = &[
    ModeDir {
        dir: "rail",
        mode: "rail",
        datasets: DatasetCount::Single,
    },
    ModeDir {
        dir: "bus",
        mode: "bus",
        datasets: DatasetCount::Single,
    },
];

const BAY511_MODES: &[ModeSpec] = &[
    ModeSpec {
        key: "rail",
        accepts: &[TransportMode::Rail, TransportMode::Subway, TransportMode::Tram],
        default_route_type: 2,
        hierarchy: HierarchyRule::NearestStation,
    },
    ModeSpec {
        key: "ferry",
        accepts: &[TransportMode::Ferry],
        default_route_type: 4,
        hierarchy: HierarchyRule::Flat,
    },
    ModeSpec {
        key: "bus",
        accepts: &[TransportMode::Bus],
        default_route_type: 3,
        hierarchy: HierarchyRule::Flat,
    },
];

const BAY511_DIRS: &[ModeDir] = &[
    ModeDir {
        dir: "rail",
        mode: "rail",
        datasets: DatasetCount::Single,
    },
    ModeDir {
        dir: "ferry",
        mode: "ferry",
        datasets: DatasetCount::Single,
    },
    ModeDir {
        dir: "bus",
        mode: "bus",
        datasets: DatasetCount::Many,
    },
];

static PROFILES: Lazy<Vec<AgencyProfile>> = Lazy::new(|| {
    vec![
        AgencyProfile {
            slug: "mta",
            name: "MTA New York",
            required_files: &REQUIRED_FEED_FILES,
            layout: Layout::PerMode(MTA_DIRS),
            modes: MTA_MODES,
            direction: DirectionRule::Compass,
            hints: &[],
            priority: &["subway", "lirr", "mnr", "bus"],
        },
        AgencyProfile {
            slug: "cta",
            name: "Chicago Transit Authority",
            required_files: &REQUIRED_FEED_FILES,
            layout: Layout::Merged,
            modes: CTA_MODES,
            direction: DirectionRule::Numeric,
            hints: &[],
            priority: &["subway", "bus"],
        },
        AgencyProfile {
            slug: "mbta",
            name: "Massachusetts Bay Transportation Authority",
            required_files: &REQUIRED_FEED_FILES,
            layout: Layout::Merged,
            modes: MBTA_MODES,
            direction: DirectionRule::Numeric,
            hints: MBTA_HINTS,
            priority: &["subway", "rail", "ferry", "bus"],
        },
        AgencyProfile {
            slug: "njt",
            name: "NJ Transit",
            required_files: &REQUIRED_FEED_FILES,
            layout: Layout::PerMode(NJT_DIRS),
            modes: NJT_MODES,
            direction: DirectionRule::Numeric,
            hints: &[],
            priority: &["rail", "bus"],
        },
        AgencyProfile {
            slug: "bay511",
            name: "511 SF Bay regional feed",
            required_files: &REQUIRED_FEED_FILES,
            layout: Layout::PerOperator(BAY511_DIRS),
            modes: BAY511_MODES,
            direction: DirectionRule::Numeric,
            hints: &[],
            priority: &["rail", "ferry", "bus"],
        },
    ]
});

pub fn all_profiles() -> &'static [AgencyProfile] {
    PROFILES.as_slice()
}

pub fn profile(slug: &str) -> Result<&'static AgencyProfile> {
    all_profiles()
        .iter()
        .find(|profile| profile.slug.eq_ignore_ascii_case(slug.trim()))
        .ok_or_else(|| ImportError::UnknownAgency(slug.to_string()))
}
