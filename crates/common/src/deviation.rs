//! Known deviations: defect-tracked rewrites applied before comparison
//!
//! A deviation is a temporary patch for a server bug. It only applies while
//! its defect is open; once the defect closes the live catalog is compared
//! unmodified, so a stale entry shows up as a warning rather than a failure.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{EndpointTemplate, LiveCatalog};

/// Rewrite of one group in the live catalog while `defect` is open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownDeviation {
    /// Defect tracker identifier, e.g. a Bugzilla bug number
    pub defect: String,

    /// Resource group the rewrite applies to
    pub group: String,

    /// Path the fixed server would report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<EndpointTemplate>,

    /// Path the buggy server reports instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<EndpointTemplate>,
}

impl KnownDeviation {
    pub fn new(defect: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            defect: defect.into(),
            group: group.into(),
            add: None,
            remove: None,
        }
    }

    pub fn adding(mut self, path: impl Into<EndpointTemplate>) -> Self {
        self.add = Some(path.into());
        self
    }

    pub fn removing(mut self, path: impl Into<EndpointTemplate>) -> Self {
        self.remove = Some(path.into());
        self
    }
}

/// Exclude a service from the health check while `defect` is open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceWaiver {
    pub defect: String,
    pub service: String,
}

/// Versioned table of deviations, maintained alongside the reference catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviationTable {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub paths: Vec<KnownDeviation>,

    #[serde(default)]
    pub services: Vec<ServiceWaiver>,
}

fn default_version() -> u32 {
    1
}

impl DeviationTable {
    /// Every distinct defect id referenced by the table
    pub fn defect_ids(&self) -> BTreeSet<String> {
        self.paths
            .iter()
            .map(|d| d.defect.clone())
            .chain(self.services.iter().map(|w| w.defect.clone()))
            .collect()
    }

    /// Services to skip given the currently open defects
    pub fn waived_services(&self, open_defects: &BTreeSet<String>) -> BTreeSet<String> {
        self.services
            .iter()
            .filter(|w| open_defects.contains(&w.defect))
            .map(|w| w.service.clone())
            .collect()
    }
}

/// What [`apply_deviations`] did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    /// Deviations whose defect was open and whose group existed
    pub applied: usize,

    /// Deviations skipped because their defect is closed
    pub inactive: usize,

    /// Deviations skipped because the live catalog lacks the group
    pub missing_groups: Vec<String>,

    /// `(group, path)` removals that found nothing to remove
    pub absent_removals: Vec<(String, EndpointTemplate)>,
}

/// Rewrite `live` according to the deviations whose defect is open.
///
/// For each active deviation the `add` path is appended and one occurrence
/// of the `remove` path is dropped. A missing `remove` path is a warning,
/// since a fixed server has usually already changed its answer. Groups are
/// never created here; a deviation naming an unknown group is skipped.
pub fn apply_deviations(
    live: &mut LiveCatalog,
    deviations: &[KnownDeviation],
    open_defects: &BTreeSet<String>,
) -> ApplySummary {
    let mut summary = ApplySummary::default();

    for deviation in deviations {
        if !open_defects.contains(&deviation.defect) {
            debug!(
                "Defect {} is closed, not applying deviation to '{}'",
                deviation.defect, deviation.group
            );
            summary.inactive += 1;
            continue;
        }

        let Some(paths) = live.group_mut(&deviation.group) else {
            warn!(
                "Deviation for defect {} names group '{}', which the server does not report",
                deviation.defect, deviation.group
            );
            summary.missing_groups.push(deviation.group.clone());
            continue;
        };

        if let Some(add) = &deviation.add {
            paths.push(add.clone());
        }

        if let Some(remove) = &deviation.remove {
            match paths.iter().position(|p| p == remove) {
                Some(index) => {
                    paths.remove(index);
                }
                None => {
                    warn!(
                        "Deviation for defect {}: '{}' not found in group '{}'; the defect may already be fixed",
                        deviation.defect, remove, deviation.group
                    );
                    summary
                        .absent_removals
                        .push((deviation.group.clone(), remove.clone()));
                }
            }
        }

        summary.applied += 1;
    }

    summary
}
