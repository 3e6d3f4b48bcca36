//! Defect tracker lookups deciding which deviations are active

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::TrackerConfig;
use crate::error::{E2eError, E2eResult};

/// Answers whether a tracked defect is still open
#[async_trait]
pub trait DefectTracker: Send + Sync {
    async fn is_open(&self, defect: &str) -> E2eResult<bool>;
}

/// Build the tracker described by the configuration
pub fn from_config(config: &TrackerConfig) -> E2eResult<Box<dyn DefectTracker>> {
    match config {
        TrackerConfig::Static { open } => Ok(Box::new(StaticTracker::new(open.clone()))),
        TrackerConfig::Bugzilla { url } => Ok(Box::new(BugzillaTracker::new(url)?)),
    }
}

/// Resolve which of `defects` are open, querying each id once
pub async fn open_defects(
    tracker: &dyn DefectTracker,
    defects: &BTreeSet<String>,
) -> E2eResult<BTreeSet<String>> {
    let mut open = BTreeSet::new();
    for defect in defects {
        if tracker.is_open(defect).await? {
            debug!("Defect {} is open", defect);
            open.insert(defect.clone());
        }
    }
    info!("{} of {} tracked defect(s) open", open.len(), defects.len());
    Ok(open)
}

/// Fixed set of open defects, typically from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticTracker {
    open: BTreeSet<String>,
}

impl StaticTracker {
    pub fn new(open: BTreeSet<String>) -> Self {
        Self { open }
    }
}

#[async_trait]
impl DefectTracker for StaticTracker {
    async fn is_open(&self, defect: &str) -> E2eResult<bool> {
        Ok(self.open.contains(defect))
    }
}

/// Bug states that mean the fix has landed
const CLOSED_STATES: &[&str] = &["VERIFIED", "RELEASE_PENDING", "CLOSED"];

#[derive(Debug, Deserialize)]
struct BugList {
    bugs: Vec<Bug>,
}

#[derive(Debug, Deserialize)]
struct Bug {
    status: String,
}

/// Bugzilla REST lookup (`/rest/bug/{id}`)
pub struct BugzillaTracker {
    http: reqwest::Client,
    base_url: String,
}

impl BugzillaTracker {
    pub fn new(base_url: &str) -> E2eResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| E2eError::Tracker(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn bug_url(&self, defect: &str) -> String {
        format!(
            "{}/rest/bug/{}?include_fields=id,status",
            self.base_url, defect
        )
    }
}

/// Whether a Bugzilla status counts as open
pub fn status_is_open(status: &str) -> bool {
    !CLOSED_STATES
        .iter()
        .any(|closed| closed.eq_ignore_ascii_case(status))
}

#[async_trait]
impl DefectTracker for BugzillaTracker {
    async fn is_open(&self, defect: &str) -> E2eResult<bool> {
        let url = self.bug_url(defect);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| E2eError::Tracker(format!("bug {} lookup failed: {}", defect, e)))?;
        if !response.status().is_success() {
            return Err(E2eError::Tracker(format!(
                "bug {} lookup returned HTTP {}",
                defect,
                response.status().as_u16()
            )));
        }

        let list: BugList = response.json().await.map_err(|e| {
            E2eError::Tracker(format!("bug {} lookup returned an unreadable answer: {}", defect, e))
        })?;
        let bug = list
            .bugs
            .into_iter()
            .next()
            .ok_or_else(|| E2eError::Tracker(format!("bug {} not found", defect)))?;

        Ok(status_is_open(&bug.status))
    }
}
