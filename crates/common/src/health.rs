//! Service health as reported by the server's ping endpoint

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};

const STATUS_OK: &str = "ok";

/// Status of a single backing service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: String,

    /// Reported as either a string or a number depending on server version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceStatus {
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Body of the ping endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingDocument {
    pub status: String,

    #[serde(default)]
    pub services: BTreeMap<String, ServiceStatus>,
}

impl PingDocument {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::MalformedPing(e.to_string()))
    }
}

/// Outcome of the service health check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall status string reported by the server
    pub overall: String,

    /// Services reporting `ok`
    pub healthy: BTreeSet<String>,

    /// Non-waived services not reporting `ok`, with their status
    pub unhealthy: BTreeMap<String, String>,

    /// Services excluded from the verdict by an open defect
    pub waived: BTreeSet<String>,
}

impl HealthReport {
    pub fn passed(&self) -> bool {
        self.overall == STATUS_OK && self.unhealthy.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.passed() {
            return format!("all {} services ok", self.healthy.len());
        }
        let mut parts = Vec::new();
        if self.overall != STATUS_OK {
            parts.push(format!("overall status is '{}'", self.overall));
        }
        for (name, status) in &self.unhealthy {
            parts.push(format!("{} is '{}'", name, status));
        }
        parts.join("; ")
    }
}

/// Check that the server and every non-waived service report `ok`
pub fn verify_services(ping: &PingDocument, waived: &BTreeSet<String>) -> HealthReport {
    let mut report = HealthReport {
        overall: ping.status.clone(),
        ..Default::default()
    };

    for (name, service) in &ping.services {
        if waived.contains(name) {
            if !service.is_ok() {
                warn!("Ignoring service '{}' with status '{}' (waived)", name, service.status);
            }
            report.waived.insert(name.clone());
        } else if service.is_ok() {
            report.healthy.insert(name.clone());
        } else {
            report.unhealthy.insert(name.clone(), service.status.clone());
        }
    }

    report
}
