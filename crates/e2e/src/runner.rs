//! Contract runner: fetch, normalize, apply deviations, verify, report

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use routewatch_common::{
    apply_deviations, normalize_document, verify, verify_services, ApplySummary, ContractReport,
    DeviationTable, HealthReport, PingDocument, ReferenceCatalog,
};

use crate::client::ApiClient;
use crate::config::RunnerConfig;
use crate::contract_file::{load_deviations, load_reference};
use crate::error::E2eResult;
use crate::tracker::{self, DefectTracker};

/// Name of the route table check in results
pub const LINKS_CHECK: &str = "links";

/// Name of the service health check in results
pub const SERVICES_CHECK: &str = "services";

/// Everything a run needs besides the server itself, built once per run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub reference: ReferenceCatalog,
    pub deviations: DeviationTable,
    pub open_defects: BTreeSet<String>,
}

/// Result of a single check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<ContractReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deviations: Option<ApplySummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthReport>,
    pub error: Option<String>,
}

/// Result of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub server: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub open_defects: BTreeSet<String>,
    pub checks: Vec<CheckResult>,
}

impl SuiteResult {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.success)
    }

    pub fn failed(&self) -> usize {
        self.checks.iter().filter(|c| !c.success).count()
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Normalize a discovery document, patch it for open defects and compare it
/// with the reference. Pure; no I/O.
pub fn evaluate_links(
    context: &RunContext,
    document: &Value,
) -> E2eResult<(ContractReport, ApplySummary)> {
    let mut live = normalize_document(document)?;
    let summary = apply_deviations(&mut live, &context.deviations.paths, &context.open_defects);
    Ok((verify(&context.reference, &live), summary))
}

/// Check a ping document, skipping services waived by open defects
pub fn evaluate_services(context: &RunContext, document: Value) -> E2eResult<HealthReport> {
    let ping = PingDocument::from_value(document)?;
    let waived = context.deviations.waived_services(&context.open_defects);
    Ok(verify_services(&ping, &waived))
}

/// Runs the endpoint contract checks against one server
pub struct ContractRunner {
    config: RunnerConfig,
    client: ApiClient,
    tracker: Box<dyn DefectTracker>,
}

impl ContractRunner {
    /// Create a runner using the configured defect tracker
    pub fn new(config: RunnerConfig) -> E2eResult<Self> {
        let tracker = tracker::from_config(&config.tracker)?;
        Self::with_tracker(config, tracker)
    }

    /// Create a runner with an explicit defect tracker
    pub fn with_tracker(config: RunnerConfig, tracker: Box<dyn DefectTracker>) -> E2eResult<Self> {
        config.validate()?;
        let client = ApiClient::new(&config.server)?;
        Ok(Self {
            config,
            client,
            tracker,
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Load contract files and resolve which tracked defects are open
    pub async fn prepare(&self) -> E2eResult<RunContext> {
        let reference = load_reference(&self.config.contract.reference)?;
        let deviations = match &self.config.contract.deviations {
            Some(path) => load_deviations(path)?,
            None => DeviationTable::default(),
        };
        let open_defects =
            tracker::open_defects(self.tracker.as_ref(), &deviations.defect_ids()).await?;

        info!(
            "Reference catalog: {} groups, {} endpoints",
            reference.len(),
            reference.endpoint_count()
        );

        Ok(RunContext {
            reference,
            deviations,
            open_defects,
        })
    }

    /// Fetch the live route table and verify it
    pub async fn check_links(&self, context: &RunContext) -> E2eResult<CheckResult> {
        let start = Instant::now();
        let document = self.client.fetch_discovery().await?;
        let (report, summary) = evaluate_links(context, &document)?;

        let success = report.passed();
        Ok(CheckResult {
            name: LINKS_CHECK.to_string(),
            success,
            duration_ms: start.elapsed().as_millis() as u64,
            error: (!success).then(|| report.to_string()),
            contract: Some(report),
            deviations: Some(summary),
            health: None,
        })
    }

    /// Fetch the ping document and verify every service is up
    pub async fn check_services(&self, context: &RunContext) -> E2eResult<CheckResult> {
        let start = Instant::now();
        let document = self.client.fetch_ping().await?;
        let report = evaluate_services(context, document)?;

        let success = report.passed();
        Ok(CheckResult {
            name: SERVICES_CHECK.to_string(),
            success,
            duration_ms: start.elapsed().as_millis() as u64,
            error: (!success).then(|| report.summary()),
            contract: None,
            deviations: None,
            health: Some(report),
        })
    }

    /// Run every configured check.
    ///
    /// A fetch failure aborts the run with an error; contract mismatches are
    /// recorded in the returned result.
    pub async fn run(&self) -> E2eResult<SuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        info!("Verifying endpoint contract of {}", self.client.base_url());

        let context = self.prepare().await?;

        let mut checks = vec![self.check_links(&context).await?];
        if self.config.contract.check_services {
            checks.push(self.check_services(&context).await?);
        }

        for check in &checks {
            if check.success {
                info!("✓ {} ({} ms)", check.name, check.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    check.name,
                    check.error.as_deref().unwrap_or("unknown error")
                );
            }
            if let Some(summary) = &check.deviations {
                if !summary.absent_removals.is_empty() || !summary.missing_groups.is_empty() {
                    warn!(
                        "{} deviation(s) no longer match the server; review the deviation table",
                        summary.absent_removals.len() + summary.missing_groups.len()
                    );
                }
            }
        }

        let result = SuiteResult {
            server: self.client.base_url().to_string(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            open_defects: context.open_defects,
            checks,
        };

        info!(
            "Contract results: {} passed, {} failed ({} ms)",
            result.checks.len() - result.failed(),
            result.failed(),
            result.duration_ms
        );

        Ok(result)
    }

    /// Write results to JSON file
    pub fn write_results(&self, result: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.results_path();
        let json = serde_json::to_string_pretty(result)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routewatch_common::{Catalog, KnownDeviation, ServiceWaiver};
    use serde_json::json;

    fn context(open: &[&str]) -> RunContext {
        RunContext {
            reference: Catalog::new()
                .with_group("errata", ["/katello/api/errata", "/katello/api/errata/:id"]),
            deviations: DeviationTable {
                version: 1,
                paths: vec![KnownDeviation::new("1166875", "errata")
                    .adding("/katello/api/errata")
                    .removing("/katello/api/compare")],
                services: vec![ServiceWaiver {
                    defect: "1325995".to_string(),
                    service: "foreman_auth".to_string(),
                }],
            },
            open_defects: open.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn buggy_document() -> Value {
        json!({"links": {"errata": {
            "Compare": "/katello/api/compare",
            "Show": "/katello/api/errata/:id"
        }}})
    }

    #[test]
    fn test_open_defect_patches_live_catalog() {
        let (report, summary) = evaluate_links(&context(&["1166875"]), &buggy_document()).unwrap();
        assert!(report.passed(), "{}", report);
        assert_eq!(summary.applied, 1);
    }

    #[test]
    fn test_closed_defect_exposes_server_bug() {
        let (report, summary) = evaluate_links(&context(&[]), &buggy_document()).unwrap();
        assert!(!report.passed());
        assert_eq!(summary.inactive, 1);

        let verdict = &report.groups["errata"];
        assert_eq!(verdict.missing[0].as_str(), "/katello/api/errata");
        assert_eq!(verdict.extra[0].as_str(), "/katello/api/compare");
    }

    #[test]
    fn test_evaluate_services_uses_waivers() {
        let ping = json!({"status": "ok", "services": {"foreman_auth": {"status": "FAIL"}}});

        assert!(evaluate_services(&context(&["1325995"]), ping.clone())
            .unwrap()
            .passed());
        assert!(!evaluate_services(&context(&[]), ping).unwrap().passed());
    }

    #[test]
    fn test_suite_result_counts() {
        let check = |name: &str, success| CheckResult {
            name: name.to_string(),
            success,
            duration_ms: 0,
            contract: None,
            deviations: None,
            health: None,
            error: None,
        };
        let result = SuiteResult {
            server: "http://127.0.0.1".to_string(),
            started_at: Utc::now(),
            duration_ms: 0,
            open_defects: BTreeSet::new(),
            checks: vec![check(LINKS_CHECK, true), check(SERVICES_CHECK, false)],
        };

        assert!(!result.passed());
        assert_eq!(result.failed(), 1);
        assert!(result.check(SERVICES_CHECK).is_some());
    }
}
