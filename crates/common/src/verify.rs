//! Structural diff of a live catalog against the reference catalog

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{EndpointTemplate, LiveCatalog, ReferenceCatalog};
use crate::error::{Error, Result};

/// Outcome for one group present in both catalogs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVerdict {
    /// Paths the reference expects but the server does not report
    pub missing: Vec<EndpointTemplate>,

    /// Paths the server reports but the reference does not expect
    pub extra: Vec<EndpointTemplate>,
}

impl GroupVerdict {
    pub fn passed(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Full result of one verification, aggregated across every group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractReport {
    /// Groups the server reports that the reference does not know
    pub extra_groups: BTreeSet<String>,

    /// Groups in the reference that the server no longer reports
    pub missing_groups: BTreeSet<String>,

    /// Per-group verdicts for groups present on both sides
    pub groups: BTreeMap<String, GroupVerdict>,
}

impl ContractReport {
    pub fn group_sets_match(&self) -> bool {
        self.extra_groups.is_empty() && self.missing_groups.is_empty()
    }

    pub fn passed(&self) -> bool {
        self.group_sets_match() && self.groups.values().all(GroupVerdict::passed)
    }

    /// Groups whose path multisets differ
    pub fn failed_groups(&self) -> impl Iterator<Item = (&str, &GroupVerdict)> {
        self.groups
            .iter()
            .filter(|(_, verdict)| !verdict.passed())
            .map(|(name, verdict)| (name.as_str(), verdict))
    }

    /// Turn a failing report into [`Error::ContractViolation`]
    pub fn into_result(self) -> Result<Self> {
        if self.passed() {
            Ok(self)
        } else {
            Err(Error::ContractViolation(Box::new(self)))
        }
    }
}

impl fmt::Display for ContractReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "PASS ({} groups)", self.groups.len());
        }

        if !self.extra_groups.is_empty() {
            writeln!(f, "extra groups: {:?}", self.extra_groups)?;
        }
        if !self.missing_groups.is_empty() {
            writeln!(f, "missing groups: {:?}", self.missing_groups)?;
        }
        for (name, verdict) in self.failed_groups() {
            write!(f, "{}:", name)?;
            if !verdict.missing.is_empty() {
                write!(f, " missing {:?}", as_strs(&verdict.missing))?;
            }
            if !verdict.extra.is_empty() {
                write!(f, " extra {:?}", as_strs(&verdict.extra))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn as_strs(paths: &[EndpointTemplate]) -> Vec<&str> {
    paths.iter().map(EndpointTemplate::as_str).collect()
}

/// Compare a live catalog with the reference.
///
/// Group names must match exactly. Within each shared group the paths are
/// compared as multisets: order is ignored, repeat counts are not. Every
/// group is checked so the report carries the complete delta.
pub fn verify(reference: &ReferenceCatalog, live: &LiveCatalog) -> ContractReport {
    let reference_names: BTreeSet<&str> = reference.group_names().collect();
    let live_names: BTreeSet<&str> = live.group_names().collect();

    let extra_groups = live_names
        .difference(&reference_names)
        .map(|s| s.to_string())
        .collect();
    let missing_groups = reference_names
        .difference(&live_names)
        .map(|s| s.to_string())
        .collect();

    let groups = reference_names
        .intersection(&live_names)
        .map(|name| {
            let expected = reference.group(name).unwrap_or_default();
            let actual = live.group(name).unwrap_or_default();
            (name.to_string(), diff_multiset(expected, actual))
        })
        .collect();

    ContractReport {
        extra_groups,
        missing_groups,
        groups,
    }
}

fn diff_multiset(expected: &[EndpointTemplate], actual: &[EndpointTemplate]) -> GroupVerdict {
    let mut balance: BTreeMap<&EndpointTemplate, i64> = BTreeMap::new();
    for path in expected {
        *balance.entry(path).or_default() += 1;
    }
    for path in actual {
        *balance.entry(path).or_default() -= 1;
    }

    let mut verdict = GroupVerdict::default();
    for (path, count) in balance {
        let bucket = if count > 0 {
            &mut verdict.missing
        } else {
            &mut verdict.extra
        };
        bucket.extend(std::iter::repeat(path.clone()).take(count.unsigned_abs() as usize));
    }
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{normalize, Catalog};
    use serde_json::json;
    use test_case::test_case;

    fn domains_reference() -> Catalog {
        Catalog::new().with_group("domains", ["/api/domains", "/api/domains/:id"])
    }

    fn live_from(payload: serde_json::Value) -> Catalog {
        normalize(payload.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_reordered_payload_passes() {
        let live = live_from(json!({
            "domains": {"List": "/api/domains/:id", "Show": "/api/domains"}
        }));
        let report = verify(&domains_reference(), &live);

        assert!(report.passed());
        assert_eq!(report.groups.len(), 1);
    }

    #[test]
    fn test_missing_path_is_named() {
        let live = live_from(json!({"domains": {"List": "/api/domains"}}));
        let report = verify(&domains_reference(), &live);

        assert!(!report.passed());
        assert!(report.group_sets_match());
        let verdict = &report.groups["domains"];
        assert_eq!(verdict.missing, vec![EndpointTemplate::from("/api/domains/:id")]);
        assert!(verdict.extra.is_empty());
        assert!(report
            .to_string()
            .contains(r#"domains: missing ["/api/domains/:id"]"#));
    }

    #[test]
    fn test_group_symmetric_difference() {
        let reference = Catalog::new()
            .with_group("a", Vec::<&str>::new())
            .with_group("b", Vec::<&str>::new());
        let live = Catalog::new()
            .with_group("a", Vec::<&str>::new())
            .with_group("c", Vec::<&str>::new());

        let report = verify(&reference, &live);

        assert!(!report.passed());
        assert_eq!(report.extra_groups, BTreeSet::from(["c".to_string()]));
        assert_eq!(report.missing_groups, BTreeSet::from(["b".to_string()]));
        assert!(report.groups["a"].passed());
        assert!(!report.groups.contains_key("b"));
    }

    #[test]
    fn test_unexpected_group_reported_as_extra() {
        let reference = domains_reference();
        let live = reference
            .clone()
            .with_group("extra_widgets", ["/api/extra_widgets"]);

        let report = verify(&reference, &live);

        assert!(!report.passed());
        assert!(report.extra_groups.contains("extra_widgets"));
        assert!(report.missing_groups.is_empty());
    }

    #[test_case(&["/a", "/a"], &["/a"], &["/a"], &[] ; "duplicate dropped")]
    #[test_case(&["/a"], &["/a", "/a"], &[], &["/a"] ; "duplicate added")]
    #[test_case(&["/a", "/b"], &["/b", "/a"], &[], &[] ; "reordered")]
    #[test_case(&["/a/:id"], &["/a/:uuid"], &["/a/:id"], &["/a/:uuid"] ; "placeholder names significant")]
    fn test_group_multiset(expected: &[&str], actual: &[&str], missing: &[&str], extra: &[&str]) {
        let reference = Catalog::new().with_group("g", expected.iter().copied());
        let live = Catalog::new().with_group("g", actual.iter().copied());

        let verdict = &verify(&reference, &live).groups["g"];

        assert_eq!(as_strs(&verdict.missing), missing);
        assert_eq!(as_strs(&verdict.extra), extra);
    }

    #[test]
    fn test_mismatches_aggregated_across_groups() {
        let reference = Catalog::new()
            .with_group("hosts", ["/api/hosts", "/api/hosts/:id"])
            .with_group("domains", ["/api/domains"])
            .with_group("audits", ["/api/audits"]);
        let live = Catalog::new()
            .with_group("hosts", ["/api/hosts"])
            .with_group("domains", ["/api/domains", "/api/domains/:id"])
            .with_group("audits", ["/api/audits"]);

        let report = verify(&reference, &live);
        let failed: Vec<&str> = report.failed_groups().map(|(name, _)| name).collect();

        assert_eq!(failed, vec!["domains", "hosts"]);
    }

    #[test]
    fn test_into_result() {
        let reference = domains_reference();
        assert!(verify(&reference, &reference).into_result().is_ok());

        let err = verify(&reference, &Catalog::new()).into_result().unwrap_err();
        assert!(matches!(err, Error::ContractViolation(_)));
        assert!(err.to_string().contains("missing groups"));
    }
}
