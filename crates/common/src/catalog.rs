//! Route catalogs: resource groups mapped to endpoint templates

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A URL path pattern such as `/api/hosts/:id`.
///
/// Segments starting with `:` are named placeholders. Two templates are equal
/// only when their text is identical, placeholder names included.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointTemplate(String);

impl EndpointTemplate {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Names of the `:placeholder` segments, in path order
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.0
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
            .filter(|name| !name.is_empty())
    }
}

impl fmt::Display for EndpointTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndpointTemplate {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for EndpointTemplate {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// Mapping from resource group name to its endpoint templates.
///
/// Template order is kept as given but carries no meaning for comparison;
/// repeated templates do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    groups: BTreeMap<String, Vec<EndpointTemplate>>,
}

/// The hand-maintained catalog the server is expected to match
pub type ReferenceCatalog = Catalog;

/// The catalog as reported by the running server
pub type LiveCatalog = Catalog;

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group, replacing any previous group of the same name
    pub fn insert_group<I, T>(&mut self, name: impl Into<String>, paths: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<EndpointTemplate>,
    {
        self.groups
            .insert(name.into(), paths.into_iter().map(Into::into).collect());
    }

    /// Builder-style variant of [`Catalog::insert_group`]
    pub fn with_group<I, T>(mut self, name: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EndpointTemplate>,
    {
        self.insert_group(name, paths);
        self
    }

    pub fn group(&self, name: &str) -> Option<&[EndpointTemplate]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut Vec<EndpointTemplate>> {
        self.groups.get_mut(name)
    }

    pub fn contains_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &[EndpointTemplate])> {
        self.groups
            .iter()
            .map(|(name, paths)| (name.as_str(), paths.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of templates across every group
    pub fn endpoint_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Merge another catalog into this one. A group present in both is an error.
    pub fn merge(&mut self, other: Catalog) -> Result<()> {
        for (name, paths) in other.groups {
            if self.groups.contains_key(&name) {
                return Err(Error::InvalidCatalog(format!(
                    "group '{}' is defined more than once",
                    name
                )));
            }
            self.groups.insert(name, paths);
        }
        Ok(())
    }
}

/// Flatten a discovery `links` object into a live catalog.
///
/// Input shape is `{group: {label: path, ...}, ...}`. Labels are prose
/// descriptions and are dropped; paths keep their document order.
pub fn normalize(links: &Map<String, Value>) -> Result<LiveCatalog> {
    let mut catalog = Catalog::new();

    for (group, entries) in links {
        let paths = match entries {
            Value::Object(pairs) => pairs
                .iter()
                .map(|(label, path)| match path {
                    Value::String(path) => Ok(EndpointTemplate::new(path.as_str())),
                    other => Err(Error::MalformedPayload(format!(
                        "link '{}' in group '{}' is {}, expected a string path",
                        label,
                        group,
                        json_kind(other)
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            Value::Null => Vec::new(),
            other => {
                return Err(Error::MalformedPayload(format!(
                    "group '{}' is {}, expected an object of links",
                    group,
                    json_kind(other)
                )))
            }
        };
        catalog.groups.insert(group.clone(), paths);
    }

    Ok(catalog)
}

/// Extract and normalize the `links` member of a discovery document
pub fn normalize_document(document: &Value) -> Result<LiveCatalog> {
    match document.get("links") {
        Some(Value::Object(links)) => normalize(links),
        Some(other) => Err(Error::MalformedPayload(format!(
            "'links' is {}, expected an object",
            json_kind(other)
        ))),
        None => Err(Error::MalformedPayload(
            "discovery document has no 'links' member".to_string(),
        )),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn links(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn test_normalize_drops_labels_and_keeps_order() {
        let payload = links(json!({
            "domains": {"List": "/api/domains/:id", "Show": "/api/domains"}
        }));
        let catalog = normalize(&payload).unwrap();

        let paths: Vec<&str> = catalog
            .group("domains")
            .unwrap()
            .iter()
            .map(EndpointTemplate::as_str)
            .collect();
        assert_eq!(paths, vec!["/api/domains/:id", "/api/domains"]);
    }

    #[test]
    fn test_normalize_empty_and_null_groups() {
        let payload = links(json!({"api": {}, "base": null}));
        let catalog = normalize(&payload).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.group("api").unwrap().len(), 0);
        assert_eq!(catalog.group("base").unwrap().len(), 0);
    }

    #[test]
    fn test_normalize_rejects_non_string_path() {
        let payload = links(json!({"hosts": {"Show": 42}}));
        let err = normalize(&payload).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
        assert!(err.to_string().contains("hosts"));
    }

    #[test]
    fn test_normalize_rejects_list_group() {
        let payload = links(json!({"hosts": ["/api/hosts"]}));
        assert!(matches!(
            normalize(&payload),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_normalize_document_requires_links() {
        let err = normalize_document(&json!({"other": {}})).unwrap_err();
        assert!(err.to_string().contains("links"));

        let catalog =
            normalize_document(&json!({"links": {"audits": {"List": "/api/audits"}}})).unwrap();
        assert_eq!(catalog.endpoint_count(), 1);
    }

    #[test]
    fn test_placeholders() {
        let template = EndpointTemplate::from(
            "/api/compute_resources/:compute_resource_id/compute_profiles/:id",
        );
        let names: Vec<&str> = template.placeholders().collect();
        assert_eq!(names, vec!["compute_resource_id", "id"]);

        assert_eq!(EndpointTemplate::from("/api/hosts").placeholders().count(), 0);
    }

    #[test]
    fn test_merge_rejects_duplicate_group() {
        let mut base = Catalog::new().with_group("hosts", ["/api/hosts"]);
        let other = Catalog::new().with_group("hosts", ["/api/hosts/:id"]);
        assert!(matches!(base.merge(other), Err(Error::InvalidCatalog(_))));

        let other = Catalog::new().with_group("domains", ["/api/domains"]);
        base.merge(other).unwrap();
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_catalog_yaml_shape() {
        let catalog: Catalog = serde_json::from_value(json!({
            "hosts": ["/api/hosts", "/api/hosts/:id"],
            "api": []
        }))
        .unwrap();
        assert_eq!(catalog.endpoint_count(), 2);
        assert!(catalog.contains_group("api"));
    }
}
