//! routewatch common library
//!
//! Pure pieces of the endpoint contract check: catalog types, normalization
//! of the server's discovery document, defect-tracked deviations, and the
//! multiset comparison that decides whether the contract holds.

pub mod catalog;
pub mod deviation;
pub mod error;
pub mod health;
pub mod verify;

// Re-export commonly used types
pub use catalog::{
    normalize, normalize_document, Catalog, EndpointTemplate, LiveCatalog, ReferenceCatalog,
};
pub use deviation::{apply_deviations, ApplySummary, DeviationTable, KnownDeviation, ServiceWaiver};
pub use error::{Error, Result};
pub use health::{verify_services, HealthReport, PingDocument, ServiceStatus};
pub use verify::{verify, ContractReport, GroupVerdict};

/// Discovery path that lists every route group the server exposes
pub const DISCOVERY_PATH: &str = "/api/v2";

/// Path of the service health endpoint
pub const PING_PATH: &str = "/katello/api/ping";
