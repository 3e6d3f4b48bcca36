//! routewatch E2E contract runner
//!
//! Verifies that a live server's self-described route table still matches
//! the hand-maintained reference catalog:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ContractRunner                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  prepare()        reference YAML + deviation YAML           │
//! │                   + DefectTracker -> RunContext             │
//! │  check_links()    GET /api/v2 -> normalize                  │
//! │                   -> apply_deviations -> verify             │
//! │  check_services() GET /katello/api/ping -> verify_services  │
//! │  write_results()  test-results/contract-results.json        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A fetch failure means the check could not run and is returned as an
//! error; a contract mismatch is a normal, failing [`runner::SuiteResult`].

pub mod cli;
pub mod client;
pub mod config;
pub mod contract_file;
pub mod error;
pub mod runner;
pub mod tracker;

pub use config::RunnerConfig;
pub use error::{E2eError, E2eResult};
pub use runner::{ContractRunner, RunContext, SuiteResult};
