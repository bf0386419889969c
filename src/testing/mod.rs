//! Case execution
//!
//! Loads YAML case files, runs each case through the request / extract /
//! assert pipeline and reports results per group.

pub mod assertions;
mod config;
pub mod executor;
pub mod loader;
pub mod runner;

pub use config::*;
pub use executor::{execute_case, prepare_request, CaseReport};
pub use loader::{case_problems, load_cases, parse_cases};
pub use runner::{
    plan_groups, print_summary, run_group, run_suite, CaseOutcome, CaseResult, GroupPlan,
    GroupResult, StopSignal, SuiteResult,
};
