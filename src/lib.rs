//! apichain - data-driven API test harness
//!
//! Runs declaratively defined HTTP test cases against a backend, threading
//! state (auth tokens, extracted IDs) between cases through a dotted-path
//! variable store and asserting responses with path queries.

pub mod cli;
pub mod commands;
pub mod common;
pub mod context;
pub mod extract;
pub mod http;
pub mod jsonpath;
pub mod store;
pub mod template;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, FailureKind, Result};
pub use context::RunContext;
pub use store::{MemoryStore, VariableStore, YamlFileStore};
