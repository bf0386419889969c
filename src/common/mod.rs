//! Common utilities shared by the library and the CLI

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, FailureKind, Result};

/// Shorten a secret for logging, keeping only the first `keep` characters
pub fn mask_secret(secret: &str, keep: usize) -> String {
    let mut chars = secret.chars();
    let head: String = chars.by_ref().take(keep).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
