//! Exploitation: category-ordered probing of attack vectors with analyzer and validator gates.

pub mod engine;
pub mod probes;

pub use engine::{CategoryProgress, ConfirmedFinding, ExploitEngine};
