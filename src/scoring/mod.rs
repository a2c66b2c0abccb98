//! Severity rating, CVSS, dedup and near-duplicate detection.

pub mod cvss;
pub mod dedup;
pub mod severity;
pub mod simhash;

pub use cvss::CvssVector;
pub use dedup::deduplicate;
pub use severity::{base_score, rate, score_with, SeverityModifiers};
