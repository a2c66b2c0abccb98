pub mod types;
pub mod classification;

pub use types::ZeronError;
pub use classification::{ErrorClassification, ErrorScope};
