pub mod events;
pub mod metrics;
pub mod orchestrator;
pub mod persist;
pub mod phase;
pub mod progress;
pub mod state;

pub use events::ScanEvent;
pub use metrics::{compute_summary, ScanSummary};
pub use orchestrator::{outcome, recover_interrupted, vulnerability_from, ScanOrchestrator};
pub use phase::{PhaseName, PHASES};
pub use state::ScanState;
