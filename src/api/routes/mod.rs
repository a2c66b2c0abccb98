pub mod health;
pub mod reports;
pub mod scans;
pub mod status;

use crate::errors::ZeronError;
use crate::models::Scan;
use super::AppState;

/// The live record of an active scan, or the persisted document.
pub(crate) fn load_scan(state: &AppState, id: &str) -> Result<Scan, ZeronError> {
    if let Some(handle) = state.active_scans.get(id) {
        return Ok(handle.state.snapshot());
    }
    state
        .db
        .get_scan(id)?
        .ok_or_else(|| ZeronError::NotFound(format!("scan {}", id)))
}
