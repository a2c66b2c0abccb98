use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::models::{DedupStats, Vulnerability};

/// Collapse findings sharing (category, parameter) into one record.
///
/// The first record of each key survives, keeping its id and position. Later
/// duplicates add their occurrence counts and endpoints, and raise confidence and
/// severity score when higher. Running it twice changes nothing. `original` counts
/// raw occurrences, so stats survive re-running on already merged records.
pub fn deduplicate(vulnerabilities: Vec<Vulnerability>) -> (Vec<Vulnerability>, DedupStats) {
    let original: usize = vulnerabilities.iter().map(|v| v.occurrences.max(1) as usize).sum();
    let mut kept: Vec<Vulnerability> = Vec::with_capacity(vulnerabilities.len());
    let mut index: HashMap<_, usize> = HashMap::new();

    for mut vuln in vulnerabilities {
        if !vuln.endpoints.contains(&vuln.endpoint) {
            vuln.endpoints.insert(0, vuln.endpoint.clone());
        }
        match index.entry(vuln.dedup_key()) {
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push(vuln);
            }
            Entry::Occupied(slot) => {
                let existing = &mut kept[*slot.get()];
                existing.occurrences += vuln.occurrences.max(1);
                for endpoint in vuln.endpoints {
                    if !existing.endpoints.contains(&endpoint) {
                        existing.endpoints.push(endpoint);
                    }
                }
                if vuln.score > existing.score {
                    existing.score = vuln.score;
                    existing.severity = vuln.severity;
                }
                existing.confidence = existing.confidence.max(vuln.confidence);
            }
        }
    }

    let deduplicated = kept.len();
    let removed = original - deduplicated;
    let reduction_percent = if original == 0 {
        0.0
    } else {
        (removed as f64 / original as f64 * 1000.0).round() / 10.0
    };
    (
        kept,
        DedupStats { original, deduplicated, removed, reduction_percent },
    )
}
