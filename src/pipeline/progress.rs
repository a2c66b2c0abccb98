//! Centralised progress arithmetic: phase bands plus exploitation category weights.

use crate::exploit::CategoryProgress;
use crate::models::{VulnCategory, EXPLOIT_ORDER};
use super::phase::PhaseName;

pub const CATEGORY_WEIGHTS: [(VulnCategory, u32); 10] = [
    (VulnCategory::Xss, 10),
    (VulnCategory::Sqli, 10),
    (VulnCategory::Ssrf, 5),
    (VulnCategory::Rce, 5),
    (VulnCategory::InfoDisclosure, 5),
    (VulnCategory::Idor, 3),
    (VulnCategory::Cors, 2),
    (VulnCategory::OpenRedirect, 2),
    (VulnCategory::AuthBypass, 2),
    (VulnCategory::BusinessLogic, 2),
];

pub fn weight(category: VulnCategory) -> u32 {
    CATEGORY_WEIGHTS
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, w)| *w)
        .unwrap_or(0)
}

fn total_weight() -> u32 {
    CATEGORY_WEIGHTS.iter().map(|(_, w)| w).sum()
}

/// Map a 0.0-1.0 fraction of `phase` onto the overall 0-100 scale.
pub fn band_progress(phase: PhaseName, fraction: f64) -> u8 {
    let (start, end) = phase.definition().band;
    let fraction = fraction.clamp(0.0, 1.0);
    (f64::from(start) + f64::from(end - start) * fraction).floor() as u8
}

/// Fraction of the exploitation phase done once `progress` is reported.
pub fn exploitation_fraction(progress: CategoryProgress) -> f64 {
    let before: u32 = EXPLOIT_ORDER
        .iter()
        .take_while(|c| **c != progress.category)
        .map(|c| weight(*c))
        .sum();
    let within = if progress.total == 0 {
        1.0
    } else {
        progress.completed.min(progress.total) as f64 / progress.total as f64
    };
    (f64::from(before) + f64::from(weight(progress.category)) * within) / f64::from(total_weight())
}

pub fn exploitation_progress(progress: CategoryProgress) -> u8 {
    band_progress(PhaseName::Exploitation, exploitation_fraction(progress))
}
