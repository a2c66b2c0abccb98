//! 64-bit SimHash over word tokens, for near-duplicate page detection.

use crate::models::NearDuplicate;

pub const DEFAULT_THRESHOLD: f64 = 0.85;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

pub fn simhash(text: &str) -> u64 {
    let mut weights = [0i64; 64];
    let mut seen = false;
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
    {
        seen = true;
        let hash = fnv1a(&token.to_lowercase());
        for (bit, weight) in weights.iter_mut().enumerate() {
            if hash >> bit & 1 == 1 {
                *weight += 1;
            } else {
                *weight -= 1;
            }
        }
    }
    if !seen {
        return 0;
    }
    weights
        .iter()
        .enumerate()
        .filter(|(_, w)| **w > 0)
        .fold(0u64, |acc, (bit, _)| acc | (1 << bit))
}

pub fn similarity(a: u64, b: u64) -> f64 {
    1.0 - f64::from((a ^ b).count_ones()) / 64.0
}

/// Pairs of assets whose fingerprints are at least `threshold` similar.
///
/// Nothing is removed; the pairs only inform prioritisation.
pub fn near_duplicates(assets: &[(String, u64)], threshold: f64) -> Vec<NearDuplicate> {
    let mut pairs = Vec::new();
    for (i, (first, a)) in assets.iter().enumerate() {
        for (second, b) in &assets[i + 1..] {
            let score = similarity(*a, *b);
            if score >= threshold {
                pairs.push(NearDuplicate {
                    first: first.clone(),
                    second: second.clone(),
                    similarity: (score * 1000.0).round() / 1000.0,
                });
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "Welcome to the product catalogue. Browse shoes, shirts, jackets \
        and accessories. Free shipping on orders over fifty dollars. Contact support \
        for returns and exchanges within thirty days of purchase.";

    #[test]
    fn test_identical_text_identical_hash() {
        assert_eq!(simhash(PAGE), simhash(PAGE));
        assert_eq!(similarity(simhash(PAGE), simhash(PAGE)), 1.0);
    }

    #[test]
    fn test_small_edit_stays_similar() {
        let page: String = (0..300).map(|i| format!("item{} ", i)).collect();
        let edited = page.replace("item7 ", "changed7 ");
        assert!(similarity(simhash(&page), simhash(&edited)) >= DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_unrelated_text_is_dissimilar() {
        let other = "Kernel panic: unable to mount root filesystem on unknown block device";
        assert!(similarity(simhash(PAGE), simhash(other)) < DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_near_duplicates_keeps_both_records() {
        let assets = vec![
            ("https://a.test/p/1".to_string(), simhash(PAGE)),
            ("https://a.test/p/2".to_string(), simhash(PAGE)),
            ("https://a.test/err".to_string(), simhash("totally different content here")),
        ];
        let pairs = near_duplicates(&assets, DEFAULT_THRESHOLD);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first, "https://a.test/p/1");
        assert_eq!(pairs[0].second, "https://a.test/p/2");
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(simhash(""), 0);
    }
}
