use similar::TextDiff;

/// Line-level similarity of two response bodies in `[0, 1]`.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    TextDiff::from_lines(a, b).ratio() as f64
}

pub fn is_similar(a: &str, b: &str, threshold: f64) -> bool {
    similarity_ratio(a, b) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_bodies() {
        assert_eq!(similarity_ratio("a\nb\n", "a\nb\n"), 1.0);
        assert!(is_similar("x", "x", 0.99));
    }

    #[test]
    fn test_empty_side_is_dissimilar() {
        assert_eq!(similarity_ratio("", "body"), 0.0);
    }

    #[test]
    fn test_different_records() {
        let a = "<h1>Order 41</h1>\n<p>alice</p>\n<p>total 10</p>\n";
        let b = "<h1>Order 42</h1>\n<p>bob</p>\n<p>total 99</p>\n";
        assert!(!is_similar(a, b, 0.95));
    }
}
