//! Approximate string similarity for model-name matching.
//!
//! Scores are on a `0..=100` scale and are based on the indel similarity
//! `2 × LCS / (|a| + |b|)`. Inputs are normalized first: lowercased,
//! non-alphanumeric characters replaced by spaces, whitespace collapsed.
//!
//! [`partial_ratio`] aligns the shorter string against every window of the
//! longer one (including partial overlaps at both edges), so a short literal
//! such as `"s23 ultra"` scores highly against `"Galaxy S23 Ultra"`.

/// Lowercase, strip punctuation, and collapse whitespace.
pub fn normalize(s: &str) -> String {
    let mapped: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole-string similarity of two strings, `0..=100`.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = normalize(a).chars().collect();
    let b: Vec<char> = normalize(b).chars().collect();
    if a.is_empty() && b.is_empty() {
        return 100;
    }
    to_score(indel_similarity(&a, &b))
}

/// Best similarity of the shorter string against any alignment in the longer one, `0..=100`.
///
/// Returns `0` if either string is empty after normalization.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = normalize(a).chars().collect();
    let b: Vec<char> = normalize(b).chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let m = short.len();
    let n = long.len();
    if m == n {
        return to_score(indel_similarity(&short, &long));
    }

    let mut best = 0.0f64;
    for start in 0..=(n - m) {
        best = best.max(indel_similarity(&short, &long[start..start + m]));
        if best >= 100.0 {
            return 100;
        }
    }
    // Partial overlaps at the edges of the longer string.
    for k in 1..m {
        best = best.max(indel_similarity(&short, &long[..k]));
        best = best.max(indel_similarity(&short, &long[n - k..]));
    }

    to_score(best)
}

fn to_score(similarity: f64) -> u8 {
    similarity.round().clamp(0.0, 100.0) as u8
}

/// `2 × LCS / (|a| + |b|) × 100`.
fn indel_similarity(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Galaxy S23+ (5G)  "), "galaxy s23 5g");
        assert_eq!(normalize("?!"), "");
    }

    #[test]
    fn test_ratio_identical_and_disjoint() {
        assert_eq!(ratio("Galaxy S23", "galaxy s23"), 100);
        assert_eq!(ratio("abc", "xyz"), 0);
    }

    #[test]
    fn test_partial_ratio_substring_is_perfect() {
        assert_eq!(partial_ratio("s23 ultra", "Galaxy S23 Ultra"), 100);
        assert_eq!(partial_ratio("Galaxy S23 Ultra", "s23 ultra"), 100);
    }

    #[test]
    fn test_partial_ratio_near_miss() {
        // One transposed digit: "s22 ultra" against "galaxy s23 ultra"
        assert_eq!(partial_ratio("s23 ultra", "Galaxy S22 Ultra"), 89);
        assert_eq!(partial_ratio("flip 5", "Galaxy Z Flip5"), 91);
    }

    #[test]
    fn test_partial_ratio_unrelated_is_low() {
        assert!(partial_ratio("Nonexistent Phone 99", "Model X") < 60);
        assert!(partial_ratio("specs of Nonexistent Phone 99", "Galaxy S23 Ultra") < 60);
    }

    #[test]
    fn test_partial_ratio_empty() {
        assert_eq!(partial_ratio("", "Galaxy S23"), 0);
        assert_eq!(partial_ratio("???", "Galaxy S23"), 0);
    }
}
