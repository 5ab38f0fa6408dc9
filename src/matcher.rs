use crate::config::MatchingConfig;
use crate::encoder::Fingerprint;
use crate::error::{Error, Result};

/// Index into a reference sequence where a query match begins.
pub type MatchOffset = usize;

/// Find every offset in `reference` at which `query` matches within
/// tolerance.
///
/// Sliding window over all `R - Q + 1` alignments: at each offset, a query
/// frame matches when its Hamming distance to the paired reference frame is
/// below `distance_threshold`, and the window qualifies when the fraction of
/// matching frames reaches `min_match_ratio`. Deliberately exhaustive
/// (`O(R·Q)` comparisons) — sequences are stride-reduced frame counts, and
/// correctness under noise matters more than asymptotic speed here.
///
/// All qualifying offsets are returned in ascending order, not just the
/// first: a clip reused twice in one source must surface twice. Matching
/// assumes the query was sampled with the same stride and scale policy as
/// the reference.
///
/// An empty query is rejected rather than trivially matching everywhere.
pub fn find_all_matches(
    reference: &[Fingerprint],
    query: &[Fingerprint],
    config: &MatchingConfig,
) -> Result<Vec<MatchOffset>> {
    if query.is_empty() {
        return Err(Error::EmptyQuery);
    }

    if query.len() > reference.len() {
        return Ok(Vec::new());
    }

    let mut offsets = Vec::new();

    for offset in 0..=(reference.len() - query.len()) {
        let matches = query
            .iter()
            .enumerate()
            .filter(|(j, q)| reference[offset + j].distance(q) < config.distance_threshold)
            .count();

        let ratio = matches as f64 / query.len() as f64;
        if ratio >= config.min_match_ratio {
            offsets.push(offset);
        }
    }

    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fingerprints with pairwise Hamming distance 8: letter `k` sets its
    /// own nibble of the 64-bit hash to all ones.
    fn letter(k: usize) -> Fingerprint {
        let mut bytes = [0u8; 8];
        bytes[k / 2] = if k % 2 == 0 { 0xF0 } else { 0x0F };
        Fingerprint::from_bytes(&bytes).unwrap()
    }

    fn letters(ks: &[usize]) -> Vec<Fingerprint> {
        ks.iter().map(|&k| letter(k)).collect()
    }

    fn config(distance_threshold: u32, min_match_ratio: f64) -> MatchingConfig {
        MatchingConfig {
            distance_threshold,
            min_match_ratio,
        }
    }

    #[test]
    fn test_exact_subsequence_is_found() {
        // Reference [A..J], query [D, E, F].
        let reference = letters(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let query = letters(&[3, 4, 5]);

        let offsets = find_all_matches(&reference, &query, &config(1, 1.0)).unwrap();
        assert_eq!(offsets, vec![3]);
    }

    #[test]
    fn test_corrupted_tail_still_matches_at_half_ratio() {
        // Query [D, E, X]: two of three frames match at offset 3.
        let reference = letters(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let query = letters(&[3, 4, 15]);

        let offsets = find_all_matches(&reference, &query, &config(1, 0.5)).unwrap();
        assert_eq!(offsets, vec![3]);
    }

    #[test]
    fn test_corrupted_tail_fails_stricter_ratio() {
        let reference = letters(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let query = letters(&[3, 4, 15]);

        let offsets = find_all_matches(&reference, &query, &config(1, 0.7)).unwrap();
        assert!(offsets.is_empty());
    }

    #[test]
    fn test_all_occurrences_are_returned() {
        // The same clip injected at two disjoint offsets.
        let reference = letters(&[3, 4, 5, 0, 1, 2, 3, 4, 5, 9]);
        let query = letters(&[3, 4, 5]);

        let offsets = find_all_matches(&reference, &query, &config(1, 1.0)).unwrap();
        assert_eq!(offsets, vec![0, 6]);
    }

    #[test]
    fn test_matcher_is_order_sensitive() {
        let reference = letters(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let query = letters(&[5, 4, 3]);

        let offsets = find_all_matches(&reference, &query, &config(1, 1.0)).unwrap();
        assert!(offsets.is_empty());
    }

    #[test]
    fn test_identical_sequences_match_at_zero() {
        let reference = letters(&[0, 1, 2, 3]);
        let query = letters(&[0, 1, 2, 3]);

        let offsets = find_all_matches(&reference, &query, &config(1, 1.0)).unwrap();
        assert_eq!(offsets, vec![0]);
    }

    #[test]
    fn test_query_longer_than_reference_is_empty() {
        let reference = letters(&[0, 1]);
        let query = letters(&[0, 1, 2]);

        let offsets = find_all_matches(&reference, &query, &config(8, 0.5)).unwrap();
        assert!(offsets.is_empty());
    }

    #[test]
    fn test_empty_query_is_rejected() {
        let reference = letters(&[0, 1, 2]);

        let result = find_all_matches(&reference, &[], &config(3, 0.5));
        assert!(matches!(result, Err(Error::EmptyQuery)));
    }

    #[test]
    fn test_near_duplicates_match_within_threshold() {
        // One bit of noise on the middle frame stays under the 3-bit default.
        let mut bytes = [0u8; 8];
        bytes[2] = 0xF1;
        let noisy = Fingerprint::from_bytes(&bytes).unwrap();

        let reference = letters(&[0, 1, 2, 3, 4, 5, 6]);
        let query = vec![letter(3), noisy, letter(5)];

        let offsets = find_all_matches(&reference, &query, &config(3, 1.0)).unwrap();
        assert_eq!(offsets, vec![3]);
    }

    #[test]
    fn test_invalid_fingerprint_never_matches() {
        let mut reference = letters(&[0, 1, 2, 3, 4]);
        reference[2] = Fingerprint::invalid("garbage");
        let query = vec![letter(2)];

        let offsets = find_all_matches(&reference, &query, &config(u32::MAX - 1, 1.0)).unwrap();
        // Every offset but the corrupt one matches under a huge threshold.
        assert_eq!(offsets, vec![0, 1, 3, 4]);
    }
}
