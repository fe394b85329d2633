//! Candidate ordering for prefetch runs
//!
//! Pure index arithmetic, kept separate from the coordinator so the
//! ordering rules are testable without threads or a cache.

/// Indices to prefetch around the current image.
///
/// Reaches `forward` images ahead and `backward` images behind, ordered
/// by ascending distance from `current`. When both directions offer a
/// candidate at the same distance, the lower index comes first. The
/// current index itself is not a candidate.
pub fn around_candidates(
    current: usize,
    len: usize,
    forward: usize,
    backward: usize,
) -> Vec<usize> {
    let mut candidates = Vec::with_capacity(forward + backward);
    if len == 0 || current >= len {
        return candidates;
    }

    for distance in 1..=forward.max(backward) {
        if distance <= backward {
            if let Some(index) = current.checked_sub(distance) {
                candidates.push(index);
            }
        }
        if distance <= forward {
            let index = current + distance;
            if index < len {
                candidates.push(index);
            }
        }
    }
    candidates
}

/// Indices to prefetch for a settled visible range, center outward.
///
/// Walks `first..=last` ordered by ascending distance from the range
/// midpoint with ties going to the lower index, keeping at most `need`
/// indices so a wide settled range cannot queue unbounded work.
pub fn visible_candidates(first: usize, last: usize, len: usize, need: usize) -> Vec<usize> {
    let mut candidates = Vec::new();
    if len == 0 || need == 0 || first > last || first >= len {
        return candidates;
    }
    let last = last.min(len - 1);
    let center = first + (last - first) / 2;

    candidates.push(center);
    'outward: for distance in 1..=(last - first) {
        if let Some(index) = center.checked_sub(distance) {
            if index >= first {
                if candidates.len() == need {
                    break 'outward;
                }
                candidates.push(index);
            }
        }
        let index = center + distance;
        if index <= last {
            if candidates.len() == need {
                break 'outward;
            }
            candidates.push(index);
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_around_interleaves_by_distance() {
        // backward 2, forward 3 around index 5
        assert_eq!(around_candidates(5, 100, 3, 2), vec![4, 6, 3, 7, 8]);
    }

    #[test]
    fn test_around_clips_at_start() {
        assert_eq!(around_candidates(0, 100, 3, 2), vec![1, 2, 3]);
        assert_eq!(around_candidates(1, 100, 2, 2), vec![0, 2, 3]);
    }

    #[test]
    fn test_around_clips_at_end() {
        assert_eq!(around_candidates(9, 10, 3, 2), vec![8, 7]);
    }

    #[test]
    fn test_around_empty_list() {
        assert!(around_candidates(0, 0, 5, 2).is_empty());
    }

    #[test]
    fn test_around_current_out_of_range() {
        assert!(around_candidates(10, 5, 5, 2).is_empty());
    }

    #[test]
    fn test_around_excludes_current() {
        assert!(!around_candidates(5, 100, 5, 2).contains(&5));
    }

    #[test]
    fn test_visible_center_outward() {
        // Range 2..=6, center 4
        assert_eq!(visible_candidates(2, 6, 100, 10), vec![4, 3, 5, 2, 6]);
    }

    #[test]
    fn test_visible_even_width_uses_lower_midpoint() {
        // Range 0..=3, center 1
        assert_eq!(visible_candidates(0, 3, 100, 10), vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_visible_single_index() {
        assert_eq!(visible_candidates(3, 3, 100, 10), vec![3]);
    }

    #[test]
    fn test_visible_clamps_to_list_length() {
        assert_eq!(visible_candidates(3, 50, 6, 10), vec![4, 3, 5]);
    }

    #[test]
    fn test_visible_caps_a_wide_range_at_need() {
        // Range 0..=19, center 9; only the seven nearest survive
        assert_eq!(
            visible_candidates(0, 19, 100, 7),
            vec![9, 8, 10, 7, 11, 6, 12]
        );
    }

    #[test]
    fn test_visible_need_larger_than_range() {
        assert_eq!(visible_candidates(2, 4, 100, 50), vec![3, 2, 4]);
    }

    #[test]
    fn test_visible_zero_need() {
        assert!(visible_candidates(0, 19, 100, 0).is_empty());
    }

    #[test]
    fn test_visible_empty_list() {
        assert!(visible_candidates(0, 5, 0, 10).is_empty());
    }

    #[test]
    fn test_visible_inverted_range() {
        assert!(visible_candidates(5, 2, 100, 10).is_empty());
    }
}
