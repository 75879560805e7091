#![forbid(unsafe_code)]
//! History shrinking.
//!
//! A failing history is minimised by descending a rose tree of candidate
//! histories. The children of a history of length `n ≥ 4` are its two
//! bisection halves followed by every one-element deletion; shorter
//! histories only offer deletions. The descent is iterative: try children
//! in order, restart from the first one that still fails, and stop when
//! none do. The result is locally minimal under the subvector order, and
//! never larger than the input.
//!
//! Children are computed on demand — at no point is the candidate list
//! materialised.
//!
//! The element type is generic; the engine instantiates it with operations
//! and a failure predicate that re-executes the candidate against the SUT
//! (several times when scouring for nondeterministic failures).

use tracing::debug;

/// The `k`-th child of `history` in the rose tree, if any.
///
/// Children are ordered: bisection halves first (for length ≥ 4), then the
/// deletion of each index in turn.
#[must_use]
pub fn candidate<T: Clone>(history: &[T], k: usize) -> Option<Vec<T>> {
    let n = history.len();
    if n >= 4 {
        match k {
            0 => return Some(history[..n / 2].to_vec()),
            1 => return Some(history[n / 2..].to_vec()),
            _ => return deletion(history, k - 2),
        }
    }
    deletion(history, k)
}

fn deletion<T: Clone>(history: &[T], index: usize) -> Option<Vec<T>> {
    if index >= history.len() {
        return None;
    }
    let mut smaller = Vec::with_capacity(history.len() - 1);
    smaller.extend_from_slice(&history[..index]);
    smaller.extend_from_slice(&history[index + 1..]);
    Some(smaller)
}

/// Iterator over every child of a history, in descent order.
#[derive(Debug)]
pub struct Candidates<'a, T> {
    history: &'a [T],
    k: usize,
}

impl<T: Clone> Iterator for Candidates<'_, T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        let child = candidate(self.history, self.k)?;
        self.k += 1;
        Some(child)
    }
}

/// All children of `history`.
#[must_use]
pub fn candidates<T: Clone>(history: &[T]) -> Candidates<'_, T> {
    Candidates { history, k: 0 }
}

/// Minimise a failing history.
///
/// `fails` re-executes a candidate and returns evidence of failure (`None`
/// for a pass). `evidence` is whatever `fails` produced for the initial
/// history; the returned pair is a locally minimal failing history together
/// with the evidence from its last failing execution.
pub fn shrink<T: Clone, E>(
    initial: Vec<T>,
    evidence: E,
    mut fails: impl FnMut(&[T]) -> Option<E>,
) -> (Vec<T>, E) {
    let mut best = initial;
    let mut best_evidence = evidence;
    'descent: loop {
        let mut k = 0;
        loop {
            let Some(child) = candidate(&best, k) else {
                // No child fails: locally minimal.
                return (best, best_evidence);
            };
            if let Some(evidence) = fails(&child) {
                debug!(from = best.len(), to = child.len(), "shrink step");
                best = child;
                best_evidence = evidence;
                continue 'descent;
            }
            k += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn children_of_a_long_history() {
        let history = vec![0, 1, 2, 3, 4, 5];
        let children: Vec<Vec<i32>> = candidates(&history).collect();
        assert_eq!(children.len(), 2 + 6);
        assert_eq!(children[0], vec![0, 1, 2]);
        assert_eq!(children[1], vec![3, 4, 5]);
        assert_eq!(children[2], vec![1, 2, 3, 4, 5]);
        assert_eq!(children[7], vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn short_histories_only_offer_deletions() {
        let history = vec![0, 1, 2];
        let children: Vec<Vec<i32>> = candidates(&history).collect();
        assert_eq!(children, vec![vec![1, 2], vec![0, 2], vec![0, 1]]);

        let empty: Vec<Vec<i32>> = candidates::<i32>(&[]).collect();
        assert!(empty.is_empty());
    }

    #[test]
    fn odd_lengths_bisect_cleanly() {
        let history = vec![0, 1, 2, 3, 4];
        let children: Vec<Vec<i32>> = candidates(&history).collect();
        assert_eq!(children[0], vec![0, 1]);
        assert_eq!(children[1], vec![2, 3, 4]);
    }

    #[test]
    fn shrink_to_a_single_culprit() {
        let history: Vec<u32> = (0..100).collect();
        let fails = |h: &[u32]| h.contains(&37).then_some(());
        let (minimal, ()) = shrink(history, (), fails);
        assert_eq!(minimal, vec![37]);
    }

    #[test]
    fn shrink_keeps_interacting_pairs() {
        // Failure needs both elements; neither alone is enough.
        let history: Vec<u32> = (0..64).collect();
        let fails = |h: &[u32]| (h.contains(&3) && h.contains(&60)).then_some(h.len());
        let (minimal, evidence) = shrink(history, 64, fails);
        assert_eq!(minimal, vec![3, 60]);
        assert_eq!(evidence, 2);
    }

    #[test]
    fn passing_candidates_do_not_replace_the_best() {
        // Nothing smaller fails, so the initial history is already minimal.
        let history = vec![1, 2];
        let (minimal, ()) = shrink(history.clone(), (), |h| (h == history).then_some(()));
        assert_eq!(minimal, vec![1, 2]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn children_are_strictly_smaller(history in proptest::collection::vec(any::<u8>(), 0..40)) {
            for child in candidates(&history) {
                prop_assert!(child.len() < history.len());
            }
        }

        #[test]
        fn shrink_never_enlarges_and_stays_failing(
            history in proptest::collection::vec(any::<u8>(), 1..40),
            needle_index in any::<proptest::sample::Index>(),
        ) {
            let needle = history[needle_index.index(history.len())];
            let fails = |h: &[u8]| h.contains(&needle).then_some(());
            let initial_len = history.len();
            let (minimal, ()) = shrink(history, (), fails);
            prop_assert!(minimal.len() <= initial_len);
            prop_assert!(minimal.contains(&needle));
            // Locally minimal: no child still fails.
            for child in candidates(&minimal) {
                prop_assert!(!child.contains(&needle));
            }
        }
    }
}
