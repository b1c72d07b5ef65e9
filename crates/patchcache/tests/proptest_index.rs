//! Property-based tests for the similarity index.
//!
//! These tests verify the cache discipline across arbitrary insert sequences:
//! - The capacity bound holds after every insert
//! - Eviction is oldest-first
//! - Lookup returns the oldest qualifying entry, not the closest
//! - The digest prefilter never changes a lookup result
//!
//! Run with: cargo test -p patchcache --test proptest_index

use patchcache::{IndexConfig, Pair, SimilarityIndex, Window};
use proptest::prelude::*;

const WINDOW_LEN: usize = 6;

fn window(values: Vec<f32>) -> Window {
    Window::new(1, Pair::new(2, values.len() / 2), values).unwrap()
}

fn index(capacity: usize, threshold: f32, digest_prefilter: bool) -> SimilarityIndex {
    SimilarityIndex::new(IndexConfig {
        capacity,
        threshold,
        digest_prefilter,
    })
}

/// Strategy for window contents.
fn values_strategy() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-4.0f32..4.0f32, WINDOW_LEN)
}

/// Window contents mixing small values with magnitudes large enough to
/// make the f64 digest inexact.
fn wide_values_strategy() -> impl Strategy<Value = Vec<f32>> {
    let element = prop_oneof![
        4 => -4.0f32..4.0f32,
        1 => Just(1e30f32),
        1 => Just(-1e30f32),
        2 => 1e6f32..1e8f32,
        1 => Just(70_368_744_177_664.0f32),
    ];
    prop::collection::vec(element, WINDOW_LEN)
}

/// Thresholds from tight to wide enough to accept large-magnitude neighbours.
fn threshold_strategy() -> impl Strategy<Value = f32> {
    prop_oneof![0.0f32..6.0, 1e6f32..1e8]
}

/// Strategy for index capacity, including the degenerate empty cache.
fn capacity_strategy() -> impl Strategy<Value = usize> {
    0usize..12
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 100,
        ..ProptestConfig::default()
    })]

    /// Property: the index never holds more than `capacity` entries.
    #[test]
    fn prop_capacity_bound(
        capacity in capacity_strategy(),
        threshold in 0.0f32..3.0,
        inserts in prop::collection::vec(values_strategy(), 0..40),
    ) {
        let mut idx = index(capacity, threshold, true);
        for (i, values) in inserts.into_iter().enumerate() {
            idx.insert(window(values), vec![i as f32]);
            prop_assert!(idx.len() <= capacity);
        }
    }

    /// Property: after `capacity + 1` dissimilar inserts only the first is gone.
    #[test]
    fn prop_oldest_first_eviction(capacity in 1usize..10, offset in -2.0f32..2.0) {
        let mut idx = index(capacity, 1.0, true);
        let windows: Vec<Vec<f32>> = (0..=capacity)
            .map(|i| vec![offset + 5.0 * i as f32; WINDOW_LEN])
            .collect();

        for (i, values) in windows.iter().enumerate() {
            idx.insert(window(values.clone()), vec![i as f32]);
        }

        prop_assert_eq!(idx.len(), capacity);
        prop_assert!(idx.lookup(&window(windows[0].clone())).unwrap().is_none());
        for (i, values) in windows.iter().enumerate().skip(1) {
            let hit = idx.lookup(&window(values.clone())).unwrap().map(|r| r.to_vec());
            prop_assert_eq!(hit, Some(vec![i as f32]));
        }
    }

    /// Property: with A inserted before B and both in range, lookup returns A.
    #[test]
    fn prop_first_match_tie_break(
        base in values_strategy(),
        shift in 0.01f32..0.2,
        pos in 0usize..WINDOW_LEN,
    ) {
        let mut idx = index(8, 0.5, true);
        let a = base.clone();
        let mut b = base.clone();
        b[pos] += 2.0 * shift;
        let mut query = base;
        // strictly closer to B than to A
        query[pos] += 1.5 * shift;

        idx.insert(window(a), vec![1.0]);
        idx.insert(window(b), vec![2.0]);

        let hit = idx.lookup(&window(query)).unwrap().map(|r| r.to_vec());
        prop_assert_eq!(hit, Some(vec![1.0]));
    }

    /// Property: the digest short-circuit is invisible to callers.
    #[test]
    fn prop_prefilter_equivalence(
        capacity in capacity_strategy(),
        threshold in threshold_strategy(),
        ops in prop::collection::vec((wide_values_strategy(), any::<bool>()), 1..40),
    ) {
        let mut filtered = index(capacity, threshold, true);
        let mut plain = index(capacity, threshold, false);

        for (i, (values, is_insert)) in ops.into_iter().enumerate() {
            if is_insert {
                filtered.insert(window(values.clone()), vec![i as f32]);
                plain.insert(window(values), vec![i as f32]);
            } else {
                let q = window(values);
                let a = filtered.lookup(&q).unwrap().map(|r| r.to_vec());
                let b = plain.lookup(&q).unwrap().map(|r| r.to_vec());
                prop_assert_eq!(a, b);
            }
        }

        prop_assert_eq!(filtered.stats().hits, plain.stats().hits);
        prop_assert!(filtered.stats().distance_evals <= plain.stats().distance_evals);
    }
}

#[test]
fn threshold_boundary_is_strict() {
    let mut idx = index(4, 0.25, true);
    idx.insert(window(vec![0.0; WINDOW_LEN]), vec![1.0]);

    let mut at = vec![0.0; WINDOW_LEN];
    at[3] = 0.25;
    assert!(idx.lookup(&window(at)).unwrap().is_none());

    let mut below = vec![0.0; WINDOW_LEN];
    below[3] = 0.25 - f32::EPSILON;
    assert_eq!(idx.lookup(&window(below)).unwrap(), Some(&[1.0][..]));
}
