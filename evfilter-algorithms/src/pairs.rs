//! Pair enumeration under a combination policy.
//!
//! `SelfPairs` walks the strict upper triangle `(i, j), i < j` of one
//! partition, so every unordered pair appears once and no record is paired
//! with itself. `CrossPairs` walks the full `n1 x n2` grid and never
//! deduplicates, even when the two partitions share records.

use evfilter_core::{FourMomentum, LorentzVector, PairCombinationPolicy, PairMetric};
use rayon::prelude::*;

/// Iterator over the record pairs selected by a combination policy.
#[derive(Debug, Clone)]
pub struct Combinations<'a, A, B> {
    policy: PairCombinationPolicy,
    first: &'a [A],
    second: &'a [B],
    i: usize,
    j: usize,
    remaining: usize,
}

/// Enumerates pairs of `first` and `second` according to `policy`.
///
/// With [`PairCombinationPolicy::SelfPairs`] both slices are expected to view
/// the same partition; element `i` of `first` is paired with elements `j > i`
/// of `second`.
pub fn combinations<'a, A, B>(
    policy: PairCombinationPolicy,
    first: &'a [A],
    second: &'a [B],
) -> Combinations<'a, A, B> {
    let j = match policy {
        PairCombinationPolicy::SelfPairs => 1,
        PairCombinationPolicy::CrossPairs => 0,
    };
    Combinations {
        policy,
        first,
        second,
        i: 0,
        j,
        remaining: policy.pair_count(first.len(), second.len()),
    }
}

impl<'a, A, B> Iterator for Combinations<'a, A, B> {
    type Item = (&'a A, &'a B);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        while self.j >= self.second.len() {
            self.i += 1;
            self.j = match self.policy {
                PairCombinationPolicy::SelfPairs => self.i + 1,
                PairCombinationPolicy::CrossPairs => 0,
            };
        }
        let pair = (&self.first[self.i], &self.second[self.j]);
        self.j += 1;
        self.remaining -= 1;
        Some(pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<A, B> ExactSizeIterator for Combinations<'_, A, B> {}

/// Computes a pair metric over two partitions.
///
/// The engine holds the policy, the metric and one mass hypothesis per
/// partition. Metric evaluation is stateless, so the `par_*` variants can
/// spread rows of the pair grid over the rayon pool.
#[derive(Debug, Clone, Copy)]
pub struct PairEngine {
    policy: PairCombinationPolicy,
    metric: PairMetric,
    masses: (f64, f64),
}

impl PairEngine {
    /// Creates an engine with mass hypotheses `m0` and `m1` (GeV).
    #[must_use]
    pub fn new(policy: PairCombinationPolicy, metric: PairMetric, m0: f64, m1: f64) -> Self {
        Self {
            policy,
            metric,
            masses: (m0, m1),
        }
    }

    /// Combination policy in use.
    #[must_use]
    pub fn policy(&self) -> PairCombinationPolicy {
        self.policy
    }

    /// Metric of a single pair.
    #[inline]
    pub fn evaluate<A: FourMomentum, B: FourMomentum>(&self, a: &A, b: &B) -> f64 {
        let p0: LorentzVector = a.four_momentum(self.masses.0);
        let p1 = b.four_momentum(self.masses.1);
        self.metric.evaluate(&p0, &p1)
    }

    /// Calls `f` with the metric of every pair, in enumeration order.
    pub fn for_each_metric<A, B, F>(&self, first: &[A], second: &[B], mut f: F)
    where
        A: FourMomentum,
        B: FourMomentum,
        F: FnMut(f64),
    {
        for (a, b) in combinations(self.policy, first, second) {
            f(self.evaluate(a, b));
        }
    }

    /// Metrics of every pair, in enumeration order.
    pub fn metrics<A: FourMomentum, B: FourMomentum>(
        &self,
        first: &[A],
        second: &[B],
    ) -> Vec<f64> {
        combinations(self.policy, first, second)
            .map(|(a, b)| self.evaluate(a, b))
            .collect()
    }

    /// Returns true as soon as one pair has a metric above `threshold`.
    pub fn any_above<A: FourMomentum, B: FourMomentum>(
        &self,
        first: &[A],
        second: &[B],
        threshold: f64,
    ) -> bool {
        combinations(self.policy, first, second).any(|(a, b)| self.evaluate(a, b) > threshold)
    }

    fn row_start(&self, i: usize) -> usize {
        match self.policy {
            PairCombinationPolicy::SelfPairs => i + 1,
            PairCombinationPolicy::CrossPairs => 0,
        }
    }

    /// Parallel [`metrics`](Self::metrics); the output order is the same.
    pub fn par_metrics<A, B>(&self, first: &[A], second: &[B]) -> Vec<f64>
    where
        A: FourMomentum + Sync,
        B: FourMomentum + Sync,
    {
        first
            .par_iter()
            .enumerate()
            .flat_map_iter(|(i, a)| {
                let start = self.row_start(i).min(second.len());
                second[start..].iter().map(move |b| self.evaluate(a, b))
            })
            .collect()
    }

    /// Parallel [`any_above`](Self::any_above) with early exit across rows.
    pub fn par_any_above<A, B>(&self, first: &[A], second: &[B], threshold: f64) -> bool
    where
        A: FourMomentum + Sync,
        B: FourMomentum + Sync,
    {
        first.par_iter().enumerate().any(|(i, a)| {
            let start = self.row_start(i).min(second.len());
            second[start..]
                .iter()
                .any(|b| self.evaluate(a, b) > threshold)
        })
    }
}
