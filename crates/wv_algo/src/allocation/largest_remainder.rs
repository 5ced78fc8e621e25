//! Fair-share wave allocation: largest remainder with a floor of one unit
//! for every entry that has a positive share.
//!
//! Contract:
//! - `exact = share * budget`; base count is `floor(exact)`, raised to 1 when `share > 0`.
//! - Remainders are `exact - floor(exact)`.
//! - `delta = budget - Σ base` is settled by walking entries (positive share only)
//!   sorted by remainder ↓, ties by incoming order, cyclically:
//!     * delta > 0 → +1 to the current entry;
//!     * delta < 0 → −1 to the current entry only if its count is > 1.
//! - Result sums to `budget` exactly; zero-share entries get 0, positive-share entries ≥ 1.
//!
//! Shares:
//! - Each share must lie in `[0, 1 + SHARE_EPSILON]`. Anything outside is
//!   `AllocError::InvalidShare`, which bounds |delta| by the entry count and
//!   keeps the walk linear.
//!
//! Feasibility:
//! - The reduction walk cannot push an entry below 1, so when more entries have a
//!   positive share than there are units, it would never settle. That case is
//!   rejected up front with `AllocError::Infeasible`. The precheck is a deliberate
//!   correction: the unguarded floor-at-one walk loops forever on such input.
//!
//! Determinism:
//! - No RNG; the caller's entry order is the only tie key.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

/// Slack above 1.0 accepted for a share (rounding in upstream normalization).
pub const SHARE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// More positive-share entries than units; at-least-one and exact-sum cannot both hold.
    #[error("allocation infeasible: {nonzero} entries with positive share exceed budget {budget}")]
    Infeasible { nonzero: usize, budget: u32 },
    /// Share is NaN, infinite, negative, or above 1.
    #[error("invalid share at entry {index}")]
    InvalidShare { index: usize },
    /// Budget > 0 but no entry has a positive share.
    #[error("no entry with a positive share")]
    NoEligibleEntries,
    /// Same id supplied twice.
    #[error("duplicate id at entry {index}")]
    DuplicateId { index: usize },
}

/// One entry of a bucket as seen by the allocator.
#[derive(Clone, Debug, PartialEq)]
pub struct ShareInput<Id> {
    pub id: Id,
    pub share: f64,
}

impl<Id> ShareInput<Id> {
    pub fn new(id: Id, share: f64) -> Self {
        Self { id, share }
    }
}

/// Keyed entry point: counts per id. `entries` must already be in the caller's tie-break order.
pub fn allocate_waves<Id: Ord + Clone>(
    entries: &[ShareInput<Id>],
    budget: u32,
) -> Result<BTreeMap<Id, u32>, AllocError> {
    let mut seen: BTreeSet<&Id> = BTreeSet::new();
    for (index, e) in entries.iter().enumerate() {
        if !seen.insert(&e.id) {
            return Err(AllocError::DuplicateId { index });
        }
    }

    let shares: Vec<f64> = entries.iter().map(|e| e.share).collect();
    let counts = allocate_counts(&shares, budget)?;

    Ok(entries
        .iter()
        .zip(counts)
        .map(|(e, c)| (e.id.clone(), c))
        .collect())
}

/// Positional entry point: `out[i]` is the count for `shares[i]`.
pub fn allocate_counts(shares: &[f64], budget: u32) -> Result<Vec<u32>, AllocError> {
    for (index, &s) in shares.iter().enumerate() {
        if !s.is_finite() || s < 0.0 || s > 1.0 + SHARE_EPSILON {
            return Err(AllocError::InvalidShare { index });
        }
    }

    // Trivial case
    if budget == 0 {
        return Ok(vec![0; shares.len()]);
    }

    let nonzero = shares.iter().filter(|&&s| s > 0.0).count();
    if nonzero == 0 {
        return Err(AllocError::NoEligibleEntries);
    }
    if nonzero > budget as usize {
        return Err(AllocError::Infeasible { nonzero, budget });
    }

    let (mut counts, remainders) = floors_and_remainders(shares, budget);

    let assigned: i64 = counts.iter().map(|&c| i64::from(c)).sum();
    let delta = i64::from(budget) - assigned;

    if delta != 0 {
        let ranking = remainder_ranking(shares, &remainders);
        settle_delta(delta, &mut counts, &ranking, budget)?;
    }

    debug_assert_eq!(counts.iter().map(|&c| u64::from(c)).sum::<u64>(), u64::from(budget));
    Ok(counts)
}

/// Base counts (floor, min 1 for positive shares) and fractional remainders.
fn floors_and_remainders(shares: &[f64], budget: u32) -> (Vec<u32>, Vec<f64>) {
    let total = f64::from(budget);
    let mut counts = Vec::with_capacity(shares.len());
    let mut rems = Vec::with_capacity(shares.len());

    for &s in shares {
        let exact = s * total;
        let floor = exact.floor();
        let base = if s > 0.0 { (floor as u32).max(1) } else { 0 };
        counts.push(base);
        rems.push(exact - floor);
    }

    (counts, rems)
}

/// Positive-share indices ordered by remainder ↓; `sort_by` is stable, so equal
/// remainders keep the incoming order.
fn remainder_ranking(shares: &[f64], remainders: &[f64]) -> Vec<usize> {
    let mut ranking: Vec<usize> = (0..shares.len()).filter(|&i| shares[i] > 0.0).collect();
    ranking.sort_by(|&a, &b| remainders[b].total_cmp(&remainders[a]));
    ranking
}

/// Walk `ranking` cyclically until `delta` reaches zero.
fn settle_delta(
    mut delta: i64,
    counts: &mut [u32],
    ranking: &[usize],
    budget: u32,
) -> Result<(), AllocError> {
    if ranking.is_empty() {
        return Err(AllocError::NoEligibleEntries);
    }

    let n = ranking.len();
    let mut idx = 0usize;
    // Steps since the last change; a full idle lap means nothing can move.
    let mut idle = 0usize;

    while delta != 0 {
        let i = ranking[idx];
        if delta > 0 {
            counts[i] += 1;
            delta -= 1;
            idle = 0;
        } else if counts[i] > 1 {
            counts[i] -= 1;
            delta += 1;
            idle = 0;
        } else {
            idle += 1;
            if idle >= n {
                // Unreachable once the feasibility precheck passed.
                return Err(AllocError::Infeasible { nonzero: n, budget });
            }
        }
        idx += 1;
        if idx == n {
            idx = 0;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entries(xs: &[(&'static str, f64)]) -> Vec<ShareInput<&'static str>> {
        xs.iter().map(|&(id, s)| ShareInput::new(id, s)).collect()
    }

    #[test]
    fn exact_split_has_no_slack() {
        let out = allocate_waves(&entries(&[("A", 0.5), ("B", 0.3), ("C", 0.2)]), 10).unwrap();
        assert_eq!(out["A"], 5);
        assert_eq!(out["B"], 3);
        assert_eq!(out["C"], 2);
    }

    #[test]
    fn leftover_goes_to_largest_remainder() {
        let out = allocate_waves(&entries(&[("A", 0.34), ("B", 0.33), ("C", 0.33)]), 10).unwrap();
        assert_eq!(out["A"], 4);
        assert_eq!(out["B"], 3);
        assert_eq!(out["C"], 3);
    }

    #[test]
    fn tiny_share_still_gets_one() {
        let out = allocate_waves(&entries(&[("A", 0.001), ("B", 0.999)]), 10).unwrap();
        assert_eq!(out["A"], 1);
        assert_eq!(out["B"], 9);
    }

    #[test]
    fn too_many_contributors_is_infeasible() {
        let xs: Vec<ShareInput<usize>> = (0..15).map(|i| ShareInput::new(i, 1.0 / 15.0)).collect();
        assert_eq!(
            allocate_waves(&xs, 10),
            Err(AllocError::Infeasible { nonzero: 15, budget: 10 })
        );
    }

    #[test]
    fn overshoot_is_trimmed_from_entries_above_one() {
        // Bases 1, 1, 9 → 11; the only entry above its floor gives one back.
        let out = allocate_counts(&[0.05, 0.05, 0.9], 10).unwrap();
        assert_eq!(out, vec![1, 1, 8]);
    }

    #[test]
    fn equal_remainders_follow_incoming_order() {
        let out = allocate_counts(&[0.25, 0.25, 0.25, 0.25], 6).unwrap();
        assert_eq!(out, vec![2, 2, 1, 1]);
        let out = allocate_counts(&[0.25, 0.25, 0.25, 0.25], 7).unwrap();
        assert_eq!(out, vec![2, 2, 2, 1]);
    }

    #[test]
    fn zero_share_entries_stay_at_zero() {
        let out = allocate_counts(&[0.0, 0.6, 0.0, 0.4], 5).unwrap();
        assert_eq!(out, vec![0, 3, 0, 2]);
    }

    #[test]
    fn zero_budget_short_circuits() {
        assert_eq!(allocate_counts(&[0.5, 0.5], 0).unwrap(), vec![0, 0]);
        // Even an otherwise infeasible input yields zeros.
        assert_eq!(allocate_counts(&[0.2; 5], 0).unwrap(), vec![0; 5]);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert_eq!(allocate_counts(&[0.5, f64::NAN], 10), Err(AllocError::InvalidShare { index: 1 }));
        assert_eq!(allocate_counts(&[-0.1, 1.1], 10), Err(AllocError::InvalidShare { index: 0 }));
        assert_eq!(allocate_counts(&[0.0, 0.0], 10), Err(AllocError::NoEligibleEntries));
        assert_eq!(allocate_counts(&[], 10), Err(AllocError::NoEligibleEntries));
        assert_eq!(
            allocate_waves(&entries(&[("A", 0.5), ("A", 0.5)]), 10),
            Err(AllocError::DuplicateId { index: 1 })
        );
    }

    #[test]
    fn share_above_one_is_rejected() {
        assert_eq!(allocate_counts(&[1e12], 10), Err(AllocError::InvalidShare { index: 0 }));
        assert_eq!(allocate_counts(&[0.5, 1.5], 10), Err(AllocError::InvalidShare { index: 1 }));
        // Rounding slack from normalization is tolerated.
        assert_eq!(allocate_counts(&[1.0 + 1e-12], 10).unwrap(), vec![10]);
    }

    #[test]
    fn exactly_budget_many_contributors() {
        let out = allocate_counts(&[0.97, 0.01, 0.01, 0.01], 4).unwrap();
        assert_eq!(out, vec![1, 1, 1, 1]);
    }

    fn normalized(weights: &[u32]) -> Vec<f64> {
        let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
        weights.iter().map(|&w| f64::from(w) / total as f64).collect()
    }

    proptest! {
        #[test]
        fn sums_to_budget_and_keeps_contributors(
            weights in prop::collection::vec(0u32..1_000, 1..40),
            extra in 0u32..400,
        ) {
            prop_assume!(weights.iter().any(|&w| w > 0));
            let shares = normalized(&weights);
            let nonzero = shares.iter().filter(|&&s| s > 0.0).count() as u32;
            let budget = nonzero + extra;

            let out = allocate_counts(&shares, budget).unwrap();
            prop_assert_eq!(out.iter().map(|&c| u64::from(c)).sum::<u64>(), u64::from(budget));
            for (s, c) in shares.iter().zip(&out) {
                prop_assert_eq!(*s > 0.0, *c >= 1);
                prop_assert_eq!(*s == 0.0, *c == 0);
            }
        }

        #[test]
        fn repeated_calls_agree(
            weights in prop::collection::vec(1u32..100, 1..20),
            budget in 20u32..200,
        ) {
            let shares = normalized(&weights);
            prop_assert_eq!(allocate_counts(&shares, budget), allocate_counts(&shares, budget));
        }

        #[test]
        fn infeasible_never_loops(n in 2usize..60, budget in 1u32..60) {
            prop_assume!(n > budget as usize);
            let shares = vec![1.0 / n as f64; n];
            prop_assert_eq!(
                allocate_counts(&shares, budget),
                Err(AllocError::Infeasible { nonzero: n, budget })
            );
        }
    }
}
