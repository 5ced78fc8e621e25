//! ALLOCATE stage: one normalized bucket → one wave frame.
//!
//! Input: a `NormalizedBucket`, the wave budget and the tie-break order.
//! Output: `FrameOutcome::Waves` with one `WaveSlot` per state (in tie-break order),
//! or `FrameOutcome::NoData` when the bucket cannot be drawn.
//!
//! Determinism:
//! - Slot order comes from `wv_core::determinism::ordered_entries`.
//! - Counts come from `wv_algo::allocate_counts`, which is order-stable on equal remainders.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wv_algo::{allocate_counts, AllocError};
use wv_core::{determinism::ordered_entries, BucketKey, NormalizedBucket, StateCode, TieBreak};

/// One drawn state: the bucket entry plus its wave count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveSlot {
    pub state_code: StateCode,
    pub state_name: String,
    pub subregion: String,
    pub share: f64,
    pub rank: i32,
    pub missing_pct: f64,
    pub waves: u32,
}

/// Everything a renderer needs to draw one (year, class) selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveFrame {
    pub key: BucketKey,
    pub budget: u32,
    pub tie_break: TieBreak,
    pub slots: Vec<WaveSlot>,
}

impl WaveFrame {
    pub fn total_waves(&self) -> u32 {
        self.slots.iter().map(|s| s.waves).sum()
    }

    pub fn share_sum(&self) -> f64 {
        self.slots.iter().map(|s| s.share).sum()
    }

    pub fn slot(&self, code: &StateCode) -> Option<&WaveSlot> {
        self.slots.iter().find(|s| &s.state_code == code)
    }
}

/// Why a selection has nothing to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    /// No record matched the (year, class).
    NoRecords,
    /// Records matched but every contribution was zero.
    ZeroTotal,
}

impl NoDataReason {
    pub fn as_str(self) -> &'static str {
        match self {
            NoDataReason::NoRecords => "no_records",
            NoDataReason::ZeroTotal => "zero_total",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Waves(WaveFrame),
    NoData { key: BucketKey, reason: NoDataReason },
}

impl FrameOutcome {
    pub fn key(&self) -> BucketKey {
        match self {
            FrameOutcome::Waves(f) => f.key,
            FrameOutcome::NoData { key, .. } => *key,
        }
    }

    pub fn frame(&self) -> Option<&WaveFrame> {
        match self {
            FrameOutcome::Waves(f) => Some(f),
            FrameOutcome::NoData { .. } => None,
        }
    }
}

/// Allocate `budget` waves across the bucket's states.
///
/// Fails with `AllocError::Infeasible` when more states hold a positive share than
/// there are waves to give them.
pub fn allocate_bucket(
    bucket: &NormalizedBucket,
    budget: u32,
    tie_break: TieBreak,
) -> Result<FrameOutcome, AllocError> {
    if bucket.is_empty() {
        warn!(bucket = %bucket.key, "no records for selection");
        return Ok(FrameOutcome::NoData { key: bucket.key, reason: NoDataReason::NoRecords });
    }
    if budget > 0 && bucket.nonzero_count() == 0 {
        warn!(bucket = %bucket.key, "every share is zero; nothing to draw");
        return Ok(FrameOutcome::NoData { key: bucket.key, reason: NoDataReason::ZeroTotal });
    }

    let ordered = ordered_entries(bucket, tie_break);
    let shares: Vec<f64> = ordered.iter().map(|(_, e)| e.share).collect();
    let counts = allocate_counts(&shares, budget)?;

    let slots = ordered
        .into_iter()
        .zip(counts)
        .map(|((code, e), waves)| WaveSlot {
            state_code: code.clone(),
            state_name: e.state_name.clone(),
            subregion: e.subregion.clone(),
            share: e.share,
            rank: e.rank,
            missing_pct: e.missing_pct,
            waves,
        })
        .collect::<Vec<_>>();

    debug!(bucket = %bucket.key, states = slots.len(), budget, "allocated");
    Ok(FrameOutcome::Waves(WaveFrame { key: bucket.key, budget, tie_break, slots }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wv_core::ShareEntry;

    fn bucket(entries: &[(&str, &str, f64)]) -> NormalizedBucket {
        let mut map = BTreeMap::new();
        for (code, sub, share) in entries {
            map.insert(
                code.parse().unwrap(),
                ShareEntry {
                    state_name: format!("{code} name"),
                    subregion: (*sub).into(),
                    share: *share,
                    rank: 1,
                    missing_pct: 0.0,
                },
            );
        }
        NormalizedBucket { key: BucketKey::new(2020, 1), entries: map }
    }

    fn waves_of(o: &FrameOutcome) -> Vec<(String, u32)> {
        o.frame()
            .unwrap()
            .slots
            .iter()
            .map(|s| (s.state_code.to_string(), s.waves))
            .collect()
    }

    #[test]
    fn slots_follow_tie_break_order() {
        let b = bucket(&[("FJI", "Melanesia", 0.5), ("AUS", "Australia", 0.3), ("TON", "Polynesia", 0.2)]);
        let o = allocate_bucket(&b, 10, TieBreak::SubregionThenName).unwrap();
        assert_eq!(
            waves_of(&o),
            vec![("AUS".into(), 3), ("FJI".into(), 5), ("TON".into(), 2)]
        );
        assert_eq!(o.frame().unwrap().total_waves(), 10);
    }

    #[test]
    fn zero_share_gets_zero_waves() {
        let b = bucket(&[("AAA", "A", 0.0), ("BBB", "A", 0.6), ("CCC", "A", 0.4)]);
        let o = allocate_bucket(&b, 5, TieBreak::StateCode).unwrap();
        assert_eq!(waves_of(&o), vec![("AAA".into(), 0), ("BBB".into(), 3), ("CCC".into(), 2)]);
    }

    #[test]
    fn empty_and_all_zero_buckets_are_no_data() {
        let empty = NormalizedBucket::empty(BucketKey::new(1999, 9));
        assert_eq!(
            allocate_bucket(&empty, 100, TieBreak::default()).unwrap(),
            FrameOutcome::NoData { key: BucketKey::new(1999, 9), reason: NoDataReason::NoRecords }
        );

        let zeros = bucket(&[("AAA", "A", 0.0), ("BBB", "A", 0.0)]);
        let o = allocate_bucket(&zeros, 100, TieBreak::default()).unwrap();
        assert!(matches!(o, FrameOutcome::NoData { reason: NoDataReason::ZeroTotal, .. }));
    }

    #[test]
    fn too_many_nonzero_states_is_infeasible() {
        let b = bucket(&[("AAA", "A", 0.4), ("BBB", "A", 0.3), ("CCC", "A", 0.3)]);
        assert_eq!(
            allocate_bucket(&b, 2, TieBreak::default()).unwrap_err(),
            AllocError::Infeasible { nonzero: 3, budget: 2 }
        );
    }

    #[test]
    fn zero_budget_draws_nothing() {
        let b = bucket(&[("AAA", "A", 0.4), ("BBB", "A", 0.6)]);
        let o = allocate_bucket(&b, 0, TieBreak::default()).unwrap();
        assert_eq!(o.frame().unwrap().total_waves(), 0);
    }
}
