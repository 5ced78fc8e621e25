//! AGGREGATE stage: raw records → per-(year, class) normalized share buckets.
//!
//! Two steps, kept apart so partial results compose:
//! - `RawAggregation::ingest` folds records into raw sums per (year, class, state);
//!   `merge` combines two partial aggregations as if their inputs were concatenated.
//! - `RawAggregation::normalize` divides each raw sum by its bucket total
//!   (a zero total is replaced by 1) and sorts years/classes ascending.
//!
//! Records are checked before anything is folded; one bad record aborts the
//! whole batch and leaves the accumulator untouched. Finite contributions can
//! still sum past `f64::MAX`; `normalize` rejects any bucket whose state sums
//! or total are no longer finite instead of emitting NaN or zero shares.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, warn};
use wv_core::{
    BucketKey, ClassNum, NormalizedBucket, RawRecord, ShareEntry, StateAggregate, StateCode, Year,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("malformed record #{index} ({state} {key}): {reason}")]
    MalformedRecord {
        index: usize,
        state: StateCode,
        key: BucketKey,
        reason: &'static str,
    },
    /// A raw sum (one state's, or the bucket total) overflowed to infinity.
    #[error("bucket {key}: raw sum of {} is not finite", .state.as_ref().map_or("all states", |s| s.as_str()))]
    Overflow {
        key: BucketKey,
        state: Option<StateCode>,
    },
}

/// Pre-normalization accumulator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawAggregation {
    buckets: BTreeMap<BucketKey, BTreeMap<StateCode, StateAggregate>>,
    years: BTreeSet<Year>,
    classes: BTreeSet<ClassNum>,
    /// Records folded so far; offsets record indices in error reports.
    ingested: usize,
}

/// Normalized output: share buckets plus the sorted selection axes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregation {
    pub buckets: BTreeMap<BucketKey, NormalizedBucket>,
    pub years: Vec<Year>,
    pub classes: Vec<ClassNum>,
}

/// One-shot convenience: ingest everything, then normalize.
pub fn aggregate(records: &[RawRecord]) -> Result<Aggregation, AggregateError> {
    let mut raw = RawAggregation::default();
    raw.ingest(records)?;
    raw.normalize()
}

impl RawAggregation {
    /// Fold a batch of records. All-or-nothing.
    pub fn ingest(&mut self, records: &[RawRecord]) -> Result<(), AggregateError> {
        for (i, r) in records.iter().enumerate() {
            check_record(self.ingested + i, r)?;
        }

        for r in records {
            let key = r.key();
            self.years.insert(key.year);
            self.classes.insert(key.class_num);
            self.buckets
                .entry(key)
                .or_default()
                .entry(r.state_code.clone())
                .or_insert_with(|| StateAggregate::seed(r))
                .absorb(r);
        }
        self.ingested += records.len();
        debug!(records = records.len(), buckets = self.buckets.len(), "ingested");
        Ok(())
    }

    /// Combine with an aggregation of records that came *after* ours.
    /// Raw sums add; `rank`/`missing_pct` take the later side.
    pub fn merge(&mut self, later: RawAggregation) {
        for (key, states) in later.buckets {
            let bucket = self.buckets.entry(key).or_default();
            for (code, agg) in states {
                match bucket.get_mut(&code) {
                    Some(mine) => {
                        mine.raw_sum += agg.raw_sum;
                        mine.rank = agg.rank;
                        mine.missing_pct = agg.missing_pct;
                    }
                    None => {
                        bucket.insert(code, agg);
                    }
                }
            }
        }
        self.years.extend(later.years);
        self.classes.extend(later.classes);
        self.ingested += later.ingested;
    }

    /// Raw sum for one (year, class, state), if seen.
    pub fn raw_sum(&self, key: BucketKey, state: &StateCode) -> Option<f64> {
        self.buckets.get(&key)?.get(state).map(|a| a.raw_sum)
    }

    pub fn state_aggregate(&self, key: BucketKey, state: &StateCode) -> Option<&StateAggregate> {
        self.buckets.get(&key)?.get(state)
    }

    pub fn keys(&self) -> impl Iterator<Item = BucketKey> + '_ {
        self.buckets.keys().copied()
    }

    pub fn ingested(&self) -> usize {
        self.ingested
    }

    /// Divide raw sums by bucket totals. Fails on the first bucket whose sums overflowed.
    pub fn normalize(&self) -> Result<Aggregation, AggregateError> {
        let mut buckets = BTreeMap::new();

        for (key, states) in &self.buckets {
            if let Some((code, _)) = states.iter().find(|(_, a)| !a.raw_sum.is_finite()) {
                return Err(AggregateError::Overflow { key: *key, state: Some(code.clone()) });
            }
            let mut total: f64 = states.values().map(|a| a.raw_sum).sum();
            if !total.is_finite() {
                return Err(AggregateError::Overflow { key: *key, state: None });
            }
            if total == 0.0 {
                warn!(bucket = %key, "bucket total is zero; shares collapse to 0");
                total = 1.0;
            }

            let entries = states
                .iter()
                .map(|(code, a)| {
                    (
                        code.clone(),
                        ShareEntry {
                            state_name: a.state_name.clone(),
                            subregion: a.subregion.clone(),
                            share: a.raw_sum / total,
                            rank: a.rank,
                            missing_pct: a.missing_pct,
                        },
                    )
                })
                .collect();

            buckets.insert(*key, NormalizedBucket { key: *key, entries });
        }

        Ok(Aggregation {
            buckets,
            years: self.years.iter().copied().collect(),
            classes: self.classes.iter().copied().collect(),
        })
    }
}

impl Aggregation {
    pub fn bucket(&self, key: BucketKey) -> Option<&NormalizedBucket> {
        self.buckets.get(&key)
    }

    /// Bucket for (year, class); an empty bucket when nothing matched.
    pub fn get_bucket(&self, year: Year, class_num: ClassNum) -> Cow<'_, NormalizedBucket> {
        let key = BucketKey::new(year, class_num);
        match self.buckets.get(&key) {
            Some(b) => Cow::Borrowed(b),
            None => Cow::Owned(NormalizedBucket::empty(key)),
        }
    }
}

fn check_record(index: usize, r: &RawRecord) -> Result<(), AggregateError> {
    let fail = |reason| AggregateError::MalformedRecord {
        index,
        state: r.state_code.clone(),
        key: r.key(),
        reason,
    };

    if !r.value_contribution_to_class.is_finite() {
        return Err(fail("value_contribution_to_class is not a finite number"));
    }
    if r.value_contribution_to_class < 0.0 {
        return Err(fail("value_contribution_to_class is negative"));
    }
    if !r.pct_missing_values.is_finite() {
        return Err(fail("pct_missing_values is not a finite number"));
    }
    if r.state_name.trim().is_empty() {
        return Err(fail("state_name is empty"));
    }
    Ok(())
}
