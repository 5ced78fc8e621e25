//! Domain records and per-bucket shapes.
//!
//! `RawRecord` is the wire-level observation (one per year/class/state/indicator).
//! `StateAggregate` is the per-(year, class, state) accumulator, and
//! `NormalizedBucket` the per-(year, class) share map handed to allocation.

use std::collections::BTreeMap;
use core::fmt;
use core::str::FromStr;

use crate::errors::CoreError;
use crate::tokens::StateCode;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub type Year = i32;
pub type ClassNum = i32;

/// One raw observation. Several records may share a (year, class, state) key.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawRecord {
    pub year: Year,
    pub class_num: ClassNum,
    pub state_code: StateCode,
    pub state_name: String,
    pub subregion_name: String,
    pub value_contribution_to_class: f64,
    pub state_rank_per_class: i32,
    pub pct_missing_values: f64,
}

impl RawRecord {
    pub fn key(&self) -> BucketKey {
        BucketKey { year: self.year, class_num: self.class_num }
    }
}

/// (year, class) bucket key. Orders by year, then class; renders as `"year|class"`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BucketKey {
    pub year: Year,
    pub class_num: ClassNum,
}

impl BucketKey {
    pub fn new(year: Year, class_num: ClassNum) -> Self {
        Self { year, class_num }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.year, self.class_num)
    }
}

impl FromStr for BucketKey {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, c) = s.split_once('|').ok_or_else(|| CoreError::InvalidKey(s.to_string()))?;
        let year = y.trim().parse().map_err(|_| CoreError::InvalidKey(s.to_string()))?;
        let class_num = c.trim().parse().map_err(|_| CoreError::InvalidKey(s.to_string()))?;
        Ok(Self { year, class_num })
    }
}

/// Per-(year, class, state) accumulator. `rank` and `missing_pct` are last-write-wins.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateAggregate {
    pub state_name: String,
    pub subregion: String,
    pub raw_sum: f64,
    pub rank: i32,
    pub missing_pct: f64,
}

impl StateAggregate {
    /// Fresh accumulator seeded from the first record seen for the key.
    pub fn seed(r: &RawRecord) -> Self {
        Self {
            state_name: r.state_name.clone(),
            subregion: r.subregion_name.clone(),
            raw_sum: 0.0,
            rank: r.state_rank_per_class,
            missing_pct: r.pct_missing_values,
        }
    }

    /// Fold one record in: sum the contribution, overwrite the carried fields.
    pub fn absorb(&mut self, r: &RawRecord) {
        self.raw_sum += r.value_contribution_to_class;
        self.rank = r.state_rank_per_class;
        self.missing_pct = r.pct_missing_values;
    }
}

/// Normalized per-state entry within a bucket.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShareEntry {
    pub state_name: String,
    pub subregion: String,
    /// Fraction of the bucket total, in [0, 1].
    pub share: f64,
    pub rank: i32,
    pub missing_pct: f64,
}

/// All normalized entries for one (year, class). May be empty.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NormalizedBucket {
    pub key: BucketKey,
    pub entries: BTreeMap<StateCode, ShareEntry>,
}

impl NormalizedBucket {
    pub fn empty(key: BucketKey) -> Self {
        Self { key, entries: BTreeMap::new() }
    }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn get(&self, code: &StateCode) -> Option<&ShareEntry> { self.entries.get(code) }

    pub fn iter(&self) -> impl Iterator<Item = (&StateCode, &ShareEntry)> {
        self.entries.iter()
    }

    pub fn share_sum(&self) -> f64 {
        self.entries.values().map(|e| e.share).sum()
    }

    pub fn nonzero_count(&self) -> usize {
        self.entries.values().filter(|e| e.share > 0.0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(v: f64, rank: i32) -> RawRecord {
        RawRecord {
            year: 2021,
            class_num: 2,
            state_code: "WA".parse().unwrap(),
            state_name: "Western Australia".into(),
            subregion_name: "Australia".into(),
            value_contribution_to_class: v,
            state_rank_per_class: rank,
            pct_missing_values: 0.0,
        }
    }

    #[test]
    fn bucket_key_display_and_parse() {
        let k = BucketKey::new(2019, 4);
        assert_eq!(k.to_string(), "2019|4");
        assert_eq!("2019|4".parse::<BucketKey>().unwrap(), k);
        assert!("2019-4".parse::<BucketKey>().is_err());
        assert!("x|4".parse::<BucketKey>().is_err());
    }

    #[test]
    fn bucket_key_orders_by_year_then_class() {
        let mut keys = vec![BucketKey::new(2020, 1), BucketKey::new(2019, 3), BucketKey::new(2019, 1)];
        keys.sort();
        assert_eq!(keys, vec![BucketKey::new(2019, 1), BucketKey::new(2019, 3), BucketKey::new(2020, 1)]);
    }

    #[test]
    fn absorb_sums_and_overwrites() {
        let first = rec(1.5, 3);
        let mut agg = StateAggregate::seed(&first);
        agg.absorb(&first);
        agg.absorb(&rec(2.0, 7));
        assert_eq!(agg.raw_sum, 3.5);
        assert_eq!(agg.rank, 7);
    }
}
