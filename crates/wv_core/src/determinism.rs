//! Determinism utilities: stable ordering of bucket entries.
//!
//! The allocator walks entries in the order produced here; that order only
//! decides how rounding ties resolve, never the totals.

use core::cmp::Ordering;

use crate::entities::{NormalizedBucket, ShareEntry};
use crate::tokens::StateCode;
use crate::variables::TieBreak;

/* -------------------------------------------------------------------------- */
/*                               Stable Ordering                              */
/* -------------------------------------------------------------------------- */

/// Compare two bucket entries under `tie`. Always total: falls back to the state code.
pub fn cmp_entries(
    tie: TieBreak,
    a: (&StateCode, &ShareEntry),
    b: (&StateCode, &ShareEntry),
) -> Ordering {
    let primary = match tie {
        TieBreak::SubregionThenName => a
            .1
            .subregion
            .cmp(&b.1.subregion)
            .then_with(|| a.1.state_name.cmp(&b.1.state_name)),
        TieBreak::StateCode => Ordering::Equal,
    };
    primary.then_with(|| a.0.as_str().cmp(b.0.as_str()))
}

/// Materialize a bucket's entries in allocation order.
pub fn ordered_entries(bucket: &NormalizedBucket, tie: TieBreak) -> Vec<(&StateCode, &ShareEntry)> {
    let mut xs: Vec<(&StateCode, &ShareEntry)> = bucket.iter().collect();
    xs.sort_by(|a, b| cmp_entries(tie, *a, *b));
    xs
}
