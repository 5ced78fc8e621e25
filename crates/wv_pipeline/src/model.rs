//! `WaveModel`: the aggregated data set behind a wave view.
//!
//! Built once from the record set; every selection afterwards is a lookup plus
//! one allocation. Frames are self-checked before they are handed out.

use std::borrow::Cow;

use tracing::debug;
use wv_core::{
    variables::DEFAULT_SHARE_TOLERANCE, BucketKey, ClassNum, NormalizedBucket, Params, RawRecord,
    TieBreak, Year,
};

use crate::aggregate::{aggregate, AggregateError, Aggregation};
use crate::allocate::{allocate_bucket, FrameOutcome, WaveFrame};
use crate::PipelineError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveModel {
    aggregation: Aggregation,
}

impl WaveModel {
    pub fn from_records(records: &[RawRecord]) -> Result<Self, AggregateError> {
        let aggregation = aggregate(records)?;
        debug!(
            years = aggregation.years.len(),
            classes = aggregation.classes.len(),
            buckets = aggregation.buckets.len(),
            "model built"
        );
        Ok(Self { aggregation })
    }

    pub fn from_aggregation(aggregation: Aggregation) -> Self {
        Self { aggregation }
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> &[Year] {
        &self.aggregation.years
    }

    /// Distinct classes, ascending.
    pub fn classes(&self) -> &[ClassNum] {
        &self.aggregation.classes
    }

    pub fn aggregation(&self) -> &Aggregation {
        &self.aggregation
    }

    /// Normalized bucket for (year, class); empty when no record matched.
    pub fn get_bucket(&self, year: Year, class_num: ClassNum) -> Cow<'_, NormalizedBucket> {
        self.aggregation.get_bucket(year, class_num)
    }

    /// Allocate one selection with the default share tolerance.
    pub fn frame(
        &self,
        year: Year,
        class_num: ClassNum,
        budget: u32,
        tie_break: TieBreak,
    ) -> Result<FrameOutcome, PipelineError> {
        self.frame_checked(BucketKey::new(year, class_num), budget, tie_break, DEFAULT_SHARE_TOLERANCE)
    }

    /// Allocate one selection using every knob in `params`.
    pub fn frame_for(&self, key: BucketKey, params: &Params) -> Result<FrameOutcome, PipelineError> {
        self.frame_checked(key, params.budget, params.tie_break, params.share_tolerance)
    }

    fn frame_checked(
        &self,
        key: BucketKey,
        budget: u32,
        tie_break: TieBreak,
        tolerance: f64,
    ) -> Result<FrameOutcome, PipelineError> {
        let bucket = self.get_bucket(key.year, key.class_num);
        let outcome = allocate_bucket(&bucket, budget, tie_break)?;
        if let FrameOutcome::Waves(frame) = &outcome {
            verify_frame(frame, tolerance)?;
        }
        Ok(outcome)
    }
}

/// Post-allocation checks: waves add up to the budget, shares add up to one.
pub fn verify_frame(frame: &WaveFrame, tolerance: f64) -> Result<(), PipelineError> {
    let total = frame.total_waves();
    if total != frame.budget {
        return Err(PipelineError::SelfVerify(format!(
            "{}: waves sum to {total}, budget is {}",
            frame.key, frame.budget
        )));
    }
    let sum = frame.share_sum();
    if (sum - 1.0).abs() > tolerance {
        return Err(PipelineError::SelfVerify(format!(
            "{}: shares sum to {sum}, expected 1 within {tolerance}",
            frame.key
        )));
    }
    if let Some(bad) = frame.slots.iter().find(|s| (s.share > 0.0) != (s.waves > 0) && frame.budget > 0) {
        return Err(PipelineError::SelfVerify(format!(
            "{}: {} has share {} but {} waves",
            frame.key, bad.state_code, bad.share, bad.waves
        )));
    }
    Ok(())
}
