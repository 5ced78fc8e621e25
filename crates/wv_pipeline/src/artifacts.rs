// crates/wv_pipeline/src/artifacts.rs
//
// Typed mirrors of the two artifacts a run produces:
// - waves.json       (WavesDoc)     id = "WAV:" + sha256(canonical doc without id)
// - run_record.json  (RunRecordDoc) id = "RUN:" + first 16 hex of sha256(canonical record without id)
//
// Rules:
// • Slot order inside waves.json is the allocation order (tie-break order).
// • Both ids are computed through wv_io::hasher over canonical JSON, so the
//   same inputs always produce byte-identical artifacts.
// • No wall-clock timestamps are recorded.

use serde::{Deserialize, Serialize};
use wv_core::{BucketKey, ClassNum, Params, TieBreak, Year};
use wv_io::{canonical_json, hasher};

use crate::allocate::{FrameOutcome, NoDataReason, WaveSlot};
use crate::{EngineMeta, PipelineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    Waves,
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavesDoc {
    pub id: String,
    pub year: Year,
    pub class_num: ClassNum,
    pub budget: u32,
    pub tie_break: TieBreak,
    pub status: FrameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_data_reason: Option<NoDataReason>,
    pub total_waves: u32,
    pub slots: Vec<WaveSlot>,
}

impl WavesDoc {
    pub fn key(&self) -> BucketKey {
        BucketKey::new(self.year, self.class_num)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecordDoc {
    pub id: String,
    pub engine: EngineMeta,
    pub inputs: RunInputs,
    pub params: Params,
    pub selection: String,
    pub outputs: RunOutputs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInputs {
    pub records_sha256: String,
    pub record_count: usize,
    pub params_sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutputs {
    pub waves_id: String,
    pub waves_sha256: String,
}

/// Build `waves.json` for one outcome. `params` supplies budget and tie-break
/// for the no-data case, where there is no frame to read them from.
pub fn build_waves_doc(outcome: &FrameOutcome, params: &Params) -> Result<WavesDoc, PipelineError> {
    let key = outcome.key();
    let (budget, tie_break, status, no_data_reason, slots) = match outcome {
        FrameOutcome::Waves(f) => (f.budget, f.tie_break, FrameStatus::Waves, None, f.slots.clone()),
        FrameOutcome::NoData { reason, .. } => (
            params.budget,
            params.tie_break,
            FrameStatus::NoData,
            Some(*reason),
            Vec::new(),
        ),
    };
    let total_waves = slots.iter().map(|s| s.waves).sum();

    let mut doc = WavesDoc {
        id: String::new(),
        year: key.year,
        class_num: key.class_num,
        budget,
        tie_break,
        status,
        no_data_reason,
        total_waves,
        slots,
    };
    doc.id = hasher::wav_id_from_canonical(&WavesNoId::from(&doc))?;
    Ok(doc)
}

/// Build `run_record.json` around an already-built waves doc.
pub fn build_run_record(
    engine: &EngineMeta,
    records_sha256: &str,
    record_count: usize,
    params: &Params,
    waves: &WavesDoc,
) -> Result<RunRecordDoc, PipelineError> {
    let waves_bytes = canonical_json::to_canonical_bytes(waves)?;

    let mut rec = RunRecordDoc {
        id: String::new(),
        engine: engine.clone(),
        inputs: RunInputs {
            records_sha256: records_sha256.to_string(),
            record_count,
            params_sha256: hasher::sha256_canonical(params)?,
        },
        params: params.clone(),
        selection: waves.key().to_string(),
        outputs: RunOutputs {
            waves_id: waves.id.clone(),
            waves_sha256: hasher::sha256_hex(&waves_bytes),
        },
    };
    rec.id = hasher::run_id_from_canonical(&RunNoId::from(&rec))?;
    Ok(rec)
}

// ----- id-less views used for hashing -----

#[derive(Serialize)]
struct WavesNoId<'a> {
    year: Year,
    class_num: ClassNum,
    budget: u32,
    tie_break: TieBreak,
    status: FrameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    no_data_reason: Option<NoDataReason>,
    total_waves: u32,
    slots: &'a [WaveSlot],
}

impl<'a> From<&'a WavesDoc> for WavesNoId<'a> {
    fn from(d: &'a WavesDoc) -> Self {
        Self {
            year: d.year,
            class_num: d.class_num,
            budget: d.budget,
            tie_break: d.tie_break,
            status: d.status,
            no_data_reason: d.no_data_reason,
            total_waves: d.total_waves,
            slots: &d.slots,
        }
    }
}

#[derive(Serialize)]
struct RunNoId<'a> {
    engine: &'a EngineMeta,
    inputs: &'a RunInputs,
    params: &'a Params,
    selection: &'a str,
    outputs: &'a RunOutputs,
}

impl<'a> From<&'a RunRecordDoc> for RunNoId<'a> {
    fn from(r: &'a RunRecordDoc) -> Self {
        Self {
            engine: &r.engine,
            inputs: &r.inputs,
            params: &r.params,
            selection: &r.selection,
            outputs: &r.outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocate::WaveFrame;

    fn outcome() -> FrameOutcome {
        FrameOutcome::Waves(WaveFrame {
            key: BucketKey::new(2021, 3),
            budget: 4,
            tie_break: TieBreak::StateCode,
            slots: vec![
                WaveSlot {
                    state_code: "ACT".parse().unwrap(),
                    state_name: "Australian Capital Territory".into(),
                    subregion: "Australia".into(),
                    share: 0.25,
                    rank: 2,
                    missing_pct: 0.0,
                    waves: 1,
                },
                WaveSlot {
                    state_code: "QLD".parse().unwrap(),
                    state_name: "Queensland".into(),
                    subregion: "Australia".into(),
                    share: 0.75,
                    rank: 1,
                    missing_pct: 1.5,
                    waves: 3,
                },
            ],
        })
    }

    #[test]
    fn waves_id_is_stable_and_content_addressed() {
        let p = Params::default();
        let a = build_waves_doc(&outcome(), &p).unwrap();
        let b = build_waves_doc(&outcome(), &p).unwrap();
        assert_eq!(a, b);
        assert!(a.id.starts_with("WAV:"));
        assert_eq!(a.total_waves, 4);

        let mut other = outcome();
        if let FrameOutcome::Waves(f) = &mut other {
            f.slots[0].rank = 9;
        }
        assert_ne!(build_waves_doc(&other, &p).unwrap().id, a.id);
    }

    #[test]
    fn no_data_doc_has_reason_and_no_slots() {
        let o = FrameOutcome::NoData { key: BucketKey::new(2000, 1), reason: NoDataReason::NoRecords };
        let d = build_waves_doc(&o, &Params::default()).unwrap();
        assert_eq!(d.status, FrameStatus::NoData);
        assert_eq!(d.no_data_reason, Some(NoDataReason::NoRecords));
        assert!(d.slots.is_empty());
        assert_eq!(d.budget, 100);

        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["status"], "no_data");
        assert_eq!(v["no_data_reason"], "no_records");
    }

    #[test]
    fn run_record_links_waves() {
        let p = Params::default();
        let w = build_waves_doc(&outcome(), &p).unwrap();
        let r = build_run_record(&crate::engine_identifiers(), &"a".repeat(64), 2, &p, &w).unwrap();
        assert!(r.id.starts_with("RUN:") && r.id.len() == 20);
        assert_eq!(r.outputs.waves_id, w.id);
        assert_eq!(r.selection, "2021|3");
        assert_eq!(r.inputs.record_count, 2);
    }
}
