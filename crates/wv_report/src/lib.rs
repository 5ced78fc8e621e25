//! wv_report: pure offline report model + renderers (JSON/HTML).
//!
//! Determinism rules:
//! - No network, no I/O here. Callers supply artifacts already in memory.
//! - The renderer reads the artifacts only; nothing is recomputed.
//! - Percent strings use one-decimal formatting.
//! - Groups are ordered by subregion name; rows keep the waves.json slot order.

#![deny(unsafe_code)]

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use wv_pipeline::{hover::format_share_pct, FrameStatus, RunRecordDoc, WavesDoc};

pub mod render_html;
pub mod render_json;

pub use render_html::render_html;
pub use render_json::render_report_json;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("inconsistent artifacts: {0}")]
    Inconsistent(String),
}

// ===== Model =====

#[derive(Clone, Debug, Serialize)]
pub struct ReportModel {
    pub cover: SectionCover,
    pub groups: Vec<SubregionGroup>,
    /// Present when the selection has nothing to draw.
    pub notice: Option<String>,
    pub integrity: SectionIntegrity,
}

#[derive(Clone, Debug, Serialize)]
pub struct SectionCover {
    pub title: String,
    pub selection: String,
    pub year: i32,
    pub class_num: i32,
    pub budget: u32,
    pub total_waves: u32,
    pub tie_break: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SubregionGroup {
    pub subregion: String,
    pub waves: u32,
    pub rows: Vec<ReportRow>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReportRow {
    pub state_code: String,
    pub state_name: String,
    pub share_pct: String,
    pub rank: i32,
    pub missing_pct: String,
    pub waves: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct SectionIntegrity {
    pub waves_id: String,
    pub run_id: String,
    pub records_sha256: String,
    pub record_count: usize,
    pub params_sha256: String,
    pub engine: String,
}

// ===== API =====

/// Build the report model from the two run artifacts.
pub fn build_model(waves: &WavesDoc, run: &RunRecordDoc) -> Result<ReportModel, ReportError> {
    if run.outputs.waves_id != waves.id {
        return Err(ReportError::Inconsistent(format!(
            "run record points at {}, waves doc is {}",
            run.outputs.waves_id, waves.id
        )));
    }
    if run.selection != waves.key().to_string() {
        return Err(ReportError::Inconsistent(format!(
            "run record selection {} does not match waves {}",
            run.selection,
            waves.key()
        )));
    }

    let cover = SectionCover {
        title: format!("Wave shares, {} class {}", waves.year, waves.class_num),
        selection: waves.key().to_string(),
        year: waves.year,
        class_num: waves.class_num,
        budget: waves.budget,
        total_waves: waves.total_waves,
        tie_break: waves.tie_break.as_token().to_string(),
    };

    let mut by_sub: BTreeMap<&str, SubregionGroup> = BTreeMap::new();
    for s in &waves.slots {
        let g = by_sub.entry(s.subregion.as_str()).or_insert_with(|| SubregionGroup {
            subregion: s.subregion.clone(),
            waves: 0,
            rows: Vec::new(),
        });
        g.waves += s.waves;
        g.rows.push(ReportRow {
            state_code: s.state_code.to_string(),
            state_name: s.state_name.clone(),
            share_pct: format_share_pct(s.share),
            rank: s.rank,
            missing_pct: format!("{:.1}%", s.missing_pct),
            waves: s.waves,
        });
    }

    let notice = match waves.status {
        FrameStatus::Waves => None,
        FrameStatus::NoData => Some(format!(
            "No data for {} class {}.",
            waves.year, waves.class_num
        )),
    };

    let e = &run.engine;
    let integrity = SectionIntegrity {
        waves_id: waves.id.clone(),
        run_id: run.id.clone(),
        records_sha256: run.inputs.records_sha256.clone(),
        record_count: run.inputs.record_count,
        params_sha256: run.inputs.params_sha256.clone(),
        engine: format!("{}/{} v{} ({})", e.vendor, e.name, e.version, e.build),
    };

    Ok(ReportModel { cover, groups: by_sub.into_values().collect(), notice, integrity })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use wv_core::{BucketKey, Params, TieBreak};
    use wv_pipeline::{
        build_run_record, build_waves_doc, engine_identifiers, FrameOutcome, NoDataReason,
        RunRecordDoc, WaveFrame, WaveSlot, WavesDoc,
    };

    fn slot(code: &str, name: &str, sub: &str, share: f64, waves: u32) -> WaveSlot {
        WaveSlot {
            state_code: code.parse().unwrap(),
            state_name: name.into(),
            subregion: sub.into(),
            share,
            rank: 1,
            missing_pct: 0.0,
            waves,
        }
    }

    pub fn drawn() -> (WavesDoc, RunRecordDoc) {
        let outcome = FrameOutcome::Waves(WaveFrame {
            key: BucketKey::new(2022, 2),
            budget: 10,
            tie_break: TieBreak::SubregionThenName,
            slots: vec![
                slot("NSW", "New South Wales", "Australia", 0.5, 5),
                slot("VIC", "Victoria", "Australia", 0.2, 2),
                slot("FJI", "Fiji", "Melanesia", 0.2, 2),
                slot("TON", "Tonga <Kingdom>", "Polynesia", 0.1, 1),
            ],
        });
        finish(outcome)
    }

    pub fn empty() -> (WavesDoc, RunRecordDoc) {
        finish(FrameOutcome::NoData { key: BucketKey::new(1990, 3), reason: NoDataReason::NoRecords })
    }

    fn finish(outcome: FrameOutcome) -> (WavesDoc, RunRecordDoc) {
        let p = Params { budget: 10, ..Params::default() };
        let w = build_waves_doc(&outcome, &p).unwrap();
        let r = build_run_record(&engine_identifiers(), &"b".repeat(64), 4, &p, &w).unwrap();
        (w, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_by_subregion_and_keeps_slot_order() {
        let (w, r) = fixtures::drawn();
        let m = build_model(&w, &r).unwrap();
        let subs: Vec<&str> = m.groups.iter().map(|g| g.subregion.as_str()).collect();
        assert_eq!(subs, vec!["Australia", "Melanesia", "Polynesia"]);
        assert_eq!(m.groups[0].waves, 7);
        assert_eq!(m.groups[0].rows[1].state_name, "Victoria");
        assert_eq!(m.groups[0].rows[0].share_pct, "50.0%");
        assert!(m.notice.is_none());
        assert_eq!(m.cover.total_waves, 10);
    }

    #[test]
    fn no_data_has_notice() {
        let (w, r) = fixtures::empty();
        let m = build_model(&w, &r).unwrap();
        assert!(m.groups.is_empty());
        assert_eq!(m.notice.as_deref(), Some("No data for 1990 class 3."));
    }

    #[test]
    fn mismatched_artifacts_are_rejected() {
        let (w, _) = fixtures::drawn();
        let (_, r) = fixtures::empty();
        assert!(matches!(build_model(&w, &r), Err(ReportError::Inconsistent(_))));
    }
}
