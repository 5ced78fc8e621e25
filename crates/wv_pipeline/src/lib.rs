//! wv_pipeline: deterministic pipeline surface (load → aggregate → allocate → self-check → artifacts).
//!
//! This crate stays free of file writes: JSON, hashing and input loading go
//! through `wv_io`, the allocation math through `wv_algo`. Interactive pieces
//! (`view`, `hover`) are pure functions a host UI drives.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use wv_core::{variables, BucketKey};
use wv_io::loader::{self, LoadedInputs};

pub mod aggregate;
pub mod allocate;
pub mod artifacts;
pub mod hover;
pub mod model;
pub mod view;

pub use aggregate::{aggregate, AggregateError, Aggregation, RawAggregation};
pub use allocate::{allocate_bucket, FrameOutcome, NoDataReason, WaveFrame, WaveSlot};
pub use artifacts::{build_run_record, build_waves_doc, FrameStatus, RunRecordDoc, WavesDoc};
pub use hover::{hover, HoverInstruction, PointerEvent, Tooltip};
pub use model::{verify_frame, WaveModel};
pub use view::{update, Action, ViewState};

/// Engine identifiers recorded in every run record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMeta {
    pub vendor: String,
    pub name: String,
    pub version: String,
    pub build: String,
}

/// Single error surface for pipeline orchestration.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Io(#[from] wv_io::IoError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("allocate: {0}")]
    Allocate(#[from] wv_algo::AllocError),
    #[error("self-verify: {0}")]
    SelfVerify(String),
    #[error("validate: {0}")]
    Validate(String),
}

/// Loaded inputs plus the requested selection. `selection: None` means the
/// view's initial selection (first year, first class).
#[derive(Debug)]
pub struct PipelineCtx {
    pub loaded: LoadedInputs,
    pub engine_meta: EngineMeta,
    pub selection: Option<BucketKey>,
}

#[derive(Debug)]
pub struct PipelineOutputs {
    pub model: WaveModel,
    pub outcome: FrameOutcome,
    pub waves: WavesDoc,
    pub run_record: RunRecordDoc,
}

// ------------------------------------ Public API ------------------------------------

/// Run every stage on preloaded inputs.
pub fn run_with_ctx(ctx: PipelineCtx) -> Result<PipelineOutputs, PipelineError> {
    let params = &ctx.loaded.params;
    variables::validate_domains(params).map_err(|e| PipelineError::Validate(e.to_string()))?;

    // --- AGGREGATE ---
    let model = WaveModel::from_records(&ctx.loaded.records)?;

    // --- SELECT ---
    let key = match ctx.selection {
        Some(k) => k,
        None => ViewState::initial(params)
            .selection(model.years(), model.classes())
            .ok_or_else(|| PipelineError::Validate("record set is empty; nothing to select".into()))?,
    };
    debug!(selection = %key, budget = params.budget, "selected");

    // --- ALLOCATE + SELF-VERIFY ---
    let outcome = model.frame_for(key, params)?;

    // --- ARTIFACTS ---
    let waves = build_waves_doc(&outcome, params)?;
    let run_record = build_run_record(
        &ctx.engine_meta,
        &ctx.loaded.digests.records_sha256,
        ctx.loaded.records.len(),
        params,
        &waves,
    )?;
    debug!(waves_id = %waves.id, run_id = %run_record.id, "artifacts built");

    Ok(PipelineOutputs { model, outcome, waves, run_record })
}

/// Load via a manifest, then run.
pub fn run_from_manifest_path<P: AsRef<Path>>(
    path: P,
    selection: Option<BucketKey>,
) -> Result<PipelineOutputs, PipelineError> {
    let loaded = loader::load_from_manifest(path.as_ref())?;
    run_with_ctx(PipelineCtx { loaded, engine_meta: engine_identifiers(), selection })
}

/// Engine identifiers for use in RunRecord.
pub fn engine_identifiers() -> EngineMeta {
    EngineMeta {
        vendor: "wv".to_string(),
        name: "wave_engine".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: "dev".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const RECORDS: &str = r#"[
      {"year":2021,"class_num":1,"state_code":"NSW","state_name":"New South Wales","subregion_name":"Australia",
       "value_contribution_to_class":3.0,"state_rank_per_class":1,"pct_missing_values":0.0},
      {"year":2021,"class_num":1,"state_code":"TAS","state_name":"Tasmania","subregion_name":"Australia",
       "value_contribution_to_class":1.0,"state_rank_per_class":2,"pct_missing_values":4.0},
      {"year":2020,"class_num":2,"state_code":"NSW","state_name":"New South Wales","subregion_name":"Australia",
       "value_contribution_to_class":1.0,"state_rank_per_class":1,"pct_missing_values":0.0}
    ]"#;

    fn write_inputs(dir: &Path) -> std::path::PathBuf {
        fs::write(dir.join("records.json"), RECORDS).unwrap();
        fs::write(dir.join("params.json"), r#"{"budget": 8}"#).unwrap();
        let m = dir.join("manifest.json");
        fs::write(&m, r#"{"records_path":"records.json","params_path":"params.json"}"#).unwrap();
        m
    }

    #[test]
    fn default_selection_is_first_year_and_class() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_from_manifest_path(write_inputs(dir.path()), None).unwrap();
        assert_eq!(out.waves.key(), BucketKey::new(2020, 1));
        assert_eq!(out.waves.status, FrameStatus::NoData);
    }

    #[test]
    fn explicit_selection_allocates() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_from_manifest_path(write_inputs(dir.path()), Some(BucketKey::new(2021, 1))).unwrap();
        assert_eq!(out.waves.status, FrameStatus::Waves);
        assert_eq!(out.waves.total_waves, 8);
        let waves: Vec<u32> = out.waves.slots.iter().map(|s| s.waves).collect();
        assert_eq!(waves, vec![6, 2]);
        assert_eq!(out.run_record.outputs.waves_id, out.waves.id);
        assert_eq!(out.model.years(), &[2020, 2021]);
    }

    #[test]
    fn same_inputs_same_ids() {
        let dir = tempfile::tempdir().unwrap();
        let m = write_inputs(dir.path());
        let a = run_from_manifest_path(&m, Some(BucketKey::new(2021, 1))).unwrap();
        let b = run_from_manifest_path(&m, Some(BucketKey::new(2021, 1))).unwrap();
        assert_eq!(a.waves.id, b.waves.id);
        assert_eq!(a.run_record.id, b.run_record.id);
    }

    #[test]
    fn empty_record_set_without_selection_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("records.json"), "[]").unwrap();
        let m = dir.path().join("manifest.json");
        fs::write(&m, r#"{"records_path":"records.json"}"#).unwrap();
        assert!(matches!(run_from_manifest_path(&m, None), Err(PipelineError::Validate(_))));

        let out = run_from_manifest_path(&m, Some(BucketKey::new(2020, 1))).unwrap();
        assert_eq!(out.waves.status, FrameStatus::NoData);
    }
}
