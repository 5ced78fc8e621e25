//! Loader: read local JSON artifacts (manifest → records → params), check every
//! raw record at the ingestion boundary, and return a typed `LoadedInputs` for
//! the pipeline. No network I/O.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use wv_core::{
    variables::{self, Params},
    RawRecord,
};

use crate::{hasher, manifest as man, IoError, IoResult};

/// Hard cap on any single input file.
pub const MAX_INPUT_BYTES: u64 = 64 * 1024 * 1024;

// ----------------------------- Public types -----------------------------

/// Digests of the inputs, echoed into the run record.
#[derive(Debug, Clone)]
pub struct InputDigests {
    /// SHA-256 of the records file bytes.
    pub records_sha256: String,
}

/// Loaded, checked context for the pipeline.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub records_path: PathBuf,
    pub records: Vec<RawRecord>,
    pub params: Params,
    pub digests: InputDigests,
}

// ----------------------------- Orchestration -----------------------------

/// Load everything named by a manifest file: manifest → records → params (+ digest expectation).
pub fn load_from_manifest(path: &Path) -> IoResult<LoadedInputs> {
    let m = man::load_manifest(path)?;
    let resolved = man::resolve_paths(path, &m)?;

    let loaded = load_from_paths(&resolved.records_path, resolved.params_path.as_deref())?;

    if let Some(want) = resolved.expect.records_sha256.as_deref() {
        if want != loaded.digests.records_sha256 {
            return Err(IoError::Expect(format!(
                "records_sha256 mismatch: expected {want}, got {}",
                loaded.digests.records_sha256
            )));
        }
    }
    Ok(loaded)
}

/// Load from explicit paths. Without a params file the defaults apply.
pub fn load_from_paths(records_path: &Path, params_path: Option<&Path>) -> IoResult<LoadedInputs> {
    let bytes = read_bytes_with_limits(records_path)?;
    let records_sha256 = hasher::sha256_hex(&bytes);
    let records = parse_records(&bytes)?;
    debug!(count = records.len(), path = %records_path.display(), "records loaded");

    let params = match params_path {
        Some(p) => load_params(p)?,
        None => Params::default(),
    };

    Ok(LoadedInputs {
        records_path: records_path.to_path_buf(),
        records,
        params,
        digests: InputDigests { records_sha256 },
    })
}

// ----------------------------- Targeted loaders -----------------------------

/// Parse a record set: a JSON array of flat objects. Each element is checked on its own
/// so the first bad one is reported with its position.
pub fn parse_records(bytes: &[u8]) -> IoResult<Vec<RawRecord>> {
    let v: Value = serde_json::from_slice(bytes)?;
    let items = match v {
        Value::Array(items) => items,
        other => {
            return Err(IoError::Json {
                pointer: "/".into(),
                msg: format!("expected an array of records, found {}", json_kind(&other)),
            })
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let state = item
            .get("state_code")
            .and_then(Value::as_str)
            .map(str::to_string);
        let rec: RawRecord = serde_json::from_value(item)
            .map_err(|e| IoError::MalformedRecord { index, state, msg: e.to_string() })?;
        out.push(rec);
    }
    Ok(out)
}

/// Read a parameter set and check its domains.
pub fn load_params(path: &Path) -> IoResult<Params> {
    let bytes = read_bytes_with_limits(path)?;
    let params: Params = serde_json::from_slice(&bytes).map_err(|e| IoError::Json {
        pointer: "/".into(),
        msg: format!("{}: {e}", path.display()),
    })?;
    variables::validate_domains(&params).map_err(|e| IoError::Params(e.to_string()))?;
    Ok(params)
}

// ----------------------------- Helpers -----------------------------

fn read_bytes_with_limits(path: &Path) -> IoResult<Vec<u8>> {
    let f = File::open(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let len = f.metadata()?.len();
    if len > MAX_INPUT_BYTES {
        return Err(IoError::Limit(format!(
            "{} is {len} bytes (max {MAX_INPUT_BYTES})",
            path.display()
        )));
    }
    let mut buf = Vec::with_capacity(len as usize);
    f.take(MAX_INPUT_BYTES + 1).read_to_end(&mut buf)?;
    Ok(buf)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
