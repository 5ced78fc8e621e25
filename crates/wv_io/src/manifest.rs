// crates/wv_io/src/manifest.rs
//
// Scope:
// - External manifest type (input paths + optional expectations)
// - Validation of shape & offline policy
// - Path resolution against the manifest's directory + existence/type checks
//
// Rules:
// • Required input: records_path. Optional: params_path.
// • Offline-only: reject any path with a scheme ("://").
// • A records digest (if provided) must be 64-lower-hex; it is checked by the loader
//   against the raw bytes of the records file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::hasher::is_hex64;
use crate::{looks_like_url_strict, IoError, IoResult};

/// External manifest accepted by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Optional user-provided identifier (not used in any artifact).
    #[serde(default)]
    pub id: Option<String>,

    /// Record set (JSON array of raw records), commonly relative to the manifest's directory.
    pub records_path: String,

    /// Optional parameter set.
    #[serde(default)]
    pub params_path: Option<String>,

    #[serde(default)]
    pub expect: Option<Expectations>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectations {
    /// Expected SHA-256 of the records file bytes (lowercase 64-hex).
    #[serde(default)]
    pub records_sha256: Option<String>,
}

/// Paths resolved against the manifest's directory.
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub records_path: PathBuf,
    pub params_path: Option<PathBuf>,
    pub expect: Expectations,
}

/// Read and shape-check a manifest file.
pub fn load_manifest(path: &Path) -> IoResult<Manifest> {
    let bytes = fs::read(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let man: Manifest = serde_json::from_slice(&bytes)?;
    validate_manifest(&man)?;
    Ok(man)
}

/// Shape & offline checks (no filesystem access).
pub fn validate_manifest(man: &Manifest) -> IoResult<()> {
    check_path_field("records_path", &man.records_path)?;
    if let Some(p) = &man.params_path {
        check_path_field("params_path", p)?;
    }
    if let Some(hex) = man.expect.as_ref().and_then(|e| e.records_sha256.as_deref()) {
        if !is_hex64(hex) {
            return Err(IoError::Manifest(format!(
                "expect.records_sha256 must be lowercase 64-hex: {hex}"
            )));
        }
    }
    Ok(())
}

fn check_path_field(key: &'static str, value: &str) -> IoResult<()> {
    if value.trim().is_empty() {
        return Err(IoError::Manifest(format!("field must not be empty: {key}")));
    }
    if looks_like_url_strict(value) {
        return Err(IoError::Manifest(format!(
            "path must be offline (no scheme) for {key}: {value}"
        )));
    }
    Ok(())
}

/// Resolve manifest paths relative to `manifest_path`'s directory and check they are files.
pub fn resolve_paths(manifest_path: &Path, man: &Manifest) -> IoResult<ResolvedManifest> {
    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));

    let records_path = resolve_one(base, "records_path", &man.records_path)?;
    let params_path = man
        .params_path
        .as_deref()
        .map(|p| resolve_one(base, "params_path", p))
        .transpose()?;

    Ok(ResolvedManifest {
        records_path,
        params_path,
        expect: man.expect.clone().unwrap_or_default(),
    })
}

fn resolve_one(base: &Path, key: &'static str, value: &str) -> IoResult<PathBuf> {
    let p = Path::new(value);
    let full = if p.is_absolute() { p.to_path_buf() } else { base.join(p) };
    let meta = fs::metadata(&full)
        .map_err(|e| IoError::Manifest(format!("cannot access {key}: {} ({e})", full.display())))?;
    if !meta.is_file() {
        return Err(IoError::Manifest(format!("{key} is not a file: {}", full.display())));
    }
    Ok(full)
}
