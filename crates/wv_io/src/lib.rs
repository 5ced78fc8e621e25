//! crates/wv_io/src/lib.rs
//! Minimal, single-source-of-truth I/O crate.
//!
//! - File modules hold the logic; this file only wires them and the shared error.
//! - Shared error type (`IoError`) with `From` conversions used across modules.
//! - Offline only: any `<scheme>://` path is rejected before touching the filesystem.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for wv_io (used by canonical_json/manifest/hasher/loader).
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, create_dir_all, rename, fsync, etc.)
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON serialization/deserialization errors with a JSON Pointer.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// A raw record is missing a field or carries a non-numeric number.
    #[error("malformed record #{index}{}: {msg}", .state.as_deref().map(|s| format!(" ({s})")).unwrap_or_default())]
    MalformedRecord {
        index: usize,
        state: Option<String>,
        msg: String,
    },

    /// Parameter set fails domain checks.
    #[error("params: {0}")]
    Params(String),

    /// Manifest shape / path resolution failures.
    #[error("manifest: {0}")]
    Manifest(String),

    /// Declared expectation (e.g. records digest) does not match.
    #[error("expect: {0}")]
    Expect(String),

    /// Hashing-related errors.
    #[error("hash error: {0}")]
    Hash(String),

    /// Input exceeds a size limit.
    #[error("limit: {0}")]
    Limit(String),
}

pub type IoResult<T> = Result<T, IoError>;

/* ---------------- From conversions (used by file modules) ---------------- */

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json doesn't keep a pointer; default to root.
        IoError::Json {
            pointer: "/".to_string(),
            msg: e.to_string(),
        }
    }
}

pub mod canonical_json;
pub mod hasher;
pub mod loader;
pub mod manifest;

/// Returns true if `s` looks like a URL (any `<scheme>://`, including `file://`).
#[inline]
pub fn looks_like_url_strict(s: &str) -> bool {
    s.trim().contains("://")
}

pub mod prelude {
    pub use crate::{looks_like_url_strict, IoError, IoResult};

    pub use crate::canonical_json::{to_canonical_bytes, write_canonical_file};
    pub use crate::hasher::{sha256_canonical, sha256_hex};
    pub use crate::loader::{load_from_manifest, load_from_paths, LoadedInputs};
}
