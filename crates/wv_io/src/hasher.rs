//! crates/wv_io/src/hasher.rs
//!
//! Deterministic hashing and ID builders for canonical artifacts.
//!
//! - Canonical JSON hashing: sorted object keys, array order preserved.
//! - IDs derive from canonical bytes: `WAV:` (wave frame) and `RUN:` (run record).
//! - Hex digests are **lowercase**.
//!
//! Use `sha256_canonical(..)` for JSON values/structs and `sha256_hex(..)` /
//! `sha256_file(..)` for raw bytes and files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical_json::to_canonical_bytes;
use crate::{IoError, IoResult};

/* ---------------------------- Canonical hashing ---------------------------- */

/// SHA-256 over **canonical JSON bytes** of any serializable value.
pub fn sha256_canonical<T: Serialize>(value: &T) -> IoResult<String> {
    let bytes = to_canonical_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

/* ------------------------------- Raw hashing ------------------------------- */

/// SHA-256 over raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA-256 over a reader stream (raw, not canonicalized).
pub fn sha256_stream<R: Read>(reader: &mut R) -> IoResult<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 over a file's raw bytes.
pub fn sha256_file(path: &Path) -> IoResult<String> {
    let f = File::open(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let mut r = BufReader::new(f);
    sha256_stream(&mut r)
}

/* ---------------------------- Artifact ID builders ---------------------------- */

/// `WAV:<hex>`: ID for `waves.json` derived from canonical bytes of the frame without its id.
pub fn wav_id_from_canonical<T: Serialize>(value: &T) -> IoResult<String> {
    Ok(format!("WAV:{}", sha256_canonical(value)?))
}

/// `RUN:<short-hex>`: ID for `run_record.json` (first 16 hex of the canonical digest).
pub fn run_id_from_canonical<T: Serialize>(value: &T) -> IoResult<String> {
    let hex64 = sha256_canonical(value)?;
    Ok(format!("RUN:{}", short_hex(&hex64, 16)?))
}

/// Validate a lowercase 64-hex string and shorten to `n` chars.
pub fn short_hex(hex64: &str, n: usize) -> IoResult<String> {
    if !is_hex64(hex64) {
        return Err(IoError::Hash(format!("expected lowercase 64-hex, got {hex64}")));
    }
    Ok(hex64[..n.min(64)].to_string())
}

/// Lowercase 64-hex check.
pub fn is_hex64(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f'))
}
