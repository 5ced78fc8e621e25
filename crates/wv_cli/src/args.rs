// crates/wv_cli/src/args.rs
//
// Offline CLI argument surface: types, mode checks, filesystem checks,
// manifest quick-check, normalization, and tests.
//
// Rules:
// - No networked paths (reject any scheme:// like http/https/file)
// - Exactly one of: --manifest  XOR  --data (with optional --params)
// - --year and --class come together; omitted → first year, first class
// - Overrides (--budget, --tie-break) are applied on top of the parameter set
// - --list / --validate-only short-circuit before allocation

use std::{
    env, fs,
    io::Read,
    path::{Path, PathBuf},
};

use clap::Parser;
use thiserror::Error;
use wv_core::TieBreak;

/// Parsed CLI arguments (raw).
#[derive(Debug, Parser, Clone)]
#[command(
    name = "waves",
    disable_help_subcommand = true,
    about = "Offline wave-share allocation for per-state indicator contributions"
)]
pub struct Args {
    // --- Mode selection ---
    /// Manifest JSON naming the record set and optional parameter set.
    #[arg(long, conflicts_with_all = ["data", "params"])]
    pub manifest: Option<PathBuf>,

    /// Record set JSON (array of raw records).
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Parameter set JSON (defaults apply when omitted).
    #[arg(long)]
    pub params: Option<PathBuf>,

    // --- Selection ---
    #[arg(long, requires = "class_num")]
    pub year: Option<i32>,

    #[arg(long = "class", id = "class_num", requires = "year")]
    pub class_num: Option<i32>,

    // --- Overrides ---
    /// Wave budget override (1..=10000).
    #[arg(long)]
    pub budget: Option<u32>,

    /// Tie-break order override.
    #[arg(long, value_parser = parse_tie_break)]
    pub tie_break: Option<TieBreak>,

    // --- Output & rendering ---
    /// Output directory (default: current directory).
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Renderer(s) to emit. Choose up to 2 (json, html). Omit to skip rendering.
    #[arg(long, value_parser = ["json", "html"], num_args = 0..=2)]
    pub render: Vec<String>,

    // --- Control ---
    /// Print the available years and classes, then exit.
    #[arg(long)]
    pub list: bool,

    /// Load and check inputs only; do not allocate.
    #[arg(long)]
    pub validate_only: bool,

    /// Errors only on stderr.
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Debug-level logging on stderr.
    #[arg(long)]
    pub verbose: bool,
}

/// Errors surfaced by argument parsing/validation.
/// Messages are short and stable for scripts and tests.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("missing required flag: {0}")]
    Missing(&'static str),
    #[error("path must be local file (no scheme): {0}")]
    NonLocalPath(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("manifest quick-check failed: {0}")]
    ManifestQuick(&'static str),
    #[error(transparent)]
    Clap(#[from] clap::Error),
}

pub fn parse_tie_break(s: &str) -> Result<TieBreak, String> {
    TieBreak::from_token(s.trim())
        .ok_or_else(|| format!("expected subregion_then_name | state_code, got {s}"))
}

/// Entry point used by main.rs
pub fn parse_and_validate() -> Result<Args, CliError> {
    validate(Args::try_parse()?)
}

/// Same checks over an explicit argv (tests).
pub fn parse_from<I, T>(argv: I) -> Result<Args, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    validate(Args::try_parse_from(argv)?)
}

fn validate(mut args: Args) -> Result<Args, CliError> {
    for p in iter_all_paths(&args) {
        ensure_local_path(p)?;
    }

    if args.manifest.is_some() {
        validate_manifest_mode(&args)?;
        args.manifest = args.manifest.take().map(|p| normalize_path(&p));
    } else {
        validate_explicit_mode(&args)?;
        args.data = args.data.take().map(|p| normalize_path(&p));
        args.params = args.params.take().map(|p| normalize_path(&p));
    }
    args.out = normalize_path(&args.out);

    Ok(args)
}

#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

#[inline]
fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    if let Some(s) = p.to_str() {
        if has_scheme(s) {
            return Err(CliError::NonLocalPath(s.to_string()));
        }
    }
    Ok(())
}

fn iter_all_paths(args: &Args) -> impl Iterator<Item = &Path> {
    [
        args.manifest.as_deref(),
        args.data.as_deref(),
        args.params.as_deref(),
        Some(args.out.as_path()),
    ]
    .into_iter()
    .flatten()
}

fn validate_manifest_mode(a: &Args) -> Result<(), CliError> {
    let path = a.manifest.as_ref().ok_or(CliError::Missing("--manifest"))?;
    ensure_local_exists(path, "--manifest")?;

    const MAX_BYTES: u64 = 4 * 1024 * 1024;
    let f = fs::File::open(path)
        .map_err(|_| CliError::NotFound(format!("--manifest {}", path.display())))?;
    let mut buf = Vec::new();
    f.take(MAX_BYTES)
        .read_to_end(&mut buf)
        .map_err(|_| CliError::ManifestQuick("unable to read manifest file"))?;

    quick_check_manifest_bytes(&buf)
}

fn validate_explicit_mode(a: &Args) -> Result<(), CliError> {
    let data = a.data.as_ref().ok_or(CliError::Missing("--data or --manifest"))?;
    ensure_local_exists(data, "--data")?;
    if let Some(p) = &a.params {
        ensure_local_exists(p, "--params")?;
    }
    Ok(())
}

fn ensure_local_exists(p: &Path, label: &'static str) -> Result<(), CliError> {
    ensure_local_path(p)?;
    let meta = fs::metadata(p).map_err(|_| CliError::NotFound(format!("{label} {}", p.display())))?;
    if !meta.is_file() {
        return Err(CliError::NotFound(format!("{label} {}", p.display())));
    }
    Ok(())
}

/// Best-effort absolute path; falls back to CWD-relative when the path does not exist yet.
fn normalize_path(p: &Path) -> PathBuf {
    fs::canonicalize(p).unwrap_or_else(|_| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(p)
        }
    })
}

/// Lightweight manifest quick-check (no JSON parsing):
/// - "records_path" present
/// - no "http://", "https://" or "file://" anywhere
/// - any quoted value following a `sha256` key looks like 64-hex
pub fn quick_check_manifest_bytes(bytes: &[u8]) -> Result<(), CliError> {
    let text = std::str::from_utf8(bytes).map_err(|_| CliError::ManifestQuick("manifest must be UTF-8"))?;

    if !text.contains("\"records_path\"") {
        return Err(CliError::ManifestQuick("missing records_path"));
    }
    if text.contains("http://") || text.contains("https://") || text.contains("file://") {
        return Err(CliError::ManifestQuick("URLs are not allowed (offline only)"));
    }

    let mut i = 0usize;
    while let Some(pos) = text[i..].find("sha256\"") {
        let after_key = i + pos + "sha256\"".len();
        let Some(q1_rel) = text[after_key..].find('"') else { break };
        let q1 = after_key + q1_rel;
        let Some(q2_rel) = text[q1 + 1..].find('"') else { break };
        let q2 = q1 + 1 + q2_rel;
        let candidate = &text[q1 + 1..q2];
        if candidate.len() != 64 || !candidate.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CliError::ManifestQuick("sha256 field present but not 64-hex"));
        }
        i = q2 + 1;
    }

    Ok(())
}
