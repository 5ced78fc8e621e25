// crates/wv_cli/src/main.rs
//
// Wires up: exit codes, typed error mapping, CLI parsing, logging, the
// --list / --validate-only short-circuits, and the full run path
// (engine meta → load → overrides → pipeline → artifacts → optional rendering).

mod args;

mod exitcodes {
    pub const OK: u8 = 0;
    pub const VALIDATION: u8 = 2;
    pub const SELF_VERIFY: u8 = 3;
    pub const IO: u8 = 4;
    pub const INFEASIBLE: u8 = 5;
}

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wv_algo::AllocError;
use wv_core::{variables, BucketKey};
use wv_io::{canonical_json, loader, loader::LoadedInputs, IoError};
use wv_pipeline::{run_with_ctx, EngineMeta, PipelineCtx, PipelineError, PipelineOutputs, WaveModel};
use wv_report::{build_model, render_html, render_report_json, ReportError};

use args::{parse_and_validate, Args, CliError};

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Malformed records, bad params/manifest, digest expectations.
    Validation(String),
    /// Frame self-check failed.
    SelfVerify(String),
    /// Read/write/path/limit failures.
    Io(String),
    /// Budget cannot cover every positive-share state.
    Infeasible(String),
}

impl MainError {
    fn code(&self) -> u8 {
        match self {
            MainError::Validation(_) => exitcodes::VALIDATION,
            MainError::SelfVerify(_) => exitcodes::SELF_VERIFY,
            MainError::Io(_) => exitcodes::IO,
            MainError::Infeasible(_) => exitcodes::INFEASIBLE,
        }
    }

    fn message(&self) -> &str {
        match self {
            MainError::Validation(m) | MainError::SelfVerify(m) | MainError::Io(m) | MainError::Infeasible(m) => m,
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_and_validate() {
        Ok(a) => a,
        Err(CliError::Clap(e)) => e.exit(),
        Err(e) => {
            eprintln!("waves: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION);
        }
    };

    init_tracing(&args);

    match run_once(&args) {
        Ok(()) => ExitCode::from(exitcodes::OK),
        Err(e) => {
            eprintln!("waves: error: {}", e.message());
            ExitCode::from(e.code())
        }
    }
}

/// stderr fmt subscriber; `RUST_LOG` wins over the flag-derived default.
fn init_tracing(args: &Args) {
    let default = if args.verbose {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_once(args: &Args) -> Result<(), MainError> {
    let engine_meta = EngineMeta {
        vendor: option_env!("WV_ENGINE_VENDOR").unwrap_or("wv").to_string(),
        name: option_env!("WV_ENGINE_NAME").unwrap_or(env!("CARGO_PKG_NAME")).to_string(),
        version: option_env!("WV_ENGINE_VERSION").unwrap_or(env!("CARGO_PKG_VERSION")).to_string(),
        build: option_env!("WV_ENGINE_BUILD").unwrap_or("dev").to_string(),
    };

    let mut loaded = load_inputs(args)?;
    apply_overrides(args, &mut loaded)?;

    if args.validate_only || args.list {
        let model = WaveModel::from_records(&loaded.records)
            .map_err(|e| map_pipeline_err(PipelineError::from(e)))?;
        if args.list {
            println!("{}", json!({ "years": model.years(), "classes": model.classes() }));
        }
        if args.validate_only && !args.quiet {
            eprintln!("validate-only: inputs OK ({} records)", loaded.records.len());
        }
        return Ok(());
    }

    let selection = match (args.year, args.class_num) {
        (Some(y), Some(c)) => Some(BucketKey::new(y, c)),
        _ => None,
    };

    let outs = run_with_ctx(PipelineCtx { loaded, engine_meta, selection }).map_err(map_pipeline_err)?;

    write_artifacts(&args.out, &outs)?;
    maybe_render_reports(args, &outs)?;

    if !args.quiet {
        eprintln!(
            "run: {} {} written to {}",
            outs.waves.key(),
            outs.waves.id,
            args.out.to_string_lossy()
        );
    }
    Ok(())
}

fn load_inputs(args: &Args) -> Result<LoadedInputs, MainError> {
    let loaded = match (&args.manifest, &args.data) {
        (Some(m), _) => loader::load_from_manifest(m),
        (None, Some(d)) => loader::load_from_paths(d, args.params.as_deref()),
        (None, None) => return Err(MainError::Validation("missing --data or --manifest".into())),
    };
    loaded.map_err(map_io_err)
}

fn apply_overrides(args: &Args, loaded: &mut LoadedInputs) -> Result<(), MainError> {
    if let Some(b) = args.budget {
        loaded.params.budget = b;
    }
    if let Some(t) = args.tie_break {
        loaded.params.tie_break = t;
    }
    variables::validate_domains(&loaded.params).map_err(|e| MainError::Validation(format!("params: {e}")))?;
    debug!(budget = loaded.params.budget, tie_break = loaded.params.tie_break.as_token(), "params effective");
    Ok(())
}

fn write_artifacts(out_dir: &Path, outs: &PipelineOutputs) -> Result<(), MainError> {
    fs::create_dir_all(out_dir)
        .map_err(|e| MainError::Io(format!("mkdir {}: {e}", out_dir.to_string_lossy())))?;

    let waves_path = out_dir.join("waves.json");
    canonical_json::write_canonical_file(&outs.waves, &waves_path)
        .map_err(|e| MainError::Io(format!("write waves.json: {e}")))?;
    info!(path = %waves_path.display(), id = %outs.waves.id, "wrote waves.json");

    let run_path = out_dir.join("run_record.json");
    canonical_json::write_canonical_file(&outs.run_record, &run_path)
        .map_err(|e| MainError::Io(format!("write run_record.json: {e}")))?;
    info!(path = %run_path.display(), id = %outs.run_record.id, "wrote run_record.json");

    Ok(())
}

fn maybe_render_reports(args: &Args, outs: &PipelineOutputs) -> Result<(), MainError> {
    if args.render.is_empty() {
        return Ok(());
    }
    let model = build_model(&outs.waves, &outs.run_record).map_err(map_report_err)?;

    for fmt in &args.render {
        match fmt.as_str() {
            "json" => {
                let path = args.out.join("report.json");
                canonical_json::write_canonical_file(&render_report_json(&model), &path)
                    .map_err(|e| MainError::Io(format!("write report.json: {e}")))?;
                info!(path = %path.display(), "wrote report.json");
            }
            "html" => {
                let path = args.out.join("report.html");
                fs::write(&path, render_html(&model))
                    .map_err(|e| MainError::Io(format!("write report.html: {e}")))?;
                info!(path = %path.display(), "wrote report.html");
            }
            other => return Err(MainError::Validation(format!("unknown renderer: {other}"))),
        }
    }
    Ok(())
}

/// Translate wv_io::IoError into MainError buckets.
fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Path(_) | IoError::Limit(_) => MainError::Io(e.to_string()),
        IoError::Json { .. }
        | IoError::MalformedRecord { .. }
        | IoError::Params(_)
        | IoError::Manifest(_)
        | IoError::Expect(_)
        | IoError::Hash(_) => MainError::Validation(e.to_string()),
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    match e {
        PipelineError::Io(io) => map_io_err(io),
        PipelineError::Aggregate(_) | PipelineError::Validate(_) => MainError::Validation(e.to_string()),
        PipelineError::Allocate(AllocError::Infeasible { .. }) => MainError::Infeasible(e.to_string()),
        PipelineError::Allocate(_) => MainError::Validation(e.to_string()),
        PipelineError::SelfVerify(_) => MainError::SelfVerify(e.to_string()),
    }
}

fn map_report_err(e: ReportError) -> MainError {
    match e {
        ReportError::Inconsistent(m) => MainError::SelfVerify(format!("report: {m}")),
    }
}
