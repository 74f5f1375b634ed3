//! CLI entry point: parses one or more ENC directories and reports the
//! feature counts, warnings, and spatial-index shape for each. Rendering
//! and serving are out of scope for this crate, so this binary is
//! deliberately a dump/inspection tool rather than a service.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};

use openenc_core::diagnostics::{Collector, TracingLogger};
use openenc_core::session::ParseSession;
use openenc_core::spatial::SpatialIndex;

#[derive(Parser, Debug)]
struct Args {
    /// Directory containing one or more ENC subdirectories (each holding a
    /// `.000` base cell and optional `.001`, `.002`, ... update files).
    #[arg(long)]
    input_dir: PathBuf,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Promote the first error-severity (or budget-exhausting) warning in
    /// each cell to a fatal failure instead of continuing past it.
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Warning budget per cell before `MAX_WARNINGS_EXCEEDED` fires.
    #[arg(long, default_value_t = 1000)]
    max_warnings: usize,

    /// Force the linear-scan spatial index even above the bulk-load
    /// threshold, for comparing query behavior across representations.
    #[arg(long, default_value_t = false)]
    force_linear: bool,
}

/// Find ENC cell directories under `input_dir`: any subdirectory containing
/// at least one `.000` file.
fn find_enc_directories(input_dir: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let entries = match fs::read_dir(input_dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!("failed to read input directory {:?}: {e}", input_dir);
            return dirs;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() && has_base_cell(&path) {
            dirs.push(path);
        }
    }
    dirs.sort();
    dirs
}

fn has_base_cell(dir: &Path) -> bool {
    fs::read_dir(dir)
        .into_iter()
        .flatten()
        .flatten()
        .any(|e| e.path().extension().and_then(|v| v.to_str()) == Some("000"))
}

/// Split an ENC cell directory into its `.000` base file and sorted update
/// files (`.001`, `.002`, ...).
fn find_cell_files(enc_dir: &Path) -> Option<(PathBuf, Vec<PathBuf>)> {
    let entries = fs::read_dir(enc_dir).ok()?;
    let mut base = None;
    let mut updates = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match path.extension().and_then(|v| v.to_str()) {
            Some("000") => base = Some(path),
            Some(ext) if ext.chars().all(|c| c.is_ascii_digit()) => updates.push(path),
            _ => {}
        }
    }
    updates.sort();
    base.map(|b| (b, updates))
}

fn cell_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn process_cell(enc_dir: &Path, args: &Args) {
    let Some((base_path, update_paths)) = find_cell_files(enc_dir) else {
        warn!("no .000 base cell found in {:?}", enc_dir);
        return;
    };
    let cell_name = cell_name_from_path(&base_path);
    info!("processing {} ({:?})", cell_name, base_path);

    let base_bytes = match fs::read(&base_path) {
        Ok(b) => b,
        Err(e) => {
            error!("failed to read {:?}: {e}", base_path);
            return;
        }
    };

    let mut collector = Collector::with_logger(Box::new(TracingLogger));
    collector.set_strict(args.strict, args.max_warnings);
    let mut session = ParseSession::with_collector(collector);

    let mut store = match session.parse_base_cell(&base_bytes) {
        Ok(store) => store,
        Err(e) => {
            error!("fatal error parsing {}: {e}", cell_name);
            return;
        }
    };

    if !update_paths.is_empty() {
        let updates: Vec<(String, Vec<u8>)> = update_paths
            .iter()
            .filter_map(|p| {
                let bytes = fs::read(p).ok()?;
                Some((p.file_name()?.to_str()?.to_string(), bytes))
            })
            .collect();

        match session.apply_updates(&mut store, &cell_name, &updates) {
            Ok(summary) => {
                info!(
                    "{}: applied {} update file(s) (+{} -{} ~{})",
                    cell_name,
                    summary.applied_filenames.len(),
                    summary.inserted,
                    summary.deleted,
                    summary.modified
                );
            }
            Err(e) => {
                error!("fatal error applying updates to {}: {e}", cell_name);
                return;
            }
        }
    }

    let index = SpatialIndex::build(
        store.get_all_features().into_iter().cloned().collect(),
        args.force_linear,
        16,
    );

    info!(
        "{}: {} features, {} info / {} warning / {} error diagnostics, index={}",
        cell_name,
        index.feature_count(),
        session.collector.info_count(),
        session.collector.warning_count(),
        session.collector.error_count(),
        if index.is_tree() { "r-tree" } else { "linear" },
    );
    debug!("{}: bounds = {:?}", cell_name, index.calculate_bounds());
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level)).init();

    let enc_dirs = find_enc_directories(&args.input_dir);
    info!("found {} ENC director{}", enc_dirs.len(), if enc_dirs.len() == 1 { "y" } else { "ies" });

    let pb = ProgressBar::new(enc_dirs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_message("Parsing ENC cells");

    for enc_dir in enc_dirs {
        process_cell(&enc_dir, &args);
        pb.inc(1);
    }

    pb.finish_with_message("Done");
}
