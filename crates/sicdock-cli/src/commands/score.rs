use crate::cli::ScoreArgs;
use crate::config::PartialScoreConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use serde::{Deserialize, Serialize};
use sicdock::core::docking::RigidScore;
use sicdock::core::geometry::{xform_from_parts, xform_to_parts};
use sicdock::core::io::fragment::TomlFragmentFile;
use sicdock::core::io::traits::FragmentFile;
use sicdock::core::loops::SharedLoopLibrary;
use sicdock::core::models::fragment::Fragment;
use sicdock::engine::error::EngineError;
use sicdock::engine::progress::ProgressReporter;
use sicdock::workflows::score::{self, CandidatePose, ScoringResult};
use std::fmt::Write;
use std::path::Path;
use tracing::{info, warn};

const COLUMN_WIDTH: usize = 12;

/// One row of the candidate pose file; rotations are axis-angle vectors in radians.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct PoseRecord {
    id: String,
    tx1: f64,
    ty1: f64,
    tz1: f64,
    rx1: f64,
    ry1: f64,
    rz1: f64,
    tx2: f64,
    ty2: f64,
    tz2: f64,
    rx2: f64,
    ry2: f64,
    rz2: f64,
}

impl From<PoseRecord> for CandidatePose {
    fn from(r: PoseRecord) -> Self {
        Self {
            id: r.id,
            x1: xform_from_parts([r.tx1, r.ty1, r.tz1], [r.rx1, r.ry1, r.rz1]),
            x2: xform_from_parts([r.tx2, r.ty2, r.tz2], [r.rx2, r.ry2, r.rz2]),
        }
    }
}

fn read_fragment(path: &Path) -> Result<Fragment> {
    info!("Loading fragment from {:?}", path);
    TomlFragmentFile::read_from_path(path).map_err(|e| CliError::Fragment {
        path: path.to_path_buf(),
        source: e,
    })
}

fn read_poses(path: &Path) -> Result<Vec<CandidatePose>> {
    let parse_error = |e: csv::Error| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(parse_error)?;
    reader
        .deserialize::<PoseRecord>()
        .map(|record| record.map(CandidatePose::from).map_err(parse_error))
        .collect()
}

fn write_scores(path: &Path, result: &ScoringResult) -> Result<()> {
    let to_error = |e: csv::Error| CliError::Other(anyhow::anyhow!("{}: {}", path.display(), e));
    let mut writer = csv::Writer::from_path(path).map_err(to_error)?;

    let mut header = vec!["rank".to_string(), "id".to_string(), "total".to_string()];
    header.extend(result.labels.iter().map(|l| l.to_string()));
    header.extend(
        ["tx2", "ty2", "tz2", "rx2", "ry2", "rz2"]
            .iter()
            .map(|s| s.to_string()),
    );
    writer.write_record(&header).map_err(to_error)?;

    for (rank, pose) in result.poses.iter().enumerate() {
        let (t, r) = xform_to_parts(&(pose.x1.inverse() * pose.x2));
        let mut row = vec![
            (rank + 1).to_string(),
            pose.id.clone(),
            format!("{:.6}", pose.total),
        ];
        row.extend(
            pose.components
                .iter()
                .map(|c| c.map_or_else(String::new, |v| format!("{:.6}", v))),
        );
        row.extend(t.iter().chain(r.iter()).map(|v| format!("{:.6}", v)));
        writer.write_record(&row).map_err(to_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Renders the component table for the best `top` poses.
fn format_table(result: &ScoringResult, top: usize) -> Result<String> {
    let mut table = String::new();
    let fmt_error = |e: std::fmt::Error| CliError::Other(e.into());

    write!(table, "{:>5} {:<16} {:>w$} ", "rank", "pose", "total", w = COLUMN_WIDTH)
        .map_err(fmt_error)?;
    result
        .score
        .show(&mut table, COLUMN_WIDTH)
        .map_err(fmt_error)?;
    table.push('\n');

    for (rank, pose) in result.poses.iter().take(top).enumerate() {
        write!(
            table,
            "{:>5} {:<16} {:>w$.3} ",
            rank + 1,
            pose.id,
            pose.total,
            w = COLUMN_WIDTH
        )
        .map_err(fmt_error)?;
        result
            .score
            .show_scores(&mut table, &[pose.x1], &[pose.x2], COLUMN_WIDTH)
            .map_err(EngineError::from)?;
        table.push('\n');
    }
    Ok(table)
}

pub fn run(args: ScoreArgs) -> Result<()> {
    let partial_config = PartialScoreConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    let fragment1 = read_fragment(&args.fragment1)?;
    let fragment2 = read_fragment(&args.fragment2)?;
    let candidates = read_poses(&args.poses)?;
    info!("Read {} candidate pose(s) from {:?}", candidates.len(), &args.poses);
    if candidates.is_empty() {
        return Err(CliError::Argument(format!(
            "No candidate poses found in {}",
            args.poses.display()
        )));
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let shared_library = SharedLoopLibrary::new();

    println!("Scoring {} pose(s)...", candidates.len());
    let result = score::run(
        &fragment1,
        &fragment2,
        &config,
        &candidates,
        &shared_library,
        &reporter,
    )?;

    print!("{}", format_table(&result, args.show_top)?);

    if let Some(output) = &args.output {
        write_scores(output, &result)?;
        println!("✓ Ranked scores written to: {}", output.display());
    }
    if config.dump.is_some() {
        if result.dumped.is_empty() {
            warn!("No linker examples were found for the top poses.");
        } else {
            println!(
                "✓ Linker examples written for {} pose(s): {}",
                result.dumped.len(),
                result.dumped.join(", ")
            );
        }
    }
    Ok(())
}
