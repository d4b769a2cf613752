//! Plan outputs: block-map CSVs and JSON reports.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use colony_pick_core::{CultureBlock, PickPlan, PlateDiagnostics};
use serde::{Deserialize, Serialize};

use crate::IoError;

pub const PLAN_FILE: &str = "culture_blocks.json";
pub const DIAGNOSTICS_FILE: &str = "colony_diagnostics.json";

/// Files produced by [`write_reports`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPaths {
    pub block_maps: Vec<PathBuf>,
    pub plan: PathBuf,
    pub diagnostics: PathBuf,
}

/// Write `<dir>/culture_block_<n>.csv`: one line per filled row, one plasmid
/// name per pick. The last row may be shorter than the others.
pub fn write_block_map(block: &CultureBlock, dir: &Path) -> Result<PathBuf, IoError> {
    let path = dir.join(format!("{}.csv", block.name()));
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(&path)?;
    for row in block.plasmid_rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(path)
}

fn write_pretty<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), IoError> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.flush()?;
    Ok(())
}

/// Write every report of `plan` into `dir`, creating it if needed.
pub fn write_reports(plan: &PickPlan, dir: &Path) -> Result<ReportPaths, IoError> {
    fs::create_dir_all(dir)?;
    let block_maps = plan
        .blocks
        .iter()
        .map(|block| write_block_map(block, dir))
        .collect::<Result<Vec<_>, _>>()?;

    let plan_path = dir.join(PLAN_FILE);
    write_pretty(&plan.blocks, &plan_path)?;
    let diagnostics = dir.join(DIAGNOSTICS_FILE);
    write_pretty(&plan.plates, &diagnostics)?;

    log::info!(
        "wrote {} block maps, {} and {} to {}",
        block_maps.len(),
        PLAN_FILE,
        DIAGNOSTICS_FILE,
        dir.display()
    );
    Ok(ReportPaths {
        block_maps,
        plan: plan_path,
        diagnostics,
    })
}

/// Read back a `culture_blocks.json`.
pub fn load_blocks(path: impl AsRef<Path>) -> Result<Vec<CultureBlock>, IoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Read back a `colony_diagnostics.json`.
pub fn load_diagnostics(path: impl AsRef<Path>) -> Result<Vec<PlateDiagnostics>, IoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
