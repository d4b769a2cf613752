//! End-to-end run: configuration -> detections -> plan -> output files.

use std::path::{Path, PathBuf};

use colony_pick_core::{Detector, PickPlan, PlanAssembler, PlanError};
use colony_pick_io::{
    write_reports, IoError, OpenCfuDetector, ReportPaths, RunConfig, RunConfigError,
    SavedDetections,
};

#[cfg(feature = "image")]
use colony_pick_io::{render_previews, save_previews, Preview, PreviewError};

/// Any fatal failure of a run. Nothing is written once one of these is returned
/// before [`write_outputs`].
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("failed to load run configuration {}: {source}", .path.display())]
    LoadConfig {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error(transparent)]
    Config(#[from] RunConfigError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("failed to write reports: {0}")]
    Report(#[from] IoError),
    #[cfg(feature = "image")]
    #[error(transparent)]
    Preview(#[from] PreviewError),
}

/// Where detections come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionSource {
    /// Run OpenCFU as configured; optionally keep its raw tables in `archive`.
    OpenCfu { archive: Option<PathBuf> },
    /// Replay tables from a directory (see [`colony_pick_io::table_file_name`]).
    Saved(PathBuf),
}

/// Files written by a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub plan: PickPlan,
    pub reports: ReportPaths,
    pub previews: Vec<PathBuf>,
}

/// Load a run configuration, resolving relative paths against its directory.
pub fn load_config(path: impl AsRef<Path>) -> Result<RunConfig, RunError> {
    let path = path.as_ref();
    let config = RunConfig::load_json(path).map_err(|source| RunError::LoadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(config.resolve_paths(base))
}

/// Build plates, run `detector` and assemble the plan. Writes nothing.
pub fn plan_from_config<D: Detector>(config: &RunConfig, detector: D) -> Result<PickPlan, RunError> {
    let assembler = PlanAssembler::new(config.build_params()?).map_err(RunConfigError::from)?;
    let plates = config.build_plates()?;
    Ok(assembler.assemble(&plates, detector)?)
}

/// Write block maps, JSON reports and (if enabled) previews for `plan`.
///
/// Previews are rendered before the first file is written, so an unreadable
/// photograph fails the run with the output directory untouched.
pub fn write_outputs(config: &RunConfig, plan: &PickPlan) -> Result<(ReportPaths, Vec<PathBuf>), RunError> {
    let previews = if config.draw_previews {
        render(plan)?
    } else {
        Vec::new()
    };
    let reports = write_reports(plan, &config.output_dir)?;
    let written = save(config, &previews)?;
    Ok((reports, written))
}

#[cfg(feature = "image")]
fn render(plan: &PickPlan) -> Result<Vec<Preview>, RunError> {
    Ok(render_previews(&plan.plates)?)
}

#[cfg(feature = "image")]
fn save(config: &RunConfig, previews: &[Preview]) -> Result<Vec<PathBuf>, RunError> {
    if previews.is_empty() {
        return Ok(Vec::new());
    }
    Ok(save_previews(previews, &config.preview_dir())?)
}

#[cfg(not(feature = "image"))]
fn render(_plan: &PickPlan) -> Result<Vec<()>, RunError> {
    log::warn!("draw_previews is set but colony-pick was built without the `image` feature");
    Ok(Vec::new())
}

#[cfg(not(feature = "image"))]
fn save(_config: &RunConfig, _previews: &[()]) -> Result<Vec<PathBuf>, RunError> {
    Ok(Vec::new())
}

/// Plan with the selected detection source, then write every output.
pub fn run(config: &RunConfig, source: &DetectionSource) -> Result<RunOutcome, RunError> {
    let plan = match source {
        DetectionSource::OpenCfu { archive } => {
            let mut detector = OpenCfuDetector::new(config.opencfu.clone());
            if let Some(dir) = archive {
                detector = detector.with_archive(dir);
            }
            plan_from_config(config, detector)?
        }
        DetectionSource::Saved(dir) => plan_from_config(config, SavedDetections::new(dir))?,
    };
    let (reports, previews) = write_outputs(config, &plan)?;
    Ok(RunOutcome {
        plan,
        reports,
        previews,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn config_paths_resolve_next_to_the_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.json");
        RunConfig::default().write_json(&path).expect("write");

        let config = load_config(&path).expect("load");
        assert_eq!(config.output_dir, dir.path().join("colony_pick_output"));
        assert_eq!(config.images[0], dir.path().join("images/plates_01.jpg"));
    }

    #[test]
    fn unreadable_config_names_the_file() {
        let err = load_config("/nonexistent/run.json").expect_err("missing");
        assert!(matches!(err, RunError::LoadConfig { .. }));
        assert!(err.to_string().contains("/nonexistent/run.json"), "{err}");
    }

    #[test]
    fn failed_plan_leaves_output_dir_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("plate_1.csv"), "pA\n").expect("map");
        let config = RunConfig {
            images: vec![dir.path().join("photo.jpg")],
            plate_maps: vec![dir.path().join("plate_1.csv")],
            plate_locations: vec![nalgebra::Point2::new(0.0, 0.0)],
            output_dir: dir.path().join("out"),
            ..RunConfig::default()
        };

        let err = run(&config, &DetectionSource::Saved(dir.path().join("none")))
            .expect_err("no saved detections");
        assert!(matches!(err, RunError::Plan(PlanError::Detector { .. })));
        assert!(!config.output_dir.exists());
    }

    #[cfg(feature = "image")]
    #[test]
    fn unreadable_photograph_fails_before_reports_are_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("plate_1.csv"), "pA\n").expect("map");
        fs::create_dir_all(dir.path().join("saved")).expect("mkdir");
        fs::write(dir.path().join("saved/photo.csv"), "IsValid,X,Y\n1,5,-5\n").expect("table");
        let config = RunConfig {
            images: vec![dir.path().join("photo.jpg")],
            plate_maps: vec![dir.path().join("plate_1.csv")],
            plate_locations: vec![nalgebra::Point2::new(0.0, 0.0)],
            output_dir: dir.path().join("out"),
            draw_previews: true,
            ..RunConfig::default()
        };

        let err = run(&config, &DetectionSource::Saved(dir.path().join("saved")))
            .expect_err("photo.jpg does not exist");
        assert!(matches!(err, RunError::Preview(_)), "{err}");
        assert!(err.to_string().contains("photo.jpg"), "{err}");
        assert!(!config.output_dir.exists());
    }
}
