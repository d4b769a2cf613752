use std::path::PathBuf;

use colony_pick_core::{ConfigError, PlateLayoutError};

/// File, JSON or CSV failure while loading a config or writing a report.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum PlateMapError {
    #[error("failed to read plate map {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed plate map {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Failures of the external colony detector or of its saved output.
#[derive(thiserror::Error, Debug)]
pub enum DetectorError {
    #[error("failed to start detector `{}`: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("detector exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("detection table has no `{0}` column")]
    MissingColumn(&'static str),
    #[error("detection table line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("no saved detections at {}", .0.display())]
    MissingDetections(PathBuf),
    #[error("malformed detection table: {0}")]
    Csv(#[from] csv::Error),
    #[cfg(feature = "image")]
    #[error("failed to place mask {}: {source}", .path.display())]
    Mask {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("masked detection needs colony-pick-io built with the `image` feature")]
    MaskPlacementUnavailable,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A run configuration that cannot be turned into plates and parameters.
#[derive(thiserror::Error, Debug)]
pub enum RunConfigError {
    #[error("run configuration lists no plate maps")]
    NoPlateMaps,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    PlateMap(#[from] PlateMapError),
    #[error(transparent)]
    Layout(#[from] PlateLayoutError),
}
