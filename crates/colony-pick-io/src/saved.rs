use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use colony_pick_core::{Detection, Detector, PlacedMask};

use crate::{parse_detection_table, DetectorError};

/// File name of a saved detection table: `<image_stem>.csv`, or
/// `<image_stem>__<mask_stem>__plate<n>.csv` for a mask placed on plate `n`.
pub fn table_file_name(image: &Path, mask: Option<&PlacedMask>) -> PathBuf {
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    match mask {
        Some(mask) => PathBuf::from(format!(
            "{}__{}__plate{}.csv",
            stem(image),
            stem(&mask.path),
            mask.plate
        )),
        None => PathBuf::from(format!("{}.csv", stem(image))),
    }
}

/// [`Detector`] that replays tables previously written by OpenCFU.
#[derive(Debug, Clone)]
pub struct SavedDetections {
    dir: PathBuf,
}

impl SavedDetections {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn table_path(&self, image: &Path, mask: Option<&PlacedMask>) -> PathBuf {
        self.dir.join(table_file_name(image, mask))
    }
}

impl Detector for SavedDetections {
    type Error = DetectorError;

    fn detect(
        &mut self,
        image: &Path,
        mask: Option<&PlacedMask>,
    ) -> Result<Vec<Detection>, DetectorError> {
        let path = self.table_path(image, mask);
        let text = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DetectorError::MissingDetections(path.clone()),
            _ => DetectorError::Io(e),
        })?;
        log::debug!("replaying detections from {}", path.display());
        parse_detection_table(&text)
    }
}
