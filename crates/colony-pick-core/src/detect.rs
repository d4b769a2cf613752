//! Seam to the external blob detector.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use nalgebra::{Point2, Rotation2};

use crate::{CameraFrame, CellKey, Detection, MaskSpec, PlanError, Plate};

/// A mask laid over one plate of a photograph.
///
/// Mask pixel `(u, v)` is measured from the plate anchor in the plate's own
/// (unrotated) pixel frame, so it covers photograph pixel
/// `anchor_px + R(rotation) * (u, v)`. This is the pixel part of
/// [`CameraFrame::to_plate_mm`] run backwards. Plates sharing a photograph get
/// distinct placements of the same mask file.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedMask {
    pub path: PathBuf,
    pub cell: CellKey,
    /// Index of the plate the mask is placed on.
    pub plate: usize,
    pub anchor_px: Point2<f64>,
    pub rotation_deg: f64,
}

impl PlacedMask {
    pub fn new(mask: &MaskSpec, plate: &Plate, frame: &CameraFrame) -> Self {
        Self {
            path: mask.path.clone(),
            cell: mask.cell,
            plate: plate.index,
            anchor_px: plate.anchor_px,
            rotation_deg: frame.rotation_deg,
        }
    }

    /// Camera tilt in radians, normalised like [`CameraFrame`].
    #[inline]
    pub fn rotation_rad(&self) -> f64 {
        self.rotation_deg.rem_euclid(360.0).to_radians()
    }

    /// Photograph pixel covered by mask pixel `local`.
    pub fn to_photo(&self, local: Point2<f64>) -> Point2<f64> {
        self.anchor_px + Rotation2::new(self.rotation_rad()) * local.coords
    }
}

/// Source of raw detections for a photograph, optionally restricted by a
/// mask placed on one of its plates.
///
/// Implementations are synchronous and may be expensive (an external process
/// per call). A failure is fatal for the whole run.
pub trait Detector {
    type Error: std::error::Error + Send + Sync + 'static;

    fn detect(
        &mut self,
        image: &Path,
        mask: Option<&PlacedMask>,
    ) -> Result<Vec<Detection>, Self::Error>;
}

impl<D: Detector + ?Sized> Detector for &mut D {
    type Error = D::Error;

    fn detect(
        &mut self,
        image: &Path,
        mask: Option<&PlacedMask>,
    ) -> Result<Vec<Detection>, Self::Error> {
        (**self).detect(image, mask)
    }
}

/// Wraps a [`Detector`] so each unmasked photograph is only processed once,
/// however many plates it contains.
pub struct DetectionCache<D> {
    detector: D,
    unmasked: HashMap<PathBuf, Vec<Detection>>,
    calls: usize,
}

impl<D: Detector> DetectionCache<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            unmasked: HashMap::new(),
            calls: 0,
        }
    }

    /// Number of calls forwarded to the wrapped detector.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn into_inner(self) -> D {
        self.detector
    }

    /// Detections for `image` (and `mask`), converting detector failures into
    /// [`PlanError::Detector`]. Masked runs are never cached.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, image, mask), fields(image = %image.display()))
    )]
    pub fn detect(
        &mut self,
        image: &Path,
        mask: Option<&PlacedMask>,
    ) -> Result<Vec<Detection>, PlanError> {
        if mask.is_some() {
            return self.run(image, mask);
        }
        if let Some(cached) = self.unmasked.get(image) {
            return Ok(cached.clone());
        }
        let detections = self.run(image, None)?;
        self.unmasked
            .insert(image.to_path_buf(), detections.clone());
        Ok(detections)
    }

    fn run(
        &mut self,
        image: &Path,
        mask: Option<&PlacedMask>,
    ) -> Result<Vec<Detection>, PlanError> {
        self.calls += 1;
        let detections =
            self.detector
                .detect(image, mask)
                .map_err(|source| PlanError::Detector {
                    image: image.to_path_buf(),
                    mask: mask.map(|m| m.path.clone()),
                    source: Box::new(source),
                })?;
        log::debug!(
            "detector: {} (mask {:?}) -> {} rows, {} valid",
            image.display(),
            mask.map(|m| format!("{} on plate {}", m.path.display(), m.plate)),
            detections.len(),
            detections.iter().filter(|d| d.is_valid).count()
        );
        Ok(detections)
    }
}
