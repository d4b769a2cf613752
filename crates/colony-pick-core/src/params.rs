use std::path::PathBuf;

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::{CameraFrame, CellKey, RegionGeometry, RegionLattice};

/// Invalid run configuration. Always fatal: no plan is produced.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown region kind `{0}` (expected `circle` or `rectangle`)")]
    UnknownRegionKind(String),
    #[error("region is missing `{0}`")]
    MissingRegionField(&'static str),
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    #[error("pixels_per_mm must be finite and > 0 (got {0})")]
    InvalidScale(f64),
    #[error("circle radius must be finite and > 0 (got {0})")]
    InvalidRadius(f64),
    #[error("rectangle corners must satisfy min < max on both axes")]
    InvertedRectangle,
    #[error("mask strategy needs at least one mask")]
    NoMasks,
    #[error("cannot derive a plate-map cell from mask name `{0}`")]
    InvalidMaskName(String),
}

/// One mask image for the mask-overlay strategy, bound to one plate-map cell.
///
/// In JSON the `cell` may be omitted; it is then taken from the file name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMask")]
pub struct MaskSpec {
    pub path: PathBuf,
    pub cell: CellKey,
}

#[derive(Deserialize)]
struct RawMask {
    path: PathBuf,
    #[serde(default)]
    cell: Option<CellKey>,
}

impl TryFrom<RawMask> for MaskSpec {
    type Error = ConfigError;

    fn try_from(raw: RawMask) -> Result<Self, Self::Error> {
        match raw.cell {
            Some(cell) => Ok(Self {
                path: raw.path,
                cell,
            }),
            None => Self::from_path(raw.path),
        }
    }
}

impl MaskSpec {
    /// Bind a mask to the cell encoded in its file name (`..._b12.png`).
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let name = path.to_string_lossy().into_owned();
        let cell = CellKey::from_mask_name(&name).ok_or(ConfigError::InvalidMaskName(name))?;
        Ok(Self { path, cell })
    }
}

/// How colonies are attributed to plate-map cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ClassifierParams {
    /// Geometric containment in a lattice of circles or rectangles.
    Regions(RegionLattice),
    /// One detector run per mask; every valid detection belongs to the mask's cell.
    Masks { masks: Vec<MaskSpec> },
}

/// Numeric parameters of a pick run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickParams {
    pub frame: CameraFrame,
    pub classifier: ClassifierParams,
    /// Colonies picked per plate-map cell (`k`).
    pub colonies_to_pick: usize,
    /// Block bound as compared by the packer; a block holds `block_rows + 1` rows.
    pub block_rows: usize,
    /// Row bound as compared by the packer; a row holds `block_columns + 1` picks.
    pub block_columns: usize,
}

impl Default for PickParams {
    /// A 96-well culture block (8 x 12) and 2 colonies per plasmid on an
    /// 8-well agar plate.
    fn default() -> Self {
        Self {
            frame: CameraFrame::default(),
            classifier: ClassifierParams::Regions(RegionLattice {
                geometry: RegionGeometry::Circle {
                    center: Point2::new(12.0, -12.0),
                    radius: 6.0,
                },
                spacing_mm: Vector2::new(27.0, -30.0),
                rows: Some(2),
                columns: Some(4),
            }),
            colonies_to_pick: 2,
            block_rows: 7,
            block_columns: 11,
        }
    }
}

impl PickParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let frame = &self.frame;
        if !frame.rotation_deg.is_finite() {
            return Err(ConfigError::NonFinite("rotation_deg"));
        }
        if !frame.pixels_per_mm.is_finite() || frame.pixels_per_mm <= 0.0 {
            return Err(ConfigError::InvalidScale(frame.pixels_per_mm));
        }
        let origin = frame.calibration_origin_mm;
        if !(origin.x.is_finite() && origin.y.is_finite()) {
            return Err(ConfigError::NonFinite("calibration_origin_mm"));
        }
        match &self.classifier {
            ClassifierParams::Regions(lattice) => lattice.validate(),
            ClassifierParams::Masks { masks } if masks.is_empty() => Err(ConfigError::NoMasks),
            ClassifierParams::Masks { .. } => Ok(()),
        }
    }

    /// Picks per culture block, reflecting the inclusive row/column bounds.
    pub fn block_capacity(&self) -> usize {
        (self.block_rows + 1) * (self.block_columns + 1)
    }
}
