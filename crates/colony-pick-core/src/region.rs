//! Geometric identity regions on a repeating row/column lattice.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::{CellKey, ConfigError};

/// Shape of the base (row 0, col 0) region, in plate millimeters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", try_from = "RawRegion")]
pub enum RegionGeometry {
    /// Open disc: a colony belongs if its distance to `center` is `< radius`.
    Circle { center: Point2<f64>, radius: f64 },
    /// Open box between two corners: both coordinates strictly inside.
    Rectangle { min: Point2<f64>, max: Point2<f64> },
}

/// Region shape name, as spelled in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionKind {
    Circle,
    Rectangle,
}

impl std::str::FromStr for RegionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "circle" => Ok(Self::Circle),
            "rectangle" => Ok(Self::Rectangle),
            other => Err(ConfigError::UnknownRegionKind(other.to_string())),
        }
    }
}

/// Untyped region as read from configuration; the `type` tag is resolved
/// through [`RegionKind`] so an unknown shape is a [`ConfigError`].
#[derive(Deserialize)]
struct RawRegion {
    #[serde(rename = "type")]
    kind: String,
    center: Option<Point2<f64>>,
    radius: Option<f64>,
    min: Option<Point2<f64>>,
    max: Option<Point2<f64>>,
}

impl TryFrom<RawRegion> for RegionGeometry {
    type Error = ConfigError;

    fn try_from(raw: RawRegion) -> Result<Self, Self::Error> {
        match raw.kind.parse::<RegionKind>()? {
            RegionKind::Circle => Ok(Self::Circle {
                center: raw.center.ok_or(ConfigError::MissingRegionField("center"))?,
                radius: raw.radius.ok_or(ConfigError::MissingRegionField("radius"))?,
            }),
            RegionKind::Rectangle => Ok(Self::Rectangle {
                min: raw.min.ok_or(ConfigError::MissingRegionField("min"))?,
                max: raw.max.ok_or(ConfigError::MissingRegionField("max"))?,
            }),
        }
    }
}

impl RegionGeometry {
    pub fn kind(&self) -> RegionKind {
        match self {
            Self::Circle { .. } => RegionKind::Circle,
            Self::Rectangle { .. } => RegionKind::Rectangle,
        }
    }

    /// The same shape moved by `offset`.
    pub fn translated(&self, offset: Vector2<f64>) -> Self {
        match *self {
            Self::Circle { center, radius } => Self::Circle {
                center: center + offset,
                radius,
            },
            Self::Rectangle { min, max } => Self::Rectangle {
                min: min + offset,
                max: max + offset,
            },
        }
    }

    /// Strict containment; points on the boundary are outside.
    #[inline]
    pub fn contains(&self, p: Point2<f64>) -> bool {
        match *self {
            Self::Circle { center, radius } => (p - center).norm() < radius,
            Self::Rectangle { min, max } => {
                p.x > min.x && p.x < max.x && p.y > min.y && p.y < max.y
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Circle { center, radius } => {
                if !(center.x.is_finite() && center.y.is_finite()) {
                    return Err(ConfigError::NonFinite("region center"));
                }
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(ConfigError::InvalidRadius(radius));
                }
            }
            Self::Rectangle { min, max } => {
                if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
                    return Err(ConfigError::NonFinite("region corners"));
                }
                if min.x >= max.x || min.y >= max.y {
                    return Err(ConfigError::InvertedRectangle);
                }
            }
        }
        Ok(())
    }
}

/// Base region plus per-row/per-column spacing.
///
/// Cell `(row, col)` is the base shape moved by `(col * spacing.x, row * spacing.y)`.
/// The lattice covers the plate map unless `rows`/`columns` override it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionLattice {
    pub geometry: RegionGeometry,
    /// `[x_spacing, y_spacing]` in millimeters.
    pub spacing_mm: Vector2<f64>,
    #[serde(default)]
    pub rows: Option<usize>,
    #[serde(default)]
    pub columns: Option<usize>,
}

impl RegionLattice {
    pub fn new(geometry: RegionGeometry, spacing_mm: Vector2<f64>) -> Self {
        Self {
            geometry,
            spacing_mm,
            rows: None,
            columns: None,
        }
    }

    /// Region of one lattice cell.
    #[inline]
    pub fn region(&self, cell: CellKey) -> RegionGeometry {
        let offset = Vector2::new(
            cell.col as f64 * self.spacing_mm.x,
            cell.row as f64 * self.spacing_mm.y,
        );
        self.geometry.translated(offset)
    }

    /// Lattice size, given the plate map dimensions as fallback.
    pub fn dims(&self, map_dims: (usize, usize)) -> (usize, usize) {
        (
            self.rows.unwrap_or(map_dims.0),
            self.columns.unwrap_or(map_dims.1),
        )
    }

    /// First cell, in row-major order, whose region contains `p`.
    pub fn locate(&self, p: Point2<f64>, dims: (usize, usize)) -> Option<CellKey> {
        let (rows, cols) = dims;
        (0..rows)
            .flat_map(|row| (0..cols).map(move |col| CellKey::new(row, col)))
            .find(|&cell| self.region(cell).contains(p))
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(self.spacing_mm.x.is_finite() && self.spacing_mm.y.is_finite()) {
            return Err(ConfigError::NonFinite("region spacing"));
        }
        self.geometry.validate()
    }
}
