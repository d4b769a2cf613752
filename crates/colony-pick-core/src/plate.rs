//! Plates, plate maps and their placement in photographs.

use std::path::PathBuf;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::CellKey;

/// User-supplied grid of plasmid names, row-major. Blank entries are allowed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateMap {
    rows: Vec<Vec<String>>,
}

impl PlateMap {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// `(rows, columns)`, where `columns` is the longest row (rows may be ragged).
    pub fn dims(&self) -> (usize, usize) {
        let cols = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        (self.rows.len(), cols)
    }

    /// Plasmid name at `cell`, or `None` when the entry is blank or out of range.
    pub fn plasmid(&self, cell: CellKey) -> Option<&str> {
        let name = self.rows.get(cell.row)?.get(cell.col)?.trim();
        (!name.is_empty()).then_some(name)
    }
}

impl<S: Into<String>> FromIterator<Vec<S>> for PlateMap {
    fn from_iter<I: IntoIterator<Item = Vec<S>>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

/// One agar plate located in one photograph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plate {
    /// Position in the run, zero-based.
    pub index: usize,
    /// Photograph the plate appears in. Several plates may share one.
    pub image: PathBuf,
    /// Plate center in the photograph, in pixels (rotation/scale pivot).
    pub anchor_px: Point2<f64>,
    /// Identifier copied into every pick from this plate.
    pub source: String,
    pub map: PlateMap,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PlateLayoutError {
    #[error("no plate locations configured")]
    NoPlateLocations,
    #[error("{plates} plates need {needed} images, only {available} given")]
    NotEnoughImages {
        plates: usize,
        needed: usize,
        available: usize,
    },
}

/// Distribute plates over photographs.
///
/// Every photograph holds `locations.len()` plates at the given anchors; plates
/// fill photographs in order and the last photograph may be partly used.
/// `maps` holds `(source, plate map)` per plate, in plate order.
pub fn layout_plates(
    images: &[PathBuf],
    maps: Vec<(String, PlateMap)>,
    locations: &[Point2<f64>],
) -> Result<Vec<Plate>, PlateLayoutError> {
    if maps.is_empty() {
        return Ok(Vec::new());
    }
    if locations.is_empty() {
        return Err(PlateLayoutError::NoPlateLocations);
    }

    let needed = maps.len().div_ceil(locations.len());
    if images.len() < needed {
        return Err(PlateLayoutError::NotEnoughImages {
            plates: maps.len(),
            needed,
            available: images.len(),
        });
    }

    let slots = images
        .iter()
        .flat_map(|image| locations.iter().map(move |anchor| (image, *anchor)));

    Ok(maps
        .into_iter()
        .zip(slots)
        .enumerate()
        .map(|(index, ((source, map), (image, anchor_px)))| Plate {
            index,
            image: image.clone(),
            anchor_px,
            source,
            map,
        })
        .collect())
}
