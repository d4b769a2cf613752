//! Colony identity classification.
//!
//! Two strategies share the [`ColonyClassifier`] interface:
//! - [`GeometricClassifier`]: one detector run per photograph, then strict
//!   containment in a lattice of circles or rectangles (first row-major match wins).
//! - [`MaskClassifier`]: one detector run per mask and plate, with the mask
//!   rotated and moved onto that plate ([`PlacedMask`]); every valid detection
//!   of a run belongs to the mask's cell, with no geometric test.
//!
//! Neither strategy looks at plasmid names: blank or out-of-range cells are
//! skipped later, when picks are emitted.

use std::collections::BTreeMap;

use nalgebra::Point2;

use crate::{
    colonies_from_detections, CameraFrame, CellKey, ClassifierParams, Colony, Detection,
    DetectionCache, Detector, MaskSpec, PlacedMask, PlanError, Plate, PlateMap, RegionLattice,
};

/// Colonies of one plate grouped by cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Classification {
    /// Row-major by construction of [`CellKey`] ordering; colonies keep detection order.
    pub regions: BTreeMap<CellKey, Vec<Colony>>,
    /// Colonies that matched no cell (geometric strategy only).
    pub unassigned: Vec<Colony>,
    /// Pixels of the rows the detector marked invalid, for previews.
    pub invalid_px: Vec<Point2<f64>>,
}

fn invalid_pixels(detections: &[Detection]) -> impl Iterator<Item = Point2<f64>> + '_ {
    detections.iter().filter(|d| !d.is_valid).map(|d| d.pixel)
}

impl Classification {
    pub fn assigned_count(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }
}

/// Attributes the colonies of a plate to plate-map cells.
pub trait ColonyClassifier {
    fn classify<D: Detector>(
        &self,
        plate: &Plate,
        frame: &CameraFrame,
        detections: &mut DetectionCache<D>,
    ) -> Result<Classification, PlanError>;
}

/// Containment in a lattice of geometric regions.
#[derive(Clone, Debug)]
pub struct GeometricClassifier {
    lattice: RegionLattice,
}

impl GeometricClassifier {
    pub fn new(lattice: RegionLattice) -> Self {
        Self { lattice }
    }

    pub fn lattice(&self) -> &RegionLattice {
        &self.lattice
    }

    /// Assign already-localized colonies to lattice cells.
    ///
    /// Each colony is tested against the cells in row-major order and goes to
    /// the first region that contains it. Regions are expected not to overlap.
    pub fn assign(&self, colonies: Vec<Colony>, map: &PlateMap) -> Classification {
        let dims = self.lattice.dims(map.dims());
        let mut out = Classification::default();
        for mut colony in colonies {
            match self.lattice.locate(colony.position_mm, dims) {
                Some(cell) => {
                    colony.cell = Some(cell);
                    out.regions.entry(cell).or_default().push(colony);
                }
                None => out.unassigned.push(colony),
            }
        }
        out
    }
}

impl ColonyClassifier for GeometricClassifier {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip_all, fields(plate = plate.index))
    )]
    fn classify<D: Detector>(
        &self,
        plate: &Plate,
        frame: &CameraFrame,
        detections: &mut DetectionCache<D>,
    ) -> Result<Classification, PlanError> {
        let detections = detections.detect(&plate.image, None)?;
        let colonies = colonies_from_detections(&detections, plate.anchor_px, frame);
        let mut classification = self.assign(colonies, &plate.map);
        classification.invalid_px.extend(invalid_pixels(&detections));
        log::debug!(
            "plate {}: {} colonies in {} regions, {} outside every region",
            plate.index,
            classification.assigned_count(),
            classification.regions.len(),
            classification.unassigned.len()
        );
        Ok(classification)
    }
}

/// Per-mask detector runs, each mask bound to one cell.
#[derive(Clone, Debug)]
pub struct MaskClassifier {
    masks: Vec<MaskSpec>,
}

impl MaskClassifier {
    pub fn new(masks: Vec<MaskSpec>) -> Self {
        Self { masks }
    }

    pub fn masks(&self) -> &[MaskSpec] {
        &self.masks
    }

    /// Group per-mask colony lists by cell. Masks sharing a cell are
    /// concatenated in the order given.
    pub fn assign<I>(per_mask: I) -> Classification
    where
        I: IntoIterator<Item = (CellKey, Vec<Colony>)>,
    {
        let mut out = Classification::default();
        for (cell, colonies) in per_mask {
            let bucket = out.regions.entry(cell).or_default();
            bucket.extend(colonies.into_iter().map(|mut colony| {
                colony.cell = Some(cell);
                colony
            }));
        }
        out
    }
}

impl ColonyClassifier for MaskClassifier {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip_all, fields(plate = plate.index, masks = self.masks.len()))
    )]
    fn classify<D: Detector>(
        &self,
        plate: &Plate,
        frame: &CameraFrame,
        detections: &mut DetectionCache<D>,
    ) -> Result<Classification, PlanError> {
        let mut per_mask = Vec::with_capacity(self.masks.len());
        let mut invalid_px = Vec::new();
        for mask in &self.masks {
            let placed = PlacedMask::new(mask, plate, frame);
            let found = detections.detect(&plate.image, Some(&placed))?;
            let colonies = colonies_from_detections(&found, plate.anchor_px, frame);
            log::debug!(
                "plate {} mask {} -> cell {}: {} colonies",
                plate.index,
                mask.path.display(),
                mask.cell.label(),
                colonies.len()
            );
            invalid_px.extend(invalid_pixels(&found));
            per_mask.push((mask.cell, colonies));
        }
        let mut classification = Self::assign(per_mask);
        classification.invalid_px = invalid_px;
        Ok(classification)
    }
}

/// The configured strategy.
#[derive(Clone, Debug)]
pub enum Classifier {
    Regions(GeometricClassifier),
    Masks(MaskClassifier),
}

impl Classifier {
    pub fn from_params(params: &ClassifierParams) -> Self {
        match params {
            ClassifierParams::Regions(lattice) => Self::Regions(GeometricClassifier::new(*lattice)),
            ClassifierParams::Masks { masks } => Self::Masks(MaskClassifier::new(masks.clone())),
        }
    }
}

impl ColonyClassifier for Classifier {
    fn classify<D: Detector>(
        &self,
        plate: &Plate,
        frame: &CameraFrame,
        detections: &mut DetectionCache<D>,
    ) -> Result<Classification, PlanError> {
        match self {
            Self::Regions(c) => c.classify(plate, frame, detections),
            Self::Masks(c) => c.classify(plate, frame, detections),
        }
    }
}
