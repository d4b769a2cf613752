//! Core types and algorithms for turning colony detections into a pipetting plan.
//!
//! This crate is purely geometric and deterministic. It does *not* read files
//! or spawn processes: detections arrive through the [`Detector`] trait, and
//! plate maps are handed in already parsed.
//!
//! Pipeline, per plate:
//! 1. Convert valid pixel detections to plate-local millimeters ([`CameraFrame`]).
//! 2. Assign colonies to plate-map cells ([`Classifier`]: geometric regions or masks).
//! 3. Rank each cell's colonies by isolation and keep the top `k` ([`rank_by_isolation`]).
//! 4. Feed the picks into a single [`BlockPacker`] stream.
//!
//! [`PlanAssembler`] drives all four steps and returns a [`PickPlan`].

mod cell;
mod classify;
mod colony;
mod detect;
mod logger;
mod pack;
mod params;
mod plan;
mod plate;
mod region;
mod select;
mod transform;

pub use cell::CellKey;
pub use classify::{
    Classification, Classifier, ColonyClassifier, GeometricClassifier, MaskClassifier,
};
pub use colony::{colonies_from_detections, Colony, Detection, PickEntry};
pub use detect::{DetectionCache, Detector, PlacedMask};
pub use pack::{pack, BlockPacker, CultureBlock};
pub use params::{ClassifierParams, ConfigError, MaskSpec, PickParams};
pub use plan::{ColonyDiagnostic, PickPlan, PlanAssembler, PlanError, PlateDiagnostics};
pub use plate::{layout_plates, Plate, PlateLayoutError, PlateMap};
pub use region::{RegionGeometry, RegionKind, RegionLattice};
pub use select::{rank_by_isolation, select_most_isolated, ISOLATED_DISTANCE_MM};
pub use transform::{to_plate_mm, CameraFrame};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, warnings_logged};
