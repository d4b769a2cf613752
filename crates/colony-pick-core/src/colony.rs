use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{CameraFrame, CellKey};

/// One row of blob-detector output, in image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Row index in the detector output.
    pub index: usize,
    pub pixel: Point2<f64>,
    pub is_valid: bool,
}

/// A detected colony localized on its plate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    /// Index of the detection this colony was built from.
    pub detection_index: usize,
    /// Original image position, kept for previews.
    pub pixel: Point2<f64>,
    /// Plate-local robot coordinate.
    pub position_mm: Point2<f64>,
    /// Cell the classifier assigned, if any.
    #[serde(default)]
    pub cell: Option<CellKey>,
    /// Distance to the nearest other colony of the same cell.
    #[serde(default)]
    pub min_distance_mm: Option<f64>,
}

impl Colony {
    pub fn new(detection_index: usize, pixel: Point2<f64>, position_mm: Point2<f64>) -> Self {
        Self {
            detection_index,
            pixel,
            position_mm,
            cell: None,
            min_distance_mm: None,
        }
    }

    #[inline]
    pub fn distance_to(&self, other: &Colony) -> f64 {
        (other.position_mm - self.position_mm).norm()
    }
}

/// One scheduled pick: which plasmid, from which plate, at which coordinate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickEntry {
    pub plasmid: String,
    /// Source plate identifier (plate-map file stem).
    pub source: String,
    pub position_mm: Point2<f64>,
}

/// Convert the valid detections of one plate into colonies.
///
/// Invalid rows are dropped; order is preserved.
pub fn colonies_from_detections(
    detections: &[Detection],
    anchor_px: Point2<f64>,
    frame: &CameraFrame,
) -> Vec<Colony> {
    detections
        .iter()
        .filter(|d| d.is_valid)
        .map(|d| Colony::new(d.index, d.pixel, frame.to_plate_mm(d.pixel, anchor_px)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_detections_are_dropped_in_order() {
        let frame = CameraFrame {
            rotation_deg: 0.0,
            pixels_per_mm: 1.0,
            calibration_origin_mm: Point2::origin(),
        };
        let detections = [
            Detection {
                index: 0,
                pixel: Point2::new(1.0, 2.0),
                is_valid: true,
            },
            Detection {
                index: 1,
                pixel: Point2::new(3.0, 4.0),
                is_valid: false,
            },
            Detection {
                index: 2,
                pixel: Point2::new(5.0, 6.0),
                is_valid: true,
            },
        ];

        let colonies = colonies_from_detections(&detections, Point2::origin(), &frame);
        let indices: Vec<usize> = colonies.iter().map(|c| c.detection_index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(colonies[1].position_mm, Point2::new(5.0, -6.0));
        assert_eq!(colonies[1].pixel, Point2::new(5.0, 6.0));
        assert!(colonies.iter().all(|c| c.cell.is_none()));
    }
}
