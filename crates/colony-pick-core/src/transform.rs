//! Pixel -> plate-millimeter coordinate transform.

use nalgebra::{Point2, Rotation2};
use serde::{Deserialize, Serialize};

/// Camera pose and calibration shared by every plate of a run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraFrame {
    /// Clockwise tilt of the camera relative to the robot frame, in degrees.
    pub rotation_deg: f64,
    /// Image scale.
    pub pixels_per_mm: f64,
    /// Calibration fiducial, in the rotated and scaled millimeter frame
    /// (image-down positive). Becomes `(0, 0)` after the transform.
    pub calibration_origin_mm: Point2<f64>,
}

impl Default for CameraFrame {
    fn default() -> Self {
        Self {
            rotation_deg: 0.0,
            pixels_per_mm: 10.0,
            calibration_origin_mm: Point2::origin(),
        }
    }
}

impl CameraFrame {
    /// Rotation angle in radians, normalised to `[0, 2π)` so that `r` and
    /// `r + 360` produce the same matrix.
    #[inline]
    fn rotation_rad(&self) -> f64 {
        self.rotation_deg.rem_euclid(360.0).to_radians()
    }

    /// Map a pixel to plate-local millimeters (robot frame, up positive).
    #[inline]
    pub fn to_plate_mm(&self, pixel: Point2<f64>, anchor_px: Point2<f64>) -> Point2<f64> {
        let correction = Rotation2::new(-self.rotation_rad());
        let local_mm = (correction * (pixel - anchor_px)) / self.pixels_per_mm;
        let origin = self.calibration_origin_mm;
        Point2::new(local_mm.x - origin.x, origin.y - local_mm.y)
    }

    /// Inverse of [`CameraFrame::to_plate_mm`].
    pub fn to_pixel(&self, plate_mm: Point2<f64>, anchor_px: Point2<f64>) -> Point2<f64> {
        let origin = self.calibration_origin_mm;
        let local_mm = nalgebra::Vector2::new(plate_mm.x + origin.x, origin.y - plate_mm.y);
        let camera = Rotation2::new(self.rotation_rad());
        anchor_px + camera * (local_mm * self.pixels_per_mm)
    }
}

/// Free-function form of [`CameraFrame::to_plate_mm`].
///
/// Steps: translate relative to the plate anchor, counter-rotate by the camera
/// tilt, divide by the pixel scale, re-base on the calibration origin and flip
/// the vertical axis.
#[inline]
pub fn to_plate_mm(
    pixel: Point2<f64>,
    anchor_px: Point2<f64>,
    rotation_deg: f64,
    pixels_per_mm: f64,
    calibration_origin_mm: Point2<f64>,
) -> Point2<f64> {
    CameraFrame {
        rotation_deg,
        pixels_per_mm,
        calibration_origin_mm,
    }
    .to_plate_mm(pixel, anchor_px)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn frame(rotation_deg: f64) -> CameraFrame {
        CameraFrame {
            rotation_deg,
            pixels_per_mm: 12.5,
            calibration_origin_mm: Point2::new(-31.0, -22.5),
        }
    }

    #[test]
    fn unrotated_transform_scales_and_flips_y() {
        let f = CameraFrame {
            rotation_deg: 0.0,
            pixels_per_mm: 2.0,
            calibration_origin_mm: Point2::new(5.0, 5.0),
        };
        let anchor = Point2::new(100.0, 100.0);

        assert_eq!(f.to_plate_mm(Point2::new(110.0, 110.0), anchor), Point2::origin());
        // 4 px right and 4 px down of the fiducial: +2 mm x, -2 mm y.
        assert_eq!(
            f.to_plate_mm(Point2::new(114.0, 114.0), anchor),
            Point2::new(2.0, -2.0)
        );
    }

    #[test]
    fn calibration_origin_pixel_maps_to_zero() {
        let anchor = Point2::new(812.0, 640.0);
        for rotation in [0.0, 3.5, -12.0, 90.0, 181.25] {
            let f = frame(rotation);
            let fiducial_px = f.to_pixel(Point2::origin(), anchor);
            let mm = f.to_plate_mm(fiducial_px, anchor);
            assert_abs_diff_eq!(mm.x, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(mm.y, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn rotation_is_periodic_in_360_degrees() {
        let anchor = Point2::new(400.0, 300.0);
        let pixel = Point2::new(523.25, 97.5);

        // Exactly representable angles normalise to the same value bit for bit.
        for rotation in [12.5, -90.0, 0.0, 270.0] {
            assert_eq!(
                frame(rotation).to_plate_mm(pixel, anchor),
                frame(rotation + 360.0).to_plate_mm(pixel, anchor)
            );
        }

        let a = frame(1.7).to_plate_mm(pixel, anchor);
        let b = frame(361.7).to_plate_mm(pixel, anchor);
        assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-9);
        assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-9);
    }

    #[test]
    fn quarter_turn_counter_rotates_camera_tilt() {
        let f = CameraFrame {
            rotation_deg: 90.0,
            pixels_per_mm: 1.0,
            calibration_origin_mm: Point2::origin(),
        };
        // Camera tilted 90° clockwise: image +x lands on robot +y.
        let mm = f.to_plate_mm(Point2::new(10.0, 0.0), Point2::origin());
        assert_abs_diff_eq!(mm.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mm.y, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn free_function_matches_frame_method() {
        let f = frame(7.0);
        let anchor = Point2::new(10.0, 20.0);
        let pixel = Point2::new(250.0, 180.0);
        assert_eq!(
            to_plate_mm(
                pixel,
                anchor,
                f.rotation_deg,
                f.pixels_per_mm,
                f.calibration_origin_mm
            ),
            f.to_plate_mm(pixel, anchor)
        );
    }

    #[test]
    fn to_pixel_inverts_to_plate_mm() {
        let f = frame(-33.0);
        let anchor = Point2::new(1000.0, 750.0);
        let mm = Point2::new(14.25, -3.5);
        let back = f.to_plate_mm(f.to_pixel(mm, anchor), anchor);
        assert_abs_diff_eq!(back.x, mm.x, epsilon = 1e-9);
        assert_abs_diff_eq!(back.y, mm.y, epsilon = 1e-9);
    }
}
