//! Preview images: each detection circled on its photograph.
//!
//! Previews are rendered in memory first ([`render_previews`]) so a run can
//! find an unreadable photograph before it writes any output.

use std::fs;
use std::path::{Path, PathBuf};

use colony_pick_core::{ColonyDiagnostic, PlateDiagnostics};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_circle_mut;
use nalgebra::Point2;

#[derive(thiserror::Error, Debug)]
pub enum PreviewError {
    #[error("failed to render preview of {}: {source}", .image.display())]
    Render {
        image: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Save(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub const RING_RADIUS_PX: i32 = 4;
/// Picked colony.
pub const SELECTED_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
/// Valid colony that was not picked.
pub const UNSELECTED_COLOR: Rgba<u8> = Rgba([255, 200, 0, 255]);
/// Detector row marked invalid.
pub const INVALID_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// `preview_<image stem>.png`.
pub fn preview_file_name(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    PathBuf::from(format!("preview_{stem}.png"))
}

/// Ring of [`RING_RADIUS_PX`] around `center`, clipped to the image.
pub fn draw_ring(img: &mut RgbaImage, center: Point2<f64>, color: Rgba<u8>) {
    if !(center.x.is_finite() && center.y.is_finite()) {
        return;
    }
    let center = (center.x.round() as i32, center.y.round() as i32);
    draw_hollow_circle_mut(img, center, RING_RADIUS_PX, color);
}

/// Circle every colony: green when picked, amber otherwise.
pub fn draw_colonies<'a, I>(img: &mut RgbaImage, colonies: I)
where
    I: IntoIterator<Item = &'a ColonyDiagnostic>,
{
    for colony in colonies {
        let color = if colony.selected {
            SELECTED_COLOR
        } else {
            UNSELECTED_COLOR
        };
        draw_ring(img, colony.pixel, color);
    }
}

/// Invalid detections in red underneath the colonies of `plate`.
pub fn draw_plate(img: &mut RgbaImage, plate: &PlateDiagnostics) {
    for &pixel in &plate.invalid_px {
        draw_ring(img, pixel, INVALID_COLOR);
    }
    draw_colonies(img, &plate.colonies);
}

/// A rendered preview, not yet saved.
#[derive(Debug, Clone)]
pub struct Preview {
    pub file_name: PathBuf,
    pub image: RgbaImage,
}

/// Render one preview per photograph. Plates sharing a photograph are drawn
/// onto the same preview, in plate order.
pub fn render_previews(plates: &[PlateDiagnostics]) -> Result<Vec<Preview>, PreviewError> {
    let mut photos: Vec<&Path> = Vec::new();
    for plate in plates {
        if !photos.contains(&plate.image.as_path()) {
            photos.push(&plate.image);
        }
    }

    photos
        .into_iter()
        .map(|photo| {
            let mut canvas = image::open(photo)
                .map_err(|source| PreviewError::Render {
                    image: photo.to_path_buf(),
                    source,
                })?
                .to_rgba8();
            for plate in plates.iter().filter(|p| p.image == photo) {
                draw_plate(&mut canvas, plate);
            }
            Ok(Preview {
                file_name: preview_file_name(photo),
                image: canvas,
            })
        })
        .collect()
}

/// Save rendered previews into `dir`, creating it if needed.
pub fn save_previews(previews: &[Preview], dir: &Path) -> Result<Vec<PathBuf>, PreviewError> {
    fs::create_dir_all(dir)?;
    previews
        .iter()
        .map(|preview| {
            let path = dir.join(&preview.file_name);
            preview.image.save(&path)?;
            log::debug!("preview {}", path.display());
            Ok(path)
        })
        .collect()
}

/// [`render_previews`] then [`save_previews`].
pub fn write_previews(plates: &[PlateDiagnostics], dir: &Path) -> Result<Vec<PathBuf>, PreviewError> {
    save_previews(&render_previews(plates)?, dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_pick_core::CellKey;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn diagnostic(x: f64, y: f64, selected: bool) -> ColonyDiagnostic {
        ColonyDiagnostic {
            pixel: Point2::new(x, y),
            position_mm: Point2::origin(),
            cell: Some(CellKey::new(0, 0)),
            plasmid: Some("pA".into()),
            min_distance_mm: None,
            selected,
        }
    }

    fn plate(index: usize, image: &Path, colonies: Vec<ColonyDiagnostic>) -> PlateDiagnostics {
        PlateDiagnostics {
            plate_index: index,
            source: format!("plate_{index}"),
            image: image.to_path_buf(),
            colonies,
            invalid_px: Vec::new(),
        }
    }

    #[test]
    fn ring_is_clipped_and_leaves_center_untouched() {
        let mut img = RgbaImage::new(12, 12);
        draw_ring(&mut img, Point2::new(1.0, 6.0), SELECTED_COLOR);
        assert_eq!(*img.get_pixel(5, 6), SELECTED_COLOR);
        assert_eq!(*img.get_pixel(1, 10), SELECTED_COLOR);
        assert_eq!(*img.get_pixel(1, 6), Rgba([0, 0, 0, 0]));

        draw_ring(&mut img, Point2::new(f64::NAN, 3.0), INVALID_COLOR);
        assert!(img.pixels().all(|p| *p != INVALID_COLOR));
    }

    #[test]
    fn previews_colour_picked_unpicked_and_invalid_detections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let photo = dir.path().join("plates_01.png");
        RgbaImage::from_pixel(24, 24, BLACK)
            .save(&photo)
            .expect("save photo");

        let mut left = plate(0, &photo, vec![diagnostic(10.0, 10.0, true)]);
        left.invalid_px.push(Point2::new(4.0, 18.0));
        let right = plate(1, &photo, vec![diagnostic(18.0, 4.0, false)]);

        let out = dir.path().join("previews");
        let written = write_previews(&[left, right], &out).expect("previews");
        assert_eq!(written, vec![out.join("preview_plates_01.png")]);

        let preview = image::open(&written[0]).expect("open").to_rgba8();
        assert_eq!(*preview.get_pixel(14, 10), SELECTED_COLOR);
        assert_eq!(*preview.get_pixel(18, 8), UNSELECTED_COLOR);
        assert_eq!(*preview.get_pixel(8, 18), INVALID_COLOR);
        assert_eq!(*preview.get_pixel(10, 10), BLACK);
    }

    #[test]
    fn missing_photograph_fails_before_anything_is_saved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let photo = dir.path().join("absent.jpg");
        let err = render_previews(&[plate(0, &photo, Vec::new())]).expect_err("no photo");
        assert!(matches!(err, PreviewError::Render { ref image, .. } if image == &photo));
        assert!(err.to_string().contains("absent.jpg"), "{err}");
    }
}
