//! Mask images laid onto one plate of a photograph before a masked detector run.

use std::path::{Path, PathBuf};

use colony_pick_core::PlacedMask;
use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{warp, Interpolation, Projection};

use crate::DetectorError;

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<image stem>__<mask stem>__plate<n>.png`.
pub fn placed_mask_file_name(image: &Path, mask: &PlacedMask) -> PathBuf {
    PathBuf::from(format!(
        "{}__{}__plate{}.png",
        stem(image),
        stem(&mask.path),
        mask.plate
    ))
}

/// Render `mask` on a `width` x `height` canvas the size of the photograph.
///
/// The mask is cropped to the canvas first, then rotated by the camera tilt
/// about its top-left corner and moved onto the plate anchor. Nearest-neighbour
/// sampling keeps binary masks binary; uncovered pixels are black.
pub fn place_mask(mask: &GrayImage, width: u32, height: u32, placement: &PlacedMask) -> GrayImage {
    let mut canvas = GrayImage::new(width, height);
    image::imageops::replace(&mut canvas, mask, 0, 0);

    let anchor = placement.anchor_px;
    let projection = Projection::rotate(placement.rotation_rad() as f32)
        .and_then(Projection::translate(anchor.x as f32, anchor.y as f32));
    warp(&canvas, &projection, Interpolation::Nearest, Luma([0]))
}

/// Place the mask of `placement` over `image` and save it as a PNG in `dir`.
pub fn write_placed_mask(
    image: &Path,
    placement: &PlacedMask,
    dir: &Path,
) -> Result<PathBuf, DetectorError> {
    let mask_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| DetectorError::Mask { path, source }
    };
    let (width, height) = image::image_dimensions(image).map_err(mask_error(image))?;
    let mask = image::open(&placement.path)
        .map_err(mask_error(&placement.path))?
        .to_luma8();

    let path = dir.join(placed_mask_file_name(image, placement));
    place_mask(&mask, width, height, placement)
        .save(&path)
        .map_err(mask_error(&path))?;
    log::debug!(
        "mask {} placed on plate {} at ({:.1}, {:.1}) -> {}",
        placement.path.display(),
        placement.plate,
        placement.anchor_px.x,
        placement.anchor_px.y,
        path.display()
    );
    Ok(path)
}
