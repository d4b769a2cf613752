//! File and process side of colony picking.
//!
//! - [`RunConfig`]: JSON run configuration, plate-map loading and plate layout.
//! - [`OpenCfuDetector`] and [`SavedDetections`]: [`colony_pick_core::Detector`]
//!   implementations backed by OpenCFU or by tables it wrote earlier.
//! - [`write_reports`]: block-map CSVs plus JSON plan and diagnostics.
//! - [`write_previews`] (feature `image`): colony rings drawn on the photographs.
//! - [`write_placed_mask`] (feature `image`): a mask laid onto one plate for a
//!   masked OpenCFU run.

mod config;
mod error;
mod opencfu;
mod plate_map;
mod report;
mod saved;

#[cfg(feature = "image")]
mod mask;
#[cfg(feature = "image")]
mod preview;

pub use config::RunConfig;
pub use error::{DetectorError, IoError, PlateMapError, RunConfigError};
pub use opencfu::{format_detection_table, parse_detection_table, OpenCfuConfig, OpenCfuDetector};
pub use plate_map::{plate_source, read_plate_map};
pub use report::{
    load_blocks, load_diagnostics, write_block_map, write_reports, ReportPaths, DIAGNOSTICS_FILE,
    PLAN_FILE,
};
pub use saved::{table_file_name, SavedDetections};

#[cfg(feature = "image")]
pub use mask::{place_mask, placed_mask_file_name, write_placed_mask};
#[cfg(feature = "image")]
pub use preview::{
    draw_colonies, draw_plate, draw_ring, preview_file_name, render_previews, save_previews,
    write_previews, Preview, PreviewError, INVALID_COLOR, RING_RADIUS_PX, SELECTED_COLOR,
    UNSELECTED_COLOR,
};
