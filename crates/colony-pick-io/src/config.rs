//! JSON run configuration.

use std::fs;
use std::path::{Path, PathBuf};

use colony_pick_core::{layout_plates, ClassifierParams, PickParams, Plate};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{plate_map::plate_source, read_plate_map, IoError, OpenCfuConfig, RunConfigError};

fn default_output_dir() -> PathBuf {
    PathBuf::from("colony_pick_output")
}

/// Everything one planning run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Photographs, in the order plates are laid onto them.
    pub images: Vec<PathBuf>,
    /// One plate-map CSV per plate, in plate order.
    pub plate_maps: Vec<PathBuf>,
    /// Plate anchors within a photograph, in pixels. Each photograph hosts
    /// one plate per location.
    pub plate_locations: Vec<Point2<f64>>,
    #[serde(default)]
    pub opencfu: OpenCfuConfig,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub draw_previews: bool,
    /// Defaults to `<output_dir>/previews`.
    #[serde(default)]
    pub preview_dir: Option<PathBuf>,
    #[serde(default)]
    pub params: PickParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            images: vec![PathBuf::from("images/plates_01.jpg")],
            plate_maps: vec![
                PathBuf::from("plate_maps/plate_1.csv"),
                PathBuf::from("plate_maps/plate_2.csv"),
            ],
            plate_locations: vec![Point2::new(640.0, 720.0), Point2::new(1920.0, 720.0)],
            opencfu: OpenCfuConfig::default(),
            output_dir: default_output_dir(),
            draw_previews: true,
            preview_dir: None,
            params: PickParams::default(),
        }
    }
}

impl RunConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve relative paths against `base` (usually the config file's directory).
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.images.iter_mut().for_each(join);
        self.plate_maps.iter_mut().for_each(join);
        join(&mut self.output_dir);
        if let Some(dir) = self.preview_dir.as_mut() {
            join(dir);
        }
        if let Some(dir) = self.opencfu.working_dir.as_mut() {
            join(dir);
        }
        if let ClassifierParams::Masks { masks } = &mut self.params.classifier {
            masks.iter_mut().for_each(|m| join(&mut m.path));
        }
        self
    }

    /// Resolve the preview directory.
    pub fn preview_dir(&self) -> PathBuf {
        self.preview_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("previews"))
    }

    /// Validated pick parameters.
    pub fn build_params(&self) -> Result<PickParams, RunConfigError> {
        self.params.validate()?;
        Ok(self.params.clone())
    }

    /// Read every plate map and lay the plates out over the photographs.
    pub fn build_plates(&self) -> Result<Vec<Plate>, RunConfigError> {
        if self.plate_maps.is_empty() {
            return Err(RunConfigError::NoPlateMaps);
        }
        let maps = self
            .plate_maps
            .iter()
            .map(|path| Ok((plate_source(path), read_plate_map(path)?)))
            .collect::<Result<Vec<_>, RunConfigError>>()?;
        let plates = layout_plates(&self.images, maps, &self.plate_locations)?;
        log::info!(
            "{} plates over {} images ({} per image)",
            plates.len(),
            self.images.len(),
            self.plate_locations.len()
        );
        Ok(plates)
    }
}
