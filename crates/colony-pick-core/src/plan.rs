//! Plan assembly: plates -> classification -> isolation ranking -> packing.

use std::path::PathBuf;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{
    rank_by_isolation, BlockPacker, CellKey, Classifier, Colony, ColonyClassifier, ConfigError,
    CultureBlock, DetectionCache, Detector, PickEntry, PickParams, Plate, PlateLayoutError,
};

/// Fatal run errors. No partial plan is returned.
#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    PlateLayout(#[from] PlateLayoutError),
    #[error("detector failed on {}{}: {source}", .image.display(), mask_suffix(.mask))]
    Detector {
        image: PathBuf,
        mask: Option<PathBuf>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

fn mask_suffix(mask: &Option<PathBuf>) -> String {
    mask.as_ref()
        .map(|m| format!(" (mask {})", m.display()))
        .unwrap_or_default()
}

/// Per-colony record for preview rendering and audits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColonyDiagnostic {
    pub pixel: Point2<f64>,
    pub position_mm: Point2<f64>,
    pub cell: Option<CellKey>,
    /// Plasmid of the cell; `None` when unassigned or the cell is blank.
    pub plasmid: Option<String>,
    pub min_distance_mm: Option<f64>,
    pub selected: bool,
}

impl ColonyDiagnostic {
    fn new(colony: Colony, plasmid: Option<&str>, selected: bool) -> Self {
        Self {
            pixel: colony.pixel,
            position_mm: colony.position_mm,
            cell: colony.cell,
            plasmid: plasmid.map(str::to_owned),
            min_distance_mm: colony.min_distance_mm,
            selected,
        }
    }
}

/// Every valid colony found on one plate, plus the pixels of the detector
/// rows marked invalid in the runs made for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlateDiagnostics {
    pub plate_index: usize,
    pub source: String,
    pub image: PathBuf,
    pub colonies: Vec<ColonyDiagnostic>,
    /// Plates sharing a photograph under the region strategy share one
    /// detector run, so they list the same invalid rows.
    #[serde(default)]
    pub invalid_px: Vec<Point2<f64>>,
}

impl PlateDiagnostics {
    pub fn selected(&self) -> impl Iterator<Item = &ColonyDiagnostic> {
        self.colonies.iter().filter(|c| c.selected)
    }
}

/// Result of a run: culture blocks plus per-plate diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickPlan {
    pub blocks: Vec<CultureBlock>,
    pub plates: Vec<PlateDiagnostics>,
}

impl PickPlan {
    pub fn total_picks(&self) -> usize {
        self.blocks.iter().map(CultureBlock::len).sum()
    }

    /// All picks in the order the robot executes them.
    pub fn entries(&self) -> impl Iterator<Item = &PickEntry> {
        self.blocks.iter().flat_map(CultureBlock::entries)
    }
}

/// Drives classification, selection and packing over all plates.
#[derive(Clone, Debug)]
pub struct PlanAssembler {
    params: PickParams,
    classifier: Classifier,
}

impl PlanAssembler {
    /// Validate `params` and build the configured classifier.
    pub fn new(params: PickParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let classifier = Classifier::from_params(&params.classifier);
        Ok(Self { params, classifier })
    }

    pub fn params(&self) -> &PickParams {
        &self.params
    }

    /// Build the plan.
    ///
    /// Picks are emitted plate by plate, cell by cell in row-major order, most
    /// isolated colony first, into one packer stream. Cells whose plate-map
    /// entry is blank or missing emit nothing.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip_all, fields(plates = plates.len()))
    )]
    pub fn assemble<D: Detector>(
        &self,
        plates: &[Plate],
        detector: D,
    ) -> Result<PickPlan, PlanError> {
        let mut detections = DetectionCache::new(detector);
        let mut packer = BlockPacker::new(self.params.block_rows, self.params.block_columns);
        let mut diagnostics = Vec::with_capacity(plates.len());

        for plate in plates {
            let classification =
                self.classifier
                    .classify(plate, &self.params.frame, &mut detections)?;

            let mut colonies = Vec::new();
            let mut picked = 0usize;
            for (cell, members) in classification.regions {
                let ranked = rank_by_isolation(members);
                let plasmid = plate.map.plasmid(cell);
                let Some(name) = plasmid else {
                    log::debug!(
                        "plate {}: cell {} has no plasmid, skipping {} colonies",
                        plate.index,
                        cell.label(),
                        ranked.len()
                    );
                    colonies.extend(
                        ranked
                            .into_iter()
                            .map(|c| ColonyDiagnostic::new(c, None, false)),
                    );
                    continue;
                };

                if ranked.len() < self.params.colonies_to_pick {
                    log::warn!(
                        "plate {} cell {} ({}): {} colonies found, {} requested",
                        plate.index,
                        cell.label(),
                        name,
                        ranked.len(),
                        self.params.colonies_to_pick
                    );
                }

                for (rank, colony) in ranked.into_iter().enumerate() {
                    let selected = rank < self.params.colonies_to_pick;
                    if selected {
                        packer.push(PickEntry {
                            plasmid: name.to_owned(),
                            source: plate.source.clone(),
                            position_mm: colony.position_mm,
                        });
                        picked += 1;
                    }
                    colonies.push(ColonyDiagnostic::new(colony, Some(name), selected));
                }
            }
            colonies.extend(
                classification
                    .unassigned
                    .into_iter()
                    .map(|c| ColonyDiagnostic::new(c, None, false)),
            );

            log::info!(
                "plate {} ({}): {} colonies, {} picked",
                plate.index,
                plate.source,
                colonies.len(),
                picked
            );
            diagnostics.push(PlateDiagnostics {
                plate_index: plate.index,
                source: plate.source.clone(),
                image: plate.image.clone(),
                colonies,
                invalid_px: classification.invalid_px,
            });
        }

        let blocks = packer.finish();
        log::info!(
            "plan: {} picks in {} culture blocks ({} detector runs)",
            blocks.iter().map(CultureBlock::len).sum::<usize>(),
            blocks.len(),
            detections.calls()
        );
        Ok(PickPlan {
            blocks,
            plates: diagnostics,
        })
    }
}
