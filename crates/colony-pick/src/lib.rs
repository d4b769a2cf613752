//! Colony picking planner.
//!
//! Turns photographs of agar plates, a colony detector (OpenCFU) and
//! user-supplied plate maps into culture-block maps for a liquid-handling robot.
//!
//! ## Quickstart
//!
//! ```no_run
//! use colony_pick::{load_config, run, DetectionSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("run.json")?;
//! let outcome = run(&config, &DetectionSource::OpenCfu { archive: None })?;
//! println!("{} picks", outcome.plan.total_picks());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `colony_pick::core`: geometry, classification, isolation ranking, block packing.
//! - `colony_pick::io`: run configuration, OpenCFU bridge, report and preview writers.
//! - [`run`], [`plan_from_config`], [`write_outputs`]: end-to-end helpers.

pub use colony_pick_core as core;
pub use colony_pick_io as io;

pub use colony_pick_core::{CultureBlock, PickEntry, PickParams, PickPlan, PlanAssembler};
pub use colony_pick_io::RunConfig;

mod run;

pub use run::{load_config, plan_from_config, run, write_outputs, DetectionSource, RunError, RunOutcome};
