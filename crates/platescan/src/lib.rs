//! platescan: batch analysis of plate photographs.
//!
//! Walks an input path, runs every image through
//! [`platescan_pipeline`], writes the annotated images under
//! `<output>/images/` and streams one report row per image into
//! `<output>/results_<timestamp>.csv`.
//!
//! All filesystem interaction lives here; the analysis itself and the
//! report formatting are sans-IO crates.

pub mod batch;
pub mod error;
pub mod inputs;
pub mod output;

pub use batch::{BatchOptions, BatchSummary, Failure, StdClock, process_one, run_batch};
pub use error::{BatchError, ImageError};
pub use inputs::{DEFAULT_EXTENSION, collect_inputs};
