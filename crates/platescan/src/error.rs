//! Error types for the batch runner.
//!
//! [`ImageError`] is scoped to one input file: it is logged, recorded in
//! the summary, and the batch moves on. [`BatchError`] stops the run.

use std::io;
use std::path::PathBuf;

use platescan_pipeline::PipelineError;

/// Failure while processing a single input file.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The input file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Analysis rejected the image.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// An output image could not be encoded or written.
    #[error("failed to save {}: {source}", path.display())]
    Save {
        /// Destination path.
        path: PathBuf,
        /// Underlying encoder or I/O error.
        source: image::ImageError,
    },

    /// An output directory could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl ImageError {
    /// Stable short name of the error kind, used in logs and summaries.
    ///
    /// An unreadable file reports `load`, the same as an undecodable one.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Read { .. } => "load",
            Self::Pipeline(e) => e.kind(),
            Self::Save { .. } | Self::CreateDir { .. } => "save",
        }
    }
}

/// Failure that aborts the whole batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The analysis configuration failed validation.
    #[error(transparent)]
    InvalidConfig(PipelineError),

    /// The input path could not be enumerated.
    #[error("cannot read inputs at {}: {source}", path.display())]
    Inputs {
        /// Input root.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The input path holds no matching images.
    #[error("no .{extension} images found under {}", path.display())]
    NoInputs {
        /// Input root.
        path: PathBuf,
        /// Extension that was searched for.
        extension: String,
    },

    /// The report file could not be created or written.
    #[error("failed to write report {}: {source}", path.display())]
    Report {
        /// Report path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_failures_are_load_errors() {
        let err = ImageError::Read {
            path: PathBuf::from("missing.jpg"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.kind(), "load");
        assert!(err.to_string().contains("missing.jpg"));
    }

    #[test]
    fn pipeline_kinds_pass_through() {
        assert_eq!(ImageError::from(PipelineError::NoCircles).kind(), "detection");
        assert_eq!(
            ImageError::from(PipelineError::DegenerateMetric).kind(),
            "degenerate-metric"
        );
    }
}
