//! platescan-report: Pure tabular report serializer (sans-IO)
//!
//! Turns per-image analysis metrics into the delimited report written
//! alongside the annotated images. Returns `String`s; writing them is
//! the caller's job.

pub mod csv;

pub use csv::{HEADER, ReportRow, TIMESTAMP_FORMAT, format_row, header_line, report_file_name, to_csv};
