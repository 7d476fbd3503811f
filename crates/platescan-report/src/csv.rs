//! Comma-separated report serializer.
//!
//! One header line, then one line per successfully analyzed image:
//!
//! ```text
//! #,File Path,Total Pixels,Total Circles,Total Circles pixels,Total Oil pixels,Total plate pixels,Oil / Plate percent
//! 1,plates/day1/a.jpg,1200000,14,80211,40102,503311,7.380527112024106
//! ```
//!
//! Fields containing a comma, a double quote or a line break are wrapped
//! in double quotes with inner quotes doubled. The percentage uses the
//! shortest representation that round-trips (`30.0`, `NaN`).
//!
//! Lines end with `\n`. Rows are formatted independently so the caller
//! can append them one at a time as images complete.

use std::borrow::Cow;
use std::fmt::Write;

use platescan_pipeline::AnalysisMetrics;

/// Column names, in output order.
pub const HEADER: [&str; 8] = [
    "#",
    "File Path",
    "Total Pixels",
    "Total Circles",
    "Total Circles pixels",
    "Total Oil pixels",
    "Total plate pixels",
    "Oil / Plate percent",
];

/// `strftime`-style pattern of the timestamp embedded in report file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// One report line.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    /// 1-based position of the image in the sorted input list.
    pub index: usize,
    /// Source path as given to the analyzer.
    pub path: String,
    /// Counts and percentage for the image.
    pub metrics: AnalysisMetrics,
}

/// The header line, newline-terminated.
#[must_use]
pub fn header_line() -> String {
    let mut line = HEADER.join(",");
    line.push('\n');
    line
}

/// Format one row, newline-terminated.
///
/// # Examples
///
/// ```
/// use platescan_pipeline::AnalysisMetrics;
/// use platescan_report::{ReportRow, format_row};
///
/// let row = ReportRow {
///     index: 1,
///     path: "a.jpg".to_owned(),
///     metrics: AnalysisMetrics {
///         total_pixels: 100,
///         total_circles: 2,
///         total_circle_pixels: 20,
///         total_oil_pixels: 30,
///         total_plate_pixels: 70,
///         oil_plate_percent: 30.0,
///     },
/// };
/// assert_eq!(format_row(&row), "1,a.jpg,100,2,20,30,70,30.0\n");
/// ```
#[must_use]
pub fn format_row(row: &ReportRow) -> String {
    let m = &row.metrics;
    let mut line = String::new();
    let _ = writeln!(
        line,
        "{},{},{},{},{},{},{},{:?}",
        row.index,
        escape_field(&row.path),
        m.total_pixels,
        m.total_circles,
        m.total_circle_pixels,
        m.total_oil_pixels,
        m.total_plate_pixels,
        m.oil_plate_percent,
    );
    line
}

/// Serialize a whole report: header plus every row.
#[must_use]
pub fn to_csv(rows: &[ReportRow]) -> String {
    let mut out = header_line();
    for row in rows {
        out.push_str(&format_row(row));
    }
    out
}

/// Report file name for a formatted timestamp (see [`TIMESTAMP_FORMAT`]).
#[must_use]
pub fn report_file_name(timestamp: &str) -> String {
    format!("results_{timestamp}.csv")
}

/// Quote `field` if it would otherwise break the row apart.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
