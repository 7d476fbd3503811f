//! Integration test: analyze synthetic plates and serialize the report.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use image::{Rgb, RgbImage};
use platescan_pipeline::{AnalysisConfig, analyze};
use platescan_report::{HEADER, ReportRow, to_csv};

fn png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgb8,
    )
    .unwrap();
    buf
}

/// Dark band over the first `oil_rows` rows, bright green plate below.
fn plate(oil_rows: u32) -> RgbImage {
    RgbImage::from_fn(20, 10, |_, y| {
        if y < oil_rows {
            Rgb([8, 8, 8])
        } else {
            Rgb([0, 235, 0])
        }
    })
}

#[test]
fn analyzed_plates_serialize_to_report() {
    let config = AnalysisConfig::default();
    let inputs = [("a.jpg", plate(3)), ("b.jpg", plate(5))];

    let rows: Vec<ReportRow> = inputs
        .iter()
        .enumerate()
        .map(|(i, (path, img))| {
            let result = analyze(&png(img), &config).expect("analysis should succeed");
            ReportRow {
                index: i + 1,
                path: (*path).to_owned(),
                metrics: result.metrics,
            }
        })
        .collect();

    let csv = to_csv(&rows);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], HEADER.join(","));

    let first: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(first.len(), HEADER.len());
    assert_eq!(first[0], "1");
    assert_eq!(first[1], "a.jpg");
    assert_eq!(first[2], "200");
    assert_eq!(first[5], "60");
    assert_eq!(first[6], "140");
    assert_eq!(first[7], "30.0");

    let second: Vec<&str> = lines[2].split(',').collect();
    assert_eq!(second[0], "2");
    assert_eq!(second[7], "50.0");
}
