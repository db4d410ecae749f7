//! Integration test: cut an image, export the outline and manifest, and
//! read both back.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use image::{Rgba, RgbaImage};
use jigcut_core::{PuzzleConfig, build_puzzle, parse_path_data, rasterize_path_data};
use jigcut_export::{SvgMetadata, to_manifest_json, to_svg};

/// Every `d="…"` attribute in document order.
fn path_data(svg: &str) -> Vec<&str> {
    svg.split(" d=\"")
        .skip(1)
        .map(|rest| rest.split('"').next().unwrap())
        .collect()
}

#[test]
fn exported_outline_reproduces_the_stencil() {
    let image = RgbaImage::from_fn(200, 150, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    let config = PuzzleConfig {
        rows: 3,
        cols: 4,
        seed: Some(2024.0),
        ..PuzzleConfig::default()
    };
    let puzzle = build_puzzle(image, &config, None).expect("cutting should succeed");
    let config_json = serde_json::to_string(&config).unwrap();
    let svg = to_svg(
        &puzzle.path,
        &SvgMetadata {
            title: Some("gradient"),
            config_json: Some(&config_json),
            ..SvgMetadata::default()
        },
    );

    let parts = path_data(&svg);
    assert_eq!(parts.len(), 3);
    let subpaths: usize = parts
        .iter()
        .map(|d| parse_path_data(d).unwrap().len())
        .sum();
    // 2 horizontal + 3 vertical lines + the border.
    assert_eq!(subpaths, 6);

    // Cutting along the exported file gives (nearly) the same stencil; the
    // parser reads coordinates as f32.
    let joined = parts.join(" ");
    let mut reloaded = rasterize_path_data(&joined, 200, 150).unwrap();
    reloaded.seal_pockets(puzzle.shape);
    let differing = reloaded
        .as_gray()
        .pixels()
        .zip(puzzle.stencil.as_gray().pixels())
        .filter(|(a, b)| a != b)
        .count();
    assert!(differing <= 10, "{differing} pixels differ");

    let manifest: serde_json::Value =
        serde_json::from_str(&to_manifest_json(&puzzle).unwrap()).unwrap();
    assert_eq!(manifest["pieces"].as_array().unwrap().len(), 12);
    assert_eq!(manifest["rows"], 3);
    assert_eq!(manifest["cols"], 4);
}
