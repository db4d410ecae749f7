//! JSON manifest of a cut puzzle.
//!
//! Lists the seed, grid and image size, then one entry per piece with its
//! cell, board target and bitmap size. Front ends load the piece PNGs by
//! `file` and place them at `target`.

use serde::Serialize;

use jigcut_core::{Dimensions, Point, Puzzle};

use crate::ExportError;

/// Top-level manifest document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    /// Seed that reproduces the curve field.
    pub seed: f64,
    /// Number of rows.
    pub rows: u32,
    /// Number of columns.
    pub cols: u32,
    /// Source image size.
    pub dimensions: Dimensions,
    /// One entry per piece, row-major.
    pub pieces: Vec<PieceEntry>,
}

/// Manifest entry for one piece.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieceEntry {
    /// Row-major piece index.
    pub id: usize,
    /// Grid row of the piece's cell.
    pub row: u32,
    /// Grid column of the piece's cell.
    pub col: u32,
    /// Bitmap file name, see [`piece_file_name`].
    pub file: String,
    /// Board position at which the piece is correctly placed.
    pub target: Point,
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
    /// Number of source pixels in the piece.
    pub pixels: usize,
}

/// `piece-<row>-<col>.png`
#[must_use]
pub fn piece_file_name(row: u32, col: u32) -> String {
    format!("piece-{row}-{col}.png")
}

impl Manifest {
    /// Describe `puzzle`.
    #[must_use]
    pub fn new(puzzle: &Puzzle) -> Self {
        let pieces = puzzle
            .pieces
            .iter()
            .map(|piece| {
                let cell = piece.cell();
                PieceEntry {
                    id: piece.id().0,
                    row: cell.row,
                    col: cell.col,
                    file: piece_file_name(cell.row, cell.col),
                    target: piece.target(),
                    width: piece.width(),
                    height: piece.height(),
                    pixels: piece.region().len(),
                }
            })
            .collect();
        Self {
            seed: puzzle.seed,
            rows: puzzle.shape.rows(),
            cols: puzzle.shape.cols(),
            dimensions: puzzle.dimensions,
            pieces,
        }
    }
}

/// Serialize the manifest of `puzzle` as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails, which only
/// happens for a non-finite seed or target.
pub fn to_manifest_json(puzzle: &Puzzle) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&Manifest::new(puzzle))?)
}
