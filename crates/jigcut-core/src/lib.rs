//! jigcut-core: Pure jigsaw cutting core (sans-IO).
//!
//! Turns an image and an R×C grid into interlocking jigsaw pieces:
//! curve field generation -> stencil rasterization -> parallel flood-fill
//! extraction, plus the drag-and-snap [`Board`] that decides when a piece
//! sits in its slot.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images and reports progress over an optional channel. File handling
//! lives in the `jigcut` CLI and serializers in `jigcut-export`.

pub mod backdrop;
pub mod curves;
pub mod decode;
pub mod events;
pub mod extract;
pub mod path_data;
pub mod placement;
pub mod region;
pub mod rng;
pub mod scatter;
pub mod stencil;
pub mod types;

use std::sync::Arc;
use std::sync::mpsc::Sender;

use web_time::Instant;

pub use backdrop::{BackdropOptions, backdrop};
pub use curves::{CubicSegment, CurveGenerator, EdgeCurve, Orientation, PathDescription, generate};
pub use decode::decode_rgba;
pub use events::{PlacementOutcome, PuzzleEvent};
pub use extract::{CutOptions, Piece, Slot, cell_seed, extract, nominal_slot};
pub use path_data::{PathCommand, parse_path_data};
pub use placement::{
    Board, PieceState, PieceStatus, PointerAction, PointerEvent, ReleaseOutcome, snap_tolerance,
};
pub use region::{Bounds, ClaimMap, Pixel, Region, flood_fill};
pub use rng::{SineRng, fresh_seed};
pub use scatter::{ScatterArea, scatter};
pub use stencil::{StencilRaster, rasterize, rasterize_path_data};
pub use types::{
    Cell, Dimensions, GridShape, PieceId, Point, PuzzleConfig, PuzzleError, RgbaImage,
};

/// A fully cut puzzle.
#[derive(Debug, Clone)]
pub struct Puzzle {
    /// Seed the curves were generated from (reuse it to reproduce them).
    pub seed: f64,
    /// Grid shape.
    pub shape: GridShape,
    /// Source image size.
    pub dimensions: Dimensions,
    /// Boundary geometry.
    pub path: PathDescription,
    /// Rasterized boundaries the pieces were cut along.
    pub stencil: Arc<StencilRaster>,
    /// One piece per cell, in row-major order.
    pub pieces: Vec<Piece>,
}

impl Puzzle {
    /// A fresh board with every piece free on its target.
    #[must_use]
    pub fn board(&self) -> Board {
        Board::from_pieces(&self.pieces)
    }
}

/// Cut `image` into a puzzle.
///
/// # Steps
///
/// 1. Validate the configuration against the image
/// 2. Generate the curve field (fresh seed unless configured)
/// 3. Rasterize it into a stencil
/// 4. Extract one piece per cell on the worker pool
///
/// `events` receives `Progress` per finished piece and one
/// `CuttingFinished`.
///
/// # Errors
///
/// Returns [`PuzzleError::InvalidShape`] or [`PuzzleError::InvalidConfig`]
/// for bad settings (including a grid finer than the image or a corner
/// radius larger than half the shorter side),
/// [`PuzzleError::EmptyImage`] for a zero-sized image, and any error
/// from [`rasterize`] or [`extract`].
pub fn build_puzzle(
    image: RgbaImage,
    config: &PuzzleConfig,
    events: Option<&Sender<PuzzleEvent>>,
) -> Result<Puzzle, PuzzleError> {
    let started = Instant::now();

    // 1. Validate.
    let shape = config.validate()?;
    let dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    if dimensions.is_empty() {
        return Err(PuzzleError::EmptyImage {
            width: dimensions.width,
            height: dimensions.height,
        });
    }
    if shape.cols() > dimensions.width || shape.rows() > dimensions.height {
        return Err(PuzzleError::InvalidConfig(format!(
            "a {}x{} grid does not fit a {}x{} image",
            shape.rows(),
            shape.cols(),
            dimensions.width,
            dimensions.height
        )));
    }
    let width = f64::from(dimensions.width);
    let height = f64::from(dimensions.height);
    if config.corner_radius > width.min(height) / 2.0 {
        return Err(PuzzleError::InvalidConfig(format!(
            "corner radius {} exceeds half of the shorter image side",
            config.corner_radius
        )));
    }

    // 2. Curve field.
    let seed = config.seed.unwrap_or_else(fresh_seed);
    let (path, _) = CurveGenerator::new(shape, width, height)
        .with_corner_radius(config.corner_radius)
        .generate(SineRng::new(seed));
    log::debug!(
        "generated {} curves for a {}x{} grid (seed {seed})",
        path.edges().count(),
        shape.rows(),
        shape.cols()
    );

    // 3. Stencil.
    let stencil = Arc::new(stencil::rasterize(
        &path,
        dimensions.width,
        dimensions.height,
    )?);
    log::debug!(
        "stencil: {} boundary / {} open pixels",
        stencil.boundary_count(),
        stencil.open_count()
    );

    // 4. Pieces.
    let pieces = extract::extract(
        Arc::clone(&stencil),
        Arc::new(image),
        shape,
        &CutOptions::from(config),
        events,
    )?;
    log::info!(
        "cut {} pieces from {}x{} image in {:?}",
        pieces.len(),
        dimensions.width,
        dimensions.height,
        started.elapsed()
    );

    Ok(Puzzle {
        seed,
        shape,
        dimensions,
        path,
        stencil,
        pieces,
    })
}
