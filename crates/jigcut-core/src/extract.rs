//! Region extraction: cut one piece bitmap per grid cell.
//!
//! Each cell is an independent task on a fixed-size worker pool. A task
//! flood-fills from its cell's seed pixel over the shared stencil, crops
//! the reached pixels out of the source image into a transparent bitmap,
//! and reports the piece back over a channel. The calling thread collects
//! results against a deadline and emits progress as they arrive.

use std::any::Any;
use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::Duration;

use image::{Rgba, RgbaImage};
use rayon::ThreadPoolBuilder;
use web_time::Instant;

use crate::events::{PuzzleEvent, emit};
use crate::region::{Bounds, ClaimMap, Pixel, Region, flood_fill};
use crate::stencil::StencilRaster;
use crate::types::{Cell, Dimensions, GridShape, PieceId, Point, PuzzleConfig, PuzzleError};

/// One cut piece: its pixels, bitmap and correct position.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    id: PieceId,
    cell: Cell,
    region: Region,
    image: RgbaImage,
    target: Point,
}

impl Piece {
    /// Row-major cell index.
    #[must_use]
    pub const fn id(&self) -> PieceId {
        self.id
    }

    /// The grid cell this piece was seeded from.
    #[must_use]
    pub const fn cell(&self) -> Cell {
        self.cell
    }

    /// Source-image pixels belonging to the piece.
    #[must_use]
    pub const fn region(&self) -> &Region {
        &self.region
    }

    /// Bounding box of the region in source-image coordinates.
    #[must_use]
    pub const fn bounds(&self) -> Option<Bounds> {
        self.region.bounds()
    }

    /// Cropped bitmap, transparent outside the region.
    #[must_use]
    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Top-left position at which the piece sits correctly on the board.
    #[must_use]
    pub const fn target(&self) -> Point {
        self.target
    }

    /// Bitmap width (bounding-box width + 1).
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Bitmap height (bounding-box height + 1).
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Extraction settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CutOptions {
    /// Added to each region's top-left to form the piece target.
    pub origin: Point,
    /// Pool size; `None` uses the available parallelism.
    pub workers: Option<usize>,
    /// Bounded wait for all tasks.
    pub timeout: Duration,
    /// Reject regions that are empty or escape their cell.
    pub validate_regions: bool,
}

impl Default for CutOptions {
    fn default() -> Self {
        Self::from(&PuzzleConfig::default())
    }
}

impl From<&PuzzleConfig> for CutOptions {
    fn from(config: &PuzzleConfig) -> Self {
        Self {
            origin: config.origin,
            workers: config.workers,
            timeout: config.cut_timeout,
            validate_regions: config.validate_regions,
        }
    }
}

/// Nominal rectangle of a cell before cutting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Left edge, pulled left by a third of a cell for interior columns.
    pub x: u32,
    /// Top edge, pulled up by a third of a cell for interior rows.
    pub y: u32,
    /// Cell width plus the left margin.
    pub width: u32,
    /// Cell height plus the top margin.
    pub height: u32,
}

/// The flood-fill seed for `cell`: the integer center of its rectangle.
#[must_use]
pub const fn cell_seed(shape: GridShape, dims: Dimensions, cell: Cell) -> Pixel {
    let cw = dims.width / shape.cols();
    let ch = dims.height / shape.rows();
    Pixel::new(cell.col * cw + cw / 2, cell.row * ch + ch / 2)
}

/// Pre-cut estimate of where a cell's piece lands and how big it is.
///
/// Interior cells get a one-third margin on their left and top edges to
/// leave room for tabs reaching in from the neighbor.
#[must_use]
pub const fn nominal_slot(shape: GridShape, dims: Dimensions, cell: Cell) -> Slot {
    let cw = dims.width / shape.cols();
    let ch = dims.height / shape.rows();
    let margin_x = if cell.col > 0 { cw / 3 } else { 0 };
    let margin_y = if cell.row > 0 { ch / 3 } else { 0 };
    Slot {
        x: cell.col * cw - margin_x,
        y: cell.row * ch - margin_y,
        width: cw + margin_x,
        height: ch + margin_y,
    }
}

/// Flood-fill one cell and crop its piece out of `source`.
fn cut_cell(
    stencil: &StencilRaster,
    claims: &ClaimMap,
    source: &RgbaImage,
    shape: GridShape,
    cell: Cell,
    origin: Point,
) -> Piece {
    let index = shape.index_of(cell);
    let seed = cell_seed(shape, stencil.dimensions(), cell);
    let owner = u32::try_from(index + 1)
        .ok()
        .and_then(NonZeroU32::new)
        .unwrap_or(NonZeroU32::MAX);
    let region = flood_fill(stencil, claims, seed, owner);

    let Some(bounds) = region.bounds() else {
        log::warn!(
            "seed ({}, {}) of cell ({}, {}) is on a boundary; piece is empty",
            seed.x,
            seed.y,
            cell.row,
            cell.col
        );
        return Piece {
            id: PieceId(index),
            cell,
            region,
            image: RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])),
            target: Point::new(
                f64::from(seed.x) + origin.x,
                f64::from(seed.y) + origin.y,
            ),
        };
    };

    let mut image = RgbaImage::from_pixel(
        bounds.width() + 1,
        bounds.height() + 1,
        Rgba([0, 0, 0, 0]),
    );
    for &p in region.pixels() {
        image.put_pixel(
            p.x - bounds.min_x,
            p.y - bounds.min_y,
            *source.get_pixel(p.x, p.y),
        );
    }
    log::trace!(
        "cell ({}, {}): {} pixels, {}x{} bitmap",
        cell.row,
        cell.col,
        region.len(),
        image.width(),
        image.height()
    );

    Piece {
        id: PieceId(index),
        cell,
        region,
        image,
        target: Point::new(
            f64::from(bounds.min_x) + origin.x,
            f64::from(bounds.min_y) + origin.y,
        ),
    }
}

/// Check that a piece is non-empty and stays within its cell grown by a
/// third of a cell on every side.
fn check_region(piece: &Piece, shape: GridShape, dims: Dimensions) -> Result<(), PuzzleError> {
    let cell = piece.cell();
    let leak = PuzzleError::RegionLeak {
        row: cell.row,
        col: cell.col,
    };
    let Some(bounds) = piece.bounds() else {
        return Err(leak);
    };
    let cw = f64::from(dims.width) / f64::from(shape.cols());
    let ch = f64::from(dims.height) / f64::from(shape.rows());
    let left = cw * f64::from(cell.col) - cw / 3.0;
    let right = cw * f64::from(cell.col + 1) + cw / 3.0;
    let top = ch * f64::from(cell.row) - ch / 3.0;
    let bottom = ch * f64::from(cell.row + 1) + ch / 3.0;
    let inside = f64::from(bounds.min_x) >= left
        && f64::from(bounds.max_x) < right
        && f64::from(bounds.min_y) >= top
        && f64::from(bounds.max_y) < bottom;
    if inside { Ok(()) } else { Err(leak) }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Cut every cell of `shape` out of `source` along `stencil`.
///
/// Pieces come back in row-major cell order. `Progress` is emitted once
/// per finished task and `CuttingFinished` once after the last, only if
/// the call succeeds.
///
/// # Errors
///
/// - [`PuzzleError::DimensionMismatch`] if stencil and source differ in
///   size, [`PuzzleError::EmptyImage`] if they are empty.
/// - [`PuzzleError::WorkerPool`] if the pool cannot start.
/// - [`PuzzleError::CutTimeout`] if the tasks do not all finish within
///   `options.timeout`.
/// - [`PuzzleError::WorkerFailed`] if a task dies without reporting.
/// - [`PuzzleError::RegionLeak`] if `options.validate_regions` is set and
///   a region is empty or escapes its cell.
pub fn extract(
    stencil: Arc<StencilRaster>,
    source: Arc<RgbaImage>,
    shape: GridShape,
    options: &CutOptions,
    events: Option<&Sender<PuzzleEvent>>,
) -> Result<Vec<Piece>, PuzzleError> {
    let dims = stencil.dimensions();
    let source_dims = Dimensions {
        width: source.width(),
        height: source.height(),
    };
    if dims != source_dims {
        return Err(PuzzleError::DimensionMismatch {
            stencil: dims,
            source_image: source_dims,
        });
    }
    if dims.is_empty() {
        return Err(PuzzleError::EmptyImage {
            width: dims.width,
            height: dims.height,
        });
    }

    let total = shape.cell_count();
    let workers = options.workers.unwrap_or_else(default_workers).clamp(1, total);
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("jigcut-cut-{i}"))
        .panic_handler(|payload| {
            log::error!("cutting task panicked: {}", panic_message(payload.as_ref()));
        })
        .build()
        .map_err(|e| PuzzleError::WorkerPool(e.to_string()))?;
    log::debug!("cutting {total} pieces on {workers} workers");

    let claims = Arc::new(ClaimMap::new(dims));
    let (tx, rx) = mpsc::channel::<Piece>();
    for cell in shape.cells() {
        let stencil = Arc::clone(&stencil);
        let source = Arc::clone(&source);
        let claims = Arc::clone(&claims);
        let tx = tx.clone();
        let origin = options.origin;
        pool.spawn(move || {
            let piece = cut_cell(&stencil, &claims, &source, shape, cell, origin);
            // The collector may already have given up.
            let _ = tx.send(piece);
        });
    }
    drop(tx);

    let total_u32 = u32::try_from(total).unwrap_or(u32::MAX);
    let started = Instant::now();
    let deadline = started.checked_add(options.timeout);
    let mut slots: Vec<Option<Piece>> = std::iter::repeat_with(|| None).take(total).collect();
    let mut completed = 0_usize;
    while completed < total {
        let wait = deadline.map_or(options.timeout, |d| {
            d.saturating_duration_since(Instant::now())
        });
        match rx.recv_timeout(wait) {
            Ok(piece) => {
                let index = piece.id().0;
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(piece);
                }
                completed += 1;
                emit(
                    events,
                    PuzzleEvent::Progress {
                        completed: u32::try_from(completed).unwrap_or(u32::MAX),
                        total: total_u32,
                    },
                );
            }
            Err(RecvTimeoutError::Timeout) => {
                log::error!(
                    "cutting timed out after {:?} ({completed}/{total} pieces)",
                    options.timeout
                );
                return Err(PuzzleError::CutTimeout {
                    completed,
                    total,
                    timeout: options.timeout,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("cutting workers stopped early ({completed}/{total} pieces)");
                return Err(PuzzleError::WorkerFailed { completed, total });
            }
        }
    }
    let pieces: Vec<Piece> = slots.into_iter().flatten().collect();
    log::debug!("cut {} pieces in {:?}", pieces.len(), started.elapsed());

    if options.validate_regions {
        for piece in &pieces {
            check_region(piece, shape, dims)?;
        }
    }

    emit(events, PuzzleEvent::CuttingFinished);
    Ok(pieces)
}
