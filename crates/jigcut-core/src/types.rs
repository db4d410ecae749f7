//! Shared types for the jigcut cutting core.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can hold source images and
/// piece bitmaps without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels.
    #[must_use]
    pub const fn area(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns `true` if either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Number of rows and columns of the puzzle grid.
///
/// Both are at least 1; construct through [`GridShape::try_new`].
/// A 1×1 grid is the whole image with no internal curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGridShape")]
pub struct GridShape {
    rows: u32,
    cols: u32,
}

#[derive(Deserialize)]
struct RawGridShape {
    rows: u32,
    cols: u32,
}

impl TryFrom<RawGridShape> for GridShape {
    type Error = PuzzleError;

    fn try_from(raw: RawGridShape) -> Result<Self, Self::Error> {
        Self::try_new(raw.rows, raw.cols)
    }
}

impl GridShape {
    /// Validate and build a grid shape.
    ///
    /// # Errors
    ///
    /// Returns [`PuzzleError::InvalidShape`] if `rows` or `cols` is zero.
    pub fn try_new(rows: u32, cols: u32) -> Result<Self, PuzzleError> {
        if rows == 0 || cols == 0 {
            return Err(PuzzleError::InvalidShape { rows, cols });
        }
        Ok(Self { rows, cols })
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(self) -> u32 {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(self) -> u32 {
        self.cols
    }

    /// Total number of cells (`rows * cols`).
    #[must_use]
    pub const fn cell_count(self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Row-major index of a cell.
    #[must_use]
    pub const fn index_of(self, cell: Cell) -> usize {
        cell.row as usize * self.cols as usize + cell.col as usize
    }

    /// Cell at a row-major index, if in range.
    #[must_use]
    pub fn cell_at(self, index: usize) -> Option<Cell> {
        if index >= self.cell_count() {
            return None;
        }
        let cols = self.cols as usize;
        let row = u32::try_from(index / cols).ok()?;
        let col = u32::try_from(index % cols).ok()?;
        Some(Cell { row, col })
    }

    /// Returns `true` if the cell lies inside the grid.
    #[must_use]
    pub const fn contains(self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    /// All cells in row-major order.
    pub fn cells(self) -> impl Iterator<Item = Cell> {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Cell { row, col }))
    }
}

/// One grid cell, addressed by row and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    /// Zero-based row.
    pub row: u32,
    /// Zero-based column.
    pub col: u32,
}

impl Cell {
    /// Create a new cell address.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Stable identifier of a piece: its row-major cell index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(pub usize);

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Configuration for building one puzzle.
///
/// Fields are public for struct-update construction; call
/// [`validate`](Self::validate) (done by [`crate::build_puzzle`]) before
/// use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    /// Number of piece rows.
    pub rows: u32,

    /// Number of piece columns.
    pub cols: u32,

    /// Curve generator seed. `None` derives a fresh one from the clock.
    pub seed: Option<f64>,

    /// Rounding radius of the outer border in pixels.
    pub corner_radius: f64,

    /// Display origin added to every piece's target position.
    pub origin: Point,

    /// Cutting pool size. `None` uses the available parallelism.
    pub workers: Option<usize>,

    /// Upper bound on waiting for the cutting pool to finish.
    #[serde(with = "duration_serde")]
    pub cut_timeout: Duration,

    /// Check every extracted region against its cell before accepting
    /// the piece set.
    pub validate_regions: bool,
}

impl PuzzleConfig {
    /// Default number of rows.
    pub const DEFAULT_ROWS: u32 = 4;
    /// Default number of columns.
    pub const DEFAULT_COLS: u32 = 4;
    /// Default border rounding radius.
    pub const DEFAULT_CORNER_RADIUS: f64 = 0.0;
    /// Default bounded wait on the cutting pool (one hour).
    pub const DEFAULT_CUT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

    /// Validate the configuration and return the grid shape.
    ///
    /// # Errors
    ///
    /// Returns [`PuzzleError::InvalidShape`] for a zero row or column
    /// count and [`PuzzleError::InvalidConfig`] for a non-finite seed,
    /// negative or non-finite corner radius, zero workers, or a zero
    /// timeout.
    pub fn validate(&self) -> Result<GridShape, PuzzleError> {
        let shape = GridShape::try_new(self.rows, self.cols)?;
        if let Some(seed) = self.seed
            && !seed.is_finite()
        {
            return Err(PuzzleError::InvalidConfig(format!(
                "seed must be finite, got {seed}"
            )));
        }
        if !self.corner_radius.is_finite() || self.corner_radius < 0.0 {
            return Err(PuzzleError::InvalidConfig(format!(
                "corner radius must be finite and non-negative, got {}",
                self.corner_radius
            )));
        }
        if !self.origin.x.is_finite() || !self.origin.y.is_finite() {
            return Err(PuzzleError::InvalidConfig(
                "display origin must be finite".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(PuzzleError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.cut_timeout.is_zero() {
            return Err(PuzzleError::InvalidConfig(
                "cut timeout must be positive".to_string(),
            ));
        }
        Ok(shape)
    }
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            rows: Self::DEFAULT_ROWS,
            cols: Self::DEFAULT_COLS,
            seed: None,
            corner_radius: Self::DEFAULT_CORNER_RADIUS,
            origin: Point::default(),
            workers: None,
            cut_timeout: Self::DEFAULT_CUT_TIMEOUT,
            validate_regions: false,
        }
    }
}

/// Errors that can occur while building a puzzle.
///
/// Every variant is terminal for the request: no partial piece set is
/// returned alongside an error.
#[derive(Debug, thiserror::Error)]
pub enum PuzzleError {
    /// The grid must have at least one row and one column.
    #[error("invalid grid shape {rows}x{cols}: rows and columns must be at least 1")]
    InvalidShape {
        /// Requested rows.
        rows: u32,
        /// Requested columns.
        cols: u32,
    },

    /// The source image has a zero dimension.
    #[error("image is empty ({width}x{height})")]
    EmptyImage {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// Puzzle configuration is invalid.
    #[error("invalid puzzle configuration: {0}")]
    InvalidConfig(String),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Stencil and source image sizes differ.
    #[error("stencil is {stencil:?} but source image is {source_image:?}")]
    DimensionMismatch {
        /// Stencil dimensions.
        stencil: Dimensions,
        /// Source image dimensions.
        source_image: Dimensions,
    },

    /// A path interchange string could not be parsed.
    #[error("malformed path data: {0}")]
    PathParse(String),

    /// The rasterizer could not render the outline.
    #[error("rasterization failed: {0}")]
    Raster(String),

    /// The cutting pool could not be created.
    #[error("failed to start cutting workers: {0}")]
    WorkerPool(String),

    /// A cutting task died before reporting its piece.
    #[error("cutting worker failed after {completed} of {total} pieces")]
    WorkerFailed {
        /// Pieces finished before the failure was noticed.
        completed: usize,
        /// Pieces requested.
        total: usize,
    },

    /// The bounded wait on the cutting pool expired.
    #[error("cutting timed out after {timeout:?} with {completed} of {total} pieces")]
    CutTimeout {
        /// Pieces finished before the deadline.
        completed: usize,
        /// Pieces requested.
        total: usize,
        /// The configured bound.
        timeout: Duration,
    },

    /// A flood fill escaped its cell (or found nothing), meaning the
    /// stencil has a gap or the seed point missed its basin.
    #[error("region for cell ({row}, {col}) leaked outside its cell")]
    RegionLeak {
        /// Cell row.
        row: u32,
        /// Cell column.
        col: u32,
    },
}
