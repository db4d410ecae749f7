//! Stencil rasterization: draw the curve field into a pixel grid.
//!
//! Every curve and the border is stroked separately as a one-pixel
//! anti-aliased black line on a white canvas. Anything the stroke touched,
//! however faintly, counts as boundary; only pixels that stayed exactly
//! white are open. The anti-aliased hairline is an unbroken 8-connected
//! chain of touched pixels, so the open pixels on either side of a curve
//! are never 4-connected through it.
//!
//! A hairline crossing itself or a neighboring curve can close off a
//! pocket of one or two open pixels that no cell's flood-fill seed can
//! reach. [`rasterize`] seals those: after stroking, every open pixel not
//! 4-connected to some cell seed becomes boundary. The open pixels are
//! then exactly the union of the cell basins, so the extracted regions
//! partition them. The same rule turns the area outside a rounded border
//! into boundary.

use std::collections::VecDeque;

use image::{GrayImage, Luma};
use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::curves::PathDescription;
use crate::extract::cell_seed;
use crate::path_data::{PathCommand, parse_path_data};
use crate::region::Pixel;
use crate::types::{Dimensions, GridShape, PuzzleError};

/// Mask value for a boundary pixel.
pub const BOUNDARY: u8 = 255;

/// Mask value for an open pixel.
pub const OPEN: u8 = 0;

/// Boundary/open classification of every pixel in the image.
///
/// Stored as a single-channel image: [`BOUNDARY`] where a curve was drawn,
/// [`OPEN`] elsewhere. Read-only once built; the extractor tracks visited
/// pixels separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StencilRaster {
    mask: GrayImage,
}

impl StencilRaster {
    /// Wrap an existing mask. Any non-zero pixel is treated as boundary.
    #[must_use]
    pub fn from_gray(mut mask: GrayImage) -> Self {
        for Luma([v]) in mask.pixels_mut() {
            if *v != OPEN {
                *v = BOUNDARY;
            }
        }
        Self { mask }
    }

    /// Raster size.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.mask.width(),
            height: self.mask.height(),
        }
    }

    /// Whether `pixel` is inside the raster and not on a boundary.
    #[must_use]
    pub fn is_open(&self, pixel: Pixel) -> bool {
        self.mask
            .get_pixel_checked(pixel.x, pixel.y)
            .is_some_and(|p| p.0[0] == OPEN)
    }

    /// Whether `pixel` is inside the raster and on a boundary.
    #[must_use]
    pub fn is_boundary(&self, pixel: Pixel) -> bool {
        self.mask
            .get_pixel_checked(pixel.x, pixel.y)
            .is_some_and(|p| p.0[0] == BOUNDARY)
    }

    /// Number of boundary pixels.
    #[must_use]
    pub fn boundary_count(&self) -> usize {
        self.mask.pixels().filter(|p| p.0[0] == BOUNDARY).count()
    }

    /// Number of open pixels.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.mask.pixels().filter(|p| p.0[0] == OPEN).count()
    }

    /// Mark every open pixel that is not 4-connected to any cell seed of
    /// `shape` as boundary. Returns the number of pixels sealed.
    ///
    /// Afterwards each open pixel lies in the basin of at least one seed.
    pub fn seal_pockets(&mut self, shape: GridShape) -> usize {
        let dims = self.dimensions();
        let width = dims.width as usize;
        let mut reached = vec![false; dims.area()];
        let mut queue: VecDeque<Pixel> = shape
            .cells()
            .map(|cell| cell_seed(shape, dims, cell))
            .filter(|&seed| self.is_open(seed))
            .collect();
        for seed in &queue {
            reached[seed.y as usize * width + seed.x as usize] = true;
        }
        while let Some(pixel) = queue.pop_front() {
            for next in pixel.neighbors4(dims) {
                let i = next.y as usize * width + next.x as usize;
                if !reached[i] && self.is_open(next) {
                    reached[i] = true;
                    queue.push_back(next);
                }
            }
        }

        let mut sealed = 0;
        for (i, Luma([v])) in self.mask.pixels_mut().enumerate() {
            if *v == OPEN && !reached[i] {
                *v = BOUNDARY;
                sealed += 1;
            }
        }
        sealed
    }

    /// The underlying mask.
    #[must_use]
    pub const fn as_gray(&self) -> &GrayImage {
        &self.mask
    }

    /// Consume the stencil, returning the mask.
    #[must_use]
    pub fn into_gray(self) -> GrayImage {
        self.mask
    }
}

/// Rasterize a curve field at `width`×`height` pixels, sealing pockets
/// unreachable from the cell seeds of the path's grid.
///
/// # Errors
///
/// Returns [`PuzzleError::Raster`] if the canvas cannot be allocated
/// (zero or oversized dimensions).
pub fn rasterize(
    path: &PathDescription,
    width: u32,
    height: u32,
) -> Result<StencilRaster, PuzzleError> {
    let mut stencil = render_subpaths(&path.outline_commands(), width, height)?;
    let sealed = stencil.seal_pockets(path.shape());
    log::debug!("sealed {sealed} unreachable open pixels");
    Ok(stencil)
}

/// Rasterize an SVG-style path-data string at `width`×`height` pixels.
///
/// The string carries no grid, so pockets are left open; call
/// [`StencilRaster::seal_pockets`] with the grid before cutting.
///
/// # Errors
///
/// Returns [`PuzzleError::PathParse`] for malformed path data and
/// [`PuzzleError::Raster`] if the canvas cannot be allocated.
pub fn rasterize_path_data(
    data: &str,
    width: u32,
    height: u32,
) -> Result<StencilRaster, PuzzleError> {
    let subpaths = parse_path_data(data)?;
    render_subpaths(&subpaths, width, height)
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn build_path(commands: &[PathCommand]) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for command in commands {
        match *command {
            PathCommand::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathCommand::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathCommand::CubicTo { ctrl1, ctrl2, end } => pb.cubic_to(
                ctrl1.x as f32,
                ctrl1.y as f32,
                ctrl2.x as f32,
                ctrl2.y as f32,
                end.x as f32,
                end.y as f32,
            ),
            PathCommand::Close => pb.close(),
        }
    }
    pb.finish()
}

/// Canvas margin on every side, so strokes lying on the image edge are
/// drawn rather than clipped.
const MARGIN: u32 = 1;

fn render_subpaths(
    subpaths: &[Vec<PathCommand>],
    width: u32,
    height: u32,
) -> Result<StencilRaster, PuzzleError> {
    let canvas = (width > 0 && height > 0)
        .then(|| {
            Pixmap::new(
                width.checked_add(2 * MARGIN)?,
                height.checked_add(2 * MARGIN)?,
            )
        })
        .flatten();
    let Some(mut pixmap) = canvas else {
        return Err(PuzzleError::Raster(format!(
            "cannot allocate a {width}x{height} canvas"
        )));
    };
    pixmap.fill(Color::WHITE);

    let stroke = Stroke {
        width: 1.0,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;
    #[allow(clippy::cast_precision_loss)]
    let offset = Transform::from_translate(MARGIN as f32, MARGIN as f32);

    let mut drawn = 0_usize;
    for commands in subpaths {
        // Degenerate subpaths (a lone move) have nothing to draw.
        let Some(path) = build_path(commands) else {
            continue;
        };
        pixmap.stroke_path(&path, &paint, &stroke, offset, None);
        drawn += 1;
    }
    log::trace!("stroked {drawn} of {} subpaths", subpaths.len());

    // Open iff untouched: premultiplied opaque white.
    let stride = pixmap.width() as usize;
    let data = pixmap.data();
    let mask = GrayImage::from_fn(width, height, |x, y| {
        let i = ((y + MARGIN) as usize * stride + (x + MARGIN) as usize) * 4;
        if data[i..i + 4] == [255, 255, 255, 255] {
            Luma([OPEN])
        } else {
            Luma([BOUNDARY])
        }
    });
    Ok(StencilRaster { mask })
}
