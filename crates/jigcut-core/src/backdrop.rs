//! Board background: a faint copy of the source image and the cut lines,
//! showing the player where pieces belong.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tiny_skia::{IntSize, LineCap, LineJoin, Paint, Pixmap, PixmapPaint, Stroke, Transform};

use crate::curves::PathDescription;
use crate::stencil::build_path;
use crate::types::PuzzleError;

/// What to draw on the backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackdropOptions {
    /// Opacity of the source image copy; `None` leaves it out.
    pub image_alpha: Option<u8>,
    /// Stroke the cut lines and border.
    pub outline: bool,
    /// Outline color (straight RGBA).
    pub outline_color: [u8; 4],
}

impl BackdropOptions {
    /// Default source image opacity (out of 255).
    pub const DEFAULT_IMAGE_ALPHA: u8 = 70;
    /// Default outline color: half-transparent black.
    pub const DEFAULT_OUTLINE_COLOR: [u8; 4] = [0, 0, 0, 128];
}

impl Default for BackdropOptions {
    fn default() -> Self {
        Self {
            image_alpha: Some(Self::DEFAULT_IMAGE_ALPHA),
            outline: true,
            outline_color: Self::DEFAULT_OUTLINE_COLOR,
        }
    }
}

/// Copy straight RGBA into a premultiplied pixmap.
#[allow(clippy::cast_possible_truncation)]
fn to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())?;
    let data = image
        .pixels()
        .flat_map(|&Rgba([r, g, b, a])| {
            let premul = |c: u8| (u16::from(c) * u16::from(a) / 255) as u8;
            [premul(r), premul(g), premul(b), a]
        })
        .collect();
    Pixmap::from_vec(data, size)
}

/// Convert a premultiplied pixmap back to straight RGBA.
#[allow(clippy::cast_possible_truncation)]
fn from_pixmap(pixmap: &Pixmap) -> RgbaImage {
    let data = pixmap.data();
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (i, pixel) in img.pixels_mut().enumerate() {
        let off = i * 4;
        let a = data[off + 3];
        if a == 0 {
            *pixel = Rgba([0, 0, 0, 0]);
        } else {
            // Un-premultiply: channel = premultiplied * 255 / alpha.
            let r = u16::from(data[off]) * 255 / u16::from(a);
            let g = u16::from(data[off + 1]) * 255 / u16::from(a);
            let b = u16::from(data[off + 2]) * 255 / u16::from(a);
            *pixel = Rgba([r as u8, g as u8, b as u8, a]);
        }
    }
    img
}

/// Render the backdrop for `source` cut along `path`.
///
/// The result has the source image's size and is transparent wherever
/// nothing was drawn.
///
/// # Errors
///
/// Returns [`PuzzleError::Raster`] if the canvas cannot be allocated.
pub fn backdrop(
    source: &RgbaImage,
    path: &PathDescription,
    options: &BackdropOptions,
) -> Result<RgbaImage, PuzzleError> {
    let (width, height) = source.dimensions();
    let Some(mut canvas) = Pixmap::new(width, height) else {
        return Err(PuzzleError::Raster(format!(
            "cannot allocate a {width}x{height} backdrop"
        )));
    };

    if let Some(alpha) = options.image_alpha {
        let Some(copy) = to_pixmap(source) else {
            return Err(PuzzleError::Raster("cannot copy source image".to_owned()));
        };
        let paint = PixmapPaint {
            opacity: f32::from(alpha) / 255.0,
            ..PixmapPaint::default()
        };
        canvas.draw_pixmap(0, 0, copy.as_ref(), &paint, Transform::identity(), None);
    }

    if options.outline {
        let [r, g, b, a] = options.outline_color;
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;
        let stroke = Stroke {
            width: 1.0,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        for commands in path.outline_commands() {
            if let Some(p) = build_path(&commands) {
                canvas.stroke_path(&p, &paint, &stroke, Transform::identity(), None);
            }
        }
    }

    Ok(from_pixmap(&canvas))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::curves::generate;
    use crate::types::GridShape;

    fn path(width: f64, height: f64) -> PathDescription {
        generate(GridShape::try_new(2, 2).unwrap(), width, height, 1.0)
    }

    #[test]
    fn faint_image_only() {
        let source = RgbaImage::from_pixel(20, 20, Rgba([200, 100, 50, 255]));
        let options = BackdropOptions {
            outline: false,
            ..BackdropOptions::default()
        };
        let out = backdrop(&source, &path(20.0, 20.0), &options).unwrap();
        assert_eq!(out.dimensions(), (20, 20));
        let px = out.get_pixel(10, 10);
        assert!(px.0[3].abs_diff(70) <= 1, "alpha {}", px.0[3]);
        assert!(px.0[0].abs_diff(200) <= 4, "red {}", px.0[0]);
    }

    #[test]
    fn outline_only_is_transparent_away_from_lines() {
        let source = RgbaImage::from_pixel(80, 80, Rgba([255, 255, 255, 255]));
        let options = BackdropOptions {
            image_alpha: None,
            ..BackdropOptions::default()
        };
        let out = backdrop(&source, &path(80.0, 80.0), &options).unwrap();
        // Cell centers are far from every line.
        assert_eq!(out.get_pixel(20, 20).0[3], 0);
        // The horizontal cut starts on the left edge at y = 40.
        assert!(out.get_pixel(1, 39).0[3] > 0 || out.get_pixel(1, 40).0[3] > 0);
    }

    #[test]
    fn nothing_requested_gives_blank() {
        let source = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]));
        let options = BackdropOptions {
            image_alpha: None,
            outline: false,
            ..BackdropOptions::default()
        };
        let out = backdrop(&source, &path(8.0, 8.0), &options).unwrap();
        assert!(out.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn pixmap_conversion_round_trips_opaque_pixels() {
        let img = RgbaImage::from_fn(3, 2, |x, y| {
            Rgba([u8::try_from(x * 80).unwrap(), u8::try_from(y * 90).unwrap(), 5, 255])
        });
        assert_eq!(from_pixmap(&to_pixmap(&img).unwrap()), img);
    }
}
