//! Pixel regions and the 4-connected flood fill that discovers them.

use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::stencil::StencilRaster;
use crate::types::Dimensions;

/// A pixel coordinate in the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pixel {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl Pixel {
    /// Create a new pixel coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// In-bounds 4-neighbors (left, right, up, down).
    pub(crate) fn neighbors4(self, dims: Dimensions) -> impl Iterator<Item = Self> {
        let Self { x, y } = self;
        [
            x.checked_sub(1).map(|x| Self::new(x, y)),
            (x + 1 < dims.width).then(|| Self::new(x + 1, y)),
            y.checked_sub(1).map(|y| Self::new(x, y)),
            (y + 1 < dims.height).then(|| Self::new(x, y + 1)),
        ]
        .into_iter()
        .flatten()
    }
}

/// Inclusive bounding box of a non-empty pixel set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Leftmost column.
    pub min_x: u32,
    /// Topmost row.
    pub min_y: u32,
    /// Rightmost column.
    pub max_x: u32,
    /// Bottom row.
    pub max_y: u32,
}

impl Bounds {
    /// `max_x - min_x`: a single-column region has width 0.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    /// `max_y - min_y`.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    /// Whether `pixel` lies inside the box.
    #[must_use]
    pub const fn contains(&self, pixel: Pixel) -> bool {
        pixel.x >= self.min_x
            && pixel.x <= self.max_x
            && pixel.y >= self.min_y
            && pixel.y <= self.max_y
    }

    fn grow(&mut self, pixel: Pixel) {
        self.min_x = self.min_x.min(pixel.x);
        self.min_y = self.min_y.min(pixel.y);
        self.max_x = self.max_x.max(pixel.x);
        self.max_y = self.max_y.max(pixel.y);
    }
}

/// The set of open pixels reachable from one seed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pixels: Vec<Pixel>,
    bounds: Option<Bounds>,
}

impl Region {
    /// Build a region from its pixels, computing the bounding box.
    #[must_use]
    pub fn from_pixels(pixels: Vec<Pixel>) -> Self {
        let bounds = pixels.split_first().map(|(first, rest)| {
            let mut bounds = Bounds {
                min_x: first.x,
                min_y: first.y,
                max_x: first.x,
                max_y: first.y,
            };
            for &p in rest {
                bounds.grow(p);
            }
            bounds
        });
        Self { pixels, bounds }
    }

    /// Pixels in discovery order.
    #[must_use]
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Pixel count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Whether the region has no pixels (its seed was on a boundary).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Bounding box, `None` when empty.
    #[must_use]
    pub const fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }
}

/// Per-pixel ownership shared by concurrent flood fills.
///
/// Each entry goes from unclaimed to exactly one owner and never changes
/// again, so fills racing for the same pixel (which can only happen if the
/// stencil leaks) never both include it.
#[derive(Debug)]
pub struct ClaimMap {
    dims: Dimensions,
    owners: Vec<AtomicU32>,
}

impl ClaimMap {
    /// All pixels unclaimed.
    #[must_use]
    pub fn new(dims: Dimensions) -> Self {
        let owners = std::iter::repeat_with(|| AtomicU32::new(0))
            .take(dims.area())
            .collect();
        Self { dims, owners }
    }

    fn slot(&self, pixel: Pixel) -> Option<&AtomicU32> {
        if pixel.x >= self.dims.width || pixel.y >= self.dims.height {
            return None;
        }
        self.owners
            .get(pixel.y as usize * self.dims.width as usize + pixel.x as usize)
    }

    /// Claim `pixel` for `owner`. Returns `false` if it was already
    /// claimed (by anyone) or lies outside the map.
    pub fn try_claim(&self, pixel: Pixel, owner: NonZeroU32) -> bool {
        self.slot(pixel).is_some_and(|slot| {
            slot.compare_exchange(0, owner.get(), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        })
    }

    /// Current owner of `pixel`.
    #[must_use]
    pub fn owner(&self, pixel: Pixel) -> Option<NonZeroU32> {
        self.slot(pixel)
            .and_then(|slot| NonZeroU32::new(slot.load(Ordering::Acquire)))
    }

    /// Number of claimed pixels.
    #[must_use]
    pub fn claimed_count(&self) -> usize {
        self.owners
            .iter()
            .filter(|slot| slot.load(Ordering::Acquire) != 0)
            .count()
    }
}

/// Breadth-first 4-connected fill from `seed` over open stencil pixels.
///
/// Pixels are claimed for `owner` as they are enqueued. A seed that is a
/// boundary pixel, out of range, or already claimed yields an empty
/// region. Diagonal steps are never taken, so a one-pixel 8-connected
/// boundary is enough to stop the fill.
#[must_use]
pub fn flood_fill(
    stencil: &StencilRaster,
    claims: &ClaimMap,
    seed: Pixel,
    owner: NonZeroU32,
) -> Region {
    if !stencil.is_open(seed) || !claims.try_claim(seed, owner) {
        return Region::default();
    }
    let dims = stencil.dimensions();
    let mut queue = VecDeque::from([seed]);
    let mut pixels = Vec::new();
    while let Some(pixel) = queue.pop_front() {
        pixels.push(pixel);
        for next in pixel.neighbors4(dims) {
            if stencil.is_open(next) && claims.try_claim(next, owner) {
                queue.push_back(next);
            }
        }
    }
    Region::from_pixels(pixels)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;
    use crate::stencil::BOUNDARY;

    const OWNER: NonZeroU32 = NonZeroU32::MIN;

    /// Stencil from ASCII art: `#` is boundary, anything else open.
    fn stencil(rows: &[&str]) -> StencilRaster {
        let height = u32::try_from(rows.len()).unwrap();
        let width = u32::try_from(rows[0].len()).unwrap();
        let mut gray = GrayImage::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    gray.put_pixel(
                        u32::try_from(x).unwrap(),
                        u32::try_from(y).unwrap(),
                        Luma([BOUNDARY]),
                    );
                }
            }
        }
        StencilRaster::from_gray(gray)
    }

    #[test]
    fn fills_open_area() {
        let s = stencil(&["....", "....", "...."]);
        let claims = ClaimMap::new(s.dimensions());
        let region = flood_fill(&s, &claims, Pixel::new(1, 1), OWNER);
        assert_eq!(region.len(), 12);
        let b = region.bounds().unwrap();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (0, 0, 3, 2));
        assert_eq!((b.width(), b.height()), (3, 2));
        assert_eq!(claims.claimed_count(), 12);
    }

    #[test]
    fn stops_at_boundary() {
        let s = stencil(&["..#..", "..#..", "..#.."]);
        let claims = ClaimMap::new(s.dimensions());
        let region = flood_fill(&s, &claims, Pixel::new(0, 0), OWNER);
        assert_eq!(region.len(), 6);
        assert!(region.pixels().iter().all(|p| p.x < 2));
    }

    #[test]
    fn does_not_leak_through_diagonal_boundary() {
        // 8-connected diagonal wall: 4-connected fill must not cross.
        let s = stencil(&["#...", ".#..", "..#.", "...#"]);
        let claims = ClaimMap::new(s.dimensions());
        let lower = flood_fill(&s, &claims, Pixel::new(0, 3), OWNER);
        assert_eq!(lower.len(), 6);
        assert!(lower.pixels().iter().all(|p| p.x < p.y));
    }

    #[test]
    fn seed_on_boundary_is_empty() {
        let s = stencil(&[".#.", "..."]);
        let claims = ClaimMap::new(s.dimensions());
        let region = flood_fill(&s, &claims, Pixel::new(1, 0), OWNER);
        assert!(region.is_empty());
        assert!(region.bounds().is_none());
        assert_eq!(claims.claimed_count(), 0);
    }

    #[test]
    fn claimed_pixels_are_not_refilled() {
        let s = stencil(&["...", "..."]);
        let claims = ClaimMap::new(s.dimensions());
        let first = flood_fill(&s, &claims, Pixel::new(0, 0), OWNER);
        let other = NonZeroU32::new(2).unwrap();
        let second = flood_fill(&s, &claims, Pixel::new(2, 1), other);
        assert_eq!(first.len(), 6);
        assert!(second.is_empty());
        assert_eq!(claims.owner(Pixel::new(2, 1)), Some(OWNER));
    }

    #[test]
    fn claim_is_one_way() {
        let claims = ClaimMap::new(Dimensions {
            width: 2,
            height: 2,
        });
        let a = NonZeroU32::new(3).unwrap();
        let b = NonZeroU32::new(4).unwrap();
        assert!(claims.try_claim(Pixel::new(1, 1), a));
        assert!(!claims.try_claim(Pixel::new(1, 1), b));
        assert_eq!(claims.owner(Pixel::new(1, 1)), Some(a));
        assert_eq!(claims.owner(Pixel::new(0, 0)), None);
        assert!(!claims.try_claim(Pixel::new(2, 0), a));
    }

    #[test]
    fn single_pixel_region_has_zero_width() {
        let s = stencil(&["###", "#.#", "###"]);
        let claims = ClaimMap::new(s.dimensions());
        let region = flood_fill(&s, &claims, Pixel::new(1, 1), OWNER);
        assert_eq!(region.len(), 1);
        let b = region.bounds().unwrap();
        assert_eq!((b.width(), b.height()), (0, 0));
        assert!(b.contains(Pixel::new(1, 1)));
        assert!(!b.contains(Pixel::new(0, 1)));
    }
}
