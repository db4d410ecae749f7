//! Curve field generation: the jigsaw boundary curves for an R×C grid.
//!
//! Every internal grid line (rows-1 horizontal, cols-1 vertical) is one
//! continuous [`EdgeCurve`] running across the whole image, made of three
//! cubic Bezier segments per cell it spans. The middle segment forms the
//! tab; its bulge direction is re-rolled per cell.
//!
//! A curve is generated exactly once and both cells it separates refer to
//! that same instance (see [`PathDescription::edge_between`]), so adjacent
//! pieces always interlock exactly.
//!
//! Generation is deterministic: the only source of variation is the
//! [`SineRng`] state passed in, and the advanced state is handed back.

use serde::{Deserialize, Serialize};

use crate::rng::SineRng;
use crate::types::{Cell, GridShape, Point};

/// Tab half-width as a fraction of the cell length. Also scales how far
/// the tab head reaches into the neighboring cell.
pub const TAB_SIZE: f64 = 0.1;

/// Bound of the per-cell random jitter offsets (`a`..`e`), as a fraction
/// of the cell extent.
pub const JITTER: f64 = 0.05;

/// Round to two decimal places, halves rounding up.
fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// One cubic Bezier segment; its start is the previous segment's end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicSegment {
    /// First control point.
    pub ctrl1: Point,
    /// Second control point.
    pub ctrl2: Point,
    /// End point.
    pub end: Point,
}

impl CubicSegment {
    /// Evaluate the segment at parameter `t` in `[0, 1]`, given its start.
    #[must_use]
    pub fn point_at(&self, start: Point, t: f64) -> Point {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        Point::new(
            b0 * start.x + b1 * self.ctrl1.x + b2 * self.ctrl2.x + b3 * self.end.x,
            b0 * start.y + b1 * self.ctrl1.y + b2 * self.ctrl2.y + b3 * self.end.y,
        )
    }
}

/// Direction of an internal grid line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Runs left to right, separating row `index - 1` from row `index`.
    Horizontal,
    /// Runs top to bottom, separating column `index - 1` from column `index`.
    Vertical,
}

/// One internal grid line with its jigsaw tabs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCurve {
    orientation: Orientation,
    index: u32,
    start: Point,
    segments: Vec<CubicSegment>,
}

impl EdgeCurve {
    /// Number of cubic segments emitted per spanned cell.
    pub const SEGMENTS_PER_CELL: usize = 3;

    /// Whether this is a horizontal or vertical line.
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Line index: `1..rows` for horizontal, `1..cols` for vertical.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Start point on the image edge.
    #[must_use]
    pub const fn start(&self) -> Point {
        self.start
    }

    /// All segments in order.
    #[must_use]
    pub fn segments(&self) -> &[CubicSegment] {
        &self.segments
    }

    /// End point on the opposite image edge.
    #[must_use]
    pub fn end(&self) -> Point {
        self.segments.last().map_or(self.start, |s| s.end)
    }

    /// The three segments bordering the `span`-th cell along the line.
    #[must_use]
    pub fn cell_segments(&self, span: u32) -> Option<&[CubicSegment]> {
        let from = span as usize * Self::SEGMENTS_PER_CELL;
        self.segments.get(from..from + Self::SEGMENTS_PER_CELL)
    }

    /// Sample the curve at `steps` points per segment (plus the start).
    #[must_use]
    pub fn sample(&self, steps: usize) -> Vec<Point> {
        let steps = steps.max(1);
        let mut points = Vec::with_capacity(self.segments.len() * steps + 1);
        points.push(self.start);
        let mut from = self.start;
        for segment in &self.segments {
            for i in 1..=steps {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f64 / steps as f64;
                points.push(segment.point_at(from, t));
            }
            from = segment.end;
        }
        points
    }
}

/// Closed outline around the full image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Border {
    /// Outline width.
    pub width: f64,
    /// Outline height.
    pub height: f64,
    /// Corner rounding radius (zero gives a plain rectangle).
    pub radius: f64,
}

/// Every boundary of one puzzle: all internal grid lines plus the border.
///
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDescription {
    shape: GridShape,
    horizontal: Vec<EdgeCurve>,
    vertical: Vec<EdgeCurve>,
    border: Border,
}

impl PathDescription {
    /// The grid the curves were generated for.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Horizontal lines, top to bottom (`index` 1..rows).
    #[must_use]
    pub fn horizontal(&self) -> &[EdgeCurve] {
        &self.horizontal
    }

    /// Vertical lines, left to right (`index` 1..cols).
    #[must_use]
    pub fn vertical(&self) -> &[EdgeCurve] {
        &self.vertical
    }

    /// All internal lines: horizontal first, then vertical.
    pub fn edges(&self) -> impl Iterator<Item = &EdgeCurve> {
        self.horizontal.iter().chain(&self.vertical)
    }

    /// The outer border.
    #[must_use]
    pub const fn border(&self) -> Border {
        self.border
    }

    /// Outline width in pixels.
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.border.width
    }

    /// Outline height in pixels.
    #[must_use]
    pub const fn height(&self) -> f64 {
        self.border.height
    }

    /// The curve separating two orthogonally adjacent cells.
    ///
    /// Argument order does not matter: both neighbors get the same
    /// reference. Returns `None` for cells that are not neighbors or lie
    /// outside the grid.
    #[must_use]
    pub fn edge_between(&self, a: Cell, b: Cell) -> Option<&EdgeCurve> {
        if !self.shape.contains(a) || !self.shape.contains(b) {
            return None;
        }
        if a.row == b.row && a.col.abs_diff(b.col) == 1 {
            let line = a.col.max(b.col);
            return self.vertical.get(line as usize - 1);
        }
        if a.col == b.col && a.row.abs_diff(b.row) == 1 {
            let line = a.row.max(b.row);
            return self.horizontal.get(line as usize - 1);
        }
        None
    }
}

/// Per-cell tab parameters.
///
/// `flip` carries over from one line to the next: the whole field is one
/// stream of parameter advances.
#[derive(Debug, Clone, Copy, Default)]
struct TabState {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    flip: bool,
}

impl TabState {
    fn start_line(&mut self, rng: &mut SineRng) {
        self.e = rng.uniform(-JITTER, JITTER);
        self.advance(rng);
    }

    fn advance(&mut self, rng: &mut SineRng) {
        let previous = self.flip;
        self.flip = rng.next_bool();
        self.a = if self.flip == previous { -self.e } else { self.e };
        self.b = rng.uniform(-JITTER, JITTER);
        self.c = rng.uniform(-JITTER, JITTER);
        self.d = rng.uniform(-JITTER, JITTER);
        self.e = rng.uniform(-JITTER, JITTER);
    }
}

/// Maps (along-line, across-line) cell fractions to image coordinates
/// for one grid line.
#[derive(Debug, Clone, Copy)]
struct LineFrame {
    orientation: Orientation,
    /// Cell extent along the line.
    along: f64,
    /// Cell extent across the line.
    across: f64,
    /// Line position across the image.
    offset: f64,
}

impl LineFrame {
    fn point(&self, span: u32, along_frac: f64, across_frac: f64, flip: bool) -> Point {
        let sign = if flip { -1.0 } else { 1.0 };
        let l = round2(self.along * f64::from(span) + self.along * along_frac);
        let w = round2(self.offset + self.across * across_frac * sign);
        match self.orientation {
            Orientation::Horizontal => Point::new(l, w),
            Orientation::Vertical => Point::new(w, l),
        }
    }

    fn tab_segments(&self, span: u32, tabs: &TabState) -> [CubicSegment; 3] {
        let t = TAB_SIZE;
        let TabState {
            a,
            b,
            c,
            d,
            e,
            flip,
        } = *tabs;
        let p = |along: f64, across: f64| self.point(span, along, across, flip);
        [
            CubicSegment {
                ctrl1: p(0.2, a),
                ctrl2: p(0.5 + b + d, -t + c),
                end: p(0.5 - t + b, t + c),
            },
            CubicSegment {
                ctrl1: p(0.5 - 2.0 * t + b - d, 3.0 * t + c),
                ctrl2: p(0.5 + 2.0 * t + b - d, 3.0 * t + c),
                end: p(0.5 + t + b, t + c),
            },
            CubicSegment {
                ctrl1: p(0.5 + b + d, -t + c),
                ctrl2: p(0.8, e),
                end: p(1.0, 0.0),
            },
        ]
    }
}

/// Builds a [`PathDescription`] for one image size and grid.
#[derive(Debug, Clone, Copy)]
pub struct CurveGenerator {
    shape: GridShape,
    width: f64,
    height: f64,
    corner_radius: f64,
}

impl CurveGenerator {
    /// Generator for a `width`×`height` outline cut into `shape`.
    #[must_use]
    pub const fn new(shape: GridShape, width: f64, height: f64) -> Self {
        Self {
            shape,
            width,
            height,
            corner_radius: 0.0,
        }
    }

    /// Round the border corners by `radius` pixels.
    #[must_use]
    pub const fn with_corner_radius(mut self, radius: f64) -> Self {
        self.corner_radius = radius;
        self
    }

    /// Generate the curve field, consuming draws from `rng`.
    ///
    /// Returns the description together with the advanced RNG state.
    /// Horizontal lines are generated top to bottom, then vertical lines
    /// left to right.
    #[must_use]
    pub fn generate(&self, mut rng: SineRng) -> (PathDescription, SineRng) {
        let rows = self.shape.rows();
        let cols = self.shape.cols();
        let cell_width = self.width / f64::from(cols);
        let cell_height = self.height / f64::from(rows);
        let mut tabs = TabState::default();

        let horizontal = (1..rows)
            .map(|index| {
                let frame = LineFrame {
                    orientation: Orientation::Horizontal,
                    along: cell_width,
                    across: cell_height,
                    offset: cell_height * f64::from(index),
                };
                trace_line(&frame, index, cols, &mut tabs, &mut rng)
            })
            .collect();

        let vertical = (1..cols)
            .map(|index| {
                let frame = LineFrame {
                    orientation: Orientation::Vertical,
                    along: cell_height,
                    across: cell_width,
                    offset: cell_width * f64::from(index),
                };
                trace_line(&frame, index, rows, &mut tabs, &mut rng)
            })
            .collect();

        let description = PathDescription {
            shape: self.shape,
            horizontal,
            vertical,
            border: Border {
                width: self.width,
                height: self.height,
                radius: self.corner_radius,
            },
        };
        (description, rng)
    }
}

fn trace_line(
    frame: &LineFrame,
    index: u32,
    spans: u32,
    tabs: &mut TabState,
    rng: &mut SineRng,
) -> EdgeCurve {
    tabs.start_line(rng);
    let start = frame.point(0, 0.0, 0.0, tabs.flip);
    let mut segments = Vec::with_capacity(spans as usize * EdgeCurve::SEGMENTS_PER_CELL);
    for span in 0..spans {
        segments.extend(frame.tab_segments(span, tabs));
        tabs.advance(rng);
    }
    EdgeCurve {
        orientation: frame.orientation,
        index,
        start,
        segments,
    }
}

/// Generate the curve field for a `width`×`height` image.
///
/// Pure and deterministic in all inputs: equal arguments give equal
/// output. `width` and `height` are expected to be positive; the grid
/// shape is already validated by construction.
#[must_use]
pub fn generate(shape: GridShape, width: f64, height: f64, seed: f64) -> PathDescription {
    CurveGenerator::new(shape, width, height)
        .generate(SineRng::new(seed))
        .0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shape(rows: u32, cols: u32) -> GridShape {
        GridShape::try_new(rows, cols).unwrap()
    }

    #[test]
    fn round2_rounds_half_up() {
        assert!((round2(1.005_000_1) - 1.01).abs() < 1e-12);
        assert!((round2(2.344) - 2.34).abs() < 1e-12);
        assert!((round2(100.0) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn one_by_one_grid_has_no_internal_curves() {
        let path = generate(shape(1, 1), 300.0, 200.0, 1.0);
        assert!(path.horizontal().is_empty());
        assert!(path.vertical().is_empty());
        assert_eq!(path.edges().count(), 0);
        assert!((path.width() - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn line_counts_match_grid() {
        let path = generate(shape(3, 5), 500.0, 300.0, 1.0);
        assert_eq!(path.horizontal().len(), 2);
        assert_eq!(path.vertical().len(), 4);
        for curve in path.horizontal() {
            assert_eq!(curve.segments().len(), 5 * 3);
            assert_eq!(curve.orientation(), Orientation::Horizontal);
        }
        for curve in path.vertical() {
            assert_eq!(curve.segments().len(), 3 * 3);
            assert_eq!(curve.orientation(), Orientation::Vertical);
        }
    }

    #[test]
    fn curves_span_full_image() {
        let path = generate(shape(3, 4), 400.0, 300.0, 5.0);
        for curve in path.horizontal() {
            let y = 100.0 * f64::from(curve.index());
            assert_eq!(curve.start(), Point::new(0.0, y));
            assert_eq!(curve.end(), Point::new(400.0, y));
        }
        for curve in path.vertical() {
            let x = 100.0 * f64::from(curve.index());
            assert_eq!(curve.start(), Point::new(x, 0.0));
            assert_eq!(curve.end(), Point::new(x, 300.0));
        }
    }

    #[test]
    fn cell_boundaries_are_on_the_grid_line() {
        let path = generate(shape(2, 3), 300.0, 200.0, 11.0);
        let curve = &path.horizontal()[0];
        for span in 0..3 {
            let segments = curve.cell_segments(span).unwrap();
            assert_eq!(segments[2].end, Point::new(100.0 * f64::from(span + 1), 100.0));
        }
        assert!(curve.cell_segments(3).is_none());
    }

    #[test]
    fn coordinates_have_two_decimals() {
        let path = generate(shape(3, 3), 317.0, 211.0, 42.0);
        for curve in path.edges() {
            for s in curve.segments() {
                for p in [s.ctrl1, s.ctrl2, s.end] {
                    for v in [p.x, p.y] {
                        let scaled = v * 100.0;
                        assert!(
                            (scaled - scaled.round()).abs() < 1e-6,
                            "{v} has more than two decimals"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let a = generate(shape(4, 4), 400.0, 400.0, 1234.0);
        let b = generate(shape(4, 4), 400.0, 400.0, 1234.0);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = generate(shape(3, 3), 300.0, 300.0, 1.0);
        let b = generate(shape(3, 3), 300.0, 300.0, 2.0);
        assert_ne!(a, b);
    }

    #[test]
    fn returned_rng_state_resumes_stream() {
        let generator = CurveGenerator::new(shape(3, 3), 300.0, 300.0);
        let (_, rng) = generator.generate(SineRng::new(1.0));
        // Each line: 1 start draw + 5 draws per advance, with one advance
        // at the start and one per spanned cell.
        let draws_per_line = 1.0 + 5.0 * 4.0;
        assert!((rng.state() - (1.0 + 4.0 * draws_per_line)).abs() < f64::EPSILON);

        let (second, _) = generator.generate(rng);
        let (first, _) = generator.generate(SineRng::new(1.0));
        assert_ne!(first, second);
    }

    #[test]
    fn edge_between_returns_same_curve_for_both_neighbors() {
        let path = generate(shape(3, 3), 300.0, 300.0, 1.0);
        let left = Cell::new(1, 0);
        let right = Cell::new(1, 1);
        let ab = path.edge_between(left, right).unwrap();
        let ba = path.edge_between(right, left).unwrap();
        assert!(std::ptr::eq(ab, ba));
        assert_eq!(ab.orientation(), Orientation::Vertical);
        assert_eq!(ab.index(), 1);

        let top = Cell::new(0, 2);
        let bottom = Cell::new(1, 2);
        let tb = path.edge_between(top, bottom).unwrap();
        assert!(std::ptr::eq(tb, path.edge_between(bottom, top).unwrap()));
        assert_eq!(tb.orientation(), Orientation::Horizontal);
        assert_eq!(tb.index(), 1);
    }

    #[test]
    fn edge_between_non_neighbors_is_none() {
        let path = generate(shape(3, 3), 300.0, 300.0, 1.0);
        assert!(path.edge_between(Cell::new(0, 0), Cell::new(1, 1)).is_none());
        assert!(path.edge_between(Cell::new(0, 0), Cell::new(0, 2)).is_none());
        assert!(path.edge_between(Cell::new(0, 0), Cell::new(0, 0)).is_none());
        assert!(path.edge_between(Cell::new(2, 2), Cell::new(2, 3)).is_none());
    }

    #[test]
    fn tabs_stay_within_a_third_of_a_cell() {
        for seed in 0..50 {
            let path = generate(shape(4, 4), 400.0, 400.0, f64::from(seed));
            for curve in path.edges() {
                let line = 100.0 * f64::from(curve.index());
                for p in curve.sample(16) {
                    let lateral = match curve.orientation() {
                        Orientation::Horizontal => p.y - line,
                        Orientation::Vertical => p.x - line,
                    };
                    assert!(
                        lateral.abs() < 100.0 / 3.0,
                        "seed {seed}: lateral offset {lateral} reaches a third of the cell"
                    );
                }
            }
        }
    }

    #[test]
    fn tabs_bulge_both_ways() {
        let path = generate(shape(6, 6), 600.0, 600.0, 77.0);
        let mut up = 0;
        let mut down = 0;
        for curve in path.horizontal() {
            let line = 100.0 * f64::from(curve.index());
            for span in 0..6 {
                let head = curve.cell_segments(span).unwrap()[1].ctrl1;
                if head.y < line {
                    up += 1;
                } else {
                    down += 1;
                }
            }
        }
        assert!(up > 0 && down > 0, "up={up} down={down}");
    }

    #[test]
    fn corner_radius_is_carried_on_border() {
        let (path, _) = CurveGenerator::new(shape(2, 2), 200.0, 100.0)
            .with_corner_radius(8.0)
            .generate(SineRng::new(3.0));
        assert!((path.border().radius - 8.0).abs() < f64::EPSILON);
        assert!((path.height() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sample_includes_start_and_end() {
        let path = generate(shape(2, 2), 200.0, 200.0, 9.0);
        let curve = &path.horizontal()[0];
        let samples = curve.sample(4);
        assert_eq!(samples.len(), curve.segments().len() * 4 + 1);
        assert_eq!(samples[0], curve.start());
        assert!(samples.last().unwrap().distance(curve.end()) < 1e-9);
    }
}
