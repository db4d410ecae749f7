//! Path command lists and the path-data string interchange.
//!
//! The rasterizer consumes flat [`PathCommand`] lists, one per subpath.
//! They come either straight from a [`PathDescription`] or from parsing
//! an SVG-style path-data string with [`parse_path_data`]. Arcs are
//! converted to cubic Beziers on the way in, so downstream code only sees
//! moves, lines, cubics and closes.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt::Write as _;

use svg::node::element::path::{Command, Data, Parameters, Position};

use crate::curves::{Border, EdgeCurve, PathDescription};
use crate::types::{Point, PuzzleError};

/// One drawing command in absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    /// Start a new subpath.
    MoveTo(Point),
    /// Straight line from the pen.
    LineTo(Point),
    /// Cubic Bezier from the pen.
    CubicTo {
        /// First control point.
        ctrl1: Point,
        /// Second control point.
        ctrl2: Point,
        /// End point.
        end: Point,
    },
    /// Line back to the subpath start.
    Close,
}

impl EdgeCurve {
    /// This curve as a single subpath.
    #[must_use]
    pub fn commands(&self) -> Vec<PathCommand> {
        let mut commands = Vec::with_capacity(self.segments().len() + 1);
        commands.push(PathCommand::MoveTo(self.start()));
        commands.extend(self.segments().iter().map(|s| PathCommand::CubicTo {
            ctrl1: s.ctrl1,
            ctrl2: s.ctrl2,
            end: s.end,
        }));
        commands
    }

    /// `M x,y C …` path data for this curve.
    #[must_use]
    pub fn to_path_data(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "M {},{}", self.start().x, self.start().y);
        for s in self.segments() {
            let _ = write!(
                out,
                " C {},{} {},{} {},{}",
                s.ctrl1.x, s.ctrl1.y, s.ctrl2.x, s.ctrl2.y, s.end.x, s.end.y
            );
        }
        out
    }
}

impl Border {
    /// The outline as a single subpath, corners converted to cubics.
    #[must_use]
    pub fn commands(&self) -> Vec<PathCommand> {
        let Self {
            width: w,
            height: h,
            radius: r,
        } = *self;
        let sides = [
            (Point::new(w - r, 0.0), Point::new(w, r)),
            (Point::new(w, h - r), Point::new(w - r, h)),
            (Point::new(r, h), Point::new(0.0, h - r)),
            (Point::new(0.0, r), Point::new(r, 0.0)),
        ];
        let mut commands = vec![PathCommand::MoveTo(Point::new(r, 0.0))];
        for (line_end, corner_end) in sides {
            commands.push(PathCommand::LineTo(line_end));
            commands.extend(arc_to_cubics(line_end, r, r, 0.0, false, true, corner_end));
        }
        commands
    }

    /// `M … L … A …` path data for the outline.
    #[must_use]
    pub fn to_path_data(&self) -> String {
        let Self {
            width: w,
            height: h,
            radius: r,
        } = *self;
        format!(
            "M {r},0 L {},0 A {r} {r} 0 0 1 {w},{r} L {w},{} A {r} {r} 0 0 1 {},{h} \
             L {r},{h} A {r} {r} 0 0 1 0,{} L 0,{r} A {r} {r} 0 0 1 {r},0",
            w - r,
            h - r,
            w - r,
            h - r,
        )
    }
}

impl PathDescription {
    /// Every curve and the border as separate subpaths: horizontal lines,
    /// vertical lines, then the border.
    #[must_use]
    pub fn outline_commands(&self) -> Vec<Vec<PathCommand>> {
        self.edges()
            .map(EdgeCurve::commands)
            .chain(std::iter::once(self.border().commands()))
            .collect()
    }

    /// Path data for the horizontal lines only (empty for a single row).
    #[must_use]
    pub fn horizontal_path_data(&self) -> String {
        join_curves(self.horizontal())
    }

    /// Path data for the vertical lines only (empty for a single column).
    #[must_use]
    pub fn vertical_path_data(&self) -> String {
        join_curves(self.vertical())
    }

    /// Path data for the border only.
    #[must_use]
    pub fn border_path_data(&self) -> String {
        self.border().to_path_data()
    }

    /// The union of all curves and the border as one path-data string.
    ///
    /// Feeding this to [`parse_path_data`] yields the same subpaths as
    /// [`outline_commands`](Self::outline_commands), up to the precision
    /// of the parser's number type.
    #[must_use]
    pub fn to_path_data(&self) -> String {
        [
            self.horizontal_path_data(),
            self.vertical_path_data(),
            self.border_path_data(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

fn join_curves(curves: &[EdgeCurve]) -> String {
    curves
        .iter()
        .map(EdgeCurve::to_path_data)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse an SVG-style path-data string into subpaths.
///
/// Supports absolute and relative `M L H V C A Z`, including implicit
/// repeats of a command's parameter set. Any other command, a parameter
/// count that does not fit the command, or drawing before the first move
/// is a [`PuzzleError::PathParse`].
///
/// # Errors
///
/// Returns [`PuzzleError::PathParse`] for malformed or unsupported input.
pub fn parse_path_data(input: &str) -> Result<Vec<Vec<PathCommand>>, PuzzleError> {
    let data = Data::parse(input).map_err(|e| PuzzleError::PathParse(e.to_string()))?;
    let mut builder = SubpathBuilder::default();

    for command in data.iter() {
        match command {
            Command::Move(position, params) => {
                for (i, pair) in chunks(params, 2, "M")?.iter().enumerate() {
                    let to = builder.resolve(*position, pair[0], pair[1]);
                    if i == 0 {
                        builder.move_to(to);
                    } else {
                        builder.push(PathCommand::LineTo(to), to)?;
                    }
                }
            }
            Command::Line(position, params) => {
                for pair in chunks(params, 2, "L")? {
                    let to = builder.resolve(*position, pair[0], pair[1]);
                    builder.push(PathCommand::LineTo(to), to)?;
                }
            }
            Command::HorizontalLine(position, params) => {
                for x in chunks(params, 1, "H")? {
                    let to = match position {
                        Position::Absolute => Point::new(x[0], builder.pen.y),
                        Position::Relative => Point::new(builder.pen.x + x[0], builder.pen.y),
                    };
                    builder.push(PathCommand::LineTo(to), to)?;
                }
            }
            Command::VerticalLine(position, params) => {
                for y in chunks(params, 1, "V")? {
                    let to = match position {
                        Position::Absolute => Point::new(builder.pen.x, y[0]),
                        Position::Relative => Point::new(builder.pen.x, builder.pen.y + y[0]),
                    };
                    builder.push(PathCommand::LineTo(to), to)?;
                }
            }
            Command::CubicCurve(position, params) => {
                for v in chunks(params, 6, "C")? {
                    let ctrl1 = builder.resolve(*position, v[0], v[1]);
                    let ctrl2 = builder.resolve(*position, v[2], v[3]);
                    let end = builder.resolve(*position, v[4], v[5]);
                    builder.push(PathCommand::CubicTo { ctrl1, ctrl2, end }, end)?;
                }
            }
            Command::EllipticalArc(position, params) => {
                for v in chunks(params, 7, "A")? {
                    let from = builder.pen;
                    let to = builder.resolve(*position, v[5], v[6]);
                    let large_arc = v[3] != 0.0;
                    let sweep = v[4] != 0.0;
                    builder.require_subpath()?;
                    for segment in arc_to_cubics(from, v[0], v[1], v[2], large_arc, sweep, to) {
                        builder.current.push(segment);
                    }
                    builder.pen = to;
                }
            }
            Command::Close => {
                builder.push(PathCommand::Close, builder.subpath_start)?;
            }
            _ => {
                return Err(PuzzleError::PathParse(
                    "unsupported path command (only M, L, H, V, C, A and Z are accepted)"
                        .to_owned(),
                ));
            }
        }
    }

    Ok(builder.finish())
}

#[derive(Debug, Default)]
struct SubpathBuilder {
    subpaths: Vec<Vec<PathCommand>>,
    current: Vec<PathCommand>,
    pen: Point,
    subpath_start: Point,
}

impl SubpathBuilder {
    fn resolve(&self, position: Position, x: f64, y: f64) -> Point {
        match position {
            Position::Absolute => Point::new(x, y),
            Position::Relative => Point::new(self.pen.x + x, self.pen.y + y),
        }
    }

    fn move_to(&mut self, to: Point) {
        if !self.current.is_empty() {
            self.subpaths.push(std::mem::take(&mut self.current));
        }
        self.current.push(PathCommand::MoveTo(to));
        self.pen = to;
        self.subpath_start = to;
    }

    fn require_subpath(&self) -> Result<(), PuzzleError> {
        if self.current.is_empty() {
            return Err(PuzzleError::PathParse(
                "path data must start with a move command".to_owned(),
            ));
        }
        Ok(())
    }

    fn push(&mut self, command: PathCommand, pen: Point) -> Result<(), PuzzleError> {
        self.require_subpath()?;
        self.current.push(command);
        self.pen = pen;
        Ok(())
    }

    fn finish(mut self) -> Vec<Vec<PathCommand>> {
        if !self.current.is_empty() {
            self.subpaths.push(self.current);
        }
        self.subpaths
    }
}

/// Split a command's parameters into groups of `arity`, widened to `f64`.
fn chunks(params: &Parameters, arity: usize, name: &str) -> Result<Vec<Vec<f64>>, PuzzleError> {
    if params.is_empty() || params.len() % arity != 0 {
        return Err(PuzzleError::PathParse(format!(
            "{name} takes parameters in groups of {arity}, got {}",
            params.len()
        )));
    }
    Ok(params
        .chunks(arity)
        .map(|group| group.iter().map(|&v| f64::from(v)).collect())
        .collect())
}

/// Convert an SVG elliptical arc into cubic Beziers.
///
/// Uses the endpoint-to-center conversion with out-of-range radii scaled
/// up, and splits the sweep into pieces of at most a quarter turn. A zero
/// radius gives a straight line; identical endpoints give nothing.
#[allow(clippy::many_single_char_names, clippy::similar_names)]
fn arc_to_cubics(
    from: Point,
    rx: f64,
    ry: f64,
    rotation_deg: f64,
    large_arc: bool,
    sweep: bool,
    to: Point,
) -> Vec<PathCommand> {
    if from == to {
        return Vec::new();
    }
    if rx == 0.0 || ry == 0.0 {
        return vec![PathCommand::LineTo(to)];
    }

    let (mut rx, mut ry) = (rx.abs(), ry.abs());
    let (sin_phi, cos_phi) = rotation_deg.to_radians().sin_cos();

    let dx2 = (from.x - to.x) / 2.0;
    let dy2 = (from.y - to.y) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let scale = lambda.sqrt();
        rx *= scale;
        ry *= scale;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let numerator = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
    let denominator = rx2 * y1p * y1p + ry2 * x1p * x1p;
    let mut coef = (numerator / denominator).max(0.0).sqrt();
    if large_arc == sweep {
        coef = -coef;
    }
    let cxp = coef * rx * y1p / ry;
    let cyp = -coef * ry * x1p / rx;
    let cx = cos_phi * cxp - sin_phi * cyp + (from.x + to.x) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (from.y + to.y) / 2.0;

    let start_vec = ((x1p - cxp) / rx, (y1p - cyp) / ry);
    let end_vec = ((-x1p - cxp) / rx, (-y1p - cyp) / ry);
    let theta1 = angle_between((1.0, 0.0), start_vec);
    let mut delta_theta = angle_between(start_vec, end_vec);
    if !sweep && delta_theta > 0.0 {
        delta_theta -= TAU;
    } else if sweep && delta_theta < 0.0 {
        delta_theta += TAU;
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let pieces = (delta_theta.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
    #[allow(clippy::cast_precision_loss)]
    let step = delta_theta / pieces as f64;
    let k = 4.0 / 3.0 * (step / 4.0).tan();

    let map = |ux: f64, uy: f64| {
        Point::new(
            cx + rx * ux * cos_phi - ry * uy * sin_phi,
            cy + rx * ux * sin_phi + ry * uy * cos_phi,
        )
    };

    (0..pieces)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t1 = theta1 + step * i as f64;
            let t2 = t1 + step;
            let (s1, c1) = t1.sin_cos();
            let (s2, c2) = t2.sin_cos();
            let end = if i + 1 == pieces { to } else { map(c2, s2) };
            PathCommand::CubicTo {
                ctrl1: map(c1 - k * s1, s1 + k * c1),
                ctrl2: map(c2 + k * s2, s2 - k * c2),
                end,
            }
        })
        .collect()
}

fn angle_between(u: (f64, f64), v: (f64, f64)) -> f64 {
    (u.0 * v.1 - u.1 * v.0).atan2(u.0 * v.0 + u.1 * v.1)
}
