//! Stroke end decorations: caps, arrows and other glyphs drawn at the ends of open strokes
use crate::{
    ColorU8, Error, LineJoin, PI, Point, Quality, Scalar,
    curve::{CIRCLE_KAPPA, ellipse_chain, flatten_chain},
    utils::arc_segments,
};
use std::{fmt, str::FromStr};

/// Position of the arrow notch as a fraction of the arrow length
const ARROW_NOTCH: Scalar = 0.7;

/// Shape of the stroke end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum StrokeEndKind {
    /// Line stops exactly at the end point
    #[default]
    Butt,
    /// Line extends by half of its width, square or round depending on the stroke
    Cap,
    Arrow,
    ContourArrow,
    LineArrow,
    Triangle,
    ContourTriangle,
    Square,
    ContourSquare,
    HalfSquare,
    Circle,
    ContourCircle,
    HalfCircle,
    Diamond,
    ContourDiamond,
    HalfDiamond,
    /// Short bar across the line
    Stroke,
}

impl StrokeEndKind {
    pub const ALL: [StrokeEndKind; 17] = [
        Self::Butt,
        Self::Cap,
        Self::Arrow,
        Self::ContourArrow,
        Self::LineArrow,
        Self::Triangle,
        Self::ContourTriangle,
        Self::Square,
        Self::ContourSquare,
        Self::HalfSquare,
        Self::Circle,
        Self::ContourCircle,
        Self::HalfCircle,
        Self::Diamond,
        Self::ContourDiamond,
        Self::HalfDiamond,
        Self::Stroke,
    ];

    pub fn name(self) -> &'static str {
        use StrokeEndKind::*;
        match self {
            Butt => "butt",
            Cap => "cap",
            Arrow => "arrow",
            ContourArrow => "contour-arrow",
            LineArrow => "line-arrow",
            Triangle => "triangle",
            ContourTriangle => "contour-triangle",
            Square => "square",
            ContourSquare => "contour-square",
            HalfSquare => "half-square",
            Circle => "circle",
            ContourCircle => "contour-circle",
            HalfCircle => "half-circle",
            Diamond => "diamond",
            ContourDiamond => "contour-diamond",
            HalfDiamond => "half-diamond",
            Stroke => "stroke",
        }
    }

    /// Whether glyph is drawn as an outline filled with the inner color
    pub fn is_contour(self) -> bool {
        use StrokeEndKind::*;
        matches!(
            self,
            ContourArrow | ContourTriangle | ContourSquare | ContourCircle | ContourDiamond
        )
    }

    /// Glyph `(length, width)` in units of the stroke width
    fn base_size(self) -> (Scalar, Scalar) {
        use StrokeEndKind::*;
        match self {
            Butt | Cap => (0.0, 0.0),
            Arrow | ContourArrow => (4.0, 3.5),
            LineArrow => (3.0, 3.5),
            Triangle | ContourTriangle => (3.5, 3.5),
            Square | ContourSquare | HalfSquare => (3.0, 3.0),
            Circle | ContourCircle | HalfCircle => (3.0, 3.0),
            Diamond | ContourDiamond | HalfDiamond => (4.0, 3.0),
            Stroke => (0.0, 3.0),
        }
    }
}

impl fmt::Display for StrokeEndKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrokeEndKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::unknown_name("stroke end", name))
    }
}

/// Decoration of a stroke end
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct StrokeEnd {
    pub kind: StrokeEndKind,
    /// Fill color of the contour glyphs
    pub inner_color: ColorU8,
    /// Scale of the glyph across the line
    pub width_factor: Scalar,
    /// Scale of the glyph along the line
    pub length_factor: Scalar,
}

impl Default for StrokeEnd {
    fn default() -> Self {
        Self::new(StrokeEndKind::Butt)
    }
}

impl From<StrokeEndKind> for StrokeEnd {
    fn from(kind: StrokeEndKind) -> Self {
        Self::new(kind)
    }
}

impl StrokeEnd {
    pub const BUTT: StrokeEnd = StrokeEnd::new(StrokeEndKind::Butt);
    pub const CAP: StrokeEnd = StrokeEnd::new(StrokeEndKind::Cap);

    pub const fn new(kind: StrokeEndKind) -> Self {
        Self {
            kind,
            inner_color: ColorU8::WHITE,
            width_factor: 1.0,
            length_factor: 1.0,
        }
    }

    pub fn with_inner_color(self, inner_color: ColorU8) -> Self {
        Self {
            inner_color,
            ..self
        }
    }

    pub fn with_factors(self, width_factor: Scalar, length_factor: Scalar) -> Self {
        Self {
            width_factor,
            length_factor,
            ..self
        }
    }

    /// Anything other than a plain butt or cap end
    pub fn is_decorated(&self) -> bool {
        !matches!(self.kind, StrokeEndKind::Butt | StrokeEndKind::Cap)
    }

    /// Plain end used between dashes and for glyph marks
    pub(crate) fn plain(join: LineJoin) -> Self {
        match join {
            LineJoin::Round => Self::CAP,
            LineJoin::Miter(_) => Self::BUTT,
        }
    }

    /// Distance from the end point that a glyph can cover, in units of the stroke width
    pub(crate) fn reach(&self) -> Scalar {
        let (length, width) = self.kind.base_size();
        let factor = self.width_factor.abs().max(self.length_factor.abs()).max(1.0);
        length.max(width) * factor + 1.0
    }

    #[cfg(feature = "serde")]
    pub fn from_json(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Dimensions of the glyph for the stroke of the given `width`
    pub(crate) fn metrics(
        &self,
        width: Scalar,
        join: LineJoin,
        quality: Quality,
        scale: Scalar,
    ) -> EndMetrics {
        let (length, spread) = self.kind.base_size();
        EndMetrics {
            half_width: width / 2.0,
            length: length * width * self.length_factor,
            spread: spread * width * self.width_factor / 2.0,
            join,
            quality,
            scale,
        }
    }

    fn is_degenerate(&self, metrics: &EndMetrics) -> bool {
        use StrokeEndKind::*;
        match self.kind {
            Butt | Cap => false,
            Stroke => !(metrics.spread > 0.0),
            _ => !(metrics.length > 0.0 && metrics.spread > 0.0),
        }
    }

    /// Where and how the line body stops
    ///
    /// All coordinates are in the local end frame, see [`EndFrame`].
    pub(crate) fn cut(&self, metrics: &EndMetrics) -> EndCut {
        use StrokeEndKind::*;
        if self.is_degenerate(metrics) {
            return EndCut::flat(0.0);
        }
        let hw = metrics.half_width;
        let (l, h) = (metrics.length, metrics.spread);
        match self.kind {
            Butt => EndCut::flat(0.0),
            Cap => match metrics.join {
                LineJoin::Round => {
                    let count = metrics.arc_count(hw + hw, 0.5, 1, 128);
                    let outline = (1..count)
                        .map(|index| {
                            let angle = PI * index as Scalar / count as Scalar;
                            Point::new(-hw * angle.sin(), hw * angle.cos())
                        })
                        .collect();
                    EndCut { cut: 0.0, outline }
                }
                LineJoin::Miter(_) => EndCut {
                    cut: 0.0,
                    outline: vec![Point::new(-hw, hw), Point::new(-hw, -hw)],
                },
            },
            Arrow | ContourArrow => {
                // body edges meet the back edges of the barbs
                let notch = ARROW_NOTCH * l;
                if hw < h {
                    EndCut {
                        cut: notch + (l - notch) * hw / h,
                        outline: vec![Point::new(notch, 0.0)],
                    }
                } else {
                    EndCut::flat(l)
                }
            }
            LineArrow => {
                let (tip, angle) = line_arrow_tip(metrics);
                let inner = 2.0 * tip;
                EndCut {
                    cut: inner + hw / angle.tan(),
                    outline: vec![Point::new(inner, 0.0)],
                }
            }
            Triangle | ContourTriangle | Square | ContourSquare => EndCut::flat(l),
            HalfSquare => EndCut::flat(l + hw),
            Circle | ContourCircle => {
                let radius = l / 2.0;
                metrics.arc_cut(radius, radius, h)
            }
            HalfCircle => metrics.arc_cut(0.0, l / 2.0 + hw, h + hw),
            Diamond | ContourDiamond => {
                if hw < h {
                    EndCut {
                        cut: l - 0.5 * l * hw / h,
                        outline: vec![Point::new(l, 0.0)],
                    }
                } else {
                    EndCut::flat(l)
                }
            }
            HalfDiamond => {
                // outer boundary of the arms: x * 2 / l + |y| / h = 1 + hw * k
                let apex = l / 2.0;
                let k = ((1.0 / apex).powi(2) + (1.0 / h).powi(2)).sqrt();
                let cut = apex * (1.0 + hw * k - hw / h);
                let normal = Point::new(1.0 / apex, 1.0 / h) / k;
                let outline = match metrics.join {
                    LineJoin::Round => {
                        let start = normal.y().atan2(normal.x());
                        let count = metrics.arc_count(hw + hw, start / PI, 1, 64);
                        (0..=count)
                            .map(|index| {
                                let angle = start * (1.0 - 2.0 * index as Scalar / count as Scalar);
                                Point::new(apex + hw * angle.cos(), hw * angle.sin())
                            })
                            .collect()
                    }
                    LineJoin::Miter(limit) if apex * k <= limit => {
                        vec![Point::new(apex * (1.0 + hw * k), 0.0)]
                    }
                    LineJoin::Miter(_) => vec![
                        Point::new(apex + hw * normal.x(), hw * normal.y()),
                        Point::new(apex + hw * normal.x(), -hw * normal.y()),
                    ],
                };
                EndCut { cut, outline }
            }
            Stroke => EndCut::flat(hw),
        }
    }

    /// Glyph drawn at the end, `None` for plain ends
    pub(crate) fn glyph(&self, metrics: &EndMetrics) -> Option<Glyph> {
        use StrokeEndKind::*;
        if self.is_degenerate(metrics) {
            return None;
        }
        let hw = metrics.half_width;
        let (l, h) = (metrics.length, metrics.spread);
        let glyph = match self.kind {
            Butt | Cap => return None,
            Arrow | ContourArrow => {
                let notch = ARROW_NOTCH * l;
                contour_or_fill(
                    self.kind,
                    vec![
                        Point::new(0.0, 0.0),
                        Point::new(l, h),
                        Point::new(notch, 0.0),
                        Point::new(l, -h),
                    ],
                    hw,
                )
            }
            LineArrow => {
                let (tip, _) = line_arrow_tip(metrics);
                Glyph::Mark(vec![
                    Point::new(l + tip, h),
                    Point::new(tip, 0.0),
                    Point::new(l + tip, -h),
                ])
            }
            Triangle | ContourTriangle => contour_or_fill(
                self.kind,
                vec![Point::new(0.0, 0.0), Point::new(l, h), Point::new(l, -h)],
                hw,
            ),
            Square | ContourSquare => contour_or_fill(self.kind, rect(0.0, l, h), hw),
            HalfSquare => Glyph::Mark(vec![
                Point::new(0.0, h),
                Point::new(l, h),
                Point::new(l, -h),
                Point::new(0.0, -h),
            ]),
            Circle | ContourCircle => {
                let radius = l / 2.0;
                let outline = metrics.ellipse(Point::new(radius, 0.0), radius, h);
                contour_or_fill(self.kind, outline, hw)
            }
            HalfCircle => {
                // back half of the ellipse, open towards the end point
                let (rx, ry) = (l / 2.0, h);
                let chain = [
                    Point::new(0.0, ry),
                    Point::new(rx * CIRCLE_KAPPA, ry),
                    Point::new(rx, ry * CIRCLE_KAPPA),
                    Point::new(rx, 0.0),
                    Point::new(rx, -ry * CIRCLE_KAPPA),
                    Point::new(rx * CIRCLE_KAPPA, -ry),
                    Point::new(0.0, -ry),
                ];
                Glyph::Mark(flatten_chain(
                    &chain,
                    false,
                    metrics.scale,
                    metrics.quality.curve_quality,
                ))
            }
            Diamond | ContourDiamond => contour_or_fill(
                self.kind,
                vec![
                    Point::new(0.0, 0.0),
                    Point::new(l / 2.0, h),
                    Point::new(l, 0.0),
                    Point::new(l / 2.0, -h),
                ],
                hw,
            ),
            HalfDiamond => Glyph::Mark(vec![
                Point::new(0.0, h),
                Point::new(l / 2.0, 0.0),
                Point::new(0.0, -h),
            ]),
            Stroke => Glyph::Mark(vec![Point::new(0.0, h), Point::new(0.0, -h)]),
        };
        Some(glyph)
    }
}

/// Dimensions of the end glyph in user space
#[derive(Debug, Clone, Copy)]
pub(crate) struct EndMetrics {
    /// Half of the stroke width
    pub half_width: Scalar,
    /// Glyph length along the line
    pub length: Scalar,
    /// Half of the glyph width across the line
    pub spread: Scalar,
    pub join: LineJoin,
    pub quality: Quality,
    /// User space to device scale
    pub scale: Scalar,
}

impl EndMetrics {
    fn arc_count(&self, extent: Scalar, fraction: Scalar, min: usize, max: usize) -> usize {
        arc_segments(
            self.quality.circle_quality,
            extent * self.scale,
            fraction,
            min,
            max,
        )
    }

    /// Body cut against the back half of the ellipse centered at `(center, 0)`
    fn arc_cut(&self, center: Scalar, rx: Scalar, ry: Scalar) -> EndCut {
        let hw = self.half_width;
        if hw >= ry {
            return EndCut::flat(center + rx);
        }
        let start = (hw / ry).asin();
        let count = self.arc_count(rx + ry, start / PI, 1, 64);
        let outline = (1..count)
            .map(|index| {
                let angle = start * (1.0 - 2.0 * index as Scalar / count as Scalar);
                Point::new(center + rx * angle.cos(), ry * angle.sin())
            })
            .collect();
        EndCut {
            cut: center + rx * start.cos(),
            outline,
        }
    }

    fn ellipse(&self, center: Point, rx: Scalar, ry: Scalar) -> Vec<Point> {
        flatten_chain(
            &ellipse_chain(center, rx, ry),
            true,
            self.scale,
            self.quality.curve_quality,
        )
    }
}

/// Centerline tip offset and half angle of the line arrow
///
/// Tip is moved back so the outer miter of the barbs ends at the end point.
fn line_arrow_tip(metrics: &EndMetrics) -> (Scalar, Scalar) {
    let angle = metrics.spread.atan2(metrics.length);
    (metrics.half_width / angle.sin(), angle)
}

fn rect(x0: Scalar, x1: Scalar, h: Scalar) -> Vec<Point> {
    vec![
        Point::new(x0, -h),
        Point::new(x1, -h),
        Point::new(x1, h),
        Point::new(x0, h),
    ]
}

/// Contour glyphs stay inside `outline`
///
/// Ring is stroked along the outline moved inwards by `half_width`, inner fill
/// starts where the ring ends. Glyph too thin to have an inner area is filled.
fn contour_or_fill(kind: StrokeEndKind, outline: Vec<Point>, half_width: Scalar) -> Glyph {
    if !kind.is_contour() {
        return Glyph::Fill(outline);
    }
    let ring = inset_polygon(&outline, half_width);
    let inner = ring.as_deref().and_then(|ring| inset_polygon(ring, half_width));
    match (ring, inner) {
        (Some(ring), Some(inner)) => Glyph::Contour { ring, inner },
        _ => Glyph::Fill(outline),
    }
}

/// Polygon shrunk by `distance`, `None` if it collapses
///
/// Every edge is moved inwards and neighbouring edges are intersected. Result is
/// rejected if any edge changes its direction.
pub(crate) fn inset_polygon(points: &[Point], distance: Scalar) -> Option<Vec<Point>> {
    let count = points.len();
    if count < 3 {
        return None;
    }
    let area: Scalar = (0..count)
        .map(|index| points[index].cross(points[(index + 1) % count]))
        .sum();
    let side = if area > 0.0 { -distance } else { distance };
    let mut lines = Vec::with_capacity(count);
    for index in 0..count {
        let start = points[index];
        let dir = (points[(index + 1) % count] - start).normalize()?;
        lines.push((start + side * dir.normal(), dir));
    }
    let mut result = Vec::with_capacity(count);
    for index in 0..count {
        let (p0, d0) = lines[(index + count - 1) % count];
        let (p1, d1) = lines[index];
        let det = d0.cross(d1);
        if det.abs() < 1e-12 {
            result.push(p1);
        } else {
            result.push(p0 + ((p1 - p0).cross(d1) / det) * d0);
        }
    }
    for index in 0..count {
        let next = (index + 1) % count;
        let original = points[next] - points[index];
        let inset = result[next] - result[index];
        if original.dot(inset) <= 0.0 {
            return None;
        }
    }
    Some(result)
}

/// Coordinate frame attached to a stroke end
///
/// Local `x` grows from the end point back along the line, local `y` grows to the
/// left of the outward direction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EndFrame {
    pub point: Point,
    /// Unit direction pointing away from the line
    pub dir: Point,
}

impl EndFrame {
    pub fn new(point: Point, dir: Point) -> Self {
        Self { point, dir }
    }

    pub fn map(&self, local: Point) -> Point {
        self.point - local.x() * self.dir + local.y() * self.dir.normal()
    }
}

/// How the line body ends
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EndCut {
    /// Distance from the end point to the body corners
    pub cut: Scalar,
    /// Points between the left and the right corner in the local end frame
    pub outline: Vec<Point>,
}

impl EndCut {
    fn flat(cut: Scalar) -> Self {
        Self {
            cut,
            outline: Vec::new(),
        }
    }
}

/// Glyph in the local end frame
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Glyph {
    /// Filled with the stroke color
    Fill(Vec<Point>),
    /// Closed ring drawn with the stroke, inside filled with the inner color
    Contour {
        ring: Vec<Point>,
        inner: Vec<Point>,
    },
    /// Open polyline drawn with the stroke
    Mark(Vec<Point>),
}
