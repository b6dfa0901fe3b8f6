//! Conversion of stroked centerlines into fillable polygons
use crate::{
    ColorU8, Error, PI, Point, Quality, Scalar, StrokeEnd,
    dash::{DashLayout, Measured},
    end::{EndCut, EndFrame, Glyph},
    utils::arc_segments,
};
use std::{fmt, str::FromStr};

/// Default miter limit, in half widths of the stroke
pub const DEFAULT_MITER_LIMIT: Scalar = 4.0;

/// Tolerance used when comparing trimmed lengths
const TRIM_EPSILON: Scalar = 1e-9;

/// Joins within this distance from a complete reversal are beveled
const REVERSAL_EPSILON: Scalar = 1e-9;

/// Style of the joins and the plain caps
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum LineJoin {
    /// Round joins and round caps
    Round,
    /// Miter joins, beveled when the miter is longer than `limit` half widths
    Miter(Scalar),
}

impl Default for LineJoin {
    fn default() -> Self {
        Self::Miter(DEFAULT_MITER_LIMIT)
    }
}

impl fmt::Display for LineJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineJoin::Round => f.write_str("round"),
            LineJoin::Miter(limit) => write!(f, "miter:{}", limit),
        }
    }
}

impl FromStr for LineJoin {
    type Err = Error;

    /// Parses `round`, `miter` or `miter:<limit>`
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.split_once(':') {
            None if text == "round" => Ok(Self::Round),
            None if text == "miter" => Ok(Self::default()),
            Some(("miter", limit)) => limit
                .parse()
                .map(Self::Miter)
                .map_err(|_| Error::unknown_name("line join", text)),
            _ => Err(Error::unknown_name("line join", text)),
        }
    }
}

/// Dash pattern of the stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum DashType {
    #[default]
    Solid,
    Dashed,
    Dotted,
    DashDotted,
}

impl DashType {
    pub const ALL: [DashType; 4] = [Self::Solid, Self::Dashed, Self::Dotted, Self::DashDotted];

    pub fn name(self) -> &'static str {
        match self {
            DashType::Solid => "solid",
            DashType::Dashed => "dashed",
            DashType::Dotted => "dotted",
            DashType::DashDotted => "dash-dotted",
        }
    }
}

impl fmt::Display for DashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DashType {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|dash| dash.name() == name)
            .ok_or_else(|| Error::unknown_name("dash type", name))
    }
}

/// Stroke style
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Stroke {
    pub color: ColorU8,
    /// Width of the stroke in user space
    pub width: Scalar,
    pub join: LineJoin,
    pub dash: DashType,
    /// Scale of the dash length
    pub dash_length_factor: Scalar,
    /// Scale of the gap length
    pub gap_length_factor: Scalar,
}

impl Default for Stroke {
    fn default() -> Self {
        Self::new(ColorU8::BLACK, 1.0)
    }
}

impl Stroke {
    pub fn new(color: ColorU8, width: Scalar) -> Self {
        Self {
            color,
            width,
            join: LineJoin::default(),
            dash: DashType::Solid,
            dash_length_factor: 1.0,
            gap_length_factor: 1.0,
        }
    }

    /// Stroke with round joins and caps
    pub fn rounded(color: ColorU8, width: Scalar) -> Self {
        Self::new(color, width).with_join(LineJoin::Round)
    }

    pub fn dashed(color: ColorU8, width: Scalar) -> Self {
        Self::new(color, width).with_dash(DashType::Dashed)
    }

    pub fn dotted(color: ColorU8, width: Scalar) -> Self {
        Self::new(color, width).with_dash(DashType::Dotted)
    }

    pub fn dash_dotted(color: ColorU8, width: Scalar) -> Self {
        Self::new(color, width).with_dash(DashType::DashDotted)
    }

    pub fn with_color(self, color: ColorU8) -> Self {
        Self { color, ..self }
    }

    pub fn with_width(self, width: Scalar) -> Self {
        Self { width, ..self }
    }

    pub fn with_join(self, join: LineJoin) -> Self {
        Self { join, ..self }
    }

    pub fn with_dash(self, dash: DashType) -> Self {
        Self { dash, ..self }
    }

    pub fn with_dash_factors(self, dash_length_factor: Scalar, gap_length_factor: Scalar) -> Self {
        Self {
            dash_length_factor,
            gap_length_factor,
            ..self
        }
    }

    pub fn is_rounded(&self) -> bool {
        matches!(self.join, LineJoin::Round)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Polygon produced by the stroke builder, ready to be filled with `color`
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeShape {
    pub points: Vec<Point>,
    pub color: ColorU8,
}

/// Treatment of a single interior vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Corner {
    /// Outer side beveled, inner side meets at the offset intersection
    InnerMiter,
    /// Both sides beveled, used when an adjoining edge is too short to trim
    Bevel,
    /// Both sides meet at the offset intersections
    OuterMiter,
    /// Outer side is an arc, inner side meets at the offset intersection
    Round,
}

#[derive(Debug, Clone, Copy)]
struct StrokeVertex {
    point: Point,
    /// Unit tangent of the incoming edge
    dir_in: Point,
    /// Unit tangent of the outgoing edge
    dir_out: Point,
    /// Positive when the line turns clockwise (to the right in y-down space)
    turn: Scalar,
    /// Offset from the point to the intersection of the left offset lines
    miter: Point,
    /// Length consumed by the inner side from both adjoining edges
    trim: Scalar,
    corner: Corner,
}

/// Stroke parameters after the sub-pixel adjustment
#[derive(Debug, Clone, Copy)]
struct Style {
    width: Scalar,
    color: ColorU8,
    join: LineJoin,
}

impl Style {
    fn half_width(&self) -> Scalar {
        self.width / 2.0
    }

    fn fade(self, factor: Scalar) -> Self {
        Self {
            color: self.color.fade(factor),
            ..self
        }
    }
}

/// Builds polygons of stroked polylines and polygons
///
/// All input and output coordinates are in user space, `scale` (user space
/// to device pixels) is only used to pick the tessellation density, the
/// sub-pixel width threshold and the shortest visible dash.
#[derive(Debug, Clone, Copy)]
pub struct StrokeBuilder {
    quality: Quality,
    scale: Scalar,
}

impl StrokeBuilder {
    pub fn new(scale: Scalar, quality: Quality) -> Self {
        Self {
            quality,
            scale: scale.abs(),
        }
    }

    pub fn scale(&self) -> Scalar {
        self.scale
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Stroke open polyline with the given end decorations
    ///
    /// Shapes are returned in paint order: line body (or dashes) followed by the
    /// end glyphs.
    pub fn stroke_polyline(
        &self,
        points: &[Point],
        stroke: &Stroke,
        start: &StrokeEnd,
        end: &StrokeEnd,
    ) -> Vec<StrokeShape> {
        let _span = tracing::debug_span!("[stroke]", points = points.len()).entered();
        let mut shapes = Vec::new();
        let Some(style) = self.style(stroke) else {
            return shapes;
        };
        let line = dedup(points, false);
        if line.len() < 2 {
            tracing::trace!("[stroke:rejected] zero length polyline");
            return shapes;
        }
        let measured = Measured::new(&line);
        match DashLayout::new(measured.length(), stroke, style.width, self.scale) {
            DashLayout::Solid => self.solid_open(&line, style, start, end, &mut shapes),
            DashLayout::Faded(duty) => {
                tracing::trace!("[stroke:dash] sub-pixel dashes faded by {:.3}", duty);
                self.solid_open(&line, style.fade(duty), start, end, &mut shapes)
            }
            DashLayout::Dashes(dashes) => {
                self.dashed_open(&measured, dashes, style, start, end, &mut shapes)
            }
        }
        shapes
    }

    /// Stroke closed polygon
    ///
    /// Solid strokes produce a single ring polygon, dashed ones are dashed along
    /// the whole loop as an open line with plain caps.
    pub fn stroke_polygon(&self, points: &[Point], stroke: &Stroke) -> Vec<StrokeShape> {
        let _span = tracing::debug_span!("[stroke:closed]", points = points.len()).entered();
        let mut shapes = Vec::new();
        let Some(style) = self.style(stroke) else {
            return shapes;
        };
        let ring = dedup(points, true);
        if ring.len() < 2 {
            tracing::trace!("[stroke:rejected] zero length polygon");
            return shapes;
        }
        let mut line = ring.clone();
        line.push(ring[0]);
        let measured = Measured::new(&line);
        let plain = StrokeEnd::plain(style.join);
        match DashLayout::new(measured.length(), stroke, style.width, self.scale) {
            DashLayout::Solid => self.solid_closed(&ring, style, &mut shapes),
            DashLayout::Faded(duty) => self.solid_closed(&ring, style.fade(duty), &mut shapes),
            DashLayout::Dashes(dashes) => {
                self.dashed_open(&measured, dashes, style, &plain, &plain, &mut shapes)
            }
        }
        shapes
    }

    fn style(&self, stroke: &Stroke) -> Option<Style> {
        if !(stroke.width > 0.0 && stroke.width.is_finite()) || stroke.color.alpha() == 0 {
            return None;
        }
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return None;
        }
        let device_width = stroke.width * self.scale;
        let style = Style {
            width: stroke.width,
            color: stroke.color,
            join: stroke.join,
        };
        if device_width < 1.0 {
            // thinner than a pixel: one pixel wide and proportionally transparent
            Some(Style {
                width: 1.0 / self.scale,
                ..style.fade(device_width)
            })
        } else {
            Some(style)
        }
    }

    fn dashed_open(
        &self,
        measured: &Measured<'_>,
        dashes: Vec<(Scalar, Scalar)>,
        style: Style,
        start: &StrokeEnd,
        end: &StrokeEnd,
        shapes: &mut Vec<StrokeShape>,
    ) {
        let plain = StrokeEnd::plain(style.join);
        let rounded = matches!(style.join, LineJoin::Round);
        let hw = style.half_width();
        let last = dashes.len().saturating_sub(1);
        for (index, (mut from, mut to)) in dashes.into_iter().enumerate() {
            let dash_start = if index == 0 { start } else { &plain };
            let dash_end = if index == last { end } else { &plain };
            if dash_start.is_decorated() {
                from = 0.0;
            } else if rounded {
                from += hw;
            }
            if dash_end.is_decorated() {
                to = measured.length();
            } else if rounded {
                to -= hw;
            }
            if rounded && to - from <= TRIM_EPSILON {
                // round caps alone cover the visible part
                let center = measured.at((from + to) / 2.0);
                shapes.push(StrokeShape {
                    points: self.circle(center, hw),
                    color: style.color,
                });
                continue;
            }
            let line = dedup(&measured.slice(from, to), false);
            if line.len() >= 2 {
                self.solid_open(&line, style, dash_start, dash_end, shapes);
            }
        }
    }

    /// Stroke polyline without consecutive duplicates
    fn solid_open(
        &self,
        line: &[Point],
        style: Style,
        start: &StrokeEnd,
        end: &StrokeEnd,
        shapes: &mut Vec<StrokeShape>,
    ) {
        let (Some(first_dir), Some(last_dir)) = (
            (line[1] - line[0]).normalize(),
            (line[line.len() - 1] - line[line.len() - 2]).normalize(),
        ) else {
            return;
        };
        let start_frame = EndFrame::new(line[0], -first_dir);
        let end_frame = EndFrame::new(line[line.len() - 1], last_dir);
        let start_metrics = start.metrics(style.width, style.join, self.quality, self.scale);
        let end_metrics = end.metrics(style.width, style.join, self.quality, self.scale);

        let start_cut = start.cut(&start_metrics);
        let end_cut = end.cut(&end_metrics);
        let body = self.open_body(line, style, start_frame, &start_cut, end_frame, &end_cut);
        if let Some(points) = body {
            shapes.push(StrokeShape {
                points,
                color: style.color,
            });
        }

        for (decoration, frame, metrics) in [
            (start, start_frame, start_metrics),
            (end, end_frame, end_metrics),
        ] {
            let Some(glyph) = decoration.glyph(&metrics) else {
                continue;
            };
            let map = |points: Vec<Point>| -> Vec<Point> {
                points.into_iter().map(|point| frame.map(point)).collect()
            };
            match glyph {
                Glyph::Fill(outline) => shapes.push(StrokeShape {
                    points: map(outline),
                    color: style.color,
                }),
                Glyph::Contour { ring, inner } => {
                    self.solid_closed(&map(ring), style, shapes);
                    shapes.push(StrokeShape {
                        points: map(inner),
                        color: decoration.inner_color,
                    });
                }
                Glyph::Mark(mark) => {
                    let mark = dedup(&map(mark), false);
                    if mark.len() >= 2 {
                        let plain = StrokeEnd::plain(style.join);
                        self.solid_open(&mark, style, &plain, &plain, shapes);
                    }
                }
            }
        }
    }

    /// Outline of the open line body
    ///
    /// Left silhouette forward, end shape, right silhouette backward, start shape.
    fn open_body(
        &self,
        line: &[Point],
        style: Style,
        start_frame: EndFrame,
        start_cut: &EndCut,
        end_frame: EndFrame,
        end_cut: &EndCut,
    ) -> Option<Vec<Point>> {
        let mut body = line.to_vec();
        let mut start_outline = start_cut.outline.as_slice();
        let mut end_outline = end_cut.outline.as_slice();
        if body.len() == 2 {
            if start_cut.cut + end_cut.cut >= body[0].dist(body[1]) {
                return None;
            }
            body[0] = start_frame.map(Point::new(start_cut.cut, 0.0));
            body[1] = end_frame.map(Point::new(end_cut.cut, 0.0));
        } else {
            // cuts never go past the first or the last edge, the edge is dropped instead
            if start_cut.cut >= body[0].dist(body[1]) {
                body.remove(0);
                start_outline = &[];
            } else {
                body[0] = start_frame.map(Point::new(start_cut.cut, 0.0));
            }
            let count = body.len();
            if end_cut.cut >= body[count - 2].dist(body[count - 1]) {
                body.pop();
                end_outline = &[];
            } else {
                body[count - 1] = end_frame.map(Point::new(end_cut.cut, 0.0));
            }
        }
        let body = dedup(&body, false);
        if body.len() < 2 {
            return None;
        }

        let hw = style.half_width();
        let (dirs, lengths) = edges(&body, false)?;
        let mut left = Vec::with_capacity(body.len() * 2 + 2);
        let mut right = Vec::with_capacity(body.len() * 2 + 2);
        let offset = hw * dirs[0].normal();
        left.push(body[0] + offset);
        right.push(body[0] - offset);
        let mut remaining = lengths[0];
        for index in 1..body.len() - 1 {
            let vertex = self.vertex(
                body[index],
                dirs[index - 1],
                dirs[index],
                remaining,
                lengths[index],
                style,
            );
            self.corner(&vertex, style, &mut left, &mut right);
            remaining = lengths[index] - vertex.trim;
        }
        let last = body[body.len() - 1];
        let offset = hw * dirs[dirs.len() - 1].normal();
        left.push(last + offset);
        right.push(last - offset);

        let mut polygon = left;
        polygon.extend(end_outline.iter().map(|point| end_frame.map(*point)));
        polygon.extend(right.into_iter().rev());
        polygon.extend(start_outline.iter().map(|point| start_frame.map(*point)));
        Some(polygon)
    }

    /// Stroke closed ring, outer loop followed by the reversed inner loop
    fn solid_closed(&self, ring: &[Point], style: Style, shapes: &mut Vec<StrokeShape>) {
        let ring = dedup(ring, true);
        let count = ring.len();
        if count < 2 {
            return;
        }
        let Some((dirs, lengths)) = edges(&ring, true) else {
            return;
        };
        let mut left = Vec::with_capacity(count * 2);
        let mut right = Vec::with_capacity(count * 2);
        let mut remaining = lengths[count - 1];
        let mut first_trim = 0.0;
        for index in 0..count {
            // closing edge is already trimmed by the first vertex
            let available = if index == count - 1 {
                lengths[index] - first_trim
            } else {
                lengths[index]
            };
            let vertex = self.vertex(
                ring[index],
                dirs[(index + count - 1) % count],
                dirs[index],
                remaining,
                available,
                style,
            );
            if index == 0 {
                first_trim = vertex.trim;
            }
            self.corner(&vertex, style, &mut left, &mut right);
            remaining = lengths[index] - vertex.trim;
        }

        let (left_first, right_first) = (left[0], right[0]);
        let mut polygon = left;
        polygon.push(left_first);
        polygon.push(right_first);
        polygon.extend(right.into_iter().skip(1).rev());
        polygon.push(right_first);
        shapes.push(StrokeShape {
            points: polygon,
            color: style.color,
        });
    }

    /// Classify interior vertex
    fn vertex(
        &self,
        point: Point,
        dir_in: Point,
        dir_out: Point,
        remaining: Scalar,
        length_out: Scalar,
        style: Style,
    ) -> StrokeVertex {
        let hw = style.half_width();
        let dot = dir_in.dot(dir_out);
        let turn = dir_in.cross(dir_out);
        let mut vertex = StrokeVertex {
            point,
            dir_in,
            dir_out,
            turn,
            miter: Point::new(0.0, 0.0),
            trim: 0.0,
            corner: Corner::Bevel,
        };
        if 1.0 + dot < REVERSAL_EPSILON {
            return vertex;
        }
        // |miter| = hw / cos(turn / 2), its projection on the edge is hw * tan(turn / 2)
        let miter = (hw / (1.0 + dot)) * (dir_in.normal() + dir_out.normal());
        let trim = miter.dot(dir_in).abs();
        vertex.miter = miter;
        if trim > remaining + TRIM_EPSILON || trim > length_out + TRIM_EPSILON {
            return vertex;
        }
        vertex.trim = trim;
        vertex.corner = match style.join {
            LineJoin::Round if turn.abs() > REVERSAL_EPSILON => Corner::Round,
            LineJoin::Round => Corner::OuterMiter,
            LineJoin::Miter(limit) if miter.length() <= limit * hw + TRIM_EPSILON => {
                Corner::OuterMiter
            }
            LineJoin::Miter(_) => Corner::InnerMiter,
        };
        vertex
    }

    /// Append silhouette points of the vertex to both sides, in forward order
    fn corner(
        &self,
        vertex: &StrokeVertex,
        style: Style,
        left: &mut Vec<Point>,
        right: &mut Vec<Point>,
    ) {
        let hw = style.half_width();
        let point = vertex.point;
        // turning right makes the left side the outer one
        let (outer, inner, sign) = if vertex.turn >= 0.0 {
            (left, right, 1.0)
        } else {
            (right, left, -1.0)
        };
        let normal_in = (sign * hw) * vertex.dir_in.normal();
        let normal_out = (sign * hw) * vertex.dir_out.normal();
        let miter = sign * vertex.miter;
        match vertex.corner {
            Corner::OuterMiter => {
                outer.push(point + miter);
                inner.push(point - miter);
            }
            Corner::InnerMiter => {
                outer.push(point + normal_in);
                outer.push(point + normal_out);
                inner.push(point - miter);
            }
            Corner::Round => {
                let sweep = normal_in.cross(normal_out).atan2(normal_in.dot(normal_out));
                let start = normal_in.y().atan2(normal_in.x());
                let count = arc_segments(
                    self.quality.circle_quality,
                    2.0 * hw * self.scale,
                    sweep.abs() / (2.0 * PI),
                    1,
                    256,
                );
                outer.push(point + normal_in);
                for index in 1..count {
                    let angle = start + sweep * index as Scalar / count as Scalar;
                    outer.push(point + hw * Point::new(angle.cos(), angle.sin()));
                }
                outer.push(point + normal_out);
                inner.push(point - miter);
            }
            Corner::Bevel => {
                outer.push(point + normal_in);
                outer.push(point + normal_out);
                // inner side goes through the centerline to avoid inverted loops
                inner.push(point - normal_in);
                inner.push(point);
                inner.push(point - normal_out);
            }
        }
    }

    /// Polygon approximating a circle
    fn circle(&self, center: Point, radius: Scalar) -> Vec<Point> {
        let count = arc_segments(
            self.quality.circle_quality,
            2.0 * radius * self.scale,
            1.0,
            3,
            256,
        );
        (0..count)
            .map(|index| {
                let angle = 2.0 * PI * index as Scalar / count as Scalar;
                center + radius * Point::new(angle.cos(), angle.sin())
            })
            .collect()
    }
}

/// Remove consecutive duplicates, and the closing duplicate for closed rings
fn dedup(points: &[Point], closed: bool) -> Vec<Point> {
    let mut result: Vec<Point> = Vec::with_capacity(points.len());
    for point in points {
        if !point.x().is_finite() || !point.y().is_finite() {
            return Vec::new();
        }
        match result.last() {
            Some(last) if last.is_close_to(*point) => continue,
            _ => result.push(*point),
        }
    }
    if closed {
        while result.len() > 1 && result[0].is_close_to(result[result.len() - 1]) {
            result.pop();
        }
    }
    result
}

/// Unit directions and lengths of the edges
fn edges(points: &[Point], closed: bool) -> Option<(Vec<Point>, Vec<Scalar>)> {
    let count = if closed {
        points.len()
    } else {
        points.len() - 1
    };
    let mut dirs = Vec::with_capacity(count);
    let mut lengths = Vec::with_capacity(count);
    for index in 0..count {
        let edge = points[(index + 1) % points.len()] - points[index];
        dirs.push(edge.normalize()?);
        lengths.push(edge.length());
    }
    Some((dirs, lengths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BBox, PolygonRasterizer, SpanRecorder, StrokeEndKind, assert_approx_eq, image::Mask,
    };

    fn builder() -> StrokeBuilder {
        StrokeBuilder::new(1.0, Quality::default())
    }

    fn render(shapes: &[StrokeShape], width: usize, height: usize) -> Mask {
        let mut mask = Mask::new(width, height);
        let mut rasterizer = PolygonRasterizer::new();
        for shape in shapes {
            rasterizer.fill(
                &shape.points,
                mask.shape().bbox(),
                shape.color.alpha(),
                &mut mask,
            );
        }
        mask
    }

    fn area(points: &[Point]) -> Scalar {
        let count = points.len();
        let sum: Scalar = (0..count)
            .map(|index| points[index].cross(points[(index + 1) % count]))
            .sum();
        sum.abs() / 2.0
    }

    #[test]
    fn test_butt_line_is_rect() {
        let shapes = builder().stroke_polyline(
            &[Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            &Stroke::new(ColorU8::BLACK, 2.0),
            &StrokeEnd::BUTT,
            &StrokeEnd::BUTT,
        );
        assert_eq!(shapes.len(), 1);
        assert_eq!(
            shapes[0].points,
            vec![
                Point::new(0.0, -1.0),
                Point::new(10.0, -1.0),
                Point::new(10.0, 1.0),
                Point::new(0.0, 1.0),
            ]
        );
        assert_eq!(shapes[0].color, ColorU8::BLACK);
    }

    #[test]
    fn test_square_cap() {
        let shapes = builder().stroke_polyline(
            &[Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            &Stroke::new(ColorU8::BLACK, 2.0),
            &StrokeEnd::CAP,
            &StrokeEnd::CAP,
        );
        assert_eq!(shapes.len(), 1);
        let bbox = BBox::from_points(&shapes[0].points).unwrap();
        assert_eq!(bbox, BBox::new((-1.0, -1.0), (11.0, 1.0)));
        assert_approx_eq!(area(&shapes[0].points), 24.0);
    }

    #[test]
    fn test_round_cap() {
        let shapes = builder().stroke_polyline(
            &[Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            &Stroke::rounded(ColorU8::BLACK, 4.0),
            &StrokeEnd::CAP,
            &StrokeEnd::CAP,
        );
        assert_eq!(shapes.len(), 1);
        let points = &shapes[0].points;
        let bbox = BBox::from_points(points).unwrap();
        // arc vertices lie on the circle, the extreme one may be missing
        assert!(bbox.x() < -1.5 && bbox.x() >= -2.0 - 1e-9);
        assert!(bbox.max().x() > 11.5 && bbox.max().x() <= 12.0 + 1e-9);
        // rectangle plus a polygon inscribed into the circle
        let full = 40.0 + PI * 4.0;
        assert!(area(points) < full && area(points) > full * 0.9);
    }

    #[test]
    fn test_miter_join() {
        let stroke = Stroke::new(ColorU8::BLACK, 2.0);
        let points = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        let (butt, stroker) = (&StrokeEnd::BUTT, builder());
        let shapes = stroker.stroke_polyline(&points, &stroke, butt, butt);
        assert_eq!(shapes.len(), 1);
        assert_eq!(
            shapes[0].points,
            vec![
                Point::new(0.0, -1.0),
                Point::new(11.0, -1.0),
                Point::new(11.0, 10.0),
                Point::new(9.0, 10.0),
                Point::new(9.0, 1.0),
                Point::new(0.0, 1.0),
            ]
        );

        // miter limit exceeded: outer side is beveled
        let stroke = stroke.with_join(LineJoin::Miter(1.0));
        let (butt, stroker) = (&StrokeEnd::BUTT, builder());
        let shapes = stroker.stroke_polyline(&points, &stroke, butt, butt);
        assert_eq!(
            shapes[0].points,
            vec![
                Point::new(0.0, -1.0),
                Point::new(10.0, -1.0),
                Point::new(11.0, 0.0),
                Point::new(11.0, 10.0),
                Point::new(9.0, 10.0),
                Point::new(9.0, 1.0),
                Point::new(0.0, 1.0),
            ]
        );
    }

    #[test]
    fn test_round_join() {
        let stroke = Stroke::rounded(ColorU8::BLACK, 4.0);
        let points = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        let (butt, stroker) = (&StrokeEnd::BUTT, builder());
        let shapes = stroker.stroke_polyline(&points, &stroke, butt, butt);
        assert_eq!(shapes.len(), 1);
        let arc: Vec<_> = shapes[0]
            .points
            .iter()
            .filter(|point| point.x() > 10.0 && point.y() < 0.0)
            .collect();
        assert!(!arc.is_empty());
        for point in arc {
            assert_approx_eq!(point.dist(Point::new(10.0, 0.0)), 2.0);
        }
    }

    #[test]
    fn test_starved_join() {
        // middle edge is shorter than the inner miter trim
        let points = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 0.5),
            Point::new(0.0, 0.5),
        ];
        let shapes = builder().stroke_polyline(
            &points,
            &Stroke::new(ColorU8::BLACK, 4.0),
            &StrokeEnd::BUTT,
            &StrokeEnd::BUTT,
        );
        assert_eq!(shapes.len(), 1);
        // inner side passes through the centerline vertices
        assert!(shapes[0].points.contains(&Point::new(10.0, 0.0)));
        assert!(shapes[0].points.contains(&Point::new(10.0, 0.5)));
    }

    #[test]
    fn test_closed_ring() {
        let square = [
            Point::new(2.0, 2.0),
            Point::new(12.0, 2.0),
            Point::new(12.0, 12.0),
            Point::new(2.0, 12.0),
        ];
        let shapes = builder().stroke_polygon(&square, &Stroke::new(ColorU8::BLACK, 2.0));
        assert_eq!(shapes.len(), 1);
        let points = &shapes[0].points;
        let outer = BBox::new((1.0, 1.0), (13.0, 13.0));
        let inner = BBox::new((3.0, 3.0), (11.0, 11.0));
        for point in points {
            assert!(outer.contains(*point));
            let on_outer = (point.x() - 1.0).abs() < 1e-9
                || (point.x() - 13.0).abs() < 1e-9
                || (point.y() - 1.0).abs() < 1e-9
                || (point.y() - 13.0).abs() < 1e-9;
            let on_inner = inner.contains(*point);
            assert!(on_outer || on_inner, "{:?}", point);
        }
        let mask = render(&shapes, 16, 16);
        // ring area 12 * 12 - 8 * 8
        assert_eq!(mask.coverage(), 80 * 255);
        assert_eq!(mask.get(7, 7), Some(0));
        assert_eq!(mask.get(1, 7), Some(255));
    }

    #[test]
    fn test_closed_ring_round() {
        let triangle = [
            Point::new(10.0, 2.0),
            Point::new(18.0, 16.0),
            Point::new(2.0, 16.0),
        ];
        let shapes = builder().stroke_polygon(&triangle, &Stroke::rounded(ColorU8::BLACK, 2.0));
        assert_eq!(shapes.len(), 1);
        let mask = render(&shapes, 20, 20);
        // inside of the triangle stays empty
        assert_eq!(mask.get(12, 10), Some(0));
        assert_eq!(mask.get(16, 10), Some(255));
    }

    #[test]
    fn test_thin_stroke() {
        let builder = StrokeBuilder::new(1.0, Quality::default());
        let stroke = Stroke::new(ColorU8::new(0, 0, 0, 200), 0.25);
        let shapes = builder.stroke_polyline(
            &[Point::new(0.5, 2.0), Point::new(8.5, 2.0)],
            &stroke,
            &StrokeEnd::BUTT,
            &StrokeEnd::BUTT,
        );
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].color.alpha(), 50);
        let mut recorder = SpanRecorder::new();
        PolygonRasterizer::new().fill(
            &shapes[0].points,
            BBox::new((0.0, 0.0), (10.0, 10.0)),
            shapes[0].color.alpha(),
            &mut recorder,
        );
        assert!(!recorder.is_empty());
    }

    #[test]
    fn test_degenerate() {
        let builder = builder();
        let stroke = Stroke::new(ColorU8::BLACK, 2.0);
        let point = Point::new(1.0, 1.0);
        let (butt, cap) = (&StrokeEnd::BUTT, &StrokeEnd::CAP);
        assert!(builder.stroke_polyline(&[point, point], &stroke, cap, cap).is_empty());
        assert!(builder.stroke_polyline(&[point], &stroke, butt, butt).is_empty());
        assert!(builder.stroke_polyline(&[], &stroke, butt, butt).is_empty());
        let line = [point, Point::new(5.0, 1.0)];
        assert!(builder
            .stroke_polyline(&line, &stroke.with_width(0.0), butt, butt)
            .is_empty());
        assert!(builder
            .stroke_polyline(&line, &stroke.with_color(ColorU8::TRANSPARENT), butt, butt)
            .is_empty());
        let nan = [point, Point::new(Scalar::NAN, 1.0)];
        assert!(builder.stroke_polyline(&nan, &stroke, butt, butt).is_empty());
    }

    #[test]
    fn test_arrow_end() {
        let stroke = Stroke::new(ColorU8::BLACK, 2.0);
        let arrow = StrokeEnd::new(StrokeEndKind::Arrow);
        let shapes = builder().stroke_polyline(
            &[Point::new(0.0, 10.0), Point::new(40.0, 10.0)],
            &stroke,
            &StrokeEnd::BUTT,
            &arrow,
        );
        assert_eq!(shapes.len(), 2);
        let body = BBox::from_points(&shapes[0].points).unwrap();
        assert_approx_eq!(body.x(), 0.0);
        // body reaches the arrow notch, tip of the arrow is at the end point
        assert_approx_eq!(body.max().x(), 40.0 - 5.6);
        let glyph = BBox::from_points(&shapes[1].points).unwrap();
        assert_approx_eq!(glyph.max().x(), 40.0);
        assert_approx_eq!(glyph.x(), 32.0);
        assert_approx_eq!(glyph.height(), 7.0);
        let mask = render(&shapes, 48, 20);
        for col in 0..33 {
            assert_eq!(mask.get(10, col), Some(255), "col: {}", col);
        }
        // no gap between the body and the arrow
        for col in 33..37 {
            assert!(mask.get(10, col) > Some(150), "col: {}", col);
        }
    }

    #[test]
    fn test_contour_end() {
        let stroke = Stroke::new(ColorU8::BLACK, 2.0);
        let end = StrokeEnd::new(StrokeEndKind::ContourSquare).with_inner_color(ColorU8::WHITE);
        let shapes = builder().stroke_polyline(
            &[Point::new(0.0, 10.0), Point::new(40.0, 10.0)],
            &stroke,
            &StrokeEnd::BUTT,
            &end,
        );
        // body, outline ring, inner fill
        assert_eq!(shapes.len(), 3);
        assert_eq!(shapes[1].color, ColorU8::BLACK);
        assert_eq!(shapes[2].color, ColorU8::WHITE);
        // ring outer edge is the 6x6 square ending at the end point
        let ring = BBox::from_points(&shapes[1].points).unwrap();
        assert_approx_eq!(ring.x(), 34.0);
        assert_approx_eq!(ring.max().x(), 40.0);
        assert_approx_eq!(ring.height(), 6.0);
        let inner = BBox::from_points(&shapes[2].points).unwrap();
        assert_approx_eq!(inner.x(), 36.0);
        assert_approx_eq!(inner.y(), 9.0);
        assert_approx_eq!(inner.max().x(), 38.0);
        assert_approx_eq!(inner.max().y(), 11.0);
        // body stops at the back edge of the square
        let body = BBox::from_points(&shapes[0].points).unwrap();
        assert_approx_eq!(body.max().x(), 34.0);
    }

    #[test]
    fn test_contour_ends_inside_glyph() {
        // translucent stroke: any overlap shows up as a value above the alpha
        let stroke = Stroke::new(ColorU8::new(0, 0, 0, 128), 4.0);
        let inner = ColorU8::new(255, 255, 255, 128);
        for kind in StrokeEndKind::ALL.into_iter().filter(|kind| kind.is_contour()) {
            let end = StrokeEnd::new(kind).with_inner_color(inner);
            let shapes = builder().stroke_polyline(
                &[Point::new(10.0, 20.0), Point::new(60.0, 20.0)],
                &stroke,
                &StrokeEnd::BUTT,
                &end,
            );
            let mask = render(&shapes, 80, 40);
            let mut rightmost = 0;
            for row in 0..40 {
                for col in 0..80 {
                    let value = mask.get(row, col).unwrap_or(0);
                    assert!(value <= 140, "{}: ({}, {}) = {}", kind, row, col, value);
                    if value > 0 {
                        rightmost = rightmost.max(col);
                    }
                }
            }
            assert_eq!(rightmost, 59, "{}", kind);
            // body meets the glyph without a gap
            for col in 10..60 {
                assert!(mask.get(20, col) > Some(100), "{}: col {}", kind, col);
            }
        }
    }

    #[test]
    fn test_retracted_body() {
        // edge shorter than the glyph: only the glyph is drawn
        let shapes = builder().stroke_polyline(
            &[Point::new(0.0, 0.0), Point::new(3.0, 0.0)],
            &Stroke::new(ColorU8::BLACK, 2.0),
            &StrokeEnd::BUTT,
            &StrokeEnd::new(StrokeEndKind::Triangle),
        );
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].points.len(), 3);
    }

    #[test]
    fn test_marks() {
        let stroke = Stroke::new(ColorU8::BLACK, 1.0);
        for kind in [
            StrokeEndKind::LineArrow,
            StrokeEndKind::HalfSquare,
            StrokeEndKind::HalfCircle,
            StrokeEndKind::HalfDiamond,
            StrokeEndKind::Stroke,
        ] {
            let shapes = builder().stroke_polyline(
                &[Point::new(0.0, 10.0), Point::new(20.0, 10.0)],
                &stroke,
                &StrokeEnd::new(kind),
                &StrokeEnd::BUTT,
            );
            assert_eq!(shapes.len(), 2, "{}", kind);
            let mark = BBox::from_points(&shapes[1].points).unwrap();
            assert!(mark.height() >= 3.0, "{}", kind);
        }
    }

    #[test]
    fn test_dashed() {
        let stroke = Stroke::dashed(ColorU8::BLACK, 2.5).with_dash_factors(1.0, 2.0);
        let shapes = builder().stroke_polyline(
            &[Point::new(0.0, 5.0), Point::new(100.0, 5.0)],
            &stroke,
            &StrokeEnd::BUTT,
            &StrokeEnd::BUTT,
        );
        assert_eq!(shapes.len(), 5);
        for (index, shape) in shapes.iter().enumerate() {
            let bbox = BBox::from_points(&shape.points).unwrap();
            assert_approx_eq!(bbox.x(), 5.0 + 20.0 * index as Scalar);
            assert_approx_eq!(bbox.width(), 10.0);
        }
    }

    #[test]
    fn test_dashed_decorated() {
        let stroke = Stroke::dashed(ColorU8::BLACK, 2.5).with_dash_factors(1.0, 2.0);
        let arrow = StrokeEnd::new(StrokeEndKind::Arrow);
        let shapes = builder().stroke_polyline(
            &[Point::new(0.0, 5.0), Point::new(100.0, 5.0)],
            &stroke,
            &StrokeEnd::BUTT,
            &arrow,
        );
        // five dashes and the arrow at the end
        assert_eq!(shapes.len(), 6);
        let glyph = BBox::from_points(&shapes[5].points).unwrap();
        assert_approx_eq!(glyph.max().x(), 100.0);
        let first = BBox::from_points(&shapes[0].points).unwrap();
        assert_approx_eq!(first.x(), 5.0);
    }

    #[test]
    fn test_dotted_rounded() {
        let stroke = Stroke::dotted(ColorU8::BLACK, 2.0).with_join(LineJoin::Round);
        let shapes = builder().stroke_polyline(
            &[Point::new(0.0, 5.0), Point::new(60.0, 5.0)],
            &stroke,
            &StrokeEnd::CAP,
            &StrokeEnd::CAP,
        );
        // unit is 1 + 2 widths = 6, ten dots
        assert_eq!(shapes.len(), 10);
        for shape in shapes.iter() {
            let bbox = BBox::from_points(&shape.points).unwrap();
            assert!(bbox.width() <= 2.0 + 1e-9);
        }
    }

    #[test]
    fn test_sub_pixel_dashes() {
        // dashes of 0.4 pixels are replaced with a faded line
        let stroke = Stroke::dashed(ColorU8::BLACK, 1.0).with_dash_factors(0.1, 1.0);
        let shapes = builder().stroke_polyline(
            &[Point::new(0.0, 5.0), Point::new(100.0, 5.0)],
            &stroke,
            &StrokeEnd::BUTT,
            &StrokeEnd::BUTT,
        );
        assert_eq!(shapes.len(), 1);
        assert!(shapes[0].color.alpha() < 255);
    }

    #[test]
    fn test_dashed_polygon() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(30.0, 0.0),
            Point::new(30.0, 30.0),
            Point::new(0.0, 30.0),
        ];
        let shapes = builder().stroke_polygon(&square, &Stroke::dashed(ColorU8::BLACK, 1.0));
        // perimeter 120, unit 6
        assert_eq!(shapes.len(), 20);
    }

    #[test]
    fn test_parse() -> Result<(), Error> {
        assert_eq!("round".parse::<LineJoin>()?, LineJoin::Round);
        assert_eq!("miter".parse::<LineJoin>()?, LineJoin::Miter(4.0));
        assert_eq!("miter:2.5".parse::<LineJoin>()?, LineJoin::Miter(2.5));
        assert!("bevel".parse::<LineJoin>().is_err());
        assert!("miter:x".parse::<LineJoin>().is_err());
        for dash in DashType::ALL {
            assert_eq!(dash.to_string().parse::<DashType>()?, dash);
        }
        Ok(())
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() -> Result<(), Error> {
        let stroke = Stroke::dash_dotted(ColorU8::new(255, 0, 0, 128), 3.0);
        let json = stroke.to_json()?;
        assert_eq!(Stroke::from_json(&json)?, stroke);
        let stroke = Stroke::from_json(r##"{"width": 2.0, "join": "round", "color": "#ff0000"}"##)?;
        assert_eq!(stroke.width, 2.0);
        assert!(stroke.is_rounded());
        assert_eq!(stroke.dash, DashType::Solid);
        Ok(())
    }
}
