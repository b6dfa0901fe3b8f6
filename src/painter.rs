//! Painter: user space primitives decomposed into polygons and filled into a span sink
use crate::{
    BBox, ColorU8, LineJoin, PI, Point, PolygonRasterizer, Scalar, SpanSink, Stroke,
    StrokeBuilder, StrokeEnd, StrokeShape, Transform,
    curve::{DEFAULT_CURVE_QUALITY, flatten_chain},
    utils::arc_segments,
};

/// Default density of arcs, see [`Quality::circle_quality`]
pub const DEFAULT_CIRCLE_QUALITY: Scalar = 4.5;

/// Tessellation density
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Quality {
    /// Full circle of device radius `r` gets `circle_quality * sqrt(2 * r)` segments
    pub circle_quality: Scalar,
    /// Bezier curves get `curve_quality * sqrt(curvature)` segments
    pub curve_quality: Scalar,
}

impl Default for Quality {
    fn default() -> Self {
        Self {
            circle_quality: DEFAULT_CIRCLE_QUALITY,
            curve_quality: DEFAULT_CURVE_QUALITY,
        }
    }
}

impl Quality {
    #[cfg(feature = "serde")]
    pub fn from_json(text: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(text)?)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, crate::Error> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Paints primitives given in user space
///
/// User space is mapped to device space with an axis aligned [`Transform`], everything
/// outside of the device space `clip` is discarded. Each primitive is converted to one or
/// more polygons which are filled by the owned [`PolygonRasterizer`], its scan buffer is
/// reused across calls. Color alpha of a primitive becomes the opacity of its spans and
/// [`SpanSink::set_color`] is called before each polygon.
#[derive(Debug)]
pub struct Painter {
    transform: Transform,
    clip: BBox,
    quality: Quality,
    rasterizer: PolygonRasterizer,
    /// Device space points of the polygon being filled
    scratch: Vec<Point>,
}

impl Clone for Painter {
    fn clone(&self) -> Self {
        Self {
            transform: self.transform,
            clip: self.clip,
            quality: self.quality,
            rasterizer: PolygonRasterizer::new(),
            scratch: Vec::new(),
        }
    }
}

impl Painter {
    /// Painter with identity transform and the given device space clip
    pub fn new(clip: BBox) -> Self {
        Self {
            transform: Transform::default(),
            clip,
            quality: Quality::default(),
            rasterizer: PolygonRasterizer::new(),
            scratch: Vec::new(),
        }
    }

    pub fn with_transform(self, transform: Transform) -> Self {
        Self { transform, ..self }
    }

    pub fn with_quality(self, quality: Quality) -> Self {
        Self { quality, ..self }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// Clip rectangle in device space
    pub fn clip(&self) -> BBox {
        self.clip
    }

    pub fn set_clip(&mut self, clip: BBox) {
        self.clip = clip;
    }

    /// Painter with the same transform and clip restricted to `bbox` (device space)
    pub fn clipped(&self, bbox: BBox) -> Self {
        let empty = BBox::new(self.clip.min(), self.clip.min());
        Self {
            clip: self.clip.intersect(bbox).unwrap_or(empty),
            ..self.clone()
        }
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.quality = quality;
    }

    /// Clip rectangle mapped back to user space
    pub fn user_clip(&self) -> BBox {
        BBox::new(
            Point::new(
                self.transform.invert_x(self.clip.x()),
                self.transform.invert_y(self.clip.y()),
            ),
            Point::new(
                self.transform.invert_x(self.clip.max().x()),
                self.transform.invert_y(self.clip.max().y()),
            ),
        )
    }

    /// Stroke builder matching current transform and quality
    pub fn stroke_builder(&self) -> StrokeBuilder {
        StrokeBuilder::new(self.transform.mean_scale(), self.quality)
    }

    /// Round user space `x` to the nearest device pixel border
    pub fn round_x(&self, x: Scalar) -> Scalar {
        self.transform
            .invert_x((self.transform.apply_x(x) + 0.5).floor())
    }

    /// Round user space `y` to the nearest device pixel border
    pub fn round_y(&self, y: Scalar) -> Scalar {
        self.transform
            .invert_y((self.transform.apply_y(y) + 0.5).floor())
    }

    pub fn round_down_x(&self, x: Scalar) -> Scalar {
        self.transform.invert_x(self.transform.apply_x(x).floor())
    }

    pub fn round_down_y(&self, y: Scalar) -> Scalar {
        self.transform.invert_y(self.transform.apply_y(y).floor())
    }

    pub fn round_up_x(&self, x: Scalar) -> Scalar {
        self.transform.invert_x(self.transform.apply_x(x).ceil())
    }

    pub fn round_up_y(&self, y: Scalar) -> Scalar {
        self.transform.invert_y(self.transform.apply_y(y).ceil())
    }

    /// Whether the user space `bbox` can produce any spans
    fn is_visible(&self, bbox: BBox) -> bool {
        let visible = self.user_clip().overlaps(bbox);
        if !visible {
            tracing::trace!("[painter:rejected] {:?} is outside of the clip", bbox);
        }
        visible
    }

    /// Polygon in user space into the sink
    fn fill_user<S>(&mut self, points: &[Point], color: ColorU8, sink: &mut S)
    where
        S: SpanSink + ?Sized,
    {
        let transform = self.transform;
        self.scratch.clear();
        self.scratch
            .extend(points.iter().map(|point| transform.apply(*point)));
        sink.set_color(color);
        self.rasterizer
            .fill(&self.scratch, self.clip, color.alpha(), sink);
    }

    fn fill_shapes<S>(&mut self, shapes: Vec<StrokeShape>, sink: &mut S)
    where
        S: SpanSink + ?Sized,
    {
        for shape in shapes {
            if shape.color.alpha() != 0 {
                self.fill_user(&shape.points, shape.color, sink);
            }
        }
    }

    /// Largest distance from the centerline that a stroke can cover, in user space
    fn stroke_margin(&self, stroke: &Stroke, ends: &[&StrokeEnd]) -> Scalar {
        let scale = self.transform.mean_scale();
        let width = if scale > 0.0 {
            stroke.width.max(1.0 / scale)
        } else {
            stroke.width
        };
        let miter = match stroke.join {
            LineJoin::Miter(limit) => limit.max(1.0),
            LineJoin::Round => 1.0,
        };
        let reach = ends
            .iter()
            .map(|end| end.reach())
            .fold(0.0, Scalar::max);
        width * (0.5 * miter + reach)
    }

    // -------------------------------------------------------------------------
    // Fills
    // -------------------------------------------------------------------------

    /// Fill the whole clip rectangle
    pub fn clear<S>(&mut self, color: ColorU8, sink: &mut S)
    where
        S: SpanSink + ?Sized,
    {
        let clip = self.user_clip();
        self.fill_rect(clip.x(), clip.y(), clip.width(), clip.height(), color, sink)
    }

    /// Fill rectangle with the top-left corner at `(x, y)`
    pub fn fill_rect<S>(
        &mut self,
        x: Scalar,
        y: Scalar,
        w: Scalar,
        h: Scalar,
        color: ColorU8,
        sink: &mut S,
    ) where
        S: SpanSink + ?Sized,
    {
        if !(w > 0.0 && h > 0.0) {
            return;
        }
        self.fill_polygon(&rect_points(x, y, w, h), color, sink)
    }

    /// Fill implicitly closed polygon
    ///
    /// Coverage of self-overlapping parts is added up, see [`PolygonRasterizer::fill`].
    pub fn fill_polygon<S>(&mut self, points: &[Point], color: ColorU8, sink: &mut S)
    where
        S: SpanSink + ?Sized,
    {
        if color.alpha() == 0 || points.len() < 3 {
            return;
        }
        let Some(bbox) = BBox::from_points(points) else {
            return;
        };
        if !self.is_visible(bbox) {
            return;
        }
        self.fill_user(points, color, sink);
    }

    /// Fill ellipse inscribed into the rectangle
    pub fn fill_ellipse<S>(
        &mut self,
        x: Scalar,
        y: Scalar,
        w: Scalar,
        h: Scalar,
        color: ColorU8,
        sink: &mut S,
    ) where
        S: SpanSink + ?Sized,
    {
        if !(w > 0.0 && h > 0.0) || color.alpha() == 0 {
            return;
        }
        if !self.is_visible(BBox::new((x, y), (x + w, y + h))) {
            return;
        }
        let points = self.ellipse_points(x, y, w, h);
        self.fill_user(&points, color, sink);
    }

    /// Fill pie slice of the ellipse inscribed into the rectangle
    ///
    /// Angles are in degrees, zero points to the right and 90 points down. Negative
    /// range is swept from the other side, range of 360 or more fills the whole ellipse.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_ellipse_sector<S>(
        &mut self,
        x: Scalar,
        y: Scalar,
        w: Scalar,
        h: Scalar,
        start_angle: Scalar,
        range_angle: Scalar,
        color: ColorU8,
        sink: &mut S,
    ) where
        S: SpanSink + ?Sized,
    {
        if !(w > 0.0 && h > 0.0) || color.alpha() == 0 {
            return;
        }
        let Some((start, range)) = normalize_angles(start_angle, range_angle) else {
            return;
        };
        if range >= 2.0 * PI {
            return self.fill_ellipse(x, y, w, h, color, sink);
        }
        if !self.is_visible(BBox::new((x, y), (x + w, y + h))) {
            return;
        }
        let mut points = self.arc_points(x, y, w, h, start, range, 3);
        points.push(Point::new(x + w / 2.0, y + h / 2.0));
        self.fill_user(&points, color, sink);
    }

    /// Fill rectangle with elliptic corners of radii `rx` and `ry`
    ///
    /// Radii are clamped to the half of the size, non-positive radius fills plain rectangle.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_round_rect<S>(
        &mut self,
        x: Scalar,
        y: Scalar,
        w: Scalar,
        h: Scalar,
        rx: Scalar,
        ry: Scalar,
        color: ColorU8,
        sink: &mut S,
    ) where
        S: SpanSink + ?Sized,
    {
        if !(w > 0.0 && h > 0.0) || color.alpha() == 0 {
            return;
        }
        if !(rx > 0.0 && ry > 0.0) {
            return self.fill_rect(x, y, w, h, color, sink);
        }
        if !self.is_visible(BBox::new((x, y), (x + w, y + h))) {
            return;
        }
        let points = self.round_rect_points(x, y, w, h, rx, ry);
        self.fill_user(&points, color, sink);
    }

    /// Fill area enclosed by the closed chain of cubic bezier curves
    ///
    /// Chain consists of `3 * k` points, see [`flatten_chain`].
    pub fn fill_bezier<S>(&mut self, points: &[Point], color: ColorU8, sink: &mut S)
    where
        S: SpanSink + ?Sized,
    {
        if color.alpha() == 0 || points.len() < 3 {
            return;
        }
        // curves never leave the convex hull of their control points
        let Some(bbox) = BBox::from_points(points) else {
            return;
        };
        if !self.is_visible(bbox) {
            return;
        }
        let polygon = flatten_chain(
            points,
            true,
            self.transform.mean_scale(),
            self.quality.curve_quality,
        );
        if polygon.len() >= 3 {
            self.fill_user(&polygon, color, sink);
        }
    }

    // -------------------------------------------------------------------------
    // Strokes
    // -------------------------------------------------------------------------

    /// Stroke single line segment
    pub fn stroke_line<S>(
        &mut self,
        p0: Point,
        p1: Point,
        stroke: &Stroke,
        start: &StrokeEnd,
        end: &StrokeEnd,
        sink: &mut S,
    ) where
        S: SpanSink + ?Sized,
    {
        self.stroke_polyline(&[p0, p1], stroke, start, end, sink)
    }

    /// Stroke open polyline
    pub fn stroke_polyline<S>(
        &mut self,
        points: &[Point],
        stroke: &Stroke,
        start: &StrokeEnd,
        end: &StrokeEnd,
        sink: &mut S,
    ) where
        S: SpanSink + ?Sized,
    {
        if stroke.color.alpha() == 0 || !(stroke.width > 0.0) || points.len() < 2 {
            return;
        }
        let Some(bbox) = BBox::from_points(points) else {
            return;
        };
        let margin = self.stroke_margin(stroke, &[start, end]);
        if !self.is_visible(bbox.inflate(margin, margin)) {
            return;
        }
        let shapes = self
            .stroke_builder()
            .stroke_polyline(points, stroke, start, end);
        self.fill_shapes(shapes, sink);
    }

    /// Stroke outline of the implicitly closed polygon
    pub fn stroke_polygon<S>(&mut self, points: &[Point], stroke: &Stroke, sink: &mut S)
    where
        S: SpanSink + ?Sized,
    {
        if stroke.color.alpha() == 0 || !(stroke.width > 0.0) || points.len() < 2 {
            return;
        }
        let Some(bbox) = BBox::from_points(points) else {
            return;
        };
        let margin = self.stroke_margin(stroke, &[]);
        if !self.is_visible(bbox.inflate(margin, margin)) {
            return;
        }
        let shapes = self.stroke_builder().stroke_polygon(points, stroke);
        self.fill_shapes(shapes, sink);
    }

    /// Stroke open chain of cubic bezier curves (`3 * k + 1` points)
    pub fn stroke_bezier<S>(
        &mut self,
        points: &[Point],
        stroke: &Stroke,
        start: &StrokeEnd,
        end: &StrokeEnd,
        sink: &mut S,
    ) where
        S: SpanSink + ?Sized,
    {
        if stroke.color.alpha() == 0 || !(stroke.width > 0.0) || points.len() < 4 {
            return;
        }
        let Some(bbox) = BBox::from_points(points) else {
            return;
        };
        let margin = self.stroke_margin(stroke, &[start, end]);
        if !self.is_visible(bbox.inflate(margin, margin)) {
            return;
        }
        let line = flatten_chain(
            points,
            false,
            self.transform.mean_scale(),
            self.quality.curve_quality,
        );
        let shapes = self
            .stroke_builder()
            .stroke_polyline(&line, stroke, start, end);
        self.fill_shapes(shapes, sink);
    }

    /// Stroke closed chain of cubic bezier curves (`3 * k` points)
    pub fn stroke_closed_bezier<S>(&mut self, points: &[Point], stroke: &Stroke, sink: &mut S)
    where
        S: SpanSink + ?Sized,
    {
        if stroke.color.alpha() == 0 || !(stroke.width > 0.0) || points.len() < 3 {
            return;
        }
        let Some(bbox) = BBox::from_points(points) else {
            return;
        };
        let margin = self.stroke_margin(stroke, &[]);
        if !self.is_visible(bbox.inflate(margin, margin)) {
            return;
        }
        let ring = flatten_chain(
            points,
            true,
            self.transform.mean_scale(),
            self.quality.curve_quality,
        );
        let shapes = self.stroke_builder().stroke_polygon(&ring, stroke);
        self.fill_shapes(shapes, sink);
    }

    /// Stroke outline of the rectangle, centered on its border
    ///
    /// Solid outline thicker than the rectangle fills the outer rectangle.
    pub fn stroke_rect<S>(
        &mut self,
        x: Scalar,
        y: Scalar,
        w: Scalar,
        h: Scalar,
        stroke: &Stroke,
        sink: &mut S,
    ) where
        S: SpanSink + ?Sized,
    {
        if !(w >= 0.0 && h >= 0.0) || !(stroke.width > 0.0) {
            return;
        }
        let hw = stroke.width / 2.0;
        if matches!(stroke.dash, crate::DashType::Solid) && (w <= stroke.width || h <= stroke.width)
        {
            let (x, y, w, h) = (x - hw, y - hw, w + stroke.width, h + stroke.width);
            return match stroke.join {
                LineJoin::Round => self.fill_round_rect(x, y, w, h, hw, hw, stroke.color, sink),
                LineJoin::Miter(_) => self.fill_rect(x, y, w, h, stroke.color, sink),
            };
        }
        self.stroke_polygon(&rect_points(x, y, w, h), stroke, sink)
    }

    /// Stroke outline of the ellipse inscribed into the rectangle
    pub fn stroke_ellipse<S>(
        &mut self,
        x: Scalar,
        y: Scalar,
        w: Scalar,
        h: Scalar,
        stroke: &Stroke,
        sink: &mut S,
    ) where
        S: SpanSink + ?Sized,
    {
        if !(w > 0.0 && h > 0.0) || stroke.color.alpha() == 0 || !(stroke.width > 0.0) {
            return;
        }
        let margin = self.stroke_margin(stroke, &[]);
        let bbox = BBox::new((x, y), (x + w, y + h)).inflate(margin, margin);
        if !self.is_visible(bbox) {
            return;
        }
        let ring = self.ellipse_points(x, y, w, h);
        let shapes = self.stroke_builder().stroke_polygon(&ring, stroke);
        self.fill_shapes(shapes, sink);
    }

    /// Stroke arc of the ellipse inscribed into the rectangle
    ///
    /// Angles are the same as in [`Painter::fill_ellipse_sector`], range of 360 or more
    /// strokes closed ellipse without ends.
    #[allow(clippy::too_many_arguments)]
    pub fn stroke_ellipse_arc<S>(
        &mut self,
        x: Scalar,
        y: Scalar,
        w: Scalar,
        h: Scalar,
        start_angle: Scalar,
        range_angle: Scalar,
        stroke: &Stroke,
        start: &StrokeEnd,
        end: &StrokeEnd,
        sink: &mut S,
    ) where
        S: SpanSink + ?Sized,
    {
        if !(w > 0.0 && h > 0.0) || stroke.color.alpha() == 0 || !(stroke.width > 0.0) {
            return;
        }
        let Some((angle, range)) = normalize_angles(start_angle, range_angle) else {
            return;
        };
        if range >= 2.0 * PI {
            return self.stroke_ellipse(x, y, w, h, stroke, sink);
        }
        let margin = self.stroke_margin(stroke, &[start, end]);
        let bbox = BBox::new((x, y), (x + w, y + h)).inflate(margin, margin);
        if !self.is_visible(bbox) {
            return;
        }
        let line = self.arc_points(x, y, w, h, angle, range, 1);
        // negative range runs backwards, ends follow the direction requested by the caller
        let (start, end) = if range_angle < 0.0 {
            (end, start)
        } else {
            (start, end)
        };
        let shapes = self
            .stroke_builder()
            .stroke_polyline(&line, stroke, start, end);
        self.fill_shapes(shapes, sink);
    }

    /// Stroke outline of the rectangle with elliptic corners
    #[allow(clippy::too_many_arguments)]
    pub fn stroke_round_rect<S>(
        &mut self,
        x: Scalar,
        y: Scalar,
        w: Scalar,
        h: Scalar,
        rx: Scalar,
        ry: Scalar,
        stroke: &Stroke,
        sink: &mut S,
    ) where
        S: SpanSink + ?Sized,
    {
        if !(rx > 0.0 && ry > 0.0) {
            return self.stroke_rect(x, y, w, h, stroke, sink);
        }
        if !(w > 0.0 && h > 0.0) || stroke.color.alpha() == 0 || !(stroke.width > 0.0) {
            return;
        }
        let margin = self.stroke_margin(stroke, &[]);
        let bbox = BBox::new((x, y), (x + w, y + h)).inflate(margin, margin);
        if !self.is_visible(bbox) {
            return;
        }
        let ring = self.round_rect_points(x, y, w, h, rx, ry);
        let shapes = self.stroke_builder().stroke_polygon(&ring, stroke);
        self.fill_shapes(shapes, sink);
    }

    // -------------------------------------------------------------------------
    // Shapes
    // -------------------------------------------------------------------------

    /// Number of segments of the full ellipse with radii `rx` and `ry`
    fn ellipse_extent(&self, rx: Scalar, ry: Scalar) -> Scalar {
        let scale = self.transform.scale;
        rx * scale.x().abs() + ry * scale.y().abs()
    }

    fn ellipse_points(&self, x: Scalar, y: Scalar, w: Scalar, h: Scalar) -> Vec<Point> {
        let (rx, ry) = (w / 2.0, h / 2.0);
        let center = Point::new(x + rx, y + ry);
        let count = arc_segments(
            self.quality.circle_quality,
            self.ellipse_extent(rx, ry),
            1.0,
            3,
            256,
        );
        (0..count)
            .map(|index| {
                let angle = 2.0 * PI * index as Scalar / count as Scalar;
                center + Point::new(rx * angle.cos(), ry * angle.sin())
            })
            .collect()
    }

    /// Points of the elliptic arc including both ends, angles in radians
    #[allow(clippy::too_many_arguments)]
    fn arc_points(
        &self,
        x: Scalar,
        y: Scalar,
        w: Scalar,
        h: Scalar,
        start: Scalar,
        range: Scalar,
        min: usize,
    ) -> Vec<Point> {
        let (rx, ry) = (w / 2.0, h / 2.0);
        let center = Point::new(x + rx, y + ry);
        let count = arc_segments(
            self.quality.circle_quality,
            self.ellipse_extent(rx, ry),
            range / (2.0 * PI),
            min,
            256,
        );
        (0..=count)
            .map(|index| {
                let angle = start + range * index as Scalar / count as Scalar;
                center + Point::new(rx * angle.cos(), ry * angle.sin())
            })
            .collect()
    }

    fn round_rect_points(
        &self,
        x: Scalar,
        y: Scalar,
        w: Scalar,
        h: Scalar,
        rx: Scalar,
        ry: Scalar,
    ) -> Vec<Point> {
        let (rx, ry) = (rx.min(w / 2.0), ry.min(h / 2.0));
        let count = arc_segments(
            self.quality.circle_quality,
            self.ellipse_extent(rx, ry),
            0.25,
            1,
            64,
        );
        // corner centers clockwise starting from the top-left one
        let corners = [
            Point::new(x + rx, y + ry),
            Point::new(x + w - rx, y + ry),
            Point::new(x + w - rx, y + h - ry),
            Point::new(x + rx, y + h - ry),
        ];
        let mut points = Vec::with_capacity(4 * (count + 1));
        for (quarter, center) in corners.into_iter().enumerate() {
            let start = PI * (1.0 + quarter as Scalar / 2.0);
            for index in 0..=count {
                let angle = start + PI / 2.0 * index as Scalar / count as Scalar;
                points.push(center + Point::new(rx * angle.cos(), ry * angle.sin()));
            }
        }
        points
    }
}

fn rect_points(x: Scalar, y: Scalar, w: Scalar, h: Scalar) -> [Point; 4] {
    [
        Point::new(x, y),
        Point::new(x + w, y),
        Point::new(x + w, y + h),
        Point::new(x, y + h),
    ]
}

/// Convert start and range angles from degrees to radians with non-negative range
///
/// Returns `None` for empty range.
fn normalize_angles(start: Scalar, range: Scalar) -> Option<(Scalar, Scalar)> {
    if !(start.is_finite() && range.is_finite()) || range == 0.0 {
        return None;
    }
    let (start, range) = if range < 0.0 {
        (start + range, -range)
    } else {
        (start, range)
    };
    Some((start.to_radians(), range.to_radians()))
}
