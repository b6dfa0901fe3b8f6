//! Cubic bezier curves and their approximation with polylines
use crate::{Point, Scalar, clamp};
use std::fmt;

/// Below this deviation from the chord (in device pixels) curve is drawn as a single line
pub const FLATNESS: Scalar = 0.3;

/// Default value for curve quality, see [`Cubic::segments_count`]
pub const DEFAULT_CURVE_QUALITY: Scalar = 1.8;

/// Upper bound of the number of line segments used for a single cubic
pub const MAX_CURVE_SEGMENTS: usize = 256;

/// Control point offset for a quarter of a unit circle
///
/// (4/3)*tan(pi/8) = 4*(sqrt(2)-1)/3 = 0.5522847498307935
pub const CIRCLE_KAPPA: Scalar = 0.5522847498307935;

/// Cubic bezier curve
///
/// Polynimial form:
/// `(1 - t) ^ 3 * p0 + 3 * (1 - t) ^ 2 * t * p1 + 3 * (1 - t) * t ^ 2 * p2 + t ^ 3 * p3`
#[derive(Clone, Copy, PartialEq)]
pub struct Cubic(pub [Point; 4]);

impl fmt::Debug for Cubic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Cubic([p0, p1, p2, p3]) = self;
        write!(f, "Cubic {:?} {:?} {:?} {:?}", p0, p1, p2, p3)
    }
}

impl Cubic {
    pub fn new(
        p0: impl Into<Point>,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        p3: impl Into<Point>,
    ) -> Self {
        Self([p0.into(), p1.into(), p2.into(), p3.into()])
    }

    pub fn points(&self) -> [Point; 4] {
        self.0
    }

    pub fn start(&self) -> Point {
        self.0[0]
    }

    pub fn end(&self) -> Point {
        self.0[3]
    }

    /// Point on the curve at parameter `t`
    pub fn at(&self, t: Scalar) -> Point {
        let Self([p0, p1, p2, p3]) = *self;
        let (t1, t_1) = (t, 1.0 - t);
        let (t2, t_2) = (t1 * t1, t_1 * t_1);
        let (t3, t_3) = (t2 * t1, t_2 * t_1);
        t_3 * p0 + 3.0 * t1 * t_2 * p1 + 3.0 * t2 * t_1 * p2 + t3 * p3
    }

    /// Second differences of the control points
    ///
    /// Proportional to the second derivative at both ends of the curve.
    fn second_differences(&self) -> [Point; 2] {
        let Self([p0, p1, p2, p3]) = *self;
        [p0 - 2.0 * p1 + p2, p1 - 2.0 * p2 + p3]
    }

    /// Upper bound of the curve distance from its chord
    ///
    /// Only components perpendicular to the chord are considered, so collinear
    /// control points are always flat. Degenerate chord uses full magnitude.
    pub fn flatness(&self) -> Scalar {
        let [d0, d1] = self.second_differences();
        let deviation = match (self.end() - self.start()).normalize() {
            Some(dir) => d0.cross(dir).abs().max(d1.cross(dir).abs()),
            None => d0.length().max(d1.length()),
        };
        0.75 * deviation
    }

    /// Curvature estimate, largest magnitude of the second differences
    pub fn curvature(&self) -> Scalar {
        let [d0, d1] = self.second_differences();
        d0.length().max(d1.length())
    }

    /// Number of line segments used to approximate this curve
    ///
    /// `scale` maps curve units to device pixels. Flat curves use a single chord,
    /// otherwise `quality * sqrt(curvature * scale)` clamped to `[1, MAX_CURVE_SEGMENTS]`.
    pub fn segments_count(&self, scale: Scalar, quality: Scalar) -> usize {
        let scale = scale.abs();
        if self.flatness() * scale < FLATNESS {
            return 1;
        }
        let count = (quality * (self.curvature() * scale).sqrt()).ceil();
        if count.is_nan() {
            return 1;
        }
        clamp(count, 1.0, MAX_CURVE_SEGMENTS as Scalar) as usize
    }

    /// Iterator over the end points of the line segments approximating the curve
    ///
    /// Start point is not included, the last point is always exactly `p3`.
    pub fn flatten(&self, scale: Scalar, quality: Scalar) -> CubicFlattenIter {
        CubicFlattenIter {
            cubic: *self,
            count: self.segments_count(scale, quality),
            index: 0,
        }
    }
}

/// Points of the uniformly subdivided cubic curve
pub struct CubicFlattenIter {
    cubic: Cubic,
    count: usize,
    index: usize,
}

impl Iterator for CubicFlattenIter {
    type Item = Point;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        self.index += 1;
        if self.index == self.count {
            Some(self.cubic.end())
        } else {
            Some(self.cubic.at(self.index as Scalar / self.count as Scalar))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let size = self.count - self.index;
        (size, Some(size))
    }
}

/// Append polyline approximating a single cubic curve to `out`
///
/// `p0` itself is not appended, it is expected to be the last point of `out` already.
pub fn flatten_cubic(
    p0: Point,
    p1: Point,
    p2: Point,
    p3: Point,
    scale: Scalar,
    quality: Scalar,
    out: &mut Vec<Point>,
) {
    out.extend(Cubic([p0, p1, p2, p3]).flatten(scale, quality));
}

/// Flatten chain of cubic curves sharing end points
///
/// Open chain consists of `3 * k + 1` points: start followed by `(control, control, end)`
/// triplets. Closed chain has `3 * k` points and the last triplet ends at the start.
/// Trailing points that do not form a full segment are ignored. Result does not repeat
/// the start point for closed chains.
pub fn flatten_chain(
    points: &[Point],
    closed: bool,
    scale: Scalar,
    quality: Scalar,
) -> Vec<Point> {
    let Some(&start) = points.first() else {
        return Vec::new();
    };
    let count = if closed {
        points.len() / 3
    } else {
        (points.len() - 1) / 3
    };
    let mut result = Vec::with_capacity(count * 4 + 1);
    result.push(start);
    for index in 0..count {
        let base = index * 3;
        let end = points.get(base + 3).copied().unwrap_or(start);
        flatten_cubic(
            points[base],
            points[base + 1],
            points[base + 2],
            end,
            scale,
            quality,
            &mut result,
        );
    }
    if closed && result.len() > 1 {
        result.pop();
    }
    result
}

/// Four cubic curves approximating an ellipse, as a closed chain starting at angle zero
///
/// Goes in the direction of growing angle, which is clockwise in the y-down device space.
pub fn ellipse_chain(center: Point, rx: Scalar, ry: Scalar) -> [Point; 12] {
    let kx = Point::new(rx * CIRCLE_KAPPA, 0.0);
    let ky = Point::new(0.0, ry * CIRCLE_KAPPA);
    let p0 = center + Point::new(rx, 0.0);
    let p1 = center + Point::new(0.0, ry);
    let p2 = center - Point::new(rx, 0.0);
    let p3 = center - Point::new(0.0, ry);
    [
        p0,
        p0 + ky,
        p1 + kx,
        p1,
        p1 - kx,
        p2 + ky,
        p2,
        p2 - ky,
        p3 - kx,
        p3,
        p3 + kx,
        p0 - ky,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_collinear_single_segment() {
        let cubic = Cubic::new((0.0, 0.0), (3.0, 3.0), (6.0, 6.0), (10.0, 10.0));
        let points: Vec<_> = cubic.flatten(100.0, DEFAULT_CURVE_QUALITY).collect();
        assert_eq!(points, vec![Point::new(10.0, 10.0)]);

        // control points outside of the chord but still on the line
        let cubic = Cubic::new((0.0, 0.0), (-5.0, 0.0), (15.0, 0.0), (10.0, 0.0));
        assert_eq!(cubic.segments_count(100.0, DEFAULT_CURVE_QUALITY), 1);
    }

    #[test]
    fn test_subdivision_grows_with_scale() {
        let cubic = Cubic::new((0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0));
        let small = cubic.segments_count(0.5, DEFAULT_CURVE_QUALITY);
        let large = cubic.segments_count(20.0, DEFAULT_CURVE_QUALITY);
        assert!(small > 1);
        assert!(large > small);
        assert!(cubic.segments_count(1e12, DEFAULT_CURVE_QUALITY) <= MAX_CURVE_SEGMENTS);
        assert_eq!(cubic.segments_count(1e-6, DEFAULT_CURVE_QUALITY), 1);
    }

    #[test]
    fn test_flatten_error_bound() {
        let cubic = Cubic::new((0.0, 0.0), (0.0, 100.0), (100.0, 100.0), (100.0, 0.0));
        let mut points = vec![cubic.start()];
        points.extend(cubic.flatten(1.0, DEFAULT_CURVE_QUALITY));
        assert_eq!(*points.last().unwrap(), cubic.end());
        // mid points of polyline segments are close to the curve
        let count = points.len() - 1;
        for index in 0..count {
            let t = (index as Scalar + 0.5) / count as Scalar;
            let mid = points[index].lerp(points[index + 1], 0.5);
            assert!(mid.dist(cubic.at(t)) < 1.0, "{:?} {:?}", mid, cubic.at(t));
        }
    }

    #[test]
    fn test_flatten_deterministic() {
        let chain = ellipse_chain(Point::new(3.5, 7.25), 40.0, 20.0);
        let p0 = flatten_chain(&chain, true, 3.0, DEFAULT_CURVE_QUALITY);
        let p1 = flatten_chain(&chain, true, 3.0, DEFAULT_CURVE_QUALITY);
        assert_eq!(p0, p1);
        assert!(p0.len() > 8);
        assert_ne!(p0.first(), p0.last());
    }

    #[test]
    fn test_flatten_cubic() {
        let (p0, p3) = (Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let mut out = vec![p0];
        flatten_cubic(
            p0,
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
            p3,
            2.0,
            DEFAULT_CURVE_QUALITY,
            &mut out,
        );
        assert!(out.len() > 2);
        assert_eq!(out.first(), Some(&p0));
        assert_eq!(out.last(), Some(&p3));
    }

    #[test]
    fn test_flatten_chain() {
        let chain = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 1.0),
            Point::new(3.0, 2.0),
            Point::new(3.0, 3.0),
        ];
        let points = flatten_chain(&chain, false, 1.0, DEFAULT_CURVE_QUALITY);
        assert_eq!(
            points,
            vec![
                Point::new(0.0, 0.0),
                Point::new(3.0, 0.0),
                Point::new(3.0, 3.0)
            ]
        );
        // incomplete segment is ignored
        let points = flatten_chain(&chain[..6], false, 1.0, DEFAULT_CURVE_QUALITY);
        assert_eq!(points.len(), 2);
        assert!(flatten_chain(&[], false, 1.0, DEFAULT_CURVE_QUALITY).is_empty());
    }

    #[test]
    fn test_ellipse_chain() {
        let chain = ellipse_chain(Point::new(0.0, 0.0), 10.0, 10.0);
        let points = flatten_chain(&chain, true, 1.0, DEFAULT_CURVE_QUALITY);
        for point in points {
            assert_approx_eq!(point.length(), 10.0, 0.05);
        }
    }
}
