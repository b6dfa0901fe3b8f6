//! Dash patterns and polyline slicing
use crate::{DashType, Point, Scalar, Stroke};

/// Upper bound of the number of pattern repetitions, longer lines are faded instead
const MAX_DASH_REPEATS: Scalar = 65536.0;

/// How a stroke of the given length is split into dashes
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DashLayout {
    /// Continuous line
    Solid,
    /// Continuous line with alpha scaled by the duty cycle of the pattern
    Faded(Scalar),
    /// Visible `(from, to)` ranges measured along the line
    Dashes(Vec<(Scalar, Scalar)>),
}

impl DashLayout {
    /// Lay out dash pattern of the `stroke` along the line of `length`
    ///
    /// Pattern is measured in stroke `width`s and repeated an integer number of times,
    /// stretched to fit the line exactly. Line starts and ends with half of a gap.
    pub fn new(length: Scalar, stroke: &Stroke, width: Scalar, scale: Scalar) -> Self {
        let dash = 4.0 * stroke.dash_length_factor.max(0.0) * width;
        let gap = 2.0 * stroke.gap_length_factor.max(0.0) * width;
        let dot = width;
        let pattern = match stroke.dash {
            DashType::Solid => return Self::Solid,
            DashType::Dashed => vec![dash, gap],
            DashType::Dotted => vec![dot, gap],
            DashType::DashDotted => vec![dash, gap, dot, gap],
        };
        let unit: Scalar = pattern.iter().sum();
        if !(gap > 0.0 && unit.is_finite() && length.is_finite() && length > 0.0) {
            return Self::Solid;
        }
        let visible: Scalar = pattern.iter().step_by(2).sum();
        let duty = visible / unit;
        let count = (length / unit).round().max(1.0);
        if count > MAX_DASH_REPEATS {
            return Self::Faded(duty);
        }
        let stretch = length / (count * unit);
        let shortest = pattern
            .iter()
            .step_by(2)
            .fold(Scalar::INFINITY, |shortest, part| shortest.min(*part));
        if shortest * stretch * scale < 1.0 {
            return Self::Faded(duty);
        }

        let mut dashes = Vec::with_capacity(count as usize * pattern.len() / 2);
        let mut position = gap * stretch / 2.0;
        for _ in 0..count as usize {
            for (index, part) in pattern.iter().enumerate() {
                let part = part * stretch;
                if index % 2 == 0 {
                    dashes.push((position, position + part));
                }
                position += part;
            }
        }
        Self::Dashes(dashes)
    }
}

/// Polyline with cumulative lengths of its vertices
#[derive(Debug, Clone)]
pub(crate) struct Measured<'a> {
    points: &'a [Point],
    offsets: Vec<Scalar>,
}

impl<'a> Measured<'a> {
    pub fn new(points: &'a [Point]) -> Self {
        let mut offsets = Vec::with_capacity(points.len());
        let mut length = 0.0;
        for (index, point) in points.iter().enumerate() {
            if index > 0 {
                length += points[index - 1].dist(*point);
            }
            offsets.push(length);
        }
        Self { points, offsets }
    }

    /// Total length
    pub fn length(&self) -> Scalar {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Segment that contains point at the `distance` from the start and the point itself
    fn locate(&self, distance: Scalar) -> (usize, Point) {
        if self.points.len() < 2 {
            let point = self.points.first().copied().unwrap_or_default();
            return (0, point);
        }
        let segment = self
            .offsets
            .partition_point(|offset| *offset < distance)
            .saturating_sub(1)
            .min(self.points.len() - 2);
        let (start, end) = (self.offsets[segment], self.offsets[segment + 1]);
        let t = if end > start {
            ((distance - start) / (end - start)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let point = self.points[segment].lerp(self.points[segment + 1], t);
        (segment, point)
    }

    /// Point at the `distance` from the start
    pub fn at(&self, distance: Scalar) -> Point {
        self.locate(distance).1
    }

    /// Part of the polyline between two distances from the start
    ///
    /// May contain consecutive duplicates when a distance falls onto a vertex.
    pub fn slice(&self, from: Scalar, to: Scalar) -> Vec<Point> {
        let (first, start) = self.locate(from);
        let (last, end) = self.locate(to);
        let mut result = Vec::with_capacity(last.saturating_sub(first) + 2);
        result.push(start);
        if last > first {
            result.extend_from_slice(&self.points[first + 1..=last]);
        }
        result.push(end);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColorU8, assert_approx_eq};

    fn dashes(layout: DashLayout) -> Vec<(Scalar, Scalar)> {
        match layout {
            DashLayout::Dashes(dashes) => dashes,
            layout => panic!("dashes expected: {:?}", layout),
        }
    }

    #[test]
    fn test_dashed_layout() {
        let stroke = Stroke::dashed(ColorU8::BLACK, 2.5).with_dash_factors(1.0, 2.0);
        let dashes = dashes(DashLayout::new(100.0, &stroke, 2.5, 1.0));
        assert_eq!(dashes.len(), 5);
        for (index, (from, to)) in dashes.into_iter().enumerate() {
            assert_approx_eq!(from, 5.0 + 20.0 * index as Scalar);
            assert_approx_eq!(to - from, 10.0);
        }
    }

    #[test]
    fn test_stretch() {
        // unit is 6, 4.4 repetitions round down to 4
        let stroke = Stroke::dashed(ColorU8::BLACK, 1.0);
        let dashes = dashes(DashLayout::new(26.4, &stroke, 1.0, 1.0));
        assert_eq!(dashes.len(), 4);
        let stretch = 26.4 / 24.0;
        assert_approx_eq!(dashes[0].0, stretch);
        assert_approx_eq!(dashes[3].1, 26.4 - stretch);

        // shorter than the unit still gets one dash
        let dashes = dashes_of(2.0);
        assert_eq!(dashes.len(), 1);
    }

    fn dashes_of(length: Scalar) -> Vec<(Scalar, Scalar)> {
        let stroke = Stroke::dashed(ColorU8::BLACK, 1.0);
        dashes(DashLayout::new(length, &stroke, 1.0, 1.0))
    }

    #[test]
    fn test_dash_dotted() {
        let stroke = Stroke::dash_dotted(ColorU8::BLACK, 1.0);
        // dash 4, gap 2, dot 1, gap 2
        let dashes = dashes(DashLayout::new(18.0, &stroke, 1.0, 1.0));
        assert_eq!(dashes.len(), 4);
        assert_approx_eq!(dashes[0].0, 1.0);
        assert_approx_eq!(dashes[0].1, 5.0);
        assert_approx_eq!(dashes[1].0, 7.0);
        assert_approx_eq!(dashes[1].1, 8.0);
        assert_approx_eq!(dashes[3].1, 17.0);
    }

    #[test]
    fn test_faded() {
        let stroke = Stroke::dotted(ColorU8::BLACK, 1.0);
        // dots are a fifth of a pixel
        let layout = DashLayout::new(100.0, &stroke, 1.0, 0.2);
        match layout {
            DashLayout::Faded(duty) => assert_approx_eq!(duty, 1.0 / 3.0),
            layout => panic!("faded expected: {:?}", layout),
        }
        let solid = Stroke::new(ColorU8::BLACK, 1.0);
        assert_eq!(DashLayout::new(100.0, &solid, 1.0, 1.0), DashLayout::Solid);
        let no_gaps = Stroke::dashed(ColorU8::BLACK, 1.0).with_dash_factors(1.0, 0.0);
        assert_eq!(DashLayout::new(100.0, &no_gaps, 1.0, 1.0), DashLayout::Solid);
    }

    #[test]
    fn test_measured() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        let measured = Measured::new(&points);
        assert_approx_eq!(measured.length(), 20.0);
        assert_eq!(measured.at(5.0), Point::new(5.0, 0.0));
        assert_eq!(measured.at(15.0), Point::new(10.0, 5.0));
        assert_eq!(measured.at(-1.0), Point::new(0.0, 0.0));
        assert_eq!(measured.at(25.0), Point::new(10.0, 10.0));

        assert_eq!(
            measured.slice(5.0, 15.0),
            vec![
                Point::new(5.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 5.0)
            ]
        );
        assert_eq!(
            measured.slice(1.0, 2.0),
            vec![Point::new(1.0, 0.0), Point::new(2.0, 0.0)]
        );
    }
}
