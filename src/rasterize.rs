//! Scanline polygon rasterizer
//!
//! Every edge of the polygon deposits coverage-delta records into the rows it crosses,
//! rows are then swept left to right integrating the records into per-pixel coverage.
//! Consecutive pixels with the same coverage are merged into a single [`Span`] so the
//! number of compositor calls is proportional to the number of edges not pixels.
use crate::{BBox, ColorU8, Point, Scalar};
use std::fmt;

/// Edges shorter than this (in device pixels) along an axis are treated as degenerate
const EDGE_EPSILON: Scalar = 0.0001;

/// Number of scan entries allocated at once when the buffer runs out of space
const SCAN_CHUNK: usize = 2048;

/// Index of the terminator entry, every row list ends with it
const TERMINATOR: u32 = 0;

/// Horizontal run of pixels with resolved coverage
///
/// Pixel `x` is painted with `left` opacity, pixel `x + len - 1` with `right`
/// opacity (the same pixel when `len == 1`, in which case `left == right`), pixels
/// in between with `middle` opacity. Opacities are in `0..=255` range.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub row: i32,
    pub x: i32,
    pub len: u32,
    pub left: u8,
    pub middle: u8,
    pub right: u8,
}

impl Span {
    /// Opacity of the pixel with column `x`, zero if the pixel is outside of the span
    pub fn opacity_at(&self, x: i32) -> u8 {
        let last = self.x + self.len as i32 - 1;
        if x < self.x || x > last {
            0
        } else if x == self.x {
            self.left
        } else if x == last {
            self.right
        } else {
            self.middle
        }
    }

    /// Iterator over `(column, opacity)` pairs
    pub fn pixels(&self) -> impl Iterator<Item = (i32, u8)> + '_ {
        (self.x..self.x + self.len as i32).map(move |x| (x, self.opacity_at(x)))
    }

    /// Sum of the opacities of all pixels
    pub fn coverage(&self) -> u64 {
        match self.len {
            0 => 0,
            1 => self.left as u64,
            len => self.left as u64 + self.right as u64 + (len as u64 - 2) * self.middle as u64,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Span(row={}, x={}, len={}, {}/{}/{})",
            self.row, self.x, self.len, self.left, self.middle, self.right
        )
    }
}

/// Receiver of the rasterized spans (compositor)
pub trait SpanSink {
    /// Paint single span
    fn paint_span(&mut self, span: Span);

    /// Color used for all subsequent spans
    fn set_color(&mut self, _color: ColorU8) {}
}

impl<S: SpanSink + ?Sized> SpanSink for &mut S {
    fn paint_span(&mut self, span: Span) {
        (**self).paint_span(span)
    }

    fn set_color(&mut self, color: ColorU8) {
        (**self).set_color(color)
    }
}

/// Span sink which records all spans together with the active color
#[derive(Debug, Clone, Default)]
pub struct SpanRecorder {
    color: ColorU8,
    spans: Vec<(ColorU8, Span)>,
}

impl SpanRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded spans in paint order
    pub fn spans(&self) -> &[(ColorU8, Span)] {
        &self.spans
    }

    /// Sum of the opacities of all recorded spans
    pub fn coverage(&self) -> u64 {
        self.spans.iter().map(|(_, span)| span.coverage()).sum()
    }

    pub fn clear(&mut self) {
        self.spans.clear()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

impl SpanSink for SpanRecorder {
    fn paint_span(&mut self, span: Span) {
        self.spans.push((self.color, span))
    }

    fn set_color(&mut self, color: ColorU8) {
        self.color = color;
    }
}

/// Coverage-delta record
///
/// `a0` is coverage added to the pixel at `x`, `a1` is coverage added to the pixel
/// at `x + 1`, `a2` is added to the coverage increment of all following pixels.
#[derive(Debug, Clone, Copy)]
struct ScanEntry {
    a0: Scalar,
    a1: Scalar,
    a2: Scalar,
    next: u32,
    x: i32,
}

impl ScanEntry {
    const fn terminator() -> Self {
        Self {
            a0: 0.0,
            a1: 0.0,
            a2: 0.0,
            next: TERMINATOR,
            x: i32::MAX,
        }
    }
}

/// Polygon rasterizer
///
/// Owns the scan entry arena so it can be reused between calls without allocation.
/// Rows are singly linked lists of entries sorted by `x`, linked by indices into the
/// arena, terminated by the shared terminator entry at index zero.
#[derive(Clone)]
pub struct PolygonRasterizer {
    entries: Vec<ScanEntry>,
    rows: Vec<u32>,
    first_row: i32,
}

impl fmt::Debug for PolygonRasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolygonRasterizer")
            .field("capacity", &self.entries.capacity())
            .finish()
    }
}

impl Default for PolygonRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PolygonRasterizer {
    pub fn new() -> Self {
        Self {
            entries: Self::arena(),
            rows: Vec::new(),
            first_row: 0,
        }
    }

    fn arena() -> Vec<ScanEntry> {
        let mut entries = Vec::with_capacity(SCAN_CHUNK);
        entries.push(ScanEntry::terminator());
        entries
    }

    /// Number of scan entries that can be stored without reallocation
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Fill polygon with antialiased coverage
    ///
    /// `points` are in device space and form implicitly closed polygon. Coverage of
    /// overlapping parts is added up (not resolved with a winding rule) and clamped
    /// to 255. `opacity` scales the coverage. Only the part inside of the `clip` is painted.
    pub fn fill<S>(&mut self, points: &[Point], clip: BBox, opacity: u8, sink: &mut S)
    where
        S: SpanSink + ?Sized,
    {
        if opacity == 0 || points.len() < 3 {
            return;
        }
        if points
            .iter()
            .any(|point| !point.x().is_finite() || !point.y().is_finite())
        {
            tracing::trace!("[fill:rejected] non finite coordinates");
            return;
        }
        let Some(bbox) = BBox::from_points(points) else {
            return;
        };
        let min_y = bbox.y().max(clip.y());
        let max_y = bbox.max().y().min(clip.max().y());
        if min_y >= max_y {
            return;
        }
        let min_x = bbox.x().max(clip.x());
        let max_x = bbox.max().x().min(clip.max().x() - EDGE_EPSILON);
        if min_x >= max_x {
            return;
        }
        let bounds = EdgeBounds {
            min_x,
            max_x,
            min_y,
            max_y,
        };

        let first_row = min_y.floor() as i32;
        let last_row = max_y.ceil() as i32;
        let rows = (last_row - first_row) as usize;
        let span = tracing::debug_span!("[fill]", rows, entries = tracing::field::Empty);
        let _guard = span.enter();
        self.reset(first_row, rows);

        let weight = opacity as Scalar;
        for (index, p0) in points.iter().enumerate() {
            let p1 = points[(index + 1) % points.len()];
            self.add_edge(*p0, p1, weight, bounds);
        }
        span.record("entries", self.entries.len() - 1);
        self.sweep(sink);
    }

    fn reset(&mut self, first_row: i32, rows: usize) {
        self.entries.truncate(1);
        self.rows.clear();
        self.rows.resize(rows, TERMINATOR);
        self.first_row = first_row;
    }

    /// Clip edge and deposit its coverage
    ///
    /// Parts of the edge outside of the horizontal bounds are projected onto the
    /// bounds as vertical edges, so coverage to the right of them stays correct.
    fn add_edge(&mut self, p0: Point, p1: Point, weight: Scalar, bounds: EdgeBounds) {
        let EdgeBounds {
            min_x,
            max_x,
            min_y,
            max_y,
        } = bounds;
        let (Point([mut x1, mut y1]), Point([mut x2, mut y2]), weight) = if p0.y() < p1.y() {
            (p0, p1, weight)
        } else {
            (p1, p0, -weight)
        };
        if y1 >= max_y || y2 <= min_y {
            return;
        }
        if y1 < min_y {
            if y2 - y1 >= EDGE_EPSILON {
                x1 += (min_y - y1) * (x2 - x1) / (y2 - y1);
            }
            y1 = min_y;
        }
        if y2 > max_y {
            if y2 - y1 >= EDGE_EPSILON {
                x2 += (max_y - y2) * (x2 - x1) / (y2 - y1);
            }
            y2 = max_y;
        }

        let mut projected: [Option<[Scalar; 4]>; 2] = [None, None];
        if x1 < x2 {
            if x1 < min_x {
                if x2 > min_x && x2 - x1 >= EDGE_EPSILON {
                    let y = y1 + (min_x - x1) * (y2 - y1) / (x2 - x1);
                    projected[0] = Some([min_x, y1, min_x, y]);
                    x1 = min_x;
                    y1 = y;
                } else {
                    x1 = min_x;
                    x2 = min_x;
                }
            }
            if x2 > max_x {
                if x1 < max_x && x2 - x1 >= EDGE_EPSILON {
                    let y = y2 + (max_x - x2) * (y2 - y1) / (x2 - x1);
                    projected[1] = Some([max_x, y, max_x, y2]);
                    x2 = max_x;
                    y2 = y;
                } else {
                    x1 = max_x;
                    x2 = max_x;
                }
            }
        } else {
            if x1 > max_x {
                if x2 < max_x && x2 - x1 <= -EDGE_EPSILON {
                    let y = y1 + (max_x - x1) * (y2 - y1) / (x2 - x1);
                    projected[0] = Some([max_x, y1, max_x, y]);
                    x1 = max_x;
                    y1 = y;
                } else {
                    x1 = max_x;
                    x2 = max_x;
                }
            }
            if x2 < min_x {
                if x1 > min_x && x2 - x1 <= -EDGE_EPSILON {
                    let y = y2 + (min_x - x2) * (y2 - y1) / (x2 - x1);
                    projected[1] = Some([min_x, y, min_x, y2]);
                    x2 = min_x;
                    y2 = y;
                } else {
                    x1 = min_x;
                    x2 = min_x;
                }
            }
        }

        self.add_clipped_edge(x1, y1, x2, y2, weight);
        for [x1, y1, x2, y2] in projected.into_iter().flatten() {
            self.add_clipped_edge(x1, y1, x2, y2, weight);
        }
    }

    /// Deposit coverage of the edge going down from `(x1, y1)` to `(x2, y2)`
    fn add_clipped_edge(&mut self, x1: Scalar, y1: Scalar, x2: Scalar, y2: Scalar, weight: Scalar) {
        let dy = y2 - y1;
        if dy < EDGE_EPSILON {
            return;
        }
        let mut row = y1.floor() as i32;
        let last_row = y2.ceil() as i32 - 1;
        let column = x1.floor();
        let mut x_index = column as i32;
        let t = column + 1.0 - x1;
        let dx = x2 - x1;
        if dx.abs() >= EDGE_EPSILON {
            let a2 = weight * dy / dx;
            let mut a0 = t * t * 0.5 * a2;
            let mut a1 = (t + 0.5) * a2;
            let step = dx / dy;
            let mut x = x1 + ((row + 1) as Scalar - y1) * step;
            while row <= last_row {
                if row == last_row {
                    x = x2;
                }
                self.add_entry(row, x_index, a0, a1, a2);
                // entry leaving the row, also entering the next one
                let column = x.floor();
                x_index = column as i32;
                let t = column + 1.0 - x;
                a0 = t * t * 0.5 * a2;
                a1 = (t + 0.5) * a2;
                self.add_entry(row, x_index, -a0, -a1, -a2);
                x += step;
                row += 1;
            }
        } else {
            let mut a1 = weight * ((row + 1) as Scalar - y1);
            while row <= last_row {
                if row == last_row {
                    a1 -= weight * ((last_row + 1) as Scalar - y2);
                }
                self.add_entry(row, x_index, t * a1, a1, 0.0);
                a1 = weight;
                row += 1;
            }
        }
    }

    /// Insert entry into the row keeping it sorted by `x`, entries with the same `x` are merged
    fn add_entry(&mut self, row: i32, x: i32, a0: Scalar, a1: Scalar, a2: Scalar) {
        let Some(head) = self.rows.get_mut((row - self.first_row) as usize) else {
            return;
        };
        let mut prev: Option<u32> = None;
        let mut current = *head;
        while self.entries[current as usize].x < x {
            prev = Some(current);
            current = self.entries[current as usize].next;
        }
        let entry = &mut self.entries[current as usize];
        if entry.x == x {
            entry.a0 += a0;
            entry.a1 += a1;
            entry.a2 += a2;
            return;
        }
        if self.entries.len() == self.entries.capacity() {
            self.entries.reserve_exact(SCAN_CHUNK);
        }
        let index = self.entries.len() as u32;
        self.entries.push(ScanEntry {
            a0,
            a1,
            a2,
            next: current,
            x,
        });
        match prev {
            Some(prev) => self.entries[prev as usize].next = index,
            None => self.rows[(row - self.first_row) as usize] = index,
        }
    }

    /// Integrate entries of every row and emit merged spans
    fn sweep<S>(&self, sink: &mut S)
    where
        S: SpanSink + ?Sized,
    {
        for (index, head) in self.rows.iter().enumerate() {
            let mut current = *head;
            if current == TERMINATOR {
                continue;
            }
            let mut merger = SpanMerger::new(self.first_row + index as i32);
            let mut a1: Scalar = 0.0;
            let mut a2: Scalar = 0.0;
            let mut x = self.entries[current as usize].x;
            loop {
                let mut a0 = a1;
                a1 += a2;
                let entry = self.entries[current as usize];
                if entry.x == x {
                    a0 += entry.a0;
                    a1 += entry.a1;
                    a2 += entry.a2;
                    current = entry.next;
                }
                let alpha = round_opacity(a0);
                let mut x_end = x + 1;
                let next_x = self.entries[current as usize].x;
                if current != TERMINATOR && next_x > x_end {
                    // coverage of the pixel just before the next entry
                    let t = a1 + a2 * (next_x - 2 - x) as Scalar;
                    if round_opacity(t) == alpha {
                        a1 = t + a2;
                        x_end = next_x;
                    }
                }
                if alpha > 0 {
                    merger.push(x, x_end, alpha.min(255) as u8, sink);
                }
                x = x_end;
                if current == TERMINATOR {
                    break;
                }
            }
            merger.finish(sink);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct EdgeBounds {
    min_x: Scalar,
    max_x: Scalar,
    min_y: Scalar,
    max_y: Scalar,
}

#[inline]
fn round_opacity(value: Scalar) -> i64 {
    (value.abs() + 0.5) as i64
}

/// Merges runs of pixels into three-part spans
///
/// Pending span with `len == 1` only has its left pixel, longer pending span has
/// its left pixel and a middle run but no right pixel yet.
struct SpanMerger {
    row: i32,
    pending: Option<Span>,
}

impl SpanMerger {
    fn new(row: i32) -> Self {
        Self { row, pending: None }
    }

    /// Add run of pixels `[x0, x1)` with the same opacity
    fn push<S>(&mut self, x0: i32, x1: i32, alpha: u8, sink: &mut S)
    where
        S: SpanSink + ?Sized,
    {
        let len = (x1 - x0) as u32;
        if let Some(span) = self.pending.as_mut() {
            if span.x + span.len as i32 == x0 {
                if span.len == 1 {
                    if len == 1 && alpha != span.left {
                        span.len = 2;
                        span.middle = alpha;
                        span.right = alpha;
                        sink.paint_span(*span);
                        self.pending = None;
                    } else {
                        span.len += len;
                        span.middle = alpha;
                    }
                    return;
                }
                if alpha == span.middle {
                    span.len += len;
                    return;
                }
                if len == 1 {
                    span.len += 1;
                    span.right = alpha;
                    sink.paint_span(*span);
                    self.pending = None;
                    return;
                }
            }
            self.finish(sink);
        }
        self.pending = Some(Span {
            row: self.row,
            x: x0,
            len,
            left: alpha,
            middle: alpha,
            right: alpha,
        });
    }

    fn finish<S>(&mut self, sink: &mut S)
    where
        S: SpanSink + ?Sized,
    {
        if let Some(mut span) = self.pending.take() {
            span.right = if span.len == 1 { span.left } else { span.middle };
            sink.paint_span(span);
        }
    }
}
