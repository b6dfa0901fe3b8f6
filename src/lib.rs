//! Scanline rasterizer core of a 2D painter
//!
//! Main features:
//!  - Anti-aliased polygon filling into horizontal spans
//!  - Stroke geometry with round and miter joins, dashes and decorated line ends
//!  - Cubic bezier flattening
//!  - [`Painter`] facade with axis aligned transform and clip
//!
//! Pixels are never touched here, spans are handed to a [`SpanSink`] implemented by
//! the compositor. [`Mask`] and [`Canvas`] are simple sinks for tests and debug output.

mod color;
mod curve;
mod dash;
mod end;
mod error;
mod geometry;
mod image;
mod painter;
mod rasterize;
mod stroke;
mod utils;

pub use color::ColorU8;
pub use curve::{
    CIRCLE_KAPPA, Cubic, CubicFlattenIter, DEFAULT_CURVE_QUALITY, FLATNESS, MAX_CURVE_SEGMENTS,
    ellipse_chain, flatten_chain, flatten_cubic,
};
pub use end::{StrokeEnd, StrokeEndKind};
pub use error::Error;
pub use geometry::{BBox, EPSILON, PI, Point, Scalar, Transform, scalar_fmt};
pub use image::{Canvas, Mask, Shape};
pub use painter::{DEFAULT_CIRCLE_QUALITY, Painter, Quality};
pub use rasterize::{PolygonRasterizer, Span, SpanRecorder, SpanSink};
pub use stroke::{DEFAULT_MITER_LIMIT, DashType, LineJoin, Stroke, StrokeBuilder, StrokeShape};
pub use utils::clamp;
