//! Renders a gallery of strokes, line ends and filled shapes into a PPM image
use scanpaint::*;
use std::{env, fs::File, io::BufWriter};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

type Error = Box<dyn std::error::Error>;

const ROW_HEIGHT: Scalar = 32.0;
const GALLERY_WIDTH: Scalar = 640.0;

#[derive(Debug)]
struct Args {
    output_file: String,
    stroke: Stroke,
    scale: Scalar,
    quality: Quality,
    bg: ColorU8,
}

impl Args {
    fn parse() -> Result<Args, Error> {
        let mut result = Args {
            output_file: String::new(),
            stroke: Stroke::new("#3050a0".parse()?, 3.0),
            scale: 1.0,
            quality: Quality::default(),
            bg: ColorU8::WHITE,
        };
        let mut positional = 0;
        let mut args = env::args();
        let cmd = args.next().unwrap_or_default();
        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "-h" => {
                    positional = 0;
                    break;
                }
                "-s" => {
                    let stroke = args.next().ok_or("-s requires argument")?;
                    result.stroke = Stroke::from_json(&stroke)?;
                }
                "-q" => {
                    let quality = args.next().ok_or("-q requires argument")?;
                    result.quality = Quality::from_json(&quality)?;
                }
                "-x" => {
                    let scale: Scalar = args.next().ok_or("-x requires argument")?.parse()?;
                    if !(scale > EPSILON) {
                        return Err("scale is too small".into());
                    }
                    result.scale = scale;
                }
                "-bg" => {
                    result.bg = args
                        .next()
                        .ok_or("-bg requires color #rrggbb(aa) argument")?
                        .parse()?;
                }
                _ => {
                    positional += 1;
                    match positional {
                        1 => result.output_file = arg,
                        _ => return Err("unexpected positional argument".into()),
                    }
                }
            }
        }
        if positional < 1 {
            eprintln!("Renders a gallery of strokes, line ends and shapes");
            eprintln!("\nUSAGE:");
            eprintln!(
                "    {} [-s <stroke>] [-q <quality>] [-x <scale>] [-bg <color>] <out.ppm>",
                cmd
            );
            eprintln!("\nARGS:");
            eprintln!("    -s <stroke>    stroke as JSON: {}", Stroke::default().to_json()?);
            eprintln!("    -q <quality>   quality as JSON: {}", Quality::default().to_json()?);
            eprintln!("    -x <scale>     device pixels per unit");
            eprintln!("    -bg <color>    background color");
            eprintln!("    <out.ppm>      image rendered in the PPM format ('-' means stdout)");
            std::process::exit(1);
        }
        Ok(result)
    }
}

/// One horizontal line per end kind, the same kind on both ends
fn paint_ends(painter: &mut Painter, stroke: &Stroke, canvas: &mut Canvas) -> Scalar {
    let inner = ColorU8::new(250, 220, 120, 255);
    let mut y = ROW_HEIGHT / 2.0;
    for kind in StrokeEndKind::ALL {
        let end = StrokeEnd::new(kind).with_inner_color(inner);
        let (p0, p1) = (Point::new(24.0, y), Point::new(GALLERY_WIDTH / 2.0 - 24.0, y));
        painter.stroke_line(p0, p1, stroke, &end, &end, canvas);
        y += ROW_HEIGHT;
    }
    y
}

/// Every dash type on a zigzag, an ellipse arc and a bezier
fn paint_dashes(painter: &mut Painter, stroke: &Stroke, canvas: &mut Canvas) {
    let x0 = GALLERY_WIDTH / 2.0 + 16.0;
    let arrow = StrokeEnd::new(StrokeEndKind::Arrow);
    let mut y = ROW_HEIGHT;
    for dash in DashType::ALL {
        let stroke = stroke.with_dash(dash);
        let zigzag: Vec<_> = (0..8)
            .map(|index| {
                let dy = if index % 2 == 0 { 0.0 } else { ROW_HEIGHT };
                Point::new(x0 + 40.0 * index as Scalar, y + dy)
            })
            .collect();
        painter.stroke_polyline(&zigzag, &stroke, &StrokeEnd::BUTT, &arrow, canvas);
        y += 2.0 * ROW_HEIGHT;
    }

    let rounded = stroke.with_join(LineJoin::Round).with_dash(DashType::Dotted);
    painter.stroke_ellipse_arc(
        x0,
        y,
        240.0,
        160.0,
        200.0,
        280.0,
        &rounded,
        &StrokeEnd::new(StrokeEndKind::Circle),
        &StrokeEnd::new(StrokeEndKind::Triangle),
        canvas,
    );
    let curve = [
        Point::new(x0, y + 200.0),
        Point::new(x0 + 80.0, y + 150.0),
        Point::new(x0 + 160.0, y + 250.0),
        Point::new(x0 + 280.0, y + 200.0),
    ];
    painter.stroke_bezier(
        &curve,
        &stroke.with_dash(DashType::DashDotted),
        &StrokeEnd::new(StrokeEndKind::ContourDiamond),
        &arrow,
        canvas,
    );
}

/// Filled and outlined shapes under the gallery
fn paint_shapes(painter: &mut Painter, stroke: &Stroke, y: Scalar, canvas: &mut Canvas) {
    let fill = ColorU8::new(220, 80, 60, 160);
    painter.fill_rect(24.0, y, 80.0, 60.0, fill, canvas);
    painter.stroke_rect(24.0, y, 80.0, 60.0, stroke, canvas);
    painter.fill_round_rect(128.0, y, 100.0, 60.0, 16.0, 24.0, fill, canvas);
    painter.stroke_round_rect(128.0, y, 100.0, 60.0, 16.0, 24.0, stroke, canvas);
    painter.fill_ellipse(252.0, y, 100.0, 60.0, fill, canvas);
    painter.stroke_ellipse(252.0, y, 100.0, 60.0, stroke, canvas);
    painter.fill_ellipse_sector(376.0, y, 80.0, 60.0, -30.0, 240.0, fill, canvas);
    let star: Vec<_> = (0..10)
        .map(|index| {
            let angle = PI * index as Scalar / 5.0 - PI / 2.0;
            let radius = if index % 2 == 0 { 32.0 } else { 13.0 };
            Point::new(540.0 + radius * angle.cos(), y + 32.0 + radius * angle.sin())
        })
        .collect();
    painter.fill_polygon(&star, fill, canvas);
    painter.stroke_polygon(&star, &stroke.with_join(LineJoin::Round), canvas);
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse()?;
    tracing::debug!("[stroke] {}", args.stroke.to_json()?);

    let height = ROW_HEIGHT * (StrokeEndKind::ALL.len() as Scalar + 3.0);
    let width = (GALLERY_WIDTH * args.scale).ceil() as usize;
    let mut canvas = Canvas::new(width, (height * args.scale).ceil() as usize, args.bg);
    let mut painter = Painter::new(canvas.shape().bbox())
        .with_transform(Transform::new((0.0, 0.0), (args.scale, args.scale)))
        .with_quality(args.quality);

    tracing::debug_span!("[render]").in_scope(|| {
        let y = paint_ends(&mut painter, &args.stroke, &mut canvas);
        paint_dashes(&mut painter, &args.stroke, &mut canvas);
        paint_shapes(&mut painter, &args.stroke, y + 8.0, &mut canvas);
    });

    let save = tracing::debug_span!("[save]");
    let _guard = save.enter();
    if args.output_file != "-" {
        canvas.write_ppm(BufWriter::new(File::create(&args.output_file)?))?;
    } else {
        canvas.write_ppm(std::io::stdout().lock())?;
    }
    Ok(())
}
