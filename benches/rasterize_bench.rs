use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use scanpaint::*;
use std::time::Duration;

const SIZE: usize = 512;

fn clip() -> BBox {
    BBox::new((0.0, 0.0), (SIZE as Scalar, SIZE as Scalar))
}

fn curve_benchmark(c: &mut Criterion) {
    let cubic = Cubic::new((158.0, 70.0), (210.0, 250.0), (25.0, 190.0), (219.0, 89.0));
    let chain = ellipse_chain(Point::new(256.0, 256.0), 200.0, 120.0);
    let mut group = c.benchmark_group("curve");
    group
        .throughput(Throughput::Elements(1))
        .bench_function("segments count", |b| {
            b.iter(|| black_box(cubic).segments_count(4.0, DEFAULT_CURVE_QUALITY))
        })
        .bench_function("flatten cubic", |b| {
            let mut out = Vec::new();
            b.iter(|| {
                out.clear();
                let [p0, p1, p2, p3] = black_box(cubic).points();
                flatten_cubic(p0, p1, p2, p3, 4.0, DEFAULT_CURVE_QUALITY, &mut out);
            })
        })
        .bench_function("flatten ellipse", |b| {
            b.iter_with_large_drop(|| {
                flatten_chain(black_box(&chain), true, 1.0, DEFAULT_CURVE_QUALITY)
            })
        });
    group.finish();
}

fn fill_benchmark(c: &mut Criterion) {
    let mut painter = Painter::new(clip());
    let mut mask = Mask::new(SIZE, SIZE);
    let color = ColorU8::new(200, 40, 40, 255);
    let star: Vec<_> = (0..10)
        .map(|index| {
            let angle = PI * index as Scalar / 5.0;
            let radius = if index % 2 == 0 { 240.0 } else { 90.0 };
            Point::new(256.0 + radius * angle.cos(), 256.0 + radius * angle.sin())
        })
        .collect();

    let mut group = c.benchmark_group("fill");
    group
        .throughput(Throughput::Elements((SIZE * SIZE) as u64))
        .bench_function("ellipse", |b| {
            b.iter(|| {
                mask.clear();
                painter.fill_ellipse(16.0, 16.0, 480.0, 480.0, color, &mut mask);
            })
        })
        .bench_function("round rect", |b| {
            b.iter(|| {
                mask.clear();
                painter.fill_round_rect(16.0, 96.0, 480.0, 320.0, 40.0, 40.0, color, &mut mask);
            })
        })
        .bench_function("star", |b| {
            b.iter(|| {
                mask.clear();
                painter.fill_polygon(&star, color, &mut mask);
            })
        });
    group.finish();
}

fn stroke_benchmark(c: &mut Criterion) {
    let wave: Vec<_> = (0..=256)
        .map(|index| {
            let x = 8.0 + index as Scalar * 1.9;
            Point::new(x, 256.0 + 180.0 * (x / 40.0).sin())
        })
        .collect();
    let arrow = StrokeEnd::new(StrokeEndKind::Arrow);
    let mut group = c.benchmark_group("stroke");
    group.throughput(Throughput::Elements(wave.len() as u64));
    for stroke in [
        Stroke::new(ColorU8::BLACK, 3.0),
        Stroke::rounded(ColorU8::BLACK, 3.0),
        Stroke::dashed(ColorU8::BLACK, 3.0),
        Stroke::dash_dotted(ColorU8::BLACK, 3.0).with_join(LineJoin::Round),
    ] {
        let name = format!("{}:{}", stroke.join, stroke.dash);
        let builder = StrokeBuilder::new(1.0, Quality::default());
        let id = BenchmarkId::new("geometry", &name);
        group.bench_with_input(id, &stroke, |b, stroke| {
            b.iter_with_large_drop(|| {
                builder.stroke_polyline(&wave, stroke, &StrokeEnd::CAP, &arrow)
            })
        });

        let mut painter = Painter::new(clip());
        let mut recorder = SpanRecorder::new();
        let id = BenchmarkId::new("spans", &name);
        group.bench_with_input(id, &stroke, |b, stroke| {
            b.iter(|| {
                recorder.clear();
                painter.stroke_polyline(&wave, stroke, &StrokeEnd::CAP, &arrow, &mut recorder);
            })
        });
    }
    group.finish();
}

criterion_group!(
    name = rasterize;
    config = Criterion::default().sample_size(10).warm_up_time(Duration::new(1, 0));
    targets = curve_benchmark, fill_benchmark, stroke_benchmark
);
criterion_main!(rasterize);
