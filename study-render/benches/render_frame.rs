use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use study_render::{FrameRenderer, ImageAssets, SkiaSurface};
use tiny_skia::{Color, Pixmap};

fn harness() -> (SkiaSurface, FrameRenderer) {
    let width = 1280u32;
    let height = 720u32;
    let mut assets = ImageAssets::new();
    for (token, shade) in [("cat.jpg", 200u8), ("dog.png", 90u8)] {
        let mut pm = Pixmap::new(400, 300).unwrap();
        pm.fill(Color::from_rgba8(shade, shade, 255, 255));
        assets.insert(token, pm);
    }
    let surface = SkiaSurface::new(width, height, assets).unwrap();
    (surface, FrameRenderer::new(true))
}

pub fn bench_compose_group(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_frame");
    g.sample_size(40);

    g.bench_function("grouped_images", |b| {
        b.iter_batched(
            harness,
            |(mut surface, renderer)| {
                let items = ["cat.jpg".to_string(), "dog.png".to_string()];
                renderer.mount(&mut surface);
                renderer.render(&mut surface, &items);
                black_box(surface.compose().data().len());
            },
            BatchSize::SmallInput,
        )
    });

    g.bench_function("blank_gap", |b| {
        b.iter_batched(
            harness,
            |(mut surface, renderer)| {
                renderer.render(&mut surface, &["cat.jpg".to_string()]);
                surface.compose();
                renderer.hide(&mut surface);
                black_box(surface.compose().data().len());
            },
            BatchSize::SmallInput,
        )
    });

    g.finish();
}

criterion_group!(benches, bench_compose_group);
criterion_main!(benches);
