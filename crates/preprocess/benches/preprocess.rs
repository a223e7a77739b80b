use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use preprocess::{NormalizationRecipe, TensorCodec};

/// Create raw BGR pixel buffer for benchmarking (gradient pattern)
fn create_test_pixels(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = vec![0u8; (width * height * 3) as usize];
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            pixels[idx] = (x % 256) as u8;
            pixels[idx + 1] = (y % 256) as u8;
            pixels[idx + 2] = ((x + y) % 256) as u8;
        }
    }
    pixels
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("tensor_codec");

    let resolutions = [(640, 480), (1280, 720), (1920, 1080)];

    for keep_aspect in [false, true] {
        let recipe = NormalizationRecipe {
            keep_aspect,
            ..Default::default()
        };
        let mut codec = TensorCodec::new((640, 640), recipe);
        let mode = if keep_aspect { "letterbox" } else { "stretch" };

        for (width, height) in resolutions.iter() {
            let pixels = create_test_pixels(*width, *height);

            group.bench_with_input(
                BenchmarkId::new(mode, format!("{}x{}", width, height)),
                &pixels,
                |b, pixels| {
                    b.iter(|| {
                        let placement = codec
                            .encode(black_box(pixels), *width, *height)
                            .unwrap();
                        black_box(placement)
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_encode);
criterion_main!(benches);
