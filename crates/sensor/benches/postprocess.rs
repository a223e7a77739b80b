use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ndarray::Array2;
use preprocess::Placement;
use sensor::{OutputTensor, processing::PostProcessor};

const NUM_CLASSES: usize = 80;
const NUM_CANDIDATES: usize = 8400;

/// YOLO-style output with `num_hits` confident candidates, the rest near zero.
///
/// Hits come in pairs of overlapping boxes so suppression has work to do.
fn create_mock_output(num_hits: usize) -> OutputTensor {
    let mut data = Array2::from_elem((4 + NUM_CLASSES, NUM_CANDIDATES), 0.01f32);

    for i in 0..num_hits.min(NUM_CANDIDATES) {
        let slot = (i / 2) as f32;
        data[[0, i]] = 40.0 + (slot * 37.0) % 560.0 + (i % 2) as f32 * 4.0;
        data[[1, i]] = 40.0 + (slot * 53.0) % 560.0;
        data[[2, i]] = 60.0;
        data[[3, i]] = 60.0;
        data[[4 + i % NUM_CLASSES, i]] = 0.6 + (i % 4) as f32 * 0.1;
    }

    OutputTensor::from_array(data).unwrap()
}

fn benchmark_postprocess(c: &mut Criterion) {
    let mut group = c.benchmark_group("postprocess");

    let placement = Placement::stretch((1280, 720), (640, 640));
    let mut postprocessor = PostProcessor::new(0.5, 0.45);

    for num_hits in [0, 10, 100, 500] {
        let output = create_mock_output(num_hits);

        group.bench_with_input(
            BenchmarkId::new("decode_nms_84x8400", num_hits),
            &output,
            |b, output| {
                b.iter(|| {
                    let detections =
                        postprocessor.process(black_box(output), &placement, (1280, 720));
                    black_box(detections)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_postprocess);
criterion_main!(benches);
