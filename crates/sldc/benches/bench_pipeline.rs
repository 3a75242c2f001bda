use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sldc::image::{Image, ImageSize};
use sldc::imgproc::color::StainDeconvolution;
use sldc::{Locator, Segmenter, SegmenterConfig};

// dark disks scattered on a pale background
fn create_test_tile(size: usize) -> Image<u8, 3> {
    let mut rng = StdRng::seed_from_u64(0);
    let mut tile = Image::from_size_val(
        ImageSize {
            width: size,
            height: size,
        },
        230u8,
    )
    .unwrap();
    for _ in 0..size / 8 {
        let cx = rng.random_range(0..size) as i64;
        let cy = rng.random_range(0..size) as i64;
        let r = rng.random_range(4..12i64);
        for y in (cy - r).max(0)..(cy + r).min(size as i64) {
            for x in (cx - r).max(0)..(cx + r).min(size as i64) {
                if (x - cx).pow(2) + (y - cy).pow(2) <= r * r {
                    for (c, v) in [70u8, 50, 140].into_iter().enumerate() {
                        tile.set_pixel(x as usize, y as usize, c, v).unwrap();
                    }
                }
            }
        }
    }
    tile
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pipeline");
    let segmenter = Segmenter::new(
        StainDeconvolution::hematoxylin().unwrap(),
        SegmenterConfig::default(),
    )
    .unwrap();
    let locator = Locator::default();

    for size in [256, 512].iter() {
        let tile = create_test_tile(*size);
        let mask = segmenter.segment(&tile).unwrap();
        let parameter_string = format!("{}x{}", size, size);

        group.bench_with_input(
            BenchmarkId::new("segment", &parameter_string),
            &tile,
            |b, tile| b.iter(|| segmenter.segment(tile).unwrap()),
        );

        group.bench_with_input(
            BenchmarkId::new("locate", &parameter_string),
            &mask,
            |b, mask| b.iter(|| locator.locate(mask, Some((1024, 2048))).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
