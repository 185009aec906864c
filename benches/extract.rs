use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use visearch::config::FeatureConfig;
use visearch::extract::FeatureExtractor;
use visearch::histogram::color_histogram;
use visearch::texture::texture_energy;

// 生成随机噪声图片
fn noise_image(width: u32, height: u32) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(42); // 使用固定种子确保结果可重现
    RgbImage::from_fn(width, height, |_, _| Rgb([rng.random(), rng.random(), rng.random()]))
}

fn bench_extract(c: &mut Criterion) {
    let image = noise_image(256, 256);
    let extractor = FeatureExtractor::new(FeatureConfig::default()).with_seed(42);
    let gray = visearch::extract::rgb_to_gray(&image);
    let frequencies = FeatureConfig::default().frequencies;

    let mut group = c.benchmark_group("extract_256x256");
    group.sample_size(10);

    group.bench_function("histogram", |b| b.iter(|| color_histogram(black_box(&image))));

    group.bench_function("texture", |b| {
        b.iter(|| texture_energy(black_box(&gray), black_box(&frequencies)))
    });

    group.bench_function("full_pipeline", |b| b.iter(|| extractor.extract(black_box(&image))));

    group.finish();
}

criterion_group!(benches, bench_extract);
criterion_main!(benches);
