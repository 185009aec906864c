use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use visearch::kmeans::kmeans;

// 生成有聚类模式的测试数据：RGB 颜色点
fn generate_clustered_data(n: usize, num_clusters: usize) -> Vec<[f32; 3]> {
    let mut rng = StdRng::seed_from_u64(42); // 使用固定种子确保结果可重现

    // 生成聚类中心
    let mut centers = vec![[0f32; 3]; num_clusters];
    for center in &mut centers {
        for v in center.iter_mut() {
            *v = rng.random_range(0.0..255.0);
        }
    }

    // 在聚类中心附近生成数据（添加少量噪声）
    (0..n)
        .map(|i| {
            let base = centers[i % num_clusters];
            [
                (base[0] + rng.random_range(-10.0..10.0)).clamp(0.0, 255.0),
                (base[1] + rng.random_range(-10.0..10.0)).clamp(0.0, 255.0),
                (base[2] + rng.random_range(-10.0..10.0)).clamp(0.0, 255.0),
            ]
        })
        .collect()
}

fn bench_kmeans(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmeans_rgb");

    for (n, k) in [(10_000, 5), (100_000, 5)] {
        let data = black_box(generate_clustered_data(n, k));

        group.bench_function(format!("kmeans_{n}_{k}"), |b| {
            b.iter(|| kmeans(&data, k, 10, 0.2, 100, Some(42)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kmeans);
criterion_main!(benches);
