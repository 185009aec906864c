use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

/// k-means 聚类结果
#[derive(Debug, Clone, Default)]
pub struct KMeansState {
    /// 所有向量到所属中心的距离平方和
    pub inertia: f64,
    /// 聚类中心
    pub centroids: Vec<[f32; 3]>,
    /// 每个中心分配到的向量数量
    pub centroid_frequency: Vec<usize>,
}

/// 对颜色向量做 k-means 聚类
///
/// 重复 `attempts` 次独立聚类，返回 inertia 最小的一次。每次聚类用
/// Forgy 方式从数据中随机抽取不重复的初始中心，所有中心单轮移动距离
/// 都小于 `eps` 或达到 `max_iter` 轮时停止。
///
/// # Arguments
///
/// * `data` - 待聚类的颜色向量
/// * `k` - 聚类中心数量
/// * `attempts` - 独立重复次数
/// * `eps` - 收敛阈值（中心移动的欧氏距离）
/// * `max_iter` - 单次聚类的最大迭代轮数
/// * `seed` - 随机种子，测试中固定后结果可复现
pub fn kmeans(
    data: &[[f32; 3]],
    k: usize,
    attempts: usize,
    eps: f32,
    max_iter: usize,
    seed: Option<u64>,
) -> KMeansState {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let mut best: Option<KMeansState> = None;
    for _ in 0..attempts.max(1) {
        let state = kmeans_once(data, k, eps, max_iter, &mut rng);
        if best.as_ref().is_none_or(|b| state.inertia < b.inertia) {
            best = Some(state);
        }
    }
    best.unwrap_or_default()
}

fn kmeans_once(
    data: &[[f32; 3]],
    k: usize,
    eps: f32,
    max_iter: usize,
    rng: &mut StdRng,
) -> KMeansState {
    if data.is_empty() || k == 0 {
        return KMeansState::default();
    }

    // Forgy 初始化：随机抽取 k 个不重复的数据点
    let mut centroids: Vec<[f32; 3]> = data.choose_multiple(rng, k).cloned().collect();
    while centroids.len() < k {
        // 数据点不足 k 个时允许重复
        centroids.push(*data.choose(rng).unwrap());
    }

    for _ in 0..max_iter {
        let (assignments, _) = update_assignments(data, &centroids);
        let new_centroids = update_centroids(data, &assignments, &centroids, k);

        let moved = centroids
            .iter()
            .zip(&new_centroids)
            .map(|(a, b)| distance2(a, b))
            .fold(0f32, f32::max);
        centroids = new_centroids;

        // 所有中心的移动量都小于 eps 时认为收敛
        if moved < eps * eps {
            break;
        }
    }

    // 收敛后重新统计一次最终分配
    let (assignments, inertia) = update_assignments(data, &centroids);
    let mut centroid_frequency = vec![0usize; k];
    for &cluster in &assignments {
        centroid_frequency[cluster] += 1;
    }

    KMeansState { inertia, centroids, centroid_frequency }
}

/// 把每个向量分配到最近的中心，返回分配结果和总距离
fn update_assignments(data: &[[f32; 3]], centroids: &[[f32; 3]]) -> (Vec<usize>, f64) {
    let (assignments, distances): (Vec<_>, Vec<_>) = data
        .par_iter()
        .map(|point| {
            let mut min_distance = f32::INFINITY;
            let mut best_cluster = 0;
            for (j, centroid) in centroids.iter().enumerate() {
                let distance = distance2(point, centroid);
                if distance < min_distance {
                    min_distance = distance;
                    best_cluster = j;
                }
            }
            (best_cluster, min_distance as f64)
        })
        .unzip();

    let inertia = distances.iter().sum();
    (assignments, inertia)
}

/// 重新计算中心，空聚类用离所属中心最远的点重新播种
fn update_centroids(
    data: &[[f32; 3]],
    assignments: &[usize],
    centroids: &[[f32; 3]],
    k: usize,
) -> Vec<[f32; 3]> {
    let mut sums = vec![[0f64; 3]; k];
    let mut counts = vec![0usize; k];
    for (point, &cluster) in data.iter().zip(assignments) {
        for c in 0..3 {
            sums[cluster][c] += point[c] as f64;
        }
        counts[cluster] += 1;
    }

    (0..k)
        .map(|i| {
            if counts[i] == 0 {
                farthest_point(data, assignments, centroids)
            } else {
                let mut centroid = [0f32; 3];
                for c in 0..3 {
                    centroid[c] = (sums[i][c] / counts[i] as f64) as f32;
                }
                centroid
            }
        })
        .collect()
}

fn farthest_point(data: &[[f32; 3]], assignments: &[usize], centroids: &[[f32; 3]]) -> [f32; 3] {
    let mut best = data[0];
    let mut best_distance = -1f32;
    for (point, &cluster) in data.iter().zip(assignments) {
        let distance = distance2(point, &centroids[cluster]);
        if distance > best_distance {
            best_distance = distance;
            best = *point;
        }
    }
    best
}

#[inline]
fn distance2(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let mut sum = 0f32;
    for c in 0..3 {
        let d = a[c] - b[c];
        sum += d * d;
    }
    sum
}
