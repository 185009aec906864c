use log::warn;
use serde::Serialize;

use crate::config::ScoreWeights;
use crate::extract::{Descriptors, TEXTURE_LEN};
use crate::shape::MOMENT_COUNT;

/// 待评分的候选记录
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: i64,
    pub descriptors: Descriptors,
    pub category: String,
}

/// 单条搜索结果
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityResult {
    pub id: i64,
    pub score: f32,
    pub category: String,
}

/// 各描述符分块的相似度
#[derive(Debug, Clone, Copy)]
pub struct BlockScores {
    pub histogram: f32,
    pub texture: f32,
    pub shape: f32,
}

/// OpenCV 形式的 Bhattacharyya 距离
///
/// d = sqrt(max(1 - Σ√(a·b) / √(Σa·Σb), 0))。两个全零直方图视为完全
/// 相同（d = 0），只有一边全零视为完全不同（d = 1）。
pub fn bhattacharyya(a: &[f32], b: &[f32]) -> f32 {
    let mut sum_a = 0f64;
    let mut sum_b = 0f64;
    let mut sum_ab = 0f64;
    for (&x, &y) in a.iter().zip(b) {
        sum_a += x as f64;
        sum_b += y as f64;
        sum_ab += (x as f64 * y as f64).sqrt();
    }

    if sum_a <= f64::EPSILON || sum_b <= f64::EPSILON {
        let both_zero = sum_a <= f64::EPSILON && sum_b <= f64::EPSILON;
        return if both_zero { 0.0 } else { 1.0 };
    }

    let d = 1.0 - sum_ab / (sum_a * sum_b).sqrt();
    d.max(0.0).sqrt() as f32
}

/// 两个等长向量的欧氏距离
fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = (x - y) as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt() as f32
}

/// 组合相似度计算器，权重在构造时注入
pub struct Scorer {
    weights: ScoreWeights,
}

impl Scorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// 分块相似度
    ///
    /// 直方图用 1 - Bhattacharyya 距离；纹理和形状用欧氏距离的线性
    /// 映射 1 - d/len。后两者在距离很大时可以为负，沿用不截断的约定。
    pub fn block_scores(&self, query: &Descriptors, candidate: &Descriptors) -> BlockScores {
        BlockScores {
            histogram: 1.0 - bhattacharyya(&query.histogram, &candidate.histogram),
            texture: 1.0 - l2_distance(&query.texture, &candidate.texture) / TEXTURE_LEN as f32,
            shape: 1.0 - l2_distance(&query.moments, &candidate.moments) / MOMENT_COUNT as f32,
        }
    }

    /// 组合得分 = 0.4 直方图 + 0.3 纹理 + 0.3 形状（权重可注入）
    pub fn score(&self, query: &Descriptors, candidate: &Descriptors) -> f32 {
        let s = self.block_scores(query, candidate);
        self.weights.histogram * s.histogram
            + self.weights.texture * s.texture
            + self.weights.shape * s.shape
    }

    /// 对候选快照全量评分，按得分降序返回前 limit 条
    ///
    /// 长度不合法的候选记录跳过并告警，不会中断整次搜索。排序是
    /// 稳定的，得分相同的记录保持快照中的先后顺序。
    pub fn rank(
        &self,
        query: &Descriptors,
        candidates: &[Candidate],
        limit: usize,
    ) -> Vec<SimilarityResult> {
        let mut results: Vec<SimilarityResult> = candidates
            .iter()
            .filter_map(|candidate| {
                if !candidate.descriptors.well_formed() {
                    warn!("描述符长度不合法，跳过 id = {}", candidate.id);
                    return None;
                }
                Some(SimilarityResult {
                    id: candidate.id,
                    score: self.score(query, &candidate.descriptors),
                    category: candidate.category.clone(),
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);
        results
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;
    use crate::config::FeatureConfig;
    use crate::extract::FeatureExtractor;

    fn descriptors_of(color: [u8; 3]) -> Descriptors {
        let image = RgbImage::from_pixel(50, 50, Rgb(color));
        FeatureExtractor::new(FeatureConfig::default())
            .with_seed(42)
            .extract(&image)
    }

    fn candidate(id: i64, descriptors: Descriptors) -> Candidate {
        Candidate { id, descriptors, category: "test".to_string() }
    }

    #[test]
    fn test_bhattacharyya_identical() {
        let h = vec![0.5, 0.5, 0.0, 0.7071];
        assert!(bhattacharyya(&h, &h).abs() < 1e-6);
    }

    #[test]
    fn test_bhattacharyya_disjoint() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((bhattacharyya(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bhattacharyya_zero_guards() {
        let zero = vec![0.0; 4];
        let h = vec![0.25; 4];
        assert_eq!(bhattacharyya(&zero, &zero), 0.0);
        assert_eq!(bhattacharyya(&zero, &h), 1.0);
        assert_eq!(bhattacharyya(&h, &zero), 1.0);
    }

    #[test]
    fn test_self_score_is_one() {
        let red = descriptors_of([255, 0, 0]);
        let scorer = Scorer::new(ScoreWeights::default());
        assert!((scorer.score(&red, &red) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_score_symmetry() {
        let red = descriptors_of([255, 0, 0]);
        let green = descriptors_of([0, 255, 0]);
        let scorer = Scorer::new(ScoreWeights::default());
        let ab = scorer.score(&red, &green);
        let ba = scorer.score(&green, &red);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let red = descriptors_of([255, 0, 0]);
        let candidates = vec![
            candidate(1, descriptors_of([0, 0, 255])),
            candidate(2, descriptors_of([255, 0, 0])),
            candidate(3, descriptors_of([0, 255, 0])),
        ];
        let scorer = Scorer::new(ScoreWeights::default());

        let results = scorer.rank(&red, &candidates, 20);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, 2);
        // 得分非递增
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }

        let results = scorer.rank(&red, &candidates, 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_rank_empty_candidates() {
        let red = descriptors_of([255, 0, 0]);
        let scorer = Scorer::new(ScoreWeights::default());
        assert!(scorer.rank(&red, &[], 20).is_empty());
    }

    #[test]
    fn test_rank_skips_malformed() {
        let red = descriptors_of([255, 0, 0]);
        let mut broken = descriptors_of([255, 0, 0]);
        broken.histogram.pop();

        let candidates = vec![candidate(1, broken), candidate(2, descriptors_of([255, 0, 0]))];
        let scorer = Scorer::new(ScoreWeights::default());

        let results = scorer.rank(&red, &candidates, 20);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 2);
    }

    #[test]
    fn test_rank_stable_on_ties() {
        let red = descriptors_of([255, 0, 0]);
        let candidates = vec![
            candidate(7, descriptors_of([255, 0, 0])),
            candidate(3, descriptors_of([255, 0, 0])),
        ];
        let scorer = Scorer::new(ScoreWeights::default());

        // 得分完全相同时保持快照顺序
        let results = scorer.rank(&red, &candidates, 20);
        assert_eq!(results[0].id, 7);
        assert_eq!(results[1].id, 3);
    }
}
