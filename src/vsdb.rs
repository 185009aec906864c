use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::Result;
use log::{debug, info, warn};
use ndarray::{Array2, ArrayView, Axis};
use regex::Regex;

use crate::config::{ConfDir, FeatureConfig, ScoreWeights};
use crate::db::{self, Database, FeatureRecord, ImageRecord, crud};
use crate::extract::{Descriptors, FeatureExtractor};
use crate::histogram::HIST_LEN;
use crate::score::{Candidate, Scorer, SimilarityResult};

static SAFE_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("failed to build regex"));

/// 图片特征数据库
///
/// 描述符和元数据存放在 sqlite 中，HTTP 上传的原图保存在数据目录下。
/// 搜索时一次性读出特征快照做全量评分。
pub struct VSDB {
    conf_dir: ConfDir,
    db: Database,
    extractor: FeatureExtractor,
    scorer: Scorer,
}

pub struct VSDBBuilder {
    conf_dir: ConfDir,
    feature: FeatureConfig,
    weights: ScoreWeights,
    seed: Option<u64>,
}

impl VSDBBuilder {
    pub fn new(conf_dir: ConfDir) -> Self {
        Self {
            conf_dir,
            feature: FeatureConfig::default(),
            weights: ScoreWeights::default(),
            seed: None,
        }
    }

    /// 覆盖特征提取参数
    pub fn feature(mut self, feature: FeatureConfig) -> Self {
        self.feature = feature;
        self
    }

    /// 覆盖评分权重
    pub fn weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// 固定主色聚类的随机种子
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub async fn open(self) -> Result<VSDB> {
        if !self.conf_dir.path().exists() {
            std::fs::create_dir_all(self.conf_dir.path())?;
        }
        let db = db::init_db(self.conf_dir.database()).await?;

        let mut extractor = FeatureExtractor::new(self.feature);
        if let Some(seed) = self.seed {
            extractor = extractor.with_seed(seed);
        }

        Ok(VSDB { conf_dir: self.conf_dir, db, extractor, scorer: Scorer::new(self.weights) })
    }
}

impl VSDB {
    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// 检查内容哈希是否已存在，存在时返回记录 id
    pub async fn check_hash(&self, hash: &[u8]) -> Result<Option<i64>> {
        Ok(crud::find_image_by_hash(&self.db, hash).await?)
    }

    /// 添加一张图片
    ///
    /// 记录插入和原图落盘在同一个事务内完成，任何一步失败都不会留下
    /// 不完整的记录。`bytes` 为 None 时只登记元数据（本地目录扫描场景）。
    pub async fn add_image(
        &self,
        filename: &str,
        category: &str,
        hash: &[u8],
        descriptors: &Descriptors,
        bytes: Option<&[u8]>,
    ) -> Result<i64> {
        let encoded = encode_descriptors(descriptors)?;

        let mut tx = self.db.begin().await?;
        let id = crud::add_image(
            &mut *tx,
            &crud::NewImage {
                hash,
                filename,
                category,
                histogram: &encoded.histogram,
                palette: &encoded.palette,
                texture: &encoded.texture,
                moments: &encoded.moments,
            },
        )
        .await?;

        if let Some(bytes) = bytes {
            let path = self.upload_path(id, filename);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, bytes).await?;
        }
        tx.commit().await?;

        Ok(id)
    }

    /// 重复图片覆盖入库时更新文件名与分类
    pub async fn update_image_meta(
        &self,
        hash: &[u8],
        filename: &str,
        category: &str,
    ) -> Result<()> {
        Ok(crud::update_image_meta(&self.db, hash, filename, category).await?)
    }

    /// 按 id 获取图片记录
    pub async fn get_image(&self, id: i64) -> Result<Option<ImageRecord>> {
        Ok(crud::get_image(&self.db, id).await?)
    }

    /// 查询数据库中的图片数量
    pub async fn count(&self) -> Result<i64> {
        Ok(crud::count_images(&self.db).await?)
    }

    /// 用查询描述符对候选快照做全量评分，返回前 limit 条结果
    pub async fn search(
        &self,
        query: &Descriptors,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SimilarityResult>> {
        let start = std::time::Instant::now();

        let records = crud::get_features(&self.db, category).await?;
        debug!("载入 {} 条候选特征", records.len());

        let candidates: Vec<_> = records.into_iter().filter_map(decode_candidate).collect();
        let results = self.scorer.rank(query, &candidates, limit);

        debug!("search time: {:.2}s", start.elapsed().as_secs_f32());
        Ok(results)
    }

    /// 导出全部直方图为二维数组，一行一张图片
    pub async fn export(&self) -> Result<Array2<f32>> {
        let records = crud::get_features(&self.db, None).await?;
        let mut array = Array2::zeros((0, HIST_LEN));
        for record in records {
            let histogram: Vec<f32> = bincode::deserialize(&record.histogram)?;
            array.push(Axis(0), ArrayView::from(&histogram))?;
        }
        Ok(array)
    }

    /// 相关反馈接口，目前只做记录，不调整权重
    pub fn record_feedback(&self, relevant: &[i64], irrelevant: &[i64]) {
        info!("收到相关反馈: {} 条相关，{} 条不相关", relevant.len(), irrelevant.len());
    }

    /// 上传图片的落盘路径，文件名过滤掉特殊字符
    fn upload_path(&self, id: i64, filename: &str) -> PathBuf {
        let name = SAFE_FILENAME.replace_all(filename, "_");
        self.conf_dir.uploads().join(format!("{id}_{name}"))
    }
}

struct EncodedDescriptors {
    histogram: Vec<u8>,
    palette: Vec<u8>,
    texture: Vec<u8>,
    moments: Vec<u8>,
}

fn encode_descriptors(descriptors: &Descriptors) -> Result<EncodedDescriptors> {
    Ok(EncodedDescriptors {
        histogram: bincode::serialize(&descriptors.histogram)?,
        palette: bincode::serialize(&descriptors.palette)?,
        texture: bincode::serialize(&descriptors.texture)?,
        moments: bincode::serialize(&descriptors.moments)?,
    })
}

fn decode_descriptors(record: &FeatureRecord) -> Result<Descriptors> {
    Ok(Descriptors {
        histogram: bincode::deserialize(&record.histogram)?,
        palette: bincode::deserialize(&record.palette)?,
        texture: bincode::deserialize(&record.texture)?,
        moments: bincode::deserialize(&record.moments)?,
    })
}

/// 反序列化失败的记录跳过并告警，不会中断整次搜索
fn decode_candidate(record: FeatureRecord) -> Option<Candidate> {
    match decode_descriptors(&record) {
        Ok(descriptors) => {
            Some(Candidate { id: record.id, descriptors, category: record.category })
        }
        Err(e) => {
            warn!("描述符反序列化失败，跳过 id = {}: {e}", record.id);
            None
        }
    }
}
