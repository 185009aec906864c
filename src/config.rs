use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "", "visearch").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap()
}

/// 特征提取相关的选项
#[derive(Parser, Debug, Clone)]
pub struct ExtractOptions {
    /// 固定主色聚类的随机种子，用于复现结果
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

/// 搜索相关的选项
#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 显示的结果数量
    #[arg(long, value_name = "COUNT", default_value_t = 20)]
    pub count: usize,
    /// 限定搜索的图片分类
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<String>,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "visearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// visearch 数据目录
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 扫描目录，将图片特征添加到数据库
    Add(AddCommand),
    /// 用一张图片从数据库中搜索相似图片
    Search(SearchCommand),
    /// 查看一张图片的描述符
    Show(ShowCommand),
    /// 启动 HTTP 搜索服务
    Server(ServerCommand),
    /// 导出全部直方图特征
    Export(ExportCommand),
}

/// 数据目录，存放数据库文件和上传的图片
#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("visearch.db")
    }

    /// 返回上传图片的保存目录
    pub fn uploads(&self) -> PathBuf {
        self.path.join("uploads")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

/// 特征提取参数，构造后不再变化
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// 主色数量（k-means 的 k）
    pub palette_size: usize,
    /// k-means 独立重复次数，取 inertia 最小的一次
    pub kmeans_attempts: usize,
    /// k-means 收敛阈值（单轮中心移动的欧氏距离）
    pub kmeans_eps: f32,
    /// k-means 单次最大迭代轮数
    pub kmeans_max_iter: usize,
    /// Gabor 滤波频率组，单位为周期/像素
    pub frequencies: Vec<f32>,
    /// Canny 低阈值
    pub canny_low: f32,
    /// Canny 高阈值
    pub canny_high: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            palette_size: 5,
            kmeans_attempts: 10,
            kmeans_eps: 0.2,
            kmeans_max_iter: 100,
            frequencies: vec![0.1, 0.2, 0.3, 0.4],
            canny_low: 100.0,
            canny_high: 200.0,
        }
    }
}

/// 组合评分权重
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    /// 颜色直方图相似度权重
    pub histogram: f32,
    /// 纹理能量相似度权重
    pub texture: f32,
    /// 形状不变矩相似度权重
    pub shape: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self { histogram: 0.4, texture: 0.3, shape: 0.3 }
    }
}
