use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::Deserialize;
use utoipa::ToSchema;

/// 上传请求参数
#[derive(TryFromMultipart)]
pub struct UploadRequest {
    pub file: FieldData<Bytes>,
    pub category: String,
}

/// 搜索请求参数
#[derive(TryFromMultipart)]
pub struct SearchRequest {
    pub file: FieldData<Bytes>,
    pub category: Option<String>,
    pub count: Option<usize>,
}

/// 特征提取请求参数
#[derive(TryFromMultipart)]
pub struct FeaturesRequest {
    pub file: FieldData<Bytes>,
}

/// 相关性反馈参数
#[derive(Debug, Deserialize, ToSchema)]
pub struct FeedbackRequest {
    /// 用户标记为相关的图片 ID
    #[serde(default)]
    pub relevant_ids: Vec<i64>,
    /// 用户标记为不相关的图片 ID
    #[serde(default)]
    pub irrelevant_ids: Vec<i64>,
}

/// 上传表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct UploadForm {
    /// 上传的图片文件
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// 图片分类
    pub category: String,
}

/// 搜索表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct SearchForm {
    /// 上传的图片文件
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// 限定搜索的图片分类
    pub category: Option<String>,
    /// 返回的结果数量
    pub count: Option<usize>,
}

/// 特征提取表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct FeaturesForm {
    /// 上传的图片文件
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// 上传响应
#[derive(Debug, ToSchema)]
pub struct UploadResponse {
    /// 图片 ID
    pub id: i64,
    /// 是否与已有图片重复
    pub duplicate: bool,
}

/// 搜索响应
#[derive(Debug, ToSchema)]
pub struct SearchResponse {
    /// 搜索耗时，单位为毫秒
    pub time: u32,
    /// 搜索结果，按相似度降序排列
    pub result: Vec<SimilarityEntry>,
}

/// 单条搜索结果
#[derive(Debug, ToSchema)]
pub struct SimilarityEntry {
    /// 图片 ID
    pub id: i64,
    /// 综合相似度
    pub score: f32,
    /// 图片分类
    pub category: String,
}
