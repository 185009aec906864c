use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum_typed_multipart::TypedMultipart;
use log::info;
use serde_json::{Value, json};
use tokio::task::block_in_place;

use super::error::{MissingFieldError, Result};
use super::state::AppState;
use super::types::*;
use crate::metrics;

/// 添加一张图片到数据库
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = UploadResponse),
    )
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    data: TypedMultipart<UploadRequest>,
) -> Result<Json<Value>> {
    let category = data.category.trim();
    if category.is_empty() {
        return Err(MissingFieldError("category").into());
    }
    let filename = data.file.metadata.file_name.as_deref().unwrap_or("upload");

    let hash = blake3::hash(&data.file.contents);
    if let Some(id) = state.db.check_hash(hash.as_bytes()).await? {
        info!("图片已存在: id = {id}");
        return Ok(Json(json!({ "id": id, "duplicate": true })));
    }

    let descriptors = block_in_place(|| state.db.extractor().extract_bytes(&data.file.contents))?;
    let id = state
        .db
        .add_image(filename, category, hash.as_bytes(), &descriptors, Some(&data.file.contents[..]))
        .await?;
    info!("图片入库: id = {id}, category = {category}");

    Ok(Json(json!({ "id": id, "duplicate": false })))
}

/// 搜索一张图片
#[utoipa::path(
    post,
    path = "/search",
    request_body(content = SearchForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = SearchResponse),
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    data: TypedMultipart<SearchRequest>,
) -> Result<Json<Value>> {
    // 处理上传的文件和参数
    let count = data.count.unwrap_or(state.search.count);
    let category = data.category.as_deref().or(state.search.category.as_deref());

    let start = Instant::now();

    info!("正在搜索上传图片");

    let (size, descriptors) = block_in_place(|| -> Result<_> {
        let image = state.db.extractor().decode(&data.file.contents)?;
        let descriptors = state.db.extractor().extract(&image);
        Ok((image.dimensions(), descriptors))
    })?;

    let result = state.db.search(&descriptors, category, count).await?;

    metrics::inc_image_count(size, category);
    metrics::observe_search_duration(size, category, start.elapsed().as_secs_f32());
    if let Some(top) = result.first() {
        metrics::observe_top_score(size, category, top.score);
    }

    Ok(Json(json!({
        "time": start.elapsed().as_millis(),
        "result": result,
    })))
}

/// 提取一张图片的描述符，不入库
#[utoipa::path(
    post,
    path = "/features",
    request_body(content = FeaturesForm, content_type = "multipart/form-data")
)]
pub async fn features_handler(
    State(state): State<Arc<AppState>>,
    data: TypedMultipart<FeaturesRequest>,
) -> Result<Json<Value>> {
    let descriptors = block_in_place(|| state.db.extractor().extract_bytes(&data.file.contents))?;
    Ok(Json(json!({
        "histogram": descriptors.histogram,
        "palette": descriptors.palette,
        "texture": descriptors.texture,
        "moments": descriptors.moments,
    })))
}

/// 提交相关性反馈
#[utoipa::path(
    post,
    path = "/feedback",
    request_body = FeedbackRequest
)]
pub async fn feedback_handler(
    State(state): State<Arc<AppState>>,
    data: Json<FeedbackRequest>,
) -> Result<Json<Value>> {
    state.db.record_feedback(&data.relevant_ids, &data.irrelevant_ids);
    Ok(Json(json!({ "message": "feedback received" })))
}
