use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::extract::DecodeError;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// API错误类型
pub struct AppError(pub anyhow::Error);

/// 表单缺少必要字段
#[derive(Debug)]
pub struct MissingFieldError(pub &'static str);

impl std::fmt::Display for MissingFieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "缺少必要字段: {}", self.0)
    }
}

impl std::error::Error for MissingFieldError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // 无法解码的上传和缺字段的表单算请求方的错，其余一律 500
        let status = if self.0.is::<DecodeError>() || self.0.is::<MissingFieldError>() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, format!("Something went wrong: {}", self.0)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
