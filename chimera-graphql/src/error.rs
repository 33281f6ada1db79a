//! 错误类型
//!
//! 校验失败统一转换为 `WebError::BadRequest`，携带结构化的问题列表；
//! 其他错误保持原样向上传播

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chimera_schema::{Issue, SchemaError};
use serde_json::Value;
use thiserror::Error;

use crate::constants::BAD_REQUEST_MESSAGE;

/// Web 层错误类型
#[derive(Error, Debug)]
pub enum WebError {
    /// 参数或返回值校验失败 - 400 Bad Request
    #[error("Bad request: {message}")]
    BadRequest { message: String, issues: Vec<Issue> },

    /// JSON 解析错误 - 400 Bad Request
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// 操作不存在 - 404 Not Found
    #[error("Operation not found: {0}")]
    NotFound(String),

    /// 操作重复注册 - 409 Conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 内部服务器错误 - 500 Internal Server Error
    #[error("Internal server error: {0}")]
    Internal(String),

    /// 包装用户自定义的业务错误
    #[error("Business error: {0}")]
    UserDefined(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl WebError {
    /// 使用问题列表构造 400 错误
    pub fn bad_request(issues: Vec<Issue>) -> Self {
        WebError::BadRequest {
            message: BAD_REQUEST_MESSAGE.to_string(),
            issues,
        }
    }

    /// 包装任意业务错误
    pub fn user_defined<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        WebError::UserDefined(Box::new(error))
    }

    /// 获取错误对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            WebError::JsonParse { .. } => StatusCode::BAD_REQUEST,
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::Conflict(_) => StatusCode::CONFLICT,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebError::UserDefined(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 校验问题（仅 `BadRequest`）
    pub fn issues(&self) -> Option<&[Issue]> {
        match self {
            WebError::BadRequest { issues, .. } => Some(issues),
            _ => None,
        }
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(self, WebError::BadRequest { .. })
    }

    /// 获取错误详情（用于 JSON 响应）
    pub fn details(&self) -> Option<Value> {
        self.issues()
            .and_then(|issues| serde_json::to_value(issues).ok())
    }
}

impl From<SchemaError> for WebError {
    fn from(error: SchemaError) -> Self {
        WebError::bad_request(error.issues)
    }
}

/// 标准错误响应格式
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>, // 额外错误详情
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: String, message: String, path: String) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.as_u16(),
            error,
            message,
            path,
            details: None,
        }
    }

    /// 从 `WebError` 构造，`path` 为操作路径（例如 `query.getUser`）
    pub fn from_error(error: &WebError, path: impl Into<String>) -> Self {
        let status = error.status_code();
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown Error").to_string(),
            message: error.to_string(),
            path: path.into(),
            details: error.details(),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// 实现 IntoResponse，使 WebError 可以直接作为 Handler 返回值
impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        ErrorResponse::from_error(&self, "unknown").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimera_schema::prelude::*;
    use serde_json::json;

    #[test]
    fn test_schema_error_becomes_bad_request() {
        let error = string().parse(&json!(1)).unwrap_err();
        let web_error = WebError::from(error.clone());

        assert!(web_error.is_bad_request());
        assert_eq!(web_error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(web_error.issues().unwrap(), error.issues.as_slice());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(WebError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(WebError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            WebError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            WebError::user_defined(std::io::Error::other("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_carries_issues() {
        let error = WebError::from(number().parse(&json!("1")).unwrap_err());
        let response = ErrorResponse::from_error(&error, "query.getUser");

        assert_eq!(response.status, 400);
        assert_eq!(response.error, "Bad Request");
        assert_eq!(response.path, "query.getUser");
        assert_eq!(response.details.unwrap()[0]["code"], "invalid_type");
    }

    #[tokio::test]
    async fn test_into_response() {
        let response = WebError::bad_request(vec![Issue::custom("nope")]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Bad request: Validation failed");
        assert_eq!(json["details"][0]["message"], "nope");
    }
}
