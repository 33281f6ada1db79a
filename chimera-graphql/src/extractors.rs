//! 参数绑定
//!
//! 操作参数先经过模型 schema 校验（填充默认值、去掉未声明的键），
//! 再反序列化为强类型结构体。校验失败统一转换为 `WebError::BadRequest`

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use chimera_schema::{Issue, ParseParams, SchemaModel};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::WebError;

/// 校验并绑定操作参数
///
/// ```ignore
/// let input: CreateUserInput = parse_args(&args)?;
/// ```
pub fn parse_args<T>(args: &Value) -> Result<T, WebError>
where
    T: SchemaModel + DeserializeOwned,
{
    parse_args_with(args, &ParseParams::default())
}

/// 同 `parse_args`，`params` 可以指定问题路径前缀与错误消息映射
pub fn parse_args_with<T>(args: &Value, params: &ParseParams) -> Result<T, WebError>
where
    T: SchemaModel + DeserializeOwned,
{
    let data = T::schema().parse_with(args, params).map_err(|error| {
        tracing::debug!(issues = error.issues.len(), "Argument validation failed");
        WebError::from(error)
    })?;

    serde_json::from_value(data).map_err(|e| {
        tracing::debug!(error = %e, "Argument binding failed");
        WebError::bad_request(vec![Issue::custom(e.to_string())])
    })
}

/// SchemaArgs 提取器
///
/// 从 JSON 请求体中读取参数，经模型 schema 校验后反序列化
///
/// ```ignore
/// async fn create_user(SchemaArgs(input): SchemaArgs<CreateUserInput>) -> impl IntoResponse {
///     // input 已经通过校验
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SchemaArgs<T>(pub T);

impl<T> SchemaArgs<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for SchemaArgs<T>
where
    T: SchemaModel + DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(args) = Json::<Value>::from_request(req, state).await.map_err(|e| {
            let error_msg = e.body_text();
            tracing::debug!(error = %error_msg, "JSON parse error");

            WebError::JsonParse {
                message: error_msg,
                source: Some(Box::new(e)),
            }
        })?;

        parse_args(&args).map(SchemaArgs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use chimera_schema::prelude::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct CreatePost {
        title: String,
        draft: bool,
    }

    impl SchemaModel for CreatePost {
        fn schema() -> ObjectSchema {
            object()
                .named("CreatePost")
                .field("title", string().min(3))
                .field("draft", boolean().default(false))
        }
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/graphql")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_parse_args_applies_defaults() {
        let post: CreatePost = parse_args(&json!({ "title": "Hello", "extra": 1 })).unwrap();
        assert_eq!(post, CreatePost { title: "Hello".into(), draft: false });
    }

    #[test]
    fn test_parse_args_rejects_invalid_input() {
        let error = parse_args::<CreatePost>(&json!({ "title": "Hi" })).unwrap_err();
        assert!(error.is_bad_request());
        assert_eq!(error.issues().unwrap()[0].path_string(), "title");
    }

    #[test]
    fn test_parse_args_with_path_prefix() {
        let params = ParseParams::new().with_path(["input"]);
        let error = parse_args_with::<CreatePost>(&json!({}), &params).unwrap_err();
        assert_eq!(error.issues().unwrap()[0].path_string(), "input.title");
    }

    #[tokio::test]
    async fn test_schema_args_extractor() {
        let SchemaArgs(post) = SchemaArgs::<CreatePost>::from_request(json_request(r#"{"title":"Hello","draft":true}"#), &())
            .await
            .unwrap();
        assert!(post.draft);

        let error = SchemaArgs::<CreatePost>::from_request(json_request(r#"{"title":"no"}"#), &())
            .await
            .unwrap_err();
        assert!(error.is_bad_request());

        let error = SchemaArgs::<CreatePost>::from_request(json_request("{"), &())
            .await
            .unwrap_err();
        assert!(matches!(error, WebError::JsonParse { .. }));
    }
}
