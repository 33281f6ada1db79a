//! 返回值校验包装
//!
//! `decorate_with_schema_output` 包装任意处理函数：
//!
//! - 同步返回值立即用 `safe_parse` 校验，失败转换为 `WebError::BadRequest`
//! - 异步返回值在完成后用 `parse_async` 校验，处理函数自身的错误原样传播
//! - 校验通过后按 `parse_to_instance` 决定是否转换为模型实例

use chimera_schema::{SafeParseResult, Schema};
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::future::Future;

use crate::error::WebError;
use crate::model::{materialize, Materialized, ModelOptions, ModelRef};

/// 异步处理函数的返回值
pub type HandlerFuture = BoxFuture<'static, Result<Value, WebError>>;

/// 处理函数的返回值：立即可用，或者尚未完成
pub enum HandlerOutput {
    Ready(Result<Value, WebError>),
    Pending(HandlerFuture),
}

impl HandlerOutput {
    pub fn ready(value: Value) -> Self {
        HandlerOutput::Ready(Ok(value))
    }

    pub fn pending<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = Result<Value, WebError>> + Send + 'static,
    {
        HandlerOutput::Pending(Box::pin(future))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, HandlerOutput::Pending(_))
    }
}

impl From<Result<Value, WebError>> for HandlerOutput {
    fn from(result: Result<Value, WebError>) -> Self {
        HandlerOutput::Ready(result)
    }
}

/// 包装后的返回值，与原处理函数的同步/异步形态一致
pub enum DecoratedOutput {
    Ready(Result<Materialized, WebError>),
    Pending(BoxFuture<'static, Result<Materialized, WebError>>),
}

impl DecoratedOutput {
    pub fn is_pending(&self) -> bool {
        matches!(self, DecoratedOutput::Pending(_))
    }

    /// 同步结果（异步形态返回 `None`）
    pub fn into_ready(self) -> Option<Result<Materialized, WebError>> {
        match self {
            DecoratedOutput::Ready(result) => Some(result),
            DecoratedOutput::Pending(_) => None,
        }
    }

    /// 统一等待结果
    pub async fn resolve(self) -> Result<Materialized, WebError> {
        match self {
            DecoratedOutput::Ready(result) => result,
            DecoratedOutput::Pending(future) => future.await,
        }
    }
}

/// 已校验数据的后续转换
#[derive(Clone)]
struct OutputShaper {
    input: Schema,
    model: ModelRef,
    parse_to_instance: bool,
}

impl OutputShaper {
    fn shape(&self, data: Value) -> Result<Materialized, WebError> {
        if !self.parse_to_instance {
            return Ok(Materialized::Plain(data));
        }
        materialize(Some(&self.input), &self.model, data).map_err(|error| {
            tracing::debug!(issues = error.issues.len(), "Output instantiation failed");
            WebError::from(error)
        })
    }

    fn validate_ready(&self, output: Value) -> Result<Materialized, WebError> {
        match self.input.safe_parse(&output) {
            SafeParseResult::Success(data) => self.shape(data),
            SafeParseResult::Failure(error) => {
                tracing::debug!(issues = error.issues.len(), "Output validation failed");
                Err(WebError::from(error))
            }
        }
    }

    async fn validate_pending(self, future: HandlerFuture) -> Result<Materialized, WebError> {
        let output = future.await?;
        let data = self.input.parse_async(&output).await.map_err(|error| {
            tracing::debug!(issues = error.issues.len(), "Async output validation failed");
            WebError::from(error)
        })?;
        self.shape(data)
    }
}

/// 包装处理函数，使其返回值经过 `input` 校验并转换为 `model` 实例
pub fn decorate_with_schema_output<A, F>(
    original: F,
    input: Schema,
    model: ModelRef,
    options: ModelOptions,
) -> impl Fn(A) -> DecoratedOutput + Send + Sync + 'static
where
    A: 'static,
    F: Fn(A) -> HandlerOutput + Send + Sync + 'static,
{
    let shaper = OutputShaper {
        input,
        model,
        parse_to_instance: options.should_parse_to_instance(),
    };

    move |args: A| match original(args) {
        HandlerOutput::Ready(Ok(output)) => DecoratedOutput::Ready(shaper.validate_ready(output)),
        HandlerOutput::Ready(Err(error)) => DecoratedOutput::Ready(Err(error)),
        HandlerOutput::Pending(future) => {
            DecoratedOutput::Pending(Box::pin(shaper.clone().validate_pending(future)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimera_schema::prelude::*;
    use serde_json::json;

    fn user() -> Schema {
        object()
            .named("User")
            .field("name", string().min(2))
            .field("role", string().default("member"))
            .into()
    }

    fn wrap<F>(handler: F, options: ModelOptions) -> impl Fn(Value) -> DecoratedOutput
    where
        F: Fn(Value) -> HandlerOutput + Send + Sync + 'static,
    {
        let schema = user();
        let model = ModelRef::from_schema(&schema, &options);
        decorate_with_schema_output(handler, schema, model, options)
    }

    #[test]
    fn test_sync_output_becomes_instance() {
        let wrapped = wrap(|args| HandlerOutput::ready(args), ModelOptions::default());
        let output = wrapped(json!({ "name": "Ann" }));

        assert!(!output.is_pending());
        let result = output.into_ready().unwrap().unwrap();
        let instance = result.as_instance().unwrap();
        assert_eq!(instance.class().name(), "User");
        assert_eq!(instance.get("role"), Some(json!("member")));
    }

    #[test]
    fn test_sync_validation_failure_is_bad_request() {
        let wrapped = wrap(|args| HandlerOutput::ready(args), ModelOptions::default());
        let error = wrapped(json!({ "name": "A" })).into_ready().unwrap().unwrap_err();

        assert!(error.is_bad_request());
        assert_eq!(error.issues().unwrap()[0].path_string(), "name");
    }

    #[test]
    fn test_sync_handler_error_passes_through() {
        let wrapped = wrap(
            |_| HandlerOutput::Ready(Err(WebError::Internal("db down".into()))),
            ModelOptions::default(),
        );
        let error = wrapped(json!(null)).into_ready().unwrap().unwrap_err();
        assert!(matches!(error, WebError::Internal(message) if message == "db down"));
    }

    #[tokio::test]
    async fn test_async_output_is_validated() {
        let wrapped = wrap(
            |args| HandlerOutput::pending(async move { Ok(args) }),
            ModelOptions::default(),
        );

        let output = wrapped(json!({ "name": "Bob", "extra": true }));
        assert!(output.is_pending());
        let result = output.resolve().await.unwrap();
        assert_eq!(result.to_value(), json!({ "name": "Bob", "role": "member" }));

        let error = wrapped(json!({ "name": 5 })).resolve().await.unwrap_err();
        assert!(error.is_bad_request());
    }

    #[tokio::test]
    async fn test_async_handler_error_passes_through() {
        let wrapped = wrap(
            |_| HandlerOutput::pending(async { Err(WebError::NotFound("user".into())) }),
            ModelOptions::default(),
        );
        let error = wrapped(json!(null)).resolve().await.unwrap_err();
        assert!(matches!(error, WebError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_parse_to_instance_disabled_returns_plain_data() {
        let wrapped = wrap(
            |args| HandlerOutput::pending(async move { Ok(args) }),
            ModelOptions::default().parse_to_instance(false),
        );
        let result = wrapped(json!({ "name": "Cy" })).resolve().await.unwrap();

        assert!(result.is_plain());
        assert_eq!(result.to_value(), json!({ "name": "Cy", "role": "member" }));
    }

    #[test]
    fn test_array_output_converts_each_element() {
        let schema: Schema = array(user()).into();
        let model = ModelRef::from_schema(&schema, &ModelOptions::default());
        let wrapped = decorate_with_schema_output(
            |args: Value| HandlerOutput::ready(args),
            schema,
            model,
            ModelOptions::default(),
        );

        let result = wrapped(json!([{ "name": "Ann" }, { "name": "Bob" }]))
            .into_ready()
            .unwrap()
            .unwrap();
        let items = result.as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_instance().unwrap().class().name(), "User");
    }
}
