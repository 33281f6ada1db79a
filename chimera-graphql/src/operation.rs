//! Query / Mutation 操作定义
//!
//! `query_with_schema` 和 `mutation_with_schema` 只是 `method_with_schema`
//! 在操作类型上的特化：由返回值 schema 构建模型类，包装处理函数，
//! 并生成注册到 `ResolverRegistry` 的操作定义

use chimera_schema::{Schema, SchemaExt};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::decorate::{decorate_with_schema_output, DecoratedOutput, HandlerOutput};
use crate::error::WebError;
use crate::model::{render_type, Materialized, ModelOptions, ModelRef};

/// 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 操作选项
///
/// 可以直接由名称转换：`"getUser".into()`；`()` 表示使用方法名
#[derive(Debug, Clone, Default)]
pub struct OperationOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    pub nullable: bool,
    pub schema: ModelOptions,
}

impl OperationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn deprecation_reason(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }

    /// 可空操作：返回类型去掉 `!`，并且返回值 schema 会被包装为 `nullable()`，
    /// 处理函数返回 `null` 时不再报告校验错误
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// 模型构建选项（类名、safe、do_not_throw、parse_to_instance 等）
    pub fn schema(mut self, options: ModelOptions) -> Self {
        self.schema = options;
        self
    }
}

impl From<&str> for OperationOptions {
    fn from(name: &str) -> Self {
        OperationOptions::new().name(name)
    }
}

impl From<String> for OperationOptions {
    fn from(name: String) -> Self {
        OperationOptions::new().name(name)
    }
}

impl From<()> for OperationOptions {
    fn from(_: ()) -> Self {
        OperationOptions::new()
    }
}

/// 包装后的操作处理函数
pub type OperationHandler = Arc<dyn Fn(Value) -> DecoratedOutput + Send + Sync>;

/// 已注册的操作
#[derive(Clone)]
pub struct OperationDefinition {
    kind: OperationKind,
    name: String,
    method_name: String,
    description: Option<String>,
    deprecation_reason: Option<String>,
    nullable: bool,
    input: Schema,
    model: ModelRef,
    handler: OperationHandler,
}

impl OperationDefinition {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn deprecation_reason(&self) -> Option<&str> {
        self.deprecation_reason.as_deref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn input(&self) -> &Schema {
        &self.input
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// 返回类型引用，例如 `[User!]!`
    pub fn return_type(&self) -> String {
        let object_name = self.model.class().map(|class| class.name());
        render_type(&self.input, object_name)
    }

    /// 调用包装后的处理函数（同步或异步形态）
    pub fn invoke(&self, args: Value) -> DecoratedOutput {
        (self.handler)(args)
    }

    /// 调用并等待结果
    pub async fn call(&self, args: Value) -> Result<Materialized, WebError> {
        self.invoke(args).resolve().await
    }

    /// 操作字段定义，例如 `getUser: User! @deprecated(reason: "...")`
    pub fn field_definition(&self) -> String {
        let mut definition = String::new();
        if let Some(description) = &self.description {
            definition.push_str(&format!("  \"\"\"{}\"\"\"\n", description));
        }
        definition.push_str(&format!("  {}: {}", self.name, self.return_type()));
        if let Some(reason) = &self.deprecation_reason {
            definition.push_str(&format!(" @deprecated(reason: {:?})", reason));
        }
        definition
    }
}

impl fmt::Debug for OperationDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDefinition")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("method_name", &self.method_name)
            .field("return_type", &self.return_type())
            .finish()
    }
}

/// 通用的操作装饰
///
/// `name_or_options` 为名称或完整选项，名称缺省时使用 `method_name`
pub fn method_with_schema<F>(
    kind: OperationKind,
    input: impl Into<Schema>,
    name_or_options: impl Into<OperationOptions>,
    method_name: &str,
    handler: F,
) -> OperationDefinition
where
    F: Fn(Value) -> HandlerOutput + Send + Sync + 'static,
{
    let options = name_or_options.into();
    // 可空操作允许处理函数返回 null
    let input: Schema = input.into();
    let input = if options.nullable && !input.is_nullable() {
        input.nullable()
    } else {
        input
    };
    let model = ModelRef::from_schema(&input, &options.schema);
    let name = options.name.unwrap_or_else(|| method_name.to_string());

    tracing::debug!(kind = %kind, operation = %name, method = %method_name, "Decorating operation");

    let decorated = decorate_with_schema_output(handler, input.clone(), model.clone(), options.schema);

    OperationDefinition {
        kind,
        name,
        method_name: method_name.to_string(),
        description: options.description,
        deprecation_reason: options.deprecation_reason,
        nullable: options.nullable,
        input,
        model,
        handler: Arc::new(decorated),
    }
}

/// Query 操作装饰
pub fn query_with_schema<F>(
    input: impl Into<Schema>,
    name_or_options: impl Into<OperationOptions>,
    method_name: &str,
    handler: F,
) -> OperationDefinition
where
    F: Fn(Value) -> HandlerOutput + Send + Sync + 'static,
{
    method_with_schema(OperationKind::Query, input, name_or_options, method_name, handler)
}

/// Mutation 操作装饰
pub fn mutation_with_schema<F>(
    input: impl Into<Schema>,
    name_or_options: impl Into<OperationOptions>,
    method_name: &str,
    handler: F,
) -> OperationDefinition
where
    F: Fn(Value) -> HandlerOutput + Send + Sync + 'static,
{
    method_with_schema(OperationKind::Mutation, input, name_or_options, method_name, handler)
}

/// 处理函数的强类型返回值序列化为 JSON
pub fn into_handler_result<T: Serialize>(result: Result<T, WebError>) -> Result<Value, WebError> {
    let output = result?;
    serde_json::to_value(output).map_err(|e| WebError::Internal(format!("Failed to serialize output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimera_schema::prelude::*;
    use serde_json::json;

    fn post() -> ObjectSchema {
        object()
            .named("Post")
            .field("id", number().int())
            .field("title", string().min(1))
    }

    #[test]
    fn test_name_defaults_to_method_name() {
        let operation = query_with_schema(post(), (), "getPost", HandlerOutput::ready);
        assert_eq!(operation.kind(), OperationKind::Query);
        assert_eq!(operation.name(), "getPost");
        assert_eq!(operation.return_type(), "Post!");
    }

    #[test]
    fn test_options_are_applied() {
        let options = OperationOptions::new()
            .name("posts")
            .description("All posts")
            .deprecation_reason("use feed")
            .nullable(true)
            .schema(ModelOptions::default().class_name("Article"));
        let operation = query_with_schema(array(post()), options, "listPosts", HandlerOutput::ready);

        assert_eq!(operation.name(), "posts");
        assert_eq!(operation.method_name(), "listPosts");
        assert_eq!(operation.return_type(), "[Article!]");
        assert_eq!(
            operation.field_definition(),
            "  \"\"\"All posts\"\"\"\n  posts: [Article!] @deprecated(reason: \"use feed\")"
        );
    }

    #[tokio::test]
    async fn test_nullable_operation_accepts_null() {
        let operation = query_with_schema(
            post(),
            OperationOptions::new().nullable(true),
            "findPost",
            |_| HandlerOutput::ready(Value::Null),
        );

        assert_eq!(operation.return_type(), "Post");
        assert_eq!(operation.call(json!({})).await.unwrap().to_value(), Value::Null);
    }

    #[tokio::test]
    async fn test_mutation_call() {
        let operation = mutation_with_schema(post(), "createPost", "create", |args: Value| {
            HandlerOutput::pending(async move {
                Ok(json!({ "id": 1, "title": args["title"].clone() }))
            })
        });
        assert_eq!(operation.kind(), OperationKind::Mutation);

        let post = operation.call(json!({ "title": "Hello" })).await.unwrap();
        assert_eq!(post.as_instance().unwrap().get("id"), Some(json!(1)));

        let error = operation.call(json!({ "title": "" })).await.unwrap_err();
        assert!(error.is_bad_request());
    }

    #[test]
    fn test_into_handler_result() {
        #[derive(Serialize)]
        struct Out {
            ok: bool,
        }

        assert_eq!(into_handler_result(Ok(Out { ok: true })).unwrap(), json!({ "ok": true }));
        assert!(into_handler_result::<Out>(Err(WebError::NotFound("x".into()))).is_err());
    }
}
