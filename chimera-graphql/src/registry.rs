//! 操作注册表
//!
//! 按 `(OperationKind, name)` 路由到包装后的处理函数，并输出 SDL。
//! 由 `#[resolver(auto_register)]` 声明的解析器通过 `inventory` 自动收集

use chimera_schema::Schema;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::config::GraphqlConfig;
use crate::decorate::HandlerOutput;
use crate::error::WebError;
use crate::model::Materialized;
use crate::operation::{method_with_schema, OperationDefinition, OperationKind, OperationOptions};

/// 解析器自动注册项
pub struct ResolverRegistration {
    pub name: &'static str,
    pub register: fn(&mut ResolverRegistry) -> Result<(), WebError>,
}

impl ResolverRegistration {
    pub const fn new(name: &'static str, register: fn(&mut ResolverRegistry) -> Result<(), WebError>) -> Self {
        Self { name, register }
    }
}

inventory::collect!(ResolverRegistration);

#[derive(Debug, Default)]
pub struct ResolverRegistry {
    operations: Vec<OperationDefinition>,
    index: HashMap<(OperationKind, String), usize>,
    // 类型名 -> 类型定义，同名类型的定义必须一致
    types: HashMap<String, String>,
    config: GraphqlConfig,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用配置中的默认开关
    pub fn with_config(config: GraphqlConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &GraphqlConfig {
        &self.config
    }

    /// 收集所有自动注册的解析器
    pub fn from_inventory() -> Result<Self, WebError> {
        Self::from_inventory_with_config(GraphqlConfig::default())
    }

    pub fn from_inventory_with_config(config: GraphqlConfig) -> Result<Self, WebError> {
        let mut registry = Self::with_config(config);
        for registration in inventory::iter::<ResolverRegistration> {
            tracing::info!(resolver = registration.name, "Registering resolver");
            (registration.register)(&mut registry)?;
        }
        tracing::info!(operations = registry.len(), "Resolver registry ready");
        Ok(registry)
    }

    /// 注册操作
    ///
    /// 同类型同名的操作只能注册一次；输出类型与已注册的同名类型定义不同时也视为冲突
    pub fn register(&mut self, operation: OperationDefinition) -> Result<(), WebError> {
        let key = (operation.kind(), operation.name().to_string());
        if self.index.contains_key(&key) {
            return Err(WebError::Conflict(format!(
                "{} operation '{}' is already registered",
                operation.kind(),
                operation.name()
            )));
        }

        let definitions = operation
            .model()
            .class()
            .map(|class| class.type_definitions())
            .unwrap_or_default();
        for (name, definition) in &definitions {
            if let Some(existing) = self.types.get(name) {
                if existing != definition {
                    return Err(WebError::Conflict(format!(
                        "type '{}' of {} operation '{}' conflicts with an existing type of the same name",
                        name,
                        operation.kind(),
                        operation.name()
                    )));
                }
            }
        }
        self.types.extend(definitions);

        tracing::debug!(
            kind = %operation.kind(),
            operation = %operation.name(),
            return_type = %operation.return_type(),
            "Registered operation"
        );
        self.index.insert(key, self.operations.len());
        self.operations.push(operation);
        Ok(())
    }

    /// 使用配置默认值装饰并注册 Query
    pub fn query_with_schema<F>(
        &mut self,
        input: impl Into<Schema>,
        name_or_options: impl Into<OperationOptions>,
        method_name: &str,
        handler: F,
    ) -> Result<(), WebError>
    where
        F: Fn(Value) -> HandlerOutput + Send + Sync + 'static,
    {
        self.register_with_schema(OperationKind::Query, input, name_or_options, method_name, handler)
    }

    /// 使用配置默认值装饰并注册 Mutation
    pub fn mutation_with_schema<F>(
        &mut self,
        input: impl Into<Schema>,
        name_or_options: impl Into<OperationOptions>,
        method_name: &str,
        handler: F,
    ) -> Result<(), WebError>
    where
        F: Fn(Value) -> HandlerOutput + Send + Sync + 'static,
    {
        self.register_with_schema(OperationKind::Mutation, input, name_or_options, method_name, handler)
    }

    fn register_with_schema<F>(
        &mut self,
        kind: OperationKind,
        input: impl Into<Schema>,
        name_or_options: impl Into<OperationOptions>,
        method_name: &str,
        handler: F,
    ) -> Result<(), WebError>
    where
        F: Fn(Value) -> HandlerOutput + Send + Sync + 'static,
    {
        let mut options = name_or_options.into();
        self.config.apply_to(&mut options.schema);
        let operation = method_with_schema(kind, input, options, method_name, handler);
        self.register(operation)
    }

    pub fn operation(&self, kind: OperationKind, name: &str) -> Option<&OperationDefinition> {
        self.index
            .get(&(kind, name.to_string()))
            .map(|&position| &self.operations[position])
    }

    /// 按注册顺序返回全部操作
    pub fn operations(&self) -> &[OperationDefinition] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// 调用操作
    pub async fn dispatch(&self, kind: OperationKind, name: &str, args: Value) -> Result<Materialized, WebError> {
        let operation = self.operation(kind, name).ok_or_else(|| {
            tracing::warn!(kind = %kind, operation = %name, "Operation not found");
            WebError::NotFound(format!("{}.{}", kind, name))
        })?;
        operation.call(args).await
    }

    pub async fn query(&self, name: &str, args: Value) -> Result<Materialized, WebError> {
        self.dispatch(OperationKind::Query, name, args).await
    }

    pub async fn mutation(&self, name: &str, args: Value) -> Result<Materialized, WebError> {
        self.dispatch(OperationKind::Mutation, name, args).await
    }

    /// 输出全部模型类型以及 `type Query` / `type Mutation`
    pub fn sdl(&self) -> String {
        let mut seen = HashSet::new();
        let mut blocks = Vec::new();

        for operation in &self.operations {
            if let Some(class) = operation.model().class() {
                for (name, definition) in class.type_definitions() {
                    if seen.insert(name) {
                        blocks.push(definition);
                    }
                }
            }
        }

        for kind in [OperationKind::Query, OperationKind::Mutation] {
            let fields: Vec<String> = self
                .operations
                .iter()
                .filter(|operation| operation.kind() == kind)
                .map(OperationDefinition::field_definition)
                .collect();
            if !fields.is_empty() {
                blocks.push(format!("type {} {{\n{}\n}}", kind, fields.join("\n")));
            }
        }

        blocks.join("\n\n")
    }
}
