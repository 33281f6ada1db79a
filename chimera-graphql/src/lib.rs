//! # Chimera GraphQL
//!
//! 带 schema 校验的 Query / Mutation 解析器与动态模型
//!
//! ## 核心特性
//!
//! - **返回值校验** - 处理函数（同步或异步）的返回值经过 schema 校验，失败转换为 400 错误
//! - **动态模型** - 由对象 schema 构建模型类，字段赋值时自动校验
//! - **参数绑定** - `parse_args` / `SchemaArgs` 校验并反序列化操作参数
//! - **注解驱动** - `#[resolver]`、`#[query_with_schema]`、`#[mutation_with_schema]`
//! - **自动注册** - 通过 `inventory` 收集解析器
//!
//! ```ignore
//! use chimera_graphql::prelude::*;
//!
//! #[derive(Default)]
//! struct UserResolver;
//!
//! #[resolver(auto_register)]
//! impl UserResolver {
//!     #[query_with_schema(User, name = "me")]
//!     async fn current_user(&self) -> Result<User, WebError> {
//!         Ok(User::default())
//!     }
//! }
//!
//! let registry = ResolverRegistry::from_inventory()?;
//! let me = registry.query("me", serde_json::json!({})).await?;
//! ```

extern crate self as chimera_graphql;

pub mod config;
pub mod constants;
pub mod decorate;
pub mod descriptor;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod model;
pub mod operation;
pub mod registry;

pub use config::{ConfigError, GraphqlConfig};
pub use decorate::{decorate_with_schema_output, DecoratedOutput, HandlerFuture, HandlerOutput};
pub use descriptor::{create_schema_property_descriptor, ModelValues, PropertyDescriptor};
pub use error::{ErrorResponse, WebError};
pub use extractors::{parse_args, parse_args_with, SchemaArgs};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use model::{
    materialize, model_from_schema, Materialized, ModelClass, ModelInstance, ModelOptions,
    ModelRef, OnParseError, OnParsing,
};
pub use operation::{
    into_handler_result, method_with_schema, mutation_with_schema, query_with_schema,
    OperationDefinition, OperationHandler, OperationKind, OperationOptions,
};
pub use registry::{ResolverRegistration, ResolverRegistry};

pub use chimera_schema;

// 重新导出宏
pub use chimera_graphql_macros::{mutation_with_schema, query_with_schema, resolver};

// 供宏生成的代码使用
#[doc(hidden)]
pub use inventory;
#[doc(hidden)]
pub use serde_json;

pub mod prelude {
    //! 预导入模块

    pub use crate::{
        parse_args, GraphqlConfig, HandlerOutput, LoggingConfig, Materialized, ModelInstance,
        ModelOptions, OperationKind, OperationOptions, ResolverRegistry, SchemaArgs, WebError,
    };
    pub use crate::{mutation_with_schema, query_with_schema, resolver};

    pub use chimera_schema::prelude::*;
    pub use chimera_schema::SchemaModel;
}
