//! Chimera Schema - 数据校验模块
//!
//! 提供类似 zod 的 schema 定义与解析：
//!
//! - **严格解析** - `parse` 失败时返回携带全部问题的 `SchemaError`
//! - **宽松解析** - `safe_parse` 返回 `SafeParseResult`
//! - **默认值** - 输入缺失时由 `default(...)` 填充
//! - **派生宏** - `#[derive(SchemaModel)]` 从结构体生成对象 schema
//!
//! ```ignore
//! use chimera_schema::prelude::*;
//!
//! let user = object()
//!     .named("User")
//!     .field("name", string().min(2))
//!     .field("age", number().int().optional());
//!
//! let parsed = user.parse(&serde_json::json!({ "name": "Ann" }))?;
//! ```

extern crate self as chimera_schema;

pub mod error;
pub mod model;
pub mod rules;
pub mod schema;

pub use error::*;
pub use model::*;
pub use rules::*;
pub use schema::*;

// 重新导出宏
pub use chimera_schema_macros::SchemaModel;

// 供派生宏生成的代码使用
#[doc(hidden)]
pub use serde_json;

pub mod prelude {
    //! 预导入模块

    pub use crate::error::{Issue, IssueCode, ParseParams, PathSegment, SchemaError};
    pub use crate::model::{OutputSchema, SchemaModel};
    pub use chimera_schema_macros::SchemaModel;
    pub use crate::schema::{
        any, array, boolean, enumeration, literal, number, object, string, ObjectSchema,
        SafeParseResult, Schema, SchemaExt,
    };
}
