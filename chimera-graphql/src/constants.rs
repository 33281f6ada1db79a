//! 框架配置常量定义
//!
//! 定义配置文件、环境变量与默认值

// ==================== 配置文件 ====================

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "application.toml";

// ==================== 环境变量 ====================

/// 是否把校验后的输出转换为模型实例
pub const ENV_PARSE_TO_INSTANCE: &str = "CHIMERA_GRAPHQL_PARSE_TO_INSTANCE";

/// 字段默认使用宽松解析
pub const ENV_SAFE: &str = "CHIMERA_GRAPHQL_SAFE";

/// 字段解析失败时默认清空而不是返回错误
pub const ENV_DO_NOT_THROW: &str = "CHIMERA_GRAPHQL_DO_NOT_THROW";

/// 日志级别
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// 日志格式
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

// ==================== 默认值 ====================

/// 既没有 `class_name` 也没有 schema 名称时使用的模型名
pub const DEFAULT_MODEL_NAME: &str = "DynamicSchemaModel";

/// 校验失败时 400 响应的消息
pub const BAD_REQUEST_MESSAGE: &str = "Validation failed";
