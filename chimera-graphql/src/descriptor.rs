//! 字段属性描述符
//!
//! 每个字段一对 getter / setter：
//!
//! - getter 返回已存储的值，没有值（或为 null）时返回 schema 声明的默认值
//! - setter 每次赋值都会校验，失败时的行为由 `safe` / `do_not_throw` /
//!   `on_parse_error` 组合决定

use chimera_schema::{ParseParams, SafeParseResult, Schema, SchemaError};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::model::{ModelOptions, OnParseError};

/// 实例的字段值存储，首次写入时才创建
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelValues {
    values: Option<HashMap<String, Option<Value>>>,
}

impl ModelValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否已经发生过写入
    pub fn is_initialized(&self) -> bool {
        self.values.is_some()
    }

    /// 已存储的原始值，`None` 表示未设置或已被清空
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.values
            .as_ref()
            .and_then(|values| values.get(key))
            .and_then(|value| value.as_ref())
    }

    fn ensure(&mut self) -> &mut HashMap<String, Option<Value>> {
        self.values.get_or_insert_with(HashMap::new)
    }

    fn store(&mut self, key: &str, value: Option<Value>) {
        self.ensure().insert(key.to_string(), value);
    }
}

/// 字段属性描述符
#[derive(Clone)]
pub struct PropertyDescriptor {
    key: String,
    schema: Schema,
    default_value: Option<Value>,
    params: ParseParams,
    safe: bool,
    do_not_throw: bool,
    on_parse_error: Option<OnParseError>,
}

impl PropertyDescriptor {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn params(&self) -> &ParseParams {
        &self.params
    }

    /// getter
    pub fn get(&self, values: &ModelValues) -> Option<Value> {
        values
            .raw(&self.key)
            .filter(|value| !value.is_null())
            .cloned()
            .or_else(|| self.default_value.clone())
    }

    /// setter
    ///
    /// 只有在既没有替换值、也没有开启 `do_not_throw` 时才返回错误
    pub fn set(&self, values: &mut ModelValues, new_value: Value) -> Result<(), SchemaError> {
        values.ensure();

        if self.safe {
            match self.schema.safe_parse_with(&new_value, &self.params) {
                SafeParseResult::Success(data) => values.store(&self.key, Some(data)),
                SafeParseResult::Failure(error) => {
                    let replacement = self.on_parse_error.as_ref().and_then(|handler| {
                        handler(&self.key, &new_value, self.default_value.as_ref(), &error)
                    });

                    match replacement {
                        Some(replacement) => {
                            tracing::debug!(
                                field = %self.key,
                                issues = error.issues.len(),
                                "Field validation failed, using replacement value"
                            );
                            values.store(&self.key, Some(replacement));
                        }
                        None if self.do_not_throw => {
                            tracing::debug!(
                                field = %self.key,
                                issues = error.issues.len(),
                                "Field validation failed, clearing value"
                            );
                            values.store(&self.key, None);
                        }
                        None => return Err(error),
                    }
                }
            }
        } else if self.do_not_throw {
            match self.schema.parse_with(&new_value, &self.params) {
                Ok(data) => values.store(&self.key, Some(data)),
                Err(error) => {
                    tracing::debug!(
                        field = %self.key,
                        issues = error.issues.len(),
                        "Field validation failed, clearing value"
                    );
                    values.store(&self.key, None);
                }
            }
        } else {
            let data = self.schema.parse_with(&new_value, &self.params)?;
            values.store(&self.key, Some(data));
        }

        Ok(())
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("key", &self.key)
            .field("schema", &self.schema.describe())
            .field("default_value", &self.default_value)
            .field("safe", &self.safe)
            .field("do_not_throw", &self.do_not_throw)
            .finish()
    }
}

/// 为单个字段创建属性描述符
///
/// `on_parsing` 在创建时调用一次，返回的 `ParseParams` 用于之后的每次解析
pub fn create_schema_property_descriptor(
    key: &str,
    input: &Schema,
    opts: &ModelOptions,
) -> PropertyDescriptor {
    let default_value = input.default_value();

    let params = match opts.on_parsing_handler() {
        Some(on_parsing) => on_parsing(key, default_value.as_ref()),
        None => ParseParams::default(),
    };

    PropertyDescriptor {
        key: key.to_string(),
        schema: input.clone(),
        default_value,
        params,
        safe: opts.is_safe(),
        do_not_throw: opts.is_do_not_throw(),
        on_parse_error: opts.on_parse_error_handler().cloned(),
    }
}
