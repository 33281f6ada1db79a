//! 动态模型
//!
//! 由对象 schema 在运行时构建模型类，每个字段对应一个 `PropertyDescriptor`。
//! 校验后的普通数据通过 `ModelClass::instantiate` 逐字段赋值，转换为模型实例

use chimera_schema::{Issue, ObjectSchema, ParseParams, Schema, SchemaError};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::constants::DEFAULT_MODEL_NAME;
use crate::descriptor::{create_schema_property_descriptor, ModelValues, PropertyDescriptor};

/// 字段解析前回调：`(key, default) -> ParseParams`
pub type OnParsing = Arc<dyn Fn(&str, Option<&Value>) -> ParseParams + Send + Sync>;

/// 宽松模式解析失败回调：`(key, new_value, default, error) -> 替换值`
pub type OnParseError =
    Arc<dyn Fn(&str, &Value, Option<&Value>, &SchemaError) -> Option<Value> + Send + Sync>;

/// 模型构建选项
#[derive(Clone, Default)]
pub struct ModelOptions {
    class_name: Option<String>,
    safe: Option<bool>,
    do_not_throw: Option<bool>,
    parse_to_instance: Option<bool>,
    on_parsing: Option<OnParsing>,
    on_parse_error: Option<OnParseError>,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模型类名
    pub fn class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self
    }

    /// 字段使用宽松解析（`safe_parse`）
    pub fn safe(mut self, safe: bool) -> Self {
        self.safe = Some(safe);
        self
    }

    /// 字段解析失败时清空而不是返回错误
    pub fn do_not_throw(mut self, do_not_throw: bool) -> Self {
        self.do_not_throw = Some(do_not_throw);
        self
    }

    /// 是否把校验后的输出转换为模型实例（默认 true）
    pub fn parse_to_instance(mut self, parse_to_instance: bool) -> Self {
        self.parse_to_instance = Some(parse_to_instance);
        self
    }

    pub fn on_parsing<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, Option<&Value>) -> ParseParams + Send + Sync + 'static,
    {
        self.on_parsing = Some(Arc::new(handler));
        self
    }

    pub fn on_parse_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &Value, Option<&Value>, &SchemaError) -> Option<Value> + Send + Sync + 'static,
    {
        self.on_parse_error = Some(Arc::new(handler));
        self
    }

    /// 未显式设置的开关使用给定的默认值
    pub fn with_defaults(mut self, safe: bool, do_not_throw: bool, parse_to_instance: bool) -> Self {
        self.safe.get_or_insert(safe);
        self.do_not_throw.get_or_insert(do_not_throw);
        self.parse_to_instance.get_or_insert(parse_to_instance);
        self
    }

    pub fn class_name_ref(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn is_safe(&self) -> bool {
        self.safe.unwrap_or(false)
    }

    pub fn is_do_not_throw(&self) -> bool {
        self.do_not_throw.unwrap_or(false)
    }

    pub fn should_parse_to_instance(&self) -> bool {
        self.parse_to_instance.unwrap_or(true)
    }

    pub fn on_parsing_handler(&self) -> Option<&OnParsing> {
        self.on_parsing.as_ref()
    }

    pub fn on_parse_error_handler(&self) -> Option<&OnParseError> {
        self.on_parse_error.as_ref()
    }
}

impl fmt::Debug for ModelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOptions")
            .field("class_name", &self.class_name)
            .field("safe", &self.safe)
            .field("do_not_throw", &self.do_not_throw)
            .field("parse_to_instance", &self.parse_to_instance)
            .field("on_parsing", &self.on_parsing.is_some())
            .field("on_parse_error", &self.on_parse_error.is_some())
            .finish()
    }
}

/// 动态模型类
#[derive(Debug)]
pub struct ModelClass {
    name: String,
    schema: ObjectSchema,
    descriptors: Vec<PropertyDescriptor>,
    nested: Vec<(String, Arc<ModelClass>)>,
}

impl ModelClass {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &ObjectSchema {
        &self.schema
    }

    pub fn descriptors(&self) -> &[PropertyDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.descriptors.iter().find(|d| d.key() == key)
    }

    /// 字段中嵌套的对象模型，按字段名索引
    pub fn nested(&self) -> &[(String, Arc<ModelClass>)] {
        &self.nested
    }

    pub fn nested_for(&self, key: &str) -> Option<&Arc<ModelClass>> {
        self.nested.iter().find(|(k, _)| k == key).map(|(_, class)| class)
    }

    /// 创建空实例
    pub fn new_instance(self: &Arc<Self>) -> ModelInstance {
        ModelInstance {
            class: Arc::clone(self),
            values: ModelValues::new(),
        }
    }

    /// 普通数据转换为模型实例：逐个已声明字段通过 setter 赋值，未声明的键被忽略
    pub fn instantiate(self: &Arc<Self>, data: &Value) -> Result<ModelInstance, SchemaError> {
        let map = match data {
            Value::Object(map) => map,
            other => {
                return Err(SchemaError::new(vec![Issue::invalid_type(
                    "object",
                    chimera_schema::received_type(other),
                )]))
            }
        };

        let mut instance = self.new_instance();
        for (key, value) in map {
            match self.descriptor(key) {
                Some(descriptor) => descriptor.set(&mut instance.values, value.clone())?,
                None => tracing::trace!(model = %self.name, key = %key, "Skipping undeclared key"),
            }
        }

        Ok(instance)
    }

    /// GraphQL 风格的类型定义
    pub fn type_definition(&self) -> String {
        let mut sdl = format!("type {} {{\n", self.name);
        for descriptor in &self.descriptors {
            let object_name = self.nested_for(descriptor.key()).map(|class| class.name());
            sdl.push_str(&format!(
                "  {}: {}\n",
                descriptor.key(),
                render_type(descriptor.schema(), object_name)
            ));
        }
        sdl.push('}');
        sdl
    }

    /// 本模型及全部嵌套模型的类型定义，嵌套模型在前
    pub fn type_definitions(&self) -> Vec<(String, String)> {
        let mut definitions = Vec::new();
        for (_, nested) in &self.nested {
            definitions.extend(nested.type_definitions());
        }
        definitions.push((self.name.clone(), self.type_definition()));
        definitions
    }
}

/// 渲染类型引用，非空类型带 `!`
pub fn render_type(schema: &Schema, object_name: Option<&str>) -> String {
    let base = match schema.unwrap_modifiers() {
        Schema::Object(object) => object_name
            .or_else(|| object.name())
            .unwrap_or("Object")
            .to_string(),
        Schema::Array(array) => format!("[{}]", render_type(array.element(), object_name)),
        other => other.describe(),
    };

    if schema.is_nullable() {
        base
    } else {
        format!("{}!", base)
    }
}

/// 去掉包装与数组后的最内层对象 schema
fn innermost_object(schema: &Schema) -> Option<&ObjectSchema> {
    match schema.unwrap_modifiers() {
        Schema::Object(object) => Some(object),
        Schema::Array(array) => innermost_object(array.element()),
        _ => None,
    }
}

fn pascal_case(key: &str) -> String {
    key.split(|c: char| c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// 从对象 schema 构建模型类
///
/// 类名优先使用 `options.class_name`，其次是 schema 名称，最后是 `DynamicSchemaModel`
pub fn model_from_schema(input: &ObjectSchema, options: &ModelOptions) -> Arc<ModelClass> {
    let name = options
        .class_name_ref()
        .or_else(|| input.name())
        .unwrap_or(DEFAULT_MODEL_NAME)
        .to_string();

    let descriptors = input
        .shape()
        .iter()
        .map(|(key, schema)| create_schema_property_descriptor(key, schema, options))
        .collect();

    let nested = input
        .shape()
        .iter()
        .filter_map(|(key, schema)| {
            innermost_object(schema).map(|object| {
                let nested_name = object
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}{}", name, pascal_case(key)));
                let nested_options = options.clone().class_name(nested_name);
                (key.clone(), model_from_schema(object, &nested_options))
            })
        })
        .collect();

    tracing::debug!(model = %name, fields = input.shape().len(), "Built model from schema");

    Arc::new(ModelClass {
        name,
        schema: input.clone(),
        descriptors,
        nested,
    })
}

/// 模型实例
#[derive(Debug, Clone)]
pub struct ModelInstance {
    class: Arc<ModelClass>,
    values: ModelValues,
}

impl ModelInstance {
    pub fn class(&self) -> &Arc<ModelClass> {
        &self.class
    }

    pub fn values(&self) -> &ModelValues {
        &self.values
    }

    /// 读取字段，未声明的字段返回 `None`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.class
            .descriptor(key)
            .and_then(|descriptor| descriptor.get(&self.values))
    }

    /// 写入字段，经过字段 setter 校验
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), SchemaError> {
        match self.class.descriptor(key) {
            Some(descriptor) => descriptor.set(&mut self.values, value),
            None => Err(SchemaError::new(vec![Issue::new(
                chimera_schema::IssueCode::UnrecognizedKeys,
                format!("Unrecognized key(s) in object: '{}'", key),
            )
            .with_keys(vec![key.to_string()])])),
        }
    }

    /// 全部字段组成的 JSON 对象，值为 undefined 的字段省略
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for descriptor in self.class.descriptors() {
            if let Some(value) = descriptor.get(&self.values) {
                map.insert(descriptor.key().to_string(), value);
            }
        }
        Value::Object(map)
    }

    /// 转换为强类型结构体
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_value())
    }
}

impl Serialize for ModelInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// 返回值对应的模型
#[derive(Debug, Clone)]
pub enum ModelRef {
    Class(Arc<ModelClass>),
    List(Box<ModelRef>),
    /// 标量等无需转换的返回值
    Plain,
}

impl ModelRef {
    /// 对象 schema 构建模型类，数组 schema 递归构建元素模型
    pub fn from_schema(schema: &Schema, options: &ModelOptions) -> Self {
        match schema.unwrap_modifiers() {
            Schema::Object(object) => ModelRef::Class(model_from_schema(object, options)),
            Schema::Array(array) => ModelRef::List(Box::new(ModelRef::from_schema(array.element(), options))),
            _ => ModelRef::Plain,
        }
    }

    /// 最内层的模型类
    pub fn class(&self) -> Option<&Arc<ModelClass>> {
        match self {
            ModelRef::Class(class) => Some(class),
            ModelRef::List(inner) => inner.class(),
            ModelRef::Plain => None,
        }
    }
}

/// 输出转换结果
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Materialized {
    Instance(ModelInstance),
    List(Vec<Materialized>),
    Plain(Value),
}

impl Materialized {
    pub fn to_value(&self) -> Value {
        match self {
            Materialized::Instance(instance) => instance.to_value(),
            Materialized::List(items) => Value::Array(items.iter().map(Materialized::to_value).collect()),
            Materialized::Plain(value) => value.clone(),
        }
    }

    pub fn as_instance(&self) -> Option<&ModelInstance> {
        match self {
            Materialized::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Materialized]> {
        match self {
            Materialized::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, Materialized::Plain(_))
    }

    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_value())
    }
}

/// 把校验后的数据转换为模型实例，数组按元素 schema 与元素模型递归转换
pub fn materialize(schema: Option<&Schema>, model: &ModelRef, data: Value) -> Result<Materialized, SchemaError> {
    match (model, data) {
        (ModelRef::Plain, data) => Ok(Materialized::Plain(data)),
        (_, Value::Null) => Ok(Materialized::Plain(Value::Null)),
        (ModelRef::List(inner), Value::Array(items)) => {
            let element = schema.and_then(|schema| schema.unwrap_modifiers().element());
            items
                .into_iter()
                .map(|item| materialize(element, inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Materialized::List)
        }
        (ModelRef::List(_), data) => Ok(Materialized::Plain(data)),
        (ModelRef::Class(class), Value::Array(items)) => items
            .iter()
            .map(|item| class.instantiate(item).map(Materialized::Instance))
            .collect::<Result<Vec<_>, _>>()
            .map(Materialized::List),
        (ModelRef::Class(class), data) => class.instantiate(&data).map(Materialized::Instance),
    }
}
