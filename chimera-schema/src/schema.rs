//! Schema 类型与解析
//!
//! 解析规则：
//! - 对象缺失的键视为 `undefined`，只有 `Optional` 接受，`Default` 会替换为默认值
//! - `null` 只有 `Nullable`、`Any` 和 `literal(null)` 接受
//! - 对象默认剔除未声明的键，`strict()` 模式下报告 `unrecognized_keys`
//! - 一次解析收集全部问题，不会在第一个问题处停止

use crate::error::{
    Issue, IssueCode, ParseContext, ParseParams, PathSegment, SchemaError, SchemaResult,
};
use crate::rules::{NumberSchema, StringSchema};
use serde_json::{Map, Value};

/// 检查失败的标记，问题已经写入 `ParseContext`
struct Invalid;

/// `Ok(None)` 表示结果为 `undefined`（对象中省略该键）
type Checked = Result<Option<Value>, Invalid>;

/// 输入值的类型名，用于 `Expected x, received y`
pub fn received_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn received_type_of(input: Option<&Value>) -> &'static str {
    input.map(received_type).unwrap_or("undefined")
}

/// 对象未声明键的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKeys {
    #[default]
    Strip,
    Strict,
}

/// 对象 schema，字段保持声明顺序
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    name: Option<String>,
    shape: Vec<(String, Schema)>,
    unknown_keys: UnknownKeys,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self {
            name: None,
            shape: Vec::new(),
            unknown_keys: UnknownKeys::Strip,
        }
    }

    /// 设置对象名称，动态模型和 SDL 会使用它作为类型名
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 添加字段，同名字段会被替换
    pub fn field(mut self, key: impl Into<String>, schema: impl Into<Schema>) -> Self {
        let key = key.into();
        let schema = schema.into();
        match self.shape.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = schema,
            None => self.shape.push((key, schema)),
        }
        self
    }

    pub fn strict(mut self) -> Self {
        self.unknown_keys = UnknownKeys::Strict;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn shape(&self) -> &[(String, Schema)] {
        &self.shape
    }

    pub fn get(&self, key: &str) -> Option<&Schema> {
        self.shape.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.shape.iter().map(|(k, _)| k.as_str())
    }

    pub fn unknown_keys(&self) -> UnknownKeys {
        self.unknown_keys
    }

    fn check(
        &self,
        input: Option<&Value>,
        path: &mut Vec<PathSegment>,
        ctx: &mut ParseContext<'_>,
    ) -> Checked {
        let map = match input {
            Some(Value::Object(map)) => map,
            other => {
                ctx.add_issue(path, Issue::invalid_type("object", received_type_of(other)));
                return Err(Invalid);
            }
        };

        let mut output = Map::new();
        let mut valid = true;

        for (key, schema) in &self.shape {
            path.push(PathSegment::Key(key.clone()));
            let checked = schema.check(map.get(key), path, ctx);
            path.pop();

            match checked {
                Ok(Some(value)) => {
                    output.insert(key.clone(), value);
                }
                Ok(None) => {}
                Err(Invalid) => valid = false,
            }
        }

        if self.unknown_keys == UnknownKeys::Strict {
            let unknown: Vec<String> = map
                .keys()
                .filter(|key| self.get(key).is_none())
                .cloned()
                .collect();

            if !unknown.is_empty() {
                let listed = unknown
                    .iter()
                    .map(|key| format!("'{}'", key))
                    .collect::<Vec<_>>()
                    .join(", ");
                ctx.add_issue(
                    path,
                    Issue::new(
                        IssueCode::UnrecognizedKeys,
                        format!("Unrecognized key(s) in object: {}", listed),
                    )
                    .with_keys(unknown),
                );
                valid = false;
            }
        }

        if valid {
            Ok(Some(Value::Object(output)))
        } else {
            Err(Invalid)
        }
    }
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// 数组 schema
#[derive(Debug, Clone)]
pub struct ArraySchema {
    element: Box<Schema>,
    min: Option<usize>,
    max: Option<usize>,
}

impl ArraySchema {
    pub fn new(element: impl Into<Schema>) -> Self {
        Self {
            element: Box::new(element.into()),
            min: None,
            max: None,
        }
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn element(&self) -> &Schema {
        &self.element
    }

    fn check(
        &self,
        input: Option<&Value>,
        path: &mut Vec<PathSegment>,
        ctx: &mut ParseContext<'_>,
    ) -> Checked {
        let items = match input {
            Some(Value::Array(items)) => items,
            other => {
                ctx.add_issue(path, Issue::invalid_type("array", received_type_of(other)));
                return Err(Invalid);
            }
        };

        let mut valid = true;

        if let Some(min) = self.min {
            if items.len() < min {
                ctx.add_issue(
                    path,
                    Issue::new(
                        IssueCode::TooSmall,
                        format!("Array must contain at least {} element(s)", min),
                    )
                    .with_minimum(min as f64),
                );
                valid = false;
            }
        }

        if let Some(max) = self.max {
            if items.len() > max {
                ctx.add_issue(
                    path,
                    Issue::new(
                        IssueCode::TooBig,
                        format!("Array must contain at most {} element(s)", max),
                    )
                    .with_maximum(max as f64),
                );
                valid = false;
            }
        }

        let mut output = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            path.push(PathSegment::Index(index));
            let checked = self.element.check(Some(item), path, ctx);
            path.pop();

            match checked {
                Ok(value) => output.push(value.unwrap_or(Value::Null)),
                Err(Invalid) => valid = false,
            }
        }

        if valid {
            Ok(Some(Value::Array(output)))
        } else {
            Err(Invalid)
        }
    }
}

/// 带默认值的 schema
#[derive(Debug, Clone)]
pub struct DefaultSchema {
    inner: Box<Schema>,
    value: Value,
}

impl DefaultSchema {
    pub fn inner(&self) -> &Schema {
        &self.inner
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Schema：描述期望的值的形状与类型
#[derive(Debug, Clone)]
pub enum Schema {
    Any,
    String(StringSchema),
    Number(NumberSchema),
    Boolean,
    Literal(Value),
    Enum(Vec<String>),
    Object(ObjectSchema),
    Array(ArraySchema),
    Optional(Box<Schema>),
    Nullable(Box<Schema>),
    Default(DefaultSchema),
}

impl Schema {
    /// 声明的默认值，只有最外层是 `Default` 时才有
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Schema::Default(default) => Some(default.value.clone()),
            _ => None,
        }
    }

    /// 数组的元素 schema
    pub fn element(&self) -> Option<&Schema> {
        match self {
            Schema::Array(array) => Some(array.element()),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Schema::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Schema::Object(_))
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            Schema::Object(object) => Some(object),
            _ => None,
        }
    }

    /// 输出中该值是否可能缺失或为 null
    pub fn is_nullable(&self) -> bool {
        match self {
            Schema::Any | Schema::Optional(_) | Schema::Nullable(_) => true,
            Schema::Default(default) => default.inner.is_nullable(),
            _ => false,
        }
    }

    /// 去掉 `Optional` / `Nullable` / `Default` 包装
    pub fn unwrap_modifiers(&self) -> &Schema {
        match self {
            Schema::Optional(inner) | Schema::Nullable(inner) => inner.unwrap_modifiers(),
            Schema::Default(default) => default.inner.unwrap_modifiers(),
            other => other,
        }
    }

    /// 简短的类型名
    pub fn describe(&self) -> String {
        match self {
            Schema::Any | Schema::Literal(_) => "JSON".to_string(),
            Schema::String(_) | Schema::Enum(_) => "String".to_string(),
            Schema::Number(number) if number.is_int() => "Int".to_string(),
            Schema::Number(_) => "Float".to_string(),
            Schema::Boolean => "Boolean".to_string(),
            Schema::Object(object) => object.name().unwrap_or("Object").to_string(),
            Schema::Array(array) => format!("[{}]", array.element().describe()),
            Schema::Optional(inner) | Schema::Nullable(inner) => inner.describe(),
            Schema::Default(default) => default.inner.describe(),
        }
    }

    fn expected_name(&self) -> String {
        match self {
            Schema::Any => "any".to_string(),
            Schema::String(_) => "string".to_string(),
            Schema::Number(_) => "number".to_string(),
            Schema::Boolean => "boolean".to_string(),
            Schema::Literal(value) => value.to_string(),
            Schema::Enum(options) => join_options(options),
            Schema::Object(_) => "object".to_string(),
            Schema::Array(_) => "array".to_string(),
            Schema::Optional(inner) | Schema::Nullable(inner) => inner.expected_name(),
            Schema::Default(default) => default.inner.expected_name(),
        }
    }

    fn check(
        &self,
        input: Option<&Value>,
        path: &mut Vec<PathSegment>,
        ctx: &mut ParseContext<'_>,
    ) -> Checked {
        match self {
            Schema::Any => Ok(input.cloned()),
            Schema::Optional(inner) => match input {
                None => Ok(None),
                Some(_) => inner.check(input, path, ctx),
            },
            Schema::Nullable(inner) => match input {
                Some(Value::Null) => Ok(Some(Value::Null)),
                _ => inner.check(input, path, ctx),
            },
            Schema::Default(default) => match input {
                None => default.inner.check(Some(&default.value), path, ctx),
                Some(_) => default.inner.check(input, path, ctx),
            },
            Schema::Object(object) => object.check(input, path, ctx),
            Schema::Array(array) => array.check(input, path, ctx),
            Schema::Literal(expected) => match input {
                Some(value) if value == expected => Ok(Some(value.clone())),
                other => {
                    let mut issue = Issue::new(
                        IssueCode::InvalidLiteral,
                        format!("Invalid literal value, expected {}", expected),
                    );
                    issue.expected = Some(expected.to_string());
                    issue.received = Some(received_type_of(other).to_string());
                    ctx.add_issue(path, issue);
                    Err(Invalid)
                }
            },
            Schema::Enum(options) => match input {
                Some(Value::String(value)) if options.contains(value) => {
                    Ok(Some(Value::String(value.clone())))
                }
                Some(Value::String(value)) => {
                    ctx.add_issue(
                        path,
                        Issue::new(
                            IssueCode::InvalidEnumValue,
                            format!(
                                "Invalid enum value. Expected {}, received '{}'",
                                join_options(options),
                                value
                            ),
                        )
                        .with_options(options.clone()),
                    );
                    Err(Invalid)
                }
                other => {
                    ctx.add_issue(
                        path,
                        Issue::invalid_type(join_options(options), received_type_of(other)),
                    );
                    Err(Invalid)
                }
            },
            Schema::String(string) => match input {
                Some(Value::String(value)) => {
                    if string.check(value, path, ctx) {
                        Ok(Some(Value::String(value.clone())))
                    } else {
                        Err(Invalid)
                    }
                }
                other => self.type_mismatch(other, path, ctx),
            },
            Schema::Number(number) => match input {
                Some(Value::Number(value)) => match value.as_f64() {
                    Some(float) if number.check(float, path, ctx) => {
                        Ok(Some(Value::Number(value.clone())))
                    }
                    Some(_) => Err(Invalid),
                    None => self.type_mismatch(input, path, ctx),
                },
                other => self.type_mismatch(other, path, ctx),
            },
            Schema::Boolean => match input {
                Some(Value::Bool(value)) => Ok(Some(Value::Bool(*value))),
                other => self.type_mismatch(other, path, ctx),
            },
        }
    }

    fn type_mismatch(
        &self,
        input: Option<&Value>,
        path: &[PathSegment],
        ctx: &mut ParseContext<'_>,
    ) -> Checked {
        ctx.add_issue(
            path,
            Issue::invalid_type(self.expected_name(), received_type_of(input)),
        );
        Err(Invalid)
    }
}

fn join_options(options: &[String]) -> String {
    options
        .iter()
        .map(|option| format!("'{}'", option))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn run_parse<F>(value: &Value, params: &ParseParams, check: F) -> SchemaResult<Value>
where
    F: FnOnce(Option<&Value>, &mut Vec<PathSegment>, &mut ParseContext<'_>) -> Checked,
{
    let mut ctx = ParseContext::new(params);
    let mut path = Vec::new();
    let parsed = check(Some(value), &mut path, &mut ctx)
        .ok()
        .flatten()
        .unwrap_or(Value::Null);
    ctx.build(parsed)
}

/// 宽松解析的结果，不会以错误形式返回
#[derive(Debug, Clone)]
pub enum SafeParseResult {
    Success(Value),
    Failure(SchemaError),
}

impl SafeParseResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SafeParseResult::Success(_))
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            SafeParseResult::Success(data) => Some(data),
            SafeParseResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SchemaError> {
        match self {
            SafeParseResult::Success(_) => None,
            SafeParseResult::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> SchemaResult<Value> {
        match self {
            SafeParseResult::Success(data) => Ok(data),
            SafeParseResult::Failure(error) => Err(error),
        }
    }
}

impl From<SchemaResult<Value>> for SafeParseResult {
    fn from(result: SchemaResult<Value>) -> Self {
        match result {
            Ok(data) => SafeParseResult::Success(data),
            Err(error) => SafeParseResult::Failure(error),
        }
    }
}

macro_rules! impl_parse {
    ($ty:ty) => {
        impl_parse!($ty, |schema, value, params| {
            run_parse(value, params, |input, path, ctx| schema.check(input, path, ctx))
        });
    };
    // 标量构建器的检查只作用于已解包的值，转换为 `Schema` 后解析
    ($ty:ty, via_schema) => {
        impl_parse!($ty, |schema, value, params| {
            Schema::from(schema.clone()).parse_with(value, params)
        });
    };
    ($ty:ty, |$schema:ident, $value:ident, $params:ident| $body:block) => {
        impl $ty {
            /// 严格解析，失败时返回 `SchemaError`
            pub fn parse(&self, value: &Value) -> SchemaResult<Value> {
                self.parse_with(value, &ParseParams::default())
            }

            pub fn parse_with(&self, $value: &Value, $params: &ParseParams) -> SchemaResult<Value> {
                let $schema = self;
                $body
            }

            /// 宽松解析，结果以 `SafeParseResult` 返回
            pub fn safe_parse(&self, value: &Value) -> SafeParseResult {
                self.parse(value).into()
            }

            pub fn safe_parse_with(&self, value: &Value, params: &ParseParams) -> SafeParseResult {
                self.parse_with(value, params).into()
            }

            /// 异步解析
            pub async fn parse_async(&self, value: &Value) -> SchemaResult<Value> {
                self.parse(value)
            }
        }
    };
}

impl_parse!(Schema);
impl_parse!(ObjectSchema);
impl_parse!(ArraySchema);
impl_parse!(StringSchema, via_schema);
impl_parse!(NumberSchema, via_schema);

impl From<StringSchema> for Schema {
    fn from(schema: StringSchema) -> Self {
        Schema::String(schema)
    }
}

impl From<NumberSchema> for Schema {
    fn from(schema: NumberSchema) -> Self {
        Schema::Number(schema)
    }
}

impl From<ObjectSchema> for Schema {
    fn from(schema: ObjectSchema) -> Self {
        Schema::Object(schema)
    }
}

impl From<ArraySchema> for Schema {
    fn from(schema: ArraySchema) -> Self {
        Schema::Array(schema)
    }
}

/// 修饰方法，适用于所有可以转换为 `Schema` 的构建器
pub trait SchemaExt: Into<Schema> + Sized {
    fn optional(self) -> Schema {
        Schema::Optional(Box::new(self.into()))
    }

    fn nullable(self) -> Schema {
        Schema::Nullable(Box::new(self.into()))
    }

    /// 输入缺失时使用 `value`
    fn default(self, value: impl Into<Value>) -> Schema {
        Schema::Default(DefaultSchema {
            inner: Box::new(self.into()),
            value: value.into(),
        })
    }
}

impl<T: Into<Schema>> SchemaExt for T {}

pub fn string() -> StringSchema {
    StringSchema::new()
}

pub fn number() -> NumberSchema {
    NumberSchema::new()
}

pub fn boolean() -> Schema {
    Schema::Boolean
}

pub fn any() -> Schema {
    Schema::Any
}

pub fn literal(value: impl Into<Value>) -> Schema {
    Schema::Literal(value.into())
}

pub fn enumeration<I, S>(options: I) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Schema::Enum(options.into_iter().map(Into::into).collect())
}

pub fn object() -> ObjectSchema {
    ObjectSchema::new()
}

pub fn array(element: impl Into<Schema>) -> ArraySchema {
    ArraySchema::new(element)
}
