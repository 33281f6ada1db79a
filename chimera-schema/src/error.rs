use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// 问题路径中的一段：对象键或数组下标
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// 问题类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    InvalidType,
    InvalidLiteral,
    InvalidEnumValue,
    InvalidString,
    TooSmall,
    TooBig,
    UnrecognizedKeys,
    Custom,
}

/// 单条验证问题
///
/// 序列化格式与常见前端校验库保持一致，可以直接作为 400 响应的 `details` 返回
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub code: IssueCode,
    pub path: Vec<PathSegment>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl Issue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            path: Vec::new(),
            message: message.into(),
            expected: None,
            received: None,
            minimum: None,
            maximum: None,
            validation: None,
            keys: None,
            options: None,
        }
    }

    /// 类型不匹配
    pub fn invalid_type(expected: impl Into<String>, received: impl Into<String>) -> Self {
        let expected = expected.into();
        let received = received.into();
        let message = if received == "undefined" {
            "Required".to_string()
        } else {
            format!("Expected {}, received {}", expected, received)
        };

        let mut issue = Self::new(IssueCode::InvalidType, message);
        issue.expected = Some(expected);
        issue.received = Some(received);
        issue
    }

    /// 自定义问题
    pub fn custom(message: impl Into<String>) -> Self {
        Self::new(IssueCode::Custom, message)
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn with_validation(mut self, validation: impl Into<String>) -> Self {
        self.validation = Some(validation.into());
        self
    }

    pub fn with_keys(mut self, keys: Vec<String>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }

    /// 覆盖默认消息（来自字段级 `message` 配置）
    pub fn with_message(mut self, message: Option<&str>) -> Self {
        if let Some(message) = message {
            self.message = message.to_string();
        }
        self
    }

    /// 以点号连接的路径，例如 `users.0.email`
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(|segment| segment.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path_string(), self.message)
        }
    }
}

fn summarize(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// 验证错误，携带全部问题
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Schema validation failed: {}", summarize(.issues))]
pub struct SchemaError {
    pub issues: Vec<Issue>,
}

impl SchemaError {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    /// 按路径分组的消息，便于表单类场景展示
    pub fn flatten(&self) -> std::collections::HashMap<String, Vec<String>> {
        let mut errors = std::collections::HashMap::new();
        for issue in &self.issues {
            errors
                .entry(issue.path_string())
                .or_insert_with(Vec::new)
                .push(issue.message.clone());
        }
        errors
    }

    pub fn merge(&mut self, other: SchemaError) {
        self.issues.extend(other.issues);
    }
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// 自定义消息映射，返回 `None` 时保留默认消息
pub type ErrorMap = Arc<dyn Fn(&Issue) -> Option<String> + Send + Sync>;

/// 解析参数
///
/// `path` 会作为前缀拼接到每条问题的路径上，`error_map` 可以改写问题消息
#[derive(Clone, Default)]
pub struct ParseParams {
    pub path: Vec<PathSegment>,
    pub error_map: Option<ErrorMap>,
}

impl ParseParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path<I, P>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathSegment>,
    {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_error_map<F>(mut self, error_map: F) -> Self
    where
        F: Fn(&Issue) -> Option<String> + Send + Sync + 'static,
    {
        self.error_map = Some(Arc::new(error_map));
        self
    }
}

impl fmt::Debug for ParseParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseParams")
            .field("path", &self.path)
            .field("error_map", &self.error_map.is_some())
            .finish()
    }
}

/// 单次解析过程中的问题收集器
pub(crate) struct ParseContext<'a> {
    params: &'a ParseParams,
    issues: Vec<Issue>,
}

impl<'a> ParseContext<'a> {
    pub(crate) fn new(params: &'a ParseParams) -> Self {
        Self {
            params,
            issues: Vec::new(),
        }
    }

    pub(crate) fn add_issue(&mut self, path: &[PathSegment], mut issue: Issue) {
        issue.path = self
            .params
            .path
            .iter()
            .chain(path.iter())
            .cloned()
            .collect();

        if let Some(error_map) = &self.params.error_map {
            if let Some(message) = error_map(&issue) {
                issue.message = message;
            }
        }

        self.issues.push(issue);
    }

    pub(crate) fn build<T>(self, value: T) -> SchemaResult<T> {
        if self.issues.is_empty() {
            Ok(value)
        } else {
            Err(SchemaError::new(self.issues))
        }
    }
}
