//! 标量校验规则
//!
//! 字符串与数值 schema 的检查项，每个检查项都可以通过 `message` 覆盖默认消息

use crate::error::{Issue, IssueCode, ParseContext, PathSegment};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex is valid")
});

#[derive(Debug, Clone)]
enum StringCheckKind {
    Min(usize),
    Max(usize),
    Length(usize),
    Email,
    Regex(Regex),
    /// 构建时编译失败的正则，任何输入都会报告问题
    BrokenPattern(String),
    NotBlank,
}

#[derive(Debug, Clone)]
struct StringCheck {
    kind: StringCheckKind,
    message: Option<String>,
}

/// 字符串 schema
#[derive(Debug, Clone)]
pub struct StringSchema {
    checks: Vec<StringCheck>,
}

impl StringSchema {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    fn push(mut self, kind: StringCheckKind) -> Self {
        self.checks.push(StringCheck { kind, message: None });
        self
    }

    /// 最少字符数
    pub fn min(self, min: usize) -> Self {
        self.push(StringCheckKind::Min(min))
    }

    /// 最多字符数
    pub fn max(self, max: usize) -> Self {
        self.push(StringCheckKind::Max(max))
    }

    /// 精确字符数
    pub fn length(self, length: usize) -> Self {
        self.push(StringCheckKind::Length(length))
    }

    pub fn email(self) -> Self {
        self.push(StringCheckKind::Email)
    }

    /// 去除首尾空白后不能为空
    pub fn not_blank(self) -> Self {
        self.push(StringCheckKind::NotBlank)
    }

    /// 正则匹配
    ///
    /// 非法的正则不会 panic，而是让每次解析都报告 `custom` 问题
    pub fn regex(self, pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => self.push(StringCheckKind::Regex(regex)),
            Err(e) => {
                tracing::warn!(pattern = pattern, error = %e, "Invalid regex pattern in string schema");
                self.push(StringCheckKind::BrokenPattern(e.to_string()))
            }
        }
    }

    /// 使用已编译的正则
    pub fn matches(self, regex: Regex) -> Self {
        self.push(StringCheckKind::Regex(regex))
    }

    /// 为最近添加的检查项设置自定义消息
    pub fn message(mut self, message: impl Into<String>) -> Self {
        if let Some(last) = self.checks.last_mut() {
            last.message = Some(message.into());
        }
        self
    }

    pub(crate) fn check(&self, value: &str, path: &[PathSegment], ctx: &mut ParseContext<'_>) -> bool {
        let len = value.chars().count();
        let mut valid = true;

        for check in &self.checks {
            let message = check.message.as_deref();
            let issue = match &check.kind {
                StringCheckKind::Min(min) if len < *min => Some(
                    Issue::new(
                        IssueCode::TooSmall,
                        format!("String must contain at least {} character(s)", min),
                    )
                    .with_minimum(*min as f64),
                ),
                StringCheckKind::Max(max) if len > *max => Some(
                    Issue::new(
                        IssueCode::TooBig,
                        format!("String must contain at most {} character(s)", max),
                    )
                    .with_maximum(*max as f64),
                ),
                StringCheckKind::Length(expected) if len < *expected => Some(
                    Issue::new(
                        IssueCode::TooSmall,
                        format!("String must contain exactly {} character(s)", expected),
                    )
                    .with_minimum(*expected as f64),
                ),
                StringCheckKind::Length(expected) if len > *expected => Some(
                    Issue::new(
                        IssueCode::TooBig,
                        format!("String must contain exactly {} character(s)", expected),
                    )
                    .with_maximum(*expected as f64),
                ),
                StringCheckKind::Email if !EMAIL_REGEX.is_match(value) => Some(
                    Issue::new(IssueCode::InvalidString, "Invalid email").with_validation("email"),
                ),
                StringCheckKind::Regex(regex) if !regex.is_match(value) => {
                    Some(Issue::new(IssueCode::InvalidString, "Invalid").with_validation("regex"))
                }
                StringCheckKind::BrokenPattern(error) => {
                    Some(Issue::custom(format!("Invalid regex pattern: {}", error)))
                }
                StringCheckKind::NotBlank if value.trim().is_empty() => Some(
                    Issue::new(IssueCode::InvalidString, "String must not be blank")
                        .with_validation("not_blank"),
                ),
                _ => None,
            };

            if let Some(issue) = issue {
                ctx.add_issue(path, issue.with_message(message));
                valid = false;
            }
        }

        valid
    }
}

impl Default for StringSchema {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
enum NumberCheckKind {
    Int,
    Min(f64),
    Max(f64),
    Positive,
}

#[derive(Debug, Clone)]
struct NumberCheck {
    kind: NumberCheckKind,
    message: Option<String>,
}

/// 数值 schema
#[derive(Debug, Clone)]
pub struct NumberSchema {
    checks: Vec<NumberCheck>,
}

impl NumberSchema {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    fn push(mut self, kind: NumberCheckKind) -> Self {
        self.checks.push(NumberCheck { kind, message: None });
        self
    }

    /// 必须是整数
    pub fn int(self) -> Self {
        self.push(NumberCheckKind::Int)
    }

    /// 大于等于 `min`
    pub fn min(self, min: f64) -> Self {
        self.push(NumberCheckKind::Min(min))
    }

    /// 小于等于 `max`
    pub fn max(self, max: f64) -> Self {
        self.push(NumberCheckKind::Max(max))
    }

    /// 大于 0
    pub fn positive(self) -> Self {
        self.push(NumberCheckKind::Positive)
    }

    /// 大于等于 0
    pub fn nonnegative(self) -> Self {
        self.min(0.0)
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        if let Some(last) = self.checks.last_mut() {
            last.message = Some(message.into());
        }
        self
    }

    pub fn is_int(&self) -> bool {
        self.checks
            .iter()
            .any(|check| matches!(check.kind, NumberCheckKind::Int))
    }

    pub(crate) fn check(&self, value: f64, path: &[PathSegment], ctx: &mut ParseContext<'_>) -> bool {
        let mut valid = true;

        for check in &self.checks {
            let issue = match check.kind {
                NumberCheckKind::Int if value.fract() != 0.0 => {
                    Some(Issue::invalid_type("integer", "float"))
                }
                NumberCheckKind::Min(min) if value < min => Some(
                    Issue::new(
                        IssueCode::TooSmall,
                        format!("Number must be greater than or equal to {}", min),
                    )
                    .with_minimum(min),
                ),
                NumberCheckKind::Max(max) if value > max => Some(
                    Issue::new(
                        IssueCode::TooBig,
                        format!("Number must be less than or equal to {}", max),
                    )
                    .with_maximum(max),
                ),
                NumberCheckKind::Positive if value <= 0.0 => Some(
                    Issue::new(IssueCode::TooSmall, "Number must be greater than 0").with_minimum(0.0),
                ),
                _ => None,
            };

            if let Some(issue) = issue {
                ctx.add_issue(path, issue.with_message(check.message.as_deref()));
                valid = false;
            }
        }

        valid
    }
}

impl Default for NumberSchema {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseParams;

    fn run_string(schema: &StringSchema, value: &str) -> Vec<Issue> {
        let params = ParseParams::new();
        let mut ctx = ParseContext::new(&params);
        schema.check(value, &[], &mut ctx);
        ctx.build(()).err().map(|e| e.issues).unwrap_or_default()
    }

    fn run_number(schema: &NumberSchema, value: f64) -> Vec<Issue> {
        let params = ParseParams::new();
        let mut ctx = ParseContext::new(&params);
        schema.check(value, &[], &mut ctx);
        ctx.build(()).err().map(|e| e.issues).unwrap_or_default()
    }

    #[test]
    fn test_string_length_rules() {
        let schema = StringSchema::new().min(2).max(4);

        assert!(run_string(&schema, "abc").is_empty());

        let issues = run_string(&schema, "a");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::TooSmall);
        assert_eq!(issues[0].message, "String must contain at least 2 character(s)");

        let issues = run_string(&schema, "abcde");
        assert_eq!(issues[0].code, IssueCode::TooBig);
    }

    #[test]
    fn test_string_collects_every_failing_check() {
        let schema = StringSchema::new().min(5).email();
        let issues = run_string(&schema, "a@b");
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[1].validation.as_deref(), Some("email"));
    }

    #[test]
    fn test_custom_message_applies_to_last_check() {
        let schema = StringSchema::new().min(2).email().message("邮箱格式错误");
        let issues = run_string(&schema, "x");
        assert_eq!(issues[0].message, "String must contain at least 2 character(s)");
        assert_eq!(issues[1].message, "邮箱格式错误");
    }

    #[test]
    fn test_not_blank() {
        let schema = StringSchema::new().not_blank();
        assert!(run_string(&schema, " a ").is_empty());
        assert_eq!(run_string(&schema, "   ").len(), 1);
    }

    #[test]
    fn test_broken_pattern_reports_custom_issue() {
        let schema = StringSchema::new().regex("([a-z");
        let issues = run_string(&schema, "abc");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::Custom);
        assert!(issues[0].message.starts_with("Invalid regex pattern"));
    }

    #[test]
    fn test_regex() {
        let schema = StringSchema::new().regex(r"^1[3-9]\d{9}$");
        assert!(run_string(&schema, "13812345678").is_empty());
        assert_eq!(run_string(&schema, "12345").len(), 1);
    }

    #[test]
    fn test_number_rules() {
        let schema = NumberSchema::new().int().min(18.0).max(120.0);
        assert!(schema.is_int());
        assert!(run_number(&schema, 30.0).is_empty());

        let issues = run_number(&schema, 17.5);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].message, "Expected integer, received float");
        assert_eq!(issues[1].message, "Number must be greater than or equal to 18");

        let issues = run_number(&schema, 121.0);
        assert_eq!(issues[0].code, IssueCode::TooBig);
    }

    #[test]
    fn test_positive() {
        let schema = NumberSchema::new().positive();
        assert!(run_number(&schema, 0.1).is_empty());
        assert_eq!(run_number(&schema, 0.0)[0].code, IssueCode::TooSmall);
    }
}
