use chimera_schema::prelude::*;
use serde_json::json;

#[derive(SchemaModel)]
#[allow(dead_code)]
struct Address {
    #[schema(not_blank)]
    city: String,
    zip: Option<String>,
}

#[derive(SchemaModel)]
#[schema(name = "Member", strict)]
#[allow(dead_code)]
struct RegisterUserRequest {
    #[schema(length(min = 2, max = 20, message = "用户名长度必须在2-20个字符之间"))]
    username: String,

    #[schema(email(message = "请输入有效的邮箱地址"))]
    email: String,

    #[schema(range(min = 18, max = 120), default = 18)]
    age: u32,

    #[schema(pattern = r"^1[3-9]\d{9}$")]
    phone: Option<String>,

    #[schema(size(max = 3), not_blank)]
    tags: Vec<String>,

    #[schema(rename = "homeAddress")]
    address: Option<Address>,

    score: f64,
    active: bool,
    metadata: serde_json::Value,
}

fn valid_input() -> serde_json::Value {
    json!({
        "username": "ann",
        "email": "ann@example.com",
        "tags": ["a"],
        "score": 9.5,
        "active": true,
        "metadata": { "any": ["thing"] }
    })
}

#[test]
fn test_derived_schema_shape() {
    let schema = RegisterUserRequest::schema();

    assert_eq!(schema.name(), Some("Member"));
    let keys: Vec<&str> = schema.keys().collect();
    assert_eq!(
        keys,
        vec!["username", "email", "age", "phone", "tags", "homeAddress", "score", "active", "metadata"]
    );
    assert_eq!(schema.get("age").unwrap().default_value(), Some(json!(18)));
    assert!(schema.get("phone").unwrap().is_nullable());
    assert_eq!(schema.get("tags").unwrap().describe(), "[String]");
    assert_eq!(schema.get("homeAddress").unwrap().describe(), "Address");
}

#[test]
fn test_derived_schema_accepts_valid_input() {
    let parsed = RegisterUserRequest::schema().parse(&valid_input()).unwrap();
    assert_eq!(parsed["age"], json!(18));
    assert!(parsed.get("phone").is_none());
}

#[test]
fn test_derived_schema_reports_custom_messages() {
    let mut input = valid_input();
    input["username"] = json!("a");
    input["email"] = json!("not-an-email");

    let error = RegisterUserRequest::schema().parse(&input).unwrap_err();
    assert_eq!(error.issues[0].message, "用户名长度必须在2-20个字符之间");
    assert_eq!(error.issues[1].message, "请输入有效的邮箱地址");
}

#[test]
fn test_derived_rules_on_wrapped_types() {
    let mut input = valid_input();
    input["age"] = json!(12);
    input["phone"] = json!("123");
    input["tags"] = json!(["a", " ", "c", "d"]);
    input["homeAddress"] = json!({ "city": "" });

    let error = RegisterUserRequest::schema().parse(&input).unwrap_err();
    let paths: Vec<String> = error.issues.iter().map(|i| i.path_string()).collect();
    assert_eq!(paths, vec!["age", "phone", "tags", "tags.1", "homeAddress.city"]);
}

#[test]
fn test_derived_strict_rejects_unknown_keys() {
    let mut input = valid_input();
    input["unknown"] = json!(1);

    let error = RegisterUserRequest::schema().parse(&input).unwrap_err();
    assert_eq!(error.issues[0].code, IssueCode::UnrecognizedKeys);
}

#[derive(SchemaModel)]
#[allow(dead_code)]
struct Counter {
    count: u8,
    delta: i16,
    total: u64,
    #[schema(range(max = 10))]
    retries: Option<u32>,
}

#[test]
fn test_integer_fields_respect_type_range() {
    let schema = Counter::schema();
    assert!(schema
        .parse(&json!({ "count": 255, "delta": -32768, "total": 0 }))
        .is_ok());

    let error = schema
        .parse(&json!({ "count": -1, "delta": 40000, "total": -5, "retries": 11 }))
        .unwrap_err();
    let issues: Vec<(String, IssueCode)> = error
        .issues
        .iter()
        .map(|issue| (issue.path_string(), issue.code))
        .collect();
    assert_eq!(
        issues,
        vec![
            ("count".to_string(), IssueCode::TooSmall),
            ("delta".to_string(), IssueCode::TooBig),
            ("total".to_string(), IssueCode::TooSmall),
            ("retries".to_string(), IssueCode::TooBig),
        ]
    );

    let error = schema.parse(&json!({ "count": 300, "delta": 0, "total": 1 })).unwrap_err();
    assert_eq!(error.issues[0].path_string(), "count");
    assert_eq!(error.issues[0].message, "Number must be less than or equal to 255");
}

mod custom {
    use chimera_schema::prelude::*;

    #[derive(SchemaModel)]
    #[allow(dead_code)]
    pub struct Value {
        pub label: String,
    }
}

#[derive(SchemaModel)]
#[schema(crate = "chimera_schema")]
#[allow(dead_code)]
struct Annotated {
    note: custom::Value,
    raw: serde_json::Value,
}

#[test]
fn test_only_json_value_accepts_anything() {
    let schema = Annotated::schema();
    assert_eq!(schema.get("note").unwrap().describe(), "Value");

    assert!(schema
        .parse(&json!({ "note": { "label": "x" }, "raw": [1, "two", null] }))
        .is_ok());

    let error = schema.parse(&json!({ "note": 5, "raw": 5 })).unwrap_err();
    assert_eq!(error.issues.len(), 1);
    assert_eq!(error.issues[0].path_string(), "note");
}
