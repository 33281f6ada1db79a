use chimera_graphql::prelude::*;
use chimera_graphql::OperationKind;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(SchemaModel, Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Book {
    #[schema(length(min = 1))]
    title: String,

    #[schema(range(min = 0))]
    pages: i64,

    #[schema(default = "unknown")]
    author: String,
}

#[derive(SchemaModel, Debug, Deserialize)]
struct AddBookInput {
    #[schema(not_blank)]
    title: String,
    pages: Option<i64>,
}

#[derive(Default)]
struct LibraryResolver {
    calls: AtomicUsize,
}

#[resolver]
impl LibraryResolver {
    #[query_with_schema(Vec<Book>, name = "books", description = "Every book")]
    async fn list_books(&self) -> Result<Vec<Book>, WebError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Book {
            title: "Dune".into(),
            pages: 412,
            author: "Herbert".into(),
        }])
    }

    #[query_with_schema(Book, name = "book", nullable)]
    fn find_book(&self, args: Value) -> Result<Option<Value>, WebError> {
        match args["title"].as_str() {
            Some("Dune") => Ok(Some(json!({ "title": "Dune", "pages": 412 }))),
            _ => Ok(None),
        }
    }

    #[mutation_with_schema(Book, name = "addBook")]
    async fn add_book(&self, input: AddBookInput) -> Result<Value, WebError> {
        Ok(json!({ "title": input.title, "pages": input.pages.unwrap_or(-1) }))
    }

    #[mutation_with_schema(Book, name = "rawBook", parse_to_instance = false, deprecation_reason = "use addBook")]
    fn raw_book(&self) -> Result<Value, WebError> {
        Ok(json!({ "title": "Raw", "pages": 1, "extra": true }))
    }

    #[mutation_with_schema(Book, name = "failing")]
    async fn failing(&self) -> Result<Book, WebError> {
        Err(WebError::Internal("storage offline".into()))
    }

    fn helper(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn registry() -> (Arc<LibraryResolver>, ResolverRegistry) {
    let resolver = Arc::new(LibraryResolver::default());
    let mut registry = ResolverRegistry::new();
    Arc::clone(&resolver).__register_operations(&mut registry).unwrap();
    (resolver, registry)
}

#[test]
fn test_operations_are_collected() {
    assert_eq!(
        LibraryResolver::__get_operations(),
        &[
            ("Query", "books"),
            ("Query", "book"),
            ("Mutation", "addBook"),
            ("Mutation", "rawBook"),
            ("Mutation", "failing"),
        ]
    );

    let (_, registry) = registry();
    assert_eq!(registry.len(), 5);
    assert_eq!(
        registry.operation(OperationKind::Mutation, "addBook").unwrap().method_name(),
        "add_book"
    );
}

#[test]
fn test_registering_twice_conflicts() {
    let (resolver, mut registry) = registry();
    let error = resolver.__register_operations(&mut registry).unwrap_err();
    assert!(matches!(error, WebError::Conflict(_)));
}

#[tokio::test]
async fn test_async_query_returns_instances() {
    let (resolver, registry) = registry();

    let books = registry.query("books", json!({})).await.unwrap();
    let items = books.as_list().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_instance().unwrap().class().name(), "Book");
    assert_eq!(resolver.helper(), 1);

    let typed: Vec<Book> = books.into_typed().unwrap();
    assert_eq!(typed[0].author, "Herbert");
}

#[tokio::test]
async fn test_sync_nullable_query() {
    let (_, registry) = registry();

    let found = registry.query("book", json!({ "title": "Dune" })).await.unwrap();
    let book = found.as_instance().unwrap();
    assert_eq!(book.get("author"), Some(json!("unknown")));

    let missing = registry.query("book", json!({ "title": "Emma" })).await.unwrap();
    assert_eq!(missing.to_value(), Value::Null);
}

#[tokio::test]
async fn test_mutation_binds_and_validates_arguments() {
    let (_, registry) = registry();

    let added = registry
        .mutation("addBook", json!({ "title": "Emma", "pages": 300 }))
        .await
        .unwrap();
    assert_eq!(added.to_value(), json!({ "title": "Emma", "pages": 300, "author": "unknown" }));

    let error = registry.mutation("addBook", json!({ "title": " " })).await.unwrap_err();
    assert!(error.is_bad_request());
    assert_eq!(error.issues().unwrap()[0].path_string(), "title");
}

#[tokio::test]
async fn test_invalid_output_is_bad_request() {
    let (_, registry) = registry();

    // pages 缺省时返回 -1，不满足 range(min = 0)
    let error = registry.mutation("addBook", json!({ "title": "Emma" })).await.unwrap_err();
    assert!(error.is_bad_request());
    assert_eq!(error.issues().unwrap()[0].path_string(), "pages");
}

#[tokio::test]
async fn test_parse_to_instance_disabled() {
    let (_, registry) = registry();

    let raw = registry.mutation("rawBook", json!({})).await.unwrap();
    assert!(raw.is_plain());
    assert_eq!(raw.to_value(), json!({ "title": "Raw", "pages": 1, "author": "unknown" }));
}

#[tokio::test]
async fn test_handler_errors_pass_through() {
    let (_, registry) = registry();

    let error = registry.mutation("failing", json!({})).await.unwrap_err();
    assert!(matches!(error, WebError::Internal(message) if message == "storage offline"));

    let error = registry.query("missing", json!({})).await.unwrap_err();
    assert!(matches!(error, WebError::NotFound(_)));
}

#[test]
fn test_sdl_output() {
    let (_, registry) = registry();
    let sdl = registry.sdl();

    assert!(sdl.starts_with("type Book {\n  title: String!\n  pages: Int!\n  author: String!\n}"));
    assert!(sdl.contains("type Query {\n  \"\"\"Every book\"\"\"\n  books: [Book!]!\n  book: Book\n}"));
    assert!(sdl.contains("  rawBook: Book! @deprecated(reason: \"use addBook\")"));
}
