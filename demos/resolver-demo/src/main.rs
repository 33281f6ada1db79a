use chimera_graphql::prelude::*;
use chimera_graphql::{ErrorResponse, OperationKind};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::RwLock;

// ==================== 数据模型 ====================

#[derive(SchemaModel, Debug, Clone, Serialize, Deserialize)]
#[schema(crate = "chimera_graphql::chimera_schema")]
struct Post {
    #[schema(positive)]
    id: u32,

    #[schema(length(min = 1, max = 80))]
    title: String,

    #[schema(default = "draft")]
    status: String,

    tags: Vec<String>,
}

#[derive(SchemaModel, Debug, Deserialize)]
#[schema(name = "CreatePostInput", crate = "chimera_graphql::chimera_schema")]
struct CreatePostInput {
    #[schema(not_blank(message = "标题不能为空"), length(max = 80))]
    title: String,

    #[schema(size(max = 5))]
    tags: Option<Vec<String>>,
}

// ==================== 解析器 ====================

#[derive(Default)]
struct PostResolver {
    posts: RwLock<Vec<Post>>,
}

impl PostResolver {
    fn snapshot(&self) -> Result<Vec<Post>, WebError> {
        self.posts
            .read()
            .map(|posts| posts.clone())
            .map_err(|_| WebError::Internal("post store poisoned".to_string()))
    }
}

#[resolver(auto_register)]
impl PostResolver {
    #[query_with_schema(Vec<Post>, name = "posts", description = "All posts")]
    async fn list_posts(&self) -> Result<Vec<Post>, WebError> {
        self.snapshot()
    }

    #[query_with_schema(Post, name = "post", nullable)]
    fn find_post(&self, args: serde_json::Value) -> Result<Option<Post>, WebError> {
        let id = args["id"].as_u64().unwrap_or_default();
        Ok(self.snapshot()?.into_iter().find(|post| u64::from(post.id) == id))
    }

    #[mutation_with_schema(Post, name = "createPost")]
    async fn create_post(&self, input: CreatePostInput) -> Result<Post, WebError> {
        let mut posts = self
            .posts
            .write()
            .map_err(|_| WebError::Internal("post store poisoned".to_string()))?;

        let post = Post {
            id: posts.len() as u32 + 1,
            title: input.title,
            status: "draft".to_string(),
            tags: input.tags.unwrap_or_default(),
        };
        posts.push(post.clone());
        tracing::info!(id = post.id, "Post created");
        Ok(post)
    }

    /// 返回值不满足 schema 时被拒绝
    #[mutation_with_schema(Post, name = "brokenPost", deprecation_reason = "demo only")]
    fn broken_post(&self) -> Result<serde_json::Value, WebError> {
        Ok(json!({ "id": 0, "title": "", "tags": [] }))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GraphqlConfig::load(&["config", "demos/resolver-demo/config"])?;
    config.logging_config().with_env_overrides().init()?;

    let registry = ResolverRegistry::from_inventory_with_config(config)?;

    println!("{}\n", registry.sdl());

    let created = registry
        .mutation("createPost", json!({ "title": "Hello Chimera", "tags": ["rust"] }))
        .await?;
    tracing::info!(post = %created.to_value(), "createPost");

    let posts = registry.query("posts", json!({})).await?;
    let posts: Vec<Post> = posts.into_typed()?;
    tracing::info!(count = posts.len(), first = ?posts.first(), "posts");

    let found = registry.query("post", json!({ "id": 42 })).await?;
    tracing::info!(post = %found.to_value(), "post (missing)");

    for (kind, name, args) in [
        (OperationKind::Mutation, "createPost", json!({ "title": "   " })),
        (OperationKind::Mutation, "brokenPost", json!({})),
        (OperationKind::Query, "unknown", json!({})),
    ] {
        if let Err(error) = registry.dispatch(kind, name, args).await {
            let response = ErrorResponse::from_error(&error, format!("{}.{}", kind, name));
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
