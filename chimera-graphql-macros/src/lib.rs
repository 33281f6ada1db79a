//! Chimera GraphQL Macros
//!
//! 提供解析器相关的过程宏

mod resolver;

use proc_macro::TokenStream;

/// 处理解析器实现块，提取 Query / Mutation 方法并生成注册代码
///
/// 加上 `auto_register` 时通过 `inventory` 自动注册，要求解析器实现 `Default`
///
/// # 示例
///
/// ```ignore
/// #[derive(Default)]
/// struct PostResolver;
///
/// #[resolver(auto_register)]
/// impl PostResolver {
///     #[query_with_schema(Vec<Post>, name = "posts", description = "All posts")]
///     async fn list(&self) -> Result<Vec<Post>, WebError> {
///         Ok(vec![])
///     }
///
///     #[mutation_with_schema(Post, safe, do_not_throw)]
///     fn create_post(&self, input: CreatePostInput) -> Result<Post, WebError> {
///         // input 已经通过 CreatePostInput::schema() 校验
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn resolver(attr: TokenStream, item: TokenStream) -> TokenStream {
    resolver::resolver_impl(attr, item)
}

/// Query 操作标记
///
/// 只在 `#[resolver]` 实现块中生效，单独使用时方法保持不变
#[proc_macro_attribute]
pub fn query_with_schema(_attr: TokenStream, item: TokenStream) -> TokenStream {
    item
}

/// Mutation 操作标记
///
/// 只在 `#[resolver]` 实现块中生效，单独使用时方法保持不变
#[proc_macro_attribute]
pub fn mutation_with_schema(_attr: TokenStream, item: TokenStream) -> TokenStream {
    item
}
