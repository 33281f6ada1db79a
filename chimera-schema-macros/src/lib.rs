use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{
    parse_macro_input, Data, DeriveInput, Expr, Fields, GenericArgument, Ident, LitInt, LitStr, Path, PathArguments,
    Type,
};

// 字段类型分类
enum FieldKind {
    Option(Box<FieldKind>),
    Vec(Box<FieldKind>),
    String,
    Int(Ident),
    Float,
    Bool,
    Json,
    Nested(Type),
}

// 只接受 `Value` 或 `serde_json::Value`
fn is_json_value(path: &Path) -> bool {
    let segments: Vec<String> = path.segments.iter().map(|segment| segment.ident.to_string()).collect();
    match segments.as_slice() {
        [last] => last == "Value",
        [.., module, last] => module == "serde_json" && last == "Value",
        [] => false,
    }
}

// 提取泛型参数 `Wrapper<T>` 中的 T
fn generic_argument(args: &PathArguments) -> Option<&Type> {
    if let PathArguments::AngleBracketed(args) = args {
        if let Some(GenericArgument::Type(ty)) = args.args.first() {
            return Some(ty);
        }
    }
    None
}

fn classify(ty: &Type) -> FieldKind {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            let ident = segment.ident.to_string();
            match ident.as_str() {
                "Option" => {
                    if let Some(inner) = generic_argument(&segment.arguments) {
                        return FieldKind::Option(Box::new(classify(inner)));
                    }
                }
                "Vec" => {
                    if let Some(inner) = generic_argument(&segment.arguments) {
                        return FieldKind::Vec(Box::new(classify(inner)));
                    }
                }
                "String" => return FieldKind::String,
                "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
                | "u128" | "usize" => return FieldKind::Int(segment.ident.clone()),
                "f32" | "f64" => return FieldKind::Float,
                "bool" => return FieldKind::Bool,
                "Value" if is_json_value(&type_path.path) => return FieldKind::Json,
                _ => {}
            }
        }
    }
    FieldKind::Nested(ty.clone())
}

// 字段验证规则，与 chimera_schema 的构建器方法一一对应
enum Rule {
    NotBlank(Option<LitStr>),
    NotEmpty(Option<LitStr>),
    Email(Option<LitStr>),
    Length {
        min: Option<LitInt>,
        max: Option<LitInt>,
        equal: Option<LitInt>,
        message: Option<LitStr>,
    },
    Pattern(LitStr),
    Range {
        min: Option<Expr>,
        max: Option<Expr>,
        message: Option<LitStr>,
    },
    Positive(Option<LitStr>),
    Size {
        min: Option<LitInt>,
        max: Option<LitInt>,
    },
}

impl Rule {
    fn name(&self) -> &'static str {
        match self {
            Rule::NotBlank(_) => "not_blank",
            Rule::NotEmpty(_) => "not_empty",
            Rule::Email(_) => "email",
            Rule::Length { .. } => "length",
            Rule::Pattern(_) => "pattern",
            Rule::Range { .. } => "range",
            Rule::Positive(_) => "positive",
            Rule::Size { .. } => "size",
        }
    }

    fn is_string_rule(&self) -> bool {
        matches!(
            self,
            Rule::NotBlank(_) | Rule::NotEmpty(_) | Rule::Email(_) | Rule::Length { .. } | Rule::Pattern(_)
        )
    }

    fn is_number_rule(&self) -> bool {
        matches!(self, Rule::Range { .. } | Rule::Positive(_))
    }
}

#[derive(Default)]
struct FieldOptions {
    rules: Vec<Rule>,
    default: Option<Expr>,
    rename: Option<LitStr>,
}

// 解析形如 `email(message = "...")` 的可选消息
fn parse_message(meta: &ParseNestedMeta) -> syn::Result<Option<LitStr>> {
    let mut message = None;
    if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| {
            if inner.path.is_ident("message") {
                message = Some(inner.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(inner.error("expected `message`"))
            }
        })?;
    }
    Ok(message)
}

fn parse_field_options(field: &syn::Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("schema") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("not_blank") {
                options.rules.push(Rule::NotBlank(parse_message(&meta)?));
            } else if meta.path.is_ident("not_empty") {
                options.rules.push(Rule::NotEmpty(parse_message(&meta)?));
            } else if meta.path.is_ident("email") {
                options.rules.push(Rule::Email(parse_message(&meta)?));
            } else if meta.path.is_ident("positive") {
                options.rules.push(Rule::Positive(parse_message(&meta)?));
            } else if meta.path.is_ident("pattern") {
                options.rules.push(Rule::Pattern(meta.value()?.parse()?));
            } else if meta.path.is_ident("default") {
                options.default = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("rename") {
                options.rename = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("length") {
                let (mut min, mut max, mut equal, mut message) = (None, None, None, None);
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("min") {
                        min = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("max") {
                        max = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("equal") {
                        equal = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("message") {
                        message = Some(inner.value()?.parse()?);
                    } else {
                        return Err(inner.error("expected `min`, `max`, `equal` or `message`"));
                    }
                    Ok(())
                })?;
                options.rules.push(Rule::Length { min, max, equal, message });
            } else if meta.path.is_ident("range") {
                let (mut min, mut max, mut message) = (None, None, None);
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("min") {
                        min = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("max") {
                        max = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("message") {
                        message = Some(inner.value()?.parse()?);
                    } else {
                        return Err(inner.error("expected `min`, `max` or `message`"));
                    }
                    Ok(())
                })?;
                options.rules.push(Rule::Range { min, max, message });
            } else if meta.path.is_ident("size") {
                let (mut min, mut max) = (None, None);
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("min") {
                        min = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("max") {
                        max = Some(inner.value()?.parse()?);
                    } else {
                        return Err(inner.error("expected `min` or `max`"));
                    }
                    Ok(())
                })?;
                options.rules.push(Rule::Size { min, max });
            } else {
                return Err(meta.error("unsupported schema attribute"));
            }
            Ok(())
        })?;
    }

    Ok(options)
}

fn with_message(check: TokenStream2, message: &Option<LitStr>) -> TokenStream2 {
    match message {
        Some(message) => quote! { #check.message(#message) },
        None => check,
    }
}

fn string_schema(krate: &Path, rules: &[&Rule]) -> TokenStream2 {
    let mut expr = quote! { #krate::string() };
    for rule in rules {
        expr = match rule {
            Rule::NotBlank(message) => with_message(quote! { #expr.not_blank() }, message),
            Rule::NotEmpty(message) => with_message(quote! { #expr.min(1) }, message),
            Rule::Email(message) => with_message(quote! { #expr.email() }, message),
            Rule::Pattern(pattern) => quote! { #expr.regex(#pattern) },
            Rule::Length { min, max, equal, message } => {
                if let Some(min) = min {
                    expr = with_message(quote! { #expr.min(#min) }, message);
                }
                if let Some(max) = max {
                    expr = with_message(quote! { #expr.max(#max) }, message);
                }
                if let Some(equal) = equal {
                    expr = with_message(quote! { #expr.length(#equal) }, message);
                }
                expr
            }
            _ => expr,
        };
    }
    expr
}

fn number_schema(base: TokenStream2, rules: &[&Rule]) -> TokenStream2 {
    let mut expr = base;
    for rule in rules {
        expr = match rule {
            Rule::Positive(message) => with_message(quote! { #expr.positive() }, message),
            Rule::Range { min, max, message } => {
                if let Some(min) = min {
                    expr = with_message(quote! { #expr.min((#min) as f64) }, message);
                }
                if let Some(max) = max {
                    expr = with_message(quote! { #expr.max((#max) as f64) }, message);
                }
                expr
            }
            _ => expr,
        };
    }
    expr
}

// 整数类型自身的取值范围；超出 f64 精确表示范围的有符号类型不加边界
fn integer_bounds(ty: &Ident) -> TokenStream2 {
    match ty.to_string().as_str() {
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => quote! { .min(#ty::MIN as f64).max(#ty::MAX as f64) },
        "u64" | "u128" | "usize" => quote! { .nonnegative() },
        _ => quote! {},
    }
}

fn reject_rules(rules: &[&Rule], span: Span, kind: &str) -> syn::Result<()> {
    match rules.first() {
        Some(rule) => Err(syn::Error::new(
            span,
            format!("`{}` cannot be applied to {} fields", rule.name(), kind),
        )),
        None => Ok(()),
    }
}

// 根据字段类型生成 schema 表达式，规则作用于最内层的标量
fn build_schema(krate: &Path, kind: &FieldKind, rules: &[&Rule], span: Span) -> syn::Result<TokenStream2> {
    match kind {
        FieldKind::Option(inner) => {
            let inner = build_schema(krate, inner, rules, span)?;
            Ok(quote! { #krate::SchemaExt::optional(#inner) })
        }
        FieldKind::Vec(inner) => {
            let (size, rest): (Vec<&Rule>, Vec<&Rule>) =
                rules.iter().copied().partition(|rule| matches!(rule, Rule::Size { .. }));
            let element = build_schema(krate, inner, &rest, span)?;
            let mut expr = quote! { #krate::array(#element) };
            for rule in size {
                if let Rule::Size { min, max } = rule {
                    if let Some(min) = min {
                        expr = quote! { #expr.min(#min) };
                    }
                    if let Some(max) = max {
                        expr = quote! { #expr.max(#max) };
                    }
                }
            }
            Ok(expr)
        }
        FieldKind::String => {
            let invalid: Vec<&Rule> = rules.iter().copied().filter(|rule| !rule.is_string_rule()).collect();
            reject_rules(&invalid, span, "string")?;
            Ok(string_schema(krate, rules))
        }
        FieldKind::Int(_) | FieldKind::Float => {
            let invalid: Vec<&Rule> = rules.iter().copied().filter(|rule| !rule.is_number_rule()).collect();
            reject_rules(&invalid, span, "numeric")?;
            let base = match kind {
                FieldKind::Int(ty) => {
                    let bounds = integer_bounds(ty);
                    quote! { #krate::number().int() #bounds }
                }
                _ => quote! { #krate::number() },
            };
            Ok(number_schema(base, rules))
        }
        FieldKind::Bool => {
            reject_rules(rules, span, "boolean")?;
            Ok(quote! { #krate::boolean() })
        }
        FieldKind::Json => {
            reject_rules(rules, span, "JSON")?;
            Ok(quote! { #krate::any() })
        }
        FieldKind::Nested(ty) => {
            reject_rules(rules, span, "nested model")?;
            Ok(quote! { <#ty as #krate::SchemaModel>::schema() })
        }
    }
}

/// 结构体级别的 `#[schema(name = "...", strict, crate = "...")]`
struct StructOptions {
    name: Option<LitStr>,
    strict: bool,
    krate: Path,
}

fn parse_struct_options(input: &DeriveInput) -> syn::Result<StructOptions> {
    let mut name = None;
    let mut strict = false;
    let mut krate: Path = syn::parse_quote!(::chimera_schema);

    for attr in &input.attrs {
        if !attr.path().is_ident("schema") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("strict") {
                strict = true;
                Ok(())
            } else if meta.path.is_ident("crate") {
                krate = meta.value()?.parse::<LitStr>()?.parse()?;
                Ok(())
            } else {
                Err(meta.error("expected `name`, `strict` or `crate`"))
            }
        })?;
    }

    Ok(StructOptions { name, strict, krate })
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "SchemaModel can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "SchemaModel can only be derived for structs",
            ))
        }
    };

    let StructOptions {
        name: schema_name,
        strict,
        krate,
    } = parse_struct_options(&input)?;
    let schema_name = schema_name.unwrap_or_else(|| LitStr::new(&name.to_string(), name.span()));

    let mut field_tokens = Vec::new();
    for field in fields {
        let ident = match &field.ident {
            Some(ident) => ident,
            None => continue,
        };
        let options = parse_field_options(field)?;
        let key = options
            .rename
            .clone()
            .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));

        let rules: Vec<&Rule> = options.rules.iter().collect();
        let mut schema = build_schema(&krate, &classify(&field.ty), &rules, ident.span())?;

        if let Some(default) = &options.default {
            schema = quote! {
                #krate::SchemaExt::default(
                    #schema,
                    #krate::serde_json::json!(#default)
                )
            };
        }

        field_tokens.push(quote! { .field(#key, #schema) });
    }

    let strict = if strict {
        quote! { .strict() }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics #krate::SchemaModel for #name #ty_generics #where_clause {
            fn schema() -> #krate::ObjectSchema {
                #krate::object()
                    .named(#schema_name)
                    #(#field_tokens)*
                    #strict
            }
        }
    })
}

/// SchemaModel 派生宏
///
/// 从结构体字段生成对象 schema，字段类型决定基础 schema：
///
/// - `String` → `string()`，整数 → `number().int()`，浮点 → `number()`，`bool` → `boolean()`
/// - `Option<T>` → `T.optional()`，`Vec<T>` → `array(T)`，`serde_json::Value` → `any()`
/// - 其他类型视为嵌套模型，使用 `<T as SchemaModel>::schema()`
///
/// 整数字段额外带上类型自身的范围，例如 `u8` 只接受 0 到 255。
/// 生成的代码通过 `::chimera_schema` 引用运行时，只依赖重新导出它的 crate 时
/// 用 `#[schema(crate = "chimera_graphql::chimera_schema")]` 指定路径。
///
/// # 示例
///
/// ```ignore
/// #[derive(Deserialize, SchemaModel)]
/// #[schema(name = "User")]
/// struct CreateUser {
///     #[schema(length(min = 2, max = 20, message = "用户名长度必须在2-20个字符之间"))]
///     username: String,
///     #[schema(email)]
///     email: Option<String>,
///     #[schema(range(min = 18, max = 120), default = 18)]
///     age: u32,
/// }
/// ```
#[proc_macro_derive(SchemaModel, attributes(schema))]
pub fn derive_schema_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(|error| error.to_compile_error())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_classify_json_value() {
        assert!(matches!(classify(&parse_quote!(serde_json::Value)), FieldKind::Json));
        assert!(matches!(classify(&parse_quote!(Value)), FieldKind::Json));
        assert!(matches!(classify(&parse_quote!(toml::Value)), FieldKind::Nested(_)));
    }

    #[test]
    fn test_integer_bounds() {
        let bounds = integer_bounds(&parse_quote!(u8)).to_string();
        assert!(bounds.contains("u8 :: MIN") && bounds.contains("u8 :: MAX"));
        assert!(integer_bounds(&parse_quote!(usize)).to_string().contains("nonnegative"));
        assert!(integer_bounds(&parse_quote!(i64)).is_empty());
    }
}
