//! 解析器宏实现

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    parse_macro_input, Expr, ExprLit, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, Lit, LitBool, LitStr, Meta,
    Token, Type,
};

/// 操作类型
#[derive(Clone, Copy)]
enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    fn from_attr(name: &str) -> Option<Self> {
        match name {
            "query_with_schema" => Some(OperationKind::Query),
            "mutation_with_schema" => Some(OperationKind::Mutation),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
        }
    }

    fn register_fn(self) -> Ident {
        let name = match self {
            OperationKind::Query => "query_with_schema",
            OperationKind::Mutation => "mutation_with_schema",
        };
        Ident::new(name, Span::call_site())
    }
}

/// `#[query_with_schema(Type, name = "...", ...)]` 的参数
#[derive(Default)]
struct OperationArgs {
    output: Option<Type>,
    name: Option<LitStr>,
    description: Option<LitStr>,
    deprecation_reason: Option<LitStr>,
    nullable: bool,
    safe: Option<LitBool>,
    do_not_throw: Option<LitBool>,
    parse_to_instance: Option<LitBool>,
    class_name: Option<LitStr>,
}

impl Parse for OperationArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = OperationArgs {
            output: Some(input.parse()?),
            ..Default::default()
        };

        if input.is_empty() {
            return Ok(args);
        }
        input.parse::<Token![,]>()?;

        let metas = Punctuated::<Meta, Token![,]>::parse_terminated(input)?;
        for meta in metas {
            let key = meta
                .path()
                .get_ident()
                .map(|ident| ident.to_string())
                .unwrap_or_default();

            match (key.as_str(), &meta) {
                ("name", Meta::NameValue(nv)) => args.name = Some(lit_str(&nv.value)?),
                ("description", Meta::NameValue(nv)) => args.description = Some(lit_str(&nv.value)?),
                ("deprecation_reason", Meta::NameValue(nv)) => {
                    args.deprecation_reason = Some(lit_str(&nv.value)?)
                }
                ("class_name", Meta::NameValue(nv)) => args.class_name = Some(lit_str(&nv.value)?),
                ("nullable", Meta::Path(_)) => args.nullable = true,
                ("safe", _) => args.safe = Some(flag(&meta)?),
                ("do_not_throw", _) => args.do_not_throw = Some(flag(&meta)?),
                ("parse_to_instance", _) => args.parse_to_instance = Some(flag(&meta)?),
                _ => return Err(syn::Error::new_spanned(&meta, format!("unsupported operation option `{}`", key))),
            }
        }

        Ok(args)
    }
}

fn lit_str(expr: &Expr) -> syn::Result<LitStr> {
    match expr {
        Expr::Lit(ExprLit { lit: Lit::Str(lit), .. }) => Ok(lit.clone()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

/// `safe` 与 `safe = true` 等价
fn flag(meta: &Meta) -> syn::Result<LitBool> {
    match meta {
        Meta::Path(path) => Ok(LitBool::new(true, path.span())),
        Meta::NameValue(nv) => match &nv.value {
            Expr::Lit(ExprLit { lit: Lit::Bool(lit), .. }) => Ok(lit.clone()),
            other => Err(syn::Error::new_spanned(other, "expected `true` or `false`")),
        },
        Meta::List(list) => Err(syn::Error::new_spanned(list, "expected `flag` or `flag = bool`")),
    }
}

/// 扫描到的操作方法
struct Operation {
    kind: OperationKind,
    args: OperationArgs,
    method: ImplItemFn,
}

impl Operation {
    fn operation_name(&self) -> String {
        self.args
            .name
            .as_ref()
            .map(LitStr::value)
            .unwrap_or_else(|| self.method.sig.ident.to_string())
    }

    fn options_tokens(&self) -> TokenStream2 {
        let args = &self.args;
        let mut options = quote! { ::chimera_graphql::OperationOptions::new() };

        if let Some(name) = &args.name {
            options = quote! { #options.name(#name) };
        }
        if let Some(description) = &args.description {
            options = quote! { #options.description(#description) };
        }
        if let Some(reason) = &args.deprecation_reason {
            options = quote! { #options.deprecation_reason(#reason) };
        }
        if args.nullable {
            options = quote! { #options.nullable(true) };
        }

        let mut schema = quote! { ::chimera_graphql::ModelOptions::new() };
        if let Some(safe) = &args.safe {
            schema = quote! { #schema.safe(#safe) };
        }
        if let Some(do_not_throw) = &args.do_not_throw {
            schema = quote! { #schema.do_not_throw(#do_not_throw) };
        }
        if let Some(parse_to_instance) = &args.parse_to_instance {
            schema = quote! { #schema.parse_to_instance(#parse_to_instance) };
        }
        if let Some(class_name) = &args.class_name {
            schema = quote! { #schema.class_name(#class_name) };
        }

        quote! { #options.schema(#schema) }
    }

    /// 生成 `registry.query_with_schema(...)` 调用
    fn registration(&self) -> syn::Result<TokenStream2> {
        let sig = &self.method.sig;
        let method_ident = &sig.ident;
        let method_name = method_ident.to_string();

        if !matches!(sig.inputs.first(), Some(FnArg::Receiver(_))) {
            return Err(syn::Error::new_spanned(sig, "operation methods must take `&self`"));
        }

        let typed: Vec<&Type> = sig
            .inputs
            .iter()
            .filter_map(|arg| match arg {
                FnArg::Typed(pat_type) => Some(&*pat_type.ty),
                FnArg::Receiver(_) => None,
            })
            .collect();

        let (closure_arg, bind_input, call_args) = match typed.as_slice() {
            [] => (quote! { _args }, quote! {}, quote! {}),
            [ty] if is_json_value(ty) => (quote! { args }, quote! { let input = args; }, quote! { input }),
            [ty] => (
                quote! { args },
                quote! {
                    let input = match ::chimera_graphql::parse_args::<#ty>(&args) {
                        Ok(input) => input,
                        Err(error) => return ::chimera_graphql::HandlerOutput::Ready(Err(error)),
                    };
                },
                quote! { input },
            ),
            _ => {
                return Err(syn::Error::new_spanned(
                    &sig.inputs,
                    "operation methods take at most one argument besides `&self`",
                ))
            }
        };

        let invoke = if sig.asyncness.is_some() {
            quote! {
                let resolver = ::std::sync::Arc::clone(&resolver);
                ::chimera_graphql::HandlerOutput::pending(async move {
                    ::chimera_graphql::into_handler_result(resolver.#method_ident(#call_args).await)
                })
            }
        } else {
            quote! {
                ::chimera_graphql::HandlerOutput::Ready(
                    ::chimera_graphql::into_handler_result(resolver.#method_ident(#call_args))
                )
            }
        };

        let output = self
            .args
            .output
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(sig, "missing output type"))?;
        let register_fn = self.kind.register_fn();
        let options = self.options_tokens();

        Ok(quote! {
            {
                let resolver = ::std::sync::Arc::clone(&self);
                registry.#register_fn(
                    <#output as ::chimera_graphql::chimera_schema::OutputSchema>::output_schema(),
                    #options,
                    #method_name,
                    move |#closure_arg: ::chimera_graphql::serde_json::Value| {
                        #bind_input
                        #invoke
                    },
                )?;
            }
        })
    }
}

/// 参数类型为 `serde_json::Value` 时直接传入原始参数
/// 参数类型为 `Value` 或 `serde_json::Value` 时直接传入原始参数
fn is_json_value(ty: &Type) -> bool {
    let Type::Path(type_path) = ty else {
        return false;
    };
    let segments: Vec<String> = type_path
        .path
        .segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect();
    match segments.as_slice() {
        [last] => last == "Value",
        [.., module, last] => module == "serde_json" && last == "Value",
        [] => false,
    }
}

/// 取出方法上的操作属性，其余属性保留
fn take_operation(method: &mut ImplItemFn) -> syn::Result<Option<(OperationKind, OperationArgs)>> {
    let mut found = None;
    let mut kept = Vec::with_capacity(method.attrs.len());

    for attr in method.attrs.drain(..) {
        let kind = attr
            .path()
            .get_ident()
            .and_then(|ident| OperationKind::from_attr(&ident.to_string()));

        match kind {
            Some(kind) => {
                if found.is_some() {
                    return Err(syn::Error::new_spanned(attr, "a method can declare only one operation"));
                }
                found = Some((kind, attr.parse_args::<OperationArgs>()?));
            }
            None => kept.push(attr),
        }
    }

    method.attrs = kept;
    Ok(found)
}

/// `#[resolver]` 的参数，目前只有 `auto_register`
fn parse_auto_register(attr: TokenStream2) -> syn::Result<bool> {
    if attr.is_empty() {
        return Ok(false);
    }
    let ident: Ident = syn::parse2(attr)?;
    if ident == "auto_register" {
        Ok(true)
    } else {
        Err(syn::Error::new_spanned(ident, "expected `auto_register`"))
    }
}

/// resolver 宏实现
///
/// 扫描带 `#[query_with_schema]` / `#[mutation_with_schema]` 的方法，生成注册代码
///
/// 支持的方法签名：
/// 1. 无参数：`async fn op(&self) -> Result<T, WebError>`
/// 2. 原始参数：`async fn op(&self, args: Value) -> Result<T, WebError>`
/// 3. 模型参数：`fn op(&self, input: CreateUser) -> Result<T, WebError>`，其中 `CreateUser: SchemaModel + Deserialize`
pub fn resolver_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let auto_register = match parse_auto_register(attr.into()) {
        Ok(auto_register) => auto_register,
        Err(error) => return error.to_compile_error().into(),
    };
    let mut input = parse_macro_input!(item as ItemImpl);

    match expand(&mut input, auto_register) {
        Ok(generated) => TokenStream::from(quote! {
            #input
            #generated
        }),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(input: &mut ItemImpl, auto_register: bool) -> syn::Result<TokenStream2> {
    let mut operations = Vec::new();

    for item in input.items.iter_mut() {
        if let ImplItem::Fn(method) = item {
            if let Some((kind, args)) = take_operation(method)? {
                operations.push(Operation {
                    kind,
                    args,
                    method: method.clone(),
                });
            }
        }
    }

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    let registrations = operations
        .iter()
        .map(Operation::registration)
        .collect::<syn::Result<Vec<_>>>()?;

    let operation_info: Vec<TokenStream2> = operations
        .iter()
        .map(|operation| {
            let kind = operation.kind.label();
            let name = operation.operation_name();
            quote! { (#kind, #name) }
        })
        .collect();

    let auto_registration = if auto_register {
        let resolver_name = resolver_name(self_ty);
        quote! {
            const _: () = {
                fn __chimera_register_resolver(
                    registry: &mut ::chimera_graphql::ResolverRegistry,
                ) -> ::std::result::Result<(), ::chimera_graphql::WebError> {
                    let resolver = ::std::sync::Arc::new(<#self_ty as ::std::default::Default>::default());
                    resolver.__register_operations(registry)
                }

                ::chimera_graphql::inventory::submit! {
                    ::chimera_graphql::ResolverRegistration::new(#resolver_name, __chimera_register_resolver)
                }
            };
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics #self_ty #where_clause {
            /// 注册解析器的所有操作
            #[allow(unused_variables)]
            pub fn __register_operations(
                self: ::std::sync::Arc<Self>,
                registry: &mut ::chimera_graphql::ResolverRegistry,
            ) -> ::std::result::Result<(), ::chimera_graphql::WebError> {
                #(#registrations)*
                Ok(())
            }

            /// 获取所有操作信息 `(kind, name)`
            pub fn __get_operations() -> &'static [(&'static str, &'static str)] {
                &[#(#operation_info),*]
            }
        }

        #auto_registration
    })
}

fn resolver_name(self_ty: &Type) -> String {
    match self_ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .unwrap_or_default(),
        other => quote!(#other).to_string(),
    }
}
