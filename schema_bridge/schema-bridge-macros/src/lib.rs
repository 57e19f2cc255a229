extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Expr, ItemStruct, LitStr};

/// Declares a GraphQL object type backed by a static schema.
///
/// ```ignore
/// static USER: Lazy<Schema> = Lazy::new(|| Schema::object([("name", Schema::string())]));
///
/// /// A registered user.
/// #[object_type(schema = USER, name = "User")]
/// pub struct UserDto;
/// ```
///
/// The struct gets a `DeclaredDto` impl and a declaration is submitted to
/// `inventory`; `Bridge::bootstrap` turns every declaration into a decorated class.
#[proc_macro_attribute]
pub fn object_type(args: TokenStream, input: TokenStream) -> TokenStream {
    expand(args, input, Flavor::Object)
}

/// Same as [`object_type`](macro@object_type), for GraphQL input types.
#[proc_macro_attribute]
pub fn input_type(args: TokenStream, input: TokenStream) -> TokenStream {
    expand(args, input, Flavor::Input)
}

enum Flavor {
    Object,
    Input,
}

#[derive(Default)]
struct TypeMacroArgs {
    schema: Option<Expr>,
    name: Option<LitStr>,
    description: Option<LitStr>,
}

fn expand(args: TokenStream, input: TokenStream, flavor: Flavor) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);

    let mut parsed = TypeMacroArgs::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("schema") {
            parsed.schema = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("name") {
            parsed.name = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("description") {
            parsed.description = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("expected `schema`, `name` or `description`"))
        }
    });
    parse_macro_input!(args with parser);

    let Some(schema) = parsed.schema else {
        return syn::Error::new_spanned(&item.ident, "missing `schema = PATH` argument")
            .to_compile_error()
            .into();
    };
    if !item.generics.params.is_empty() {
        return syn::Error::new_spanned(&item.generics, "declared DTOs cannot be generic")
            .to_compile_error()
            .into();
    }

    let ident = &item.ident;
    let dto_name = ident.to_string();
    let graphql_name = match &parsed.name {
        Some(name) => quote! { ::core::option::Option::Some(#name) },
        None => quote! { ::core::option::Option::None },
    };
    let description = parsed
        .description
        .as_ref()
        .map(LitStr::value)
        .or_else(|| parse_doc_comments(&item.attrs));
    let description = match description {
        Some(text) => quote! { ::core::option::Option::Some(#text) },
        None => quote! { ::core::option::Option::None },
    };
    let flavor = match flavor {
        Flavor::Object => quote! { ::schema_bridge::TypeFlavor::Object },
        Flavor::Input => quote! { ::schema_bridge::TypeFlavor::Input },
    };

    let output = quote! {
        #item

        impl ::schema_bridge::DeclaredDto for #ident {
            const NAME: &'static str = #dto_name;

            fn schema() -> ::schema_bridge::Schema {
                ::core::clone::Clone::clone(&*#schema)
            }
        }

        ::schema_bridge::inventory::submit! {
            ::schema_bridge::DtoDeclaration {
                name: #dto_name,
                graphql_name: #graphql_name,
                description: #description,
                flavor: #flavor,
                schema: <#ident as ::schema_bridge::DeclaredDto>::schema,
            }
        }
    };

    output.into()
}

/// Joins doc comments (`///` and `/** ... */`) into one description.
fn parse_doc_comments(attrs: &[Attribute]) -> Option<String> {
    let doc_comments: Vec<String> = attrs
        .iter()
        .filter_map(|attr| {
            if attr.path().is_ident("doc") {
                if let syn::Meta::NameValue(nv) = &attr.meta {
                    if let syn::Expr::Lit(expr_lit) = &nv.value {
                        if let syn::Lit::Str(lit) = &expr_lit.lit {
                            return Some(lit.value().trim().to_string());
                        }
                    }
                }
            }
            None
        })
        .collect();

    let description = doc_comments.join("\n");
    let description = description.trim();
    (!description.is_empty()).then(|| description.to_string())
}
