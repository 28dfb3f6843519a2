//! Derive macro implementation for `Described`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DataEnum, DeriveInput, Expr, Fields,
    FieldsNamed, Generics, Lit, LitStr, Path,
};

/// Struct-level `#[tagbuf(...)]` options.
#[derive(Default)]
struct TypeOptions {
    name: Option<LitStr>,
    custom: Option<Option<Path>>,
}

/// Field-level `#[tagbuf(...)]` options.
#[derive(Default)]
struct FieldOptions {
    skip: bool,
    readonly: bool,
    rename: Option<LitStr>,
}

pub fn derive_described_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let options = parse_type_options(&input.attrs)?;
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => expand_struct(input, &options, fields),
            Fields::Unit => expand_struct(input, &options, &parse_quote!({})),
            Fields::Unnamed(_) => Err(syn::Error::new_spanned(
                &input.ident,
                "Described cannot be derived for tuple structs",
            )),
        },
        Data::Enum(data) => expand_enum(input, &options, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Described cannot be derived for unions",
        )),
    }
}

fn expand_struct(
    input: &DeriveInput,
    options: &TypeOptions,
    fields: &FieldsNamed,
) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let generics = with_described_bounds(&input.generics);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut members = Vec::new();
    for field in &fields.named {
        let field_options = parse_field_options(&field.attrs)?;
        if field_options.skip {
            continue;
        }
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let member_name = field_options
            .rename
            .map(|lit| lit.value())
            .unwrap_or_else(|| field_ident.to_string());

        members.push(if field_options.readonly {
            quote! { .readonly_field::<#ty>(#member_name, |v| &v.#field_ident) }
        } else {
            quote! {
                .field::<#ty>(#member_name, |v| &v.#field_ident, |v, x| v.#field_ident = x)
            }
        });
    }

    let name = type_name(input, options);
    let custom = custom_declaration(options);

    Ok(quote! {
        impl #impl_generics ::tagbuf_core::Described for #ident #ty_generics #where_clause {
            fn describe() -> ::tagbuf_core::TypeDescriptor {
                let shape = ::tagbuf_core::CompositeBuilder::<Self>::new()
                    #(#members)*
                    .build();
                ::tagbuf_core::TypeDescriptor::of::<Self>(#name, shape)
                    #custom
            }
        }
    })
}

fn expand_enum(
    input: &DeriveInput,
    options: &TypeOptions,
    data: &DataEnum,
) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Described cannot be derived for generic enums",
        ));
    }

    // Implicit discriminants count up from the last explicit one.
    let mut base: Option<&Expr> = None;
    let mut offset: i64 = 0;
    let mut to_arms = Vec::new();
    let mut from_checks = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Described enums must have only unit variants",
            ));
        }
        if let Some((_, expr)) = &variant.discriminant {
            base = Some(expr);
            offset = 0;
        }
        let repr = match base {
            Some(expr) => quote! { ((#expr) as i64 + #offset) },
            None => quote! { #offset },
        };
        let variant_ident = &variant.ident;
        to_arms.push(quote! { Self::#variant_ident => #repr, });
        from_checks.push(quote! {
            if repr == #repr {
                return ::core::option::Option::Some(Self::#variant_ident);
            }
        });
        offset += 1;
    }

    let name = type_name(input, options);
    let custom = custom_declaration(options);

    Ok(quote! {
        impl ::tagbuf_core::Described for #ident {
            fn describe() -> ::tagbuf_core::TypeDescriptor {
                ::tagbuf_core::TypeDescriptor::of::<Self>(
                    #name,
                    ::tagbuf_core::Shape::Enum(::tagbuf_core::EnumShape::of::<Self>()),
                )
                #custom
            }
        }

        impl ::tagbuf_core::DescribedEnum for #ident {
            fn to_repr(&self) -> i64 {
                match self {
                    #(#to_arms)*
                }
            }

            #[allow(clippy::unnecessary_cast)]
            fn from_repr(repr: i64) -> ::core::option::Option<Self> {
                #(#from_checks)*
                ::core::option::Option::None
            }
        }
    })
}

/// Adds a `Described` bound to every type parameter.
fn with_described_bounds(generics: &Generics) -> Generics {
    let mut generics = generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::tagbuf_core::Described));
    }
    generics
}

/// Explicit name, else the Rust identifier. Generic types use the full type
/// name so that each instantiation gets its own dynamic discriminator.
fn type_name(input: &DeriveInput, options: &TypeOptions) -> TokenStream2 {
    if let Some(name) = &options.name {
        quote! { #name }
    } else if input.generics.type_params().next().is_some() {
        quote! { ::std::any::type_name::<Self>() }
    } else {
        let name = input.ident.to_string();
        quote! { #name }
    }
}

fn custom_declaration(options: &TypeOptions) -> TokenStream2 {
    match &options.custom {
        None => quote! {},
        Some(None) => quote! {
            .with_custom(::tagbuf_core::CustomDeclaration::from_serializer::<Self, Self>())
        },
        Some(Some(helper)) => quote! {
            .with_custom(::tagbuf_core::CustomDeclaration::from_serializer::<Self, #helper>())
        },
    }
}

fn parse_type_options(attrs: &[Attribute]) -> syn::Result<TypeOptions> {
    let mut options = TypeOptions::default();
    for attr in attrs {
        if !attr.path().is_ident("tagbuf") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                options.name = Some(parse_str(&meta)?);
                Ok(())
            } else if meta.path.is_ident("custom") {
                if meta.input.peek(syn::Token![=]) {
                    let helper = parse_str(&meta)?;
                    options.custom = Some(Some(helper.parse()?));
                } else {
                    options.custom = Some(None);
                }
                Ok(())
            } else {
                Err(meta.error("expected `name` or `custom`"))
            }
        })?;
    }
    Ok(options)
}

fn parse_field_options(attrs: &[Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in attrs {
        if !attr.path().is_ident("tagbuf") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
                Ok(())
            } else if meta.path.is_ident("readonly") {
                options.readonly = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                options.rename = Some(parse_str(&meta)?);
                Ok(())
            } else {
                Err(meta.error("expected `skip`, `readonly` or `rename`"))
            }
        })?;
    }
    Ok(options)
}

fn parse_str(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<LitStr> {
    match meta.value()?.parse::<Lit>()? {
        Lit::Str(lit) => Ok(lit),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}
