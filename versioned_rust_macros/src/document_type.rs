use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    spanned::Spanned, Data, DeriveInput, Field, Fields, GenericArgument, LitStr, PathArguments,
    Type,
};

pub fn derive(input: TokenStream, versioned: bool) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input, versioned) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct DocumentAttrs {
    database: Option<LitStr>,
    collection: Option<LitStr>,
    versioning_collection: Option<LitStr>,
    versioning_database: Option<LitStr>,
}

fn expand(input: &DeriveInput, versioned: bool) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let attrs = parse_attrs(input)?;

    let database = attrs.database.as_ref().ok_or_else(|| {
        syn::Error::new(
            name.span(),
            "missing #[document(database = \"...\")] on document type",
        )
    })?;
    let collection = match &attrs.collection {
        Some(lit) => lit.value(),
        None => format!("{}s", to_snake_case(&name.to_string())),
    };
    non_empty(database, "database")?;
    if let Some(lit) = &attrs.collection {
        non_empty(lit, "collection")?;
    }

    let structure = structure_fn(input)?;

    let mut expanded = quote! {
        impl #impl_generics ::versioned_rust::DocumentType for #name #ty_generics #where_clause {
            const DATABASE: &'static str = #database;
            const COLLECTION: &'static str = #collection;

            #structure
        }
    };

    if versioned {
        let versioning_collection = attrs.versioning_collection.as_ref().ok_or_else(|| {
            syn::Error::new(
                name.span(),
                "versioned document type needs #[document(versioning_collection = \"...\")]",
            )
        })?;
        non_empty(versioning_collection, "versioning_collection")?;
        let versioning_database = match &attrs.versioning_database {
            Some(lit) => {
                non_empty(lit, "versioning_database")?;
                quote! { ::core::option::Option::Some(#lit) }
            }
            None => quote! { ::core::option::Option::None },
        };

        expanded.extend(quote! {
            impl #impl_generics ::versioned_rust::VersionedType for #name #ty_generics #where_clause {
                const VERSIONING_COLLECTION: &'static str = #versioning_collection;
                const VERSIONING_DATABASE: ::core::option::Option<&'static str> = #versioning_database;
            }
        });
    } else if let Some(lit) = attrs
        .versioning_collection
        .as_ref()
        .or(attrs.versioning_database.as_ref())
    {
        return Err(syn::Error::new(
            lit.span(),
            "versioning settings need #[derive(VersionedType)]",
        ));
    }

    Ok(expanded)
}

fn parse_attrs(input: &DeriveInput) -> syn::Result<DocumentAttrs> {
    let mut attrs = DocumentAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("document") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let slot = if meta.path.is_ident("database") {
                &mut attrs.database
            } else if meta.path.is_ident("collection") {
                &mut attrs.collection
            } else if meta.path.is_ident("versioning_collection") {
                &mut attrs.versioning_collection
            } else if meta.path.is_ident("versioning_database") {
                &mut attrs.versioning_database
            } else {
                return Err(meta.error("unsupported document attribute"));
            };
            if slot.is_some() {
                return Err(meta.error("duplicate document attribute"));
            }
            *slot = Some(meta.value()?.parse()?);
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn non_empty(lit: &LitStr, key: &str) -> syn::Result<()> {
    if lit.value().is_empty() {
        return Err(syn::Error::new(lit.span(), format!("{key} must not be empty")));
    }
    Ok(())
}

/// `fn structure()` for structs with named fields. Unit structs keep the
/// trait default.
fn structure_fn(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => return Ok(TokenStream2::new()),
            Fields::Unnamed(fields) => {
                return Err(syn::Error::new(
                    fields.span(),
                    "document types need named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "document types must be structs",
            ))
        }
    };

    let mut declared = Vec::new();
    for field in fields {
        let Some(ident) = &field.ident else { continue };
        let key = ident.to_string().trim_start_matches("r#").to_string();
        let field_type = field_type(&field.ty);
        let method = if is_required(field)? {
            quote! { required }
        } else {
            quote! { field }
        };
        declared.push(quote! { .#method(#key, ::versioned_rust::FieldType::#field_type) });
    }

    Ok(quote! {
        fn structure() -> ::versioned_rust::Structure {
            ::versioned_rust::Structure::new()
                #(#declared)*
        }
    })
}

fn is_required(field: &Field) -> syn::Result<bool> {
    let mut required = false;
    for attr in &field.attrs {
        if !attr.path().is_ident("document") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("required") {
                required = true;
                Ok(())
            } else {
                Err(meta.error("unsupported field attribute"))
            }
        })?;
    }
    Ok(required)
}

/// Maps a Rust field type onto a `FieldType` variant name.
fn field_type(ty: &Type) -> syn::Ident {
    let name = match ty {
        Type::Reference(reference) => return field_type(&reference.elem),
        Type::Path(path) => match path.path.segments.last() {
            Some(segment) => match segment.ident.to_string().as_str() {
                "Option" | "Box" => match first_generic(&segment.arguments) {
                    Some(inner) => return field_type(inner),
                    None => "Any",
                },
                "String" | "str" | "char" => "String",
                "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32"
                | "u64" | "u128" | "usize" => "Integer",
                "f32" | "f64" => "Float",
                "bool" => "Boolean",
                "Vec" | "VecDeque" | "HashSet" | "BTreeSet" => "Array",
                "HashMap" | "BTreeMap" | "Map" | "Document" => "Object",
                _ => "Any",
            },
            None => "Any",
        },
        Type::Array(_) | Type::Slice(_) | Type::Tuple(_) => "Array",
        _ => "Any",
    };
    syn::Ident::new(name, ty.span())
}

fn first_generic(arguments: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
