mod document_type;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(DocumentType)]
// ============================================================================

/// Derive macro that declares a plain document type.
///
/// # Usage
///
/// ```ignore
/// #[derive(DocumentType)]
/// #[document(database = "test", collection = "accounts")]
/// struct Account {
///     #[document(required)]
///     owner: String,
///     balance: Option<f64>,
///     tags: Vec<String>,
/// }
/// ```
///
/// - `database` is required.
/// - `collection` defaults to the snake_case struct name plus `s`.
/// - Named fields become a closed `Structure`; a field is optional unless
///   marked `#[document(required)]`. `Option<T>` is checked as `T`. Types
///   the macro does not recognise (enums, newtypes, ids) accept any value.
/// - A unit struct declares no fields and accepts any document.
#[proc_macro_derive(DocumentType, attributes(document))]
pub fn derive_document_type(input: TokenStream) -> TokenStream {
    document_type::derive(input, false)
}

// ============================================================================
// #[derive(VersionedType)]
// ============================================================================

/// Derive macro that declares a versioned document type.
///
/// Implements both `DocumentType` and `VersionedType`, so the two derives are
/// never combined.
///
/// ```ignore
/// #[derive(VersionedType)]
/// #[document(
///     database = "test",
///     collection = "mongokit",
///     versioning_collection = "versioned_mongokit",
///     versioning_database = "archive"
/// )]
/// struct MyDoc {
///     foo: String,
/// }
/// ```
///
/// `versioning_collection` is required; leaving it out is a compile error.
/// `versioning_database` defaults to the primary database.
#[proc_macro_derive(VersionedType, attributes(document))]
pub fn derive_versioned_type(input: TokenStream) -> TokenStream {
    document_type::derive(input, true)
}
