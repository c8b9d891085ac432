//! Document classes and history target resolution.
//!
//! A [`DocumentClass`] is the runtime description of a document type: its
//! primary collection, its validator and, for versioned types, where history
//! goes by default. Types declared in code implement [`DocumentType`] (and
//! [`VersionedType`]), usually through the derive macros:
//!
//! ```ignore
//! #[derive(VersionedType)]
//! #[document(
//!     database = "test",
//!     collection = "mongokit",
//!     versioning_collection = "versioned_mongokit"
//! )]
//! struct MyDoc {
//!     foo: String,
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::DocumentError;
use crate::store::Namespace;
use crate::validation::{AcceptAll, Structure, Validator};

/// A document type declared in code.
pub trait DocumentType {
    /// Database holding the primary collection.
    const DATABASE: &'static str;

    /// Primary collection name.
    const COLLECTION: &'static str;

    /// Declared fields. Defaults to an open structure.
    fn structure() -> Structure {
        Structure::open()
    }

    /// The runtime class for this type.
    fn class() -> Result<DocumentClass, DocumentError> {
        DocumentClass::builder(Self::DATABASE, Self::COLLECTION)
            .structure(Self::structure())
            .build()
    }
}

/// A document type whose saves are recorded in a history collection.
pub trait VersionedType: DocumentType {
    /// Default history collection.
    const VERSIONING_COLLECTION: &'static str;

    /// Default history database. `None` means the primary database.
    const VERSIONING_DATABASE: Option<&'static str> = None;

    /// The runtime class for this type, versioning included.
    fn versioned_class() -> Result<DocumentClass, DocumentError> {
        let mut builder = DocumentClass::builder(Self::DATABASE, Self::COLLECTION)
            .structure(Self::structure())
            .versioned(Self::VERSIONING_COLLECTION);
        if let Some(database) = Self::VERSIONING_DATABASE {
            builder = builder.versioning_database(database);
        }
        builder.build()
    }
}

/// Class-level history defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersioningDefaults {
    pub database: Option<String>,
    pub collection: String,
}

/// Runtime description of a document type.
#[derive(Clone)]
pub struct DocumentClass {
    namespace: Namespace,
    versioning: Option<VersioningDefaults>,
    validator: Arc<dyn Validator>,
}

impl fmt::Debug for DocumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentClass")
            .field("namespace", &self.namespace)
            .field("versioning", &self.versioning)
            .finish_non_exhaustive()
    }
}

impl DocumentClass {
    pub fn builder(
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> DocumentClassBuilder {
        DocumentClassBuilder {
            database: database.into(),
            collection: collection.into(),
            versioned: false,
            versioning_collection: None,
            versioning_database: None,
            validator: None,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn versioning(&self) -> Option<&VersioningDefaults> {
        self.versioning.as_ref()
    }

    pub fn is_versioned(&self) -> bool {
        self.versioning.is_some()
    }

    pub fn validator(&self) -> Arc<dyn Validator> {
        Arc::clone(&self.validator)
    }

    /// History target for an instance built with `options`.
    pub fn history_target(&self, options: &VersioningOptions) -> Result<Namespace, DocumentError> {
        resolve_history_target(options, self.versioning.as_ref(), &self.namespace)
    }
}

/// Builder for [`DocumentClass`]. `build` is where a class definition fails.
pub struct DocumentClassBuilder {
    database: String,
    collection: String,
    versioned: bool,
    versioning_collection: Option<String>,
    versioning_database: Option<String>,
    validator: Option<Arc<dyn Validator>>,
}

impl DocumentClassBuilder {
    /// Record history in `collection` by default.
    pub fn versioned(mut self, collection: impl Into<String>) -> Self {
        self.versioned = true;
        self.versioning_collection = Some(collection.into());
        self
    }

    /// Enable versioning without naming a history collection yet.
    /// `build` fails unless [`versioned`](Self::versioned) is called too.
    pub fn versioning(mut self) -> Self {
        self.versioned = true;
        self
    }

    pub fn versioning_database(mut self, database: impl Into<String>) -> Self {
        self.versioning_database = Some(database.into());
        self
    }

    pub fn structure(self, structure: Structure) -> Self {
        self.validator(Arc::new(structure))
    }

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn build(self) -> Result<DocumentClass, DocumentError> {
        if self.database.is_empty() || self.collection.is_empty() {
            return Err(DocumentError::Configuration(
                "database and collection names must not be empty".into(),
            ));
        }
        let namespace = Namespace::new(self.database, self.collection);

        let versioning = if self.versioned {
            let collection = self
                .versioning_collection
                .filter(|name| !name.is_empty())
                .ok_or_else(|| {
                    DocumentError::Configuration(format!(
                        "{namespace} is versioned but declares no versioning collection"
                    ))
                })?;
            let defaults = VersioningDefaults {
                database: self.versioning_database,
                collection,
            };
            // the class default must already be a valid target
            resolve_history_target(&VersioningOptions::default(), Some(&defaults), &namespace)?;
            Some(defaults)
        } else if self.versioning_database.is_some() {
            return Err(DocumentError::Configuration(format!(
                "{namespace} sets a versioning database without enabling versioning"
            )));
        } else {
            None
        };

        Ok(DocumentClass {
            namespace,
            versioning,
            validator: self.validator.unwrap_or_else(|| Arc::new(AcceptAll)),
        })
    }
}

/// Per-instance history target overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersioningOptions {
    pub database: Option<String>,
    pub collection: Option<String>,
}

impl VersioningOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }
}

/// Resolve where history is written.
///
/// Each part takes the instance override first, then the class default; the
/// database finally falls back to the primary database. The collection has no
/// fallback. A target equal to the primary collection is rejected.
pub fn resolve_history_target(
    options: &VersioningOptions,
    defaults: Option<&VersioningDefaults>,
    primary: &Namespace,
) -> Result<Namespace, DocumentError> {
    let collection = options
        .collection
        .as_deref()
        .or(defaults.map(|d| d.collection.as_str()))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            DocumentError::Configuration(format!("no versioning collection for {primary}"))
        })?;

    let database = options
        .database
        .as_deref()
        .or(defaults.and_then(|d| d.database.as_deref()))
        .unwrap_or(primary.database.as_str());
    if database.is_empty() {
        return Err(DocumentError::Configuration(format!(
            "empty versioning database for {primary}"
        )));
    }

    let target = Namespace::new(database, collection);
    if &target == primary {
        return Err(DocumentError::Configuration(format!(
            "versioning collection {target} is the primary collection"
        )));
    }
    Ok(target)
}
