/*! This crate validates json instances against json schema draft-03 and
draft-04.

# Examples

```
# use std::error::Error;
use schemacheck::*;
use serde_json::json;

# fn main() -> Result<(), Box<dyn Error>> {
let mut loading = LoadingConfig::new();
loading.preload(
    "http://example.com/person.json",
    json!({
        "type": "object",
        "properties": {"age": {"type": "integer", "minimum": 0}},
        "required": ["age"]
    }),
)?;
let validator = Validator::with_config(loading, ValidationConfig::new());

let report = validator.validate("http://example.com/person.json", &json!({"age": 7}))?;
assert!(report.is_success());

let report = validator.validate("http://example.com/person.json", &json!({"age": -1}))?;
assert!(!report.is_success());
for msg in report.errors() {
    println!("{msg:#}");
}
# Ok(())
# }
```

A [`Report`] collects diagnostics at or above its log level. Logging a
message at or above the fatal threshold aborts validation with
[`Aborted`].

Schema documents are fetched at most once per [`Validator`] through the
[`UrlLoader`] registered for their scheme; `file` urls are supported
out of the box with feature `resolve-file`.
*/

mod config;
mod dialect;
mod digest;
mod ecma;
mod equiv;
mod formats;
mod keywords;
mod loader;
mod output;
mod pointer;
mod processor;
mod reference;
mod report;
mod resolver;
mod service;
mod tree;
mod util;

pub use {
    config::{ConfigError, LoadingConfig, ValidationConfig},
    dialect::Dialect,
    digest::{DigestCache, KeywordError},
    equiv::{equals, Canonical},
    keywords::BuildError,
    loader::{SchemeUrlLoader, UrlLoader},
    pointer::{JsonPointer, PointerError},
    reference::{Fragment, RefError, SchemaRef},
    report::{Aborted, Domain, LogLevel, Message, Report},
    resolver::ResolveError,
    service::{DocumentService, LoadError},
    tree::{Addressing, Document, SchemaTree, TreeError},
};

#[cfg(feature = "resolve-file")]
pub use loader::FileLoader;

use serde_json::Value;

/// Validates instances against schemas loaded through its
/// [`DocumentService`].
///
/// Documents and built checks are cached for the lifetime of the
/// validator. It is `Send + Sync`; share it behind an `Arc` to validate
/// from many threads.
pub struct Validator {
    pub(crate) service: DocumentService,
    pub(crate) digests: DigestCache,
    pub(crate) config: ValidationConfig,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::with_config(LoadingConfig::new(), ValidationConfig::new())
    }

    pub fn with_config(loading: LoadingConfig, validation: ValidationConfig) -> Self {
        Self {
            service: DocumentService::new(loading),
            digests: DigestCache::default(),
            config: validation,
        }
    }

    pub fn service(&self) -> &DocumentService {
        &self.service
    }

    pub fn digests(&self) -> &DigestCache {
        &self.digests
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Loads the schema tree at `uri`, fetching its document if not
    /// cached yet.
    pub fn load(&self, uri: &str) -> Result<SchemaTree, LoadError> {
        self.service.get(uri)
    }

    /// Validates `instance` against the schema at `uri`.
    ///
    /// Failure to load the schema is fatal.
    pub fn validate(&self, uri: &str, instance: &Value) -> Result<Report, Aborted> {
        match self.load(uri) {
            Ok(tree) => self.validate_tree(&tree, instance, self.config.explore_all),
            Err(e) => {
                tracing::debug!(uri, error = %e, "schema not loaded");
                let msg = Message::new(LogLevel::Fatal, Domain::Loading, e.to_string())
                    .arg("uri", uri);
                Err(Aborted::new(msg))
            }
        }
    }

    /// Validates `instance` against `schema`, a document with no uri.
    /// Its relative references resolve against the configured namespace.
    pub fn validate_value(&self, schema: &Value, instance: &Value) -> Result<Report, Aborted> {
        let tree = SchemaTree::anonymous(
            schema.clone(),
            self.service.default_dialect(),
            self.service.addressing(),
        );
        self.validate_tree(&tree, instance, self.config.explore_all)
    }

    /// Validates `instance` against the node `tree` points to.
    ///
    /// With `explore_all`, children of containers are validated even when
    /// the container itself failed.
    pub fn validate_tree(
        &self,
        tree: &SchemaTree,
        instance: &Value,
        explore_all: bool,
    ) -> Result<Report, Aborted> {
        processor::validate(self, tree, instance, explore_all)
    }
}
