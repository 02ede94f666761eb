use std::{collections::HashMap, error::Error};

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::{
    dialect::Dialect,
    formats::Format,
    loader::{SchemeUrlLoader, UrlLoader},
    reference::{RefError, SchemaRef},
    report::LogLevel,
    tree::Addressing,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid uri {uri:?}")]
    InvalidUri {
        uri: String,
        #[source]
        src: RefError,
    },
    #[error("uri {uri:?} must be absolute")]
    NotAbsolute { uri: String },
}

// parses `uri` as absolute uri, dropping any empty fragment
fn absolute(uri: &str) -> Result<Url, ConfigError> {
    let r = SchemaRef::parse(uri).map_err(|src| ConfigError::InvalidUri {
        uri: uri.to_owned(),
        src,
    })?;
    match r.url() {
        Some(url) => Ok(url.clone()),
        None => Err(ConfigError::NotAbsolute {
            uri: uri.to_owned(),
        }),
    }
}

/// Options of the document service.
///
/// ```
/// # use schemacheck::*;
/// # use serde_json::json;
/// let mut cfg = LoadingConfig::new();
/// cfg.set_namespace("http://example.com/schemas/")?;
/// cfg.add_redirect("http://example.com/old.json", "http://example.com/new.json")?;
/// cfg.preload("http://example.com/new.json", json!({"type": "string"}))?;
/// # Ok::<(), ConfigError>(())
/// ```
pub struct LoadingConfig {
    pub(crate) default_dialect: Dialect,
    pub(crate) addressing: Addressing,
    pub(crate) namespace: Option<Url>,
    pub(crate) redirects: HashMap<Url, Url>,
    pub(crate) preloaded: HashMap<Url, Value>,
    pub(crate) loader: SchemeUrlLoader,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingConfig {
    pub fn new() -> Self {
        Self {
            default_dialect: Dialect::latest(),
            addressing: Addressing::Canonical,
            namespace: None,
            redirects: HashMap::new(),
            preloaded: HashMap::new(),
            loader: SchemeUrlLoader::new(),
        }
    }

    /// Dialect for documents without a recognized `$schema`.
    pub fn set_default_dialect(&mut self, dialect: Dialect) {
        self.default_dialect = dialect;
    }

    pub fn set_addressing(&mut self, addressing: Addressing) {
        self.addressing = addressing;
    }

    /// Base uri against which relative document uris are resolved.
    pub fn set_namespace(&mut self, uri: &str) -> Result<(), ConfigError> {
        self.namespace = Some(absolute(uri)?);
        Ok(())
    }

    /// Requests for `from` are served from `to`. Redirects are exact:
    /// they are not applied transitively.
    pub fn add_redirect(&mut self, from: &str, to: &str) -> Result<(), ConfigError> {
        self.redirects.insert(absolute(from)?, absolute(to)?);
        Ok(())
    }

    /// Serves `uri` from `doc`, bypassing the fetchers.
    pub fn preload(&mut self, uri: &str, doc: Value) -> Result<(), ConfigError> {
        self.preloaded.insert(absolute(uri)?, doc);
        Ok(())
    }

    /// Registers fetcher for `scheme`, replacing any earlier one.
    pub fn register_url_loader(&mut self, scheme: &str, loader: Box<dyn UrlLoader>) {
        self.loader.register(scheme, loader);
    }
}

/// Options of the validation processor.
#[derive(Clone)]
pub struct ValidationConfig {
    pub(crate) log_level: LogLevel,
    pub(crate) fatal_threshold: LogLevel,
    pub(crate) max_depth: usize,
    pub(crate) explore_all: bool,
    pub(crate) format_assertions: bool,
    pub(crate) formats: HashMap<String, Format>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationConfig {
    pub fn new() -> Self {
        Self {
            log_level: LogLevel::Info,
            fatal_threshold: LogLevel::Fatal,
            max_depth: 256,
            explore_all: false,
            format_assertions: true,
            formats: HashMap::new(),
        }
    }

    /// Messages below `level` are not retained in reports.
    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }

    /// Logging a message at or above `level` aborts validation.
    pub fn set_fatal_threshold(&mut self, level: LogLevel) {
        self.fatal_threshold = level;
    }

    /// Maximum nesting of schema nodes visited for one instance.
    pub fn set_max_depth(&mut self, depth: usize) {
        self.max_depth = depth;
    }

    /// Whether children are validated even when their parent node
    /// already failed.
    pub fn set_explore_all(&mut self, explore: bool) {
        self.explore_all = explore;
    }

    /// Whether `format` is asserted. When disabled, `format` is an annotation.
    pub fn enable_format_assertions(&mut self, enable: bool) {
        self.format_assertions = enable;
    }

    /// Registers custom format, overriding any builtin one of same name.
    pub fn register_format(
        &mut self,
        name: &str,
        func: fn(&Value) -> Result<(), Box<dyn Error>>,
    ) {
        self.formats.insert(name.to_owned(), Format { func });
    }
}
