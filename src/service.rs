use std::{collections::HashMap, error::Error, sync::Arc};

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::{
    config::LoadingConfig,
    dialect::Dialect,
    loader::SchemeUrlLoader,
    reference::{RefError, SchemaRef},
    tree::{Addressing, Document, SchemaTree},
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid uri {uri:?}")]
    InvalidUri {
        uri: String,
        #[source]
        src: RefError,
    },
    #[error("uri {uri:?} is not absolute and no namespace is configured")]
    NotAbsolute { uri: String },
    #[error("no fetcher registered for scheme {scheme:?} of {url}")]
    UnhandledScheme { url: String, scheme: String },
    #[error("error fetching {url}")]
    Fetch {
        url: String,
        #[source]
        src: Box<dyn Error + Send + Sync>,
    },
    #[error("content of {url} is not json")]
    NotJson {
        url: String,
        #[source]
        src: serde_json::Error,
    },
    #[error("{reference} does not exist")]
    FragmentNotFound { reference: String },
}

/// Turns uris into schema trees: applies namespace, redirects and
/// normalization, then serves documents from cache, preloaded bundle
/// or the registered fetchers.
///
/// Each distinct document is fetched at most once. The cache is safe to
/// share between threads.
pub struct DocumentService {
    loader: SchemeUrlLoader,
    default_dialect: Dialect,
    addressing: Addressing,
    namespace: Option<Url>,
    redirects: HashMap<Url, Url>,
    preloaded: HashMap<Url, Value>,
    cache: RwLock<HashMap<Url, Arc<Document>>>,
}

impl Default for DocumentService {
    fn default() -> Self {
        Self::new(LoadingConfig::default())
    }
}

impl DocumentService {
    pub fn new(cfg: LoadingConfig) -> Self {
        Self {
            loader: cfg.loader,
            default_dialect: cfg.default_dialect,
            addressing: cfg.addressing,
            namespace: cfg.namespace,
            redirects: cfg.redirects,
            preloaded: cfg.preloaded,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    pub fn default_dialect(&self) -> Dialect {
        self.default_dialect
    }

    /// Returns the tree addressed by `uri`, positioned at its fragment.
    pub fn get(&self, uri: &str) -> Result<SchemaTree, LoadError> {
        let r = SchemaRef::parse(uri).map_err(|src| LoadError::InvalidUri {
            uri: uri.to_owned(),
            src,
        })?;
        self.get_ref(&r)
    }

    pub fn get_ref(&self, r: &SchemaRef) -> Result<SchemaTree, LoadError> {
        let doc = self.document(r)?;
        SchemaTree::new(Arc::clone(&doc), self.addressing)
            .with_base(doc, r.fragment())
            .map_err(|_| LoadError::FragmentNotFound {
                reference: r.to_string(),
            })
    }

    /// The url a document reference is served from, after namespace
    /// rebasing and redirects.
    pub fn rewrite(&self, r: &SchemaRef) -> Result<Url, LoadError> {
        let url = match (r.url(), &self.namespace) {
            (Some(url), _) => url.clone(),
            (None, Some(ns)) => {
                let rel = r.document().to_string();
                let rel = rel.trim_end_matches('#');
                let mut url = ns.join(rel).map_err(|src| LoadError::InvalidUri {
                    uri: rel.to_owned(),
                    src: RefError::InvalidUri {
                        reference: rel.to_owned(),
                        src,
                    },
                })?;
                url.set_fragment(None);
                url
            }
            (None, None) => {
                return Err(LoadError::NotAbsolute {
                    uri: r.to_string(),
                })
            }
        };
        match self.redirects.get(&url) {
            Some(to) => {
                tracing::debug!(from = %url, %to, "redirecting");
                Ok(to.clone())
            }
            None => Ok(url),
        }
    }

    /// Returns the document referenced by `r`, ignoring its fragment.
    pub(crate) fn document(&self, r: &SchemaRef) -> Result<Arc<Document>, LoadError> {
        let url = self.rewrite(r)?;
        if let Some(doc) = self.cache.read().get(&url) {
            tracing::trace!(%url, "document cache hit");
            return Ok(Arc::clone(doc));
        }

        let value = self.fetch(&url)?;
        let reference = SchemaRef::from_url(&url).map_err(|src| LoadError::InvalidUri {
            uri: url.to_string(),
            src,
        })?;
        let doc = Arc::new(Document::new(reference, value, self.default_dialect));
        let mut cache = self.cache.write();
        Ok(Arc::clone(cache.entry(url).or_insert(doc)))
    }

    fn fetch(&self, url: &Url) -> Result<Value, LoadError> {
        if let Some(v) = self.preloaded.get(url) {
            tracing::debug!(%url, "using preloaded document");
            return Ok(v.clone());
        }
        let Some(loader) = self.loader.get(url.scheme()) else {
            return Err(LoadError::UnhandledScheme {
                url: url.to_string(),
                scheme: url.scheme().to_owned(),
            });
        };
        tracing::debug!(%url, "fetching document");
        let bytes = loader.load(url).map_err(|src| LoadError::Fetch {
            url: url.to_string(),
            src,
        })?;
        serde_json::from_slice(&bytes).map_err(|src| LoadError::NotJson {
            url: url.to_string(),
            src,
        })
    }

    /// number of documents loaded so far
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    fn service_counting(fetches: Arc<AtomicUsize>) -> DocumentService {
        let mem_loader = move |url: &Url| -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
            fetches.fetch_add(1, Ordering::SeqCst);
            match url.path() {
                "/a.json" => Ok(br#"{"definitions": {"x": {"type": "integer"}}}"#.to_vec()),
                "/bad.json" => Ok(b"not json".to_vec()),
                _ => Err("not found".into()),
            }
        };
        let mut cfg = LoadingConfig::new();
        cfg.register_url_loader("mem", Box::new(mem_loader));
        cfg.set_namespace("mem://host/").unwrap();
        cfg.add_redirect("mem://host/old.json", "mem://host/a.json")
            .unwrap();
        cfg.preload("http://bundle.com/b.json", json!({"type": "string"}))
            .unwrap();
        DocumentService::new(cfg)
    }

    fn service() -> DocumentService {
        service_counting(Arc::default())
    }

    #[test]
    fn test_get() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let s = service_counting(Arc::clone(&fetches));
        let t = s.get("mem://host/a.json#/definitions/x").unwrap();
        assert_eq!(t.current_node(), &json!({"type": "integer"}));
        // normalized form hits the cache
        let t = s.get("MEM://host/./a.json").unwrap();
        assert!(t.current_node().is_object());
        // relative uri is rebased onto the namespace
        s.get("a.json").unwrap();
        // redirect is served from the same document
        let t = s.get("mem://host/old.json").unwrap();
        assert_eq!(t.loading_ref().to_string(), "mem://host/a.json#");
        assert_eq!(s.cached(), 1);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_preloaded() {
        let t = service().get("http://bundle.com/b.json").unwrap();
        assert_eq!(t.current_node(), &json!({"type": "string"}));
    }

    #[test]
    fn test_errors() {
        let s = service();
        assert!(matches!(
            s.get("ftp://host/a.json"),
            Err(LoadError::UnhandledScheme { .. })
        ));
        assert!(matches!(
            s.get("mem://host/bad.json"),
            Err(LoadError::NotJson { .. })
        ));
        assert!(matches!(
            s.get("mem://host/missing.json"),
            Err(LoadError::Fetch { .. })
        ));
        assert!(matches!(
            s.get("mem://host/a.json#/definitions/y"),
            Err(LoadError::FragmentNotFound { .. })
        ));
        assert!(matches!(
            DocumentService::default().get("a.json"),
            Err(LoadError::NotAbsolute { .. })
        ));
    }
}
