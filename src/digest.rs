use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;
use regex::Regex;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::{
    dialect::Dialect,
    ecma,
    equiv::Canonical,
    keywords::{invalid, BuildError, Keyword},
    pointer::JsonPointer,
};

#[derive(Debug, Error)]
#[error("invalid {keyword:?}: {src}")]
pub struct KeywordError {
    pub keyword: &'static str,
    #[source]
    pub src: BuildError,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct CheckKey {
    dialect: Dialect,
    keyword: &'static str,
    digest: Canonical,
}

/// Built checks and routing tables, keyed by digest.
///
/// Digests carry no location, so structurally equal schema fragments,
/// even in different documents, share one entry. Safe to share between
/// threads; concurrent builds of the same digest converge on one entry.
#[derive(Default)]
pub struct DigestCache {
    checks: RwLock<HashMap<CheckKey, Arc<dyn Keyword>>>,
    objects: RwLock<HashMap<Canonical, Arc<ObjectRouting>>>,
    arrays: RwLock<HashMap<Canonical, Arc<ArrayRouting>>>,
    builds: AtomicUsize,
}

impl DigestCache {
    /// The checks that apply to `node`, in dispatch order.
    pub(crate) fn checks(
        &self,
        dialect: Dialect,
        node: &Map<String, Value>,
    ) -> Result<Vec<Arc<dyn Keyword>>, KeywordError> {
        let mut checks = vec![];
        for spec in dialect.keywords() {
            if !node.contains_key(spec.name) {
                continue;
            }
            let digest = (spec.digest)(spec.name, node).map_err(|src| KeywordError {
                keyword: spec.name,
                src,
            })?;
            let Some(digest) = digest else {
                continue;
            };
            let key = CheckKey {
                dialect,
                keyword: spec.name,
                digest: Canonical::new(digest),
            };
            let check = cached(&self.checks, key, |key| {
                self.built(spec.name);
                (spec.build)(spec.name, key.digest.value())
                    .map(Arc::from)
                    .map_err(|src| KeywordError {
                        keyword: spec.name,
                        src,
                    })
            })?;
            checks.push(check);
        }
        Ok(checks)
    }

    pub(crate) fn object_routing(
        &self,
        node: &Map<String, Value>,
    ) -> Result<Option<Arc<ObjectRouting>>, KeywordError> {
        let Some(digest) = ObjectRouting::digest(node)? else {
            return Ok(None);
        };
        cached(&self.objects, Canonical::new(digest), |digest| {
            self.built("properties");
            ObjectRouting::build(digest.value()).map(Arc::new)
        })
        .map(Some)
    }

    pub(crate) fn array_routing(
        &self,
        node: &Map<String, Value>,
    ) -> Result<Option<Arc<ArrayRouting>>, KeywordError> {
        let Some(digest) = ArrayRouting::digest(node)? else {
            return Ok(None);
        };
        cached(&self.arrays, Canonical::new(digest), |digest| {
            self.built("items");
            ArrayRouting::build(digest.value()).map(Arc::new)
        })
        .map(Some)
    }

    fn built(&self, keyword: &str) {
        let n = self.builds.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(keyword, builds = n, "built digest");
    }

    /// number of distinct digests held
    pub fn len(&self) -> usize {
        self.checks.read().len() + self.objects.read().len() + self.arrays.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// number of builds performed so far
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

// builds outside the lock; the first inserted value wins
fn cached<K, V, F>(map: &RwLock<HashMap<K, Arc<V>>>, key: K, build: F) -> Result<Arc<V>, KeywordError>
where
    K: Eq + Hash,
    V: ?Sized,
    F: FnOnce(&K) -> Result<Arc<V>, KeywordError>,
{
    if let Some(v) = map.read().get(&key) {
        return Ok(Arc::clone(v));
    }
    let v = build(&key)?;
    let mut map = map.write();
    Ok(Arc::clone(map.entry(key).or_insert(v)))
}

// ObjectRouting --

/// Which subschemas apply to each member of an object instance.
#[derive(Debug)]
pub(crate) struct ObjectRouting {
    properties: HashSet<String>,
    patterns: Vec<(String, Regex)>,
    additional: bool,
}

impl ObjectRouting {
    fn digest(node: &Map<String, Value>) -> Result<Option<Value>, KeywordError> {
        let err = |keyword, expected| KeywordError {
            keyword,
            src: invalid(keyword, expected),
        };
        let properties = match node.get("properties") {
            None => vec![],
            Some(Value::Object(obj)) => obj.keys().cloned().collect(),
            Some(_) => return Err(err("properties", "an object")),
        };
        let patterns = match node.get("patternProperties") {
            None => vec![],
            Some(Value::Object(obj)) => obj.keys().cloned().collect(),
            Some(_) => return Err(err("patternProperties", "an object")),
        };
        let additional = matches!(node.get("additionalProperties"), Some(Value::Object(_)));
        if properties.is_empty() && patterns.is_empty() && !additional {
            return Ok(None);
        }
        Ok(Some(json!({
            "properties": properties,
            "patternProperties": patterns,
            "additionalProperties": additional,
        })))
    }

    fn build(digest: &Value) -> Result<Self, KeywordError> {
        let mut patterns = vec![];
        for pattern in names(digest, "patternProperties") {
            let regex = ecma::compile(&pattern).map_err(|reason| KeywordError {
                keyword: "patternProperties",
                src: BuildError::InvalidRegex {
                    keyword: "patternProperties",
                    pattern: pattern.clone(),
                    reason,
                },
            })?;
            patterns.push((pattern, regex));
        }
        Ok(Self {
            properties: names(digest, "properties").collect(),
            patterns,
            additional: digest["additionalProperties"] == Value::Bool(true),
        })
    }

    /// Subschemas for member `name`: the `properties` entry, then every
    /// matching `patternProperties` entry; `additionalProperties` only if
    /// none of these applied.
    pub(crate) fn select_schemas(&self, name: &str) -> Vec<JsonPointer> {
        let mut schemas = vec![];
        if self.properties.contains(name) {
            schemas.push(JsonPointer::from_iter(["properties", name]));
        }
        for (pattern, regex) in &self.patterns {
            if regex.is_match(name) {
                schemas.push(JsonPointer::from_iter(["patternProperties", pattern.as_str()]));
            }
        }
        if schemas.is_empty() && self.additional {
            schemas.push(JsonPointer::from_iter(["additionalProperties"]));
        }
        schemas
    }
}

fn names<'v>(digest: &'v Value, kw: &str) -> impl Iterator<Item = String> + 'v {
    digest[kw]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_owned)
}

// ArrayRouting --

/// Which subschema applies to each element of an array instance.
#[derive(Debug)]
pub(crate) enum ArrayRouting {
    /// `items` is a single schema
    All,
    /// `items` is an array of `len` schemas
    Tuple { len: usize, additional: bool },
}

impl ArrayRouting {
    fn digest(node: &Map<String, Value>) -> Result<Option<Value>, KeywordError> {
        match node.get("items") {
            None => Ok(None),
            Some(Value::Object(_)) => Ok(Some(json!({"items": "schema"}))),
            Some(Value::Array(arr)) if arr.iter().all(Value::is_object) => {
                let additional = matches!(node.get("additionalItems"), Some(Value::Object(_)));
                Ok(Some(json!({"items": arr.len(), "additionalItems": additional})))
            }
            Some(_) => Err(KeywordError {
                keyword: "items",
                src: invalid("items", "a schema or an array of schemas"),
            }),
        }
    }

    fn build(digest: &Value) -> Result<Self, KeywordError> {
        match digest["items"].as_u64() {
            Some(len) => Ok(Self::Tuple {
                len: len as usize,
                additional: digest["additionalItems"] == Value::Bool(true),
            }),
            None => Ok(Self::All),
        }
    }

    pub(crate) fn select_schemas(&self, index: usize) -> Vec<JsonPointer> {
        match self {
            Self::All => vec![JsonPointer::from_iter(["items"])],
            Self::Tuple { len, .. } if index < *len => {
                vec![JsonPointer::root().prop("items").item(index)]
            }
            Self::Tuple {
                additional: true, ..
            } => vec![JsonPointer::from_iter(["additionalItems"])],
            Self::Tuple { .. } => vec![],
        }
    }
}
