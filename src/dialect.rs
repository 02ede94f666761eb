use std::{collections::HashMap, fmt::Display};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::{
    keywords::{self, KeywordSpec},
    util::*,
};

pub(crate) const POS_SELF: u8 = 1 << 0;
pub(crate) const POS_PROP: u8 = 1 << 1;
pub(crate) const POS_ITEM: u8 = 1 << 2;

static DRAFT4_SUBSCHEMAS: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    HashMap::from([
        // type agnostic
        ("definitions", POS_PROP),
        ("not", POS_SELF),
        ("allOf", POS_ITEM),
        ("anyOf", POS_ITEM),
        ("oneOf", POS_ITEM),
        // object
        ("properties", POS_PROP),
        ("additionalProperties", POS_SELF),
        ("patternProperties", POS_PROP),
        ("dependencies", POS_PROP),
        // array
        ("items", POS_SELF | POS_ITEM),
        ("additionalItems", POS_SELF),
    ])
});

static DRAFT3_SUBSCHEMAS: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    HashMap::from([
        // type agnostic
        ("definitions", POS_PROP),
        ("extends", POS_SELF | POS_ITEM),
        ("type", POS_ITEM),
        ("disallow", POS_ITEM),
        // object
        ("properties", POS_PROP),
        ("additionalProperties", POS_SELF),
        ("patternProperties", POS_PROP),
        ("dependencies", POS_PROP),
        // array
        ("items", POS_SELF | POS_ITEM),
        ("additionalItems", POS_SELF),
    ])
});

// keywords that are understood but have no check of their own
const DRAFT4_ANNOTATIONS: &[&str] = &[
    "$schema",
    "id",
    "$ref",
    "title",
    "description",
    "default",
    "definitions",
    "properties",
    "patternProperties",
    "items",
    "exclusiveMinimum",
    "exclusiveMaximum",
];

const DRAFT3_ANNOTATIONS: &[&str] = &[
    "$schema",
    "id",
    "$ref",
    "title",
    "description",
    "default",
    "definitions",
    "patternProperties",
    "items",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "required",
];

/// A named, versioned set of recognized keywords.
///
/// Selected once per schema document from its `$schema` member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Dialect {
    V3,
    #[default]
    V4,
}

impl Dialect {
    pub fn latest() -> Self {
        Dialect::V4
    }

    pub fn from_url(url: &str) -> Option<Self> {
        let (mut url, fragment) = split(url);
        if !fragment.is_empty() {
            return None;
        }
        if let Some(s) = url.strip_prefix("http://") {
            url = s;
        }
        if let Some(s) = url.strip_prefix("https://") {
            url = s;
        }
        let Ok(url) = fragment_unescape(url) else {
            return None;
        };
        match url.as_ref() {
            "json-schema.org/schema" => Some(Self::latest()),
            "json-schema.org/draft-04/schema" => Some(Dialect::V4),
            "json-schema.org/draft-03/schema" => Some(Dialect::V3),
            _ => None,
        }
    }

    /// Reads `$schema` of `doc`. Documents without a recognized `$schema`
    /// get the `default` dialect.
    pub(crate) fn detect(doc: &Value, default: Dialect) -> Dialect {
        let Some(Value::String(sch)) = doc.get("$schema") else {
            return default;
        };
        match Dialect::from_url(sch) {
            Some(dialect) => dialect,
            None => {
                tracing::warn!(schema = %sch, %default, "unrecognized $schema; using default dialect");
                default
            }
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Dialect::V3 => "http://json-schema.org/draft-03/schema#",
            Dialect::V4 => "http://json-schema.org/draft-04/schema#",
        }
    }

    pub(crate) fn id_keyword(&self) -> &'static str {
        "id"
    }

    pub(crate) fn subschemas(&self) -> &'static HashMap<&'static str, u8> {
        match self {
            Dialect::V3 => &DRAFT3_SUBSCHEMAS,
            Dialect::V4 => &DRAFT4_SUBSCHEMAS,
        }
    }

    /// Constraint checks in dispatch order.
    pub(crate) fn keywords(&self) -> &'static [KeywordSpec] {
        keywords::table(*self)
    }

    /// returns true if `kw` has a meaning in this dialect
    pub fn recognizes(&self, kw: &str) -> bool {
        let annotations = match self {
            Dialect::V3 => DRAFT3_ANNOTATIONS,
            Dialect::V4 => DRAFT4_ANNOTATIONS,
        };
        annotations.contains(&kw) || self.keywords().iter().any(|spec| spec.name == kw)
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::V3 => write!(f, "draft-03"),
            Dialect::V4 => write!(f, "draft-04"),
        }
    }
}
