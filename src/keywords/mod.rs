//! Constraint checks, one per keyword, and the per-dialect tables that
//! dispatch them.
//!
//! A check is built from a digest: the subset of the schema node it
//! depends on, with locations stripped. Structurally equal digests share
//! one built check.

mod array;
mod combinators;
mod common;
mod number;
mod object;
mod string;

use std::fmt::Debug;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    dialect::Dialect,
    equiv::is_integer,
    processor::Context,
    report::{Aborted, Report},
};

/// A built constraint check.
pub(crate) trait Keyword: Send + Sync + Debug {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("value of {keyword:?} must be {expected}")]
    InvalidValue {
        keyword: &'static str,
        expected: &'static str,
    },
    #[error("invalid regex {pattern:?} in {keyword:?}: {reason}")]
    InvalidRegex {
        keyword: &'static str,
        pattern: String,
        reason: String,
    },
    #[error("unknown type {name:?} in {keyword:?}")]
    UnknownType { keyword: &'static str, name: String },
}

pub(crate) type Digester = fn(&'static str, &Map<String, Value>) -> Result<Option<Value>, BuildError>;
pub(crate) type Builder = fn(&'static str, &Value) -> Result<Box<dyn Keyword>, BuildError>;

/// How a keyword is digested and built.
pub(crate) struct KeywordSpec {
    pub(crate) name: &'static str,
    pub(crate) digest: Digester,
    pub(crate) build: Builder,
}

const fn spec(name: &'static str, digest: Digester, build: Builder) -> KeywordSpec {
    KeywordSpec {
        name,
        digest,
        build,
    }
}

// digest is the keyword member itself
pub(crate) fn member(kw: &'static str, node: &Map<String, Value>) -> Result<Option<Value>, BuildError> {
    Ok(node.get(kw).cloned())
}

pub(crate) fn invalid(keyword: &'static str, expected: &'static str) -> BuildError {
    BuildError::InvalidValue { keyword, expected }
}

/// reads a non-negative integer
pub(crate) fn count(kw: &'static str, v: &Value) -> Result<usize, BuildError> {
    match v {
        Value::Number(n) if is_integer(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| invalid(kw, "a non-negative integer")),
        _ => Err(invalid(kw, "a non-negative integer")),
    }
}

/// reads an array of schemas, returning its length
pub(crate) fn schema_array(kw: &'static str, v: &Value) -> Result<usize, BuildError> {
    match v {
        Value::Array(arr) if !arr.is_empty() && arr.iter().all(Value::is_object) => Ok(arr.len()),
        _ => Err(invalid(kw, "a non-empty array of schemas")),
    }
}

static DRAFT4: Lazy<Vec<KeywordSpec>> = Lazy::new(|| {
    vec![
        spec("type", member, common::build_type),
        spec("enum", member, common::build_enum),
        spec("allOf", combinators::digest_array, combinators::build_all_of),
        spec("anyOf", combinators::digest_array, combinators::build_any_of),
        spec("oneOf", combinators::digest_array, combinators::build_one_of),
        spec("not", combinators::digest_not, combinators::build_not),
        spec("minimum", number::digest_bound, number::build_bound),
        spec("maximum", number::digest_bound, number::build_bound),
        spec("multipleOf", member, number::build_multiple_of),
        spec("minLength", member, string::build_length),
        spec("maxLength", member, string::build_length),
        spec("pattern", member, string::build_pattern),
        spec("format", member, common::build_format),
        spec("minItems", member, array::build_items_bound),
        spec("maxItems", member, array::build_items_bound),
        spec("uniqueItems", array::digest_unique, array::build_unique),
        spec("additionalItems", array::digest_additional, array::build_additional),
        spec("minProperties", member, object::build_properties_bound),
        spec("maxProperties", member, object::build_properties_bound),
        spec("required", member, object::build_required),
        spec("additionalProperties", object::digest_additional, object::build_additional),
        spec("dependencies", object::digest_dependencies, object::build_dependencies),
    ]
});

static DRAFT3: Lazy<Vec<KeywordSpec>> = Lazy::new(|| {
    vec![
        spec("type", common::digest_union, common::build_union),
        spec("disallow", common::digest_union, common::build_union),
        spec("enum", member, common::build_enum),
        spec("extends", combinators::digest_extends, combinators::build_all_of),
        spec("minimum", number::digest_bound, number::build_bound),
        spec("maximum", number::digest_bound, number::build_bound),
        spec("divisibleBy", member, number::build_multiple_of),
        spec("minLength", member, string::build_length),
        spec("maxLength", member, string::build_length),
        spec("pattern", member, string::build_pattern),
        spec("format", member, common::build_format),
        spec("minItems", member, array::build_items_bound),
        spec("maxItems", member, array::build_items_bound),
        spec("uniqueItems", array::digest_unique, array::build_unique),
        spec("additionalItems", array::digest_additional, array::build_additional),
        spec("properties", object::digest_required_v3, object::build_required),
        spec("additionalProperties", object::digest_additional, object::build_additional),
        spec("dependencies", object::digest_dependencies, object::build_dependencies),
    ]
});

pub(crate) fn table(dialect: Dialect) -> &'static [KeywordSpec] {
    match dialect {
        Dialect::V3 => &DRAFT3,
        Dialect::V4 => &DRAFT4,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_count() {
        assert_eq!(count("minLength", &json!(3)), Ok(3));
        assert_eq!(count("minLength", &json!(3.0)), Ok(3));
        assert_eq!(
            count("minLength", &json!(1.5)),
            Err(invalid("minLength", "a non-negative integer"))
        );
        assert!(count("minLength", &json!(-1)).is_err());
        assert!(count("minLength", &json!("3")).is_err());
    }

    #[test]
    fn test_tables_have_unique_names() {
        for dialect in [Dialect::V3, Dialect::V4] {
            let mut names = table(dialect).iter().map(|s| s.name).collect::<Vec<_>>();
            let n = names.len();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), n, "{dialect}");
        }
    }
}
