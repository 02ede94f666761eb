use serde_json::{json, Map, Value};

use super::{count, invalid, BuildError, Keyword};
use crate::{
    equiv::equals,
    processor::Context,
    report::{Aborted, Report},
};

// minItems, maxItems --

#[derive(Debug)]
struct ItemsBound {
    keyword: &'static str,
    limit: usize,
}

pub(super) fn build_items_bound(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    Ok(Box::new(ItemsBound {
        keyword: kw,
        limit: count(kw, v)?,
    }))
}

impl Keyword for ItemsBound {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let Value::Array(arr) = cx.instance() else {
            return Ok(());
        };
        let (len, limit) = (arr.len(), self.limit);
        let msg = if self.keyword == "minItems" {
            if len >= limit {
                return Ok(());
            }
            format!("array is too short: must have at least {limit} elements but instance has {len} elements")
        } else {
            if len <= limit {
                return Ok(());
            }
            format!("array is too long: must have at most {limit} elements but instance has {len} elements")
        };
        report.log(
            cx.error(self.keyword, msg)
                .arg(self.keyword, limit)
                .arg("found", len),
        )
    }
}

// uniqueItems --

#[derive(Debug)]
struct UniqueItems;

// only `true` has a check
pub(super) fn digest_unique(
    kw: &'static str,
    node: &Map<String, Value>,
) -> Result<Option<Value>, BuildError> {
    match node.get(kw) {
        None | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Bool(true)) => Ok(Some(Value::Bool(true))),
        Some(_) => Err(invalid(kw, "a boolean")),
    }
}

pub(super) fn build_unique(_kw: &'static str, _v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    Ok(Box::new(UniqueItems))
}

impl Keyword for UniqueItems {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let Value::Array(arr) = cx.instance() else {
            return Ok(());
        };
        for i in 1..arr.len() {
            for j in 0..i {
                if equals(&arr[i], &arr[j]) {
                    let msg = format!("array must not contain duplicate elements (items at {j} and {i} are equal)");
                    return report.log(cx.error("uniqueItems", msg).arg("duplicates", vec![j, i]));
                }
            }
        }
        Ok(())
    }
}

// additionalItems --

/// `additionalItems: false` next to an array `items`; other forms only
/// route elements to subschemas.
#[derive(Debug)]
struct AdditionalItems {
    max: usize,
}

pub(super) fn digest_additional(
    kw: &'static str,
    node: &Map<String, Value>,
) -> Result<Option<Value>, BuildError> {
    match (node.get(kw), node.get("items")) {
        (None | Some(Value::Bool(true) | Value::Object(_)), _) => Ok(None),
        (Some(Value::Bool(false)), Some(Value::Array(items))) => {
            Ok(Some(json!({"items": items.len()})))
        }
        (Some(Value::Bool(false)), _) => Ok(None),
        (Some(_), _) => Err(invalid(kw, "a boolean or a schema")),
    }
}

pub(super) fn build_additional(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    Ok(Box::new(AdditionalItems {
        max: count(kw, &v["items"])?,
    }))
}

impl Keyword for AdditionalItems {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let Value::Array(arr) = cx.instance() else {
            return Ok(());
        };
        if arr.len() <= self.max {
            return Ok(());
        }
        let msg = format!(
            "array is too long: must have at most {} elements but instance has {} elements",
            self.max,
            arr.len()
        );
        report.log(
            cx.error("additionalItems", msg)
                .arg("max", self.max)
                .arg("found", arr.len()),
        )
    }
}
