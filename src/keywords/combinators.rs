use serde_json::{json, Map, Value};

use super::{invalid, schema_array, BuildError, Keyword};
use crate::{
    pointer::JsonPointer,
    processor::Context,
    report::{Aborted, LogLevel, Report},
};

/// Validates the branch at `rel` into a report of its own, in which only
/// fatal messages abort.
///
/// Returns `None` if the branch logged a fatal message; that report is
/// then already merged into `report`.
pub(super) fn branch(
    cx: &Context<'_>,
    rel: &JsonPointer,
    report: &mut Report,
) -> Result<Option<Report>, Aborted> {
    let mut sub = report.with_fatal_threshold(report.threshold().max(LogLevel::Fatal));
    cx.validate_branch(rel, &mut sub)?;
    if sub.has_fatal() {
        report.merge(sub)?;
        return Ok(None);
    }
    Ok(Some(sub))
}

// digest of an array of schemas is its length
pub(super) fn digest_array(
    kw: &'static str,
    node: &Map<String, Value>,
) -> Result<Option<Value>, BuildError> {
    let Some(v) = node.get(kw) else {
        return Ok(None);
    };
    Ok(Some(json!(schema_array(kw, v)?)))
}

fn branches(kw: &'static str, v: &Value) -> Result<Vec<JsonPointer>, BuildError> {
    let n = v
        .as_u64()
        .ok_or_else(|| invalid(kw, "a non-empty array of schemas"))?;
    let kw_ptr = JsonPointer::root().prop(kw);
    Ok((0..n as usize).map(|i| kw_ptr.item(i)).collect())
}

// allOf, extends --

/// Every branch must succeed. Diagnostics of all branches are kept.
#[derive(Debug)]
struct AllOf {
    branches: Vec<JsonPointer>,
}

// draft-03 `extends` is a schema or an array of schemas
pub(super) fn digest_extends(
    kw: &'static str,
    node: &Map<String, Value>,
) -> Result<Option<Value>, BuildError> {
    match node.get(kw) {
        None => Ok(None),
        Some(Value::Object(_)) => Ok(Some(json!("schema"))),
        Some(v) => Ok(Some(json!(schema_array(kw, v)?))),
    }
}

pub(super) fn build_all_of(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    let branches = match v {
        Value::String(_) => vec![JsonPointer::root().prop(kw)],
        _ => branches(kw, v)?,
    };
    Ok(Box::new(AllOf { branches }))
}

impl Keyword for AllOf {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        for rel in &self.branches {
            let mut sub = report.with_fatal_threshold(report.threshold());
            cx.validate_branch(rel, &mut sub)?;
            report.merge(sub)?;
        }
        Ok(())
    }
}

// anyOf --

/// Stops at the first successful branch. Diagnostics of failed branches
/// are kept only when no branch succeeds.
#[derive(Debug)]
struct AnyOf {
    branches: Vec<JsonPointer>,
}

pub(super) fn build_any_of(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    Ok(Box::new(AnyOf {
        branches: branches(kw, v)?,
    }))
}

impl Keyword for AnyOf {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let mut failures = vec![];
        for rel in &self.branches {
            let Some(sub) = branch(cx, rel, report)? else {
                return Ok(());
            };
            if sub.is_success() {
                return Ok(());
            }
            failures.push(sub);
        }
        let n = self.branches.len();
        let msg = format!("instance failed to match at least one required schema among {n}");
        report.log(cx.error("anyOf", msg).arg("nrSchemas", n))?;
        for sub in failures {
            report.merge(sub)?;
        }
        Ok(())
    }
}

// oneOf --

/// Exactly one branch must succeed. Diagnostics of failed branches are
/// kept only when no branch succeeds.
#[derive(Debug)]
struct OneOf {
    branches: Vec<JsonPointer>,
}

pub(super) fn build_one_of(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    Ok(Box::new(OneOf {
        branches: branches(kw, v)?,
    }))
}

impl Keyword for OneOf {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let mut matched = vec![];
        let mut failures = vec![];
        for (i, rel) in self.branches.iter().enumerate() {
            let Some(sub) = branch(cx, rel, report)? else {
                return Ok(());
            };
            if sub.is_success() {
                matched.push(i);
            } else {
                failures.push(sub);
            }
        }
        if matched.len() == 1 {
            return Ok(());
        }
        let n = self.branches.len();
        let msg = format!(
            "instance failed to match exactly one schema (matched {} out of {n})",
            matched.len()
        );
        report.log(
            cx.error("oneOf", msg)
                .arg("matched", matched.len())
                .arg("nrSchemas", n)
                .arg("matchedIndices", matched.clone()),
        )?;
        if matched.is_empty() {
            for sub in failures {
                report.merge(sub)?;
            }
        }
        Ok(())
    }
}

// not --

/// The branch must fail. Its diagnostics are never kept.
#[derive(Debug)]
struct Not;

pub(super) fn digest_not(
    kw: &'static str,
    node: &Map<String, Value>,
) -> Result<Option<Value>, BuildError> {
    match node.get(kw) {
        None => Ok(None),
        Some(Value::Object(_)) => Ok(Some(json!("schema"))),
        Some(_) => Err(invalid(kw, "a schema")),
    }
}

pub(super) fn build_not(_kw: &'static str, _v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    Ok(Box::new(Not))
}

impl Keyword for Not {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let Some(sub) = branch(cx, &JsonPointer::from_iter(["not"]), report)? else {
            return Ok(());
        };
        if sub.is_success() {
            report.log(cx.error("not", "instance matched a schema which it should not"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digests_are_location_free() {
        let a = json!({"allOf": [{"type": "string"}, {"minLength": 1}]});
        let b = json!({"allOf": [{"maximum": 3}, {}]});
        let da = digest_array("allOf", a.as_object().unwrap()).unwrap();
        let db = digest_array("allOf", b.as_object().unwrap()).unwrap();
        assert_eq!(da, Some(json!(2)));
        assert_eq!(da, db);
    }

    #[test]
    fn test_invalid_arrays() {
        for v in [json!({"anyOf": []}), json!({"anyOf": {}}), json!({"anyOf": [1]})] {
            assert!(digest_array("anyOf", v.as_object().unwrap()).is_err(), "{v}");
        }
        assert!(digest_not("not", json!({"not": []}).as_object().unwrap()).is_err());
    }

    #[test]
    fn test_extends() {
        let single = json!({"extends": {"type": "string"}});
        let digest = digest_extends("extends", single.as_object().unwrap())
            .unwrap()
            .unwrap();
        assert!(build_all_of("extends", &digest).is_ok());
        let many = json!({"extends": [{}, {}]});
        let digest = digest_extends("extends", many.as_object().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(digest, json!(2));
    }
}
