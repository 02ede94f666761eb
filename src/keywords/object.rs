use std::collections::HashSet;

use regex::Regex;
use serde_json::{json, Map, Value};

use super::{count, invalid, BuildError, Keyword};
use crate::{
    ecma,
    pointer::JsonPointer,
    processor::Context,
    report::{Aborted, Report},
    util::*,
};

// minProperties, maxProperties --

#[derive(Debug)]
struct PropertiesBound {
    keyword: &'static str,
    limit: usize,
}

pub(super) fn build_properties_bound(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    Ok(Box::new(PropertiesBound {
        keyword: kw,
        limit: count(kw, v)?,
    }))
}

impl Keyword for PropertiesBound {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let Value::Object(obj) = cx.instance() else {
            return Ok(());
        };
        let (len, limit) = (obj.len(), self.limit);
        let msg = if self.keyword == "minProperties" {
            if len >= limit {
                return Ok(());
            }
            format!("object has too few properties (found {len} but schema requires at least {limit})")
        } else {
            if len <= limit {
                return Ok(());
            }
            format!("object has too many properties (found {len} but schema requires at most {limit})")
        };
        report.log(
            cx.error(self.keyword, msg)
                .arg(self.keyword, limit)
                .arg("found", len),
        )
    }
}

// required --

#[derive(Debug)]
struct Required {
    names: Vec<String>,
}

// draft-03 marks required members inside their `properties` entry
pub(super) fn digest_required_v3(
    kw: &'static str,
    node: &Map<String, Value>,
) -> Result<Option<Value>, BuildError> {
    let Some(Value::Object(props)) = node.get(kw) else {
        return Ok(None);
    };
    let mut names = vec![];
    for (name, sch) in props {
        match sch.get("required") {
            None | Some(Value::Bool(false)) => {}
            Some(Value::Bool(true)) => names.push(Value::String(name.clone())),
            Some(_) => return Err(invalid("required", "a boolean")),
        }
    }
    if names.is_empty() {
        return Ok(None);
    }
    Ok(Some(Value::Array(names)))
}

pub(super) fn build_required(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    let expected = "a non-empty array of unique strings";
    let Value::Array(arr) = v else {
        return Err(invalid(kw, expected));
    };
    let mut names = Vec::with_capacity(arr.len());
    let mut seen = HashSet::new();
    for item in arr {
        match item {
            Value::String(name) if seen.insert(name.as_str()) => names.push(name.clone()),
            _ => return Err(invalid(kw, expected)),
        }
    }
    if names.is_empty() {
        return Err(invalid(kw, expected));
    }
    Ok(Box::new(Required { names }))
}

impl Keyword for Required {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let Value::Object(obj) = cx.instance() else {
            return Ok(());
        };
        let missing = self
            .names
            .iter()
            .filter(|name| !obj.contains_key(name.as_str()))
            .collect::<Vec<_>>();
        if missing.is_empty() {
            return Ok(());
        }
        let msg = format!(
            "object has missing required properties ([{}])",
            join_iter(missing.iter().map(|name| quote(name)), ", ")
        );
        report.log(
            cx.error("required", msg)
                .arg("required", self.names.clone())
                .arg("missing", missing.into_iter().cloned().collect::<Vec<_>>()),
        )
    }
}

// additionalProperties --

/// `additionalProperties: false`: members matched by neither `properties`
/// nor `patternProperties` are unwanted. Other forms only route members to
/// subschemas.
#[derive(Debug)]
struct AdditionalProperties {
    properties: HashSet<String>,
    patterns: Vec<Regex>,
}

pub(super) fn digest_additional(
    kw: &'static str,
    node: &Map<String, Value>,
) -> Result<Option<Value>, BuildError> {
    match node.get(kw) {
        None | Some(Value::Bool(true) | Value::Object(_)) => return Ok(None),
        Some(Value::Bool(false)) => {}
        Some(_) => return Err(invalid(kw, "a boolean or a schema")),
    }
    let keys = |kw: &str| match node.get(kw) {
        Some(Value::Object(obj)) => obj.keys().cloned().collect::<Vec<_>>(),
        _ => vec![],
    };
    Ok(Some(json!({
        "properties": keys("properties"),
        "patternProperties": keys("patternProperties"),
    })))
}

pub(super) fn build_additional(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    let strs = |kw: &str| {
        v[kw]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
    };
    let mut patterns = vec![];
    for pattern in strs("patternProperties") {
        let regex = ecma::compile(pattern).map_err(|reason| BuildError::InvalidRegex {
            keyword: kw,
            pattern: pattern.to_owned(),
            reason,
        })?;
        patterns.push(regex);
    }
    Ok(Box::new(AdditionalProperties {
        properties: strs("properties").into_iter().map(str::to_owned).collect(),
        patterns,
    }))
}

impl Keyword for AdditionalProperties {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let Value::Object(obj) = cx.instance() else {
            return Ok(());
        };
        let unwanted = obj
            .keys()
            .filter(|name| !self.properties.contains(name.as_str()))
            .filter(|name| !self.patterns.iter().any(|re| re.is_match(name)))
            .cloned()
            .collect::<Vec<_>>();
        if unwanted.is_empty() {
            return Ok(());
        }
        let msg = format!(
            "object instance has properties which are not allowed by the schema: [{}]",
            join_iter(unwanted.iter().map(|name| quote(name)), ", ")
        );
        report.log(cx.error("additionalProperties", msg).arg("unwanted", unwanted))
    }
}

// dependencies --

/// Property dependencies list members that must be present too; schema
/// dependencies are validated against the whole instance.
#[derive(Debug)]
struct Dependencies {
    properties: Vec<(String, Vec<String>)>,
    schemas: Vec<String>,
}

pub(super) fn digest_dependencies(
    kw: &'static str,
    node: &Map<String, Value>,
) -> Result<Option<Value>, BuildError> {
    let Some(v) = node.get(kw) else {
        return Ok(None);
    };
    let Value::Object(deps) = v else {
        return Err(invalid(kw, "an object"));
    };
    let mut properties = Map::new();
    let mut schemas = vec![];
    for (name, dep) in deps {
        match dep {
            Value::Object(_) => schemas.push(Value::String(name.clone())),
            // draft-03 allows a single member name
            Value::String(_) => {
                properties.insert(name.clone(), Value::Array(vec![dep.clone()]));
            }
            Value::Array(arr) if !arr.is_empty() && arr.iter().all(Value::is_string) => {
                properties.insert(name.clone(), dep.clone());
            }
            _ => return Err(invalid(kw, "an object of schemas or arrays of strings")),
        }
    }
    Ok(Some(json!({"properties": properties, "schemas": schemas})))
}

pub(super) fn build_dependencies(_kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    let properties = v["properties"]
        .as_object()
        .into_iter()
        .flatten()
        .map(|(name, deps)| {
            let deps = deps
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect();
            (name.clone(), deps)
        })
        .collect();
    let schemas = v["schemas"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect();
    Ok(Box::new(Dependencies {
        properties,
        schemas,
    }))
}

impl Keyword for Dependencies {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let Value::Object(obj) = cx.instance() else {
            return Ok(());
        };
        for (name, deps) in &self.properties {
            if !obj.contains_key(name) {
                continue;
            }
            let missing = deps
                .iter()
                .filter(|dep| !obj.contains_key(dep.as_str()))
                .cloned()
                .collect::<Vec<_>>();
            if missing.is_empty() {
                continue;
            }
            let msg = format!(
                "property {} depends on missing properties [{}]",
                quote(name),
                join_iter(missing.iter().map(|dep| quote(dep)), ", ")
            );
            report.log(
                cx.error("dependencies", msg)
                    .arg("property", name.as_str())
                    .arg("required", deps.clone())
                    .arg("missing", missing),
            )?;
        }
        for name in &self.schemas {
            if !obj.contains_key(name) {
                continue;
            }
            let rel = JsonPointer::from_iter(["dependencies", name.as_str()]);
            let mut sub = report.with_fatal_threshold(report.threshold());
            cx.validate_branch(&rel, &mut sub)?;
            report.merge(sub)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_v3() {
        let node = json!({"properties": {
            "a": {"required": true},
            "b": {"required": false},
            "c": {},
        }});
        let digest = digest_required_v3("properties", node.as_object().unwrap()).unwrap();
        assert_eq!(digest, Some(json!(["a"])));

        let node = json!({"properties": {"a": {}}});
        let digest = digest_required_v3("properties", node.as_object().unwrap()).unwrap();
        assert_eq!(digest, None);
    }

    #[test]
    fn test_build_required() {
        assert!(build_required("required", &json!(["a", "b"])).is_ok());
        for v in [json!([]), json!(["a", "a"]), json!([1]), json!("a")] {
            assert!(build_required("required", &v).is_err(), "{v}");
        }
    }

    #[test]
    fn test_digest_additional() {
        let node = json!({
            "properties": {"a": {}},
            "patternProperties": {"^x-": {}},
            "additionalProperties": false,
        });
        let digest = digest_additional("additionalProperties", node.as_object().unwrap()).unwrap();
        assert_eq!(
            digest,
            Some(json!({"properties": ["a"], "patternProperties": ["^x-"]}))
        );
        let node = json!({"additionalProperties": {}});
        let digest = digest_additional("additionalProperties", node.as_object().unwrap()).unwrap();
        assert_eq!(digest, None);
    }

    #[test]
    fn test_digest_dependencies() {
        let node = json!({"dependencies": {"a": "b", "c": ["d"], "e": {"type": "object"}}});
        let digest = digest_dependencies("dependencies", node.as_object().unwrap()).unwrap();
        assert_eq!(
            digest,
            Some(json!({"properties": {"a": ["b"], "c": ["d"]}, "schemas": ["e"]}))
        );
        let node = json!({"dependencies": {"a": 1}});
        assert!(digest_dependencies("dependencies", node.as_object().unwrap()).is_err());
    }
}
