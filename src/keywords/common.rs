use serde_json::{json, Map, Value};

use super::{combinators::branch, invalid, BuildError, Keyword};
use crate::{
    equiv::{equals, is_integer},
    formats::FORMATS,
    pointer::JsonPointer,
    processor::Context,
    report::{Aborted, LogLevel, Report},
    util::*,
};

/// Primitive types of json schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Type {
    Null,
    Boolean,
    Number,
    Integer,
    String,
    Array,
    Object,
    /// draft-03 only
    Any,
}

impl Type {
    fn from_name(name: &str) -> Option<Self> {
        let t = match name {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "string" => Self::String,
            "array" => Self::Array,
            "object" => Self::Object,
            "any" => Self::Any,
            _ => return None,
        };
        Some(t)
    }

    /// most specific type of `v`
    pub(crate) fn of(v: &Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if is_integer(n) => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    pub(crate) fn matches(self, v: &Value) -> bool {
        match (self, Self::of(v)) {
            (Self::Any, _) => true,
            (Self::Number, Self::Integer) => true,
            (want, got) => want == got,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }
}

fn type_names(types: &[Type]) -> Vec<&'static str> {
    types.iter().map(|t| t.name()).collect()
}

// type (draft-04) --

#[derive(Debug)]
struct TypeCheck {
    types: Vec<Type>,
}

fn parse_type(kw: &'static str, v: &Value, allow_any: bool) -> Result<Type, BuildError> {
    let Value::String(name) = v else {
        return Err(invalid(kw, "a string or an array of strings"));
    };
    match Type::from_name(name) {
        Some(Type::Any) if !allow_any => Err(BuildError::UnknownType {
            keyword: kw,
            name: name.clone(),
        }),
        Some(t) => Ok(t),
        None => Err(BuildError::UnknownType {
            keyword: kw,
            name: name.clone(),
        }),
    }
}

pub(super) fn build_type(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    let types = match v {
        Value::Array(arr) if !arr.is_empty() => arr
            .iter()
            .map(|t| parse_type(kw, t, false))
            .collect::<Result<Vec<_>, _>>()?,
        Value::Array(_) => return Err(invalid(kw, "a non-empty array")),
        _ => vec![parse_type(kw, v, false)?],
    };
    Ok(Box::new(TypeCheck { types }))
}

impl Keyword for TypeCheck {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let v = cx.instance();
        if self.types.iter().any(|t| t.matches(v)) {
            return Ok(());
        }
        let found = Type::of(v).name();
        let expected = type_names(&self.types);
        let msg = format!(
            "instance type ({found}) does not match any allowed primitive type (allowed: [{}])",
            join_iter(expected.iter().map(|t| quote(t)), ", ")
        );
        report.log(
            cx.error("type", msg)
                .arg("found", found)
                .arg("expected", expected),
        )
    }
}

// type, disallow (draft-03) --

/// `type` or `disallow` of draft-03: simple type names mixed with schemas.
#[derive(Debug)]
struct TypeUnion {
    keyword: &'static str,
    types: Vec<Type>,
    schemas: Vec<usize>,
}

// schemas in the union are replaced by their index
pub(super) fn digest_union(
    kw: &'static str,
    node: &Map<String, Value>,
) -> Result<Option<Value>, BuildError> {
    let Some(v) = node.get(kw) else {
        return Ok(None);
    };
    let items = match v {
        Value::Array(arr) => arr.as_slice(),
        _ => std::slice::from_ref(v),
    };
    let mut types = vec![];
    let mut schemas = vec![];
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(_) => types.push(item.clone()),
            Value::Object(_) => schemas.push(i),
            _ => return Err(invalid(kw, "a string, a schema or an array of these")),
        }
    }
    Ok(Some(json!({"types": types, "schemas": schemas})))
}

pub(super) fn build_union(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    let types = v["types"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|t| parse_type(kw, t, true))
        .collect::<Result<Vec<_>, _>>()?;
    let schemas = v["schemas"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_u64)
        .map(|i| i as usize)
        .collect();
    Ok(Box::new(TypeUnion {
        keyword: kw,
        types,
        schemas,
    }))
}

impl TypeUnion {
    fn schema_ptr(&self, cx: &Context<'_>, i: usize) -> JsonPointer {
        // a lone schema is not wrapped in an array
        let kw = JsonPointer::root().prop(self.keyword);
        match cx.schema().current_node().get(self.keyword) {
            Some(Value::Array(_)) => kw.item(i),
            _ => kw,
        }
    }

    fn check_type(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let v = cx.instance();
        if self.types.iter().any(|t| t.matches(v)) {
            return Ok(());
        }
        let mut failures = vec![];
        for &i in &self.schemas {
            let Some(sub) = branch(cx, &self.schema_ptr(cx, i), report)? else {
                return Ok(());
            };
            if sub.is_success() {
                return Ok(());
            }
            failures.push(sub);
        }
        let found = Type::of(v).name();
        let msg = format!("instance type ({found}) does not match any allowed primitive type or schema");
        report.log(
            cx.error(self.keyword, msg)
                .arg("found", found)
                .arg("expected", type_names(&self.types)),
        )?;
        for sub in failures {
            report.merge(sub)?;
        }
        Ok(())
    }

    fn check_disallow(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let v = cx.instance();
        if let Some(t) = self.types.iter().find(|t| t.matches(v)) {
            let found = Type::of(v).name();
            let msg = format!("instance type ({found}) matches a disallowed type ({})", t.name());
            return report.log(
                cx.error(self.keyword, msg)
                    .arg("found", found)
                    .arg("disallowed", type_names(&self.types)),
            );
        }
        for &i in &self.schemas {
            let Some(sub) = branch(cx, &self.schema_ptr(cx, i), report)? else {
                return Ok(());
            };
            if sub.is_success() {
                let msg = "instance matched a disallowed schema";
                return report.log(cx.error(self.keyword, msg).arg("matched", i));
            }
        }
        Ok(())
    }
}

impl Keyword for TypeUnion {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        if self.keyword == "disallow" {
            self.check_disallow(cx, report)
        } else {
            self.check_type(cx, report)
        }
    }
}

// enum --

#[derive(Debug)]
struct Enum {
    values: Vec<Value>,
}

pub(super) fn build_enum(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    match v {
        Value::Array(arr) if !arr.is_empty() => Ok(Box::new(Enum {
            values: arr.clone(),
        })),
        _ => Err(invalid(kw, "a non-empty array")),
    }
}

impl Keyword for Enum {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let v = cx.instance();
        if self.values.iter().any(|e| equals(e, v)) {
            return Ok(());
        }
        let msg = format!(
            "instance value ({v}) not found in enum (possible values: {})",
            Value::Array(self.values.clone())
        );
        report.log(
            cx.error("enum", msg)
                .arg("value", v.clone())
                .arg("enum", self.values.clone()),
        )
    }
}

// format --

#[derive(Debug)]
struct Format {
    name: String,
}

pub(super) fn build_format(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    match v {
        Value::String(name) => Ok(Box::new(Format { name: name.clone() })),
        _ => Err(invalid(kw, "a string")),
    }
}

impl Keyword for Format {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let cfg = cx.config();
        if !cfg.format_assertions {
            return Ok(());
        }
        let format = cfg
            .formats
            .get(&self.name)
            .or_else(|| FORMATS.get(self.name.as_str()));
        let Some(format) = format else {
            let msg = cx
                .message(LogLevel::Warning, "format", "format attribute not supported")
                .arg("attribute", self.name.as_str());
            return report.log(msg);
        };
        match (format.func)(cx.instance()) {
            Ok(()) => Ok(()),
            Err(e) => {
                let msg = format!("value is not a valid {}: {e}", self.name);
                report.log(
                    cx.error("format", msg)
                        .arg("attribute", self.name.as_str())
                        .arg("value", cx.instance().clone()),
                )
            }
        }
    }
}
