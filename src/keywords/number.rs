use serde_json::{json, Map, Number, Value};

use super::{invalid, BuildError, Keyword};
use crate::{
    equiv::Decimal,
    processor::Context,
    report::{Aborted, Report},
};

// minimum, maximum --

#[derive(Debug)]
struct Bound {
    keyword: &'static str,
    limit: Number,
    exclusive: bool,
}

fn exclusive_keyword(kw: &str) -> &'static str {
    if kw == "minimum" {
        "exclusiveMinimum"
    } else {
        "exclusiveMaximum"
    }
}

// the exclusive flag is part of the bound
pub(super) fn digest_bound(
    kw: &'static str,
    node: &Map<String, Value>,
) -> Result<Option<Value>, BuildError> {
    let Some(limit) = node.get(kw) else {
        return Ok(None);
    };
    if !limit.is_number() {
        return Err(invalid(kw, "a number"));
    }
    let ex_kw = exclusive_keyword(kw);
    let exclusive = match node.get(ex_kw) {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(invalid(ex_kw, "a boolean")),
    };
    Ok(Some(json!({"limit": limit, "exclusive": exclusive})))
}

pub(super) fn build_bound(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    let Value::Number(limit) = &v["limit"] else {
        return Err(invalid(kw, "a number"));
    };
    Ok(Box::new(Bound {
        keyword: kw,
        limit: limit.clone(),
        exclusive: v["exclusive"] == Value::Bool(true),
    }))
}

impl Keyword for Bound {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let Value::Number(n) = cx.instance() else {
            return Ok(());
        };
        let (value, limit) = (Decimal::from(n), Decimal::from(&self.limit));
        let lower = self.keyword == "minimum";
        let ok = match (lower, self.exclusive) {
            (true, false) => value >= limit,
            (true, true) => value > limit,
            (false, false) => value <= limit,
            (false, true) => value < limit,
        };
        if ok {
            return Ok(());
        }
        let msg = match (lower, self.exclusive) {
            (true, false) => format!(
                "numeric instance is lower than the required minimum (minimum: {}, found: {n})",
                self.limit
            ),
            (true, true) => format!(
                "numeric instance is not strictly greater than the required minimum {}",
                self.limit
            ),
            (false, false) => format!(
                "numeric instance is greater than the required maximum (maximum: {}, found: {n})",
                self.limit
            ),
            (false, true) => format!(
                "numeric instance is not strictly lower than the required maximum {}",
                self.limit
            ),
        };
        report.log(
            cx.error(self.keyword, msg)
                .arg(self.keyword, self.limit.clone())
                .arg(exclusive_keyword(self.keyword), self.exclusive)
                .arg("found", n.clone()),
        )
    }
}

// multipleOf, divisibleBy --

#[derive(Debug)]
struct MultipleOf {
    keyword: &'static str,
    divisor: Number,
}

pub(super) fn build_multiple_of(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    match v {
        Value::Number(n) if n.as_f64().map_or(false, |f| f > 0.0) => Ok(Box::new(MultipleOf {
            keyword: kw,
            divisor: n.clone(),
        })),
        _ => Err(invalid(kw, "a number greater than zero")),
    }
}

impl MultipleOf {
    fn is_multiple(&self, n: &Number) -> bool {
        let exact = Decimal::from(n).is_multiple_of(&Decimal::from(&self.divisor));
        match exact {
            Some(ok) => ok,
            None => match (n.as_f64(), self.divisor.as_f64()) {
                (Some(n), Some(d)) => (n / d).fract() == 0.0,
                _ => true,
            },
        }
    }
}

impl Keyword for MultipleOf {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let Value::Number(n) = cx.instance() else {
            return Ok(());
        };
        if self.is_multiple(n) {
            return Ok(());
        }
        let msg = format!(
            "remainder of division is not zero ({n} / {})",
            self.divisor
        );
        report.log(
            cx.error(self.keyword, msg)
                .arg("divisor", self.divisor.clone())
                .arg("value", n.clone()),
        )
    }
}
