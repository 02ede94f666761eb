use regex::Regex;
use serde_json::Value;

use super::{count, invalid, BuildError, Keyword};
use crate::{
    ecma,
    processor::Context,
    report::{Aborted, Report},
};

// minLength, maxLength --

/// Bound on the length of a string, counted in unicode code points.
#[derive(Debug)]
struct Length {
    keyword: &'static str,
    limit: usize,
}

pub(super) fn build_length(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    Ok(Box::new(Length {
        keyword: kw,
        limit: count(kw, v)?,
    }))
}

impl Keyword for Length {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let Value::String(s) = cx.instance() else {
            return Ok(());
        };
        let len = s.chars().count();
        let msg = if self.keyword == "minLength" {
            if len >= self.limit {
                return Ok(());
            }
            format!(
                "string {s:?} is too short (length: {len}, required minimum: {})",
                self.limit
            )
        } else {
            if len <= self.limit {
                return Ok(());
            }
            format!(
                "string {s:?} is too long (length: {len}, maximum allowed: {})",
                self.limit
            )
        };
        report.log(
            cx.error(self.keyword, msg)
                .arg("value", s.as_str())
                .arg(self.keyword, self.limit)
                .arg("found", len),
        )
    }
}

// pattern --

#[derive(Debug)]
struct Pattern {
    source: String,
    regex: Regex,
}

pub(super) fn build_pattern(kw: &'static str, v: &Value) -> Result<Box<dyn Keyword>, BuildError> {
    let Value::String(source) = v else {
        return Err(invalid(kw, "a string"));
    };
    let regex = ecma::compile(source).map_err(|reason| BuildError::InvalidRegex {
        keyword: kw,
        pattern: source.clone(),
        reason,
    })?;
    Ok(Box::new(Pattern {
        source: source.clone(),
        regex,
    }))
}

impl Keyword for Pattern {
    fn validate(&self, cx: &Context<'_>, report: &mut Report) -> Result<(), Aborted> {
        let Value::String(s) = cx.instance() else {
            return Ok(());
        };
        if self.regex.is_match(s) {
            return Ok(());
        }
        let msg = format!(
            "ECMA 262 regex {:?} does not match input string {s:?}",
            self.source
        );
        report.log(
            cx.error("pattern", msg)
                .arg("regex", self.source.as_str())
                .arg("string", s.as_str()),
        )
    }
}
