use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde_json::Value;
use thiserror::Error;

use crate::util::*;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PointerError {
    #[error("json-pointer {ptr:?} must be empty or start with '/'")]
    MissingSlash { ptr: String },
    #[error("json-pointer {ptr:?} has invalid escape; '~' must be followed by '0' or '1'")]
    InvalidEscape { ptr: String },
    #[error("fragment {fragment:?} is not valid utf-8 after percent-decoding")]
    InvalidFragment { fragment: String },
}

/// A JSON Pointer (rfc6901), held as unescaped reference tokens.
///
/// Array indices are ordinary tokens; they are interpreted as indices only
/// when the pointer is walked through an array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer(Vec<String>);

impl JsonPointer {
    /// The empty pointer, pointing to the whole document.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses `s` in its json string form, such as `/definitions/a~1b`.
    pub fn parse(s: &str) -> Result<Self, PointerError> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = s.strip_prefix('/') else {
            return Err(PointerError::MissingSlash { ptr: s.to_owned() });
        };
        let mut tokens = vec![];
        for tok in rest.split('/') {
            let Some(tok) = unescape(tok) else {
                return Err(PointerError::InvalidEscape { ptr: s.to_owned() });
            };
            tokens.push(tok.into_owned());
        }
        Ok(Self(tokens))
    }

    /// Parses a percent-encoded uri fragment, without the leading `#`.
    pub fn from_fragment(fragment: &str) -> Result<Self, PointerError> {
        let Ok(decoded) = fragment_unescape(fragment) else {
            return Err(PointerError::InvalidFragment {
                fragment: fragment.to_owned(),
            });
        };
        Self::parse(&decoded)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// returns a new pointer with `name` appended
    pub fn prop(&self, name: &str) -> Self {
        let mut tokens = Vec::with_capacity(self.0.len() + 1);
        tokens.extend_from_slice(&self.0);
        tokens.push(name.to_owned());
        Self(tokens)
    }

    /// returns a new pointer with array index `i` appended
    pub fn item(&self, i: usize) -> Self {
        self.prop(&i.to_string())
    }

    /// returns a new pointer with all tokens of `other` appended
    pub fn join(&self, other: &JsonPointer) -> Self {
        let mut tokens = Vec::with_capacity(self.0.len() + other.0.len());
        tokens.extend_from_slice(&self.0);
        tokens.extend_from_slice(&other.0);
        Self(tokens)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    /// returns the remainder of `self` if it starts with `prefix`
    pub fn strip_prefix(&self, prefix: &JsonPointer) -> Option<Self> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| Self(rest.to_vec()))
    }

    pub fn starts_with(&self, prefix: &JsonPointer) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Walks `v` along this pointer.
    pub fn lookup<'v>(&self, v: &'v Value) -> Option<&'v Value> {
        let mut v = v;
        for tok in &self.0 {
            v = match v {
                Value::Object(obj) => obj.get(tok)?,
                Value::Array(arr) => arr.get(parse_index(tok)?)?,
                _ => return None,
            };
        }
        Some(v)
    }

    /// Percent-encoded form for use as uri fragment.
    pub fn to_fragment(&self) -> String {
        fragment_escape(&self.to_string()).into_owned()
    }
}

// array index tokens must not have leading zeros
fn parse_index(tok: &str) -> Option<usize> {
    if tok.len() > 1 && tok.starts_with('0') {
        return None;
    }
    usize::from_str(tok).ok()
}

impl Display for JsonPointer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for tok in &self.0 {
            write!(f, "/{}", escape(tok))?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<S: Into<String>> FromIterator<S> for JsonPointer {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_display() {
        let tests = ["", "/a", "/a~1b/c~0d", "/items/0", "/"];
        for s in tests {
            let ptr = JsonPointer::parse(s).unwrap();
            assert_eq!(ptr.to_string(), s);
        }
        assert_eq!(JsonPointer::parse("/").unwrap().len(), 1);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            JsonPointer::parse("a/b"),
            Err(PointerError::MissingSlash { .. })
        ));
        assert!(matches!(
            JsonPointer::parse("/a~2"),
            Err(PointerError::InvalidEscape { .. })
        ));
    }

    #[test]
    fn test_fragment() {
        let ptr = JsonPointer::from_fragment("/a%20b/c%25").unwrap();
        assert_eq!(ptr.tokens().collect::<Vec<_>>(), ["a b", "c%"]);
        assert_eq!(ptr.to_fragment(), "/a%20b/c%25");
    }

    #[test]
    fn test_lookup() {
        let v = json!({"a": [10, {"b/c": true}], "00": 1});
        let t = json!(true);
        let tests = [
            ("", Some(&v)),
            ("/a/0", Some(&v["a"][0])),
            ("/a/1/b~1c", Some(&t)),
            ("/a/2", None),
            ("/a/01", None),
            ("/00", Some(&v["00"])),
            ("/x", None),
        ];
        for (ptr, want) in tests {
            let ptr = JsonPointer::parse(ptr).unwrap();
            assert_eq!(ptr.lookup(&v), want, "lookup {ptr}");
        }
    }

    #[test]
    fn test_prefix() {
        let base = JsonPointer::root().prop("definitions");
        let ptr = base.prop("a").item(2);
        assert!(ptr.starts_with(&base));
        assert_eq!(ptr.strip_prefix(&base).unwrap().to_string(), "/a/2");
        assert_eq!(ptr.parent().unwrap().to_string(), "/definitions/a");
        assert_eq!(JsonPointer::root().parent(), None);
    }
}
