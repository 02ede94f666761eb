use std::{
    fmt::{Display, Formatter},
    hash::Hash,
};

use thiserror::Error;
use url::Url;

use crate::{
    pointer::{JsonPointer, PointerError},
    util::*,
};

#[derive(Debug, Error)]
pub enum RefError {
    #[error("invalid reference {reference:?}")]
    InvalidUri {
        reference: String,
        #[source]
        src: url::ParseError,
    },
    #[error("invalid fragment in reference {reference:?}")]
    InvalidFragment {
        reference: String,
        #[source]
        src: PointerError,
    },
}

/// Document part of a [`SchemaRef`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Locator {
    /// normalized absolute uri, without fragment
    Absolute(Url),
    /// relative uri; empty for anonymous documents
    Relative(String),
}

/// Fragment part of a [`SchemaRef`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// json-pointer fragment; the empty fragment is the root pointer
    Pointer(JsonPointer),
    /// plain-name fragment such as `#foo`
    Name(String),
}

/// A uri reference to a schema: a document locator and a fragment.
///
/// Two references are equal iff their normalized forms are equal.
/// `url` normalizes dot-segments, default ports and case of scheme/host,
/// and an empty fragment is the same as no fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaRef {
    pub(crate) locator: Locator,
    pub(crate) fragment: Fragment,
}

impl SchemaRef {
    /// The reference of a document loaded without any uri.
    pub fn anonymous() -> Self {
        Self {
            locator: Locator::Relative(String::new()),
            fragment: Fragment::Pointer(JsonPointer::root()),
        }
    }

    pub fn parse(s: &str) -> Result<Self, RefError> {
        let (uri, fragment) = split(s);
        let fragment = Self::parse_fragment(s, fragment)?;
        let locator = match Url::parse(uri) {
            Ok(mut url) => {
                url.set_fragment(None);
                Locator::Absolute(url)
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => Locator::Relative(uri.to_owned()),
            Err(src) => {
                return Err(RefError::InvalidUri {
                    reference: s.to_owned(),
                    src,
                })
            }
        };
        Ok(Self { locator, fragment })
    }

    pub fn from_url(url: &Url) -> Result<Self, RefError> {
        let fragment = Self::parse_fragment(url.as_str(), url.fragment().unwrap_or_default())?;
        let mut url = url.clone();
        url.set_fragment(None);
        Ok(Self {
            locator: Locator::Absolute(url),
            fragment,
        })
    }

    fn parse_fragment(reference: &str, fragment: &str) -> Result<Fragment, RefError> {
        if fragment.is_empty() || fragment.starts_with('/') {
            return JsonPointer::from_fragment(fragment)
                .map(Fragment::Pointer)
                .map_err(|src| RefError::InvalidFragment {
                    reference: reference.to_owned(),
                    src,
                });
        }
        match fragment_unescape(fragment) {
            Ok(name) => Ok(Fragment::Name(name.into_owned())),
            Err(_) => Err(RefError::InvalidFragment {
                reference: reference.to_owned(),
                src: PointerError::InvalidFragment {
                    fragment: fragment.to_owned(),
                },
            }),
        }
    }

    /// Resolves `reference` against `self`, as per rfc3986.
    pub fn resolve(&self, reference: &str) -> Result<Self, RefError> {
        let target = Self::parse(reference)?;
        let (uri, _) = split(reference);
        let locator = match (&target.locator, &self.locator) {
            (Locator::Absolute(_), _) => target.locator.clone(),
            (Locator::Relative(r), base) if r.is_empty() => base.clone(),
            (Locator::Relative(_), Locator::Absolute(base)) => {
                let mut url = base.join(uri).map_err(|src| RefError::InvalidUri {
                    reference: reference.to_owned(),
                    src,
                })?;
                url.set_fragment(None);
                Locator::Absolute(url)
            }
            (Locator::Relative(r), Locator::Relative(base)) => {
                Locator::Relative(merge_relative(base, r))
            }
        };
        Ok(Self {
            locator,
            fragment: target.fragment,
        })
    }

    /// A reference is absolute iff it has a locator with a scheme.
    pub fn is_absolute(&self) -> bool {
        matches!(self.locator, Locator::Absolute(_))
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(&self.locator, Locator::Relative(r) if r.is_empty())
    }

    pub fn url(&self) -> Option<&Url> {
        match &self.locator {
            Locator::Absolute(url) => Some(url),
            Locator::Relative(_) => None,
        }
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    /// returns the json-pointer fragment, if the fragment is not a plain name
    pub fn pointer(&self) -> Option<&JsonPointer> {
        match &self.fragment {
            Fragment::Pointer(ptr) => Some(ptr),
            Fragment::Name(_) => None,
        }
    }

    /// returns same document reference with given pointer as fragment
    pub fn with_pointer(&self, ptr: JsonPointer) -> Self {
        Self {
            locator: self.locator.clone(),
            fragment: Fragment::Pointer(ptr),
        }
    }

    /// returns the document reference, without fragment
    pub fn document(&self) -> Self {
        self.with_pointer(JsonPointer::root())
    }

    pub fn same_document(&self, other: &SchemaRef) -> bool {
        self.locator == other.locator
    }
}

// rfc3986 section 5.2.3, for bases that have no scheme or authority
fn merge_relative(base: &str, r: &str) -> String {
    if r.starts_with('/') {
        return r.to_owned();
    }
    match base.rfind('/') {
        Some(i) => format!("{}{r}", &base[..=i]),
        None => r.to_owned(),
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Absolute(url) => write!(f, "{url}"),
            Locator::Relative(r) => write!(f, "{r}"),
        }
    }
}

impl Display for Fragment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Fragment::Pointer(ptr) => write!(f, "{}", ptr.to_fragment()),
            Fragment::Name(name) => write!(f, "{}", fragment_escape(name)),
        }
    }
}

impl Display for SchemaRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.locator, self.fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_equality() {
        let tests = [
            ("http://a.com/schema.json", "HTTP://A.COM/schema.json#"),
            ("http://a.com:80/x/../schema.json", "http://a.com/schema.json"),
            ("http://a.com/s#/a%20b", "http://a.com/s#/a b"),
            ("http://a.com/s#foo", "http://a.com/s#%66oo"),
        ];
        for (a, b) in tests {
            assert_eq!(SchemaRef::parse(a).unwrap(), SchemaRef::parse(b).unwrap(), "{a} == {b}");
        }
        assert_ne!(
            SchemaRef::parse("http://a.com/s#/a").unwrap(),
            SchemaRef::parse("http://a.com/s#a").unwrap()
        );
    }

    #[test]
    fn test_resolve() {
        let base = SchemaRef::parse("http://a.com/schemas/root.json#/definitions/x").unwrap();
        let tests = [
            ("#", "http://a.com/schemas/root.json#"),
            ("#/definitions/y", "http://a.com/schemas/root.json#/definitions/y"),
            ("other.json", "http://a.com/schemas/other.json#"),
            ("../up.json#/a", "http://a.com/up.json#/a"),
            ("http://b.com/x#name", "http://b.com/x#name"),
        ];
        for (r, want) in tests {
            let got = base.resolve(r).unwrap();
            assert_eq!(got.to_string(), want, "resolve {r}");
            assert!(got.is_absolute());
        }
    }

    #[test]
    fn test_resolve_against_anonymous() {
        let base = SchemaRef::anonymous();
        assert!(base.is_anonymous());
        let got = base.resolve("#/definitions/a").unwrap();
        assert!(got.is_anonymous());
        assert_eq!(got.to_string(), "#/definitions/a");

        let got = base.resolve("dir/child.json").unwrap();
        assert!(!got.is_absolute());
        let got = got.resolve("sibling.json#/x").unwrap();
        assert_eq!(got.to_string(), "dir/sibling.json#/x");
    }

    #[test]
    fn test_fragment_kinds() {
        let r = SchemaRef::parse("http://a.com/s.json#item").unwrap();
        assert_eq!(r.fragment(), &Fragment::Name("item".into()));
        assert_eq!(r.pointer(), None);
        let r = SchemaRef::parse("http://a.com/s.json#/items/0").unwrap();
        assert_eq!(r.pointer().map(ToString::to_string).as_deref(), Some("/items/0"));
        assert!(SchemaRef::parse("http://a.com/s.json#/a~9").is_err());
    }
}
