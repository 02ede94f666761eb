use std::{borrow::Cow, fmt::Display, str::Utf8Error};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

// characters that must be escaped in a uri fragment
const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b']')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// returns single-quoted string
pub(crate) fn quote<T>(s: &T) -> String
where
    T: AsRef<str> + std::fmt::Debug + ?Sized,
{
    let s = format!("{s:?}")
        .replace(r#"\""#, "\"")
        .replace('\'', r#"\'"#);
    format!("'{}'", &s[1..s.len() - 1])
}

pub(crate) fn join_iter<T>(iterable: T, sep: &str) -> String
where
    T: IntoIterator,
    T::Item: Display,
{
    iterable
        .into_iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

/// escapes a reference token as per rfc6901
pub(crate) fn escape(token: &str) -> Cow<str> {
    if token.contains(['~', '/']) {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}

/// reverses [`escape`]. returns `None` if `~` is not followed by `0` or `1`
pub(crate) fn unescape(token: &str) -> Option<Cow<str>> {
    if !token.contains('~') {
        return Some(Cow::Borrowed(token));
    }
    let mut s = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(ch) = chars.next() {
        if ch == '~' {
            match chars.next() {
                Some('0') => s.push('~'),
                Some('1') => s.push('/'),
                _ => return None,
            }
        } else {
            s.push(ch);
        }
    }
    Some(Cow::Owned(s))
}

pub(crate) fn fragment_escape(s: &str) -> Cow<str> {
    utf8_percent_encode(s, FRAGMENT).into()
}

pub(crate) fn fragment_unescape(s: &str) -> Result<Cow<str>, Utf8Error> {
    percent_decode_str(s).decode_utf8()
}

pub(crate) fn split(url: &str) -> (&str, &str) {
    if let Some(i) = url.find('#') {
        (&url[..i], &url[i + 1..])
    } else {
        (url, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote(r#"abc"def'ghi"#), r#"'abc"def\'ghi'"#);
    }

    #[test]
    fn test_escape() {
        let tests = [("a/b", "a~1b"), ("m~n", "m~0n"), ("~/", "~0~1"), ("plain", "plain")];
        for (raw, want) in tests {
            assert_eq!(escape(raw), want);
            assert_eq!(unescape(want).as_deref(), Some(raw));
        }
    }

    #[test]
    fn test_unescape_invalid() {
        assert_eq!(unescape("a~2b"), None);
        assert_eq!(unescape("trailing~"), None);
    }

    #[test]
    fn test_fragment_escape() {
        assert_eq!(fragment_escape("/a b/c%d"), "/a%20b/c%25d");
        assert_eq!(fragment_unescape("/a%20b/c%25d").unwrap(), "/a b/c%d");
    }

    #[test]
    fn test_split() {
        assert_eq!(split("http://a.com/s.json#/x"), ("http://a.com/s.json", "/x"));
        assert_eq!(split("http://a.com/s.json"), ("http://a.com/s.json", ""));
        assert_eq!(split("#"), ("", ""));
    }
}
