use std::{
    collections::HashMap,
    error::Error,
    net::{Ipv4Addr, Ipv6Addr},
};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::{ecma, pointer::JsonPointer};

/// Check behind a `format` attribute.
#[derive(Clone, Copy)]
pub(crate) struct Format {
    pub(crate) func: fn(v: &Value) -> Result<(), Box<dyn Error>>,
}

// draft-03 names are kept alongside their draft-04 successors
pub(crate) static FORMATS: Lazy<HashMap<&'static str, Format>> = Lazy::new(|| {
    let mut m = HashMap::<&'static str, Format>::new();
    let mut register = |name, func| m.insert(name, Format { func });
    register("regex", validate_regex);
    register("ipv4", validate_ipv4);
    register("ip-address", validate_ipv4);
    register("ipv6", validate_ipv6);
    register("hostname", validate_hostname);
    register("host-name", validate_hostname);
    register("email", validate_email);
    register("date", validate_date);
    register("time", validate_time);
    register("date-time", validate_date_time);
    register("utc-millisec", validate_utc_millisec);
    register("json-pointer", validate_json_pointer);
    register("uuid", validate_uuid);
    register("uri", validate_uri);
    m
});

fn validate_regex(v: &Value) -> Result<(), Box<dyn Error>> {
    let Value::String(s) = v else {
        return Ok(());
    };
    ecma::compile(s)?;
    Ok(())
}

fn validate_ipv4(v: &Value) -> Result<(), Box<dyn Error>> {
    let Value::String(s) = v else {
        return Ok(());
    };
    s.parse::<Ipv4Addr>()?;
    Ok(())
}

fn validate_ipv6(v: &Value) -> Result<(), Box<dyn Error>> {
    let Value::String(s) = v else {
        return Ok(());
    };
    s.parse::<Ipv6Addr>()?;
    Ok(())
}

fn matches_char(s: &str, index: usize, ch: char) -> bool {
    s.is_char_boundary(index) && s[index..].starts_with(ch)
}

fn validate_date(v: &Value) -> Result<(), Box<dyn Error>> {
    let Value::String(s) = v else {
        return Ok(());
    };
    check_date(s)
}

// yyyy-mm-dd, see https://datatracker.ietf.org/doc/html/rfc3339#section-5.6
fn check_date(s: &str) -> Result<(), Box<dyn Error>> {
    if s.len() != 10 {
        Err("must be 10 characters long")?;
    }
    if !matches_char(s, 4, '-') || !matches_char(s, 7, '-') {
        Err("missing hyphen in correct place")?;
    }
    let mut ymd = s.splitn(3, '-').map(|t| t.parse::<usize>().ok());
    let (Some(Some(y)), Some(Some(m)), Some(Some(d))) = (ymd.next(), ymd.next(), ymd.next())
    else {
        return Err("non-numeric year/month/day")?;
    };
    let days = match m {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if y % 4 == 0 && (y % 100 != 0 || y % 400 == 0) => 29,
        2 => 28,
        _ => return Err(format!("{m} months in year"))?,
    };
    if !(1..=days).contains(&d) {
        Err(format!("month {m} has {days} days only"))?;
    }
    Ok(())
}

// hh:mm:ss, with leap second
fn check_hms(s: &str) -> Result<(usize, usize, usize), Box<dyn Error>> {
    if s.len() != 8 || !matches_char(s, 2, ':') || !matches_char(s, 5, ':') {
        Err("must be of form hh:mm:ss")?;
    }
    let mut hms = s.splitn(3, ':').map(|t| {
        t.bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| t.parse::<usize>().ok())
            .flatten()
    });
    let (Some(Some(h)), Some(Some(m)), Some(Some(sec))) = (hms.next(), hms.next(), hms.next())
    else {
        return Err("non-numeric hour/min/sec")?;
    };
    if h > 23 || m > 59 || sec > 60 {
        Err("hour/min/sec out of range")?;
    }
    Ok((h, m, sec))
}

fn validate_time(v: &Value) -> Result<(), Box<dyn Error>> {
    let Value::String(s) = v else {
        return Ok(());
    };
    let (_, _, sec) = check_hms(s)?;
    if sec == 60 {
        Err("leap second without offset")?;
    }
    Ok(())
}

// full-time of rfc3339: hh:mm:ss[.frac](Z|+hh:mm|-hh:mm)
fn check_full_time(s: &str) -> Result<(), Box<dyn Error>> {
    if !s.is_char_boundary(8) || s.len() < 9 {
        Err("less than 9 characters long")?;
    }
    let (mut h, mut m, sec) = check_hms(&s[..8])?;
    let mut rest = &s[8..];
    if let Some(frac) = rest.strip_prefix('.') {
        let n = frac.chars().take_while(char::is_ascii_digit).count();
        if n == 0 {
            Err("no digits in second fraction")?;
        }
        rest = &frac[n..];
    }

    if !rest.eq_ignore_ascii_case("z") {
        let sign: isize = match rest.chars().next() {
            Some('+') => -1,
            Some('-') => 1,
            _ => return Err("offset must begin with plus/minus")?,
        };
        let offset = &rest[1..];
        if offset.len() != 5 || !matches_char(offset, 2, ':') {
            Err("offset must be of form hh:mm")?;
        }
        let (Ok(zh), Ok(zm)) = (offset[..2].parse::<usize>(), offset[3..].parse::<usize>()) else {
            return Err("non-numeric offset")?;
        };
        if zh > 23 || zm > 59 {
            Err("offset out of range")?;
        }
        // leap second is checked in utc
        let mut hm = (h * 60 + m) as isize + sign * (zh * 60 + zm) as isize;
        hm = hm.rem_euclid(24 * 60);
        (h, m) = (hm as usize / 60, hm as usize % 60);
    }

    if sec == 60 && !(h == 23 && m == 59) {
        Err("invalid leap second")?;
    }
    Ok(())
}

fn validate_date_time(v: &Value) -> Result<(), Box<dyn Error>> {
    let Value::String(s) = v else {
        return Ok(());
    };
    if s.len() < 20 {
        Err("less than 20 characters long")?;
    }
    if !s.is_char_boundary(10) || !s[10..].starts_with(['t', 'T']) {
        Err("11th character must be t or T")?;
    }
    if let Err(e) = check_date(&s[..10]) {
        Err(format!("invalid date element: {e}"))?;
    }
    if let Err(e) = check_full_time(&s[11..]) {
        Err(format!("invalid time element: {e}"))?;
    }
    Ok(())
}

// milliseconds since epoch
fn validate_utc_millisec(v: &Value) -> Result<(), Box<dyn Error>> {
    let Value::Number(n) = v else {
        return Ok(());
    };
    if n.as_f64().map_or(true, f64::is_nan) {
        Err("not a representable number")?;
    }
    Ok(())
}

fn validate_hostname(v: &Value) -> Result<(), Box<dyn Error>> {
    let Value::String(s) = v else {
        return Ok(());
    };
    check_hostname(s)
}

// see https://en.wikipedia.org/wiki/Hostname#Restrictions_on_valid_host_names
fn check_hostname(s: &str) -> Result<(), Box<dyn Error>> {
    let s = s.strip_suffix('.').unwrap_or(s);
    if s.len() > 253 {
        Err("more than 253 characters long")?
    }
    for label in s.split('.') {
        if !matches!(label.len(), 1..=63) {
            Err("label must be 1 to 63 characters long")?;
        }
        if label.starts_with('-') || label.ends_with('-') {
            Err("label starts or ends with hyphen")?;
        }
        if let Some(ch) = label
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-')
        {
            Err(format!("invalid character {ch:?}"))?;
        }
    }
    Ok(())
}

fn validate_email(v: &Value) -> Result<(), Box<dyn Error>> {
    let Value::String(s) = v else {
        return Ok(());
    };
    check_email(s)
}

// see https://en.wikipedia.org/wiki/Email_address
fn check_email(s: &str) -> Result<(), Box<dyn Error>> {
    if s.len() > 254 {
        Err("more than 254 characters long")?;
    }
    let Some(at) = s.rfind('@') else {
        return Err("missing @")?;
    };
    let (local, domain) = (&s[..at], &s[at + 1..]);
    if local.is_empty() || local.len() > 64 {
        Err("local part must be 1 to 64 characters long")?;
    }

    if local.len() > 1 && local.starts_with('"') && local.ends_with('"') {
        if local[1..local.len() - 1].contains(['\\', '"']) {
            Err("backslash and quote not allowed within quoted local part")?;
        }
    } else {
        if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
            Err("misplaced dot in local part")?;
        }
        if let Some(ch) = local
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || ".!#$%&'*+-/=?^_`{|}~".contains(*c)))
        {
            Err(format!("invalid character {ch:?}"))?;
        }
    }

    if let Some(ip) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        match ip.strip_prefix("IPv6:") {
            Some(ip) => ip.parse::<Ipv6Addr>().map(|_| ())?,
            None => ip.parse::<Ipv4Addr>().map(|_| ())?,
        }
        return Ok(());
    }
    if let Err(e) = check_hostname(domain) {
        Err(format!("invalid domain: {e}"))?;
    }
    Ok(())
}

fn validate_json_pointer(v: &Value) -> Result<(), Box<dyn Error>> {
    let Value::String(s) = v else {
        return Ok(());
    };
    JsonPointer::parse(s)?;
    Ok(())
}

// see https://datatracker.ietf.org/doc/html/rfc4122#page-4
fn validate_uuid(v: &Value) -> Result<(), Box<dyn Error>> {
    let Value::String(s) = v else {
        return Ok(());
    };
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let groups = s.split('-').collect::<Vec<_>>();
    if groups.len() != GROUPS.len() {
        Err("must have 5 elements")?;
    }
    for (i, (group, want)) in groups.iter().zip(GROUPS).enumerate() {
        if group.len() != want {
            Err(format!("element {} must be {want} characters long", i + 1))?;
        }
        if let Some(ch) = group.chars().find(|c| !c.is_ascii_hexdigit()) {
            Err(format!("non-hex character {ch:?}"))?;
        }
    }
    Ok(())
}

fn validate_uri(v: &Value) -> Result<(), Box<dyn Error>> {
    let Value::String(s) = v else {
        return Ok(());
    };
    if fluent_uri::Uri::parse(s.as_str())?.is_relative() {
        Err("relative url")?;
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn check(format: &str, v: Value) -> bool {
        (FORMATS[format].func)(&v).is_ok()
    }

    #[test]
    fn test_valid() {
        let tests = [
            ("date", json!("2020-02-29")),
            ("time", json!("23:59:59")),
            ("date-time", json!("1990-12-31T15:59:60-08:00")),
            ("date-time", json!("1963-06-19T08:30:06.283185Z")),
            ("email", json!("joe.bloggs@example.com")),
            ("hostname", json!("www.example.com")),
            ("host-name", json!("example")),
            ("ipv4", json!("192.168.0.1")),
            ("ip-address", json!("127.0.0.1")),
            ("ipv6", json!("::1")),
            ("uri", json!("http://example.com/a?b#c")),
            ("json-pointer", json!("/a~1b/0")),
            ("uuid", json!("2eb8aa08-aa98-11ea-b4aa-73b441d16380")),
            ("regex", json!("^[a-z]+\\d$")),
            ("utc-millisec", json!(1234567890123u64)),
            ("email", json!(12)), // non-strings pass
        ];
        for (format, v) in tests {
            assert!(check(format, v.clone()), "{format}: {v}");
        }
    }

    #[test]
    fn test_invalid() {
        let tests = [
            ("date", json!("2021-02-29")),
            ("date", json!("2020-13-01")),
            ("time", json!("24:00:00")),
            ("date-time", json!("1990-12-31T15:59:60Z")),
            ("date-time", json!("1990-12-31 15:59:50Z")),
            ("email", json!("no-at-sign")),
            ("email", json!(".dot@example.com")),
            ("hostname", json!("-bad-.com")),
            ("ipv4", json!("256.1.1.1")),
            ("ipv6", json!("12345::")),
            ("uri", json!("relative/path")),
            ("json-pointer", json!("a/b")),
            ("uuid", json!("2eb8aa08-aa98-11ea-b4aa")),
            ("regex", json!("(unclosed")),
        ];
        for (format, v) in tests {
            assert!(!check(format, v.clone()), "{format}: {v}");
        }
    }
}
