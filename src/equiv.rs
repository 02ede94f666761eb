use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

use serde_json::{Number, Value};

/// Structural equality where numbers compare by arithmetic value and
/// object members compare regardless of order.
///
/// serde_json treats `1` and `1.0` as different values, so `==` on
/// [`Value`] cannot be used for `enum` or `uniqueItems`.
pub fn equals(v1: &Value, v2: &Value) -> bool {
    match (v1, v2) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(b1), Value::Bool(b2)) => b1 == b2,
        (Value::Number(n1), Value::Number(n2)) => Decimal::from(n1) == Decimal::from(n2),
        (Value::String(s1), Value::String(s2)) => s1 == s2,
        (Value::Array(arr1), Value::Array(arr2)) => {
            arr1.len() == arr2.len() && arr1.iter().zip(arr2).all(|(e1, e2)| equals(e1, e2))
        }
        (Value::Object(obj1), Value::Object(obj2)) => {
            if obj1.len() != obj2.len() {
                return false;
            }
            obj1.iter()
                .all(|(k1, v1)| obj2.get(k1).map_or(false, |v2| equals(v1, v2)))
        }
        _ => false,
    }
}

// Decimal --

/// Exact decimal form of a json number: `(-1)^negative * 0.digits * 10^exp`.
///
/// `digits` has no leading or trailing zeros; zero is the empty digit string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Decimal {
    negative: bool,
    digits: String,
    exp: i64,
}

impl Decimal {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        let (negative, s) = match s.strip_prefix('-') {
            Some(s) => (true, s),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (mantissa, exp) = match s.find(['e', 'E']) {
            Some(i) => (&s[..i], parse_exp(&s[i + 1..])?),
            None => (s, 0),
        };
        let (int, frac) = match mantissa.find('.') {
            Some(i) => (&mantissa[..i], &mantissa[i + 1..]),
            None => (mantissa, ""),
        };
        if int.is_empty() && frac.is_empty() {
            return None;
        }
        if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let mut digits = String::with_capacity(int.len() + frac.len());
        digits.push_str(int);
        digits.push_str(frac);
        let leading = digits.len() - digits.trim_start_matches('0').len();
        let digits = digits.trim_matches('0').to_owned();
        if digits.is_empty() {
            return Some(Self::zero());
        }
        let exp = exp.saturating_add(int.len() as i64 - leading as i64);
        Some(Self {
            negative,
            digits,
            exp,
        })
    }

    fn zero() -> Self {
        Self {
            negative: false,
            digits: String::new(),
            exp: 0,
        }
    }

    fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    /// Exact divisibility. Returns `None` when either value has too many
    /// digits for exact arithmetic, or `divisor` is zero.
    pub(crate) fn is_multiple_of(&self, divisor: &Decimal) -> Option<bool> {
        if divisor.is_zero() {
            return None;
        }
        if self.is_zero() {
            return Some(true);
        }
        // 0.digits * 10^exp == int(digits) * 10^scale
        let scale = |d: &Decimal| d.exp.saturating_sub(d.digits.len() as i64);
        let min = scale(self).min(scale(divisor));
        let int = |d: &Decimal| -> Option<u128> {
            let pow = u32::try_from(scale(d).checked_sub(min)?).ok()?;
            d.digits
                .parse::<u128>()
                .ok()?
                .checked_mul(10u128.checked_pow(pow)?)
        };
        Some(int(self)? % int(divisor)? == 0)
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        self.exp
            .cmp(&other.exp)
            .then_with(|| self.digits.as_str().cmp(other.digits.as_str()))
    }
}

impl From<&Number> for Decimal {
    fn from(n: &Number) -> Self {
        // Number's text is always a valid json number
        Decimal::parse(&n.to_string()).unwrap_or_else(Decimal::zero)
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.cmp_magnitude(other),
            (true, true) => other.cmp_magnitude(self),
        }
    }
}

/// returns true if `n` has no fractional part
pub(crate) fn is_integer(n: &Number) -> bool {
    let d = Decimal::from(n);
    d.is_zero() || d.exp >= d.digits.len() as i64
}

// Canonical --

/// A json value usable as a hash key, where equality is [`equals`].
#[derive(Debug, Clone)]
pub struct Canonical(Value);

impl Canonical {
    pub fn new(v: Value) -> Self {
        Self(v)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl PartialEq for Canonical {
    fn eq(&self, other: &Self) -> bool {
        equals(&self.0, &other.0)
    }
}

impl Eq for Canonical {}

impl Hash for Canonical {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

fn hash_value<H: Hasher>(v: &Value, state: &mut H) {
    match v {
        Value::Null => state.write_u8(0),
        Value::Bool(b) => {
            state.write_u8(1);
            b.hash(state);
        }
        Value::Number(n) => {
            state.write_u8(2);
            Decimal::from(n).hash(state);
        }
        Value::String(s) => {
            state.write_u8(3);
            s.hash(state);
        }
        Value::Array(arr) => {
            state.write_u8(4);
            state.write_usize(arr.len());
            for item in arr {
                hash_value(item, state);
            }
        }
        Value::Object(obj) => {
            state.write_u8(5);
            state.write_usize(obj.len());
            let mut keys = obj.keys().collect::<Vec<_>>();
            keys.sort();
            for k in keys {
                k.hash(state);
                hash_value(&obj[k], state);
            }
        }
    }
}

// exponents beyond i64 saturate; they only need to order correctly
fn parse_exp(s: &str) -> Option<i64> {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match s.parse::<i64>() {
        Ok(exp) => Some(exp),
        Err(_) if s.starts_with('-') => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}
