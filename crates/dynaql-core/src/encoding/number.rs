use std::fmt;

/// A numeric value.
///
/// Integers keep their integer representation so that their decimal text
/// never gains a fractional part. The checked constructors never produce a
/// non-finite `Float`; one built directly is rejected when encoded.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Number {
    /// Returns `None` for NaN and the infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        value.is_finite().then_some(Number::Float(value))
    }

    /// Parse the decimal text of a numeric wire literal.
    ///
    /// Tries signed, then unsigned, then floating-point. Non-finite results
    /// are rejected.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(i) = text.parse::<i64>() {
            return Some(Number::Int(i));
        }
        if let Ok(u) = text.parse::<u64>() {
            return Some(Number::UInt(u));
        }
        text.parse::<f64>().ok().and_then(Number::from_f64)
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::UInt(u) => u as f64,
            Number::Float(f) => f,
        }
    }

    /// False only for a `Float` holding NaN or an infinity.
    pub fn is_finite(&self) -> bool {
        match *self {
            Number::Float(f) => f.is_finite(),
            _ => true,
        }
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Number::Int(i) => i == 0,
            Number::UInt(u) => u == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match *self {
            Number::Int(i) => Some(i as i128),
            Number::UInt(u) => Some(u as i128),
            Number::Float(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match *self {
            Number::Int(i) => serde_json::Value::from(i),
            Number::UInt(u) => serde_json::Value::from(u),
            // Whole floats go back out as integers, matching their text form.
            Number::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                serde_json::Value::from(f as i64)
            }
            Number::Float(f) => serde_json::Value::from(f),
        }
    }

    pub(crate) fn from_json(n: &serde_json::Number) -> Option<Self> {
        if let Some(i) = n.as_i64() {
            Some(Number::Int(i))
        } else if let Some(u) = n.as_u64() {
            Some(Number::UInt(u))
        } else {
            n.as_f64().and_then(Number::from_f64)
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self.as_i128(), other.as_i128()) {
            (Some(a), Some(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

/// Canonical decimal text: never uses exponent notation.
impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::UInt(u) => write!(f, "{u}"),
            Number::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Int(value as i64)
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Number::UInt(value)
    }
}

impl From<u32> for Number {
    fn from(value: u32) -> Self {
        Number::Int(value as i64)
    }
}

/// Whether `text` is a numeric literal: an optional leading minus, one or
/// more digits, then optionally a dot followed by zero or more digits.
pub fn is_numeric_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (digits, None),
    };
    !int_part.is_empty()
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.is_none_or(|f| f.bytes().all(|b| b.is_ascii_digit()))
}
