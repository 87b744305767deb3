//! Runtime values and the state snapshot rules are evaluated against.

use std::cmp::Ordering;
use std::fmt;

use rustc_hash::FxHashMap;

use md_core::Level;

/// A state snapshot: variable name to value.
pub type State = FxHashMap<String, Value>;

// ── Value ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Num(f64),
    Level(Level),
    Str(String),
}

impl Value {
    /// Truthiness used by `and`, `or` and `not`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None      => false,
            Value::Bool(b)   => *b,
            Value::Num(n)    => *n != 0.0,
            Value::Level(_)  => true,
            Value::Str(s)    => !s.is_empty(),
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n)  => Some(*n),
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    /// Levels and strings naming a level both read as a level.
    pub fn as_level(&self) -> Option<Level> {
        match self {
            Value::Level(l) => Some(*l),
            Value::Str(s)   => s.parse().ok(),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None     => "None",
            Value::Bool(_)  => "bool",
            Value::Num(_)   => "number",
            Value::Level(_) => "level",
            Value::Str(_)   => "string",
        }
    }

    /// Equality across representations: numbers compare numerically
    /// (booleans count as 0/1), levels compare with strings naming them.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            _ => {
                if let (Some(a), Some(b)) = (self.as_num(), other.as_num()) {
                    a == b
                } else if let (Some(a), Some(b)) = (self.as_level(), other.as_level()) {
                    a == b
                } else {
                    false
                }
            }
        }
    }

    /// Ordering for `<`, `<=`, `>` and `>=`.  `None` when the values are
    /// not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.as_num(), other.as_num()) {
            return a.partial_cmp(&b);
        }
        if let (Some(a), Some(b)) = (self.as_level(), other.as_level()) {
            return Some(a.cmp(&b));
        }
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Whether this value selects the branch labelled `key`.
    pub fn matches_key(&self, key: &str) -> bool {
        match self {
            Value::None     => key == "None",
            Value::Bool(b)  => key.eq_ignore_ascii_case(if *b { "true" } else { "false" }),
            Value::Num(n)   => key.parse::<f64>().is_ok_and(|k| k == *n),
            Value::Level(l) => key == l.as_str(),
            Value::Str(s)   => key == s,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None     => f.write_str("None"),
            Value::Bool(b)  => f.write_str(if *b { "True" } else { "False" }),
            Value::Num(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Num(n)   => write!(f, "{n}"),
            Value::Level(l) => f.write_str(l.as_str()),
            Value::Str(s)   => f.write_str(s),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::Num(f64::from(n))
    }
}

impl From<Level> for Value {
    fn from(l: Level) -> Self {
        Value::Level(l)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}
