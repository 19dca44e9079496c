//! Dynamic value types for designer-authored data
//!
//! Rules, module graphs and entity variables all carry loosely-typed values
//! entered in an editor. `Value` is the closed set of shapes those values can
//! take, and the coercion helpers here implement the permissive comparison
//! rules the runtime applies to them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2D vector value (positions, pointer coordinates, velocities)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// Create a new vector
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared length of this vector
    pub fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Length of this vector
    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Squared distance to another point
    pub fn distance_squared(&self, other: Vec2) -> f64 {
        (*self - other).length_squared()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A dynamic value that can represent any designer-entered data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    /// No value / null
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// 2D vector value
    Vec2(Vec2),
    /// List of values
    List(Vec<Value>),
    /// Map of string keys to values
    Map(ValueMap),
}

/// A map of string keys to dynamic values
///
/// Uses IndexMap to preserve insertion order (useful for deterministic serialization)
pub type ValueMap = IndexMap<String, Value>;

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get this value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a vector
    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Value::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get this value as a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Try to get this value as a map
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Vec2(_) => "vector2",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Check if this value is numeric (int or float)
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Check if this value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Vec2(_) => true,
            Value::List(_) | Value::Map(_) => true,
        }
    }

    /// Numeric coercion
    ///
    /// Null and the empty string count as zero, booleans as 0/1, and strings
    /// are parsed. Returns `None` for values with no numeric reading.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Value::Null => Some(0.0),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if f.is_nan() => None,
            Value::Float(f) => Some(*f),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok().filter(|f| !f.is_nan())
                }
            }
            Value::Vec2(_) | Value::List(_) | Value::Map(_) => None,
        }
    }

    /// Boolean coercion
    ///
    /// Strings are true only when they spell "true" (any case).
    pub fn coerce_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            other => other.is_truthy(),
        }
    }

    /// Render the value as plain text (strings without quotes)
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Permissive equality for designer-entered literals
    ///
    /// Booleans compare equal to the strings "true"/"false", numbers compare
    /// equal to numeric strings, and null only equals null.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
                match bool_literal(s) {
                    Some(parsed) => parsed == *b,
                    None => numbers_equal(self, other),
                }
            }
            (Value::Vec2(a), Value::Vec2(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.loose_eq(other)))
            }
            _ => numbers_equal(self, other),
        }
    }
}

fn bool_literal(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn numbers_equal(a: &Value, b: &Value) -> bool {
    match (a.coerce_number(), b.coerce_number()) {
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Vec2(v) => write!(f, "{}", v),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f as f64)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Value::Vec2(v)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(vec: Vec<T>) -> Self {
        Value::List(vec.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Typed lookups on parameter maps
///
/// Missing keys and explicit nulls both read as `None`, so callers can chain
/// fallbacks with `or`.
pub trait ParamExt {
    /// Numeric parameter (numbers and numeric strings)
    fn num(&self, key: &str) -> Option<f64>;

    /// Non-empty string parameter, trimmed
    fn text(&self, key: &str) -> Option<&str>;

    /// Boolean parameter (coerced)
    fn flag(&self, key: &str) -> Option<bool>;
}

impl ParamExt for ValueMap {
    fn num(&self, key: &str) -> Option<f64> {
        self.get(key)
            .filter(|v| !v.is_null())
            .and_then(Value::coerce_number)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).filter(|v| !v.is_null()).map(Value::coerce_bool)
    }
}

/// Build a `ValueMap` from key/value pairs
///
/// ```
/// use tickflow_core::{params, Value};
///
/// let p = params! { "damage" => 10, "targetId" => "enemy" };
/// assert_eq!(p.get("damage"), Some(&Value::Int(10)));
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::ValueMap::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::ValueMap::new();
        $( map.insert(::std::string::String::from($key), $crate::Value::from($value)); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Float(3.5).as_float(), Some(3.5));
        assert_eq!(Value::Int(42).as_float(), Some(42.0));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert_eq!(Value::Vec2(Vec2::new(1.0, 2.0)).type_name(), "vector2");
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::Null.coerce_number(), Some(0.0));
        assert_eq!(Value::Bool(true).coerce_number(), Some(1.0));
        assert_eq!(Value::from(" 12.5 ").coerce_number(), Some(12.5));
        assert_eq!(Value::from("").coerce_number(), Some(0.0));
        assert_eq!(Value::from("abc").coerce_number(), None);
        assert_eq!(Value::Vec2(Vec2::default()).coerce_number(), None);
    }

    #[test]
    fn test_bool_coercion() {
        assert!(Value::from("TRUE").coerce_bool());
        assert!(!Value::from("yes").coerce_bool());
        assert!(Value::Int(3).coerce_bool());
        assert!(!Value::Float(0.0).coerce_bool());
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Bool(true).loose_eq(&Value::from("true")));
        assert!(Value::from("false").loose_eq(&Value::Bool(false)));
        assert!(!Value::Bool(true).loose_eq(&Value::from("false")));
        assert!(Value::Int(5).loose_eq(&Value::from("5")));
        assert!(Value::Int(5).loose_eq(&Value::Float(5.0)));
        assert!(Value::Bool(true).loose_eq(&Value::Int(1)));
        assert!(!Value::Null.loose_eq(&Value::Int(0)));
        assert!(!Value::from("abc").loose_eq(&Value::Int(0)));
        assert!(Value::Null.loose_eq(&Value::Null));
    }

    #[test]
    fn test_params_macro() {
        let p = params! { "x" => 1.5, "name" => "hero", "flag" => true };
        assert_eq!(p.len(), 3);
        assert_eq!(p.get("name").and_then(|v| v.as_str()), Some("hero"));
    }

    #[test]
    fn test_param_lookups() {
        let p = params! { "speed" => "150", "target" => "  ", "on" => "true", "none" => Value::Null };
        assert_eq!(p.num("speed"), Some(150.0));
        assert_eq!(p.num("none"), None);
        assert_eq!(p.text("target"), None);
        assert_eq!(p.flag("on"), Some(true));
        assert_eq!(p.flag("missing"), None);
    }

    #[test]
    fn test_vec2_math() {
        let a = Vec2::new(3.0, 4.0);
        assert_eq!(a.length(), 5.0);
        assert_eq!(a.distance_squared(Vec2::new(0.0, 0.0)), 25.0);
        assert_eq!(a * 2.0, Vec2::new(6.0, 8.0));
    }
}
