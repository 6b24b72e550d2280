// Runtime value model for configuration validation

use indexmap::IndexMap;
use std::fmt;
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A configuration value, as received from a config loader or produced by
/// validation.
///
/// Absence ("undefined") is not a `Value`; it is modeled as `Option<&Value>`
/// at every validation boundary and is distinct from `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// A plain key-value structure. Preserves insertion order.
    Object(IndexMap<String, Value>),
    /// An ordered key->value map with a dynamic key set, distinct from
    /// `Object`.
    Map(Vec<(String, Value)>),
    /// Raw bytes, never coerced from strings.
    Binary(Vec<u8>),
    Duration(Duration),
    /// A byte count, canonicalized from strings like `"1kb"`.
    ByteSize(u64),
    /// An open readable resource handle. Validation checks only the
    /// capability, not content.
    Stream(StreamHandle),
}

impl Value {
    /// Build an object value from key/value pairs, preserving order.
    pub fn object<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build an array value.
    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::Array(items.into_iter().collect())
    }

    /// Build an ordered map value from key/value pairs.
    pub fn map<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The type name used in error messages, e.g.
    /// `expected a plain object value, but found [Array] instead.`
    ///
    /// Primitive kinds are lowercase, container/domain kinds carry their
    /// constructor-style names.
    pub fn type_detect(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Map(_) => "Map",
            Value::Binary(_) => "Buffer",
            Value::Duration(_) => "Duration",
            Value::ByteSize(_) => "ByteSize",
            Value::Stream(_) => "Stream",
        }
    }

    /// Lossless conversion from a parsed JSON document, used by the object
    /// node's JSON-string coercion.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Render a number without a trailing `.0` for integral values, matching the
/// formatting used in error messages.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.type_detect()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Value {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Number(n as f64)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Value {
        Value::Number(n as f64)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Value {
        Value::Duration(d)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Value {
        Value::Binary(bytes)
    }
}

/// A shared handle to an open reader.
///
/// Equality is handle identity: two handles are equal only if they wrap the
/// same underlying resource.
#[derive(Clone)]
pub struct StreamHandle(Arc<Mutex<Box<dyn Read + Send>>>);

impl StreamHandle {
    pub fn new<R: Read + Send + 'static>(reader: R) -> StreamHandle {
        StreamHandle(Arc::new(Mutex::new(Box::new(reader))))
    }

    /// Lock the underlying reader for exclusive access.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn Read + Send>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamHandle")
    }
}

impl PartialEq for StreamHandle {
    fn eq(&self, other: &StreamHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
