// Error types for configuration schema validation

use crate::value::format_number;
use std::fmt;
use thiserror::Error;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Structured validation error kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    /// Input string is not valid JSON
    JsonParse,

    /// Input parsed (or arrived) as something other than a plain object
    NotPlainObject { found: String },

    /// Value present but of the wrong kind, or absent with no default
    TypeMismatch {
        expected: &'static str,
        got: String,
    },

    /// Value does not equal the expected literal
    LiteralMismatch { expected: String },

    /// Key present in input but not declared in the schema
    UnknownKey,

    /// `validate_key` was called with a key the schema does not declare
    KeyNotInSchema { key: String },

    /// All `one_of` branches failed; carries one failure per branch
    UnionExhausted { failures: Vec<ValidationError> },

    /// Sibling reference does not point to a previously validated key
    SiblingRefUnresolved { name: String },

    /// Context reference names an entry missing from the context bag
    ContextRefMissing { name: String },

    /// The object's post-validation hook rejected the assembled value
    HookFailed { message: String },

    /// `never` schema: a value was present
    NeverType,

    StringTooShort { length: usize, min: usize },
    StringTooLong { length: usize, max: usize },
    PatternMismatch { value: String, pattern: String },

    /// The schema's own pattern failed to compile; a schema definition
    /// error, not a problem with the input value
    InvalidPattern { pattern: String, message: String },

    NumberBelowMinimum { min: f64 },
    NumberAboveMaximum { max: f64 },

    ArrayTooSmall { size: usize, min: usize },
    ArrayTooLarge { size: usize, max: usize },

    DurationParse { value: String },
    ByteSizeParse { value: String },
    InvalidIp { value: String },
    InvalidUri { value: String },

    /// Lazy schema expansion exceeded the depth limit
    SchemaTooDeep { limit: usize },
}

impl ValidationErrorKind {
    /// Format a human-readable message from this error kind
    pub fn message(&self) -> String {
        match self {
            ValidationErrorKind::JsonParse => {
                "could not parse object value from json input".to_string()
            }
            ValidationErrorKind::NotPlainObject { found } => {
                format!("expected a plain object value, but found [{}] instead.", found)
            }
            ValidationErrorKind::TypeMismatch { expected, got } => {
                format!("expected value of type [{}] but got [{}]", expected, got)
            }
            ValidationErrorKind::LiteralMismatch { expected } => {
                format!("expected value to equal [{}]", expected)
            }
            ValidationErrorKind::UnknownKey => "definition for this key is missing".to_string(),
            ValidationErrorKind::KeyNotInSchema { key } => {
                format!("{} is not a valid part of this schema", key)
            }
            ValidationErrorKind::UnionExhausted { failures } => {
                let mut message = String::from("types that failed validation:");
                for failure in failures {
                    message.push_str(&format!("\n- {}", failure));
                }
                message
            }
            ValidationErrorKind::SiblingRefUnresolved { name } => {
                format!(
                    "sibling reference [{}] does not point to a previously validated key",
                    name
                )
            }
            ValidationErrorKind::ContextRefMissing { name } => {
                format!(
                    "context reference [{}] is not present in the validation context",
                    name
                )
            }
            ValidationErrorKind::HookFailed { message } => message.clone(),
            ValidationErrorKind::NeverType => "a value wasn't expected to be present".to_string(),
            ValidationErrorKind::StringTooShort { length, min } => {
                format!(
                    "value has length [{}] but it must have a minimum length of [{}].",
                    length, min
                )
            }
            ValidationErrorKind::StringTooLong { length, max } => {
                format!(
                    "value has length [{}] but it must have a maximum length of [{}].",
                    length, max
                )
            }
            ValidationErrorKind::PatternMismatch { value, pattern } => {
                format!("value [{}] does not match regular expression [{}]", value, pattern)
            }
            ValidationErrorKind::InvalidPattern { pattern, message } => {
                format!("invalid regular expression [{}]: {}", pattern, message)
            }
            ValidationErrorKind::NumberBelowMinimum { min } => {
                format!("Value must be equal to or greater than [{}].", format_number(*min))
            }
            ValidationErrorKind::NumberAboveMaximum { max } => {
                format!("Value must be equal to or lower than [{}].", format_number(*max))
            }
            ValidationErrorKind::ArrayTooSmall { size, min } => {
                format!("array size is [{}], but cannot be smaller than [{}]", size, min)
            }
            ValidationErrorKind::ArrayTooLarge { size, max } => {
                format!("array size is [{}], but cannot be greater than [{}]", size, max)
            }
            ValidationErrorKind::DurationParse { value } => {
                format!("failed to parse [{}] as duration string", value)
            }
            ValidationErrorKind::ByteSizeParse { value } => {
                format!("failed to parse [{}] as byte size string", value)
            }
            ValidationErrorKind::InvalidIp { value } => {
                format!("value [{}] must be a valid IPv4 or IPv6 address", value)
            }
            ValidationErrorKind::InvalidUri { value } => {
                format!("value [{}] must be a valid URI", value)
            }
            ValidationErrorKind::SchemaTooDeep { limit } => {
                format!("schema nesting too deep: exceeded [{}] levels of lazy expansion", limit)
            }
        }
    }
}

/// Validation error with the dotted path where it occurred
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ValidationError {
    /// The structured error kind
    pub kind: ValidationErrorKind,
    /// Namespace plus nested property path, e.g. `foo.bar.0`
    pub path: KeyPath,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, path: KeyPath) -> ValidationError {
        ValidationError { kind, path }
    }

    /// Get the human-readable message for this error, without the path prefix
    pub fn message(&self) -> String {
        self.kind.message()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.kind.message())
        } else {
            write!(f, "[{}]: {}", self.path, self.kind.message())
        }
    }
}

/// Dotted key path (namespace + property path), e.g. `foo.bar.0`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    pub fn new() -> KeyPath {
        KeyPath {
            segments: Vec::new(),
        }
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
