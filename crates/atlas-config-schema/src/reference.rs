// References and default values, resolved at validation time

use crate::error::{KeyPath, ValidationError, ValidationErrorKind, ValidationResult};
use crate::value::Value;
use indexmap::IndexMap;

/// A deferred value provider, resolved against the in-progress sibling frame
/// or the externally supplied context bag.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    /// Another key in the same object. Keys are validated in declaration
    /// order, so only keys declared earlier can be referenced.
    Sibling(String),
    /// An entry in the context bag passed to `validate_with`.
    Context(String),
}

impl Reference {
    /// Resolve this reference. `siblings` is the partially validated object
    /// for the current frame, absent outside of object validation.
    pub fn resolve(
        &self,
        siblings: Option<&IndexMap<String, Value>>,
        context: &ContextBag,
        path: &KeyPath,
    ) -> ValidationResult<Value> {
        match self {
            Reference::Sibling(name) => siblings
                .and_then(|frame| frame.get(name))
                .cloned()
                .ok_or_else(|| {
                    ValidationError::new(
                        ValidationErrorKind::SiblingRefUnresolved { name: name.clone() },
                        path.clone(),
                    )
                }),
            Reference::Context(name) => context.get(name).cloned().ok_or_else(|| {
                ValidationError::new(
                    ValidationErrorKind::ContextRefMissing { name: name.clone() },
                    path.clone(),
                )
            }),
        }
    }
}

/// A default for an absent value: either a literal or a reference.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Literal(Value),
    Ref(Reference),
}

impl DefaultValue {
    pub fn resolve(
        &self,
        siblings: Option<&IndexMap<String, Value>>,
        context: &ContextBag,
        path: &KeyPath,
    ) -> ValidationResult<Value> {
        match self {
            DefaultValue::Literal(value) => Ok(value.clone()),
            DefaultValue::Ref(reference) => reference.resolve(siblings, context, path),
        }
    }
}

impl From<Reference> for DefaultValue {
    fn from(reference: Reference) -> DefaultValue {
        DefaultValue::Ref(reference)
    }
}

impl From<Value> for DefaultValue {
    fn from(value: Value) -> DefaultValue {
        DefaultValue::Literal(value)
    }
}

impl From<&str> for DefaultValue {
    fn from(s: &str) -> DefaultValue {
        DefaultValue::Literal(Value::from(s))
    }
}

impl From<String> for DefaultValue {
    fn from(s: String) -> DefaultValue {
        DefaultValue::Literal(Value::from(s))
    }
}

impl From<bool> for DefaultValue {
    fn from(b: bool) -> DefaultValue {
        DefaultValue::Literal(Value::from(b))
    }
}

impl From<f64> for DefaultValue {
    fn from(n: f64) -> DefaultValue {
        DefaultValue::Literal(Value::from(n))
    }
}

impl From<i32> for DefaultValue {
    fn from(n: i32) -> DefaultValue {
        DefaultValue::Literal(Value::from(n))
    }
}

/// External values made available to context references during a single
/// `validate_with` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBag {
    entries: IndexMap<String, Value>,
}

impl ContextBag {
    pub fn new() -> ContextBag {
        ContextBag::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Builder-style insert for inline construction in tests and call sites.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> ContextBag {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
