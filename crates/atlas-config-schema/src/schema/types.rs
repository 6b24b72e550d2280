// Schema type nodes
//
// Every schema is a tree of `TypeNode` variants, built once and immutable
// afterwards. `extends` / `extends_deep` produce new trees instead of
// mutating in place, so a schema instance can be shared across threads and
// validated concurrently.

use crate::reference::{DefaultValue, Reference};
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Unknown-keys policy for object nodes.
///
/// `Ignore` propagates to nested objects that do not declare their own
/// policy; `Allow` and `Forbid` apply only to the declaring object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unknowns {
    Allow,
    Ignore,
    Forbid,
}

/// Optional annotations attached to any node, surfaced through `meta()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    pub id: Option<String>,
    pub description: Option<String>,
}

impl Meta {
    pub fn new() -> Meta {
        Meta::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Meta {
        self.id = Some(id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Meta {
        self.description = Some(description.into());
        self
    }
}

/// A schema node. One variant per kind; composite variants own their
/// children.
#[derive(Debug, Clone)]
pub enum TypeNode {
    Any(AnyType),
    Never(NeverType),
    Boolean(BooleanType),
    Number(NumberType),
    String(StringType),
    Literal(LiteralType),
    Duration(DurationType),
    ByteSize(ByteSizeType),
    Binary(BinaryType),
    Stream(StreamType),
    Ip(IpType),
    Uri(UriType),
    Array(ArrayType),
    Record(RecordType),
    Map(MapType),
    OneOf(OneOfType),
    Conditional(ConditionalType),
    Maybe(Box<TypeNode>),
    Nullable(Box<TypeNode>),
    Lazy(LazyType),
    Object(ObjectType),
}

impl TypeNode {
    /// The node's annotations, when the kind carries them.
    pub fn meta(&self) -> Option<&Meta> {
        match self {
            TypeNode::Any(t) => Some(&t.meta),
            TypeNode::Never(t) => Some(&t.meta),
            TypeNode::Boolean(t) => Some(&t.meta),
            TypeNode::Number(t) => Some(&t.meta),
            TypeNode::String(t) => Some(&t.meta),
            TypeNode::Literal(t) => Some(&t.meta),
            TypeNode::Duration(t) => Some(&t.meta),
            TypeNode::ByteSize(t) => Some(&t.meta),
            TypeNode::Binary(t) => Some(&t.meta),
            TypeNode::Stream(t) => Some(&t.meta),
            TypeNode::Ip(t) => Some(&t.meta),
            TypeNode::Uri(t) => Some(&t.meta),
            TypeNode::Array(t) => Some(&t.meta),
            TypeNode::Record(t) => Some(&t.meta),
            TypeNode::Map(t) => Some(&t.meta),
            TypeNode::OneOf(t) => Some(&t.meta),
            TypeNode::Conditional(t) => Some(&t.meta),
            TypeNode::Lazy(t) => Some(&t.meta),
            TypeNode::Object(t) => Some(&t.meta),
            TypeNode::Maybe(inner) | TypeNode::Nullable(inner) => inner.meta(),
        }
    }

    /// The node's default, when the kind carries one. Wrapper kinds defer
    /// to their inner node.
    pub fn default_value(&self) -> Option<&DefaultValue> {
        match self {
            TypeNode::Any(t) => t.default.as_ref(),
            TypeNode::Boolean(t) => t.default.as_ref(),
            TypeNode::Number(t) => t.default.as_ref(),
            TypeNode::String(t) => t.default.as_ref(),
            TypeNode::Literal(t) => t.default.as_ref(),
            TypeNode::Duration(t) => t.default.as_ref(),
            TypeNode::ByteSize(t) => t.default.as_ref(),
            TypeNode::Binary(t) => t.default.as_ref(),
            TypeNode::Ip(t) => t.default.as_ref(),
            TypeNode::Uri(t) => t.default.as_ref(),
            TypeNode::Array(t) => t.default.as_ref(),
            TypeNode::Record(t) => t.default.as_ref(),
            TypeNode::Map(t) => t.default.as_ref(),
            TypeNode::OneOf(t) => t.default.as_ref(),
            TypeNode::Conditional(t) => t.default.as_ref(),
            TypeNode::Object(t) => t.default.as_ref(),
            TypeNode::Never(_) | TypeNode::Stream(_) | TypeNode::Lazy(_) => None,
            TypeNode::Maybe(inner) | TypeNode::Nullable(inner) => inner.default_value(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnyType {
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default)]
pub struct NeverType {
    pub meta: Meta,
}

#[derive(Debug, Clone)]
pub struct BooleanType {
    /// Accept `"true"` / `"false"` strings. On by default for config-file
    /// ergonomics; `strict()` turns it off.
    pub parse_strings: bool,
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

impl Default for BooleanType {
    fn default() -> BooleanType {
        BooleanType {
            parse_strings: true,
            default: None,
            meta: Meta::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NumberType {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default)]
pub struct StringType {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Pattern source text; compiled during validation so an invalid
    /// pattern surfaces as a validation-time error.
    pub pattern: Option<String>,
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

#[derive(Debug, Clone)]
pub struct LiteralType {
    pub value: Value,
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default)]
pub struct DurationType {
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default)]
pub struct ByteSizeType {
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default)]
pub struct BinaryType {
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default)]
pub struct StreamType {
    pub meta: Meta,
}

#[derive(Debug, Clone, Default)]
pub struct IpType {
    /// Also accept CIDR notation (`10.0.0.0/8`).
    pub allow_cidr: bool,
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default)]
pub struct UriType {
    /// When non-empty, the URI's scheme must be one of these.
    pub schemes: Vec<String>,
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

#[derive(Debug, Clone)]
pub struct ArrayType {
    pub item: Box<TypeNode>,
    pub min_size: Option<usize>,
    pub max_size: Option<usize>,
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

#[derive(Debug, Clone)]
pub struct RecordType {
    pub key: Box<TypeNode>,
    pub value: Box<TypeNode>,
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

#[derive(Debug, Clone)]
pub struct MapType {
    pub key: Box<TypeNode>,
    pub value: Box<TypeNode>,
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

#[derive(Debug, Clone)]
pub struct OneOfType {
    pub branches: Vec<TypeNode>,
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

/// The operand a conditional's test reference is compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Ref(Reference),
}

impl From<Value> for Operand {
    fn from(value: Value) -> Operand {
        Operand::Value(value)
    }
}

impl From<Reference> for Operand {
    fn from(reference: Reference) -> Operand {
        Operand::Ref(reference)
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Operand {
        Operand::Value(Value::from(s))
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Operand {
        Operand::Value(Value::from(b))
    }
}

#[derive(Debug, Clone)]
pub struct ConditionalType {
    pub test: Reference,
    pub operand: Operand,
    pub then_schema: Box<TypeNode>,
    pub else_schema: Box<TypeNode>,
    pub default: Option<DefaultValue>,
    pub meta: Meta,
}

/// Deferred schema construction, enabling self-referential schemas.
///
/// The factory runs on every expansion; expansion depth is bounded by the
/// validator so a self-referential schema cannot overflow the stack.
#[derive(Clone)]
pub struct LazyFactory(Arc<dyn Fn() -> TypeNode + Send + Sync>);

impl LazyFactory {
    pub fn new<F>(factory: F) -> LazyFactory
    where
        F: Fn() -> TypeNode + Send + Sync + 'static,
    {
        LazyFactory(Arc::new(factory))
    }

    pub fn expand(&self) -> TypeNode {
        (self.0)()
    }
}

impl fmt::Debug for LazyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LazyFactory")
    }
}

#[derive(Debug, Clone)]
pub struct LazyType {
    pub factory: LazyFactory,
    pub meta: Meta,
}

/// Post-validation hook, run on the fully assembled object value.
#[derive(Clone)]
pub struct Hook(Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>);

impl Hook {
    pub fn new<F>(hook: F) -> Hook
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Hook(Arc::new(hook))
    }

    pub fn call(&self, value: &Value) -> Result<(), String> {
        (self.0)(value)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectType {
    /// Declared properties, in declaration order. Order drives sibling
    /// reference resolution and introspection output.
    pub props: IndexMap<String, TypeNode>,
    /// This node's own unknown-keys policy. `None` means inherit (or the
    /// `Forbid` default at the root of inheritance).
    pub unknowns: Option<Unknowns>,
    pub default: Option<DefaultValue>,
    pub hook: Option<Hook>,
    pub meta: Meta,
}

macro_rules! node_from {
    ($($struct_name:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$struct_name> for TypeNode {
                fn from(node: $struct_name) -> TypeNode {
                    TypeNode::$variant(node)
                }
            }
        )*
    };
}

node_from! {
    AnyType => Any,
    NeverType => Never,
    BooleanType => Boolean,
    NumberType => Number,
    StringType => String,
    LiteralType => Literal,
    DurationType => Duration,
    ByteSizeType => ByteSize,
    BinaryType => Binary,
    StreamType => Stream,
    IpType => Ip,
    UriType => Uri,
    ArrayType => Array,
    RecordType => Record,
    MapType => Map,
    OneOfType => OneOf,
    ConditionalType => Conditional,
    LazyType => Lazy,
    ObjectType => Object,
}
