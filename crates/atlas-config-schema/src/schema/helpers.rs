// Builder helpers for constructing schema trees
//
// Mirrors the shape schemas take at call sites:
//
// ```
// use atlas_config_schema::schema::{self, TypeNode};
//
// let s = schema::object([
//     ("name", TypeNode::from(schema::string().min_length(1))),
//     ("port", TypeNode::from(schema::number().min(0.0).default_value(5601))),
// ]);
// ```

use crate::reference::{DefaultValue, Reference};
use crate::schema::types::{
    AnyType, ArrayType, BinaryType, BooleanType, ByteSizeType, ConditionalType, DurationType,
    Hook, IpType, LazyFactory, LazyType, LiteralType, MapType, Meta, NeverType, NumberType,
    ObjectType, OneOfType, Operand, RecordType, StreamType, StringType, TypeNode, Unknowns,
    UriType,
};
use crate::value::Value;

pub fn any() -> AnyType {
    AnyType::default()
}

pub fn never() -> NeverType {
    NeverType::default()
}

pub fn boolean() -> BooleanType {
    BooleanType::default()
}

pub fn number() -> NumberType {
    NumberType::default()
}

pub fn string() -> StringType {
    StringType::default()
}

pub fn literal(value: impl Into<Value>) -> LiteralType {
    LiteralType {
        value: value.into(),
        default: None,
        meta: Meta::new(),
    }
}

pub fn duration() -> DurationType {
    DurationType::default()
}

pub fn byte_size() -> ByteSizeType {
    ByteSizeType::default()
}

pub fn binary() -> BinaryType {
    BinaryType::default()
}

pub fn stream() -> StreamType {
    StreamType::default()
}

pub fn ip() -> IpType {
    IpType::default()
}

pub fn uri() -> UriType {
    UriType::default()
}

pub fn array_of(item: impl Into<TypeNode>) -> ArrayType {
    ArrayType {
        item: Box::new(item.into()),
        min_size: None,
        max_size: None,
        default: None,
        meta: Meta::new(),
    }
}

pub fn record_of(key: impl Into<TypeNode>, value: impl Into<TypeNode>) -> RecordType {
    RecordType {
        key: Box::new(key.into()),
        value: Box::new(value.into()),
        default: None,
        meta: Meta::new(),
    }
}

pub fn map_of(key: impl Into<TypeNode>, value: impl Into<TypeNode>) -> MapType {
    MapType {
        key: Box::new(key.into()),
        value: Box::new(value.into()),
        default: None,
        meta: Meta::new(),
    }
}

pub fn one_of<N, I>(branches: I) -> OneOfType
where
    N: Into<TypeNode>,
    I: IntoIterator<Item = N>,
{
    OneOfType {
        branches: branches.into_iter().map(Into::into).collect(),
        default: None,
        meta: Meta::new(),
    }
}

pub fn conditional(
    test: Reference,
    operand: impl Into<Operand>,
    then_schema: impl Into<TypeNode>,
    else_schema: impl Into<TypeNode>,
) -> ConditionalType {
    ConditionalType {
        test,
        operand: operand.into(),
        then_schema: Box::new(then_schema.into()),
        else_schema: Box::new(else_schema.into()),
        default: None,
        meta: Meta::new(),
    }
}

pub fn maybe(inner: impl Into<TypeNode>) -> TypeNode {
    TypeNode::Maybe(Box::new(inner.into()))
}

pub fn nullable(inner: impl Into<TypeNode>) -> TypeNode {
    TypeNode::Nullable(Box::new(inner.into()))
}

pub fn lazy<F>(factory: F) -> LazyType
where
    F: Fn() -> TypeNode + Send + Sync + 'static,
{
    LazyType {
        factory: LazyFactory::new(factory),
        meta: Meta::new(),
    }
}

pub fn object<K, N, I>(props: I) -> ObjectType
where
    K: Into<String>,
    N: Into<TypeNode>,
    I: IntoIterator<Item = (K, N)>,
{
    ObjectType {
        props: props
            .into_iter()
            .map(|(key, node)| (key.into(), node.into()))
            .collect(),
        unknowns: None,
        default: None,
        hook: None,
        meta: Meta::new(),
    }
}

pub fn sibling_ref(name: impl Into<String>) -> Reference {
    Reference::Sibling(name.into())
}

pub fn context_ref(name: impl Into<String>) -> Reference {
    Reference::Context(name.into())
}

macro_rules! common_builders {
    ($($struct_name:ident),* $(,)?) => {
        $(
            impl $struct_name {
                pub fn default_value(mut self, default: impl Into<DefaultValue>) -> Self {
                    self.default = Some(default.into());
                    self
                }

                pub fn with_meta(mut self, meta: Meta) -> Self {
                    self.meta = meta;
                    self
                }
            }
        )*
    };
}

common_builders!(
    AnyType,
    BooleanType,
    NumberType,
    StringType,
    LiteralType,
    DurationType,
    ByteSizeType,
    BinaryType,
    IpType,
    UriType,
    ArrayType,
    RecordType,
    MapType,
    OneOfType,
    ConditionalType,
    ObjectType,
);

impl StringType {
    pub fn min_length(mut self, min: usize) -> StringType {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> StringType {
        self.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> StringType {
        self.pattern = Some(pattern.into());
        self
    }
}

impl NumberType {
    pub fn min(mut self, min: f64) -> NumberType {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> NumberType {
        self.max = Some(max);
        self
    }
}

impl BooleanType {
    /// Disable `"true"` / `"false"` string coercion.
    pub fn strict(mut self) -> BooleanType {
        self.parse_strings = false;
        self
    }
}

impl IpType {
    pub fn allow_cidr(mut self) -> IpType {
        self.allow_cidr = true;
        self
    }
}

impl UriType {
    pub fn schemes<S, I>(mut self, schemes: I) -> UriType
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.schemes = schemes.into_iter().map(Into::into).collect();
        self
    }
}

impl ArrayType {
    pub fn min_size(mut self, min: usize) -> ArrayType {
        self.min_size = Some(min);
        self
    }

    pub fn max_size(mut self, max: usize) -> ArrayType {
        self.max_size = Some(max);
        self
    }
}

impl NeverType {
    pub fn with_meta(mut self, meta: Meta) -> NeverType {
        self.meta = meta;
        self
    }
}

impl StreamType {
    pub fn with_meta(mut self, meta: Meta) -> StreamType {
        self.meta = meta;
        self
    }
}

impl LazyType {
    pub fn with_meta(mut self, meta: Meta) -> LazyType {
        self.meta = meta;
        self
    }
}

impl ObjectType {
    pub fn unknowns(mut self, policy: Unknowns) -> ObjectType {
        self.unknowns = Some(policy);
        self
    }

    /// Attach a post-validation hook, run on the fully assembled object.
    pub fn on_validate<F>(mut self, hook: F) -> ObjectType
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.hook = Some(Hook::new(hook));
        self
    }
}
