// Configuration validation engine

use crate::error::{KeyPath, ValidationError, ValidationErrorKind, ValidationResult};
use crate::reference::ContextBag;
use crate::schema::types::{
    ArrayType, BooleanType, ConditionalType, IpType, LiteralType, MapType, NumberType,
    ObjectType, OneOfType, Operand, RecordType, StringType, TypeNode, Unknowns, UriType,
};
use crate::value::{Value, format_number};
use indexmap::IndexMap;
use regex::Regex;
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

/// Bound on `lazy` expansion depth within a single validation call.
/// Self-referential schemas fail with a dedicated error instead of
/// overflowing the stack.
const MAX_LAZY_DEPTH: usize = 128;

/// Per-call validation options
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    /// Drop unknown keys from the output everywhere in the tree,
    /// overriding the schema's own unknown-keys policies for this call.
    pub strip_unknown_keys: bool,
}

impl TypeNode {
    /// Validate a value with an empty context, no namespace and default
    /// options. `None` models absent input.
    pub fn validate(&self, value: Option<&Value>) -> ValidationResult<Value> {
        self.validate_with(value, &ContextBag::new(), None, &ValidateOptions::default())
    }

    /// Validate a value. `context` feeds context references, `namespace`
    /// prefixes error paths.
    pub fn validate_with(
        &self,
        value: Option<&Value>,
        context: &ContextBag,
        namespace: Option<&str>,
        options: &ValidateOptions,
    ) -> ValidationResult<Value> {
        let mut ctx = ValidationContext::new(context, namespace, options);
        let validated = validate_node(self, value, None, &mut ctx)?;
        Ok(validated.unwrap_or(Value::Null))
    }
}

impl ObjectType {
    /// Validate a value with an empty context, no namespace and default
    /// options.
    pub fn validate(&self, value: Option<&Value>) -> ValidationResult<Value> {
        self.validate_with(value, &ContextBag::new(), None, &ValidateOptions::default())
    }

    /// Validate a value against this object schema.
    pub fn validate_with(
        &self,
        value: Option<&Value>,
        context: &ContextBag,
        namespace: Option<&str>,
        options: &ValidateOptions,
    ) -> ValidationResult<Value> {
        let mut ctx = ValidationContext::new(context, namespace, options);
        let validated = validate_object(self, value, None, &mut ctx)?;
        Ok(validated.unwrap_or(Value::Null))
    }

    /// Validate a single named key's value against only that key's child
    /// schema, bypassing whole-object validation.
    pub fn validate_key(&self, key: &str, value: Option<&Value>) -> ValidationResult<Value> {
        let node = self.props.get(key).ok_or_else(|| {
            ValidationError::new(
                ValidationErrorKind::KeyNotInSchema {
                    key: key.to_string(),
                },
                KeyPath::new(),
            )
        })?;
        let context = ContextBag::new();
        let mut ctx = ValidationContext::new(&context, None, &ValidateOptions::default());
        let validated = validate_node(node, value, None, &mut ctx)?;
        Ok(validated.unwrap_or(Value::Null))
    }
}

/// Validation context tracks state during a single validation call
struct ValidationContext<'a> {
    /// External values for context references
    context: &'a ContextBag,
    /// Current error path (namespace + property path)
    path: KeyPath,
    /// Drop unknown keys everywhere for this call
    strip_unknown_keys: bool,
    /// Unknown-keys policy inherited from an ancestor object; only
    /// `Ignore` ever propagates here
    inherited_unknowns: Option<Unknowns>,
    /// Current `lazy` expansion depth
    lazy_depth: usize,
}

impl<'a> ValidationContext<'a> {
    fn new(
        context: &'a ContextBag,
        namespace: Option<&str>,
        options: &ValidateOptions,
    ) -> ValidationContext<'a> {
        let mut path = KeyPath::new();
        if let Some(namespace) = namespace {
            path.push(namespace);
        }
        ValidationContext {
            context,
            path,
            strip_unknown_keys: options.strip_unknown_keys,
            inherited_unknowns: None,
            lazy_depth: 0,
        }
    }

    /// Build an error at the current path
    fn error(&self, kind: ValidationErrorKind) -> ValidationError {
        ValidationError::new(kind, self.path.clone())
    }

    /// Build an error at the current path extended by one segment
    fn error_at(&self, segment: &str, kind: ValidationErrorKind) -> ValidationError {
        let mut path = self.path.clone();
        path.push(segment);
        ValidationError::new(kind, path)
    }

    /// Execute a function with a new path segment; the segment is popped
    /// on both success and failure
    fn with_segment<T, F>(&mut self, segment: impl Into<String>, f: F) -> ValidationResult<T>
    where
        F: FnOnce(&mut Self) -> ValidationResult<T>,
    {
        self.path.push(segment);
        let result = f(self);
        self.path.pop();
        result
    }
}

/// Main validation dispatcher
///
/// `Ok(None)` means "absent": the owning object omits the key. Only
/// `maybe`, `never` and un-defaulted `any` produce it.
fn validate_node(
    node: &TypeNode,
    value: Option<&Value>,
    siblings: Option<&IndexMap<String, Value>>,
    ctx: &mut ValidationContext,
) -> ValidationResult<Option<Value>> {
    match node {
        TypeNode::Maybe(inner) => match value {
            None => Ok(None),
            Some(_) => validate_node(inner, value, siblings, ctx),
        },
        TypeNode::Nullable(inner) => match value {
            None | Some(Value::Null) => Ok(Some(Value::Null)),
            Some(_) => validate_node(inner, value, siblings, ctx),
        },
        TypeNode::Never(_) => match value {
            None => Ok(None),
            Some(_) => Err(ctx.error(ValidationErrorKind::NeverType)),
        },
        TypeNode::Lazy(lazy) => {
            if ctx.lazy_depth >= MAX_LAZY_DEPTH {
                return Err(ctx.error(ValidationErrorKind::SchemaTooDeep {
                    limit: MAX_LAZY_DEPTH,
                }));
            }
            ctx.lazy_depth += 1;
            let expanded = lazy.factory.expand();
            let result = validate_node(&expanded, value, siblings, ctx);
            ctx.lazy_depth -= 1;
            result
        }
        TypeNode::Object(object) => validate_object(object, value, siblings, ctx),
        other => {
            if value.is_none() {
                if let Some(default) = other.default_value() {
                    return default.resolve(siblings, ctx.context, &ctx.path).map(Some);
                }
                match other {
                    TypeNode::Any(_) => return Ok(None),
                    // branches decide what absence means
                    TypeNode::OneOf(_) | TypeNode::Conditional(_) => {}
                    TypeNode::Literal(literal) => {
                        return Err(ctx.error(ValidationErrorKind::LiteralMismatch {
                            expected: literal.value.to_string(),
                        }));
                    }
                    _ => {
                        return Err(ctx.error(ValidationErrorKind::TypeMismatch {
                            expected: expected_kind(other),
                            got: "undefined".to_string(),
                        }));
                    }
                }
            }
            match other {
                TypeNode::OneOf(one_of) => {
                    return validate_one_of(one_of, value, siblings, ctx);
                }
                TypeNode::Conditional(conditional) => {
                    return validate_conditional(conditional, value, siblings, ctx);
                }
                _ => {}
            }
            let Some(value) = value else {
                // every absent case is handled above
                return Ok(None);
            };
            match other {
                TypeNode::Any(_) => Ok(Some(value.clone())),
                TypeNode::Boolean(t) => validate_boolean(t, value, ctx).map(Some),
                TypeNode::Number(t) => validate_number(t, value, ctx).map(Some),
                TypeNode::String(t) => validate_string(t, value, ctx).map(Some),
                TypeNode::Literal(t) => validate_literal(t, value, ctx).map(Some),
                TypeNode::Duration(_) => validate_duration(value, ctx).map(Some),
                TypeNode::ByteSize(_) => validate_byte_size(value, ctx).map(Some),
                TypeNode::Binary(_) => match value {
                    Value::Binary(_) => Ok(Some(value.clone())),
                    v => Err(ctx.error(type_mismatch("binary", v))),
                },
                TypeNode::Stream(_) => match value {
                    Value::Stream(_) => Ok(Some(value.clone())),
                    v => Err(ctx.error(type_mismatch("stream", v))),
                },
                TypeNode::Ip(t) => validate_ip(t, value, ctx).map(Some),
                TypeNode::Uri(t) => validate_uri(t, value, ctx).map(Some),
                TypeNode::Array(t) => validate_array(t, value, ctx).map(Some),
                TypeNode::Record(t) => validate_record(t, value, ctx).map(Some),
                TypeNode::Map(t) => validate_map(t, value, ctx).map(Some),
                // handled in the outer match
                TypeNode::OneOf(_)
                | TypeNode::Conditional(_)
                | TypeNode::Maybe(_)
                | TypeNode::Nullable(_)
                | TypeNode::Never(_)
                | TypeNode::Lazy(_)
                | TypeNode::Object(_) => Ok(None),
            }
        }
    }
}

/// The kind name used in `expected value of type [X]` messages
fn expected_kind(node: &TypeNode) -> &'static str {
    match node {
        TypeNode::Boolean(_) => "boolean",
        TypeNode::Number(_) => "number",
        TypeNode::String(_) | TypeNode::Ip(_) | TypeNode::Uri(_) => "string",
        TypeNode::Duration(_) => "duration",
        TypeNode::ByteSize(_) => "byte size",
        TypeNode::Binary(_) => "binary",
        TypeNode::Stream(_) => "stream",
        TypeNode::Array(_) => "array",
        TypeNode::Record(_) => "record",
        TypeNode::Map(_) => "map",
        _ => "value",
    }
}

fn type_mismatch(expected: &'static str, got: &Value) -> ValidationErrorKind {
    ValidationErrorKind::TypeMismatch {
        expected,
        got: got.type_detect().to_string(),
    }
}

/// Validate a boolean value
fn validate_boolean(
    t: &BooleanType,
    value: &Value,
    ctx: &ValidationContext,
) -> ValidationResult<Value> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) if t.parse_strings && s == "true" => Ok(Value::Bool(true)),
        Value::String(s) if t.parse_strings && s == "false" => Ok(Value::Bool(false)),
        v => Err(ctx.error(type_mismatch("boolean", v))),
    }
}

/// Validate a number value
fn validate_number(
    t: &NumberType,
    value: &Value,
    ctx: &ValidationContext,
) -> ValidationResult<Value> {
    let n = match value {
        Value::Number(n) if n.is_finite() => *n,
        v => return Err(ctx.error(type_mismatch("number", v))),
    };
    if let Some(min) = t.min {
        if n < min {
            return Err(ctx.error(ValidationErrorKind::NumberBelowMinimum { min }));
        }
    }
    if let Some(max) = t.max {
        if n > max {
            return Err(ctx.error(ValidationErrorKind::NumberAboveMaximum { max }));
        }
    }
    Ok(Value::Number(n))
}

/// Validate a string value
fn validate_string(
    t: &StringType,
    value: &Value,
    ctx: &ValidationContext,
) -> ValidationResult<Value> {
    let s = match value {
        Value::String(s) => s,
        v => return Err(ctx.error(type_mismatch("string", v))),
    };
    // lengths count characters, not bytes
    let length = s.chars().count();
    if let Some(min) = t.min_length {
        if length < min {
            return Err(ctx.error(ValidationErrorKind::StringTooShort { length, min }));
        }
    }
    if let Some(max) = t.max_length {
        if length > max {
            return Err(ctx.error(ValidationErrorKind::StringTooLong { length, max }));
        }
    }
    if let Some(pattern) = &t.pattern {
        let regex = Regex::new(pattern).map_err(|e| {
            ctx.error(ValidationErrorKind::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })
        })?;
        if !regex.is_match(s) {
            return Err(ctx.error(ValidationErrorKind::PatternMismatch {
                value: s.clone(),
                pattern: pattern.clone(),
            }));
        }
    }
    Ok(value.clone())
}

/// Validate a literal value (strict structural equality, `null` included)
fn validate_literal(
    t: &LiteralType,
    value: &Value,
    ctx: &ValidationContext,
) -> ValidationResult<Value> {
    if *value == t.value {
        Ok(value.clone())
    } else {
        Err(ctx.error(ValidationErrorKind::LiteralMismatch {
            expected: t.value.to_string(),
        }))
    }
}

/// Validate a duration value: a `Duration`, a millisecond count, or a
/// string with a unit suffix (`70ms`, `5s`, `3m`, `2h`, `1d`)
fn validate_duration(value: &Value, ctx: &ValidationContext) -> ValidationResult<Value> {
    match value {
        Value::Duration(_) => Ok(value.clone()),
        Value::Number(n) if n.is_finite() && *n >= 0.0 => {
            // checked conversion: a huge-but-finite millisecond count is a
            // validation failure, not a panic
            Duration::try_from_secs_f64(n / 1000.0)
                .map(Value::Duration)
                .map_err(|_| {
                    ctx.error(ValidationErrorKind::DurationParse {
                        value: format_number(*n),
                    })
                })
        }
        Value::Number(n) => Err(ctx.error(ValidationErrorKind::DurationParse {
            value: format_number(*n),
        })),
        Value::String(s) => parse_duration(s).map(Value::Duration).ok_or_else(|| {
            ctx.error(ValidationErrorKind::DurationParse { value: s.clone() })
        }),
        v => Err(ctx.error(type_mismatch("duration", v))),
    }
}

fn parse_duration(s: &str) -> Option<Duration> {
    // "ms" before "m" and "s"
    let (digits, millis_per_unit) = if let Some(digits) = s.strip_suffix("ms") {
        (digits, 1u64)
    } else if let Some(digits) = s.strip_suffix('s') {
        (digits, 1_000)
    } else if let Some(digits) = s.strip_suffix('m') {
        (digits, 60_000)
    } else if let Some(digits) = s.strip_suffix('h') {
        (digits, 3_600_000)
    } else if let Some(digits) = s.strip_suffix('d') {
        (digits, 86_400_000)
    } else {
        return None;
    };
    let count: u64 = digits.parse().ok()?;
    Some(Duration::from_millis(count.checked_mul(millis_per_unit)?))
}

/// Validate a byte-size value: a `ByteSize`, a byte count, or a string
/// with a unit suffix (`512b`, `1kb`, `2mb`, `1gb`, powers of 1024)
fn validate_byte_size(value: &Value, ctx: &ValidationContext) -> ValidationResult<Value> {
    match value {
        Value::ByteSize(_) => Ok(value.clone()),
        Value::Number(n)
            if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n < u64::MAX as f64 =>
        {
            Ok(Value::ByteSize(*n as u64))
        }
        Value::Number(n) => Err(ctx.error(ValidationErrorKind::ByteSizeParse {
            value: format_number(*n),
        })),
        Value::String(s) => parse_byte_size(s).map(Value::ByteSize).ok_or_else(|| {
            ctx.error(ValidationErrorKind::ByteSizeParse { value: s.clone() })
        }),
        v => Err(ctx.error(type_mismatch("byte size", v))),
    }
}

fn parse_byte_size(s: &str) -> Option<u64> {
    let lower = s.to_ascii_lowercase();
    let (digits, multiplier) = if let Some(digits) = lower.strip_suffix("kb") {
        (digits, 1024u64)
    } else if let Some(digits) = lower.strip_suffix("mb") {
        (digits, 1024 * 1024)
    } else if let Some(digits) = lower.strip_suffix("gb") {
        (digits, 1024 * 1024 * 1024)
    } else if let Some(digits) = lower.strip_suffix('b') {
        (digits, 1)
    } else {
        return None;
    };
    let count: u64 = digits.parse().ok()?;
    count.checked_mul(multiplier)
}

/// Validate an IP address string (IPv4 or IPv6, optionally CIDR)
fn validate_ip(t: &IpType, value: &Value, ctx: &ValidationContext) -> ValidationResult<Value> {
    let s = match value {
        Value::String(s) => s,
        v => return Err(ctx.error(type_mismatch("string", v))),
    };
    if is_valid_ip(s, t.allow_cidr) {
        Ok(value.clone())
    } else {
        Err(ctx.error(ValidationErrorKind::InvalidIp { value: s.clone() }))
    }
}

fn is_valid_ip(s: &str, allow_cidr: bool) -> bool {
    if s.parse::<IpAddr>().is_ok() {
        return true;
    }
    if allow_cidr {
        if let Some((addr, prefix)) = s.split_once('/') {
            if let (Ok(ip), Ok(bits)) = (addr.parse::<IpAddr>(), prefix.parse::<u8>()) {
                return match ip {
                    IpAddr::V4(_) => bits <= 32,
                    IpAddr::V6(_) => bits <= 128,
                };
            }
        }
    }
    false
}

/// Validate a URI string
fn validate_uri(t: &UriType, value: &Value, ctx: &ValidationContext) -> ValidationResult<Value> {
    let s = match value {
        Value::String(s) => s,
        v => return Err(ctx.error(type_mismatch("string", v))),
    };
    let parsed = Url::parse(s)
        .map_err(|_| ctx.error(ValidationErrorKind::InvalidUri { value: s.clone() }))?;
    if !t.schemes.is_empty() && !t.schemes.iter().any(|scheme| scheme == parsed.scheme()) {
        return Err(ctx.error(ValidationErrorKind::InvalidUri { value: s.clone() }));
    }
    Ok(value.clone())
}

/// Validate an array value
fn validate_array(
    t: &ArrayType,
    value: &Value,
    ctx: &mut ValidationContext,
) -> ValidationResult<Value> {
    let items = match value {
        Value::Array(items) => items,
        v => return Err(ctx.error(type_mismatch("array", v))),
    };
    if let Some(min) = t.min_size {
        if items.len() < min {
            return Err(ctx.error(ValidationErrorKind::ArrayTooSmall {
                size: items.len(),
                min,
            }));
        }
    }
    if let Some(max) = t.max_size {
        if items.len() > max {
            return Err(ctx.error(ValidationErrorKind::ArrayTooLarge {
                size: items.len(),
                max,
            }));
        }
    }
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let validated = ctx.with_segment(index.to_string(), |ctx| {
            validate_node(&t.item, Some(item), None, ctx)
        })?;
        if let Some(v) = validated {
            out.push(v);
        }
    }
    Ok(Value::Array(out))
}

/// Validate a record value (string-keyed, dynamic key set)
fn validate_record(
    t: &RecordType,
    value: &Value,
    ctx: &mut ValidationContext,
) -> ValidationResult<Value> {
    let entries = match value {
        Value::Object(map) => map,
        v => return Err(ctx.error(type_mismatch("record", v))),
    };
    let mut out = IndexMap::new();
    for (key, entry) in entries {
        let key_out = validate_entry_key(&t.key, key, ctx)?;
        let validated = ctx.with_segment(key.clone(), |ctx| {
            validate_node(&t.value, Some(entry), None, ctx)
        })?;
        if let Some(v) = validated {
            out.insert(key_out, v);
        }
    }
    Ok(Value::Object(out))
}

/// Validate a map value (ordered key-value pairs, dynamic key set)
fn validate_map(
    t: &MapType,
    value: &Value,
    ctx: &mut ValidationContext,
) -> ValidationResult<Value> {
    let entries: Vec<(&String, &Value)> = match value {
        Value::Map(pairs) => pairs.iter().map(|(k, v)| (k, v)).collect(),
        Value::Object(map) => map.iter().collect(),
        v => return Err(ctx.error(type_mismatch("map", v))),
    };
    let mut out = Vec::with_capacity(entries.len());
    for (key, entry) in entries {
        let key_out = validate_entry_key(&t.key, key, ctx)?;
        let validated = ctx.with_segment(key.clone(), |ctx| {
            validate_node(&t.value, Some(entry), None, ctx)
        })?;
        if let Some(v) = validated {
            out.push((key_out, v));
        }
    }
    Ok(Value::Map(out))
}

/// Validate a dynamic entry key against the key schema
fn validate_entry_key(
    key_schema: &TypeNode,
    key: &str,
    ctx: &mut ValidationContext,
) -> ValidationResult<String> {
    let key_value = Value::String(key.to_string());
    let validated = ctx.with_segment(key.to_string(), |ctx| {
        validate_node(key_schema, Some(&key_value), None, ctx)
    })?;
    match validated {
        Some(Value::String(s)) => Ok(s),
        _ => Ok(key.to_string()),
    }
}

/// Validate oneOf (first branch that matches wins; all failures are
/// aggregated, indexed by branch position)
fn validate_one_of(
    t: &OneOfType,
    value: Option<&Value>,
    siblings: Option<&IndexMap<String, Value>>,
    ctx: &mut ValidationContext,
) -> ValidationResult<Option<Value>> {
    let mut failures = Vec::with_capacity(t.branches.len());
    for (index, branch) in t.branches.iter().enumerate() {
        let attempt = ctx.with_segment(index.to_string(), |ctx| {
            validate_node(branch, value, siblings, ctx)
        });
        match attempt {
            Ok(validated) => return Ok(validated),
            Err(failure) => failures.push(failure),
        }
    }
    Err(ctx.error(ValidationErrorKind::UnionExhausted { failures }))
}

/// Validate a conditional: resolve the test reference, compare against the
/// operand, then validate against the chosen branch
fn validate_conditional(
    t: &ConditionalType,
    value: Option<&Value>,
    siblings: Option<&IndexMap<String, Value>>,
    ctx: &mut ValidationContext,
) -> ValidationResult<Option<Value>> {
    let test_value = t.test.resolve(siblings, ctx.context, &ctx.path)?;
    let operand_value = match &t.operand {
        Operand::Value(v) => v.clone(),
        Operand::Ref(reference) => reference.resolve(siblings, ctx.context, &ctx.path)?,
    };
    let branch = if test_value == operand_value {
        &t.then_schema
    } else {
        &t.else_schema
    };
    validate_node(branch, value, siblings, ctx)
}

/// Validate an object value
fn validate_object(
    t: &ObjectType,
    value: Option<&Value>,
    siblings: Option<&IndexMap<String, Value>>,
    ctx: &mut ValidationContext,
) -> ValidationResult<Option<Value>> {
    // string input is coerced through JSON at every object node
    let parsed;
    let input = match value {
        None => {
            if let Some(default) = &t.default {
                return default.resolve(siblings, ctx.context, &ctx.path).map(Some);
            }
            // proceed with an empty object so nested defaults apply
            None
        }
        Some(Value::String(raw)) => {
            let json: serde_json::Value = serde_json::from_str(raw)
                .map_err(|_| ctx.error(ValidationErrorKind::JsonParse))?;
            parsed = Value::from_json(json);
            Some(&parsed)
        }
        Some(v) => Some(v),
    };
    let input_map = match input {
        None => None,
        Some(Value::Object(map)) => Some(map),
        Some(v) => {
            return Err(ctx.error(ValidationErrorKind::NotPlainObject {
                found: v.type_detect().to_string(),
            }));
        }
    };

    let effective = if ctx.strip_unknown_keys {
        Unknowns::Ignore
    } else {
        t.unknowns
            .or(ctx.inherited_unknowns)
            .unwrap_or(Unknowns::Forbid)
    };

    // unknown keys are rejected before declared keys are validated, so the
    // unknown-key failure wins over a missing-required failure
    if effective == Unknowns::Forbid {
        if let Some(map) = input_map {
            for key in map.keys() {
                if !t.props.contains_key(key) {
                    return Err(ctx.error_at(key, ValidationErrorKind::UnknownKey));
                }
            }
        }
    }

    // only `ignore` propagates; an explicit allow/forbid resets
    // inheritance for the subtree
    let saved = ctx.inherited_unknowns;
    ctx.inherited_unknowns = match t.unknowns {
        Some(Unknowns::Ignore) => Some(Unknowns::Ignore),
        Some(_) => None,
        None => saved,
    };
    let children = validate_object_children(t, input_map, ctx);
    ctx.inherited_unknowns = saved;
    let mut out = children?;

    if effective == Unknowns::Allow {
        if let Some(map) = input_map {
            for (key, v) in map {
                if !t.props.contains_key(key) {
                    out.insert(key.clone(), v.clone());
                }
            }
        }
    }

    let assembled = Value::Object(out);
    if let Some(hook) = &t.hook {
        hook.call(&assembled)
            .map_err(|message| ctx.error(ValidationErrorKind::HookFailed { message }))?;
    }
    Ok(Some(assembled))
}

/// Validate an object's declared keys in declaration order, threading the
/// partially built output as the sibling frame
fn validate_object_children(
    t: &ObjectType,
    input: Option<&IndexMap<String, Value>>,
    ctx: &mut ValidationContext,
) -> ValidationResult<IndexMap<String, Value>> {
    let mut out = IndexMap::new();
    for (key, child) in &t.props {
        let child_value = input.and_then(|map| map.get(key));
        let validated = ctx.with_segment(key.clone(), |ctx| {
            validate_node(child, child_value, Some(&out), ctx)
        })?;
        if let Some(v) = validated {
            out.insert(key.clone(), v);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn node(n: impl Into<TypeNode>) -> TypeNode {
        n.into()
    }

    // --- primitives ---

    #[test]
    fn test_boolean_accepts_strings_by_default() {
        let t = node(schema::boolean());
        assert_eq!(t.validate(Some(&Value::from("true"))).unwrap(), Value::Bool(true));
        assert_eq!(t.validate(Some(&Value::from("false"))).unwrap(), Value::Bool(false));
        assert_eq!(t.validate(Some(&Value::Bool(true))).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_boolean_strict_rejects_strings() {
        let t = node(schema::boolean().strict());
        let error = t.validate(Some(&Value::from("true"))).unwrap_err();
        assert_eq!(
            error.to_string(),
            "expected value of type [boolean] but got [string]"
        );
    }

    #[test]
    fn test_number_range() {
        let t = node(schema::number().min(1.0).max(10.0));
        assert_eq!(t.validate(Some(&Value::from(5.0))).unwrap(), Value::Number(5.0));
        assert_eq!(
            t.validate(Some(&Value::from(0.0))).unwrap_err().to_string(),
            "Value must be equal to or greater than [1]."
        );
        assert_eq!(
            t.validate(Some(&Value::from(11.0))).unwrap_err().to_string(),
            "Value must be equal to or lower than [10]."
        );
    }

    #[test]
    fn test_number_rejects_nan() {
        let t = node(schema::number());
        assert!(t.validate(Some(&Value::Number(f64::NAN))).is_err());
    }

    #[test]
    fn test_string_length_and_pattern() {
        let t = node(schema::string().min_length(2).max_length(4));
        assert_eq!(
            t.validate(Some(&Value::from("a"))).unwrap_err().to_string(),
            "value has length [1] but it must have a minimum length of [2]."
        );
        assert_eq!(
            t.validate(Some(&Value::from("abcde"))).unwrap_err().to_string(),
            "value has length [5] but it must have a maximum length of [4]."
        );

        let t = node(schema::string().pattern("^[a-z]+$"));
        assert!(t.validate(Some(&Value::from("abc"))).is_ok());
        assert_eq!(
            t.validate(Some(&Value::from("ABC"))).unwrap_err().to_string(),
            "value [ABC] does not match regular expression [^[a-z]+$]"
        );
    }

    #[test]
    fn test_string_length_counts_characters() {
        // "héllo" is 6 bytes but 5 characters
        let t = node(schema::string().max_length(5));
        assert!(t.validate(Some(&Value::from("héllo"))).is_ok());

        let t = node(schema::string().min_length(6));
        assert_eq!(
            t.validate(Some(&Value::from("héllo"))).unwrap_err().to_string(),
            "value has length [5] but it must have a minimum length of [6]."
        );
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let t = node(schema::string().pattern("["));
        let error = t.validate(Some(&Value::from("anything"))).unwrap_err();
        assert!(matches!(
            error.kind,
            ValidationErrorKind::InvalidPattern { .. }
        ));
    }

    #[test]
    fn test_literal_including_null() {
        let t = node(schema::literal("foo"));
        assert_eq!(t.validate(Some(&Value::from("foo"))).unwrap(), Value::from("foo"));
        assert_eq!(
            t.validate(Some(&Value::from("bar"))).unwrap_err().to_string(),
            "expected value to equal [foo]"
        );

        let t = node(schema::literal(Value::Null));
        assert_eq!(t.validate(Some(&Value::Null)).unwrap(), Value::Null);
        assert_eq!(
            t.validate(Some(&Value::from("x"))).unwrap_err().to_string(),
            "expected value to equal [null]"
        );
    }

    #[test]
    fn test_duration_parsing() {
        let t = node(schema::duration());
        assert_eq!(
            t.validate(Some(&Value::from("70ms"))).unwrap(),
            Value::Duration(Duration::from_millis(70))
        );
        assert_eq!(
            t.validate(Some(&Value::from("5s"))).unwrap(),
            Value::Duration(Duration::from_secs(5))
        );
        assert_eq!(
            t.validate(Some(&Value::from("3m"))).unwrap(),
            Value::Duration(Duration::from_secs(180))
        );
        assert_eq!(
            t.validate(Some(&Value::from("2h"))).unwrap(),
            Value::Duration(Duration::from_secs(7200))
        );
        assert_eq!(
            t.validate(Some(&Value::from("1d"))).unwrap(),
            Value::Duration(Duration::from_secs(86400))
        );
        assert_eq!(
            t.validate(Some(&Value::from(1500.0))).unwrap(),
            Value::Duration(Duration::from_millis(1500))
        );
        assert_eq!(
            t.validate(Some(&Value::from("5x"))).unwrap_err().to_string(),
            "failed to parse [5x] as duration string"
        );
    }

    #[test]
    fn test_duration_rejects_out_of_range_number() {
        let t = node(schema::duration());
        let error = t.validate(Some(&Value::from(1e300))).unwrap_err();
        assert!(matches!(error.kind, ValidationErrorKind::DurationParse { .. }));

        let error = t.validate(Some(&Value::from(-5.0))).unwrap_err();
        assert!(matches!(error.kind, ValidationErrorKind::DurationParse { .. }));
    }

    #[test]
    fn test_byte_size_parsing() {
        let t = node(schema::byte_size());
        assert_eq!(t.validate(Some(&Value::from("512b"))).unwrap(), Value::ByteSize(512));
        assert_eq!(t.validate(Some(&Value::from("1kb"))).unwrap(), Value::ByteSize(1024));
        assert_eq!(
            t.validate(Some(&Value::from("2mb"))).unwrap(),
            Value::ByteSize(2 * 1024 * 1024)
        );
        assert_eq!(
            t.validate(Some(&Value::from("1gb"))).unwrap(),
            Value::ByteSize(1024 * 1024 * 1024)
        );
        assert_eq!(t.validate(Some(&Value::from(2048.0))).unwrap(), Value::ByteSize(2048));
        assert_eq!(
            t.validate(Some(&Value::from("12"))).unwrap_err().to_string(),
            "failed to parse [12] as byte size string"
        );
    }

    #[test]
    fn test_byte_size_rejects_out_of_range_number() {
        let t = node(schema::byte_size());
        let error = t.validate(Some(&Value::from(1e300))).unwrap_err();
        assert!(matches!(error.kind, ValidationErrorKind::ByteSizeParse { .. }));
    }

    #[test]
    fn test_ip_validation() {
        let t = node(schema::ip());
        assert!(t.validate(Some(&Value::from("127.0.0.1"))).is_ok());
        assert!(t.validate(Some(&Value::from("::1"))).is_ok());
        assert_eq!(
            t.validate(Some(&Value::from("10.0.0.0/8"))).unwrap_err().to_string(),
            "value [10.0.0.0/8] must be a valid IPv4 or IPv6 address"
        );

        let t = node(schema::ip().allow_cidr());
        assert!(t.validate(Some(&Value::from("10.0.0.0/8"))).is_ok());
        assert!(t.validate(Some(&Value::from("10.0.0.0/64"))).is_err());
    }

    #[test]
    fn test_uri_validation() {
        let t = node(schema::uri());
        assert!(t.validate(Some(&Value::from("http://example.com/path"))).is_ok());
        assert_eq!(
            t.validate(Some(&Value::from("not a uri"))).unwrap_err().to_string(),
            "value [not a uri] must be a valid URI"
        );

        let t = node(schema::uri().schemes(["https"]));
        assert!(t.validate(Some(&Value::from("https://example.com"))).is_ok());
        assert!(t.validate(Some(&Value::from("ftp://example.com"))).is_err());
    }

    #[test]
    fn test_binary_and_stream() {
        let t = node(schema::binary());
        assert!(t.validate(Some(&Value::Binary(vec![1, 2]))).is_ok());
        assert_eq!(
            t.validate(Some(&Value::from("abc"))).unwrap_err().to_string(),
            "expected value of type [binary] but got [string]"
        );

        let t = node(schema::stream());
        let handle = crate::value::StreamHandle::new(std::io::empty());
        assert!(t.validate(Some(&Value::Stream(handle))).is_ok());
        assert!(t.validate(Some(&Value::from(1.0))).is_err());
    }

    #[test]
    fn test_never_and_any() {
        let t = node(schema::never());
        assert_eq!(
            t.validate(Some(&Value::from("x"))).unwrap_err().to_string(),
            "a value wasn't expected to be present"
        );

        let t = node(schema::any());
        assert_eq!(t.validate(Some(&Value::from("x"))).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_missing_required_value() {
        let t = node(schema::string());
        assert_eq!(
            t.validate(None).unwrap_err().to_string(),
            "expected value of type [string] but got [undefined]"
        );
    }

    #[test]
    fn test_default_value_resolution() {
        let t = node(schema::string().default_value("fallback"));
        assert_eq!(t.validate(None).unwrap(), Value::from("fallback"));
    }

    // --- wrappers ---

    #[test]
    fn test_maybe_and_nullable() {
        let t = schema::maybe(schema::string());
        assert_eq!(t.validate(None).unwrap(), Value::Null);
        assert_eq!(t.validate(Some(&Value::from("x"))).unwrap(), Value::from("x"));

        let t = schema::nullable(schema::string());
        assert_eq!(t.validate(None).unwrap(), Value::Null);
        assert_eq!(t.validate(Some(&Value::Null)).unwrap(), Value::Null);
        assert_eq!(t.validate(Some(&Value::from("x"))).unwrap(), Value::from("x"));
        assert!(t.validate(Some(&Value::from(1.0))).is_err());
    }

    // --- arrays ---

    #[test]
    fn test_array_sizes_and_element_paths() {
        let t = node(schema::array_of(schema::string()).min_size(1).max_size(2));
        assert_eq!(
            t.validate(Some(&Value::array([]))).unwrap_err().to_string(),
            "array size is [0], but cannot be smaller than [1]"
        );
        let three = Value::array([Value::from("a"), Value::from("b"), Value::from("c")]);
        assert_eq!(
            t.validate(Some(&three)).unwrap_err().to_string(),
            "array size is [3], but cannot be greater than [2]"
        );
        let bad = Value::array([Value::from("a"), Value::from(1.0)]);
        assert_eq!(
            t.validate(Some(&bad)).unwrap_err().to_string(),
            "[1]: expected value of type [string] but got [number]"
        );
    }

    // --- lazy ---

    #[test]
    fn test_lazy_self_reference_depth_guard() {
        // a schema that always recurses into itself
        fn recursive() -> TypeNode {
            TypeNode::from(schema::lazy(recursive))
        }
        let t = recursive();
        let error = t.validate(Some(&Value::from("x"))).unwrap_err();
        assert!(matches!(
            error.kind,
            ValidationErrorKind::SchemaTooDeep { limit: 128 }
        ));
    }

    #[test]
    fn test_lazy_recursive_object() {
        // node = { name: string, child: maybe(lazy(node)) }
        fn tree() -> TypeNode {
            TypeNode::from(schema::object([
                ("name", TypeNode::from(schema::string())),
                ("child", schema::maybe(schema::lazy(tree))),
            ]))
        }
        let t = tree();
        let input = Value::object([
            ("name", Value::from("root")),
            (
                "child",
                Value::object([("name", Value::from("leaf"))]),
            ),
        ]);
        assert_eq!(t.validate(Some(&input)).unwrap(), input);
    }
}
