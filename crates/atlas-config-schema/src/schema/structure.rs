// Schema structure introspection
//
// Produces a flat, ordered path -> type listing used to diff configuration
// shapes across versions. The ordering and the type-string vocabulary are a
// stable contract; changing either breaks consumers that persist the
// output.

use crate::schema::types::{ObjectType, TypeNode};
use serde::Serialize;

/// One entry of the flattened schema listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureEntry {
    pub path: Vec<String>,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl StructureEntry {
    pub fn new<S: Into<String>, I: IntoIterator<Item = S>>(
        path: I,
        type_name: impl Into<String>,
    ) -> StructureEntry {
        StructureEntry {
            path: path.into_iter().map(Into::into).collect(),
            type_name: type_name.into(),
        }
    }
}

impl ObjectType {
    /// Flatten this schema into ordered `(path, type)` entries by
    /// depth-first traversal. Directly nested object nodes are flattened
    /// into dotted paths; every other kind is a leaf.
    pub fn get_schema_structure(&self) -> Vec<StructureEntry> {
        let mut entries = Vec::new();
        let mut path = Vec::new();
        collect(self, &mut path, &mut entries);
        entries
    }
}

fn collect(object: &ObjectType, path: &mut Vec<String>, entries: &mut Vec<StructureEntry>) {
    for (key, node) in &object.props {
        path.push(key.clone());
        match node {
            TypeNode::Object(inner) => collect(inner, path, entries),
            other => entries.push(StructureEntry {
                path: path.clone(),
                type_name: structure_type(other),
            }),
        }
        path.pop();
    }
}

fn structure_type(node: &TypeNode) -> String {
    match node {
        TypeNode::Any(_) => "any".to_string(),
        TypeNode::Never(_) => "never".to_string(),
        TypeNode::Boolean(_) => "boolean".to_string(),
        TypeNode::Number(_) => "number".to_string(),
        TypeNode::String(_) | TypeNode::Ip(_) | TypeNode::Uri(_) => "string".to_string(),
        TypeNode::Literal(literal) => literal.value.to_string(),
        TypeNode::Duration(_) => "duration".to_string(),
        TypeNode::ByteSize(_) => "bytes".to_string(),
        TypeNode::Binary(_) => "binary".to_string(),
        TypeNode::Stream(_) => "stream".to_string(),
        TypeNode::Array(_) => "array".to_string(),
        TypeNode::Record(_) => "record".to_string(),
        TypeNode::Map(_) => "map".to_string(),
        TypeNode::Object(_) => "object".to_string(),
        TypeNode::OneOf(one_of) => one_of
            .branches
            .iter()
            .map(structure_type)
            .collect::<Vec<_>>()
            .join("|"),
        TypeNode::Conditional(conditional) => {
            let then_type = structure_type(&conditional.then_schema);
            let else_type = structure_type(&conditional.else_schema);
            if then_type == else_type {
                then_type
            } else {
                format!("{}|{}", then_type, else_type)
            }
        }
        TypeNode::Maybe(inner) => optional(structure_type(inner)),
        // Nullable admits absent input too, so the optional marker is
        // always present.
        TypeNode::Nullable(inner) => format!("{}|null", optional(structure_type(inner))),
        // One expansion only; a self-referential schema renders its
        // recursive position as an opaque `object`.
        TypeNode::Lazy(lazy) => match lazy.factory.expand() {
            TypeNode::Object(_) => "object".to_string(),
            expanded => structure_type(&expanded),
        },
    }
}

fn optional(type_name: String) -> String {
    if type_name.ends_with('?') {
        type_name
    } else {
        format!("{}?", type_name)
    }
}
