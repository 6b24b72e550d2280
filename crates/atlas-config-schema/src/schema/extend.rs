// Structural extension of object schemas
//
// Both operations are pure: they build a new schema tree and never mutate
// the receiver, so extended and original schemas can be used side by side.

use crate::schema::types::{
    ArrayType, ConditionalType, LazyFactory, LazyType, MapType, ObjectType, OneOfType,
    RecordType, TypeNode, Unknowns,
};

impl ObjectType {
    /// Shallow key merge: `Some(node)` adds or overrides a key, `None`
    /// removes it. Existing keys keep their position, new keys append.
    /// The object's options (unknowns policy, default, hook, meta) carry
    /// over unchanged; use the builder methods on the result to override
    /// them.
    pub fn extends<K, I>(&self, changes: I) -> ObjectType
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Option<TypeNode>)>,
    {
        let mut extended = self.clone();
        for (key, change) in changes {
            let key = key.into();
            match change {
                Some(node) => match extended.props.get_mut(&key) {
                    Some(existing) => *existing = node,
                    None => {
                        extended.props.insert(key, node);
                    }
                },
                None => {
                    extended.props.shift_remove(&key);
                }
            }
        }
        extended
    }

    /// Push an unknown-keys policy into every object node of the tree that
    /// does not declare its own, recursing through arrays, records, maps,
    /// one-of branches, conditionals and lazy factories.
    pub fn extends_deep(&self, policy: Unknowns) -> ObjectType {
        extend_deep_object(self, policy)
    }
}

fn extend_deep_object(base: &ObjectType, policy: Unknowns) -> ObjectType {
    let mut extended = base.clone();
    extended.unknowns = Some(base.unknowns.unwrap_or(policy));
    extended.props = base
        .props
        .iter()
        .map(|(key, node)| (key.clone(), extend_deep_node(node, policy)))
        .collect();
    extended
}

fn extend_deep_node(node: &TypeNode, policy: Unknowns) -> TypeNode {
    match node {
        TypeNode::Object(object) => TypeNode::Object(extend_deep_object(object, policy)),
        TypeNode::Array(array) => TypeNode::Array(ArrayType {
            item: Box::new(extend_deep_node(&array.item, policy)),
            ..array.clone()
        }),
        TypeNode::Record(record) => TypeNode::Record(RecordType {
            key: Box::new(extend_deep_node(&record.key, policy)),
            value: Box::new(extend_deep_node(&record.value, policy)),
            ..record.clone()
        }),
        TypeNode::Map(map) => TypeNode::Map(MapType {
            key: Box::new(extend_deep_node(&map.key, policy)),
            value: Box::new(extend_deep_node(&map.value, policy)),
            ..map.clone()
        }),
        TypeNode::OneOf(one_of) => TypeNode::OneOf(OneOfType {
            branches: one_of
                .branches
                .iter()
                .map(|branch| extend_deep_node(branch, policy))
                .collect(),
            ..one_of.clone()
        }),
        TypeNode::Conditional(conditional) => TypeNode::Conditional(ConditionalType {
            then_schema: Box::new(extend_deep_node(&conditional.then_schema, policy)),
            else_schema: Box::new(extend_deep_node(&conditional.else_schema, policy)),
            ..conditional.clone()
        }),
        TypeNode::Maybe(inner) => TypeNode::Maybe(Box::new(extend_deep_node(inner, policy))),
        TypeNode::Nullable(inner) => {
            TypeNode::Nullable(Box::new(extend_deep_node(inner, policy)))
        }
        TypeNode::Lazy(lazy) => {
            // The deferred schema is transformed on every expansion.
            let factory = lazy.factory.clone();
            TypeNode::Lazy(LazyType {
                factory: LazyFactory::new(move || extend_deep_node(&factory.expand(), policy)),
                meta: lazy.meta.clone(),
            })
        }
        leaf => leaf.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn test_extends_add_override_remove() {
        let base = schema::object([
            ("a", TypeNode::from(schema::string())),
            ("b", TypeNode::from(schema::string())),
        ]);
        let extended = base.extends([
            ("b", Some(TypeNode::from(schema::number()))),
            ("a", None::<TypeNode>),
            ("c", Some(TypeNode::from(schema::boolean()))),
        ]);

        let keys: Vec<&str> = extended.props.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "c"]);
        assert!(matches!(extended.props.get("b"), Some(TypeNode::Number(_))));
        // the original is untouched
        assert!(base.props.contains_key("a"));
        assert!(matches!(base.props.get("b"), Some(TypeNode::String(_))));
    }

    #[test]
    fn test_extends_deep_preserves_own_policy() {
        let base = schema::object([(
            "inner",
            TypeNode::from(
                schema::object([("x", TypeNode::from(schema::string()))])
                    .unknowns(Unknowns::Allow),
            ),
        )]);
        let extended = base.extends_deep(Unknowns::Forbid);

        assert_eq!(extended.unknowns, Some(Unknowns::Forbid));
        match extended.props.get("inner") {
            Some(TypeNode::Object(inner)) => assert_eq!(inner.unknowns, Some(Unknowns::Allow)),
            other => panic!("expected object node, got {:?}", other),
        }
    }
}
