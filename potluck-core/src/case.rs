//! Key casing between internal (lowerCamel) and wire (lower_snake) field names.

use crate::tree::Node;

/// `prepTime` -> `prep_time`.
pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `prep_time` -> `prepTime`. An underscore only folds into the following
/// letter; underscores before digits, other underscores or the end of the key
/// are kept.
pub fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('_', Some(next)) if next.is_ascii_alphabetic() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Rewrite every object key in the tree, at every depth, including objects
/// nested inside arrays. Everything that is not an object or array is
/// returned as-is.
pub fn map_keys(node: Node, f: &impl Fn(&str) -> String) -> Node {
    match node {
        Node::Object(map) => Node::Object(
            map.into_iter()
                .map(|(k, v)| (f(&k), map_keys(v, f)))
                .collect(),
        ),
        Node::Array(items) => Node::Array(items.into_iter().map(|i| map_keys(i, f)).collect()),
        leaf => leaf,
    }
}

/// Outbound: internal names to wire names.
pub fn snake_keys(node: Node) -> Node {
    map_keys(node, &camel_to_snake)
}

/// Inbound: wire names to internal names.
pub fn camel_keys(node: Node) -> Node {
    map_keys(node, &snake_to_camel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_key_transforms() {
        assert_eq!(camel_to_snake("yieldQuantity"), "yield_quantity");
        assert_eq!(camel_to_snake("id"), "id");
        assert_eq!(camel_to_snake("step2Text"), "step2_text");
        assert_eq!(snake_to_camel("inactive_time"), "inactiveTime");
        assert_eq!(snake_to_camel("step2_text"), "step2Text");
        assert_eq!(snake_to_camel("trailing_"), "trailing_");
        assert_eq!(snake_to_camel("a__b"), "a_B");
    }

    #[test]
    fn test_nested_structures_are_rewritten() {
        let node = Node::from(json!({
            "yieldUnits": "bowls",
            "steps": [{"stepId": 1, "ordinal": 0}],
            "author": {"displayName": "Ann"}
        }));
        let wire = snake_keys(node);
        assert_eq!(
            wire.to_json(),
            json!({
                "yield_units": "bowls",
                "steps": [{"step_id": 1, "ordinal": 0}],
                "author": {"display_name": "Ann"}
            })
        );
    }

    #[test]
    fn test_leaves_pass_through() {
        let bytes = Node::Bytes(vec![0, 1, 2]);
        assert_eq!(snake_keys(bytes.clone()), bytes);
        assert_eq!(camel_keys(Node::Null), Node::Null);
        assert_eq!(camel_keys(Node::Text("snake_case".into())), Node::Text("snake_case".into()));
    }

    fn camel_key() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,5}([A-Z][a-z0-9]{1,5}){0,3}"
    }

    fn camel_tree() -> impl Strategy<Value = Node> {
        let leaf = prop_oneof![
            Just(Node::Null),
            any::<bool>().prop_map(Node::Bool),
            any::<i64>().prop_map(Node::Int),
            "[a-zA-Z_ ]{0,8}".prop_map(Node::Text),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Node::Array),
                prop::collection::btree_map(camel_key(), inner, 0..4).prop_map(Node::Object),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_camel_keys_inverts_snake_keys(tree in camel_tree()) {
            prop_assert_eq!(camel_keys(snake_keys(tree.clone())), tree);
        }

        #[test]
        fn prop_snake_to_camel_is_left_inverse(key in camel_key()) {
            prop_assert_eq!(snake_to_camel(&camel_to_snake(&key)), key);
        }
    }
}
