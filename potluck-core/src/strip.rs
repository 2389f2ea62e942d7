//! Removes absent values from a tree before it goes over the wire.
//!
//! The wire format distinguishes "field omitted" from "field present", so any
//! object member holding null, undefined or NaN is dropped rather than sent.

use crate::tree::Node;

/// Drop every object member whose value is absent, recursively.
///
/// Array elements are stripped in place but never removed: an array keeps its
/// length even if some of its elements are themselves absent.
pub fn strip(node: Node) -> Node {
    match node {
        Node::Object(map) => Node::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_absent())
                .map(|(k, v)| (k, strip(v)))
                .collect(),
        ),
        Node::Array(items) => Node::Array(items.into_iter().map(strip).collect()),
        leaf => leaf,
    }
}
