//! Reconstruction of source text from tree slices.
//!
//! Purely textual: every leaf contributes its trivia and literal in tree
//! order, so any contiguous slice of the original tree round-trips
//! byte-for-byte.

use super::cst::{NodeId, SyntaxTree};

/// Returns the exact source text of `nodes`, in order.
///
/// With `skip_leading_trivia` the very first token's trivia is omitted,
/// so reconstructed defaults, annotations and base classes do not carry
/// their separating whitespace.
pub fn span_text(tree: &SyntaxTree, nodes: &[NodeId], skip_leading_trivia: bool) -> String {
    let mut out = String::new();
    let mut skip_next_prefix = skip_leading_trivia;
    for &node in nodes {
        append(tree, node, &mut out, &mut skip_next_prefix);
    }
    out
}

/// Single-node convenience for [`span_text`].
pub fn node_text(tree: &SyntaxTree, node: NodeId, skip_leading_trivia: bool) -> String {
    span_text(tree, &[node], skip_leading_trivia)
}

fn append(tree: &SyntaxTree, id: NodeId, out: &mut String, skip_next_prefix: &mut bool) {
    if tree.is_leaf(id) {
        if *skip_next_prefix {
            *skip_next_prefix = false;
        } else {
            out.push_str(tree.own_prefix(id));
        }
        out.push_str(tree.value(id));
        return;
    }
    for &child in tree.children(id) {
        append(tree, child, out, skip_next_prefix);
    }
}
