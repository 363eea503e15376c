use crate::node::{NodeId, TreeNode, ROOT_ID};
use crate::state::TreeState;
use std::collections::BTreeSet;

/// Root-to-active path, root excluded, active included. Empty when the
/// cursor sits on the root.
pub fn path_to_root(state: &TreeState) -> Vec<&TreeNode> {
    let active = state.active_or_root();
    if active == ROOT_ID {
        return Vec::new();
    }
    let mut chain = state.ancestors(active);
    chain.reverse();
    if let Some(node) = state.node(active) {
        chain.push(node);
    }
    chain
}

/// Depth-first pre-order listing from the root, root excluded, collapse
/// state ignored.
pub fn flatten(state: &TreeState) -> Vec<&TreeNode> {
    let mut out = Vec::new();
    let root = match state.node(ROOT_ID) {
        Some(r) => r,
        None => return out,
    };
    let mut stack: Vec<&str> = root.children.iter().rev().map(String::as_str).collect();
    while let Some(id) = stack.pop() {
        if let Some(node) = state.node(id) {
            out.push(node);
            stack.extend(node.children.iter().rev().map(String::as_str));
        }
    }
    out
}

/// `flatten`, with every collapsed node's descendants skipped. Collapsed
/// nodes themselves stay listed; only what hangs below them is hidden.
pub fn flatten_visible(state: &TreeState) -> Vec<&TreeNode> {
    let mut out = Vec::new();
    let root = match state.node(ROOT_ID) {
        Some(r) => r,
        None => return out,
    };
    let mut stack: Vec<&str> = root.children.iter().rev().map(String::as_str).collect();
    while let Some(id) = stack.pop() {
        if let Some(node) = state.node(id) {
            out.push(node);
            if !state.collapsed_ids.contains(&node.id) {
                stack.extend(node.children.iter().rev().map(String::as_str));
            }
        }
    }
    out
}

/// True when some strict ancestor of `id` carries the collapse flag.
pub fn is_hidden(state: &TreeState, id: &str) -> bool {
    state
        .ancestors(id)
        .iter()
        .any(|a| state.collapsed_ids.contains(&a.id))
}

/// Ids on the current branch: the root, every node on the root-to-active
/// path, and the active node itself. Consumers use this to highlight the
/// branch the cursor lives on.
pub fn active_branch(state: &TreeState) -> BTreeSet<NodeId> {
    let mut set: BTreeSet<NodeId> = path_to_root(state).iter().map(|n| n.id.clone()).collect();
    set.insert(ROOT_ID.to_string());
    set.insert(state.active_or_root().to_string());
    set
}

/// Collapse everything hanging off the active branch: every child of a
/// branch node that is not itself on the branch gets the flag, which leaves
/// the root-to-active spine expanded, branch-node children visible as stubs,
/// and nothing deeper. Pure `collapsed_ids` rewrite; structure is untouched.
pub fn focus_on_active(state: &mut TreeState) {
    let branch = active_branch(state);
    let mut collapsed = BTreeSet::new();
    for id in &branch {
        if let Some(node) = state.node(id) {
            for child in &node.children {
                if !branch.contains(child) {
                    collapsed.insert(child.clone());
                }
            }
        }
    }
    state.collapsed_ids = collapsed;
}
