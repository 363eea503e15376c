use crate::node::{NodeId, ROOT_ID};
use crate::state::{TreeError, TreeState};

/// What a `delete_subtree` call removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneReport {
    /// Every removed id, target included.
    pub removed: Vec<NodeId>,
    /// True when the cursor sat inside the deleted subtree and was re-pointed.
    pub active_moved: bool,
}

/// Delete `target_id` and its entire descendant subtree.
///
/// The root is never deletable; unknown targets leave the state untouched.
/// `seen_linear_count` is deliberately not decremented, so a later reconcile
/// pass cannot resurrect the deleted turns even though the page still shows
/// them.
pub fn delete_subtree(state: &mut TreeState, target_id: &str) -> Result<PruneReport, TreeError> {
    if target_id == ROOT_ID {
        return Err(TreeError::RootForbidden);
    }
    let parent_id = match state.nodes.get(target_id) {
        Some(node) => node.parent_id.clone(),
        None => return Err(TreeError::UnknownNode(target_id.to_string())),
    };

    // Depth-first descendant set, target included.
    let mut removed = Vec::new();
    let mut stack = vec![target_id.to_string()];
    while let Some(id) = stack.pop() {
        if let Some(node) = state.nodes.get(&id) {
            stack.extend(node.children.iter().cloned());
        }
        removed.push(id);
    }

    for id in &removed {
        state.nodes.remove(id);
        state.collapsed_ids.remove(id);
    }
    if let Some(parent) = state.nodes.get_mut(&parent_id) {
        parent.children.retain(|c| c != target_id);
    }

    let active_moved = removed.iter().any(|id| *id == state.active_id);
    if active_moved {
        state.active_id = if state.nodes.contains_key(&parent_id) {
            parent_id
        } else {
            // parent vanished with the subtree somehow; root always survives
            ROOT_ID.to_string()
        };
    }
    Ok(PruneReport {
        removed,
        active_moved,
    })
}
