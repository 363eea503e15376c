use crate::node::{NodeId, TreeNode, ROOT_ID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Typed failures for tree mutations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node not found: {0}")]
    UnknownNode(NodeId),
    #[error("operation not permitted on the root node")]
    RootForbidden,
    #[error("parent/child links inconsistent at node {0}")]
    InconsistentLink(NodeId),
}

/// Full per-conversation tree state.
///
/// Ordered maps keep serialization and traversal order deterministic, which
/// is what makes re-alignment snapshots comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeState {
    pub conversation_key: String,
    /// Count of pairs already folded into the tree. Monotonically
    /// non-decreasing, including across deletions.
    pub seen_linear_count: usize,
    /// Insertion point and navigation focus.
    pub active_id: NodeId,
    pub nodes: BTreeMap<NodeId, TreeNode>,
    /// Nodes whose descendants are hidden from the filtered listing.
    #[serde(default)]
    pub collapsed_ids: BTreeSet<NodeId>,
}

impl TreeState {
    /// Fresh root-only state for a conversation.
    pub fn new(conversation_key: &str) -> Self {
        let root = TreeNode::root();
        let mut nodes = BTreeMap::new();
        nodes.insert(root.id.clone(), root);
        Self {
            conversation_key: conversation_key.to_string(),
            seen_linear_count: 0,
            active_id: ROOT_ID.to_string(),
            nodes,
            collapsed_ids: BTreeSet::new(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Active node id, falling back to root when the recorded id is gone.
    pub fn active_or_root(&self) -> &str {
        if self.nodes.contains_key(&self.active_id) {
            self.active_id.as_str()
        } else {
            ROOT_ID
        }
    }

    /// Attach a prepared node as the last child of `parent_id`, fixing up
    /// `parent_id`, `depth`, and the parent's child list.
    pub(crate) fn attach(&mut self, mut node: TreeNode, parent_id: &str) {
        let parent_depth = self.nodes.get(parent_id).map(|p| p.depth).unwrap_or(0);
        node.parent_id = parent_id.to_string();
        node.depth = parent_depth + 1;
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.children.push(id);
        }
    }

    /// Point the cursor at an existing node.
    pub fn set_active(&mut self, id: &str) -> Result<(), TreeError> {
        if !self.nodes.contains_key(id) {
            return Err(TreeError::UnknownNode(id.to_string()));
        }
        self.active_id = id.to_string();
        Ok(())
    }

    /// Flip a node's collapse flag; returns the new flag value.
    /// The root cannot be collapsed.
    pub fn toggle_collapse(&mut self, id: &str) -> Result<bool, TreeError> {
        if id == ROOT_ID {
            return Err(TreeError::RootForbidden);
        }
        if !self.nodes.contains_key(id) {
            return Err(TreeError::UnknownNode(id.to_string()));
        }
        if self.collapsed_ids.remove(id) {
            Ok(false)
        } else {
            self.collapsed_ids.insert(id.to_string());
            Ok(true)
        }
    }

    pub fn expand_all(&mut self) {
        self.collapsed_ids.clear();
    }

    /// Strict ancestors of `id`, nearest first, root excluded. A visited-set
    /// guard terminates a corrupted parent chain instead of looping.
    pub fn ancestors(&self, id: &str) -> Vec<&TreeNode> {
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut cur = match self.nodes.get(id) {
            Some(n) => n,
            None => return out,
        };
        seen.insert(cur.id.as_str());
        while !cur.is_root() {
            let parent = match self.nodes.get(cur.parent_id.as_str()) {
                Some(p) => p,
                None => break,
            };
            if parent.is_root() {
                break;
            }
            if !seen.insert(parent.id.as_str()) {
                break; // cycle
            }
            out.push(parent);
            cur = parent;
        }
        out
    }

    /// Verify structural invariants: root present, every parent resolves,
    /// and `children`/`parent_id` agree both ways.
    pub fn check_integrity(&self) -> Result<(), TreeError> {
        let root = self
            .nodes
            .get(ROOT_ID)
            .ok_or_else(|| TreeError::UnknownNode(ROOT_ID.to_string()))?;
        if root.parent_id != ROOT_ID {
            return Err(TreeError::InconsistentLink(ROOT_ID.to_string()));
        }
        for node in self.nodes.values() {
            if !node.is_root() {
                let parent = self
                    .nodes
                    .get(&node.parent_id)
                    .ok_or_else(|| TreeError::InconsistentLink(node.id.clone()))?;
                if !parent.children.contains(&node.id) {
                    return Err(TreeError::InconsistentLink(node.id.clone()));
                }
            }
            for child_id in &node.children {
                match self.nodes.get(child_id) {
                    Some(child) if child.parent_id == node.id => {}
                    _ => return Err(TreeError::InconsistentLink(child_id.clone())),
                }
            }
        }
        if !self.nodes.contains_key(&self.active_id) {
            return Err(TreeError::UnknownNode(self.active_id.clone()));
        }
        Ok(())
    }
}
