use serde::{Deserialize, Serialize};

/// Node ID. Opaque string, stable for the node's lifetime.
pub type NodeId = String;

/// Well-known id of the synthetic root node.
pub const ROOT_ID: &str = "root";

/// Sentinel linear index for the root ("not a real turn").
pub const ROOT_LINEAR_INDEX: i64 = -1;

/// One turn of the conversation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    /// Owning node; the root is its own parent.
    pub parent_id: NodeId,
    /// Child ids in branch-creation order.
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Root depth is 0, each child one deeper than its parent.
    pub depth: u32,
    /// 0-based position among all pairs ever observed for this conversation.
    pub linear_index: i64,
    /// Truncated user-turn label, see `pair::summarize`.
    pub summary: String,
    /// Raw markup snapshots. Transient; zeroed before persistence.
    #[serde(default)]
    pub user_html: String,
    #[serde(default)]
    pub assistant_html: String,
}

impl TreeNode {
    /// The synthetic root. Always present, never a real turn.
    pub fn root() -> Self {
        Self {
            id: ROOT_ID.to_string(),
            parent_id: ROOT_ID.to_string(),
            children: Vec::new(),
            depth: 0,
            linear_index: ROOT_LINEAR_INDEX,
            summary: String::new(),
            user_html: String::new(),
            assistant_html: String::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }
}
