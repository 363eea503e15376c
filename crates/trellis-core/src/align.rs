use crate::ids::aligned_id;
use crate::node::{TreeNode, ROOT_ID};
use crate::pair::{summarize, TurnPair};
use crate::state::TreeState;

/// Rebuild a purely linear tree from the page's full current content.
///
/// Branch structure is discarded: node `i` becomes the sole child of node
/// `i-1` (node 0 hangs off the root). Ids are a deterministic function of
/// the position alone, so aligning twice over the same pairs yields an
/// identical tree. Collapse flags reset. Irreversible without a previously
/// persisted snapshot; callers gate it behind explicit user confirmation.
pub fn align(conversation_key: &str, pairs: &[TurnPair]) -> TreeState {
    let mut state = TreeState::new(conversation_key);
    let mut parent_id = ROOT_ID.to_string();
    for (i, pair) in pairs.iter().enumerate() {
        let node = TreeNode {
            id: aligned_id(i),
            parent_id: String::new(), // set by attach
            children: Vec::new(),
            depth: 0, // set by attach
            linear_index: i as i64,
            summary: summarize(&pair.user_text),
            user_html: pair.user_html.clone(),
            assistant_html: pair.assistant_html.clone(),
        };
        let id = node.id.clone();
        state.attach(node, &parent_id);
        state.active_id = id.clone();
        parent_id = id;
    }
    state.seen_linear_count = pairs.len();
    state
}
