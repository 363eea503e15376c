use crate::ids::reconciled_id;
use crate::node::TreeNode;
use crate::pair::{summarize, TurnPair};
use crate::state::TreeState;

/// What a reconcile pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// `n` new nodes were appended under the cursor.
    Appended(usize),
    /// The extractor reported exactly what has already been folded in.
    NoNew,
    /// The page reported fewer pairs than already seen: it has not finished
    /// rendering. The caller may nudge the page and re-query.
    NotReady,
}

/// Fold newly observed pairs into the tree under the active cursor.
///
/// Appends pairs `[state.seen_linear_count, pairs.len())` in order, each as
/// the last child of the current active node, moving the cursor onto every
/// node as it lands. Appends are keyed off `seen_linear_count`, so a
/// redundant call over the same pairs is a no-op — two triggers racing each
/// other can never double-append.
pub fn reconcile(state: &mut TreeState, pairs: &[TurnPair]) -> ReconcileOutcome {
    let seen = state.seen_linear_count;
    if pairs.len() < seen {
        return ReconcileOutcome::NotReady;
    }
    if pairs.len() == seen {
        return ReconcileOutcome::NoNew;
    }

    let mut appended = 0;
    for (i, pair) in pairs.iter().enumerate().skip(seen) {
        let parent_id = state.active_or_root().to_string();
        let node = TreeNode {
            id: reconciled_id(i),
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
        state.active_id = id;
        state.seen_linear_count = i + 1;
        appended += 1;
    }
    ReconcileOutcome::Appended(appended)
}
