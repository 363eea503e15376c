use crate::page::{PageHost, RetryPolicy};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use trellis_core::visibility::{active_branch, flatten_visible, path_to_root};
use trellis_core::{
    align, delete_subtree, reconcile, NodeId, PruneReport, ReconcileOutcome, TreeError, TreeNode,
    TreeState, TurnPair,
};
use trellis_store::codec;
use trellis_store::debounce::{SaveDebouncer, DEFAULT_QUIET_WINDOW};
use trellis_store::prefs::{self, PanelPrefs, ScrollOffsets};
use trellis_store::{tree_entry_key, KvStore};

/// Marker passed by callers that have taken the user through a confirmation
/// dialog. Align and delete are irreversible without a prior snapshot, so
/// the gate is part of the signature.
#[derive(Debug, Clone, Copy)]
pub struct Confirmed;

/// One row of the visibility-filtered listing, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineRow {
    pub id: NodeId,
    pub summary: String,
    pub depth: u32,
    pub linear_index: i64,
    pub collapsed: bool,
    pub on_active_branch: bool,
}

/// Driver for the one conversation currently open: owns its `TreeState`,
/// reconciles page content into it under a bounded retry policy, and
/// persists stripped snapshots behind a write debounce.
pub struct Session<K: KvStore> {
    kv: K,
    state: TreeState,
    debouncer: SaveDebouncer,
    retry: RetryPolicy,
}

/// Load the persisted tree for a conversation, or start fresh when nothing
/// usable is stored. Corrupt snapshots are demoted to "absent".
fn load_or_create<K: KvStore>(kv: &K, conversation_key: &str) -> TreeState {
    match kv.get(&tree_entry_key(conversation_key)) {
        Ok(Some(raw)) => match codec::decode(&raw) {
            Ok(tree) if tree.conversation_key == conversation_key => tree,
            Ok(_) => {
                warn!(conversation_key, "stored snapshot belongs to another key");
                TreeState::new(conversation_key)
            }
            Err(err) => {
                warn!(%err, conversation_key, "discarding malformed snapshot");
                TreeState::new(conversation_key)
            }
        },
        Ok(None) => TreeState::new(conversation_key),
        Err(err) => {
            warn!(%err, conversation_key, "snapshot load failed, starting fresh");
            TreeState::new(conversation_key)
        }
    }
}

impl<K: KvStore> Session<K> {
    pub fn open(kv: K, conversation_key: &str) -> Self {
        let state = load_or_create(&kv, conversation_key);
        Self {
            kv,
            state,
            debouncer: SaveDebouncer::new(DEFAULT_QUIET_WINDOW),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_quiet_window(mut self, quiet_window: Duration) -> Self {
        self.debouncer = SaveDebouncer::new(quiet_window);
        self
    }

    /// Swap to another conversation: flush any pending save, drop the old
    /// in-memory tree (storage keeps it), load or create the new one.
    pub fn switch(&mut self, conversation_key: &str) -> anyhow::Result<()> {
        if self.state.conversation_key == conversation_key {
            return Ok(());
        }
        self.flush()?;
        self.state = load_or_create(&self.kv, conversation_key);
        self.debouncer.clear();
        Ok(())
    }

    // ---- reconciliation -------------------------------------------------

    /// One reconcile trigger: query the page and fold new pairs in. When the
    /// page reports nothing newer than `seen_linear_count`, nudge it, let it
    /// settle, and re-query, up to the retry budget. Exhaustion is silent;
    /// the next trigger starts over from the counter.
    ///
    /// Switching conversations cannot race a retry: `sync` borrows the
    /// session exclusively for the whole attempt, so a `switch` can only run
    /// before or after, never between an extract and its apply.
    pub fn sync(&mut self, page: &mut dyn PageHost) -> ReconcileOutcome {
        let mut outcome = reconcile(&mut self.state, &page.extract_pairs());
        let mut attempts = 0;
        while !matches!(outcome, ReconcileOutcome::Appended(_)) && attempts < self.retry.max_attempts
        {
            attempts += 1;
            debug!(attempts, ?outcome, "page not ready, nudging");
            page.nudge();
            page.settle(self.retry.settle_delay);
            outcome = reconcile(&mut self.state, &page.extract_pairs());
        }
        if let ReconcileOutcome::Appended(count) = outcome {
            debug!(count, "appended new turns");
            self.touch();
        }
        outcome
    }

    // ---- mutations ------------------------------------------------------

    pub fn set_active(&mut self, id: &str) -> Result<(), TreeError> {
        self.state.set_active(id)?;
        self.touch();
        Ok(())
    }

    pub fn toggle_collapse(&mut self, id: &str) -> Result<bool, TreeError> {
        let collapsed = self.state.toggle_collapse(id)?;
        self.touch();
        Ok(collapsed)
    }

    pub fn expand_all(&mut self) {
        self.state.expand_all();
        self.touch();
    }

    pub fn focus_on_active(&mut self) {
        trellis_core::visibility::focus_on_active(&mut self.state);
        self.touch();
    }

    /// Destructive: throw away branch structure and rebuild a linear chain
    /// from the page's full current content. `seen_linear_count` stays
    /// monotone even if the page currently shows fewer pairs than seen.
    pub fn align(&mut self, _confirm: Confirmed, pairs: &[TurnPair]) {
        let floor = self.state.seen_linear_count;
        let mut rebuilt = align(&self.state.conversation_key, pairs);
        rebuilt.seen_linear_count = rebuilt.seen_linear_count.max(floor);
        self.state = rebuilt;
        self.touch();
    }

    /// Destructive: remove a node and its whole subtree. The root is
    /// protected; unknown ids are a reported no-op.
    pub fn delete_subtree(
        &mut self,
        _confirm: Confirmed,
        id: &str,
    ) -> Result<PruneReport, TreeError> {
        let report = delete_subtree(&mut self.state, id)?;
        self.touch();
        Ok(report)
    }

    // ---- read-only snapshots --------------------------------------------

    pub fn state(&self) -> &TreeState {
        &self.state
    }

    pub fn conversation_key(&self) -> &str {
        &self.state.conversation_key
    }

    pub fn active_id(&self) -> &str {
        self.state.active_or_root()
    }

    pub fn path_to_root(&self) -> Vec<&TreeNode> {
        path_to_root(&self.state)
    }

    /// Visibility-filtered listing with per-row render flags.
    pub fn outline(&self) -> Vec<OutlineRow> {
        let branch = active_branch(&self.state);
        flatten_visible(&self.state)
            .into_iter()
            .map(|node| OutlineRow {
                id: node.id.clone(),
                summary: node.summary.clone(),
                depth: node.depth,
                linear_index: node.linear_index,
                collapsed: self.state.collapsed_ids.contains(&node.id),
                on_active_branch: branch.contains(&node.id),
            })
            .collect()
    }

    // ---- persistence ----------------------------------------------------

    fn touch(&mut self) {
        self.debouncer.mark_dirty(Instant::now());
    }

    /// Write the stripped snapshot if the quiet window has elapsed.
    /// Returns whether a write happened.
    pub fn flush_if_due(&mut self) -> anyhow::Result<bool> {
        if !self.debouncer.due(Instant::now()) {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    /// Write the stripped snapshot now, regardless of the debounce window.
    pub fn flush(&mut self) -> anyhow::Result<()> {
        if !self.debouncer.is_dirty() {
            return Ok(());
        }
        let raw = codec::encode(&self.state)?;
        self.kv
            .set(&tree_entry_key(&self.state.conversation_key), &raw)?;
        self.debouncer.clear();
        Ok(())
    }

    pub fn save_scroll(&mut self, offsets: ScrollOffsets) -> anyhow::Result<()> {
        prefs::save_scroll(&mut self.kv, &self.state.conversation_key, offsets)
    }

    pub fn load_scroll(&self) -> anyhow::Result<Option<ScrollOffsets>> {
        prefs::load_scroll(&self.kv, &self.state.conversation_key)
    }

    pub fn save_panel(&mut self, panel: PanelPrefs) -> anyhow::Result<()> {
        prefs::save_panel(&mut self.kv, panel)
    }

    pub fn load_panel(&self) -> anyhow::Result<Option<PanelPrefs>> {
        prefs::load_panel(&self.kv)
    }

    /// Flush and hand the underlying store back.
    pub fn into_store(mut self) -> anyhow::Result<K> {
        self.flush()?;
        Ok(self.kv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use trellis_core::ROOT_ID;
    use trellis_store::MemoryKvStore;

    fn pairs(n: usize) -> Vec<TurnPair> {
        (0..n)
            .map(|i| TurnPair::from_text(&format!("question {i}"), &format!("answer {i}")))
            .collect()
    }

    /// Page fake returning one scripted frame per extract call; the last
    /// frame repeats once the script runs out.
    struct ScriptedPage {
        frames: Vec<Vec<TurnPair>>,
        calls: usize,
        nudges: usize,
    }

    impl ScriptedPage {
        fn new(frames: Vec<Vec<TurnPair>>) -> Self {
            Self {
                frames,
                calls: 0,
                nudges: 0,
            }
        }
    }

    impl PageHost for ScriptedPage {
        fn extract_pairs(&mut self) -> Vec<TurnPair> {
            let idx = self.calls.min(self.frames.len() - 1);
            self.calls += 1;
            self.frames[idx].clone()
        }

        fn nudge(&mut self) {
            self.nudges += 1;
        }
    }

    fn node_id_for(state: &TreeState, linear_index: i64) -> NodeId {
        state
            .nodes
            .values()
            .find(|n| n.linear_index == linear_index)
            .map(|n| n.id.clone())
            .unwrap()
    }

    fn session() -> Session<MemoryKvStore> {
        Session::open(MemoryKvStore::new(), "conv")
    }

    #[test]
    fn sync_appends_without_retry_when_content_is_fresh() {
        let mut s = session();
        let mut page = ScriptedPage::new(vec![pairs(3)]);

        assert_eq!(s.sync(&mut page), ReconcileOutcome::Appended(3));
        assert_eq!(page.nudges, 0);
        assert_eq!(s.state().seen_linear_count, 3);
    }

    #[test]
    fn sync_retries_until_the_page_catches_up() {
        let mut s = session();
        s.sync(&mut ScriptedPage::new(vec![pairs(3)]));

        // Page first re-reports old content, then renders the new turn.
        let mut page = ScriptedPage::new(vec![pairs(3), pairs(4)]);
        assert_eq!(s.sync(&mut page), ReconcileOutcome::Appended(1));
        assert_eq!(page.nudges, 1);
    }

    #[test]
    fn sync_gives_up_silently_after_the_retry_budget() {
        let mut s = session();
        s.sync(&mut ScriptedPage::new(vec![pairs(3)]));

        let mut page = ScriptedPage::new(vec![pairs(1)]);
        assert_eq!(s.sync(&mut page), ReconcileOutcome::NotReady);
        assert_eq!(page.nudges, 2);
        assert_eq!(page.calls, 3);
        assert_eq!(s.state().seen_linear_count, 3);
    }

    #[test]
    fn destructive_ops_respect_tree_rules() {
        let mut s = session();
        s.sync(&mut ScriptedPage::new(vec![pairs(2)]));

        assert_eq!(
            s.delete_subtree(Confirmed, ROOT_ID).unwrap_err(),
            TreeError::RootForbidden
        );
        assert!(s.delete_subtree(Confirmed, "missing").is_err());
    }

    #[test]
    fn outline_rows_carry_render_flags() {
        let mut s = session();
        s.sync(&mut ScriptedPage::new(vec![pairs(3)]));
        let first = node_id_for(s.state(), 0);
        s.set_active(&first).unwrap();
        s.sync(&mut ScriptedPage::new(vec![pairs(5)]));

        let rows = s.outline();
        assert_eq!(rows.len(), 5);
        let row0 = rows.iter().find(|r| r.linear_index == 0).unwrap();
        assert!(row0.on_active_branch);
        let row1 = rows.iter().find(|r| r.linear_index == 1).unwrap();
        assert!(!row1.on_active_branch);

        s.focus_on_active();
        let rows = s.outline();
        let row1 = rows.iter().find(|r| r.linear_index == 1).unwrap();
        assert!(row1.collapsed);
        assert!(!rows.iter().any(|r| r.linear_index == 2));
    }

    #[test]
    fn snapshot_survives_reopen_without_markup() {
        let mut s = session();
        let mut page = ScriptedPage::new(vec![vec![TurnPair {
            user_text: "hello there".into(),
            user_html: "<p>hello there</p>".into(),
            assistant_text: "hi".into(),
            assistant_html: "<p>hi</p>".into(),
        }]]);
        s.sync(&mut page);
        let expected = codec::strip(s.state());

        let kv = s.into_store().unwrap();
        let reopened = Session::open(kv, "conv");
        assert_eq!(reopened.state(), &expected);
        assert!(reopened
            .state()
            .nodes
            .values()
            .all(|n| n.user_html.is_empty() && n.assistant_html.is_empty()));
    }

    #[test]
    fn file_backed_store_survives_process_boundaries() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = trellis_store::FileKvStore::new(tmp.path());
            let mut s = Session::open(store, "conv");
            s.sync(&mut ScriptedPage::new(vec![pairs(2)]));
            s.flush().unwrap();
        }
        let reopened = Session::open(trellis_store::FileKvStore::new(tmp.path()), "conv");
        assert_eq!(reopened.state().seen_linear_count, 2);
        assert_eq!(reopened.state().nodes.len(), 3);
    }

    #[test]
    fn corrupt_snapshot_starts_fresh() {
        let mut kv = MemoryKvStore::new();
        kv.set(&tree_entry_key("conv"), "{definitely broken").unwrap();

        let s = Session::open(kv, "conv");
        assert_eq!(s.state().nodes.len(), 1);
        assert_eq!(s.active_id(), ROOT_ID);
    }

    #[test]
    fn switch_flushes_and_loads_the_other_conversation() {
        let mut s = session();
        s.sync(&mut ScriptedPage::new(vec![pairs(2)]));

        s.switch("other-conv").unwrap();
        assert_eq!(s.conversation_key(), "other-conv");
        assert_eq!(s.state().nodes.len(), 1);

        // The first conversation was flushed on the way out.
        s.switch("conv").unwrap();
        assert_eq!(s.state().seen_linear_count, 2);
        assert_eq!(s.state().nodes.len(), 3);
    }

    #[test]
    fn flush_if_due_waits_out_the_quiet_window() {
        let mut s = session().with_quiet_window(Duration::from_millis(30));
        s.sync(&mut ScriptedPage::new(vec![pairs(1)]));

        assert!(!s.flush_if_due().unwrap());
        std::thread::sleep(Duration::from_millis(40));
        assert!(s.flush_if_due().unwrap());
        // Clean again: nothing more to write.
        assert!(!s.flush_if_due().unwrap());
    }

    #[test]
    fn align_keeps_seen_count_monotone() {
        let mut s = session();
        s.sync(&mut ScriptedPage::new(vec![pairs(5)]));

        s.align(Confirmed, &pairs(3));
        assert_eq!(s.state().seen_linear_count, 5);
        assert_eq!(s.path_to_root().len(), 3);
    }

    #[test]
    fn scroll_and_panel_prefs_round_trip() {
        let mut s = session();
        assert_eq!(s.load_scroll().unwrap(), None);
        let offsets = ScrollOffsets {
            left_top: 10.0,
            right_top: 20.0,
            right_left: 0.0,
        };
        s.save_scroll(offsets).unwrap();
        assert_eq!(s.load_scroll().unwrap(), Some(offsets));

        let panel = PanelPrefs {
            width: 340.0,
            height: 520.0,
        };
        s.save_panel(panel).unwrap();
        assert_eq!(s.load_panel().unwrap(), Some(panel));
    }

    /// The end-to-end shape: grow, branch, delete, re-align.
    #[test]
    fn branch_delete_align_scenario() {
        let mut s = session();

        // Three turns chain under root.
        s.sync(&mut ScriptedPage::new(vec![pairs(3)]));
        assert_eq!(s.state().seen_linear_count, 3);
        let active = s.state().node(s.active_id()).unwrap();
        assert_eq!(active.linear_index, 2);

        // Select turn 0, observe five pairs: 3 and 4 branch under it.
        let first = node_id_for(s.state(), 0);
        s.set_active(&first).unwrap();
        s.sync(&mut ScriptedPage::new(vec![pairs(5)]));
        assert_eq!(s.state().seen_linear_count, 5);
        let n3 = node_id_for(s.state(), 3);
        assert_eq!(s.state().node(&n3).unwrap().parent_id, first);

        // Delete turn 0's subtree: cursor falls back to root, counter holds.
        s.delete_subtree(Confirmed, &first).unwrap();
        assert_eq!(s.active_id(), ROOT_ID);
        assert_eq!(s.state().seen_linear_count, 5);
        s.state().check_integrity().unwrap();

        // Deleted turns never come back.
        assert_eq!(
            s.sync(&mut ScriptedPage::new(vec![pairs(5)])),
            ReconcileOutcome::NoNew
        );
        assert_eq!(s.state().nodes.len(), 1);

        // Align rebuilds the full linear chain, deterministically.
        s.align(Confirmed, &pairs(5));
        let chain: Vec<i64> = s.path_to_root().iter().map(|n| n.linear_index).collect();
        assert_eq!(chain, vec![0, 1, 2, 3, 4]);
        assert_eq!(
            s.state().node(s.active_id()).unwrap().linear_index,
            4
        );
        let again = align("conv", &pairs(5));
        assert_eq!(s.state().nodes, again.nodes);
    }
}
