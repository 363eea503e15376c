use serde::{Deserialize, Serialize};
use trellis_core::{TreeState, ROOT_ID};

/// Current schema version for stored snapshots.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// On-disk envelope around a stripped tree snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub saved_at: String,
    pub tree: TreeState,
}

/// Clone `state` with every node's markup fields zeroed. Markup is large
/// and re-derivable from the live page; durable storage never holds it.
pub fn strip(state: &TreeState) -> TreeState {
    let mut out = state.clone();
    for node in out.nodes.values_mut() {
        node.user_html.clear();
        node.assistant_html.clear();
    }
    out
}

/// Serialize a stripped snapshot of `state`.
pub fn encode(state: &TreeState) -> anyhow::Result<String> {
    let snapshot = Snapshot {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        saved_at: now_rfc3339(),
        tree: strip(state),
    };
    Ok(serde_json::to_string(&snapshot)?)
}

/// Decode a stored snapshot. Missing `collapsed_ids` (older format) decodes
/// as empty; a payload without a root node is rejected. Callers treat any
/// error as "no snapshot" and start fresh.
pub fn decode(raw: &str) -> anyhow::Result<TreeState> {
    let snapshot: Snapshot = serde_json::from_str(raw)?;
    if !snapshot.tree.nodes.contains_key(ROOT_ID) {
        anyhow::bail!("snapshot has no root node");
    }
    snapshot.tree.check_integrity()?;
    Ok(snapshot.tree)
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
