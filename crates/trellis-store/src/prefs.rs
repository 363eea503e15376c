use crate::{scroll_entry_key, KvStore, PANEL_ENTRY_KEY};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Stored scroll positions for the overlay panes, one entry per
/// conversation. All offsets are clamped non-negative on save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollOffsets {
    pub left_top: f64,
    pub right_top: f64,
    pub right_left: f64,
}

impl ScrollOffsets {
    fn clamped(self) -> Self {
        Self {
            left_top: self.left_top.max(0.0),
            right_top: self.right_top.max(0.0),
            right_left: self.right_left.max(0.0),
        }
    }
}

/// User-adjustable overlay panel size, one entry per user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelPrefs {
    pub width: f64,
    pub height: f64,
}

pub fn save_scroll<K: KvStore + ?Sized>(
    kv: &mut K,
    conversation_key: &str,
    offsets: ScrollOffsets,
) -> anyhow::Result<()> {
    let raw = serde_json::to_string(&offsets.clamped())?;
    kv.set(&scroll_entry_key(conversation_key), &raw)
}

/// Load stored scroll offsets. Malformed entries read as absent.
pub fn load_scroll<K: KvStore + ?Sized>(
    kv: &K,
    conversation_key: &str,
) -> anyhow::Result<Option<ScrollOffsets>> {
    let raw = match kv.get(&scroll_entry_key(conversation_key))? {
        Some(raw) => raw,
        None => return Ok(None),
    };
    match serde_json::from_str(&raw) {
        Ok(offsets) => Ok(Some(offsets)),
        Err(err) => {
            warn!(%err, "discarding malformed scroll entry");
            Ok(None)
        }
    }
}

pub fn save_panel<K: KvStore + ?Sized>(kv: &mut K, prefs: PanelPrefs) -> anyhow::Result<()> {
    let raw = serde_json::to_string(&prefs)?;
    kv.set(PANEL_ENTRY_KEY, &raw)
}

/// Load the stored panel size. Malformed entries read as absent.
pub fn load_panel<K: KvStore + ?Sized>(kv: &K) -> anyhow::Result<Option<PanelPrefs>> {
    let raw = match kv.get(PANEL_ENTRY_KEY)? {
        Some(raw) => raw,
        None => return Ok(None),
    };
    match serde_json::from_str(&raw) {
        Ok(prefs) => Ok(Some(prefs)),
        Err(err) => {
            warn!(%err, "discarding malformed panel entry");
            Ok(None)
        }
    }
}
