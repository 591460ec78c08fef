//! Data models shared across the scraper pipeline

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// A channel normalized out of the W3U source playlist.
///
/// Built by the W3U parser with `qualities` empty; the manifest resolver
/// fills `qualities` in. The backup master URL is not stored here — it is
/// derived from the publish base URL and `tvg_id` at assembly time.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    /// Normalized identifier: epgId if present, else the name, else
    /// "no_epg_id"; spaces replaced with hyphens, lowercased.
    pub tvg_id: String,
    pub logo_url: String,
    pub group_title: String,
    /// Primary HLS master URL. `None` when the station carried no URL
    /// or the "# no_url" sentinel.
    pub stream_url: Option<String>,
    pub qualities: Vec<Quality>,
}

/// One variant stream from an HLS master manifest.
///
/// Attributes are keyed deterministically (sorted) so manifest re-emission
/// and JSON output are stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quality {
    pub url: String,
    pub attributes: BTreeMap<String, String>,
}

/// A single guide programme retained for a channel.
///
/// Start/stop keep the raw XMLTV timestamp strings (`YYYYMMDDHHMMSS +ZZZZ`)
/// so the guide can be re-emitted unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramEntry {
    pub start_time: String,
    pub stop_time: String,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// Channel identifier -> future programmes, in guide document order.
/// Every parsed channel has an entry, possibly empty.
pub type EpgMap = HashMap<String, Vec<ProgramEntry>>;
