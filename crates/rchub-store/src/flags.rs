//! Transfer flags accepted from callers and forwarded to the agent
//!
//! Only the options listed in [`TransferFlags::RECOGNIZED`] ever reach an
//! agent. Anything else a caller sends is dropped when the flag map is parsed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bandwidth limit: either an rclone rate spec (`"10M"`, `"off"`,
/// `"08:00,512k 19:00,off"`) or a plain bytes-per-second integer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BwLimit {
    BytesPerSec(u64),
    Spec(String),
}

/// Options that may be passed through to a copy/move/sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFlags {
    /// Compare files by checksum instead of size and modification time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<bool>,

    /// Compare files by size only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_only: Option<bool>,

    /// Number of file transfers to run in parallel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfers: Option<u32>,

    /// Number of checkers to run in parallel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkers: Option<u32>,

    /// Bandwidth limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bwlimit: Option<BwLimit>,

    /// Report what would be transferred without changing anything
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,

    /// Skip files that already exist on the destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_existing: Option<bool>,

    /// Use recursive listing on remotes that support it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_list: Option<bool>,
}

impl TransferFlags {
    /// Caller-facing names of every recognized option
    pub const RECOGNIZED: [&'static str; 8] = [
        "checksum",
        "sizeOnly",
        "transfers",
        "checkers",
        "bwlimit",
        "dryRun",
        "ignoreExisting",
        "fastList",
    ];

    /// Parse a caller-supplied flag map
    ///
    /// Unrecognized keys are dropped and returned alongside the parsed flags.
    /// A recognized key with a value of the wrong type is an error.
    pub fn from_map(map: &Map<String, Value>) -> Result<(Self, Vec<String>), serde_json::Error> {
        let mut recognized = Map::new();
        let mut dropped = Vec::new();

        for (key, value) in map {
            if Self::RECOGNIZED.contains(&key.as_str()) {
                recognized.insert(key.clone(), value.clone());
            } else {
                dropped.push(key.clone());
            }
        }

        let flags = serde_json::from_value(Value::Object(recognized))?;
        Ok((flags, dropped))
    }

    /// Set options as a JSON object (unset options are omitted)
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
