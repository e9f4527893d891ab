//! Rule store: media and hint rules loaded from JSON configuration.
//!
//! Two documents feed the store, `{ "media": [...] }` and
//! `{ "hints": [...] }`. Loading never fails the caller: a missing or
//! malformed document degrades to an empty rule set, and a malformed entry
//! is dropped without taking its siblings with it.

mod model;

pub use model::{HintRule, MediaKind, MediaRule, PlayerStyle, Position};

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Default location of the media rules relative to the app root.
pub const MEDIA_CONFIG_PATH: &str = "config/media-rules.json";

/// Default location of the hint rules relative to the app root.
pub const HINT_CONFIG_PATH: &str = "config/hint-rules.json";

/// In-memory rule lists, immutable after load.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    media: Vec<MediaRule>,
    hints: Vec<HintRule>,
}

impl RuleStore {
    pub fn new(media: Vec<MediaRule>, hints: Vec<HintRule>) -> Self {
        Self { media, hints }
    }

    /// Load both documents from disk. Missing files yield empty lists.
    pub fn load(media_path: impl AsRef<Path>, hints_path: impl AsRef<Path>) -> Self {
        Self::new(load_media_rules(media_path), load_hint_rules(hints_path))
    }

    /// Load the default documents under an app root directory.
    pub fn load_from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::load(root.join(MEDIA_CONFIG_PATH), root.join(HINT_CONFIG_PATH))
    }

    /// Build from in-memory JSON documents (either may be absent).
    pub fn from_json(media_json: Option<&str>, hints_json: Option<&str>) -> Self {
        let media = media_json
            .map(|json| rules_or_empty(parse_rules(json, "media"), "media"))
            .unwrap_or_default();
        let hints = hints_json
            .map(|json| rules_or_empty(parse_rules(json, "hints"), "hints"))
            .unwrap_or_default();
        Self::new(media, hints)
    }

    pub fn media(&self) -> &[MediaRule] {
        &self.media
    }

    pub fn hints(&self) -> &[HintRule] {
        &self.hints
    }

    /// Media rules for one chapter, in declaration order.
    pub fn media_for_chapter(&self, chapter: u32) -> Vec<&MediaRule> {
        self.media.iter().filter(|r| r.chapter == chapter).collect()
    }

    /// Hint rules for one chapter, in declaration order.
    pub fn hints_for_chapter(&self, chapter: u32) -> Vec<&HintRule> {
        self.hints.iter().filter(|r| r.chapter == chapter).collect()
    }

    /// Audio source paths (normalized) referenced by a chapter's rules.
    pub fn audio_paths_for_chapter(&self, chapter: u32) -> Vec<String> {
        self.media_for_chapter(chapter)
            .into_iter()
            .filter(|r| r.kind == MediaKind::Audio)
            .filter_map(MediaRule::primary_source)
            .collect()
    }
}

/// Load media rules; failures log a warning and return an empty list.
pub fn load_media_rules(path: impl AsRef<Path>) -> Vec<MediaRule> {
    load_rules(path.as_ref(), "media")
}

/// Load hint rules; failures log a warning and return an empty list.
pub fn load_hint_rules(path: impl AsRef<Path>) -> Vec<HintRule> {
    load_rules(path.as_ref(), "hints")
}

fn load_rules<T: DeserializeOwned>(path: &Path, key: &str) -> Vec<T> {
    let rules = try_load_rules(path, key);
    if let Ok(list) = &rules {
        info!("Loaded {} {} rules from {}", list.len(), key, path.display());
    }
    rules_or_empty(rules, key)
}

/// Load a rule document, surfacing I/O and JSON errors.
pub fn try_load_rules<T: DeserializeOwned>(path: &Path, key: &str) -> Result<Vec<T>> {
    let json = fs::read_to_string(path)?;
    parse_rules(&json, key)
}

fn rules_or_empty<T>(rules: Result<Vec<T>>, key: &str) -> Vec<T> {
    rules.unwrap_or_else(|e| {
        warn!("No {key} rules loaded: {e}");
        Vec::new()
    })
}

/// Parse `{ "<key>": [...] }`, skipping entries that don't deserialize.
pub fn parse_rules<T: DeserializeOwned>(json: &str, key: &str) -> Result<Vec<T>> {
    let doc: Value = serde_json::from_str(json)?;
    let entries = match doc.get(key) {
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(Error::InvalidRule(format!(
                "\"{key}\" is not an array"
            )));
        }
        None => return Ok(Vec::new()),
    };

    let mut rules = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match serde_json::from_value::<T>(entry.clone()) {
            Ok(rule) => rules.push(rule),
            Err(e) => warn!("Skipping {key} rule #{index}: {e}"),
        }
    }
    Ok(rules)
}
