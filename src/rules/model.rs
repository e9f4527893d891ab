//! Declarative media and hint rules.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::normalize_media_path;

/// Kind of media a rule injects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Image,
    /// Any other `type` value; skipped at injection time.
    #[serde(other)]
    Unknown,
}

/// Where the media node goes relative to the anchor paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Before,
    /// Anything that is not `before` lands after the anchor.
    #[default]
    #[serde(other)]
    After,
}

/// Visual form of an injected audio player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStyle {
    /// Full transport: play, progress, time, mute and volume.
    #[default]
    Full,
    /// Compact play button with track info; pauses in place when superseded.
    Launcher,
}

/// A media overlay bound to an anchor paragraph of one chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub chapter: u32,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub anchor: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub src: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(default)]
    pub player: PlayerStyle,
}

impl MediaRule {
    /// Check the rule's structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.anchor.is_empty() {
            return Err(Error::InvalidRule(format!(
                "media rule in chapter {} has an empty anchor",
                self.chapter
            )));
        }
        if self.src.iter().all(|s| s.trim().is_empty()) {
            return Err(Error::InvalidRule(format!(
                "media rule for anchor {:?} has no source paths",
                self.anchor
            )));
        }
        if self.kind == MediaKind::Unknown {
            return Err(Error::InvalidRule(format!(
                "media rule for anchor {:?} has an unknown type",
                self.anchor
            )));
        }
        Ok(())
    }

    /// First non-blank source, normalized.
    pub fn primary_source(&self) -> Option<String> {
        self.src
            .iter()
            .find(|s| !s.trim().is_empty())
            .map(|s| normalize_media_path(s))
    }

    /// The rule's id, or a stable fallback derived from its chapter slot.
    pub fn media_id(&self, index: usize) -> String {
        match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("media-{}-{}", self.chapter, index + 1),
        }
    }
}

/// A tooltip hint attached to a literal text span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintRule {
    pub chapter: u32,
    pub text: String,
    pub hint: String,
}

impl HintRule {
    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(Error::InvalidRule(format!(
                "hint rule in chapter {} has empty text",
                self.chapter
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_rule_defaults() {
        let rule: MediaRule = serde_json::from_str(
            r#"{"chapter": 3, "type": "audio", "anchor": "Погода была ясной", "src": ["audio/rain.mp3"]}"#,
        )
        .unwrap();
        assert_eq!(rule.position, Position::After);
        assert_eq!(rule.player, PlayerStyle::Full);
        assert_eq!(rule.media_id(0), "media-3-1");
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_unknown_kind_and_position() {
        let rule: MediaRule = serde_json::from_str(
            r#"{"id": "v1", "chapter": 1, "type": "video", "anchor": "a", "position": "inside", "src": ["v.mp4"]}"#,
        )
        .unwrap();
        assert_eq!(rule.kind, MediaKind::Unknown);
        assert_eq!(rule.position, Position::After);
        assert_eq!(rule.media_id(4), "v1");
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_invalid_media_rules() {
        let mut rule: MediaRule = serde_json::from_str(
            r#"{"chapter": 1, "type": "image", "anchor": "", "src": ["a.png"]}"#,
        )
        .unwrap();
        assert!(matches!(rule.validate(), Err(Error::InvalidRule(_))));

        rule.anchor = "текст".to_string();
        rule.src = vec![" ".to_string()];
        assert!(matches!(rule.validate(), Err(Error::InvalidRule(_))));
    }

    #[test]
    fn test_launcher_style_parses() {
        let rule: MediaRule = serde_json::from_str(
            r#"{"chapter": 2, "type": "audio", "anchor": "x", "src": ["t.mp3"], "player": "launcher"}"#,
        )
        .unwrap();
        assert_eq!(rule.player, PlayerStyle::Launcher);
    }
}
