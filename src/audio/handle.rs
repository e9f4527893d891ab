//! Track handles: one per logical audio track, keyed by source path.

use std::fmt;

use super::element::MediaElement;
use crate::dom::NodeId;
use crate::rules::PlayerStyle;

/// Stable track identity: the normalized source path, or a generated
/// `audio-<n>` for players without one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where a track's player lives in a mounted chapter.
///
/// Only valid for the mount generation it was taken in; the chapter DOM is
/// replaced wholesale on navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountRef {
    pub generation: u64,
    pub node: NodeId,
}

/// Per-track playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Registered, never started, or ended and rewound.
    #[default]
    Idle,
    Playing,
    Paused,
}

/// What a player in the page tells the coordinator about its track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMeta {
    /// Source path; `None` gets a generated id.
    pub path: Option<String>,
    pub title: String,
    pub style: PlayerStyle,
    pub mount: Option<MountRef>,
}

impl TrackMeta {
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn launcher(mut self) -> Self {
        self.style = PlayerStyle::Launcher;
        self
    }

    pub fn mounted(mut self, mount: MountRef) -> Self {
        self.mount = Some(mount);
        self
    }
}

/// The coordinator's record of one track.
pub struct AudioTrackHandle {
    pub(crate) id: TrackId,
    pub(crate) media: Box<dyn MediaElement>,
    pub(crate) title: String,
    pub(crate) source_path: String,
    pub(crate) mount: Option<MountRef>,
    pub(crate) style: PlayerStyle,
    pub(crate) state: TrackState,
}

impl AudioTrackHandle {
    pub(crate) fn new(id: TrackId, media: Box<dyn MediaElement>, meta: TrackMeta) -> Self {
        let source_path = meta.path.unwrap_or_else(|| id.as_str().to_string());
        let state = if media.is_paused() {
            TrackState::Idle
        } else {
            TrackState::Playing
        };
        Self {
            id,
            media,
            title: meta.title,
            source_path,
            mount: meta.mount,
            style: meta.style,
            state,
        }
    }

    pub fn id(&self) -> &TrackId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn mount(&self) -> Option<MountRef> {
        self.mount
    }

    pub fn style(&self) -> PlayerStyle {
        self.style
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn media(&self) -> &dyn MediaElement {
        self.media.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        !self.media.is_paused()
    }

    /// Refresh metadata from a rebind; the resource is kept.
    pub(crate) fn refresh(&mut self, meta: TrackMeta) {
        self.title = meta.title;
        self.style = meta.style;
        self.mount = meta.mount;
        if let Some(path) = meta.path {
            self.source_path = path;
        }
    }

    /// Stop because another track took over: full players rewind,
    /// launchers keep their position.
    pub(crate) fn supersede(&mut self) {
        if self.is_playing() {
            self.media.pause();
        }
        if self.style == PlayerStyle::Full {
            self.media.set_current_time(0.0);
        }
        if self.state == TrackState::Playing {
            self.state = TrackState::Paused;
        }
    }

    /// Played to the end: back to `Idle` at position 0.
    pub(crate) fn rewind(&mut self) {
        if self.is_playing() {
            self.media.pause();
        }
        self.media.set_current_time(0.0);
        self.state = TrackState::Idle;
    }
}

impl fmt::Debug for AudioTrackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioTrackHandle")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("source_path", &self.source_path)
            .field("mount", &self.mount)
            .field("style", &self.style)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
