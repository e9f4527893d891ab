//! # litoverlay
//!
//! Reading-engine core for serialized fiction published as HTML chapters.
//!
//! ## Features
//!
//! - Declarative media and hint rules loaded from JSON
//! - Anchor-based injection of audio players, launchers, image stacks and
//!   captions into chapter markup
//! - Hint markers wrapped around literal text, matched on text nodes only
//! - A single audio session across all players and chapter navigation
//! - Tooltip placement and rebind hooks for the page host
//!
//! ## Quick Start
//!
//! ```
//! use litoverlay::{inject_media, RuleStore};
//!
//! let rules = RuleStore::from_json(
//!     Some(r#"{"media": [{"id": "rain", "chapter": 3, "type": "audio",
//!         "anchor": "Погода была ясной", "src": ["audio/rain.mp3"]}]}"#),
//!     None,
//! );
//! let html = inject_media("<p>Погода была ясной.</p>", 3, rules.media());
//! assert!(html.starts_with(r#"<p>Погода была ясной.</p><div class="media-container" data-media-id="rain""#));
//! ```
//!
//! ## Reading Chapters
//!
//! [`Reader`] ties the pieces together: it renders chapters (hints first,
//! then media), mounts them, rebinds the [`AudioSession`] to the new players
//! and stops audio on page lifecycle events.
//!
//! ```
//! use litoverlay::{AudioSession, Reader, RuleStore, TooltipController};
//!
//! let reader = Reader::new(RuleStore::default(), AudioSession::new(), TooltipController::new(false));
//! let chapter = reader.render_chapter("<p>Текст главы</p>", 12);
//! assert_eq!(chapter.title, "Глава 12");
//! assert_eq!(chapter.html, "<p>Текст главы</p>");
//! ```

pub mod audio;
pub mod dom;
pub mod error;
pub mod inject;
pub mod reader;
pub mod rebind;
pub mod rules;
pub mod tooltip;
pub(crate) mod util;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use audio::{AudioSession, MediaElement, MediaFactory, TrackId, TrackMeta};
pub use error::{Error, PlaybackError, Result};
pub use inject::{InjectionReport, RuleOutcome, inject_hints, inject_media};
pub use reader::{Reader, RenderedChapter};
pub use rebind::{ChapterRebinder, IconTheme};
pub use rules::{HintRule, MediaRule, RuleStore};
pub use tooltip::TooltipController;
pub use util::decode_text;
