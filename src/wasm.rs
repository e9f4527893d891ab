//! WASM bindings for in-browser chapter rendering.
//!
//! Rule documents are passed as the same JSON text the app serves from
//! `config/`. A malformed document is treated as empty, as on native.

use wasm_bindgen::prelude::*;

use crate::audio::AudioSession;
use crate::dom::{chapter_title as first_h2, parse_html};
use crate::inject::{HintInjector, MediaInjector};
use crate::reader::Reader;
use crate::rules::RuleStore;
use crate::tooltip::TooltipController;
use crate::util::decode_text;

/// Initialize panic hook for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Wrap hint text of `chapter` in `<u data-hint>` markers.
#[wasm_bindgen]
pub fn inject_hints(html: &str, chapter: u32, hints_json: &str) -> String {
    let rules = RuleStore::from_json(None, Some(hints_json));
    HintInjector::new().inject(html, chapter, rules.hints()).html
}

/// Insert audio players and images of `chapter` next to their anchors.
#[wasm_bindgen]
pub fn inject_media(html: &str, chapter: u32, media_json: &str) -> String {
    let rules = RuleStore::from_json(Some(media_json), None);
    MediaInjector::new().inject(html, chapter, rules.media()).html
}

/// Hints first, then media, exactly as the native reader renders.
#[wasm_bindgen]
pub fn render_chapter(html: &str, chapter: u32, media_json: &str, hints_json: &str) -> String {
    let rules = RuleStore::from_json(Some(media_json), Some(hints_json));
    Reader::new(rules, AudioSession::new(), TooltipController::new(false))
        .render_chapter(html, chapter)
        .html
}

/// Decode raw chapter bytes (UTF-8, falling back to Windows-1251).
#[wasm_bindgen]
pub fn decode_chapter(data: &[u8]) -> String {
    decode_text(data, None).into_owned()
}

/// Display title: first `<h2>`, or `Глава <n>`.
#[wasm_bindgen]
pub fn chapter_title(html: &str, chapter: u32) -> String {
    first_h2(&parse_html(html)).unwrap_or_else(|| format!("Глава {chapter}"))
}
