//! Small helpers shared by the injectors and the audio session.

use std::borrow::Cow;

use memchr::memmem;

/// Milliseconds since the Unix epoch, used to stamp playback sessions.
#[cfg(not(target_arch = "wasm32"))]
pub fn time_now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

/// Milliseconds since the Unix epoch, from the browser clock.
#[cfg(target_arch = "wasm32")]
pub fn time_now_millis() -> u64 {
    js_sys::Date::now() as u64
}

/// Decode a chapter file.
///
/// Valid UTF-8 (with or without BOM) wins. Otherwise the caller's
/// `encoding` label is used when it names a known encoding, and
/// Windows-1251 when it doesn't; older chapters were saved from Cyrillic
/// Windows editors.
pub fn decode_text<'a>(bytes: &'a [u8], encoding: Option<&str>) -> Cow<'a, str> {
    let (utf8, _, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return utf8;
    }

    let fallback = encoding
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::WINDOWS_1251);
    fallback.decode(bytes).0
}

/// Make a media path relative to the app root unless it is already rooted.
///
/// `audio/a.mp3` becomes `./audio/a.mp3`; `/a.mp3`, `./a.mp3` and
/// `http(s)://…` are kept as they are.
pub fn normalize_media_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') || path.starts_with("./") || path.starts_with("http") {
        path.to_string()
    } else {
        format!("./{path}")
    }
}

/// Clamp a control fraction to `[0, 1]`; NaN counts as 0.
pub fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Format seconds as `m:ss`; unknown or non-positive values show `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Split `"Artist — Title"` into its parts; no separator means no artist.
pub fn split_track_info(track: &str) -> (String, String) {
    match track.split_once(" — ") {
        Some((artist, title)) => (artist.to_string(), title.to_string()),
        None => (String::new(), track.to_string()),
    }
}

/// Byte offset of the first literal occurrence of `needle` in `haystack`.
///
/// Both are valid UTF-8, so a match always starts on a char boundary.
pub fn find_literal(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    memmem::find(haystack.as_bytes(), needle.as_bytes())
}

/// Whether `haystack` contains `needle` literally.
pub fn contains_literal(haystack: &str, needle: &str) -> bool {
    find_literal(haystack, needle).is_some()
}
