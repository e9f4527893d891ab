//! Media injection: audio players, launchers and image stacks.
//!
//! The generated markup is what the rebind hook later discovers:
//!
//! ```text
//! div.media-container[data-media-id][data-type]
//!   div.audio-player-container
//!     div.custom-audio-player[data-audio-path]   (+ .audio-launcher)
//! ```

use log::{debug, warn};

use super::anchor::{anchor_paragraphs, find_anchor};
use super::{InjectionReport, Injected, RuleOutcome};
use crate::dom::{ChapterDom, NodeId, body_html, parse_html};
use crate::rules::{MediaKind, MediaRule, PlayerStyle, Position};
use crate::util::normalize_media_path;

const PLAY_ICON: &str = "M8 5v14l11-7z";
const PAUSE_ICON: &str = "M6 19h4V5H6v14zm8-14v14h4V5h-4z";
const VOLUME_ICON: &str = "M3 9v6h4l5 5V4L7 9H3zm13.5 3c0-1.77-1.02-3.29-2.5-4.03v8.05c1.48-.73 2.5-2.25 2.5-4.02zM14 3.23v2.06c2.89.86 5 3.54 5 6.71s-2.11 5.85-5 6.71v2.06c4.01-.91 7-4.49 7-8.77s-2.99-7.86-7-8.77z";
const MUTED_ICON: &str = "M16.5 12c0-1.77-1.02-3.29-2.5-4.03v2.21l2.45 2.45c.03-.2.05-.41.05-.63zm2.5 0c0 .94-.2 1.82-.54 2.64l1.51 1.51C20.63 14.91 21 13.5 21 12c0-4.28-2.99-7.86-7-8.77v2.06c2.89.86 5 3.54 5 6.71zM4.27 3L3 4.27 7.73 9H3v6h4l5 5v-6.73l4.25 4.25c-.67.52-1.42.93-2.25 1.18v2.06c1.38-.31 2.63-.95 3.69-1.81L19.73 21 21 19.73l-9-9L4.27 3zM12 4L9.91 6.09 12 8.18V4z";

const HIDDEN: &str = "display: none;";
const DEFAULT_TRACK_TITLE: &str = "Аудиофайл";

/// Answers whether a media file is reachable, so broken images can be
/// marked at render time instead of in the browser.
pub trait AssetProbe {
    fn exists(&self, path: &str) -> bool;
}

impl<F> AssetProbe for F
where
    F: Fn(&str) -> bool,
{
    fn exists(&self, path: &str) -> bool {
        self(path)
    }
}

/// Applies media rules to chapter markup.
#[derive(Default)]
pub struct MediaInjector<'p> {
    probe: Option<&'p dyn AssetProbe>,
}

impl<'p> MediaInjector<'p> {
    pub fn new() -> Self {
        Self { probe: None }
    }

    /// Check image sources with `probe`; missing ones get the error marker.
    pub fn with_probe(probe: &'p dyn AssetProbe) -> Self {
        Self { probe: Some(probe) }
    }

    /// Inject every rule of `chapter` into `html`, in declaration order.
    pub fn inject(&self, html: &str, chapter: u32, rules: &[MediaRule]) -> Injected {
        let chapter_rules: Vec<&MediaRule> = rules.iter().filter(|r| r.chapter == chapter).collect();
        let mut report = InjectionReport::default();

        if chapter_rules.is_empty() {
            return Injected::unchanged(html, report);
        }

        let mut dom = parse_html(html);
        let paragraphs = anchor_paragraphs(&dom);

        for (index, rule) in chapter_rules.into_iter().enumerate() {
            let label = rule.media_id(index);
            let outcome = self.apply_rule(&mut dom, &paragraphs, rule, index);
            match &outcome {
                RuleOutcome::Applied => debug!("Injected media {label} in chapter {chapter}"),
                RuleOutcome::AnchorNotFound => warn!(
                    "Media rule anchor not found: {:?} in chapter {chapter}",
                    rule.anchor
                ),
                other => warn!("Skipping media rule {label}: {other:?}"),
            }
            report.push(label, outcome);
        }

        if report.applied() == 0 {
            return Injected::unchanged(html, report);
        }

        Injected {
            html: body_html(&dom),
            report,
        }
    }

    fn apply_rule(
        &self,
        dom: &mut ChapterDom,
        paragraphs: &[NodeId],
        rule: &MediaRule,
        index: usize,
    ) -> RuleOutcome {
        if let Err(e) = rule.validate() {
            return RuleOutcome::MediaCreationFailed(e.to_string());
        }

        let Ok(anchor) = find_anchor(dom, paragraphs, &rule.anchor) else {
            return RuleOutcome::AnchorNotFound;
        };

        let media = match rule.kind {
            MediaKind::Audio => build_audio(dom, rule, index),
            MediaKind::Image => self.build_images(dom, rule, index),
            MediaKind::Unknown => return RuleOutcome::MediaCreationFailed("unknown media type".into()),
        };

        match rule.position {
            Position::Before => dom.insert_before(anchor, media),
            Position::After => dom.insert_after(anchor, media),
        }

        if let Some(description) = rule.description.as_deref().filter(|d| !d.is_empty()) {
            let caption = dom.element("div", &[("class", "media-caption")]);
            let text = dom.create_text(description.to_string());
            dom.append(caption, text);
            dom.insert_after(media, caption);
        }

        RuleOutcome::Applied
    }

    fn build_images(&self, dom: &mut ChapterDom, rule: &MediaRule, index: usize) -> NodeId {
        let media_id = rule.media_id(index);
        let style = size_style(rule);

        let mut attrs = vec![
            ("class", "media-container"),
            ("data-media-id", media_id.as_str()),
            ("data-type", "image"),
        ];
        if let Some(style) = &style {
            attrs.push(("style", style.as_str()));
        }
        let container = dom.element("div", &attrs);

        let sources: Vec<String> = rule
            .src
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| normalize_media_path(s))
            .collect();

        for (i, path) in sources.iter().enumerate() {
            let alt = match &rule.alt {
                Some(alt) => alt.clone(),
                None => format!("Изображение {media_id} - {}", i + 1),
            };
            let mut img_attrs = vec![
                ("src", path.as_str()),
                ("alt", alt.as_str()),
                ("class", "media-image"),
            ];
            if let Some(style) = &style {
                img_attrs.push(("style", style.as_str()));
            }
            let img = dom.element("img", &img_attrs);
            dom.append(container, img);

            if let Some(probe) = self.probe
                && !probe.exists(path)
            {
                warn!("Failed to load image: {path}");
                mark_image_failed(dom, img);
            }

            if i + 1 < sources.len() {
                let spacer = dom.element("div", &[("style", "height: 1rem;")]);
                dom.append(container, spacer);
            }
        }

        container
    }
}

/// Inject media rules for `chapter`; returns the new HTML only.
pub fn inject_media(html: &str, chapter: u32, rules: &[MediaRule]) -> String {
    MediaInjector::new().inject(html, chapter, rules).html
}

fn size_style(rule: &MediaRule) -> Option<String> {
    let mut style = String::new();
    if let Some(width) = &rule.width {
        style.push_str(&format!("width: {width};"));
    }
    if let Some(height) = &rule.height {
        if !style.is_empty() {
            style.push(' ');
        }
        style.push_str(&format!("height: {height};"));
    }
    (!style.is_empty()).then_some(style)
}

fn build_audio(dom: &mut ChapterDom, rule: &MediaRule, index: usize) -> NodeId {
    let media_id = rule.media_id(index);
    let path = rule.primary_source().unwrap_or_default();
    let title = rule.title.as_deref().unwrap_or(DEFAULT_TRACK_TITLE);

    let container = dom.element(
        "div",
        &[
            ("class", "media-container"),
            ("data-media-id", media_id.as_str()),
            ("data-type", "audio"),
        ],
    );
    let wrapper = dom.element("div", &[("class", "audio-player-container")]);
    dom.append(container, wrapper);

    let player = match rule.player {
        PlayerStyle::Full => build_full_player(dom, &path, title),
        PlayerStyle::Launcher => build_launcher(dom, &path, title),
    };
    dom.append(wrapper, player);
    container
}

fn icon(dom: &mut ChapterDom, class: &str, size: &str, d: &str, hidden: bool) -> NodeId {
    let mut attrs = vec![
        ("class", class),
        ("width", size),
        ("height", size),
        ("viewBox", "0 0 24 24"),
    ];
    if hidden {
        attrs.push(("style", HIDDEN));
    }
    let svg = dom.svg_element("svg", &attrs);
    let path = dom.svg_element("path", &[("d", d)]);
    dom.append(svg, path);
    svg
}

fn play_button(dom: &mut ChapterDom) -> NodeId {
    let button = dom.element(
        "button",
        &[
            ("class", "control-btn play-btn"),
            ("aria-label", "Воспроизведение"),
            ("type", "button"),
        ],
    );
    let play = icon(dom, "play-icon", "24", PLAY_ICON, false);
    let pause = icon(dom, "pause-icon", "24", PAUSE_ICON, true);
    dom.append(button, play);
    dom.append(button, pause);
    button
}

fn status_line(dom: &mut ChapterDom, player: NodeId) {
    dom.append_element_with_text(
        player,
        "div",
        &[("class", "player-status"), ("style", HIDDEN)],
        "Загрузка...",
    );
}

fn build_full_player(dom: &mut ChapterDom, path: &str, title: &str) -> NodeId {
    let player = dom.element(
        "div",
        &[("class", "custom-audio-player"), ("data-audio-path", path)],
    );
    let row = dom.element("div", &[("class", "player-row")]);
    dom.append(player, row);

    let play = play_button(dom);
    dom.append(row, play);

    let center = dom.element("div", &[("class", "center-column")]);
    dom.append(row, center);
    let title_row = dom.element("div", &[("class", "title-time-row")]);
    dom.append(center, title_row);
    dom.append_element_with_text(title_row, "span", &[("class", "track-title")], title);
    dom.append_element_with_text(title_row, "span", &[("class", "time-display")], "0:00 / 0:00");
    let progress = dom.element(
        "div",
        &[
            ("class", "progress-container"),
            ("aria-label", "Перемотка трека"),
        ],
    );
    dom.append(center, progress);
    let bar = dom.element("div", &[("class", "progress-bar")]);
    dom.append(progress, bar);

    let volume = dom.element("div", &[("class", "volume-section")]);
    dom.append(row, volume);
    let mute = dom.element(
        "button",
        &[
            ("class", "control-btn mute-btn"),
            ("aria-label", "Отключить звук"),
            ("type", "button"),
        ],
    );
    dom.append(volume, mute);
    let volume_icon = icon(dom, "volume-icon", "20", VOLUME_ICON, false);
    let muted_icon = icon(dom, "muted-icon", "20", MUTED_ICON, true);
    dom.append(mute, volume_icon);
    dom.append(mute, muted_icon);
    let slider_box = dom.element(
        "div",
        &[
            ("class", "volume-slider-container"),
            ("aria-label", "Регулировка громкости"),
        ],
    );
    dom.append(volume, slider_box);
    let slider = dom.element("div", &[("class", "volume-slider")]);
    dom.append(slider_box, slider);

    status_line(dom, player);
    player
}

fn build_launcher(dom: &mut ChapterDom, path: &str, title: &str) -> NodeId {
    let player = dom.element(
        "div",
        &[
            ("class", "custom-audio-player audio-launcher"),
            ("data-audio-path", path),
        ],
    );
    let play = play_button(dom);
    dom.append(player, play);

    let info = dom.element("div", &[("class", "launcher-info")]);
    dom.append(player, info);
    dom.append_element_with_text(info, "span", &[("class", "track-title")], title);
    dom.append_element_with_text(info, "span", &[("class", "time-display")], "0:00 / 0:00");

    status_line(dom, player);
    player
}

/// Hide a broken image and put an inline error marker right after it.
///
/// Siblings are untouched; calling it twice on the same image is a no-op.
pub fn mark_image_failed(dom: &mut ChapterDom, img: NodeId) {
    if dom
        .next_sibling(img)
        .is_some_and(|n| dom.has_class(n, "media-error"))
    {
        return;
    }

    let src = dom.get_attr(img, "src").unwrap_or_default().to_string();
    let style = match dom.get_attr(img, "style") {
        Some(existing) if !existing.is_empty() => format!("{existing} {HIDDEN}"),
        _ => HIDDEN.to_string(),
    };
    dom.set_attr(img, "style", &style);

    let marker = dom.element(
        "span",
        &[
            ("class", "media-error"),
            ("style", "color: red; font-size: 0.8em;"),
        ],
    );
    let text = dom.create_text(format!("[Ошибка загрузки изображения: {src}]"));
    dom.append(marker, text);
    dom.insert_after(img, marker);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(json: &str) -> MediaRule {
        serde_json::from_str(json).unwrap()
    }

    const CHAPTER: &str = "<h2>Глава 3</h2><p>Погода была ясной.</p><p>Они жили в старом доме.</p>";

    #[test]
    fn test_no_rules_is_identity() {
        let html = "<p>Текст   с  пробелами</p>\n<p>и &amp; сущностями</p>";
        let other = rule(r#"{"chapter": 9, "type": "image", "anchor": "Текст", "src": ["a.png"]}"#);
        assert_eq!(inject_media(html, 3, &[other]), html);
    }

    #[test]
    fn test_all_rules_failing_is_identity() {
        let html = "<p>Текст <b>без</b> якоря</p>";
        let missing = rule(r#"{"chapter": 3, "type": "image", "anchor": "нет такого", "src": ["a.png"]}"#);
        let injected = MediaInjector::new().inject(html, 3, &[missing]);
        assert_eq!(injected.html, html);
        assert_eq!(injected.report.results[0].outcome, RuleOutcome::AnchorNotFound);
    }

    #[test]
    fn test_audio_after_anchor() {
        let audio = rule(
            r#"{"id": "rain", "chapter": 3, "type": "audio", "anchor": "Погода была ясной", "position": "after", "src": ["audio/rain.mp3"], "title": "Дождь"}"#,
        );
        let out = inject_media(CHAPTER, 3, &[audio]);
        let dom = parse_html(&out);
        let body: Vec<_> = dom.children(dom.body()).collect();
        assert_eq!(dom.element_name(body[2]).unwrap().as_ref(), "div");
        assert_eq!(dom.get_attr(body[2], "data-media-id"), Some("rain"));
        assert_eq!(dom.get_attr(body[2], "data-type"), Some("audio"));

        let player = dom.first_by_class(body[2], "custom-audio-player").unwrap();
        assert_eq!(dom.get_attr(player, "data-audio-path"), Some("./audio/rain.mp3"));
        let title = dom.first_by_class(player, "track-title").unwrap();
        assert_eq!(dom.text_content(title), "Дождь");
        assert!(out.contains(r#"<svg class="play-icon" width="24" height="24" viewBox="0 0 24 24">"#));
    }

    #[test]
    fn test_images_before_anchor_with_spacers() {
        let images = rule(
            r#"{"id": "house", "chapter": 3, "type": "image", "anchor": "в старом доме", "position": "before", "src": ["img/a.jpg", "img/b.jpg"], "width": "80%"}"#,
        );
        let out = inject_media(CHAPTER, 3, &[images]);
        assert!(out.contains(
            r#"<div class="media-container" data-media-id="house" data-type="image" style="width: 80%;"><img src="./img/a.jpg" alt="Изображение house - 1" class="media-image" style="width: 80%;"><div style="height: 1rem;"></div><img src="./img/b.jpg" alt="Изображение house - 2" class="media-image" style="width: 80%;"></div><p>Они жили в старом доме.</p>"#
        ));
    }

    #[test]
    fn test_caption_follows_media() {
        let image = rule(
            r#"{"chapter": 3, "type": "image", "anchor": "Погода", "position": "before", "src": ["sky.png"], "description": "Небо"}"#,
        );
        let out = inject_media(CHAPTER, 3, &[image]);
        assert!(out.contains(r#"</div><div class="media-caption">Небо</div><p>Погода была ясной.</p>"#));
    }

    #[test]
    fn test_launcher_markup() {
        let launcher = rule(
            r#"{"chapter": 3, "type": "audio", "anchor": "Погода", "src": ["t.mp3"], "player": "launcher"}"#,
        );
        let out = inject_media(CHAPTER, 3, &[launcher]);
        let dom = parse_html(&out);
        let player = dom.first_by_class(dom.body(), "audio-launcher").unwrap();
        assert!(dom.has_class(player, "custom-audio-player"));
        assert!(dom.first_by_class(player, "progress-container").is_none());
        assert_eq!(
            dom.text_content(dom.first_by_class(player, "track-title").unwrap()),
            "Аудиофайл"
        );
    }

    #[test]
    fn test_invalid_rule_does_not_abort_batch() {
        let empty_src = rule(r#"{"id": "bad", "chapter": 3, "type": "audio", "anchor": "Погода", "src": []}"#);
        let video = rule(r#"{"id": "vid", "chapter": 3, "type": "video", "anchor": "Погода", "src": ["v.mp4"]}"#);
        let good = rule(r#"{"id": "ok", "chapter": 3, "type": "image", "anchor": "доме", "src": ["a.png"]}"#);

        let injected = MediaInjector::new().inject(CHAPTER, 3, &[empty_src, video, good]);
        let outcomes: Vec<_> = injected.report.results.iter().map(|r| &r.outcome).collect();
        assert!(matches!(outcomes[0], RuleOutcome::MediaCreationFailed(_)));
        assert!(matches!(outcomes[1], RuleOutcome::MediaCreationFailed(_)));
        assert_eq!(outcomes[2], &RuleOutcome::Applied);
        assert!(injected.html.contains(r#"data-media-id="ok""#));
    }

    #[test]
    fn test_probe_marks_missing_images() {
        let images = rule(
            r#"{"id": "pair", "chapter": 3, "type": "image", "anchor": "Погода", "src": ["ok.png", "missing.png"]}"#,
        );
        let probe = |path: &str| path != "./missing.png";
        let out = MediaInjector::with_probe(&probe).inject(CHAPTER, 3, &[images]).html;

        assert!(out.contains(r#"<img src="./ok.png" alt="Изображение pair - 1" class="media-image">"#));
        assert!(out.contains(
            r#"<img src="./missing.png" alt="Изображение pair - 2" class="media-image" style="display: none;"><span class="media-error" style="color: red; font-size: 0.8em;">[Ошибка загрузки изображения: ./missing.png]</span>"#
        ));
    }

    #[test]
    fn test_mark_image_failed_is_idempotent() {
        let mut dom = parse_html(r#"<p><img src="a.png" style="width: 50%;"><img src="b.png"></p>"#);
        let img = dom.find_by_tag("img").unwrap();
        mark_image_failed(&mut dom, img);
        mark_image_failed(&mut dom, img);
        assert_eq!(
            body_html(&dom),
            r#"<p><img src="a.png" style="width: 50%; display: none;"><span class="media-error" style="color: red; font-size: 0.8em;">[Ошибка загрузки изображения: a.png]</span><img src="b.png"></p>"#
        );
    }
}
