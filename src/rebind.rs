//! Chapter rebind hook.
//!
//! Chapter markup is replaced wholesale on navigation. After each mount the
//! rebinder walks the new DOM, hands every audio player to the coordinator
//! and collects the hint markers for the tooltip controller.

use log::{debug, info, warn};

use crate::audio::{AudioSession, MediaFactory, MountRef, TrackId, TrackMeta};
use crate::dom::{ChapterDom, NodeId};
use crate::inject::hints::{HINT_ATTR, is_hint_marker};

const PLAYER_CLASS: &str = "custom-audio-player";
const LAUNCHER_CLASS: &str = "audio-launcher";
const PATH_ATTR: &str = "data-audio-path";
const DEFAULT_TITLE: &str = "Аудиофайл";

/// Controls a full player can't work without.
const FULL_PLAYER_CONTROLS: &[&str] = &[
    "play-btn",
    "progress-container",
    "mute-btn",
    "volume-slider-container",
];

/// Recolors player icons to match the current theme.
pub trait IconTheme {
    fn recolor_player(&mut self, path: &str);
}

impl<F> IconTheme for F
where
    F: FnMut(&str),
{
    fn recolor_player(&mut self, path: &str) {
        self(path)
    }
}

/// Theme hook for hosts that style icons purely in CSS.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTheme;

impl IconTheme for NoTheme {
    fn recolor_player(&mut self, _path: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintMarkerRef {
    pub node: NodeId,
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPlayer {
    pub node: NodeId,
    pub path: Option<String>,
    pub reason: String,
}

/// What one rebind found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebindReport {
    pub generation: u64,
    pub bound: Vec<TrackId>,
    pub skipped: Vec<SkippedPlayer>,
    pub hint_markers: Vec<HintMarkerRef>,
    /// Back-references from earlier mounts that were dropped.
    pub stale_mounts: usize,
}

/// Tracks the mount generation across chapter swaps.
#[derive(Debug, Default)]
pub struct ChapterRebinder {
    generation: u64,
}

impl ChapterRebinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of the most recent mount; 0 before the first rebind.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bind a freshly mounted chapter.
    pub fn rebind(
        &mut self,
        dom: &ChapterDom,
        session: &mut AudioSession,
        factory: &mut dyn MediaFactory,
        theme: &mut dyn IconTheme,
    ) -> RebindReport {
        self.generation += 1;
        let generation = self.generation;
        let mut report = RebindReport {
            generation,
            ..RebindReport::default()
        };

        for node in dom.elements_by_class(dom.body(), PLAYER_CLASS) {
            let meta = match player_meta(dom, node, generation) {
                Ok(meta) => meta,
                Err(skipped) => {
                    warn!(
                        "Skipping audio player {:?}: {}",
                        skipped.path.as_deref().unwrap_or("<no path>"),
                        skipped.reason
                    );
                    report.skipped.push(skipped);
                    continue;
                }
            };
            let id = session.attach(meta, factory);
            if let Some(handle) = session.handle(&id) {
                theme.recolor_player(handle.source_path());
            }
            debug!("Bound audio player {id} (generation {generation})");
            report.bound.push(id);
        }

        report.stale_mounts = session.drop_stale_mounts(generation);
        report.hint_markers = dom
            .find_all(dom.body(), is_hint_marker)
            .into_iter()
            .map(|node| HintMarkerRef {
                node,
                hint: dom.get_attr(node, HINT_ATTR).unwrap_or_default().to_string(),
            })
            .collect();

        info!(
            "Chapter rebound: {} audio player(s), {} skipped, {} hint marker(s)",
            report.bound.len(),
            report.skipped.len(),
            report.hint_markers.len()
        );
        report
    }
}

fn player_meta(dom: &ChapterDom, node: NodeId, generation: u64) -> Result<TrackMeta, SkippedPlayer> {
    let skip = |path: Option<&str>, reason: String| SkippedPlayer {
        node,
        path: path.map(str::to_string),
        reason,
    };

    let Some(path) = dom.get_attr(node, PATH_ATTR).filter(|p| !p.is_empty()) else {
        return Err(skip(None, format!("missing {PATH_ATTR}")));
    };

    let launcher = dom.has_class(node, LAUNCHER_CLASS);
    let required: &[&str] = if launcher {
        &FULL_PLAYER_CONTROLS[..1]
    } else {
        FULL_PLAYER_CONTROLS
    };
    if let Some(missing) = required
        .iter()
        .find(|class| dom.first_by_class(node, class).is_none())
    {
        return Err(skip(Some(path), format!("missing .{missing}")));
    }

    let title = dom
        .first_by_class(node, "track-title")
        .map(|t| dom.text_content(t).trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let meta = TrackMeta::new(path, title).mounted(MountRef { generation, node });
    Ok(if launcher { meta.launcher() } else { meta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MediaElement;
    use crate::audio::testing::FakeMedia;
    use crate::dom::parse_html;
    use crate::inject::{inject_hints, inject_media};
    use crate::rules::{HintRule, MediaRule, PlayerStyle};

    fn chapter_with_players() -> String {
        let rules: Vec<MediaRule> = serde_json::from_str(
            r#"[
                {"chapter": 1, "type": "audio", "anchor": "Первый", "src": ["a.mp3"], "title": "Автор — Дождь"},
                {"chapter": 1, "type": "audio", "anchor": "Второй", "src": ["b.mp3"], "player": "launcher"}
            ]"#,
        )
        .unwrap();
        let hints = vec![HintRule {
            chapter: 1,
            text: "абзац".to_string(),
            hint: "часть текста".to_string(),
        }];
        let html = inject_hints("<p>Первый абзац.</p><p>Второй абзац.</p>", 1, &hints);
        inject_media(&html, 1, &rules)
    }

    fn factory() -> impl FnMut(&str) -> Box<dyn MediaElement> {
        |_: &str| FakeMedia::new().boxed()
    }

    #[test]
    fn test_rebind_discovers_players_and_markers() {
        let dom = parse_html(&chapter_with_players());
        let mut session = AudioSession::new();
        let mut recolored = Vec::new();
        let mut theme = |path: &str| recolored.push(path.to_string());

        let report = ChapterRebinder::new().rebind(&dom, &mut session, &mut factory(), &mut theme);

        assert_eq!(report.generation, 1);
        let bound: Vec<_> = report.bound.iter().map(|id| id.as_str()).collect();
        assert_eq!(bound, vec!["./a.mp3", "./b.mp3"]);
        assert_eq!(report.hint_markers.len(), 2);
        assert_eq!(report.hint_markers[0].hint, "часть текста");

        let first = session.handle(&TrackId::from("./a.mp3")).unwrap();
        assert_eq!(first.title(), "Автор — Дождь");
        assert_eq!(first.style(), PlayerStyle::Full);
        assert_eq!(
            session.handle(&TrackId::from("./b.mp3")).unwrap().style(),
            PlayerStyle::Launcher
        );
        drop(theme);
        assert_eq!(recolored, vec!["./a.mp3", "./b.mp3"]);
    }

    #[test]
    fn test_second_mount_keeps_playback_and_drops_stale_mounts() {
        let html = chapter_with_players();
        let mut session = AudioSession::new();
        let mut rebinder = ChapterRebinder::new();

        rebinder.rebind(&parse_html(&html), &mut session, &mut factory(), &mut NoTheme);
        session.play().unwrap();
        let playing = session.active_session().unwrap().track;

        let only_launcher = parse_html(
            r#"<div class="custom-audio-player audio-launcher" data-audio-path="./b.mp3"><button class="play-btn"></button></div>"#,
        );
        let report = rebinder.rebind(&only_launcher, &mut session, &mut factory(), &mut NoTheme);

        assert_eq!(report.generation, 2);
        assert_eq!(report.stale_mounts, 1);
        assert_eq!(session.active_session().unwrap().track, playing);
        assert!(session.handle(&playing).unwrap().mount().is_none());
        assert_eq!(
            session.handle(&TrackId::from("./b.mp3")).unwrap().mount().map(|m| m.generation),
            Some(2)
        );
    }

    #[test]
    fn test_players_without_controls_are_skipped() {
        let dom = parse_html(
            r#"<div class="custom-audio-player" data-audio-path="./a.mp3"><button class="play-btn"></button></div>
               <div class="custom-audio-player audio-launcher" data-audio-path="./b.mp3"></div>
               <div class="custom-audio-player"></div>"#,
        );
        let mut session = AudioSession::new();
        let report = ChapterRebinder::new().rebind(&dom, &mut session, &mut factory(), &mut NoTheme);

        assert!(report.bound.is_empty());
        let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason.as_str()).collect();
        assert_eq!(
            reasons,
            vec!["missing .progress-container", "missing .play-btn", "missing data-audio-path"]
        );
        assert!(session.is_empty());
    }
}
