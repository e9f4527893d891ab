//! Reader pipeline: render, mount and lifecycle for one page.
//!
//! The reader owns the rule store, the audio coordinator, the tooltip
//! controller and the rebinder. Hosts construct it once and route page
//! events through it; nothing is global.

use log::{debug, info};

use crate::audio::{AudioSession, KeyPress, MediaFactory, TrackId, command_for_key};
use crate::dom::{ChapterDom, NodeId, body_html, chapter_title, parse_html};
use crate::error::Result;
use crate::inject::{AssetProbe, HintInjector, InjectionReport, MediaInjector, mark_image_failed};
use crate::rebind::{ChapterRebinder, IconTheme, RebindReport};
use crate::rules::RuleStore;
use crate::tooltip::TooltipController;

/// A chapter after hint and media injection, ready to mount.
#[derive(Debug, Clone)]
pub struct RenderedChapter {
    pub number: u32,
    pub html: String,
    /// First `<h2>` text, or `Глава <n>`.
    pub title: String,
    pub report: InjectionReport,
}

/// The chapter currently in the page.
#[derive(Debug)]
pub struct MountedChapter {
    pub number: u32,
    pub dom: ChapterDom,
    pub rebind: RebindReport,
    /// Tracks released because this chapter no longer shows them.
    pub released: Vec<TrackId>,
}

impl MountedChapter {
    /// Current markup, including any runtime changes such as failed images.
    pub fn html(&self) -> String {
        body_html(&self.dom)
    }
}

pub struct Reader {
    rules: RuleStore,
    session: AudioSession,
    tooltip: TooltipController,
    rebinder: ChapterRebinder,
    current: Option<MountedChapter>,
}

impl Reader {
    pub fn new(rules: RuleStore, session: AudioSession, tooltip: TooltipController) -> Self {
        Self {
            rules,
            session,
            tooltip,
            rebinder: ChapterRebinder::new(),
            current: None,
        }
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn session(&self) -> &AudioSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut AudioSession {
        &mut self.session
    }

    pub fn tooltip(&self) -> &TooltipController {
        &self.tooltip
    }

    pub fn tooltip_mut(&mut self) -> &mut TooltipController {
        &mut self.tooltip
    }

    pub fn current_chapter(&self) -> Option<&MountedChapter> {
        self.current.as_ref()
    }

    /// Inject hints, then media, into a chapter's markup.
    pub fn render_chapter(&self, html: &str, chapter: u32) -> RenderedChapter {
        self.render(html, chapter, MediaInjector::new())
    }

    /// Like [`render_chapter`](Self::render_chapter), marking images that
    /// `probe` can't find.
    pub fn render_chapter_with_probe(&self, html: &str, chapter: u32, probe: &dyn AssetProbe) -> RenderedChapter {
        self.render(html, chapter, MediaInjector::with_probe(probe))
    }

    fn render(&self, html: &str, chapter: u32, media: MediaInjector<'_>) -> RenderedChapter {
        let title = chapter_title(&parse_html(html)).unwrap_or_else(|| format!("Глава {chapter}"));

        let hinted = HintInjector::new().inject(html, chapter, self.rules.hints());
        let enriched = media.inject(&hinted.html, chapter, self.rules.media());

        let mut report = hinted.report;
        report.extend(enriched.report);
        debug!(
            "Rendered chapter {chapter}: {} of {} rule(s) applied",
            report.applied(),
            report.results.len()
        );

        RenderedChapter {
            number: chapter,
            html: enriched.html,
            title,
            report,
        }
    }

    /// Swap in a rendered chapter and bind its players.
    ///
    /// Tracks the incoming chapter also shows keep playing; every other
    /// track is stopped and released.
    pub fn mount_chapter(
        &mut self,
        rendered: &RenderedChapter,
        factory: &mut dyn MediaFactory,
        theme: &mut dyn IconTheme,
    ) -> &RebindReport {
        let dom = parse_html(&rendered.html);
        let keep: Vec<String> = dom
            .elements_by_class(dom.body(), "custom-audio-player")
            .into_iter()
            .filter_map(|p| dom.get_attr(p, "data-audio-path").map(str::to_string))
            .collect();

        self.session.stop_players_except(&keep);
        self.tooltip.clear();

        let rebind = self.rebinder.rebind(&dom, &mut self.session, factory, theme);
        let released = self.session.release_unmounted(rebind.generation);
        if !released.is_empty() {
            debug!("Released {} track(s) no longer in the page", released.len());
        }
        info!("Mounted chapter {} ({})", rendered.number, rendered.title);
        &self
            .current
            .insert(MountedChapter {
                number: rendered.number,
                dom,
                rebind,
                released,
            })
            .rebind
    }

    /// The platform failed to load an image of the mounted chapter.
    pub fn on_image_error(&mut self, img: NodeId) -> bool {
        match &mut self.current {
            Some(chapter) => {
                mark_image_failed(&mut chapter.dom, img);
                true
            }
            None => false,
        }
    }

    /// Route a global key press; `Ok(true)` when it was a shortcut.
    pub fn handle_key(&mut self, key: KeyPress<'_>) -> Result<bool> {
        match command_for_key(key) {
            Some(command) => {
                self.session.dispatch(command)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Tab hidden.
    pub fn on_visibility_hidden(&mut self) {
        self.session.stop_all_current_players();
    }

    /// Page unload.
    pub fn on_unload(&mut self) {
        self.session.stop_all_current_players();
        self.tooltip.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::FakeMedia;
    use crate::audio::MediaElement;
    use crate::inject::RuleOutcome;
    use crate::rebind::NoTheme;

    const MEDIA: &str = r#"{"media": [
        {"id": "rain", "chapter": 3, "type": "audio", "anchor": "Погода была ясной", "position": "after", "src": ["audio/rain.mp3"], "title": "Дождь"},
        {"id": "house", "chapter": 3, "type": "image", "anchor": "в старом доме", "position": "before", "src": ["img/house.jpg"]},
        {"id": "rain-again", "chapter": 4, "type": "audio", "anchor": "Снова дождь", "src": ["audio/rain.mp3"], "player": "launcher"},
        {"id": "wind", "chapter": 5, "type": "audio", "anchor": "Ветер", "src": ["audio/wind.mp3"]}
    ]}"#;

    const HINTS: &str = r#"{"hints": [{"chapter": 3, "text": "ясной", "hint": "безоблачной"}]}"#;

    fn reader() -> Reader {
        Reader::new(
            RuleStore::from_json(Some(MEDIA), Some(HINTS)),
            AudioSession::new(),
            TooltipController::new(false),
        )
    }

    fn factory() -> impl FnMut(&str) -> Box<dyn MediaElement> {
        |_: &str| FakeMedia::new().boxed()
    }

    #[test]
    fn test_render_chapter_three() {
        let html = "<h2>Глава третья</h2><p>Погода была ясной.</p><p>Они жили в старом доме.</p>";
        let rendered = reader().render_chapter(html, 3);

        assert_eq!(rendered.title, "Глава третья");
        assert_eq!(rendered.report.applied(), 3);
        assert!(rendered.html.contains(r#"<p>Погода была <u data-hint="безоблачной">ясной</u>.</p><div class="media-container" data-media-id="rain" data-type="audio">"#));
        assert!(rendered.html.contains(r#"data-type="image"><img src="./img/house.jpg" alt="Изображение house - 1" class="media-image"></div><p>Они жили в старом доме.</p>"#));
    }

    #[test]
    fn test_title_fallback_and_untouched_chapter() {
        let html = "<p>Без заголовка</p>";
        let rendered = reader().render_chapter(html, 7);
        assert_eq!(rendered.title, "Глава 7");
        assert_eq!(rendered.html, html);
        assert!(rendered.report.results.is_empty());
    }

    #[test]
    fn test_failed_rules_are_reported() {
        let rendered = reader().render_chapter("<p>Другой текст</p>", 3);
        assert_eq!(rendered.report.applied(), 0);
        assert!(rendered.report.failures().all(|r| r.outcome == RuleOutcome::AnchorNotFound));
        assert_eq!(rendered.html, "<p>Другой текст</p>");
    }

    #[test]
    fn test_navigation_keeps_shared_track_playing() {
        let mut reader = reader();
        let three = reader.render_chapter("<p>Погода была ясной.</p>", 3);
        reader.mount_chapter(&three, &mut factory(), &mut NoTheme);
        reader.session_mut().play().unwrap();

        let four = reader.render_chapter("<p>Снова дождь.</p>", 4);
        let report = reader.mount_chapter(&four, &mut factory(), &mut NoTheme).clone();
        assert_eq!(report.generation, 2);

        let rain = TrackId::from("./audio/rain.mp3");
        assert_eq!(reader.session().active_session().unwrap().track, rain);
        assert_eq!(reader.session().len(), 1);

        let five = reader.render_chapter("<p>Ветер.</p>", 5);
        reader.mount_chapter(&five, &mut factory(), &mut NoTheme);
        assert!(reader.session().active_session().is_none());
        assert_eq!(reader.session().playing_count(), 0);
        assert_eq!(reader.current_chapter().unwrap().released, vec![rain]);
        assert_eq!(reader.session().len(), 1);
        assert_eq!(reader.session().selected(), Some(&TrackId::from("./audio/wind.mp3")));
    }

    #[test]
    fn test_lifecycle_stops_playback() {
        let mut reader = reader();
        let three = reader.render_chapter("<p>Погода была ясной.</p>", 3);
        reader.mount_chapter(&three, &mut factory(), &mut NoTheme);

        assert!(reader.handle_key(KeyPress::new("Space")).unwrap());
        assert_eq!(reader.session().playing_count(), 1);
        reader.on_visibility_hidden();
        assert_eq!(reader.session().playing_count(), 0);
        assert!(!reader.handle_key(KeyPress::new("KeyQ")).unwrap());
    }

    #[test]
    fn test_image_error_marks_mounted_chapter() {
        let mut reader = reader();
        let three = reader.render_chapter("<p>Они жили в старом доме.</p>", 3);
        reader.mount_chapter(&three, &mut factory(), &mut NoTheme);

        let img = {
            let dom = &reader.current_chapter().unwrap().dom;
            dom.find_by_tag("img").unwrap()
        };
        assert!(reader.on_image_error(img));
        assert!(reader
            .current_chapter()
            .unwrap()
            .html()
            .contains("[Ошибка загрузки изображения: ./img/house.jpg]"));
    }
}
