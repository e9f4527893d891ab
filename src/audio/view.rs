//! Visual representations the coordinator keeps in sync.
//!
//! The same track can be shown by an in-chapter player or launcher and by
//! the toolbar's "now playing" dropdown. Views are addressed by source path,
//! never by element identity, because chapter markup is rebuilt on every
//! navigation while playback continues.

use std::cell::RefCell;
use std::rc::Rc;

use crate::rules::PlayerStyle;
use crate::util::{format_time, split_track_info};

/// Transient message on a player's status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Loading,
    Ready,
    /// Autoplay policy refused playback; a click on the page unlocks it.
    NeedsInteraction,
    LoadError,
    /// Hide the status line.
    Hidden,
}

impl PlayerStatus {
    pub fn message(&self) -> &'static str {
        match self {
            PlayerStatus::Loading => "Загрузка...",
            PlayerStatus::Ready => "Готово",
            PlayerStatus::NeedsInteraction => "Нажмите на страницу для разрешения",
            PlayerStatus::LoadError => "Ошибка загрузки",
            PlayerStatus::Hidden => "",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            PlayerStatus::Ready => "#43a047",
            PlayerStatus::NeedsInteraction => "#ff9800",
            PlayerStatus::LoadError => "#f44336",
            PlayerStatus::Loading | PlayerStatus::Hidden => "#2196f3",
        }
    }

    /// How long the message stays up; 0 means until replaced.
    pub fn timeout_ms(&self) -> u32 {
        match self {
            PlayerStatus::Ready => 1500,
            PlayerStatus::NeedsInteraction => 3000,
            PlayerStatus::LoadError => 5000,
            PlayerStatus::Loading | PlayerStatus::Hidden => 0,
        }
    }
}

/// Position of a track, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// 0..=100
    pub percent: f64,
    /// `m:ss / m:ss`
    pub time_display: String,
}

impl Progress {
    pub fn new(current: f64, duration: Option<f64>) -> Self {
        let duration = duration.filter(|d| d.is_finite() && *d > 0.0);
        let percent = match duration {
            Some(d) => (current / d * 100.0).clamp(0.0, 100.0),
            None => 0.0,
        };
        Self {
            percent,
            time_display: format!(
                "{} / {}",
                format_time(current),
                format_time(duration.unwrap_or(0.0))
            ),
        }
    }
}

/// Contents of the toolbar's "now playing" dropdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolbarState {
    pub artist: String,
    pub title: String,
    pub playing: bool,
    pub progress: Progress,
    pub muted: bool,
    pub volume: f64,
}

impl ToolbarState {
    pub(crate) fn new(track_title: &str, playing: bool, progress: Progress, muted: bool, volume: f64) -> Self {
        let (artist, title) = split_track_info(track_title);
        Self {
            artist,
            title,
            playing,
            progress,
            muted,
            volume,
        }
    }
}

/// Receives coordinator state. Every method defaults to doing nothing.
pub trait SessionView {
    /// Play/pause icon state of every player showing `path`.
    fn sync_player(&mut self, _path: &str, _style: PlayerStyle, _playing: bool) {}

    /// Toolbar contents; `None` shows the "no audio" message.
    fn sync_toolbar(&mut self, _toolbar: Option<&ToolbarState>) {}

    fn sync_progress(&mut self, _path: &str, _progress: &Progress) {}

    fn sync_volume(&mut self, _path: &str, _volume: f64, _muted: bool) {}

    fn show_status(&mut self, _path: &str, _status: PlayerStatus) {}
}

impl<V: SessionView + ?Sized> SessionView for Rc<RefCell<V>> {
    fn sync_player(&mut self, path: &str, style: PlayerStyle, playing: bool) {
        self.borrow_mut().sync_player(path, style, playing);
    }

    fn sync_toolbar(&mut self, toolbar: Option<&ToolbarState>) {
        self.borrow_mut().sync_toolbar(toolbar);
    }

    fn sync_progress(&mut self, path: &str, progress: &Progress) {
        self.borrow_mut().sync_progress(path, progress);
    }

    fn sync_volume(&mut self, path: &str, volume: f64, muted: bool) {
        self.borrow_mut().sync_volume(path, volume, muted);
    }

    fn show_status(&mut self, path: &str, status: PlayerStatus) {
        self.borrow_mut().show_status(path, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_with_unknown_duration() {
        let progress = Progress::new(12.0, None);
        assert_eq!(progress.percent, 0.0);
        assert_eq!(progress.time_display, "0:12 / 0:00");

        let nan = Progress::new(3.0, Some(f64::NAN));
        assert_eq!(nan.percent, 0.0);
    }

    #[test]
    fn test_progress_percent() {
        let progress = Progress::new(30.0, Some(120.0));
        assert_eq!(progress.percent, 25.0);
        assert_eq!(progress.time_display, "0:30 / 2:00");
    }

    #[test]
    fn test_toolbar_splits_artist() {
        let state = ToolbarState::new("Автор — Дождь", true, Progress::new(0.0, None), false, 1.0);
        assert_eq!(state.artist, "Автор");
        assert_eq!(state.title, "Дождь");
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(
            PlayerStatus::NeedsInteraction.message(),
            "Нажмите на страницу для разрешения"
        );
        assert_eq!(PlayerStatus::LoadError.timeout_ms(), 5000);
    }
}
