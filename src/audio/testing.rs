//! In-memory media element and recording view for coordinator tests.

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::element::MediaElement;
use super::view::{PlayerStatus, Progress, SessionView, ToolbarState};
use crate::error::PlaybackError;
use crate::rules::PlayerStyle;

#[derive(Debug)]
pub struct FakeState {
    pub paused: bool,
    pub time: f64,
    pub duration: Option<f64>,
    pub volume: f64,
    pub muted: bool,
    pub ready: bool,
    pub loads: u32,
    pub refuse: Option<PlaybackError>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            paused: true,
            time: 0.0,
            duration: Some(120.0),
            volume: 1.0,
            muted: false,
            ready: true,
            loads: 0,
            refuse: None,
        }
    }
}

/// Shared-state fake; clones observe the same element.
#[derive(Debug, Clone, Default)]
pub struct FakeMedia(Rc<RefCell<FakeState>>);

impl FakeMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playing() -> Self {
        let media = Self::new();
        media.0.borrow_mut().paused = false;
        media
    }

    pub fn at(self, time: f64) -> Self {
        self.0.borrow_mut().time = time;
        self
    }

    pub fn unloaded(self) -> Self {
        {
            let mut state = self.0.borrow_mut();
            state.ready = false;
            state.duration = None;
        }
        self
    }

    pub fn refusing(self, err: PlaybackError) -> Self {
        self.0.borrow_mut().refuse = Some(err);
        self
    }

    pub fn boxed(&self) -> Box<dyn MediaElement> {
        Box::new(self.clone())
    }

    pub fn state(&self) -> Ref<'_, FakeState> {
        self.0.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.0.borrow().paused
    }

    pub fn time(&self) -> f64 {
        self.0.borrow().time
    }
}

impl MediaElement for FakeMedia {
    fn play(&mut self) -> Result<(), PlaybackError> {
        let mut state = self.0.borrow_mut();
        if let Some(err) = state.refuse.clone() {
            return Err(err);
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.0.borrow_mut().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.0.borrow().paused
    }

    fn current_time(&self) -> f64 {
        self.0.borrow().time
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.0.borrow_mut().time = seconds;
    }

    fn duration(&self) -> Option<f64> {
        self.0.borrow().duration
    }

    fn volume(&self) -> f64 {
        self.0.borrow().volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.0.borrow_mut().volume = volume;
    }

    fn is_muted(&self) -> bool {
        self.0.borrow().muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.0.borrow_mut().muted = muted;
    }

    fn is_ready(&self) -> bool {
        self.0.borrow().ready
    }

    fn load(&mut self) {
        let mut state = self.0.borrow_mut();
        state.loads += 1;
        state.ready = true;
    }
}

/// Remembers the last thing each sync call said.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub players: HashMap<String, (PlayerStyle, bool)>,
    pub toolbar: Option<ToolbarState>,
    pub progress: HashMap<String, Progress>,
    pub volume: HashMap<String, (f64, bool)>,
    pub statuses: Vec<(String, PlayerStatus)>,
}

impl RecordingView {
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn playing(&self, path: &str) -> bool {
        self.players.get(path).is_some_and(|(_, playing)| *playing)
    }
}

impl SessionView for RecordingView {
    fn sync_player(&mut self, path: &str, style: PlayerStyle, playing: bool) {
        self.players.insert(path.to_string(), (style, playing));
    }

    fn sync_toolbar(&mut self, toolbar: Option<&ToolbarState>) {
        self.toolbar = toolbar.cloned();
    }

    fn sync_progress(&mut self, path: &str, progress: &Progress) {
        self.progress.insert(path.to_string(), progress.clone());
    }

    fn sync_volume(&mut self, path: &str, volume: f64, muted: bool) {
        self.volume.insert(path.to_string(), (volume, muted));
    }

    fn show_status(&mut self, path: &str, status: PlayerStatus) {
        self.statuses.push((path.to_string(), status));
    }
}
