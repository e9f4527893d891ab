//! The platform audio resource, as the coordinator sees it.
//!
//! In the browser this is an `HTMLAudioElement`; natively it can be any
//! player, or a fake in tests. The coordinator owns each element
//! exclusively through its handle.

use crate::error::PlaybackError;

/// A playable audio resource.
///
/// Times are in seconds. `duration` is `None` until metadata has loaded
/// (the platform reports NaN there).
pub trait MediaElement {
    /// Start playback. The platform may refuse, e.g. before any user gesture.
    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);

    fn duration(&self) -> Option<f64>;

    fn volume(&self) -> f64;

    fn set_volume(&mut self, volume: f64);

    fn is_muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    /// Whether any data has been loaded yet.
    fn is_ready(&self) -> bool {
        true
    }

    /// Begin fetching the resource.
    fn load(&mut self) {}
}

/// Creates media elements for tracks the coordinator hasn't seen yet.
pub trait MediaFactory {
    fn create(&mut self, path: &str) -> Box<dyn MediaElement>;
}

impl<F> MediaFactory for F
where
    F: FnMut(&str) -> Box<dyn MediaElement>,
{
    fn create(&mut self, path: &str) -> Box<dyn MediaElement> {
        self(path)
    }
}

/// Feedback the platform delivers about an element.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Play,
    Pause,
    Ended,
    TimeUpdate,
    LoadedMetadata,
    CanPlay,
    Error(String),
}
