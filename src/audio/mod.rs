//! Audio session coordination.
//!
//! Audio identity is the track's source path. Elements live in
//! [`AudioTrackHandle`]s owned by the [`AudioSession`]; the chapter markup
//! only holds replaceable back-references ([`MountRef`]) that are
//! re-resolved on every rebind.
//!
//! ```
//! use litoverlay::audio::{AudioSession, TrackMeta};
//! # use litoverlay::audio::MediaElement;
//! # use litoverlay::PlaybackError;
//! # #[derive(Default)]
//! # struct Silent { paused: bool, time: f64 }
//! # impl MediaElement for Silent {
//! #     fn play(&mut self) -> Result<(), PlaybackError> { self.paused = false; Ok(()) }
//! #     fn pause(&mut self) { self.paused = true; }
//! #     fn is_paused(&self) -> bool { self.paused }
//! #     fn current_time(&self) -> f64 { self.time }
//! #     fn set_current_time(&mut self, t: f64) { self.time = t; }
//! #     fn duration(&self) -> Option<f64> { Some(60.0) }
//! #     fn volume(&self) -> f64 { 1.0 }
//! #     fn set_volume(&mut self, _: f64) {}
//! #     fn is_muted(&self) -> bool { false }
//! #     fn set_muted(&mut self, _: bool) {}
//! # }
//! # fn silent() -> Box<dyn MediaElement> { Box::new(Silent { paused: true, time: 0.0 }) }
//!
//! let mut session = AudioSession::new();
//! session.register_audio_player(silent(), TrackMeta::new("./audio/rain.mp3", "Дождь"));
//! session.register_audio_player(silent(), TrackMeta::new("./audio/wind.mp3", "Ветер"));
//!
//! session.play()?;
//! session.next()?;
//! assert_eq!(session.active_session().unwrap().track.as_str(), "./audio/wind.mp3");
//! assert_eq!(session.playing_count(), 1);
//! # Ok::<(), litoverlay::Error>(())
//! ```

mod element;
mod handle;
mod keys;
mod session;
mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use element::{MediaElement, MediaEvent, MediaFactory};
pub use handle::{AudioTrackHandle, MountRef, TrackId, TrackMeta, TrackState};
pub use keys::{KeyPress, command_for_key};
pub use session::{ActiveSession, AudioSession, PROGRESS_REFRESH_MS};
pub use view::{PlayerStatus, Progress, SessionView, ToolbarState};

/// A transport control action on the selected track.
///
/// Fractions come from a click position relative to the control's width
/// and are clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportCommand {
    Play,
    Pause,
    Toggle,
    Seek(f64),
    SetVolume(f64),
    ToggleMute,
    Next,
    Previous,
}
