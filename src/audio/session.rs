//! The audio session coordinator.
//!
//! Every player created in any chapter registers here. The coordinator
//! enforces that at most one track is audible: each transition into
//! `Playing` stops every other handle first. It also owns the "selected"
//! track, the one the toolbar shows and the transport controls act on.

use std::collections::HashMap;

use log::{debug, info, warn};

use super::element::{MediaElement, MediaEvent, MediaFactory};
use super::handle::{AudioTrackHandle, TrackId, TrackMeta, TrackState};
use super::view::{PlayerStatus, Progress, SessionView, ToolbarState};
use super::TransportCommand;
use crate::error::{Error, PlaybackError, Result};
use crate::util::{clamp_fraction, time_now_millis};

/// Minimum interval between progress refreshes driven by [`AudioSession::tick`].
pub const PROGRESS_REFRESH_MS: u64 = 250;

/// The track currently allowed to be audible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub track: TrackId,
    pub started_at_ms: u64,
}

/// Coordinator state. Construct one per page and pass it to whoever needs it.
#[derive(Default)]
pub struct AudioSession {
    /// Registration order; `next`/`previous` walk this.
    handles: Vec<AudioTrackHandle>,
    index: HashMap<TrackId, usize>,
    selected: Option<TrackId>,
    started_at_ms: Option<u64>,
    views: Vec<Box<dyn SessionView>>,
    generated: u64,
    last_progress_ms: Option<u64>,
}

impl AudioSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. It immediately receives the current state.
    pub fn add_view(&mut self, view: impl SessionView + 'static) {
        self.views.push(Box::new(view));
        self.sync_all();
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Handles in registration order.
    pub fn handles(&self) -> &[AudioTrackHandle] {
        &self.handles
    }

    pub fn handle(&self, id: &TrackId) -> Option<&AudioTrackHandle> {
        self.position(id).map(|pos| &self.handles[pos])
    }

    /// The toolbar's track; stays selected while paused.
    pub fn selected(&self) -> Option<&TrackId> {
        self.selected.as_ref()
    }

    /// The selected track, only while it is actually playing.
    pub fn active_session(&self) -> Option<ActiveSession> {
        let pos = self.selected_pos()?;
        let handle = &self.handles[pos];
        handle.is_playing().then(|| ActiveSession {
            track: handle.id.clone(),
            started_at_ms: self.started_at_ms.unwrap_or_else(time_now_millis),
        })
    }

    /// Number of handles whose element is unpaused.
    pub fn playing_count(&self) -> usize {
        self.handles.iter().filter(|h| h.is_playing()).count()
    }

    /// Current toolbar contents, `None` when nothing is selected.
    pub fn toolbar(&self) -> Option<ToolbarState> {
        let handle = &self.handles[self.selected_pos()?];
        let media = handle.media();
        Some(ToolbarState::new(
            &handle.title,
            handle.is_playing(),
            Progress::new(media.current_time(), media.duration()),
            media.is_muted(),
            media.volume(),
        ))
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register an element for a track.
    ///
    /// Keyed by `meta.path`; registering the same path again keeps the
    /// track's place in the order but replaces its element and metadata.
    /// An element that is already playing becomes the active session at
    /// once; otherwise the first registered track gets selected.
    pub fn register_audio_player(&mut self, media: Box<dyn MediaElement>, meta: TrackMeta) -> TrackId {
        let id = match meta.path.as_deref().filter(|p| !p.is_empty()) {
            Some(path) => TrackId::new(path),
            None => self.generate_id(),
        };
        let playing = !media.is_paused();

        match self.position(&id) {
            Some(pos) => {
                let old = &mut self.handles[pos];
                if old.is_playing() {
                    old.media.pause();
                    if self.selected.as_ref() == Some(&id) {
                        self.started_at_ms = None;
                    }
                }
                *old = AudioTrackHandle::new(id.clone(), media, meta);
                debug!("Audio player re-registered: {id}");
            }
            None => {
                self.index.insert(id.clone(), self.handles.len());
                self.handles.push(AudioTrackHandle::new(id.clone(), media, meta));
                debug!("Audio player registered: {id}");
            }
        }

        if playing || self.selected.is_none() {
            debug!("Selecting {id} on registration (playing: {playing})");
            self.select(&id);
        } else {
            self.sync_all();
        }
        id
    }

    /// Bind a mounted player to its track.
    ///
    /// A known path keeps its element, so playback carries on across the
    /// remount; only metadata and the mount reference change. A new path
    /// gets an element from `factory`.
    pub fn attach(&mut self, meta: TrackMeta, factory: &mut dyn MediaFactory) -> TrackId {
        let existing = meta
            .path
            .as_deref()
            .and_then(|path| self.position(&TrackId::new(path)));

        if let Some(pos) = existing {
            let handle = &mut self.handles[pos];
            handle.refresh(meta);
            let loading = !handle.media.is_ready();
            if loading {
                handle.media.load();
            }
            let id = handle.id.clone();
            debug!("Audio player rebound: {id}");
            self.sync_track(pos);
            if loading {
                self.show_loading(pos);
            }
            return id;
        }

        let mut media = factory.create(meta.path.as_deref().unwrap_or_default());
        let loading = !media.is_ready();
        if loading {
            media.load();
        }
        let id = self.register_audio_player(media, meta);
        if let Some(pos) = self.position(&id) {
            self.sync_track(pos);
            if loading {
                self.show_loading(pos);
            }
        }
        id
    }

    /// Make `id` the selected track, stopping the previous one.
    pub fn set_active_player(&mut self, id: &TrackId) -> Result<()> {
        if self.position(id).is_none() {
            return Err(Error::UnknownTrack(id.to_string()));
        }
        self.select(id);
        info!("Active player set: {id}");
        Ok(())
    }

    /// Forget a track, silencing it first.
    pub fn release(&mut self, id: &TrackId) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        let mut handle = self.handles.remove(pos);
        if handle.is_playing() {
            handle.media.pause();
        }
        self.reindex();
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
            self.started_at_ms = None;
        }
        debug!("Audio player released: {id}");
        self.sync_all();
        true
    }

    /// Silence everything and drop every track.
    pub fn cleanup(&mut self) {
        for handle in &mut self.handles {
            if handle.is_playing() {
                handle.supersede();
            }
        }
        self.handles.clear();
        self.index.clear();
        self.selected = None;
        self.started_at_ms = None;
        self.last_progress_ms = None;
        self.sync_all();
        info!("Audio session cleaned up");
    }

    /// Clear mount references older than `generation`; returns how many.
    pub fn drop_stale_mounts(&mut self, generation: u64) -> usize {
        let mut dropped = 0;
        for handle in &mut self.handles {
            if handle.mount.is_some_and(|m| m.generation < generation) {
                handle.mount = None;
                dropped += 1;
            }
        }
        dropped
    }

    /// Release every silent track without a mount from `generation`.
    ///
    /// Runs after a chapter is bound, so tracks only earlier chapters used
    /// don't pile up. When the selected track goes, the first remaining
    /// track is selected instead.
    pub fn release_unmounted(&mut self, generation: u64) -> Vec<TrackId> {
        let unmounted: Vec<TrackId> = self
            .handles
            .iter()
            .filter(|h| !h.is_playing() && h.mount.is_none_or(|m| m.generation < generation))
            .map(|h| h.id.clone())
            .collect();
        for id in &unmounted {
            self.release(id);
        }
        if self.selected.is_none()
            && let Some(first) = self.handles.first().map(|h| h.id.clone())
        {
            self.select(&first);
        }
        unmounted
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Start the selected track. Does nothing when no track is selected.
    pub fn play(&mut self) -> Result<()> {
        let Some(pos) = self.selected_pos() else {
            return Ok(());
        };
        self.stop_others(pos);

        let handle = &mut self.handles[pos];
        match handle.media.play() {
            Ok(()) => {
                handle.state = TrackState::Playing;
                self.started_at_ms.get_or_insert_with(time_now_millis);
                self.sync_all();
                Ok(())
            }
            Err(e) => {
                if handle.state == TrackState::Playing {
                    handle.state = TrackState::Paused;
                }
                warn!("Playback of {} refused: {e}", handle.id);
                let path = handle.source_path.clone();
                let status = match e {
                    PlaybackError::NotAllowed => PlayerStatus::NeedsInteraction,
                    PlaybackError::Failed(_) => PlayerStatus::LoadError,
                };
                self.show_status(&path, status);
                self.sync_all();
                Err(e.into())
            }
        }
    }

    pub fn pause(&mut self) {
        let Some(pos) = self.selected_pos() else {
            return;
        };
        let handle = &mut self.handles[pos];
        handle.media.pause();
        if handle.state == TrackState::Playing {
            handle.state = TrackState::Paused;
        }
        self.started_at_ms = None;
        self.sync_all();
    }

    pub fn toggle(&mut self) -> Result<()> {
        match self.selected_pos() {
            Some(pos) if self.handles[pos].is_playing() => {
                self.pause();
                Ok(())
            }
            Some(_) => self.play(),
            None => Ok(()),
        }
    }

    /// Jump to `fraction` of the selected track; ignored until the
    /// duration is known.
    pub fn seek(&mut self, fraction: f64) {
        let Some(pos) = self.selected_pos() else {
            return;
        };
        let media = &mut self.handles[pos].media;
        let Some(duration) = media.duration().filter(|d| d.is_finite() && *d > 0.0) else {
            return;
        };
        media.set_current_time(clamp_fraction(fraction) * duration);
        self.sync_progress(pos);
    }

    /// Set the selected track's volume; this also unmutes it.
    pub fn set_volume(&mut self, fraction: f64) {
        let Some(pos) = self.selected_pos() else {
            return;
        };
        let media = &mut self.handles[pos].media;
        media.set_volume(clamp_fraction(fraction));
        media.set_muted(false);
        self.sync_volume(pos);
    }

    pub fn toggle_mute(&mut self) {
        let Some(pos) = self.selected_pos() else {
            return;
        };
        let media = &mut self.handles[pos].media;
        let muted = media.is_muted();
        media.set_muted(!muted);
        self.sync_volume(pos);
    }

    /// Select and play the next track in registration order. No wraparound.
    pub fn next(&mut self) -> Result<()> {
        let Some(pos) = self.selected_pos() else {
            return Ok(());
        };
        match self.handles.get(pos + 1).map(|h| h.id.clone()) {
            Some(id) => {
                self.select(&id);
                self.play()
            }
            None => Ok(()),
        }
    }

    /// Select and play the previous track in registration order. No wraparound.
    pub fn previous(&mut self) -> Result<()> {
        let Some(pos) = self.selected_pos().filter(|&p| p > 0) else {
            return Ok(());
        };
        let id = self.handles[pos - 1].id.clone();
        self.select(&id);
        self.play()
    }

    pub fn dispatch(&mut self, command: TransportCommand) -> Result<()> {
        match command {
            TransportCommand::Play => self.play(),
            TransportCommand::Pause => {
                self.pause();
                Ok(())
            }
            TransportCommand::Toggle => self.toggle(),
            TransportCommand::Seek(fraction) => {
                self.seek(fraction);
                Ok(())
            }
            TransportCommand::SetVolume(fraction) => {
                self.set_volume(fraction);
                Ok(())
            }
            TransportCommand::ToggleMute => {
                self.toggle_mute();
                Ok(())
            }
            TransportCommand::Next => self.next(),
            TransportCommand::Previous => self.previous(),
        }
    }

    // ========================================================================
    // Page lifecycle
    // ========================================================================

    /// Stop every playing track (tab hidden, page unload).
    pub fn stop_all_current_players(&mut self) {
        let stopped = self.stop_where(|_| true);
        info!("Stopped {stopped} audio player(s)");
    }

    /// Stop playing tracks except those whose source path is in `keep`.
    ///
    /// Used on chapter navigation: a track the next chapter also references
    /// keeps playing through the transition.
    pub fn stop_players_except(&mut self, keep: &[String]) {
        let stopped = self.stop_where(|h| !keep.iter().any(|p| p == h.source_path()));
        debug!("Stopped {stopped} audio player(s) on navigation");
    }

    fn stop_where(&mut self, stop: impl Fn(&AudioTrackHandle) -> bool) -> usize {
        let mut stopped = 0;
        for handle in &mut self.handles {
            if handle.is_playing() && stop(&*handle) {
                handle.supersede();
                stopped += 1;
            }
        }
        if self.active_session().is_none() {
            self.started_at_ms = None;
        }
        if stopped > 0 {
            self.sync_all();
        }
        stopped
    }

    // ========================================================================
    // Platform feedback
    // ========================================================================

    /// React to an event the platform raised on a track's element.
    pub fn handle_media_event(&mut self, id: &TrackId, event: MediaEvent) {
        let Some(pos) = self.position(id) else {
            debug!("Ignoring {event:?} for unknown track {id}");
            return;
        };

        match event {
            MediaEvent::Play => {
                if self.selected.as_ref() == Some(id) {
                    self.stop_others(pos);
                    self.started_at_ms.get_or_insert_with(time_now_millis);
                } else {
                    self.select(id);
                }
                self.handles[pos].state = TrackState::Playing;
                self.sync_all();
            }
            MediaEvent::Pause => {
                let handle = &mut self.handles[pos];
                if handle.state == TrackState::Playing {
                    handle.state = TrackState::Paused;
                }
                if self.selected.as_ref() == Some(id) {
                    self.started_at_ms = None;
                }
                self.sync_all();
            }
            MediaEvent::Ended => {
                debug!("Track ended: {id}");
                self.handles[pos].rewind();
                if self.selected.as_ref() == Some(id) {
                    self.started_at_ms = None;
                }
                self.sync_all();
                self.sync_progress(pos);
            }
            MediaEvent::TimeUpdate => self.sync_progress(pos),
            MediaEvent::LoadedMetadata => {
                self.sync_progress(pos);
                let path = self.handles[pos].source_path.clone();
                self.show_status(&path, PlayerStatus::Ready);
            }
            MediaEvent::CanPlay => {
                let path = self.handles[pos].source_path.clone();
                self.show_status(&path, PlayerStatus::Hidden);
            }
            MediaEvent::Error(message) => {
                warn!("Audio error for {id}: {message}");
                let path = self.handles[pos].source_path.clone();
                self.show_status(&path, PlayerStatus::LoadError);
            }
        }
    }

    /// Refresh progress of the playing track, at most every
    /// [`PROGRESS_REFRESH_MS`]. Returns whether views were updated.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        let Some(pos) = self.selected_pos().filter(|&p| self.handles[p].is_playing()) else {
            return false;
        };
        if let Some(last) = self.last_progress_ms
            && now_ms.saturating_sub(last) < PROGRESS_REFRESH_MS
        {
            return false;
        }
        self.last_progress_ms = Some(now_ms);
        self.sync_progress(pos);
        true
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn position(&self, id: &TrackId) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn selected_pos(&self) -> Option<usize> {
        self.selected.as_ref().and_then(|id| self.position(id))
    }

    fn generate_id(&mut self) -> TrackId {
        loop {
            self.generated += 1;
            let id = TrackId::new(format!("audio-{}", self.generated));
            if !self.index.contains_key(&id) {
                return id;
            }
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .handles
            .iter()
            .enumerate()
            .map(|(pos, h)| (h.id.clone(), pos))
            .collect();
    }

    fn select(&mut self, id: &TrackId) {
        let Some(pos) = self.position(id) else {
            return;
        };
        let changed = self.selected.as_ref() != Some(id);

        if changed && let Some(prev) = self.selected_pos() {
            self.handles[prev].supersede();
        }

        if self.handles[pos].is_playing() {
            self.stop_others(pos);
            self.handles[pos].state = TrackState::Playing;
            if changed || self.started_at_ms.is_none() {
                self.started_at_ms = Some(time_now_millis());
            }
        } else if changed {
            self.started_at_ms = None;
        }

        self.selected = Some(id.clone());
        self.sync_all();
    }

    fn stop_others(&mut self, keep: usize) {
        for (pos, handle) in self.handles.iter_mut().enumerate() {
            if pos != keep && handle.is_playing() {
                debug!("Stopping {}", handle.id);
                handle.supersede();
            }
        }
    }

    fn sync_all(&mut self) {
        let players: Vec<_> = self
            .handles
            .iter()
            .map(|h| (h.source_path.clone(), h.style, h.is_playing()))
            .collect();
        let toolbar = self.toolbar();
        for view in &mut self.views {
            for (path, style, playing) in &players {
                view.sync_player(path, *style, *playing);
            }
            view.sync_toolbar(toolbar.as_ref());
        }
    }

    fn sync_track(&mut self, pos: usize) {
        let handle = &self.handles[pos];
        let path = handle.source_path.clone();
        let style = handle.style;
        let playing = handle.is_playing();
        for view in &mut self.views {
            view.sync_player(&path, style, playing);
        }
        self.sync_progress(pos);
        self.sync_volume(pos);
    }

    fn sync_progress(&mut self, pos: usize) {
        let handle = &self.handles[pos];
        let media = handle.media();
        let progress = Progress::new(media.current_time(), media.duration());
        let path = handle.source_path.clone();
        let toolbar = (self.selected_pos() == Some(pos))
            .then(|| self.toolbar())
            .flatten();
        for view in &mut self.views {
            view.sync_progress(&path, &progress);
            if toolbar.is_some() {
                view.sync_toolbar(toolbar.as_ref());
            }
        }
    }

    fn sync_volume(&mut self, pos: usize) {
        let handle = &self.handles[pos];
        let media = handle.media();
        let (volume, muted) = (media.volume(), media.is_muted());
        let path = handle.source_path.clone();
        let toolbar = (self.selected_pos() == Some(pos))
            .then(|| self.toolbar())
            .flatten();
        for view in &mut self.views {
            view.sync_volume(&path, volume, muted);
            if toolbar.is_some() {
                view.sync_toolbar(toolbar.as_ref());
            }
        }
    }

    fn show_loading(&mut self, pos: usize) {
        let path = self.handles[pos].source_path.clone();
        self.show_status(&path, PlayerStatus::Loading);
    }

    fn show_status(&mut self, path: &str, status: PlayerStatus) {
        for view in &mut self.views {
            view.show_status(path, status);
        }
    }
}
