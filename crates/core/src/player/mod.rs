//! Audio playback synchronised with a timeline of page events.
//!
//! [`TimelineAudioPlayer`] owns one audio resource and one [`Timeline`]. The
//! host feeds it load completions and UI input; the player keeps a cursor into
//! the timeline and hands every event the cursor crosses to the event handler.
//!
//! Resource loading is asynchronous from the player's point of view: a
//! `load_*` call only marks the resource as in flight, and the host reports
//! the result through the matching `complete_*` call. A start requested while
//! either resource is still outstanding is remembered and carried out as soon
//! as the second one becomes ready.

use crate::audio::MediaHandle;
use crate::controls::{PlayControl, PlayIcon, SeekControl};
use crate::timeline::{parse_timeline_document, Timeline, TimelineEvent, TimelineLoadReport};
use crate::{Result, TourError};

/// Callback receiving every event the playback cursor crosses.
pub type EventHandler = Box<dyn FnMut(&TimelineEvent)>;

/// Externally visible lifecycle of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Nothing requested yet.
    Unloaded,
    /// At least one resource is outstanding.
    Loading,
    /// Audio and timeline are loaded; playback has not started.
    Ready,
    Started,
    /// The user is dragging the seek control.
    Seeking,
}

/// UI and media notifications routed to a started player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    /// The media element reported a new playback position.
    TimeUpdate,
    /// Pointer down on the seek control.
    SeekStart,
    /// Pointer up on the seek control.
    SeekEnd,
    PlayToggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Resources are still loading; playback starts once they are ready.
    Deferred,
    AlreadyStarted,
}

/// Where playback is relative to the timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackCursor {
    pub current_time: f64,
    /// Next timeline event that has not fired yet. `None` when none remain.
    pub next_index: Option<usize>,
    pub playing: bool,
    pub seeking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Idle,
    Pending,
    Done,
}

pub struct TimelineAudioPlayer {
    audio_url: Option<String>,
    audio: Option<Box<dyn MediaHandle>>,
    audio_load: LoadState,
    timeline_url: Option<String>,
    timeline_load: LoadState,
    timeline: Timeline,
    cursor: PlaybackCursor,
    handler: Option<EventHandler>,
    seek_control: Option<Box<dyn SeekControl>>,
    play_control: Option<Box<dyn PlayControl>>,
    started: bool,
    /// Autoplay flag of a start requested before the resources were ready.
    pending_start: Option<bool>,
    dispatched: usize,
}

impl Default for TimelineAudioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineAudioPlayer {
    pub fn new() -> Self {
        Self {
            audio_url: None,
            audio: None,
            audio_load: LoadState::Idle,
            timeline_url: None,
            timeline_load: LoadState::Idle,
            timeline: Timeline::new(),
            cursor: PlaybackCursor::default(),
            handler: None,
            seek_control: None,
            play_control: None,
            started: false,
            pending_start: None,
            dispatched: 0,
        }
    }

    pub fn with_audio_url(url: impl Into<String>) -> Self {
        let mut player = Self::new();
        player.audio_url = Some(url.into());
        player
    }

    pub fn set_audio_url(&mut self, url: impl Into<String>) {
        self.audio_url = Some(url.into());
    }

    pub fn audio_url(&self) -> Option<&str> {
        self.audio_url.as_deref()
    }

    pub fn set_event_handler(&mut self, handler: impl FnMut(&TimelineEvent) + 'static) {
        self.handler = Some(Box::new(handler));
    }

    pub fn set_seek_control(&mut self, control: impl SeekControl + 'static) {
        self.seek_control = Some(Box::new(control));
    }

    pub fn set_play_control(&mut self, control: impl PlayControl + 'static) {
        self.play_control = Some(Box::new(control));
    }

    pub fn state(&self) -> PlayerState {
        if self.started {
            if self.cursor.seeking {
                PlayerState::Seeking
            } else {
                PlayerState::Started
            }
        } else if self.is_ready() {
            PlayerState::Ready
        } else if self.audio_load == LoadState::Idle && self.timeline_load == LoadState::Idle {
            PlayerState::Unloaded
        } else {
            PlayerState::Loading
        }
    }

    pub fn audio_ready(&self) -> bool {
        self.audio_load == LoadState::Done
    }

    pub fn events_ready(&self) -> bool {
        self.timeline_load == LoadState::Done
    }

    fn is_ready(&self) -> bool {
        self.audio_ready() && self.events_ready()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn start_pending(&self) -> bool {
        self.pending_start.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.cursor.playing
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Number of events handed to the handler since construction.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn media(&self) -> Option<&dyn MediaHandle> {
        self.audio.as_deref()
    }

    /// Begins loading the audio at the configured URL.
    pub fn load_audio(&mut self) -> Result<()> {
        let Some(url) = self.audio_url.as_deref() else {
            tracing::error!("no audio URL to load");
            return Err(TourError::MissingAudioUrl);
        };
        if self.audio_load != LoadState::Idle {
            tracing::error!(url, "audio is already loading or loaded");
            return Err(TourError::AudioAlreadyLoaded);
        }

        tracing::debug!(url, "loading audio");
        self.audio_load = LoadState::Pending;
        Ok(())
    }

    /// Reports the outcome of the load begun by [`Self::load_audio`].
    ///
    /// A completion with no load in flight is ignored. A failed load can be
    /// retried with another `load_audio` call.
    pub fn complete_audio_load(&mut self, result: Result<Box<dyn MediaHandle>>) -> Result<()> {
        if self.audio_load != LoadState::Pending {
            tracing::debug!("ignoring audio completion with no load in flight");
            return Ok(());
        }

        match result {
            Ok(media) => {
                tracing::info!(
                    url = self.audio_url.as_deref(),
                    duration = media.duration(),
                    "audio loaded"
                );
                self.audio = Some(media);
                self.audio_load = LoadState::Done;
                self.try_deferred_start();
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    url = self.audio_url.as_deref(),
                    error = %err,
                    "audio failed to load"
                );
                self.audio_load = LoadState::Idle;
                Err(err)
            }
        }
    }

    /// Begins loading a timeline document from `url`.
    pub fn load_event_timeline(&mut self, url: impl Into<String>) -> Result<()> {
        let url = url.into();
        if self.started {
            tracing::error!(%url, "cannot load timeline events after start");
            return Err(TourError::AlreadyStarted);
        }
        if self.timeline_load == LoadState::Pending {
            tracing::error!(%url, "a timeline is already loading");
            return Err(TourError::TimelineAlreadyLoaded);
        }

        tracing::debug!(%url, "loading timeline");
        self.timeline_url = Some(url);
        self.timeline_load = LoadState::Pending;
        Ok(())
    }

    /// Reports the fetched body of the timeline document.
    ///
    /// Entries are ingested one by one: a malformed entry is reported in the
    /// returned report and skipped, the rest are registered.
    pub fn complete_timeline_load(
        &mut self,
        result: Result<Vec<u8>>,
    ) -> Result<TimelineLoadReport> {
        if self.timeline_load != LoadState::Pending {
            tracing::debug!("ignoring timeline completion with no load in flight");
            return Ok(TimelineLoadReport::default());
        }

        let document = match result.and_then(|bytes| parse_timeline_document(&bytes)) {
            Ok(document) => document,
            Err(err) => {
                tracing::error!(
                    url = self.timeline_url.as_deref(),
                    error = %err,
                    "timeline failed to load"
                );
                self.timeline_load = LoadState::Idle;
                return Err(err);
            }
        };

        let mut report = TimelineLoadReport::default();
        for entry in document.entries {
            match entry.and_then(|event| self.register_event(event)) {
                Ok(()) => report.accepted += 1,
                Err(err) => {
                    tracing::error!(error = %err, "skipping timeline event");
                    report.rejected.push(err);
                }
            }
        }

        tracing::info!(
            url = self.timeline_url.as_deref(),
            accepted = report.accepted,
            rejected = report.rejected.len(),
            "timeline loaded"
        );
        self.timeline_load = LoadState::Done;
        self.try_deferred_start();
        Ok(report)
    }

    /// Marks the timeline as complete without fetching a document, for
    /// timelines assembled only through [`Self::register_event`].
    pub fn seal_timeline(&mut self) -> Result<()> {
        if self.timeline_load == LoadState::Pending {
            return Err(TourError::TimelineAlreadyLoaded);
        }
        self.timeline_load = LoadState::Done;
        self.try_deferred_start();
        Ok(())
    }

    /// Adds one event to the timeline. Ordering happens at start.
    pub fn register_event(&mut self, event: TimelineEvent) -> Result<()> {
        if self.started {
            tracing::error!("cannot add timeline events after start");
            return Err(TourError::AlreadyStarted);
        }
        if self.handler.is_none() {
            tracing::error!("a timeline event handler must be set before adding events");
            return Err(TourError::MissingEventHandler);
        }
        if let Err(reason) = event.validate() {
            return Err(TourError::InvalidEvent {
                index: self.timeline.len(),
                reason,
            });
        }

        self.timeline.push(event);
        Ok(())
    }

    /// Starts playback, or defers it until both resources are ready.
    pub fn start(&mut self, autoplay: bool) -> Result<StartOutcome> {
        if self.started {
            return Ok(StartOutcome::AlreadyStarted);
        }
        if !self.is_ready() {
            tracing::debug!(
                audio_ready = self.audio_ready(),
                events_ready = self.events_ready(),
                "deferring start until resources are loaded"
            );
            self.pending_start = Some(autoplay);
            return Ok(StartOutcome::Deferred);
        }

        self.start_now(autoplay)?;
        Ok(StartOutcome::Started)
    }

    fn try_deferred_start(&mut self) {
        if !self.is_ready() {
            return;
        }
        if let Some(autoplay) = self.pending_start {
            if let Err(err) = self.start_now(autoplay) {
                tracing::error!(error = %err, "deferred start failed");
            }
        }
    }

    fn start_now(&mut self, autoplay: bool) -> Result<()> {
        self.pending_start = None;
        let (Some(seek), Some(play)) = (self.seek_control.as_mut(), self.play_control.as_mut())
        else {
            tracing::error!("seek and play controls must be assigned before start");
            return Err(TourError::ControlsUnassigned);
        };
        let Some(media) = self.audio.as_mut() else {
            return Err(TourError::msg("audio handle missing after load"));
        };

        self.timeline.sort();
        self.cursor = PlaybackCursor {
            current_time: media.current_time(),
            next_index: (!self.timeline.is_empty()).then_some(0),
            playing: autoplay,
            seeking: false,
        };

        seek.set_position(0.0);
        if autoplay {
            media.play();
            play.set_icon(PlayIcon::Pause);
        } else {
            play.set_icon(PlayIcon::Play);
        }

        self.started = true;
        tracing::info!(events = self.timeline.len(), autoplay, "playback started");
        Ok(())
    }

    /// Stops playback and rewinds. Returns whether the player was started.
    ///
    /// A deferred start is cancelled as well.
    pub fn stop(&mut self) -> bool {
        self.pending_start = None;
        if !self.started {
            return false;
        }

        if let Some(media) = self.audio.as_mut() {
            media.pause();
            media.set_current_time(0.0);
        }
        if let Some(seek) = self.seek_control.as_mut() {
            seek.set_position(0.0);
        }
        if let Some(play) = self.play_control.as_mut() {
            play.set_icon(PlayIcon::Play);
        }

        self.cursor = PlaybackCursor::default();
        self.started = false;
        tracing::info!("playback stopped");
        true
    }

    pub fn shutdown(&mut self) -> bool {
        self.stop()
    }

    /// Routes a UI or media notification. Input is ignored unless the player
    /// is started; returns whether it was handled.
    pub fn handle_input(&mut self, input: PlayerInput) -> bool {
        if !self.started {
            tracing::trace!(?input, "ignoring input while stopped");
            return false;
        }

        match input {
            PlayerInput::TimeUpdate => self.on_time_update(),
            PlayerInput::SeekStart => self.on_seek_start(),
            PlayerInput::SeekEnd => self.on_seek_end(),
            PlayerInput::PlayToggle => self.on_play_toggle(),
        }
        true
    }

    fn on_time_update(&mut self) {
        let Some(media) = self.audio.as_ref() else {
            return;
        };
        let current = media.current_time();
        let duration = media.duration();
        self.cursor.current_time = current;

        if !self.cursor.seeking && duration.is_finite() && duration > 0.0 {
            if let Some(seek) = self.seek_control.as_mut() {
                let max = seek.max_value();
                seek.set_position(current / duration * max);
            }
        }

        while let Some(index) = self.cursor.next_index {
            let due = self
                .timeline
                .get(index)
                .is_some_and(|event| event.time <= current);
            if !due {
                break;
            }
            self.dispatch(index);
            self.cursor.next_index = (index + 1 < self.timeline.len()).then_some(index + 1);
        }
    }

    fn on_seek_start(&mut self) {
        self.cursor.seeking = true;
        if let Some(media) = self.audio.as_mut() {
            media.pause();
        }
    }

    fn on_seek_end(&mut self) {
        let (Some(media), Some(seek)) = (self.audio.as_mut(), self.seek_control.as_ref()) else {
            return;
        };

        let max = seek.max_value();
        let fraction = if max > 0.0 { seek.position() / max } else { 0.0 };
        let duration = media.duration();
        let target = if duration.is_finite() { fraction * duration } else { 0.0 };
        media.set_current_time(target);
        let current = media.current_time();
        if self.cursor.playing {
            media.play();
        }

        self.cursor.current_time = current;
        self.cursor.next_index = self.timeline.first_at_or_after(current);
        tracing::debug!(current, next = ?self.cursor.next_index, "seeked");

        if let Some(event) = self.timeline.last_continuous_before(current) {
            tracing::debug!(time = event.time, kind = %event.kind, "re-applying continuous event");
            if let Some(handler) = self.handler.as_mut() {
                handler(event);
                self.dispatched += 1;
            }
        }

        self.cursor.seeking = false;
    }

    fn on_play_toggle(&mut self) {
        let Some(media) = self.audio.as_mut() else {
            return;
        };
        let icon = if self.cursor.playing {
            media.pause();
            PlayIcon::Play
        } else {
            media.play();
            PlayIcon::Pause
        };
        self.cursor.playing = !self.cursor.playing;
        if let Some(play) = self.play_control.as_mut() {
            play.set_icon(icon);
        }
    }

    fn dispatch(&mut self, index: usize) {
        let (Some(event), Some(handler)) = (self.timeline.get(index), self.handler.as_mut()) else {
            return;
        };
        tracing::debug!(
            time = event.time,
            kind = %event.kind,
            target = %event.target,
            "dispatching event"
        );
        handler(event);
        self.dispatched += 1;
    }
}

impl std::fmt::Debug for TimelineAudioPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineAudioPlayer")
            .field("audio_url", &self.audio_url)
            .field("state", &self.state())
            .field("events", &self.timeline.len())
            .field("cursor", &self.cursor)
            .field("pending_start", &self.pending_start)
            .finish()
    }
}
