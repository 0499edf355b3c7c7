//! The narrated page tour: transport UI plus the default event actions.

use std::cell::Cell;
use std::rc::Rc;

use crate::audio::MediaHandle;
use crate::config::{HighlightConfig, TourConfig};
use crate::controls::{PlayButton, PlayControl, PlayIcon, RangeControl};
use crate::page::{
    flash_element, Document, Element, ScrollBlock, ScrollOptions, SharedDocument, BODY_ID,
};
use crate::player::{PlayerInput, StartOutcome, TimelineAudioPlayer};
use crate::settings::{read_flag, write_flag, SharedPreferences};
use crate::timeline::{TimelineEvent, TimelineLoadReport};
use crate::{Result, TourError};

pub const CONTROL_BOX_ID: &str = "virtual-tour-control-box";
pub const BUTTON_GROUP_ID: &str = "virtual-tour-button-group";
pub const PLAY_BUTTON_ID: &str = "virtual-tour-play-button";
pub const EXIT_BUTTON_ID: &str = "virtual-tour-exit-button";
pub const AUTO_SCROLL_BUTTON_ID: &str = "virtual-tour-auto-scroll-button";
pub const TIME_SLIDER_ID: &str = "virtual-tour-time-slider";
pub const STARTUP_BUTTON_ID: &str = "virtual-tour-startup-button";

/// User and media notifications the tour reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiEvent {
    StartupClicked,
    PlayClicked,
    ExitClicked,
    AutoScrollClicked,
    SeekPressed,
    /// Pointer released on the slider at the given slider value.
    SeekReleased(f64),
    MediaTimeUpdate,
}

/// Builds the tour UI on a page and drives one [`TimelineAudioPlayer`].
pub struct TourController {
    config: TourConfig,
    document: SharedDocument,
    preferences: SharedPreferences,
    auto_scroll: Rc<Cell<bool>>,
    player: Option<TimelineAudioPlayer>,
    slider: RangeControl,
    play_button: PlayButton,
    startup_available: bool,
}

impl TourController {
    pub fn new(
        document: SharedDocument,
        preferences: SharedPreferences,
        config: TourConfig,
    ) -> Self {
        let slider = RangeControl::new(config.slider_max);
        Self {
            config,
            document,
            preferences,
            auto_scroll: Rc::new(Cell::new(true)),
            player: None,
            slider,
            play_button: PlayButton::new(),
            startup_available: false,
        }
    }

    pub fn is_built(&self) -> bool {
        self.player.is_some()
    }

    pub fn player(&self) -> Option<&TimelineAudioPlayer> {
        self.player.as_ref()
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn slider(&self) -> &RangeControl {
        &self.slider
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll.get()
    }

    /// Whether the "start tour" button could be placed on the page.
    pub fn startup_available(&self) -> bool {
        self.startup_available
    }

    fn player_mut(&mut self) -> Result<&mut TimelineAudioPlayer> {
        self.player.as_mut().ok_or(TourError::NotBuilt)
    }

    /// Creates the player and the transport UI and begins loading the audio.
    /// Building an already built tour does nothing.
    pub fn build(&mut self, audio_url: &str) -> Result<()> {
        if self.is_built() {
            tracing::debug!("tour already built");
            return Ok(());
        }

        self.auto_scroll.set(read_flag(
            &*self.preferences.borrow(),
            &self.config.auto_scroll_key,
            true,
        ));

        let mut player = TimelineAudioPlayer::with_audio_url(audio_url);
        player.set_event_handler(event_handler(
            self.document.clone(),
            self.auto_scroll.clone(),
            self.config.highlight.clone(),
        ));
        player.set_seek_control(self.slider.clone());
        player.set_play_control(self.play_button.clone());
        player.load_audio()?;

        self.build_controls()?;
        self.startup_available = self.place_startup_button()?;
        self.player = Some(player);
        tracing::info!(audio_url, auto_scroll = self.auto_scroll.get(), "tour built");
        Ok(())
    }

    fn build_controls(&mut self) -> Result<()> {
        let mut doc = self.document.borrow_mut();
        doc.insert(Element::new("div", CONTROL_BOX_ID));
        doc.add_child(CONTROL_BOX_ID, Element::new("div", BUTTON_GROUP_ID))?;
        doc.add_child(
            BUTTON_GROUP_ID,
            Element::new("button", PLAY_BUTTON_ID)
                .with_class("virtual-tour-control-button")
                .with_attribute("data-icon", "play"),
        )?;
        doc.add_child(
            BUTTON_GROUP_ID,
            Element::new("button", EXIT_BUTTON_ID).with_class("virtual-tour-control-button"),
        )?;
        doc.add_child(
            BUTTON_GROUP_ID,
            Element::new("button", AUTO_SCROLL_BUTTON_ID)
                .with_class("virtual-tour-control-button")
                .with_attribute("aria-pressed", self.auto_scroll.get().to_string()),
        )?;
        doc.add_child(
            CONTROL_BOX_ID,
            Element::new("input", TIME_SLIDER_ID)
                .with_attribute("type", "range")
                .with_attribute("min", "0")
                .with_attribute("max", self.config.slider_max.to_string())
                .with_attribute("value", "0"),
        )?;
        Ok(())
    }

    fn place_startup_button(&mut self) -> Result<bool> {
        let mut doc = self.document.borrow_mut();
        let container = self.config.startup_container_id.as_str();
        if !doc.contains(container) {
            tracing::error!(
                container,
                "cannot find a location for the tour startup button; the tour is unavailable"
            );
            return Ok(false);
        }

        doc.add_child(
            container,
            Element::new("button", STARTUP_BUTTON_ID)
                .with_class("button-1")
                .with_text("Virtual Tour"),
        )?;
        Ok(true)
    }

    /// Completes the audio load. A deferred start may begin here.
    pub fn complete_audio_load(&mut self, result: Result<Box<dyn MediaHandle>>) -> Result<()> {
        let outcome = self.player_mut()?.complete_audio_load(result);
        self.sync_play_icon();
        outcome
    }

    pub fn load_event_timeline(&mut self, url: &str) -> Result<()> {
        self.player_mut()?.load_event_timeline(url)
    }

    pub fn complete_timeline_load(
        &mut self,
        result: Result<Vec<u8>>,
    ) -> Result<TimelineLoadReport> {
        let outcome = self.player_mut()?.complete_timeline_load(result);
        self.sync_play_icon();
        outcome
    }

    /// Mounts the control box and starts (or defers) playback.
    pub fn start(&mut self) -> Result<StartOutcome> {
        if !self.is_built() {
            return Err(TourError::NotBuilt);
        }
        self.document.borrow_mut().append_child(BODY_ID, CONTROL_BOX_ID)?;
        let outcome = self.player_mut()?.start(true)?;
        self.sync_play_icon();
        Ok(outcome)
    }

    /// Unmounts the control box and stops playback.
    pub fn stop(&mut self) -> Result<bool> {
        if !self.is_built() {
            return Err(TourError::NotBuilt);
        }
        self.document.borrow_mut().detach(CONTROL_BOX_ID);
        let stopped = self.player_mut()?.stop();
        self.sync_play_icon();
        Ok(stopped)
    }

    pub fn handle(&mut self, event: UiEvent) -> Result<()> {
        match event {
            UiEvent::StartupClicked => self.start().map(|_| ()),
            UiEvent::ExitClicked => self.stop().map(|_| ()),
            UiEvent::AutoScrollClicked => self.toggle_auto_scroll(),
            UiEvent::PlayClicked => {
                self.player_mut()?.handle_input(PlayerInput::PlayToggle);
                self.sync_play_icon();
                Ok(())
            }
            UiEvent::SeekPressed => {
                self.player_mut()?.handle_input(PlayerInput::SeekStart);
                Ok(())
            }
            UiEvent::SeekReleased(value) => {
                self.slider.drag_to(value);
                self.player_mut()?.handle_input(PlayerInput::SeekEnd);
                Ok(())
            }
            UiEvent::MediaTimeUpdate => {
                self.player_mut()?.handle_input(PlayerInput::TimeUpdate);
                Ok(())
            }
        }
    }

    /// Flips the auto-scroll preference and persists it.
    pub fn toggle_auto_scroll(&mut self) -> Result<()> {
        let enabled = !self.auto_scroll.get();
        self.auto_scroll.set(enabled);

        if let Some(button) = self.document.borrow_mut().get_mut(AUTO_SCROLL_BUTTON_ID) {
            button
                .attributes
                .insert("aria-pressed".to_string(), enabled.to_string());
        }

        tracing::info!(enabled, "auto-scroll toggled");
        write_flag(
            &mut *self.preferences.borrow_mut(),
            &self.config.auto_scroll_key,
            enabled,
        )
        .inspect_err(|err| {
            tracing::error!(error = %err, "failed to persist auto-scroll preference")
        })
    }

    fn sync_play_icon(&mut self) {
        let icon = match self.play_button.icon() {
            PlayIcon::Play => "play",
            PlayIcon::Pause => "pause",
        };
        if let Some(button) = self.document.borrow_mut().get_mut(PLAY_BUTTON_ID) {
            button.attributes.insert("data-icon".to_string(), icon.to_string());
        }
    }
}

impl std::fmt::Debug for TourController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TourController")
            .field("player", &self.player)
            .field("auto_scroll", &self.auto_scroll.get())
            .field("startup_available", &self.startup_available)
            .finish()
    }
}

fn event_handler(
    document: SharedDocument,
    auto_scroll: Rc<Cell<bool>>,
    highlight: HighlightConfig,
) -> impl FnMut(&TimelineEvent) + 'static {
    move |event: &TimelineEvent| {
        let result = apply_event(&mut document.borrow_mut(), event, auto_scroll.get(), &highlight);
        if let Err(err) = result {
            tracing::error!(
                target_id = %event.target,
                kind = %event.kind,
                error = %err,
                "tour event skipped"
            );
        }
    }
}

/// Default tour action for one timeline event.
///
/// Types containing `highlight` flash the target, types containing `focus`
/// scroll it to the centre of the view when auto-scroll is on. Other types
/// are ignored.
pub fn apply_event(
    document: &mut Document,
    event: &TimelineEvent,
    auto_scroll: bool,
    highlight: &HighlightConfig,
) -> Result<()> {
    let highlights = event.kind.contains("highlight");
    let focuses = event.kind.contains("focus");
    if !highlights && !focuses {
        return Ok(());
    }
    if !document.contains(&event.target) {
        return Err(TourError::UnknownTarget(event.target.clone()));
    }

    if highlights {
        flash_element(document, &event.target, highlight)?;
    }
    if focuses && auto_scroll {
        document.scroll_into_view(
            &event.target,
            ScrollOptions {
                smooth: true,
                block: ScrollBlock::Center,
            },
        )?;
    }
    Ok(())
}
