//! Capabilities the timeline player needs from its transport UI.
//!
//! The player never sees concrete widgets; it is handed a [`SeekControl`] and a
//! [`PlayControl`] and drives them through these traits.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A range input used to display and scrub the playback position.
pub trait SeekControl {
    /// Current slider value in `0..=max`.
    fn position(&self) -> f64;
    fn set_position(&mut self, value: f64);
    fn max_value(&self) -> f64;
}

/// Icon currently shown on the play/pause toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayIcon {
    Play,
    Pause,
}

/// A play/pause toggle button.
pub trait PlayControl {
    fn icon(&self) -> PlayIcon;
    fn set_icon(&mut self, icon: PlayIcon);
}

/// In-memory range slider. Clones refer to the same slider.
#[derive(Debug, Clone)]
pub struct RangeControl {
    value: Rc<Cell<f64>>,
    max: f64,
}

impl RangeControl {
    pub fn new(max: f64) -> Self {
        Self {
            value: Rc::new(Cell::new(0.0)),
            max,
        }
    }

    /// Moves the thumb the way a user drag would.
    pub fn drag_to(&self, value: f64) {
        self.value.set(value.clamp(0.0, self.max));
    }
}

impl SeekControl for RangeControl {
    fn position(&self) -> f64 {
        self.value.get()
    }

    fn set_position(&mut self, value: f64) {
        self.value.set(value.clamp(0.0, self.max));
    }

    fn max_value(&self) -> f64 {
        self.max
    }
}

/// In-memory play/pause button. Clones refer to the same button.
#[derive(Debug, Clone)]
pub struct PlayButton {
    icon: Rc<RefCell<PlayIcon>>,
}

impl Default for PlayButton {
    fn default() -> Self {
        Self {
            icon: Rc::new(RefCell::new(PlayIcon::Play)),
        }
    }
}

impl PlayButton {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayControl for PlayButton {
    fn icon(&self) -> PlayIcon {
        *self.icon.borrow()
    }

    fn set_icon(&mut self, icon: PlayIcon) {
        *self.icon.borrow_mut() = icon;
    }
}
