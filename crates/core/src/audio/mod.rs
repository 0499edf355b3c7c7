use std::cell::RefCell;
use std::rc::Rc;

/// Playback surface of a loaded audio asset.
///
/// This is the part of a media element the timeline player drives: transport,
/// the playback position and the total duration, all in seconds.
pub trait MediaHandle {
    fn play(&mut self);
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    /// Total length in seconds. May be `NaN` while metadata is unknown.
    fn duration(&self) -> f64;
}

#[derive(Debug)]
struct MediaState {
    duration: f64,
    position: f64,
    paused: bool,
}

/// Headless media element with a manually advanced clock.
///
/// Clones share the same underlying state, so the host can keep a handle to
/// drive the clock after giving one to the player.
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    state: Rc<RefCell<MediaState>>,
}

impl SimulatedMedia {
    pub fn new(duration: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(MediaState {
                duration,
                position: 0.0,
                paused: true,
            })),
        }
    }

    /// Moves the clock forward by `delta` seconds if playing. Returns the new
    /// position. Playback pauses on reaching the end.
    pub fn advance(&self, delta: f64) -> f64 {
        let mut state = self.state.borrow_mut();
        if !state.paused {
            state.position = (state.position + delta.max(0.0)).min(state.duration);
            if state.position >= state.duration {
                state.paused = true;
            }
        }
        state.position
    }

    pub fn ended(&self) -> bool {
        let state = self.state.borrow();
        state.position >= state.duration
    }
}

impl MediaHandle for SimulatedMedia {
    fn play(&mut self) {
        self.state.borrow_mut().paused = false;
    }

    fn pause(&mut self) {
        self.state.borrow_mut().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn current_time(&self) -> f64 {
        self.state.borrow().position
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut state = self.state.borrow_mut();
        state.position = seconds.clamp(0.0, state.duration.max(0.0));
    }

    fn duration(&self) -> f64 {
        self.state.borrow().duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_only_moves_while_playing() {
        let mut media = SimulatedMedia::new(10.0);
        assert_eq!(media.advance(1.0), 0.0);

        media.play();
        assert_eq!(media.advance(1.5), 1.5);

        media.pause();
        assert_eq!(media.advance(1.0), 1.5);
    }

    #[test]
    fn clones_share_state_and_stop_at_the_end() {
        let media = SimulatedMedia::new(2.0);
        let mut handle = media.clone();
        handle.play();

        media.advance(5.0);
        assert_eq!(handle.current_time(), 2.0);
        assert!(handle.is_paused());
        assert!(media.ended());
    }

    #[test]
    fn seeking_clamps_to_duration() {
        let mut media = SimulatedMedia::new(3.0);
        media.set_current_time(7.0);
        assert_eq!(media.current_time(), 3.0);
        media.set_current_time(-1.0);
        assert_eq!(media.current_time(), 0.0);
    }
}
