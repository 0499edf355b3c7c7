//! Headless page model: an element tree addressed by id plus a timer queue.
//!
//! Everything the tour and the page helpers touch on a web page goes through
//! [`Document`], so they can run (and be tested) without a browser.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::HighlightConfig;
use crate::{Result, TourError};

/// Id of the root element every mounted element hangs off.
pub const BODY_ID: &str = "body";

pub type SharedDocument = Rc<RefCell<Document>>;

/// Inline style properties the page helpers read and write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub background: Option<String>,
    pub transition: Option<String>,
    pub opacity: Option<f64>,
    pub font_size: Option<f64>,
    pub white_space: Option<String>,
    pub overflow: Option<String>,
}

/// Layout measurements of an element, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxModel {
    pub client_width: f64,
    pub padding_left: f64,
    pub padding_right: f64,
}

impl BoxModel {
    pub fn available_width(&self) -> f64 {
        self.client_width - self.padding_left - self.padding_right
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBlock {
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOptions {
    pub smooth: bool,
    pub block: ScrollBlock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: String,
    pub tag: String,
    pub classes: Vec<String>,
    pub text: String,
    pub attributes: HashMap<String, String>,
    pub style: Style,
    pub layout: BoxModel,
    /// Font size from the stylesheet, used when no inline size is set.
    pub base_font_size: f64,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub scroll_requests: Vec<ScrollOptions>,
}

impl Element {
    pub fn new(tag: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
            classes: Vec::new(),
            text: String::new(),
            attributes: HashMap::new(),
            style: Style::default(),
            layout: BoxModel::default(),
            base_font_size: 16.0,
            parent: None,
            children: Vec::new(),
            scroll_requests: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_layout(mut self, layout: BoxModel) -> Self {
        self.layout = layout;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Inline font size if set, otherwise the stylesheet size.
    pub fn computed_font_size(&self) -> f64 {
        self.style.font_size.unwrap_or(self.base_font_size)
    }
}

/// Deferred page mutations run by the timer queue.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerAction {
    /// Second stage of a highlight flash: fade back to the original
    /// background, then restore the original transition.
    FadeBack {
        id: String,
        background: Option<String>,
        transition: Option<String>,
        fade_ms: u64,
    },
    RestoreTransition {
        id: String,
        transition: Option<String>,
    },
    Navigate {
        href: String,
    },
}

#[derive(Debug)]
struct Timer {
    due_ms: u64,
    seq: u64,
    action: TimerAction,
}

/// In-memory document with a millisecond clock.
#[derive(Debug)]
pub struct Document {
    elements: HashMap<String, Element>,
    timers: Vec<Timer>,
    now_ms: u64,
    next_seq: u64,
    location: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut elements = HashMap::new();
        elements.insert(BODY_ID.to_string(), Element::new("body", BODY_ID));
        Self {
            elements,
            timers: Vec::new(),
            now_ms: 0,
            next_seq: 0,
            location: None,
        }
    }

    pub fn shared() -> SharedDocument {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Registers an element without attaching it anywhere. An existing element
    /// with the same id is detached and replaced, and its children are left
    /// unattached.
    pub fn insert(&mut self, element: Element) {
        self.detach(&element.id);
        if let Some(old) = self.elements.insert(element.id.clone(), element) {
            for child in old.children {
                if let Some(child) = self.elements.get_mut(&child) {
                    child.parent = None;
                }
            }
        }
    }

    /// Registers an element and appends it to `parent`.
    pub fn add_child(&mut self, parent: &str, element: Element) -> Result<()> {
        let id = element.id.clone();
        self.insert(element);
        self.append_child(parent, &id)
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    fn element_mut(&mut self, id: &str) -> Result<&mut Element> {
        self.elements
            .get_mut(id)
            .ok_or_else(|| TourError::UnknownTarget(id.to_string()))
    }

    /// Moves `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: &str, child: &str) -> Result<()> {
        if !self.contains(parent) {
            return Err(TourError::UnknownTarget(parent.to_string()));
        }
        if !self.contains(child) {
            return Err(TourError::UnknownTarget(child.to_string()));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(TourError::InvalidInput("cannot append an element to itself"));
        }

        self.detach(child);
        self.element_mut(parent)?.children.push(child.to_string());
        self.element_mut(child)?.parent = Some(parent.to_string());
        Ok(())
    }

    /// Detaches an element from its parent. The element stays registered so it
    /// can be mounted again. Returns whether it was attached.
    pub fn detach(&mut self, id: &str) -> bool {
        let Some(parent) = self.elements.get_mut(id).and_then(|e| e.parent.take()) else {
            return false;
        };
        if let Some(parent) = self.elements.get_mut(&parent) {
            parent.children.retain(|child| child != id);
        }
        true
    }

    fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut current = self.get(id).and_then(|e| e.parent.as_deref());
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.get(parent).and_then(|e| e.parent.as_deref());
        }
        false
    }

    /// Whether the element is reachable from `body`.
    pub fn is_connected(&self, id: &str) -> bool {
        id == BODY_ID || (self.contains(id) && self.is_ancestor(BODY_ID, id))
    }

    pub fn ids_with_class(&self, class: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .elements
            .values()
            .filter(|element| element.has_class(class))
            .map(|element| element.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn ids_with_tag(&self, tag: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .elements
            .values()
            .filter(|element| element.tag == tag)
            .map(|element| element.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn scroll_into_view(&mut self, id: &str, options: ScrollOptions) -> Result<()> {
        self.element_mut(id)?.scroll_requests.push(options);
        Ok(())
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn set_timeout(&mut self, delay_ms: u64, action: TimerAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Timer {
            due_ms: self.now_ms + delay_ms,
            seq,
            action,
        });
    }

    /// Advances the clock by `ms`, running every timer that falls due in order.
    /// Timers scheduled by a running timer run in the same call if they fall
    /// due before the new time.
    pub fn advance(&mut self, ms: u64) {
        let target = self.now_ms + ms;
        loop {
            let next = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, timer)| timer.due_ms <= target)
                .min_by_key(|(_, timer)| (timer.due_ms, timer.seq))
                .map(|(index, _)| index);
            let Some(index) = next else { break };

            let timer = self.timers.swap_remove(index);
            self.now_ms = self.now_ms.max(timer.due_ms);
            self.run_timer(timer.action);
        }
        self.now_ms = target;
    }

    fn run_timer(&mut self, action: TimerAction) {
        match action {
            TimerAction::FadeBack {
                id,
                background,
                transition,
                fade_ms,
            } => {
                // The element may have been removed from the page meanwhile.
                let Some(element) = self.elements.get_mut(&id) else {
                    return;
                };
                element.style.transition = Some(format!("background {}s", seconds(fade_ms)));
                element.style.background = background;
                self.set_timeout(fade_ms, TimerAction::RestoreTransition { id, transition });
            }
            TimerAction::RestoreTransition { id, transition } => {
                if let Some(element) = self.elements.get_mut(&id) {
                    element.style.transition = transition;
                }
            }
            TimerAction::Navigate { href } => {
                tracing::debug!(%href, "navigating");
                self.location = Some(href);
            }
        }
    }
}

fn seconds(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

/// Briefly recolours an element's background and fades it back.
///
/// The flash stage lasts `flash_ms`, after which the original background
/// returns over `fade_ms` and the original transition is restored.
pub fn flash_element(document: &mut Document, id: &str, highlight: &HighlightConfig) -> Result<()> {
    let element = document.element_mut(id)?;
    let background = element.style.background.clone();
    let transition = element.style.transition.clone();

    element.style.transition = Some(format!("background {}s", seconds(highlight.flash_ms)));
    element.style.background = Some(highlight.color.clone());

    document.set_timeout(
        highlight.flash_ms,
        TimerAction::FadeBack {
            id: id.to_string(),
            background,
            transition,
            fade_ms: highlight.fade_ms,
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_detach_track_connection() {
        let mut doc = Document::new();
        doc.add_child(BODY_ID, Element::new("div", "box")).unwrap();
        doc.add_child("box", Element::new("button", "play")).unwrap();

        assert!(doc.is_connected("play"));
        assert!(doc.detach("box"));
        assert!(!doc.is_connected("play"));
        assert!(doc.contains("play"));

        doc.append_child(BODY_ID, "box").unwrap();
        assert!(doc.is_connected("play"));
        assert_eq!(doc.get(BODY_ID).unwrap().children, ["box"]);
    }

    #[test]
    fn replacing_an_element_does_not_duplicate_it() {
        let mut doc = Document::new();
        doc.add_child(BODY_ID, Element::new("div", "x")).unwrap();
        doc.add_child("x", Element::new("span", "label")).unwrap();
        doc.add_child(BODY_ID, Element::new("div", "x")).unwrap();

        assert_eq!(doc.get(BODY_ID).unwrap().children, ["x"]);
        assert!(doc.get("x").unwrap().children.is_empty());
        assert!(!doc.is_connected("label"));

        doc.insert(Element::new("div", "x"));
        assert!(doc.get(BODY_ID).unwrap().children.is_empty());
        assert!(!doc.is_connected("x"));
    }

    #[test]
    fn rejects_cycles_and_unknown_ids() {
        let mut doc = Document::new();
        doc.add_child(BODY_ID, Element::new("div", "outer")).unwrap();
        doc.add_child("outer", Element::new("div", "inner")).unwrap();

        assert!(doc.append_child("inner", "outer").is_err());
        assert!(matches!(
            doc.append_child("ghost", "inner"),
            Err(TourError::UnknownTarget(id)) if id == "ghost"
        ));
    }

    #[test]
    fn flash_runs_both_stages_then_restores_transition() {
        let mut doc = Document::new();
        let mut element = Element::new("section", "intro");
        element.style.background = Some("white".into());
        element.style.transition = Some("opacity 1s".into());
        doc.add_child(BODY_ID, element).unwrap();

        let highlight = HighlightConfig::default();
        flash_element(&mut doc, "intro", &highlight).unwrap();
        let style = &doc.get("intro").unwrap().style;
        assert_eq!(style.background.as_deref(), Some("rgb(255, 244, 214)"));
        assert_eq!(style.transition.as_deref(), Some("background 0.2s"));

        doc.advance(200);
        let style = &doc.get("intro").unwrap().style;
        assert_eq!(style.background.as_deref(), Some("white"));
        assert_eq!(style.transition.as_deref(), Some("background 0.6s"));

        doc.advance(599);
        assert_eq!(doc.pending_timers(), 1);
        doc.advance(1);
        assert_eq!(doc.get("intro").unwrap().style.transition.as_deref(), Some("opacity 1s"));
        assert_eq!(doc.pending_timers(), 0);
    }

    #[test]
    fn chained_timers_run_within_one_advance() {
        let mut doc = Document::new();
        doc.add_child(BODY_ID, Element::new("p", "note")).unwrap();
        flash_element(&mut doc, "note", &HighlightConfig::default()).unwrap();

        doc.advance(10_000);
        let style = &doc.get("note").unwrap().style;
        assert_eq!(style.background, None);
        assert_eq!(style.transition, None);
        assert_eq!(doc.now_ms(), 10_000);
    }

    #[test]
    fn flash_on_missing_element_is_reported() {
        let mut doc = Document::new();
        let err = flash_element(&mut doc, "nowhere", &HighlightConfig::default()).unwrap_err();
        assert!(matches!(err, TourError::UnknownTarget(_)));
        assert_eq!(doc.pending_timers(), 0);
    }
}
