//! Banner text that resizes to fit its element width.
//!
//! `fit-scale-text` elements always fill the available width. Elements with
//! `shrink-scale-text` keep their original size and only shrink when the text
//! would overflow.

use std::collections::BTreeMap;

use crate::page::Document;

pub const FIT_CLASS: &str = "fit-scale-text";
pub const SHRINK_CLASS: &str = "shrink-scale-text";

/// Measures rendered text width in pixels.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f64) -> f64;
}

/// Approximates every glyph as a fixed fraction of the font size.
#[derive(Debug, Clone, Copy)]
pub struct AverageCharMeasure {
    pub advance: f64,
}

impl Default for AverageCharMeasure {
    fn default() -> Self {
        Self { advance: 0.5 }
    }
}

impl TextMeasure for AverageCharMeasure {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        text.trim().chars().count() as f64 * font_size * self.advance
    }
}

#[derive(Debug, Clone, Copy)]
struct ShrinkState {
    original: f64,
    /// Size this scaler last wrote, to notice external changes.
    last_written: Option<f64>,
}

#[derive(Debug)]
pub struct TextScaler<M = AverageCharMeasure> {
    measure: M,
    min_font_size: f64,
    fit: Vec<String>,
    shrink: BTreeMap<String, ShrinkState>,
}

impl<M: TextMeasure> TextScaler<M> {
    pub fn new(measure: M, min_font_size: f64) -> Self {
        Self {
            measure,
            min_font_size,
            fit: Vec::new(),
            shrink: BTreeMap::new(),
        }
    }

    pub fn registered(&self) -> usize {
        self.fit.len() + self.shrink.len()
    }

    /// Picks up scaling elements on the page and runs one scaling pass.
    pub fn register(&mut self, document: &mut Document) {
        for id in document.ids_with_class(FIT_CLASS) {
            if let Some(element) = document.get_mut(&id) {
                element.style.white_space = Some("nowrap".into());
                element.style.overflow = Some("hidden".into());
            }
            if !self.fit.contains(&id) {
                self.fit.push(id);
            }
        }

        for id in document.ids_with_class(SHRINK_CLASS) {
            let Some(element) = document.get_mut(&id) else {
                continue;
            };
            element.style.white_space = Some("nowrap".into());
            element.style.overflow = Some("hidden".into());
            let original = element.computed_font_size();
            self.shrink.entry(id).or_insert(ShrinkState {
                original,
                last_written: None,
            });
        }

        self.rescale(document);
    }

    /// Recomputes font sizes, e.g. after the viewport was resized.
    pub fn rescale(&mut self, document: &mut Document) {
        for id in &self.fit {
            let Some(element) = document.get_mut(id) else {
                continue;
            };
            let font_size = element.computed_font_size();
            let width = self.measure.text_width(&element.text, font_size);
            if width <= 0.0 {
                continue;
            }
            let next = font_size * element.layout.available_width() / width;
            element.style.font_size = Some(next.max(self.min_font_size));
        }

        for (id, state) in &mut self.shrink {
            let Some(element) = document.get_mut(id) else {
                continue;
            };
            let font_size = element.computed_font_size();
            if state.last_written != element.style.font_size {
                state.original = font_size;
            }

            let width = self.measure.text_width(&element.text, font_size);
            let scaled = if width > 0.0 {
                font_size * element.layout.available_width() / width
            } else {
                state.original
            };
            let next = scaled.min(state.original).max(self.min_font_size);
            element.style.font_size = Some(next);
            state.last_written = Some(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{BoxModel, Element, BODY_ID};

    fn banner(id: &str, class: &str, width: f64, text: &str) -> Element {
        Element::new("h1", id)
            .with_class(class)
            .with_text(text)
            .with_layout(BoxModel {
                client_width: width,
                padding_left: 10.0,
                padding_right: 10.0,
            })
    }

    fn scaler() -> TextScaler {
        TextScaler::new(AverageCharMeasure::default(), 1.0)
    }

    #[test]
    fn fit_text_fills_available_width() {
        let mut doc = Document::new();
        // 10 chars at 16px and 0.5 advance = 80px of text in 200px.
        doc.add_child(BODY_ID, banner("title", FIT_CLASS, 220.0, "Portfolio!")).unwrap();

        let mut scaler = scaler();
        scaler.register(&mut doc);

        let style = &doc.get("title").unwrap().style;
        assert_eq!(style.font_size, Some(40.0));
        assert_eq!(style.white_space.as_deref(), Some("nowrap"));
        assert_eq!(scaler.registered(), 1);
    }

    #[test]
    fn fit_text_respects_minimum() {
        let mut doc = Document::new();
        doc.add_child(BODY_ID, banner("title", FIT_CLASS, 20.5, "Portfolio!")).unwrap();

        scaler().register(&mut doc);
        assert_eq!(doc.get("title").unwrap().style.font_size, Some(1.0));
    }

    #[test]
    fn shrink_text_never_grows_past_original() {
        let mut doc = Document::new();
        doc.add_child(BODY_ID, banner("name", SHRINK_CLASS, 420.0, "Portfolio!")).unwrap();

        let mut scaler = scaler();
        scaler.register(&mut doc);
        assert_eq!(doc.get("name").unwrap().style.font_size, Some(16.0));

        doc.get_mut("name").unwrap().layout.client_width = 60.0;
        scaler.rescale(&mut doc);
        assert_eq!(doc.get("name").unwrap().style.font_size, Some(8.0));

        doc.get_mut("name").unwrap().layout.client_width = 420.0;
        scaler.rescale(&mut doc);
        assert_eq!(doc.get("name").unwrap().style.font_size, Some(16.0));
    }

    #[test]
    fn shrink_text_adopts_external_font_changes() {
        let mut doc = Document::new();
        doc.add_child(BODY_ID, banner("name", SHRINK_CLASS, 60.0, "Portfolio!")).unwrap();

        let mut scaler = scaler();
        scaler.register(&mut doc);
        assert_eq!(doc.get("name").unwrap().style.font_size, Some(8.0));

        doc.get_mut("name").unwrap().style.font_size = Some(30.0);
        doc.get_mut("name").unwrap().layout.client_width = 1000.0;
        scaler.rescale(&mut doc);
        assert_eq!(doc.get("name").unwrap().style.font_size, Some(30.0));
    }
}
