use crate::config::PageConfig;
use crate::page::{Document, Element, TimerAction, BODY_ID};
use crate::{Result, TourError};

/// Full-page overlay faded out on load and back in before navigation.
pub const PAGE_HIDER_ID: &str = "page-hider";
pub const NO_TRANSITION_CLASS: &str = "no-transition";

/// Reveals the page by fading the hider out. Does nothing without a hider.
pub fn fade_in_page(document: &mut Document) -> bool {
    match document.get_mut(PAGE_HIDER_ID) {
        Some(hider) => {
            hider.style.opacity = Some(0.0);
            true
        }
        None => false,
    }
}

/// Anchors that navigate through the fade-out transition, by element id.
#[derive(Debug, Default)]
pub struct AnchorTransitions {
    anchors: Vec<String>,
    delay_ms: u64,
}

impl AnchorTransitions {
    pub fn anchors(&self) -> &[String] {
        &self.anchors
    }

    pub fn intercepts(&self, id: &str) -> bool {
        self.anchors.iter().any(|anchor| anchor == id)
    }

    /// Handles a click on an intercepted anchor: shows the hider and
    /// navigates once the fade has had time to run.
    pub fn follow(&self, document: &mut Document, id: &str) -> Result<()> {
        if !self.intercepts(id) {
            return Err(TourError::UnknownTarget(id.to_string()));
        }
        let href = document
            .get(id)
            .and_then(|anchor| anchor.attribute("href"))
            .map(str::to_string)
            .ok_or_else(|| TourError::msg(format!("anchor `{id}` has no href")))?;

        if let Some(hider) = document.get_mut(PAGE_HIDER_ID) {
            hider.style.opacity = Some(1.0);
        }
        document.set_timeout(self.delay_ms, TimerAction::Navigate { href });
        Ok(())
    }
}

/// Sets up fade-out navigation for every anchor on the page.
///
/// Anchors with the `no-transition` class or `target="_blank"` keep their
/// default behaviour. The hider is created, transparent, when missing.
pub fn add_anchor_fade_out(
    document: &mut Document,
    config: &PageConfig,
) -> Result<AnchorTransitions> {
    if !document.contains(PAGE_HIDER_ID) {
        let mut hider = Element::new("div", PAGE_HIDER_ID);
        hider.style.opacity = Some(0.0);
        document.add_child(BODY_ID, hider)?;
    }

    let anchors = document
        .ids_with_tag("a")
        .into_iter()
        .filter(|id| {
            document.get(id).is_some_and(|anchor| {
                !anchor.has_class(NO_TRANSITION_CLASS)
                    && anchor.attribute("target") != Some("_blank")
            })
        })
        .collect();

    Ok(AnchorTransitions {
        anchors,
        delay_ms: config.fade_out_ms,
    })
}
