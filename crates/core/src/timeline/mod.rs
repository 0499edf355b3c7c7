use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, TourError};

/// A scheduled action on the narration timeline.
///
/// Events have no identity beyond their position: two events with the same
/// `time` are both kept and both fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Seconds from the start of the audio.
    pub time: f64,
    #[serde(rename = "type")]
    pub kind: String,
    /// Id of the page element the event acts on. May be empty.
    pub target: String,
    /// Marks an ambient state that is re-applied after a manual seek.
    #[serde(default)]
    pub continuous: bool,
}

impl TimelineEvent {
    pub fn new(time: f64, kind: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            time,
            kind: kind.into(),
            target: target.into(),
            continuous: false,
        }
    }

    pub fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }

    /// Checks the invariants ingestion relies on.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.time.is_finite() || self.time < 0.0 {
            return Err(format!("`time` must be a finite number >= 0, got {}", self.time));
        }
        Ok(())
    }
}

/// The full event pool plus the continuous subsequence.
///
/// Events are appended unsorted and ordered by [`Timeline::sort`], which is
/// stable so ties keep their registration order.
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
    /// Indices into `events` of the continuous events, in `events` order.
    continuous: Vec<usize>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TimelineEvent) {
        if event.continuous {
            self.continuous.push(self.events.len());
        }
        self.events.push(event);
    }

    pub fn sort(&mut self) {
        self.events.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.continuous = self
            .events
            .iter()
            .enumerate()
            .filter(|(_, event)| event.continuous)
            .map(|(index, _)| index)
            .collect();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TimelineEvent> {
        self.events.get(index)
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn continuous_events(&self) -> impl Iterator<Item = &TimelineEvent> + '_ {
        self.continuous.iter().map(move |&index| &self.events[index])
    }

    /// Index of the first event with `time >= seconds`. Requires a sorted timeline.
    pub fn first_at_or_after(&self, seconds: f64) -> Option<usize> {
        let index = self.events.partition_point(|event| event.time < seconds);
        (index < self.events.len()).then_some(index)
    }

    /// The last continuous event with `time < seconds`. Requires a sorted timeline.
    pub fn last_continuous_before(&self, seconds: f64) -> Option<&TimelineEvent> {
        let count = self
            .continuous
            .partition_point(|&index| self.events[index].time < seconds);
        count
            .checked_sub(1)
            .map(|position| &self.events[self.continuous[position]])
    }
}

/// A parsed timeline file. Each entry is accepted or rejected on its own.
#[derive(Debug)]
pub struct TimelineDocument {
    pub entries: Vec<Result<TimelineEvent>>,
}

/// Outcome of ingesting a timeline document into a player.
#[derive(Debug, Default)]
pub struct TimelineLoadReport {
    pub accepted: usize,
    pub rejected: Vec<TourError>,
}

impl TimelineLoadReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

#[derive(Deserialize)]
struct RawEvent {
    time: Option<f64>,
    #[serde(rename = "type")]
    kind: Option<String>,
    target: Option<String>,
    continuous: Option<bool>,
}

/// Parses `{ "events": [ ... ] }`.
///
/// Invalid JSON or a missing `events` array fails the whole document; a bad
/// entry only fails itself.
pub fn parse_timeline_document(bytes: &[u8]) -> Result<TimelineDocument> {
    let mut root: Value = serde_json::from_slice(bytes)?;
    let events = match root.get_mut("events").map(Value::take) {
        Some(Value::Array(events)) => events,
        _ => return Err(TourError::MissingEventList),
    };

    let entries = events
        .into_iter()
        .enumerate()
        .map(|(index, value)| parse_entry(index, value))
        .collect();

    Ok(TimelineDocument { entries })
}

fn parse_entry(index: usize, value: Value) -> Result<TimelineEvent> {
    let invalid = |reason: String| TourError::InvalidEvent { index, reason };

    let raw: RawEvent = serde_json::from_value(value).map_err(|err| invalid(err.to_string()))?;
    let time = raw.time.ok_or_else(|| invalid("missing `time`".into()))?;
    let kind = raw.kind.ok_or_else(|| invalid("missing `type`".into()))?;
    let target = raw.target.ok_or_else(|| invalid("missing `target`".into()))?;

    let event = TimelineEvent {
        time,
        kind,
        target,
        continuous: raw.continuous.unwrap_or(false),
    };
    event.validate().map_err(invalid)?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(times: &[(f64, bool)]) -> Timeline {
        let mut timeline = Timeline::new();
        for (index, &(time, continuous)) in times.iter().enumerate() {
            let mut event = TimelineEvent::new(time, "highlight", format!("e{index}"));
            event.continuous = continuous;
            timeline.push(event);
        }
        timeline
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let mut timeline = timeline(&[(3.0, false), (1.0, true), (3.0, true), (1.0, false)]);
        timeline.sort();

        let order: Vec<&str> = timeline.events().iter().map(|e| e.target.as_str()).collect();
        assert_eq!(order, ["e1", "e3", "e0", "e2"]);

        let continuous: Vec<&str> = timeline
            .continuous_events()
            .map(|e| e.target.as_str())
            .collect();
        assert_eq!(continuous, ["e1", "e2"]);
    }

    #[test]
    fn first_at_or_after_includes_exact_matches() {
        let mut timeline = timeline(&[(1.0, false), (2.0, false), (4.5, false), (21.21, false)]);
        timeline.sort();

        assert_eq!(timeline.first_at_or_after(0.0), Some(0));
        assert_eq!(timeline.first_at_or_after(2.0), Some(1));
        assert_eq!(timeline.first_at_or_after(3.0), Some(2));
        assert_eq!(timeline.first_at_or_after(30.0), None);
    }

    #[test]
    fn last_continuous_before_is_strict() {
        let mut timeline = timeline(&[(60.0, true), (10.0, false), (0.0, true)]);
        timeline.sort();

        assert_eq!(timeline.last_continuous_before(0.0), None);
        assert_eq!(timeline.last_continuous_before(30.0).map(|e| e.time), Some(0.0));
        assert_eq!(timeline.last_continuous_before(60.0).map(|e| e.time), Some(0.0));
        assert_eq!(timeline.last_continuous_before(90.0).map(|e| e.time), Some(60.0));
    }

    #[test]
    fn parses_entries_individually() {
        let json = br#"{
            "events": [
                { "time": 1, "type": "highlight", "target": "intro" },
                { "type": "focus", "target": "gallery" },
                { "time": 2.5, "type": "focus", "target": "gallery", "continuous": true },
                { "time": "soon", "type": "focus", "target": "x" },
                { "time": -1, "type": "focus", "target": "x" },
                { "time": 3, "target": "x" }
            ]
        }"#;

        let document = parse_timeline_document(json).unwrap();
        assert_eq!(document.entries.len(), 6);

        let accepted: Vec<&TimelineEvent> =
            document.entries.iter().filter_map(|entry| entry.as_ref().ok()).collect();
        assert_eq!(accepted.len(), 2);
        assert!(accepted[1].continuous);
        assert!(!accepted[0].continuous);

        match &document.entries[1] {
            Err(TourError::InvalidEvent { index, reason }) => {
                assert_eq!(*index, 1);
                assert!(reason.contains("time"));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
        assert!(matches!(document.entries[5], Err(TourError::InvalidEvent { index: 5, .. })));
    }

    #[test]
    fn rejects_documents_without_event_list() {
        assert!(matches!(
            parse_timeline_document(br#"{ "evts": [] }"#),
            Err(TourError::MissingEventList)
        ));
        assert!(matches!(
            parse_timeline_document(br#"{ "events": {} }"#),
            Err(TourError::MissingEventList)
        ));
        assert!(matches!(parse_timeline_document(b"not json"), Err(TourError::Json(_))));
    }
}
