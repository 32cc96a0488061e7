//! Event timeline registry.
//!
//! Canonical ordered list of FOMC decision events. Loaded once from a
//! static calendar at pipeline start, validated, and immutable thereafter.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use fomc_core::{Error, Event, PolicyOutcome, Result, TimestampMs, WindowBounds};

/// One raw calendar record, as supplied by the calendar source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEntry {
    /// Event id.
    pub id: u64,
    /// Decision instant as an RFC 3339 timestamp.
    pub decision_time: String,
    /// Decision outcome.
    pub outcome: PolicyOutcome,
}

impl CalendarEntry {
    fn into_event(self) -> Result<Event> {
        let decision_ts = DateTime::parse_from_rfc3339(&self.decision_time)
            .map_err(|e| {
                Error::schedule(format!(
                    "event {}: unparsable decision time {:?}: {e}",
                    self.id, self.decision_time
                ))
            })?
            .timestamp_millis();
        Ok(Event {
            id: self.id,
            decision_ts,
            outcome: self.outcome,
        })
    }
}

/// Ordered, validated sequence of decision events.
pub struct EventTimeline {
    events: Vec<Event>,
    /// Lower bound of the first event's window; `None` = unbounded.
    start: Option<TimestampMs>,
}

impl EventTimeline {
    /// Build a timeline from events, validating the schedule.
    ///
    /// Fails with [`Error::Schedule`] if the calendar is empty, decision
    /// timestamps are non-monotonic or duplicated, ids do not strictly
    /// increase with time, or a configured start does not precede the first
    /// decision.
    pub fn new(events: Vec<Event>, start: Option<TimestampMs>) -> Result<Self> {
        if events.is_empty() {
            return Err(Error::schedule("event calendar is empty"));
        }
        for pair in events.windows(2) {
            if pair[1].decision_ts == pair[0].decision_ts {
                return Err(Error::schedule(format!(
                    "events {} and {} share decision timestamp {}",
                    pair[0].id, pair[1].id, pair[0].decision_ts
                )));
            }
            if pair[1].decision_ts < pair[0].decision_ts {
                return Err(Error::schedule(format!(
                    "event {} precedes event {} but has a later decision timestamp",
                    pair[1].id, pair[0].id
                )));
            }
            if pair[1].id <= pair[0].id {
                return Err(Error::schedule(format!(
                    "event ids must strictly increase with time: {} then {}",
                    pair[0].id, pair[1].id
                )));
            }
        }
        if let Some(start_ts) = start {
            if start_ts >= events[0].decision_ts {
                return Err(Error::schedule(format!(
                    "timeline start {} is not before the first decision {}",
                    start_ts, events[0].decision_ts
                )));
            }
        }
        Ok(Self { events, start })
    }

    /// Build a timeline from raw calendar records.
    pub fn from_entries(
        entries: Vec<CalendarEntry>,
        start: Option<TimestampMs>,
    ) -> Result<Self> {
        let events = entries
            .into_iter()
            .map(CalendarEntry::into_event)
            .collect::<Result<Vec<_>>>()?;
        Self::new(events, start)
    }

    /// Build a timeline from a JSON array of calendar records.
    pub fn from_json(json: &str, start: Option<TimestampMs>) -> Result<Self> {
        let entries: Vec<CalendarEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries, start)
    }

    /// All events, in decision order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Event by id.
    pub fn get(&self, event_id: u64) -> Option<&Event> {
        self.position(event_id).map(|pos| &self.events[pos])
    }

    /// Decision window for an event, computed purely from its position.
    ///
    /// The window is half-open `[lower, upper)`: lower bound is the previous
    /// event's decision instant (the configured start for the first event),
    /// upper bound is the event's own decision instant.
    pub fn window_for(&self, event_id: u64) -> Option<WindowBounds> {
        self.position(event_id).map(|pos| self.window_at(pos))
    }

    /// Decision window for the event at a timeline position.
    pub fn window_at(&self, pos: usize) -> WindowBounds {
        let lower = if pos == 0 {
            self.start
        } else {
            Some(self.events[pos - 1].decision_ts)
        };
        WindowBounds {
            lower,
            upper: self.events[pos].decision_ts,
        }
    }

    /// Configured lower bound of the first window.
    pub fn start(&self) -> Option<TimestampMs> {
        self.start
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if the timeline holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// First event.
    pub fn first(&self) -> &Event {
        &self.events[0]
    }

    /// Last event.
    pub fn last(&self) -> &Event {
        &self.events[self.events.len() - 1]
    }

    fn position(&self, event_id: u64) -> Option<usize> {
        self.events
            .binary_search_by_key(&event_id, |e| e.id)
            .ok()
    }
}
