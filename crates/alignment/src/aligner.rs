//! Temporal alignment engine.
//!
//! Assigns each document to the single decision window its publication
//! instant legitimately informs. Windows are half-open
//! `[prev_decision, decision)`, so a document published at or after an
//! event's decision instant can never inform that event: it falls into the
//! next window, or out of the timeline after the last event.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::index::DocumentIndex;
use crate::registry::EventTimeline;
use fomc_core::WindowBounds;

/// Documents assigned to one event's decision window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventWindow {
    /// Owning event id.
    pub event_id: u64,
    /// The window bounds.
    pub bounds: WindowBounds,
    /// Assigned document ids, ascending by publish time.
    pub document_ids: Vec<String>,
}

impl EventWindow {
    /// True when no document informs this event.
    pub fn is_coverage_gap(&self) -> bool {
        self.document_ids.is_empty()
    }
}

/// Statistics about one alignment pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignmentStats {
    /// Documents assigned to some window.
    pub assigned: usize,
    /// Documents published before the configured timeline start.
    pub before_timeline: usize,
    /// Documents published at or after the last decision instant.
    pub after_timeline: usize,
    /// Events whose window contained zero documents.
    pub coverage_gaps: Vec<u64>,
}

impl AlignmentStats {
    /// True if any event lacked documents.
    pub fn has_gaps(&self) -> bool {
        !self.coverage_gaps.is_empty()
    }
}

/// Result of aligning a document index against an event timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alignment {
    windows: Vec<EventWindow>,
    stats: AlignmentStats,
}

impl Alignment {
    /// Per-event windows, in timeline order.
    pub fn windows(&self) -> &[EventWindow] {
        &self.windows
    }

    /// Window for one event.
    pub fn window_for(&self, event_id: u64) -> Option<&EventWindow> {
        self.windows.iter().find(|w| w.event_id == event_id)
    }

    /// Alignment statistics.
    pub fn stats(&self) -> &AlignmentStats {
        &self.stats
    }
}

/// Assign every indexed document to the decision window containing its
/// publication instant.
///
/// Pure transform: consecutive half-open windows partition the span from
/// the timeline start to the last decision instant, so each document lands
/// in at most one window. Documents outside the span are counted as
/// out-of-range, never silently dropped. An empty window is a coverage
/// gap, reported upward rather than treated as an error.
pub fn align(timeline: &EventTimeline, index: &DocumentIndex) -> Alignment {
    let mut windows = Vec::with_capacity(timeline.len());
    let mut stats = AlignmentStats::default();

    for (pos, event) in timeline.events().iter().enumerate() {
        let bounds = timeline.window_at(pos);
        let document_ids: Vec<String> = index
            .documents_in(&bounds)
            .map(|d| d.id.clone())
            .collect();

        stats.assigned += document_ids.len();
        if document_ids.is_empty() {
            warn!(event_id = event.id, "coverage gap: no documents in decision window");
            stats.coverage_gaps.push(event.id);
        } else {
            debug!(
                event_id = event.id,
                documents = document_ids.len(),
                "window aligned"
            );
        }

        windows.push(EventWindow {
            event_id: event.id,
            bounds,
            document_ids,
        });
    }

    let last_decision = timeline.last().decision_ts;
    for doc in index.documents() {
        if doc.publish_ts >= last_decision {
            stats.after_timeline += 1;
        } else if let Some(start) = timeline.start() {
            if doc.publish_ts < start {
                stats.before_timeline += 1;
            }
        }
    }

    Alignment { windows, stats }
}
