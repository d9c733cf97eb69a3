//! Caller-side slicing helpers.
//!
//! The calculators do no pagination or streaming. Callers narrow the slice
//! by funnel and time window, and bound its size, before analysis.

use serde::{Deserialize, Serialize};

use engine_core::{ConversionEvent, Error, Result};

/// Keeps events whose metadata names `funnel_id`.
pub fn scope_to_funnel(events: &[ConversionEvent], funnel_id: &str) -> Vec<ConversionEvent> {
    events
        .iter()
        .filter(|e| e.funnel_id() == Some(funnel_id))
        .cloned()
        .collect()
}

/// Half-open time window in Unix ms. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
}

impl TimeWindow {
    pub fn new(start_ms: Option<i64>, end_ms: Option<i64>) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start_ms.is_none() && self.end_ms.is_none()
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start_ms.map_or(true, |start| timestamp >= start)
            && self.end_ms.map_or(true, |end| timestamp < end)
    }

    pub fn apply(&self, events: &[ConversionEvent]) -> Vec<ConversionEvent> {
        events
            .iter()
            .filter(|e| self.contains(e.timestamp))
            .cloned()
            .collect()
    }
}

/// Rejects slices larger than `max_events`.
pub fn check_slice_size(len: usize, max_events: usize) -> Result<()> {
    if len > max_events {
        return Err(Error::validation(format!(
            "slice of {} events exceeds limit of {}",
            len, max_events
        )));
    }
    Ok(())
}
