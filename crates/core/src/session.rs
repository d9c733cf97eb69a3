//! Session handling types.
//!
//! Sessions group the events of one visit for upstream emission. Every
//! lifecycle function returns a new value and leaves its input untouched.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::events::{ConversionEvent, TrafficSource};

/// Session timeout duration (30 minutes of inactivity).
pub const SESSION_TIMEOUT_MINUTES: i64 = 30;

const SESSION_TIMEOUT_MS: i64 = SESSION_TIMEOUT_MINUTES * 60 * 1000;

/// A single visitor visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub visitor_id: String,
    pub funnel_id: Option<String>,
    /// Start time, Unix ms
    pub start_time: i64,
    /// End time, Unix ms
    pub end_time: Option<i64>,
    pub source: TrafficSource,
    pub campaign: Option<String>,
    pub medium: Option<String>,
    pub events: Vec<ConversionEvent>,
    pub converted: bool,
    pub conversion_value: Option<f64>,
}

/// Attribution context captured when a session starts.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub funnel_id: Option<String>,
    pub source: Option<TrafficSource>,
    pub campaign: Option<String>,
    pub medium: Option<String>,
}

impl Session {
    /// Timestamp of the latest activity: the newest event, else the start.
    pub fn last_active_at(&self) -> i64 {
        self.events
            .iter()
            .map(|e| e.timestamp)
            .max()
            .unwrap_or(self.start_time)
            .max(self.start_time)
    }

    /// Checks if the session has been idle past the timeout at `now_ms`.
    pub fn is_timed_out(&self, now_ms: i64) -> bool {
        now_ms - self.last_active_at() > SESSION_TIMEOUT_MS
    }

    pub fn is_ended(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Creates a new session at the visitor's first interaction.
pub fn create_session(visitor_id: &str, options: SessionOptions) -> Session {
    Session {
        session_id: Uuid::new_v4().to_string(),
        visitor_id: visitor_id.to_string(),
        funnel_id: options.funnel_id,
        start_time: Utc::now().timestamp_millis(),
        end_time: None,
        source: options.source.unwrap_or_default(),
        campaign: options.campaign,
        medium: options.medium,
        events: Vec::new(),
        converted: false,
        conversion_value: None,
    }
}

/// Returns a copy of `session` with `event` appended.
pub fn add_event_to_session(session: &Session, event: ConversionEvent) -> Session {
    let mut next = session.clone();
    next.events.push(event);
    next
}

/// Marks the session converted. A session converts at most once; later
/// calls return it unchanged.
pub fn mark_session_converted(session: &Session, conversion_value: Option<f64>) -> Session {
    let mut next = session.clone();
    if next.converted {
        return next;
    }
    next.converted = true;
    next.conversion_value = conversion_value;
    next.end_time = Some(Utc::now().timestamp_millis());
    next
}

/// Closes the session. An existing end time is kept.
pub fn end_session(session: &Session) -> Session {
    let mut next = session.clone();
    if next.end_time.is_none() {
        next.end_time = Some(Utc::now().timestamp_millis());
    }
    next
}

/// Unwraps a looked-up session, failing with `SessionNotFound`.
pub fn require_session(session: Option<Session>, session_id: &str) -> Result<Session> {
    session.ok_or_else(|| Error::session_not_found(session_id))
}

/// Caller-owned registry of in-flight sessions.
///
/// Holds the latest value returned by the lifecycle functions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Session) {
        self.sessions
            .write()
            .insert(session.session_id.clone(), session);
    }

    pub fn get(&self, session_id: &str) -> Result<Session> {
        let found = self.sessions.read().get(session_id).cloned();
        require_session(found, session_id)
    }

    /// Applies a lifecycle transformation and stores the result.
    pub fn apply<F>(&self, session_id: &str, f: F) -> Result<Session>
    where
        F: FnOnce(&Session) -> Session,
    {
        let mut sessions = self.sessions.write();
        let current = sessions
            .get(session_id)
            .ok_or_else(|| Error::session_not_found(session_id))?;
        let next = f(current);
        sessions.insert(session_id.to_string(), next.clone());
        Ok(next)
    }

    pub fn remove(&self, session_id: &str) -> Result<Session> {
        let removed = self.sessions.write().remove(session_id);
        require_session(removed, session_id)
    }

    /// Ends and removes every session idle past the timeout at `now_ms`.
    pub fn expire_idle(&self, now_ms: i64) -> Vec<Session> {
        let mut sessions = self.sessions.write();
        let idle: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_timed_out(now_ms))
            .map(|(id, _)| id.clone())
            .collect();

        let expired: Vec<Session> = idle
            .iter()
            .filter_map(|id| sessions.remove(id))
            .map(|s| end_session(&s))
            .collect();

        if !expired.is_empty() {
            debug!(count = expired.len(), "Expired idle sessions");
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
