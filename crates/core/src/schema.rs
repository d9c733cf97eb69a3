//! The validation gate every event passes before entering a computation.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::events::{ConversionEvent, EventMetadata, EventType, RawConversionEvent};
use crate::limits::MAX_TIMESTAMP_MS;

/// Validates a raw event and promotes it to a [`ConversionEvent`].
///
/// Rejects events missing `type`, `actorId`, or `timestamp`, events whose
/// type is unknown, timestamps outside `0..=MAX_TIMESTAMP_MS`, and events
/// breaking the field limits. A missing `id`
/// is generated.
pub fn validate_conversion_event(raw: RawConversionEvent) -> Result<ConversionEvent> {
    let event_type = match raw.event_type.as_deref() {
        None => return Err(Error::invalid_event(raw, "type is required")),
        Some(s) => match s.parse::<EventType>() {
            Ok(t) => t,
            Err(reason) => return Err(Error::invalid_event(raw, reason)),
        },
    };

    let actor_id = match raw.actor_id.as_deref() {
        None => return Err(Error::invalid_event(raw, "actorId is required")),
        Some("") => return Err(Error::invalid_event(raw, "actorId must not be empty")),
        Some(id) => id.to_string(),
    };

    let Some(timestamp) = raw.timestamp else {
        return Err(Error::invalid_event(raw, "timestamp is required"));
    };

    if !(0..=MAX_TIMESTAMP_MS).contains(&timestamp) {
        let reason = format!("timestamp {} outside 0..={}", timestamp, MAX_TIMESTAMP_MS);
        return Err(Error::invalid_event(raw, reason));
    }

    if let Some(value) = raw.metadata.value {
        if !value.is_finite() {
            return Err(Error::invalid_event(raw, "metadata.value must be finite"));
        }
    }

    let event = ConversionEvent {
        id: raw.id.unwrap_or_else(Uuid::new_v4),
        event_type,
        actor_id,
        target_id: raw.target_id.clone(),
        timestamp,
        metadata: raw.metadata.clone(),
    };

    // Run validator derive validations
    if let Err(e) = event.validate() {
        return Err(Error::invalid_event(raw, e.to_string()));
    }

    Ok(event)
}

/// Validates a slice of raw events.
///
/// Returns the accepted events in input order and one error per rejected
/// event, prefixed with its index. Callers decide whether any rejection
/// aborts the run; rejections are never dropped here.
pub fn validate_batch(raws: Vec<RawConversionEvent>) -> (Vec<ConversionEvent>, Vec<Error>) {
    let mut accepted = Vec::with_capacity(raws.len());
    let mut errors = Vec::new();

    for (i, raw) in raws.into_iter().enumerate() {
        match validate_conversion_event(raw) {
            Ok(event) => accepted.push(event),
            Err(e) => errors.push(at_index(i, e)),
        }
    }

    (accepted, errors)
}

/// Decodes and validates a JSON array of events, one element at a time.
///
/// An element whose fields have the wrong JSON type is rejected on its own
/// with `InvalidEvent`, carrying whatever fields could be read. Fails with
/// `Serialization` only when the document is not a JSON array.
pub fn validate_json_batch(bytes: &[u8]) -> Result<(Vec<ConversionEvent>, Vec<Error>)> {
    let values: Vec<Value> = serde_json::from_slice(bytes)?;

    let mut accepted = Vec::with_capacity(values.len());
    let mut errors = Vec::new();

    for (i, value) in values.iter().enumerate() {
        let decoded = RawConversionEvent::deserialize(value)
            .map_err(|e| Error::invalid_event(partial_event(value), e.to_string()))
            .and_then(validate_conversion_event);
        match decoded {
            Ok(event) => accepted.push(event),
            Err(e) => errors.push(at_index(i, e)),
        }
    }

    Ok((accepted, errors))
}

fn at_index(i: usize, err: Error) -> Error {
    match err {
        Error::InvalidEvent { event, reason } => Error::InvalidEvent {
            event,
            reason: format!("event[{}]: {}", i, reason),
        },
        other => other,
    }
}

/// Best-effort read of an element that failed to decode.
fn partial_event(value: &Value) -> RawConversionEvent {
    let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

    RawConversionEvent {
        id: text("id").and_then(|s| Uuid::parse_str(&s).ok()),
        event_type: text("type"),
        actor_id: text("actorId"),
        target_id: text("targetId"),
        timestamp: value.get("timestamp").and_then(Value::as_i64),
        metadata: value
            .get("metadata")
            .and_then(|m| EventMetadata::deserialize(m).ok())
            .unwrap_or_default(),
    }
}
