//! Conversion event types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// All tracked interaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    ButtonClick,
    FormSubmit,
    PurchaseComplete,
    VisitorEnteredFunnel,
    VisitorViewedStep,
    VisitorConverted,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        Self::PageView,
        Self::ButtonClick,
        Self::FormSubmit,
        Self::PurchaseComplete,
        Self::VisitorEnteredFunnel,
        Self::VisitorViewedStep,
        Self::VisitorConverted,
    ];

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::ButtonClick => "button_click",
            Self::FormSubmit => "form_submit",
            Self::PurchaseComplete => "purchase_complete",
            Self::VisitorEnteredFunnel => "visitor_entered_funnel",
            Self::VisitorViewedStep => "visitor_viewed_step",
            Self::VisitorConverted => "visitor_converted",
        }
    }

    /// Whether this type counts as a conversion under built-in detection.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::PurchaseComplete | Self::VisitorConverted)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown event type '{}'", s))
    }
}

/// Traffic source recorded at funnel entry.
///
/// Unrecognized source strings deserialize as `Other`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TrafficSource {
    Ad,
    Email,
    Organic,
    Referral,
    Social,
    #[default]
    Direct,
    #[serde(other)]
    Other,
}

impl TrafficSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ad => "ad",
            Self::Email => "email",
            Self::Organic => "organic",
            Self::Referral => "referral",
            Self::Social => "social",
            Self::Direct => "direct",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TrafficSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open key/value bag attached to every event.
///
/// Well-known keys are typed; anything else lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    #[validate(length(max = 128))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funnel_id: Option<String>,
    #[validate(length(max = 128))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[validate(length(max = 128))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[validate(length(max = 128))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TrafficSource>,
    #[validate(length(max = 256))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
    #[validate(length(max = 256))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[validate(length(max = 256))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Numeric value, e.g. purchase amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[validate(length(max = 2000))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[validate(length(max = 2048))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// Keys outside the well-known set
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// An immutable behavioral fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConversionEvent {
    /// Unique event ID
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Visitor/customer that generated the event
    #[validate(length(min = 1, max = 128))]
    pub actor_id: String,
    /// Funnel, step, element, or product acted upon
    #[validate(length(max = 128))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    #[validate(nested)]
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl ConversionEvent {
    pub fn funnel_id(&self) -> Option<&str> {
        self.metadata.funnel_id.as_deref()
    }

    pub fn step_id(&self) -> Option<&str> {
        self.metadata.step_id.as_deref()
    }

    /// Built-in conversion detection scoped to a funnel.
    pub fn is_conversion_for(&self, funnel_id: &str) -> bool {
        self.event_type.is_conversion() && self.funnel_id() == Some(funnel_id)
    }

    pub fn is_entry_for(&self, funnel_id: &str) -> bool {
        self.event_type == EventType::VisitorEnteredFunnel && self.funnel_id() == Some(funnel_id)
    }

    pub fn is_step_view(&self, step_id: &str) -> bool {
        self.event_type == EventType::VisitorViewedStep && self.step_id() == Some(step_id)
    }

    /// Traffic source, `Direct` when absent.
    pub fn source_or_default(&self) -> TrafficSource {
        self.metadata.source.unwrap_or_default()
    }

    /// Event value, 0 when absent.
    pub fn value_or_zero(&self) -> f64 {
        self.metadata.value.unwrap_or(0.0)
    }
}

/// Event as received from the event store, before validation.
///
/// Every field is optional so a partial record can be carried inside
/// [`crate::Error::InvalidEvent`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConversionEvent {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl From<ConversionEvent> for RawConversionEvent {
    fn from(event: ConversionEvent) -> Self {
        Self {
            id: Some(event.id),
            event_type: Some(event.event_type.as_str().to_string()),
            actor_id: Some(event.actor_id),
            target_id: event.target_id,
            timestamp: Some(event.timestamp),
            metadata: event.metadata,
        }
    }
}
