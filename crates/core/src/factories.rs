//! Constructors for well-formed events, one per tracked interaction.
//!
//! Factories never touch storage. Each returns a fresh id stamped with the
//! current time.

use chrono::Utc;
use uuid::Uuid;

use crate::events::{ConversionEvent, EventMetadata, EventType, TrafficSource};

/// Contextual metadata shared by all factories.
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    pub session_id: Option<String>,
    pub funnel_id: Option<String>,
    pub step_id: Option<String>,
    pub source: Option<TrafficSource>,
    pub campaign: Option<String>,
    pub medium: Option<String>,
    pub content: Option<String>,
    pub path: Option<String>,
    pub referrer: Option<String>,
}

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_funnel(mut self, funnel_id: impl Into<String>) -> Self {
        self.funnel_id = Some(funnel_id.into());
        self
    }

    pub fn with_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    pub fn with_source(mut self, source: TrafficSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_campaign(mut self, campaign: impl Into<String>) -> Self {
        self.campaign = Some(campaign.into());
        self
    }

    pub fn with_medium(mut self, medium: impl Into<String>) -> Self {
        self.medium = Some(medium.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(normalize_path(&path.into()));
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    fn into_metadata(self) -> EventMetadata {
        EventMetadata {
            funnel_id: self.funnel_id,
            step_id: self.step_id,
            session_id: self.session_id,
            source: self.source,
            campaign: self.campaign,
            medium: self.medium,
            content: self.content,
            path: self.path,
            referrer: self.referrer,
            ..Default::default()
        }
    }
}

fn build(
    event_type: EventType,
    visitor_id: &str,
    target_id: Option<&str>,
    metadata: EventMetadata,
) -> ConversionEvent {
    ConversionEvent {
        id: Uuid::new_v4(),
        event_type,
        actor_id: visitor_id.to_string(),
        target_id: target_id.map(str::to_string),
        timestamp: Utc::now().timestamp_millis(),
        metadata,
    }
}

/// Reduces a full URL to its path. Plain paths pass through unchanged.
fn normalize_path(path_or_url: &str) -> String {
    match url::Url::parse(path_or_url) {
        Ok(u) if u.has_host() => u.path().to_string(),
        _ => path_or_url.to_string(),
    }
}

/// A visitor loaded a page. `path` may be a full URL.
pub fn prepare_page_view_event(visitor_id: &str, path: &str, ctx: EventContext) -> ConversionEvent {
    let mut metadata = ctx.into_metadata();
    metadata.path = Some(normalize_path(path));
    build(EventType::PageView, visitor_id, None, metadata)
}

pub fn prepare_button_click_event(
    visitor_id: &str,
    element_id: &str,
    ctx: EventContext,
) -> ConversionEvent {
    let mut metadata = ctx.into_metadata();
    metadata.element_id = Some(element_id.to_string());
    build(EventType::ButtonClick, visitor_id, Some(element_id), metadata)
}

pub fn prepare_form_submit_event(
    visitor_id: &str,
    form_id: &str,
    ctx: EventContext,
) -> ConversionEvent {
    build(EventType::FormSubmit, visitor_id, Some(form_id), ctx.into_metadata())
}

/// A completed purchase. `value` is the purchase amount.
pub fn prepare_purchase_complete_event(
    visitor_id: &str,
    product_id: &str,
    value: f64,
    ctx: EventContext,
) -> ConversionEvent {
    let mut metadata = ctx.into_metadata();
    metadata.value = Some(value);
    build(EventType::PurchaseComplete, visitor_id, Some(product_id), metadata)
}

/// A visitor entered a funnel. Source and campaign in `ctx` drive attribution.
pub fn prepare_visitor_entered_funnel_event(
    visitor_id: &str,
    funnel_id: &str,
    ctx: EventContext,
) -> ConversionEvent {
    let mut metadata = ctx.into_metadata();
    metadata.funnel_id = Some(funnel_id.to_string());
    build(EventType::VisitorEnteredFunnel, visitor_id, Some(funnel_id), metadata)
}

pub fn prepare_visitor_viewed_step_event(
    visitor_id: &str,
    funnel_id: &str,
    step_id: &str,
    ctx: EventContext,
) -> ConversionEvent {
    let mut metadata = ctx.into_metadata();
    metadata.funnel_id = Some(funnel_id.to_string());
    metadata.step_id = Some(step_id.to_string());
    build(EventType::VisitorViewedStep, visitor_id, Some(step_id), metadata)
}

pub fn prepare_visitor_converted_event(
    visitor_id: &str,
    funnel_id: &str,
    value: Option<f64>,
    ctx: EventContext,
) -> ConversionEvent {
    let mut metadata = ctx.into_metadata();
    metadata.funnel_id = Some(funnel_id.to_string());
    metadata.value = value;
    build(EventType::VisitorConverted, visitor_id, Some(funnel_id), metadata)
}
