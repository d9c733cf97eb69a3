//! Combined report over one funnel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use engine_core::{ConversionEvent, FunnelDefinition};

use crate::attribution::{analyze_attribution, AttributionAnalysis, AttributionPolicy};
use crate::dropoff::{analyze_dropoff, DropoffAnalysis};
use crate::flow::{calculate_funnel_flow, FunnelFlow};

/// Flow, drop-off, and attribution for one funnel and one event slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelReport {
    pub funnel_id: String,
    pub funnel_name: String,
    pub generated_at: DateTime<Utc>,
    pub event_count: usize,
    pub flow: FunnelFlow,
    pub dropoff: DropoffAnalysis,
    pub attribution: AttributionAnalysis,
}

impl FunnelReport {
    /// Runs all three calculators in sequence.
    pub fn compute(
        events: &[ConversionEvent],
        funnel: &FunnelDefinition,
        policy: AttributionPolicy,
    ) -> Self {
        Self::from_parts(
            funnel,
            events.len(),
            calculate_funnel_flow(events, &funnel.id, &funnel.name, &funnel.steps),
            analyze_dropoff(events, &funnel.id, &funnel.steps),
            analyze_attribution(events, &funnel.id, policy),
        )
    }

    /// Assembles a report from results computed elsewhere, e.g. in parallel.
    pub fn from_parts(
        funnel: &FunnelDefinition,
        event_count: usize,
        flow: FunnelFlow,
        dropoff: DropoffAnalysis,
        attribution: AttributionAnalysis,
    ) -> Self {
        Self {
            funnel_id: funnel.id.clone(),
            funnel_name: funnel.name.clone(),
            generated_at: Utc::now(),
            event_count,
            flow,
            dropoff,
            attribution,
        }
    }
}
