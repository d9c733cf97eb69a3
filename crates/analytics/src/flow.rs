//! Funnel flow: per-step visitors, conversions, and dwell time.

use serde::{Deserialize, Serialize};
use tracing::debug;

use engine_core::{order_steps, ConversionEvent, FunnelStepDef};

use crate::index::{mean_ms, ratio, ActorSet, EventIndex};

/// Metrics for one funnel step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelFlowStep {
    pub step_id: String,
    pub step_name: String,
    pub sequence: i32,
    pub visitors: usize,
    pub conversions: usize,
    pub conversion_rate: f64,
    pub dropoff_rate: f64,
    /// Mean dwell time in ms
    pub average_time_on_step: f64,
}

/// Funnel-level flow metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelFlow {
    pub funnel_id: String,
    pub funnel_name: String,
    pub total_visitors: usize,
    pub total_conversions: usize,
    pub overall_conversion_rate: f64,
    /// Mean entry-to-conversion time in ms
    pub average_time_to_convert: f64,
    pub steps: Vec<FunnelFlowStep>,
}

/// Computes step-by-step flow for one funnel.
///
/// `total_visitors` counts every distinct actor in `events`; callers wanting
/// a funnel-scoped total must scope the slice first.
pub fn calculate_funnel_flow(
    events: &[ConversionEvent],
    funnel_id: &str,
    funnel_name: &str,
    steps: &[FunnelStepDef],
) -> FunnelFlow {
    let index = EventIndex::new(events);
    let total_visitors = index.distinct_actors();
    let converters = index.conversion_actors(funnel_id);

    let ordered = order_steps(steps);
    let step_visitors: Vec<ActorSet<'_>> =
        ordered.iter().map(|s| index.step_visitors(&s.id)).collect();

    let flow_steps = ordered
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let visitors = &step_visitors[i];
            let conversions = visitors.iter().filter(|a| converters.contains(a)).count();
            let dropped = match step_visitors.get(i + 1) {
                Some(next) => visitors.iter().filter(|a| !next.contains(a)).count(),
                None => visitors.len() - conversions,
            };

            FunnelFlowStep {
                step_id: step.id.clone(),
                step_name: step.name.clone(),
                sequence: step.sequence,
                visitors: visitors.len(),
                conversions,
                conversion_rate: ratio(conversions, visitors.len()),
                dropoff_rate: ratio(dropped, visitors.len()),
                average_time_on_step: average_dwell(&index, visitors, &step.id),
            }
        })
        .collect();

    let flow = FunnelFlow {
        funnel_id: funnel_id.to_string(),
        funnel_name: funnel_name.to_string(),
        total_visitors,
        total_conversions: converters.len(),
        overall_conversion_rate: ratio(converters.len(), total_visitors),
        average_time_to_convert: average_time_to_convert(&index, &converters, funnel_id),
        steps: flow_steps,
    };

    debug!(
        funnel_id,
        events = events.len(),
        visitors = flow.total_visitors,
        conversions = flow.total_conversions,
        steps = flow.steps.len(),
        "Computed funnel flow"
    );

    flow
}

/// Mean time from a visitor's first view of the step to their next event
/// that is not another view of the same step. Visitors without such an
/// event count as 0.
fn average_dwell(index: &EventIndex<'_>, visitors: &ActorSet<'_>, step_id: &str) -> f64 {
    let total: i64 = visitors
        .iter()
        .map(|actor| {
            let timeline = index.timeline(actor);
            let Some(first_view) = timeline.iter().find(|e| e.is_step_view(step_id)) else {
                return 0;
            };
            timeline
                .iter()
                .find(|e| e.timestamp > first_view.timestamp && !e.is_step_view(step_id))
                .map_or(0, |next| next.timestamp.saturating_sub(first_view.timestamp))
        })
        .fold(0i64, i64::saturating_add);

    mean_ms(total, visitors.len())
}

/// Mean time from funnel entry to conversion. Converters without an entry
/// event count as 0; a conversion recorded before the entry clamps to 0.
fn average_time_to_convert(
    index: &EventIndex<'_>,
    converters: &ActorSet<'_>,
    funnel_id: &str,
) -> f64 {
    let total: i64 = converters
        .iter()
        .map(|actor| {
            let timeline = index.timeline(actor);
            let entry = timeline.iter().find(|e| e.is_entry_for(funnel_id));
            let conversion = timeline.iter().find(|e| e.is_conversion_for(funnel_id));
            match (entry, conversion) {
                (Some(entry), Some(conversion)) => {
                    conversion.timestamp.saturating_sub(entry.timestamp).max(0)
                }
                _ => 0,
            }
        })
        .fold(0i64, i64::saturating_add);

    mean_ms(total, converters.len())
}
