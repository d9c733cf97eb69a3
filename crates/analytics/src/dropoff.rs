//! Drop-off analysis: who stopped at each step and where they left from.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use engine_core::limits::TOP_EXIT_PAGES;
use engine_core::{order_steps, ConversionEvent, EventType, FunnelStepDef};

use crate::index::{ratio, ActorSet, EventIndex};

/// Placeholder for exits with no recorded path. Never ranked.
pub const UNKNOWN_EXIT_PAGE: &str = "unknown";

/// An exit path and how many dropped visitors left from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitPage {
    pub path: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDropoff {
    pub step_id: String,
    pub step_name: String,
    pub sequence: i32,
    pub visitors: usize,
    /// Visitors that reached the next step (or converted, on the last step)
    pub proceeded: usize,
    pub dropoff_count: usize,
    pub dropoff_rate: f64,
    pub top_exit_pages: Vec<ExitPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropoffAnalysis {
    pub funnel_id: String,
    /// Distinct actors that entered this funnel
    pub total_visitors: usize,
    pub steps: Vec<StepDropoff>,
}

/// Computes per-step drop-off for one funnel.
///
/// Unlike [`crate::calculate_funnel_flow`], `total_visitors` here counts only
/// actors with a `visitor_entered_funnel` event for this funnel.
pub fn analyze_dropoff(
    events: &[ConversionEvent],
    funnel_id: &str,
    steps: &[FunnelStepDef],
) -> DropoffAnalysis {
    let index = EventIndex::new(events);
    let converters = index.conversion_actors(funnel_id);

    let ordered = order_steps(steps);
    let step_visitors: Vec<ActorSet<'_>> =
        ordered.iter().map(|s| index.step_visitors(&s.id)).collect();

    let steps: Vec<StepDropoff> = ordered
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let visitors = &step_visitors[i];
            let reached = step_visitors.get(i + 1).unwrap_or(&converters);
            let dropped: Vec<&str> = visitors.iter().filter(|a| !reached.contains(a)).collect();

            StepDropoff {
                step_id: step.id.clone(),
                step_name: step.name.clone(),
                sequence: step.sequence,
                visitors: visitors.len(),
                proceeded: visitors.len() - dropped.len(),
                dropoff_count: dropped.len(),
                dropoff_rate: ratio(dropped.len(), visitors.len()),
                top_exit_pages: rank_exit_pages(&index, &dropped, &step.id),
            }
        })
        .collect();

    let analysis = DropoffAnalysis {
        funnel_id: funnel_id.to_string(),
        total_visitors: index.entry_actors(funnel_id).len(),
        steps,
    };

    debug!(
        funnel_id,
        events = events.len(),
        entered = analysis.total_visitors,
        dropped = analysis.steps.iter().map(|s| s.dropoff_count).sum::<usize>(),
        "Computed drop-off"
    );

    analysis
}

/// The page a dropped visitor left the step from.
///
/// Prefers their most recent `page_view` on the step, then their most
/// recent view of the step itself.
fn exit_path<'a>(timeline: &[&'a ConversionEvent], step_id: &str) -> &'a str {
    let last_page_view = timeline
        .iter()
        .rev()
        .find(|e| e.event_type == EventType::PageView && e.step_id() == Some(step_id));
    let last_step_view = || timeline.iter().rev().find(|e| e.is_step_view(step_id));

    last_page_view
        .or_else(last_step_view)
        .copied()
        .and_then(|e| e.metadata.path.as_deref())
        .unwrap_or(UNKNOWN_EXIT_PAGE)
}

/// Tallies exit paths and keeps the most frequent, ties in first-seen order.
fn rank_exit_pages(index: &EventIndex<'_>, dropped: &[&str], step_id: &str) -> Vec<ExitPage> {
    let mut tally: Vec<ExitPage> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for actor in dropped {
        let path = exit_path(index.timeline(actor), step_id);
        if path == UNKNOWN_EXIT_PAGE {
            continue;
        }
        match positions.get(path) {
            Some(&pos) => tally[pos].count += 1,
            None => {
                positions.insert(path, tally.len());
                tally.push(ExitPage {
                    path: path.to_string(),
                    count: 1,
                });
            }
        }
    }

    // stable: equal counts stay in first-seen order
    tally.sort_by(|a, b| b.count.cmp(&a.count));
    tally.truncate(TOP_EXIT_PAGES);
    tally
}
