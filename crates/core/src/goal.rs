//! Conversion goal definitions and goal-aware re-tagging.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::events::{ConversionEvent, EventType};

/// What counts as "converted" for a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GoalKind {
    /// Viewing a target path
    PageView { path: String },
    /// Submitting a form, any form when `form_id` is absent
    FormSubmit {
        #[serde(default)]
        form_id: Option<String>,
    },
    /// Completing a purchase, optionally at or above a minimum value
    Purchase {
        #[serde(default)]
        min_value: Option<f64>,
    },
    /// Any event of the given type
    Custom { event_type: EventType },
}

/// A caller-defined conversion goal for one funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionGoal {
    pub id: String,
    pub funnel_id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: GoalKind,
}

impl ConversionGoal {
    /// Whether `event` satisfies this goal.
    pub fn matches(&self, event: &ConversionEvent) -> bool {
        match &self.kind {
            GoalKind::PageView { path } => {
                event.event_type == EventType::PageView
                    && event.metadata.path.as_deref() == Some(path.as_str())
            }
            GoalKind::FormSubmit { form_id } => {
                event.event_type == EventType::FormSubmit
                    && form_id
                        .as_deref()
                        .map_or(true, |id| event.target_id.as_deref() == Some(id))
            }
            GoalKind::Purchase { min_value } => {
                event.event_type == EventType::PurchaseComplete
                    && min_value.map_or(true, |min| event.value_or_zero() >= min)
            }
            GoalKind::Custom { event_type } => event.event_type == *event_type,
        }
    }
}

/// Re-tags a slice so built-in conversion detection follows `goal`.
///
/// Events matching the goal become `visitor_converted` events scoped to the
/// goal's funnel. Built-in conversion events of that funnel that do not
/// match are removed. Everything else passes through untouched.
pub fn retag_conversions(
    goal: &ConversionGoal,
    events: &[ConversionEvent],
) -> Vec<ConversionEvent> {
    events
        .iter()
        .filter_map(|event| {
            if goal.matches(event) {
                let mut tagged = event.clone();
                tagged.event_type = EventType::VisitorConverted;
                tagged.metadata.funnel_id = Some(goal.funnel_id.clone());
                Some(tagged)
            } else if event.is_conversion_for(&goal.funnel_id) {
                None
            } else {
                Some(event.clone())
            }
        })
        .collect()
}

/// In-memory view of the goal registry.
#[derive(Debug, Clone, Default)]
pub struct GoalRegistry {
    goals: HashMap<String, ConversionGoal>,
}

impl GoalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_goals(goals: impl IntoIterator<Item = ConversionGoal>) -> Self {
        let mut registry = Self::new();
        for goal in goals {
            registry.insert(goal);
        }
        registry
    }

    pub fn insert(&mut self, goal: ConversionGoal) {
        self.goals.insert(goal.id.clone(), goal);
    }

    /// Resolves a goal id, failing with `ConversionGoalNotFound`.
    pub fn resolve(&self, goal_id: &str) -> Result<&ConversionGoal> {
        self.goals
            .get(goal_id)
            .ok_or_else(|| Error::goal_not_found(goal_id))
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}
