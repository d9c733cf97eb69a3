//! Per-call lookup structures shared by the calculators.
//!
//! Input order is ingestion order, not causal order. Everything here sorts
//! on `timestamp` and uses slice position only to break ties.

use std::collections::{HashMap, HashSet};

use engine_core::ConversionEvent;

/// Actors in first-seen order with O(1) membership.
#[derive(Debug, Default)]
pub struct ActorSet<'a> {
    order: Vec<&'a str>,
    members: HashSet<&'a str>,
}

impl<'a> ActorSet<'a> {
    pub fn insert(&mut self, actor: &'a str) -> bool {
        if self.members.insert(actor) {
            self.order.push(actor);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, actor: &str) -> bool {
        self.members.contains(actor)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.order.iter().copied()
    }
}

/// Events grouped by actor, each timeline sorted by timestamp.
pub struct EventIndex<'a> {
    events: &'a [ConversionEvent],
    /// Slice positions sorted by (timestamp, position)
    chronological: Vec<usize>,
    timelines: HashMap<&'a str, Vec<&'a ConversionEvent>>,
}

impl<'a> EventIndex<'a> {
    pub fn new(events: &'a [ConversionEvent]) -> Self {
        let mut chronological: Vec<usize> = (0..events.len()).collect();
        chronological.sort_by_key(|&i| (events[i].timestamp, i));

        let mut timelines: HashMap<&'a str, Vec<&'a ConversionEvent>> = HashMap::new();
        for &i in &chronological {
            let event = &events[i];
            timelines.entry(event.actor_id.as_str()).or_default().push(event);
        }

        Self {
            events,
            chronological,
            timelines,
        }
    }

    /// Number of distinct actors in the slice.
    pub fn distinct_actors(&self) -> usize {
        self.timelines.len()
    }

    /// Events of one actor in chronological order.
    pub fn timeline(&self, actor: &str) -> &[&'a ConversionEvent] {
        self.timelines.get(actor).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All events in chronological order.
    pub fn chronological(&self) -> impl Iterator<Item = &'a ConversionEvent> + '_ {
        let events = self.events;
        self.chronological.iter().map(move |&i| &events[i])
    }

    /// Distinct viewers of a step, ordered by their first view.
    pub fn step_visitors(&self, step_id: &str) -> ActorSet<'a> {
        self.actors_where(|e| e.is_step_view(step_id))
    }

    /// Distinct actors with a built-in conversion event for the funnel.
    pub fn conversion_actors(&self, funnel_id: &str) -> ActorSet<'a> {
        self.actors_where(|e| e.is_conversion_for(funnel_id))
    }

    /// Distinct actors that entered the funnel.
    pub fn entry_actors(&self, funnel_id: &str) -> ActorSet<'a> {
        self.actors_where(|e| e.is_entry_for(funnel_id))
    }

    fn actors_where<F>(&self, predicate: F) -> ActorSet<'a>
    where
        F: Fn(&ConversionEvent) -> bool,
    {
        let mut set = ActorSet::default();
        for event in self.chronological().filter(|e| predicate(e)) {
            set.insert(event.actor_id.as_str());
        }
        set
    }
}

/// `part / whole`, 0 when `whole` is 0.
pub fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Mean of an integer millisecond total, 0 when `count` is 0.
pub fn mean_ms(total_ms: i64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total_ms as f64 / count as f64
    }
}
