//! Attribution: conversions and revenue by traffic source and campaign.
//!
//! Each conversion is credited to the source and campaign recorded on one
//! of the converting visitor's funnel-entry events.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use engine_core::{ConversionEvent, TrafficSource};

use crate::index::ratio;

/// Bucket for entries without a campaign. Never reported.
pub const UNKNOWN_CAMPAIGN: &str = "unknown";

/// Which entry event a conversion is credited to when a visitor entered
/// the funnel more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionPolicy {
    /// Earliest entry (slice order on equal timestamps)
    #[default]
    FirstEntry,
    /// Latest entry (slice order on equal timestamps)
    LastEntry,
}

/// Metrics shared by source and campaign buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionMetrics {
    pub visitors: usize,
    pub conversions: usize,
    pub conversion_rate: f64,
    pub revenue: f64,
    pub average_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub source: TrafficSource,
    #[serde(flatten)]
    pub metrics: AttributionMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignAttribution {
    pub campaign: String,
    #[serde(flatten)]
    pub metrics: AttributionMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionAnalysis {
    pub funnel_id: String,
    pub policy: AttributionPolicy,
    /// Sources in declaration order
    pub by_source: Vec<SourceAttribution>,
    /// Named campaigns in alphabetical order
    pub by_campaign: Vec<CampaignAttribution>,
    /// Conversions with no entry event for the same visitor
    pub unattributed_conversions: usize,
    pub unattributed_revenue: f64,
}

impl AttributionAnalysis {
    /// Revenue summed across all source buckets.
    pub fn attributed_revenue(&self) -> f64 {
        self.by_source.iter().map(|s| s.metrics.revenue).sum()
    }
}

#[derive(Default)]
struct Bucket<'a> {
    visitors: HashSet<&'a str>,
    converters: HashSet<&'a str>,
    revenue: f64,
}

impl Bucket<'_> {
    fn metrics(&self) -> AttributionMetrics {
        let conversions = self.converters.len();
        AttributionMetrics {
            visitors: self.visitors.len(),
            conversions,
            conversion_rate: ratio(conversions, self.visitors.len()),
            revenue: self.revenue,
            average_value: if conversions == 0 {
                0.0
            } else {
                self.revenue / conversions as f64
            },
        }
    }
}

fn campaign_of(entry: &ConversionEvent) -> &str {
    entry.metadata.campaign.as_deref().unwrap_or(UNKNOWN_CAMPAIGN)
}

/// Attributes funnel conversions to entry source and campaign.
pub fn analyze_attribution(
    events: &[ConversionEvent],
    funnel_id: &str,
    policy: AttributionPolicy,
) -> AttributionAnalysis {
    let mut entries_by_actor: HashMap<&str, Vec<&ConversionEvent>> = HashMap::new();
    let mut by_source: BTreeMap<TrafficSource, Bucket<'_>> = BTreeMap::new();
    let mut by_campaign: BTreeMap<&str, Bucket<'_>> = BTreeMap::new();

    for entry in events.iter().filter(|e| e.is_entry_for(funnel_id)) {
        let actor = entry.actor_id.as_str();
        entries_by_actor.entry(actor).or_default().push(entry);
        by_source
            .entry(entry.source_or_default())
            .or_default()
            .visitors
            .insert(actor);
        by_campaign
            .entry(campaign_of(entry))
            .or_default()
            .visitors
            .insert(actor);
    }
    for entries in entries_by_actor.values_mut() {
        entries.sort_by_key(|e| e.timestamp);
    }

    let mut unattributed_conversions = 0;
    let mut unattributed_revenue = 0.0;

    for conversion in events.iter().filter(|e| e.is_conversion_for(funnel_id)) {
        let actor = conversion.actor_id.as_str();
        let value = conversion.value_or_zero();
        let entry = entries_by_actor
            .get(actor)
            .and_then(|entries| match policy {
                AttributionPolicy::FirstEntry => entries.first(),
                AttributionPolicy::LastEntry => entries.last(),
            })
            .copied();

        let Some(entry) = entry else {
            unattributed_conversions += 1;
            unattributed_revenue += value;
            continue;
        };

        let source = by_source.entry(entry.source_or_default()).or_default();
        source.converters.insert(actor);
        source.revenue += value;

        let campaign = by_campaign.entry(campaign_of(entry)).or_default();
        campaign.converters.insert(actor);
        campaign.revenue += value;
    }

    let analysis = AttributionAnalysis {
        funnel_id: funnel_id.to_string(),
        policy,
        by_source: by_source
            .iter()
            .map(|(source, bucket)| SourceAttribution {
                source: *source,
                metrics: bucket.metrics(),
            })
            .collect(),
        by_campaign: by_campaign
            .iter()
            .filter(|(campaign, _)| **campaign != UNKNOWN_CAMPAIGN)
            .map(|(campaign, bucket)| CampaignAttribution {
                campaign: campaign.to_string(),
                metrics: bucket.metrics(),
            })
            .collect(),
        unattributed_conversions,
        unattributed_revenue,
    };

    debug!(
        funnel_id,
        events = events.len(),
        sources = analysis.by_source.len(),
        campaigns = analysis.by_campaign.len(),
        unattributed = analysis.unattributed_conversions,
        "Computed attribution"
    );

    analysis
}
