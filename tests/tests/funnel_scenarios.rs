//! End-to-end funnel scenarios through the public calculators.

use analytics::{
    analyze_attribution, analyze_dropoff, scope_to_funnel, AttributionPolicy, FunnelReport,
};
use engine_core::{
    prepare_visitor_entered_funnel_event, prepare_visitor_viewed_step_event, retag_conversions,
    ConversionGoal, EventContext, EventType, GoalKind, GoalRegistry, TrafficSource,
};
use integration_tests::fixtures::{self, FUNNEL_ID};

#[test]
fn test_single_visitor_full_report() {
    let funnel = fixtures::two_step_funnel();
    let events = vec![
        fixtures::entered("A", TrafficSource::Email, 0),
        fixtures::viewed("A", "step1", 1),
        fixtures::viewed("A", "step2", 5),
        fixtures::purchase("A", 50.0, 6),
    ];

    let report = FunnelReport::compute(&events, &funnel, AttributionPolicy::FirstEntry);

    assert_eq!(report.flow.total_visitors, 1);
    assert_eq!(report.flow.total_conversions, 1);
    assert_eq!(report.flow.overall_conversion_rate, 1.0);

    let step1 = &report.flow.steps[0];
    assert_eq!(step1.step_id, "step1");
    assert_eq!(step1.visitors, 1);
    assert_eq!(step1.conversions, 1);
    assert_eq!(step1.dropoff_rate, 0.0);
    // first step1 view at t=1, next non-step1 event at t=5
    assert_eq!(step1.average_time_on_step, 4.0);

    let step2 = &report.flow.steps[1];
    assert_eq!(step2.visitors, 1);
    assert_eq!(step2.conversions, 1);
    assert_eq!(report.flow.average_time_to_convert, 6.0);

    let email = &report.attribution.by_source[0];
    assert_eq!(email.source, TrafficSource::Email);
    assert_eq!(email.metrics.visitors, 1);
    assert_eq!(email.metrics.conversions, 1);
    assert_eq!(email.metrics.revenue, 50.0);
}

#[test]
fn test_dropoff_reports_exit_page() {
    let funnel = fixtures::two_step_funnel();
    let events = vec![
        fixtures::viewed_at_path("A", "step1", "/a", 1),
        fixtures::viewed_at_path("B", "step1", "/b", 1),
        fixtures::viewed("B", "step2", 2),
    ];

    let dropoff = analyze_dropoff(&events, FUNNEL_ID, &funnel.steps);
    let step1 = &dropoff.steps[0];
    assert_eq!(step1.visitors, 2);
    assert_eq!(step1.dropoff_count, 1);
    assert_eq!(step1.dropoff_rate, 0.5);
    assert_eq!(step1.top_exit_pages.len(), 1);
    assert_eq!(step1.top_exit_pages[0].path, "/a");
    assert_eq!(step1.top_exit_pages[0].count, 1);
}

#[test]
fn test_page_view_beats_step_view_for_exit_page() {
    let funnel = fixtures::two_step_funnel();
    let events = vec![
        fixtures::viewed_at_path("A", "step1", "/landing", 1),
        fixtures::page_view("A", "step1", "https://shop.example.com/pricing?plan=pro", 3),
    ];

    let dropoff = analyze_dropoff(&events, FUNNEL_ID, &funnel.steps);
    assert_eq!(dropoff.steps[0].top_exit_pages[0].path, "/pricing");
}

#[test]
fn test_other_funnel_events_are_scoped_out() {
    let funnel = fixtures::two_step_funnel();
    let mut events = vec![
        fixtures::entered("A", TrafficSource::Ad, 0),
        fixtures::viewed("A", "step1", 1),
    ];
    events.push(prepare_visitor_entered_funnel_event("Z", "f2", EventContext::new()));
    events.push(prepare_visitor_viewed_step_event("Z", "f2", "other", EventContext::new()));

    let scoped = scope_to_funnel(&events, FUNNEL_ID);
    assert_eq!(scoped.len(), 2);

    let report = FunnelReport::compute(&scoped, &funnel, AttributionPolicy::default());
    assert_eq!(report.flow.total_visitors, 1);
    assert_eq!(report.dropoff.total_visitors, 1);
}

fn thank_you_goal() -> ConversionGoal {
    ConversionGoal {
        id: "g-thanks".into(),
        funnel_id: FUNNEL_ID.into(),
        name: "Reached thank-you page".into(),
        kind: GoalKind::PageView {
            path: "/thanks".into(),
        },
    }
}

#[test]
fn test_goal_retagging_changes_who_converted() {
    let funnel = fixtures::two_step_funnel();
    let events = vec![
        fixtures::entered("A", TrafficSource::Email, 0),
        fixtures::viewed("A", "step1", 1),
        fixtures::page_view("A", "step1", "/thanks", 5),
        fixtures::entered("B", TrafficSource::Ad, 0),
        fixtures::viewed("B", "step1", 1),
        fixtures::purchase("B", 20.0, 3),
    ];

    let registry = GoalRegistry::from_goals([thank_you_goal()]);
    let goal = registry.resolve("g-thanks").unwrap();
    let retagged = retag_conversions(goal, &events);

    // B's purchase no longer counts for this funnel
    assert_eq!(retagged.len(), events.len() - 1);
    assert_eq!(
        retagged.iter().filter(|e| e.event_type == EventType::VisitorConverted).count(),
        1
    );

    let report = FunnelReport::compute(&retagged, &funnel, AttributionPolicy::FirstEntry);
    assert_eq!(report.flow.total_conversions, 1);

    let attribution = &report.attribution;
    let email = attribution.by_source.iter().find(|s| s.source == TrafficSource::Email).unwrap();
    let ad = attribution.by_source.iter().find(|s| s.source == TrafficSource::Ad).unwrap();
    assert_eq!(email.metrics.conversions, 1);
    assert_eq!(ad.metrics.conversions, 0);
    assert_eq!(attribution.attributed_revenue(), 0.0);
}

#[test]
fn test_unknown_goal_is_goal_001() {
    let registry = GoalRegistry::from_goals([thank_you_goal()]);
    let err = registry.resolve("missing").unwrap_err();
    assert_eq!(err.error_code(), Some("GOAL_001"));
}

#[test]
fn test_campaigns_sorted_and_unknown_omitted() {
    let events = vec![
        fixtures::entered_with_campaign("A", TrafficSource::Email, "spring", 0),
        fixtures::entered_with_campaign("B", TrafficSource::Ad, "autumn", 0),
        fixtures::entered("C", TrafficSource::Organic, 0),
        fixtures::purchase("A", 40.0, 2),
        fixtures::converted("C", Some(5.0), 2),
    ];

    let attribution = analyze_attribution(&events, FUNNEL_ID, AttributionPolicy::FirstEntry);
    let campaigns: Vec<&str> =
        attribution.by_campaign.iter().map(|c| c.campaign.as_str()).collect();
    assert_eq!(campaigns, ["autumn", "spring"]);
    assert_eq!(attribution.attributed_revenue(), 45.0);

    // sources in declaration order: ad, email, organic
    let sources: Vec<TrafficSource> = attribution.by_source.iter().map(|s| s.source).collect();
    assert_eq!(
        sources,
        [TrafficSource::Ad, TrafficSource::Email, TrafficSource::Organic]
    );
}

#[test]
fn test_report_serializes_camel_case() {
    let funnel = fixtures::two_step_funnel();
    let events = fixtures::synthetic_traffic(6);
    let report = FunnelReport::compute(&events, &funnel, AttributionPolicy::LastEntry);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["funnelName"], "Signup");
    assert_eq!(json["eventCount"], events.len());
    assert!(json["flow"]["steps"][0]["averageTimeOnStep"].is_number());
    assert!(json["dropoff"]["steps"][0]["topExitPages"].is_array());
    assert_eq!(json["attribution"]["policy"], "last_entry");
}
