//! Structural properties that hold for any event slice.

use analytics::{analyze_attribution, analyze_dropoff, calculate_funnel_flow, AttributionPolicy};
use engine_core::{ConversionEvent, TrafficSource};
use integration_tests::fixtures::{self, FUNNEL_ID};

#[test]
fn test_dropoff_partitions_visitors() {
    let funnel = fixtures::two_step_funnel();
    for n in [1, 7, 30] {
        let events = fixtures::synthetic_traffic(n);
        let dropoff = analyze_dropoff(&events, FUNNEL_ID, &funnel.steps);
        for step in &dropoff.steps {
            assert_eq!(step.proceeded + step.dropoff_count, step.visitors, "step {}", step.step_id);
            let exits: usize = step.top_exit_pages.iter().map(|p| p.count).sum();
            assert!(exits <= step.dropoff_count);
            assert!(step.top_exit_pages.len() <= engine_core::limits::TOP_EXIT_PAGES);
        }
    }
}

#[test]
fn test_rates_stay_in_bounds() {
    let funnel = fixtures::two_step_funnel();
    let events = fixtures::synthetic_traffic(25);
    let flow = calculate_funnel_flow(&events, FUNNEL_ID, &funnel.name, &funnel.steps);

    assert!(flow.total_conversions <= flow.total_visitors);
    for step in &flow.steps {
        assert!(step.conversions <= step.visitors);
        assert!((0.0..=1.0).contains(&step.conversion_rate));
        assert!((0.0..=1.0).contains(&step.dropoff_rate));
        assert!(step.average_time_on_step >= 0.0);
    }
    assert!(flow.average_time_to_convert >= 0.0);
}

#[test]
fn test_attribution_accounts_for_all_revenue() {
    let mut events = fixtures::synthetic_traffic(12);
    // a conversion with no entry event
    events.push(fixtures::purchase("stray", 3.5, 50));

    let expected: f64 = events
        .iter()
        .filter(|e| e.is_conversion_for(FUNNEL_ID))
        .map(|e| e.value_or_zero())
        .sum();

    for policy in [AttributionPolicy::FirstEntry, AttributionPolicy::LastEntry] {
        let analysis = analyze_attribution(&events, FUNNEL_ID, policy);
        let total = analysis.attributed_revenue() + analysis.unattributed_revenue;
        assert!((total - expected).abs() < 1e-9, "{:?}", policy);
        assert_eq!(analysis.unattributed_conversions, 1);

        let visitors: usize = analysis.by_source.iter().map(|s| s.metrics.visitors).sum();
        assert_eq!(visitors, 12);
    }
}

#[test]
fn test_results_independent_of_slice_order() {
    let funnel = fixtures::two_step_funnel();
    let events = fixtures::synthetic_traffic(15);
    let mut reversed = events.clone();
    reversed.reverse();

    assert_eq!(
        calculate_funnel_flow(&events, FUNNEL_ID, &funnel.name, &funnel.steps),
        calculate_funnel_flow(&reversed, FUNNEL_ID, &funnel.name, &funnel.steps)
    );
    let dropped = |slice: &[ConversionEvent]| -> Vec<usize> {
        analyze_dropoff(slice, FUNNEL_ID, &funnel.steps)
            .steps
            .iter()
            .map(|s| s.dropoff_count)
            .collect()
    };
    assert_eq!(dropped(&events[..]), dropped(&reversed[..]));
}

#[test]
fn test_repeated_runs_are_identical() {
    let funnel = fixtures::two_step_funnel();
    let events = fixtures::synthetic_traffic(20);

    let first = analyze_attribution(&events, FUNNEL_ID, AttributionPolicy::FirstEntry);
    let second = analyze_attribution(&events, FUNNEL_ID, AttributionPolicy::FirstEntry);
    assert_eq!(first, second);

    let first = analyze_dropoff(&events, FUNNEL_ID, &funnel.steps);
    let second = analyze_dropoff(&events, FUNNEL_ID, &funnel.steps);
    assert_eq!(first, second);
}

#[test]
fn test_empty_slice_yields_zeroes() {
    let funnel = fixtures::two_step_funnel();
    let flow = calculate_funnel_flow(&[], FUNNEL_ID, &funnel.name, &funnel.steps);
    assert_eq!(flow.total_visitors, 0);
    assert_eq!(flow.overall_conversion_rate, 0.0);
    assert_eq!(flow.average_time_to_convert, 0.0);
    assert_eq!(flow.steps.len(), 2);
    assert!(flow.steps.iter().all(|s| s.visitors == 0 && s.dropoff_rate == 0.0));

    let dropoff = analyze_dropoff(&[], FUNNEL_ID, &funnel.steps);
    assert_eq!(dropoff.total_visitors, 0);
    assert!(dropoff.steps.iter().all(|s| s.top_exit_pages.is_empty()));

    let attribution = analyze_attribution(&[], FUNNEL_ID, AttributionPolicy::default());
    assert!(attribution.by_source.is_empty());
    assert_eq!(attribution.attributed_revenue(), 0.0);
}

#[test]
fn test_source_visitors_partition_entries_under_single_entry() {
    let events = vec![
        fixtures::entered("A", TrafficSource::Email, 0),
        fixtures::entered("B", TrafficSource::Email, 0),
        fixtures::entered("C", TrafficSource::Social, 0),
    ];
    let analysis = analyze_attribution(&events, FUNNEL_ID, AttributionPolicy::FirstEntry);
    let total: usize = analysis.by_source.iter().map(|s| s.metrics.visitors).sum();
    assert_eq!(total, 3);
}
