//! Raw JSON through the validation gate into analysis.

use analytics::{calculate_funnel_flow, check_slice_size, TimeWindow};
use engine_core::{
    validate_batch, validate_json_batch, Error, ErrorCode, RawConversionEvent, SessionOptions,
    SessionStore,
};
use integration_tests::fixtures::{self, FUNNEL_ID};

fn parse(values: Vec<serde_json::Value>) -> Vec<RawConversionEvent> {
    serde_json::from_value(serde_json::Value::Array(values)).unwrap()
}

#[test]
fn test_batch_keeps_valid_events_and_reports_the_rest() {
    let mut missing_type = fixtures::raw_event("visitor_viewed_step", "A", 2);
    missing_type.as_object_mut().unwrap().remove("type");

    let raws = parse(vec![
        fixtures::raw_event("visitor_entered_funnel", "A", 1),
        missing_type,
        fixtures::raw_event("pageview", "B", 3),
        fixtures::raw_event("visitor_converted", "", 4),
        fixtures::raw_event("purchase_complete", "A", 5),
    ]);

    let (events, errors) = validate_batch(raws);
    assert_eq!(events.len(), 2);
    assert_eq!(errors.len(), 3);

    let indices: Vec<&str> = errors
        .iter()
        .map(|e| match e {
            Error::InvalidEvent { reason, .. } => reason.split(':').next().unwrap(),
            other => panic!("unexpected error: {}", other),
        })
        .collect();
    assert_eq!(indices, ["event[1]", "event[2]", "event[3]"]);
    assert!(errors.iter().all(|e| e.kind() == Some(ErrorCode::InvalidEvent)));

    // the rejected event is carried back with what could be parsed
    match &errors[1] {
        Error::InvalidEvent { event, .. } => {
            assert_eq!(event.event_type.as_deref(), Some("pageview"));
            assert_eq!(event.actor_id.as_deref(), Some("B"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_mistyped_field_rejects_only_that_event() {
    let mut mistyped = fixtures::raw_event("visitor_viewed_step", "B", 0);
    mistyped["timestamp"] = serde_json::json!("2");
    let batch = serde_json::json!([
        fixtures::raw_event("visitor_entered_funnel", "A", 1),
        mistyped,
        fixtures::raw_event("visitor_converted", "A", 3),
    ]);
    let bytes = serde_json::to_vec(&batch).unwrap();

    let (events, errors) = validate_json_batch(&bytes).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_code(), Some("EVENT_001"));
    match &errors[0] {
        Error::InvalidEvent { event, reason } => {
            assert!(reason.starts_with("event[1]: "), "{}", reason);
            assert_eq!(event.actor_id.as_deref(), Some("B"));
            assert_eq!(event.metadata.funnel_id.as_deref(), Some(FUNNEL_ID));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_out_of_range_timestamps_never_reach_the_calculators() {
    let raws = parse(vec![
        fixtures::raw_event("visitor_viewed_step", "A", 1),
        fixtures::raw_event("visitor_viewed_step", "A", 0),
    ]);
    let mut extreme = raws.clone();
    extreme[0].timestamp = Some(i64::MIN);
    extreme[1].timestamp = Some(i64::MAX);

    let (events, errors) = validate_batch(extreme);
    assert!(events.is_empty());
    assert_eq!(errors.len(), 2);

    let (events, errors) = validate_batch(raws);
    assert!(errors.is_empty());
    let funnel = fixtures::two_step_funnel();
    let flow = calculate_funnel_flow(&events, FUNNEL_ID, &funnel.name, &funnel.steps);
    assert_eq!(flow.total_visitors, 1);
}

#[test]
fn test_missing_id_is_generated_and_unknown_metadata_kept() {
    let mut raw = fixtures::raw_event("page_view", "A", 10);
    let obj = raw.as_object_mut().unwrap();
    obj.remove("id");
    obj["metadata"]["experiment"] = serde_json::json!("b");

    let (events, errors) = validate_batch(parse(vec![raw]));
    assert!(errors.is_empty());
    assert!(!events[0].id.is_nil());
    assert_eq!(events[0].metadata.extra["experiment"], "b");
}

#[test]
fn test_unknown_source_maps_to_other() {
    let mut raw = fixtures::raw_event("visitor_entered_funnel", "A", 0);
    raw["metadata"]["source"] = serde_json::json!("podcast");

    let (events, errors) = validate_batch(parse(vec![raw]));
    assert!(errors.is_empty());
    assert_eq!(events[0].source_or_default(), engine_core::TrafficSource::Other);
}

#[test]
fn test_validated_events_feed_flow() {
    let raws = parse(vec![
        fixtures::raw_event("visitor_entered_funnel", "A", 0),
        fixtures::raw_event("visitor_entered_funnel", "B", 0),
        fixtures::raw_event("visitor_converted", "B", 100),
    ]);
    let (events, errors) = validate_batch(raws);
    assert!(errors.is_empty());

    let funnel = fixtures::two_step_funnel();
    let flow = calculate_funnel_flow(&events, FUNNEL_ID, &funnel.name, &funnel.steps);
    assert_eq!(flow.total_visitors, 2);
    assert_eq!(flow.total_conversions, 1);
    assert_eq!(flow.overall_conversion_rate, 0.5);
    assert_eq!(flow.average_time_to_convert, 100.0);
}

#[test]
fn test_window_and_size_limit() {
    let events = fixtures::synthetic_traffic(10);
    let window = TimeWindow::new(Some(0), Some(5_000));
    let windowed = window.apply(&events);
    assert!(windowed.iter().all(|e| e.timestamp < 5_000));
    assert!(windowed.len() < events.len());

    assert!(check_slice_size(windowed.len(), windowed.len()).is_ok());
    let err = check_slice_size(windowed.len(), 3).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn test_session_store_lookup_failure_is_session_001() {
    let store = SessionStore::new();
    let session = engine_core::create_session("A", SessionOptions::default());
    let id = session.session_id.clone();
    store.insert(session);

    assert!(store.get(&id).is_ok());
    let err = store.get("nope").unwrap_err();
    assert_eq!(err.error_code(), Some("SESSION_001"));
}
