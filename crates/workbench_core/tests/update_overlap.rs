use workbench_core::{
    update, Effect, FailureStage, LoadFailure, Msg, OverlapPolicy, ViewState,
};

fn schedule(state: ViewState<u32>, resource: &str) -> (ViewState<u32>, Vec<Effect>) {
    update(state, Msg::LoadRequested(resource.to_string()))
}

fn success(load_id: u64, resource: &str, structure: u32) -> Msg<u32> {
    Msg::LoadSucceeded {
        load_id,
        resource: resource.to_string(),
        structure: Some(structure),
    }
}

#[test]
fn overlapping_loads_apply_in_completion_order() {
    let state = ViewState::new();
    let (state, _) = schedule(state, "file:///first.shp");
    let (state, _) = schedule(state, "file:///second.shp");
    assert_eq!(state.in_flight().collect::<Vec<_>>(), vec![1, 2]);

    // The newer request finishes first; the older one lands last and wins.
    let (state, _) = update(state, success(2, "file:///second.shp", 2));
    let (state, _) = update(state, success(1, "file:///first.shp", 1));

    assert_eq!(state.current_resource(), Some("file:///first.shp"));
    assert_eq!(state.structure(), Some(&1));
    assert!(!state.is_loading());
}

#[test]
fn load_completing_after_clear_still_applies() {
    let state = ViewState::new();
    let (state, _) = schedule(state, "file:///a.shp");

    let (state, effects) = update(state, Msg::ClearClicked);
    assert_eq!(effects, vec![Effect::NotifyInput(None)]);
    assert_eq!(state.current_resource(), None);
    assert!(state.is_loading());

    let (state, effects) = update(state, success(1, "file:///a.shp", 7));
    assert_eq!(state.current_resource(), Some("file:///a.shp"));
    assert_eq!(
        effects,
        vec![Effect::NotifyInput(Some("file:///a.shp".to_string()))]
    );
}

#[test]
fn latest_request_policy_cancels_and_drops_superseded_loads() {
    let state = ViewState::with_policy(OverlapPolicy::LatestRequestWins);
    let (state, _) = schedule(state, "file:///first.shp");
    let (state, effects) = schedule(state, "file:///second.shp");

    assert_eq!(
        effects,
        vec![
            Effect::CancelLoads(vec![1]),
            Effect::ScheduleLoad {
                load_id: 2,
                resource: "file:///second.shp".to_string(),
            },
        ]
    );

    let (state, _) = update(state, success(2, "file:///second.shp", 2));
    let (state, effects) = update(state, success(1, "file:///first.shp", 1));

    assert!(effects.is_empty());
    assert_eq!(state.current_resource(), Some("file:///second.shp"));
    assert_eq!(state.structure(), Some(&2));
}

#[test]
fn latest_request_policy_clear_discards_pending_load() {
    let state = ViewState::with_policy(OverlapPolicy::LatestRequestWins);
    let (state, _) = schedule(state, "file:///a.shp");

    let (state, effects) = update(state, Msg::ClearClicked);
    assert_eq!(
        effects,
        vec![Effect::CancelLoads(vec![1]), Effect::NotifyInput(None)]
    );

    let (state, effects) = update(
        state,
        Msg::LoadFailed {
            load_id: 1,
            resource: "file:///a.shp".to_string(),
            failure: LoadFailure::new(FailureStage::Cancelled, "job cancelled"),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.current_resource(), None);
    assert!(!state.is_loading());
}

#[test]
fn superseded_failure_is_still_reported_but_not_shown() {
    let state = ViewState::with_policy(OverlapPolicy::LatestRequestWins);
    let (state, _) = schedule(state, "http://bad.host/a.shp");
    let (state, _) = schedule(state, "file:///b.shp");

    let (state, effects) = update(
        state,
        Msg::LoadFailed {
            load_id: 1,
            resource: "http://bad.host/a.shp".to_string(),
            failure: LoadFailure::new(FailureStage::Open, "dns error"),
        },
    );

    assert!(matches!(effects.as_slice(), [Effect::ReportFailure { load_id: 1, .. }]));
    assert_eq!(state.indicator(), workbench_core::Indicator::Normal);
    assert!(state.is_loading());
}
