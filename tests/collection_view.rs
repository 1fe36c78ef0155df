use std::sync::Arc;
use std::time::Duration;

use dashview::entity::{Actor, Flow, FlowStatus, FlowType, Record, Survey, SurveyStatus};
use dashview::filter::{evaluate, Filters};
use dashview::remote::{DeleteMode, ListQuery, MemoryRemote, RemoteError, RemoteOp, RemoteService};
use dashview::stats::{OnboardingStats, SurveyStats};
use dashview::store::{LoadOptions, LoadOutcome, LoadState};
use dashview::CollectionView;

fn alice() -> Actor {
    Actor::new("alice")
}

fn flow_view(remote: &Arc<MemoryRemote>) -> CollectionView<Flow> {
    CollectionView::new(remote.clone(), LoadOptions::default(), DeleteMode::Soft)
}

#[tokio::test]
async fn test_fixtures_give_way_to_first_live_record() {
    let remote = Arc::new(MemoryRemote::new());
    let view = flow_view(&remote);
    let actor = alice();

    let outcome = view.load(Some(&actor)).await;
    assert!(matches!(outcome, LoadOutcome::Fixtures(n) if n > 0));
    assert_eq!(view.load_state().await, LoadState::Fixture);
    assert!(view.records().await.iter().all(|f| f.is_fixture()));

    let created = view
        .gateway()
        .create(Some(&actor), Flow::new("Welcome Tour".to_string()))
        .await
        .unwrap();

    let records = view.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id(), created.id());
    assert_eq!(view.load_state().await, LoadState::Loaded);
}

#[tokio::test]
async fn test_fixture_ids_stay_stable_across_loads() {
    let remote = Arc::new(MemoryRemote::new());
    let actor = alice();

    let first = flow_view(&remote);
    first.load(Some(&actor)).await;
    let ids: Vec<_> = first.records().await.iter().map(|f| f.id()).collect();
    assert!(!ids.is_empty());

    let second = flow_view(&remote);
    second.load(Some(&actor)).await;
    first.load(Some(&actor)).await;
    let reloaded: Vec<_> = second.records().await.iter().map(|f| f.id()).collect();
    assert_eq!(reloaded, ids);
    let again: Vec<_> = first.records().await.iter().map(|f| f.id()).collect();
    assert_eq!(again, ids);
    assert!(second.get(ids[0]).await.is_some_and(|f| f.is_fixture()));
}

#[tokio::test]
async fn test_create_during_refresh_survives_stale_list() {
    let remote = Arc::new(MemoryRemote::new());
    let actor = alice();
    remote
        .insert(&actor, Flow::new("Welcome Tour".to_string()))
        .await
        .unwrap();
    let view = flow_view(&remote);
    view.load(Some(&actor)).await;

    remote.pause_lists();
    let before = remote.calls();
    let (outcome, created) = tokio::join!(view.load(Some(&actor)), async {
        while remote.calls() == before {
            tokio::task::yield_now().await;
        }
        let created = view
            .gateway()
            .create(Some(&actor), Flow::new("Billing Setup".to_string()))
            .await;
        remote.resume_lists();
        created
    });
    let created = created.unwrap();

    assert_eq!(outcome, LoadOutcome::Loaded(2));
    let names: Vec<String> = view.records().await.into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["Billing Setup", "Welcome Tour"]);
    assert!(view.get(created.id()).await.is_some());
}

#[tokio::test]
async fn test_delete_during_refresh_stays_deleted() {
    let remote = Arc::new(MemoryRemote::new());
    let actor = alice();
    let doomed = remote
        .insert(&actor, Flow::new("Welcome Tour".to_string()))
        .await
        .unwrap();
    remote
        .insert(&actor, Flow::new("Billing Setup".to_string()))
        .await
        .unwrap();
    let view = flow_view(&remote);
    view.load(Some(&actor)).await;

    remote.pause_lists();
    let before = remote.calls();
    let (outcome, deleted) = tokio::join!(view.load(Some(&actor)), async {
        while remote.calls() == before {
            tokio::task::yield_now().await;
        }
        let confirmation = view.gateway().confirm_delete(doomed.id()).await.unwrap();
        let deleted = view.gateway().delete(Some(&actor), confirmation).await;
        remote.resume_lists();
        deleted
    });
    deleted.unwrap();

    assert_eq!(outcome, LoadOutcome::Loaded(1));
    assert!(view.get(doomed.id()).await.is_none());
}

#[tokio::test]
async fn test_failed_load_keeps_displayed_records() {
    let remote = Arc::new(MemoryRemote::new());
    let actor = alice();
    remote
        .insert(&actor, Flow::new("Welcome Tour".to_string()))
        .await
        .unwrap();

    let view = flow_view(&remote);
    view.load(Some(&actor)).await;
    assert_eq!(view.records().await.len(), 1);

    remote
        .fail_next(RemoteOp::List, RemoteError::Unavailable("timeout".to_string()))
        .await;
    let outcome = view.load(Some(&actor)).await;

    assert!(outcome.is_failure());
    assert!(matches!(view.load_state().await, LoadState::Failed(_)));
    assert_eq!(view.records().await.len(), 1);
}

#[tokio::test]
async fn test_projection_tracks_store_through_mutations() {
    let remote = Arc::new(MemoryRemote::new());
    let actor = alice();
    let mut view = flow_view(&remote);
    view.load(Some(&actor)).await;

    let mut ids = Vec::new();
    for (name, flow_type) in [
        ("Welcome Tour", FlowType::Onboarding),
        ("Billing Setup", FlowType::Checklist),
        ("Invite Team", FlowType::Onboarding),
        ("Import Data", FlowType::Announcement),
    ] {
        let mut draft = Flow::new(name.to_string());
        draft.flow_type = flow_type;
        let saved = view.gateway().create(Some(&actor), draft).await.unwrap();
        ids.push(saved.id());
    }
    view.gateway()
        .update_status(Some(&actor), ids[0], FlowStatus::Active)
        .await
        .unwrap();
    let confirmation = view.gateway().confirm_delete(ids[2]).await.unwrap();
    view.gateway().delete(Some(&actor), confirmation).await.unwrap();

    let filter_sets = [
        Filters::<Flow>::new(),
        Filters::<Flow>::new().with_category(FlowType::Onboarding),
        Filters::<Flow>::new().with_status(FlowStatus::Draft),
        Filters::<Flow>::new().with_search("  SETUP "),
    ];
    for filters in filter_sets {
        view.set_filters(filters.clone());
        let expected: Vec<Flow> = view
            .records()
            .await
            .into_iter()
            .filter(|f| evaluate(f, &filters))
            .collect();
        assert_eq!(view.projection().await, expected);
    }

    let names: Vec<String> = view.records().await.into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["Import Data", "Billing Setup", "Welcome Tour"]);
}

#[tokio::test]
async fn test_response_after_view_dropped_is_discarded() {
    let remote = Arc::new(MemoryRemote::new());
    let actor = alice();
    let view: CollectionView<Survey> =
        CollectionView::new(remote.clone(), LoadOptions::default(), DeleteMode::Soft);
    view.load(Some(&actor)).await;

    remote.pause_writes();
    let gateway = view.gateway().clone();
    let pending = tokio::spawn(async move {
        gateway
            .create(Some(&Actor::new("alice")), Survey::new("Pulse".to_string()))
            .await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(view.gateway().is_creating());

    let detached = view.gateway().clone();
    drop(view);
    remote.resume_writes();

    let saved = pending.await.unwrap().unwrap();
    assert!(!detached.is_attached());
    assert!(!detached.is_creating());

    // the write still happened remotely
    let listed: Vec<Survey> = remote.list(&actor, &ListQuery::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), saved.id());
}

#[tokio::test]
async fn test_dashboard_summaries() {
    let remote = Arc::new(MemoryRemote::new());
    let actor = alice();

    let surveys: CollectionView<Survey> =
        CollectionView::new(remote.clone(), LoadOptions::default(), DeleteMode::Soft);
    surveys.load(Some(&actor)).await;
    let draft = surveys
        .gateway()
        .create(Some(&actor), Survey::new("Pulse".to_string()))
        .await
        .unwrap();
    surveys
        .gateway()
        .update_status(Some(&actor), draft.id(), SurveyStatus::Active)
        .await
        .unwrap();
    surveys
        .gateway()
        .create(Some(&actor), Survey::new("Exit Interview".to_string()))
        .await
        .unwrap();

    let stats = surveys
        .summarize(|records| SurveyStats::compute(records, &[], chrono::Utc::now()))
        .await;
    assert_eq!(stats.total, 2);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.drafts, 1);
    assert_eq!(stats.nps.nps, 0);

    let flows = flow_view(&remote);
    flows.load(Some(&actor)).await;
    let stats = flows
        .summarize(|records| OnboardingStats::compute(records, &[]))
        .await;
    // fixtures count towards the header figures while they are displayed
    assert_eq!(stats.total_flows, flows.records().await.len());
}
