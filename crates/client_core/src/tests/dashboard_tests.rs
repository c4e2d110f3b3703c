use std::{pin::pin, sync::Arc};

use shared::protocol::FieldValue;

use super::*;
use crate::{
    error::NETWORK_FAILURE_MESSAGE,
    testing::{record, FakeConsoleApi, FakeOp},
    ClientError,
};

fn seeded() -> Arc<FakeConsoleApi> {
    let api = Arc::new(FakeConsoleApi::new());
    api.seed(
        ResourceKind::Person,
        vec![
            record(1, &[("nome", FieldValue::from("Ana"))]),
            record(2, &[("nome", FieldValue::from("Bruno"))]),
        ],
    );
    api.seed(
        ResourceKind::Venue,
        vec![record(5, &[("descricao", FieldValue::from("Cafe"))])],
    );
    api
}

#[tokio::test]
async fn load_collects_health_and_samples() {
    let api = seeded();
    let controller = DashboardController::new(api.clone());

    controller.load().await;

    let view = controller.state();
    assert!(!view.loading);
    assert!(view.error.is_none());
    let snapshot = view.snapshot.expect("snapshot");
    assert!(snapshot.health.is_healthy());
    assert_eq!(snapshot.people.len(), 1);
    assert_eq!(snapshot.venues.len(), 1);
    assert!(snapshot.preferences.is_empty());
    assert_eq!(api.call_count(FakeOp::Health), 1);
}

#[tokio::test]
async fn one_failed_call_keeps_previous_snapshot() {
    let api = seeded();
    let controller = DashboardController::new(api.clone());
    controller.load().await;
    let before = controller.state().snapshot;

    api.fail(
        FakeOp::List(ResourceKind::Venue),
        ClientError::Network("timed out".into()),
    );
    controller.load().await;

    let view = controller.state();
    assert_eq!(view.error.as_deref(), Some(NETWORK_FAILURE_MESSAGE));
    assert_eq!(view.snapshot, before);
    // Every sub-call still went out.
    assert_eq!(api.call_count(FakeOp::List(ResourceKind::Preference)), 2);
}

#[tokio::test]
async fn second_load_waits_for_the_first() {
    let api = seeded();
    let release_people = api.gate_list(ResourceKind::Person);
    let controller = DashboardController::new(api.clone());
    let mut updates = controller.subscribe();

    let mut first = pin!(controller.load());
    assert!(futures::poll!(first.as_mut()).is_pending());
    let mut second = pin!(controller.load());
    assert!(futures::poll!(second.as_mut()).is_pending());

    assert_eq!(api.call_count(FakeOp::Health), 1);
    {
        let view = updates.borrow_and_update();
        assert!(view.loading);
        assert!(view.snapshot.is_none());
    }

    release_people
        .send(Ok(vec![record(9, &[("nome", FieldValue::from("Caio"))])]))
        .expect("people sample waiting");
    first.await;
    assert!(updates.has_changed().expect("controller alive"));
    {
        let view = updates.borrow_and_update();
        assert!(!view.loading);
        let snapshot = view.snapshot.as_ref().expect("snapshot");
        assert_eq!(snapshot.people[0].id.0, 9);
    }
    assert_eq!(api.call_count(FakeOp::Health), 1);

    second.await;
    assert_eq!(api.call_count(FakeOp::Health), 2);
    assert_eq!(
        controller.state().snapshot.expect("snapshot").people[0].id.0,
        1
    );
}
