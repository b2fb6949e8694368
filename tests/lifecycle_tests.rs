//! End-to-end lifecycle tests against scripted collaborators: concurrent
//! creates and destroys, registry sharing and event reporting.

use std::collections::HashSet;
use std::time::Duration;

use futures_util::future::join_all;
use kpool::domain::{ClusterSpec, ClusterState};
use kpool::error::{ErrorKind, LifecycleError};
use kpool::port::Event;
use kpool::testkit::{config, eventually, harness::Harness};
use tokio_test::{assert_err, assert_ok};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_distinct_ports_and_one_active() {
    let h = Harness::new();
    h.provisioner.set_provision_delay(Duration::from_millis(20));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move { orchestrator.create(ClusterSpec::new(format!("c{i}"))).await })
        })
        .collect();
    let created: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let ports: HashSet<u16> = created.iter().map(|c| c.api_port).collect();
    assert_eq!(ports.len(), 8);
    assert_eq!(h.orchestrator.list().len(), 8);
    assert_eq!(h.active_count(), 1);
    assert_eq!(h.orchestrator.reserved_ports().len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn registry_is_shared_and_stopped_once() {
    let h = Harness::new();
    let tasks: Vec<_> = (0..5)
        .map(|i| {
            let orchestrator = h.orchestrator.clone();
            let spec = ClusterSpec::new(format!("r{i}")).with_registry(config::registry());
            tokio::spawn(async move { orchestrator.create(spec).await })
        })
        .collect();
    let created: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert!(created.iter().all(|c| c.registry_attached));
    assert_eq!(h.registry.starts(), 1);
    assert_eq!(h.orchestrator.registry_status().await.ref_count, 5);

    let destroys: Vec<_> = created
        .iter()
        .map(|cluster| {
            let orchestrator = h.orchestrator.clone();
            let id = cluster.id;
            tokio::spawn(async move { orchestrator.destroy(id).await })
        })
        .collect();
    for joined in join_all(destroys).await {
        joined.unwrap().unwrap();
    }

    let status = h.orchestrator.registry_status().await;
    assert_eq!(status.ref_count, 0);
    assert!(status.config.is_none());
    assert_eq!(h.registry.stops(), 1);
    assert!(h.orchestrator.list().is_empty());
    assert!(h.orchestrator.reserved_ports().is_empty());
}

#[tokio::test]
async fn port_exhaustion_under_concurrency_keeps_accounting_straight() {
    let mut cfg = config::config();
    cfg.network = config::network(6500, 6503);
    let h = Harness::with_config(&cfg);
    h.provisioner.set_provision_delay(Duration::from_millis(20));

    let results = join_all((0..5).map(|i| h.orchestrator.create(ClusterSpec::new(format!("p{i}"))))).await;
    let (ok, failed): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);

    assert_eq!(ok.len(), 3);
    assert_eq!(failed.len(), 2);
    for err in failed.into_iter().filter_map(Result::err) {
        assert_eq!(err.kind(), ErrorKind::ResourceExhaustion);
    }
    assert_eq!(h.orchestrator.reserved_ports(), vec![6500, 6501, 6502]);
    assert_eq!(h.orchestrator.list().len(), 3);
}

#[tokio::test]
async fn warm_pool_fills_in_background() {
    let h = Harness::new();
    for i in 0..3 {
        h.orchestrator
            .spawn_create_standby(ClusterSpec::new(format!("w{i}")));
    }

    assert!(
        eventually(WAIT, || h
            .orchestrator
            .list()
            .iter()
            .filter(|c| c.state.is_ready())
            .count()
            == 3)
        .await
    );
    assert_eq!(h.active_count(), 1);
    assert_eq!(
        h.notifier
            .matching(|e| matches!(e, Event::Created { .. }))
            .len(),
        3
    );
}

#[tokio::test]
async fn events_follow_the_cluster_through_its_life() {
    let h = Harness::new();
    let spec = ClusterSpec::new("c1").with_registry(config::registry());
    let cluster = h.orchestrator.create(spec).await.unwrap();
    h.orchestrator.destroy(cluster.id).await.unwrap();
    h.orchestrator.wait_idle().await;

    let kinds: Vec<&'static str> = h
        .notifier
        .events()
        .iter()
        .map(|event| match event {
            Event::Creating { .. } => "creating",
            Event::Created { .. } => "created",
            Event::Destroying { .. } => "destroying",
            Event::Destroyed { .. } => "destroyed",
            Event::RegistryStarted { .. } => "registry-started",
            Event::RegistryStopped { .. } => "registry-stopped",
            Event::Activated { .. } => "activated",
            _ => "other",
        })
        .collect();

    let position = |kind: &str| kinds.iter().position(|k| *k == kind).unwrap();
    assert!(position("registry-started") < position("created"));
    assert!(position("creating") < position("created"));
    assert!(position("created") < position("destroying"));
    assert!(position("destroying") < position("destroyed"));
    assert!(kinds.contains(&"registry-stopped"));
    assert!(!kinds.contains(&"other"), "unexpected events: {kinds:?}");
    assert!(h.notifier.failures().is_empty());
}

#[tokio::test]
async fn failed_create_leaves_no_trace() {
    let h = Harness::new();
    h.provisioner.fail_provision("bad");
    let spec = ClusterSpec::new("bad").with_registry(config::registry());

    let err = assert_err!(h.orchestrator.create(spec).await);
    assert!(matches!(err, LifecycleError::ProvisioningFailed { .. }));
    assert!(h.orchestrator.list().is_empty());
    assert!(h.orchestrator.reserved_ports().is_empty());
    assert_eq!(h.orchestrator.registry_status().await.ref_count, 0);

    // The name is free again.
    h.provisioner.clear_failures();
    let retry = assert_ok!(h.orchestrator.create(ClusterSpec::new("bad")).await);
    assert_eq!(retry.state, ClusterState::Active);
}

#[tokio::test]
async fn destroying_standby_keeps_active() {
    let h = Harness::new();
    let a = h.orchestrator.create(ClusterSpec::new("a")).await.unwrap();
    let b = h.orchestrator.create_standby(ClusterSpec::new("b")).await.unwrap();
    assert_eq!(b.state, ClusterState::Standby);

    assert_ok!(h.orchestrator.destroy(b.id).await);
    assert_eq!(h.orchestrator.active().map(|c| c.id), Some(a.id));
    assert_eq!(h.provisioner.torn_down(), vec!["b".to_string()]);
}
