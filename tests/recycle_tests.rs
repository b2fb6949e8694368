//! Recycle: instant swap to a standby and background replacement.

use std::time::Duration;

use kpool::domain::{ClusterSpec, ClusterState};
use kpool::error::LifecycleError;
use kpool::testkit::{config, eventually, harness::Harness};

const WAIT: Duration = Duration::from_secs(5);

fn with_registry(name: &str) -> ClusterSpec {
    ClusterSpec::new(name).with_registry(config::registry())
}

#[tokio::test]
async fn repeated_recycles_keep_pool_shape() {
    let h = Harness::new();
    h.orchestrator.create(with_registry("a")).await.unwrap();
    h.orchestrator.create_standby(with_registry("b")).await.unwrap();

    let mut retired = Vec::new();
    for _ in 0..4 {
        let recycle = h.orchestrator.recycle().unwrap();
        assert_eq!(recycle.activated.state, ClusterState::Active);
        retired.push(recycle.retired.spec.name.clone());

        let report = recycle.wait().await.unwrap();
        assert!(report.destroyed.is_ok());
        let replacement = report.replacement.unwrap();
        assert!(replacement.spec.name.starts_with("k3s-cluster-"));
        assert_eq!(replacement.state, ClusterState::Standby);

        assert_eq!(h.orchestrator.list().len(), 2);
        assert_eq!(h.active_count(), 1);
    }

    assert_eq!(&retired[..2], ["a", "b"]);
    // The registry survives every swap.
    assert_eq!(h.registry.starts(), 1);
    assert_eq!(h.registry.stops(), 0);
    assert_eq!(h.orchestrator.registry_status().await.ref_count, 2);
}

#[tokio::test]
async fn provisioning_standby_is_not_swapped_in() {
    let h = Harness::new();
    h.orchestrator.create(ClusterSpec::new("a")).await.unwrap();

    h.provisioner.set_provision_delay(Duration::from_millis(300));
    h.orchestrator.spawn_create_standby(ClusterSpec::new("b"));
    assert!(eventually(WAIT, || h.orchestrator.find("b").is_some()).await);
    assert_eq!(
        h.orchestrator.find("b").unwrap().state,
        ClusterState::Provisioning
    );

    assert_eq!(
        h.orchestrator.recycle().unwrap_err(),
        LifecycleError::NoStandbyAvailable
    );

    h.orchestrator.wait_idle().await;
    let recycle = h.orchestrator.recycle().unwrap();
    assert_eq!(recycle.activated.spec.name, "b");
}

#[tokio::test]
async fn shutdown_abandons_slow_replacement() {
    let h = Harness::new();
    h.orchestrator.create(ClusterSpec::new("a")).await.unwrap();
    h.orchestrator.create_standby(ClusterSpec::new("b")).await.unwrap();

    h.provisioner.set_provision_delay(Duration::from_secs(30));
    let recycle = h.orchestrator.recycle().unwrap();
    assert_eq!(recycle.activated.spec.name, "b");

    // Wait for the replacement record to appear.
    assert!(
        eventually(WAIT, || h
            .orchestrator
            .list()
            .iter()
            .any(|c| c.state == ClusterState::Provisioning))
        .await
    );

    let report = h.orchestrator.shutdown(Duration::from_millis(50)).await;
    assert_eq!(report.abandoned.len(), 1);
    assert_eq!(h.states(), vec![("b".into(), "active".into())]);
    assert_eq!(h.orchestrator.reserved_ports().len(), 1);
    assert!(recycle.wait().await.is_none());
}
