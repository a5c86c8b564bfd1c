//! Integration tests for the load balancer controller.

mod common;

use std::sync::Arc;

use common::{FakeCloud, audit};
use hcloud_reconciler::error::ErrorClass;
use hcloud_reconciler::provider::{AlgorithmType, IdRef, TargetRef};
use hcloud_reconciler::reconciler::{LoadBalancerController, PassOutcome, reconcile_once};
use hcloud_reconciler::spec::LoadBalancerSpec;
use hcloud_reconciler::store::MemoryStore;
use serde_json::{Value, json};

fn make_service(listen_port: u16, protocol: &str) -> Value {
    json!({
        "listenPort": listen_port,
        "destinationPort": 8080,
        "protocol": protocol,
        "healthCheck": {
            "protocol": "tcp",
            "port": 8080,
            "interval": "15s",
            "timeout": "10s",
            "retries": 3,
        },
    })
}

fn make_spec(services: Vec<Value>) -> LoadBalancerSpec {
    serde_json::from_value(json!({
        "type": "lb11",
        "location": "fsn1",
        "labels": {"app": "shop"},
        "services": services,
        "targets": [{"type": "server", "serverId": 11, "usePrivateIp": true}],
    }))
    .unwrap()
}

async fn setup() -> (
    Arc<FakeCloud>,
    LoadBalancerController,
    MemoryStore<LoadBalancerSpec>,
) {
    let fake = FakeCloud::with_catalog();
    let controller = LoadBalancerController::new(fake.cloud());
    let store = MemoryStore::new();
    store
        .apply(
            "shop",
            make_spec(vec![make_service(80, "http"), make_service(443, "tcp")]),
        )
        .await;
    reconcile_once(&controller, &store, &audit(), "shop")
        .await
        .unwrap();
    fake.clear_calls();
    (fake, controller, store)
}

async fn lb_id(store: &MemoryStore<LoadBalancerSpec>) -> i64 {
    store.status("shop").await.unwrap().provider_id.unwrap()
}

/// Test: Create - services, targets and placement go out in one request.
#[tokio::test]
async fn test_create() {
    let (fake, _controller, store) = setup().await;
    let id = lb_id(&store).await;

    let state = fake.state();
    let lb = &state.load_balancers[&id];
    assert_eq!(lb.load_balancer_type.name, "lb11");
    assert_eq!(lb.algorithm.kind, AlgorithmType::RoundRobin);
    assert!(lb.public_net.enabled);
    assert_eq!(lb.services.len(), 2);
    assert_eq!(lb.services[0].health_check.interval, Some(15));
    assert_eq!(lb.services[0].health_check.timeout, Some(10));
    assert_eq!(
        lb.targets[0].target,
        TargetRef::Server {
            server: IdRef { id: 11 }
        }
    );
    // No network, so no private addressing.
    assert_eq!(lb.targets[0].use_private_ip, Some(false));
}

/// Test: End to end - an algorithm change plus a service swap runs every
/// sub-operation in order and waits for each action before the next call.
#[tokio::test]
async fn test_update_sequence() {
    let (fake, controller, store) = setup().await;

    let mut spec = make_spec(vec![make_service(8443, "tcp")]);
    spec.algorithm = AlgorithmType::LeastConnections;
    store.apply("shop", spec.clone()).await;

    let outcome = reconcile_once(&controller, &store, &audit(), "shop")
        .await
        .unwrap();
    assert_eq!(outcome, PassOutcome::Updated);

    assert_eq!(
        fake.calls(),
        vec![
            "get_load_balancer",
            "get_load_balancer",
            "update_load_balancer",
            "change_load_balancer_algorithm",
            "get_action",
            "delete_load_balancer_service",
            "get_action",
            "delete_load_balancer_service",
            "get_action",
            "add_load_balancer_service",
            "get_action",
        ]
    );

    let id = lb_id(&store).await;
    {
        let state = fake.state();
        let lb = &state.load_balancers[&id];
        assert_eq!(lb.algorithm.kind, AlgorithmType::LeastConnections);
        assert_eq!(lb.services.len(), 1);
        assert_eq!(lb.services[0].listen_port, 8443);
        assert_eq!(lb.targets.len(), 1);
    }
    assert_eq!(store.status("shop").await.unwrap().last_applied, Some(spec));

    // A second pass has nothing left to do.
    fake.clear_calls();
    let outcome = reconcile_once(&controller, &store, &audit(), "shop")
        .await
        .unwrap();
    assert_eq!(outcome, PassOutcome::UpToDate);
    assert!(fake.mutations().is_empty());
}

/// Test: Targets - a target change removes the reported targets and adds the
/// desired ones.
#[tokio::test]
async fn test_replace_targets() {
    let (fake, controller, store) = setup().await;

    let mut spec = make_spec(vec![make_service(80, "http"), make_service(443, "tcp")]);
    spec.targets = serde_json::from_value(json!([
        {"type": "label_selector", "labels": {"app": "shop"}},
        {"type": "ip", "ip": "203.0.113.10"},
    ]))
    .unwrap();
    store.apply("shop", spec).await;

    reconcile_once(&controller, &store, &audit(), "shop")
        .await
        .unwrap();

    assert_eq!(
        fake.mutations(),
        vec![
            "update_load_balancer",
            "remove_load_balancer_target",
            "add_load_balancer_target",
            "add_load_balancer_target",
        ]
    );
    let id = lb_id(&store).await;
    let state = fake.state();
    let targets = &state.load_balancers[&id].targets;
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[1].use_private_ip, None);
}

/// Test: Network - attaching to a network waits for the action.
#[tokio::test]
async fn test_attach_network() {
    let (fake, controller, store) = setup().await;
    let mut spec = make_spec(vec![make_service(80, "http"), make_service(443, "tcp")]);
    spec.network_id = Some(77);
    store.apply("shop", spec).await;

    reconcile_once(&controller, &store, &audit(), "shop")
        .await
        .unwrap();

    // Targets convert differently once a network is attached, but their spec
    // did not change, so they are left alone.
    assert_eq!(
        fake.mutations(),
        vec!["update_load_balancer", "attach_load_balancer_to_network"]
    );
    let id = lb_id(&store).await;
    assert_eq!(fake.state().load_balancers[&id].private_net[0].network, 77);
}

/// Test: Failure mid-sequence - later sub-operations are skipped and the
/// change is retried as a whole.
#[tokio::test]
async fn test_failed_action_stops_sequence() {
    let (fake, controller, store) = setup().await;
    fake.fail_command("change_algorithm");

    let mut spec = make_spec(vec![make_service(8443, "tcp")]);
    spec.algorithm = AlgorithmType::LeastConnections;
    store.apply("shop", spec).await;

    let err = reconcile_once(&controller, &store, &audit(), "shop")
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Action);
    assert!(!fake.calls().contains(&"delete_load_balancer_service".to_string()));

    let status = store.status("shop").await.unwrap();
    assert_eq!(
        status.last_applied.unwrap().algorithm,
        AlgorithmType::RoundRobin
    );
}

/// Test: Delete - the load balancer is removed and the instance finalized.
#[tokio::test]
async fn test_delete() {
    let (fake, controller, store) = setup().await;

    store.request_deletion("shop").await.unwrap();
    let outcome = reconcile_once(&controller, &store, &audit(), "shop")
        .await
        .unwrap();
    assert_eq!(outcome, PassOutcome::Deleted);
    assert!(fake.state().load_balancers.is_empty());
    assert!(!store.contains("shop").await);
}
