//! Integration tests for command discovery and registration.

mod common;

use std::sync::Arc;

use common::{MixedHost, SampleCommands, init_tracing};
use tether_core::{
    CommandRegistry, DuplicatePolicy, HostKey, RegistryConfig, RegistryError, ScanIssue,
};

#[tokio::test]
async fn test_valid_and_malformed_counts() {
    init_tracing();
    let registry = CommandRegistry::new();

    for (valid, invalid) in [(0, 0), (3, 0), (0, 2), (4, 3)] {
        let host = Arc::new(MixedHost { valid, invalid });
        // Ids overlap between iterations.
        registry.clear().await;
        let warnings = registry.register(&host).await.unwrap();

        assert_eq!(registry.count().await, valid, "valid={valid} invalid={invalid}");
        assert_eq!(warnings.len(), invalid);
        assert!(warnings
            .iter()
            .all(|w| matches!(w.issue, ScanIssue::MissingParamMarker { position: 0, .. })));
    }
}

#[tokio::test]
async fn test_registration_grows_list_by_discovered_commands() {
    init_tracing();
    let registry = CommandRegistry::new();
    let sample = Arc::new(SampleCommands::default());
    let mixed = Arc::new(MixedHost { valid: 2, invalid: 1 });

    registry.register(&sample).await.unwrap();
    assert_eq!(registry.list().await.len(), 5);

    registry.register(&mixed).await.unwrap();
    assert_eq!(registry.list().await.len(), 7);
    assert_eq!(registry.host_count().await, 2);

    assert_eq!(registry.unregister(&sample).await, 5);
    let ids: Vec<String> = registry.list().await.iter().map(|d| d.id().to_string()).collect();
    assert_eq!(ids, vec!["good0", "good1"]);
}

#[tokio::test]
async fn test_collision_leaves_first_host_untouched() {
    init_tracing();
    let registry = CommandRegistry::new();
    let first = Arc::new(SampleCommands::default());
    let second = Arc::new(SampleCommands::default());

    registry.register(&first).await.unwrap();
    let err = registry.register(&second).await.unwrap_err();

    match err {
        RegistryError::DuplicateCommandId { id, owner } => {
            assert_eq!(id, "getInfo");
            assert_eq!(owner, "SampleCommands");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(registry.count().await, 5);
    assert_eq!(registry.host_count().await, 1);
    for descriptor in registry.list().await {
        assert_eq!(descriptor.host(), HostKey::of(&first));
    }

    // The rejected host never became an owner, so unregistering it is a no-op.
    assert_eq!(registry.unregister(&second).await, 0);
    assert_eq!(registry.count().await, 5);
}

#[tokio::test]
async fn test_replace_policy_moves_ownership() {
    init_tracing();
    let config = RegistryConfig { duplicate_policy: DuplicatePolicy::Replace, event_capacity: 16 };
    let registry = CommandRegistry::with_config(&config);
    let first = Arc::new(SampleCommands::default());
    let second = Arc::new(SampleCommands::default());

    registry.register(&first).await.unwrap();
    registry.register(&second).await.unwrap();

    assert_eq!(registry.count().await, 5);
    assert_eq!(registry.lookup("multiply").await.unwrap().host(), HostKey::of(&second));
    assert_eq!(registry.unregister(&first).await, 0);
    assert_eq!(registry.count().await, 5);
}

#[tokio::test]
async fn test_dropped_host_commands_disappear() {
    init_tracing();
    let registry = CommandRegistry::new();
    let sample = Arc::new(SampleCommands::default());
    registry.register(&sample).await.unwrap();

    drop(sample);

    assert!(matches!(registry.lookup("echo").await, Err(RegistryError::NotFound(_))));
    assert_eq!(registry.count().await, 0);
    assert_eq!(registry.prune_dropped_hosts().await, 5);
    assert_eq!(registry.prune_dropped_hosts().await, 0);
}
