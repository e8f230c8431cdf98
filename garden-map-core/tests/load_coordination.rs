//! Cross-component tests for SDK load deduplication and map realization
//!
//! These tests verify that:
//! 1. Concurrent callers share one SDK fetch and observe the same outcome
//! 2. A failed fetch is reported to every joined caller and can be retried
//! 3. A fetch finishes even when every caller stops waiting
//! 4. Several maps sharing one coordinator trigger a single fetch
//!
//! Run with: cargo test -p garden-map-core --test load_coordination

use futures::future::join_all;
use garden_map_core::{
    ContainerId, ContainerSlot, Credential, GardenMapConfig, LifecycleStatus, LoadError,
    LoadStatus, LoaderCoordinator, LoaderSettings, MapError, MapLifecycleController,
    SimulatedProvider,
};
use std::sync::Arc;
use std::time::Duration;

fn setup(delay_ms: u64) -> (Arc<SimulatedProvider>, Arc<LoaderCoordinator>) {
    let provider =
        Arc::new(SimulatedProvider::new().with_fetch_delay(Duration::from_millis(delay_ms)));
    let loader = Arc::new(LoaderCoordinator::new(
        provider.clone(),
        LoaderSettings::default(),
    ));
    (provider, loader)
}

// =============================================================================
// LOADER DEDUPLICATION
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_fetch() {
    let (provider, loader) = setup(150);
    let credential = Credential::new("key");

    let results = join_all((0..10).map(|_| loader.ensure_loaded(&credential))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(loader.status(), LoadStatus::Loaded);
}

#[tokio::test]
async fn test_loaded_sdk_is_not_fetched_again() {
    let (provider, loader) = setup(0);
    let credential = Credential::new("key");

    for _ in 0..3 {
        loader.ensure_loaded(&credential).await.unwrap();
    }

    assert_eq!(provider.fetch_count(), 1);
    assert!(loader.is_loaded());
}

#[tokio::test(start_paused = true)]
async fn test_failure_is_shared_then_retry_fetches_once() {
    let (provider, loader) = setup(100);
    let credential = Credential::new("key");
    provider.fail_next_fetches(1);

    let results = join_all((0..5).map(|_| loader.ensure_loaded(&credential))).await;
    let first = results[0].clone().unwrap_err();
    assert!(matches!(first, LoadError::LoadFailure(_)));
    assert!(results.iter().all(|r| r.as_ref().err() == Some(&first)));
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(loader.status(), LoadStatus::NotStarted);

    let results = join_all((0..5).map(|_| loader.ensure_loaded(&credential))).await;
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(provider.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_completes_after_caller_gives_up() {
    let (provider, loader) = setup(200);

    let waited = tokio::time::timeout(
        Duration::from_millis(50),
        loader.ensure_loaded(&Credential::new("key")),
    )
    .await;
    assert!(waited.is_err());
    assert_eq!(loader.status(), LoadStatus::Loading);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(loader.status(), LoadStatus::Loaded);
    assert_eq!(provider.fetch_count(), 1);
}

// =============================================================================
// SHARED COORDINATOR ACROSS MAPS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_two_maps_share_one_fetch() {
    let (provider, loader) = setup(100);
    let config = GardenMapConfig::default();
    let credential = Credential::new("key");

    let first = MapLifecycleController::new(provider.clone(), loader.clone());
    let second = MapLifecycleController::new(provider.clone(), loader.clone());
    let first_slot = ContainerSlot::mounted(ContainerId::new("front-garden"));
    let second_slot = ContainerSlot::mounted(ContainerId::new("back-garden"));
    let first_options = config.init_options();
    let second_options = config.init_options();

    let (a, b) = tokio::join!(
        first.initialize(
            &first_slot,
            &credential,
            config.map.center,
            config.map.zoom,
            &first_options,
        ),
        second.initialize(
            &second_slot,
            &credential,
            config.map.center,
            config.map.zoom,
            &second_options,
        ),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a, b);
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(provider.map_count(), 2);

    first.teardown();
    assert_eq!(provider.map_count(), 1);
    assert_eq!(second.status(), LifecycleStatus::Ready(b));
}

#[tokio::test(start_paused = true)]
async fn test_configured_container_wait_bounds_polling() {
    let (provider, loader) = setup(0);
    let config = GardenMapConfig::from_yaml(
        r#"
container:
  poll_interval_ms: 200
  max_attempts: 3
"#,
    )
    .unwrap();

    let controller = MapLifecycleController::new(provider.clone(), loader)
        .with_container_wait(config.container.clone());
    let started = tokio::time::Instant::now();
    let err = controller
        .initialize(
            &ContainerSlot::new(),
            &Credential::new("key"),
            config.map.center,
            config.map.zoom,
            &config.init_options(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        MapError::ContainerUnavailable {
            attempts: 3,
            waited_ms: 600
        }
    );
    assert_eq!(err.user_message(), "Map element not available after 0.6 seconds");
    assert!(started.elapsed() >= Duration::from_millis(600));
    assert_eq!(provider.fetch_count(), 0);
}
