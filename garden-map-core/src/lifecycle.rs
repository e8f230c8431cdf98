//! MapLifecycleController - realize, observe and tear down one map
//!
//! ## State machine
//!
//! ```text
//!   Idle ─▶ Polling ─▶ LoadingSdk ─▶ Constructing ─▶ Ready
//!     │        │           │              │
//!     └────────┴───────────┴──────────────┴──▶ Failed(reason)
//!
//!   teardown(): any state ─▶ TornDown (terminal)
//! ```
//!
//! Initialization steps run strictly in order: validate credential, wait for
//! the container, load the SDK, re-check the container, construct map and
//! marker, attach drawing, publish `Ready`. Teardown may arrive at any
//! suspension point; a map constructed after teardown is released before
//! `initialize` returns and is never published.
//!
//! The status is published on a `watch` channel so hosts can render the
//! loading, error and ready states without polling.

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::{ContainerWait, Credential};
use crate::container::ContainerSource;
use crate::loader::{LoadError, LoaderCoordinator};
use crate::lock;
use crate::options::{InitOptions, LatLng, MapOptions};
use crate::overlay::{DrawingOverlayManager, ShapeObserver};
use crate::provider::{ContainerId, MapId, MapsProvider, MarkerId, ProviderError};

/// Errors from [`MapLifecycleController::initialize`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("maps credential is missing")]
    MissingCredential,
    #[error("map container not available after {attempts} checks ({waited_ms} ms)")]
    ContainerUnavailable { attempts: u32, waited_ms: u64 },
    #[error("map container was removed while the SDK loaded")]
    ContainerLost,
    #[error("maps SDK failed to load: {0}")]
    SdkLoadFailure(#[source] LoadError),
    #[error("map construction failed: {0}")]
    Construction(#[from] ProviderError),
    #[error("map controller was torn down")]
    TornDown,
    #[error("map initialization already {0}")]
    AlreadyStarted(&'static str),
}

impl MapError {
    /// The single explanatory message shown to end users.
    pub fn user_message(&self) -> String {
        match self {
            MapError::MissingCredential => {
                "Google Maps API key not found. Please check your environment variables."
                    .to_string()
            }
            MapError::ContainerUnavailable { waited_ms, .. } => {
                format!("Map element not available after {}", describe_wait(*waited_ms))
            }
            MapError::ContainerLost => "Map element lost during API load".to_string(),
            MapError::SdkLoadFailure(_) => "Failed to load Google Maps".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether re-invoking `initialize` may succeed without a configuration change.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MapError::ContainerUnavailable { .. }
                | MapError::ContainerLost
                | MapError::SdkLoadFailure(_)
        )
    }
}

/// "5 seconds", "1 second" or "0.6 seconds"
fn describe_wait(waited_ms: u64) -> String {
    match waited_ms {
        1000 => "1 second".to_string(),
        ms if ms % 1000 == 0 => format!("{} seconds", ms / 1000),
        ms => format!("{} seconds", ms as f64 / 1000.0),
    }
}

/// Caller-visible controller status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleStatus {
    Idle,
    Polling,
    LoadingSdk,
    Constructing,
    Ready(MapId),
    Failed(MapError),
    TornDown,
}

impl LifecycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Idle => "idle",
            LifecycleStatus::Polling => "polling",
            LifecycleStatus::LoadingSdk => "loading_sdk",
            LifecycleStatus::Constructing => "constructing",
            LifecycleStatus::Ready(_) => "ready",
            LifecycleStatus::Failed(_) => "failed",
            LifecycleStatus::TornDown => "torn_down",
        }
    }

    /// True between the start of initialization and `Ready`/`Failed`.
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            LifecycleStatus::Polling | LifecycleStatus::LoadingSdk | LifecycleStatus::Constructing
        )
    }
}

/// Map and drawing surface owned by one controller
struct RealizedMap {
    map: MapId,
    marker: MarkerId,
    overlays: Option<DrawingOverlayManager>,
}

impl RealizedMap {
    /// Overlays go first, then the map itself.
    fn release(self, provider: &dyn MapsProvider) {
        if let Some(overlays) = &self.overlays {
            overlays.detach();
        }
        provider.destroy_map(self.map);
        debug!(map = %self.map, marker = %self.marker, "Map released");
    }
}

/// Owns one map instance from container wait to teardown
pub struct MapLifecycleController {
    provider: Arc<dyn MapsProvider>,
    loader: Arc<LoaderCoordinator>,
    wait: ContainerWait,
    observer: Option<Arc<dyn ShapeObserver>>,
    realized: Mutex<Option<RealizedMap>>,
    status: watch::Sender<LifecycleStatus>,
}

impl MapLifecycleController {
    pub fn new(provider: Arc<dyn MapsProvider>, loader: Arc<LoaderCoordinator>) -> Self {
        let (status, _rx) = watch::channel(LifecycleStatus::Idle);
        Self {
            provider,
            loader,
            wait: ContainerWait::default(),
            observer: None,
            realized: Mutex::new(None),
            status,
        }
    }

    pub fn with_container_wait(mut self, wait: ContainerWait) -> Self {
        self.wait = wait;
        self
    }

    /// Receiver of shape creation/deletion notifications for drawn shapes.
    pub fn with_observer(mut self, observer: Arc<dyn ShapeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn status(&self) -> LifecycleStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleStatus> {
        self.status.subscribe()
    }

    /// The realized map, if `Ready`.
    pub fn map(&self) -> Option<MapId> {
        lock(&self.realized).as_ref().map(|r| r.map)
    }

    /// Run `f` against the drawing overlays of the realized map.
    ///
    /// Returns `None` before `Ready`, after teardown, or when drawing is off.
    pub fn with_overlays<R>(&self, f: impl FnOnce(&DrawingOverlayManager) -> R) -> Option<R> {
        let realized = lock(&self.realized);
        realized.as_ref()?.overlays.as_ref().map(f)
    }

    /// Realize the map once the container and the SDK are both ready.
    pub async fn initialize(
        &self,
        container: &dyn ContainerSource,
        credential: &Credential,
        center: LatLng,
        zoom: f64,
        options: &InitOptions,
    ) -> Result<MapId, MapError> {
        self.begin(credential)?;
        let _abandon = AbandonGuard {
            status: &self.status,
        };

        match self
            .run_initialize(container, credential, center, zoom, options)
            .await
        {
            Ok(map) => Ok(map),
            Err(MapError::TornDown) => {
                info!("Map initialization abandoned after teardown");
                Err(MapError::TornDown)
            }
            Err(e) => {
                error!(error = %e, "Map initialization failed");
                self.status.send_if_modified(|status| {
                    if *status == LifecycleStatus::TornDown {
                        return false;
                    }
                    *status = LifecycleStatus::Failed(e.clone());
                    true
                });
                Err(e)
            }
        }
    }

    /// Release the drawing overlays and the map. Safe from any state; only
    /// the first call has an effect.
    pub fn teardown(&self) {
        let realized = {
            let mut realized = lock(&self.realized);
            if *self.status.borrow() == LifecycleStatus::TornDown {
                return;
            }
            self.status.send_replace(LifecycleStatus::TornDown);
            realized.take()
        };

        match realized {
            Some(realized) => {
                info!(map = %realized.map, "Tearing down map");
                realized.release(&*self.provider);
            }
            None => debug!("Teardown before map was realized"),
        }
    }

    /// Claim the controller for one initialization attempt.
    ///
    /// Allowed from `Idle` or `Failed`. An empty credential fails the attempt
    /// here, before any container wait or fetch.
    fn begin(&self, credential: &Credential) -> Result<(), MapError> {
        let mut outcome = Ok(());
        self.status.send_if_modified(|status| {
            outcome = match status {
                LifecycleStatus::Idle | LifecycleStatus::Failed(_) if credential.is_empty() => {
                    Err(MapError::MissingCredential)
                }
                LifecycleStatus::Idle | LifecycleStatus::Failed(_) => Ok(()),
                LifecycleStatus::TornDown => Err(MapError::TornDown),
                LifecycleStatus::Ready(_) => Err(MapError::AlreadyStarted("ready")),
                _ => Err(MapError::AlreadyStarted("in progress")),
            };
            match &outcome {
                Ok(()) => *status = LifecycleStatus::Polling,
                Err(MapError::MissingCredential) => {
                    *status = LifecycleStatus::Failed(MapError::MissingCredential)
                }
                Err(_) => return false,
            }
            true
        });
        if let Err(MapError::MissingCredential) = &outcome {
            error!("Maps credential missing, map will not load");
        }
        outcome
    }

    /// Move to `next` unless teardown already happened.
    fn advance(&self, next: LifecycleStatus) -> Result<(), MapError> {
        let advanced = self.status.send_if_modified(|status| {
            if *status == LifecycleStatus::TornDown {
                return false;
            }
            *status = next;
            true
        });
        if advanced {
            Ok(())
        } else {
            Err(MapError::TornDown)
        }
    }

    fn is_torn_down(&self) -> bool {
        *self.status.borrow() == LifecycleStatus::TornDown
    }

    async fn run_initialize(
        &self,
        container: &dyn ContainerSource,
        credential: &Credential,
        center: LatLng,
        zoom: f64,
        options: &InitOptions,
    ) -> Result<MapId, MapError> {
        let target = self.wait_for_container(container).await?;
        info!(container = %target, "Map container found");

        self.advance(LifecycleStatus::LoadingSdk)?;
        self.loader
            .ensure_loaded(credential)
            .await
            .map_err(MapError::SdkLoadFailure)?;
        if self.is_torn_down() {
            return Err(MapError::TornDown);
        }

        let target = match container.current() {
            Some(current) if current == target => current,
            Some(current) => {
                warn!(
                    expected = %target,
                    found = %current,
                    "Map container replaced during SDK load"
                );
                return Err(MapError::ContainerLost);
            }
            None => return Err(MapError::ContainerLost),
        };

        self.advance(LifecycleStatus::Constructing)?;
        let realized = self.construct(&target, center, zoom, options)?;
        let map = realized.map;

        // Publish under the lock teardown takes, so a concurrent teardown
        // either sees the map or makes us release it.
        let orphan = {
            let mut slot = lock(&self.realized);
            if self.is_torn_down() {
                Some(realized)
            } else {
                *slot = Some(realized);
                self.status.send_replace(LifecycleStatus::Ready(map));
                None
            }
        };
        if let Some(orphan) = orphan {
            warn!(map = %map, "Map constructed after teardown, releasing");
            orphan.release(&*self.provider);
            return Err(MapError::TornDown);
        }

        info!(map = %map, "Map ready");
        Ok(map)
    }

    async fn wait_for_container(
        &self,
        container: &dyn ContainerSource,
    ) -> Result<ContainerId, MapError> {
        let torn_down = self.status.subscribe();
        let mut attempts = 0;

        loop {
            if let Some(found) = container.current() {
                return Ok(found);
            }
            if attempts >= self.wait.max_attempts {
                return Err(MapError::ContainerUnavailable {
                    attempts,
                    waited_ms: self.wait.poll_interval_ms * u64::from(attempts),
                });
            }

            tokio::select! {
                _ = tokio::time::sleep(self.wait.poll_interval()) => attempts += 1,
                _ = container.changed() => {}
                _ = until_torn_down(torn_down.clone()) => return Err(MapError::TornDown),
            }
        }
    }

    fn construct(
        &self,
        container: &ContainerId,
        center: LatLng,
        zoom: f64,
        options: &InitOptions,
    ) -> Result<RealizedMap, MapError> {
        let map = self.provider.create_map(
            container,
            &MapOptions {
                center,
                zoom,
                display: options.display.clone(),
            },
        )?;
        info!(map = %map, lat = center.lat, lng = center.lng, zoom, "Map created");

        let marker = match self.provider.place_marker(map, &options.marker_at(center)) {
            Ok(marker) => marker,
            Err(e) => {
                self.provider.destroy_map(map);
                return Err(e.into());
            }
        };
        debug!(map = %map, marker = %marker, "Center marker placed");

        let overlays = match &options.drawing {
            Some(drawing) => match DrawingOverlayManager::attach(
                self.provider.clone(),
                map,
                drawing,
                self.observer.clone(),
            ) {
                Ok(overlays) => Some(overlays),
                Err(e) => {
                    self.provider.destroy_map(map);
                    return Err(e.into());
                }
            },
            None => None,
        };

        Ok(RealizedMap {
            map,
            marker,
            overlays,
        })
    }
}

/// Returns an in-progress status to `Idle` when `initialize` is dropped
/// mid-flight. Completed attempts have already left the loading states, so
/// the guard is a no-op for them.
struct AbandonGuard<'a> {
    status: &'a watch::Sender<LifecycleStatus>,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        let abandoned = self.status.send_if_modified(|status| {
            if !status.is_loading() {
                return false;
            }
            *status = LifecycleStatus::Idle;
            true
        });
        if abandoned {
            warn!("Map initialization abandoned by caller, controller back to idle");
        }
    }
}

async fn until_torn_down(mut status: watch::Receiver<LifecycleStatus>) {
    let _ = status.wait_for(|s| *s == LifecycleStatus::TornDown).await;
}

impl Drop for MapLifecycleController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerSlot;
    use crate::loader::LoaderSettings;
    use crate::options::ShapeKind;
    use crate::sim::SimulatedProvider;
    use std::time::Duration;

    struct Harness {
        provider: Arc<SimulatedProvider>,
        loader: Arc<LoaderCoordinator>,
        controller: MapLifecycleController,
    }

    fn harness(provider: SimulatedProvider) -> Harness {
        let provider = Arc::new(provider);
        let loader = Arc::new(LoaderCoordinator::new(
            provider.clone(),
            LoaderSettings::default(),
        ));
        let controller = MapLifecycleController::new(provider.clone(), loader.clone());
        Harness {
            provider,
            loader,
            controller,
        }
    }

    fn key() -> Credential {
        Credential::new("test-key")
    }

    fn garden() -> ContainerId {
        ContainerId::new("garden-map")
    }

    async fn initialize(h: &Harness, slot: &ContainerSlot) -> Result<MapId, MapError> {
        h.controller
            .initialize(
                slot,
                &key(),
                LatLng::property_center(),
                18.0,
                &InitOptions::default(),
            )
            .await
    }

    #[tokio::test]
    async fn test_empty_credential_fails_without_polling() {
        let h = harness(SimulatedProvider::new());
        let slot = ContainerSlot::new();

        let err = h
            .controller
            .initialize(
                &slot,
                &Credential::new("  "),
                LatLng::property_center(),
                18.0,
                &InitOptions::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err, MapError::MissingCredential);
        assert_eq!(
            err.user_message(),
            "Google Maps API key not found. Please check your environment variables."
        );
        assert_eq!(h.provider.fetch_count(), 0);
        assert_eq!(
            h.controller.status(),
            LifecycleStatus::Failed(MapError::MissingCredential)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_container_never_mounted_gives_up_after_budget() {
        let h = harness(SimulatedProvider::new());
        let slot = ContainerSlot::new();

        let started = tokio::time::Instant::now();
        let err = initialize(&h, &slot).await.unwrap_err();

        assert_eq!(
            err,
            MapError::ContainerUnavailable {
                attempts: 50,
                waited_ms: 5000
            }
        );
        assert_eq!(err.user_message(), "Map element not available after 5 seconds");
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(h.provider.fetch_count(), 0);
        assert_eq!(h.provider.map_count(), 0);
        assert!(matches!(h.controller.status(), LifecycleStatus::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_mount_realizes_map_with_marker_and_drawing() {
        let h = harness(SimulatedProvider::new());
        let slot = ContainerSlot::new();

        let (result, ()) = tokio::join!(initialize(&h, &slot), async {
            tokio::time::sleep(Duration::from_millis(350)).await;
            slot.mount(garden());
        });
        let map = result.unwrap();

        assert_eq!(h.controller.status(), LifecycleStatus::Ready(map));
        assert_eq!(h.controller.map(), Some(map));
        assert_eq!(h.provider.map_container(map), Some(garden()));

        let options = h.provider.map_options(map).unwrap();
        assert_eq!(options.center, LatLng::property_center());
        assert_eq!(options.zoom, 18.0);

        let markers = h.provider.markers_on(map);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].title, "Property Center - 1 Acre Garden");
        assert_eq!(markers[0].position, LatLng::property_center());

        let surface = h.controller.with_overlays(|o| o.surface()).unwrap();
        assert!(h.provider.is_surface_attached(surface));
        assert_eq!(h.provider.surface_mode(surface), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_initialize_can_be_retried() {
        let h = harness(SimulatedProvider::new());
        let slot = ContainerSlot::new();

        let abandoned =
            tokio::time::timeout(Duration::from_millis(300), initialize(&h, &slot)).await;
        assert!(abandoned.is_err());
        assert_eq!(h.controller.status(), LifecycleStatus::Idle);

        slot.mount(garden());
        let map = initialize(&h, &slot).await.unwrap();
        assert_eq!(h.controller.status(), LifecycleStatus::Ready(map));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_during_sdk_load_keeps_single_fetch() {
        let h = harness(SimulatedProvider::new().with_fetch_delay(Duration::from_millis(200)));
        let slot = ContainerSlot::mounted(garden());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), initialize(&h, &slot)).await;
        assert!(abandoned.is_err());
        assert_eq!(h.controller.status(), LifecycleStatus::Idle);

        let map = initialize(&h, &slot).await.unwrap();
        assert_eq!(h.controller.status(), LifecycleStatus::Ready(map));
        assert_eq!(h.provider.fetch_count(), 1);
        assert_eq!(h.provider.map_count(), 1);
    }

    #[test]
    fn test_container_message_reflects_configured_wait() {
        let short = MapError::ContainerUnavailable {
            attempts: 3,
            waited_ms: 600,
        };
        assert_eq!(
            short.user_message(),
            "Map element not available after 0.6 seconds"
        );

        let one = MapError::ContainerUnavailable {
            attempts: 10,
            waited_ms: 1000,
        };
        assert_eq!(one.user_message(), "Map element not available after 1 second");
    }

    #[tokio::test]
    async fn test_view_only_map_has_no_drawing_surface() {
        let h = harness(SimulatedProvider::new());
        let slot = ContainerSlot::mounted(garden());

        let map = h
            .controller
            .initialize(
                &slot,
                &key(),
                LatLng::property_center(),
                18.0,
                &InitOptions::default().without_drawing(),
            )
            .await
            .unwrap();

        assert!(h.controller.with_overlays(|o| o.len()).is_none());
        assert!(h.provider.surfaces_on(map).is_empty());
        assert_eq!(h.provider.markers_on(map).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_container_lost_during_sdk_load() {
        let h = harness(SimulatedProvider::new().with_fetch_delay(Duration::from_millis(200)));
        let slot = ContainerSlot::mounted(garden());

        let (result, ()) = tokio::join!(initialize(&h, &slot), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            slot.unmount();
        });

        let err = result.unwrap_err();
        assert_eq!(err, MapError::ContainerLost);
        assert_eq!(err.user_message(), "Map element lost during API load");
        assert!(h.loader.is_loaded());
        assert_eq!(h.provider.map_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_container_counts_as_lost() {
        let h = harness(SimulatedProvider::new().with_fetch_delay(Duration::from_millis(200)));
        let slot = ContainerSlot::mounted(garden());

        let (result, ()) = tokio::join!(initialize(&h, &slot), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            slot.mount(ContainerId::new("other-map"));
        });

        assert_eq!(result.unwrap_err(), MapError::ContainerLost);
        assert_eq!(h.provider.map_count(), 0);
    }

    #[tokio::test]
    async fn test_sdk_failure_can_be_retried() {
        let h = harness(SimulatedProvider::new());
        let slot = ContainerSlot::mounted(garden());
        h.provider.fail_next_fetches(1);

        let err = initialize(&h, &slot).await.unwrap_err();
        assert!(matches!(
            err,
            MapError::SdkLoadFailure(LoadError::LoadFailure(_))
        ));
        assert!(err.is_retryable());
        assert_eq!(err.user_message(), "Failed to load Google Maps");
        assert_eq!(h.controller.status(), LifecycleStatus::Failed(err));

        let map = initialize(&h, &slot).await.unwrap();
        assert_eq!(h.controller.status(), LifecycleStatus::Ready(map));
        assert_eq!(h.provider.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_construction_failure_leaves_no_map() {
        let h = harness(SimulatedProvider::new());
        let slot = ContainerSlot::mounted(garden());
        h.provider.fail_map_construction(Some("container has zero size"));

        let err = initialize(&h, &slot).await.unwrap_err();
        assert_eq!(
            err,
            MapError::Construction(ProviderError::Construction(
                "container has zero size".to_string()
            ))
        );
        assert!(!err.is_retryable());
        assert_eq!(h.provider.map_count(), 0);
        assert!(h.controller.map().is_none());
    }

    #[tokio::test]
    async fn test_second_initialize_while_ready_is_rejected() {
        let h = harness(SimulatedProvider::new());
        let slot = ContainerSlot::mounted(garden());

        let map = initialize(&h, &slot).await.unwrap();
        let err = initialize(&h, &slot).await.unwrap_err();

        assert_eq!(err, MapError::AlreadyStarted("ready"));
        assert_eq!(h.controller.status(), LifecycleStatus::Ready(map));
        assert_eq!(h.provider.map_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_during_sdk_load_never_constructs() {
        let h = harness(SimulatedProvider::new().with_fetch_delay(Duration::from_millis(200)));
        let slot = ContainerSlot::mounted(garden());

        let (result, ()) = tokio::join!(initialize(&h, &slot), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            h.controller.teardown();
        });

        assert_eq!(result.unwrap_err(), MapError::TornDown);
        assert_eq!(h.controller.status(), LifecycleStatus::TornDown);

        // The shared fetch still completes for other consumers.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(h.loader.is_loaded());
        assert_eq!(h.provider.map_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_while_polling_skips_fetch() {
        let h = harness(SimulatedProvider::new());
        let slot = ContainerSlot::new();

        let (result, ()) = tokio::join!(initialize(&h, &slot), async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            h.controller.teardown();
        });

        assert_eq!(result.unwrap_err(), MapError::TornDown);
        assert_eq!(h.provider.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_teardown_after_ready_releases_everything_once() {
        let h = harness(SimulatedProvider::new());
        let slot = ContainerSlot::mounted(garden());

        let map = initialize(&h, &slot).await.unwrap();
        let surface = h.controller.with_overlays(|o| o.surface()).unwrap();
        h.provider.draw(surface, ShapeKind::Polygon).unwrap();

        h.controller.teardown();
        assert_eq!(h.controller.status(), LifecycleStatus::TornDown);
        assert!(h.controller.map().is_none());
        assert_eq!(h.provider.map_count(), 0);
        assert_eq!(h.provider.overlay_count(), 0);
        assert_eq!(h.provider.listener_count(), 0);
        assert_eq!(h.provider.surface_detach_count(), 1);

        h.controller.teardown();
        assert_eq!(h.provider.surface_detach_count(), 1);

        let err = initialize(&h, &slot).await.unwrap_err();
        assert_eq!(err, MapError::TornDown);
        assert!(h.provider.markers_on(map).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_subscribers_observe_loading_then_ready() {
        let h = harness(SimulatedProvider::new().with_fetch_delay(Duration::from_millis(100)));
        let slot = ContainerSlot::mounted(garden());
        let mut rx = h.controller.subscribe();

        let (result, saw_loading) = tokio::join!(initialize(&h, &slot), async {
            rx.wait_for(LifecycleStatus::is_loading).await.is_ok()
        });
        let map = result.unwrap();

        assert!(saw_loading);
        assert_eq!(*rx.borrow(), LifecycleStatus::Ready(map));
    }
}
