//! Garden Map Core - provider loading and overlay lifecycle coordination
//!
//! Realizes an interactive satellite map on which garden regions are drawn as
//! polygons, rectangles and circles. The external mapping SDK is reached only
//! through the [`MapsProvider`] capability trait, so the same coordination code
//! runs against a browser binding or the in-memory [`SimulatedProvider`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Composition root: one LoaderCoordinator shared via Arc         │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  MapLifecycleController                         │
//! │   Idle → Polling → LoadingSdk → Constructing → Ready            │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  DrawingOverlayManager                          │
//! │      ShapeRecords  ⇄  live overlays  →  ShapeObserver           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use garden_map_core::{Credential, GardenMapConfig, LoaderCoordinator, MapLifecycleController};
//!
//! let config = GardenMapConfig::from_file("config/garden_map.yaml")?;
//! let loader = Arc::new(LoaderCoordinator::new(provider.clone(), config.loader.clone()));
//!
//! let controller = MapLifecycleController::new(provider, loader)
//!     .with_container_wait(config.container.clone())
//!     .with_observer(observer);
//! let map = controller
//!     .initialize(&slot, &credential, config.map.center, config.map.zoom, &config.init_options())
//!     .await?;
//! ```

pub mod config;
pub mod container;
pub mod lifecycle;
pub mod loader;
pub mod options;
pub mod overlay;
pub mod provider;
pub mod sim;

use std::sync::{Mutex, MutexGuard, PoisonError};

// Re-export main types
pub use config::{ConfigError, ContainerWait, Credential, GardenMapConfig, MapSection};
pub use container::{ContainerSlot, ContainerSource};
pub use lifecycle::{LifecycleStatus, MapError, MapLifecycleController};
pub use loader::{LoadError, LoadRequest, LoadStatus, LoaderCoordinator, LoaderSettings, SdkLibrary};
pub use options::{
    DisplayOptions, DrawingOptions, InitOptions, LatLng, MapOptions, MarkerOptions, ShapeKind,
    ShapeStyle,
};
pub use overlay::{DrawingOverlayManager, ShapeId, ShapeObserver, ShapeRecord};
pub use provider::{
    ContainerId, EventListener, EventName, EventTarget, ListenerId, MapEvent, MapId, MapsProvider,
    MarkerId, OverlayId, ProviderError, SurfaceId,
};
pub use sim::SimulatedProvider;

/// Locks a std mutex, recovering the guard if a previous holder panicked.
///
/// Critical sections in this crate leave their data consistent before
/// calling out; a poisoned guard is still valid to use.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
