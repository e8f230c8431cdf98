//! Capability interface over the external mapping SDK
//!
//! The coordinator, lifecycle controller and overlay manager depend only on
//! [`MapsProvider`]. A browser binding implements it against the real SDK;
//! [`crate::sim::SimulatedProvider`] implements it in memory.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::loader::LoadRequest;
use crate::options::{DrawingOptions, MapOptions, MarkerOptions, ShapeKind};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

opaque_id!(
    /// One realized map surface
    MapId,
    "map"
);
opaque_id!(MarkerId, "marker");
opaque_id!(
    /// Drawing surface attached to a map
    SurfaceId,
    "surface"
);
opaque_id!(
    /// A user-drawn overlay living on a map surface
    OverlayId,
    "overlay"
);
opaque_id!(ListenerId, "listener");

/// Host container the map renders into (a DOM element id in the browser)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Object an event subscription is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Surface(SurfaceId),
    Overlay(OverlayId),
}

/// Event names the coordinator subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// A shape was finished on a drawing surface
    OverlayComplete,
    /// The active drawing tool changed
    DrawingModeChanged,
    /// Secondary click on an overlay, used as the delete gesture
    RightClick,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::OverlayComplete => "overlaycomplete",
            EventName::DrawingModeChanged => "drawingmode_changed",
            EventName::RightClick => "rightclick",
        }
    }
}

/// Payload delivered to an [`EventListener`]
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    OverlayComplete { kind: ShapeKind, overlay: OverlayId },
    DrawingModeChanged { mode: Option<ShapeKind> },
    RightClick { overlay: OverlayId },
}

impl MapEvent {
    pub fn name(&self) -> EventName {
        match self {
            MapEvent::OverlayComplete { .. } => EventName::OverlayComplete,
            MapEvent::DrawingModeChanged { .. } => EventName::DrawingModeChanged,
            MapEvent::RightClick { .. } => EventName::RightClick,
        }
    }
}

/// Event listener callback type
pub type EventListener = Arc<dyn Fn(&MapEvent) + Send + Sync>;

/// Errors raised by a provider implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("SDK fetch failed: {0}")]
    Fetch(String),
    #[error("SDK is not loaded")]
    NotLoaded,
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("unknown map: {0}")]
    UnknownMap(MapId),
    #[error("unknown drawing surface: {0}")]
    UnknownSurface(SurfaceId),
    #[error("unknown overlay: {0}")]
    UnknownOverlay(OverlayId),
    #[error("construction failed: {0}")]
    Construction(String),
}

/// The external mapping SDK as a set of capabilities
///
/// Listener callbacks are invoked synchronously from the provider's event
/// dispatch and may call back into the provider, so implementations must not
/// hold internal locks while dispatching.
#[async_trait]
pub trait MapsProvider: Send + Sync {
    /// Fetch and initialize the SDK script. This is the network round trip
    /// the loader coordinator deduplicates.
    async fn fetch(&self, request: &LoadRequest) -> Result<(), ProviderError>;

    /// Construct a map bound to `container`.
    fn create_map(
        &self,
        container: &ContainerId,
        options: &MapOptions,
    ) -> Result<MapId, ProviderError>;

    /// Remove a map and everything placed on it from the host.
    fn destroy_map(&self, map: MapId);

    fn place_marker(&self, map: MapId, marker: &MarkerOptions) -> Result<MarkerId, ProviderError>;

    /// Attach a drawing surface with the given shape kinds enabled.
    fn attach_drawing_surface(
        &self,
        map: MapId,
        options: &DrawingOptions,
    ) -> Result<SurfaceId, ProviderError>;

    /// Detach a drawing surface; overlays it produced stay on the map.
    fn detach_drawing_surface(&self, surface: SurfaceId);

    /// Take an overlay off the visual surface.
    fn remove_overlay(&self, overlay: OverlayId);

    fn subscribe(
        &self,
        target: EventTarget,
        event: EventName,
        listener: EventListener,
    ) -> Result<ListenerId, ProviderError>;

    fn unsubscribe(&self, listener: ListenerId);
}
