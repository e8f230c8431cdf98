//! DrawingOverlayManager - user-drawn shapes on one realized map
//!
//! Attaches a drawing surface, keeps one [`ShapeRecord`] per live overlay and
//! relays creation and deletion to a [`ShapeObserver`].
//!
//! ## Bookkeeping invariant
//!
//! Every overlay the manager has seen on the visual surface has exactly one
//! record and every record names a live overlay. Removal of an overlay and of
//! its record happen under the same lock, so no other code observes one
//! without the other.
//!
//! Provider listeners hold only a weak reference to the manager's state; the
//! provider never keeps a detached or dropped manager alive.

use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::lock;
use crate::options::{DrawingOptions, ShapeKind};
use crate::provider::{
    EventName, EventTarget, ListenerId, MapEvent, MapId, MapsProvider, OverlayId, ProviderError,
    SurfaceId,
};

/// Stable identity of a tracked shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId(pub Uuid);

/// One user-drawn shape tracked by the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeRecord {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub overlay: OverlayId,
}

/// Consumer of shape lifecycle notifications
///
/// Both callbacks run synchronously, once per event, after the bookkeeping
/// for that event is complete.
pub trait ShapeObserver: Send + Sync {
    fn on_shape_created(&self, kind: ShapeKind, overlay: OverlayId);
    fn on_shape_deleted(&self, overlay: OverlayId);
}

struct TrackedShape {
    record: ShapeRecord,
    delete_listener: Option<ListenerId>,
}

struct ShapeBook {
    shapes: Vec<TrackedShape>,
    mode: Option<ShapeKind>,
    surface_listeners: Vec<ListenerId>,
    detached: bool,
}

struct OverlayTracker {
    provider: Arc<dyn MapsProvider>,
    map: MapId,
    surface: SurfaceId,
    observer: Option<Arc<dyn ShapeObserver>>,
    book: Mutex<ShapeBook>,
}

/// Drawing surface and shape registry for one map
pub struct DrawingOverlayManager {
    tracker: Arc<OverlayTracker>,
}

impl DrawingOverlayManager {
    /// Attach a drawing surface to `map` and start listening for shapes.
    pub fn attach(
        provider: Arc<dyn MapsProvider>,
        map: MapId,
        options: &DrawingOptions,
        observer: Option<Arc<dyn ShapeObserver>>,
    ) -> Result<Self, ProviderError> {
        let surface = provider.attach_drawing_surface(map, options)?;

        let tracker = Arc::new(OverlayTracker {
            provider,
            map,
            surface,
            observer,
            book: Mutex::new(ShapeBook {
                shapes: Vec::new(),
                mode: options.initial_mode,
                surface_listeners: Vec::new(),
                detached: false,
            }),
        });

        let mut listeners = Vec::with_capacity(2);
        for event in [EventName::OverlayComplete, EventName::DrawingModeChanged] {
            match tracker.subscribe(EventTarget::Surface(surface), event) {
                Ok(id) => listeners.push(id),
                Err(e) => {
                    for id in listeners {
                        tracker.provider.unsubscribe(id);
                    }
                    tracker.provider.detach_drawing_surface(surface);
                    return Err(e);
                }
            }
        }
        lock(&tracker.book).surface_listeners = listeners;

        info!(
            map = %map,
            surface = %surface,
            modes = ?options.modes,
            "Drawing surface attached"
        );

        Ok(Self { tracker })
    }

    pub fn map(&self) -> MapId {
        self.tracker.map
    }

    pub fn surface(&self) -> SurfaceId {
        self.tracker.surface
    }

    /// Snapshot of tracked shapes in creation order.
    pub fn shapes(&self) -> Vec<ShapeRecord> {
        lock(&self.tracker.book)
            .shapes
            .iter()
            .map(|shape| shape.record.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.tracker.book).shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Currently selected drawing tool; `None` is hand mode.
    pub fn drawing_mode(&self) -> Option<ShapeKind> {
        lock(&self.tracker.book).mode
    }

    pub fn is_detached(&self) -> bool {
        lock(&self.tracker.book).detached
    }

    /// Remove every shape from the map and from the registry.
    ///
    /// Consumer-initiated, so no deletion callbacks fire. Returns the removed
    /// records in creation order.
    pub fn clear(&self) -> Vec<ShapeRecord> {
        let removed: Vec<ShapeRecord> = {
            let mut book = lock(&self.tracker.book);
            book.shapes
                .drain(..)
                .map(|shape| {
                    self.tracker.release_shape(&shape);
                    shape.record
                })
                .collect()
        };

        if !removed.is_empty() {
            info!(surface = %self.tracker.surface, count = removed.len(), "Shapes cleared");
        }
        removed
    }

    /// Detach the drawing surface and stop listening for events.
    ///
    /// Shapes already drawn stay on the map and in the registry. Calling this
    /// again is a no-op.
    pub fn detach(&self) {
        let listeners = {
            let mut book = lock(&self.tracker.book);
            if book.detached {
                return;
            }
            book.detached = true;
            let mut listeners = std::mem::take(&mut book.surface_listeners);
            listeners.extend(
                book.shapes
                    .iter_mut()
                    .filter_map(|shape| shape.delete_listener.take()),
            );
            listeners
        };

        for listener in listeners {
            self.tracker.provider.unsubscribe(listener);
        }
        self.tracker
            .provider
            .detach_drawing_surface(self.tracker.surface);

        info!(surface = %self.tracker.surface, "Drawing surface detached");
    }
}

impl OverlayTracker {
    fn subscribe(
        self: &Arc<Self>,
        target: EventTarget,
        event: EventName,
    ) -> Result<ListenerId, ProviderError> {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.provider.subscribe(
            target,
            event,
            Arc::new(move |payload: &MapEvent| {
                if let Some(tracker) = weak.upgrade() {
                    tracker.handle(payload);
                }
            }),
        )
    }

    fn handle(self: &Arc<Self>, event: &MapEvent) {
        match event {
            MapEvent::OverlayComplete { kind, overlay } => {
                self.on_overlay_complete(*kind, *overlay)
            }
            MapEvent::DrawingModeChanged { mode } => {
                let mut book = lock(&self.book);
                if book.detached {
                    return;
                }
                book.mode = *mode;
                debug!(surface = %self.surface, mode = ?mode, "Drawing mode changed");
            }
            MapEvent::RightClick { overlay } => self.on_delete_gesture(*overlay),
        }
    }

    fn on_overlay_complete(self: &Arc<Self>, kind: ShapeKind, overlay: OverlayId) {
        let record = {
            let mut book = lock(&self.book);
            if book.detached {
                warn!(overlay = %overlay, "Overlay completed after detach, ignoring");
                return;
            }
            if book.shapes.iter().any(|s| s.record.overlay == overlay) {
                warn!(overlay = %overlay, "Duplicate overlay completion, ignoring");
                return;
            }

            let target = EventTarget::Overlay(overlay);
            let delete_listener = match self.subscribe(target, EventName::RightClick) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(overlay = %overlay, error = %e, "Delete gesture unavailable for shape");
                    None
                }
            };

            let record = ShapeRecord {
                id: ShapeId(Uuid::now_v7()),
                kind,
                overlay,
            };
            book.shapes.push(TrackedShape {
                record: record.clone(),
                delete_listener,
            });
            record
        };

        info!(kind = %record.kind, overlay = %record.overlay, "Shape created");
        if let Some(observer) = &self.observer {
            observer.on_shape_created(record.kind, record.overlay);
        }
    }

    fn on_delete_gesture(&self, overlay: OverlayId) {
        {
            let mut book = lock(&self.book);
            if book.detached {
                return;
            }
            let Some(position) = book.shapes.iter().position(|s| s.record.overlay == overlay) else {
                debug!(overlay = %overlay, "Delete gesture for untracked overlay");
                return;
            };
            let shape = book.shapes.remove(position);
            self.release_shape(&shape);
        }

        info!(overlay = %overlay, "Shape deleted");
        if let Some(observer) = &self.observer {
            observer.on_shape_deleted(overlay);
        }
    }

    /// Take one shape off the map. Caller holds the book lock.
    fn release_shape(&self, shape: &TrackedShape) {
        if let Some(listener) = shape.delete_listener {
            self.provider.unsubscribe(listener);
        }
        self.provider.remove_overlay(shape.record.overlay);
    }
}
