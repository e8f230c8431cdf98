//! In-memory maps provider
//!
//! Implements [`MapsProvider`] without a host document. It records every call
//! the coordinator makes (fetches, constructions, subscriptions) and exposes
//! gesture drivers (`draw`, `right_click`, `select_mode`) that dispatch events
//! to registered listeners the way the SDK does.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::loader::LoadRequest;
use crate::lock;
use crate::options::{DrawingOptions, MapOptions, MarkerOptions, ShapeKind, ShapeStyle};
use crate::provider::{
    ContainerId, EventListener, EventName, EventTarget, ListenerId, MapEvent, MapId, MapsProvider,
    MarkerId, OverlayId, ProviderError, SurfaceId,
};

struct SimMap {
    container: ContainerId,
    options: MapOptions,
}

struct SimSurface {
    map: MapId,
    options: DrawingOptions,
    mode: Option<ShapeKind>,
    attached: bool,
}

struct SimOverlay {
    map: MapId,
    kind: ShapeKind,
    style: ShapeStyle,
}

struct SimListener {
    target: EventTarget,
    event: EventName,
    callback: EventListener,
}

#[derive(Default)]
struct SimState {
    next_id: u64,
    loaded: bool,
    failing_fetches: usize,
    construction_failure: Option<String>,
    reject_subscriptions: bool,
    maps: BTreeMap<MapId, SimMap>,
    markers: BTreeMap<MarkerId, (MapId, MarkerOptions)>,
    surfaces: BTreeMap<SurfaceId, SimSurface>,
    overlays: BTreeMap<OverlayId, SimOverlay>,
    listeners: BTreeMap<ListenerId, SimListener>,
    unsubscribe_calls: usize,
    surface_detach_calls: usize,
}

impl SimState {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn listeners_for(&self, target: EventTarget, event: EventName) -> Vec<EventListener> {
        self.listeners
            .values()
            .filter(|l| l.target == target && l.event == event)
            .map(|l| l.callback.clone())
            .collect()
    }

    fn drop_listeners_on(&mut self, target: EventTarget) {
        self.listeners.retain(|_, l| l.target != target);
    }
}

/// Maps provider backed by process memory
#[derive(Default)]
pub struct SimulatedProvider {
    state: Mutex<SimState>,
    fetch_calls: AtomicUsize,
    fetch_delay: Duration,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every fetch take `delay` before settling.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Reject the next `count` fetches with a network error.
    pub fn fail_next_fetches(&self, count: usize) {
        lock(&self.state).failing_fetches = count;
    }

    /// Make map construction fail with `reason` (`None` restores success).
    pub fn fail_map_construction(&self, reason: Option<&str>) {
        lock(&self.state).construction_failure = reason.map(str::to_string);
    }

    /// Make every subsequent `subscribe` call fail.
    pub fn reject_subscriptions(&self, reject: bool) {
        lock(&self.state).reject_subscriptions = reject;
    }

    // ── Gesture drivers ──

    /// Finish drawing a shape of `kind` on `surface`.
    ///
    /// Returns `None` when the surface is detached or the kind is not enabled.
    pub fn draw(&self, surface: SurfaceId, kind: ShapeKind) -> Option<OverlayId> {
        let (overlay, listeners) = {
            let mut state = lock(&self.state);
            let (map, style) = match state.surfaces.get(&surface) {
                Some(s) if s.attached && s.options.modes.contains(&kind) => {
                    (s.map, s.options.style_for(kind).clone())
                }
                _ => return None,
            };
            let overlay = OverlayId(state.next());
            state.overlays.insert(overlay, SimOverlay { map, kind, style });
            let listeners =
                state.listeners_for(EventTarget::Surface(surface), EventName::OverlayComplete);
            (overlay, listeners)
        };

        debug!(surface = %surface, overlay = %overlay, kind = %kind, "Simulated overlay complete");
        dispatch(&listeners, &MapEvent::OverlayComplete { kind, overlay });
        Some(overlay)
    }

    /// Secondary-click an overlay. Returns the number of listeners notified.
    pub fn right_click(&self, overlay: OverlayId) -> usize {
        let listeners = lock(&self.state)
            .listeners_for(EventTarget::Overlay(overlay), EventName::RightClick);
        dispatch(&listeners, &MapEvent::RightClick { overlay });
        listeners.len()
    }

    /// Switch the active drawing tool on `surface`.
    pub fn select_mode(&self, surface: SurfaceId, mode: Option<ShapeKind>) {
        let listeners = {
            let mut state = lock(&self.state);
            match state.surfaces.get_mut(&surface) {
                Some(s) if s.attached => s.mode = mode,
                _ => return,
            }
            state.listeners_for(EventTarget::Surface(surface), EventName::DrawingModeChanged)
        };
        dispatch(&listeners, &MapEvent::DrawingModeChanged { mode });
    }

    /// Deliver an arbitrary event to the listeners on `target`.
    pub fn emit(&self, target: EventTarget, event: MapEvent) {
        let listeners = lock(&self.state).listeners_for(target, event.name());
        dispatch(&listeners, &event);
    }

    // ── Inspection ──

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self) -> bool {
        lock(&self.state).loaded
    }

    pub fn map_count(&self) -> usize {
        lock(&self.state).maps.len()
    }

    pub fn map_options(&self, map: MapId) -> Option<MapOptions> {
        lock(&self.state).maps.get(&map).map(|m| m.options.clone())
    }

    pub fn map_container(&self, map: MapId) -> Option<ContainerId> {
        lock(&self.state).maps.get(&map).map(|m| m.container.clone())
    }

    pub fn markers_on(&self, map: MapId) -> Vec<MarkerOptions> {
        lock(&self.state)
            .markers
            .values()
            .filter(|(owner, _)| *owner == map)
            .map(|(_, marker)| marker.clone())
            .collect()
    }

    /// Overlays visible on any map.
    pub fn overlay_count(&self) -> usize {
        lock(&self.state).overlays.len()
    }

    pub fn overlays_on(&self, map: MapId) -> Vec<OverlayId> {
        lock(&self.state)
            .overlays
            .iter()
            .filter(|(_, o)| o.map == map)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn overlay_kind(&self, overlay: OverlayId) -> Option<ShapeKind> {
        lock(&self.state).overlays.get(&overlay).map(|o| o.kind)
    }

    pub fn overlay_style(&self, overlay: OverlayId) -> Option<ShapeStyle> {
        lock(&self.state)
            .overlays
            .get(&overlay)
            .map(|o| o.style.clone())
    }

    pub fn surfaces_on(&self, map: MapId) -> Vec<SurfaceId> {
        lock(&self.state)
            .surfaces
            .iter()
            .filter(|(_, s)| s.map == map)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn is_surface_attached(&self, surface: SurfaceId) -> bool {
        lock(&self.state)
            .surfaces
            .get(&surface)
            .is_some_and(|s| s.attached)
    }

    pub fn surface_mode(&self, surface: SurfaceId) -> Option<ShapeKind> {
        lock(&self.state)
            .surfaces
            .get(&surface)
            .and_then(|s| s.mode)
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.state).listeners.len()
    }

    pub fn unsubscribe_count(&self) -> usize {
        lock(&self.state).unsubscribe_calls
    }

    pub fn surface_detach_count(&self) -> usize {
        lock(&self.state).surface_detach_calls
    }
}

fn dispatch(listeners: &[EventListener], event: &MapEvent) {
    for listener in listeners {
        listener(event);
    }
}

#[async_trait]
impl MapsProvider for SimulatedProvider {
    async fn fetch(&self, request: &LoadRequest) -> Result<(), ProviderError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        debug!(url = %request.script_url(), "Simulated SDK fetch");

        let fail = {
            let mut state = lock(&self.state);
            if state.failing_fetches > 0 {
                state.failing_fetches -= 1;
                true
            } else {
                false
            }
        };

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }

        if fail {
            return Err(ProviderError::Fetch("network error".to_string()));
        }
        lock(&self.state).loaded = true;
        Ok(())
    }

    fn create_map(
        &self,
        container: &ContainerId,
        options: &MapOptions,
    ) -> Result<MapId, ProviderError> {
        let mut state = lock(&self.state);
        if !state.loaded {
            return Err(ProviderError::NotLoaded);
        }
        if let Some(reason) = &state.construction_failure {
            return Err(ProviderError::Construction(reason.clone()));
        }
        let map = MapId(state.next());
        state.maps.insert(
            map,
            SimMap {
                container: container.clone(),
                options: options.clone(),
            },
        );
        Ok(map)
    }

    fn destroy_map(&self, map: MapId) {
        let mut state = lock(&self.state);
        if state.maps.remove(&map).is_none() {
            return;
        }
        state.markers.retain(|_, (owner, _)| *owner != map);

        let surfaces: Vec<SurfaceId> = state
            .surfaces
            .iter()
            .filter(|(_, s)| s.map == map)
            .map(|(id, _)| *id)
            .collect();
        for surface in surfaces {
            state.surfaces.remove(&surface);
            state.drop_listeners_on(EventTarget::Surface(surface));
        }

        let overlays: Vec<OverlayId> = state
            .overlays
            .iter()
            .filter(|(_, o)| o.map == map)
            .map(|(id, _)| *id)
            .collect();
        for overlay in overlays {
            state.overlays.remove(&overlay);
            state.drop_listeners_on(EventTarget::Overlay(overlay));
        }
    }

    fn place_marker(&self, map: MapId, marker: &MarkerOptions) -> Result<MarkerId, ProviderError> {
        let mut state = lock(&self.state);
        if !state.maps.contains_key(&map) {
            return Err(ProviderError::UnknownMap(map));
        }
        let id = MarkerId(state.next());
        state.markers.insert(id, (map, marker.clone()));
        Ok(id)
    }

    fn attach_drawing_surface(
        &self,
        map: MapId,
        options: &DrawingOptions,
    ) -> Result<SurfaceId, ProviderError> {
        let mut state = lock(&self.state);
        if !state.maps.contains_key(&map) {
            return Err(ProviderError::UnknownMap(map));
        }
        let surface = SurfaceId(state.next());
        state.surfaces.insert(
            surface,
            SimSurface {
                map,
                options: options.clone(),
                mode: options.initial_mode,
                attached: true,
            },
        );
        Ok(surface)
    }

    fn detach_drawing_surface(&self, surface: SurfaceId) {
        let mut state = lock(&self.state);
        state.surface_detach_calls += 1;
        if let Some(s) = state.surfaces.get_mut(&surface) {
            s.attached = false;
        }
    }

    fn remove_overlay(&self, overlay: OverlayId) {
        lock(&self.state).overlays.remove(&overlay);
    }

    fn subscribe(
        &self,
        target: EventTarget,
        event: EventName,
        listener: EventListener,
    ) -> Result<ListenerId, ProviderError> {
        let mut state = lock(&self.state);
        if state.reject_subscriptions {
            return Err(ProviderError::Construction(format!(
                "cannot subscribe to {}",
                event.as_str()
            )));
        }
        match target {
            EventTarget::Surface(surface) if !state.surfaces.contains_key(&surface) => {
                return Err(ProviderError::UnknownSurface(surface));
            }
            EventTarget::Overlay(overlay) if !state.overlays.contains_key(&overlay) => {
                return Err(ProviderError::UnknownOverlay(overlay));
            }
            _ => {}
        }
        let id = ListenerId(state.next());
        state.listeners.insert(
            id,
            SimListener {
                target,
                event,
                callback: listener,
            },
        );
        Ok(id)
    }

    fn unsubscribe(&self, listener: ListenerId) {
        let mut state = lock(&self.state);
        state.unsubscribe_calls += 1;
        state.listeners.remove(&listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::loader::LoaderSettings;
    use crate::options::{DisplayOptions, LatLng};
    use std::sync::Arc;

    async fn loaded_provider() -> SimulatedProvider {
        let provider = SimulatedProvider::new();
        let request = LoadRequest::new(Credential::new("key"), &LoaderSettings::default());
        provider.fetch(&request).await.unwrap();
        provider
    }

    fn map_options() -> MapOptions {
        MapOptions {
            center: LatLng::property_center(),
            zoom: 18.0,
            display: DisplayOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_map_requires_loaded_sdk() {
        let provider = SimulatedProvider::new();
        let err = provider
            .create_map(&ContainerId::new("garden-map"), &map_options())
            .unwrap_err();
        assert_eq!(err, ProviderError::NotLoaded);
    }

    #[tokio::test]
    async fn test_draw_dispatches_to_surface_listeners() {
        let provider = loaded_provider().await;
        let map = provider
            .create_map(&ContainerId::new("garden-map"), &map_options())
            .unwrap();
        let surface = provider
            .attach_drawing_surface(map, &DrawingOptions::default())
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        provider
            .subscribe(
                EventTarget::Surface(surface),
                EventName::OverlayComplete,
                Arc::new(move |event: &MapEvent| sink.lock().unwrap().push(event.clone())),
            )
            .unwrap();

        let overlay = provider.draw(surface, ShapeKind::Circle).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![MapEvent::OverlayComplete {
                kind: ShapeKind::Circle,
                overlay
            }]
        );
        assert_eq!(provider.overlay_style(overlay).unwrap().fill_color, "#ff9800");
    }

    #[tokio::test]
    async fn test_detached_surface_cannot_draw() {
        let provider = loaded_provider().await;
        let map = provider
            .create_map(&ContainerId::new("garden-map"), &map_options())
            .unwrap();
        let surface = provider
            .attach_drawing_surface(map, &DrawingOptions::default())
            .unwrap();

        provider.detach_drawing_surface(surface);
        assert!(provider.draw(surface, ShapeKind::Polygon).is_none());
        assert_eq!(provider.overlay_count(), 0);
    }

    #[tokio::test]
    async fn test_destroy_map_removes_everything_on_it() {
        let provider = loaded_provider().await;
        let map = provider
            .create_map(&ContainerId::new("garden-map"), &map_options())
            .unwrap();
        let surface = provider
            .attach_drawing_surface(map, &DrawingOptions::default())
            .unwrap();
        provider.draw(surface, ShapeKind::Rectangle).unwrap();

        provider.destroy_map(map);
        assert_eq!(provider.map_count(), 0);
        assert_eq!(provider.overlay_count(), 0);
        assert!(provider.surfaces_on(map).is_empty());
    }
}
