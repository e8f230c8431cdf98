//! Host container availability
//!
//! The map's container may appear after the controller starts (the host
//! mounts it later) and may disappear while the SDK loads. A
//! [`ContainerSource`] reports the current container and, where the host can
//! push notifications, wakes waiters when it changes. Sources that cannot
//! push are simply polled.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::provider::ContainerId;

#[async_trait]
pub trait ContainerSource: Send + Sync {
    /// The container if it is currently mounted.
    fn current(&self) -> Option<ContainerId>;

    /// Resolves when the container may have changed.
    ///
    /// The default never resolves, leaving the caller to poll.
    async fn changed(&self) {
        std::future::pending::<()>().await
    }
}

/// Push-capable container source owned by whatever mounts the container
pub struct ContainerSlot {
    tx: watch::Sender<Option<ContainerId>>,
}

impl Default for ContainerSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerSlot {
    /// An empty slot; nothing is mounted yet.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// A slot whose container is already mounted.
    pub fn mounted(id: ContainerId) -> Self {
        let slot = Self::new();
        slot.mount(id);
        slot
    }

    pub fn mount(&self, id: ContainerId) {
        debug!(container = %id, "Container mounted");
        self.tx.send_replace(Some(id));
    }

    pub fn unmount(&self) {
        if let Some(id) = self.tx.send_replace(None) {
            debug!(container = %id, "Container unmounted");
        }
    }
}

#[async_trait]
impl ContainerSource for ContainerSlot {
    fn current(&self) -> Option<ContainerId> {
        self.tx.borrow().clone()
    }

    async fn changed(&self) {
        let mut rx = self.tx.subscribe();
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await
        }
    }
}
