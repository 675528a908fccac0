use crate::application::ports::NetworkProbe;
use crate::domain::value_objects::NetworkStatus;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub type NetworkListener = Arc<dyn Fn(NetworkStatus) + Send + Sync>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<u64, NetworkListener>>,
}

impl ListenerRegistry {
    fn insert(&self, listener: NetworkListener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(id, listener);
        }
        id
    }

    fn remove(&self, id: u64) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&id);
        }
    }

    /// Ids grow monotonically, so map order is registration order.
    fn snapshot(&self) -> Vec<NetworkListener> {
        self.entries
            .lock()
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

/// Deregisters its listener on `unsubscribe` or when dropped.
pub struct NetworkSubscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl NetworkSubscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for NetworkSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

pub struct NetworkMonitor {
    probe: Arc<dyn NetworkProbe>,
    probe_timeout: Duration,
    status: RwLock<NetworkStatus>,
    listeners: Arc<ListenerRegistry>,
    delivery: Mutex<()>,
    cancel: CancellationToken,
}

impl NetworkMonitor {
    pub fn new(probe: Arc<dyn NetworkProbe>, probe_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            probe,
            probe_timeout,
            status: RwLock::new(NetworkStatus::Offline),
            listeners: Arc::new(ListenerRegistry::default()),
            delivery: Mutex::new(()),
            cancel: CancellationToken::new(),
        })
    }

    pub fn current_status(&self) -> NetworkStatus {
        self.status
            .read()
            .map(|status| *status)
            .unwrap_or(NetworkStatus::Offline)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn subscribe_to_network_changes<F>(&self, listener: F) -> NetworkSubscription
    where
        F: Fn(NetworkStatus) + Send + Sync + 'static,
    {
        let id = self.listeners.insert(Arc::new(listener));
        NetworkSubscription {
            id,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    /// Probes connectivity once. A probe that errors or outlives the
    /// timeout counts as offline.
    pub async fn check_network_status(&self) -> NetworkStatus {
        let status = match tokio::time::timeout(self.probe_timeout, self.probe.probe()).await {
            Ok(Ok(reachable)) => NetworkStatus::from(reachable),
            Ok(Err(err)) => {
                tracing::debug!(target: "network::monitor", error = %err, "connectivity probe failed");
                NetworkStatus::Offline
            }
            Err(_) => {
                tracing::debug!(
                    target: "network::monitor",
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "connectivity probe timed out"
                );
                NetworkStatus::Offline
            }
        };
        self.report_status(status);
        status
    }

    /// Records a status and notifies listeners when it differs from the
    /// previous one. Listeners must not call back into `report_status`.
    pub fn report_status(&self, status: NetworkStatus) {
        let _delivery = match self.delivery.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let previous = match self.status.write() {
            Ok(mut current) => std::mem::replace(&mut *current, status),
            Err(_) => return,
        };
        if previous == status {
            return;
        }

        tracing::info!(
            target: "network::monitor",
            from = %previous,
            to = %status,
            "connectivity changed"
        );
        for listener in self.listeners.snapshot() {
            listener(status);
        }
    }

    pub fn spawn_polling(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = monitor.cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        monitor.check_network_status().await;
                    }
                }
            }
            tracing::debug!(target: "network::monitor", "connectivity polling stopped");
        })
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
