use crate::application::ports::{ImageStore, OfflineStore, RemoteApi};
use crate::domain::entities::{PendingUpload, ResultUpload, SyncReport, UploadFailure};
use crate::domain::value_objects::{NetworkStatus, QueueEntryId};
use crate::infrastructure::network::{NetworkMonitor, NetworkSubscription};
use crate::infrastructure::offline::{SyncMetrics, SyncMetricsSnapshot, SyncOutcomeStatus};
use crate::infrastructure::storage::ImageGate;
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunState {
    Idle,
    Running,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another pass was running; it will run once more after finishing.
    Skipped,
    Offline,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub upload_timeout: Duration,
    pub purge_synced_after_sync: bool,
    pub retain_synced_images: bool,
}

impl SyncSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            upload_timeout: config.upload_timeout(),
            purge_synced_after_sync: config.purge_synced_after_sync,
            retain_synced_images: config.retain_synced_images,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            upload_timeout: Duration::from_secs(30),
            purge_synced_after_sync: false,
            retain_synced_images: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatusSnapshot {
    pub state: SyncRunState,
    pub pending_uploads: u32,
    pub last_sync: Option<DateTime<Utc>>,
    pub network: NetworkStatus,
    pub last_report: Option<SyncReport>,
    pub metrics: SyncMetricsSnapshot,
}

/// Resets the run state to `Idle` however the pass ends.
struct RunGuard {
    state: Arc<watch::Sender<SyncRunState>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.send_replace(SyncRunState::Idle);
    }
}

enum EntryOutcome {
    Synced,
    Failed(String),
    Cancelled,
    Gone,
}

#[derive(Clone)]
pub struct SyncService {
    store: Arc<dyn OfflineStore>,
    images: Arc<dyn ImageStore>,
    remote: Arc<dyn RemoteApi>,
    monitor: Arc<NetworkMonitor>,
    image_gate: ImageGate,
    settings: SyncSettings,
    state: Arc<watch::Sender<SyncRunState>>,
    rerun_requested: Arc<AtomicBool>,
    shutdown_token: CancellationToken,
    pass_token: Arc<Mutex<CancellationToken>>,
    subscription: Arc<Mutex<Option<NetworkSubscription>>>,
    last_report: Arc<RwLock<Option<SyncReport>>>,
    metrics: Arc<SyncMetrics>,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn OfflineStore>,
        images: Arc<dyn ImageStore>,
        remote: Arc<dyn RemoteApi>,
        monitor: Arc<NetworkMonitor>,
        image_gate: ImageGate,
        settings: SyncSettings,
    ) -> Self {
        let shutdown_token = CancellationToken::new();
        let pass_token = shutdown_token.child_token();
        let (state, _) = watch::channel(SyncRunState::Idle);
        Self {
            store,
            images,
            remote,
            monitor,
            image_gate,
            settings,
            state: Arc::new(state),
            rerun_requested: Arc::new(AtomicBool::new(false)),
            shutdown_token,
            pass_token: Arc::new(Mutex::new(pass_token)),
            subscription: Arc::new(Mutex::new(None)),
            last_report: Arc::new(RwLock::new(None)),
            metrics: Arc::new(SyncMetrics::new()),
        }
    }

    pub fn state(&self) -> SyncRunState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SyncRunState::Running
    }

    fn try_begin(&self) -> Option<RunGuard> {
        let acquired = self.state.send_if_modified(|state| {
            if *state == SyncRunState::Idle {
                *state = SyncRunState::Running;
                true
            } else {
                false
            }
        });
        acquired.then(|| RunGuard {
            state: Arc::clone(&self.state),
        })
    }

    /// Leaves a rerun request for the pass in flight. Returns false when that
    /// pass finished before it could see the request; the caller runs instead.
    fn request_rerun(&self) -> bool {
        self.rerun_requested.store(true, Ordering::SeqCst);
        self.is_running()
    }

    fn current_pass_token(&self) -> CancellationToken {
        match self.pass_token.lock() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drains the upload queue once. A trigger that arrives while a pass is
    /// running is coalesced into one follow-up pass.
    pub async fn run_sync(&self) -> Result<SyncOutcome, AppError> {
        let token = self.current_pass_token();
        if token.is_cancelled() {
            return Ok(SyncOutcome::Cancelled);
        }

        // Entries that failed earlier in this cycle wait for the next one.
        let mut attempted: HashSet<QueueEntryId> = HashSet::new();
        let mut previous: Option<Result<SyncOutcome, AppError>> = None;

        loop {
            let Some(guard) = self.try_begin() else {
                if let Some(outcome) = previous.take() {
                    return outcome;
                }
                if self.request_rerun() {
                    tracing::debug!(target: "offline::sync", "sync already running; rerun requested");
                    return Ok(SyncOutcome::Skipped);
                }
                continue;
            };

            self.rerun_requested.store(false, Ordering::SeqCst);
            let outcome = self.run_pass(&token, &mut attempted).await;
            drop(guard);

            if token.is_cancelled() || !self.rerun_requested.load(Ordering::SeqCst) {
                return outcome;
            }
            if let Err(err) = &outcome {
                tracing::error!(target: "offline::sync", error = %err, "sync pass failed before rerun");
            }
            tracing::debug!(target: "offline::sync", "running coalesced sync pass");
            previous = Some(outcome);
        }
    }

    async fn run_pass(
        &self,
        token: &CancellationToken,
        attempted: &mut HashSet<QueueEntryId>,
    ) -> Result<SyncOutcome, AppError> {
        let network = self.monitor.check_network_status().await;
        if !network.is_online() {
            tracing::info!(target: "offline::sync", "offline; sync pass skipped");
            return Ok(SyncOutcome::Offline);
        }

        let clock = Instant::now();
        let mut report = SyncReport::started(Utc::now());
        let entries = self.store.pending_uploads().await?;
        tracing::info!(target: "offline::sync", pending = entries.len(), "sync pass started");

        for entry in entries {
            if token.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if attempted.contains(&entry.entry_id) {
                continue;
            }
            attempted.insert(entry.entry_id);

            match self.sync_entry(&entry, token).await? {
                EntryOutcome::Synced => {
                    report.synced_count += 1;
                    self.metrics.record_upload(
                        SyncOutcomeStatus::Success,
                        entry.result_id.as_str(),
                        None,
                    );
                }
                EntryOutcome::Failed(error) => {
                    let failure = self.record_failure(&entry, &error).await?;
                    self.metrics.record_upload(
                        SyncOutcomeStatus::Failure,
                        entry.result_id.as_str(),
                        Some(&error),
                    );
                    report.record_failure(failure);
                }
                EntryOutcome::Cancelled => {
                    report.cancelled = true;
                    break;
                }
                EntryOutcome::Gone => {}
            }
        }

        if self.settings.purge_synced_after_sync && !report.cancelled {
            report.purged_count = self.store.clear_synced_results().await?;
        }
        report.remaining_count = self.store.pending_upload_count().await?;
        report.finished_at = Utc::now();

        self.metrics
            .record_pass(clock.elapsed().as_millis().min(u64::MAX as u128) as u64);
        tracing::info!(
            target: "offline::sync",
            synced = report.synced_count,
            failed = report.failed_count,
            remaining = report.remaining_count,
            cancelled = report.cancelled,
            "sync pass finished"
        );

        *self.last_report.write().await = Some(report.clone());
        if report.cancelled {
            return Ok(SyncOutcome::Cancelled);
        }
        Ok(SyncOutcome::Completed(report))
    }

    /// Uploads one queue entry. Only local storage failures are returned as
    /// errors; everything else is an outcome of the entry.
    async fn sync_entry(
        &self,
        entry: &PendingUpload,
        token: &CancellationToken,
    ) -> Result<EntryOutcome, AppError> {
        let result = match self.store.get_result(&entry.result_id).await? {
            Some(result) if result.is_pending() => result,
            _ => {
                self.store.remove_from_queue(entry.entry_id).await?;
                return Ok(EntryOutcome::Gone);
            }
        };

        let mut images = Vec::with_capacity(result.image_refs.len());
        for image in &result.image_refs {
            match self.images.read_image(image).await {
                Ok(bytes) => images.push(bytes),
                Err(err) => {
                    return Ok(EntryOutcome::Failed(format!(
                        "Unreadable image {image}: {err}"
                    )))
                }
            }
        }

        let upload = ResultUpload {
            local_id: result.local_id.clone(),
            user_id: result.user_id.clone(),
            user_role: result.user_role.clone(),
            payload: result.payload.clone(),
            images,
            location: result.location.clone(),
            captured_at: result.created_at,
        };

        let receipt = tokio::select! {
            _ = token.cancelled() => return Ok(EntryOutcome::Cancelled),
            attempt = tokio::time::timeout(self.settings.upload_timeout, self.remote.upload_result(&upload)) => {
                match attempt {
                    Ok(Ok(receipt)) => receipt,
                    Ok(Err(err)) => return Ok(EntryOutcome::Failed(err.to_string())),
                    Err(_) => {
                        return Ok(EntryOutcome::Failed(format!(
                            "Upload timed out after {}s",
                            self.settings.upload_timeout.as_secs_f32()
                        )))
                    }
                }
            }
        };

        let synced_at = Utc::now();
        match self
            .store
            .mark_result_synced(&result.local_id, Some(receipt.remote_id.clone()), synced_at)
            .await
        {
            Ok(()) => {}
            Err(AppError::NotFound(_)) => return Ok(EntryOutcome::Gone),
            Err(err) => return Err(err),
        }
        self.store.update_last_sync_time(synced_at).await?;

        tracing::debug!(
            target: "offline::sync",
            local_id = %result.local_id,
            remote_id = %receipt.remote_id,
            "result synced"
        );

        if !self.settings.retain_synced_images {
            let _gate = self.image_gate.lock().await;
            for image in &result.image_refs {
                if self.store.image_in_use(image).await? {
                    continue;
                }
                if let Err(err) = self.images.delete_image(image).await {
                    tracing::warn!(
                        target: "offline::sync",
                        image = %image,
                        error = %err,
                        "failed to delete synced image"
                    );
                }
            }
        }

        Ok(EntryOutcome::Synced)
    }

    async fn record_failure(
        &self,
        entry: &PendingUpload,
        error: &str,
    ) -> Result<UploadFailure, AppError> {
        let attempts = match self
            .store
            .record_failed_attempt(entry.entry_id, error, Utc::now())
            .await
        {
            Ok(updated) => updated.attempts,
            Err(AppError::NotFound(_)) => entry.attempts,
            Err(err) => return Err(err),
        };

        tracing::warn!(
            target: "offline::sync",
            local_id = %entry.result_id,
            attempts,
            error,
            "upload failed; entry stays queued"
        );

        Ok(UploadFailure {
            entry_id: entry.entry_id,
            result_id: entry.result_id.clone(),
            attempts,
            error: error.to_string(),
        })
    }

    /// Starts a pass on every offline to online transition.
    pub fn attach(&self) {
        let service = self.clone();
        let subscription = self.monitor.subscribe_to_network_changes(move |status| {
            if !status.is_online() {
                return;
            }
            let service = service.clone();
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(err) = service.run_sync().await {
                            tracing::error!(target: "offline::sync", error = %err, "sync after reconnect failed");
                        }
                    });
                }
                Err(_) => {
                    tracing::warn!(target: "offline::sync", "no runtime to start sync after reconnect");
                }
            }
        });

        if let Ok(mut slot) = self.subscription.lock() {
            *slot = Some(subscription);
        }
    }

    pub fn schedule_sync(&self, interval: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = service.shutdown_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = service.run_sync().await {
                            tracing::error!(target: "offline::sync", error = %err, "scheduled sync failed");
                        }
                    }
                }
            }
        })
    }

    /// Cancels the pass in flight (logout) and waits until it has stopped.
    /// Later triggers start passes again.
    pub async fn abort_current_pass(&self) {
        if let Ok(mut token) = self.pass_token.lock() {
            token.cancel();
            *token = self.shutdown_token.child_token();
        }
        self.wait_until_idle().await;
    }

    /// Stops every trigger and the pass in flight. Used on app close.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();
        if let Ok(mut slot) = self.subscription.lock() {
            slot.take();
        }
        self.wait_until_idle().await;
        tracing::info!(target: "offline::sync", "sync coordinator stopped");
    }

    async fn wait_until_idle(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == SyncRunState::Idle).await;
    }

    pub async fn last_report(&self) -> Option<SyncReport> {
        self.last_report.read().await.clone()
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn status(&self) -> Result<SyncStatusSnapshot, AppError> {
        Ok(SyncStatusSnapshot {
            state: self.state(),
            pending_uploads: self.store.pending_upload_count().await?,
            last_sync: self.store.last_sync_time().await?,
            network: self.monitor.current_status(),
            last_report: self.last_report().await,
            metrics: self.metrics(),
        })
    }
}
