use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcomeStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub total_uploaded: u64,
    pub total_failed: u64,
    pub consecutive_failure: u64,
    pub passes: u64,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
    pub last_outcome: Option<SyncOutcomeStatus>,
    pub last_result_id: Option<String>,
    pub last_error: Option<String>,
    pub last_pass_duration_ms: Option<u64>,
}

#[derive(Default, Clone)]
struct LastUploadMetadata {
    outcome: Option<SyncOutcomeStatus>,
    result_id: Option<String>,
    error: Option<String>,
    pass_duration_ms: Option<u64>,
}

/// Per-upload and per-pass counters for the sync coordinator.
pub struct SyncMetrics {
    uploaded: AtomicU64,
    failed: AtomicU64,
    consecutive_failure: AtomicU64,
    passes: AtomicU64,
    last_success_ms: AtomicU64,
    last_failure_ms: AtomicU64,
    metadata: Mutex<LastUploadMetadata>,
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            uploaded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            consecutive_failure: AtomicU64::new(0),
            passes: AtomicU64::new(0),
            last_success_ms: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            metadata: Mutex::new(LastUploadMetadata::default()),
        }
    }

    pub fn record_upload(&self, status: SyncOutcomeStatus, result_id: &str, error: Option<&str>) {
        match status {
            SyncOutcomeStatus::Success => {
                self.uploaded.fetch_add(1, Ordering::Relaxed);
                self.last_success_ms
                    .store(current_unix_ms(), Ordering::Relaxed);
                self.consecutive_failure.store(0, Ordering::Relaxed);
            }
            SyncOutcomeStatus::Failure => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.last_failure_ms
                    .store(current_unix_ms(), Ordering::Relaxed);
                self.consecutive_failure.fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Ok(mut guard) = self.metadata.lock() {
            guard.outcome = Some(status);
            guard.result_id = Some(result_id.to_string());
            guard.error = error.map(str::to_string);
        }
    }

    pub fn record_pass(&self, duration_ms: u64) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.metadata.lock() {
            guard.pass_duration_ms = Some(duration_ms);
        }
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        let metadata = self
            .metadata
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        SyncMetricsSnapshot {
            total_uploaded: self.uploaded.load(Ordering::Relaxed),
            total_failed: self.failed.load(Ordering::Relaxed),
            consecutive_failure: self.consecutive_failure.load(Ordering::Relaxed),
            passes: self.passes.load(Ordering::Relaxed),
            last_success_ms: to_option(self.last_success_ms.load(Ordering::Relaxed)),
            last_failure_ms: to_option(self.last_failure_ms.load(Ordering::Relaxed)),
            last_outcome: metadata.outcome,
            last_result_id: metadata.result_id,
            last_error: metadata.error,
            last_pass_duration_ms: metadata.pass_duration_ms,
        }
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}

fn current_unix_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_success_and_failure() {
        let metrics = SyncMetrics::new();

        metrics.record_upload(SyncOutcomeStatus::Failure, "a", Some("timeout"));
        metrics.record_upload(SyncOutcomeStatus::Failure, "a", Some("timeout"));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_failed, 2);
        assert_eq!(snapshot.consecutive_failure, 2);
        assert_eq!(snapshot.last_error.as_deref(), Some("timeout"));
        assert!(snapshot.last_success_ms.is_none());

        metrics.record_upload(SyncOutcomeStatus::Success, "b", None);
        metrics.record_pass(120);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_uploaded, 1);
        assert_eq!(snapshot.consecutive_failure, 0);
        assert_eq!(snapshot.passes, 1);
        assert_eq!(snapshot.last_outcome, Some(SyncOutcomeStatus::Success));
        assert_eq!(snapshot.last_result_id.as_deref(), Some("b"));
        assert!(snapshot.last_error.is_none());
        assert_eq!(snapshot.last_pass_duration_ms, Some(120));
    }
}
