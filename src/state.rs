use crate::application::ports::{ImageStore, NetworkProbe, OfflineStore, RemoteApi};
use crate::application::services::{OfflineService, SyncService, SyncSettings};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::network::{HttpNetworkProbe, NetworkMonitor};
use crate::infrastructure::offline::{QueueReconcileJob, SqliteOfflineStore};
use crate::infrastructure::remote::HttpRemoteApi;
use crate::infrastructure::storage::{FsImageStore, ImageGate};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Wired offline layer: store, images, connectivity and the sync coordinator.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: ConnectionPool,
    pub offline_service: Arc<OfflineService>,
    pub sync_service: SyncService,
    pub network_monitor: Arc<NetworkMonitor>,
    pub reconcile_job: Arc<QueueReconcileJob>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self, AppError> {
        let remote: Arc<dyn RemoteApi> = Arc::new(HttpRemoteApi::new(
            &config.remote,
            config.sync.upload_timeout(),
        )?);
        let probe: Arc<dyn NetworkProbe> = Arc::new(HttpNetworkProbe::new(
            &config.remote.base_url,
            config.network.probe_timeout(),
        )?);
        Self::with_adapters(config, remote, probe).await
    }

    /// Builds the state around caller-supplied remote and probe adapters.
    pub async fn with_adapters(
        config: AppConfig,
        remote: Arc<dyn RemoteApi>,
        probe: Arc<dyn NetworkProbe>,
    ) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;
        tokio::fs::create_dir_all(&config.storage.data_dir)
            .await
            .map_err(|err| AppError::Storage(format!("Failed to create data dir: {err}")))?;

        let db_pool = ConnectionPool::from_config(&config.database).await?;
        db_pool.migrate().await?;

        let store: Arc<dyn OfflineStore> =
            Arc::new(SqliteOfflineStore::new(db_pool.get_pool().clone()));
        let images: Arc<dyn ImageStore> =
            Arc::new(FsImageStore::new(config.storage.images_dir()));

        let image_gate = ImageGate::new();
        let network_monitor = NetworkMonitor::new(probe, config.network.probe_timeout());
        let offline_service = Arc::new(OfflineService::new(
            store.clone(),
            images.clone(),
            image_gate.clone(),
        ));
        let sync_service = SyncService::new(
            store.clone(),
            images.clone(),
            remote,
            Arc::clone(&network_monitor),
            image_gate.clone(),
            SyncSettings::from_config(&config.sync),
        );
        let reconcile_job = QueueReconcileJob::new(store, images, image_gate);

        tracing::info!(
            target: "offline::sync",
            database = %config.database.url,
            data_dir = %config.storage.data_dir.display(),
            "offline layer initialized"
        );

        Ok(Self {
            config,
            db_pool,
            offline_service,
            sync_service,
            network_monitor,
            reconcile_job,
        })
    }

    /// Reconciles the queue, then starts connectivity polling and the sync triggers.
    pub async fn start_background(&self) -> Vec<JoinHandle<()>> {
        match self.reconcile_job.reconcile_once().await {
            Ok(report) => tracing::info!(
                target: "offline::reconcile",
                requeued = report.requeued_count,
                swept = report.swept_images.len(),
                pending = report.pending_queue_count,
                "startup reconcile completed"
            ),
            Err(err) => tracing::error!(
                target: "offline::reconcile",
                error = %err,
                "startup reconcile failed"
            ),
        }

        self.sync_service.attach();

        let mut handles = vec![self
            .network_monitor
            .spawn_polling(Duration::from_secs(self.config.network.poll_interval))];
        if self.config.sync.auto_sync {
            handles.push(
                self.sync_service
                    .schedule_sync(Duration::from_secs(self.config.sync.sync_interval)),
            );
        }
        handles
    }

    /// Aborts any pass in flight and wipes every local namespace.
    pub async fn logout(&self) -> Result<(), AppError> {
        self.sync_service.abort_current_pass().await;
        self.offline_service.clear_all_app_data().await?;
        tracing::info!(target: "offline::sync", "logged out; local data cleared");
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.sync_service.shutdown().await;
        self.network_monitor.shutdown();
        self.db_pool.close().await;
    }
}
