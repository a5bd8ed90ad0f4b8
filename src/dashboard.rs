//! Async orchestration of loads against a shared [`LayerStore`].
//!
//! The store lock is never held across a fetch: each load takes it once to
//! begin (clear + ticket) and once to apply. Two overlapping loads of the
//! same group therefore both fetch, but only the newer one lands.

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;

use crate::config::{DashboardConfig, LayerConfig};
use crate::error::{LoadError, StoreError};
use crate::ingest::{load_provider_service_data, load_service_data, resolve_date};
use crate::persist::SnapshotStorage;
use crate::range::PointHit;
use crate::source::{source_for_base, DataSource};
use crate::store::LayerStore;

/// Shared store handle plus where its data and snapshots come from.
#[derive(Clone)]
pub struct Dashboard {
    store: Arc<Mutex<LayerStore>>,
    source: Arc<dyn DataSource>,
    storage: Option<Arc<dyn SnapshotStorage>>,
    config: DashboardConfig,
}

impl Dashboard {
    pub fn new(source: Arc<dyn DataSource>, config: DashboardConfig) -> Self {
        let store = Self::fresh_store(&config);
        Self {
            store: Arc::new(Mutex::new(store)),
            source,
            storage: None,
            config,
        }
    }

    /// Read data files from `config.base_path`: a local directory, or an
    /// `http(s)://` URL with the `http` feature.
    pub fn from_config(config: DashboardConfig) -> Result<Self, LoadError> {
        let source = source_for_base(&config.base_path)?;
        Ok(Self::new(source, config))
    }

    /// Persist the store through `storage`, starting from its last snapshot.
    ///
    /// A missing or corrupt snapshot starts from a fresh store.
    pub fn with_storage(mut self, storage: Arc<dyn SnapshotStorage>) -> Self {
        let key = &self.config.storage_key;
        let restored = match storage.load(key) {
            Ok(Some(blob)) => match LayerStore::from_snapshot(&blob) {
                Ok(mut store) => {
                    info!("[Dashboard] restored snapshot {:?}", key);
                    store.set_color_policy(self.config.color_policy);
                    store
                }
                Err(e) => {
                    warn!("[Dashboard] ignoring snapshot {:?}: {}", key, e);
                    Self::fresh_store(&self.config)
                }
            },
            Ok(None) => Self::fresh_store(&self.config),
            Err(e) => {
                warn!("[Dashboard] snapshot storage unavailable: {}", e);
                Self::fresh_store(&self.config)
            }
        };
        self.store = Arc::new(Mutex::new(restored));
        self.storage = Some(storage);
        self
    }

    fn fresh_store(config: &DashboardConfig) -> LayerStore {
        let mut store = LayerStore::with_groups(&config.service_layer.group_name, &config.provider_date_group);
        store.set_color_policy(config.color_policy);
        store
    }

    /// Handle for direct reads and synchronous mutations (visibility, filters).
    pub fn store(&self) -> Arc<Mutex<LayerStore>> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Load one day into the date-mode group, one layer per provider.
    ///
    /// `date` is a 7-digit code; `None` or empty loads the configured
    /// fallback date. An invalid code fails before the group is touched.
    pub async fn load_service_provider_layers(&self, date: Option<&str>) -> Result<usize, StoreError> {
        let date = resolve_date(date, self.config.fallback_date)?.to_string();
        let layer_config = &self.config.service_layer;

        let ticket = self.store.lock().await.begin_load(&layer_config.group_name);
        info!("[Dashboard] loading providers for {} (load #{})", date, ticket.sequence());

        let result = load_service_data(self.source.as_ref(), layer_config, Some(&date), self.config.fallback_date).await;

        let applied = self
            .store
            .lock()
            .await
            .apply_service_provider_layers(ticket, &date, result);
        self.persist_after(&applied).await;
        applied
    }

    /// Load every day of one provider into the provider-mode group.
    pub async fn load_service_provider_date_layers(&self, provider_id: &str) -> Result<usize, StoreError> {
        let layer_config = LayerConfig {
            group_name: self.config.provider_date_group.clone(),
            ..self.config.service_layer.clone()
        };

        let ticket = self.store.lock().await.begin_load(&layer_config.group_name);
        info!("[Dashboard] loading dates for {} (load #{})", provider_id, ticket.sequence());

        let result = load_provider_service_data(self.source.as_ref(), &layer_config, provider_id).await;

        let applied = self
            .store
            .lock()
            .await
            .apply_service_provider_date_layers(ticket, provider_id, result);
        self.persist_after(&applied).await;
        applied
    }

    /// Range query with the configured default radius when none is given.
    pub async fn points_in_range(&self, center_lat: f64, center_lng: f64, radius_meters: Option<f64>) -> Vec<PointHit> {
        let radius = radius_meters.unwrap_or(self.config.default_radius_meters);
        self.store.lock().await.points_in_range(center_lat, center_lng, radius)
    }

    /// Save a snapshot now. A no-op without storage.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        let store = self.store.lock().await;
        store.save(storage.as_ref(), &self.config.storage_key)
    }

    async fn persist_after(&self, applied: &Result<usize, StoreError>) {
        if matches!(applied, Err(e) if e.is_stale()) {
            return;
        }
        if let Err(e) = self.persist().await {
            warn!("[Dashboard] snapshot not saved: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use tokio::sync::Notify;

    use crate::error::LoadError;
    use crate::ingest::sample_dataset;
    use crate::layers::GroupLoadState;
    use crate::palette::COLOR_PALETTE;
    use crate::persist::MemoryStorage;
    use crate::source::MemorySource;

    fn source() -> Arc<MemorySource> {
        let file = DashboardConfig::default().service_layer.file_name;
        Arc::new(MemorySource::new().with_file(file, sample_dataset().to_string()))
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(source(), DashboardConfig::default())
    }

    /// Holds the first fetch until released.
    struct GatedSource {
        inner: MemorySource,
        gate: Notify,
        calls: AtomicUsize,
    }

    impl DataSource for GatedSource {
        fn fetch<'a>(&'a self, file_name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    self.gate.notified().await;
                }
                self.inner.fetch(file_name).await
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_switching_days_recolors_without_residue() {
        let dashboard = dashboard();

        assert_eq!(dashboard.load_service_provider_layers(Some("1140701")).await.unwrap(), 2);
        {
            let store = dashboard.store();
            let store = store.lock().await;
            let colors: Vec<&str> = store.get_all_layers().iter().map(|l| l.color_name.as_str()).collect();
            assert_eq!(colors, [COLOR_PALETTE[0].token, COLOR_PALETTE[1].token]);
        }

        assert_eq!(dashboard.load_service_provider_layers(Some("1140702")).await.unwrap(), 1);
        let store = dashboard.store();
        let store = store.lock().await;
        let layers = store.get_all_layers();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].layer_id, "service-provider-A001");
        assert_eq!(layers[0].color_name, COLOR_PALETTE[0].token);
        assert!(layers[0]
            .geo_json_data
            .features
            .iter()
            .all(|f| f.property("serviceDate").and_then(|v| v.as_str()) == Some("1140702")));
    }

    #[tokio::test]
    async fn test_missing_date_uses_fallback() {
        let dashboard = dashboard();
        assert_eq!(dashboard.load_service_provider_layers(None).await.unwrap(), 2);
        assert_eq!(dashboard.load_service_provider_layers(Some("")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_marks_group_failed() {
        let dashboard = Dashboard::new(Arc::new(MemorySource::new()), DashboardConfig::default());
        let err = dashboard.load_service_provider_layers(Some("1140701")).await.unwrap_err();
        assert!(matches!(err, StoreError::Load(LoadError::NotFound(_))));

        let store = dashboard.store();
        let store = store.lock().await;
        let group = store.find_group(&dashboard.config().service_layer.group_name).unwrap();
        assert!(group.group_layers.is_empty());
        assert!(matches!(group.load_state, GroupLoadState::Failed(_)));
    }

    #[tokio::test]
    async fn test_invalid_date_leaves_store_untouched() {
        let dashboard = dashboard();
        dashboard.load_service_provider_layers(Some("1140701")).await.unwrap();

        let err = dashboard.load_service_provider_layers(Some("7/1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Load(LoadError::InvalidDate(_))));
        assert_eq!(dashboard.store().lock().await.get_all_layers().len(), 2);
    }

    #[tokio::test]
    async fn test_provider_mode_load() {
        let dashboard = dashboard();
        assert_eq!(dashboard.load_service_provider_date_layers("A001").await.unwrap(), 2);
        assert_eq!(dashboard.load_service_provider_date_layers("Z999").await.unwrap(), 0);

        let store = dashboard.store();
        let store = store.lock().await;
        let group = store.find_group(&dashboard.config().provider_date_group).unwrap();
        assert_eq!(group.load_state, GroupLoadState::Loaded);
    }

    #[tokio::test]
    async fn test_late_response_is_discarded() {
        let file = DashboardConfig::default().service_layer.file_name;
        let source = Arc::new(GatedSource {
            inner: MemorySource::new().with_file(file, sample_dataset().to_string()),
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let dashboard = Dashboard::new(source.clone(), DashboardConfig::default());

        let slow = {
            let dashboard = dashboard.clone();
            tokio::spawn(async move { dashboard.load_service_provider_layers(Some("1140701")).await })
        };
        while source.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(dashboard.load_service_provider_layers(Some("1140702")).await.unwrap(), 1);
        source.gate.notify_one();

        let late = slow.await.unwrap();
        assert!(late.unwrap_err().is_stale());

        let store = dashboard.store();
        let store = store.lock().await;
        let layers = store.get_all_layers();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].service_date.as_deref(), Some("1140702"));
    }

    #[tokio::test]
    async fn test_points_in_range_default_radius() {
        let dashboard = dashboard();
        dashboard.load_service_provider_layers(None).await.unwrap();
        dashboard
            .store()
            .lock()
            .await
            .toggle_layer_visibility("service-provider-A001");

        assert_eq!(dashboard.points_in_range(24.1625, 120.6440, None).await.len(), 3);
        assert!(dashboard.points_in_range(24.1625, 120.6440, Some(10.0)).await.len() < 3);
    }

    #[tokio::test]
    async fn test_from_config_reads_base_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig {
            base_path: dir.path().to_string_lossy().into_owned(),
            ..DashboardConfig::default()
        };
        std::fs::write(dir.path().join(&config.service_layer.file_name), sample_dataset().to_string()).unwrap();

        let dashboard = Dashboard::from_config(config).unwrap();
        assert_eq!(dashboard.load_service_provider_layers(Some("1140701")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_starts_fresh_with_config_groups() {
        let storage = Arc::new(MemoryStorage::new());
        let config = DashboardConfig::default();
        storage.save(&config.storage_key, "{not json").unwrap();

        let dashboard = dashboard().with_storage(storage);
        let store = dashboard.store();
        let store = store.lock().await;
        assert!(store.get_all_layers().is_empty());
        assert!(store.find_group(&config.service_layer.group_name).is_some());
        assert!(store.find_group(&config.provider_date_group).is_some());
    }

    #[tokio::test]
    async fn test_snapshot_survives_restart() {
        let storage = Arc::new(MemoryStorage::new());

        let first = dashboard().with_storage(storage.clone());
        first.load_service_provider_layers(Some("1140701")).await.unwrap();
        first.store().lock().await.toggle_layer_visibility("service-provider-B002");
        first.persist().await.unwrap();

        let second = dashboard().with_storage(storage);
        let store = second.store();
        let store = store.lock().await;
        assert_eq!(store.get_all_layers().len(), 2);
        assert!(store.find_layer_by_id("service-provider-B002").unwrap().visible);
    }
}
