//! # Layer Store
//!
//! The single mutable layer tree behind the map: groups of layers, their
//! visibility and load state, the active filters and the selected feature.
//!
//! ## Loading
//! Loads are split so the async fetch can run without holding the store:
//! 1. [`LayerStore::begin_load`] clears the target group, marks it
//!    `Loading` and hands out a [`LoadTicket`]
//! 2. The caller fetches and builds [`ServiceData`]
//! 3. `apply_*` installs the result only if the ticket is still the newest
//!    for that group; an older ticket gets [`StoreError::StaleResponse`]
//!    and changes nothing
//!
//! A failed load leaves the group empty and `Failed`, never half-filled.

use std::collections::HashMap;

use geojson::{Feature, JsonObject};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{PROVIDER_DATE_GROUP, SERVICE_RECORD_GROUP};
use crate::detail::{create_service_items_data, ServiceItemsData};
use crate::error::{LoadError, StorageError, StoreError};
use crate::ingest::{EntityData, ServiceData};
use crate::layers::{GroupLoadState, Layer, LayerGroup, LayerType};
use crate::palette::{assign_colors, ColorPolicy};
use crate::persist::SnapshotStorage;
use crate::range::{self, OverlapMode, PointHit, PolygonHit};
use crate::records::{SERVICE_DATE_KEY, SERVICE_PROVIDER_KEY};

/// Date filter value active in a fresh store.
pub const DEFAULT_SERVICE_DATE: &str = "1140701";

/// Which filter a [`LayerStore::set_filter`] call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterMode {
    ServiceDate,
    ServiceProvider,
}

/// Selected values and their active flags. Each pair is always set and
/// cleared together; a filter is active iff its value is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub selected_service_date: String,
    pub is_date_filter_active: bool,
    pub selected_service_provider: String,
    pub is_service_provider_filter_active: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            selected_service_date: DEFAULT_SERVICE_DATE.to_string(),
            is_date_filter_active: true,
            selected_service_provider: String::new(),
            is_service_provider_filter_active: false,
        }
    }
}

/// Proof of a started load; only the newest ticket per group may apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    group: String,
    sequence: u64,
}

impl LoadTicket {
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// How per-entity layers of a load are identified.
#[derive(Debug, Clone, Copy)]
enum EntityLayerKind {
    /// One layer per provider, `service-provider-<id>`.
    Provider,
    /// One layer per date, `service-date-<date>`.
    Date,
}

impl EntityLayerKind {
    fn layer_id(self, entity_id: &str) -> String {
        match self {
            EntityLayerKind::Provider => format!("service-provider-{}", entity_id),
            EntityLayerKind::Date => format!("service-date-{}", entity_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStore {
    layers: Vec<LayerGroup>,
    #[serde(default)]
    selected_feature: Option<Feature>,
    #[serde(default)]
    filters: FilterState,
    #[serde(default)]
    color_policy: ColorPolicy,
    #[serde(skip)]
    tickets: HashMap<String, u64>,
}

impl Default for LayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStore {
    /// A store with the two service-record groups, both empty.
    pub fn new() -> Self {
        Self::with_groups(SERVICE_RECORD_GROUP, PROVIDER_DATE_GROUP)
    }

    /// A store whose date-mode and provider-mode groups use custom names.
    pub fn with_groups(date_group: &str, provider_group: &str) -> Self {
        Self {
            layers: vec![
                LayerGroup::new(date_group, "長期照護服務人員的服務記錄資料"),
                LayerGroup::new(provider_group, "單一服務人員各日期的服務記錄"),
            ],
            selected_feature: None,
            filters: FilterState::default(),
            color_policy: ColorPolicy::default(),
            tickets: HashMap::new(),
        }
    }

    pub fn color_policy(&self) -> ColorPolicy {
        self.color_policy
    }

    /// Policy for layers created by later loads; existing layers keep their colors.
    pub fn set_color_policy(&mut self, policy: ColorPolicy) {
        self.color_policy = policy;
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// The whole group tree, in display order.
    pub fn layers(&self) -> &[LayerGroup] {
        &self.layers
    }

    pub fn find_layer_by_id(&self, layer_id: &str) -> Option<&Layer> {
        self.layers
            .iter()
            .flat_map(|g| g.group_layers.iter())
            .find(|l| l.layer_id == layer_id)
    }

    fn find_layer_by_id_mut(&mut self, layer_id: &str) -> Option<&mut Layer> {
        self.layers
            .iter_mut()
            .flat_map(|g| g.group_layers.iter_mut())
            .find(|l| l.layer_id == layer_id)
    }

    pub fn find_group(&self, group_name: &str) -> Option<&LayerGroup> {
        self.layers.iter().find(|g| g.group_name == group_name)
    }

    fn find_group_mut(&mut self, group_name: &str) -> Option<&mut LayerGroup> {
        self.layers.iter_mut().find(|g| g.group_name == group_name)
    }

    /// Every layer of every group, flattened in display order.
    pub fn get_all_layers(&self) -> Vec<&Layer> {
        self.all_layers().collect()
    }

    fn all_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().flat_map(|g| g.group_layers.iter())
    }

    pub fn visible_layers(&self) -> Vec<&Layer> {
        self.all_layers().filter(|l| l.visible).collect()
    }

    pub fn loading_layers(&self) -> Vec<&Layer> {
        self.all_layers().filter(|l| l.is_loading).collect()
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    /// Flip one layer's visibility. Returns the new state, `None` if unknown.
    pub fn toggle_layer_visibility(&mut self, layer_id: &str) -> Option<bool> {
        let Some(layer) = self.find_layer_by_id_mut(layer_id) else {
            warn!("[LayerStore] layer {:?} not found", layer_id);
            return None;
        };
        layer.visible = !layer.visible;
        debug!("[LayerStore] {} visible={}", layer.layer_name, layer.visible);
        Some(layer.visible)
    }

    /// Hide the whole group if any layer is visible, else show all of it.
    ///
    /// Returns the visibility applied, `None` if the group is unknown.
    pub fn toggle_group_visibility(&mut self, group_name: &str) -> Option<bool> {
        let Some(group) = self.find_group_mut(group_name) else {
            warn!("[LayerStore] group {:?} not found", group_name);
            return None;
        };
        let visible = !group.has_visible_layers();
        for layer in &mut group.group_layers {
            layer.visible = visible;
        }
        debug!(
            "[LayerStore] group {} -> visible={} ({} layers)",
            group_name,
            visible,
            group.group_layers.len()
        );
        Some(visible)
    }

    pub fn is_group_visible(&self, group_name: &str) -> bool {
        self.find_group(group_name).is_some_and(LayerGroup::has_visible_layers)
    }

    pub fn hide_all_layers_on_map(&mut self) {
        for layer in self.layers.iter_mut().flat_map(|g| g.group_layers.iter_mut()) {
            layer.visible = false;
        }
    }

    // ========================================================================
    // Selection & filters
    // ========================================================================

    pub fn selected_feature(&self) -> Option<&Feature> {
        self.selected_feature.as_ref()
    }

    pub fn set_selected_feature(&mut self, feature: Feature) {
        self.selected_feature = Some(feature);
    }

    pub fn clear_selected_feature(&mut self) {
        self.selected_feature = None;
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Set (or with `None`/empty, deactivate) one filter. Does not load anything.
    pub fn set_filter(&mut self, mode: FilterMode, value: Option<&str>) {
        let value = value.unwrap_or("");
        match mode {
            FilterMode::ServiceDate => self.set_service_date_filter(value),
            FilterMode::ServiceProvider => self.set_service_provider_filter(value),
        }
    }

    pub fn set_service_date_filter(&mut self, date: &str) {
        self.filters.selected_service_date = date.to_string();
        self.filters.is_date_filter_active = !date.is_empty();
        debug!("[LayerStore] date filter {:?}", date);
    }

    pub fn clear_service_date_filter(&mut self) {
        self.set_service_date_filter("");
    }

    pub fn set_service_provider_filter(&mut self, provider_id: &str) {
        self.filters.selected_service_provider = provider_id.to_string();
        self.filters.is_service_provider_filter_active = !provider_id.is_empty();
        debug!("[LayerStore] provider filter {:?}", provider_id);
    }

    pub fn clear_service_provider_filter(&mut self) {
        self.set_service_provider_filter("");
    }

    /// True if the date filter is inactive, the record has no date, or the
    /// record's date equals the selected one.
    pub fn matches_date_filter(&self, record: &JsonObject) -> bool {
        let f = &self.filters;
        if !f.is_date_filter_active || f.selected_service_date.is_empty() {
            return true;
        }
        field_text(record, SERVICE_DATE_KEY).map_or(true, |d| d == f.selected_service_date)
    }

    /// Provider-field counterpart of [`Self::matches_date_filter`].
    pub fn matches_service_provider_filter(&self, record: &JsonObject) -> bool {
        let f = &self.filters;
        if !f.is_service_provider_filter_active || f.selected_service_provider.is_empty() {
            return true;
        }
        field_text(record, SERVICE_PROVIDER_KEY).map_or(true, |p| p == f.selected_service_provider)
    }

    // ========================================================================
    // Clearing & inserting
    // ========================================================================

    /// Empty one group. Loads still in flight for it become stale.
    pub fn clear_group(&mut self, group_name: &str) -> Result<(), StoreError> {
        let group = self
            .find_group_mut(group_name)
            .ok_or_else(|| StoreError::GroupNotFound(group_name.to_string()))?;
        group.group_layers.clear();
        group.load_state = GroupLoadState::Idle;
        *self.tickets.entry(group_name.to_string()).or_insert(0) += 1;
        info!("[LayerStore] cleared group {}", group_name);
        Ok(())
    }

    /// Empty the date-mode group (first group).
    pub fn clear_service_provider_layers(&mut self) {
        if let Some(name) = self.layers.first().map(|g| g.group_name.clone()) {
            let _ = self.clear_group(&name);
        }
    }

    /// Empty the provider-mode group (second group).
    pub fn clear_service_provider_date_layers(&mut self) {
        if let Some(name) = self.layers.get(1).map(|g| g.group_name.clone()) {
            let _ = self.clear_group(&name);
        }
    }

    /// Append a layer built elsewhere (facility or polygon loaders).
    ///
    /// Layer ids are unique across the whole tree.
    pub fn insert_layer(&mut self, group_name: &str, layer: Layer) -> Result<(), StoreError> {
        if self.find_layer_by_id(&layer.layer_id).is_some() {
            return Err(StoreError::DuplicateLayerId(layer.layer_id));
        }
        let group = self
            .find_group_mut(group_name)
            .ok_or_else(|| StoreError::GroupNotFound(group_name.to_string()))?;
        debug!("[LayerStore] inserted {} into {}", layer.layer_id, group_name);
        group.group_layers.push(layer);
        Ok(())
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Start a load into `group_name`: clear it, mark it `Loading` and
    /// issue a ticket superseding every earlier one for the group.
    ///
    /// A missing group is created.
    pub fn begin_load(&mut self, group_name: &str) -> LoadTicket {
        if self.find_group(group_name).is_none() {
            debug!("[LayerStore] creating group {}", group_name);
            self.layers.push(LayerGroup::new(group_name, ""));
        }
        if let Some(group) = self.find_group_mut(group_name) {
            group.group_layers.clear();
            group.load_state = GroupLoadState::Loading;
        }

        let sequence = self.tickets.entry(group_name.to_string()).or_insert(0);
        *sequence += 1;
        debug!("[LayerStore] load #{} started for {}", sequence, group_name);

        LoadTicket {
            group: group_name.to_string(),
            sequence: *sequence,
        }
    }

    /// Whether `ticket` is still the newest for its group.
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.tickets.get(&ticket.group).copied() == Some(ticket.sequence)
    }

    /// Install a date-mode result: one layer per provider, colored by the
    /// sorted rank of its id. Returns the number of layers created.
    pub fn apply_service_provider_layers(
        &mut self,
        ticket: LoadTicket,
        service_date: &str,
        result: Result<ServiceData, LoadError>,
    ) -> Result<usize, StoreError> {
        self.apply_entities(ticket, result, EntityLayerKind::Provider, |layer, entity| {
            layer.service_provider_id = Some(entity.id.clone());
            layer.service_date = Some(service_date.to_string());
        })
    }

    /// Install a provider-mode result: one layer per date, ascending.
    pub fn apply_service_provider_date_layers(
        &mut self,
        ticket: LoadTicket,
        provider_id: &str,
        result: Result<ServiceData, LoadError>,
    ) -> Result<usize, StoreError> {
        self.apply_entities(ticket, result, EntityLayerKind::Date, |layer, entity| {
            layer.service_provider_id = Some(provider_id.to_string());
            layer.service_date = Some(entity.id.clone());
        })
    }

    fn apply_entities<F>(
        &mut self,
        ticket: LoadTicket,
        result: Result<ServiceData, LoadError>,
        kind: EntityLayerKind,
        tag: F,
    ) -> Result<usize, StoreError>
    where
        F: Fn(&mut Layer, &EntityData),
    {
        if !self.is_current(&ticket) {
            let latest = self.tickets.get(&ticket.group).copied().unwrap_or(0);
            warn!(
                "[LayerStore] dropping stale result for {} (#{} < #{})",
                ticket.group, ticket.sequence, latest
            );
            return Err(StoreError::StaleResponse {
                group: ticket.group,
                ticket: ticket.sequence,
                latest,
            });
        }

        let policy = self.color_policy;
        let group = self
            .find_group_mut(&ticket.group)
            .ok_or_else(|| StoreError::GroupNotFound(ticket.group.clone()))?;
        group.group_layers.clear();

        let data = match result {
            Ok(data) => data,
            Err(e) => {
                error!("[LayerStore] load into {} failed: {}", ticket.group, e);
                group.load_state = GroupLoadState::Failed(e.to_string());
                return Err(e.into());
            }
        };

        let colors: HashMap<String, _> = assign_colors(data.entities.iter().map(|e| e.id.as_str()), policy)
            .into_iter()
            .collect();

        for mut entity in data.entities {
            let Some(&color) = colors.get(&entity.id) else {
                continue;
            };
            entity.apply_color(color);

            let mut layer = Layer::new(kind.layer_id(&entity.id), entity.layer_name.clone(), LayerType::Point);
            tag(&mut layer, &entity);
            layer.color_name = color.token.to_string();
            layer.color_hex = Some(color.hex.to_string());
            layer.provider_summary = Some(entity.provider_summary);
            let layer = layer.with_data(entity.geo_json, entity.table_data, entity.summary);

            debug!("[LayerStore] created {} ({})", layer.layer_id, layer.color_name);
            group.group_layers.push(layer);
        }

        group.load_state = GroupLoadState::Loaded;
        let count = group.group_layers.len();
        if count == 0 {
            info!("[LayerStore] no service data for {}", ticket.group);
        } else {
            info!("[LayerStore] {} layers loaded into {}", count, ticket.group);
        }
        Ok(count)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Point features of visible point layers within the radius, nearest first.
    pub fn points_in_range(&self, center_lat: f64, center_lng: f64, radius_meters: f64) -> Vec<PointHit> {
        range::points_in_range(self.all_layers(), center_lat, center_lng, radius_meters)
    }

    /// Polygon features of visible polygon layers overlapping the circle.
    pub fn polygons_in_range(
        &self,
        center_lat: f64,
        center_lng: f64,
        radius_meters: f64,
        mode: OverlapMode,
    ) -> Vec<PolygonHit> {
        range::polygons_in_range(self.all_layers(), center_lat, center_lng, radius_meters, mode)
    }

    /// Detail view for a point's properties, within the layer `layer_id`.
    pub fn create_service_items_data(&self, properties: &JsonObject, layer_id: &str) -> Option<ServiceItemsData> {
        let Some(layer) = self.find_layer_by_id(layer_id) else {
            warn!("[LayerStore] layer {:?} not found", layer_id);
            return None;
        };
        Some(create_service_items_data(properties, layer))
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn to_snapshot(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    /// Decode a snapshot. Groups caught mid-load come back `Idle`.
    pub fn from_snapshot(blob: &str) -> Result<Self, StorageError> {
        let mut store: LayerStore =
            serde_json::from_str(blob).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        for group in &mut store.layers {
            if group.load_state == GroupLoadState::Loading {
                group.load_state = GroupLoadState::Idle;
            }
            for layer in &mut group.group_layers {
                layer.is_loading = false;
            }
        }
        Ok(store)
    }

    pub fn save(&self, storage: &dyn SnapshotStorage, key: &str) -> Result<(), StoreError> {
        let blob = self.to_snapshot()?;
        storage.save(key, &blob)?;
        debug!("[LayerStore] snapshot saved under {:?} ({} bytes)", key, blob.len());
        Ok(())
    }

    /// Best-effort restore: a missing, unreadable or corrupt snapshot
    /// yields a fresh store.
    pub fn restore(storage: &dyn SnapshotStorage, key: &str) -> Self {
        match storage.load(key) {
            Ok(Some(blob)) => match Self::from_snapshot(&blob) {
                Ok(store) => {
                    info!("[LayerStore] restored snapshot {:?}", key);
                    store
                }
                Err(e) => {
                    warn!("[LayerStore] ignoring snapshot {:?}: {}", key, e);
                    Self::new()
                }
            },
            Ok(None) => Self::new(),
            Err(e) => {
                warn!("[LayerStore] snapshot {:?} unavailable: {}", key, e);
                Self::new()
            }
        }
    }
}

/// A record field as text; numbers are stringified, empty strings are absent.
fn field_text(record: &JsonObject, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
