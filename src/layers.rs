//! Layer and layer-group value types owned by [`crate::LayerStore`].

use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

use crate::ingest::ProviderSummary;

/// District name used when no stop resolves to a real district.
pub const UNKNOWN_DISTRICT: &str = "未知區域";

/// Geometry kind a layer renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    Point,
    Line,
    Polygon,
}

/// Count of point features in one administrative district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictCount {
    pub name: String,
    pub count: usize,
}

/// Aggregate statistics shown beside a layer's table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryData {
    pub total_count: usize,
    pub route_count: usize,
    /// Sorted descending by count, ties by name.
    pub district_count: Vec<DistrictCount>,
}

/// One row of a layer's tabular view; mirrors a point feature's properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    #[serde(rename = "#")]
    pub index: usize,
    /// Resolved hex color of the feature.
    pub color: String,
    /// `service-point` or `route-center-point`.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_time: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

/// One renderable dataset.
///
/// `geo_json_data`, `table_data` and `summary_data` always come from the same
/// ingestion call; a reload replaces the whole layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub layer_id: String,
    pub layer_name: String,
    pub visible: bool,
    pub is_loaded: bool,
    pub is_loading: bool,
    #[serde(default)]
    pub is_analysis_layer: bool,
    #[serde(default)]
    pub is_isochrone_analysis_layer: bool,
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    pub geo_json_data: FeatureCollection,
    pub table_data: Vec<TableRow>,
    pub summary_data: SummaryData,
    pub color_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_summary: Option<ProviderSummary>,
}

impl Layer {
    /// An empty, hidden, unloaded layer.
    pub fn new(layer_id: impl Into<String>, layer_name: impl Into<String>, layer_type: LayerType) -> Self {
        Self {
            layer_id: layer_id.into(),
            layer_name: layer_name.into(),
            visible: false,
            is_loaded: false,
            is_loading: false,
            is_analysis_layer: false,
            is_isochrone_analysis_layer: false,
            layer_type,
            geo_json_data: empty_collection(),
            table_data: Vec::new(),
            summary_data: SummaryData::default(),
            color_name: String::new(),
            color_hex: None,
            service_provider_id: None,
            service_date: None,
            provider_summary: None,
        }
    }

    /// Attach loaded data and mark the layer loaded.
    pub fn with_data(mut self, geo_json: FeatureCollection, table: Vec<TableRow>, summary: SummaryData) -> Self {
        self.geo_json_data = geo_json;
        self.table_data = table;
        self.summary_data = summary;
        self.is_loaded = true;
        self.is_loading = false;
        self
    }

    /// Whether range queries consider this layer at all.
    pub fn is_queryable(&self) -> bool {
        self.visible && self.is_loaded && !self.is_analysis_layer && !self.is_isochrone_analysis_layer
    }
}

/// Load lifecycle of one group, so the UI can tell "empty" from "failed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum GroupLoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// A named, ordered collection of layers shown together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerGroup {
    pub group_name: String,
    pub group_layers: Vec<Layer>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub load_state: GroupLoadState,
}

impl LayerGroup {
    pub fn new(group_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            group_layers: Vec::new(),
            description: description.into(),
            load_state: GroupLoadState::Idle,
        }
    }

    pub fn has_visible_layers(&self) -> bool {
        self.group_layers.iter().any(|l| l.visible)
    }
}

pub(crate) fn empty_collection() -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_layer_defaults() {
        let layer = Layer::new("service-provider-A", "A", LayerType::Point);
        assert!(!layer.visible);
        assert!(!layer.is_loaded);
        assert!(layer.geo_json_data.features.is_empty());
        assert!(!layer.is_queryable());
    }

    #[test]
    fn test_queryable_excludes_analysis_layers() {
        let mut layer = Layer::new("x", "x", LayerType::Point).with_data(
            empty_collection(),
            Vec::new(),
            SummaryData::default(),
        );
        layer.visible = true;
        assert!(layer.is_queryable());

        layer.is_analysis_layer = true;
        assert!(!layer.is_queryable());

        layer.is_analysis_layer = false;
        layer.is_isochrone_analysis_layer = true;
        assert!(!layer.is_queryable());
    }

    #[test]
    fn test_layer_serializes_camel_case() {
        let layer = Layer::new("id", "name", LayerType::Polygon);
        let json = serde_json::to_value(&layer).unwrap();
        assert_eq!(json["layerId"], "id");
        assert_eq!(json["type"], "polygon");
        assert_eq!(json["geoJsonData"]["type"], "FeatureCollection");
    }

    #[test]
    fn test_group_load_state_roundtrip() {
        let failed = GroupLoadState::Failed("HTTP error 404".into());
        let json = serde_json::to_string(&failed).unwrap();
        let back: GroupLoadState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, failed);
    }
}
