//! Runtime configuration for ingestion and the dashboard.

use serde::{Deserialize, Serialize};

use crate::palette::ColorPolicy;

/// Group holding one layer per provider for the selected date.
pub const SERVICE_RECORD_GROUP: &str = "新基準中央服務紀錄";
/// Group holding one layer per date for the selected provider.
pub const PROVIDER_DATE_GROUP: &str = "服務人員日期紀錄";

/// What one ingestion call loads and where its layers go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerConfig {
    /// Target group for the layers built from this source.
    /// Default: "新基準中央服務紀錄"
    pub group_name: String,

    /// JSON file name, relative to the data source's base.
    /// Default: "新基準中央服務紀錄_all_2.json"
    pub file_name: String,

    /// Display name template; `{id}` is replaced by the entity id.
    /// Default: "{id}"
    pub name_template: String,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            group_name: SERVICE_RECORD_GROUP.to_string(),
            file_name: "新基準中央服務紀錄_all_2.json".to_string(),
            name_template: "{id}".to_string(),
        }
    }
}

impl LayerConfig {
    /// Render the display name for an entity id.
    pub fn layer_name(&self, id: &str) -> String {
        self.name_template.replace("{id}", id)
    }
}

/// Top-level dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardConfig {
    /// Base path or URL the data files are fetched from.
    /// Default: "/long-term-care-web-taichung/data/geojson"
    pub base_path: String,

    /// Service-record source and its date-mode group.
    pub service_layer: LayerConfig,

    /// Group filled by provider-mode loads (one layer per date).
    /// Default: "服務人員日期紀錄"
    pub provider_date_group: String,

    /// Date used when a load is requested without a date filter.
    /// Default: 1140701
    pub fallback_date: u32,

    /// Radius for range queries when the caller gives none.
    /// Default: 2000.0 meters
    pub default_radius_meters: f64,

    /// Palette policy applied when layers are created.
    /// Default: daily round-robin
    pub color_policy: ColorPolicy,

    /// Key the store snapshot is persisted under.
    /// Default: "data"
    pub storage_key: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_path: "/long-term-care-web-taichung/data/geojson".to_string(),
            service_layer: LayerConfig::default(),
            provider_date_group: PROVIDER_DATE_GROUP.to_string(),
            fallback_date: 1_140_701,
            default_radius_meters: 2_000.0,
            color_policy: ColorPolicy::DailyRoundRobin,
            storage_key: "data".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.fallback_date, 1140701);
        assert_eq!(config.service_layer.group_name, SERVICE_RECORD_GROUP);
        assert_eq!(config.default_radius_meters, 2000.0);
        assert_eq!(config.color_policy, ColorPolicy::DailyRoundRobin);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = DashboardConfig::from_json_str(
            r#"{ "fallbackDate": 1140702, "serviceLayer": { "fileName": "day.json" }, "colorPolicy": "stableHash" }"#,
        )
        .unwrap();
        assert_eq!(config.fallback_date, 1140702);
        assert_eq!(config.service_layer.file_name, "day.json");
        assert_eq!(config.service_layer.name_template, "{id}");
        assert_eq!(config.provider_date_group, PROVIDER_DATE_GROUP);
        assert_eq!(config.color_policy, ColorPolicy::StableHash);
    }

    #[test]
    fn test_layer_name_template() {
        let config = LayerConfig {
            name_template: "服務人員 {id}".to_string(),
            ..LayerConfig::default()
        };
        assert_eq!(config.layer_name("A001"), "服務人員 A001");
    }
}
