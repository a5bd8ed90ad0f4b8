//! Detail-popup view of one service point.

use geojson::JsonObject;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layers::Layer;
use crate::records::value_to_f64;

/// Normalized identity of a service point.
///
/// Each field reads the upstream Chinese column first and falls back to
/// the builder's own property name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePointInfo {
    pub name: Option<String>,
    pub address: Option<String>,
    pub time: Option<String>,
    pub service_type: Option<String>,
    pub order: Option<u64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl ServicePointInfo {
    pub fn from_properties(props: &JsonObject) -> Self {
        Self {
            name: text(props, &["姓名", "name"]),
            address: text(props, &["個案居住地址", "address"]),
            time: text(props, &["時間", "time"]),
            service_type: text(props, &["服務項目代碼", "serviceType"]),
            order: first(props, &["順序", "order"]).and_then(value_to_f64).map(|n| n as u64),
            lat: first(props, &["緯度", "lat"]).and_then(value_to_f64),
            lng: first(props, &["經度", "lon"]).and_then(value_to_f64),
        }
    }
}

/// Everything the detail popup needs for one clicked point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItemsData {
    /// Always `"service-items"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub layer_id: String,
    pub layer_name: String,
    /// The point's raw properties.
    pub service_point: JsonObject,
    pub service_items: Vec<Value>,
    pub service_point_info: ServicePointInfo,
}

/// Build the detail view from a point's properties and its owning layer.
///
/// A missing or non-array `service_items` yields an empty list.
pub fn create_service_items_data(properties: &JsonObject, layer: &Layer) -> ServiceItemsData {
    let service_items = match properties.get("service_items") {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    if service_items.is_empty() {
        warn!("[Detail] point in {} has no service_items", layer.layer_id);
    } else {
        debug!("[Detail] {} service items in {}", service_items.len(), layer.layer_id);
    }

    ServiceItemsData {
        kind: "service-items".to_string(),
        layer_id: layer.layer_id.clone(),
        layer_name: layer.layer_name.clone(),
        service_point: properties.clone(),
        service_items,
        service_point_info: ServicePointInfo::from_properties(properties),
    }
}

/// First key whose value is present and truthy (non-null, non-empty).
fn first<'a>(props: &'a JsonObject, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| props.get(*k)).find(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    })
}

fn text(props: &JsonObject, keys: &[&str]) -> Option<String> {
    match first(props, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerType;
    use serde_json::json;

    fn props(value: Value) -> JsonObject {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_builder_property_names() {
        let info = ServicePointInfo::from_properties(&props(json!({
            "name": "林阿嬤", "address": "臺中市西屯區", "time": "13:00-14:00",
            "order": 2, "lat": 24.16, "lon": 120.64
        })));
        assert_eq!(info.name.as_deref(), Some("林阿嬤"));
        assert_eq!(info.time.as_deref(), Some("13:00-14:00"));
        assert_eq!(info.order, Some(2));
        assert_eq!(info.lat, Some(24.16));
        assert_eq!(info.lng, Some(120.64));
        assert_eq!(info.service_type, None);
    }

    #[test]
    fn test_upstream_keys_win_and_empty_falls_through() {
        let info = ServicePointInfo::from_properties(&props(json!({
            "姓名": "王小明", "name": "ignored",
            "個案居住地址": "", "address": "fallback",
            "服務項目代碼": "BA07",
            "緯度": "24.2", "經度": "120.7"
        })));
        assert_eq!(info.name.as_deref(), Some("王小明"));
        assert_eq!(info.address.as_deref(), Some("fallback"));
        assert_eq!(info.service_type.as_deref(), Some("BA07"));
        assert_eq!(info.lat, Some(24.2));
        assert_eq!(info.lng, Some(120.7));
    }

    #[test]
    fn test_create_service_items_data() {
        let layer = Layer::new("service-provider-A001", "A001", LayerType::Point);
        let data = create_service_items_data(
            &props(json!({ "name": "林", "service_items": [{ "code": "BA07" }, { "code": "BA15" }] })),
            &layer,
        );
        assert_eq!(data.kind, "service-items");
        assert_eq!(data.layer_id, "service-provider-A001");
        assert_eq!(data.service_items.len(), 2);
        assert_eq!(data.service_point["name"], "林");

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["type"], "service-items");
        assert_eq!(json["servicePointInfo"]["name"], "林");
    }

    #[test]
    fn test_missing_service_items_is_empty() {
        let layer = Layer::new("x", "x", LayerType::Point);
        let data = create_service_items_data(&props(json!({ "service_items": "BA07" })), &layer);
        assert!(data.service_items.is_empty());
    }
}
