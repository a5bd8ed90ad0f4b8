//! Raw provider-day service records as they arrive in the JSON dataset.
//!
//! Upstream exports are loose about types: dates and times show up as numbers
//! or numeric strings, coordinates as strings, and optional lists as `null`.
//! Those fields are decoded with the lenient helpers below instead of failing
//! the whole document; a malformed entry only drops itself.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::GpsPoint;

/// Key of the 7-digit service date field, shared with table/detail filters.
pub const SERVICE_DATE_KEY: &str = "服務日期(請輸入7碼)";
/// Key of the service provider id field.
pub const SERVICE_PROVIDER_KEY: &str = "服務人員身分證";

/// One provider's records for one service day.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderDayRecord {
    #[serde(
        rename = "服務人員身分證",
        alias = "service_provider_id",
        alias = "身分證字號",
        default,
        deserialize_with = "loose_string"
    )]
    pub service_provider_id: Option<String>,

    #[serde(
        rename = "服務日期(請輸入7碼)",
        alias = "service_date",
        default,
        deserialize_with = "loose_date"
    )]
    pub service_date: Option<u32>,

    #[serde(default, deserialize_with = "loose_count")]
    pub service_points_count: Option<u64>,

    /// Stops that are not objects are dropped.
    #[serde(default, deserialize_with = "loose_list")]
    pub data: Vec<StopRecord>,

    /// Route polylines, one FeatureCollection per entry. Kept raw so a
    /// malformed collection only drops itself.
    #[serde(default, deserialize_with = "loose_values")]
    pub routes: Vec<Value>,

    #[serde(default, deserialize_with = "loose_values")]
    pub route_center_points: Vec<Value>,

    /// Paired by index with `route_center_points`; unreadable entries stay
    /// as `None` so later pairs keep their index.
    #[serde(default, deserialize_with = "loose_slots")]
    pub route_times: Vec<Option<RouteTime>>,
}

/// One service stop within a provider-day record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopRecord {
    #[serde(rename = "datail", alias = "detail", default, deserialize_with = "loose_object")]
    pub detail: Option<Map<String, Value>>,

    #[serde(default, deserialize_with = "loose_f64")]
    pub hour_start: Option<f64>,
    #[serde(default, deserialize_with = "loose_f64")]
    pub min_start: Option<f64>,
    #[serde(default, deserialize_with = "loose_f64")]
    pub hour_end: Option<f64>,
    #[serde(default, deserialize_with = "loose_f64")]
    pub min_end: Option<f64>,
    #[serde(default, deserialize_with = "loose_f64")]
    pub hour_traffic: Option<f64>,
    #[serde(default, deserialize_with = "loose_f64")]
    pub min_traffic: Option<f64>,

    #[serde(default, deserialize_with = "loose_values")]
    pub service_items: Vec<Value>,
}

/// Travel time paired by index with a route-center point.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteTime {
    #[serde(default, deserialize_with = "loose_f64")]
    pub hour: Option<f64>,
    #[serde(default, deserialize_with = "loose_f64")]
    pub min: Option<f64>,
}

impl StopRecord {
    /// Stops without a non-empty detail object produce no feature.
    pub fn has_detail(&self) -> bool {
        self.detail.as_ref().is_some_and(|d| !d.is_empty())
    }

    /// Sort key: start time in fractional hours.
    pub fn start_hours(&self) -> f64 {
        self.hour_start.unwrap_or(0.0) + self.min_start.unwrap_or(0.0) / 60.0
    }

    /// Traffic time to reach this stop, in minutes.
    pub fn traffic_minutes(&self) -> f64 {
        self.hour_traffic.unwrap_or(0.0) * 60.0 + self.min_traffic.unwrap_or(0.0)
    }

    /// `HH:MM` start time.
    pub fn start_time(&self) -> String {
        clock(self.hour_start, self.min_start)
    }

    /// `HH:MM-HH:MM` service window.
    pub fn time_range(&self) -> String {
        format!("{}-{}", clock(self.hour_start, self.min_start), clock(self.hour_end, self.min_end))
    }

    /// Detail field as trimmed text (numbers are stringified).
    pub fn detail_text(&self, key: &str) -> Option<String> {
        let value = self.detail.as_ref()?.get(key)?;
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    /// Location from the detail's `Lat`/`Lon` fields, if both parse and are in range.
    pub fn location(&self) -> Option<GpsPoint> {
        let detail = self.detail.as_ref()?;
        let lat = detail.get("Lat").and_then(value_to_f64)?;
        let lon = detail.get("Lon").and_then(value_to_f64)?;
        let point = GpsPoint::new(lat, lon);
        point.is_valid().then_some(point)
    }
}

impl RouteTime {
    /// `"{h}h{m}m"`, or `"{m}m"` when under an hour.
    pub fn label(&self) -> String {
        let total = (self.hour.unwrap_or(0.0) * 60.0 + self.min.unwrap_or(0.0)).round().max(0.0) as u64;
        let (h, m) = (total / 60, total % 60);
        if h == 0 {
            format!("{}m", m)
        } else {
            format!("{}h{}m", h, m)
        }
    }
}

fn clock(hour: Option<f64>, min: Option<f64>) -> String {
    let h = hour.unwrap_or(0.0).max(0.0) as u32;
    let m = min.unwrap_or(0.0).max(0.0) as u32;
    format!("{:02}:{:02}", h, m)
}

/// Parse a number or numeric string. Non-finite values are rejected.
pub fn value_to_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Parse a `[lng, lat]` pair of numbers or numeric strings.
pub fn value_to_point(value: &Value) -> Option<GpsPoint> {
    match value.as_array()?.as_slice() {
        [lng, lat, ..] => {
            let point = GpsPoint::new(value_to_f64(lat)?, value_to_f64(lng)?);
            point.is_valid().then_some(point)
        }
        _ => None,
    }
}

/// Parse a 7-digit service date code (e.g. `1140701`).
pub fn parse_date_code(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    if trimmed.len() != 7 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

fn loose_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_f64))
}

fn loose_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(loose_f64(deserializer)?.filter(|n| *n >= 0.0).map(|n| n as u64))
}

fn loose_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn loose_object<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Map<String, Value>>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    })
}

/// `null` or a non-array decodes as an empty list.
fn loose_values<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    })
}

fn loose_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(loose_values(deserializer)?
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn loose_slots<'de, D, T>(deserializer: D) -> Result<Vec<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(loose_values(deserializer)?
        .into_iter()
        .map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_record_fields() {
        let record: ProviderDayRecord = serde_json::from_value(json!({
            "服務人員身分證": " A001 ",
            "服務日期(請輸入7碼)": "1140701",
            "service_points_count": "3",
            "data": [{ "hour_start": "9", "min_start": 15, "datail": { "Lat": "24.1", "Lon": 120.6 } }]
        }))
        .unwrap();

        assert_eq!(record.service_provider_id.as_deref(), Some("A001"));
        assert_eq!(record.service_date, Some(1140701));
        assert_eq!(record.service_points_count, Some(3));
        assert_eq!(record.data[0].start_hours(), 9.25);
        assert_eq!(record.data[0].location(), Some(GpsPoint::new(24.1, 120.6)));
    }

    #[test]
    fn test_aliases() {
        let record: ProviderDayRecord = serde_json::from_value(json!({
            "service_provider_id": 42,
            "service_date": 1140702,
            "data": [{ "detail": { "姓名": "林" } }]
        }))
        .unwrap();

        assert_eq!(record.service_provider_id.as_deref(), Some("42"));
        assert_eq!(record.service_date, Some(1140702));
        assert!(record.data[0].has_detail());
    }

    #[test]
    fn test_invalid_location_rejected() {
        let stop: StopRecord = serde_json::from_value(json!({
            "datail": { "Lat": "abc", "Lon": "120.6" }
        }))
        .unwrap();
        assert!(stop.location().is_none());

        let out_of_range: StopRecord = serde_json::from_value(json!({
            "datail": { "Lat": "95.0", "Lon": "120.6" }
        }))
        .unwrap();
        assert!(out_of_range.location().is_none());
    }

    #[test]
    fn test_empty_detail_is_not_detail() {
        let stop: StopRecord = serde_json::from_value(json!({ "datail": {} })).unwrap();
        assert!(!stop.has_detail());
        assert!(!StopRecord::default().has_detail());
    }

    #[test]
    fn test_null_and_mistyped_lists_decode_empty() {
        let record: ProviderDayRecord = serde_json::from_value(json!({
            "服務人員身分證": "A001",
            "服務日期(請輸入7碼)": 1140701,
            "data": null,
            "routes": null,
            "route_center_points": "none",
            "route_times": null
        }))
        .unwrap();
        assert!(record.data.is_empty());
        assert!(record.routes.is_empty());
        assert!(record.route_center_points.is_empty());
        assert!(record.route_times.is_empty());
    }

    #[test]
    fn test_bad_stop_entries_drop_alone() {
        let record: ProviderDayRecord = serde_json::from_value(json!({
            "服務人員身分證": "A001",
            "data": [
                null,
                "oops",
                { "datail": "", "hour_start": 8 },
                { "service_items": null, "datail": { "姓名": "林", "Lat": "24.1", "Lon": "120.6" } }
            ]
        }))
        .unwrap();
        assert_eq!(record.data.len(), 2);
        assert!(!record.data[0].has_detail());
        assert!(record.data[1].has_detail());
        assert!(record.data[1].service_items.is_empty());
    }

    #[test]
    fn test_route_times_keep_their_index() {
        let record: ProviderDayRecord = serde_json::from_value(json!({
            "route_times": [null, { "hour": 0, "min": 12 }, 7]
        }))
        .unwrap();
        assert_eq!(record.route_times.len(), 3);
        assert!(record.route_times[0].is_none());
        assert_eq!(record.route_times[1].as_ref().map(RouteTime::label).as_deref(), Some("12m"));
        assert!(record.route_times[2].is_none());
    }

    #[test]
    fn test_time_formatting() {
        let stop: StopRecord = serde_json::from_value(json!({
            "hour_start": 8, "min_start": 5, "hour_end": 9, "min_end": 30,
            "hour_traffic": 1, "min_traffic": 20
        }))
        .unwrap();
        assert_eq!(stop.start_time(), "08:05");
        assert_eq!(stop.time_range(), "08:05-09:30");
        assert_eq!(stop.traffic_minutes(), 80.0);
    }

    #[test]
    fn test_route_time_label() {
        let t = |hour: f64, min: f64| RouteTime { hour: Some(hour), min: Some(min) }.label();
        assert_eq!(t(0.0, 12.0), "12m");
        assert_eq!(t(1.0, 5.0), "1h5m");
        assert_eq!(t(0.0, 75.0), "1h15m");
        assert_eq!(RouteTime::default().label(), "0m");
    }

    #[test]
    fn test_value_to_point() {
        assert_eq!(value_to_point(&json!([120.6, "24.1"])), Some(GpsPoint::new(24.1, 120.6)));
        assert!(value_to_point(&json!([200.0, 24.1])).is_none());
        assert!(value_to_point(&json!(["x", 24.1])).is_none());
        assert!(value_to_point(&json!([120.6])).is_none());
    }

    #[test]
    fn test_parse_date_code() {
        assert_eq!(parse_date_code("1140701"), Some(1140701));
        assert_eq!(parse_date_code(" 1140701 "), Some(1140701));
        assert_eq!(parse_date_code("114071"), None);
        assert_eq!(parse_date_code("11407a1"), None);
    }
}
