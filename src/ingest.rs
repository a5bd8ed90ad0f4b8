//! # Service Record Ingestion
//!
//! Turns raw provider-day records into GeoJSON features, table rows and
//! summaries, partitioned into one [`EntityData`] per provider (date mode)
//! or per date (provider mode).
//!
//! ## Pipeline
//! 1. Keep records matching the [`RecordFilter`]; skip the rest entirely
//! 2. For each kept record, in order: route polylines, route-center points,
//!    then service stops sorted by start time
//! 3. Points with unusable coordinates are dropped one by one; the rest of
//!    the record still processes
//! 4. Derive tables and summaries from the finished collections
//!
//! Colors are not decided here. Every feature leaves with
//! [`PLACEHOLDER_COLOR`]; the store assigns the final palette entry per
//! entity with [`EntityData::apply_color`].

use std::collections::HashMap;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoValue};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::LayerConfig;
use crate::detail::ServicePointInfo;
use crate::error::LoadError;
use crate::geo_utils::{polyline_length, position_to_point};
use crate::layers::{empty_collection, DistrictCount, SummaryData, TableRow, UNKNOWN_DISTRICT};
use crate::palette::{PaletteColor, PLACEHOLDER_COLOR};
use crate::records::{parse_date_code, value_to_f64, value_to_point, ProviderDayRecord, RouteTime, StopRecord};
use crate::source::DataSource;

/// `type` property of a service stop feature.
pub const SERVICE_POINT: &str = "service-point";
/// `type` property of a route-center feature.
pub const ROUTE_CENTER_POINT: &str = "route-center-point";
/// `type` property of a route polyline feature.
pub const ROUTE: &str = "route";

/// Which records an ingestion call keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    /// Records whose 7-digit date code equals this value.
    Date(u32),
    /// All records of one provider, any date.
    Provider(String),
}

impl RecordFilter {
    pub fn accepts(&self, record: &ProviderDayRecord) -> bool {
        match self {
            RecordFilter::Date(date) => record.service_date == Some(*date),
            RecordFilter::Provider(id) => record.service_provider_id.as_deref() == Some(id.as_str()),
        }
    }
}

/// How kept records are split into per-entity layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// One entity per provider id (date-mode loads).
    ByProvider,
    /// One entity per date code (provider-mode loads).
    ByDate,
}

/// Per-entity digest for the detail panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub service_provider_id: String,
    pub first_stop_name: Option<String>,
    pub first_stop_time: Option<String>,
    pub last_stop_name: Option<String>,
    pub last_stop_time: Option<String>,
    /// Upstream `service_points_count` when every record has it, else counted stops.
    pub total_stops: u64,
    pub traffic_minutes: f64,
    pub service_points: Vec<ServicePointInfo>,
}

/// Features, table and summary for one provider (or one date).
#[derive(Debug, Clone, PartialEq)]
pub struct EntityData {
    /// Provider id or date code, depending on the [`Partition`].
    pub id: String,
    /// Display name rendered from the layer config's template.
    pub layer_name: String,
    pub service_provider_id: Option<String>,
    pub service_date: Option<String>,
    pub geo_json: FeatureCollection,
    pub table_data: Vec<TableRow>,
    pub summary: SummaryData,
    pub provider_summary: ProviderSummary,
    /// Service-point features (route centers excluded).
    pub point_count: usize,
    pub route_count: usize,
}

impl EntityData {
    /// Set the entity's palette color on every feature and rebuild its table.
    pub fn apply_color(&mut self, color: PaletteColor) {
        for feature in &mut self.geo_json.features {
            let key = match feature.geometry.as_ref().map(|g| &g.value) {
                Some(GeoValue::Point(_)) => "fillColor",
                Some(GeoValue::LineString(_)) => "routeColor",
                _ => continue,
            };
            feature.set_property(key, color.token);
        }
        self.table_data = table_rows(&self.geo_json);
    }
}

/// Result of one ingestion call.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceData {
    /// Every feature of every kept record.
    pub geo_json: FeatureCollection,
    pub table_data: Vec<TableRow>,
    pub summary: SummaryData,
    /// Entities with at least one service point, sorted by id.
    pub entities: Vec<EntityData>,
    pub records_kept: usize,
    pub records_skipped: usize,
}

// ============================================================================
// Loading
// ============================================================================

/// Decode a dataset: a JSON array of provider-day records.
///
/// Only a payload that is not a JSON array fails. Entries that are not
/// record objects are skipped with a warning.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<ProviderDayRecord>, LoadError> {
    let entries: Vec<Value> = serde_json::from_slice(bytes).map_err(|e| {
        error!("[Ingest] malformed service-record payload: {}", e);
        LoadError::Parse(e)
    })?;

    let total = entries.len();
    let records: Vec<ProviderDayRecord> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("[Ingest] record {} skipped: {}", index, e);
                None
            }
        })
        .collect();

    if records.len() < total {
        warn!("[Ingest] {} of {} records unreadable", total - records.len(), total);
    }
    Ok(records)
}

/// Fetch and decode `file_name` from `source`.
pub async fn fetch_records(source: &dyn DataSource, file_name: &str) -> Result<Vec<ProviderDayRecord>, LoadError> {
    let bytes = source.fetch(file_name).await.map_err(|e| {
        error!("[Ingest] failed to fetch {}: {}", file_name, e);
        e
    })?;
    parse_records(&bytes)
}

/// Resolve a date filter value: empty or absent means `fallback`.
pub fn resolve_date(filter_value: Option<&str>, fallback: u32) -> Result<u32, LoadError> {
    match filter_value.map(str::trim) {
        None | Some("") => Ok(fallback),
        Some(text) => parse_date_code(text).ok_or_else(|| LoadError::InvalidDate(text.to_string())),
    }
}

/// Load one service day, partitioned by provider.
///
/// `filter_value` is a 7-digit date code; `None` or an empty string loads
/// `fallback_date` instead.
pub async fn load_service_data(
    source: &dyn DataSource,
    config: &LayerConfig,
    filter_value: Option<&str>,
    fallback_date: u32,
) -> Result<ServiceData, LoadError> {
    let date = resolve_date(filter_value, fallback_date)?;
    info!("[Ingest] loading {} for date {}", config.file_name, date);

    let records = fetch_records(source, &config.file_name).await?;
    Ok(build_service_data(&records, &RecordFilter::Date(date), Partition::ByProvider, config))
}

/// Load every day of one provider, partitioned by date.
pub async fn load_provider_service_data(
    source: &dyn DataSource,
    config: &LayerConfig,
    provider_id: &str,
) -> Result<ServiceData, LoadError> {
    info!("[Ingest] loading {} for provider {}", config.file_name, provider_id);

    let records = fetch_records(source, &config.file_name).await?;
    Ok(build_service_data(
        &records,
        &RecordFilter::Provider(provider_id.to_string()),
        Partition::ByDate,
        config,
    ))
}

// ============================================================================
// Building
// ============================================================================

#[derive(Debug, Default)]
struct EntityBuilder {
    features: Vec<Feature>,
    provider_ids: Vec<String>,
    dates: Vec<String>,
    explicit_total: Option<u64>,
    all_records_explicit: bool,
    counted_stops: u64,
    traffic_minutes: f64,
    first_stop: Option<(Option<String>, String)>,
    last_stop: Option<(Option<String>, String)>,
    point_count: usize,
    route_count: usize,
}

impl EntityBuilder {
    fn new() -> Self {
        Self { all_records_explicit: true, ..Self::default() }
    }

    fn note(list: &mut Vec<String>, value: &str) {
        if !list.iter().any(|v| v == value) {
            list.push(value.to_string());
        }
    }
}

/// District of each provider's first sorted stop, taken from its first kept
/// record. Provider-mode loads scope the lookup by date as well, so every
/// per-date layer reports its own day.
#[derive(Debug, Clone, Default)]
pub struct FirstDistricts {
    per_date: bool,
    districts: HashMap<(String, String), Option<String>>,
}

impl FirstDistricts {
    pub fn new(partition: Partition) -> Self {
        Self { per_date: partition == Partition::ByDate, districts: HashMap::new() }
    }

    fn key(&self, provider_id: &str, date: &str) -> (String, String) {
        let scope = if self.per_date { date } else { "" };
        (provider_id.to_string(), scope.to_string())
    }

    /// Remember `district` unless this provider (and date) already has one.
    pub fn note(&mut self, provider_id: &str, date: &str, district: Option<String>) {
        let key = self.key(provider_id, date);
        self.districts.entry(key).or_insert(district);
    }

    /// District for a feature, from its `serviceProviderId`/`serviceDate`.
    pub fn lookup(&self, properties: &JsonObject) -> Option<&str> {
        let provider_id = properties.get("serviceProviderId")?.as_str()?;
        let date = properties.get("serviceDate").and_then(Value::as_str).unwrap_or("");
        self.districts
            .get(&self.key(provider_id, date))?
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

struct RecordContext<'a> {
    provider_id: &'a str,
    date: &'a str,
}

/// Build features, tables and summaries from already-decoded records.
///
/// Pure and deterministic: the same records and filter always produce the
/// same output.
pub fn build_service_data(
    records: &[ProviderDayRecord],
    filter: &RecordFilter,
    partition: Partition,
    config: &LayerConfig,
) -> ServiceData {
    let mut next_id: u64 = 1;
    let mut all_features: Vec<Feature> = Vec::new();
    let mut builders: HashMap<String, EntityBuilder> = HashMap::new();
    let mut first_district = FirstDistricts::new(partition);
    let mut kept = 0usize;
    let mut skipped = 0usize;

    for record in records {
        if !filter.accepts(record) {
            skipped += 1;
            continue;
        }
        let Some(provider_id) = record.service_provider_id.as_deref() else {
            debug!("[Ingest] skipping record without provider id");
            skipped += 1;
            continue;
        };
        let date = record.service_date.map(|d| d.to_string());
        let key = match (partition, &date) {
            (Partition::ByProvider, _) => provider_id.to_string(),
            (Partition::ByDate, Some(d)) => d.clone(),
            (Partition::ByDate, None) => {
                debug!("[Ingest] skipping record of {} without service date", provider_id);
                skipped += 1;
                continue;
            }
        };
        kept += 1;

        let ctx = RecordContext { provider_id, date: date.as_deref().unwrap_or("") };
        let stops = sorted_stops(record);

        first_district.note(provider_id, ctx.date, stops.first().and_then(|s| s.detail_text("鄉鎮區")));

        let builder = builders.entry(key).or_insert_with(EntityBuilder::new);
        EntityBuilder::note(&mut builder.provider_ids, provider_id);
        EntityBuilder::note(&mut builder.dates, ctx.date);

        let mut features = route_features(record, &ctx, &mut next_id);
        builder.route_count += features.len();
        features.extend(route_center_features(record, &ctx, &mut next_id));
        let stop_features = stop_features(&stops, &ctx, &mut next_id);
        builder.point_count += stop_features.len();
        features.extend(stop_features);

        match record.service_points_count {
            Some(n) => *builder.explicit_total.get_or_insert(0) += n,
            None => builder.all_records_explicit = false,
        }
        builder.counted_stops += stops.len() as u64;
        builder.traffic_minutes += stops.iter().map(|s| s.traffic_minutes()).sum::<f64>();
        if let Some(first) = stops.first() {
            if builder.first_stop.is_none() {
                builder.first_stop = Some((first.detail_text("姓名"), first.start_time()));
            }
        }
        if let Some(last) = stops.last() {
            builder.last_stop = Some((last.detail_text("姓名"), last.start_time()));
        }

        all_features.extend(features.iter().cloned());
        builder.features.extend(features);
    }

    let mut ids: Vec<String> = builders.keys().cloned().collect();
    ids.sort();

    let entities: Vec<EntityData> = ids
        .into_iter()
        .filter_map(|id| {
            let builder = builders.remove(&id)?;
            if builder.point_count == 0 {
                debug!("[Ingest] entity {} has no valid service points, no layer", id);
                return None;
            }
            Some(finish_entity(id, builder, &first_district))
        })
        .collect();

    let geo_json = FeatureCollection { bbox: None, features: all_features, foreign_members: None };
    let table_data = table_rows(&geo_json);
    let summary = summarize(&geo_json, &first_district, None);

    info!(
        "[Ingest] kept {} records ({} skipped): {} points, {} routes, {} entities",
        kept,
        skipped,
        summary.total_count,
        summary.route_count,
        entities.len()
    );

    ServiceData {
        geo_json,
        table_data,
        summary,
        entities,
        records_kept: kept,
        records_skipped: skipped,
    }
    .with_layer_names(config)
}

impl ServiceData {
    /// Stamp `layerName` on every entity's features.
    fn with_layer_names(mut self, config: &LayerConfig) -> Self {
        for entity in &mut self.entities {
            let name = config.layer_name(&entity.id);
            entity.layer_name = name.clone();
            for feature in &mut entity.geo_json.features {
                feature.set_property("layerName", name.clone());
            }
        }
        self
    }
}

fn finish_entity(id: String, builder: EntityBuilder, first_district: &FirstDistricts) -> EntityData {
    let geo_json = FeatureCollection { bbox: None, features: builder.features, foreign_members: None };

    let total_stops = match (builder.all_records_explicit, builder.explicit_total) {
        (true, Some(n)) => n,
        _ => builder.counted_stops,
    };
    let explicit_points = match (builder.all_records_explicit, builder.explicit_total) {
        (true, Some(n)) => Some(n as usize),
        _ => Some(builder.point_count),
    };

    let service_points = geo_json
        .features
        .iter()
        .filter(|f| feature_kind(f) == Some(SERVICE_POINT))
        .filter_map(|f| f.properties.as_ref())
        .map(ServicePointInfo::from_properties)
        .collect();

    let provider_summary = ProviderSummary {
        service_provider_id: builder.provider_ids.first().cloned().unwrap_or_default(),
        first_stop_name: builder.first_stop.as_ref().and_then(|(n, _)| n.clone()),
        first_stop_time: builder.first_stop.map(|(_, t)| t),
        last_stop_name: builder.last_stop.as_ref().and_then(|(n, _)| n.clone()),
        last_stop_time: builder.last_stop.map(|(_, t)| t),
        total_stops,
        traffic_minutes: builder.traffic_minutes,
        service_points,
    };

    let summary = summarize_points(&geo_json, first_district, explicit_points, Some(SERVICE_POINT));
    let table_data = table_rows(&geo_json);

    EntityData {
        layer_name: id.clone(),
        id,
        service_provider_id: single(builder.provider_ids),
        service_date: single(builder.dates),
        geo_json,
        table_data,
        summary,
        provider_summary,
        point_count: builder.point_count,
        route_count: builder.route_count,
    }
}

fn single(mut values: Vec<String>) -> Option<String> {
    (values.len() == 1 && !values[0].is_empty()).then(|| values.remove(0))
}

/// Stops with a non-empty detail object, ordered by start time.
fn sorted_stops(record: &ProviderDayRecord) -> Vec<&StopRecord> {
    let mut stops: Vec<&StopRecord> = record.data.iter().filter(|s| s.has_detail()).collect();
    let dropped = record.data.len() - stops.len();
    if dropped > 0 {
        debug!("[Ingest] {} stops without detail skipped", dropped);
    }
    stops.sort_by(|a, b| a.start_hours().total_cmp(&b.start_hours()));
    stops
}

fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

fn make_feature(value: GeoValue, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn take_id(next_id: &mut u64) -> u64 {
    let id = *next_id;
    *next_id += 1;
    id
}

/// `properties.summary.<key>`, falling back to `properties.<key>`.
fn summary_number(properties: Option<&JsonObject>, key: &str) -> Option<f64> {
    let props = properties?;
    props
        .get("summary")
        .and_then(|s| s.get(key))
        .and_then(value_to_f64)
        .or_else(|| props.get(key).and_then(value_to_f64))
}

fn route_features(record: &ProviderDayRecord, ctx: &RecordContext, next_id: &mut u64) -> Vec<Feature> {
    let mut out = Vec::new();

    for collection in &record.routes {
        let Some(items) = collection.get("features").and_then(Value::as_array) else {
            debug!("[Ingest] route collection without features array skipped");
            continue;
        };
        for item in items {
            let feature: Feature = match serde_json::from_value(item.clone()) {
                Ok(f) => f,
                Err(e) => {
                    debug!("[Ingest] malformed route feature skipped: {}", e);
                    continue;
                }
            };
            let Some(GeoValue::LineString(coords)) = feature.geometry.as_ref().map(|g| &g.value) else {
                continue;
            };
            let points: Vec<_> = coords.iter().filter_map(|p| position_to_point(p)).collect();
            if points.len() < 2 {
                continue;
            }

            let props = feature.properties.as_ref();
            let distance = summary_number(props, "distance").unwrap_or_else(|| polyline_length(&points));
            let duration = summary_number(props, "duration").unwrap_or(0.0);
            let segment_count = props
                .and_then(|p| p.get("segments"))
                .and_then(Value::as_array)
                .map(|s| s.len())
                .unwrap_or(coords.len() - 1);

            let properties = object(json!({
                "type": ROUTE,
                "id": take_id(next_id),
                "serviceProviderId": ctx.provider_id,
                "serviceDate": ctx.date,
                "distance": distance,
                "duration": duration,
                "segmentCount": segment_count,
                "routeColor": PLACEHOLDER_COLOR.token,
            }));
            out.push(make_feature(GeoValue::LineString(coords.clone()), properties));
        }
    }

    out
}

fn route_center_features(record: &ProviderDayRecord, ctx: &RecordContext, next_id: &mut u64) -> Vec<Feature> {
    let mut out = Vec::new();

    for (index, raw) in record.route_center_points.iter().enumerate() {
        let Some(point) = value_to_point(raw) else {
            debug!("[Ingest] invalid route-center point {} skipped: {}", index, raw);
            continue;
        };
        let travel_time = record
            .route_times
            .get(index)
            .and_then(Option::as_ref)
            .map(RouteTime::label)
            .unwrap_or_else(|| "N/A".to_string());

        let properties = object(json!({
            "type": ROUTE_CENTER_POINT,
            "id": take_id(next_id),
            "serviceProviderId": ctx.provider_id,
            "serviceDate": ctx.date,
            "order": index + 1,
            "travelTime": travel_time,
            "fillColor": PLACEHOLDER_COLOR.token,
        }));
        out.push(make_feature(GeoValue::Point(point.to_position()), properties));
    }

    out
}

fn stop_features(stops: &[&StopRecord], ctx: &RecordContext, next_id: &mut u64) -> Vec<Feature> {
    let mut out = Vec::new();

    for (index, stop) in stops.iter().enumerate() {
        let Some(point) = stop.location() else {
            debug!(
                "[Ingest] stop {} of {} has invalid coordinates, skipped",
                index + 1,
                ctx.provider_id
            );
            continue;
        };
        let detail = stop.detail.clone().unwrap_or_default();

        let properties = object(json!({
            "type": SERVICE_POINT,
            "id": take_id(next_id),
            "serviceProviderId": ctx.provider_id,
            "serviceDate": ctx.date,
            "order": index + 1,
            "name": stop.detail_text("姓名"),
            "gender": stop.detail_text("性別"),
            "district": stop.detail_text("鄉鎮區"),
            "village": stop.detail_text("里別"),
            "address": stop.detail_text("個案居住地址"),
            "time": stop.time_range(),
            "lat": point.latitude,
            "lon": point.longitude,
            "service_items": stop.service_items,
            "fillColor": PLACEHOLDER_COLOR.token,
            "propertyData": detail,
        }));
        out.push(make_feature(GeoValue::Point(point.to_position()), properties));
    }

    out
}

// ============================================================================
// Derived views
// ============================================================================

fn feature_kind(feature: &Feature) -> Option<&str> {
    feature.properties.as_ref()?.get("type")?.as_str()
}

fn text_property(props: &JsonObject, key: &str) -> Option<String> {
    match props.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// One row per Point feature, numbered from 1.
pub fn table_rows(collection: &FeatureCollection) -> Vec<TableRow> {
    let empty = JsonObject::new();

    collection
        .features
        .iter()
        .filter_map(|feature| {
            let Some(GeoValue::Point(position)) = feature.geometry.as_ref().map(|g| &g.value) else {
                return None;
            };
            let point = position_to_point(position)?;
            let props = feature.properties.as_ref().unwrap_or(&empty);
            let token = text_property(props, "fillColor").unwrap_or_default();
            let color = PaletteColor::from_token(&token)
                .map(|c| c.hex.to_string())
                .unwrap_or(token);

            Some(TableRow {
                index: 0,
                color,
                kind: text_property(props, "type").unwrap_or_default(),
                service_provider_id: text_property(props, "serviceProviderId"),
                service_date: text_property(props, "serviceDate"),
                name: text_property(props, "name"),
                address: text_property(props, "address"),
                district: text_property(props, "district"),
                time: text_property(props, "time"),
                order: props.get("order").and_then(Value::as_u64),
                travel_time: text_property(props, "travelTime"),
                lat: point.latitude,
                lng: point.longitude,
            })
        })
        .enumerate()
        .map(|(i, row)| TableRow { index: i + 1, ..row })
        .collect()
}

/// Point count, line count and district histogram of a collection.
///
/// Each point is attributed to the district of its provider's first stop.
/// When no point resolves a district, the histogram holds a single
/// [`UNKNOWN_DISTRICT`] bucket so the summary table is never empty.
pub fn summarize(
    collection: &FeatureCollection,
    first_district: &FirstDistricts,
    total_override: Option<usize>,
) -> SummaryData {
    summarize_points(collection, first_district, total_override, None)
}

/// [`summarize`] counting only Point features whose `type` is `kind`.
///
/// Entity summaries count service points only, so their histogram sums to
/// the layer's own points. `total_count` may still differ when the upstream
/// `service_points_count` overrides it.
fn summarize_points(
    collection: &FeatureCollection,
    first_district: &FirstDistricts,
    total_override: Option<usize>,
    kind: Option<&str>,
) -> SummaryData {
    let mut point_count = 0usize;
    let mut route_count = 0usize;
    let mut counts: HashMap<String, usize> = HashMap::new();

    for feature in &collection.features {
        match feature.geometry.as_ref().map(|g| &g.value) {
            Some(GeoValue::Point(_)) => {
                if kind.is_some() && feature_kind(feature) != kind {
                    continue;
                }
                point_count += 1;
                let district = feature.properties.as_ref().and_then(|p| first_district.lookup(p));
                if let Some(d) = district {
                    *counts.entry(d.to_string()).or_insert(0) += 1;
                }
            }
            Some(GeoValue::LineString(_)) => route_count += 1,
            _ => {}
        }
    }

    let mut district_count: Vec<DistrictCount> = counts
        .into_iter()
        .map(|(name, count)| DistrictCount { name, count })
        .collect();
    district_count.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

    if district_count.is_empty() {
        if point_count > 0 {
            warn!("[Ingest] no district resolved for {} points", point_count);
        }
        district_count.push(DistrictCount {
            name: UNKNOWN_DISTRICT.to_string(),
            count: point_count.max(1),
        });
    }

    SummaryData {
        total_count: total_override.unwrap_or(point_count),
        route_count,
        district_count,
    }
}

impl Default for ServiceData {
    fn default() -> Self {
        Self {
            geo_json: empty_collection(),
            table_data: Vec::new(),
            summary: SummaryData::default(),
            entities: Vec::new(),
            records_kept: 0,
            records_skipped: 0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

/// Three providers on 1140701 (C has no usable stop) and one on 1140702.
#[cfg(test)]
pub(crate) fn sample_dataset() -> Value {
    json!([
        {
            "服務人員身分證": "B002",
            "服務日期(請輸入7碼)": 1140701,
            "data": [
                { "hour_start": 10, "min_start": 0, "hour_end": 11, "min_end": 0,
                  "datail": { "姓名": "陳大華", "鄉鎮區": "北屯區", "個案居住地址": "臺中市北屯區文心路四段1號",
                              "Lat": "24.1820", "Lon": "120.6860" } }
            ]
        },
        {
            "服務人員身分證": "A001",
            "服務日期(請輸入7碼)": "1140701",
            "service_points_count": 3,
            "data": [
                { "hour_start": 13, "min_start": 0, "hour_end": 14, "min_end": 0,
                  "hour_traffic": 0, "min_traffic": 10,
                  "service_items": [{ "code": "BA07", "name": "協助沐浴" }],
                  "datail": { "姓名": "林阿嬤", "性別": "女", "鄉鎮區": "西屯區", "個案居住地址": "臺中市西屯區台灣大道三段99號",
                              "Lat": "24.1618", "Lon": "120.6469" } },
                { "hour_start": 8, "min_start": 30, "hour_end": 9, "min_end": 30,
                  "hour_traffic": 0, "min_traffic": 20,
                  "datail": { "姓名": "王小明", "性別": "男", "鄉鎮區": "西屯區", "個案居住地址": "臺中市西屯區市政路1號",
                              "Lat": "24.1630", "Lon": "120.6410" } },
                { "hour_start": 11, "min_start": 0,
                  "datail": { "姓名": "無座標", "鄉鎮區": "西屯區", "Lat": "N/A", "Lon": "" } },
                { "hour_start": 7, "min_start": 0 }
            ],
            "routes": [{
                "type": "FeatureCollection",
                "features": [
                    { "type": "Feature",
                      "geometry": { "type": "LineString", "coordinates": [[120.6410, 24.1630], [120.6469, 24.1618]] },
                      "properties": { "summary": { "distance": 812.5, "duration": 240.0 }, "segments": [{}, {}] } },
                    { "type": "Feature",
                      "geometry": { "type": "Point", "coordinates": [120.6410, 24.1630] },
                      "properties": {} }
                ]
            }],
            "route_center_points": [[120.6440, 24.1624], ["abc", 24.0]],
            "route_times": [{ "hour": 0, "min": 12 }]
        },
        {
            "服務人員身分證": "C003",
            "服務日期(請輸入7碼)": 1140701,
            "data": [
                { "hour_start": 9, "datail": { "姓名": "壞座標", "Lat": "999", "Lon": "120.6" } },
                { "hour_start": 10, "datail": {} }
            ]
        },
        {
            "服務人員身分證": "A001",
            "服務日期(請輸入7碼)": 1140702,
            "data": [
                { "hour_start": 9, "min_start": 0, "hour_end": 10, "min_end": 0,
                  "datail": { "姓名": "張先生", "鄉鎮區": "南屯區", "Lat": 24.1400, "Lon": 120.6300 } }
            ]
        }
    ])
}
