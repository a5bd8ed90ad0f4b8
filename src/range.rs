//! Circle range queries over the visible point and polygon layers.
//!
//! Only layers that are visible, loaded and not analysis overlays are
//! scanned. Point candidates go through an R-tree envelope prefilter, then
//! the exact haversine test (`distance <= radius`, inclusive).

use geojson::{Feature, Value as GeoValue};
use log::debug;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::geo_utils::{
    haversine_distance, polygon_contains_point, polygon_edge_in_circle, polygon_vertex_in_circle,
    position_to_point, search_envelope,
};
use crate::layers::{Layer, LayerType};
use crate::GpsPoint;

/// How a polygon is tested against the search circle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlapMode {
    /// In range iff some ring vertex lies inside the circle.
    #[default]
    VertexOnly,
    /// Vertex test, plus polygons containing the center or with an edge
    /// passing through the circle.
    Exact,
}

/// Relation reported for a matching polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapType {
    Intersects,
}

/// A point feature within the radius.
#[derive(Debug, Clone, PartialEq)]
pub struct PointHit {
    /// Copy of the feature with `layerId`, `layerName` and `distance` added.
    pub feature: Feature,
    pub layer_id: String,
    pub layer_name: String,
    /// Meters, rounded.
    pub distance: u64,
}

/// A polygon feature overlapping the circle.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonHit {
    /// Copy of the feature with `layerId`, `layerName` and `overlapType` added.
    pub feature: Feature,
    pub layer_id: String,
    pub layer_name: String,
    pub overlap_type: OverlapType,
}

/// A candidate point keyed by scan order
#[derive(Debug, Clone, Copy)]
struct IndexedFeature {
    scan: usize,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

/// Point features of `layers` within `radius_meters` of the center, nearest first.
///
/// Ties keep scan order (layer order, then feature order). A negative or
/// non-finite radius matches nothing.
pub fn points_in_range<'a, I>(layers: I, center_lat: f64, center_lng: f64, radius_meters: f64) -> Vec<PointHit>
where
    I: IntoIterator<Item = &'a Layer>,
{
    let center = GpsPoint::new(center_lat, center_lng);
    if !center.is_valid() || !radius_meters.is_finite() || radius_meters < 0.0 {
        return Vec::new();
    }

    let mut candidates: Vec<(&Layer, &Feature)> = Vec::new();
    let mut indexed: Vec<IndexedFeature> = Vec::new();

    for layer in layers
        .into_iter()
        .filter(|l| l.is_queryable() && l.layer_type == LayerType::Point)
    {
        for feature in &layer.geo_json_data.features {
            let Some(GeoValue::Point(position)) = feature.geometry.as_ref().map(|g| &g.value) else {
                continue;
            };
            let Some(point) = position_to_point(position) else {
                continue;
            };
            indexed.push(IndexedFeature {
                scan: candidates.len(),
                lat: point.latitude,
                lng: point.longitude,
            });
            candidates.push((layer, feature));
        }
    }

    let tree = RTree::bulk_load(indexed);
    let bounds = search_envelope(&center, radius_meters);
    let envelope = AABB::from_corners([bounds.min_lat, bounds.min_lng], [bounds.max_lat, bounds.max_lng]);

    let mut matches: Vec<(f64, usize)> = tree
        .locate_in_envelope(&envelope)
        .filter_map(|c| {
            let distance = haversine_distance(&center, &GpsPoint::new(c.lat, c.lng));
            (distance <= radius_meters).then_some((distance, c.scan))
        })
        .collect();
    matches.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    debug!(
        "[Range] {} of {} points within {:.0}m of ({:.5}, {:.5})",
        matches.len(),
        candidates.len(),
        radius_meters,
        center_lat,
        center_lng
    );

    matches
        .into_iter()
        .map(|(distance, scan)| {
            let (layer, feature) = candidates[scan];
            let distance = distance.round() as u64;
            let mut feature = feature.clone();
            feature.set_property("layerId", layer.layer_id.clone());
            feature.set_property("layerName", layer.layer_name.clone());
            feature.set_property("distance", distance);
            PointHit {
                feature,
                layer_id: layer.layer_id.clone(),
                layer_name: layer.layer_name.clone(),
                distance,
            }
        })
        .collect()
}

/// Polygon features of `layers` overlapping the circle, in scan order.
pub fn polygons_in_range<'a, I>(
    layers: I,
    center_lat: f64,
    center_lng: f64,
    radius_meters: f64,
    mode: OverlapMode,
) -> Vec<PolygonHit>
where
    I: IntoIterator<Item = &'a Layer>,
{
    let center = GpsPoint::new(center_lat, center_lng);
    if !center.is_valid() || !radius_meters.is_finite() || radius_meters < 0.0 {
        return Vec::new();
    }

    let mut hits = Vec::new();

    for layer in layers
        .into_iter()
        .filter(|l| l.is_queryable() && l.layer_type == LayerType::Polygon)
    {
        for feature in &layer.geo_json_data.features {
            let polygons: Vec<&Vec<Vec<Vec<f64>>>> = match feature.geometry.as_ref().map(|g| &g.value) {
                Some(GeoValue::Polygon(rings)) => vec![rings],
                Some(GeoValue::MultiPolygon(parts)) => parts.iter().collect(),
                _ => continue,
            };

            let overlaps = polygons.iter().any(|rings| match mode {
                OverlapMode::VertexOnly => polygon_vertex_in_circle(rings, &center, radius_meters),
                OverlapMode::Exact => {
                    polygon_vertex_in_circle(rings, &center, radius_meters)
                        || polygon_contains_point(rings, &center)
                        || polygon_edge_in_circle(rings, &center, radius_meters)
                }
            });
            if !overlaps {
                continue;
            }

            let mut feature = feature.clone();
            feature.set_property("layerId", layer.layer_id.clone());
            feature.set_property("layerName", layer.layer_name.clone());
            feature.set_property("overlapType", "intersects");
            hits.push(PolygonHit {
                feature,
                layer_id: layer.layer_id.clone(),
                layer_name: layer.layer_name.clone(),
                overlap_type: OverlapType::Intersects,
            });
        }
    }

    debug!("[Range] {} polygons overlap {:.0}m circle ({:?})", hits.len(), radius_meters, mode);
    hits
}
