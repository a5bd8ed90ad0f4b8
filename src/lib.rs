//! # Care Layers
//!
//! Service-record ingestion, map-layer state and spatial range queries for a
//! long-term-care resource map.
//!
//! This library provides:
//! - Ingestion of per-provider daily service records into GeoJSON point/line
//!   features, table rows and summary statistics
//! - A layer store (groups of layers with visibility, load state, filters and
//!   round-robin palette colors) with a stale-response guard for async loads
//! - Circle range queries over the visible point and polygon layers
//!
//! ## Features
//!
//! - **`http`** - Enable the reqwest-backed [`HttpSource`]
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use care_layers::{build_service_data, parse_records, LayerConfig, LayerStore, Partition, RecordFilter};
//!
//! let json = r#"[{
//!     "服務人員身分證": "A001",
//!     "服務日期(請輸入7碼)": 1140701,
//!     "data": [{
//!         "hour_start": 8, "min_start": 30,
//!         "datail": { "姓名": "王小明", "鄉鎮區": "西屯區", "Lat": "24.1618", "Lon": "120.6469" }
//!     }]
//! }]"#;
//!
//! let records = parse_records(json.as_bytes()).unwrap();
//! let data = build_service_data(
//!     &records,
//!     &RecordFilter::Date(1140701),
//!     Partition::ByProvider,
//!     &LayerConfig::default(),
//! );
//! assert_eq!(data.entities.len(), 1);
//!
//! let mut store = LayerStore::new();
//! let ticket = store.begin_load("新基準中央服務紀錄");
//! let count = store.apply_service_provider_layers(ticket, "1140701", Ok(data)).unwrap();
//! assert_eq!(count, 1);
//! assert!(store.find_layer_by_id("service-provider-A001").is_some());
//! ```

use serde::{Deserialize, Serialize};

pub mod config;
pub mod dashboard;
pub mod detail;
pub mod error;
pub mod geo_utils;
pub mod ingest;
pub mod layers;
pub mod palette;
pub mod persist;
pub mod range;
pub mod records;
pub mod source;
pub mod store;

pub use config::{DashboardConfig, LayerConfig};
pub use dashboard::Dashboard;
pub use detail::{create_service_items_data, ServiceItemsData, ServicePointInfo};
pub use error::{LoadError, StorageError, StoreError};
pub use ingest::{
    build_service_data, load_provider_service_data, load_service_data, parse_records,
    EntityData, Partition, ProviderSummary, RecordFilter, ServiceData,
};
pub use layers::{
    DistrictCount, GroupLoadState, Layer, LayerGroup, LayerType, SummaryData, TableRow,
};
pub use palette::{assign_colors, ColorPolicy, PaletteColor, COLOR_PALETTE};
pub use persist::{FileStorage, MemoryStorage, SnapshotStorage};
pub use range::{points_in_range, polygons_in_range, OverlapMode, OverlapType, PointHit, PolygonHit};
pub use records::{ProviderDayRecord, StopRecord};
pub use source::{source_for_base, DataSource, FileSource, MemorySource};
pub use store::{FilterMode, FilterState, LayerStore, LoadTicket};

#[cfg(feature = "http")]
pub use source::HttpSource;

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use care_layers::GpsPoint;
/// let point = GpsPoint::new(24.1477, 120.6736); // Taichung
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has finite, in-range coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// GeoJSON position (`[lng, lat]`).
    pub fn to_position(&self) -> Vec<f64> {
        vec![self.longitude, self.latitude]
    }
}

/// Axis-aligned lat/lng bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(24.1477, 120.6736).is_valid());
        assert!(GpsPoint::new(-90.0, 180.0).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_to_position() {
        assert_eq!(GpsPoint::new(24.5, 120.5).to_position(), vec![120.5, 24.5]);
    }
}
