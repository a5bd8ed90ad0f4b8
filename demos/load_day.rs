//! Load one service day from a local data directory and query around a point.
//!
//! ```text
//! cargo run --example load_day -- <data-dir> [date] [lat] [lng]
//! RUST_LOG=debug cargo run --example load_day -- ./data 1140701 24.1618 120.6469
//! cargo run --features http --example load_day -- https://host/data/geojson
//! ```

use care_layers::{Dashboard, DashboardConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .without_time()
        .init();

    let mut args = std::env::args().skip(1);
    let Some(data_dir) = args.next() else {
        eprintln!("usage: load_day <data-dir|url> [date] [lat] [lng]");
        std::process::exit(2);
    };
    let date = args.next();
    let lat: f64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(24.1477);
    let lng: f64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(120.6736);

    let config = DashboardConfig { base_path: data_dir, ..DashboardConfig::default() };
    let group = config.service_layer.group_name.clone();
    let dashboard = Dashboard::from_config(config)?;

    let count = dashboard.load_service_provider_layers(date.as_deref()).await?;
    println!("{} provider layers", count);

    {
        let store = dashboard.store();
        let mut store = store.lock().await;
        for layer in store.get_all_layers() {
            println!(
                "  {:<32} {:<14} {:>4} points {:>3} routes",
                layer.layer_id,
                layer.color_name,
                layer.summary_data.total_count,
                layer.summary_data.route_count
            );
        }
        store.toggle_group_visibility(&group);
    }

    let hits = dashboard.points_in_range(lat, lng, None).await;
    println!("{} points within {}m of ({}, {})", hits.len(), dashboard.config().default_radius_meters, lat, lng);
    for hit in hits.iter().take(10) {
        let name = hit
            .feature
            .property("name")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        println!("  {:>6}m  {:<28} {}", hit.distance, hit.layer_name, name);
    }

    Ok(())
}
