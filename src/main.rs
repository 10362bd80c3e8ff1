use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use markmap::{
    config::ScreenConfig,
    platform::LatLng,
    screen::{MapScreen, ScreenEvent},
    sim::SimPlatform,
};

const DEFAULT_CONFIG: &str = "markmap.yaml";

#[derive(Parser)]
#[command(name = "markmap")]
#[command(about = "Run one map screen session against a simulated device")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: Utf8PathBuf,

    /// Refuse the location permission prompt
    #[arg(long)]
    deny_permission: bool,

    /// Start with location services switched off
    #[arg(long)]
    services_disabled: bool,

    /// Location fix reported by the device (repeatable)
    #[arg(long = "fix", value_name = "LAT,LNG", value_parser = parse_lat_lng, allow_hyphen_values = true)]
    fixes: Vec<LatLng>,

    /// Map tap (repeatable)
    #[arg(long = "tap", value_name = "LAT,LNG", value_parser = parse_lat_lng, allow_hyphen_values = true)]
    taps: Vec<LatLng>,

    /// Make every geocoder lookup fail with an I/O error
    #[arg(long)]
    geocoder_offline: bool,

    /// Print the final markers as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(&args.config)?;

    let sim = SimPlatform::new(config.places.clone())
        .answer_permission(!args.deny_permission)
        .services_enabled(!args.services_disabled)
        .geocoder_offline(args.geocoder_offline);

    let (mut screen, mut events) = MapScreen::new(sim.platform(), config);

    screen.handle(ScreenEvent::ViewCreated(sim.view()))?;
    screen.handle(ScreenEvent::MapReady(sim.map()))?;
    screen.settle(&mut events).await?;

    println!("🗺️  Location: {:?}", screen.location_state());

    for fix in &args.fixes {
        if sim.deliver_fix(*fix) {
            println!("📡 Fix at {fix}");
        } else {
            println!("⚠️  No active location subscription; fix at {fix} dropped");
        }
        screen.settle(&mut events).await?;
    }

    for tap in &args.taps {
        screen.handle(ScreenEvent::MapTapped(*tap))?;
    }
    screen.settle(&mut events).await?;

    let map = sim.map_state();
    match map.camera {
        Some((target, zoom)) => println!("📍 Camera: {target} zoom {zoom}"),
        None => println!("📍 Camera: not moved"),
    }
    println!(
        "   My location: {}",
        if map.my_location_button_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    let markers = screen.markers();
    if args.json {
        let json =
            serde_json::to_string_pretty(&markers).context("Failed to serialize markers")?;
        println!("{json}");
    } else {
        println!("\n📋 Markers ({}):", markers.len());
        for row in sim.rows() {
            for line in row.lines() {
                println!("   {line}");
            }
            println!();
        }
        println!("🏷️  {}", sim.label());
    }

    screen.handle(ScreenEvent::ViewDestroyed)?;

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: &Utf8Path) -> Result<ScreenConfig> {
    if !path.exists() && path.as_str() == DEFAULT_CONFIG {
        tracing::info!("no {DEFAULT_CONFIG} found; using defaults");
        return Ok(ScreenConfig::default());
    }

    ScreenConfig::load(path)
}

fn parse_lat_lng(value: &str) -> Result<LatLng, String> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got '{value}'"))?;

    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
    let longitude: f64 = lng
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude '{lng}': {e}"))?;

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("coordinate out of range: {value}"));
    }

    Ok(LatLng::new(latitude, longitude))
}
