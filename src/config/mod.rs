use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::platform::{Address, LatLng, LocationRequest, Priority};

/// Shown when no location fix is available or permission was refused.
pub const DEFAULT_LOCATION: LatLng = LatLng::new(-33.8523341, 151.2106085);
pub const DEFAULT_ZOOM: f32 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub default_location: LatLng,
    pub default_zoom: f32,
    pub location_request: LocationRequestConfig,
    pub geocoder: GeocoderConfig,
    /// Known addresses for the scripted geocoder.
    pub places: Vec<KnownPlace>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            default_location: DEFAULT_LOCATION,
            default_zoom: DEFAULT_ZOOM,
            location_request: LocationRequestConfig::default(),
            geocoder: GeocoderConfig::default(),
            places: Vec::new(),
        }
    }
}

impl ScreenConfig {
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;

        Self::from_yaml(&content).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let LatLng {
            latitude,
            longitude,
        } = self.default_location;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            anyhow::bail!("default_location out of range: {}", self.default_location);
        }
        if !(self.default_zoom.is_finite() && self.default_zoom > 0.0) {
            anyhow::bail!("default_zoom must be positive, got {}", self.default_zoom);
        }
        if self.location_request.interval_ms == 0 {
            anyhow::bail!("location_request.interval_ms must be non-zero");
        }
        if self.geocoder.max_results == 0 {
            anyhow::bail!("geocoder.max_results must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRequestConfig {
    pub priority: Priority,
    pub interval_ms: u64,
    pub min_interval_ms: Option<u64>,
}

impl Default for LocationRequestConfig {
    fn default() -> Self {
        Self {
            priority: Priority::HighAccuracy,
            interval_ms: 10_000,
            min_interval_ms: None,
        }
    }
}

impl LocationRequestConfig {
    pub fn to_request(&self) -> LocationRequest {
        LocationRequest {
            priority: self.priority,
            interval: Duration::from_millis(self.interval_ms),
            min_interval: self
                .min_interval_ms
                .filter(|&ms| ms < self.interval_ms)
                .map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub max_results: usize,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self { max_results: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownPlace {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub address: Address,
}

impl KnownPlace {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = ScreenConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ScreenConfig::default());
        assert_eq!(config.default_location, DEFAULT_LOCATION);
        assert_eq!(config.default_zoom, 15.0);
        assert_eq!(config.location_request.interval_ms, 10_000);
        assert_eq!(config.geocoder.max_results, 1);
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
default_location: { latitude: 48.8584, longitude: 2.2945 }
default_zoom: 12.5
location_request:
  priority: balanced
  interval_ms: 10000
  min_interval_ms: 5000
geocoder:
  max_results: 3
places:
  - latitude: 1.0
    longitude: 2.0
    address_lines: ["1 Example St", "Exampleton"]
    feature_name: Example Park
"#;
        let config = ScreenConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.default_location, LatLng::new(48.8584, 2.2945));
        assert_eq!(config.geocoder.max_results, 3);
        assert_eq!(config.places.len(), 1);
        assert_eq!(config.places[0].position(), LatLng::new(1.0, 2.0));
        assert_eq!(
            config.places[0].address.feature_name.as_deref(),
            Some("Example Park")
        );

        let request = config.location_request.to_request();
        assert_eq!(request.priority, Priority::Balanced);
        assert_eq!(request.interval, Duration::from_secs(10));
        assert_eq!(request.min_interval, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_min_interval_not_faster_is_dropped() {
        let config = LocationRequestConfig {
            min_interval_ms: Some(20_000),
            ..Default::default()
        };
        assert_eq!(config.to_request().min_interval, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ScreenConfig::from_yaml("default_zoom: 0").is_err());
        assert!(ScreenConfig::from_yaml("geocoder: { max_results: 0 }").is_err());
        assert!(
            ScreenConfig::from_yaml("default_location: { latitude: 91.0, longitude: 0.0 }")
                .is_err()
        );
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = ScreenConfig::load(Utf8Path::new("does/not/exist.yaml")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.yaml"));
    }
}
