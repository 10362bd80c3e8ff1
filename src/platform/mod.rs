//! Capabilities the map screen consumes from the host platform.
//!
//! Everything here is a seam: the screen controller only talks to these
//! traits, and results that the platform produces asynchronously (location
//! fixes, permission answers, taps) come back as [`ScreenEvent`]s through an
//! [`EventSink`].
//!
//! [`ScreenEvent`]: crate::screen::ScreenEvent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::screen::EventSink;

/// A point on the map in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?})", self.latitude, self.longitude)
    }
}

/// A single reported device location.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    pub position: LatLng,
    pub accuracy_m: f32,
    pub time: DateTime<Utc>,
}

impl Fix {
    pub fn now(position: LatLng, accuracy_m: f32) -> Self {
        Self {
            position,
            accuracy_m,
            time: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    HighAccuracy,
    Balanced,
    LowPower,
    Passive,
}

/// How often and how precisely location updates are wanted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRequest {
    pub priority: Priority,
    pub interval: Duration,
    /// Fastest rate the screen accepts updates at, when faster than `interval`.
    pub min_interval: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    FineLocation,
    CoarseLocation,
}

/// Both scopes the screen asks for, in prompt order.
pub const LOCATION_SCOPES: [PermissionScope; 2] =
    [PermissionScope::FineLocation, PermissionScope::CoarseLocation];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
}

/// Per-scope answer to a permission prompt.
pub type PermissionGrants = BTreeMap<PermissionScope, bool>;

/// One candidate returned by the geocoder, best match first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub address_lines: Vec<String>,
    #[serde(default)]
    pub feature_name: Option<String>,
}

impl Address {
    pub fn address_line(&self, index: usize) -> Option<&str> {
        self.address_lines.get(index).map(String::as_str)
    }
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("security fault: {0}")]
    Security(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("security fault: {0}")]
    Security(String),
}

pub trait LocationProvider: Send {
    /// Starts delivering `ScreenEvent::LocationResult`s into `sink`.
    fn request_updates(
        &mut self,
        request: &LocationRequest,
        sink: EventSink,
    ) -> Result<(), LocationError>;

    fn remove_updates(&mut self);
}

pub trait LocationSettings: Send {
    /// True when either the GPS or the network provider is on.
    fn services_enabled(&self) -> bool;

    /// Sends the user to the system location settings. Does not wait.
    fn open_settings(&mut self);
}

pub trait PermissionSystem: Send {
    fn check(&self, scope: PermissionScope) -> PermissionState;

    /// Prompts for all `scopes` at once. The answer arrives later as
    /// `ScreenEvent::PermissionsResult`.
    fn request(&mut self, scopes: &[PermissionScope], sink: EventSink);
}

pub trait MapSurface: Send {
    fn resume(&mut self);

    fn add_marker(&mut self, at: LatLng, title: &str);

    fn move_camera(&mut self, target: LatLng, zoom: f32);

    /// Toggles the "my location" layer. Gated on location permission.
    fn set_my_location_enabled(&mut self, enabled: bool) -> Result<(), MapError>;

    /// Toggles the "my location" button. Gated on location permission.
    fn set_my_location_button_enabled(&mut self, enabled: bool) -> Result<(), MapError>;
}

/// Reverse geocoding. Called from a blocking background thread.
pub trait Geocoder: Send + Sync {
    fn from_location(
        &self,
        at: LatLng,
        max_results: usize,
    ) -> Result<Vec<Address>, GeocodeError>;
}

/// The single-line label under the map showing the last resolved place.
pub trait PlaceLabel: Send {
    fn set_text(&mut self, text: &str);
}

/// Platform services owned by the screen for its whole life.
pub struct Platform {
    pub location: Box<dyn LocationProvider>,
    pub settings: Box<dyn LocationSettings>,
    pub permissions: Box<dyn PermissionSystem>,
    pub geocoder: Arc<dyn Geocoder>,
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
