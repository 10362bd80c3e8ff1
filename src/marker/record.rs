use serde::Serialize;

use crate::platform::{Address, LatLng};

pub const UNKNOWN_ADDRESS: &str = "Unknown Address";
pub const UNKNOWN_PLACE: &str = "Unknown Place";

/// One point the user tapped, with whatever the geocoder said about it.
///
/// Records are never mutated after construction; fields are only readable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerRecord {
    latitude: f64,
    longitude: f64,
    address: String,
    place_name: String,
}

impl MarkerRecord {
    pub fn new(at: LatLng, address: impl Into<String>, place_name: impl Into<String>) -> Self {
        Self {
            latitude: at.latitude,
            longitude: at.longitude,
            address: address.into(),
            place_name: place_name.into(),
        }
    }

    /// Builds a record from ranked geocoder candidates.
    ///
    /// Only the first candidate is consulted: its first address line and its
    /// feature name. Anything missing falls back to the placeholder texts.
    pub fn from_candidates(at: LatLng, candidates: &[Address]) -> Self {
        let best = candidates.first();
        let address = best
            .and_then(|a| a.address_line(0))
            .unwrap_or(UNKNOWN_ADDRESS);
        let place_name = best
            .and_then(|a| a.feature_name.as_deref())
            .unwrap_or(UNKNOWN_PLACE);

        Self::new(at, address, place_name)
    }

    pub fn unresolved(at: LatLng) -> Self {
        Self::new(at, UNKNOWN_ADDRESS, UNKNOWN_PLACE)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn place_name(&self) -> &str {
        &self.place_name
    }

    /// Same marker means same coordinates, regardless of the resolved text.
    pub fn same_marker(&self, other: &Self) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}
