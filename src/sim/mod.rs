//! In-process stand-ins for every platform capability.
//!
//! Used by the command-line driver to run a screen session without a device,
//! and by the tests. Every adapter writes into shared state that the
//! [`SimPlatform`] handle can inspect afterwards.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::KnownPlace;
use crate::platform::{
    Address, Fix, GeocodeError, Geocoder, LatLng, LocationError, LocationProvider,
    LocationRequest, LocationSettings, MapError, MapSurface, PermissionScope, PermissionState,
    PermissionSystem, PlaceLabel, Platform,
};
use crate::presenter::{ListSurface, MarkerRow};
use crate::screen::{EventSink, ScreenEvent, ScreenView};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What the simulated map currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapState {
    pub resumed: bool,
    pub camera: Option<(LatLng, f32)>,
    pub camera_moves: Vec<(LatLng, f32)>,
    pub markers: Vec<(LatLng, String)>,
    pub my_location_enabled: bool,
    pub my_location_button_enabled: bool,
}

#[derive(Debug, Default)]
struct ProviderState {
    active: bool,
    request: Option<LocationRequest>,
    sink: Option<EventSink>,
}

/// Builder and inspection handle for a simulated device.
#[derive(Debug, Clone)]
pub struct SimPlatform {
    places: Arc<Vec<KnownPlace>>,
    permission: Arc<AtomicBool>,
    answer: bool,
    services_enabled: bool,
    offline: Arc<AtomicBool>,
    prompts: Arc<AtomicUsize>,
    settings_opened: Arc<AtomicUsize>,
    provider: Arc<Mutex<ProviderState>>,
    map: Arc<Mutex<MapState>>,
    rows: Arc<Mutex<Vec<MarkerRow>>>,
    label: Arc<Mutex<String>>,
}

impl SimPlatform {
    /// A device with location services on, no permission yet, and a prompt
    /// the user accepts.
    pub fn new(places: Vec<KnownPlace>) -> Self {
        Self {
            places: Arc::new(places),
            permission: Arc::new(AtomicBool::new(false)),
            answer: true,
            services_enabled: true,
            offline: Arc::new(AtomicBool::new(false)),
            prompts: Arc::new(AtomicUsize::new(0)),
            settings_opened: Arc::new(AtomicUsize::new(0)),
            provider: Arc::default(),
            map: Arc::default(),
            rows: Arc::default(),
            label: Arc::default(),
        }
    }

    /// Whether permission is already granted before the screen asks.
    pub fn with_permission(self, granted: bool) -> Self {
        self.permission.store(granted, Ordering::SeqCst);
        self
    }

    /// How the user answers the permission prompt.
    pub fn answer_permission(mut self, accept: bool) -> Self {
        self.answer = accept;
        self
    }

    pub fn services_enabled(mut self, enabled: bool) -> Self {
        self.services_enabled = enabled;
        self
    }

    pub fn geocoder_offline(self, offline: bool) -> Self {
        self.offline.store(offline, Ordering::SeqCst);
        self
    }

    pub fn platform(&self) -> Platform {
        Platform {
            location: Box::new(SimLocation {
                permission: Arc::clone(&self.permission),
                state: Arc::clone(&self.provider),
            }),
            settings: Box::new(SimSettings {
                enabled: self.services_enabled,
                opened: Arc::clone(&self.settings_opened),
            }),
            permissions: Box::new(SimPermissions {
                granted: Arc::clone(&self.permission),
                answer: self.answer,
                prompts: Arc::clone(&self.prompts),
            }),
            geocoder: Arc::new(ScriptedGeocoder {
                places: Arc::clone(&self.places),
                offline: Arc::clone(&self.offline),
            }),
        }
    }

    pub fn view(&self) -> ScreenView {
        ScreenView {
            list: Box::new(SimList {
                rows: Arc::clone(&self.rows),
            }),
            label: Box::new(SimLabel {
                text: Arc::clone(&self.label),
            }),
        }
    }

    pub fn map(&self) -> Box<dyn MapSurface> {
        Box::new(SimMap {
            permission: Arc::clone(&self.permission),
            state: Arc::clone(&self.map),
        })
    }

    /// Reports a fix to the active subscription. Returns false when nobody is
    /// subscribed.
    pub fn deliver_fix(&self, at: LatLng) -> bool {
        let state = lock(&self.provider);
        match (&state.sink, state.active) {
            (Some(sink), true) => {
                sink.send(ScreenEvent::LocationResult(Some(Fix::now(at, 5.0))));
                true
            }
            _ => false,
        }
    }

    pub fn revoke_permission(&self) {
        self.permission.store(false, Ordering::SeqCst);
    }

    pub fn location_active(&self) -> bool {
        lock(&self.provider).active
    }

    pub fn location_request(&self) -> Option<LocationRequest> {
        lock(&self.provider).request.clone()
    }

    pub fn permission_prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn settings_opened(&self) -> usize {
        self.settings_opened.load(Ordering::SeqCst)
    }

    pub fn map_state(&self) -> MapState {
        lock(&self.map).clone()
    }

    pub fn rows(&self) -> Vec<MarkerRow> {
        lock(&self.rows).clone()
    }

    pub fn label(&self) -> String {
        lock(&self.label).clone()
    }
}

struct SimLocation {
    permission: Arc<AtomicBool>,
    state: Arc<Mutex<ProviderState>>,
}

impl LocationProvider for SimLocation {
    fn request_updates(
        &mut self,
        request: &LocationRequest,
        sink: EventSink,
    ) -> Result<(), LocationError> {
        if !self.permission.load(Ordering::SeqCst) {
            return Err(LocationError::Security(
                "location updates require location permission".to_string(),
            ));
        }

        let mut state = lock(&self.state);
        state.active = true;
        state.request = Some(request.clone());
        state.sink = Some(sink);
        Ok(())
    }

    fn remove_updates(&mut self) {
        let mut state = lock(&self.state);
        state.active = false;
        state.sink = None;
    }
}

struct SimSettings {
    enabled: bool,
    opened: Arc<AtomicUsize>,
}

impl LocationSettings for SimSettings {
    fn services_enabled(&self) -> bool {
        self.enabled
    }

    fn open_settings(&mut self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }
}

struct SimPermissions {
    granted: Arc<AtomicBool>,
    answer: bool,
    prompts: Arc<AtomicUsize>,
}

impl PermissionSystem for SimPermissions {
    fn check(&self, _scope: PermissionScope) -> PermissionState {
        if self.granted.load(Ordering::SeqCst) {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }

    fn request(&mut self, scopes: &[PermissionScope], sink: EventSink) {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.granted.store(self.answer, Ordering::SeqCst);

        let grants: BTreeMap<_, _> = scopes.iter().map(|&scope| (scope, self.answer)).collect();
        sink.send(ScreenEvent::PermissionsResult(grants));
    }
}

struct SimMap {
    permission: Arc<AtomicBool>,
    state: Arc<Mutex<MapState>>,
}

impl SimMap {
    fn check_permission(&self, enabling: bool, what: &str) -> Result<(), MapError> {
        if enabling && !self.permission.load(Ordering::SeqCst) {
            return Err(MapError::Security(format!(
                "{what} requires location permission"
            )));
        }
        Ok(())
    }
}

impl MapSurface for SimMap {
    fn resume(&mut self) {
        lock(&self.state).resumed = true;
    }

    fn add_marker(&mut self, at: LatLng, title: &str) {
        lock(&self.state).markers.push((at, title.to_string()));
    }

    fn move_camera(&mut self, target: LatLng, zoom: f32) {
        let mut state = lock(&self.state);
        state.camera = Some((target, zoom));
        state.camera_moves.push((target, zoom));
    }

    fn set_my_location_enabled(&mut self, enabled: bool) -> Result<(), MapError> {
        self.check_permission(enabled, "my-location layer")?;
        lock(&self.state).my_location_enabled = enabled;
        Ok(())
    }

    fn set_my_location_button_enabled(&mut self, enabled: bool) -> Result<(), MapError> {
        self.check_permission(enabled, "my-location button")?;
        lock(&self.state).my_location_button_enabled = enabled;
        Ok(())
    }
}

/// Answers from a fixed table of places matched on exact coordinates.
struct ScriptedGeocoder {
    places: Arc<Vec<KnownPlace>>,
    offline: Arc<AtomicBool>,
}

impl Geocoder for ScriptedGeocoder {
    fn from_location(
        &self,
        at: LatLng,
        max_results: usize,
    ) -> Result<Vec<Address>, GeocodeError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "geocoder service unreachable").into());
        }

        Ok(self
            .places
            .iter()
            .filter(|place| place.position() == at)
            .take(max_results)
            .map(|place| place.address.clone())
            .collect())
    }
}

struct SimList {
    rows: Arc<Mutex<Vec<MarkerRow>>>,
}

impl ListSurface for SimList {
    fn insert_row(&mut self, index: usize, row: MarkerRow) {
        lock(&self.rows).insert(index, row);
    }

    fn remove_row(&mut self, index: usize) {
        lock(&self.rows).remove(index);
    }

    fn update_row(&mut self, index: usize, row: MarkerRow) {
        if let Some(slot) = lock(&self.rows).get_mut(index) {
            *slot = row;
        }
    }
}

struct SimLabel {
    text: Arc<Mutex<String>>,
}

impl PlaceLabel for SimLabel {
    fn set_text(&mut self, text: &str) {
        *lock(&self.text) = text.to_string();
    }
}
