//! The map screen controller.
//!
//! [`MapScreen`] owns the marker store, the location flow and the map for the
//! life of one screen. It is driven by [`ScreenEvent`]s on a single task; the
//! only work done elsewhere is the geocoder lookup, which runs on the
//! blocking pool and reports back through the event queue.

mod event;
mod state;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, info, warn};

use crate::config::ScreenConfig;
use crate::marker::{MarkerRecord, MarkerSequence, MarkerStore, SubscriptionId};
use crate::platform::{
    Address, Fix, LOCATION_SCOPES, LatLng, LocationRequest, MapSurface, PermissionGrants,
    PermissionState, PlaceLabel, Platform,
};
use crate::presenter::ListPresenter;

pub use event::{EventSink, ScreenEvent, ScreenView};
pub use state::LocationState;

use state::Lookups;

/// Title of the marker dropped on every tap.
pub const MARKER_TITLE: &str = "Marker";

/// Misuse of the screen lifecycle. These end the event loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScreenError {
    #[error("view accessed before it was created or after it was destroyed")]
    ViewNotBound,
    #[error("view created while a previous one is still bound")]
    ViewAlreadyBound,
    #[error("map tapped before the map was ready")]
    MapNotReady,
}

struct BoundView {
    label: Box<dyn PlaceLabel>,
    subscription: SubscriptionId,
}

pub struct MapScreen {
    platform: Platform,
    config: ScreenConfig,
    request: LocationRequest,
    store: MarkerStore,
    sink: EventSink,
    location: LocationState,
    current_location: Option<Fix>,
    permission_granted: bool,
    subscribed: bool,
    view: Option<BoundView>,
    map: Option<Box<dyn MapSurface>>,
    map_was_ready: bool,
    lookups: Lookups,
    closing: bool,
}

impl MapScreen {
    /// Creates the screen and the queue its events arrive on.
    pub fn new(platform: Platform, config: ScreenConfig) -> (Self, UnboundedReceiver<ScreenEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let request = config.location_request.to_request();

        let screen = Self {
            platform,
            config,
            request,
            store: MarkerStore::new(),
            sink: EventSink::new(tx),
            location: LocationState::Uninitialized,
            current_location: None,
            permission_granted: false,
            subscribed: false,
            view: None,
            map: None,
            map_was_ready: false,
            lookups: Lookups::default(),
            closing: false,
        };

        (screen, rx)
    }

    pub fn sink(&self) -> EventSink {
        self.sink.clone()
    }

    pub fn markers(&self) -> MarkerSequence {
        self.store.snapshot()
    }

    pub fn location_state(&self) -> LocationState {
        self.location
    }

    pub fn current_location(&self) -> Option<&Fix> {
        self.current_location.as_ref()
    }

    pub fn permission_granted(&self) -> bool {
        self.permission_granted
    }

    /// Whether the location subscription is active.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn pending_lookups(&self) -> usize {
        self.lookups.len()
    }

    pub fn is_finished(&self) -> bool {
        self.closing && self.lookups.is_empty()
    }

    /// Drives the screen until [`ScreenEvent::Close`] was received and all
    /// pending lookups are published, then returns the final markers. The
    /// view and the location subscription are released on every exit.
    pub async fn run(
        mut self,
        mut events: UnboundedReceiver<ScreenEvent>,
    ) -> Result<MarkerSequence, ScreenError> {
        while !self.is_finished() {
            let Some(event) = events.recv().await else {
                break;
            };
            if let Err(err) = self.handle(event) {
                error!(%err, "map screen stopped");
                self.release();
                return Err(err);
            }
        }

        self.release();
        Ok(self.store.snapshot())
    }

    /// Handles every queued event, waiting only while geocoder lookups are
    /// still in flight.
    pub async fn settle(
        &mut self,
        events: &mut UnboundedReceiver<ScreenEvent>,
    ) -> Result<(), ScreenError> {
        loop {
            let event = if self.lookups.is_empty() {
                match events.try_recv() {
                    Ok(event) => event,
                    Err(_) => return Ok(()),
                }
            } else {
                match events.recv().await {
                    Some(event) => event,
                    None => return Ok(()),
                }
            };
            self.handle(event)?;
        }
    }

    /// Applies one event. Must run inside a Tokio runtime: taps spawn the
    /// geocoder lookup.
    pub fn handle(&mut self, event: ScreenEvent) -> Result<(), ScreenError> {
        debug!(?event, state = ?self.location, "screen event");

        match event {
            ScreenEvent::ViewCreated(view) => self.on_view_created(view)?,
            ScreenEvent::MapReady(map) => self.on_map_ready(map),
            ScreenEvent::PermissionsResult(grants) => self.on_permissions_result(grants),
            ScreenEvent::LocationResult(fix) => self.on_location_result(fix),
            ScreenEvent::MapTapped(at) => self.on_map_tapped(at)?,
            ScreenEvent::GeocodeCompleted { ticket, candidates } => {
                self.on_geocode_completed(ticket, candidates)
            }
            ScreenEvent::ViewDestroyed => self.on_view_destroyed()?,
            ScreenEvent::Close => self.closing = true,
        }

        Ok(())
    }

    fn on_view_created(&mut self, view: ScreenView) -> Result<(), ScreenError> {
        if self.view.is_some() {
            return Err(ScreenError::ViewAlreadyBound);
        }

        let ScreenView { list, label } = view;
        let mut presenter = ListPresenter::new(list);
        let subscription = self.store.subscribe(move |markers| {
            presenter.submit(markers);
        });
        self.view = Some(BoundView {
            label,
            subscription,
        });

        self.start_location_flow();
        Ok(())
    }

    fn start_location_flow(&mut self) {
        if !self.platform.settings.services_enabled() {
            info!("location services disabled; opening system settings");
            self.platform.settings.open_settings();
        }

        let granted = LOCATION_SCOPES
            .iter()
            .all(|&scope| self.platform.permissions.check(scope) == PermissionState::Granted);
        self.permission_granted = granted;

        if granted {
            self.subscribe_location();
        } else {
            info!("requesting location permission");
            self.location = LocationState::AwaitingPermission;
            self.platform
                .permissions
                .request(&LOCATION_SCOPES, self.sink.clone());
        }
    }

    fn subscribe_location(&mut self) {
        match self
            .platform
            .location
            .request_updates(&self.request, self.sink.clone())
        {
            Ok(()) => {
                self.subscribed = true;
                self.location = LocationState::AwaitingFirstFix;
                info!(request = ?self.request, "waiting for first location fix");
            }
            Err(err) => {
                error!(%err, "location updates unavailable");
                self.permission_granted = false;
                self.location = LocationState::Uninitialized;
            }
        }
    }

    fn cancel_location_updates(&mut self) {
        if self.subscribed {
            self.platform.location.remove_updates();
            self.subscribed = false;
            debug!("location updates removed");
        }
    }

    fn on_permissions_result(&mut self, grants: PermissionGrants) {
        if self.location != LocationState::AwaitingPermission {
            warn!(?grants, state = ?self.location, "permission result without a pending prompt");
            return;
        }

        // a dismissed prompt answers with no scopes at all
        let granted = LOCATION_SCOPES
            .iter()
            .all(|scope| grants.get(scope).copied().unwrap_or(false));
        self.permission_granted = granted;

        if granted {
            self.subscribe_location();
        } else {
            info!("location permission denied; showing default location");
            self.location = LocationState::Denied;
        }
        self.refresh_map();
    }

    fn on_location_result(&mut self, fix: Option<Fix>) {
        if self.location != LocationState::AwaitingFirstFix {
            debug!(state = ?self.location, "location result ignored");
            return;
        }
        let Some(fix) = fix else {
            debug!("location result without a fix");
            return;
        };

        info!(
            position = %fix.position,
            accuracy_m = fix.accuracy_m,
            time = %fix.time,
            "first location fix"
        );
        self.current_location = Some(fix);
        self.location = LocationState::Fixed;
        self.refresh_map();
        self.cancel_location_updates();
    }

    fn on_map_ready(&mut self, mut map: Box<dyn MapSurface>) {
        map.resume();
        for record in self.store.snapshot().iter() {
            map.add_marker(record.position(), MARKER_TITLE);
        }
        self.map = Some(map);
        self.map_was_ready = true;
        self.refresh_map();
    }

    /// Applies the my-location controls and camera for the current state.
    fn refresh_map(&mut self) {
        let Some(map) = self.map.as_mut() else {
            return;
        };
        let granted = self.permission_granted;

        if let Err(err) = map
            .set_my_location_enabled(granted)
            .and_then(|()| map.set_my_location_button_enabled(granted))
        {
            error!(%err, "my-location controls left unchanged");
        }

        let target = match &self.current_location {
            Some(fix) if granted => fix.position,
            _ => self.config.default_location,
        };
        map.move_camera(target, self.config.default_zoom);
    }

    fn on_map_tapped(&mut self, at: LatLng) -> Result<(), ScreenError> {
        if self.closing {
            warn!(%at, "screen closing; tap ignored");
            return Ok(());
        }
        let map = match self.map.as_mut() {
            Some(map) => map,
            // queued before the view went away
            None if self.map_was_ready => {
                warn!(%at, "map released; tap dropped");
                return Ok(());
            }
            None => return Err(ScreenError::MapNotReady),
        };
        map.add_marker(at, MARKER_TITLE);

        let ticket = self.lookups.issue(at);
        let geocoder = Arc::clone(&self.platform.geocoder);
        let max_results = self.config.geocoder.max_results;
        let sink = self.sink.clone();
        debug!(%at, ticket, "resolving address");

        tokio::spawn(async move {
            let lookup =
                tokio::task::spawn_blocking(move || geocoder.from_location(at, max_results)).await;
            let candidates = match lookup {
                Ok(Ok(candidates)) => candidates,
                Ok(Err(err)) => {
                    error!(%err, %at, "Error getting address from geocoder");
                    Vec::new()
                }
                Err(err) => {
                    error!(%err, %at, "geocoder task failed");
                    Vec::new()
                }
            };
            sink.send(ScreenEvent::GeocodeCompleted { ticket, candidates });
        });

        Ok(())
    }

    fn on_geocode_completed(&mut self, ticket: u64, candidates: Vec<Address>) {
        if !self.lookups.complete(ticket, candidates) {
            warn!(ticket, "geocode result for unknown lookup");
            return;
        }

        for (at, candidates) in self.lookups.take_ready() {
            let record = MarkerRecord::from_candidates(at, &candidates);
            let place_name = record.place_name().to_owned();
            info!(%at, address = record.address(), place = %place_name, "marker added");

            self.store.append(record);
            match self.view.as_mut() {
                Some(view) => view.label.set_text(&place_name),
                None => debug!("view released; place label not updated"),
            }
        }
    }

    fn on_view_destroyed(&mut self) -> Result<(), ScreenError> {
        let view = self.view.take().ok_or(ScreenError::ViewNotBound)?;
        self.store.unsubscribe(view.subscription);
        self.map = None;
        self.cancel_location_updates();
        self.location = LocationState::Uninitialized;
        info!("map screen view released");
        Ok(())
    }

    fn release(&mut self) {
        if let Some(view) = self.view.take() {
            self.store.unsubscribe(view.subscription);
        }
        self.map = None;
        self.cancel_location_updates();
    }
}

impl fmt::Debug for MapScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapScreen")
            .field("location", &self.location)
            .field("current_location", &self.current_location)
            .field("permission_granted", &self.permission_granted)
            .field("subscribed", &self.subscribed)
            .field("view_bound", &self.view.is_some())
            .field("map_ready", &self.map.is_some())
            .field("closing", &self.closing)
            .field("markers", &self.store.len())
            .field("pending_lookups", &self.lookups.len())
            .finish()
    }
}
