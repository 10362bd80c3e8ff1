use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

use crate::platform::{Address, Fix, LatLng, MapSurface, PermissionGrants, PlaceLabel};
use crate::presenter::ListSurface;

/// Everything that can happen to the map screen.
///
/// The screen handles these one at a time on the task that owns it.
pub enum ScreenEvent {
    /// The screen's views exist; starts the location flow.
    ViewCreated(ScreenView),
    /// The map finished loading and can take markers and camera moves.
    MapReady(Box<dyn MapSurface>),
    PermissionsResult(PermissionGrants),
    /// `None` when the provider had no last location to report.
    LocationResult(Option<Fix>),
    MapTapped(LatLng),
    GeocodeCompleted {
        ticket: u64,
        candidates: Vec<Address>,
    },
    ViewDestroyed,
    /// Ends the event loop once every pending lookup has been published.
    Close,
}

impl fmt::Debug for ScreenEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenEvent::ViewCreated(_) => f.write_str("ViewCreated"),
            ScreenEvent::MapReady(_) => f.write_str("MapReady"),
            ScreenEvent::PermissionsResult(grants) => {
                f.debug_tuple("PermissionsResult").field(grants).finish()
            }
            ScreenEvent::LocationResult(fix) => f.debug_tuple("LocationResult").field(fix).finish(),
            ScreenEvent::MapTapped(at) => f.debug_tuple("MapTapped").field(at).finish(),
            ScreenEvent::GeocodeCompleted { ticket, candidates } => f
                .debug_struct("GeocodeCompleted")
                .field("ticket", ticket)
                .field("candidates", &candidates.len())
                .finish(),
            ScreenEvent::ViewDestroyed => f.write_str("ViewDestroyed"),
            ScreenEvent::Close => f.write_str("Close"),
        }
    }
}

/// The view half of the screen: created on enter, released on exit.
pub struct ScreenView {
    pub list: Box<dyn ListSurface>,
    pub label: Box<dyn PlaceLabel>,
}

/// Cloneable handle platform adapters use to post events to the screen.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: UnboundedSender<ScreenEvent>,
}

impl EventSink {
    pub(crate) fn new(tx: UnboundedSender<ScreenEvent>) -> Self {
        Self { tx }
    }

    /// Posts `event`. Events sent after the screen closed are dropped.
    pub fn send(&self, event: ScreenEvent) {
        if let Err(err) = self.tx.send(event) {
            tracing::debug!(event = ?err.0, "screen closed; event dropped");
        }
    }
}
