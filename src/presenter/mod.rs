//! Renders the marker list into a row-based list surface.

pub mod diff;

use std::fmt;

use crate::marker::{MarkerRecord, MarkerSequence};

pub use diff::{Edit, ItemIdentity, edit_script};

impl ItemIdentity for MarkerRecord {
    fn same_item(&self, other: &Self) -> bool {
        self.same_marker(other)
    }

    fn same_content(&self, other: &Self) -> bool {
        self == other
    }
}

/// The three text lines shown for one marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRow {
    pub latitude: String,
    pub longitude: String,
    pub address: String,
}

impl MarkerRow {
    pub fn lines(&self) -> [&str; 3] {
        [&self.latitude, &self.longitude, &self.address]
    }
}

impl From<&MarkerRecord> for MarkerRow {
    fn from(record: &MarkerRecord) -> Self {
        Self {
            latitude: format!("Latitude: {}", coordinate_text(record.latitude())),
            longitude: format!("Longitude: {}", coordinate_text(record.longitude())),
            address: format!("Address: {}", record.address()),
        }
    }
}

/// Coordinate text for a row: plain decimals in `[1e-3, 1e7)`, otherwise
/// `<mantissa>E<exponent>` with at least one fractional digit (`1.0E-5`).
fn coordinate_text(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 || (1e-3..1e7).contains(&value.abs()) {
        return format!("{value:?}");
    }

    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    if mantissa.contains('.') {
        format!("{mantissa}E{exponent}")
    } else {
        format!("{mantissa}.0E{exponent}")
    }
}

impl fmt::Display for MarkerRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}\n{}", self.latitude, self.longitude, self.address)
    }
}

/// A scrollable list that can be patched row by row.
pub trait ListSurface: Send {
    fn insert_row(&mut self, index: usize, row: MarkerRow);

    fn remove_row(&mut self, index: usize);

    fn update_row(&mut self, index: usize, row: MarkerRow);
}

/// Keeps a [`ListSurface`] in step with the published marker snapshots.
pub struct ListPresenter {
    shown: MarkerSequence,
    surface: Box<dyn ListSurface>,
}

impl ListPresenter {
    pub fn new(surface: Box<dyn ListSurface>) -> Self {
        Self {
            shown: MarkerSequence::empty(),
            surface,
        }
    }

    /// Patches the surface from the currently shown snapshot to `next` and
    /// returns the number of row edits applied.
    pub fn submit(&mut self, next: &MarkerSequence) -> usize {
        if self.shown.ptr_eq(next) {
            return 0;
        }

        let edits = edit_script(&self.shown, next);
        for edit in &edits {
            match *edit {
                Edit::Remove(index) => self.surface.remove_row(index),
                Edit::Insert(index) => self.surface.insert_row(index, MarkerRow::from(&next[index])),
                Edit::Update(index) => self.surface.update_row(index, MarkerRow::from(&next[index])),
            }
        }
        tracing::debug!(edits = edits.len(), rows = next.len(), "marker list patched");

        self.shown = next.clone();
        edits.len()
    }
}

impl fmt::Debug for ListPresenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListPresenter")
            .field("shown", &self.shown.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::LatLng;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSurface {
        rows: Arc<Mutex<Vec<MarkerRow>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ListSurface for RecordingSurface {
        fn insert_row(&mut self, index: usize, row: MarkerRow) {
            self.rows.lock().unwrap().insert(index, row);
            self.calls.lock().unwrap().push(format!("insert {index}"));
        }

        fn remove_row(&mut self, index: usize) {
            self.rows.lock().unwrap().remove(index);
            self.calls.lock().unwrap().push(format!("remove {index}"));
        }

        fn update_row(&mut self, index: usize, row: MarkerRow) {
            self.rows.lock().unwrap()[index] = row;
            self.calls.lock().unwrap().push(format!("update {index}"));
        }
    }

    #[test]
    fn test_row_text() {
        let record = MarkerRecord::new(LatLng::new(10.0, 20.25), "1 George St", "Town Hall");
        let row = MarkerRow::from(&record);

        assert_eq!(
            row.lines(),
            ["Latitude: 10.0", "Longitude: 20.25", "Address: 1 George St"]
        );
        assert_eq!(row.to_string(), "Latitude: 10.0\nLongitude: 20.25\nAddress: 1 George St");
    }

    #[test]
    fn test_row_text_small_and_large_coordinates() {
        let record = MarkerRecord::new(LatLng::new(0.00001, -0.00012), "Null Island", "Sea");
        let row = MarkerRow::from(&record);
        assert_eq!(row.latitude, "Latitude: 1.0E-5");
        assert_eq!(row.longitude, "Longitude: -1.2E-4");

        assert_eq!(coordinate_text(0.0), "0.0");
        assert_eq!(coordinate_text(0.001), "0.001");
        assert_eq!(coordinate_text(-33.8567844), "-33.8567844");
        assert_eq!(coordinate_text(12345678.5), "1.23456785E7");
    }

    #[test]
    fn test_submit_appended_snapshot_inserts_one_row() {
        let surface = RecordingSurface::default();
        let mut presenter = ListPresenter::new(Box::new(surface.clone()));

        let first = MarkerSequence::empty().appended(MarkerRecord::new(LatLng::new(1.0, 1.0), "A", "a"));
        let second = first.appended(MarkerRecord::new(LatLng::new(2.0, 2.0), "B", "b"));

        assert_eq!(presenter.submit(&first), 1);
        assert_eq!(presenter.submit(&second), 1);
        assert_eq!(presenter.submit(&second), 0);

        assert_eq!(*surface.calls.lock().unwrap(), vec!["insert 0", "insert 1"]);
        assert_eq!(surface.rows.lock().unwrap()[1].address, "Address: B");
    }

    #[test]
    fn test_same_coordinates_new_address_updates_in_place() {
        let surface = RecordingSurface::default();
        let mut presenter = ListPresenter::new(Box::new(surface.clone()));
        let at = LatLng::new(-33.0, 151.0);

        presenter.submit(&MarkerSequence::from(vec![MarkerRecord::unresolved(at)]));
        presenter.submit(&MarkerSequence::from(vec![MarkerRecord::new(at, "1 George St", "Town Hall")]));

        assert_eq!(*surface.calls.lock().unwrap(), vec!["insert 0", "update 0"]);
        assert_eq!(surface.rows.lock().unwrap()[0].address, "Address: 1 George St");
    }
}
