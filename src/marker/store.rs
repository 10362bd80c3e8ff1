use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use super::record::MarkerRecord;

/// An immutable snapshot of the markers, in tap order.
///
/// Cloning is cheap and shares the underlying slice. Appending never touches
/// an existing snapshot; it builds a new one.
#[derive(Clone)]
pub struct MarkerSequence(Arc<[MarkerRecord]>);

impl MarkerSequence {
    pub fn empty() -> Self {
        Self(Arc::from(Vec::<MarkerRecord>::new()))
    }

    pub fn appended(&self, record: MarkerRecord) -> Self {
        let mut records = Vec::with_capacity(self.0.len() + 1);
        records.extend_from_slice(&self.0);
        records.push(record);
        Self(Arc::from(records))
    }

    /// True when both snapshots are the very same publication.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for MarkerSequence {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for MarkerSequence {
    type Target = [MarkerRecord];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<MarkerRecord>> for MarkerSequence {
    fn from(records: Vec<MarkerRecord>) -> Self {
        Self(Arc::from(records))
    }
}

impl fmt::Debug for MarkerSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl Serialize for MarkerSequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&MarkerSequence) + Send>;

/// Observable holder of the marker list.
///
/// Observers run synchronously on whichever context calls [`append`], so
/// the store must only be driven from the context that owns the UI.
///
/// [`append`]: MarkerStore::append
pub struct MarkerStore {
    current: MarkerSequence,
    observers: Vec<(SubscriptionId, Observer)>,
    next_id: u64,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self {
            current: MarkerSequence::empty(),
            observers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn snapshot(&self) -> MarkerSequence {
        self.current.clone()
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Registers `observer` and immediately replays the current snapshot
    /// to it, so a late subscriber starts from the same state as everyone
    /// else.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&MarkerSequence) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let mut observer: Observer = Box::new(observer);
        observer(&self.current);
        self.observers.push((id, observer));

        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    /// Publishes `current + record` and notifies every observer once.
    pub fn append(&mut self, record: MarkerRecord) {
        self.current = self.current.appended(record);
        tracing::debug!(markers = self.current.len(), "marker appended");

        for (_, observer) in &mut self.observers {
            observer(&self.current);
        }
    }
}

impl Default for MarkerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MarkerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerStore")
            .field("current", &self.current)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::LatLng;
    use std::sync::Mutex;

    fn record(n: u32) -> MarkerRecord {
        MarkerRecord::new(
            LatLng::new(f64::from(n), f64::from(n) * 2.0),
            format!("{n} Example St"),
            format!("Place {n}"),
        )
    }

    #[test]
    fn test_append_keeps_tap_order() {
        let mut store = MarkerStore::new();
        for n in 0..5 {
            store.append(record(n));
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 5);
        let names: Vec<&str> = snapshot.iter().map(|r| r.place_name()).collect();
        assert_eq!(names, vec!["Place 0", "Place 1", "Place 2", "Place 3", "Place 4"]);
    }

    #[test]
    fn test_append_never_mutates_published_snapshot() {
        let mut store = MarkerStore::new();
        store.append(record(1));
        let before = store.snapshot();

        store.append(record(2));
        let after = store.snapshot();

        assert_eq!(before.len(), 1);
        assert_eq!(before[0], record(1));
        assert_eq!(after.len(), 2);
        assert!(!before.ptr_eq(&after));
    }

    #[test]
    fn test_one_notification_per_append() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut store = MarkerStore::new();

        let sink = Arc::clone(&seen);
        store.subscribe(move |seq| sink.lock().unwrap().push(seq.len()));
        store.append(record(1));
        store.append(record(2));

        // the first entry is the replay on subscribe
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let count = Arc::new(Mutex::new(0usize));
        let mut store = MarkerStore::new();

        let sink = Arc::clone(&count);
        let id = store.subscribe(move |_| *sink.lock().unwrap() += 1);
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));

        store.append(record(1));
        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_late_subscriber_gets_current_list() {
        let mut store = MarkerStore::new();
        store.append(record(1));
        store.append(record(2));

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        store.subscribe(move |seq| *sink.lock().unwrap() = Some(seq.clone()));

        let replayed = seen.lock().unwrap().clone().unwrap();
        assert!(replayed.ptr_eq(&store.snapshot()));
    }

    #[test]
    fn test_sequence_serializes_as_list() {
        let seq = MarkerSequence::from(vec![record(1)]);
        let json = serde_json::to_value(&seq).unwrap();
        assert_eq!(json[0]["address"], "1 Example St");
        assert_eq!(json[0]["latitude"], 1.0);
    }
}
