pub mod record;
pub mod store;

pub use record::{MarkerRecord, UNKNOWN_ADDRESS, UNKNOWN_PLACE};
pub use store::{MarkerSequence, MarkerStore, SubscriptionId};
