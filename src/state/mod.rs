pub mod store;
pub mod types;

pub use store::{StateChange, StateStore};
pub use types::{AccumulatedFileSet, CounterRecord, Record, StateKey, StateScope, ThrottleRecord};
