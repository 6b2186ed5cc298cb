//! JSON file persistence for subject optimization histories.

pub mod json_store;

pub use json_store::JsonHistoryStore;
