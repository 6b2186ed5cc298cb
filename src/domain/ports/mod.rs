//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that infrastructure adapters implement:
//! - `Generator`: content-generation provider calls
//! - `Detector`: content-authenticity scoring calls
//! - `HistoryStore`: durable subject-history persistence
//! - `Clock`: injectable time source and sleep
//!
//! These contracts keep the core services independent of any specific
//! provider API or storage backend.

pub mod clock;
pub mod detector;
pub mod generator;
pub mod history_store;

pub use clock::{Clock, SystemClock};
pub use detector::Detector;
pub use generator::Generator;
pub use history_store::HistoryStore;
