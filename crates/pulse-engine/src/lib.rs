//! The telemetry collection-and-delivery engine.
//!
//! Domain events flow one direction: adapters map them to operations, the
//! queue buffers them, and the delivery engine ships them to the backend on
//! a periodic flush, a visibility flush, or the teardown beacon fallback.
//! The rage, scroll, and intent machinery sit beside that path as pure or
//! near-pure state machines consulted along the way.

pub mod adapters;
pub mod collector;
pub mod delivery;
pub mod intent;
pub mod presence;
pub mod queue;
pub mod rage;
pub mod scroll;

pub use adapters::{AdapterOutput, PageContext};
pub use collector::{Collector, CollectorConfig};
pub use delivery::DeliveryEngine;
pub use intent::{level_for, IntentEngine, IntentLevel};
pub use presence::spawn_presence;
pub use queue::OperationQueue;
pub use rage::{ClickThrottle, RageClickDetector, RageDetection};
pub use scroll::{ScrollOutcome, ScrollTracker};
