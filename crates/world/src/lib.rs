//! # Ember World Layer
//!
//! In-memory implementations of the collaborators the script interpreter
//! consumes.
//!
//! ## Modules
//!
//! - `manager` - Entity registry
//! - `zones` - Named polygon zones
//! - `queue` - Pending event queue
//! - `clock` - Game clocks

pub mod manager;
pub mod zones;
pub mod queue;
pub mod clock;

// Re-export commonly used types
pub use manager::EntityManager;
pub use zones::{PolygonZone, ZoneMap};
pub use queue::EventQueue;
pub use clock::{ManualClock, SystemClock};
