//! Ember Core - Fundamental world types and collaborator interfaces
//!
//! The script interpreter borrows entities, zones, an event sink and a
//! clock from the surrounding engine. Those seams are declared here so
//! that the interpreter and the in-memory world can both depend on them.

mod error;
mod types;
mod idgen;
mod positions;
mod entity;
mod services;

pub use error::*;
pub use types::*;
pub use idgen::*;
pub use positions::*;
pub use entity::*;
pub use services::*;
