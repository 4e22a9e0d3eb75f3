//! Core types and traits for medication tracking and audit reconciliation.
//!
//! Records, request DTOs, and the `MedStore`/`MedTracker` traits shared by the store,
//! engine, and API crates.

mod dto;
mod model;
mod traits;

pub use dto::*;
pub use model::*;
pub use traits::*;
