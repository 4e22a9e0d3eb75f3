//! Storage backends for the medication tracker: in-memory and (feature `sqlite`) SQLite.

mod memory;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(test)]
mod fixtures;

pub use med_types::{MedStore, StoreError};
pub use memory::InMemoryMedStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteMedStore;
