//! Storage layer for admitr.
//!
//! Trait seams for records, triggers, and the transition log, with a
//! SQLite implementation for production use and an in-memory one for
//! tests and embedding. The SQLite store also carries the collaborator
//! fact tables and implements `FactsReader` over them.

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{RecordStore, TransitionLogStore, TriggerStore};
