//! admitr - stage transition and trigger evaluation engine
//!
//! Given a record's current pipeline stage and a set of configurable
//! triggers, admitr decides whether and where that record should advance,
//! applies the change with a compare-and-swap, logs it, and decides who
//! to notify. Evaluation and execution are decoupled so evaluation can be
//! polled safely after any requirement fact changes.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod facts;
pub mod id;
pub mod registry;
pub mod storage;

pub use error::{AdmitrError, Result};
