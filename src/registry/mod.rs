//! Trigger condition field registry.
//!
//! The catalog of evaluable fields (with their types and legal operators)
//! and the generic field+operator+value condition path built on it.

pub mod condition;
pub mod fields;

pub use condition::FieldCondition;
pub use fields::{ConditionFieldRegistry, FieldDef, FieldType, Operator, operators_for};
