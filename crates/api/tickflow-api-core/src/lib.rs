//! tickflow-api-core: the value layer shared by the tickflow control-loop crates.
//!
//! Blocks exchange dynamically typed [`Value`] payloads; the scheduler itself only
//! cares about presence and cardinality. Coercion rules for reading a payload as a
//! scalar, boolean, or flat vector live in [`coercion`].

pub mod coercion;
pub mod value;

pub use value::{Value, ValueKind};
