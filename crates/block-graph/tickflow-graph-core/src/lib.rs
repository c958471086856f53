//! tickflow-graph-core: block-graph scheduler for in-process control loops.
//!
//! Users wire [`Block`] instances into a [`builder::GraphBuilder`], which
//! compiles the wiring into an immutable, execution-ordered
//! [`compiled::CompiledGraph`] and hands back a [`system::ControlSystem`]
//! driving it once per host tick. Two orthogonal per-block policies govern
//! scheduling: eagerness (always vs. on-demand) and order (input-first vs.
//! output-first, the latter exposing last tick's outputs and thereby breaking
//! feedback cycles). Graphs with a cycle no output-first member interrupts are
//! rejected at build time; at runtime each reachable block processes exactly
//! once per tick with memoized pulls.

pub mod block;
pub mod blocks;
pub mod builder;
pub mod compiled;
pub mod error;
pub mod system;

mod runner;
mod trace;

pub use block::{Block, Eagerness, EvalPolicy, Order};
pub use blocks::{Monitor, PulseHandle, QueueHandle, ValueHandle};
pub use builder::{BlockHandle, GraphBuilder, InputHandle, OutputHandle};
pub use compiled::{CompiledGraph, Source};
pub use error::{BuildError, TickError};
pub use system::{ControlSystem, TickReport};

pub use tickflow_api_core::{coercion, Value, ValueKind};
