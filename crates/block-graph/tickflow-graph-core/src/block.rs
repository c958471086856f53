//! The block contract: the one trait the scheduler depends on.
//!
//! A block declares fixed input/output arity and an evaluation policy, and the
//! scheduler guarantees `process` runs at most once per tick, after every
//! input-first dependency has been resolved for that tick. Blocks are free to
//! hold internal mutable state (integrators, filters, counters); the
//! single-call-per-tick contract makes such state well defined.

use serde::{Deserialize, Serialize};
use tickflow_api_core::Value;

/// Whether a block runs unconditionally every tick or only on demand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eagerness {
    /// Must run exactly once every tick regardless of demand.
    Always,
    /// Runs only if some always-reachable consumer pulls its output.
    Lazy,
}

/// Whether a block consumes inputs before producing outputs, or exposes
/// outputs for the current tick before its own `process` runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    /// All wired inputs are resolved before `process`; outputs are only valid
    /// after `process` has run this tick.
    InputFirst,
    /// Outputs for tick N are visible before `process` runs; `process` at
    /// tick N computes the values exposed at tick N+1. This is the escape
    /// hatch that makes feedback cycles schedulable.
    OutputFirst,
}

/// The (Eagerness, Order) pair fixed at block construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvalPolicy {
    pub eagerness: Eagerness,
    pub order: Order,
}

impl EvalPolicy {
    pub const ALWAYS_INPUT_FIRST: EvalPolicy = EvalPolicy {
        eagerness: Eagerness::Always,
        order: Order::InputFirst,
    };
    pub const ALWAYS_OUTPUT_FIRST: EvalPolicy = EvalPolicy {
        eagerness: Eagerness::Always,
        order: Order::OutputFirst,
    };
    pub const LAZY_INPUT_FIRST: EvalPolicy = EvalPolicy {
        eagerness: Eagerness::Lazy,
        order: Order::InputFirst,
    };
    pub const LAZY_OUTPUT_FIRST: EvalPolicy = EvalPolicy {
        eagerness: Eagerness::Lazy,
        order: Order::OutputFirst,
    };

    #[inline]
    pub fn is_always(&self) -> bool {
        self.eagerness == Eagerness::Always
    }

    #[inline]
    pub fn is_output_first(&self) -> bool {
        self.order == Order::OutputFirst
    }
}

/// An atomic computation unit in the signal graph.
///
/// The scheduler only ever sees this trait; concrete control-theory bodies
/// (PID, filters, kinematics) plug in behind it.
pub trait Block {
    /// Number of input slots, fixed for the block's lifetime.
    fn num_inputs(&self) -> usize;

    /// Number of output slots, fixed for the block's lifetime.
    fn num_outputs(&self) -> usize;

    /// Evaluation policy, fixed at construction.
    fn policy(&self) -> EvalPolicy;

    /// Human-readable name used in diagnostics and error messages.
    fn label(&self) -> &str {
        "block"
    }

    /// Called once when the owning system starts (or restarts after `stop`).
    /// Output-first blocks must establish their first tick's output values
    /// here, since their tick-0 `process` only takes effect at tick 1.
    fn init(&mut self) {}

    /// Consume this tick's inputs. `None` marks an unconnected slot. Invoked
    /// at most once per tick by the scheduler.
    fn process(&mut self, inputs: &[Option<Value>]);

    /// Read the most recently computed value for an output slot. Staleness
    /// buffering for output-first blocks is handled by the runner, not here.
    fn output(&self, index: usize) -> Value;

    /// Whether an unconnected input slot is a build-time error. Defaults to
    /// requiring full fan-in; relaxed by utility sinks and similar blocks.
    fn input_required(&self, _slot: usize) -> bool {
        true
    }

    /// Block-local static validation, run once at build time with a
    /// connected/unconnected flag per input slot. A returned message is
    /// surfaced as [`BuildError::InvalidConfiguration`](crate::error::BuildError).
    fn validate(&self, _connected: &[bool]) -> Result<(), String> {
        Ok(())
    }
}
