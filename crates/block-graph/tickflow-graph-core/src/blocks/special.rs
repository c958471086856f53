//! Canonical utility blocks registered once per builder.
//!
//! The original singleton-plus-reflection pattern is replaced by explicit
//! registration: [`GraphBuilder`](crate::builder::GraphBuilder) constructs one
//! instance of each role and hands out canonical handles. The blocks share
//! atomic cells with the owning [`ControlSystem`](crate::system::ControlSystem),
//! which publishes the tick index and elapsed time before each tick and reads
//! the shutdown flag after it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tickflow_api_core::{coercion, Value};

use crate::block::{Block, EvalPolicy};

/// Shared clock cells linking the runner to the tick-index and loop-time
/// blocks. Cheap to clone; all clones observe the same cells.
#[derive(Clone, Debug)]
pub struct LoopClock {
    tick: Arc<AtomicU64>,
    dt_bits: Arc<AtomicU64>,
}

impl LoopClock {
    pub fn new() -> Self {
        LoopClock {
            tick: Arc::new(AtomicU64::new(0)),
            dt_bits: Arc::new(AtomicU64::new(f64::NAN.to_bits())),
        }
    }

    /// Current tick index, monotonic from 0.
    pub fn tick_index(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    /// Seconds since the previous tick; NaN on tick 0.
    pub fn dt(&self) -> f64 {
        f64::from_bits(self.dt_bits.load(Ordering::Relaxed))
    }

    pub(crate) fn publish(&self, tick: u64, dt: f64) {
        self.tick.store(tick, Ordering::Relaxed);
        self.dt_bits.store(dt.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.publish(0, f64::NAN);
    }
}

impl Default for LoopClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Source exposing the current tick index as a float. Lazy: it only runs when
/// some reachable consumer is wired to it.
pub struct TickIndexBlock {
    clock: LoopClock,
    value: f64,
}

impl TickIndexBlock {
    pub fn new(clock: LoopClock) -> Self {
        TickIndexBlock { clock, value: 0.0 }
    }
}

impl Block for TickIndexBlock {
    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn policy(&self) -> EvalPolicy {
        EvalPolicy::LAZY_INPUT_FIRST
    }

    fn label(&self) -> &str {
        "tick-index"
    }

    fn init(&mut self) {
        self.value = 0.0;
    }

    fn process(&mut self, _inputs: &[Option<Value>]) {
        self.value = self.clock.tick_index() as f64;
    }

    fn output(&self, _index: usize) -> Value {
        Value::Float(self.value)
    }
}

/// Source exposing elapsed seconds since the previous tick (NaN on tick 0).
pub struct LoopTimeBlock {
    clock: LoopClock,
    value: f64,
}

impl LoopTimeBlock {
    pub fn new(clock: LoopClock) -> Self {
        LoopTimeBlock {
            clock,
            value: f64::NAN,
        }
    }
}

impl Block for LoopTimeBlock {
    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn policy(&self) -> EvalPolicy {
        EvalPolicy::LAZY_INPUT_FIRST
    }

    fn label(&self) -> &str {
        "loop-time"
    }

    fn init(&mut self) {
        self.value = f64::NAN;
    }

    fn process(&mut self, _inputs: &[Option<Value>]) {
        self.value = self.clock.dt();
    }

    fn output(&self, _index: usize) -> Value {
        Value::Float(self.value)
    }
}

/// Always-eager sink for shutdown requests. Any boolean-producing output may
/// be wired to its single input; a truthy value on any tick requests loop
/// termination after that tick completes. Unconnected means "never halt".
///
/// Being `Always`, this sink also guarantees every standard-built graph has an
/// eager root, so the no-always-block build error can only occur for graphs
/// assembled outside [`GraphBuilder`](crate::builder::GraphBuilder).
pub struct ShutdownSinkBlock {
    flag: Arc<AtomicBool>,
}

impl ShutdownSinkBlock {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        ShutdownSinkBlock { flag }
    }
}

impl Block for ShutdownSinkBlock {
    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        0
    }

    fn policy(&self) -> EvalPolicy {
        EvalPolicy::ALWAYS_INPUT_FIRST
    }

    fn label(&self) -> &str {
        "shutdown"
    }

    fn init(&mut self) {
        self.flag.store(false, Ordering::Relaxed);
    }

    fn process(&mut self, inputs: &[Option<Value>]) {
        let requested = inputs
            .first()
            .and_then(|slot| slot.as_ref())
            .map(coercion::to_bool)
            .unwrap_or(false);
        self.flag.store(requested, Ordering::Relaxed);
    }

    fn output(&self, _index: usize) -> Value {
        Value::default()
    }

    fn input_required(&self, _slot: usize) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_publishes_to_all_clones() {
        let clock = LoopClock::new();
        let other = clock.clone();
        assert!(clock.dt().is_nan());
        clock.publish(3, 0.02);
        assert_eq!(other.tick_index(), 3);
        assert_eq!(other.dt(), 0.02);
        clock.reset();
        assert_eq!(other.tick_index(), 0);
        assert!(other.dt().is_nan());
    }

    #[test]
    fn shutdown_sink_latches_truthy_input() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut sink = ShutdownSinkBlock::new(Arc::clone(&flag));
        sink.init();
        sink.process(&[Some(Value::Bool(true))]);
        assert!(flag.load(Ordering::Relaxed));
        sink.process(&[None]);
        assert!(!flag.load(Ordering::Relaxed));
    }
}
