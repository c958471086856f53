//! Wiring sugar blocks: constants, pipes, combiners, and monitors.
//!
//! These are ordinary blocks layered over `add` + `connect`; they carry no
//! scheduling behaviour of their own and preserve the same connection
//! invariants as any user block.

use std::sync::{Arc, Mutex, PoisonError};

use tickflow_api_core::{coercion, Value};

use crate::block::{Block, EvalPolicy};

/// Lazy source emitting a fixed value.
pub struct ConstantBlock {
    value: Value,
}

impl ConstantBlock {
    pub fn new(value: Value) -> Self {
        ConstantBlock { value }
    }
}

impl Block for ConstantBlock {
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
        "constant"
    }

    fn process(&mut self, _inputs: &[Option<Value>]) {}

    fn output(&self, _index: usize) -> Value {
        self.value.clone()
    }
}

/// Lazy unary map over one edge.
pub struct PipeBlock {
    f: Box<dyn FnMut(Value) -> Value>,
    out: Value,
}

impl PipeBlock {
    pub fn new(f: impl FnMut(Value) -> Value + 'static) -> Self {
        PipeBlock {
            f: Box::new(f),
            out: Value::default(),
        }
    }
}

impl Block for PipeBlock {
    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn policy(&self) -> EvalPolicy {
        EvalPolicy::LAZY_INPUT_FIRST
    }

    fn label(&self) -> &str {
        "pipe"
    }

    fn init(&mut self) {
        self.out = Value::default();
    }

    fn process(&mut self, inputs: &[Option<Value>]) {
        let input = inputs
            .first()
            .and_then(|slot| slot.clone())
            .unwrap_or_default();
        self.out = (self.f)(input);
    }

    fn output(&self, _index: usize) -> Value {
        self.out.clone()
    }
}

/// Lazy binary zip over two edges.
pub struct CombineBlock {
    f: Box<dyn FnMut(Value, Value) -> Value>,
    out: Value,
}

impl CombineBlock {
    pub fn new(f: impl FnMut(Value, Value) -> Value + 'static) -> Self {
        CombineBlock {
            f: Box::new(f),
            out: Value::default(),
        }
    }
}

impl Block for CombineBlock {
    fn num_inputs(&self) -> usize {
        2
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn policy(&self) -> EvalPolicy {
        EvalPolicy::LAZY_INPUT_FIRST
    }

    fn label(&self) -> &str {
        "combine"
    }

    fn init(&mut self) {
        self.out = Value::default();
    }

    fn process(&mut self, inputs: &[Option<Value>]) {
        let a = inputs
            .first()
            .and_then(|slot| slot.clone())
            .unwrap_or_default();
        let b = inputs
            .get(1)
            .and_then(|slot| slot.clone())
            .unwrap_or_default();
        self.out = (self.f)(a, b);
    }

    fn output(&self, _index: usize) -> Value {
        self.out.clone()
    }
}

/// Always-eager sink capturing the latest value of one edge for host-side
/// inspection. Being `Always`, a monitor keeps its upstream chain alive
/// through pruning.
pub struct MonitorBlock {
    cell: Arc<Mutex<Option<Value>>>,
}

impl MonitorBlock {
    pub fn new() -> (Self, Monitor) {
        let cell = Arc::new(Mutex::new(None));
        let monitor = Monitor {
            cell: Arc::clone(&cell),
        };
        (MonitorBlock { cell }, monitor)
    }
}

impl Block for MonitorBlock {
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
        "monitor"
    }

    fn init(&mut self) {
        *self.cell.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn process(&mut self, inputs: &[Option<Value>]) {
        let observed = inputs.first().and_then(|slot| slot.clone());
        *self.cell.lock().unwrap_or_else(PoisonError::into_inner) = observed;
    }

    fn output(&self, _index: usize) -> Value {
        Value::default()
    }
}

/// Host-side read handle for a [`MonitorBlock`]. Clone-cheap; safe to read
/// from any thread between ticks.
#[derive(Clone)]
pub struct Monitor {
    cell: Arc<Mutex<Option<Value>>>,
}

impl Monitor {
    /// The value observed on the most recent tick, if any tick has run.
    pub fn value(&self) -> Option<Value> {
        self.cell
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The observed value coerced to a scalar.
    pub fn float(&self) -> Option<f64> {
        self.value().as_ref().map(coercion::to_float)
    }

    /// The observed value coerced to a boolean.
    pub fn bool(&self) -> Option<bool> {
        self.value().as_ref().map(coercion::to_bool)
    }
}
