//! Instrumented probe blocks shared by unit tests, integration tests, and
//! benches across the tickflow crates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tickflow_api_core::Value;
use tickflow_graph_core::block::{Block, EvalPolicy};

/// Pass-through block counting its `process` calls. Output slot 0 echoes the
/// first input when one is wired, otherwise the cumulative call count — handy
/// both as a link in a chain and as a bare source.
pub struct CountingBlock {
    label: String,
    inputs: usize,
    outputs: usize,
    policy: EvalPolicy,
    counter: Arc<AtomicU64>,
    last: Option<Value>,
}

impl CountingBlock {
    pub fn new(
        label: &str,
        inputs: usize,
        outputs: usize,
        policy: EvalPolicy,
    ) -> (Self, Arc<AtomicU64>) {
        let counter = Arc::new(AtomicU64::new(0));
        (
            CountingBlock {
                label: label.to_string(),
                inputs,
                outputs,
                policy,
                counter: Arc::clone(&counter),
                last: None,
            },
            counter,
        )
    }
}

impl Block for CountingBlock {
    fn num_inputs(&self) -> usize {
        self.inputs
    }

    fn num_outputs(&self) -> usize {
        self.outputs
    }

    fn policy(&self) -> EvalPolicy {
        self.policy
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn init(&mut self) {
        self.last = None;
        self.counter.store(0, Ordering::Relaxed);
    }

    fn process(&mut self, inputs: &[Option<Value>]) {
        self.counter.fetch_add(1, Ordering::Relaxed);
        self.last = inputs.first().and_then(|slot| slot.clone());
    }

    fn output(&self, _index: usize) -> Value {
        self.last
            .clone()
            .unwrap_or(Value::Float(self.counter.load(Ordering::Relaxed) as f64))
    }

    fn input_required(&self, _slot: usize) -> bool {
        false
    }
}

/// One-slot feedback memory: output-first, exposing the value stored by the
/// previous tick's `process` (the `init` value on tick 0). The canonical
/// cycle-breaking plant stand-in.
pub struct LatchBlock {
    label: String,
    policy: EvalPolicy,
    initial: Value,
    state: Value,
}

impl LatchBlock {
    /// `eagerness` picks between `Always` and `Lazy`; order is output-first
    /// by construction.
    pub fn new(label: &str, initial: Value, policy: EvalPolicy) -> Self {
        assert!(policy.is_output_first(), "latch must be output-first");
        LatchBlock {
            label: label.to_string(),
            policy,
            state: initial.clone(),
            initial,
        }
    }
}

impl Block for LatchBlock {
    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn policy(&self) -> EvalPolicy {
        self.policy
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn init(&mut self) {
        self.state = self.initial.clone();
    }

    fn process(&mut self, inputs: &[Option<Value>]) {
        if let Some(value) = inputs.first().and_then(|slot| slot.clone()) {
            self.state = value;
        }
    }

    fn output(&self, _index: usize) -> Value {
        self.state.clone()
    }

    fn input_required(&self, _slot: usize) -> bool {
        false
    }
}

/// Lazy source emitting 0, 1, 2, ... across successive ticks.
pub struct StepSourceBlock {
    next: f64,
    value: f64,
}

impl StepSourceBlock {
    pub fn new() -> Self {
        StepSourceBlock {
            next: 0.0,
            value: 0.0,
        }
    }
}

impl Default for StepSourceBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl Block for StepSourceBlock {
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
        "step-source"
    }

    fn init(&mut self) {
        self.next = 0.0;
        self.value = 0.0;
    }

    fn process(&mut self, _inputs: &[Option<Value>]) {
        self.value = self.next;
        self.next += 1.0;
    }

    fn output(&self, _index: usize) -> Value {
        Value::Float(self.value)
    }
}

/// Always-eager sink appending each tick's observed input to a shared log.
pub struct RecorderBlock {
    log: Arc<Mutex<Vec<Option<Value>>>>,
}

/// Read handle paired with a [`RecorderBlock`].
#[derive(Clone)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Option<Value>>>>,
}

impl Recorder {
    pub fn values(&self) -> Vec<Option<Value>> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn floats(&self) -> Vec<Option<f64>> {
        self.values()
            .iter()
            .map(|slot| {
                slot.as_ref()
                    .map(tickflow_api_core::coercion::to_float)
            })
            .collect()
    }
}

impl RecorderBlock {
    pub fn new() -> (Self, Recorder) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let recorder = Recorder {
            log: Arc::clone(&log),
        };
        (RecorderBlock { log }, recorder)
    }
}

impl Block for RecorderBlock {
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
        "recorder"
    }

    fn init(&mut self) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn process(&mut self, inputs: &[Option<Value>]) {
        let observed = inputs.first().and_then(|slot| slot.clone());
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observed);
    }

    fn output(&self, _index: usize) -> Value {
        Value::default()
    }

    fn input_required(&self, _slot: usize) -> bool {
        false
    }
}
