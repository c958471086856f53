//! Externally-fed leaf sources: the only cross-thread surface of the core.
//!
//! The scheduler itself assumes exclusive single-thread ownership and takes no
//! locks; these blocks confine all synchronisation to their own shared cells so
//! other threads (sensor readers, operator UIs) can feed the graph while the
//! tick thread runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tickflow_api_core::Value;

use crate::block::{Block, EvalPolicy};

/// Source exposing a value settable from any thread. The tick thread samples
/// the cell once per tick, so within a tick every consumer sees one coherent
/// value no matter how often the writer updates it.
pub struct ExternalValueBlock {
    shared: Arc<Mutex<Value>>,
    initial: Value,
    latest: Value,
}

/// Writer handle paired with an [`ExternalValueBlock`].
#[derive(Clone)]
pub struct ValueHandle {
    shared: Arc<Mutex<Value>>,
}

impl ValueHandle {
    pub fn set(&self, value: Value) {
        *self.shared.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

impl ExternalValueBlock {
    pub fn new(initial: Value) -> (Self, ValueHandle) {
        let shared = Arc::new(Mutex::new(initial.clone()));
        let handle = ValueHandle {
            shared: Arc::clone(&shared),
        };
        (
            ExternalValueBlock {
                shared,
                latest: initial.clone(),
                initial,
            },
            handle,
        )
    }
}

impl Block for ExternalValueBlock {
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
        "external-value"
    }

    fn init(&mut self) {
        self.latest = self.initial.clone();
    }

    fn process(&mut self, _inputs: &[Option<Value>]) {
        self.latest = self
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
    }

    fn output(&self, _index: usize) -> Value {
        self.latest.clone()
    }
}

/// Multi-producer queue drained one element per tick. When the queue is empty
/// the block holds its last drained value, so downstream consumers always see
/// a defined signal (motion-profile feeds rely on this).
pub struct ExternalQueueBlock {
    shared: Arc<Mutex<VecDeque<Value>>>,
    latest: Value,
}

/// Producer handle paired with an [`ExternalQueueBlock`].
#[derive(Clone)]
pub struct QueueHandle {
    shared: Arc<Mutex<VecDeque<Value>>>,
}

impl QueueHandle {
    pub fn push(&self, value: Value) {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(value);
    }

    pub fn len(&self) -> usize {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExternalQueueBlock {
    pub fn new() -> (Self, QueueHandle) {
        let shared = Arc::new(Mutex::new(VecDeque::new()));
        let handle = QueueHandle {
            shared: Arc::clone(&shared),
        };
        (
            ExternalQueueBlock {
                shared,
                latest: Value::default(),
            },
            handle,
        )
    }
}

impl Block for ExternalQueueBlock {
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
        "external-queue"
    }

    fn init(&mut self) {
        self.latest = Value::default();
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn process(&mut self, _inputs: &[Option<Value>]) {
        if let Some(next) = self
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            self.latest = next;
        }
    }

    fn output(&self, _index: usize) -> Value {
        self.latest.clone()
    }
}

/// One-shot boolean latch. `fire` from any thread makes the block emit `true`
/// for exactly one tick, then it falls back to `false` until fired again.
pub struct PulseBlock {
    flag: Arc<AtomicBool>,
    fired: bool,
}

/// Trigger handle paired with a [`PulseBlock`].
#[derive(Clone)]
pub struct PulseHandle {
    flag: Arc<AtomicBool>,
}

impl PulseHandle {
    pub fn fire(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

impl PulseBlock {
    pub fn new() -> (Self, PulseHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        let handle = PulseHandle {
            flag: Arc::clone(&flag),
        };
        (PulseBlock { flag, fired: false }, handle)
    }
}

impl Block for PulseBlock {
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
        "pulse"
    }

    fn init(&mut self) {
        self.fired = false;
        self.flag.store(false, Ordering::Release);
    }

    fn process(&mut self, _inputs: &[Option<Value>]) {
        self.fired = self.flag.swap(false, Ordering::AcqRel);
    }

    fn output(&self, _index: usize) -> Value {
        Value::Bool(self.fired)
    }
}
