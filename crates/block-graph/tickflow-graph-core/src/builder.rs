//! Mutable wiring graph: the build-time representation users assemble.
//!
//! Blocks and connections live in a flat arena owned by the builder; handles
//! are copyable indices tagged with the builder's id, so cross-builder misuse
//! is caught at `connect` time and the compiled graph carries no reference
//! cycles. `build` consumes the builder, runs the trace analysis, and returns
//! a ready [`ControlSystem`]; the wiring representation is discarded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tickflow_api_core::Value;

use crate::block::{Block, EvalPolicy};
use crate::blocks::basic::{CombineBlock, ConstantBlock, Monitor, MonitorBlock, PipeBlock};
use crate::blocks::external::{
    ExternalQueueBlock, ExternalValueBlock, PulseBlock, PulseHandle, QueueHandle, ValueHandle,
};
use crate::blocks::special::{LoopClock, LoopTimeBlock, ShutdownSinkBlock, TickIndexBlock};
use crate::compiled::CompiledGraph;
use crate::error::BuildError;
use crate::system::ControlSystem;
use crate::trace;

static NEXT_BUILDER_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque id distinguishing builder instances; handles carry it so a handle
/// minted by one builder cannot be used against another.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BuilderId(u64);

/// Handle to a block added to a builder.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockHandle {
    pub(crate) builder: BuilderId,
    pub(crate) index: usize,
}

/// Handle to one input slot of an added block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InputHandle {
    pub(crate) block: BlockHandle,
    pub(crate) slot: usize,
}

/// Handle to one output slot of an added block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutputHandle {
    pub(crate) block: BlockHandle,
    pub(crate) slot: usize,
}

pub(crate) struct BlockEntry {
    pub block: Box<dyn Block>,
    pub label: String,
    pub policy: EvalPolicy,
    /// Per input slot: `(source block index, source output slot)`.
    pub sources: Vec<Option<(usize, usize)>>,
}

/// The mutable pre-build wiring graph.
pub struct GraphBuilder {
    id: BuilderId,
    entries: Vec<BlockEntry>,
    clock: LoopClock,
    shutdown_flag: Arc<AtomicBool>,
    tick_index: BlockHandle,
    loop_time: BlockHandle,
    shutdown: BlockHandle,
}

impl GraphBuilder {
    /// Create an empty builder. The three canonical utility roles (tick index,
    /// loop time, shutdown sink) are registered up front and reachable through
    /// their accessor methods; there is no reflection-based discovery.
    pub fn new() -> Self {
        let id = BuilderId(NEXT_BUILDER_ID.fetch_add(1, Ordering::Relaxed));
        let clock = LoopClock::new();
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let mut builder = GraphBuilder {
            id,
            entries: Vec::new(),
            clock: clock.clone(),
            shutdown_flag: Arc::clone(&shutdown_flag),
            tick_index: BlockHandle { builder: id, index: 0 },
            loop_time: BlockHandle { builder: id, index: 0 },
            shutdown: BlockHandle { builder: id, index: 0 },
        };
        builder.tick_index = builder.add(TickIndexBlock::new(clock.clone()));
        builder.loop_time = builder.add(LoopTimeBlock::new(clock));
        builder.shutdown = builder.add(ShutdownSinkBlock::new(shutdown_flag));
        builder
    }

    /// Move a block into the graph and return its handle.
    pub fn add(&mut self, block: impl Block + 'static) -> BlockHandle {
        let index = self.entries.len();
        let sources = vec![None; block.num_inputs()];
        self.entries.push(BlockEntry {
            label: block.label().to_string(),
            policy: block.policy(),
            sources,
            block: Box::new(block),
        });
        BlockHandle {
            builder: self.id,
            index,
        }
    }

    fn check_owned(&self, handle: BlockHandle) -> Result<&BlockEntry, BuildError> {
        if handle.builder != self.id {
            return Err(BuildError::ForeignHandle);
        }
        Ok(&self.entries[handle.index])
    }

    /// Resolve an input slot handle, range-checked against the block's arity.
    pub fn input(&self, block: BlockHandle, slot: usize) -> Result<InputHandle, BuildError> {
        let entry = self.check_owned(block)?;
        let arity = entry.block.num_inputs();
        if slot >= arity {
            return Err(BuildError::InputOutOfRange {
                block: entry.label.clone(),
                slot,
                arity,
            });
        }
        Ok(InputHandle { block, slot })
    }

    /// Resolve an output slot handle, range-checked against the block's arity.
    pub fn output(&self, block: BlockHandle, slot: usize) -> Result<OutputHandle, BuildError> {
        let entry = self.check_owned(block)?;
        let arity = entry.block.num_outputs();
        if slot >= arity {
            return Err(BuildError::OutputOutOfRange {
                block: entry.label.clone(),
                slot,
                arity,
            });
        }
        Ok(OutputHandle { block, slot })
    }

    /// Wire an output into an input. Fails if the input already has a source
    /// or if either handle belongs to another builder.
    pub fn connect(&mut self, input: InputHandle, output: OutputHandle) -> Result<(), BuildError> {
        if input.block.builder != self.id || output.block.builder != self.id {
            return Err(BuildError::ForeignHandle);
        }
        let entry = &self.entries[input.block.index];
        if entry.sources[input.slot].is_some() {
            return Err(BuildError::AlreadyConnected {
                block: entry.label.clone(),
                slot: input.slot,
            });
        }
        self.entries[input.block.index].sources[input.slot] =
            Some((output.block.index, output.slot));
        Ok(())
    }

    /// Whether the input slot has a source wired. Foreign handles read as
    /// unconnected.
    pub fn is_connected(&self, input: InputHandle) -> bool {
        input.block.builder == self.id
            && self.entries[input.block.index].sources[input.slot].is_some()
    }

    /// Whether any input in the graph consumes this output. Dead outputs are
    /// legal; they are simply ignored by pruning.
    pub fn is_output_connected(&self, output: OutputHandle) -> bool {
        output.block.builder == self.id
            && self.entries.iter().any(|entry| {
                entry
                    .sources
                    .iter()
                    .any(|src| *src == Some((output.block.index, output.slot)))
            })
    }

    // --- canonical utility handles --------------------------------------

    /// Output of the monotonic tick-index source (integer from 0, as a float).
    pub fn tick_index(&self) -> OutputHandle {
        OutputHandle {
            block: self.tick_index,
            slot: 0,
        }
    }

    /// Output of the elapsed-loop-time source (seconds, NaN on tick 0).
    pub fn loop_time(&self) -> OutputHandle {
        OutputHandle {
            block: self.loop_time,
            slot: 0,
        }
    }

    /// Input of the shutdown-request sink. A truthy value on any tick requests
    /// loop termination after that tick completes.
    pub fn shutdown(&self) -> InputHandle {
        InputHandle {
            block: self.shutdown,
            slot: 0,
        }
    }

    /// Wire a boolean-producing output into the shutdown sink.
    pub fn request_shutdown_when(&mut self, source: OutputHandle) -> Result<(), BuildError> {
        self.connect(self.shutdown(), source)
    }

    // --- sugar over add + connect ---------------------------------------

    /// Add a constant-value source.
    pub fn constant(&mut self, value: Value) -> OutputHandle {
        let handle = self.add(ConstantBlock::new(value));
        OutputHandle {
            block: handle,
            slot: 0,
        }
    }

    /// Add a unary map over `source`.
    pub fn pipe(
        &mut self,
        source: OutputHandle,
        f: impl FnMut(Value) -> Value + 'static,
    ) -> Result<OutputHandle, BuildError> {
        let handle = self.add(PipeBlock::new(f));
        self.connect(InputHandle { block: handle, slot: 0 }, source)?;
        Ok(OutputHandle {
            block: handle,
            slot: 0,
        })
    }

    /// Add a binary zip over `a` and `b`.
    pub fn combine(
        &mut self,
        a: OutputHandle,
        b: OutputHandle,
        f: impl FnMut(Value, Value) -> Value + 'static,
    ) -> Result<OutputHandle, BuildError> {
        let handle = self.add(CombineBlock::new(f));
        self.connect(InputHandle { block: handle, slot: 0 }, a)?;
        self.connect(InputHandle { block: handle, slot: 1 }, b)?;
        Ok(OutputHandle {
            block: handle,
            slot: 0,
        })
    }

    /// Add an always-eager monitor sink on `source` and return its read handle.
    pub fn monitor(&mut self, source: OutputHandle) -> Result<Monitor, BuildError> {
        let (block, monitor) = MonitorBlock::new();
        let handle = self.add(block);
        self.connect(InputHandle { block: handle, slot: 0 }, source)?;
        Ok(monitor)
    }

    /// Add an externally-settable value source; the returned handle may be
    /// used from any thread.
    pub fn external_value(&mut self, initial: Value) -> (OutputHandle, ValueHandle) {
        let (block, handle) = ExternalValueBlock::new(initial);
        let added = self.add(block);
        (
            OutputHandle {
                block: added,
                slot: 0,
            },
            handle,
        )
    }

    /// Add an externally-fed queue source draining one element per tick.
    pub fn external_queue(&mut self) -> (OutputHandle, QueueHandle) {
        let (block, handle) = ExternalQueueBlock::new();
        let added = self.add(block);
        (
            OutputHandle {
                block: added,
                slot: 0,
            },
            handle,
        )
    }

    /// Add a one-shot pulse source firing `true` for a single tick.
    pub fn pulse(&mut self) -> (OutputHandle, PulseHandle) {
        let (block, handle) = PulseBlock::new();
        let added = self.add(block);
        (
            OutputHandle {
                block: added,
                slot: 0,
            },
            handle,
        )
    }

    // --- compilation ----------------------------------------------------

    /// Trace, validate, and compile the wiring graph, returning the runnable
    /// control system. Consuming `self` makes a second build unrepresentable.
    /// All wiring errors surface here, before any loop activity begins.
    pub fn build(self) -> Result<ControlSystem, BuildError> {
        let order = trace::analyze(&self.entries)?;

        for &index in &order {
            let entry = &self.entries[index];
            let connected: Vec<bool> = entry.sources.iter().map(Option::is_some).collect();
            for (slot, is_connected) in connected.iter().enumerate() {
                if !is_connected && entry.block.input_required(slot) {
                    return Err(BuildError::InvalidConfiguration {
                        block: entry.label.clone(),
                        reason: format!("required input {slot} is not connected"),
                    });
                }
            }
            entry
                .block
                .validate(&connected)
                .map_err(|reason| BuildError::InvalidConfiguration {
                    block: entry.label.clone(),
                    reason,
                })?;
        }

        let graph = CompiledGraph::new(self.entries, &order);
        Ok(ControlSystem::new(graph, self.clock, self.shutdown_flag))
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;

    #[test]
    fn connect_rejects_double_wiring() {
        let mut builder = GraphBuilder::new();
        let src = builder.constant(Value::Float(1.0));
        let pipe = builder.add(PipeBlock::new(|v| v));
        let input = builder.input(pipe, 0).expect("slot 0 exists");
        builder.connect(input, src).expect("first connect");
        let err = builder.connect(input, src).expect_err("second connect");
        assert!(matches!(err, BuildError::AlreadyConnected { slot: 0, .. }));
    }

    #[test]
    fn connect_rejects_foreign_handles() {
        let mut a = GraphBuilder::new();
        let b = GraphBuilder::new();
        let src = a.constant(Value::Float(1.0));
        let err = a.connect(b.shutdown(), src).expect_err("foreign input");
        assert_eq!(err, BuildError::ForeignHandle);
    }

    #[test]
    fn slot_handles_are_range_checked() {
        let mut builder = GraphBuilder::new();
        let pipe = builder.add(PipeBlock::new(|v| v));
        assert!(matches!(
            builder.input(pipe, 1),
            Err(BuildError::InputOutOfRange { slot: 1, arity: 1, .. })
        ));
        assert!(matches!(
            builder.output(pipe, 3),
            Err(BuildError::OutputOutOfRange { slot: 3, arity: 1, .. })
        ));
    }

    #[test]
    fn is_connected_tracks_wiring() {
        let mut builder = GraphBuilder::new();
        let src = builder.constant(Value::Float(1.0));
        assert!(!builder.is_output_connected(src));
        assert!(!builder.is_connected(builder.shutdown()));
        builder.request_shutdown_when(src).expect("wire shutdown");
        assert!(builder.is_output_connected(src));
        assert!(builder.is_connected(builder.shutdown()));
    }
}
