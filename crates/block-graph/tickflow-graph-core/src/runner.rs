//! Per-tick executor over the compiled graph.
//!
//! One tick is a single call stack of recursive, memoized pulls. Input-first
//! blocks are resolved on demand and cached for the remainder of the tick;
//! output-first blocks double-buffer: the buffer being read this tick was
//! written by last tick's `process`, and this tick's `process` fills the other
//! buffer. The re-entrancy check backs up the build-time cycle analysis; it
//! can only fire if the compiled graph is malformed, and then the tick must
//! abort rather than hand consumers stale or partial data.

use hashbrown::HashMap;
use log::trace;
use tickflow_api_core::Value;

use crate::compiled::CompiledGraph;
use crate::error::TickError;

/// Per-block resolution state within one tick. Structurally mirrors the
/// analyzer's build-time states, collapsed to what the runner needs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TickState {
    Idle,
    Processing,
    Done,
}

struct RunState {
    tick_state: TickState,
    /// Outputs readable this tick.
    visible: Vec<Value>,
    /// Next tick's outputs; only written for output-first blocks.
    pending: Vec<Value>,
}

pub(crate) struct Runner {
    graph: CompiledGraph,
    states: Vec<RunState>,
    counts: Vec<u64>,
}

impl Runner {
    pub(crate) fn new(graph: CompiledGraph) -> Self {
        let states = graph
            .blocks
            .iter()
            .map(|block| RunState {
                tick_state: TickState::Idle,
                visible: vec![Value::default(); block.num_outputs],
                pending: vec![Value::default(); block.num_outputs],
            })
            .collect();
        let counts = vec![0; graph.blocks.len()];
        Runner {
            graph,
            states,
            counts,
        }
    }

    pub(crate) fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    /// Reset every block and re-establish output-first blocks' tick-0 values
    /// from whatever their `init` left behind.
    pub(crate) fn init(&mut self) {
        for (index, compiled) in self.graph.blocks.iter_mut().enumerate() {
            compiled.block.init();
            let state = &mut self.states[index];
            state.tick_state = TickState::Idle;
            for slot in state.visible.iter_mut() {
                *slot = Value::default();
            }
            for slot in state.pending.iter_mut() {
                *slot = Value::default();
            }
            if compiled.policy.is_output_first() {
                for output in 0..compiled.num_outputs {
                    let value = compiled.block.output(output);
                    state.visible[output] = value.clone();
                    state.pending[output] = value;
                }
            }
        }
        for count in &mut self.counts {
            *count = 0;
        }
    }

    /// Clear transient per-tick state without touching the compiled topology.
    pub(crate) fn stop(&mut self) {
        for state in &mut self.states {
            state.tick_state = TickState::Idle;
            for slot in state.visible.iter_mut() {
                *slot = Value::default();
            }
            for slot in state.pending.iter_mut() {
                *slot = Value::default();
            }
        }
    }

    /// Execute one tick. Returns the number of blocks processed.
    pub(crate) fn run_tick(&mut self) -> Result<usize, TickError> {
        for state in &mut self.states {
            state.tick_state = TickState::Idle;
        }

        // Phase 1: every output-first block exposes last tick's computed
        // values. All swaps happen before any process call so no block can
        // observe a peer's unswapped buffer.
        for index in 0..self.graph.blocks.len() {
            if self.graph.blocks[index].policy.is_output_first() {
                let state = &mut self.states[index];
                std::mem::swap(&mut state.visible, &mut state.pending);
            }
        }
        for index in 0..self.graph.blocks.len() {
            let policy = self.graph.blocks[index].policy;
            if policy.is_output_first() && policy.is_always() {
                self.resolve(index)?;
            }
        }

        // Phase 2: eager pass over always input-first blocks; each pull
        // recursively resolves its lazy dependency chain.
        for index in 0..self.graph.blocks.len() {
            let policy = self.graph.blocks[index].policy;
            if policy.is_always() && !policy.is_output_first() {
                self.resolve(index)?;
            }
        }

        // Phase 3: drain lazy output-first blocks so their pending buffer is
        // refilled from this tick's settled values.
        for index in 0..self.graph.blocks.len() {
            if self.graph.blocks[index].policy.is_output_first()
                && self.states[index].tick_state != TickState::Done
            {
                self.resolve(index)?;
            }
        }

        Ok(self
            .states
            .iter()
            .filter(|state| state.tick_state == TickState::Done)
            .count())
    }

    /// Ensure `index` has been processed this tick, recursively resolving its
    /// input-first sources. Memoized: subsequent calls within the tick return
    /// the cached result.
    fn resolve(&mut self, index: usize) -> Result<(), TickError> {
        match self.states[index].tick_state {
            TickState::Done => return Ok(()),
            TickState::Processing => {
                return Err(TickError::Reentrancy(
                    self.graph.blocks[index].label.clone(),
                ))
            }
            TickState::Idle => {}
        }
        self.states[index].tick_state = TickState::Processing;
        trace!("processing block {}:{}", index, self.graph.blocks[index].label);

        let inputs = self.gather_inputs(index)?;
        let compiled = &mut self.graph.blocks[index];
        compiled.block.process(&inputs);
        let outputs: Vec<Value> = (0..compiled.num_outputs)
            .map(|output| compiled.block.output(output))
            .collect();
        let output_first = compiled.policy.is_output_first();

        let state = &mut self.states[index];
        if output_first {
            state.pending = outputs;
        } else {
            state.visible = outputs;
        }
        state.tick_state = TickState::Done;
        self.counts[index] += 1;
        Ok(())
    }

    fn gather_inputs(&mut self, index: usize) -> Result<Vec<Option<Value>>, TickError> {
        let arity = self.graph.blocks[index].num_inputs;
        let mut values = Vec::with_capacity(arity);
        for slot in 0..arity {
            match self.graph.blocks[index].sources[slot] {
                None => values.push(None),
                Some(source) => {
                    // Output-first producers are read from their stored
                    // buffer without forcing their own process.
                    if !self.graph.blocks[source.block].policy.is_output_first() {
                        self.resolve(source.block)?;
                    }
                    let value = self.states[source.block]
                        .visible
                        .get(source.output)
                        .cloned()
                        .ok_or_else(|| TickError::OutputIndexOutOfRange {
                            block: self.graph.blocks[source.block].label.clone(),
                            index: source.output,
                            count: self.graph.blocks[source.block].num_outputs,
                        })?;
                    values.push(Some(value));
                }
            }
        }
        Ok(values)
    }

    /// Cumulative per-block process counts keyed by `"{index}:{label}"`.
    pub(crate) fn process_counts(&self) -> HashMap<String, u64> {
        self.graph
            .blocks
            .iter()
            .enumerate()
            .map(|(index, block)| (format!("{}:{}", index, block.label), self.counts[index]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, EvalPolicy};
    use crate::builder::BlockEntry;
    use crate::compiled::CompiledGraph;

    struct Echo {
        policy: EvalPolicy,
        last: Value,
    }

    impl Block for Echo {
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
            "echo"
        }

        fn process(&mut self, inputs: &[Option<Value>]) {
            self.last = inputs[0].clone().unwrap_or_default();
        }

        fn output(&self, _index: usize) -> Value {
            self.last.clone()
        }
    }

    fn echo_entry(policy: EvalPolicy, sources: Vec<Option<(usize, usize)>>) -> BlockEntry {
        BlockEntry {
            block: Box::new(Echo {
                policy,
                last: Value::default(),
            }),
            label: "echo".to_string(),
            policy,
            sources,
        }
    }

    // The analyzer rejects strict cycles, so this compiled graph can only be
    // produced by bypassing it; the runner must still refuse to recurse.
    #[test]
    fn reentrancy_is_a_fatal_tick_error() {
        let entries = vec![
            echo_entry(EvalPolicy::ALWAYS_INPUT_FIRST, vec![Some((1, 0))]),
            echo_entry(EvalPolicy::LAZY_INPUT_FIRST, vec![Some((0, 0))]),
        ];
        let graph = CompiledGraph::new(entries, &[0, 1]);
        let mut runner = Runner::new(graph);
        runner.init();
        let err = runner.run_tick().expect_err("malformed graph must abort");
        assert!(matches!(err, TickError::Reentrancy(_)));
    }

    #[test]
    fn out_of_range_source_is_a_fatal_tick_error() {
        let entries = vec![
            echo_entry(EvalPolicy::LAZY_INPUT_FIRST, vec![None]),
            echo_entry(EvalPolicy::ALWAYS_INPUT_FIRST, vec![Some((0, 7))]),
        ];
        let graph = CompiledGraph::new(entries, &[1, 0]);
        let mut runner = Runner::new(graph);
        runner.init();
        let err = runner.run_tick().expect_err("bad output index must abort");
        assert!(matches!(
            err,
            TickError::OutputIndexOutOfRange { index: 7, .. }
        ));
    }
}
