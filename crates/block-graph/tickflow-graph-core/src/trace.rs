//! Build-time trace: reachability, execution order, and cycle validity.
//!
//! The trace replays, statically, exactly the pull pattern the runner performs
//! each tick. Every always-eager block is a root; resolving an input-first
//! block requires resolving its sources first; an output-first block is
//! immediately satisfiable (its tick-N outputs come from tick N-1), so it is
//! recorded and re-queued, and only a later pass resolves the inputs its own
//! deferred `process` call will need. Hitting a block that is still mid-
//! resolution is therefore a genuine unresolvable cycle, not a traversal
//! artifact.
//!
//! Blocks the trace never reaches cannot be demanded at runtime either; they
//! are pruned from the compiled order.

use std::collections::VecDeque;

use log::debug;

use crate::builder::BlockEntry;
use crate::error::BuildError;

/// Per-block resolution state. One flat enum inspected by a single stepping
/// function; there is no per-flavor dispatch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TraceState {
    /// Never reached (so far).
    NotProcessed,
    /// Input-first resolution in progress; on the DFS stack right now.
    Processing,
    /// Output-first block whose stored output satisfies consumers this pass;
    /// its own `process` inputs are resolved on a later pass.
    Stored,
    /// Queued output-first block about to have its deferred inputs resolved.
    StoredProcessNow,
    /// Deferred input resolution in progress.
    StoredProcessing,
    /// Fully resolved; safe to reuse.
    Processed,
}

/// Trace the wiring graph and return the compiled execution order as indices
/// into `entries`: always-eager blocks first in discovery order, then lazy
/// blocks. Unreachable blocks are absent (pruned).
pub(crate) fn analyze(entries: &[BlockEntry]) -> Result<Vec<usize>, BuildError> {
    let mut states = vec![TraceState::NotProcessed; entries.len()];
    let mut discovery: Vec<usize> = Vec::new();

    let mut queue: VecDeque<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.policy.is_always())
        .map(|(index, _)| index)
        .collect();
    if queue.is_empty() {
        return Err(BuildError::NoAlwaysBlock);
    }

    while let Some(index) = queue.pop_front() {
        if states[index] == TraceState::Stored {
            states[index] = TraceState::StoredProcessNow;
        }
        trace(index, entries, &mut states, &mut discovery, &mut queue)?;
    }

    // Everything discovered ends up Processed: Stored blocks are re-queued
    // and promoted before the queue drains.
    debug_assert!(discovery
        .iter()
        .all(|&index| states[index] == TraceState::Processed));

    let pruned = entries.len() - discovery.len();
    if pruned > 0 {
        for (index, entry) in entries.iter().enumerate() {
            if states[index] == TraceState::NotProcessed {
                debug!("pruning unreachable block {}:{}", index, entry.label);
            }
        }
    }

    let mut order: Vec<usize> = Vec::with_capacity(discovery.len());
    order.extend(
        discovery
            .iter()
            .copied()
            .filter(|&index| entries[index].policy.is_always()),
    );
    order.extend(
        discovery
            .iter()
            .copied()
            .filter(|&index| !entries[index].policy.is_always()),
    );

    debug!(
        "block graph compiled: {} blocks kept, {} pruned",
        order.len(),
        pruned
    );
    Ok(order)
}

fn trace(
    index: usize,
    entries: &[BlockEntry],
    states: &mut [TraceState],
    discovery: &mut Vec<usize>,
    queue: &mut VecDeque<usize>,
) -> Result<(), BuildError> {
    match states[index] {
        TraceState::Processed | TraceState::Stored | TraceState::StoredProcessing => Ok(()),
        TraceState::Processing => Err(BuildError::UnresolvableCycle(
            entries[index].label.clone(),
        )),
        TraceState::StoredProcessNow => {
            states[index] = TraceState::StoredProcessing;
            resolve_sources(index, entries, states, discovery, queue)?;
            states[index] = TraceState::Processed;
            Ok(())
        }
        TraceState::NotProcessed => {
            if entries[index].policy.is_output_first() {
                // Satisfiable without recursing: this is how cycles break.
                states[index] = TraceState::Stored;
                discovery.push(index);
                queue.push_back(index);
                Ok(())
            } else {
                states[index] = TraceState::Processing;
                resolve_sources(index, entries, states, discovery, queue)?;
                states[index] = TraceState::Processed;
                discovery.push(index);
                Ok(())
            }
        }
    }
}

fn resolve_sources(
    index: usize,
    entries: &[BlockEntry],
    states: &mut [TraceState],
    discovery: &mut Vec<usize>,
    queue: &mut VecDeque<usize>,
) -> Result<(), BuildError> {
    for source in entries[index].sources.iter().flatten() {
        trace(source.0, entries, states, discovery, queue)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, EvalPolicy};
    use tickflow_api_core::Value;

    struct Probe {
        inputs: usize,
        policy: EvalPolicy,
    }

    impl Block for Probe {
        fn num_inputs(&self) -> usize {
            self.inputs
        }

        fn num_outputs(&self) -> usize {
            1
        }

        fn policy(&self) -> EvalPolicy {
            self.policy
        }

        fn process(&mut self, _inputs: &[Option<Value>]) {}

        fn output(&self, _index: usize) -> Value {
            Value::default()
        }
    }

    fn entry(inputs: usize, policy: EvalPolicy, sources: Vec<Option<(usize, usize)>>) -> BlockEntry {
        BlockEntry {
            block: Box::new(Probe { inputs, policy }),
            label: "probe".to_string(),
            policy,
            sources,
        }
    }

    #[test]
    fn linear_chain_orders_dependencies_first() {
        // 0 <- 1 <- 2(always)
        let entries = vec![
            entry(0, EvalPolicy::LAZY_INPUT_FIRST, vec![]),
            entry(1, EvalPolicy::LAZY_INPUT_FIRST, vec![Some((0, 0))]),
            entry(1, EvalPolicy::ALWAYS_INPUT_FIRST, vec![Some((1, 0))]),
        ];
        let order = analyze(&entries).expect("valid graph");
        assert_eq!(order, vec![2, 0, 1]);
    }

    #[test]
    fn strict_cycle_is_rejected() {
        // 0 <-> 1, demanded by 2(always)
        let entries = vec![
            entry(1, EvalPolicy::LAZY_INPUT_FIRST, vec![Some((1, 0))]),
            entry(1, EvalPolicy::LAZY_INPUT_FIRST, vec![Some((0, 0))]),
            entry(1, EvalPolicy::ALWAYS_INPUT_FIRST, vec![Some((1, 0))]),
        ];
        let err = analyze(&entries).expect_err("cycle has no escape");
        assert!(matches!(err, BuildError::UnresolvableCycle(_)));
    }

    #[test]
    fn output_first_member_breaks_the_cycle() {
        let entries = vec![
            entry(1, EvalPolicy::LAZY_OUTPUT_FIRST, vec![Some((1, 0))]),
            entry(1, EvalPolicy::LAZY_INPUT_FIRST, vec![Some((0, 0))]),
            entry(1, EvalPolicy::ALWAYS_INPUT_FIRST, vec![Some((1, 0))]),
        ];
        let order = analyze(&entries).expect("cycle broken by output-first");
        assert_eq!(order.len(), 3);
        // Always blocks lead the compiled order.
        assert_eq!(order[0], 2);
    }

    #[test]
    fn unreachable_blocks_are_pruned() {
        let entries = vec![
            entry(0, EvalPolicy::LAZY_INPUT_FIRST, vec![]),
            entry(0, EvalPolicy::ALWAYS_INPUT_FIRST, vec![]),
        ];
        let order = analyze(&entries).expect("valid graph");
        assert_eq!(order, vec![1]);
    }

    #[test]
    fn graph_without_always_block_is_rejected() {
        let entries = vec![entry(0, EvalPolicy::LAZY_INPUT_FIRST, vec![])];
        assert_eq!(analyze(&entries), Err(BuildError::NoAlwaysBlock));
    }

    #[test]
    fn self_loop_on_output_first_block_is_fine() {
        let entries = vec![
            entry(1, EvalPolicy::ALWAYS_OUTPUT_FIRST, vec![Some((0, 0))]),
        ];
        let order = analyze(&entries).expect("self feedback through stored output");
        assert_eq!(order, vec![0]);
    }
}
