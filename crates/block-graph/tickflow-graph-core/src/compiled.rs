//! Immutable compiled graph: the analyzer's output.
//!
//! Named wiring is resolved into integer indices over one flat array, already
//! emitted in a valid execution order (always-eager blocks first). Nothing
//! here is mutated after compilation; the runner layers its per-tick state on
//! top by index.

use crate::block::EvalPolicy;
use crate::builder::BlockEntry;

/// A resolved input source: which compiled block, which of its output slots.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub block: usize,
    pub output: usize,
}

pub(crate) struct CompiledBlock {
    pub block: Box<dyn crate::block::Block>,
    pub label: String,
    pub policy: EvalPolicy,
    pub num_inputs: usize,
    pub num_outputs: usize,
    /// Per input slot; `None` marks an unconnected input.
    pub sources: Vec<Option<Source>>,
}

/// The immutable, analyzer-validated, execution-ordered block array.
pub struct CompiledGraph {
    pub(crate) blocks: Vec<CompiledBlock>,
}

impl CompiledGraph {
    /// Consume the builder's entries, keeping `order` and remapping source
    /// indices from builder positions to compiled positions.
    pub(crate) fn new(entries: Vec<BlockEntry>, order: &[usize]) -> Self {
        let mut position = vec![usize::MAX; entries.len()];
        for (pos, &index) in order.iter().enumerate() {
            position[index] = pos;
        }

        let mut slots: Vec<Option<BlockEntry>> = entries.into_iter().map(Some).collect();
        let mut blocks = Vec::with_capacity(order.len());
        for &index in order {
            let entry = match slots[index].take() {
                Some(entry) => entry,
                None => unreachable!("trace order contains a duplicate index"),
            };
            let sources = entry
                .sources
                .iter()
                .map(|source| {
                    source.map(|(block, output)| {
                        // A kept consumer's sources were traced too, so they
                        // are always kept as well.
                        debug_assert_ne!(position[block], usize::MAX);
                        Source {
                            block: position[block],
                            output,
                        }
                    })
                })
                .collect();
            blocks.push(CompiledBlock {
                label: entry.label,
                policy: entry.policy,
                num_inputs: entry.block.num_inputs(),
                num_outputs: entry.block.num_outputs(),
                sources,
                block: entry.block,
            });
        }
        CompiledGraph { blocks }
    }

    /// Number of blocks that survived pruning.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Labels in compiled (execution) order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|block| block.label.as_str())
    }
}
