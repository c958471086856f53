//! Error taxonomy for the block-graph scheduler.
//!
//! Build-time errors abort [`GraphBuilder::build`](crate::builder::GraphBuilder::build)
//! entirely; no partial graph is ever returned. Tick-time errors indicate an
//! internal-invariant violation and are fatal by design: a control system that
//! keeps running on possibly-corrupted state is worse than one that halts.

use thiserror::Error;

/// Errors raised while wiring or compiling a graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// A block's own validation pass rejected its wiring (missing required
    /// connection, malformed arity, or a block-specific constraint).
    #[error("invalid configuration for block `{block}`: {reason}")]
    InvalidConfiguration { block: String, reason: String },

    /// A dependency cycle with no output-first member: no execution order can
    /// satisfy it because every member needs its inputs before producing output.
    #[error("unresolvable cycle involving block `{0}` (no output-first member breaks the loop)")]
    UnresolvableCycle(String),

    /// The input slot already has a source wired to it.
    #[error("input {slot} of block `{block}` already has a source")]
    AlreadyConnected { block: String, slot: usize },

    /// A handle minted by a different builder was passed in.
    #[error("handle belongs to a different graph builder")]
    ForeignHandle,

    /// Slot index past the block's declared input arity.
    #[error("input slot {slot} out of range for block `{block}` ({arity} inputs)")]
    InputOutOfRange {
        block: String,
        slot: usize,
        arity: usize,
    },

    /// Slot index past the block's declared output arity.
    #[error("output slot {slot} out of range for block `{block}` ({arity} outputs)")]
    OutputOutOfRange {
        block: String,
        slot: usize,
        arity: usize,
    },

    /// No always-eager block exists, so nothing would ever execute.
    #[error("graph contains no always block; nothing would ever run")]
    NoAlwaysBlock,
}

/// Errors raised while executing a tick. Both variants are defensive backups
/// of checks the build-time trace already performs; hitting one means either
/// the scheduler or a block implementation has a logic bug, and the control
/// loop must stop rather than continue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TickError {
    /// A block's output was pulled while it was still inside `process`.
    #[error("block `{0}` pulled its own output while it was still processing")]
    Reentrancy(String),

    /// A wired source referenced an output slot past the producer's arity.
    #[error("output {index} out of range for block `{block}` ({count} outputs)")]
    OutputIndexOutOfRange {
        block: String,
        index: usize,
        count: usize,
    },
}
