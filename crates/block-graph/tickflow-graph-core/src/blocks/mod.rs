//! Built-in leaf blocks.
//!
//! - [`special`] holds the canonical utility roles every builder registers up
//!   front: tick index, loop time, and the shutdown sink.
//! - [`basic`] holds the wiring sugar (constant sources, pipes, combiners,
//!   monitors) layered over `add` + `connect`.
//! - [`external`] holds the only cross-thread surface: leaf sources that other
//!   threads may feed concurrently with the tick thread.

pub mod basic;
pub mod external;
pub mod special;

pub use basic::{CombineBlock, ConstantBlock, Monitor, MonitorBlock, PipeBlock};
pub use external::{
    ExternalQueueBlock, ExternalValueBlock, PulseBlock, PulseHandle, QueueHandle, ValueHandle,
};
pub use special::{LoopClock, LoopTimeBlock, ShutdownSinkBlock, TickIndexBlock};
