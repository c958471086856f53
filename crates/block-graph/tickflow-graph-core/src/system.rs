//! Host-facing lifecycle: the `init` / `tick` / `stop` triple a loop driver
//! calls.
//!
//! The system owns the runner and the shared cells behind the utility blocks:
//! before each tick it publishes the tick index and elapsed time, and after
//! the tick it reads the shutdown sink's latched request to decide whether
//! the loop should continue. Cadence (when `tick` is called) belongs to the
//! host; only logical ordering lives here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use serde::Serialize;

use crate::blocks::special::LoopClock;
use crate::compiled::CompiledGraph;
use crate::error::TickError;
use crate::runner::Runner;

/// Summary of one executed tick, serializable for host telemetry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TickReport {
    /// Tick index, monotonic from 0.
    pub tick: u64,
    /// Seconds since the previous tick; NaN on tick 0.
    pub dt: f64,
    /// Number of blocks processed this tick.
    pub processed: usize,
    /// False once a shutdown request latched during this tick.
    pub should_continue: bool,
}

/// A compiled, runnable control system.
pub struct ControlSystem {
    runner: Runner,
    clock: LoopClock,
    shutdown_flag: Arc<AtomicBool>,
    ticks: u64,
}

impl std::fmt::Debug for ControlSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSystem")
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl ControlSystem {
    pub(crate) fn new(
        graph: CompiledGraph,
        clock: LoopClock,
        shutdown_flag: Arc<AtomicBool>,
    ) -> Self {
        ControlSystem {
            runner: Runner::new(graph),
            clock,
            shutdown_flag,
            ticks: 0,
        }
    }

    /// Reset all transient block state. Must be called once before ticking,
    /// and again after `stop` to restart without rebuilding the graph.
    pub fn init(&mut self) {
        self.ticks = 0;
        self.clock.reset();
        self.shutdown_flag.store(false, Ordering::Relaxed);
        self.runner.init();
    }

    /// Execute one tick. `elapsed_seconds` is the host-measured time since
    /// the previous tick; it is published as NaN on tick 0 regardless, since
    /// no previous tick exists. Returns whether the loop should continue.
    pub fn tick(&mut self, elapsed_seconds: f64) -> Result<bool, TickError> {
        self.tick_report(elapsed_seconds)
            .map(|report| report.should_continue)
    }

    /// [`tick`](Self::tick) variant returning the full per-tick summary.
    pub fn tick_report(&mut self, elapsed_seconds: f64) -> Result<TickReport, TickError> {
        let dt = if self.ticks == 0 {
            f64::NAN
        } else {
            elapsed_seconds
        };
        self.clock.publish(self.ticks, dt);
        let processed = self.runner.run_tick()?;
        let report = TickReport {
            tick: self.ticks,
            dt,
            processed,
            should_continue: !self.shutdown_flag.load(Ordering::Relaxed),
        };
        self.ticks = self.ticks.wrapping_add(1);
        Ok(report)
    }

    /// Clear transient state without destroying the compiled topology;
    /// `init` restarts the system afterwards.
    pub fn stop(&mut self) {
        self.runner.stop();
        self.shutdown_flag.store(false, Ordering::Relaxed);
        self.clock.reset();
        self.ticks = 0;
    }

    /// Number of ticks executed since `init`.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// The immutable compiled graph this system executes.
    pub fn graph(&self) -> &CompiledGraph {
        self.runner.graph()
    }

    /// Shared clock readable by host code (and by the utility blocks).
    pub fn clock(&self) -> &LoopClock {
        &self.clock
    }

    /// Cumulative per-block process counts keyed by `"{index}:{label}"`.
    pub fn process_counts(&self) -> HashMap<String, u64> {
        self.runner.process_counts()
    }
}
