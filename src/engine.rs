//! The engine capability set and the cooperative polling contract.
//!
//! Every generation engine exposes the same small surface: rule
//! installation, stepping, single-cell editing, a live-cell row cursor and
//! bounding-box discovery. The bounded-grid border pass and host tooling
//! work exclusively through this trait, so engines stay interchangeable.

use crate::error::{EngineError, RuleError};
use crate::topology::Topology;

/// Bounding box of the live cells of a pattern, in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edges {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

/// Capability set shared by all generation engines.
///
/// Editing methods take `&mut self` even when they look read-only: reading
/// a far-away cell may force the universe to grow its coordinate range,
/// and population queries refresh internal caches.
pub trait Engine {
    /// Compile and install a rule. On error the previous rule is kept.
    fn set_rule(&mut self, rule: &str) -> Result<(), RuleError>;

    /// Canonical form of the current rule.
    fn rule(&self) -> &str;

    /// Advance the universe by `increment` generations.
    ///
    /// Returns early (after a whole generation) if the poller reports an
    /// interrupt. Each generation is atomic: on any exit the universe
    /// reflects the last completed generation.
    fn step(&mut self) -> Result<(), EngineError>;

    /// Set the cell at `(x, y)` to `state` (0 is dead).
    fn set_cell(&mut self, x: i32, y: i32, state: u8) -> Result<(), EngineError>;

    /// State of the cell at `(x, y)`; 0 outside the grid.
    fn get_cell(&mut self, x: i32, y: i32) -> u8;

    /// Distance to the next live cell at or right of `(x, y)` in row `y`,
    /// together with its state, or `None` if the rest of the row is dead.
    fn next_cell(&mut self, x: i32, y: i32) -> Option<(i32, u8)>;

    /// Tight bounding box of the live cells, or `None` when empty.
    fn find_edges(&mut self) -> Option<Edges>;

    /// Number of live (state > 0) cells.
    fn population(&mut self) -> u64;

    fn is_empty(&mut self) -> bool;

    /// True for engines that support super-speed stepping (HashLife).
    fn hyper_capable(&self) -> bool {
        false
    }

    /// Number of cell states the current rule uses (2 unless history).
    fn num_cell_states(&self) -> usize {
        2
    }

    fn generation(&self) -> u64;
    fn set_generation(&mut self, generation: u64);

    /// Generations advanced per `step` call.
    fn increment(&self) -> u64;
    fn set_increment(&mut self, inc: u64);

    /// Bounded-grid topology installed by the last `set_rule`.
    fn topology(&self) -> &Topology;
}

/// Cooperative interrupt hook.
///
/// Engines call [`Poller::poll`] from their inner loops; a `true` return
/// latches an interrupt which aborts a multi-generation step after the
/// current generation completes.
pub trait Poller {
    /// Check the host event loop. Return `true` to request an interrupt.
    fn check_events(&mut self) -> bool {
        false
    }

    fn is_interrupted(&self) -> bool;
    fn set_interrupted(&mut self);
    fn reset_interrupted(&mut self);

    /// Lightweight periodic check; only calls [`Poller::check_events`]
    /// once the countdown runs out.
    fn poll(&mut self) -> bool;

    fn reset_countdown(&mut self);

    /// True while a `step` is in flight; used to reject re-entry from
    /// host callbacks.
    fn is_calculating(&self) -> bool;
    fn set_calculating(&mut self, flag: bool);
}

const POLL_INTERVAL: i32 = 1000;

/// Default poller: never reports host events, still latches interrupts
/// requested through [`Poller::set_interrupted`].
#[derive(Default)]
pub struct NullPoller {
    countdown: i32,
    interrupted: bool,
    calculating: bool,
}

impl NullPoller {
    pub fn new() -> Self {
        NullPoller {
            countdown: POLL_INTERVAL,
            interrupted: false,
            calculating: false,
        }
    }
}

impl Poller for NullPoller {
    fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    fn set_interrupted(&mut self) {
        self.interrupted = true;
    }

    fn reset_interrupted(&mut self) {
        self.interrupted = false;
    }

    fn poll(&mut self) -> bool {
        self.countdown -= 1;
        if self.countdown <= 0 {
            self.countdown = POLL_INTERVAL;
            if self.check_events() {
                self.interrupted = true;
            }
        }
        self.interrupted
    }

    fn reset_countdown(&mut self) {
        self.countdown = POLL_INTERVAL;
    }

    fn is_calculating(&self) -> bool {
        self.calculating
    }

    fn set_calculating(&mut self, flag: bool) {
        self.calculating = flag;
    }
}

/// Performance-report callback contract. The engines themselves never
/// report; hosts that time generation runs implement this to control how
/// often they want progress callbacks.
pub trait ReportInterval {
    fn report_interval(&self) -> f64;
    fn set_report_interval(&mut self, seconds: f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_poller_latches_interrupt() {
        let mut p = NullPoller::new();
        assert!(!p.poll());
        p.set_interrupted();
        assert!(p.is_interrupted());
        assert!(p.poll());
        p.reset_interrupted();
        assert!(!p.is_interrupted());
    }

    #[test]
    fn test_poll_countdown_wraps() {
        let mut p = NullPoller::new();
        for _ in 0..5000 {
            assert!(!p.poll());
        }
    }
}
