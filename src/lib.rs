//! Cellular-automaton simulation core.
//!
//! Three cooperating subsystems behind one engine trait:
//!
//! - [`rule`]: compiles textual rule descriptions (`B3/S23`, isotropic
//!   non-totalistic letters, Wolfram codes, `MAP` tables) into compact
//!   lookup tables.
//! - [`quicklife`]: a low-latency 2-state Moore engine over a
//!   change-tracked spatial hierarchy with memory recycling.
//! - [`ltl`]: a Larger-than-Life engine for radius-up-to-500
//!   neighbourhoods with history states, accelerated by cumulative sums.
//!
//! [`topology`] realises bounded grids (planes, tori, Klein bottles,
//! cross-surfaces, spheres, tubes) by joining edges into a border strip
//! around each generation, and [`engine`] holds the shared capability
//! trait plus the cooperative interrupt contract.

pub mod engine;
pub mod error;
pub mod ltl;
pub mod pattern;
pub mod quicklife;
pub mod rule;
pub mod topology;

// Re-exports for convenience
pub use engine::{Edges, Engine, NullPoller, Poller, ReportInterval};
pub use error::{EngineError, RuleError};
pub use ltl::LargerThanLife;
pub use pattern::{Pattern, presets};
pub use quicklife::QuickLife;
pub use rule::CompiledRule;
pub use topology::Topology;
