//! Seed patterns for tests and benchmarks.

use crate::engine::Engine;
use crate::error::EngineError;

/// A placeable pattern described by the relative coordinates of its live
/// cells.
#[derive(Clone)]
pub struct Pattern {
    pub name: &'static str,
    pub cells: Vec<(i32, i32)>,
}

impl Pattern {
    pub fn new(name: &'static str, cells: Vec<(i32, i32)>) -> Self {
        Self { name, cells }
    }

    /// Stamp the pattern onto an engine with its origin at (x, y).
    pub fn place<E: Engine + ?Sized>(
        &self,
        engine: &mut E,
        x: i32,
        y: i32,
    ) -> Result<(), EngineError> {
        for &(dx, dy) in &self.cells {
            engine.set_cell(x + dx, y + dy, 1)?;
        }
        Ok(())
    }
}

/// Classic patterns used by the tests and the benchmark binary.
pub mod presets {
    use super::*;

    /// Glider - simplest spaceship, moves diagonally (period 4)
    pub fn glider() -> Pattern {
        Pattern::new(
            "Glider",
            vec![(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)],
        )
    }

    /// Blinker - period 2 oscillator
    pub fn blinker() -> Pattern {
        Pattern::new("Blinker", vec![(0, 1), (1, 1), (2, 1)])
    }

    /// Block - simple still life
    pub fn block() -> Pattern {
        Pattern::new("Block", vec![(0, 0), (1, 0), (0, 1), (1, 1)])
    }

    /// R-pentomino - classic methuselah (stabilizes after 1103 generations)
    pub fn r_pentomino() -> Pattern {
        Pattern::new(
            "R-pentomino",
            vec![(1, 0), (2, 0), (0, 1), (1, 1), (1, 2)],
        )
    }

    /// A `width x height` soup with roughly the given live density,
    /// reproducible from the seed.
    pub fn random_block(width: i32, height: i32, density: f64, seed: u64) -> Pattern {
        use rand::{Rng, SeedableRng, rngs::StdRng};
        let mut rng = StdRng::seed_from_u64(seed);
        let mut cells = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if rng.random::<f64>() < density {
                    cells.push((x, y));
                }
            }
        }
        Pattern::new("Soup", cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quicklife::QuickLife;

    #[test]
    fn test_place_on_engine() {
        let mut q = QuickLife::new();
        presets::glider().place(&mut q, 10, 20).unwrap();
        assert_eq!(q.population(), 5);
        assert_eq!(q.get_cell(11, 20), 1);
        assert_eq!(q.get_cell(12, 22), 1);
    }

    #[test]
    fn test_random_block_is_reproducible() {
        let a = presets::random_block(10, 10, 0.5, 42);
        let b = presets::random_block(10, 10, 0.5, 42);
        assert_eq!(a.cells, b.cells);
        assert!(!a.cells.is_empty());
        assert!(a.cells.len() < 100);
    }
}
