use std::collections::BTreeSet;

use crate::grid::{CellDimensions, CellIndexer};

/// Table of the geometrically adjacent cells of every cell in a grid.
///
/// A cell is adjacent to the cells whose coordinates differ by at most one
/// along each axis, with periodic wraparound, itself included. The table
/// only depends on the grid dimensions: it is built once per grid and then
/// shared read-only by all queries against that grid.
#[derive(Debug, Clone)]
pub struct CellAdjacency {
    neighbors: Vec<Vec<usize>>,
}

impl CellAdjacency {
    /// Build the adjacency table for a grid with the given `dimensions`
    pub fn new(dimensions: CellDimensions) -> CellAdjacency {
        let indexer = CellIndexer::new(dimensions);
        let counts = [dimensions.nx, dimensions.ny, dimensions.nz];

        let mut neighbors = Vec::with_capacity(indexer.count());
        for cell in 0..indexer.count() {
            let coordinates = indexer.coordinates(cell);

            // with one or two cells along an axis, multiple deltas wrap to
            // the same neighbor cell; the set removes the duplicates
            let mut adjacent = BTreeSet::new();
            for dk in -1..=1_isize {
                for dj in -1..=1_isize {
                    for di in -1..=1_isize {
                        adjacent.insert(indexer.linear([
                            wrap(coordinates[0], di, counts[0]),
                            wrap(coordinates[1], dj, counts[1]),
                            wrap(coordinates[2], dk, counts[2]),
                        ]));
                    }
                }
            }

            neighbors.push(adjacent.into_iter().collect());
        }

        return CellAdjacency {
            neighbors: neighbors,
        };
    }

    /// Total number of cells in this table
    pub fn cell_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Get the cells adjacent to `cell`, itself included, sorted in
    /// ascending order and without duplicates.
    ///
    /// # Panics
    ///
    /// If the cell id is outside the grid
    pub fn neighbors(&self, cell: usize) -> &[usize] {
        assert!(cell < self.neighbors.len(), "cell id {} is outside of the grid", cell);
        return &self.neighbors[cell];
    }
}

/// Periodic wrap of `coordinate + delta` on an axis with `count` cells
fn wrap(coordinate: usize, delta: isize, count: usize) -> usize {
    return (coordinate as isize + delta + count as isize) as usize % count;
}
