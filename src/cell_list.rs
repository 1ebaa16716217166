use ndarray::Array3;

use crate::{Error, PeriodicBox, Vector3D};
use crate::adjacency::CellAdjacency;
use crate::grid::{CellDimensions, CellGrid};

/// A cell list assigns every point of a snapshot to a cell of a `CellGrid`,
/// and stores for each cell a compact chain of the indices of the points it
/// contains.
///
/// The chains are stored in two arrays: `cell_head` maps a cell to the most
/// recently inserted point of this cell, and `next_in_cell` maps a point
/// index to the next point of the same cell. Points are inserted in
/// ascending index order at the head of their cell's chain, so iterating a
/// cell yields its points in reverse insertion order.
///
/// A cell list is built in one shot over a full point buffer and never
/// incrementally updated: building again means creating a new `CellList`,
/// and the borrow checker makes sure no cursor can outlive the list it
/// reads from.
#[derive(Debug, Clone)]
pub struct CellList {
    grid: CellGrid,
    adjacency: CellAdjacency,
    next_in_cell: Vec<Option<usize>>,
    cell_head: Array3<Option<usize>>,
}

impl CellList {
    /// Build a cell list for `points` inside `periodic_box`, with cells at
    /// least `cell_width` wide along every axis. An empty point buffer is
    /// legal and produces an index with all cells empty.
    #[time_graph::instrument(name = "CellList::new")]
    pub fn new(periodic_box: PeriodicBox, points: &[Vector3D], cell_width: f64) -> Result<CellList, Error> {
        let grid = CellGrid::new(periodic_box, cell_width)?;
        let adjacency = CellAdjacency::new(grid.dimensions());

        let CellDimensions { nx, ny, nz } = grid.dimensions();
        let mut next_in_cell = vec![None; points.len()];
        let mut cell_head = Array3::from_elem((nx, ny, nz), None);

        for (index, &point) in points.iter().enumerate() {
            let coordinates = grid.cell_coordinates(point);
            let head = &mut cell_head[coordinates];
            next_in_cell[index] = *head;
            *head = Some(index);
        }

        return Ok(CellList {
            grid: grid,
            adjacency: adjacency,
            next_in_cell: next_in_cell,
            cell_head: cell_head,
        });
    }

    /// Number of points in this cell list
    pub fn size(&self) -> usize {
        self.next_in_cell.len()
    }

    /// Get the grid the points are assigned to
    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// Get the number of cells along each axis
    pub fn dimensions(&self) -> CellDimensions {
        self.grid.dimensions()
    }

    /// Total number of cells in the grid
    pub fn cell_count(&self) -> usize {
        self.grid.cell_count()
    }

    /// Get the linear id of the cell containing `point`
    pub fn cell_of(&self, point: Vector3D) -> usize {
        self.grid.cell_of(point)
    }

    /// Get the cells adjacent to `cell` (itself included), sorted and
    /// without duplicates.
    ///
    /// # Panics
    ///
    /// If the cell id is outside the grid
    pub fn cell_neighbors(&self, cell: usize) -> &[usize] {
        self.adjacency.neighbors(cell)
    }

    /// Get the most recently inserted point of `cell`
    fn head(&self, cell: usize) -> Option<usize> {
        let coordinates = self.grid.indexer().coordinates(cell);
        return self.cell_head[coordinates];
    }

    /// Iterate over the points assigned to `cell`, in reverse insertion
    /// order.
    ///
    /// # Panics
    ///
    /// If the cell id is outside the grid
    pub fn cursor(&self, cell: usize) -> CellCursor<'_> {
        CellCursor {
            cell_list: self,
            cell: cell,
            current: self.head(cell),
        }
    }
}

/// A restartable iterator over the points chained in one cell of a
/// `CellList`.
///
/// The cursor borrows the cell list, so dropping or replacing the list while
/// a cursor is alive is rejected at compile time. An exhausted cursor keeps
/// returning `None` until [`CellCursor::restart`] is called.
#[derive(Debug, Clone)]
pub struct CellCursor<'a> {
    cell_list: &'a CellList,
    cell: usize,
    current: Option<usize>,
}

impl CellCursor<'_> {
    /// Get the cell this cursor iterates over
    pub fn cell(&self) -> usize {
        self.cell
    }

    /// Reset this cursor to the head of its cell's chain
    pub fn restart(&mut self) {
        self.current = self.cell_list.head(self.cell);
    }
}

impl Iterator for CellCursor<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let index = self.current?;
        self.current = self.cell_list.next_in_cell[index];
        return Some(index);
    }
}
