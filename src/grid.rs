use log::warn;

use crate::{Error, PeriodicBox, Vector3D};

/// Number of cells along each axis of a `CellGrid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellDimensions {
    /// number of cells along the first box vector
    pub nx: usize,
    /// number of cells along the second box vector
    pub ny: usize,
    /// number of cells along the third box vector, always 1 for 2D boxes
    pub nz: usize,
}

impl CellDimensions {
    /// Total number of cells in the grid
    pub fn count(&self) -> usize {
        self.nx * self.ny * self.nz
    }
}

/// Bijection between linear cell ids and `(i, j, k)` cell coordinates.
///
/// Cells are stored in row-major order with the x axis varying fastest:
/// `id = i + nx * (j + ny * k)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellIndexer {
    dimensions: CellDimensions,
}

impl CellIndexer {
    /// Create a new `CellIndexer` for the given grid dimensions
    pub fn new(dimensions: CellDimensions) -> CellIndexer {
        CellIndexer {
            dimensions: dimensions,
        }
    }

    /// Get the dimensions of the grid this indexer operates on
    pub fn dimensions(&self) -> CellDimensions {
        self.dimensions
    }

    /// Total number of cells addressed by this indexer
    pub fn count(&self) -> usize {
        self.dimensions.count()
    }

    /// Get the linear cell id for the given cell coordinates.
    ///
    /// # Panics
    ///
    /// If any coordinate is outside the grid
    pub fn linear(&self, coordinates: [usize; 3]) -> usize {
        let CellDimensions { nx, ny, nz } = self.dimensions;
        let [i, j, k] = coordinates;
        assert!(
            i < nx && j < ny && k < nz,
            "cell coordinates ({}, {}, {}) are outside of the grid", i, j, k
        );
        return i + nx * (j + ny * k);
    }

    /// Get the cell coordinates for the given linear cell id.
    ///
    /// # Panics
    ///
    /// If the cell id is outside the grid
    pub fn coordinates(&self, cell: usize) -> [usize; 3] {
        let CellDimensions { nx, ny, .. } = self.dimensions;
        assert!(cell < self.count(), "cell id {} is outside of the grid", cell);
        return [cell % nx, (cell / nx) % ny, cell / (nx * ny)];
    }
}

/// A uniform grid of cells covering a periodic box.
///
/// Each axis of the box is split into an integer number of cells, each at
/// least `cell_width` wide: the cell count along an axis is rounded down,
/// never up, so the realized width can be larger than the requested one but
/// never smaller. The distances between faces of the box (and not the box
/// vector lengths) control the counts, so that a triclinic tilt can not
/// shrink the perpendicular width of a cell below `cell_width`.
#[derive(Debug, Clone)]
pub struct CellGrid {
    periodic_box: PeriodicBox,
    indexer: CellIndexer,
    cell_width: f64,
}

impl CellGrid {
    /// Create a new `CellGrid` over `periodic_box` with cells at least
    /// `cell_width` wide along every axis. For a 2D box the grid contains a
    /// single layer of cells along z.
    pub fn new(periodic_box: PeriodicBox, cell_width: f64) -> Result<CellGrid, Error> {
        if !(cell_width > 0.0 && cell_width.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "cell width must be positive and finite, got {}", cell_width
            )));
        }

        let distances = periodic_box.distances_between_faces();
        let count_along = |distance: f64| usize::max(1, f64::trunc(distance / cell_width) as usize);

        let dimensions = CellDimensions {
            nx: count_along(distances[0]),
            ny: count_along(distances[1]),
            nz: if periodic_box.is_2d() { 1 } else { count_along(distances[2]) },
        };

        if dimensions.count() == 1 {
            warn!(
                "cell width {} is larger than the box, the grid contains a single cell",
                cell_width
            );
        }

        return Ok(CellGrid {
            periodic_box: periodic_box,
            indexer: CellIndexer::new(dimensions),
            cell_width: cell_width,
        });
    }

    /// Get the periodic box this grid covers
    pub fn periodic_box(&self) -> &PeriodicBox {
        &self.periodic_box
    }

    /// Get the number of cells along each axis
    pub fn dimensions(&self) -> CellDimensions {
        self.indexer.dimensions()
    }

    /// Get the indexer mapping cell ids to cell coordinates
    pub fn indexer(&self) -> CellIndexer {
        self.indexer
    }

    /// Total number of cells in the grid
    pub fn cell_count(&self) -> usize {
        self.indexer.count()
    }

    /// Get the requested minimal cell width
    pub fn cell_width(&self) -> f64 {
        self.cell_width
    }

    /// Get the realized cell width along each axis, always larger than or
    /// equal to the requested width. Infinite along z for a 2D box.
    pub fn realized_widths(&self) -> Vector3D {
        let distances = self.periodic_box.distances_between_faces();
        let CellDimensions { nx, ny, nz } = self.dimensions();
        return Vector3D::new(
            distances[0] / nx as f64,
            distances[1] / ny as f64,
            distances[2] / nz as f64,
        );
    }

    /// Get the coordinates of the cell containing `point`, wrapping periodic
    /// images inside the box.
    pub fn cell_coordinates(&self, point: Vector3D) -> [usize; 3] {
        let fraction = self.periodic_box.fraction(point);
        let CellDimensions { nx, ny, nz } = self.dimensions();
        // the modulo guards against a fractional coordinate rounding to
        // exactly 1.0
        let coordinate = |fraction: f64, n: usize| (f64::floor(fraction * n as f64) as usize) % n;
        return [
            coordinate(fraction[0], nx),
            coordinate(fraction[1], ny),
            coordinate(fraction[2], nz),
        ];
    }

    /// Get the linear id of the cell containing `point`
    pub fn cell_of(&self, point: Vector3D) -> usize {
        self.indexer.linear(self.cell_coordinates(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions() {
        let grid = CellGrid::new(PeriodicBox::cubic(10.0), 2.0).unwrap();
        assert_eq!(grid.dimensions(), CellDimensions { nx: 5, ny: 5, nz: 5 });
        assert_eq!(grid.cell_count(), 125);

        let grid = CellGrid::new(PeriodicBox::orthorhombic(10.0, 7.0, 3.0), 2.0).unwrap();
        assert_eq!(grid.dimensions(), CellDimensions { nx: 5, ny: 3, nz: 1 });

        // counts are rounded down, never up
        let grid = CellGrid::new(PeriodicBox::cubic(10.0), 3.0).unwrap();
        assert_eq!(grid.dimensions(), CellDimensions { nx: 3, ny: 3, nz: 3 });
        let widths = grid.realized_widths();
        for axis in 0..3 {
            assert!(widths[axis] >= 3.0);
        }
    }

    #[test]
    fn dimensions_2d() {
        let grid = CellGrid::new(PeriodicBox::rectangular(4.0, 4.0), 1.0).unwrap();
        assert_eq!(grid.dimensions(), CellDimensions { nx: 4, ny: 4, nz: 1 });
        assert_eq!(grid.realized_widths()[2], f64::INFINITY);
    }

    #[test]
    fn single_cell() {
        let grid = CellGrid::new(PeriodicBox::cubic(3.0), 8.5).unwrap();
        assert_eq!(grid.dimensions(), CellDimensions { nx: 1, ny: 1, nz: 1 });
        assert!(grid.realized_widths()[0] < 8.5);
    }

    #[test]
    fn invalid_cell_width() {
        for cell_width in [0.0, -1.3, f64::NAN, f64::INFINITY] {
            let result = CellGrid::new(PeriodicBox::cubic(10.0), cell_width);
            assert!(matches!(result, Err(crate::Error::InvalidParameter(_))));
        }
    }

    #[test]
    fn indexer_bijection() {
        let indexer = CellIndexer::new(CellDimensions { nx: 4, ny: 3, nz: 2 });
        for cell in 0..indexer.count() {
            assert_eq!(indexer.linear(indexer.coordinates(cell)), cell);
        }
        assert_eq!(indexer.linear([0, 0, 0]), 0);
        assert_eq!(indexer.linear([3, 2, 1]), indexer.count() - 1);
    }

    #[test]
    #[should_panic(expected = "outside of the grid")]
    fn indexer_out_of_grid() {
        let indexer = CellIndexer::new(CellDimensions { nx: 4, ny: 3, nz: 2 });
        let _ = indexer.linear([4, 0, 0]);
    }

    #[test]
    fn cell_coordinates() {
        let grid = CellGrid::new(PeriodicBox::rectangular(4.0, 4.0), 1.0).unwrap();
        assert_eq!(grid.cell_coordinates(Vector3D::new(3.9, 3.9, 0.0)), [3, 3, 0]);
        assert_eq!(grid.cell_coordinates(Vector3D::new(0.1, 2.5, 0.0)), [0, 2, 0]);

        let grid = CellGrid::new(PeriodicBox::cubic(10.0), 2.0).unwrap();
        assert_eq!(grid.cell_coordinates(Vector3D::new(9.5, 0.0, 5.0)), [4, 0, 2]);
        // periodic images wrap back inside the grid
        assert_eq!(grid.cell_coordinates(Vector3D::new(-0.5, 12.5, 0.0)), [4, 1, 0]);
    }

    #[test]
    fn fraction_rounding_to_one() {
        // a tiny negative coordinate wraps to a fractional coordinate that
        // rounds to exactly 1.0, which must still map inside the grid
        let grid = CellGrid::new(PeriodicBox::cubic(10.0), 2.0).unwrap();
        assert_eq!(grid.cell_coordinates(Vector3D::new(-1e-18, 0.0, 0.0)), [0, 0, 0]);
        assert_eq!(grid.cell_of(Vector3D::new(10.0, 10.0, 10.0)), 0);
    }
}
