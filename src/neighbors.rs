use log::warn;
use rayon::prelude::*;

use crate::{CellList, Error, PeriodicBox, Vector3D};
use crate::grid::CellDimensions;

/// A reference point found in the neighborhood of a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// index of the point in the reference set
    pub index: usize,
    /// periodic minimum image distance between the point and the query point
    pub distance: f64,
}

/// Parameters for a fixed-radius neighbor query: find all reference points
/// within `r_max` of each query point.
#[derive(Debug, Clone)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct BallQuery {
    /// include all reference points at periodic distance below or equal to
    /// `r_max` from the query point
    pub r_max: f64,
    /// when the query points are the reference points themselves, do not
    /// match a point against itself. Duplicated positions at distinct
    /// indices are always kept.
    #[serde(default)]
    pub exclude_self: bool,
}

impl BallQuery {
    /// Create a `BallQuery` from a JSON string
    pub fn from_parameters(parameters: &str) -> Result<BallQuery, Error> {
        Ok(serde_json::from_str(parameters)?)
    }
}

/// Parameters for a k-nearest neighbors query: find the `k` reference
/// points closest to each query point.
#[derive(Debug, Clone)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct NearestQuery {
    /// number of neighbors to return for each query point
    pub k: usize,
    /// when the query points are the reference points themselves, do not
    /// match a point against itself. Duplicated positions at distinct
    /// indices are always kept.
    #[serde(default)]
    pub exclude_self: bool,
    /// require exactly `k` results per query point, failing when the
    /// reference set is too small instead of returning fewer neighbors
    #[serde(default = "serde_default_strict")]
    pub strict: bool,
}

fn serde_default_strict() -> bool {
    true
}

impl NearestQuery {
    /// Create a `NearestQuery` from a JSON string
    pub fn from_parameters(parameters: &str) -> Result<NearestQuery, Error> {
        Ok(serde_json::from_str(parameters)?)
    }
}

/// `NeighborFinder` answers fixed-radius and k-nearest neighbor queries
/// against a fixed set of reference points, using a cell list and its
/// adjacency table to only look at points in nearby cells.
///
/// All distances are periodic minimum image distances. Queries never mutate
/// the finder, and each query point only reads shared immutable state, so
/// query points are processed in parallel.
pub struct NeighborFinder {
    positions: Vec<Vector3D>,
    cell_list: CellList,
}

impl NeighborFinder {
    /// Build a finder over `points` inside `periodic_box`, with grid cells
    /// at least `cell_width` wide.
    pub fn new(periodic_box: PeriodicBox, points: &[Vector3D], cell_width: f64) -> Result<NeighborFinder, Error> {
        return Ok(NeighborFinder {
            positions: points.to_vec(),
            cell_list: CellList::new(periodic_box, points, cell_width)?,
        });
    }

    /// Build a finder sized for ball queries up to `r_max`: the grid cells
    /// are at least `r_max` wide, so a single ring of adjacent cells covers
    /// any query ball.
    pub fn for_radius(periodic_box: PeriodicBox, points: &[Vector3D], r_max: f64) -> Result<NeighborFinder, Error> {
        NeighborFinder::new(periodic_box, points, r_max)
    }

    /// Number of reference points in this finder
    pub fn size(&self) -> usize {
        self.positions.len()
    }

    /// Get the reference points positions
    pub fn positions(&self) -> &[Vector3D] {
        &self.positions
    }

    /// Get the underlying cell list
    pub fn cell_list(&self) -> &CellList {
        &self.cell_list
    }

    fn periodic_box(&self) -> &PeriodicBox {
        self.cell_list.grid().periodic_box()
    }

    /// Smallest distance between opposite faces of the box
    fn min_face_distance(&self) -> f64 {
        let distances = self.periodic_box().distances_between_faces();
        return f64::min(distances[0], f64::min(distances[1], distances[2]));
    }

    /// Smallest realized cell width of the grid
    fn min_cell_width(&self) -> f64 {
        let widths = self.cell_list.grid().realized_widths();
        return f64::min(widths[0], f64::min(widths[1], widths[2]));
    }

    /// Find all reference points within `parameters.r_max` of each query
    /// point. The neighbors of each query point are sorted by increasing
    /// distance, with ties broken by increasing point index.
    #[time_graph::instrument(name = "NeighborFinder::ball")]
    pub fn ball(&self, queries: &[Vector3D], parameters: &BallQuery) -> Result<Vec<Vec<Neighbor>>, Error> {
        let r_max = parameters.r_max;
        if !(r_max > 0.0 && r_max.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "search radius must be positive and finite, got {}", r_max
            )));
        }

        if 2.0 * r_max > self.min_face_distance() {
            return Err(Error::InvalidParameter(format!(
                "the box is too small for a search radius of {}: a point \
                would be a neighbor of its own periodic image", r_max
            )));
        }

        // one ring of adjacent cells only covers the full ball if the cells
        // are at least r_max wide
        if r_max > self.min_cell_width() {
            return Err(Error::InvalidParameter(format!(
                "a search radius of {} does not fit in cells {} wide: build \
                the index with a cell width of at least the search radius",
                r_max, self.min_cell_width()
            )));
        }

        let r2 = r_max * r_max;
        let results = queries.par_iter().enumerate().map(|(query_index, &query)| {
            let mut neighbors = Vec::new();

            let cell = self.cell_list.cell_of(query);
            for &adjacent in self.cell_list.cell_neighbors(cell) {
                for point in self.cell_list.cursor(adjacent) {
                    if parameters.exclude_self && point == query_index {
                        continue;
                    }

                    let distance2 = self.periodic_box().distance2(query, self.positions[point]);
                    if distance2 <= r2 {
                        if distance2 < 1e-6 && point != query_index {
                            warn!(
                                "query point {} and reference point {} are very close to one another ({})",
                                query_index, point, f64::sqrt(distance2)
                            );
                        }
                        neighbors.push(Neighbor {
                            index: point,
                            distance: f64::sqrt(distance2),
                        });
                    }
                }
            }

            sort_by_distance(&mut neighbors);
            return neighbors;
        }).collect();

        return Ok(results);
    }

    /// Find the `parameters.k` reference points closest to each query
    /// point, sorted by increasing distance with ties broken by increasing
    /// point index.
    ///
    /// The neighbors must all be closer than half the smallest box face
    /// distance: farther away, the minimum image convention breaks down and
    /// the search sphere would contain multiple periodic images of the same
    /// points. A box too small for the requested `k` is an error.
    #[time_graph::instrument(name = "NeighborFinder::nearest")]
    pub fn nearest(&self, queries: &[Vector3D], parameters: &NearestQuery) -> Result<Vec<Vec<Neighbor>>, Error> {
        if parameters.k == 0 {
            return Err(Error::InvalidParameter(
                "the number of neighbors k must be positive".into()
            ));
        }

        let available = if parameters.exclude_self {
            self.size().saturating_sub(1)
        } else {
            self.size()
        };
        if parameters.strict && parameters.k > available {
            return Err(Error::InvalidParameter(format!(
                "can not return {} neighbors: only {} reference points are available",
                parameters.k, available
            )));
        }

        return queries.par_iter().enumerate().map(|(query_index, &query)| {
            self.nearest_single(query_index, query, parameters)
        }).collect();
    }

    /// Expand rings of cells around `query` until the k nearest points are
    /// provably found.
    ///
    /// Ring r contains the cells at Chebyshev distance r (in cell
    /// coordinates) from the query point's cell, wrapped periodically and
    /// deduplicated against all cells already visited. Any point of an
    /// unvisited ring r is at least `(r - 1) * min_cell_width` away, so the
    /// expansion can stop as soon as k candidates are in hand and this
    /// bound for the next ring exceeds the current kth best distance.
    fn nearest_single(&self, query_index: usize, query: Vector3D, parameters: &NearestQuery) -> Result<Vec<Neighbor>, Error> {
        let grid = self.cell_list.grid();
        let indexer = grid.indexer();
        let CellDimensions { nx, ny, nz } = grid.dimensions();
        let center = grid.cell_coordinates(query);

        let min_width = self.min_cell_width();
        let cell_count = grid.cell_count();
        // rings strictly above this radius can not contain unvisited cells
        let max_ring = usize::max(nx, usize::max(ny, nz));

        let mut visited = vec![false; cell_count];
        let mut visited_count = 0;
        let mut candidates: Vec<(f64, usize)> = Vec::new();

        let mut ring = 0_usize;
        loop {
            let radius = ring as isize;
            for dk in -radius..=radius {
                for dj in -radius..=radius {
                    for di in -radius..=radius {
                        let chebyshev = di.unsigned_abs()
                            .max(dj.unsigned_abs())
                            .max(dk.unsigned_abs());
                        if chebyshev != ring {
                            continue;
                        }

                        let cell = indexer.linear([
                            wrap(center[0], di, nx),
                            wrap(center[1], dj, ny),
                            wrap(center[2], dk, nz),
                        ]);
                        if visited[cell] {
                            continue;
                        }
                        visited[cell] = true;
                        visited_count += 1;

                        for point in self.cell_list.cursor(cell) {
                            if parameters.exclude_self && point == query_index {
                                continue;
                            }
                            let distance2 = self.periodic_box().distance2(query, self.positions[point]);
                            candidates.push((distance2, point));
                        }
                    }
                }
            }

            if candidates.len() >= parameters.k {
                candidates.sort_unstable_by(compare_candidates);
                let kth_distance = f64::sqrt(candidates[parameters.k - 1].0);
                if ring as f64 * min_width > kth_distance {
                    break;
                }
            }

            if visited_count == cell_count || ring > max_ring {
                break;
            }
            ring += 1;
        }

        candidates.sort_unstable_by(compare_candidates);
        candidates.truncate(parameters.k);

        if let Some(&(distance2, _)) = candidates.last() {
            // a neighbor farther away than half the box means the search
            // sphere wraps around the box and contains periodic images of
            // the query point itself
            if f64::sqrt(distance2) > 0.5 * self.min_face_distance() {
                return Err(Error::InvalidParameter(format!(
                    "the box is too small to find {} neighbors: the search \
                    sphere would contain periodic images of the query point",
                    parameters.k
                )));
            }
        }

        let neighbors = candidates.into_iter().map(|(distance2, index)| Neighbor {
            index: index,
            distance: f64::sqrt(distance2),
        }).collect();

        return Ok(neighbors);
    }
}

fn sort_by_distance(neighbors: &mut [Neighbor]) {
    neighbors.sort_unstable_by(|a, b| {
        f64::total_cmp(&a.distance, &b.distance).then_with(|| usize::cmp(&a.index, &b.index))
    });
}

fn compare_candidates(a: &(f64, usize), b: &(f64, usize)) -> std::cmp::Ordering {
    f64::total_cmp(&a.0, &b.0).then_with(|| usize::cmp(&a.1, &b.1))
}

/// Periodic wrap of `coordinate + delta` on an axis with `count` cells
fn wrap(coordinate: usize, delta: isize, count: usize) -> usize {
    return (coordinate as isize + delta).rem_euclid(count as isize) as usize;
}
