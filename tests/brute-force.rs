#![allow(clippy::needless_return)]

//! Property tests comparing ball and k-nearest queries against a brute force
//! O(N²) reference, over random point sets in boxes of all supported shapes.

use locality::{BallQuery, NearestQuery, NeighborFinder, PeriodicBox, Vector3D};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generate `n` random points uniformly distributed inside the box, by
/// sampling fractional coordinates so any box shape is covered.
fn random_points<R: Rng + ?Sized>(n: usize, periodic_box: &PeriodicBox, rng: &mut R) -> Vec<Vector3D> {
    return (0..n).map(|_| {
        let fraction = Vector3D::new(
            rng.gen_range(0.0..1.0),
            rng.gen_range(0.0..1.0),
            if periodic_box.is_2d() { 0.0 } else { rng.gen_range(0.0..1.0) },
        );
        periodic_box.cartesian(fraction)
    }).collect();
}

fn brute_force_ball(
    periodic_box: &PeriodicBox,
    points: &[Vector3D],
    queries: &[Vector3D],
    r_max: f64,
    exclude_self: bool,
) -> Vec<Vec<(usize, f64)>> {
    let r2 = r_max * r_max;
    return queries.iter().enumerate().map(|(query_index, &query)| {
        let mut neighbors = points.iter().enumerate()
            .filter(|&(index, _)| !(exclude_self && index == query_index))
            .map(|(index, &point)| (index, periodic_box.distance2(query, point)))
            .filter(|&(_, distance2)| distance2 <= r2)
            .collect::<Vec<_>>();
        neighbors.sort_by(|a, b| f64::total_cmp(&a.1, &b.1).then(usize::cmp(&a.0, &b.0)));
        return neighbors.into_iter()
            .map(|(index, distance2)| (index, f64::sqrt(distance2)))
            .collect();
    }).collect();
}

fn brute_force_nearest(
    periodic_box: &PeriodicBox,
    points: &[Vector3D],
    queries: &[Vector3D],
    k: usize,
    exclude_self: bool,
) -> Vec<Vec<(usize, f64)>> {
    return queries.iter().enumerate().map(|(query_index, &query)| {
        let mut neighbors = points.iter().enumerate()
            .filter(|&(index, _)| !(exclude_self && index == query_index))
            .map(|(index, &point)| (index, periodic_box.distance2(query, point)))
            .collect::<Vec<_>>();
        neighbors.sort_by(|a, b| f64::total_cmp(&a.1, &b.1).then(usize::cmp(&a.0, &b.0)));
        neighbors.truncate(k);
        return neighbors.into_iter()
            .map(|(index, distance2)| (index, f64::sqrt(distance2)))
            .collect();
    }).collect();
}

fn check_ball(periodic_box: PeriodicBox, n_points: usize, r_max: f64, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let points = random_points(n_points, &periodic_box, &mut rng);

    let finder = NeighborFinder::for_radius(periodic_box, &points, r_max).unwrap();
    for exclude_self in [false, true] {
        let parameters = BallQuery { r_max: r_max, exclude_self: exclude_self };
        let results = finder.ball(&points, &parameters).unwrap();
        let expected = brute_force_ball(&periodic_box, &points, &points, r_max, exclude_self);

        assert_eq!(results.len(), expected.len());
        for (result, expected) in results.iter().zip(&expected) {
            assert_eq!(result.len(), expected.len());
            for (neighbor, &(index, distance)) in result.iter().zip(expected) {
                assert_eq!(neighbor.index, index);
                assert_eq!(neighbor.distance, distance);
            }
        }
    }
}

fn check_nearest(periodic_box: PeriodicBox, n_points: usize, k: usize, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let points = random_points(n_points, &periodic_box, &mut rng);
    // query from separate points as well as from the reference set itself
    let queries = random_points(16, &periodic_box, &mut rng);

    let finder = NeighborFinder::new(periodic_box, &points, 1.0).unwrap();

    let parameters = NearestQuery { k: k, exclude_self: false, strict: true };
    let results = finder.nearest(&queries, &parameters).unwrap();
    let expected = brute_force_nearest(&periodic_box, &points, &queries, k, false);
    compare_nearest(&results, &expected);

    let parameters = NearestQuery { k: k, exclude_self: true, strict: true };
    let results = finder.nearest(&points, &parameters).unwrap();
    let expected = brute_force_nearest(&periodic_box, &points, &points, k, true);
    compare_nearest(&results, &expected);
}

fn compare_nearest(results: &[Vec<locality::Neighbor>], expected: &[Vec<(usize, f64)>]) {
    assert_eq!(results.len(), expected.len());
    for (result, expected) in results.iter().zip(expected) {
        assert_eq!(result.len(), expected.len());
        for (neighbor, &(index, distance)) in result.iter().zip(expected) {
            assert_eq!(neighbor.index, index);
            assert_eq!(neighbor.distance, distance);
        }
    }
}

#[test]
fn ball_cubic() {
    check_ball(PeriodicBox::cubic(8.0), 60, 1.5, 42);
    check_ball(PeriodicBox::cubic(8.0), 60, 1.5, 1234);
}

#[test]
fn ball_orthorhombic() {
    check_ball(PeriodicBox::orthorhombic(6.0, 9.0, 12.0), 80, 2.0, 7);
}

#[test]
fn ball_triclinic() {
    check_ball(PeriodicBox::triclinic(8.0, 8.0, 8.0, 0.2, 0.1, -0.1), 60, 1.5, 13);
}

#[test]
fn ball_2d() {
    check_ball(PeriodicBox::rectangular(7.0, 5.0), 50, 1.8, 3);
    check_ball(PeriodicBox::triclinic_2d(6.0, 6.0, 0.25), 50, 1.5, 21);
}

#[test]
fn nearest_cubic() {
    check_nearest(PeriodicBox::cubic(8.0), 60, 1, 42);
    check_nearest(PeriodicBox::cubic(8.0), 60, 4, 42);
}

#[test]
fn nearest_orthorhombic() {
    check_nearest(PeriodicBox::orthorhombic(6.0, 9.0, 12.0), 80, 4, 7);
}

#[test]
fn nearest_triclinic() {
    check_nearest(PeriodicBox::triclinic(8.0, 8.0, 8.0, 0.2, 0.1, -0.1), 60, 3, 13);
}

#[test]
fn nearest_2d() {
    check_nearest(PeriodicBox::rectangular(7.0, 5.0), 50, 4, 3);
    check_nearest(PeriodicBox::triclinic_2d(6.0, 6.0, 0.25), 50, 2, 21);
}

#[test]
fn ball_neighbors_are_symmetric() {
    let periodic_box = PeriodicBox::cubic(8.0);
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let points = random_points(70, &periodic_box, &mut rng);

    let finder = NeighborFinder::for_radius(periodic_box, &points, 2.0).unwrap();
    let parameters = BallQuery { r_max: 2.0, exclude_self: true };
    let results = finder.ball(&points, &parameters).unwrap();

    for (i, neighbors) in results.iter().enumerate() {
        for neighbor in neighbors {
            assert!(
                results[neighbor.index].iter().any(|n| n.index == i),
                "{} is a neighbor of {}, but not the other way around", neighbor.index, i
            );
        }
    }
}
