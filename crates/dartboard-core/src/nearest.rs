//! Brute-force nearest-neighbour matching between two point sets.
//!
//! The sets involved are small (80 template points, a few dozen detections),
//! so a linear scan beats building a tree and keeps tie-breaking predictable:
//! the first reference point at the minimal distance wins.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::geometry::distance_sq;

/// Closest reference point for one query point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

/// Index pair believed to describe the same physical feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Correspondence {
    /// Index into the source (moving / template) set.
    pub source: usize,
    /// Index into the destination (reference / detected) set.
    pub dest: usize,
}

impl Correspondence {
    pub fn new(source: usize, dest: usize) -> Self {
        Self { source, dest }
    }
}

/// Closest point of `reference` to `query`, `None` if `reference` is empty.
#[inline]
pub fn nearest_neighbor(query: &Point2<f64>, reference: &[Point2<f64>]) -> Option<Neighbor> {
    let mut best: Option<(usize, f64)> = None;
    for (index, r) in reference.iter().enumerate() {
        let d2 = distance_sq(query, r);
        match best {
            Some((_, best_d2)) if d2 >= best_d2 => {}
            _ => best = Some((index, d2)),
        }
    }
    best.map(|(index, d2)| Neighbor {
        index,
        distance: d2.sqrt(),
    })
}

/// Nearest reference point for every query point, in query order.
///
/// Each entry is `None` exactly when `reference` is empty.
pub fn find_nearest_neighbors(
    query: &[Point2<f64>],
    reference: &[Point2<f64>],
) -> Vec<Option<Neighbor>> {
    let mut out = Vec::with_capacity(query.len());
    find_nearest_neighbors_into(query, reference, &mut out);
    out
}

/// Buffer-reusing variant of [`find_nearest_neighbors`]; `out` is cleared first.
pub fn find_nearest_neighbors_into(
    query: &[Point2<f64>],
    reference: &[Point2<f64>],
    out: &mut Vec<Option<Neighbor>>,
) {
    out.clear();
    out.extend(query.iter().map(|q| nearest_neighbor(q, reference)));
}

/// Nearest-neighbour pairs `query[i] -> reference[j]` closer than `max_distance`.
pub fn match_within(
    query: &[Point2<f64>],
    reference: &[Point2<f64>],
    max_distance: f64,
) -> Vec<Correspondence> {
    query
        .iter()
        .enumerate()
        .filter_map(|(i, q)| {
            let n = nearest_neighbor(q, reference)?;
            (n.distance < max_distance).then_some(Correspondence::new(i, n.index))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_are_well_defined() {
        assert!(find_nearest_neighbors(&[], &[]).is_empty());

        let query = [Point2::new(1.0, 1.0), Point2::new(2.0, 2.0)];
        let res = find_nearest_neighbors(&query, &[]);
        assert_eq!(res, vec![None, None]);
        assert!(match_within(&query, &[], 10.0).is_empty());
    }

    #[test]
    fn picks_closest_reference() {
        let reference = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
        ];
        let query = [Point2::new(9.0, 1.0), Point2::new(-1.0, 8.0)];
        let res = find_nearest_neighbors(&query, &reference);
        assert_eq!(res[0].unwrap().index, 1);
        assert!((res[0].unwrap().distance - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(res[1].unwrap().index, 2);
    }

    #[test]
    fn ties_go_to_first_reference() {
        let reference = [Point2::new(-1.0, 0.0), Point2::new(1.0, 0.0)];
        let res = find_nearest_neighbors(&[Point2::new(0.0, 0.0)], &reference);
        assert_eq!(res[0].unwrap().index, 0);
    }

    #[test]
    fn match_within_drops_far_pairs() {
        let reference = [Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)];
        let query = [Point2::new(0.5, 0.0), Point2::new(50.0, 40.0)];
        let pairs = match_within(&query, &reference, 1.0);
        assert_eq!(pairs, vec![Correspondence::new(0, 0)]);
    }
}
