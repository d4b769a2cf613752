//! Isolation ranking: prefer colonies far from their neighbours.

use crate::Colony;

/// `min_distance_mm` of a colony that is alone in its cell.
pub const ISOLATED_DISTANCE_MM: f64 = 10_000.0;

/// Fill `min_distance_mm` for every colony of one cell and sort the cell by
/// descending isolation.
///
/// The sort is stable, so equal distances keep input order. `O(n²)`; cells
/// hold tens of colonies.
pub fn rank_by_isolation(mut colonies: Vec<Colony>) -> Vec<Colony> {
    let distances: Vec<f64> = colonies
        .iter()
        .enumerate()
        .map(|(i, a)| {
            colonies
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, b)| a.distance_to(b))
                .fold(ISOLATED_DISTANCE_MM, f64::min)
        })
        .collect();

    for (colony, d) in colonies.iter_mut().zip(distances) {
        colony.min_distance_mm = Some(d);
    }
    colonies.sort_by(|a, b| isolation(b).total_cmp(&isolation(a)));
    colonies
}

/// The `k` most isolated colonies of one cell, most isolated first.
///
/// Returns fewer than `k` when the cell has fewer colonies.
pub fn select_most_isolated(colonies: Vec<Colony>, k: usize) -> Vec<Colony> {
    let mut ranked = rank_by_isolation(colonies);
    ranked.truncate(k);
    ranked
}

#[inline]
fn isolation(c: &Colony) -> f64 {
    c.min_distance_mm.unwrap_or(ISOLATED_DISTANCE_MM)
}
