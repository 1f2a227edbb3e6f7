//! Radius-based grouping of nearby entries.

use crate::model::Point;

/// Connected components of the "within `radius`" graph with at least
/// `min_size` members.
///
/// Returns index lists into `points`, each sorted ascending, groups ordered by
/// their smallest index. Quadratic in the number of points; the candidate set
/// is limited to what is on screen.
pub fn radius_groups(points: &[Point], radius: f64, min_size: usize) -> Vec<Vec<usize>> {
    let n = points.len();
    let mut component = vec![usize::MAX; n];
    let mut groups = Vec::new();

    for seed in 0..n {
        if component[seed] != usize::MAX {
            continue;
        }
        let label = groups.len();
        component[seed] = label;
        let mut members = vec![seed];
        let mut frontier = vec![seed];
        while let Some(current) = frontier.pop() {
            for other in 0..n {
                if component[other] == usize::MAX
                    && points[current].distance_to(points[other]) <= radius
                {
                    component[other] = label;
                    members.push(other);
                    frontier.push(other);
                }
            }
        }
        members.sort_unstable();
        groups.push(members);
    }

    groups.retain(|g| g.len() >= min_size);
    groups
}
