//! Principal axes of a 2D point set.

use crate::model::Point;

/// Dominant spread direction of a point set and its perpendicular.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrincipalAxes {
    /// Mean of the input points.
    pub centroid: Point,
    /// Unit eigenvector of the largest eigenvalue.
    pub dominant: Point,
    /// Unit vector perpendicular to `dominant`.
    pub perpendicular: Point,
    /// Eigenvalues, largest first.
    pub eigenvalues: (f64, f64),
}

/// Closed-form PCA on the 2x2 covariance matrix.
///
/// Returns `None` for an empty slice. Isotropic or degenerate sets fall back to
/// the x-axis as the dominant direction.
pub fn principal_axes(points: &[Point]) -> Option<PrincipalAxes> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let centroid = points.iter().fold(Point::ORIGIN, |acc, p| acc + *p) * (1.0 / n);

    let (mut xx, mut xy, mut yy) = (0.0, 0.0, 0.0);
    for p in points {
        let d = *p - centroid;
        xx += d.x * d.x;
        xy += d.x * d.y;
        yy += d.y * d.y;
    }
    xx /= n;
    xy /= n;
    yy /= n;

    let trace = xx + yy;
    let det = xx * yy - xy * xy;
    let disc = (trace * trace - 4.0 * det).max(0.0).sqrt();
    let l1 = (trace + disc) / 2.0;
    let l2 = (trace - disc) / 2.0;

    let eps = 1e-9 * trace.max(1.0);
    let dominant = if xy.abs() > eps {
        Point::new(l1 - yy, xy).normalized()
    } else if yy > xx + eps {
        Some(Point::new(0.0, 1.0))
    } else {
        Some(Point::new(1.0, 0.0))
    }
    .unwrap_or(Point::new(1.0, 0.0));

    Some(PrincipalAxes {
        centroid,
        dominant,
        perpendicular: dominant.perpendicular(),
        eigenvalues: (l1, l2),
    })
}
