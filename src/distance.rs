//! Point/primitive closest-distance routines for fat points, fat segments
//! and triangles.
//!
//! Every routine takes the current maximum acceptable distance `dist_max`,
//! inflates it by the radius interpolated at the closest point for
//! acceptance, and returns `Some((dist, euv))` carrying the true Euclidean
//! distance on success. Inputs are never mutated.

use crate::{Point3, Real, Vector2};
use nalgebra::distance_squared;

/// Distance from `pos` to a point `p` of radius `r`.
pub fn point_point(
    pos: &Point3,
    dist_max: Real,
    p: &Point3,
    r: Real,
) -> Option<(Real, Vector2)> {
    let d2 = distance_squared(pos, p);
    if d2 > (dist_max + r) * (dist_max + r) {
        return None;
    }
    Some((d2.sqrt(), Vector2::zeros()))
}

/// Parameter of the point on segment `v0..v1` closest to `pos`, clamped to
/// the segment.
fn closest_uv_line(pos: &Point3, v0: &Point3, v1: &Point3) -> Real {
    let ab = v1 - v0;
    let d = ab.dot(&ab);
    let u = (pos - v0).dot(&ab) / d;
    u.clamp(0.0, 1.0)
}

/// Distance from `pos` to the segment `v0..v1` with per-endpoint radii.
///
/// On success `euv` is `(u, 0)` with `u` the clamped segment parameter.
pub fn point_line(
    pos: &Point3,
    dist_max: Real,
    v0: &Point3,
    v1: &Point3,
    r0: Real,
    r1: Real,
) -> Option<(Real, Vector2)> {
    let u = closest_uv_line(pos, v0, v1);
    let p = v0 + (v1 - v0) * u;
    let r = r0 * (1.0 - u) + r1 * u;
    let d2 = distance_squared(pos, &p);
    if d2 > (dist_max + r) * (dist_max + r) {
        return None;
    }
    Some((d2.sqrt(), Vector2::new(u, 0.0)))
}

/// Barycentric parameters `(v, w)` of the point on triangle `v0 v1 v2`
/// closest to `pos`, via the Voronoi region of `pos`: each of the three
/// vertices and three edges is tested before falling through to the face.
fn closest_uv_triangle(pos: &Point3, v0: &Point3, v1: &Point3, v2: &Point3) -> Vector2 {
    let ab = v1 - v0;
    let ac = v2 - v0;
    let ap = pos - v0;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return Vector2::new(0.0, 0.0);
    }

    let bp = pos - v1;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return Vector2::new(1.0, 0.0);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return Vector2::new(d1 / (d1 - d3), 0.0);
    }

    let cp = pos - v2;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return Vector2::new(0.0, 1.0);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return Vector2::new(0.0, d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return Vector2::new(1.0 - w, w);
    }

    // face case
    let denom = 1.0 / (va + vb + vc);
    Vector2::new(vb * denom, vc * denom)
}

/// Distance from `pos` to the triangle `v0 v1 v2` with per-vertex radii.
///
/// On success `euv` is `(u, v)`, the barycentric weights of `v1` and `v2`
/// at the closest point.
#[allow(clippy::too_many_arguments)]
pub fn point_triangle(
    pos: &Point3,
    dist_max: Real,
    v0: &Point3,
    v1: &Point3,
    v2: &Point3,
    r0: Real,
    r1: Real,
    r2: Real,
) -> Option<(Real, Vector2)> {
    let uv = closest_uv_triangle(pos, v0, v1, v2);
    let w = 1.0 - uv.x - uv.y;
    let p = Point3::from(v0.coords * w + v1.coords * uv.x + v2.coords * uv.y);
    let r = r0 * w + r1 * uv.x + r2 * uv.y;
    let d2 = distance_squared(&p, pos);
    if d2 > (dist_max + r) * (dist_max + r) {
        return None;
    }
    Some((d2.sqrt(), uv))
}
