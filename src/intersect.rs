//! Ray/primitive intersection routines for fat points, fat segments and
//! triangles.
//!
//! Every routine returns `Some((t, euv))` when the computed ray parameter
//! lies within the ray's `[tmin, tmax]` range and the primitive test passes,
//! and `None` otherwise. Inputs are never mutated, and degenerate
//! configurations (zero determinants) are misses, not errors.

use crate::ray::Ray;
use crate::{Point3, Real, Vector2};

/// Intersects a ray with a point of radius `r`.
///
/// Finds the parameter of the closest point on the ray line to `p` and
/// accepts when that point lies within `r` of `p`, so the reported `t` is
/// the closest approach, not the sphere surface. On a hit `euv` is `(0, 0)`.
pub fn ray_point(ray: &Ray, p: &Point3, r: Real) -> Option<(Real, Vector2)> {
    // parameter of the line-point minimum distance
    let w = p - ray.origin;
    let t = w.dot(&ray.direction) / ray.direction.dot(&ray.direction);

    if t < ray.tmin || t > ray.tmax {
        return None;
    }

    // line-point distance against the point radius
    let prp = p - ray.at(t);
    if prp.dot(&prp) > r * r {
        return None;
    }

    Some((t, Vector2::zeros()))
}

/// Intersects a ray with a line segment `v0..v1` carrying per-endpoint radii
/// `r0` and `r1`.
///
/// Solves the 2x2 system minimizing the distance between the ray line and
/// the segment line, clamps the segment parameter to the segment, and
/// accepts when the closest points lie within the radius interpolated at
/// that location. On a hit `euv` is `(s, 0)` with `s` the segment parameter.
pub fn ray_line(
    ray: &Ray,
    v0: &Point3,
    v1: &Point3,
    r0: Real,
    r1: Real,
) -> Option<(Real, Vector2)> {
    let u = ray.direction;
    let v = v1 - v0;
    let w = ray.origin - v0;

    let a = u.dot(&u);
    let b = u.dot(&v);
    let c = v.dot(&v);
    let d = u.dot(&w);
    let e = v.dot(&w);
    let det = a * c - b * b;

    // parallel lines
    if det == 0.0 {
        return None;
    }

    let t = (b * e - c * d) / det;
    let s = (a * e - b * d) / det;

    if t < ray.tmin || t > ray.tmax {
        return None;
    }

    // clamp the segment parameter to the segment corners
    let s = s.clamp(0.0, 1.0);

    // closest-point distance against the radius interpolated at s
    let p0 = ray.at(t);
    let p1 = v0 + v * s;
    let p01 = p0 - p1;
    let r = r0 * (1.0 - s) + r1 * s;
    if p01.dot(&p01) > r * r {
        return None;
    }

    Some((t, Vector2::new(s, 0.0)))
}

/// Intersects a ray with the triangle `v0 v1 v2` using the Moller-Trumbore
/// algorithm. The test is two-sided; a zero determinant (ray parallel to
/// the triangle plane) is a miss.
///
/// On a hit `euv` is `(u, v)`, the barycentric weights of `v1` and `v2`.
pub fn ray_triangle(
    ray: &Ray,
    v0: &Point3,
    v1: &Point3,
    v2: &Point3,
) -> Option<(Real, Vector2)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray.direction.cross(&edge2);
    let det = edge1.dot(&pvec);
    if det == 0.0 {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.origin - v0;
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(&edge1);
    let v = ray.direction.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(&qvec) * inv_det;
    if t < ray.tmin || t > ray.tmax {
        return None;
    }

    Some((t, Vector2::new(u, v)))
}
