//! This module defines a ray and its intersection test against axis aligned
//! bounding boxes.

use crate::aabb::Aabb;
use crate::{Affine3, Point3, Real, Vector3};

/// A ray with an inclusive parameter range `[tmin, tmax]`.
///
/// The direction is deliberately not normalized: parameters reported by the
/// intersection routines are in units of `direction`, so instanced queries
/// can transform a ray into shape-local space and keep comparing parameters
/// across spaces.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The ray origin.
    pub origin: Point3,

    /// The ray direction.
    pub direction: Vector3,

    /// Inverse (1/x) ray direction. Cached for use in [`Aabb`] intersections.
    pub inv_direction: Vector3,

    /// Minimal parameter along the ray to consider.
    pub tmin: Real,

    /// Maximal parameter along the ray to consider. Tightened during
    /// closest-hit traversal.
    pub tmax: Real,
}

impl Ray {
    /// Creates a new [`Ray`] from an `origin`, a `direction` and the
    /// parameter range `[tmin, tmax]`.
    pub fn new(origin: Point3, direction: Vector3, tmin: Real, tmax: Real) -> Ray {
        Ray {
            origin,
            direction,
            inv_direction: direction.map(|x| 1.0 / x),
            tmin,
            tmax,
        }
    }

    /// Returns the point on the ray at parameter `t`.
    pub fn at(&self, t: Real) -> Point3 {
        self.origin + self.direction * t
    }

    /// Returns this ray mapped through `xform`: the origin as a point, the
    /// direction as a vector. The parameter range is preserved, so `t`
    /// values remain comparable across the transform.
    pub fn transformed(&self, xform: &Affine3) -> Ray {
        Ray::new(
            xform.transform_point(&self.origin),
            xform.transform_vector(&self.direction),
            self.tmin,
            self.tmax,
        )
    }

    /// Tests the intersection of this [`Ray`] with an [`Aabb`] using the
    /// slab method, clipping the ray range against the bounding planes of
    /// each axis in turn. Does not modify the ray.
    ///
    /// A zero direction component produces infinities here; the comparison
    /// form below drops the resulting NaNs on the box boundary instead of
    /// propagating them.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let mut tmin = self.tmin;
        let mut tmax = self.tmax;

        for i in 0..3 {
            let mut t0 = (aabb.min[i] - self.origin[i]) * self.inv_direction[i];
            let mut t1 = (aabb.max[i] - self.origin[i]) * self.inv_direction[i];
            if self.inv_direction[i] < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            tmin = if t0 > tmin { t0 } else { tmin };
            tmax = if t1 < tmax { t1 } else { tmax };
            if tmin > tmax {
                return false;
            }
        }
        true
    }
}
