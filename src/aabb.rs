//! Axis Aligned Bounding Boxes.

use crate::{Affine3, Point3, Real, Vector3};

/// An `Aabb` described by its minimum and maximum corner points.
///
/// A freshly created [`Aabb::empty`] box carries the invalid sentinel
/// (`min = +INFINITY`, `max = -INFINITY`), which is the identity for
/// [`Aabb::grow`] and [`Aabb::join`]: expanding it by anything yields that
/// thing's bounds.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    /// Minimum coordinates.
    pub min: Point3,

    /// Maximum coordinates.
    pub max: Point3,
}

impl Aabb {
    /// Creates a new [`Aabb`] with the given bounds.
    pub fn with_bounds(min: Point3, max: Point3) -> Aabb {
        Aabb { min, max }
    }

    /// Creates a new empty [`Aabb`].
    pub fn empty() -> Aabb {
        Aabb {
            min: Point3::new(Real::INFINITY, Real::INFINITY, Real::INFINITY),
            max: Point3::new(Real::NEG_INFINITY, Real::NEG_INFINITY, Real::NEG_INFINITY),
        }
    }

    /// Returns true once the box has been populated, i.e. `min <= max` on
    /// every axis.
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Returns a new minimal [`Aabb`] which contains both this [`Aabb`] and
    /// the point `p`.
    pub fn grow(&self, p: &Point3) -> Aabb {
        let mut result = *self;
        result.grow_mut(p);
        result
    }

    /// Expands this [`Aabb`] to contain the point `p`.
    pub fn grow_mut(&mut self, p: &Point3) {
        self.min = Point3::new(
            self.min.x.min(p.x),
            self.min.y.min(p.y),
            self.min.z.min(p.z),
        );
        self.max = Point3::new(
            self.max.x.max(p.x),
            self.max.y.max(p.y),
            self.max.z.max(p.z),
        );
    }

    /// Returns a new minimal [`Aabb`] which contains both this [`Aabb`] and
    /// `other`.
    pub fn join(&self, other: &Aabb) -> Aabb {
        let mut result = *self;
        result.join_mut(other);
        result
    }

    /// Expands this [`Aabb`] to contain `other`.
    pub fn join_mut(&mut self, other: &Aabb) {
        self.min = Point3::new(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.min.z.min(other.min.z),
        );
        self.max = Point3::new(
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
            self.max.z.max(other.max.z),
        );
    }

    /// Returns the size of this [`Aabb`] in all three dimensions.
    pub fn size(&self) -> Vector3 {
        self.max - self.min
    }

    /// Returns the center point of the [`Aabb`].
    pub fn center(&self) -> Point3 {
        self.min + self.size() / 2.0
    }

    /// Returns half the surface area of this [`Aabb`], the cost metric used
    /// by the surface-area heuristic.
    pub fn half_area(&self) -> Real {
        let size = self.size();
        size.x * size.y + size.x * size.z + size.y * size.z
    }

    /// Returns true if the [`Point3`] is inside the [`Aabb`].
    pub fn contains(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Returns true if the [`Point3`] is approximately inside the [`Aabb`]
    /// with respect to some `epsilon`.
    pub fn approx_contains_eps(&self, p: &Point3, epsilon: Real) -> bool {
        (p.x - self.min.x) > -epsilon
            && (p.x - self.max.x) < epsilon
            && (p.y - self.min.y) > -epsilon
            && (p.y - self.max.y) < epsilon
            && (p.z - self.min.z) > -epsilon
            && (p.z - self.max.z) < epsilon
    }

    /// Returns true if `other` is approximately contained in this [`Aabb`]
    /// with respect to some `epsilon`.
    pub fn approx_contains_aabb_eps(&self, other: &Aabb, epsilon: Real) -> bool {
        self.approx_contains_eps(&other.min, epsilon)
            && self.approx_contains_eps(&other.max, epsilon)
    }

    /// Returns the squared distance from `p` to the closest point of this
    /// [`Aabb`], summing the squared excess outside the box extents on each
    /// axis. Zero when `p` is inside.
    pub fn min_distance_squared(&self, p: &Point3) -> Real {
        let mut dd = 0.0;
        for i in 0..3 {
            let v = p[i];
            if v < self.min[i] {
                dd += (self.min[i] - v) * (self.min[i] - v);
            }
            if v > self.max[i] {
                dd += (v - self.max[i]) * (v - self.max[i]);
            }
        }
        dd
    }

    /// Standard three-axis interval overlap test against `other`.
    pub fn intersects_aabb(&self, other: &Aabb) -> bool {
        if self.max.x < other.min.x || self.min.x > other.max.x {
            return false;
        }
        if self.max.y < other.min.y || self.min.y > other.max.y {
            return false;
        }
        if self.max.z < other.min.z || self.min.z > other.max.z {
            return false;
        }
        true
    }

    /// Returns the [`Aabb`] of this box transformed by `xform`, computed as
    /// the hull of the eight transformed corners. A loose but cheap bound.
    pub fn transformed(&self, xform: &Affine3) -> Aabb {
        if !self.is_valid() {
            return Aabb::empty();
        }
        let mut result = Aabb::empty();
        for corner in 0..8 {
            let p = Point3::new(
                if corner & 1 == 0 { self.min.x } else { self.max.x },
                if corner & 2 == 0 { self.min.y } else { self.max.y },
                if corner & 4 == 0 { self.min.z } else { self.max.z },
            );
            result.grow_mut(&xform.transform_point(&p));
        }
        result
    }
}

impl Default for Aabb {
    fn default() -> Aabb {
        Aabb::empty()
    }
}
