//! A crate which exports a two-level bounding volume hierarchy for ray
//! and closest-point queries against collections of geometric primitives.
//!
//! ## About
//!
//! Shapes are indexed meshes of a single primitive kind: points with a
//! radius, line segments with per-endpoint radii, or triangles. Each shape
//! gets its own BVH over its primitives, and a scene BVH ties any number of
//! affinely transformed shapes together, so the same mesh can be instanced
//! many times at the cost of one extra transform per traversal step. With a
//! BVH the intersection test complexity is reduced from O(n) to O(log2(n))
//! at the cost of building the hierarchy once in advance, which is the usual
//! trade for ray/path tracers, collision detection and proximity queries.
//!
//! ## Example
//!
//! ```
//! use scene_bvh::{Affine3, Elements, Heuristic, Point3, Ray, SceneBvh, Vector3};
//!
//! let triangles = [[0u32, 1, 2]];
//! let positions = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//!
//! let mut scene = SceneBvh::new(1, Heuristic::Default);
//! scene.set_shape(
//!     0,
//!     Affine3::identity(),
//!     Elements::Triangles(&triangles),
//!     &positions,
//!     None,
//!     Heuristic::Default,
//! );
//! scene.build();
//!
//! let ray = Ray::new(
//!     Point3::new(0.25, 0.25, -1.0),
//!     Vector3::new(0.0, 0.0, 1.0),
//!     0.0,
//!     f32::INFINITY,
//! );
//! let hit = scene.intersect(&ray).unwrap();
//! assert_eq!(hit.sid, 0);
//! assert_eq!(hit.eid, 0);
//! assert_eq!(hit.t, 1.0);
//! ```
//!
//! Vertex and index buffers are borrowed, never copied: the caller keeps
//! them alive and unchanged for the lifetime of the hierarchy. Queries do
//! not allocate and may run concurrently from multiple threads against a
//! built hierarchy; building and refitting are exclusive mutations.

/// A minimal floating value used as a tolerance bound in tests and
/// containment checks.
pub const EPSILON: f32 = 0.00001;

/// Scalar type used by this crate.
pub type Real = f32;

/// Point math type used by this crate. Type alias for [`nalgebra::Point3`].
pub type Point3 = nalgebra::Point3<Real>;

/// Vector math type used by this crate. Type alias for [`nalgebra::Vector3`].
pub type Vector3 = nalgebra::Vector3<Real>;

/// Two-component parameterization of a hit on a primitive: `(0, 0)` for a
/// point, `(s, 0)` for a segment, `(u, v)` barycentric for a triangle.
pub type Vector2 = nalgebra::Vector2<Real>;

/// Affine transform type used for shape instancing. Type alias for
/// [`nalgebra::Affine3`].
pub type Affine3 = nalgebra::Affine3<Real>;

pub mod aabb;
pub mod bvh;
pub mod distance;
pub mod interpolate;
pub mod intersect;
pub mod ray;

pub use aabb::Aabb;
pub use bvh::{
    BvhNode, ElementKind, Elements, Heuristic, Intersection, Nearest, SceneBvh, ShapeBvh,
    ShapeHit, ShapeNearest,
};
pub use interpolate::interpolate_vertex;
pub use ray::Ray;
