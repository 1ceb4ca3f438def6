//! The two-level bounding volume hierarchy: shape BVHs over geometric
//! primitives, and the scene BVH whose leaves reference transformed shape
//! BVHs.

mod build;
mod node;
mod scene;
mod shape;

pub use self::build::Heuristic;
pub use self::node::BvhNode;
pub use self::scene::{Intersection, Nearest, SceneBvh};
pub use self::shape::{ElementKind, Elements, ShapeBvh, ShapeHit, ShapeNearest};
