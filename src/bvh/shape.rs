//! A BVH over the primitives of a single shape.

use log::debug;

use super::build::{build_nodes, BoundPrim, Heuristic};
use super::node::{BvhNode, NodeStack};
use crate::aabb::Aabb;
use crate::ray::Ray;
use crate::{distance, intersect, Point3, Real, Vector2, Vector3};

/// The kind of primitive a shape is made of. The numeric tags are fixed for
/// callers that mirror them across a foreign interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ElementKind {
    /// Points, one vertex index per element.
    Point = 1,

    /// Line segments, two vertex indices per element.
    Line = 2,

    /// Triangles, three vertex indices per element.
    Triangle = 3,
}

/// Borrowed view of a shape's element indices, typed by primitive kind.
#[derive(Debug, Copy, Clone)]
pub enum Elements<'a> {
    /// One vertex index per element.
    Points(&'a [u32]),

    /// Two vertex indices per element.
    Lines(&'a [[u32; 2]]),

    /// Three vertex indices per element.
    Triangles(&'a [[u32; 3]]),
}

impl Elements<'_> {
    /// The primitive kind of this view.
    pub fn kind(&self) -> ElementKind {
        match self {
            Elements::Points(_) => ElementKind::Point,
            Elements::Lines(_) => ElementKind::Line,
            Elements::Triangles(_) => ElementKind::Triangle,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Elements::Points(points) => points.len(),
            Elements::Lines(lines) => lines.len(),
            Elements::Triangles(triangles) => triangles.len(),
        }
    }

    /// Whether the view holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A ray hit on a shape: element index, ray parameter and element
/// parameterization.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShapeHit {
    /// Hit element index.
    pub eid: usize,

    /// Ray parameter at the hit, in units of the ray direction.
    pub t: Real,

    /// Element parameters at the hit.
    pub euv: Vector2,
}

/// A closest-point result on a shape: element index, Euclidean distance and
/// element parameterization.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShapeNearest {
    /// Closest element index.
    pub eid: usize,

    /// Euclidean distance to the closest point.
    pub dist: Real,

    /// Element parameters at the closest point.
    pub euv: Vector2,
}

/// A BVH over the primitives of a single shape.
///
/// The element indices, vertex positions and radii are borrowed, never
/// copied: the caller keeps them alive and unchanged for the lifetime of
/// this value (or rebuilds after changing them). Primitive data is never
/// reordered; only the leaf permutation indexes into it.
pub struct ShapeBvh<'a> {
    pub(crate) nodes: Vec<BvhNode>,
    pub(crate) sorted_prim: Vec<u32>,
    elements: Elements<'a>,
    positions: &'a [Point3],
    radius: Option<&'a [Real]>,
    heuristic: Heuristic,
}

impl<'a> ShapeBvh<'a> {
    /// Creates a shape BVH over the given element and vertex views. Does
    /// not build; call [`ShapeBvh::build`] before querying.
    ///
    /// `radius` supplies per-vertex radii for points and lines and is
    /// treated as all zero when absent. Triangles ignore it during build.
    pub fn new(
        elements: Elements<'a>,
        positions: &'a [Point3],
        radius: Option<&'a [Real]>,
        heuristic: Heuristic,
    ) -> ShapeBvh<'a> {
        ShapeBvh {
            nodes: Vec::new(),
            sorted_prim: Vec::new(),
            elements,
            positions,
            radius,
            heuristic,
        }
    }

    /// The primitive kind of this shape.
    pub fn kind(&self) -> ElementKind {
        self.elements.kind()
    }

    /// Number of elements in this shape.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether this shape holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether [`ShapeBvh::build`] has run.
    pub fn is_built(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// The borrowed element view.
    pub fn elements(&self) -> Elements<'a> {
        self.elements
    }

    /// The root bounding box of the built hierarchy.
    ///
    /// # Panics
    ///
    /// Panics if the shape has not been built.
    pub fn root_bbox(&self) -> &Aabb {
        assert!(self.is_built(), "shape bvh queried before build");
        &self.nodes[0].bbox
    }

    fn vertex_radius(&self, vertex: usize) -> Real {
        self.radius.map_or(0.0, |radius| radius[vertex])
    }

    /// Builds the hierarchy. Stages one bounding record per element (fat
    /// points and rods are inflated by their vertex radii; triangles are
    /// the hull of their vertices), then hands the records to the shared
    /// builder.
    pub fn build(&mut self) {
        let mut prims: Vec<BoundPrim> = match self.elements {
            Elements::Points(points) => points
                .iter()
                .enumerate()
                .map(|(pid, &v)| {
                    let v = v as usize;
                    let r = Vector3::repeat(self.vertex_radius(v));
                    let bbox = Aabb::empty()
                        .grow(&(self.positions[v] - r))
                        .grow(&(self.positions[v] + r));
                    BoundPrim::new(pid as u32, bbox)
                })
                .collect(),
            Elements::Lines(lines) => lines
                .iter()
                .enumerate()
                .map(|(pid, &[a, b])| {
                    let (a, b) = (a as usize, b as usize);
                    let ra = Vector3::repeat(self.vertex_radius(a));
                    let rb = Vector3::repeat(self.vertex_radius(b));
                    let bbox = Aabb::empty()
                        .grow(&(self.positions[a] - ra))
                        .grow(&(self.positions[a] + ra))
                        .grow(&(self.positions[b] - rb))
                        .grow(&(self.positions[b] + rb));
                    BoundPrim::new(pid as u32, bbox)
                })
                .collect(),
            Elements::Triangles(triangles) => triangles
                .iter()
                .enumerate()
                .map(|(pid, &[a, b, c])| {
                    let bbox = Aabb::empty()
                        .grow(&self.positions[a as usize])
                        .grow(&self.positions[b as usize])
                        .grow(&self.positions[c as usize]);
                    BoundPrim::new(pid as u32, bbox)
                })
                .collect(),
        };

        let (nodes, sorted_prim) = build_nodes(&mut prims, self.heuristic);
        debug!(
            "shape bvh: {} nodes, {} {:?} elements",
            nodes.len(),
            sorted_prim.len(),
            self.kind()
        );
        self.nodes = nodes;
        self.sorted_prim = sorted_prim;
    }

    /// Finds the closest ray hit on this shape.
    ///
    /// # Panics
    ///
    /// Panics if the shape has not been built.
    pub fn intersect(&self, ray: &Ray) -> Option<ShapeHit> {
        assert!(self.is_built(), "shape bvh queried before build");
        self.intersect_impl(ray, false)
    }

    /// Returns whether the ray hits anything on this shape, stopping at the
    /// first accepted hit.
    ///
    /// # Panics
    ///
    /// Panics if the shape has not been built.
    pub fn any_hit(&self, ray: &Ray) -> bool {
        assert!(self.is_built(), "shape bvh queried before build");
        self.intersect_impl(ray, true).is_some()
    }

    /// Finds the element of this shape closest to `pos` within `max_dist`.
    ///
    /// # Panics
    ///
    /// Panics if the shape has not been built.
    pub fn nearest(&self, pos: &Point3, max_dist: Real) -> Option<ShapeNearest> {
        assert!(self.is_built(), "shape bvh queried before build");
        let mut dist_max = max_dist;
        self.nearest_impl(pos, &mut dist_max)
    }

    /// Stack walk for ray queries. The local ray's `tmax` tightens on every
    /// accepted hit, so farther subtrees prune against the best hit so far;
    /// `early_exit` stops at the first accepted hit instead.
    pub(crate) fn intersect_impl(&self, ray: &Ray, early_exit: bool) -> Option<ShapeHit> {
        let mut ray = *ray;
        let mut best = None;
        let mut stack = NodeStack::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            if early_exit && best.is_some() {
                break;
            }
            let node = &self.nodes[index as usize];
            if !ray.intersects_aabb(&node.bbox) {
                continue;
            }
            if node.is_leaf {
                for slot in 0..node.count as usize {
                    let eid = self.sorted_prim[node.start as usize + slot] as usize;
                    if let Some((t, euv)) = self.intersect_element(&ray, eid) {
                        ray.tmax = t;
                        best = Some(ShapeHit { eid, t, euv });
                    }
                }
            } else {
                // Process the near child first: the far child is pushed
                // below it so the LIFO pop order follows the ray.
                if ray.direction[node.axis as usize] >= 0.0 {
                    stack.push(node.start + 1);
                    stack.push(node.start);
                } else {
                    stack.push(node.start);
                    stack.push(node.start + 1);
                }
            }
        }
        best
    }

    fn intersect_element(&self, ray: &Ray, eid: usize) -> Option<(Real, Vector2)> {
        match self.elements {
            Elements::Points(points) => {
                let v = points[eid] as usize;
                intersect::ray_point(ray, &self.positions[v], self.vertex_radius(v))
            }
            Elements::Lines(lines) => {
                let [a, b] = lines[eid];
                let (a, b) = (a as usize, b as usize);
                intersect::ray_line(
                    ray,
                    &self.positions[a],
                    &self.positions[b],
                    self.vertex_radius(a),
                    self.vertex_radius(b),
                )
            }
            Elements::Triangles(triangles) => {
                let [a, b, c] = triangles[eid];
                intersect::ray_triangle(
                    ray,
                    &self.positions[a as usize],
                    &self.positions[b as usize],
                    &self.positions[c as usize],
                )
            }
        }
    }

    /// Stack walk for closest-point queries. `dist_max` tightens on every
    /// accepted element, pruning subtrees whose boxes lie farther than the
    /// best distance so far; the caller observes the final bound.
    pub(crate) fn nearest_impl(&self, pos: &Point3, dist_max: &mut Real) -> Option<ShapeNearest> {
        let mut best = None;
        let mut stack = NodeStack::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if node.bbox.min_distance_squared(pos) >= *dist_max * *dist_max {
                continue;
            }
            if node.is_leaf {
                for slot in 0..node.count as usize {
                    let eid = self.sorted_prim[node.start as usize + slot] as usize;
                    if let Some((dist, euv)) = self.nearest_element(pos, *dist_max, eid) {
                        *dist_max = dist;
                        best = Some(ShapeNearest { eid, dist, euv });
                    }
                }
            } else {
                stack.push(node.start);
                stack.push(node.start + 1);
            }
        }
        best
    }

    fn nearest_element(
        &self,
        pos: &Point3,
        dist_max: Real,
        eid: usize,
    ) -> Option<(Real, Vector2)> {
        match self.elements {
            Elements::Points(points) => {
                let v = points[eid] as usize;
                distance::point_point(pos, dist_max, &self.positions[v], self.vertex_radius(v))
            }
            Elements::Lines(lines) => {
                let [a, b] = lines[eid];
                let (a, b) = (a as usize, b as usize);
                distance::point_line(
                    pos,
                    dist_max,
                    &self.positions[a],
                    &self.positions[b],
                    self.vertex_radius(a),
                    self.vertex_radius(b),
                )
            }
            Elements::Triangles(triangles) => {
                let [a, b, c] = triangles[eid];
                let (a, b, c) = (a as usize, b as usize, c as usize);
                distance::point_triangle(
                    pos,
                    dist_max,
                    &self.positions[a],
                    &self.positions[b],
                    &self.positions[c],
                    self.vertex_radius(a),
                    self.vertex_radius(b),
                    self.vertex_radius(c),
                )
            }
        }
    }
}
