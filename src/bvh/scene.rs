//! The scene BVH: a hierarchy whose leaves are affinely transformed shape
//! hierarchies.

use log::{debug, trace};

use super::build::{build_nodes, BoundPrim, Heuristic};
use super::node::{BvhNode, NodeStack};
use super::shape::{Elements, ShapeBvh};
use crate::aabb::Aabb;
use crate::ray::Ray;
use crate::{Affine3, Point3, Real, Vector2};

/// Size of the paired stack used by the overlap walk.
const PAIR_STACK_DEPTH: usize = 256;

/// A ray hit in a scene: shape and element indices, ray parameter and
/// element parameterization.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Intersection {
    /// Hit shape index.
    pub sid: usize,

    /// Hit element index within the shape.
    pub eid: usize,

    /// Ray parameter at the hit, in units of the ray direction.
    pub t: Real,

    /// Element parameters at the hit.
    pub euv: Vector2,
}

/// A closest-point result in a scene: shape and element indices, distance
/// and element parameterization.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Nearest {
    /// Closest shape index.
    pub sid: usize,

    /// Closest element index within the shape.
    pub eid: usize,

    /// Euclidean distance to the closest point, measured in the shape-local
    /// frame.
    pub dist: Real,

    /// Element parameters at the closest point.
    pub euv: Vector2,
}

/// A BVH over a collection of transformed shapes.
///
/// Each shape slot carries a shape BVH, its affine transform and the cached
/// inverse. The scene's own nodes treat every shape as one primitive whose
/// bounds are the transformed hull of the shape's root box. Queries are
/// transformed into shape-local space through the cached inverse when they
/// reach a scene leaf.
pub struct SceneBvh<'a> {
    nodes: Vec<BvhNode>,
    sorted_prim: Vec<u32>,
    shapes: Vec<Option<ShapeBvh<'a>>>,
    xforms: Vec<Affine3>,
    inv_xforms: Vec<Affine3>,
    heuristic: Heuristic,
}

impl<'a> SceneBvh<'a> {
    /// Creates a scene with `nshapes` empty shape slots and identity
    /// transforms. Fill every slot with [`SceneBvh::set_shape`], then call
    /// [`SceneBvh::build`].
    pub fn new(nshapes: usize, heuristic: Heuristic) -> SceneBvh<'a> {
        SceneBvh {
            nodes: Vec::new(),
            sorted_prim: Vec::new(),
            shapes: (0..nshapes).map(|_| None).collect(),
            xforms: vec![Affine3::identity(); nshapes],
            inv_xforms: vec![Affine3::identity(); nshapes],
            heuristic,
        }
    }

    /// Number of shape slots.
    pub fn nshapes(&self) -> usize {
        self.shapes.len()
    }

    /// Whether [`SceneBvh::build`] has run.
    pub fn is_built(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// The shape at slot `sid`, if one has been set.
    pub fn shape(&self, sid: usize) -> Option<&ShapeBvh<'a>> {
        self.shapes[sid].as_ref()
    }

    /// Installs the shape at slot `sid`, replacing (and dropping) any shape
    /// previously set there, and caches the inverse of `xform`.
    ///
    /// # Panics
    ///
    /// Panics if `sid` is out of range.
    pub fn set_shape(
        &mut self,
        sid: usize,
        xform: Affine3,
        elements: Elements<'a>,
        positions: &'a [Point3],
        radius: Option<&'a [Real]>,
        heuristic: Heuristic,
    ) {
        assert!(sid < self.shapes.len(), "shape id {} out of range", sid);
        self.shapes[sid] = Some(ShapeBvh::new(elements, positions, radius, heuristic));
        self.xforms[sid] = xform;
        self.inv_xforms[sid] = xform.inverse();
    }

    /// Builds every shape BVH depth first, then the scene hierarchy over
    /// the transformed shape root boxes.
    ///
    /// # Panics
    ///
    /// Panics if any shape slot was never set.
    pub fn build(&mut self) {
        for (sid, shape) in self.shapes.iter_mut().enumerate() {
            let shape = shape
                .as_mut()
                .unwrap_or_else(|| panic!("shape {} not set before build", sid));
            shape.build();
        }

        let mut prims: Vec<BoundPrim> = (0..self.shapes.len())
            .map(|sid| {
                let root = self.shapes[sid].as_ref().unwrap().root_bbox();
                BoundPrim::new(sid as u32, root.transformed(&self.xforms[sid]))
            })
            .collect();

        let (nodes, sorted_prim) = build_nodes(&mut prims, self.heuristic);
        debug!(
            "scene bvh: {} nodes over {} shapes",
            nodes.len(),
            sorted_prim.len()
        );
        self.nodes = nodes;
        self.sorted_prim = sorted_prim;
    }

    /// Updates the shape transforms and recomputes every node's bounds
    /// bottom-up. Topology and the shape hierarchies are untouched; use
    /// this to track moving instances, and rebuild for large changes.
    ///
    /// # Panics
    ///
    /// Panics if the scene has not been built or `xforms` does not hold one
    /// transform per shape.
    pub fn refit(&mut self, xforms: &[Affine3]) {
        assert!(self.is_built(), "scene bvh refit before build");
        assert_eq!(xforms.len(), self.shapes.len(), "one transform per shape");

        for (sid, xform) in xforms.iter().enumerate() {
            self.xforms[sid] = *xform;
            self.inv_xforms[sid] = xform.inverse();
        }
        self.recompute_bounds(0);
        trace!("scene bvh refit over {} shapes", self.shapes.len());
    }

    /// Post-order bound recomputation: leaves take the transformed hull of
    /// their shapes' root boxes, internal nodes the union of their children.
    fn recompute_bounds(&mut self, index: usize) {
        let node = self.nodes[index];
        let mut bbox = Aabb::empty();
        if node.is_leaf {
            for slot in 0..node.count as usize {
                let sid = self.sorted_prim[node.start as usize + slot] as usize;
                let root = self.shapes[sid].as_ref().unwrap().root_bbox();
                bbox.join_mut(&root.transformed(&self.xforms[sid]));
            }
        } else {
            for child in 0..node.count as usize {
                let child_index = node.start as usize + child;
                self.recompute_bounds(child_index);
                bbox.join_mut(&self.nodes[child_index].bbox);
            }
        }
        self.nodes[index].bbox = bbox;
    }

    /// Finds the closest ray hit in the scene.
    ///
    /// # Panics
    ///
    /// Panics if the scene has not been built.
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        assert!(self.is_built(), "scene bvh queried before build");
        self.intersect_impl(ray, false)
    }

    /// Returns whether the ray hits anything in the scene, stopping at the
    /// first accepted hit.
    ///
    /// # Panics
    ///
    /// Panics if the scene has not been built.
    pub fn any_hit(&self, ray: &Ray) -> bool {
        assert!(self.is_built(), "scene bvh queried before build");
        self.intersect_impl(ray, true).is_some()
    }

    fn intersect_impl(&self, ray: &Ray, early_exit: bool) -> Option<Intersection> {
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
                    let sid = self.sorted_prim[node.start as usize + slot] as usize;
                    let shape = self.shapes[sid].as_ref().unwrap();
                    // Instanced query: move the ray into shape-local space
                    // and keep the tightened range.
                    let local = ray.transformed(&self.inv_xforms[sid]);
                    if let Some(hit) = shape.intersect_impl(&local, early_exit) {
                        ray.tmax = hit.t;
                        best = Some(Intersection {
                            sid,
                            eid: hit.eid,
                            t: hit.t,
                            euv: hit.euv,
                        });
                    }
                }
            } else if ray.direction[node.axis as usize] >= 0.0 {
                stack.push(node.start + 1);
                stack.push(node.start);
            } else {
                stack.push(node.start);
                stack.push(node.start + 1);
            }
        }
        best
    }

    /// Finds the element closest to `pos` within `max_dist` across the
    /// scene, or within the single shape `req_sid` when given.
    ///
    /// The distance is Euclidean in the shape-local frame; callers that
    /// need world-space distances under non-rigid transforms should
    /// restrict themselves to rigid transforms.
    ///
    /// # Panics
    ///
    /// Panics if the scene has not been built or `req_sid` is out of range.
    pub fn nearest(
        &self,
        pos: &Point3,
        max_dist: Real,
        req_sid: Option<usize>,
    ) -> Option<Nearest> {
        assert!(self.is_built(), "scene bvh queried before build");

        if let Some(sid) = req_sid {
            assert!(sid < self.shapes.len(), "shape id {} out of range", sid);
            let shape = self.shapes[sid].as_ref().unwrap();
            let local = self.inv_xforms[sid].transform_point(pos);
            let mut dist_max = max_dist;
            return shape.nearest_impl(&local, &mut dist_max).map(|near| Nearest {
                sid,
                eid: near.eid,
                dist: near.dist,
                euv: near.euv,
            });
        }

        let mut dist_max = max_dist;
        let mut best = None;
        let mut stack = NodeStack::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if node.bbox.min_distance_squared(pos) >= dist_max * dist_max {
                continue;
            }
            if node.is_leaf {
                for slot in 0..node.count as usize {
                    let sid = self.sorted_prim[node.start as usize + slot] as usize;
                    let shape = self.shapes[sid].as_ref().unwrap();
                    let local = self.inv_xforms[sid].transform_point(pos);
                    if let Some(near) = shape.nearest_impl(&local, &mut dist_max) {
                        best = Some(Nearest {
                            sid,
                            eid: near.eid,
                            dist: near.dist,
                            euv: near.euv,
                        });
                    }
                }
            } else {
                stack.push(node.start);
                stack.push(node.start + 1);
            }
        }
        best
    }

    /// Reports every pair of shapes whose transformed root boxes overlap,
    /// invoking `callback(i, j)` per pair and returning the number of pairs
    /// emitted.
    ///
    /// Pairs are emitted both ways: `(i, j)` and `(j, i)` both appear,
    /// which keeps asymmetric callbacks simple; skip pairs with `i > j` to
    /// deduplicate. Self-pairs `(i, i)` are dropped when `exclude_self` is
    /// set.
    ///
    /// # Panics
    ///
    /// Panics if the scene has not been built.
    pub fn overlap_shape_bounds<F>(&self, exclude_self: bool, mut callback: F) -> usize
    where
        F: FnMut(usize, usize),
    {
        assert!(self.is_built(), "scene bvh queried before build");

        let mut stack = [(0u32, 0u32); PAIR_STACK_DEPTH];
        let mut len = 1;
        let mut hits = 0;

        while len > 0 {
            len -= 1;
            let (a_index, b_index) = stack[len];
            let a = &self.nodes[a_index as usize];
            let b = &self.nodes[b_index as usize];

            if !a.bbox.intersects_aabb(&b.bbox) {
                continue;
            }

            if a.is_leaf && b.is_leaf {
                for i in 0..a.count as usize {
                    for j in 0..b.count as usize {
                        let sid1 = self.sorted_prim[a.start as usize + i] as usize;
                        let sid2 = self.sorted_prim[b.start as usize + j] as usize;
                        if exclude_self && sid1 == sid2 {
                            continue;
                        }
                        let bbox1 = self.shapes[sid1]
                            .as_ref()
                            .unwrap()
                            .root_bbox()
                            .transformed(&self.xforms[sid1]);
                        let bbox2 = self.shapes[sid2]
                            .as_ref()
                            .unwrap()
                            .root_bbox()
                            .transformed(&self.xforms[sid2]);
                        if !bbox1.intersects_aabb(&bbox2) {
                            continue;
                        }
                        hits += 1;
                        callback(sid1, sid2);
                    }
                }
            } else if a.is_leaf {
                // Pair the leaf against each child of the internal node.
                for j in 0..b.count as u32 {
                    debug_assert!(len < PAIR_STACK_DEPTH, "overlap stack overflow");
                    stack[len] = (a_index, b.start + j);
                    len += 1;
                }
            } else {
                // Both internal, or only A internal: descend A's children.
                // Asymmetric but complete, and free of duplicate pairs.
                for i in 0..a.count as u32 {
                    debug_assert!(len < PAIR_STACK_DEPTH, "overlap stack overflow");
                    stack[len] = (a.start + i, b_index);
                    len += 1;
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Vector3, EPSILON};
    use nalgebra::Matrix4;

    fn translate(x: f32, y: f32, z: f32) -> Affine3 {
        Affine3::from_matrix_unchecked(Matrix4::new_translation(&Vector3::new(x, y, z)))
    }

    fn ray(origin: Point3, direction: Vector3) -> Ray {
        Ray::new(origin, direction, 0.0, f32::INFINITY)
    }

    fn unit_triangle() -> (Vec<[u32; 3]>, Vec<Point3>) {
        (
            vec![[0, 1, 2]],
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
        )
    }

    #[test]
    fn transformed_instances_resolve_to_shape_ids() {
        let (triangles, positions) = unit_triangle();
        let mut scene = SceneBvh::new(2, Heuristic::Default);
        scene.set_shape(
            0,
            Affine3::identity(),
            Elements::Triangles(&triangles),
            &positions,
            None,
            Heuristic::Default,
        );
        scene.set_shape(
            1,
            translate(5.0, 0.0, 0.0),
            Elements::Triangles(&triangles),
            &positions,
            None,
            Heuristic::Default,
        );
        scene.build();

        let hit = scene
            .intersect(&ray(Point3::new(5.25, 0.25, -1.0), Vector3::new(0.0, 0.0, 1.0)))
            .unwrap();
        assert_eq!(hit.sid, 1);
        assert_eq!(hit.eid, 0);
        assert!((hit.t - 1.0).abs() < EPSILON);

        let hit = scene
            .intersect(&ray(Point3::new(0.25, 0.25, -1.0), Vector3::new(0.0, 0.0, 1.0)))
            .unwrap();
        assert_eq!(hit.sid, 0);
    }

    #[test]
    fn refit_follows_moved_instance() {
        let (triangles, positions) = unit_triangle();
        let mut scene = SceneBvh::new(1, Heuristic::Default);
        scene.set_shape(
            0,
            Affine3::identity(),
            Elements::Triangles(&triangles),
            &positions,
            None,
            Heuristic::Default,
        );
        scene.build();

        let probe = ray(Point3::new(10.25, 0.25, -1.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(scene.intersect(&probe).is_none());

        scene.refit(&[translate(10.0, 0.0, 0.0)]);
        let hit = scene.intersect(&probe).unwrap();
        assert_eq!(hit.sid, 0);
        assert!((hit.t - 1.0).abs() < EPSILON);

        // The old location no longer hits.
        assert!(!scene.any_hit(&ray(
            Point3::new(0.25, 0.25, -1.0),
            Vector3::new(0.0, 0.0, 1.0)
        )));
    }

    #[test]
    fn refit_identity_preserves_bounds() {
        let (triangles, positions) = unit_triangle();
        let mut scene = SceneBvh::new(3, Heuristic::Default);
        for sid in 0..3 {
            scene.set_shape(
                sid,
                translate(2.0 * sid as f32, 0.0, 0.0),
                Elements::Triangles(&triangles),
                &positions,
                None,
                Heuristic::Default,
            );
        }
        scene.build();

        let before_nodes: Vec<BvhNode> = scene.nodes.clone();
        let before_sorted = scene.sorted_prim.clone();
        let xforms: Vec<Affine3> = (0..3).map(|sid| translate(2.0 * sid as f32, 0.0, 0.0)).collect();
        scene.refit(&xforms);
        assert_eq!(scene.nodes, before_nodes);
        assert_eq!(scene.sorted_prim, before_sorted);
    }

    #[test]
    fn nearest_restricted_to_shape() {
        let points = [0u32];
        let near_positions = [Point3::new(0.0, 0.0, 0.0)];
        let far_positions = [Point3::new(3.0, 0.0, 0.0)];
        let mut scene = SceneBvh::new(2, Heuristic::Default);
        scene.set_shape(
            0,
            Affine3::identity(),
            Elements::Points(&points),
            &near_positions,
            None,
            Heuristic::Default,
        );
        scene.set_shape(
            1,
            Affine3::identity(),
            Elements::Points(&points),
            &far_positions,
            None,
            Heuristic::Default,
        );
        scene.build();

        let pos = Point3::new(1.0, 0.0, 0.0);
        let near = scene.nearest(&pos, f32::INFINITY, None).unwrap();
        assert_eq!(near.sid, 0);
        assert!((near.dist - 1.0).abs() < EPSILON);

        let near = scene.nearest(&pos, f32::INFINITY, Some(1)).unwrap();
        assert_eq!(near.sid, 1);
        assert!((near.dist - 2.0).abs() < EPSILON);
    }

    #[test]
    fn nearest_uses_local_frame_of_instance() {
        let (triangles, positions) = unit_triangle();
        let mut scene = SceneBvh::new(1, Heuristic::Default);
        scene.set_shape(
            0,
            translate(10.0, 0.0, 0.0),
            Elements::Triangles(&triangles),
            &positions,
            None,
            Heuristic::Default,
        );
        scene.build();

        let near = scene
            .nearest(&Point3::new(10.25, 0.25, 0.5), 2.0, None)
            .unwrap();
        assert_eq!(near.sid, 0);
        assert!((near.dist - 0.5).abs() < EPSILON);
    }

    #[test]
    fn overlap_pairs_are_symmetric() {
        let (triangles, positions) = unit_triangle();
        let mut scene = SceneBvh::new(3, Heuristic::Default);
        scene.set_shape(
            0,
            Affine3::identity(),
            Elements::Triangles(&triangles),
            &positions,
            None,
            Heuristic::Default,
        );
        scene.set_shape(
            1,
            translate(0.5, 0.0, 0.0),
            Elements::Triangles(&triangles),
            &positions,
            None,
            Heuristic::Default,
        );
        scene.set_shape(
            2,
            translate(100.0, 0.0, 0.0),
            Elements::Triangles(&triangles),
            &positions,
            None,
            Heuristic::Default,
        );
        scene.build();

        let mut pairs = Vec::new();
        let count = scene.overlap_shape_bounds(true, |i, j| pairs.push((i, j)));
        assert_eq!(count, pairs.len());
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);

        // Self-pairs appear when not excluded.
        let mut pairs = Vec::new();
        scene.overlap_shape_bounds(false, |i, j| pairs.push((i, j)));
        for sid in 0..3 {
            assert!(pairs.contains(&(sid, sid)));
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn set_shape_out_of_range_panics() {
        let (triangles, positions) = unit_triangle();
        let mut scene = SceneBvh::new(1, Heuristic::Default);
        scene.set_shape(
            1,
            Affine3::identity(),
            Elements::Triangles(&triangles),
            &positions,
            None,
            Heuristic::Default,
        );
    }

    #[test]
    #[should_panic(expected = "not set before build")]
    fn build_with_missing_shape_panics() {
        let mut scene = SceneBvh::new(1, Heuristic::Default);
        scene.build();
    }
}
