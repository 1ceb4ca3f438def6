//! Recursive BVH construction over staged bounding records.

use log::debug;

use super::node::BvhNode;
use crate::aabb::Aabb;
use crate::{Point3, Real};

/// Number of primitives below which a range becomes a leaf.
pub(crate) const MIN_PRIMS: usize = 4;

/// Split strategy used when partitioning a node's primitives.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Heuristic {
    /// The default strategy, an alias for [`Heuristic::Sah`]. Use this for
    /// ray casting.
    #[default]
    Default = 0,

    /// Object-median split along the largest centroid axis, producing a
    /// balanced binary tree.
    EqualNum = 1,

    /// Full surface-area-heuristic sweep across all three axes.
    Sah = 2,
}

/// A bounding record staged per input primitive: its box, centroid, original
/// index, and scratch space for the SAH cost sweeps.
pub(crate) struct BoundPrim {
    pub bbox: Aabb,
    pub center: Point3,
    pub pid: u32,
    sah_cost_left: Real,
    sah_cost_right: Real,
}

impl BoundPrim {
    pub fn new(pid: u32, bbox: Aabb) -> BoundPrim {
        BoundPrim {
            bbox,
            center: bbox.center(),
            pid,
            sah_cost_left: 0.0,
            sah_cost_right: 0.0,
        }
    }
}

/// Sorts the records by centroid along `axis`. `total_cmp` keeps the order
/// fully deterministic, so rebuilding from identical input reproduces the
/// identical tree.
fn sort_by_center(prims: &mut [BoundPrim], axis: usize) {
    prims.sort_by(|a, b| a.center[axis].total_cmp(&b.center[axis]));
}

/// Chooses the split `(axis, mid)` for the records in `prims`, which hold
/// one node's primitives. `mid` is relative to the start of the slice and
/// satisfies `0 < mid < prims.len()`.
fn split_axis(prims: &mut [BoundPrim], heuristic: Heuristic) -> (usize, usize) {
    let count = prims.len();
    match heuristic {
        Heuristic::EqualNum => {
            // Balanced split: enclose the centroids and cut the largest
            // axis right in the middle.
            let mut bbox = Aabb::empty();
            for prim in prims.iter() {
                bbox.grow_mut(&prim.center);
            }
            let size = bbox.size();
            let axis = if size.x >= size.y && size.x >= size.z {
                0
            } else if size.y >= size.x && size.y >= size.z {
                1
            } else {
                2
            };
            (axis, count / 2)
        }
        Heuristic::Default | Heuristic::Sah => {
            // Estimate the cost of splitting along each axis and pick the
            // candidate with the best expected performance. Two sweeps per
            // axis avoid an O(n^2) cost computation: smallest to largest
            // for the left costs, then the reverse for the right costs.
            let mut best_axis = usize::MAX;
            let mut best_mid = 0;
            let mut min_cost = Real::INFINITY;
            for axis in 0..3 {
                sort_by_center(prims, axis);
                let mut sbbox = Aabb::empty();
                for i in 0..count {
                    sbbox.join_mut(&prims[i].bbox);
                    prims[i].sah_cost_left = sbbox.half_area() * (i + 1) as Real;
                }
                sbbox = Aabb::empty();
                for i in 0..count {
                    sbbox.join_mut(&prims[count - 1 - i].bbox);
                    prims[count - 1 - i].sah_cost_right = sbbox.half_area() * (i + 1) as Real;
                }
                for mid in 2..=count - 2 {
                    let cost = prims[mid - 1].sah_cost_left + prims[mid].sah_cost_right;
                    if min_cost > cost {
                        min_cost = cost;
                        best_axis = axis;
                        best_mid = mid;
                    }
                }
            }
            debug_assert!(best_axis < 3 && best_mid > 0);
            (best_axis, best_mid)
        }
    }
}

/// Emits nodes for `prims[start..end]` into the pre-allocated arena,
/// splitting recursively until ranges fall below [`MIN_PRIMS`]. Child slots
/// are reserved off `next_free` before recursing, so the root stays at
/// index 0 and children are contiguous.
fn make_node(
    nodes: &mut [BvhNode],
    next_free: &mut usize,
    node_index: usize,
    prims: &mut [BoundPrim],
    start: usize,
    end: usize,
    heuristic: Heuristic,
) {
    let mut bbox = Aabb::empty();
    for prim in &prims[start..end] {
        bbox.join_mut(&prim.bbox);
    }

    if end - start <= MIN_PRIMS {
        nodes[node_index] = BvhNode::leaf(bbox, start as u32, (end - start) as u16);
    } else {
        let (axis, mid) = split_axis(&mut prims[start..end], heuristic);
        let mid = start + mid;
        sort_by_center(&mut prims[start..end], axis);

        let first_child = *next_free;
        *next_free += 2;
        nodes[node_index] = BvhNode::internal(bbox, first_child as u32, axis as u8);
        make_node(nodes, next_free, first_child, prims, start, mid, heuristic);
        make_node(nodes, next_free, first_child + 1, prims, mid, end, heuristic);
    }
}

/// Builds a node array and primitive permutation over the staged records.
/// The records are reordered in place; the returned permutation maps leaf
/// slots back to original primitive indices.
pub(crate) fn build_nodes(
    prims: &mut [BoundPrim],
    heuristic: Heuristic,
) -> (Vec<BvhNode>, Vec<u32>) {
    // Over-allocate to the 2n bound, then shrink to the emitted count.
    let mut nodes = vec![BvhNode::default(); (prims.len() * 2).max(1)];
    let mut next_free = 1;
    make_node(&mut nodes, &mut next_free, 0, prims, 0, prims.len(), heuristic);
    nodes.truncate(next_free);
    nodes.shrink_to_fit();

    let sorted_prim = prims.iter().map(|prim| prim.pid).collect();
    debug!(
        "built bvh: {} nodes over {} primitives",
        next_free,
        prims.len()
    );
    (nodes, sorted_prim)
}
