//! Vertex property interpolation from intersection data.

use crate::bvh::Elements;
use crate::{Real, Vector2};

/// Interpolates a vertex property at the hit parameterized by `eid` and
/// `euv`, as returned by the intersection and closest-point queries.
///
/// `vert` is a contiguous array of `vsize`-sized per-vertex values (uv
/// coordinates, normals, colors and the like). Values are copied for
/// points, interpolated linearly for lines and barycentrically for
/// triangles, and accumulated into `out`.
///
/// # Panics
///
/// Panics if `out` holds fewer than `vsize` values or the element indices
/// address vertices past the end of `vert`.
pub fn interpolate_vertex(
    elements: &Elements,
    eid: usize,
    euv: &Vector2,
    vsize: usize,
    vert: &[Real],
    out: &mut [Real],
) {
    assert!(out.len() >= vsize, "output shorter than one vertex value");
    out[..vsize].fill(0.0);

    match elements {
        Elements::Points(points) => {
            let v = points[eid] as usize * vsize;
            out[..vsize].copy_from_slice(&vert[v..v + vsize]);
        }
        Elements::Lines(lines) => {
            let [a, b] = lines[eid];
            let weights = [1.0 - euv.x, euv.x];
            for (&vertex, weight) in [a, b].iter().zip(weights) {
                let v = vertex as usize * vsize;
                for c in 0..vsize {
                    out[c] += weight * vert[v + c];
                }
            }
        }
        Elements::Triangles(triangles) => {
            let [a, b, c] = triangles[eid];
            let weights = [1.0 - euv.x - euv.y, euv.x, euv.y];
            for (&vertex, weight) in [a, b, c].iter().zip(weights) {
                let v = vertex as usize * vsize;
                for component in 0..vsize {
                    out[component] += weight * vert[v + component];
                }
            }
        }
    }
}
