//! Raw triangulation extraction from truck shells.
//!
//! Wraps truck-meshalgo and flattens each meshed face into a
//! [`FaceTriangulation`] in surface orientation, plus one
//! [`EdgeDiscretization`] per unique edge.

use std::collections::{HashMap, HashSet};

use truck_meshalgo::prelude::*;
use truck_meshalgo::tessellation::MeshableShape;
use truck_modeling::topology::Shell;

use crate::types::*;

fn to_array(p: impl AsRef<[f64; 3]>) -> [f64; 3] {
    *p.as_ref()
}

/// Tessellates shells at `tolerance` and extracts per-face buffers.
pub fn triangulate_shells<'a>(
    shells: impl IntoIterator<Item = &'a Shell>,
    tolerance: f64,
) -> Result<ShapeMesh, KernelError> {
    if !(tolerance.is_finite() && tolerance > 0.0) {
        return Err(KernelError::TessellationFailed {
            reason: format!("tolerance must be positive, got {tolerance}"),
        });
    }

    let mut mesh = ShapeMesh::default();
    let mut seen_edges = HashSet::new();

    for shell in shells {
        let meshed = shell.triangulation(tolerance);
        // edge id -> first face (index into mesh.faces) it bounds
        let mut edge_face = HashMap::new();

        for face in meshed.face_iter() {
            let maybe_mesh: Option<PolygonMesh> = face.surface();
            let Some(polygon) = maybe_mesh else {
                continue;
            };
            let face_index = mesh.faces.len();
            for wire in face.boundaries() {
                for edge in wire.edge_iter() {
                    edge_face.entry(edge.id()).or_insert(face_index);
                }
            }

            let nodes: Vec<[f64; 3]> = polygon.positions().iter().map(to_array).collect();
            let surface_normals = polygon.normals();
            let mut node_normals: Vec<Option<[f64; 3]>> = vec![None; nodes.len()];
            let mut triangles: Vec<[u32; 3]> = Vec::new();

            for tri in polygon.tri_faces() {
                for v in tri.iter() {
                    if let Some(n) = v.nor.and_then(|i| surface_normals.get(i)) {
                        node_normals[v.pos] = Some(to_array(n));
                    }
                }
                triangles.push([tri[0].pos as u32, tri[1].pos as u32, tri[2].pos as u32]);
            }
            for quad in polygon.quad_faces() {
                for v in quad.iter() {
                    if let Some(n) = v.nor.and_then(|i| surface_normals.get(i)) {
                        node_normals[v.pos] = Some(to_array(n));
                    }
                }
                let q = [
                    quad[0].pos as u32,
                    quad[1].pos as u32,
                    quad[2].pos as u32,
                    quad[3].pos as u32,
                ];
                triangles.push([q[0], q[1], q[2]]);
                triangles.push([q[0], q[2], q[3]]);
            }

            mesh.faces.push(FaceTriangulation {
                nodes,
                // Only usable when every node received a normal.
                normals: node_normals.into_iter().collect(),
                triangles,
                reversed: !face.orientation(),
                location: None,
            });
        }

        for edge in meshed.edge_iter() {
            if !seen_edges.insert(edge.id()) {
                continue;
            }
            let polyline = edge.curve();
            let points: Vec<[f64; 3]> = polyline.0.iter().map(to_array).collect();
            if points.len() >= 2 {
                mesh.edges.push(EdgeDiscretization {
                    polygon: Some(points),
                    location: None,
                    on_triangulation: None,
                });
                continue;
            }
            // Degenerate polyline: fall back to the adjacent face's nodes.
            let on_triangulation = edge_face.get(&edge.id()).and_then(|&face| {
                let nodes = &mesh.faces[face].nodes;
                let ends = [edge.front().point(), edge.back().point()];
                let indices: Option<Vec<u32>> = ends
                    .iter()
                    .map(|p| nearest_node(nodes, to_array(p)))
                    .collect();
                indices.map(|nodes| PolygonOnTriangulation { face, nodes })
            });
            mesh.edges.push(EdgeDiscretization {
                polygon: None,
                location: None,
                on_triangulation,
            });
        }
    }
    Ok(mesh)
}

fn nearest_node(nodes: &[[f64; 3]], p: [f64; 3]) -> Option<u32> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let d = (n[0] - p[0]).powi(2) + (n[1] - p[1]).powi(2) + (n[2] - p[2]).powi(2);
            (i, d)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mass;
    use crate::primitives;
    use approx::assert_relative_eq;

    #[test]
    fn box_mesh_has_six_faces_and_twelve_edges() {
        let solid = primitives::make_box(1.0, 1.0, 1.0).unwrap();
        let mesh = triangulate_shells(solid.boundaries(), 0.1).unwrap();
        assert_eq!(mesh.faces.len(), 6);
        assert_eq!(mesh.edges.len(), 12);
        for face in &mesh.faces {
            assert!(!face.triangles.is_empty());
            for t in &face.triangles {
                for &i in t {
                    assert!((i as usize) < face.nodes.len());
                }
            }
        }
        assert!(mesh.edges.iter().all(|e| e.polygon.is_some()));
    }

    #[test]
    fn box_mesh_encloses_its_volume() {
        let solid = primitives::make_box(2.0, 3.0, 4.0).unwrap();
        let mesh = triangulate_shells(solid.boundaries(), 0.1).unwrap();
        let props = mass::from_mesh(&mesh);
        assert_relative_eq!(props.mass, 24.0, epsilon = 1e-6);
        assert_relative_eq!(props.center_of_mass[2], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn rejects_non_positive_tolerance() {
        let solid = primitives::make_box(1.0, 1.0, 1.0).unwrap();
        assert!(triangulate_shells(solid.boundaries(), 0.0).is_err());
    }
}
