//! Face triangulation to flat buffers.

use geom_kernel::FaceTriangulation;

use crate::types::FaceMesh;

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Twice the area below which a triangle counts as degenerate.
const DEGENERATE_AREA: f64 = 1e-12;

fn unit(v: [f64; 3]) -> Option<[f64; 3]> {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    (len.is_finite() && len > 1e-15).then(|| v.map(|c| c / len))
}

fn doubled_area_normal(nodes: &[[f64; 3]], t: &[u32; 3]) -> [f64; 3] {
    let [a, b, c] = t.map(|i| nodes[i as usize]);
    cross(sub(b, a), sub(c, a))
}

/// Area-weighted sum of adjacent triangle normals, per node.
fn computed_normals(nodes: &[[f64; 3]], triangles: &[[u32; 3]]) -> Vec<[f64; 3]> {
    let mut acc = vec![[0.0; 3]; nodes.len()];
    for t in triangles {
        let n = doubled_area_normal(nodes, t);
        for &i in t {
            for k in 0..3 {
                acc[i as usize][k] += n[k];
            }
        }
    }
    acc.into_iter().map(|n| unit(n).unwrap_or([0.0; 3])).collect()
}

/// Converts one kernel face into model-space buffers.
///
/// Nodes go through the face location. A reversed face has its winding
/// flipped and its surface normals negated. Zero-area triangles are
/// dropped, so a face swept from a degenerate edge comes out empty. Nodes
/// without a usable surface normal get the area-weighted sum of adjacent
/// triangle normals instead.
pub fn face_mesh(face: &FaceTriangulation) -> FaceMesh {
    let nodes: Vec<[f64; 3]> = match &face.location {
        Some(t) => face.nodes.iter().map(|p| t.apply_point(*p)).collect(),
        None => face.nodes.clone(),
    };
    let count = nodes.len() as u32;
    let triangles: Vec<[u32; 3]> = face
        .triangles
        .iter()
        .filter(|t| t.iter().all(|&i| i < count))
        .map(|&[a, b, c]| if face.reversed { [a, c, b] } else { [a, b, c] })
        .filter(|t| {
            let n = doubled_area_normal(&nodes, t);
            (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt() > DEGENERATE_AREA
        })
        .collect();

    let computed = computed_normals(&nodes, &triangles);
    let normals: Vec<[f64; 3]> = match &face.normals {
        Some(surface) if surface.len() == nodes.len() => surface
            .iter()
            .zip(&computed)
            .map(|(n, fallback)| {
                let n = match &face.location {
                    Some(t) => t.apply_vector(*n),
                    None => *n,
                };
                match unit(n) {
                    Some(n) if face.reversed => n.map(|c| -c),
                    Some(n) => n,
                    None => *fallback,
                }
            })
            .collect(),
        _ => computed,
    };

    let mut mesh = FaceMesh::new();
    for (p, n) in nodes.iter().zip(&normals) {
        mesh.add_vertex(*p, *n);
    }
    for [a, b, c] in triangles {
        mesh.add_triangle(a, b, c);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cad_types::Transform;

    fn unit_square() -> FaceTriangulation {
        FaceTriangulation {
            nodes: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            normals: None,
            triangles: vec![[0, 1, 2], [0, 2, 3]],
            reversed: false,
            location: None,
        }
    }

    #[test]
    fn computed_normals_follow_winding() {
        let mesh = face_mesh(&unit_square());
        assert_eq!(mesh.triangle_count, 2);
        assert_eq!(mesh.vertex_count(), 4);
        for n in mesh.normals.chunks(3) {
            assert_relative_eq!(n[2], 1.0);
        }
    }

    #[test]
    fn reversed_face_flips_winding_and_normals() {
        let mut face = unit_square();
        face.reversed = true;
        let mesh = face_mesh(&face);
        assert_eq!(&mesh.triangle_indices[..3], &[0, 2, 1]);
        for n in mesh.normals.chunks(3) {
            assert_relative_eq!(n[2], -1.0);
        }

        face.normals = Some(vec![[0.0, 0.0, 1.0]; 4]);
        let mesh = face_mesh(&face);
        for n in mesh.normals.chunks(3) {
            assert_relative_eq!(n[2], -1.0);
        }
    }

    #[test]
    fn location_moves_nodes_and_turns_normals() {
        let mut face = unit_square();
        face.normals = Some(vec![[0.0, 0.0, 1.0]; 4]);
        face.location = Some(
            Transform::rotation([1.0, 0.0, 0.0], std::f64::consts::FRAC_PI_2)
                .then(&Transform::translation([0.0, 0.0, 5.0])),
        );
        let mesh = face_mesh(&face);
        // (0, 1, 0) -> (0, 0, 1) -> (0, 0, 6)
        assert_relative_eq!(mesh.vertices[11], 6.0, epsilon = 1e-6);
        assert_relative_eq!(mesh.normals[1], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn out_of_range_triangles_are_dropped() {
        let mut face = unit_square();
        face.triangles.push([0, 1, 9]);
        assert_eq!(face_mesh(&face).triangle_count, 2);
    }

    #[test]
    fn zero_area_face_comes_out_empty() {
        let face = FaceTriangulation {
            nodes: vec![[0.0, 0.0, 0.0], [0.0, 0.0, 5.0], [0.0, 0.0, 10.0]],
            normals: Some(vec![[f64::NAN; 3]; 3]),
            triangles: vec![[0, 1, 2]],
            reversed: false,
            location: None,
        };
        let mesh = face_mesh(&face);
        assert_eq!(mesh.triangle_count, 0);
        assert!(mesh.normals.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn non_finite_surface_normal_falls_back_to_triangles() {
        let mut face = unit_square();
        face.normals = Some(vec![
            [f64::NAN, f64::NAN, f64::NAN],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0],
        ]);
        let mesh = face_mesh(&face);
        for n in mesh.normals.chunks(3) {
            assert_relative_eq!(n[2], 1.0, epsilon = 1e-6);
        }
    }
}
