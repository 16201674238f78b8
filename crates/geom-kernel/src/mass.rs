//! Mass properties of closed triangle meshes (unit density).
//!
//! Each triangle forms a tetrahedron with the origin; signed volumes and
//! second moments are accumulated and then shifted to the center of mass.

use cad_types::MassProps;

use crate::types::ShapeMesh;

/// Second moment of the canonical tetrahedron (0, e1, e2, e3).
const CANONICAL: [[f64; 3]; 3] = [
    [1.0 / 60.0, 1.0 / 120.0, 1.0 / 120.0],
    [1.0 / 120.0, 1.0 / 60.0, 1.0 / 120.0],
    [1.0 / 120.0, 1.0 / 120.0, 1.0 / 60.0],
];

/// Computes mass properties from outward-wound triangles.
///
/// An inside-out mesh yields the same result as its flipped counterpart.
/// Open or empty meshes with no enclosed volume yield zero mass.
pub fn from_triangles<I>(triangles: I) -> MassProps
where
    I: IntoIterator<Item = [[f64; 3]; 3]>,
{
    let mut volume = 0.0;
    let mut first_moment = [0.0; 3];
    let mut covariance = [[0.0; 3]; 3];

    for [a, b, c] in triangles {
        let det = a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
            + a[2] * (b[0] * c[1] - b[1] * c[0]);
        let tet_volume = det / 6.0;
        volume += tet_volume;
        for i in 0..3 {
            first_moment[i] += tet_volume * (a[i] + b[i] + c[i]) / 4.0;
        }
        // A has columns a, b, c; covariance += det * A * CANONICAL * A^T.
        let cols = [a, b, c];
        for i in 0..3 {
            for j in 0..3 {
                let mut acc = 0.0;
                for (k, col_k) in cols.iter().enumerate() {
                    for (l, col_l) in cols.iter().enumerate() {
                        acc += col_k[i] * CANONICAL[k][l] * col_l[j];
                    }
                }
                covariance[i][j] += det * acc;
            }
        }
    }

    if volume.abs() < 1e-12 {
        return MassProps::default();
    }
    if volume < 0.0 {
        volume = -volume;
        for m in first_moment.iter_mut() {
            *m = -*m;
        }
        for row in covariance.iter_mut() {
            for v in row.iter_mut() {
                *v = -*v;
            }
        }
    }

    let com = [
        first_moment[0] / volume,
        first_moment[1] / volume,
        first_moment[2] / volume,
    ];
    for i in 0..3 {
        for j in 0..3 {
            covariance[i][j] -= volume * com[i] * com[j];
        }
    }
    let trace = covariance[0][0] + covariance[1][1] + covariance[2][2];
    let mut inertia = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            let diag = if i == j { trace } else { 0.0 };
            inertia[i][j] = diag - covariance[i][j];
        }
    }

    MassProps {
        mass: volume,
        center_of_mass: com,
        inertia_matrix: inertia,
    }
}

/// Expands indexed triangles into coordinate triples.
pub fn indexed<'a>(
    nodes: &'a [[f64; 3]],
    triangles: &'a [[u32; 3]],
) -> impl Iterator<Item = [[f64; 3]; 3]> + 'a {
    triangles.iter().filter_map(move |t| {
        Some([
            *nodes.get(t[0] as usize)?,
            *nodes.get(t[1] as usize)?,
            *nodes.get(t[2] as usize)?,
        ])
    })
}

/// Mass properties of a kernel triangulation, honoring face reversal and
/// per-face locations.
pub fn from_mesh(mesh: &ShapeMesh) -> MassProps {
    from_triangles(mesh.faces.iter().flat_map(|face| {
        let nodes: Vec<[f64; 3]> = match &face.location {
            Some(t) => face.nodes.iter().map(|p| t.apply_point(*p)).collect(),
            None => face.nodes.clone(),
        };
        let reversed = face.reversed;
        face.triangles
            .iter()
            .filter_map(move |t| {
                let a = *nodes.get(t[0] as usize)?;
                let b = *nodes.get(t[1] as usize)?;
                let c = *nodes.get(t[2] as usize)?;
                Some(if reversed { [a, c, b] } else { [a, b, c] })
            })
            .collect::<Vec<_>>()
    }))
}
