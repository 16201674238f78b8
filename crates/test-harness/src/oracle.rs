//! Verification oracles: pure functions returning pass/fail verdicts.
//!
//! Each oracle returns an `OracleVerdict` with diagnostic detail, not panics.
//! This lets a test collect all failures in one pass.

use shape_tessellation::{EdgePolyline, FaceMesh};
use worker_bridge::DisplayEntry;

use crate::helpers::{entry_volume, face_area};

/// The result of a single oracle check.
#[derive(Debug, Clone)]
pub struct OracleVerdict {
    pub oracle_name: String,
    pub passed: bool,
    pub detail: String,
    pub value: Option<f64>,
}

impl OracleVerdict {
    fn pass(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: None,
        }
    }

    fn pass_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: Some(value),
        }
    }

    fn fail(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: None,
        }
    }

    fn fail_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: Some(value),
        }
    }
}

// ── Face Mesh Oracles ───────────────────────────────────────────────────────

/// Buffer lengths agree with the recorded counts.
pub fn check_buffer_lengths(faces: &[FaceMesh]) -> OracleVerdict {
    let name = "buffer_lengths";
    for (i, face) in faces.iter().enumerate() {
        if face.vertices.len() % 3 != 0 || face.normals.len() != face.vertices.len() {
            return OracleVerdict::fail(
                name,
                format!(
                    "face {}: {} position floats, {} normal floats",
                    i,
                    face.vertices.len(),
                    face.normals.len()
                ),
            );
        }
        if face.triangle_indices.len() != face.triangle_count * 3 {
            return OracleVerdict::fail(
                name,
                format!(
                    "face {}: {} indices for {} triangles",
                    i,
                    face.triangle_indices.len(),
                    face.triangle_count
                ),
            );
        }
    }
    OracleVerdict::pass(name, format!("{} faces consistent", faces.len()))
}

/// Every triangle index addresses an existing vertex.
pub fn check_indices_in_range(faces: &[FaceMesh]) -> OracleVerdict {
    let name = "indices_in_range";
    for (i, face) in faces.iter().enumerate() {
        let count = face.vertex_count();
        if let Some(&bad) = face.triangle_indices.iter().find(|&&idx| idx as usize >= count) {
            return OracleVerdict::fail(
                name,
                format!("face {}: index {} but only {} vertices", i, bad, count),
            );
        }
    }
    OracleVerdict::pass(name, "all indices valid".to_string())
}

/// Normals of vertices used by a triangle are unit length.
pub fn check_unit_normals(faces: &[FaceMesh], tol: f32) -> OracleVerdict {
    let name = "unit_normals";
    let mut worst = 0.0f32;
    for face in faces {
        for &idx in &face.triangle_indices {
            let i = idx as usize * 3;
            let Some(n) = face.normals.get(i..i + 3) else {
                continue;
            };
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            worst = worst.max((len - 1.0).abs());
        }
    }
    if worst <= tol {
        OracleVerdict::pass_val(name, format!("max deviation {:.2e}", worst), worst as f64)
    } else {
        OracleVerdict::fail_val(
            name,
            format!("normal length off by {:.2e} (tol={})", worst, tol),
            worst as f64,
        )
    }
}

/// No face has zero area.
pub fn check_no_empty_faces(faces: &[FaceMesh]) -> OracleVerdict {
    let name = "no_empty_faces";
    for (i, face) in faces.iter().enumerate() {
        let area = face_area(face);
        if face.triangle_count == 0 || area <= 1e-12 {
            return OracleVerdict::fail_val(
                name,
                format!("face {}: {} triangles, area {:.3e}", i, face.triangle_count, area),
                area,
            );
        }
    }
    OracleVerdict::pass(name, format!("{} faces with area", faces.len()))
}

// ── Edge Oracles ────────────────────────────────────────────────────────────

/// Every polyline has at least two points and a matching point count.
pub fn check_polylines(edges: &[EdgePolyline]) -> OracleVerdict {
    let name = "polylines";
    for (i, edge) in edges.iter().enumerate() {
        if edge.vertices.len() != edge.point_count * 3 {
            return OracleVerdict::fail(
                name,
                format!(
                    "edge {}: {} floats for {} points",
                    i,
                    edge.vertices.len(),
                    edge.point_count
                ),
            );
        }
        if edge.point_count < 2 {
            return OracleVerdict::fail(name, format!("edge {}: {} points", i, edge.point_count));
        }
    }
    OracleVerdict::pass(name, format!("{} edges", edges.len()))
}

// ── Mass Oracles ────────────────────────────────────────────────────────────

/// The displayed mesh encloses roughly the reported mass.
///
/// Passes trivially for massless shapes.
pub fn check_volume_matches_mass(entry: &DisplayEntry, rel_tol: f64) -> OracleVerdict {
    let name = "volume_matches_mass";
    if entry.meta.is_massless() {
        return OracleVerdict::pass(name, "massless".to_string());
    }
    let volume = entry_volume(entry).abs();
    let mass = entry.meta.mass.abs();
    let rel = (volume - mass).abs() / mass;
    if rel <= rel_tol {
        OracleVerdict::pass_val(
            name,
            format!("mesh volume {:.4} vs mass {:.4}", volume, mass),
            rel,
        )
    } else {
        OracleVerdict::fail_val(
            name,
            format!(
                "mesh volume {:.4} vs mass {:.4}, off by {:.1}% (tol={:.1}%)",
                volume,
                mass,
                rel * 100.0,
                rel_tol * 100.0
            ),
            rel,
        )
    }
}

/// Runs every oracle on one displayed object.
pub fn check_entry(entry: &DisplayEntry) -> Vec<OracleVerdict> {
    vec![
        check_buffer_lengths(&entry.face_list),
        check_indices_in_range(&entry.face_list),
        check_unit_normals(&entry.face_list, 1e-3),
        check_no_empty_faces(&entry.face_list),
        check_polylines(&entry.edge_list),
        check_volume_matches_mass(entry, 0.1),
    ]
}
