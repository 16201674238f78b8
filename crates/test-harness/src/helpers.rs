//! Helper functions: error type, object constructors, mesh math.

use cad_types::*;
use shape_tessellation::{EdgePolyline, FaceMesh};
use worker_bridge::DisplayEntry;

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("object not found: {name}")]
    ObjectNotFound { name: String },

    #[error("object not displayed: {name}")]
    NotDisplayed { name: String },

    #[error("worker error: {message}")]
    Worker { message: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("oracle failure ({oracle}): {detail}")]
    OracleFailure { oracle: String, detail: String },

    #[error("evaluation error: {0}")]
    Eval(#[from] eval_engine::EvalError),

    #[error("duplicate name: {name}")]
    DuplicateName { name: String },

    #[error("nothing evaluated yet")]
    NotEvaluated,
}

// ── Object Constructors ─────────────────────────────────────────────────────

pub fn box_spec(name: &str, length: f64, width: f64, height: f64) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::Box(BoxParams {
            length,
            width,
            height,
        }),
    )
}

/// Full cylinder.
pub fn cylinder_spec(name: &str, radius: f64, height: f64) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::Cylinder(CylinderParams {
            radius,
            height,
            angle: 360.0,
        }),
    )
}

/// Full sphere.
pub fn sphere_spec(name: &str, radius: f64) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::Sphere(SphereParams {
            radius,
            ..SphereParams::default()
        }),
    )
}

pub fn cone_spec(name: &str, radius1: f64, radius2: f64, height: f64) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::Cone(ConeParams {
            radius1,
            radius2,
            height,
            angle: 360.0,
        }),
    )
}

pub fn torus_spec(name: &str, radius1: f64, radius2: f64) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::Torus(TorusParams {
            radius1,
            radius2,
            ..TorusParams::default()
        }),
    )
}

pub fn cut_spec(name: &str, base: &str, tool: &str) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::Cut(CutParams {
            base: Some(base.to_string()),
            tool: Some(tool.to_string()),
        }),
    )
}

pub fn fuse_spec(name: &str, shapes: &[&str]) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::MultiFuse(MultiShapeParams {
            shapes: shapes.iter().map(|s| s.to_string()).collect(),
        }),
    )
}

pub fn common_spec(name: &str, shapes: &[&str]) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::MultiCommon(MultiShapeParams {
            shapes: shapes.iter().map(|s| s.to_string()).collect(),
        }),
    )
}

/// Solid extrusion of `base` along `dir` by `length`.
pub fn extrusion_spec(name: &str, base: &str, dir: [f64; 3], length: f64) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::Extrusion(ExtrusionParams {
            base: Some(base.to_string()),
            dir,
            length_fwd: length,
            length_rev: 0.0,
            solid: true,
        }),
    )
}

pub fn sketch_spec(name: &str, geometry: Vec<SketchGeometry>) -> ObjectSpec {
    ObjectSpec::new(name, ObjectKind::SketchObject(SketchParams { geometry }))
}

pub fn raw_brep_spec(name: &str, bytes: Vec<u8>) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::RawBrep(RawBrepParams {
            shape: RawBrepData(bytes),
        }),
    )
}

// ── Sketch Profiles ─────────────────────────────────────────────────────────

/// Four line segments around an axis-aligned rectangle, counter-clockwise.
pub fn rect_profile(x: f64, y: f64, w: f64, h: f64) -> Vec<SketchGeometry> {
    let corners = [[x, y], [x + w, y], [x + w, y + h], [x, y + h]];
    (0..4)
        .map(|i| SketchGeometry::LineSegment {
            start: corners[i],
            end: corners[(i + 1) % 4],
        })
        .collect()
}

/// Rectangle whose right side is replaced by a half-circle bulging outward.
pub fn slot_profile(w: f64, h: f64) -> Vec<SketchGeometry> {
    vec![
        SketchGeometry::LineSegment {
            start: [0.0, 0.0],
            end: [w, 0.0],
        },
        SketchGeometry::ArcOfCircle {
            center: [w, h / 2.0],
            radius: h / 2.0,
            start_angle: -90.0,
            end_angle: 90.0,
        },
        SketchGeometry::LineSegment {
            start: [w, h],
            end: [0.0, h],
        },
        SketchGeometry::LineSegment {
            start: [0.0, h],
            end: [0.0, 0.0],
        },
    ]
}

// ── Mesh Math ───────────────────────────────────────────────────────────────

/// Vertex positions of a face mesh as points.
pub fn face_points(face: &FaceMesh) -> Vec<[f32; 3]> {
    face.vertices
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect()
}

pub fn polyline_points(edge: &EdgePolyline) -> Vec<[f32; 3]> {
    edge.vertices
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect()
}

/// Axis-aligned bounds over every face vertex and edge point of an entry.
pub fn entry_bounding_box(entry: &DisplayEntry) -> Option<([f32; 3], [f32; 3])> {
    let points = entry
        .face_list
        .iter()
        .flat_map(face_points)
        .chain(entry.edge_list.iter().flat_map(polyline_points));
    let mut bounds: Option<([f32; 3], [f32; 3])> = None;
    for p in points {
        let (min, max) = bounds.get_or_insert((p, p));
        for i in 0..3 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
        }
    }
    bounds
}

fn triangles(face: &FaceMesh) -> impl Iterator<Item = [[f64; 3]; 3]> + '_ {
    let v = &face.vertices;
    face.triangle_indices.chunks_exact(3).filter_map(move |tri| {
        let corner = |i: u32| {
            let i = i as usize * 3;
            (i + 2 < v.len()).then(|| [v[i] as f64, v[i + 1] as f64, v[i + 2] as f64])
        };
        Some([corner(tri[0])?, corner(tri[1])?, corner(tri[2])?])
    })
}

/// Signed volume enclosed by every face of an entry.
///
/// Positive when triangles wind counter-clockwise seen from outside.
/// Meaningless for open shells.
pub fn entry_volume(entry: &DisplayEntry) -> f64 {
    let mut volume = 0.0f64;
    for face in &entry.face_list {
        for [a, b, c] in triangles(face) {
            // Signed volume of tetrahedron formed by triangle and origin
            volume += a[0] * (b[1] * c[2] - c[1] * b[2]) + b[0] * (c[1] * a[2] - a[1] * c[2])
                + c[0] * (a[1] * b[2] - b[1] * a[2]);
        }
    }
    volume / 6.0
}

/// Total surface area of one face mesh.
pub fn face_area(face: &FaceMesh) -> f64 {
    triangles(face)
        .map(|[a, b, c]| {
            let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let w = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let cx = u[1] * w[2] - u[2] * w[1];
            let cy = u[2] * w[0] - u[0] * w[2];
            let cz = u[0] * w[1] - u[1] * w[0];
            (cx * cx + cy * cy + cz * cz).sqrt() / 2.0
        })
        .sum()
}

pub fn entry_area(entry: &DisplayEntry) -> f64 {
    entry.face_list.iter().map(face_area).sum()
}
