use cad_types::MassProps;
use serde::{Deserialize, Serialize};

/// Flat triangle buffers for one face, in model space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceMesh {
    /// Vertex positions [x, y, z, x, y, z, ...]
    pub vertices: Vec<f32>,
    /// Vertex normals [nx, ny, nz, ...]
    pub normals: Vec<f32>,
    /// Triangle indices [i0, i1, i2, ...]
    pub triangle_indices: Vec<u32>,
    pub triangle_count: usize,
}

impl FaceMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn add_vertex(&mut self, pos: [f64; 3], normal: [f64; 3]) -> u32 {
        let idx = self.vertex_count() as u32;
        self.vertices.extend(pos.map(|c| c as f32));
        self.normals.extend(normal.map(|c| c as f32));
        idx
    }

    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.triangle_indices.extend([i0, i1, i2]);
        self.triangle_count += 1;
    }
}

/// Polyline for one edge, in model space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgePolyline {
    /// Point positions [x, y, z, x, y, z, ...]
    pub vertices: Vec<f32>,
    pub point_count: usize,
}

impl EdgePolyline {
    pub fn from_points(points: impl IntoIterator<Item = [f64; 3]>) -> Self {
        let mut line = Self::default();
        for p in points {
            line.vertices.extend(p.map(|c| c as f32));
            line.point_count += 1;
        }
        line
    }
}

/// Renderable output for one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TessellatedShape {
    pub faces: Vec<FaceMesh>,
    pub edges: Vec<EdgePolyline>,
    pub source_name: String,
    pub metadata: MassProps,
}

impl TessellatedShape {
    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|f| f.triangle_count).sum()
    }
}
