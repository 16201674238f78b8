use serde::{Deserialize, Serialize};

pub use cad_types::{MassProps, Transform};

/// Opaque handle to a shape owned by the geometry kernel.
/// NEVER persisted. Valid only for the lifetime of the kernel instance.
///
/// Two handles compare equal only if they name the same kernel-side shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeHandle(pub(crate) u64);

impl ShapeHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("sweep failed: {reason}")]
    SweepFailed { reason: String },

    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("face construction failed: {reason}")]
    FaceFailed { reason: String },

    #[error("import failed: {reason}")]
    ImportFailed { reason: String },

    #[error("scratch file not found: {name}")]
    ScratchMissing { name: String },

    #[error("tessellation failed: {reason}")]
    TessellationFailed { reason: String },

    #[error("shape not found: {handle:?}")]
    ShapeNotFound { handle: ShapeHandle },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("kernel bootstrap failed: {reason}")]
    Bootstrap { reason: String },
}

/// Axis-aligned bounds of a shape in model space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f64; 3]>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bb = BoundingBox {
            min: first,
            max: first,
        };
        for p in iter {
            bb.include(*p);
        }
        Some(bb)
    }

    pub fn include(&mut self, p: [f64; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn diagonal(&self) -> f64 {
        let d = [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ];
        (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }
}

/// Raw per-face triangulation, in the face's own frame.
///
/// `triangles` follow the orientation of the underlying surface; when
/// `reversed` is set the face is flipped relative to that surface and
/// consumers must flip winding and normals.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceTriangulation {
    pub nodes: Vec<[f64; 3]>,
    /// Surface normals per node, when the kernel can supply them.
    pub normals: Option<Vec<[f64; 3]>>,
    pub triangles: Vec<[u32; 3]>,
    pub reversed: bool,
    /// Maps `nodes` into model space. `None` means identity.
    pub location: Option<Transform>,
}

/// An edge polyline expressed as indices into a face triangulation.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonOnTriangulation {
    /// Index into [`ShapeMesh::faces`].
    pub face: usize,
    pub nodes: Vec<u32>,
}

/// Discretization of one unique edge. A kernel fills whichever form it has.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeDiscretization {
    pub polygon: Option<Vec<[f64; 3]>>,
    /// Maps `polygon` into model space. `None` means identity.
    pub location: Option<Transform>,
    pub on_triangulation: Option<PolygonOnTriangulation>,
}

/// Everything the kernel produced when meshing a shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeMesh {
    pub faces: Vec<FaceTriangulation>,
    pub edges: Vec<EdgeDiscretization>,
}
