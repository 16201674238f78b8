//! Converts kernel shapes into renderable triangle and line buffers.

pub mod config;
pub mod edge;
pub mod face;
pub mod types;

use std::collections::BTreeMap;

use cad_types::MassProps;
use geom_kernel::{KernelBundle, ShapeHandle};
use tracing::{debug, instrument, warn};

pub use config::TessellationConfig;
pub use edge::edge_polyline;
pub use face::face_mesh;
pub use types::{EdgePolyline, FaceMesh, TessellatedShape};

/// One shape to tessellate, with the name it is displayed under.
#[derive(Debug, Clone, PartialEq)]
pub struct TessellationJob {
    pub handle: ShapeHandle,
    pub source_name: String,
    pub metadata: MassProps,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tessellator {
    pub config: TessellationConfig,
}

impl Tessellator {
    pub fn new(config: TessellationConfig) -> Self {
        Self { config }
    }

    /// Tessellates every job. A shape the kernel cannot mesh is left out of
    /// the map.
    #[instrument(skip_all, fields(jobs = jobs.len()))]
    pub fn execute(
        &self,
        kernel: &mut dyn KernelBundle,
        jobs: &[TessellationJob],
    ) -> BTreeMap<String, TessellatedShape> {
        let mut out = BTreeMap::new();
        for job in jobs {
            match self.tessellate(kernel, job) {
                Some(shape) => {
                    out.insert(job.source_name.clone(), shape);
                }
                None => warn!(name = %job.source_name, "shape left out of display"),
            }
        }
        out
    }

    fn tessellate(
        &self,
        kernel: &mut dyn KernelBundle,
        job: &TessellationJob,
    ) -> Option<TessellatedShape> {
        let bounds = kernel.as_introspect().bounding_box(&job.handle);
        let tolerance = self.config.chordal_tolerance(bounds.as_ref());
        let mesh = match kernel.triangulate(&job.handle, tolerance) {
            Ok(m) => m,
            Err(e) => {
                warn!(name = %job.source_name, error = %e, "triangulation failed");
                return None;
            }
        };

        let mut shape = TessellatedShape {
            faces: mesh
                .faces
                .iter()
                .map(face_mesh)
                .filter(|f| f.triangle_count > 0)
                .collect(),
            edges: mesh
                .edges
                .iter()
                .filter_map(|e| edge_polyline(e, &mesh.faces))
                .collect(),
            source_name: job.source_name.clone(),
            metadata: job.metadata,
        };

        match kernel.sample_free_edges(&job.handle, self.config.tangential_deflection) {
            Ok(lines) => shape.edges.extend(
                lines
                    .into_iter()
                    .filter(|l| l.len() >= 2)
                    .map(EdgePolyline::from_points),
            ),
            Err(e) => warn!(name = %job.source_name, error = %e, "free edges unavailable"),
        }

        debug!(
            name = %job.source_name,
            tolerance,
            faces = shape.faces.len(),
            edges = shape.edges.len(),
            "tessellated"
        );
        Some(shape)
    }
}
