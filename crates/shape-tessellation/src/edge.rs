use geom_kernel::{EdgeDiscretization, FaceTriangulation};

use crate::types::EdgePolyline;

/// Model-space polyline for an edge.
///
/// Prefers the edge's own 3D polygon; otherwise walks the nodes of the
/// adjacent face's triangulation. Edges with neither are dropped.
pub fn edge_polyline(
    edge: &EdgeDiscretization,
    faces: &[FaceTriangulation],
) -> Option<EdgePolyline> {
    if let Some(points) = edge.polygon.as_ref().filter(|p| p.len() >= 2) {
        return Some(match &edge.location {
            Some(t) => EdgePolyline::from_points(points.iter().map(|p| t.apply_point(*p))),
            None => EdgePolyline::from_points(points.iter().copied()),
        });
    }
    let on_face = edge.on_triangulation.as_ref()?;
    let face = faces.get(on_face.face)?;
    let points: Vec<[f64; 3]> = on_face
        .nodes
        .iter()
        .map(|&i| face.nodes.get(i as usize).copied())
        .collect::<Option<_>>()?;
    if points.len() < 2 {
        return None;
    }
    Some(match &face.location {
        Some(t) => EdgePolyline::from_points(points.into_iter().map(|p| t.apply_point(p))),
        None => EdgePolyline::from_points(points),
    })
}
