//! Assertion helpers with diagnostic output.
//!
//! Failures name the object and report expected vs actual, plus the names
//! that were displayed and hidden.

use crate::helpers::{entry_bounding_box, HarnessError};
use crate::workflow::Evaluation;

fn summary(eval: &Evaluation) -> String {
    format!(
        "displayed={:?} hidden={:?}",
        eval.names(),
        eval.hidden.iter().collect::<Vec<_>>()
    )
}

/// Assert face and edge-polyline counts of a displayed object.
pub fn assert_counts(
    eval: &Evaluation,
    name: &str,
    expected_faces: usize,
    expected_edges: usize,
) -> Result<(), HarnessError> {
    let entry = eval.shape(name).map_err(|_| HarnessError::AssertionFailed {
        detail: format!("[{}] not displayed; {}", name, summary(eval)),
    })?;
    let (f, e) = (entry.face_list.len(), entry.edge_list.len());
    if f == expected_faces && e == expected_edges {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] expected F={} E={}, got F={} E={}",
                name, expected_faces, expected_edges, f, e,
            ),
        })
    }
}

/// Assert the object is displayed and not hidden.
pub fn assert_displayed(eval: &Evaluation, name: &str) -> Result<(), HarnessError> {
    if eval.is_displayed(name) && !eval.is_hidden(name) {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{}] expected displayed; {}", name, summary(eval)),
        })
    }
}

/// Assert the object produced no mesh at all.
pub fn assert_absent(eval: &Evaluation, name: &str) -> Result<(), HarnessError> {
    if eval.is_displayed(name) {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{}] expected absent; {}", name, summary(eval)),
        })
    } else {
        Ok(())
    }
}

/// Assert the object was consumed by a boolean.
pub fn assert_hidden(eval: &Evaluation, name: &str) -> Result<(), HarnessError> {
    if eval.is_hidden(name) && !eval.is_displayed(name) {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{}] expected hidden; {}", name, summary(eval)),
        })
    }
}

/// Assert the object's mesh bounds match within tolerance.
pub fn assert_bounding_box(
    eval: &Evaluation,
    name: &str,
    expected_min: [f32; 3],
    expected_max: [f32; 3],
    tol: f32,
) -> Result<(), HarnessError> {
    let entry = eval.shape(name)?;
    let (actual_min, actual_max) =
        entry_bounding_box(entry).ok_or_else(|| HarnessError::AssertionFailed {
            detail: format!("[{}] has no geometry", name),
        })?;

    for i in 0..3 {
        if (actual_min[i] - expected_min[i]).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] bounding box min[{}]: expected {:.3}, got {:.3} (tol={})",
                    name, i, expected_min[i], actual_min[i], tol,
                ),
            });
        }
        if (actual_max[i] - expected_max[i]).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] bounding box max[{}]: expected {:.3}, got {:.3} (tol={})",
                    name, i, expected_max[i], actual_max[i], tol,
                ),
            });
        }
    }
    Ok(())
}

/// Assert the reported mass within a relative tolerance.
pub fn assert_mass(
    eval: &Evaluation,
    name: &str,
    expected: f64,
    rel_tol: f64,
) -> Result<(), HarnessError> {
    let mass = eval.shape(name)?.meta.mass;
    let rel = (mass - expected).abs() / expected.abs().max(f64::EPSILON);
    if rel <= rel_tol {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] mass: expected {:.4}, got {:.4} (rel_tol={})",
                name, expected, mass, rel_tol,
            ),
        })
    }
}

/// Assert two evaluations display identical meshes.
pub fn assert_same_display(a: &Evaluation, b: &Evaluation) -> Result<(), HarnessError> {
    if a.names() != b.names() {
        return Err(HarnessError::AssertionFailed {
            detail: format!("displayed {:?} vs {:?}", a.names(), b.names()),
        });
    }
    for (name, entry) in &a.shapes {
        if b.shapes.get(name) != Some(entry) {
            return Err(HarnessError::AssertionFailed {
                detail: format!("[{}] meshes differ", name),
            });
        }
    }
    Ok(())
}
