//! End-to-end document scenarios against MockKernel.
//!
//! Each scenario goes through the LOAD_FILE dispatch path and checks the
//! DISPLAY_SHAPE output, the hidden set and the cache.

use cad_types::{ObjectKind, Placement};
use geom_kernel::MockKernel;
use test_harness::assertions::*;
use test_harness::helpers::*;
use test_harness::{DocumentBuilder, HarnessError};
use worker_bridge::{EvictionConfig, WorkerConfig};

// ── Scenario 1: Single box ──────────────────────────────────────────────

#[test]
fn test_box_displays_six_faces_twelve_edges() {
    let mut m = DocumentBuilder::mock();
    m.box_("Box", 10.0, 10.0, 10.0).unwrap();
    let eval = m.evaluate().unwrap();

    assert_counts(eval, "Box", 6, 12).unwrap();
    assert_displayed(eval, "Box").unwrap();
    assert!(eval.hidden.is_empty());
    assert_bounding_box(eval, "Box", [0.0; 3], [10.0; 3], 1e-5).unwrap();
    assert_mass(eval, "Box", 1000.0, 1e-6).unwrap();
    m.assert_sound("Box").unwrap();
}

// ── Scenario 2: Fused boxes ─────────────────────────────────────────────

#[test]
fn test_fused_boxes_hide_both_sources() {
    let mut m = DocumentBuilder::mock();
    m.box_("A", 10.0, 10.0, 10.0)
        .unwrap()
        .box_("B", 10.0, 10.0, 10.0)
        .unwrap()
        .place("B", Placement::translation([5.0, 5.0, 5.0]))
        .unwrap()
        .fuse("Fusion", &["A", "B"])
        .unwrap();
    let eval = m.evaluate().unwrap();

    assert_displayed(eval, "Fusion").unwrap();
    assert_hidden(eval, "A").unwrap();
    assert_hidden(eval, "B").unwrap();
    assert_eq!(eval.names(), ["Fusion"]);
    m.assert_sound("Fusion").unwrap();
}

#[test]
fn test_fuse_hides_sources_again_on_cache_hit() {
    let mut m = DocumentBuilder::mock();
    m.box_("A", 1.0, 1.0, 1.0)
        .unwrap()
        .box_("B", 2.0, 2.0, 2.0)
        .unwrap()
        .fuse("Fusion", &["A", "B"])
        .unwrap();
    m.evaluate().unwrap();
    let inserts = m.cache_stats().inserts;

    let eval = m.evaluate().unwrap().clone();
    assert_hidden(&eval, "A").unwrap();
    assert_hidden(&eval, "B").unwrap();
    assert_eq!(m.cache_stats().inserts, inserts);
}

#[test]
fn test_failed_fuse_leaves_sources_visible() {
    let mut m = DocumentBuilder::with_kernel(
        Box::new(MockKernel::with_failing_booleans()),
        WorkerConfig::default(),
    );
    m.box_("A", 1.0, 1.0, 1.0)
        .unwrap()
        .box_("B", 2.0, 2.0, 2.0)
        .unwrap()
        .fuse("Fusion", &["A", "B"])
        .unwrap();
    let eval = m.evaluate().unwrap();

    assert_absent(eval, "Fusion").unwrap();
    assert_displayed(eval, "A").unwrap();
    assert_displayed(eval, "B").unwrap();
}

// ── Scenario 3: Cut with a missing tool ─────────────────────────────────

#[test]
fn test_cut_with_missing_tool_is_absent() {
    let mut m = DocumentBuilder::mock();
    m.box_("Base", 10.0, 10.0, 10.0)
        .unwrap()
        .cut("Cut", "Base", "Missing")
        .unwrap();
    let eval = m.evaluate().unwrap();

    assert_absent(eval, "Cut").unwrap();
    assert_displayed(eval, "Base").unwrap();
    assert!(eval.hidden.is_empty());
}

#[test]
fn test_missing_reference_is_never_cached() {
    let mut m = DocumentBuilder::mock();
    m.box_("Base", 10.0, 10.0, 10.0)
        .unwrap()
        .cut("Cut", "Base", "Tool")
        .unwrap();
    m.evaluate().unwrap();
    assert_eq!(m.cache().len(), 1);

    m.box_("Tool", 2.0, 2.0, 20.0).unwrap();
    let eval = m.evaluate().unwrap();
    assert_displayed(eval, "Cut").unwrap();
    assert_hidden(eval, "Base").unwrap();
    assert_hidden(eval, "Tool").unwrap();
}

#[test]
fn test_multifuse_with_a_missing_member_is_absent() {
    let mut m = DocumentBuilder::mock();
    m.box_("A", 1.0, 1.0, 1.0)
        .unwrap()
        .fuse("Partial", &["A", "Ghost"])
        .unwrap()
        .fuse("Single", &["A"])
        .unwrap();
    let eval = m.evaluate().unwrap();

    assert_absent(eval, "Partial").unwrap();
    assert_displayed(eval, "Single").unwrap();
}

// ── Cache properties ────────────────────────────────────────────────────

#[test]
fn test_reevaluation_returns_identical_handles() {
    let mut m = DocumentBuilder::mock();
    m.box_("A", 1.0, 2.0, 3.0)
        .unwrap()
        .sphere("S", 2.0)
        .unwrap()
        .cut("C", "A", "S")
        .unwrap();
    let first = m.evaluate_handles().unwrap();
    let live = m.live_shapes();
    let second = m.evaluate_handles().unwrap();

    assert_eq!(first, second);
    assert_eq!(m.live_shapes(), live);
    assert!(m.cache_stats().hits >= 1);
}

#[test]
fn test_renamed_object_hits_the_cache() {
    let mut m = DocumentBuilder::mock();
    m.box_("A", 3.0, 3.0, 3.0).unwrap();
    let before = m.evaluate_handles().unwrap();

    m.rename("A", "Renamed").unwrap();
    let after = m.evaluate_handles().unwrap();
    assert_eq!(before["A"], after["Renamed"]);
    assert_eq!(m.cache_stats().inserts, 1);
}

#[test]
fn test_multifuse_order_changes_the_key() {
    let mut m = DocumentBuilder::mock();
    m.box_("A", 1.0, 1.0, 1.0)
        .unwrap()
        .box_("B", 2.0, 2.0, 2.0)
        .unwrap()
        .fuse("F", &["A", "B"])
        .unwrap();
    m.evaluate().unwrap();
    let inserts = m.cache_stats().inserts;

    m.edit("F", |kind| {
        if let ObjectKind::MultiFuse(p) = kind {
            p.shapes.reverse();
        }
    })
    .unwrap();
    m.evaluate().unwrap();
    assert_eq!(m.cache_stats().inserts, inserts + 1);
}

#[test]
fn test_parameter_edit_rebuilds_only_dependents() {
    let mut m = DocumentBuilder::mock();
    m.box_("A", 1.0, 1.0, 1.0)
        .unwrap()
        .box_("B", 2.0, 2.0, 2.0)
        .unwrap()
        .box_("Unrelated", 4.0, 4.0, 4.0)
        .unwrap()
        .fuse("F", &["A", "B"])
        .unwrap();
    m.evaluate().unwrap();
    let inserts = m.cache_stats().inserts;

    m.edit("B", |kind| {
        if let ObjectKind::Box(p) = kind {
            p.height = 5.0;
        }
    })
    .unwrap();
    m.evaluate().unwrap();
    // New B and new F; A and Unrelated come from the cache.
    assert_eq!(m.cache_stats().inserts, inserts + 2);
}

#[test]
fn test_lru_cache_releases_evicted_shapes() {
    let config = WorkerConfig {
        eviction: EvictionConfig::Lru { capacity: 2 },
        ..WorkerConfig::default()
    };
    let mut m = DocumentBuilder::with_kernel(Box::new(MockKernel::new()), config);
    for (i, name) in ["A", "B", "C", "D"].iter().enumerate() {
        m.box_(name, 1.0 + i as f64, 1.0, 1.0).unwrap();
    }
    let eval = m.evaluate().unwrap();
    assert_eq!(eval.shapes.len(), 4);
    assert_eq!(m.cache().len(), 2);
    assert_eq!(m.live_shapes(), 2);
    assert_eq!(m.cache_stats().evictions, 2);
}

// ── Placement ───────────────────────────────────────────────────────────

#[test]
fn test_rotated_placement_moves_corners() {
    let mut m = DocumentBuilder::mock();
    m.box_("Box", 10.0, 10.0, 10.0)
        .unwrap()
        .place(
            "Box",
            Placement::new([1.0, 2.0, 3.0], [0.0, 0.0, 1.0], 90.0),
        )
        .unwrap();
    let eval = m.evaluate().unwrap();
    assert_bounding_box(eval, "Box", [-9.0, 2.0, 3.0], [1.0, 12.0, 13.0], 1e-4).unwrap();
}

#[test]
fn test_placement_on_boolean_applies_after_build() {
    let mut m = DocumentBuilder::mock();
    m.box_("A", 2.0, 2.0, 2.0)
        .unwrap()
        .box_("B", 1.0, 1.0, 1.0)
        .unwrap()
        .cut("C", "A", "B")
        .unwrap()
        .place("C", Placement::translation([0.0, 0.0, 10.0]))
        .unwrap();
    let eval = m.evaluate().unwrap();
    assert_bounding_box(eval, "C", [0.0, 0.0, 10.0], [2.0, 2.0, 12.0], 1e-5).unwrap();
}

// ── Sketches and extrusions ─────────────────────────────────────────────

#[test]
fn test_sketch_displays_edges_only() {
    let mut m = DocumentBuilder::mock();
    m.sketch("Sketch", rect_profile(0.0, 0.0, 4.0, 2.0)).unwrap();
    let eval = m.evaluate().unwrap();

    let entry = eval.shape("Sketch").unwrap();
    assert!(entry.face_list.is_empty());
    assert_eq!(entry.edge_list.len(), 4);
    assert!(entry.meta.is_massless());
}

#[test]
fn test_extruded_rectangle_is_a_prism() {
    let mut m = DocumentBuilder::mock();
    m.sketch("Sketch", rect_profile(0.0, 0.0, 4.0, 2.0))
        .unwrap()
        .extrude("Prism", "Sketch", [0.0, 0.0, 1.0], 3.0)
        .unwrap();
    let eval = m.evaluate().unwrap();

    assert_eq!(eval.shape("Prism").unwrap().face_list.len(), 6);
    assert_bounding_box(eval, "Prism", [0.0; 3], [4.0, 2.0, 3.0], 1e-5).unwrap();
    assert_mass(eval, "Prism", 24.0, 1e-6).unwrap();
    // Extrusion does not consume its profile.
    assert_displayed(eval, "Sketch").unwrap();
}

// ── Visibility and errors ───────────────────────────────────────────────

#[test]
fn test_invisible_objects_are_not_displayed_but_can_be_referenced() {
    let mut m = DocumentBuilder::mock();
    m.box_("A", 2.0, 2.0, 2.0)
        .unwrap()
        .box_("B", 1.0, 1.0, 1.0)
        .unwrap()
        .set_visible("A", false)
        .unwrap()
        .set_visible("B", false)
        .unwrap()
        .cut("C", "A", "B")
        .unwrap();
    let eval = m.evaluate().unwrap();
    assert_eq!(eval.names(), ["C"]);
}

#[test]
fn test_invalid_primitive_is_absent() {
    let mut m = DocumentBuilder::mock();
    m.box_("Flat", 1.0, 1.0, 0.0)
        .unwrap()
        .box_("Ok", 1.0, 1.0, 1.0)
        .unwrap();
    let eval = m.evaluate().unwrap();
    assert_absent(eval, "Flat").unwrap();
    assert_displayed(eval, "Ok").unwrap();
}

#[test]
fn test_reference_cycle_is_absent() {
    let mut m = DocumentBuilder::mock();
    m.fuse("X", &["Y"]).unwrap().fuse("Y", &["X"]).unwrap();
    let eval = m.evaluate().unwrap();
    assert!(eval.shapes.is_empty());
}

#[test]
fn test_broken_import_aborts_the_pass() {
    let mut m = DocumentBuilder::mock();
    m.box_("Box", 1.0, 1.0, 1.0).unwrap();
    m.add(raw_brep_spec("Raw", b"not a brep".to_vec())).unwrap();

    let err = m.evaluate().unwrap_err();
    assert!(matches!(err, HarnessError::Worker { ref message } if message.contains("Raw")));
}

#[test]
fn test_skip_policy_isolates_broken_import() {
    let mut m = DocumentBuilder::mock().with_config(WorkerConfig::preview());
    m.box_("Box", 1.0, 1.0, 1.0).unwrap();
    m.add(raw_brep_spec("Raw", b"not a brep".to_vec())).unwrap();
    m.add(raw_brep_spec("Good", MockKernel::brep_payload(1.0, 2.0, 3.0)))
        .unwrap();

    let eval = m.evaluate().unwrap();
    assert_absent(eval, "Raw").unwrap();
    assert_displayed(eval, "Good").unwrap();
    assert_displayed(eval, "Box").unwrap();
}

// ── Tessellation ────────────────────────────────────────────────────────

#[test]
fn test_tessellation_is_deterministic() {
    let build = || {
        let mut m = DocumentBuilder::mock();
        m.box_("A", 10.0, 10.0, 10.0)
            .unwrap()
            .cylinder("Cyl", 2.0, 20.0)
            .unwrap()
            .cut("C", "A", "Cyl")
            .unwrap()
            .sketch("S", slot_profile(4.0, 2.0))
            .unwrap();
        m.evaluate().unwrap().clone()
    };
    assert_same_display(&build(), &build()).unwrap();
}

#[test]
fn test_document_order_does_not_change_the_display() {
    let mut m = DocumentBuilder::mock();
    m.box_("A", 2.0, 2.0, 2.0)
        .unwrap()
        .box_("B", 1.0, 1.0, 1.0)
        .unwrap()
        .cut("C", "A", "B")
        .unwrap();
    let forward = m.evaluate().unwrap().clone();
    m.reverse();
    let backward = m.evaluate().unwrap().clone();
    assert_same_display(&forward, &backward).unwrap();
    assert_eq!(forward.hidden, backward.hidden);
}
