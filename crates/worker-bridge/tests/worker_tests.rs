use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cad_types::{BoxParams, CutParams, MultiShapeParams, ObjectKind, ObjectSpec, Placement};
use geom_kernel::{Kernel, KernelError, MockKernel, TruckKernel};
use worker_bridge::collab::RetainedDisplay;
use worker_bridge::*;

// ── Helpers ──────────────────────────────────────────────────────────────

fn mock_worker() -> Worker {
    Worker::spawn(WorkerConfig::default(), || Ok(MockKernel::new())).unwrap()
}

fn cube(name: &str) -> ObjectSpec {
    ObjectSpec::new(name, ObjectKind::Box(BoxParams::default()))
}

fn display(reply: WorkerReply) -> (std::collections::BTreeMap<String, DisplayEntry>, Vec<String>) {
    match reply {
        WorkerReply::DisplayShape {
            payload, hidden, ..
        } => (payload, hidden),
        other => panic!("expected DISPLAY_SHAPE, got {other:?}"),
    }
}

// ── Channel behavior ─────────────────────────────────────────────────────

#[test]
fn register_then_load_box() {
    let worker = mock_worker();
    let consumer = worker.connect("viewer");
    consumer.register().unwrap();

    let (payload, hidden) = display(consumer.load_objects(vec![cube("Box")]).unwrap());
    let entry = &payload["Box"];
    assert_eq!(entry.source_object, "Box");
    assert_eq!(entry.face_list.len(), 6);
    assert_eq!(entry.edge_list.len(), 12);
    assert!(hidden.is_empty());
}

#[test]
fn replies_echo_request_ids_in_order() {
    let worker = mock_worker();
    let consumer = worker.connect("viewer");
    consumer
        .send_json(r#"{"action": "REGISTER", "id": 10, "payload": {"id": "viewer"}}"#)
        .unwrap();
    consumer
        .send_json(r#"{"action": "SAVE_FILE", "id": 11}"#)
        .unwrap();
    consumer
        .send_json(
            r#"{"action": "LOAD_FILE", "id": 12, "payload": {"content": {"objects": []}}}"#,
        )
        .unwrap();

    assert_eq!(consumer.recv().unwrap(), WorkerReply::Initialized { id: 10 });
    let saved = consumer.recv().unwrap();
    assert_eq!(saved.id(), 11);
    assert!(matches!(saved, WorkerReply::Error { ref payload, .. } if !payload.fatal));
    let loaded = consumer.recv().unwrap();
    assert_eq!(loaded.id(), 12);
    assert!(display(loaded).0.is_empty());
}

#[test]
fn request_skips_replies_nobody_waited_for() {
    let worker = mock_worker();
    let consumer = worker.connect("viewer");
    consumer
        .send(WorkerRequest::SaveFile {
            id: 100,
            payload: serde_json::Value::Null,
        })
        .unwrap();
    let reply = consumer
        .request(WorkerRequest::Register {
            id: 101,
            payload: RegisterPayload { id: "viewer".into() },
        })
        .unwrap();
    assert_eq!(reply, WorkerReply::Initialized { id: 101 });
    assert_eq!(
        consumer.recv_timeout(Duration::from_millis(50)).unwrap(),
        None
    );
}

#[test]
fn consumers_get_their_own_replies() {
    let worker = mock_worker();
    let a = worker.connect("a");
    let b = worker.connect("b");
    a.register().unwrap();
    b.register().unwrap();

    let (payload, _) = display(b.load_objects(vec![cube("OnlyB")]).unwrap());
    assert!(payload.contains_key("OnlyB"));
    assert_eq!(a.recv_timeout(Duration::from_millis(50)).unwrap(), None);
}

#[test]
fn failed_bootstrap_is_fatal_for_every_request() {
    let worker = Worker::spawn(WorkerConfig::default(), || -> Result<MockKernel, _> {
        Err(KernelError::Bootstrap {
            reason: "no kernel here".into(),
        })
    })
    .unwrap();
    let consumer = worker.connect("viewer");

    let err = consumer.register().unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("no kernel here"));

    let err = consumer.load_objects(vec![cube("Box")]).unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn import_failure_aborts_the_pass_but_not_the_worker() {
    let worker = mock_worker();
    let consumer = worker.connect("viewer");
    consumer.register().unwrap();

    let broken = ObjectSpec::new(
        "Raw",
        ObjectKind::RawBrep(cad_types::RawBrepParams {
            shape: cad_types::RawBrepData(b"garbage".to_vec()),
        }),
    );
    let err = consumer
        .load_objects(vec![cube("Box"), broken])
        .unwrap_err();
    assert!(!err.is_fatal());
    assert!(err.to_string().contains("Raw"));

    let (payload, _) = display(consumer.load_objects(vec![cube("Box")]).unwrap());
    assert_eq!(payload.len(), 1);
}

#[test]
fn preview_config_skips_failed_imports() {
    let worker = Worker::spawn(WorkerConfig::preview(), || Ok(MockKernel::new())).unwrap();
    let consumer = worker.connect("viewer");
    consumer.register().unwrap();

    let broken = ObjectSpec::new(
        "Raw",
        ObjectKind::RawBrep(cad_types::RawBrepParams {
            shape: cad_types::RawBrepData(b"garbage".to_vec()),
        }),
    );
    let (payload, _) = display(consumer.load_objects(vec![cube("Box"), broken]).unwrap());
    assert!(payload.contains_key("Box"));
    assert!(!payload.contains_key("Raw"));
}

#[test]
fn sync_pushes_into_the_display() {
    let worker = mock_worker();
    let consumer = worker.connect("viewer");
    consumer.register().unwrap();

    let document = vec![
        cube("A"),
        cube("B").with_placement(Placement::translation([5.0, 0.0, 0.0])),
        ObjectSpec::new(
            "Fusion",
            ObjectKind::MultiFuse(MultiShapeParams {
                shapes: vec!["A".into(), "B".into()],
            }),
        ),
    ];
    let mut sink = RetainedDisplay::default();
    consumer.sync(&document, &mut sink).unwrap();
    consumer.sync(&document, &mut sink).unwrap();

    assert_eq!(sink.passes, 2);
    assert_eq!(sink.hidden, ["A", "B"]);
    assert_eq!(sink.shapes.keys().collect::<Vec<_>>(), ["Fusion"]);
}

#[test]
fn cut_with_missing_tool_displays_nothing_for_it() {
    let worker = mock_worker();
    let consumer = worker.connect("viewer");
    consumer.register().unwrap();

    let document = vec![
        cube("Base"),
        ObjectSpec::new(
            "Cut",
            ObjectKind::Cut(CutParams {
                base: Some("Base".into()),
                tool: Some("Missing".into()),
            }),
        ),
    ];
    let (payload, hidden) = display(consumer.load_objects(document).unwrap());
    assert!(payload.contains_key("Base"));
    assert!(!payload.contains_key("Cut"));
    assert!(hidden.is_empty());
}

#[test]
fn dropped_consumer_does_not_stop_the_worker() {
    let worker = mock_worker();
    {
        let gone = worker.connect("gone");
        gone.send(WorkerRequest::Register {
            id: 1,
            payload: RegisterPayload { id: "gone".into() },
        })
        .unwrap();
    }
    let consumer = worker.connect("viewer");
    consumer.register().unwrap();
    let (payload, _) = display(consumer.load_objects(vec![cube("Box")]).unwrap());
    assert_eq!(payload.len(), 1);
}

#[test]
fn shutdown_disconnects_consumers() {
    let worker = mock_worker();
    let consumer = worker.connect("viewer");
    consumer.register().unwrap();
    worker.shutdown();

    let err = consumer.register().unwrap_err();
    assert!(matches!(err, WorkerError::Disconnected));
}

// ── Real kernel ──────────────────────────────────────────────────────────

#[test]
fn truck_raw_brep_round_trips_through_the_wire() {
    let mut source = TruckKernel::new();
    let solid = source.make_box(2.0, 3.0, 4.0).unwrap();
    let bytes = source.export_brep(&solid).unwrap();

    let raw = format!(
        r#"{{
            "action": "LOAD_FILE",
            "id": 5,
            "payload": {{"content": {{"objects": [
                {{"name": "Imported", "kind": "RawBrep", "parameters": {{"Shape": "{}"}}}}
            ]}}}}
        }}"#,
        STANDARD.encode(&bytes)
    );

    let worker = Worker::spawn(WorkerConfig::default(), || Ok(TruckKernel::new())).unwrap();
    let consumer = worker.connect("viewer");
    consumer.register().unwrap();
    consumer.send_json(&raw).unwrap();
    let reply = consumer.recv().unwrap();
    assert_eq!(reply.id(), 5);

    let (payload, _) = display(reply);
    let entry = &payload["Imported"];
    assert_eq!(entry.face_list.len(), 6);
    assert_eq!(entry.edge_list.len(), 12);
    approx::assert_relative_eq!(entry.meta.mass, 24.0, max_relative = 1e-3);
}

#[test]
fn unknown_kind_does_not_reject_the_document() {
    let worker = mock_worker();
    let consumer = worker.connect("viewer");
    consumer.register().unwrap();
    consumer
        .send_json(
            r#"{"action": "LOAD_FILE", "id": 7, "payload": {"content": {"objects": [
                {"name": "Box", "kind": "Box"},
                {"name": "Note", "kind": "App::Annotation"}
            ]}}}"#,
        )
        .unwrap();
    let reply = consumer.recv().unwrap();
    assert_eq!(reply.id(), 7);
    let (payload, _) = display(reply);
    let names: Vec<&str> = payload.keys().map(String::as_str).collect();
    assert_eq!(names, ["Box"]);
}
