use cad_types::{BoxParams, CutParams, MultiShapeParams, ObjectKind, ObjectSpec, Placement};
use eval_engine::{expand, CacheKey, Evaluator, ObjectIndex, ShapeCache};
use geom_kernel::MockKernel;
use proptest::prelude::*;

fn boxed(name: &str, l: f64, w: f64, h: f64) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::Box(BoxParams {
            length: l,
            width: w,
            height: h,
        }),
    )
}

fn fuse(name: &str, shapes: &[&str]) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::MultiFuse(MultiShapeParams {
            shapes: shapes.iter().map(|s| s.to_string()).collect(),
        }),
    )
}

fn key_of(objects: &[ObjectSpec], name: &str) -> CacheKey {
    let index = ObjectIndex::build(objects);
    let spec = index.get(name).unwrap();
    CacheKey::of(&expand(spec, &index)).unwrap()
}

proptest! {
    #[test]
    fn key_ignores_names(
        l in 0.1f64..100.0,
        w in 0.1f64..100.0,
        h in 0.1f64..100.0,
        a in "[A-Za-z]{1,8}",
        b in "[A-Za-z]{1,8}",
    ) {
        let first = vec![boxed(&a, l, w, h)];
        let second = vec![boxed(&b, l, w, h).hidden()];
        prop_assert_eq!(key_of(&first, &a), key_of(&second, &b));
    }

    #[test]
    fn key_tracks_placement(
        x in -50.0f64..50.0,
        angle in 1.0f64..359.0,
    ) {
        let plain = vec![boxed("A", 1.0, 1.0, 1.0)];
        let placed = vec![boxed("A", 1.0, 1.0, 1.0)
            .with_placement(Placement::new([x, 0.0, 0.0], [0.0, 0.0, 1.0], angle))];
        prop_assert_ne!(key_of(&plain, "A"), key_of(&placed, "A"));
    }
}

#[test]
fn fuse_order_changes_the_key() {
    let objects = vec![
        boxed("A", 1.0, 1.0, 1.0),
        boxed("B", 2.0, 1.0, 1.0),
        fuse("AB", &["A", "B"]),
        fuse("BA", &["B", "A"]),
    ];
    assert_ne!(key_of(&objects, "AB"), key_of(&objects, "BA"));
}

#[test]
fn renamed_operands_hit_the_cache() {
    let first = vec![
        boxed("A", 1.0, 1.0, 1.0),
        boxed("B", 2.0, 1.0, 1.0),
        fuse("F", &["A", "B"]),
    ];
    let second = vec![
        boxed("Left", 1.0, 1.0, 1.0),
        boxed("Right", 2.0, 1.0, 1.0),
        fuse("Joined", &["Left", "Right"]),
    ];
    let mut kernel = MockKernel::new();
    let mut cache = ShapeCache::new();
    let evaluator = Evaluator::default();
    let one = evaluator.run(&mut kernel, &mut cache, &first).unwrap();
    let built = kernel.operation_count();
    let two = evaluator.run(&mut kernel, &mut cache, &second).unwrap();
    assert_eq!(kernel.operation_count(), built);
    assert_eq!(one.shapes[0].entry.handle, two.shapes[0].entry.handle);
    assert_eq!(two.shapes[0].name, "Joined");
    let hidden: Vec<&str> = two.hidden.iter().map(String::as_str).collect();
    assert_eq!(hidden, ["Left", "Right"]);
}

fn cut(name: &str, base: &str, tool: &str) -> ObjectSpec {
    ObjectSpec::new(
        name,
        ObjectKind::Cut(CutParams {
            base: Some(base.into()),
            tool: Some(tool.into()),
        }),
    )
}

#[test]
fn deep_missing_reference_does_not_depend_on_cache_history() {
    let objects = vec![
        boxed("A", 1.0, 1.0, 1.0),
        boxed("B", 2.0, 2.0, 2.0),
        fuse("G", &["A"]),
        cut("Cut2", "G", "B"),
        fuse("F", &["A", "ghost"]),
        cut("Cut", "F", "B"),
    ];
    let mut kernel = MockKernel::new();
    let mut cache = ShapeCache::new();
    let outcome = Evaluator::default()
        .run(&mut kernel, &mut cache, &objects)
        .unwrap();

    let names: Vec<&str> = outcome.shapes.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Cut2"]);
    let hidden: Vec<&str> = outcome.hidden.iter().map(String::as_str).collect();
    assert_eq!(hidden, ["A", "B", "G"]);
    assert!(outcome.skipped.contains(&"Cut".to_string()));
    assert!(outcome.skipped.contains(&"F".to_string()));
}
