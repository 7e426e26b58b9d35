//! End-to-end scenarios for the scene graph builder.
//!
//! Everything runs on the headless backend. Set `RUST_LOG=spark_scene=debug`
//! to see the build trace.
//!
//! Run with: cargo test --test scene_graph -- --nocapture

use std::cell::RefCell;
use std::rc::Rc;

use spark_scene::backend::headless::{self, HeadlessBackend, HeadlessScene, PlainComponent};
use spark_scene::{
    handle, ActiveProperties, AppConfig, Application, BuildError, ComponentBlueprint, DiagnosticKind,
    JumpFlags, NodeDescriptor, SceneBlueprint, Value, Violation, WriteOutcome,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn app() -> Application {
    init_tracing();
    headless::application()
}

/// `Counter`: data `count`, prop `step`; shows its count on an image frame.
fn register_counter(app: &Application) {
    app.register_component(
        ComponentBlueprint::new(
            "Counter",
            || handle(PlainComponent::with_fields([("count", 0), ("step", 1)])),
            NodeDescriptor::new("Container").child(
                NodeDescriptor::new("Image")
                    .literal("x", 0)
                    .literal("y", 0)
                    .literal("key", "digits")
                    .bind("frame", "count"),
            ),
        )
        .props(ActiveProperties::new().data("count").prop("step")),
    )
    .expect("register Counter");
}

fn register_scene(app: &Application, name: &str, template: NodeDescriptor) {
    app.register_scene(SceneBlueprint::new(name, |_| handle(HeadlessScene::new()), template))
        .expect("register scene");
}

fn recorder(app: &Application, id: spark_scene::ObjectId, prop: &str) -> Rc<RefCell<Vec<Value>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    app.view_models().add_dependency(
        id,
        prop,
        Rc::new(move |_: &Application, value: &Value| sink.borrow_mut().push(value.clone())),
    );
    seen
}

// =============================================================================
// IDENTITY
// =============================================================================

#[test]
fn independent_instances_have_distinct_ids_and_state() {
    let app = app();
    register_counter(&app);
    register_scene(
        &app,
        "Main",
        NodeDescriptor::new("Scene")
            .child(NodeDescriptor::new("Counter").literal("step", 1))
            .child(NodeDescriptor::new("Counter").literal("step", 2)),
    );
    app.boot("Main").expect("boot");

    let counters = app.instances_of("Counter");
    assert_eq!(counters.len(), 2);
    assert_ne!(counters[0], counters[1]);

    app.set(counters[0], "count", 10).expect("data write");
    assert_eq!(app.get(counters[0], "count"), Value::Int(10));
    assert_eq!(app.get(counters[1], "count"), Value::Int(0));
    assert_eq!(app.get(counters[1], "step"), Value::Int(2));
}

// =============================================================================
// VIEW-MODEL CONTRACT
// =============================================================================

#[test]
fn same_value_twice_fires_callbacks_once() {
    let app = app();
    app.register_scene(
        SceneBlueprint::new("Stateful", |_| handle(HeadlessScene::new()), NodeDescriptor::new("Scene"))
            .props(ActiveProperties::new().data("x")),
    )
    .expect("register");
    let scene = app.jump("Stateful", JumpFlags::empty()).expect("jump");
    let seen = recorder(&app, scene, "x");

    assert_eq!(app.set(scene, "x", 5), Ok(WriteOutcome::Changed));
    assert_eq!(app.set(scene, "x", 5), Ok(WriteOutcome::Unchanged));
    assert_eq!(*seen.borrow(), vec![Value::Int(5)]);
}

#[test]
fn prop_and_getter_writes_are_rejected() {
    let app = app();
    app.store().add_slice("player", Value::from(serde_json::json!({ "hp": 30 })), |s, _| s.clone());
    app.register_scene(
        SceneBlueprint::new("Main", |_| handle(HeadlessScene::new()), NodeDescriptor::new("Scene")).props(
            ActiveProperties::new()
                .prop("title")
                .getter("hp", "player.hp"),
        ),
    )
    .expect("register");
    let scene = app.jump("Main", JumpFlags::empty()).expect("jump");
    app.assign(scene, "title", Value::from("Level 1"));
    let seen = recorder(&app, scene, "title");

    let err = app.set(scene, "title", "Hacked").unwrap_err();
    assert!(matches!(err, Violation::ReadOnlyProp { .. }));
    assert_eq!(app.get(scene, "title"), Value::from("Level 1"));

    app.assign(scene, "hp", Value::Int(99));
    assert_eq!(app.get(scene, "hp"), Value::Int(30));

    assert!(seen.borrow().is_empty());
    let mutations = app
        .take_diagnostics()
        .into_iter()
        .filter(|d| d.kind == DiagnosticKind::Mutation)
        .count();
    assert_eq!(mutations, 2);
}

#[test]
fn dispatch_depth_breaks_cycles() {
    init_tracing();
    let config = AppConfig::from_json(r#"{ "max_dispatch_depth": 8 }"#).expect("config");
    let app = Application::new(config, HeadlessBackend::new());
    headless::install(&app);
    app.register_scene(
        SceneBlueprint::new("Loop", |_| handle(HeadlessScene::new()), NodeDescriptor::new("Scene"))
            .props(ActiveProperties::new().data("a").data("b")),
    )
    .expect("register");
    let scene = app.jump("Loop", JumpFlags::empty()).expect("jump");

    for (from, to) in [("a", "b"), ("b", "a")] {
        app.view_models().add_dependency(
            scene,
            from,
            Rc::new(move |app: &Application, value: &Value| {
                let next = value.as_int().unwrap_or(0) + 1;
                let _ = app.set(scene, to, next);
            }),
        );
    }

    assert_eq!(app.set(scene, "a", 1), Ok(WriteOutcome::Changed));
    assert!(app
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("deeper than 8")));
}

#[test]
fn callbacks_fire_in_registration_order() {
    let app = app();
    app.register_scene(
        SceneBlueprint::new("Main", |_| handle(HeadlessScene::new()), NodeDescriptor::new("Scene"))
            .props(ActiveProperties::new().data("x")),
    )
    .expect("register");
    let scene = app.jump("Main", JumpFlags::empty()).expect("jump");

    let order = Rc::new(RefCell::new(Vec::new()));
    for label in ["first", "second", "third"] {
        let sink = Rc::clone(&order);
        app.view_models().add_dependency(
            scene,
            "x",
            Rc::new(move |_: &Application, _: &Value| sink.borrow_mut().push(label)),
        );
    }

    app.set(scene, "x", 1).expect("data write");
    assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
}

#[test]
fn nested_writes_cascade_depth_first() {
    let app = app();
    app.register_scene(
        SceneBlueprint::new("Main", |_| handle(HeadlessScene::new()), NodeDescriptor::new("Scene"))
            .props(ActiveProperties::new().data("a").data("b")),
    )
    .expect("register");
    let scene = app.jump("Main", JumpFlags::empty()).expect("jump");

    let order = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&order);
    app.view_models().add_dependency(
        scene,
        "a",
        Rc::new(move |app: &Application, value: &Value| {
            sink.borrow_mut().push("a1");
            let _ = app.set(scene, "b", value.clone());
        }),
    );
    let sink = Rc::clone(&order);
    app.view_models().add_dependency(
        scene,
        "a",
        Rc::new(move |_: &Application, _: &Value| sink.borrow_mut().push("a2")),
    );
    let sink = Rc::clone(&order);
    app.view_models().add_dependency(
        scene,
        "b",
        Rc::new(move |_: &Application, _: &Value| sink.borrow_mut().push("b1")),
    );

    app.set(scene, "a", 7).expect("data write");
    assert_eq!(*order.borrow(), vec!["a1", "b1", "a2"]);
    assert_eq!(app.get(scene, "b"), Value::Int(7));
}

// =============================================================================
// BINDING
// =============================================================================

#[test]
fn bind_propagates_across_components_synchronously() {
    let app = app();
    app.register_component(
        ComponentBlueprint::new(
            "Label",
            || handle(PlainComponent::default()),
            NodeDescriptor::new("Container"),
        )
        .props(ActiveProperties::new().prop("label")),
    )
    .expect("register Label");
    app.register_component(
        ComponentBlueprint::new(
            "Panel",
            || handle(PlainComponent::with_fields([("count", 0)])),
            NodeDescriptor::new("Container").child(NodeDescriptor::new("Label").bind("label", "count")),
        )
        .props(ActiveProperties::new().data("count")),
    )
    .expect("register Panel");
    register_scene(&app, "Main", NodeDescriptor::new("Scene").child(NodeDescriptor::new("Panel")));
    app.boot("Main").expect("boot");

    let panel = app.instances_of("Panel")[0];
    let label = app.instances_of("Label")[0];
    assert_eq!(app.get(label, "label"), Value::Int(0));

    app.set(panel, "count", 3).expect("data write");
    assert_eq!(app.get(label, "label"), Value::Int(3));
}

// =============================================================================
// DESTRUCTION
// =============================================================================

#[test]
fn destroying_a_component_releases_its_subtree() {
    let app = app();
    register_counter(&app);
    register_scene(
        &app,
        "Main",
        NodeDescriptor::new("Scene").child(NodeDescriptor::new("Counter").literal("step", 1)),
    );
    app.boot("Main").expect("boot");
    let counter = app.instances_of("Counter")[0];
    let root = app.root_container(counter).expect("root");
    let image = app.children_of(root)[0];

    assert!(app.destroy(counter));

    assert!(app.objects().lookup(image).is_none());
    assert!(app.objects().lookup(root).is_none());
    assert!(!app.view_models().has_instance(counter));
    assert_eq!(app.set(counter, "count", 1), Err(Violation::UnknownInstance(counter)));
    assert_eq!(app.live_count(), 1);
}

#[test]
fn unregister_component_cascades() {
    let app = app();
    register_counter(&app);
    register_scene(
        &app,
        "Main",
        NodeDescriptor::new("Scene")
            .child(NodeDescriptor::new("Counter").literal("step", 1))
            .child(NodeDescriptor::new("Counter").literal("step", 1)),
    );
    app.boot("Main").expect("boot");
    assert_eq!(app.live_count(), 7);

    assert_eq!(app.unregister_component("Counter"), 2);
    assert_eq!(app.live_count(), 1);
    assert!(app.blueprints().component("Counter").is_none());
}

// =============================================================================
// TEMPLATE STRUCTURE
// =============================================================================

#[test]
fn scene_without_scene_root_is_not_built() {
    let app = app();
    register_scene(&app, "Broken", NodeDescriptor::new("Container"));

    let err = app.boot("Broken").unwrap_err();
    assert!(matches!(err, BuildError::WrongRoot { ref found, .. } if found == "Container"));
    assert!(app.instances_of("Broken").is_empty());
    assert_eq!(app.live_count(), 0);
    assert!(app.current_scene().is_none());
}

#[test]
fn missing_required_attribute_names_it() {
    let app = app();
    register_scene(
        &app,
        "Main",
        NodeDescriptor::new("Scene").child(NodeDescriptor::new("Image").literal("x", 1).literal("y", 2)),
    );

    let err = app.boot("Main").unwrap_err();
    assert_eq!(err.to_string(), "<Image> is missing required attributes: key");
    // Only the scene made it into the registry.
    assert_eq!(app.live_count(), 1);
}

#[test]
fn unregistered_tag_is_skipped() {
    let app = app();
    register_scene(
        &app,
        "Main",
        NodeDescriptor::new("Scene")
            .child(NodeDescriptor::new("Sprite"))
            .child(NodeDescriptor::new("Container")),
    );

    let scene = app.boot("Main").expect("siblings still build");
    assert_eq!(app.children_of(scene).len(), 1);
    assert!(app
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::Configuration && d.message.contains("Sprite")));
}

// =============================================================================
// REPEAT
// =============================================================================

#[test]
fn repeat_builds_three_siblings_with_distinct_indices() {
    let app = app();
    let observed = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&observed);
    register_scene(
        &app,
        "Main",
        NodeDescriptor::new("Scene").child(
            NodeDescriptor::new("Container")
                .literal("repeat_count", 3)
                .literal("repeat_name", "i")
                .child(
                    NodeDescriptor::new("Image")
                        .attr("x", move |scope| {
                            let index = scope.repeat_index("i");
                            sink.borrow_mut().push(index);
                            Value::from(index.unwrap_or(usize::MAX))
                        })
                        .literal("y", 0)
                        .literal("key", "row"),
                ),
        ),
    );

    let scene = app.boot("Main").expect("boot");
    let list = app.children_of(scene)[0];
    let rows = app.children_of(list);

    assert_eq!(rows.len(), 3);
    assert_eq!(*observed.borrow(), vec![Some(0), Some(1), Some(2)]);
    let xs: Vec<Value> = rows.iter().map(|r| app.get(*r, "x")).collect();
    assert_eq!(xs, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
}

// =============================================================================
// HOT RECONSTRUCTION
// =============================================================================

#[test]
fn reload_keeps_state_of_untouched_components() {
    let app = app();
    register_counter(&app);
    app.register_component(
        ComponentBlueprint::new(
            "Score",
            || handle(PlainComponent::with_fields([("points", 0)])),
            NodeDescriptor::new("Container"),
        )
        .props(ActiveProperties::new().data("points")),
    )
    .expect("register Score");
    register_scene(
        &app,
        "Main",
        NodeDescriptor::new("Scene")
            .child(NodeDescriptor::new("Counter").literal("step", 1))
            .child(NodeDescriptor::new("Score")),
    );
    let before = app.boot("Main").expect("boot");
    app.set(app.instances_of("Counter")[0], "count", 4).expect("write");
    app.set(app.instances_of("Score")[0], "points", 120).expect("write");

    let rebuilt = app
        .reload_component(
            ComponentBlueprint::new(
                "Counter",
                || handle(PlainComponent::with_fields([("count", 0), ("step", 1)])),
                NodeDescriptor::new("Shadow"),
            )
            .props(ActiveProperties::new().data("count").prop("step")),
        )
        .expect("reload")
        .expect("scene active");

    assert_ne!(rebuilt, before);
    assert!(!app.is_live(before));
    let counter = app.instances_of("Counter")[0];
    let score = app.instances_of("Score")[0];
    assert_eq!(app.get(counter, "count"), Value::Int(0));
    assert_eq!(app.get(score, "points"), Value::Int(120));
    assert_eq!(app.current_scene(), Some(("Main".to_string(), rebuilt)));
}

#[test]
fn export_follows_build_order() {
    let app = app();
    register_counter(&app);
    register_scene(
        &app,
        "Main",
        NodeDescriptor::new("Scene")
            .child(NodeDescriptor::new("Counter").literal("step", 1))
            .child(NodeDescriptor::new("Counter").literal("step", 2)),
    );
    app.boot("Main").expect("boot");

    let exported = app.export_view_models();
    let steps: Vec<Value> = exported["Counter"]
        .iter()
        .map(|bag| bag["step"].clone())
        .collect();
    assert_eq!(steps, vec![Value::Int(1), Value::Int(2)]);
}
