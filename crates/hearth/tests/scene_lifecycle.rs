use std::cell::RefCell;
use std::rc::Rc;

use hearth::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Gauge {
    v: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Health {
    current: u32,
    max: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Tags(Vec<String>);

fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
    registry::register::<Gauge>();
    registry::register::<Position>();
    registry::register::<Health>();
    registry::register::<Tags>();
}

/// Records every `Gauge` event it sees.
#[derive(Default)]
struct GaugeWatcher {
    seen: Vec<(ComponentEventKind, EntityHandle, i32)>,
}

impl EventListener<ComponentEvent<Gauge>> for GaugeWatcher {
    fn receive_event(&mut self, event: &ComponentEvent<Gauge>) {
        self.seen
            .push((event.kind, event.entity, event.component.v));
    }
}

impl System for GaugeWatcher {
    fn subscribe(subscriber: &mut Subscriber<'_, Self>) -> Result<()> {
        subscriber.component_events::<Gauge>()
    }
}

/// Counts events for every component type it follows.
#[derive(Default)]
struct Census {
    adds: usize,
    removes: usize,
}

impl Census {
    fn count(&mut self, kind: ComponentEventKind) {
        match kind {
            ComponentEventKind::Add => self.adds += 1,
            ComponentEventKind::Remove => self.removes += 1,
        }
    }
}

impl EventListener<ComponentEvent<Position>> for Census {
    fn receive_event(&mut self, event: &ComponentEvent<Position>) {
        self.count(event.kind);
    }
}

impl EventListener<ComponentEvent<Health>> for Census {
    fn receive_event(&mut self, event: &ComponentEvent<Health>) {
        self.count(event.kind);
    }
}

impl EventListener<ComponentEvent<Tags>> for Census {
    fn receive_event(&mut self, event: &ComponentEvent<Tags>) {
        self.count(event.kind);
    }
}

impl System for Census {
    fn subscribe(subscriber: &mut Subscriber<'_, Self>) -> Result<()> {
        subscriber.component_events::<Position>()?;
        subscriber.component_events::<Health>()?;
        subscriber.component_events::<Tags>()
    }
}

#[test]
fn add_mutate_destroy_and_recycle() {
    setup();
    let mut scene = Scene::new();
    let watcher = scene.add_system(GaugeWatcher::default()).unwrap();
    scene.refresh();

    let a = scene.create_entity("A");
    scene.add_component(a, Gauge { v: 1 }).unwrap();
    assert!(watcher.borrow().seen.is_empty());

    scene.activate(a).unwrap();
    scene.refresh();
    assert_eq!(
        watcher.borrow().seen,
        vec![(ComponentEventKind::Add, a, 1)]
    );

    scene.component_mut::<Gauge>(a).unwrap().v = 2;
    scene.destroy(a).unwrap();
    scene.refresh();
    assert_eq!(
        watcher.borrow().seen,
        vec![
            (ComponentEventKind::Add, a, 1),
            (ComponentEventKind::Remove, a, 2)
        ]
    );
    assert!(!scene.is_valid(a));

    let b = scene.create_entity("B");
    assert_eq!(b.id(), a.id());
    assert_ne!(b, a);
    assert!(!scene.has_component::<Gauge>(b).unwrap());
    assert!(scene.entity(a).unwrap_err().is_invalid_operation());
    assert_eq!(scene.entity(b).unwrap().name(), "B");
}

#[test]
fn activation_announces_every_component_once() {
    setup();
    let mut scene = Scene::new();
    let census = scene.add_system(Census::default()).unwrap();
    let other = Rc::new(RefCell::new(Census::default()));
    scene.component_pool::<Position>().unwrap().register_listener(&other);

    let e = scene.create_entity("Knight");
    scene.add_component(e, Position { x: 1.0, y: 2.0 }).unwrap();
    scene.add_component(e, Health { current: 10, max: 10 }).unwrap();
    scene.add_component(e, Tags(vec!["hero".into()])).unwrap();
    scene.activate(e).unwrap();
    scene.refresh();

    assert_eq!(census.borrow().adds, 3);
    assert_eq!(other.borrow().adds, 1);

    scene.destroy(e).unwrap();
    scene.refresh();
    assert_eq!(census.borrow().removes, 3);
    assert_eq!(other.borrow().removes, 1);
}

#[test]
fn stale_handle_never_resolves_to_new_occupant() {
    setup();
    let mut scene = Scene::new();
    let old = scene.create_entity("old");
    scene.activate(old).unwrap();
    scene.refresh();
    scene.destroy(old).unwrap();
    scene.refresh();

    let new = scene.create_entity("new");
    scene.add_component(new, Health { current: 1, max: 1 }).unwrap();
    assert_eq!(new.id(), old.id());
    assert!(scene.component::<Health>(old).is_err());
    assert!(scene.destroy(old).is_err());
    assert!(scene.activate(old).is_err());
}

#[test]
fn add_child_requires_matching_activation_state() {
    setup();
    let mut scene = Scene::new();
    let active = scene.create_entity("active");
    scene.activate(active).unwrap();
    scene.refresh();
    let inactive = scene.create_entity("inactive");

    let err = scene.add_child(active, inactive).unwrap_err();
    assert!(err.is_invalid_operation());
    let err = scene.add_child(inactive, active).unwrap_err();
    assert!(err.is_invalid_operation());

    scene.activate(inactive).unwrap();
    scene.add_child(active, inactive).unwrap();
    scene.refresh();
    assert_eq!(scene.parent(inactive).unwrap(), Some(active));
}

#[test]
fn destroying_parent_removes_descendants() {
    setup();
    let mut scene = Scene::new();
    let root = scene.create_entity("root");
    let mid = scene.create_entity("mid");
    let leaf = scene.create_entity("leaf");
    scene.add_child(root, mid).unwrap();
    scene.add_child(mid, leaf).unwrap();
    scene.activate(root).unwrap();
    scene.refresh();
    assert_eq!(scene.entity_count(), 3);

    scene.destroy(root).unwrap();
    assert!(scene.entity(leaf).unwrap().record().is_pending_destruction());
    scene.refresh();
    for handle in [root, mid, leaf] {
        assert!(!scene.is_valid(handle));
    }
    assert_eq!(scene.entity_count(), 0);
}

#[test]
fn never_activated_and_pending_destruction_after_refresh() {
    setup();
    let mut scene = Scene::new();
    let handles: Vec<_> = (0..6)
        .map(|i| scene.create_entity(&format!("e{i}")))
        .collect();
    for handle in &handles {
        scene.activate(*handle).unwrap();
    }
    scene.destroy(handles[1]).unwrap();
    scene.refresh();
    scene.destroy(handles[3]).unwrap();
    scene.refresh();

    for entity in scene.entity_pool().iter() {
        assert!(!(entity.is_activated() && entity.is_pending_destruction()));
    }
    assert_eq!(scene.entity_count(), 4);
}

#[test]
fn destroyed_entity_is_not_activated_before_refresh() {
    setup();
    let mut scene = Scene::new();
    let watcher = scene.add_system(GaugeWatcher::default()).unwrap();
    let root = scene.create_entity("root");
    let leaf = scene.create_entity("leaf");
    scene.add_child(root, leaf).unwrap();
    scene.add_component(leaf, Gauge { v: 4 }).unwrap();
    scene.activate(root).unwrap();
    scene.refresh();
    assert_eq!(scene.entity_count(), 2);

    scene.destroy(root).unwrap();
    for handle in [root, leaf] {
        let entity = scene.entity(handle).unwrap();
        assert!(entity.record().is_pending_destruction());
        assert!(!entity.is_activated());
    }
    assert_eq!(scene.entity_count(), 0);
    assert!(scene.find_first_by_name("leaf").is_none());

    scene.refresh();
    assert_eq!(
        watcher.borrow().seen,
        vec![
            (ComponentEventKind::Add, leaf, 4),
            (ComponentEventKind::Remove, leaf, 4)
        ]
    );
    assert!(!scene.is_valid(leaf));
}

fn decode_into_fresh(scene: &Scene) -> Scene {
    let json = scene.to_json().unwrap();
    let mut loaded = Scene::new();
    loaded.load_json(&json).unwrap();
    loaded
}

#[test]
fn round_trip_entity_without_components() {
    setup();
    let mut scene = Scene::new();
    let bare = scene.create_entity("Bare");
    scene.activate(bare).unwrap();
    scene.refresh();

    let loaded = decode_into_fresh(&scene);
    let restored = loaded.find_first(|e| e.name() == "Bare").unwrap();
    assert!(!loaded.has_component::<Position>(restored).unwrap());
    assert_eq!(loaded.encode().unwrap(), scene.encode().unwrap());
}

#[test]
fn round_trip_three_component_types() {
    setup();
    let mut scene = Scene::new();
    let knight = scene.create_entity("Knight");
    scene.add_component(knight, Position { x: -3.5, y: 8.0 }).unwrap();
    scene.add_component(knight, Health { current: 42, max: 50 }).unwrap();
    scene.add_component(knight, Tags(vec!["hero".into(), "blue".into()])).unwrap();
    scene.activate(knight).unwrap();
    scene.refresh();

    let loaded = decode_into_fresh(&scene);
    let restored = loaded.find_first_by_name("Knight").unwrap();
    assert_eq!(
        *loaded.component::<Position>(restored).unwrap(),
        Position { x: -3.5, y: 8.0 }
    );
    assert_eq!(
        *loaded.component::<Health>(restored).unwrap(),
        Health { current: 42, max: 50 }
    );
    assert_eq!(
        loaded.component::<Tags>(restored).unwrap().0,
        vec!["hero".to_string(), "blue".to_string()]
    );
}

#[test]
fn round_trip_three_level_chain() {
    setup();
    let mut scene = Scene::new();
    let grandparent = scene.create_entity("grandparent");
    let parent = scene.create_entity("parent");
    let child = scene.create_entity("child");
    scene.add_child(grandparent, parent).unwrap();
    scene.add_child(parent, child).unwrap();
    scene.add_component(child, Health { current: 3, max: 9 }).unwrap();
    scene.activate(grandparent).unwrap();
    scene.refresh();

    let loaded = decode_into_fresh(&scene);
    assert_eq!(loaded.entity_count(), 3);
    let top = loaded.find_first(|e| e.name() == "grandparent").unwrap();
    let &[middle] = loaded.children(top).unwrap().as_slice() else {
        panic!("expected exactly one child");
    };
    let &[bottom] = loaded.children(middle).unwrap().as_slice() else {
        panic!("expected exactly one grandchild");
    };
    assert_eq!(loaded.entity(middle).unwrap().name(), "parent");
    assert_eq!(loaded.entity(bottom).unwrap().name(), "child");
    assert_eq!(loaded.component::<Health>(bottom).unwrap().max, 9);
    assert_eq!(loaded.root(bottom).unwrap(), top);
}

#[test]
fn replace_and_clone() {
    setup();
    let mut scene = Scene::new();
    let watcher = scene.add_system(GaugeWatcher::default()).unwrap();
    let source = scene.create_entity("source");
    scene.add_component(source, Gauge { v: 5 }).unwrap();
    scene.activate(source).unwrap();
    scene.refresh();

    let old = scene.replace_component(source, Gauge { v: 6 }).unwrap();
    assert_eq!(old.v, 5);
    let kinds: Vec<_> = watcher.borrow().seen.iter().map(|(k, _, v)| (*k, *v)).collect();
    assert_eq!(
        kinds,
        vec![
            (ComponentEventKind::Add, 5),
            (ComponentEventKind::Remove, 5),
            (ComponentEventKind::Add, 6)
        ]
    );

    let copy = scene.clone_entity(source).unwrap();
    assert!(!scene.entity(copy).unwrap().is_activated());
    assert_eq!(scene.component::<Gauge>(copy).unwrap().v, 6);
    assert_eq!(scene.entity(copy).unwrap().name(), "source");
}
