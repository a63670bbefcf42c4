//! Saves a scene to JSON and loads it back into a fresh scene.
//!
//! Run with `cargo run --example scene_save_load [path]`. Without a path the
//! JSON is only printed.

use glam::{Quat, Vec3};
use hearth::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Inventory {
    items: Vec<String>,
}

fn build(scene: &mut Scene) -> Result<EntityHandle> {
    let player = scene.create_entity("Player");
    scene.add_component(
        player,
        Transform {
            translation: Vec3::new(0.0, 1.0, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        },
    )?;
    scene.add_component(
        player,
        Inventory {
            items: vec!["rope".into(), "lantern".into()],
        },
    )?;

    let camera = scene.create_entity("Camera");
    scene.add_child(player, camera)?;
    scene.set_transient(camera, true)?;

    let sword = scene.entity_mut(player)?.spawn_child("Sword")?;
    scene.add_component(
        sword,
        Transform {
            translation: Vec3::new(0.3, 0.0, 0.1),
            rotation: Quat::from_rotation_z(0.5),
            scale: Vec3::ONE,
        },
    )?;
    Ok(player)
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    registry::register::<Transform>();
    registry::register::<Inventory>();

    let mut scene = Scene::new();
    let player = build(&mut scene)?;
    scene.activate(player)?;
    scene.refresh();

    let json = scene.to_json()?;
    println!("{json}");
    if let Some(path) = std::env::args().nth(1) {
        std::fs::write(&path, &json)?;
        log::info!("Saved scene to {path}");
    }

    let mut loaded = Scene::new();
    let roots = loaded.load_json(&json)?;
    println!(
        "Loaded {} root(s), {} entities (the transient camera was not saved)",
        roots.len(),
        loaded.entity_count()
    );
    for root in roots {
        loaded.for_descendants(root, |entity| {
            if let Some(transform) = entity.get::<Transform>() {
                println!("  {} at {:?}", entity.name(), transform.translation);
            }
        })?;
    }
    Ok(())
}
