//! Builds a small solar system, lets a system spin it for a few ticks, then
//! tears down one planet and its moons.
//!
//! Run with `RUST_LOG=debug cargo run --example scene_hierarchy`.

use glam::Vec3;
use hearth::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Orbit {
    radius: f32,
    speed: f32,
    angle: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Position(Vec3);

/// Advances every orbit and writes the resulting position.
#[derive(Default)]
struct OrbitSystem {
    bodies: Vec<EntityHandle>,
}

impl EventListener<ComponentEvent<Orbit>> for OrbitSystem {
    fn receive_event(&mut self, event: &ComponentEvent<Orbit>) {
        match event.kind {
            ComponentEventKind::Add => self.bodies.push(event.entity),
            ComponentEventKind::Remove => self.bodies.retain(|body| *body != event.entity),
        }
    }
}

impl System for OrbitSystem {
    fn subscribe(subscriber: &mut Subscriber<'_, Self>) -> Result<()> {
        subscriber.component_events::<Orbit>()
    }

    fn initialize(&mut self, _scene: &mut Scene) {
        log::info!("Orbit system ready");
    }

    fn tick(&mut self, scene: &mut Scene, dt: f64) {
        for &body in &self.bodies {
            let Ok(orbit) = scene.component_mut::<Orbit>(body) else {
                continue;
            };
            orbit.angle += orbit.speed * dt as f32;
            let offset = Vec3::new(orbit.angle.cos(), 0.0, orbit.angle.sin()) * orbit.radius;
            if let Ok(position) = scene.component_mut::<Position>(body) {
                position.0 = offset;
            }
        }
    }
}

fn spawn_body(scene: &mut Scene, name: &str, radius: f32, speed: f32) -> Result<EntityHandle> {
    let body = scene.create_entity(name);
    scene
        .entity_mut(body)?
        .add(Orbit {
            radius,
            speed,
            angle: 0.0,
        })?
        .add(Position::default())?;
    Ok(body)
}

fn main() -> Result<()> {
    env_logger::init();
    registry::register::<Orbit>();
    registry::register::<Position>();

    let mut scene = Scene::new();
    let orbits = scene.add_system(OrbitSystem::default())?;

    let sun = scene.create_entity("Sun");
    let earth = spawn_body(&mut scene, "Earth", 10.0, 1.0)?;
    let moon = spawn_body(&mut scene, "Moon", 1.5, 12.0)?;
    let mars = spawn_body(&mut scene, "Mars", 15.0, 0.5)?;
    scene.add_child(sun, earth)?;
    scene.add_child(earth, moon)?;
    scene.add_child(sun, mars)?;
    scene.activate(sun)?;
    scene.refresh();

    for _ in 0..10 {
        scene.tick(1.0 / 60.0);
        scene.refresh();
    }
    println!("{} bodies in orbit", orbits.borrow().bodies.len());

    scene.for_descendants(sun, |body| {
        if let Some(position) = body.get::<Position>() {
            println!("{:<6} at {:?}", body.name(), position.0);
        }
    })?;

    scene.destroy(earth)?;
    scene.refresh();
    println!(
        "After losing Earth: {} entities, {} bodies in orbit",
        scene.entity_count(),
        orbits.borrow().bodies.len()
    );
    Ok(())
}
