use super::*;
use crate::component::Store;
use crate::system::System;
use crate::world::World;

struct Health(u32);

#[derive(Default)]
struct HealthSystem {
    store: Store<Health>,
}

impl System for HealthSystem {
    type Component = Health;

    fn store(&self) -> &Store<Health> {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Store<Health> {
        &mut self.store
    }
}

struct Name(&'static str);

#[derive(Default)]
struct NameSystem {
    store: Store<Name>,
}

impl System for NameSystem {
    type Component = Name;

    fn store(&self) -> &Store<Name> {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Store<Name> {
        &mut self.store
    }
}

fn world() -> World {
    let mut world = World::new();

    world.register_system(HealthSystem::default());
    world.register_system(NameSystem::default());

    world
}

#[test]
fn uid_and_state_of_a_fresh_entity() {
    let world = world();
    let entity = world.create_entity((Health(10),)).unwrap();

    assert_eq!(entity.uid().get(), 1);
    assert_eq!(entity.state(), EntityState::None);
}

#[test]
fn typed_component_queries() {
    let world = world();
    let entity =
        world.create_entity((Health(10), Name("violet"))).unwrap();

    assert!(entity.has_component::<Health>());
    assert!(entity.has_component::<Name>());
    assert!(!entity.has_component::<u32>());

    assert_eq!(entity.component::<Health>().unwrap().0, 10);
    assert_eq!(entity.component::<Name>().unwrap().0, "violet");

    assert!(entity.find_component::<u32>().is_none());
    assert!(matches!(
        entity.component::<u32>(),
        Err(ComponentNotFound::Type(_))
    ));
}

#[test]
fn mutable_borrows_are_visible_through_shared_ones() {
    let world = world();
    let entity = world.create_entity((Health(10),)).unwrap();

    entity.component_mut::<Health>().unwrap().0 = 3;

    assert_eq!(entity.component::<Health>().unwrap().0, 3);
    assert!(entity.find_component_mut::<Name>().is_none());
}

#[test]
fn change_state_advances() {
    let world = world();
    let entity = world.create_entity((Health(1),)).unwrap();

    entity.change_state(EntityState::Initializing);

    assert_eq!(entity.state(), EntityState::Initializing);

    entity.change_state(EntityState::Running);

    assert_eq!(entity.state(), EntityState::Running);
}

#[test]
#[should_panic(expected = "entity state must advance")]
fn change_state_rejects_regressions() {
    let entity = Entity::new(EntityUid::new(1).unwrap(), Vec::new());

    entity.change_state(EntityState::Running);
    entity.change_state(EntityState::Initializing);
}

#[test]
#[should_panic(expected = "entity state must advance")]
fn change_state_rejects_repeats() {
    let entity = Entity::new(EntityUid::new(1).unwrap(), Vec::new());

    entity.change_state(EntityState::Running);
    entity.change_state(EntityState::Running);
}

#[test]
fn release_destroys_owned_components_once() {
    let world = world();
    let entity =
        world.create_entity((Health(10), Name("violet"))).unwrap();

    assert_eq!(world.system_by_component::<Health>().unwrap().len(), 1);
    assert_eq!(world.system_by_component::<Name>().unwrap().len(), 1);

    entity.release();

    assert!(world.system_by_component::<Health>().unwrap().is_empty());
    assert!(world.system_by_component::<Name>().unwrap().is_empty());
    assert!(entity.find_component::<Health>().is_none());

    // a second release is a no-op
    entity.release();

    assert!(world.system_by_component::<Health>().unwrap().is_empty());
}

#[test]
fn entities_order_by_uid() {
    let world = world();
    let a = world.create_entity(()).unwrap();
    let b = world.create_entity(()).unwrap();

    assert!(a.uid() < b.uid());
}
