//! A staged ECS runtime with deferred entity lifecycles.
//!
//! Applications embed a [`World`](world::World), register one
//! [`System`](system::System) per component type and drive it with a fixed
//! tick: [`pre_update`](world::World::pre_update) →
//! [`update(delta)`](world::World::update) →
//! [`post_update`](world::World::post_update). Entity creation and
//! destruction are deferred: the population only changes at the end of
//! `post_update`, when the world advances each entity through the
//! `None → Initializing → Running → Teardown` lifecycle, one state per tick.
//!
//! ```
//! use tickstage::prelude::*;
//!
//! struct Health(u32);
//!
//! #[derive(Default)]
//! struct HealthSystem {
//!     store: Store<Health>,
//! }
//!
//! impl System for HealthSystem {
//!     type Component = Health;
//!
//!     fn store(&self) -> &Store<Health> {
//!         &self.store
//!     }
//!
//!     fn store_mut(&mut self) -> &mut Store<Health> {
//!         &mut self.store
//!     }
//!
//!     fn update(&mut self, _delta: f32) {
//!         self.store.for_each_mut(|_entity, health| health.0 += 1);
//!     }
//! }
//!
//! let mut world = World::new();
//!
//! world.register_system(HealthSystem::default());
//!
//! let entity = world.create_entity((Health(10),)).unwrap();
//!
//! world.pre_update();
//! world.update(0.016);
//! world.post_update();
//!
//! assert_eq!(entity.component::<Health>().unwrap().0, 11);
//! ```

#![forbid(unsafe_code)]

pub mod bundle;
pub mod component;
pub mod entity;
pub mod system;
mod tag;
pub mod world;

/// Re-export of all items in this crate.
pub mod prelude {
    pub use crate::bundle::*;
    pub use crate::component::*;
    pub use crate::entity::*;
    pub use crate::system::*;
    pub use crate::world::*;
}
