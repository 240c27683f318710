//! Entities, the immovable aggregates of components.

use std::any::type_name;
use std::fmt;
use std::num::NonZeroU64;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use atomic_refcell::{AtomicRef, AtomicRefMut};
use thiserror::Error;

use crate::component::{Component, ComponentNotFound, ComponentUid};
use crate::system::{ComponentDispatch, SystemCell};
use crate::tag::TypeTag;

#[cfg(test)]
mod tests;

/// An identifier for an entity.
///
/// Drawn from a world-local monotonic counter and never reused for the
/// lifetime of the world. Entities compare and order by their uid. An
/// absent entity is `Option::<EntityUid>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityUid(NonZeroU64);

impl EntityUid {
    pub(crate) fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// The raw, non-zero value of this uid.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// An error for when a requested entity was not found in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("entity not found: {0:?}")]
pub struct EntityNotFound(pub EntityUid);

/// The lifecycle state of an entity.
///
/// States only ever advance. The world performs at most one transition per
/// entity per [`post_update`](crate::world::World::post_update), so an
/// entity spends at least one full tick in every state it reaches before
/// its components are destroyed.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityState {
    /// Created this tick; invisible to the lifecycle until the next
    /// `post_update`.
    None = 0,
    /// Promoted out of the new bucket; systems may set the entity up.
    Initializing = 1,
    /// The steady state.
    Running = 2,
    /// Flagged for destruction; components die at the next `post_update`.
    Teardown = 3,
}

/// One component owned by an entity: the type-erased system cell, the
/// component's uid in that system's store, the component type tag and the
/// static dispatch table for per-type operations.
pub(crate) struct EntityInfo {
    pub system: SystemCell,
    pub component: ComponentUid,
    pub tag: TypeTag,
    pub dispatch: &'static dyn ComponentDispatch,
}

/// An immovable aggregate of components.
///
/// Entities live behind [`Arc`]s handed out by
/// [`World::create_entity`](crate::world::World::create_entity) and
/// [`World::find_entity`](crate::world::World::find_entity); they are never
/// relocated once created. The set of owned components is fixed at
/// creation; lifecycle state advances only during the world's
/// `post_update`.
pub struct Entity {
    uid: EntityUid,
    state: AtomicU8,
    released: AtomicBool,
    infos: Vec<EntityInfo>,
}

/// A borrow of a component, resolved through its owning entity.
pub struct ComponentRef<'e, C: Component> {
    inner: AtomicRef<'e, C>,
}

/// A mutable borrow of a component, resolved through its owning entity.
pub struct ComponentMut<'e, C: Component> {
    inner: AtomicRefMut<'e, C>,
}

impl Entity {
    /// Allocates the entity and wires the back-pointer of every owned
    /// component to it.
    pub(crate) fn new(uid: EntityUid, infos: Vec<EntityInfo>) -> Arc<Self> {
        let entity = Arc::new(Self {
            uid,
            state: AtomicU8::new(EntityState::None as u8),
            released: AtomicBool::new(false),
            infos,
        });

        for info in &entity.infos {
            let mut system = info.system.borrow_mut();

            info.dispatch.set_owner(&mut **system, info.component, &entity);
        }

        entity
    }

    /// The identifier of this entity.
    pub fn uid(&self) -> EntityUid {
        self.uid
    }

    /// The current lifecycle state of this entity.
    pub fn state(&self) -> EntityState {
        match self.state.load(Ordering::Acquire) {
            0 => EntityState::None,
            1 => EntityState::Initializing,
            2 => EntityState::Running,
            _ => EntityState::Teardown,
        }
    }

    /// Whether this entity owns a component of type `C`.
    ///
    /// The component type must match exactly.
    pub fn has_component<C: Component>(&self) -> bool {
        self.info_of::<C>().is_some()
    }

    /// Borrows this entity's component of type `C`, or `None` if it owns
    /// none.
    pub fn find_component<C: Component>(&self) -> Option<ComponentRef<'_, C>> {
        let info = self.info_of::<C>()?;
        let system = info.system.borrow();
        let inner = AtomicRef::filter_map(system, |system| {
            info.dispatch.find(&**system, info.component)?.downcast_ref()
        })?;

        Some(ComponentRef { inner })
    }

    /// Mutably borrows this entity's component of type `C`, or `None` if it
    /// owns none.
    pub fn find_component_mut<C: Component>(
        &self,
    ) -> Option<ComponentMut<'_, C>> {
        let info = self.info_of::<C>()?;
        let system = info.system.borrow_mut();
        let inner = AtomicRefMut::filter_map(system, |system| {
            info.dispatch.find_mut(&mut **system, info.component)?.downcast_mut()
        })?;

        Some(ComponentMut { inner })
    }

    /// Borrows this entity's component of type `C`.
    ///
    /// Returns an error if the entity owns no component of that type.
    pub fn component<C: Component>(
        &self,
    ) -> Result<ComponentRef<'_, C>, ComponentNotFound> {
        self.find_component()
            .ok_or(ComponentNotFound::Type(type_name::<C>()))
    }

    /// Mutably borrows this entity's component of type `C`.
    ///
    /// Returns an error if the entity owns no component of that type.
    pub fn component_mut<C: Component>(
        &self,
    ) -> Result<ComponentMut<'_, C>, ComponentNotFound> {
        self.find_component_mut()
            .ok_or(ComponentNotFound::Type(type_name::<C>()))
    }

    /// Advances the lifecycle state, then notifies the system of every
    /// owned component in info order.
    ///
    /// # Panics
    ///
    /// Panics if `to` does not advance the current state.
    pub(crate) fn change_state(&self, to: EntityState) {
        let prev = self.state.swap(to as u8, Ordering::AcqRel);

        assert!(prev < to as u8, "entity state must advance");

        for info in &self.infos {
            let mut system = info.system.borrow_mut();

            info.dispatch.notify_state_changed(
                &mut **system,
                info.component,
                self,
            );
        }
    }

    /// Destroys every owned component, in info order. Idempotent.
    pub(crate) fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        for info in &self.infos {
            let mut system = info.system.borrow_mut();

            info.dispatch.destroy(&mut **system, info.component);
        }
    }

    fn info_of<C: Component>(&self) -> Option<&EntityInfo> {
        let tag = TypeTag::of::<C>();

        self.infos.iter().find(|info| info.tag == tag)
    }
}

impl Drop for Entity {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("uid", &self.uid)
            .field("state", &self.state())
            .field(
                "components",
                &self
                    .infos
                    .iter()
                    .map(|info| info.tag.type_name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<C: Component> Deref for ComponentRef<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.inner
    }
}

impl<C: Component> Deref for ComponentMut<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.inner
    }
}

impl<C: Component> DerefMut for ComponentMut<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}

impl<C: Component + fmt::Debug> fmt::Debug for ComponentRef<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<C: Component + fmt::Debug> fmt::Debug for ComponentMut<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}
