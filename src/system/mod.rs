//! Systems, the owners and updaters of one component type each.

use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use atomic_refcell::{AtomicRef, AtomicRefCell, AtomicRefMut};
use thiserror::Error;

pub(crate) use self::dispatch::*;
use crate::component::{Component, ComponentUid, Store};
use crate::entity::Entity;

mod dispatch;

/// A unit of simulation logic owning every component of one type.
///
/// A system wraps a [`Store`] of its component type and is driven by the
/// world's tick: [`pre_update`](System::pre_update),
/// [`update`](System::update) and [`post_update`](System::post_update) run
/// once per tick in system registration order. All hooks default to no-ops.
///
/// Exactly one system per component type can be registered in a world at a
/// time.
pub trait System: Send + Sync + 'static {
    /// The component type owned by this system.
    type Component: Component;

    /// The store holding this system's components.
    fn store(&self) -> &Store<Self::Component>;

    /// The store holding this system's components.
    fn store_mut(&mut self) -> &mut Store<Self::Component>;

    /// First tick phase.
    fn pre_update(&mut self) {}

    /// Second tick phase. `delta` is the time step chosen by the host.
    fn update(&mut self, _delta: f32) {}

    /// Third tick phase. After every system ran this hook, the world
    /// advances the entity lifecycle state machine.
    fn post_update(&mut self) {}

    /// Called whenever the entity owning `component` changes lifecycle
    /// state.
    ///
    /// The component itself is fetched from [`store_mut`](System::store_mut)
    /// with the given uid. During the
    /// [`Teardown`](crate::entity::EntityState::Teardown) transition the
    /// entity's components are still alive and may be observed; they are
    /// destroyed at the following `post_update`. The hook must not destroy
    /// the entity synchronously, but it may queue a destruction request
    /// through a [`DestroyQueue`](crate::world::DestroyQueue).
    fn on_entity_state_changed(
        &mut self,
        _component: ComponentUid,
        _entity: &Entity,
    ) {
    }
}

/// An error for when a requested system is not registered in the world.
///
/// Carries the name of the system type, or of the component type for
/// by-component lookups.
#[derive(Debug, Clone, Copy, Error)]
#[error("system not found: {0}")]
pub struct SystemNotFound(pub &'static str);

/// Object-safe surface of [`System`] used by the world and by entities.
pub(crate) trait AnySystem: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The system's store as [`Any`], for downcasts keyed by component type.
    fn store_any(&self) -> &dyn Any;

    fn store_any_mut(&mut self) -> &mut dyn Any;

    /// Creates a component from a type-erased value.
    ///
    /// # Panics
    ///
    /// Panics if the value is not of this system's component type.
    fn create_erased(&mut self, component: Box<dyn Any>) -> ComponentUid;

    fn pre_update(&mut self);

    fn update(&mut self, delta: f32);

    fn post_update(&mut self);
}

impl<S: System> AnySystem for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn store_any(&self) -> &dyn Any {
        self.store()
    }

    fn store_any_mut(&mut self) -> &mut dyn Any {
        self.store_mut()
    }

    fn create_erased(&mut self, component: Box<dyn Any>) -> ComponentUid {
        let component = component
            .downcast::<S::Component>()
            .ok()
            .expect("component value type mismatch");

        self.store_mut().create(*component)
    }

    fn pre_update(&mut self) {
        System::pre_update(self);
    }

    fn update(&mut self, delta: f32) {
        System::update(self, delta);
    }

    fn post_update(&mut self) {
        System::post_update(self);
    }
}

/// Shared ownership of a type-erased system.
///
/// Held by the world's registry and by every entity owning one of the
/// system's components. Borrows are checked at runtime.
pub(crate) type SystemCell = Arc<AtomicRefCell<Box<dyn AnySystem>>>;

/// A borrow of a registered system, looked up by its concrete type.
pub struct SystemRef<'w, S: System> {
    inner: AtomicRef<'w, S>,
}

impl<S: System> fmt::Debug for SystemRef<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemRef").finish_non_exhaustive()
    }
}

/// A mutable borrow of a registered system, looked up by its concrete type.
pub struct SystemMut<'w, S: System> {
    inner: AtomicRefMut<'w, S>,
}

/// A borrow of a system's store, looked up by its component type.
pub struct StoreRef<'w, C: Component> {
    inner: AtomicRef<'w, Store<C>>,
}

/// A mutable borrow of a system's store, looked up by its component type.
pub struct StoreMut<'w, C: Component> {
    inner: AtomicRefMut<'w, Store<C>>,
}

impl<'w, S: System> SystemRef<'w, S> {
    pub(crate) fn new(system: AtomicRef<'w, Box<dyn AnySystem>>) -> Self {
        let inner = AtomicRef::map(system, |system| {
            system
                .as_any()
                .downcast_ref()
                .expect("system entry holds a different system type")
        });

        Self { inner }
    }
}

impl<'w, S: System> SystemMut<'w, S> {
    pub(crate) fn new(system: AtomicRefMut<'w, Box<dyn AnySystem>>) -> Self {
        let inner = AtomicRefMut::map(system, |system| {
            system
                .as_any_mut()
                .downcast_mut()
                .expect("system entry holds a different system type")
        });

        Self { inner }
    }
}

impl<'w, C: Component> StoreRef<'w, C> {
    pub(crate) fn new(system: AtomicRef<'w, Box<dyn AnySystem>>) -> Self {
        let inner = AtomicRef::map(system, |system| {
            system
                .store_any()
                .downcast_ref()
                .expect("system entry owns a different component type")
        });

        Self { inner }
    }
}

impl<'w, C: Component> StoreMut<'w, C> {
    pub(crate) fn new(system: AtomicRefMut<'w, Box<dyn AnySystem>>) -> Self {
        let inner = AtomicRefMut::map(system, |system| {
            system
                .store_any_mut()
                .downcast_mut()
                .expect("system entry owns a different component type")
        });

        Self { inner }
    }
}

impl<S: System> Deref for SystemRef<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: System> Deref for SystemMut<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: System> DerefMut for SystemMut<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<C: Component> Deref for StoreRef<'_, C> {
    type Target = Store<C>;

    fn deref(&self) -> &Store<C> {
        &self.inner
    }
}

impl<C: Component> Deref for StoreMut<'_, C> {
    type Target = Store<C>;

    fn deref(&self) -> &Store<C> {
        &self.inner
    }
}

impl<C: Component> DerefMut for StoreMut<'_, C> {
    fn deref_mut(&mut self) -> &mut Store<C> {
        &mut self.inner
    }
}
