use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{AnySystem, System};
use crate::component::ComponentUid;
use crate::entity::Entity;

/// Per-component-type operations an entity performs on its type-erased
/// systems.
///
/// One `'static` implementation exists per registered system type, obtained
/// from [`dispatch_for`]. Keeping these thunks out of [`AnySystem`] lets an
/// entity command a system without naming its concrete type and without the
/// world mediating.
pub(crate) trait ComponentDispatch: Send + Sync {
    /// Empties the component's slot in the system's store.
    fn destroy(&self, system: &mut dyn AnySystem, component: ComponentUid);

    /// Stores the owner back-pointer of a freshly created component.
    ///
    /// # Panics
    ///
    /// Panics if the component's slot is empty.
    fn set_owner(
        &self,
        system: &mut dyn AnySystem,
        component: ComponentUid,
        owner: &Arc<Entity>,
    );

    /// Routes an entity state transition to the system's
    /// [`on_entity_state_changed`](System::on_entity_state_changed) hook.
    fn notify_state_changed(
        &self,
        system: &mut dyn AnySystem,
        component: ComponentUid,
        entity: &Entity,
    );

    /// Returns the component as [`Any`], or `None` if its slot is empty.
    fn find<'a>(
        &self,
        system: &'a dyn AnySystem,
        component: ComponentUid,
    ) -> Option<&'a dyn Any>;

    /// Returns the component as [`Any`], or `None` if its slot is empty.
    fn find_mut<'a>(
        &self,
        system: &'a mut dyn AnySystem,
        component: ComponentUid,
    ) -> Option<&'a mut dyn Any>;
}

/// Returns the static dispatch table of `S`.
pub(crate) const fn dispatch_for<S: System>() -> &'static dyn ComponentDispatch
{
    &PhantomData::<S>
}

impl<S: System> ComponentDispatch for PhantomData<S> {
    fn destroy(&self, system: &mut dyn AnySystem, component: ComponentUid) {
        downcast_mut::<S>(system).store_mut().destroy(component);
    }

    fn set_owner(
        &self,
        system: &mut dyn AnySystem,
        component: ComponentUid,
        owner: &Arc<Entity>,
    ) {
        downcast_mut::<S>(system)
            .store_mut()
            .set_owner(component, Arc::downgrade(owner));
    }

    fn notify_state_changed(
        &self,
        system: &mut dyn AnySystem,
        component: ComponentUid,
        entity: &Entity,
    ) {
        let system = downcast_mut::<S>(system);

        debug_assert!(
            system.store().owner(component).is_some(),
            "state change notification for a component without an owner"
        );

        system.on_entity_state_changed(component, entity);
    }

    fn find<'a>(
        &self,
        system: &'a dyn AnySystem,
        component: ComponentUid,
    ) -> Option<&'a dyn Any> {
        downcast_ref::<S>(system)
            .store()
            .find(component)
            .map(|component| component as &dyn Any)
    }

    fn find_mut<'a>(
        &self,
        system: &'a mut dyn AnySystem,
        component: ComponentUid,
    ) -> Option<&'a mut dyn Any> {
        downcast_mut::<S>(system)
            .store_mut()
            .find_mut(component)
            .map(|component| component as &mut dyn Any)
    }
}

fn downcast_ref<S: System>(system: &dyn AnySystem) -> &S {
    system.as_any().downcast_ref().expect("system type mismatch in dispatch")
}

fn downcast_mut<S: System>(system: &mut dyn AnySystem) -> &mut S {
    system
        .as_any_mut()
        .downcast_mut()
        .expect("system type mismatch in dispatch")
}
