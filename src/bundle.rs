//! Bundles, the component sets an entity is created with.

use std::any::type_name;
use std::mem;
use std::sync::Arc;

use crate::component::Component;
use crate::entity::EntityInfo;
use crate::system::SystemNotFound;
use crate::tag::TypeTag;
use crate::world::World;

/// A set of component values used to create an entity.
///
/// Implemented for tuples of components up to arity 8, including the empty
/// tuple for componentless entities. Every component type must have a
/// registered system in the world the entity is created in.
pub trait Bundle: Send + 'static {
    /// Creates each component of this bundle in its system's store.
    fn write(
        self,
        writer: &mut ComponentWriter<'_>,
    ) -> Result<(), SystemNotFound>;
}

/// Creates bundle components in their systems' stores during entity
/// creation.
///
/// If creation fails partway, the components written so far are destroyed
/// again when the writer is dropped.
pub struct ComponentWriter<'w> {
    world: &'w World,
    infos: Vec<EntityInfo>,
}

impl<'w> ComponentWriter<'w> {
    pub(crate) fn new(world: &'w World) -> Self {
        Self { world, infos: Vec::new() }
    }

    /// Creates `component` in the store of its registered system.
    ///
    /// Returns an error if no system owns `C`.
    pub fn write<C: Component>(
        &mut self,
        component: C,
    ) -> Result<(), SystemNotFound> {
        let entry = self
            .world
            .entry_by_component_tag(TypeTag::of::<C>())
            .ok_or(SystemNotFound(type_name::<C>()))?;

        let component = {
            let mut system = entry.cell.borrow_mut();

            system.create_erased(Box::new(component))
        };

        self.infos.push(EntityInfo {
            system: Arc::clone(&entry.cell),
            component,
            tag: entry.component_tag,
            dispatch: entry.dispatch,
        });

        Ok(())
    }

    pub(crate) fn into_infos(mut self) -> Vec<EntityInfo> {
        mem::take(&mut self.infos)
    }
}

impl Drop for ComponentWriter<'_> {
    fn drop(&mut self) {
        // non-empty only when entity creation failed partway
        for info in &self.infos {
            let mut system = info.system.borrow_mut();

            info.dispatch.destroy(&mut **system, info.component);
        }
    }
}

macro_rules! bundle_impl {
    ($($c:ident),*) => {
        bundle_impl!([] [$($c)*]);
    };

    ([$($c:ident)*] []) => {
        impl<$($c),*> Bundle for ($($c,)*)
        where
            $($c: Component),*
        {
            #[allow(unused, non_snake_case)]
            fn write(
                self,
                writer: &mut ComponentWriter<'_>,
            ) -> Result<(), SystemNotFound> {
                let ($($c,)*) = self;

                $(
                    writer.write($c)?;
                )*

                Ok(())
            }
        }
    };

    ([$($rest:ident)*] [$head:ident $($tail:ident)*]) => {
        bundle_impl!([$($rest)*] []);
        bundle_impl!([$($rest)* $head] [$($tail)*]);
    };
}

bundle_impl!(C0, C1, C2, C3, C4, C5, C6, C7);
