use std::fmt;
use std::sync::{Arc, Weak};

use super::{Component, ComponentNotFound, ComponentUid};
use crate::entity::Entity;

/// A slot-recycling container of components, one per registered system.
///
/// Each occupied slot pairs a component with a back-pointer to its owning
/// entity. The first empty slot in index order is reused before the store
/// grows, so a destroyed component's uid is handed to the next creation.
pub struct Store<C> {
    slots: Vec<Option<Slot<C>>>,
    len: usize,
}

struct Slot<C> {
    /// Unset between component creation and entity construction.
    owner: Option<Weak<Entity>>,
    component: C,
}

impl<C: Component> Store<C> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self { slots: Vec::new(), len: 0 }
    }

    /// Count of live components.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the store holds no live components.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `uid` names an occupied slot.
    pub fn contains(&self, uid: ComponentUid) -> bool {
        self.slot(uid).is_some()
    }

    /// Places a component in the first empty slot, growing the store if all
    /// slots are occupied. Returns the uid of the slot.
    ///
    /// The owner back-pointer starts unset; the owning entity wires it
    /// during construction.
    pub fn create(&mut self, component: C) -> ComponentUid {
        self.len += 1;

        let slot = Some(Slot { owner: None, component });

        if let Some(index) = self.slots.iter().position(Option::is_none) {
            self.slots[index] = slot;

            ComponentUid::from_index(index)
        } else {
            self.slots.push(slot);

            ComponentUid::from_index(self.slots.len() - 1)
        }
    }

    /// Creates a component from a closure.
    pub fn create_with(&mut self, creator: impl FnOnce() -> C) -> ComponentUid {
        self.create(creator())
    }

    /// Empties the slot of `uid`.
    ///
    /// Requests for already-destroyed or out-of-range uids are no-ops.
    pub fn destroy(&mut self, uid: ComponentUid) {
        if let Some(slot) = self.slots.get_mut(uid.index()) {
            if slot.take().is_some() {
                self.len -= 1;
            }
        }
    }

    /// Returns the component of `uid`, or `None` if the slot is empty or
    /// out of range.
    pub fn find(&self, uid: ComponentUid) -> Option<&C> {
        self.slot(uid).map(|slot| &slot.component)
    }

    /// Returns the component of `uid`, or `None` if the slot is empty or
    /// out of range.
    pub fn find_mut(&mut self, uid: ComponentUid) -> Option<&mut C> {
        self.slot_mut(uid).map(|slot| &mut slot.component)
    }

    /// Returns the component of `uid`.
    ///
    /// Returns an error if the slot is empty or out of range.
    pub fn component(&self, uid: ComponentUid) -> Result<&C, ComponentNotFound> {
        self.find(uid).ok_or(ComponentNotFound::Uid(uid))
    }

    /// Returns the component of `uid`.
    ///
    /// Returns an error if the slot is empty or out of range.
    pub fn component_mut(
        &mut self,
        uid: ComponentUid,
    ) -> Result<&mut C, ComponentNotFound> {
        self.find_mut(uid).ok_or(ComponentNotFound::Uid(uid))
    }

    /// Calls `action` with every live component and its owning entity, in
    /// slot-index order.
    ///
    /// # Panics
    ///
    /// Panics if a visited component's owner has not been set.
    pub fn for_each(&self, mut action: impl FnMut(&Entity, &C)) {
        for slot in self.slots.iter().flatten() {
            action(&slot.owner(), &slot.component);
        }
    }

    /// Calls `action` with every live component and its owning entity, in
    /// slot-index order.
    ///
    /// # Panics
    ///
    /// Panics if a visited component's owner has not been set.
    pub fn for_each_mut(&mut self, mut action: impl FnMut(&Entity, &mut C)) {
        for slot in self.slots.iter_mut().flatten() {
            let owner = slot.owner();

            action(&owner, &mut slot.component);
        }
    }

    /// Stores the owner back-pointer of an occupied slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is empty or out of range.
    pub(crate) fn set_owner(&mut self, uid: ComponentUid, owner: Weak<Entity>) {
        let slot =
            self.slot_mut(uid).expect("cannot set the owner of an empty slot");

        slot.owner = Some(owner);
    }

    /// Returns the owning entity of the component of `uid`, if the slot is
    /// occupied and the owner has been set.
    pub(crate) fn owner(&self, uid: ComponentUid) -> Option<Arc<Entity>> {
        self.slot(uid).and_then(|slot| slot.owner.as_ref()?.upgrade())
    }

    fn slot(&self, uid: ComponentUid) -> Option<&Slot<C>> {
        self.slots.get(uid.index()).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, uid: ComponentUid) -> Option<&mut Slot<C>> {
        self.slots.get_mut(uid.index()).and_then(Option::as_mut)
    }
}

impl<C> Slot<C> {
    fn owner(&self) -> Arc<Entity> {
        self.owner
            .as_ref()
            .and_then(Weak::upgrade)
            .expect("component owner not set")
    }
}

impl<C: Component> Default for Store<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Store<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("len", &self.len)
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityUid;

    #[test]
    fn create_reuses_the_first_empty_slot() {
        let mut store = Store::new();

        let a = store.create(1_u32);
        let b = store.create(2);
        let c = store.create(3);

        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        assert_eq!(c.get(), 3);

        store.destroy(b);

        assert_eq!(store.len(), 2);
        assert_eq!(store.create(4), b);
        assert_eq!(store.find(b), Some(&4));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn destroy_tolerates_dead_uids() {
        let mut store = Store::new();

        let a = store.create(1_u32);

        store.destroy(a);
        store.destroy(a);
        store.destroy(ComponentUid::from_index(100));

        assert!(store.is_empty());
    }

    #[test]
    fn lookups_on_an_empty_store() {
        let store = Store::<u32>::new();

        assert_eq!(store.len(), 0);
        assert!(store.is_empty());

        let first = ComponentUid::from_index(0);
        let max = ComponentUid::from_index(usize::MAX - 1);

        assert_eq!(store.find(first), None);
        assert_eq!(store.find(max), None);
        assert_eq!(store.component(first), Err(ComponentNotFound::Uid(first)));
    }

    #[test]
    fn create_with_runs_the_creator() {
        let mut store = Store::new();
        let uid = store.create_with(|| 7_u32);

        assert_eq!(store.component(uid), Ok(&7));
    }

    #[test]
    fn for_each_visits_in_slot_order() {
        let owner = Entity::new(EntityUid::new(1).unwrap(), Vec::new());
        let mut store = Store::new();

        let uids =
            [store.create(10_u32), store.create(20), store.create(30)];

        for uid in uids {
            store.set_owner(uid, Arc::downgrade(&owner));
        }

        store.destroy(uids[1]);

        let mut seen = Vec::new();

        store.for_each(|entity, component| {
            assert_eq!(entity.uid(), owner.uid());
            seen.push(*component);
        });

        assert_eq!(seen, [10, 30]);

        store.for_each_mut(|_, component| *component += 1);

        assert_eq!(store.find(uids[0]), Some(&11));
        assert_eq!(store.find(uids[2]), Some(&31));
    }

    #[test]
    #[should_panic(expected = "owner of an empty slot")]
    fn set_owner_requires_an_occupied_slot() {
        let owner = Entity::new(EntityUid::new(1).unwrap(), Vec::new());
        let mut store = Store::<u32>::new();

        store.set_owner(ComponentUid::from_index(0), Arc::downgrade(&owner));
    }
}
