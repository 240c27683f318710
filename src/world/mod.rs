//! The [`World`], owner of all systems and entities.

use std::any::type_name;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use atomic_refcell::AtomicRefCell;
use indexmap::IndexSet;

use crate::bundle::{Bundle, ComponentWriter};
use crate::component::Component;
use crate::entity::{Entity, EntityNotFound, EntityState, EntityUid};
use crate::system::{
    dispatch_for,
    ComponentDispatch,
    StoreMut,
    StoreRef,
    System,
    SystemCell,
    SystemMut,
    SystemNotFound,
    SystemRef,
};
use crate::tag::TypeTag;


/// The container of systems and entities that drives the tick.
///
/// A tick is one call each to [`pre_update`](World::pre_update),
/// [`update`](World::update) and [`post_update`](World::post_update), in
/// that order. Every phase forwards to the registered systems in
/// registration order. Entity lifecycle transitions happen only at the end
/// of `post_update`, so all three phases observe the same running
/// population.
///
/// The world is `Sync`: [`create_entity`](World::create_entity) and
/// [`destroy_entity_later`](World::destroy_entity_later) take `&self` and
/// may be called from any thread. Everything else belongs to the thread
/// driving the tick.
pub struct World {
    /// Registration-ordered; at most one entry per system type and per
    /// component type.
    systems: Vec<SystemEntry>,
    next_uid: AtomicU64,
    /// Entities created since the last `post_update`, sorted by uid.
    new: Mutex<Vec<Arc<Entity>>>,
    /// Entities promoted out of `new` at the last `post_update`.
    initializing: Vec<Arc<Entity>>,
    /// The steady-state population, sorted by uid.
    running: Vec<Arc<Entity>>,
    /// Entities whose components are destroyed at the next `post_update`.
    teardown: Vec<Arc<Entity>>,
    destroy_requests: DestroyQueue,
}

pub(crate) struct SystemEntry {
    pub system_tag: TypeTag,
    pub component_tag: TypeTag,
    pub dispatch: &'static dyn ComponentDispatch,
    pub cell: SystemCell,
}

/// A cloneable handle for queueing entity destruction.
///
/// Usable from any thread and from within system hooks, which see no world.
/// Requests are deduplicated and applied at the end of the next
/// [`post_update`](World::post_update); unknown uids are ignored.
#[derive(Clone, Default)]
pub struct DestroyQueue {
    requests: Arc<Mutex<IndexSet<EntityUid>>>,
}

impl DestroyQueue {
    /// Queues the entity of `uid` for destruction.
    pub fn destroy_later(&self, uid: EntityUid) {
        self.requests.lock().unwrap().insert(uid);
    }

    fn take(&self) -> IndexSet<EntityUid> {
        mem::take(&mut *self.requests.lock().unwrap())
    }
}

impl World {
    /// Creates an empty world.
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            next_uid: AtomicU64::new(1),
            new: Mutex::default(),
            initializing: Vec::new(),
            running: Vec::new(),
            teardown: Vec::new(),
            destroy_requests: DestroyQueue::default(),
        }
    }

    /// Registers `system` as the owner of its component type.
    ///
    /// Systems tick in registration order. Registering a system that shares
    /// its concrete type or its component type with an existing registration
    /// replaces that registration in place, destroying the old system and
    /// its components. Must be called between ticks.
    pub fn register_system<S: System>(&mut self, system: S) -> SystemMut<'_, S> {
        let entry = SystemEntry {
            system_tag: TypeTag::of::<S>(),
            component_tag: TypeTag::of::<S::Component>(),
            dispatch: dispatch_for::<S>(),
            cell: Arc::new(AtomicRefCell::new(Box::new(system) as _)),
        };

        let index = if let Some(index) = self.systems.iter().position(|existing| {
            existing.system_tag == entry.system_tag
                || existing.component_tag == entry.component_tag
        }) {
            self.systems[index] = entry;

            index
        } else {
            self.systems.push(entry);

            self.systems.len() - 1
        };

        SystemMut::new(self.systems[index].cell.borrow_mut())
    }

    /// Borrows the registered system of concrete type `S`, or `None` if
    /// none is registered.
    pub fn find_system<S: System>(&self) -> Option<SystemRef<'_, S>> {
        self.entry_by_system_tag(TypeTag::of::<S>())
            .map(|entry| SystemRef::new(entry.cell.borrow()))
    }

    /// Mutably borrows the registered system of concrete type `S`, or
    /// `None` if none is registered.
    pub fn find_system_mut<S: System>(&self) -> Option<SystemMut<'_, S>> {
        self.entry_by_system_tag(TypeTag::of::<S>())
            .map(|entry| SystemMut::new(entry.cell.borrow_mut()))
    }

    /// Borrows the registered system of concrete type `S`.
    ///
    /// Returns an error if none is registered.
    pub fn system<S: System>(&self) -> Result<SystemRef<'_, S>, SystemNotFound> {
        self.find_system().ok_or(SystemNotFound(type_name::<S>()))
    }

    /// Mutably borrows the registered system of concrete type `S`.
    ///
    /// Returns an error if none is registered.
    pub fn system_mut<S: System>(
        &self,
    ) -> Result<SystemMut<'_, S>, SystemNotFound> {
        self.find_system_mut().ok_or(SystemNotFound(type_name::<S>()))
    }

    /// Borrows the store of the system owning component type `C`, or
    /// `None` if no system owns it.
    pub fn find_system_by_component<C: Component>(
        &self,
    ) -> Option<StoreRef<'_, C>> {
        self.entry_by_component_tag(TypeTag::of::<C>())
            .map(|entry| StoreRef::new(entry.cell.borrow()))
    }

    /// Mutably borrows the store of the system owning component type `C`,
    /// or `None` if no system owns it.
    pub fn find_system_by_component_mut<C: Component>(
        &self,
    ) -> Option<StoreMut<'_, C>> {
        self.entry_by_component_tag(TypeTag::of::<C>())
            .map(|entry| StoreMut::new(entry.cell.borrow_mut()))
    }

    /// Borrows the store of the system owning component type `C`.
    ///
    /// Returns an error if no system owns it.
    pub fn system_by_component<C: Component>(
        &self,
    ) -> Result<StoreRef<'_, C>, SystemNotFound> {
        self.find_system_by_component()
            .ok_or(SystemNotFound(type_name::<C>()))
    }

    /// Mutably borrows the store of the system owning component type `C`.
    ///
    /// Returns an error if no system owns it.
    pub fn system_by_component_mut<C: Component>(
        &self,
    ) -> Result<StoreMut<'_, C>, SystemNotFound> {
        self.find_system_by_component_mut()
            .ok_or(SystemNotFound(type_name::<C>()))
    }

    /// Creates an entity owning one component per element of `bundle`.
    ///
    /// May be called from any thread. The entity starts in
    /// [`EntityState::None`] and is promoted to
    /// [`EntityState::Initializing`] at the next `post_update`.
    ///
    /// Returns an error if any component type in the bundle has no
    /// registered system; components created before the failure are
    /// destroyed again.
    pub fn create_entity<B: Bundle>(
        &self,
        bundle: B,
    ) -> Result<Arc<Entity>, SystemNotFound> {
        // the lock spans the uid draw and the insertion so the bucket stays
        // sorted under concurrent creation
        let mut new = self.new.lock().unwrap();

        let uid = EntityUid::new(self.next_uid.fetch_add(1, Ordering::Relaxed))
            .expect("entity uid counter overflowed");

        let mut writer = ComponentWriter::new(self);

        bundle.write(&mut writer)?;

        let entity = Entity::new(uid, writer.into_infos());

        new.push(Arc::clone(&entity));

        Ok(entity)
    }

    /// Queues the entity of `uid` for destruction at the end of the next
    /// `post_update`.
    ///
    /// May be called from any thread. Unknown and duplicate uids are
    /// no-ops.
    pub fn destroy_entity_later(&self, uid: EntityUid) {
        self.destroy_requests.destroy_later(uid);
    }

    /// Returns a cloneable handle for queueing destruction requests, e.g.
    /// from within system hooks.
    pub fn destroy_queue(&self) -> DestroyQueue {
        self.destroy_requests.clone()
    }

    /// Looks up an entity in any lifecycle bucket, or `None` if no live
    /// entity carries `uid`.
    pub fn find_entity(&self, uid: EntityUid) -> Option<Arc<Entity>> {
        let new = self.new.lock().unwrap();

        bucket_find(&self.running, uid)
            .or_else(|| bucket_find(&self.initializing, uid))
            .or_else(|| bucket_find(&new, uid))
            .or_else(|| bucket_find(&self.teardown, uid))
    }

    /// Looks up an entity in any lifecycle bucket.
    ///
    /// Returns an error if no live entity carries `uid`.
    pub fn entity(&self, uid: EntityUid) -> Result<Arc<Entity>, EntityNotFound> {
        self.find_entity(uid).ok_or(EntityNotFound(uid))
    }

    /// First tick phase: forwards to every system in registration order.
    pub fn pre_update(&mut self) {
        for entry in &self.systems {
            entry.cell.borrow_mut().pre_update();
        }
    }

    /// Second tick phase: forwards to every system in registration order.
    pub fn update(&mut self, delta: f32) {
        debug_assert!(delta >= 0.0, "tick delta must be non-negative");

        for entry in &self.systems {
            entry.cell.borrow_mut().update(delta);
        }
    }

    /// Third tick phase: forwards to every system in registration order,
    /// then advances the entity lifecycle state machine.
    ///
    /// In order: initializing entities are promoted to running, newly
    /// created entities to initializing, entities that spent the last tick
    /// in teardown are destroyed, and queued destruction requests move
    /// their entities into teardown. An entity created this tick therefore
    /// observes exactly one tick in each state it reaches.
    pub fn post_update(&mut self) {
        for entry in &self.systems {
            entry.cell.borrow_mut().post_update();
        }

        self.promote_initializing();
        self.promote_new();
        self.process_destruction();
    }

    pub(crate) fn entry_by_component_tag(
        &self,
        tag: TypeTag,
    ) -> Option<&SystemEntry> {
        self.systems.iter().find(|entry| entry.component_tag == tag)
    }

    fn entry_by_system_tag(&self, tag: TypeTag) -> Option<&SystemEntry> {
        self.systems.iter().find(|entry| entry.system_tag == tag)
    }

    fn promote_initializing(&mut self) {
        if self.initializing.is_empty() {
            return;
        }

        for entity in &self.initializing {
            entity.change_state(EntityState::Running);
        }

        // uids are monotonic, so appending keeps `running` sorted
        self.running.append(&mut self.initializing);
    }

    fn promote_new(&mut self) {
        let new = mem::take(&mut *self.new.lock().unwrap());

        if new.is_empty() {
            return;
        }

        for entity in &new {
            entity.change_state(EntityState::Initializing);
        }

        debug_assert!(self.initializing.is_empty());

        self.initializing = new;
    }

    fn process_destruction(&mut self) {
        // entities flagged a tick ago have now spent one full tick in
        // teardown; dropping the last bucket reference releases their
        // components
        for entity in self.teardown.drain(..) {
            entity.release();
        }

        let requests = self.destroy_requests.take();

        if requests.is_empty() {
            return;
        }

        let mut requests: Vec<_> = requests.into_iter().collect();

        requests.sort_unstable();

        let mut doomed = Vec::new();

        {
            let mut new = self.new.lock().unwrap();

            for &uid in &requests {
                let entity = bucket_take(&mut self.running, uid)
                    .or_else(|| bucket_take(&mut self.initializing, uid))
                    .or_else(|| bucket_take(&mut new, uid));

                doomed.extend(entity);
            }
        }

        // the lock is released before the hooks run; a teardown hook may
        // create entities or queue further requests
        for entity in doomed {
            entity.change_state(EntityState::Teardown);
            self.teardown.push(entity);
        }
    }
}

fn bucket_find(bucket: &[Arc<Entity>], uid: EntityUid) -> Option<Arc<Entity>> {
    bucket
        .binary_search_by_key(&uid, |entity| entity.uid())
        .ok()
        .map(|index| Arc::clone(&bucket[index]))
}

fn bucket_take(
    bucket: &mut Vec<Arc<Entity>>,
    uid: EntityUid,
) -> Option<Arc<Entity>> {
    bucket
        .binary_search_by_key(&uid, |entity| entity.uid())
        .ok()
        .map(|index| bucket.remove(index))
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field(
                "systems",
                &self
                    .systems
                    .iter()
                    .map(|entry| entry.system_tag)
                    .collect::<Vec<_>>(),
            )
            .field("new", &self.new.lock().unwrap().len())
            .field("initializing", &self.initializing.len())
            .field("running", &self.running.len())
            .field("teardown", &self.teardown.len())
            .finish()
    }
}
