//! Components, the plain data records aggregated by entities.

use std::num::NonZeroU64;

use thiserror::Error;

pub use self::store::*;

mod store;

/// A value that can be stored in a [`Store`] and attached to an entity.
///
/// Implemented for any type that can be shared between threads. The runtime
/// treats components opaquely; all behavior lives in the
/// [`System`](crate::system::System) owning the component's type.
pub trait Component: Send + Sync + 'static {}

impl<C: Send + Sync + 'static> Component for C {}

/// An identifier for a live component within one system's [`Store`].
///
/// Equals the 1-based index of the component's slot. Slots are recycled
/// after a component is destroyed, so a `ComponentUid` is only unique while
/// its component is alive. An absent component is
/// `Option::<ComponentUid>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentUid(NonZeroU64);

impl ComponentUid {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(NonZeroU64::MIN.saturating_add(index as u64))
    }

    pub(crate) fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// The raw, non-zero value of this uid.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// An error for when a requested component was not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ComponentNotFound {
    /// No occupied slot carries the requested uid.
    #[error("component not found: {0:?}")]
    Uid(ComponentUid),
    /// The entity owns no component of the requested type.
    #[error("component not found: {0}")]
    Type(&'static str),
}
