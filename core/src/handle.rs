//! Typed generational handles into a [`ResourcePool`](crate::pool::ResourcePool).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Opaque reference to a logical resource handed out by a pool.
///
/// A handle is a `(slot index, generation)` pair. It does not own anything:
/// it stays usable only while the slot's stored generation matches, which
/// stops being true as soon as the resource is released or the pool is torn
/// down.
///
/// The type parameter ties a handle to the resource kind of the pool that
/// produced it, so a buffer handle cannot be passed to an image pool.
pub struct ResourceHandle<R> {
    index: u32,
    generation: u64,
    _marker: PhantomData<fn() -> R>,
}

impl<R> ResourceHandle<R> {
    pub(crate) fn new(index: u32, generation: u64) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Slot index this handle points at.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the slot had when this handle was issued.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// Manual impls so that handles are `Copy` regardless of `R`.

impl<R> Clone for ResourceHandle<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for ResourceHandle<R> {}

impl<R> PartialEq for ResourceHandle<R> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<R> Eq for ResourceHandle<R> {}

impl<R> Hash for ResourceHandle<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<R> fmt::Debug for ResourceHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct NotCopy;

    #[test]
    fn test_handle_is_copy_for_any_resource() {
        let a = ResourceHandle::<NotCopy>::new(3, 7);
        let b = a;
        assert_eq!(a, b);
        assert_eq!(a.index(), 3);
        assert_eq!(a.generation(), 7);
    }

    #[test]
    fn test_handle_equality_uses_generation() {
        let a = ResourceHandle::<NotCopy>::new(1, 0);
        let b = ResourceHandle::<NotCopy>::new(1, 1);
        assert_ne!(a, b);

        let set: HashSet<_> = [a, b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_handle_debug() {
        let h = ResourceHandle::<NotCopy>::new(2, 5);
        assert_eq!(
            format!("{h:?}"),
            "ResourceHandle { index: 2, generation: 5 }"
        );
    }
}
