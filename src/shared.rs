//! Synchronized access to a [`HashRing`] for concurrent callers.

use std::fmt::Debug;
use std::hash::{BuildHasher, Hash};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::hashring::{DefaultHashBuilder, HashRing};
use crate::{Config, Error};

/// Cloneable handle to a ring shared between threads.
///
/// Lookups run concurrently under a read lock. Membership changes take the write lock for
/// the whole node, so readers never see a node with only part of its virtual positions.
pub struct SharedHashRing<T, S = DefaultHashBuilder> {
    inner: Arc<RwLock<HashRing<T, S>>>,
}

impl<T, S> Clone for SharedHashRing<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S> From<HashRing<T, S>> for SharedHashRing<T, S> {
    fn from(ring: HashRing<T, S>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ring)),
        }
    }
}

impl<T> SharedHashRing<T> {
    pub fn new(replica_count: usize) -> Self {
        Self::from(HashRing::new(replica_count))
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self::from(HashRing::from_config(config)?))
    }
}

impl<T, S> SharedHashRing<T, S> {
    // A ring is never left half-updated: positions are hashed before the ring is
    // mutated. A poisoned lock still guards a consistent ring.
    fn read_lock(&self) -> RwLockReadGuard<'_, HashRing<T, S>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, HashRing<T, S>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against a consistent view of the ring
    pub fn read<R>(&self, f: impl FnOnce(&HashRing<T, S>) -> R) -> R {
        f(&self.read_lock())
    }

    pub fn len(&self) -> usize {
        self.read_lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_lock().is_empty()
    }

    /// Copy of the current ring that is unaffected by later membership changes
    pub fn snapshot(&self) -> HashRing<T, S>
    where
        T: Clone,
        S: Clone,
    {
        self.read_lock().clone()
    }
}

impl<T, S> SharedHashRing<T, S>
where
    T: Hash + Eq + Clone + Debug,
    S: BuildHasher,
{
    /// Adds `node` with all of its virtual positions. No-op for members
    pub fn add_node(&self, node: T) -> bool {
        self.write_lock().add(node)
    }

    /// Adds all `nodes` under a single write lock
    pub fn batch_add(&self, nodes: Vec<T>) {
        let mut ring = self.write_lock();
        debug!(count = nodes.len(), "adding nodes to shared ring");
        ring.batch_add(nodes);
    }

    /// Removes `node` with all of its virtual positions. No-op for strangers
    pub fn remove_node(&self, node: &T) -> bool {
        self.write_lock().remove(node)
    }

    /// The node responsible for `key`, None if the ring is empty
    pub fn get_node<K>(&self, key: &K) -> Option<T>
    where
        K: Hash + ?Sized,
    {
        self.read_lock().get(key).cloned()
    }
}
