extern crate siphasher;

use siphasher::sip::SipHasher;
use std::collections::{BTreeMap, HashMap, btree_map};
use std::hash::{BuildHasher, Hash, Hasher};

use crate::{Config, Error};

mod crud;
mod iterator;
pub mod ranges;

pub use iterator::{HashRingIterator, Positions};

/// Builds SipHashers with fixed keys, so positions are identical across processes
#[derive(Clone, PartialEq, Debug, Default)]
pub struct DefaultHashBuilder;

impl BuildHasher for DefaultHashBuilder {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new()
    }
}

// VirtualNode is the hash input of one virtual position: the node, a ':' separator and
// the replica index. The index is written as little-endian u64 bytes, so it does not depend
// on the host's pointer width or byte order.
struct VirtualNode<'a, T> {
    node: &'a T,
    replica: u64,
}

impl<'a, T> VirtualNode<'a, T> {
    fn new(node: &'a T, replica: usize) -> VirtualNode<'a, T> {
        VirtualNode {
            node,
            replica: replica as u64,
        }
    }
}

impl<T: Hash> Hash for VirtualNode<'_, T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
        state.write_u8(b':');
        state.write(&self.replica.to_le_bytes());
    }
}

/// HashRing places every node at `replica_count` virtual positions of a circular hash space
/// and assigns each key to the node owning the first position at or after the key's hash
///
/// All positions live in one ordered map, so the sorted order and the owner lookup can never
/// disagree. Colliding positions are resolved by last write wins.
#[derive(Clone, Debug)]
pub struct HashRing<T, S = DefaultHashBuilder> {
    hash_builder: S,
    ring: BTreeMap<u64, T>,
    // earlier claimants of overwritten positions in join order, the last one takes over
    // when the owner leaves
    shadowed: BTreeMap<u64, Vec<T>>,
    // node -> join sequence, and the reverse index keeping join order
    members: HashMap<T, u64>,
    join_order: BTreeMap<u64, T>,
    next_seq: u64,
    replica_count: usize,
    modulus: Option<u64>,
}

impl<T> Default for HashRing<T> {
    fn default() -> Self {
        HashRing::with_hasher(Config::default().replica_count, DefaultHashBuilder)
    }
}

impl<T> HashRing<T> {
    /// Create a new `HashRing` over the full `u64` hash space.
    ///
    /// # Arguments
    ///
    /// * `replica_count` - number of virtual positions per real node (higher number means more even distribution of keys across all nodes, but more ring entries). 0 is raised to 1
    pub fn new(replica_count: usize) -> HashRing<T> {
        HashRing::with_hasher(replica_count, DefaultHashBuilder)
    }

    /// Create a new `HashRing` from a validated [`Config`]
    pub fn from_config(config: &Config) -> Result<HashRing<T>, Error> {
        HashRing::with_config_and_hasher(config, DefaultHashBuilder)
    }
}

impl<T, S> HashRing<T, S> {
    /// Creates an empty `HashRing` which will use the given hash builder.
    ///
    /// # Arguments
    ///
    /// * `replica_count` - number of virtual positions per real node. 0 is raised to 1
    /// * `hash_builder` - implementation of BuildHasher to provide a Hasher for the HashRing
    ///
    /// # Examples
    ///
    /// ```
    /// use consistent_ring::HashRing;
    /// use siphasher::sip::SipHasher13;
    /// use std::hash::BuildHasher;
    ///
    /// #[derive(Clone, Debug)]
    /// pub struct SipHash13Builder;
    ///
    /// impl BuildHasher for SipHash13Builder {
    ///     type Hasher = SipHasher13;
    ///
    ///     fn build_hasher(&self) -> Self::Hasher {
    ///         SipHasher13::new()
    ///     }
    /// }
    ///
    /// let mut ring: HashRing<String, SipHash13Builder> = HashRing::with_hasher(100, SipHash13Builder);
    /// ring.add("cache-1".to_string());
    /// assert_eq!(Some(&"cache-1".to_string()), ring.get("some key"));
    /// ```
    pub fn with_hasher(replica_count: usize, hash_builder: S) -> HashRing<T, S> {
        HashRing::empty(replica_count.max(1), None, hash_builder)
    }

    /// Creates an empty `HashRing` from a [`Config`] and the given hash builder.
    /// Fails if the config is invalid
    pub fn with_config_and_hasher(
        config: &Config,
        hash_builder: S,
    ) -> Result<HashRing<T, S>, Error> {
        config.validate()?;

        Ok(HashRing::empty(
            config.replica_count,
            config.modulus,
            hash_builder,
        ))
    }

    fn empty(replica_count: usize, modulus: Option<u64>, hash_builder: S) -> HashRing<T, S> {
        HashRing {
            hash_builder,
            ring: BTreeMap::new(),
            shadowed: BTreeMap::new(),
            members: HashMap::new(),
            join_order: BTreeMap::new(),
            next_seq: 0,
            replica_count,
            modulus,
        }
    }

    /// Get the number of real nodes in the hash ring.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Get the number of virtual positions in the hash ring.
    /// This is `len() * replica_count()` unless positions collided
    pub fn vlen(&self) -> usize {
        self.ring.len()
    }

    /// Returns true if the ring has no nodes.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn replica_count(&self) -> usize {
        self.replica_count
    }

    /// Size of the hash space, `None` for the full `u64` range
    pub fn modulus(&self) -> Option<u64> {
        self.modulus
    }

    /// All real nodes in the order they were added
    pub fn nodes(&self) -> btree_map::Values<'_, u64, T> {
        self.join_order.values()
    }

    pub fn contains(&self, node: &T) -> bool
    where
        T: Hash + Eq,
    {
        self.members.contains_key(node)
    }

    // highest position of the hash space
    fn max_position(&self) -> u64 {
        match self.modulus {
            Some(modulus) if modulus > 0 => modulus - 1,
            _ => u64::MAX,
        }
    }
}

// Two rings are equal if they route every key the same way, now and after any member
// leaves, regardless of the order their members joined in.
impl<T, S> PartialEq for HashRing<T, S>
where
    T: Hash + Eq,
{
    fn eq(&self, other: &HashRing<T, S>) -> bool {
        self.replica_count == other.replica_count
            && self.modulus == other.modulus
            && self.members.len() == other.members.len()
            && self.members.keys().all(|n| other.members.contains_key(n))
            && self.ring == other.ring
            && self.shadowed == other.shadowed
    }
}
