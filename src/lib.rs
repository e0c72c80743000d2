//! An in-memory consistent hashing ring
//!
//! Keys are assigned to a dynamic set of nodes. Each node is placed on the ring at
//! `replica_count` virtual positions, and a key belongs to the node owning the first
//! position at or after the key's hash, wrapping around at the top of the hash space.
//! Adding or removing a node only moves the keys whose successor position changed.
//!
//! ```
//! use consistent_ring::HashRing;
//!
//! let mut ring = HashRing::new(3);
//! ring.batch_add(vec!["NodeA", "NodeB", "NodeC"]);
//!
//! let before = *ring.get(&"apple").unwrap();
//! ring.remove(&"NodeB");
//! let after = *ring.get(&"apple").unwrap();
//!
//! assert_ne!(after, "NodeB");
//! if before != "NodeB" {
//!     assert_eq!(before, after);
//! }
//! ```
//!
//! [`SharedHashRing`] wraps a ring for concurrent callers, allowing parallel lookups while
//! membership changes are applied atomically.

#[cfg(feature = "derive")]
use serde::{Deserialize, Serialize};

mod hashring;
mod shared;

pub use hashring::ranges::{HashRange, Reassignment};
pub use hashring::{DefaultHashBuilder, HashRing, HashRingIterator, Positions};
pub use shared::SharedHashRing;

/// Construction parameters of a [`HashRing`]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "derive", derive(Serialize, Deserialize))]
pub struct Config {
    /// number of virtual positions to create per real node
    pub replica_count: usize,
    /// size of the hash space; positions and keys are reduced into `0..modulus`.
    /// `None` uses the full `u64` range
    pub modulus: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            replica_count: 160,
            modulus: None,
        }
    }
}

impl Config {
    pub fn new(replica_count: usize) -> Config {
        Config {
            replica_count,
            modulus: None,
        }
    }

    pub fn with_modulus(mut self, modulus: u64) -> Config {
        self.modulus = Some(modulus);
        self
    }

    /// Checks that the config describes a usable ring
    pub fn validate(&self) -> Result<(), Error> {
        if self.replica_count == 0 {
            return Err(Error::InvalidReplicaCount);
        }
        if self.modulus == Some(0) {
            return Err(Error::EmptyHashSpace);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("replica count must be at least 1")]
    InvalidReplicaCount,

    #[error("hash space modulus must be greater than 0")]
    EmptyHashSpace,
}
