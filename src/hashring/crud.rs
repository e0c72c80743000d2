use std::{
    fmt::Debug,
    hash::{BuildHasher, Hash},
};

use tracing::{debug, trace};

use super::{HashRing, VirtualNode};

impl<T, S> HashRing<T, S>
where
    T: Hash + Eq + Clone + Debug,
    S: BuildHasher,
{
    /// Add `node` to the hash ring.
    /// Returns false and leaves the ring untouched if `node` is already a member
    pub fn add(&mut self, node: T) -> bool {
        if self.members.contains_key(&node) {
            trace!(?node, "node already on the ring");
            return false;
        }

        // hash all replicas before touching the ring, a node is either fully placed or absent
        let positions = self.virtual_positions(&node);

        for position in positions {
            if let Some(previous) = self.ring.insert(position, node.clone()) {
                debug!(position, ?previous, ?node, "virtual position collision, last write wins");
                self.shadowed.entry(position).or_default().push(previous);
            }
        }

        debug!(?node, replica_count = self.replica_count, "added node to ring");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.members.insert(node.clone(), seq);
        self.join_order.insert(seq, node);
        true
    }

    pub fn batch_add(&mut self, nodes: Vec<T>) {
        for node in nodes {
            self.add(node);
        }
    }

    /// Remove `node` from the hash ring.
    /// Returns false if `node` was not a member
    pub fn remove(&mut self, node: &T) -> bool {
        if !self.members.contains_key(node) {
            trace!(?node, "node not on the ring");
            return false;
        }

        let positions = self.virtual_positions(node);

        if let Some(seq) = self.members.remove(node) {
            self.join_order.remove(&seq);
        }

        let mut vacated = 0;
        for position in positions {
            if self.ring.get(&position) != Some(node) {
                // overwritten by a later node, which keeps the position
                self.forget_claim(position, node);
                continue;
            }

            match self.take_latest_claim(position) {
                Some(claimant) => {
                    trace!(position, node = ?claimant, "reclaimed virtual position");
                    self.ring.insert(position, claimant);
                }
                None => {
                    self.ring.remove(&position);
                    vacated += 1;
                }
            }
        }

        debug!(?node, vacated, "removed node from ring");
        true
    }

    // the member that joined last among those whose claim on `position` was overwritten
    fn take_latest_claim(&mut self, position: u64) -> Option<T> {
        let claimants = self.shadowed.get_mut(&position)?;
        let latest = claimants.pop();
        if claimants.is_empty() {
            self.shadowed.remove(&position);
        }
        latest
    }

    fn forget_claim(&mut self, position: u64, node: &T) {
        if let Some(claimants) = self.shadowed.get_mut(&position) {
            claimants.retain(|n| n != node);
            if claimants.is_empty() {
                self.shadowed.remove(&position);
            }
        }
    }

    // sorted, distinct positions of all replicas of `node`
    fn virtual_positions(&self, node: &T) -> Vec<u64> {
        let mut positions: Vec<u64> = (0..self.replica_count)
            .map(|replica| self.position_of(&VirtualNode::new(node, replica)))
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }
}

impl<T, S> HashRing<T, S>
where
    S: BuildHasher,
{
    /// returns the node responsible for `key`
    /// Returns None if the ring is empty
    pub fn get<K>(&self, key: &K) -> Option<&T>
    where
        K: Hash + ?Sized,
    {
        let position = self.position_of(key);

        // first position at or after the key, wrapping around to the lowest position
        self.ring
            .range(position..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, node)| node)
    }

    /// returns up to `count` distinct nodes for `key`, walking clockwise from its position
    /// The first node is the one returned by `get`. Returns an empty array if the ring is empty
    pub fn successors<K>(&self, key: &K, count: usize) -> Vec<&T>
    where
        K: Hash + ?Sized,
        T: PartialEq,
    {
        let limit = count.min(self.len());
        let mut nodes: Vec<&T> = Vec::with_capacity(limit);

        if limit == 0 {
            return nodes;
        }

        let position = self.position_of(key);
        let after = self.ring.range(position..);
        let before = self.ring.range(..position);

        for (_, node) in after.chain(before) {
            if !nodes.contains(&node) {
                nodes.push(node);

                if nodes.len() == limit {
                    break;
                }
            }
        }

        nodes
    }

    /// The point of `key` in the hash space, in `0..modulus`
    pub fn position_of<K>(&self, key: &K) -> u64
    where
        K: Hash + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);

        match self.modulus {
            Some(modulus) if modulus > 0 => hash % modulus,
            _ => hash,
        }
    }
}
