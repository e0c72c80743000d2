use std::collections::btree_map;

use super::HashRing;

/// Iterates over `(position, node)` pairs of a ring in ascending position order
pub struct Positions<'a, T> {
    ring: btree_map::Iter<'a, u64, T>,
}

impl<'a, T> Iterator for Positions<'a, T> {
    type Item = (u64, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.ring.next().map(|(position, node)| (*position, node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ring.size_hint()
    }
}

impl<T> DoubleEndedIterator for Positions<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.ring.next_back().map(|(position, node)| (*position, node))
    }
}

impl<T> ExactSizeIterator for Positions<'_, T> {}

impl<T, S> HashRing<T, S> {
    /// All virtual positions with their owning node, lowest position first
    pub fn positions(&self) -> Positions<'_, T> {
        Positions {
            ring: self.ring.iter(),
        }
    }
}

impl<'a, T, S> IntoIterator for &'a HashRing<T, S> {
    type Item = (u64, &'a T);

    type IntoIter = Positions<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions()
    }
}

/// Yields the owner of every virtual position in ring order
pub struct HashRingIterator<T> {
    ring: btree_map::IntoValues<u64, T>,
}

impl<T> Iterator for HashRingIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.ring.next()
    }
}

impl<T, S> IntoIterator for HashRing<T, S> {
    type Item = T;

    type IntoIter = HashRingIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        HashRingIterator {
            ring: self.ring.into_values(),
        }
    }
}
