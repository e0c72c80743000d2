use std::ops::RangeInclusive;

#[cfg(feature = "derive")]
use serde::{Deserialize, Serialize};

use super::HashRing;

/// HashRange contains a range of the hash space and the node owning all keys within it
///
/// * `hash_range` - positions of keys that are assigned to `node`. Careful: multiple ranges belong to each node, one per virtual position
/// * `node` - owner of the range
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "derive", derive(Serialize, Deserialize))]
pub struct HashRange<T> {
    pub hash_range: RangeInclusive<u64>,
    pub node: T,
}

/// Reassignment describes a range of the hash space whose keys moved between two ring states
///
/// * `hash_range` - positions of the keys that moved
/// * `from` - owner in the previous ring
/// * `to` - owner in the current ring
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "derive", derive(Serialize, Deserialize))]
pub struct Reassignment<T> {
    pub hash_range: RangeInclusive<u64>,
    pub from: T,
    pub to: T,
}

impl<T, S> HashRing<T, S>
where
    T: Clone + PartialEq,
{
    /// Splits the hash space into ranges, each owned by the node at the range's upper end.
    /// The keys above the highest position wrap around to the owner of the lowest position.
    /// Ranges are returned in ascending order and cover the whole space without gaps.
    /// Returns an empty array if the ring is empty
    pub fn hash_ranges(&self) -> Vec<HashRange<T>> {
        let max = self.max_position();
        let mut ranges = vec![];

        let (first, last) = match (self.ring.iter().next(), self.ring.iter().next_back()) {
            (Some(first), Some(last)) => (first, last),
            _ => return ranges,
        };

        if self.members.len() == 1 {
            ranges.push(HashRange {
                hash_range: 0..=max,
                node: first.1.clone(),
            });
            return ranges;
        }

        ranges.push(HashRange {
            hash_range: 0..=*first.0,
            node: first.1.clone(),
        });

        let mut left = *first.0;
        for (&right, node) in self.ring.iter().skip(1) {
            ranges.push(HashRange {
                hash_range: left + 1..=right,
                node: node.clone(),
            });
            left = right;
        }

        if *last.0 < max {
            ranges.push(HashRange {
                hash_range: last.0 + 1..=max,
                node: first.1.clone(),
            });
        }

        ranges
    }

    /// Calculates which ranges of the hash space changed their owner from `previous` to this
    /// ring, for example after nodes joined or left. Adjacent ranges that moved between the
    /// same pair of nodes are merged. Keys outside the returned ranges kept their node.
    ///
    /// Both rings need to use the same hash builder and modulus for the result to be meaningful.
    /// Returns an empty array if either ring is empty
    ///
    /// # Examples
    ///
    /// ```
    /// use consistent_ring::HashRing;
    ///
    /// let mut ring = HashRing::new(10);
    /// ring.batch_add(vec!["NodeA", "NodeB"]);
    ///
    /// let mut grown = ring.clone();
    /// grown.add("NodeC");
    ///
    /// // only keys handed over to the new node move
    /// let moved = grown.reassignments(&ring);
    /// assert!(!moved.is_empty());
    /// assert!(moved.iter().all(|r| r.to == "NodeC"));
    /// ```
    pub fn reassignments<S2>(&self, previous: &HashRing<T, S2>) -> Vec<Reassignment<T>> {
        let from = previous.hash_ranges();
        let to = self.hash_ranges();

        let mut moved: Vec<Reassignment<T>> = vec![];
        let (mut i, mut j) = (0, 0);

        while i < from.len() && j < to.len() {
            let before = &from[i];
            let after = &to[j];

            if before.node != after.node {
                if let Some(range) = intersect(&before.hash_range, &after.hash_range) {
                    push_merged(&mut moved, range, &before.node, &after.node);
                }
            }

            match before.hash_range.end().cmp(after.hash_range.end()) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }

        moved
    }
}

fn push_merged<T>(moved: &mut Vec<Reassignment<T>>, range: RangeInclusive<u64>, from: &T, to: &T)
where
    T: Clone + PartialEq,
{
    if let Some(last) = moved.last_mut() {
        if last.from == *from
            && last.to == *to
            && *last.hash_range.end() < u64::MAX
            && last.hash_range.end() + 1 == *range.start()
        {
            last.hash_range = *last.hash_range.start()..=*range.end();
            return;
        }
    }

    moved.push(Reassignment {
        hash_range: range,
        from: from.clone(),
        to: to.clone(),
    });
}

fn intersect<T: Ord + Copy>(
    a: &RangeInclusive<T>,
    b: &RangeInclusive<T>,
) -> Option<RangeInclusive<T>> {
    let start = *a.start().max(b.start());
    let end = *a.end().min(b.end());

    if start <= end {
        Some(start..=end)
    } else {
        None
    }
}
