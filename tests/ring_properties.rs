use std::time::{Duration, Instant};

use consistent_ring::{Config, HashRing};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng, distr::Alphanumeric, rngs::StdRng};

fn random_keys(count: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|_| {
            (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(12)
                .map(char::from)
                .collect()
        })
        .collect()
}

fn ring_of(nodes: &[&str], replica_count: usize) -> HashRing<String> {
    let mut ring = HashRing::new(replica_count);
    ring.batch_add(nodes.iter().map(|n| n.to_string()).collect());
    ring
}

fn assignments(ring: &HashRing<String>, keys: &[String]) -> Vec<String> {
    keys.iter()
        .map(|key| ring.get(key.as_str()).cloned().unwrap_or_default())
        .collect()
}

#[test]
fn fruit_keys_after_removing_node_b() {
    let mut ring = ring_of(&["NodeA", "NodeB", "NodeC"], 3);
    let nodes = ["NodeA", "NodeB", "NodeC"];

    let mut before = vec![];
    for key in ["apple", "banana", "cherry"] {
        let node = ring.get(key).cloned().unwrap();
        assert!(nodes.contains(&node.as_str()), "{key} routed to {node}");
        before.push(node);
    }

    assert!(ring.remove(&"NodeB".to_string()));

    for (key, previous) in ["apple", "banana", "cherry"].iter().zip(before) {
        let node = ring.get(*key).cloned().unwrap();
        assert_ne!("NodeB", node);
        if previous != "NodeB" {
            assert_eq!(previous, node, "{key} moved although its node stayed");
        }
    }
}

#[test]
fn assignments_are_deterministic() {
    let keys = random_keys(2_000);

    let ring = ring_of(&["NodeA", "NodeB", "NodeC"], 50);
    let same = ring_of(&["NodeA", "NodeB", "NodeC"], 50);
    let reordered = ring_of(&["NodeC", "NodeA", "NodeB"], 50);

    let expected = assignments(&ring, &keys);
    assert_eq!(expected, assignments(&ring, &keys));
    assert_eq!(expected, assignments(&same, &keys));
    assert_eq!(expected, assignments(&reordered, &keys));
    assert_eq!(ring, reordered);
}

#[test]
fn positions_are_pinned() {
    // SipHash-2-4 with zero keys over the key's bytes and the 0xff str terminator,
    // no per-process seed
    let ring: HashRing<&str> = HashRing::new(1);
    assert_eq!(10549519590246242588, ring.position_of("apple"));
    assert_eq!(3133855342755220099, ring.position_of("banana"));

    // "NodeA", 0xff, ':', replica 0 as little-endian u64
    let mut ring: HashRing<String> = HashRing::new(1);
    ring.add("NodeA".to_string());
    let positions: Vec<u64> = ring.positions().map(|(position, _)| position).collect();
    assert_eq!(vec![9665489534040599891], positions);
}

#[test]
fn non_empty_ring_covers_every_key() {
    let keys = random_keys(5_000);
    let mut ring = HashRing::new(1);
    ring.add("only".to_string());

    for key in &keys {
        assert_eq!(Some(&"only".to_string()), ring.get(key.as_str()));
    }

    ring.batch_add(vec!["second".to_string(), "third".to_string()]);
    assert!(keys.iter().all(|key| ring.get(key.as_str()).is_some()));

    ring.remove(&"only".to_string());
    ring.remove(&"second".to_string());
    ring.remove(&"third".to_string());
    assert!(keys.iter().all(|key| ring.get(key.as_str()).is_none()));
}

#[test]
fn keys_above_the_highest_position_wrap_around() {
    let ring = ring_of(&["NodeA", "NodeB", "NodeC"], 3);

    let (lowest, lowest_owner) = ring.positions().next().unwrap();
    let (highest, _) = ring.positions().next_back().unwrap();
    assert!(lowest < highest);

    let key = (0..100_000)
        .map(|i| format!("key-{i}"))
        .find(|key| ring.position_of(key.as_str()) > highest)
        .expect("some key hashes above the highest position");

    assert_eq!(Some(lowest_owner), ring.get(key.as_str()));
}

#[test]
fn adding_a_node_only_moves_keys_to_it() {
    let keys = random_keys(5_000);
    let mut ring = ring_of(&["A", "B"], 40);
    let before = assignments(&ring, &keys);

    ring.add("C".to_string());
    let after = assignments(&ring, &keys);

    let mut moved = 0;
    for ((key, old), new) in keys.iter().zip(&before).zip(&after) {
        if old != new {
            assert_eq!("C", new, "{key} moved from {old} to an old node");
            moved += 1;
        }
    }
    assert!(moved > 0, "the new node should take over some keys");
}

#[test]
fn removing_a_node_only_moves_its_keys() {
    let keys = random_keys(5_000);
    let mut ring = ring_of(&["A", "B", "C"], 40);
    let before = assignments(&ring, &keys);

    ring.remove(&"B".to_string());
    let after = assignments(&ring, &keys);

    for ((key, old), new) in keys.iter().zip(&before).zip(&after) {
        if old == "B" {
            assert!(new == "A" || new == "C", "{key} moved to {new}");
        } else {
            assert_eq!(old, new, "{key} moved although {old} stayed");
        }
    }
}

#[test]
fn removing_twice_leaves_the_ring_unchanged() {
    let mut ring = ring_of(&["A", "B", "C"], 10);

    assert!(ring.remove(&"B".to_string()));
    let after_first = ring.clone();

    assert!(!ring.remove(&"B".to_string()));
    assert_eq!(after_first, ring);

    assert!(!ring.remove(&"unknown".to_string()));
    assert_eq!(after_first, ring);
    assert_eq!(20, ring.vlen());
}

#[test]
fn reassignments_list_exactly_the_moved_keys() {
    let keys = random_keys(2_000);
    let previous = ring_of(&["A", "B", "C"], 20);
    let mut current = previous.clone();
    current.add("D".to_string());
    current.remove(&"A".to_string());

    let moved = current.reassignments(&previous);

    for key in &keys {
        let position = current.position_of(key.as_str());
        let old = previous.get(key.as_str()).unwrap();
        let new = current.get(key.as_str()).unwrap();

        match moved.iter().find(|r| r.hash_range.contains(&position)) {
            Some(r) => assert_eq!((&r.from, &r.to), (old, new)),
            None => assert_eq!(old, new),
        }
    }
}

#[test]
fn small_hash_space_stays_consistent_under_churn() {
    let config = Config::new(3).with_modulus(360);
    let mut rng = StdRng::seed_from_u64(42);
    let mut ring: HashRing<String> = HashRing::from_config(&config).unwrap();

    for _ in 0..500 {
        let node = format!("Node{}", rng.random_range(0..40));
        if rng.random_bool(0.6) {
            ring.add(node);
        } else {
            ring.remove(&node);
        }

        // the ring matches one built from scratch with the same members in the same order
        let mut rebuilt: HashRing<String> = HashRing::from_config(&config).unwrap();
        rebuilt.batch_add(ring.nodes().cloned().collect());
        assert_eq!(rebuilt, ring);

        assert!(ring.positions().all(|(position, _)| position < 360));
        assert_eq!(ring.is_empty(), ring.get("apple").is_none());
    }
}

#[test]
fn membership_changes_do_not_scan_all_nodes() {
    let started = Instant::now();
    let mut ring: HashRing<String> = HashRing::new(1);

    for i in 0..100_000 {
        ring.add(format!("node-{i}"));
    }
    for i in (0..100_000).step_by(10) {
        assert!(ring.remove(&format!("node-{i}")));
    }

    assert_eq!(90_000, ring.len());
    assert_eq!(90_000, ring.vlen());
    assert!(!ring.contains(&"node-0".to_string()));
    assert!(ring.contains(&"node-1".to_string()));
    assert_eq!(Some(&"node-1".to_string()), ring.nodes().next());
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "100k joins and 10k departures took {:?}",
        started.elapsed()
    );
}
