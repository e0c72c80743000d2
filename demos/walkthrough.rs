//! walks through the life of a small ring on a 360 degree hash space:
//! - nodes are placed at three virtual positions each
//! - keys are routed to the next position clockwise
//! - a node leaves and only its keys move
//!
//! run with `RUST_LOG=debug` to see the ring's own events

extern crate consistent_ring;

use consistent_ring::{Config, HashRing, SharedHashRing};
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // positions are reduced to degrees so they can be pictured on a circle
    let config = Config::new(3).with_modulus(360);
    let mut ring: HashRing<String> = match HashRing::from_config(&config) {
        Ok(ring) => ring,
        Err(err) => {
            eprintln!("invalid ring config: {err}");
            return;
        }
    };

    ring.batch_add(vec![
        "NodeA".to_string(),
        "NodeB".to_string(),
        "NodeC".to_string(),
    ]);

    println!("# virtual positions");
    for (degree, node) in &ring {
        println!("{degree:>3}° {node}");
    }

    let keys = ["apple", "banana", "cherry"];

    println!("\n# routing keys");
    let before = route(&ring, &keys);

    let previous = ring.clone();
    ring.remove(&"NodeB".to_string());

    println!("\n# routing keys after NodeB left");
    let after = route(&ring, &keys);

    for key in keys {
        if before[key] != after[key] {
            println!("{key} moved from {} to {}", before[key], after[key]);
        }
    }

    println!("\n# arcs that changed owner");
    for moved in ring.reassignments(&previous) {
        println!(
            "{:>3}°..={:>3}° {} -> {}",
            moved.hash_range.start(),
            moved.hash_range.end(),
            moved.from,
            moved.to
        );
    }

    // the same ring, shared with a worker thread that keeps routing while NodeD joins
    let shared = SharedHashRing::from(ring);
    let worker = shared.clone();
    let handle = std::thread::spawn(move || {
        keys.iter()
            .map(|key| (key.to_string(), worker.get_node(*key)))
            .collect::<Vec<_>>()
    });
    shared.add_node("NodeD".to_string());

    match handle.join() {
        Ok(routes) => {
            println!("\n# routed by a worker thread");
            for (key, node) in routes {
                println!("{key:<8} -> {}", node.unwrap_or_default());
            }
        }
        Err(_) => eprintln!("worker thread panicked"),
    }
}

fn route(ring: &HashRing<String>, keys: &[&'static str]) -> HashMap<&'static str, String> {
    let mut routes = HashMap::new();
    for key in keys {
        let node = ring.get(*key).cloned().unwrap_or_default();
        println!("{key:<8} @ {:>3}° -> {node}", ring.position_of(*key));
        routes.insert(*key, node);
    }
    routes
}
