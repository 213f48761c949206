//! Seeded random workloads.

use heapreel_core::AnnotationKind;
use heapreel_workload::Node;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Largest block a generated malloc requests.
pub const MAX_BLOCK: u32 = 8;

/// Generate `threads` threads of `ops` operations each.
///
/// Every malloc is named and frees only name live blocks of the same
/// thread, so the workload is valid for any allocator that can satisfy
/// it. Live bytes never exceed `threads * ops * MAX_BLOCK`; pick a
/// capacity above that. Durations are whole milliseconds in `1..=4` to
/// make cross-thread ties common.
pub fn random_workload(seed: u64, threads: usize, ops: usize, capacity: u32) -> Vec<Node> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..threads)
        .map(|_| Node::thread(thread_ops(&mut rng, ops, capacity)))
        .collect()
}

fn below(rng: &mut ChaCha8Rng, n: u32) -> u32 {
    rng.next_u32() % n.max(1)
}

fn thread_ops(rng: &mut ChaCha8Rng, ops: usize, capacity: u32) -> Vec<Node> {
    let mut live: Vec<String> = Vec::new();
    let mut next_id = 0u32;
    let mut nodes = Vec::with_capacity(ops);
    for _ in 0..ops {
        let duration = (1 + below(rng, 4)).to_string();
        let node = match below(rng, 10) {
            0..=3 => {
                let id = format!("b{next_id}");
                next_id += 1;
                live.push(id.clone());
                Node::malloc(1 + below(rng, MAX_BLOCK)).attr("id", id)
            }
            4..=6 if !live.is_empty() => {
                let i = below(rng, live.len() as u32) as usize;
                Node::free_id(live.swap_remove(i))
            }
            7 => Node::annotate(AnnotationKind::Text, below(rng, capacity))
                .attr("text", format!("n{}", below(rng, 100))),
            _ => Node::sleep(u64::from(1 + below(rng, 4))),
        };
        nodes.push(node.attr("duration", duration));
    }
    nodes
}
