//! Benchmark profiles for heapreel.
//!
//! Provides deterministic workloads sized for benchmarking:
//!
//! - [`churn_profile`]: every thread allocates a window of blocks and
//!   frees the oldest as it goes, so the heap stays partly occupied
//! - [`churn_calls`]: the same profile, already compiled

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use heapreel_core::Call;
use heapreel_workload::{compile, CompileError, CompilerConfig, Node};

/// Blocks each thread keeps live at once.
pub const WINDOW: usize = 4;

/// Build a churn workload: `threads` threads of `ops` mallocs each.
///
/// Block `i` of thread `t` is `1 + (i + t) % 8` bytes; once a thread
/// holds [`WINDOW`] blocks, each new malloc is followed by freeing the
/// oldest. Every thread frees what it still holds at the end.
pub fn churn_profile(threads: usize, ops: usize) -> Vec<Node> {
    (0..threads)
        .map(|t| {
            let mut children = Vec::with_capacity(ops * 2);
            for i in 0..ops {
                let size = 1 + ((i + t) % 8) as u32;
                children.push(Node::malloc(size).attr("id", format!("t{t}b{i}")));
                if i >= WINDOW {
                    children.push(Node::free_id(format!("t{t}b{}", i - WINDOW)));
                }
            }
            for i in ops.saturating_sub(WINDOW)..ops {
                children.push(Node::free_id(format!("t{t}b{i}")));
            }
            Node::thread(children)
        })
        .collect()
}

/// [`churn_profile`] compiled with the default configuration.
pub fn churn_calls(threads: usize, ops: usize) -> Result<Vec<Call>, CompileError> {
    compile(&churn_profile(threads, ops), &CompilerConfig::default())
}

/// Address space with ample room for [`churn_profile`] under first fit.
///
/// At most `WINDOW + 1` blocks of up to 8 bytes are live per thread; the
/// extra factor of four absorbs fragmentation.
pub fn churn_capacity(threads: usize) -> u32 {
    (threads * (WINDOW + 1) * 8 * 4) as u32
}
