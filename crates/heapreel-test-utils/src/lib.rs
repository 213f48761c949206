//! Test utilities and fixtures for heapreel development.
//!
//! - [`allocators`]: WebAssembly text allocators, well-behaved and not
//! - [`MockHost`]: a native [`AllocatorHost`](heapreel_core::AllocatorHost)
//!   with scripted returns and a call log
//! - [`GridView`]: an in-memory [`MemoryView`](heapreel_replay::MemoryView)
//! - [`random_workload`]: seeded workload generation

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod allocators;
pub mod grid;
pub mod mock;
pub mod workload;

pub use grid::GridView;
pub use mock::{MockCall, MockHost};
pub use workload::random_workload;
