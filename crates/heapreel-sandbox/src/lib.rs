//! Sandbox runtime for user-supplied heapreel allocators.
//!
//! An allocator is a WebAssembly module exporting `malloc`, `free` and
//! `memory`. It runs inside a wasmtime store whose only capabilities are
//! the host bindings in [`host::BINDINGS`], all defined in the
//! [`host::IMPORT_MODULE`] import module: address-space queries,
//! allocator options, annotation primitives, and a log sink. Everything
//! the guest emits accumulates in queues owned by its [`Sandbox`] and is
//! handed over through [`AllocatorHost`](heapreel_core::AllocatorHost).
//!
//! This is a capability allowlist, not a hardened security boundary. A
//! per-call fuel budget and a linear-memory limit are available to keep
//! runaway allocators from stalling a run.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod host;
pub mod options;
pub mod sandbox;

pub use error::{LoadStage, SandboxError};
pub use options::SandboxOptions;
pub use sandbox::Sandbox;
