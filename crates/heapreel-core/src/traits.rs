//! The seam between the execution engine and allocator code.

use crate::annotation::Annotation;
use crate::call::LogEntry;
use crate::error::HostError;
use crate::id::ThreadId;

/// Something that runs a `malloc`/`free` pair over a fixed address space.
///
/// The wasm sandbox is the production implementation; tests use native
/// doubles. Side effects (annotations and log messages) accumulate in
/// queues owned by the host and are handed over exactly once by the
/// `drain_*` methods.
pub trait AllocatorHost {
    /// Size of the address space in bytes.
    fn capacity(&self) -> u32;

    /// Set the thread on whose behalf subsequent calls run.
    fn set_thread(&mut self, thread: ThreadId);

    /// Allocate `size` bytes.
    ///
    /// Returns the raw address exactly as the allocator produced it,
    /// including `-1` for "out of memory" and any other invalid value;
    /// the caller validates it.
    fn malloc(&mut self, size: u32) -> Result<i64, HostError>;

    /// Release the allocation at `address`.
    fn free(&mut self, address: u32) -> Result<(), HostError>;

    /// Take every queued annotation, leaving the queue empty.
    fn drain_annotations(&mut self) -> Vec<Annotation>;

    /// Take every queued log message, leaving the queue empty.
    fn drain_logs(&mut self) -> Vec<LogEntry>;
}

impl<H: AllocatorHost + ?Sized> AllocatorHost for Box<H> {
    fn capacity(&self) -> u32 {
        (**self).capacity()
    }

    fn set_thread(&mut self, thread: ThreadId) {
        (**self).set_thread(thread)
    }

    fn malloc(&mut self, size: u32) -> Result<i64, HostError> {
        (**self).malloc(size)
    }

    fn free(&mut self, address: u32) -> Result<(), HostError> {
        (**self).free(address)
    }

    fn drain_annotations(&mut self) -> Vec<Annotation> {
        (**self).drain_annotations()
    }

    fn drain_logs(&mut self) -> Vec<LogEntry> {
        (**self).drain_logs()
    }
}
