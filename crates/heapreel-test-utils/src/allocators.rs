//! Reusable allocator modules in WebAssembly text.
//!
//! Well-behaved allocators:
//!
//! - [`FIRST_FIT`]: byte-map first fit with reuse, capacity up to 16384.
//! - [`BUMP`]: never reuses; `free` is a no-op.
//! - [`THREAD_ARENA`]: one 32-byte bump arena per thread.
//! - [`ANNOTATING`]: bump allocator that annotates and logs.
//! - [`OPTION_READER`]: bump allocator that rounds sizes to the `align`
//!   option.
//! - [`GROWING`]: hands out whole pages of fresh linear memory.
//!
//! Misbehaving ones, each tripping exactly one failure path:
//! [`MISSING_FREE`], [`OUT_OF_BOUNDS`], [`ALWAYS_ZERO`], [`TRAPPING`],
//! [`LOOP_FOREVER`], [`FAULTING`], [`BAD_IMPORT`], [`BAD_SIGNATURE`],
//! [`START_TRAP`], [`START_SPIN`].

/// First-fit over a byte map at address 0; block sizes live in a table
/// on the second page.
pub const FIRST_FIT: &str = r#"(module
  (import "env" "getTotalMemory" (func $total (result i32)))
  (memory (export "memory") 2)
  (func $slot (param $addr i32) (result i32)
    (i32.add (i32.const 65536) (i32.shl (local.get $addr) (i32.const 2))))
  (func (export "malloc") (param $size i32) (result i32)
    (local $cap i32) (local $start i32) (local $run i32) (local $i i32)
    (if (i32.le_s (local.get $size) (i32.const 0))
      (then (return (i32.const -1))))
    (local.set $cap (call $total))
    (block $done
      (loop $scan
        (br_if $done (i32.ge_u (local.get $i) (local.get $cap)))
        (if (i32.load8_u (local.get $i))
          (then
            (local.set $run (i32.const 0))
            (local.set $start (i32.add (local.get $i) (i32.const 1))))
          (else
            (local.set $run (i32.add (local.get $run) (i32.const 1)))
            (if (i32.eq (local.get $run) (local.get $size))
              (then
                (memory.fill (local.get $start) (i32.const 1) (local.get $size))
                (i32.store (call $slot (local.get $start)) (local.get $size))
                (return (local.get $start))))))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $scan)))
    (i32.const -1))
  (func (export "free") (param $addr i32)
    (local $size i32)
    (local.set $size (i32.load (call $slot (local.get $addr))))
    (memory.fill (local.get $addr) (i32.const 0) (local.get $size))
    (i32.store (call $slot (local.get $addr)) (i32.const 0))))"#;

/// Hands out increasing addresses until the capacity runs out.
pub const BUMP: &str = r#"(module
  (import "env" "getTotalMemory" (func $total (result i32)))
  (memory (export "memory") 1)
  (global $next (mut i32) (i32.const 0))
  (func (export "malloc") (param $size i32) (result i32)
    (local $addr i32)
    (local.set $addr (global.get $next))
    (if (i32.gt_u (i32.add (local.get $addr) (local.get $size)) (call $total))
      (then (return (i32.const -1))))
    (global.set $next (i32.add (local.get $addr) (local.get $size)))
    (local.get $addr))
  (func (export "free") (param i32)))"#;

/// Thread `t` allocates upward from `t * 32`; offsets live at `4 * t`.
pub const THREAD_ARENA: &str = r#"(module
  (import "env" "getThreadId" (func $thread (result i32)))
  (memory (export "memory") 1)
  (func (export "malloc") (param $size i32) (result i32)
    (local $slot i32) (local $used i32)
    (local.set $slot (i32.shl (call $thread) (i32.const 2)))
    (local.set $used (i32.load (local.get $slot)))
    (if (i32.gt_u (i32.add (local.get $used) (local.get $size)) (i32.const 32))
      (then (return (i32.const -1))))
    (i32.store (local.get $slot) (i32.add (local.get $used) (local.get $size)))
    (i32.add (i32.shl (call $thread) (i32.const 5)) (local.get $used)))
  (func (export "free") (param i32)))"#;

/// Labels address 0 `"heap"` at load time, highlights each block it
/// hands out (color `0xff8800`, alpha `0.25`) and logs every call.
pub const ANNOTATING: &str = r#"(module
  (import "env" "getTotalMemory" (func $total (result i32)))
  (import "env" "annotateText" (func $text (param i32 i32 i32)))
  (import "env" "annotateRange" (func $range (param i32 i32 i32 f64)))
  (import "env" "removeRange" (func $unrange (param i32)))
  (import "env" "logInfo" (func $info (param i32 i32)))
  (import "env" "logWarn" (func $warn (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 1024) "heap")
  (data (i32.const 1040) "malloc")
  (data (i32.const 1056) "free")
  (global $next (mut i32) (i32.const 0))
  (func $setup
    (call $text (i32.const 0) (i32.const 1024) (i32.const 4)))
  (start $setup)
  (func (export "malloc") (param $size i32) (result i32)
    (local $addr i32)
    (local.set $addr (global.get $next))
    (if (i32.gt_u (i32.add (local.get $addr) (local.get $size)) (call $total))
      (then (return (i32.const -1))))
    (global.set $next (i32.add (local.get $addr) (local.get $size)))
    (call $range (local.get $addr) (local.get $size) (i32.const 0xff8800) (f64.const 0.25))
    (call $info (i32.const 1040) (i32.const 6))
    (local.get $addr))
  (func (export "free") (param $addr i32)
    (call $unrange (local.get $addr))
    (call $warn (i32.const 1056) (i32.const 4))))"#;

/// `malloc(n)` grows linear memory by `n` pages and returns the previous
/// page count, or -1 once the store refuses to grow.
pub const GROWING: &str = r#"(module
  (memory (export "memory") 1)
  (func (export "malloc") (param $pages i32) (result i32)
    (memory.grow (local.get $pages)))
  (func (export "free") (param i32)))"#;

/// Bump allocator that rounds each size up to the single-digit `align`
/// option when present.
pub const OPTION_READER: &str = r#"(module
  (import "env" "optionLength" (func $len (param i32 i32) (result i32)))
  (import "env" "readOption" (func $read (param i32 i32 i32 i32) (result i32)))
  (memory (export "memory") 1)
  (data (i32.const 1024) "align")
  (global $next (mut i32) (i32.const 0))
  (func $align (result i32)
    (if (i32.ne (call $len (i32.const 1024) (i32.const 5)) (i32.const 1))
      (then (return (i32.const 1))))
    (drop (call $read (i32.const 1024) (i32.const 5) (i32.const 1100) (i32.const 1)))
    (i32.sub (i32.load8_u (i32.const 1100)) (i32.const 48)))
  (func (export "malloc") (param $size i32) (result i32)
    (local $a i32) (local $addr i32)
    (local.set $a (call $align))
    (local.set $size
      (i32.mul
        (i32.div_u (i32.add (local.get $size) (i32.sub (local.get $a) (i32.const 1)))
                   (local.get $a))
        (local.get $a)))
    (local.set $addr (global.get $next))
    (global.set $next (i32.add (local.get $addr) (local.get $size)))
    (local.get $addr))
  (func (export "free") (param i32)))"#;

/// Exports `malloc` but not `free`.
pub const MISSING_FREE: &str = r#"(module
  (memory (export "memory") 1)
  (global $next (mut i32) (i32.const 0))
  (func (export "malloc") (param $size i32) (result i32)
    (local $addr i32)
    (local.set $addr (global.get $next))
    (global.set $next (i32.add (local.get $addr) (local.get $size)))
    (local.get $addr)))"#;

/// Always returns the capacity, one past the last valid address.
pub const OUT_OF_BOUNDS: &str = r#"(module
  (import "env" "getTotalMemory" (func $total (result i32)))
  (memory (export "memory") 1)
  (func (export "malloc") (param i32) (result i32)
    (call $total))
  (func (export "free") (param i32)))"#;

/// Always returns address 0, so the second live block overlaps the first.
pub const ALWAYS_ZERO: &str = r#"(module
  (memory (export "memory") 1)
  (func (export "malloc") (param i32) (result i32)
    (i32.const 0))
  (func (export "free") (param i32)))"#;

/// `malloc` hits `unreachable`.
pub const TRAPPING: &str = r#"(module
  (memory (export "memory") 1)
  (func (export "malloc") (param i32) (result i32)
    (unreachable))
  (func (export "free") (param i32)))"#;

/// `malloc` never returns; only a fuel budget stops it.
pub const LOOP_FOREVER: &str = r#"(module
  (memory (export "memory") 1)
  (func (export "malloc") (param i32) (result i32)
    (loop $spin (br $spin))
    (unreachable))
  (func (export "free") (param i32)))"#;

/// `malloc` asks the host to read text from past the end of its memory.
pub const FAULTING: &str = r#"(module
  (import "env" "annotateText" (func $text (param i32 i32 i32)))
  (memory (export "memory") 1)
  (func (export "malloc") (param i32) (result i32)
    (call $text (i32.const 0) (i32.const 70000) (i32.const 4))
    (i32.const 0))
  (func (export "free") (param i32)))"#;

/// Imports a function outside the binding allowlist.
pub const BAD_IMPORT: &str = r#"(module
  (import "env" "fetch" (func $fetch (param i32) (result i32)))
  (memory (export "memory") 1)
  (func (export "malloc") (param $size i32) (result i32)
    (call $fetch (local.get $size)))
  (func (export "free") (param i32)))"#;

/// Exports `malloc` over 64-bit integers.
pub const BAD_SIGNATURE: &str = r#"(module
  (memory (export "memory") 1)
  (func (export "malloc") (param i64) (result i64)
    (i64.const 0))
  (func (export "free") (param i32)))"#;

/// Traps in its start function.
pub const START_TRAP: &str = r#"(module
  (memory (export "memory") 1)
  (func $boom (unreachable))
  (start $boom)
  (func (export "malloc") (param i32) (result i32)
    (i32.const 0))
  (func (export "free") (param i32)))"#;

/// Start function that never returns.
pub const START_SPIN: &str = r#"(module
  (memory (export "memory") 1)
  (func $spin (loop $again (br $again)))
  (start $spin)
  (func (export "malloc") (param i32) (result i32) (i32.const 0))
  (func (export "free") (param i32)))"#;
