//! Workload compiler for heapreel.
//!
//! Turns a declarative, possibly nested description of threads and
//! operations ([`Node`]) into the flat, time-stamped, thread-tagged
//! [`Call`](heapreel_core::Call) list the execution engine consumes.
//!
//! # Examples
//!
//! ```
//! use heapreel_workload::{compile_json, CompilerConfig};
//!
//! let json = r#"[
//!     {"element": "thread", "children": [
//!         {"element": "malloc", "attributes": {"id": "buf", "size": "8"}},
//!         {"element": "free", "attributes": {"id": "buf"}}
//!     ]}
//! ]"#;
//! let calls = compile_json(json, &CompilerConfig::default()).unwrap();
//! assert_eq!(calls.len(), 2);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod attr;
pub mod compile;
pub mod config;
pub mod error;
pub mod node;

pub use compile::{compile, compile_json};
pub use config::CompilerConfig;
pub use error::CompileError;
pub use node::{parse_workload, Element, Node};
