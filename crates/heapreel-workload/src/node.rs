//! Declarative workload descriptions.
//!
//! A workload is a forest of [`Node`]s. Each node is an element name, an
//! ordered set of string attributes, and child nodes, mirroring the
//! markup the descriptions are authored in:
//!
//! ```text
//! <thread>
//!   <malloc id="a" size="8"/>
//!   <sleep duration="250"/>
//!   <free id="a"/>
//! </thread>
//! ```
//!
//! Attribute values stay strings until compile time so that malformed
//! values are reported with the element and attribute they came from.
//!
//! # Examples
//!
//! ```
//! use heapreel_workload::Node;
//!
//! let workload = vec![Node::thread(vec![
//!     Node::malloc(8).attr("id", "a"),
//!     Node::sleep(250),
//!     Node::free_id("a"),
//! ])];
//! assert_eq!(workload[0].children.len(), 3);
//! ```

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use heapreel_core::AnnotationKind;

use crate::error::CompileError;

/// One element of a workload description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Element name: `thread`, `malloc`, `free`, `sleep`, or `annotate`.
    pub element: String,
    /// Attributes in document order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    /// Child elements (threads only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// An element with no attributes or children.
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// A thread containing `children`.
    pub fn thread(children: Vec<Node>) -> Self {
        Self {
            children,
            ..Self::new("thread")
        }
    }

    /// `malloc` of `size` bytes.
    pub fn malloc(size: u32) -> Self {
        Self::new("malloc").attr("size", size.to_string())
    }

    /// `free` of a named allocation.
    pub fn free_id(id: impl Into<String>) -> Self {
        Self::new("free").attr("id", id)
    }

    /// `free` of the allocation at `addr`.
    pub fn free_addr(addr: u32) -> Self {
        Self::new("free").attr("addr", addr.to_string())
    }

    /// `sleep` for `ms` milliseconds.
    pub fn sleep(ms: u64) -> Self {
        Self::new("sleep").attr("duration", ms.to_string())
    }

    /// `annotate` of `kind` at `address`.
    pub fn annotate(kind: AnnotationKind, address: u32) -> Self {
        Self::new("annotate")
            .attr("type", kind.as_str())
            .attr("address", address.to_string())
    }

    /// Set an attribute, replacing any previous value.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Append a child element.
    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }
}

/// Parse a JSON workload: an array of top-level nodes.
///
/// # Errors
///
/// Returns [`CompileError::Parse`] if the text is not a JSON array of
/// `{ "element", "attributes"?, "children"? }` objects.
pub fn parse_workload(json: &str) -> Result<Vec<Node>, CompileError> {
    Ok(serde_json::from_str(json)?)
}

/// The workload vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Element {
    /// A logical thread.
    Thread,
    /// Allocate.
    Malloc,
    /// Free.
    Free,
    /// Idle.
    Sleep,
    /// Scripted annotation.
    Annotate,
}

impl Element {
    /// The element name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Thread => "thread",
            Self::Malloc => "malloc",
            Self::Free => "free",
            Self::Sleep => "sleep",
            Self::Annotate => "annotate",
        }
    }

    /// Attributes the element accepts.
    pub const fn attributes(self) -> &'static [&'static str] {
        match self {
            Self::Thread => &[],
            Self::Malloc => &["id", "size", "addr", "color", "duration"],
            Self::Free => &["id", "addr", "duration"],
            Self::Sleep => &["duration"],
            Self::Annotate => &[
                "type", "address", "target", "alpha", "size", "text", "color", "duration",
            ],
        }
    }
}

impl FromStr for Element {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thread" => Ok(Self::Thread),
            "malloc" => Ok(Self::Malloc),
            "free" => Ok(Self::Free),
            "sleep" => Ok(Self::Sleep),
            "annotate" => Ok(Self::Annotate),
            other => Err(CompileError::UnknownElement {
                element: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
