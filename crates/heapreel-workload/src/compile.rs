//! Flattening a workload tree into a time-ordered call list.
//!
//! Each thread keeps a local clock starting at
//! [`CompilerConfig::start_offset`]. An operation is stamped with the
//! current clock and advances it by its `duration` attribute, or by
//! [`CompilerConfig::default_interval`] when none is given. Nested
//! threads run their own clocks from the same offset, so sibling and
//! nested threads overlap in time.
//!
//! Thread ids are assigned depth-first in the order `thread` elements
//! are entered. When the top level holds operations directly, the top
//! level itself is thread 0 and every `thread` element is numbered
//! after it.

use heapreel_core::{AllocationKey, Annotation, AnnotationKind, Call, Micros, Op, ThreadId};

use crate::attr::Attrs;
use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::node::{parse_workload, Element, Node};

/// Compile `nodes` into calls sorted by `(time, thread)`.
///
/// Ties on time across threads order by ascending thread id; ties
/// inside one thread keep document order.
///
/// # Errors
///
/// Returns the first [`CompileError`] encountered in document order.
pub fn compile(nodes: &[Node], config: &CompilerConfig) -> Result<Vec<Call>, CompileError> {
    config.validate()?;
    let mut compiler = Compiler {
        config,
        next_thread: 0,
        calls: Vec::new(),
    };
    let implicit_root = nodes.iter().any(|n| n.element != Element::Thread.as_str());
    if implicit_root {
        compiler.thread(nodes)?;
    } else {
        for node in nodes {
            Attrs::new(Element::Thread, node)?;
            compiler.thread(&node.children)?;
        }
    }
    let Compiler {
        next_thread,
        mut calls,
        ..
    } = compiler;
    calls.sort_by_key(Call::sort_key);
    tracing::debug!(
        threads = next_thread,
        calls = calls.len(),
        implicit_root,
        "compiled workload"
    );
    Ok(calls)
}

/// Parse a JSON workload and compile it.
pub fn compile_json(json: &str, config: &CompilerConfig) -> Result<Vec<Call>, CompileError> {
    compile(&parse_workload(json)?, config)
}

// ── Compiler ───────────────────────────────────────────────────────

struct Compiler<'c> {
    config: &'c CompilerConfig,
    next_thread: u32,
    calls: Vec<Call>,
}

/// A thread's identity and local clock.
struct Cursor {
    thread: ThreadId,
    clock: Micros,
}

impl Compiler<'_> {
    /// Open a new thread over `children`.
    fn thread(&mut self, children: &[Node]) -> Result<(), CompileError> {
        let mut cursor = Cursor {
            thread: ThreadId(self.next_thread),
            clock: self.config.start_offset,
        };
        self.next_thread += 1;
        for child in children {
            self.node(child, &mut cursor)?;
        }
        Ok(())
    }

    fn node(&mut self, node: &Node, cursor: &mut Cursor) -> Result<(), CompileError> {
        let element: Element = node.element.parse()?;
        let attrs = Attrs::new(element, node)?;
        if element != Element::Thread && !node.children.is_empty() {
            return Err(CompileError::UnexpectedChildren {
                element: element.as_str(),
            });
        }
        let explicit = attrs.duration("duration")?;
        let (op, id) = match element {
            Element::Thread => return self.thread(&node.children),
            Element::Malloc => malloc(&attrs, cursor.thread)?,
            Element::Free => free(&attrs, cursor.thread)?,
            Element::Sleep => {
                if explicit.is_none() {
                    return Err(attrs.missing("duration"));
                }
                (Op::Sleep, None)
            }
            Element::Annotate => (Op::Annotate(annotation(&attrs)?), None),
        };
        let duration = explicit.unwrap_or(self.config.default_interval);
        let mut call = Call::new(op, cursor.thread, cursor.clock, duration);
        call.id = id;
        cursor.clock += duration;
        self.calls.push(call);
        Ok(())
    }
}

fn local_id(attrs: &Attrs<'_>, thread: ThreadId) -> Result<Option<AllocationKey>, CompileError> {
    match attrs.str("id") {
        Some(raw) if raw.trim().is_empty() => {
            Err(attrs.invalid("id", raw, "id must not be empty"))
        }
        Some(raw) => Ok(Some(AllocationKey::named(thread, raw.trim()))),
        None => Ok(None),
    }
}

fn malloc(
    attrs: &Attrs<'_>,
    thread: ThreadId,
) -> Result<(Op, Option<AllocationKey>), CompileError> {
    let size = attrs.size("size")?.ok_or_else(|| attrs.missing("size"))?;
    let op = Op::Malloc {
        size,
        addr: attrs.u32("addr")?,
        color: attrs.color("color")?,
    };
    Ok((op, local_id(attrs, thread)?))
}

fn free(attrs: &Attrs<'_>, thread: ThreadId) -> Result<(Op, Option<AllocationKey>), CompileError> {
    let id = local_id(attrs, thread)?;
    let addr = attrs.u32("addr")?;
    match (id, addr) {
        (Some(id), None) => Ok((
            Op::Free {
                address: None,
                color: None,
            },
            Some(id),
        )),
        (None, Some(addr)) => Ok((
            Op::Free {
                address: Some(addr),
                color: None,
            },
            Some(AllocationKey::Address(addr)),
        )),
        (Some(_), Some(_)) => Err(CompileError::ConflictingAttributes {
            element: "free",
            reason: "'id' and 'addr' are mutually exclusive".into(),
        }),
        (None, None) => Err(CompileError::ConflictingAttributes {
            element: "free",
            reason: "exactly one of 'id' or 'addr' is required".into(),
        }),
    }
}

fn annotation(attrs: &Attrs<'_>) -> Result<Annotation, CompileError> {
    let raw = attrs.require_str("type")?;
    let kind: AnnotationKind = raw
        .trim()
        .parse()
        .map_err(|()| attrs.invalid("type", raw, "unknown annotation type"))?;
    let annotation = Annotation {
        kind,
        address: attrs.require_u32("address")?,
        size: attrs.size("size")?,
        target: attrs.u32("target")?,
        text: attrs.str("text").map(str::to_string),
        color: attrs.color("color")?,
        alpha: attrs.alpha("alpha")?,
    };
    let required = match kind {
        AnnotationKind::Range => Some("size"),
        AnnotationKind::Text => Some("text"),
        AnnotationKind::Pointer => Some("target"),
        AnnotationKind::Color => Some("color"),
        _ => None,
    };
    if let Some(name) = required {
        if !attrs.has(name) {
            return Err(attrs.missing(name));
        }
    }
    Ok(annotation)
}
