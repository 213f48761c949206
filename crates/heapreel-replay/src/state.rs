//! Replay state at one instant: cell fills plus the annotation overlay.
//!
//! State is produced by folding reached segments in trace order onto a
//! blank state. Cell appearance is then derived in a separate
//! [`recompute`](ReplayState::recompute) step, so tints and highlights
//! never go stale when marks are added or removed.

use indexmap::IndexMap;

use heapreel_core::{AnnotationKind, Color};

use crate::segment::Mutation;
use crate::view::{CellPaint, Highlight};

/// Highlight color for ranges annotated without one.
pub const DEFAULT_HIGHLIGHT: Color = Color::from_rgb(0xffd5_4f);

/// Highlight opacity for ranges annotated without an alpha.
pub const DEFAULT_RANGE_ALPHA: f64 = 0.5;

/// Allocation state of one byte.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellState {
    /// Color of the occupying allocation.
    pub fill: Option<Color>,
    /// Fill opacity.
    pub alpha: f64,
}

/// A range highlight anchored at an address.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeMark {
    /// Bytes covered.
    pub size: u32,
    /// Highlight color.
    pub color: Color,
    /// Current opacity (fades in with the annotating call).
    pub alpha: f64,
}

/// A solid tint anchored at an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorMark {
    /// Bytes covered.
    pub size: u32,
    /// Tint color.
    pub color: Color,
}

/// Annotation marks currently in effect, keyed by anchor address.
///
/// Each map keeps marks in the order they were (re)applied; later marks
/// draw over earlier ones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlay {
    /// Range highlights.
    pub ranges: IndexMap<u32, RangeMark>,
    /// Text labels.
    pub texts: IndexMap<u32, String>,
    /// Arrows from anchor to target.
    pub pointers: IndexMap<u32, u32>,
    /// Solid tints.
    pub colors: IndexMap<u32, ColorMark>,
}

impl Overlay {
    /// `true` if no marks are in effect.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
            && self.texts.is_empty()
            && self.pointers.is_empty()
            && self.colors.is_empty()
    }
}

/// Full replay state at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayState {
    cells: Vec<CellState>,
    overlay: Overlay,
}

impl ReplayState {
    /// Blank state over `capacity` cells.
    pub fn new(capacity: u32) -> Self {
        Self {
            cells: vec![CellState::default(); capacity as usize],
            overlay: Overlay::default(),
        }
    }

    /// Per-byte allocation state.
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// State of one byte.
    pub fn cell(&self, address: u32) -> Option<&CellState> {
        self.cells.get(address as usize)
    }

    /// Marks in effect.
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Bytes with a fully or partially visible fill.
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.fill.is_some()).count()
    }

    fn span_mut(&mut self, address: u32, size: u32) -> &mut [CellState] {
        let start = (address as usize).min(self.cells.len());
        let end = start.saturating_add(size as usize).min(self.cells.len());
        &mut self.cells[start..end]
    }

    /// Apply `mutation` played to `fraction`.
    pub(crate) fn apply(&mut self, mutation: &Mutation, fraction: f64) {
        match mutation {
            Mutation::Fill {
                address,
                size,
                color,
            } => {
                for cell in self.span_mut(*address, *size) {
                    cell.fill = Some(*color);
                    cell.alpha = fraction;
                }
            }
            Mutation::Clear { address, size } => {
                for cell in self.span_mut(*address, *size) {
                    if fraction >= 1.0 {
                        *cell = CellState::default();
                    } else {
                        cell.alpha = 1.0 - fraction;
                    }
                }
            }
            Mutation::Annotate(a) => {
                let overlay = &mut self.overlay;
                let at = a.address;
                match a.kind {
                    AnnotationKind::Range => {
                        overlay.ranges.shift_remove(&at);
                        overlay.ranges.insert(
                            at,
                            RangeMark {
                                size: a.extent(),
                                color: a.color.unwrap_or(DEFAULT_HIGHLIGHT),
                                alpha: a.alpha.unwrap_or(DEFAULT_RANGE_ALPHA) * fraction,
                            },
                        );
                    }
                    AnnotationKind::Text => {
                        overlay.texts.shift_remove(&at);
                        overlay
                            .texts
                            .insert(at, a.text.clone().unwrap_or_default());
                    }
                    AnnotationKind::Pointer => {
                        overlay.pointers.shift_remove(&at);
                        overlay.pointers.insert(at, a.target.unwrap_or(at));
                    }
                    AnnotationKind::Color => {
                        overlay.colors.shift_remove(&at);
                        overlay.colors.insert(
                            at,
                            ColorMark {
                                size: a.extent(),
                                color: a.color.unwrap_or(DEFAULT_HIGHLIGHT),
                            },
                        );
                    }
                    AnnotationKind::RemoveRange => {
                        overlay.ranges.shift_remove(&at);
                    }
                    AnnotationKind::RemoveText => {
                        overlay.texts.shift_remove(&at);
                    }
                    AnnotationKind::RemovePointer => {
                        overlay.pointers.shift_remove(&at);
                    }
                    AnnotationKind::RemoveColor => {
                        overlay.colors.shift_remove(&at);
                    }
                }
            }
            Mutation::Idle => {}
        }
    }

    /// Derive the appearance of every cell from fills and overlay marks.
    pub fn recompute(&self) -> Vec<CellPaint> {
        let mut paints: Vec<CellPaint> = self
            .cells
            .iter()
            .map(|c| CellPaint {
                fill: c.fill,
                alpha: c.alpha,
                tint: None,
                highlight: None,
            })
            .collect();
        let len = paints.len();
        let span = |address: u32, size: u32| {
            let start = (address as usize).min(len);
            start..start.saturating_add(size as usize).min(len)
        };
        for (&address, mark) in &self.overlay.colors {
            for paint in &mut paints[span(address, mark.size)] {
                paint.tint = Some(mark.color);
            }
        }
        for (&address, mark) in &self.overlay.ranges {
            for paint in &mut paints[span(address, mark.size)] {
                paint.highlight = Some(Highlight {
                    color: mark.color,
                    alpha: mark.alpha,
                });
            }
        }
        paints
    }
}
