//! The rendering seam.
//!
//! The replay engine never draws anything. It resolves each address to
//! an opaque handle once, and after every seek hands the new appearance
//! of each changed cell to the view through that handle.

use heapreel_core::Color;

use crate::error::ViewError;

/// A translucent range highlight over a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Highlight {
    /// Highlight color.
    pub color: Color,
    /// Effective opacity, `[0, 1]`.
    pub alpha: f64,
}

/// Everything a renderer needs to draw one byte.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellPaint {
    /// Color of the allocation occupying the cell, if any.
    pub fill: Option<Color>,
    /// Opacity of the fill, `[0, 1]`. Animates in on malloc and out on free.
    pub alpha: f64,
    /// Solid tint from a `color` annotation.
    pub tint: Option<Color>,
    /// Range highlight from a `range` annotation.
    pub highlight: Option<Highlight>,
}

/// A display of `capacity` memory cells.
pub trait MemoryView {
    /// Cheap reference to one visual cell.
    type Handle: Copy;

    /// Number of cells displayed.
    fn capacity(&self) -> u32;

    /// Handles for `[address, address + size)`, in address order.
    ///
    /// # Errors
    ///
    /// [`ViewError::OutOfRange`] if the range extends past
    /// [`capacity`](MemoryView::capacity).
    fn cells(&self, address: u32, size: u32) -> Result<Vec<Self::Handle>, ViewError>;

    /// Redraw one cell.
    fn paint(&mut self, handle: Self::Handle, paint: CellPaint);
}

/// Bounds check shared by [`MemoryView`] implementations.
pub fn check_cells(address: u32, size: u32, capacity: u32) -> Result<(), ViewError> {
    if u64::from(address) + u64::from(size) > u64::from(capacity) {
        return Err(ViewError::OutOfRange {
            address,
            size,
            capacity,
        });
    }
    Ok(())
}
