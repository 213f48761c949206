//! A terminal rendering of replayed memory.

use std::fmt::Write;

use heapreel::replay::check_cells;
use heapreel::prelude::{CellPaint, MemoryView, ViewError};

/// One character per byte, `width` bytes per row.
pub struct TextGrid {
    cells: Vec<CellPaint>,
    width: u32,
}

impl TextGrid {
    pub fn new(capacity: u32, width: u32) -> Self {
        Self {
            cells: vec![CellPaint::default(); capacity as usize],
            width: width.max(1),
        }
    }

    /// Rows of glyphs prefixed with the address of their first byte.
    ///
    /// `#` fully allocated, `+` fading in or out, `~` highlighted range,
    /// `%` tinted, `.` free.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (row, chunk) in self.cells.chunks(self.width as usize).enumerate() {
            let line: String = chunk.iter().map(glyph).collect();
            let _ = writeln!(out, "{:#06x} |{line}|", row * self.width as usize);
        }
        out
    }
}

fn glyph(cell: &CellPaint) -> char {
    match (cell.fill, cell.highlight, cell.tint) {
        (Some(_), _, _) if cell.alpha >= 1.0 => '#',
        (Some(_), _, _) if cell.alpha > 0.0 => '+',
        (_, Some(_), _) => '~',
        (_, _, Some(_)) => '%',
        _ => '.',
    }
}

impl MemoryView for TextGrid {
    type Handle = usize;

    fn capacity(&self) -> u32 {
        self.cells.len() as u32
    }

    fn cells(&self, address: u32, size: u32) -> Result<Vec<usize>, ViewError> {
        check_cells(address, size, self.capacity())?;
        Ok((address as usize..(address + size) as usize).collect())
    }

    fn paint(&mut self, handle: usize, paint: CellPaint) {
        if let Some(cell) = self.cells.get_mut(handle) {
            *cell = paint;
        }
    }
}
