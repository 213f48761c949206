//! An in-memory rendering target.

use heapreel_core::Color;
use heapreel_replay::{check_cells, CellPaint, MemoryView, ViewError};

/// A flat array of painted cells, one per address.
///
/// Counts paint calls so tests can assert that only changed cells are
/// redrawn.
#[derive(Clone, Debug, PartialEq)]
pub struct GridView {
    cells: Vec<CellPaint>,
    paints: usize,
}

impl GridView {
    pub fn new(capacity: u32) -> Self {
        Self {
            cells: vec![CellPaint::default(); capacity as usize],
            paints: 0,
        }
    }

    /// Everything painted so far, by address.
    pub fn painted(&self) -> &[CellPaint] {
        &self.cells
    }

    pub fn cell(&self, address: u32) -> &CellPaint {
        &self.cells[address as usize]
    }

    /// Total number of `paint` calls received.
    pub fn paints(&self) -> usize {
        self.paints
    }

    /// Addresses whose fill is visible (non-zero alpha).
    pub fn visible(&self) -> Vec<u32> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.fill.is_some() && c.alpha > 0.0)
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Fill colors by address, `None` where empty.
    pub fn fills(&self) -> Vec<Option<Color>> {
        self.cells.iter().map(|c| c.fill).collect()
    }
}

impl MemoryView for GridView {
    type Handle = u32;

    fn capacity(&self) -> u32 {
        self.cells.len() as u32
    }

    fn cells(&self, address: u32, size: u32) -> Result<Vec<u32>, ViewError> {
        check_cells(address, size, self.capacity())?;
        Ok((address..address + size).collect())
    }

    fn paint(&mut self, handle: u32, paint: CellPaint) {
        self.cells[handle as usize] = paint;
        self.paints += 1;
    }
}
