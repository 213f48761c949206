//! Byte-granular occupancy of the tracked address space.
//!
//! [`Tracker`] is the invariant checker of a run: every block the
//! allocator hands out is marked, every block it takes back is cleared,
//! and any overlap in either direction is an error. Operations are
//! all-or-nothing; a rejected range leaves the bitmap untouched.

use crate::error::TrackerError;

/// Occupancy bitmap over `[0, capacity)`.
#[derive(Clone, Debug)]
pub struct Tracker {
    words: Vec<u64>,
    capacity: u32,
    occupied: usize,
    peak: Option<u32>,
}

impl Tracker {
    const BITS_PER_WORD: usize = 64;

    /// An empty tracker over `capacity` bytes.
    pub fn new(capacity: u32) -> Self {
        let words = (capacity as usize).div_ceil(Self::BITS_PER_WORD);
        Self {
            words: vec![0; words],
            capacity,
            occupied: 0,
            peak: None,
        }
    }

    /// Size of the tracked address space.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Whether byte `address` is marked. `false` past the capacity.
    pub fn is_set(&self, address: u32) -> bool {
        if address >= self.capacity {
            return false;
        }
        let i = address as usize;
        self.words[i / Self::BITS_PER_WORD] & (1u64 << (i % Self::BITS_PER_WORD)) != 0
    }

    /// Mark `[address, address + size)`.
    ///
    /// # Errors
    ///
    /// [`TrackerError::OutOfBounds`] if the range does not fit;
    /// [`TrackerError::DoubleAllocation`] naming the first byte that is
    /// already marked.
    pub fn set(&mut self, address: u32, size: u32) -> Result<(), TrackerError> {
        self.check(address, size)?;
        if let Some(address) = (address..address + size).find(|&a| self.is_set(a)) {
            return Err(TrackerError::DoubleAllocation { address });
        }
        self.write(address, size, true);
        self.occupied += size as usize;
        if size > 0 {
            let last = address + size - 1;
            self.peak = Some(self.peak.map_or(last, |p| p.max(last)));
        }
        Ok(())
    }

    /// Clear `[address, address + size)`.
    ///
    /// # Errors
    ///
    /// [`TrackerError::OutOfBounds`] if the range does not fit;
    /// [`TrackerError::DoubleFree`] naming the first byte that is
    /// already clear.
    pub fn unset(&mut self, address: u32, size: u32) -> Result<(), TrackerError> {
        self.check(address, size)?;
        if let Some(address) = (address..address + size).find(|&a| !self.is_set(a)) {
            return Err(TrackerError::DoubleFree { address });
        }
        self.write(address, size, false);
        self.occupied -= size as usize;
        Ok(())
    }

    /// Highest byte ever marked, `None` before the first allocation.
    ///
    /// Freeing does not lower it.
    pub fn peak_address(&self) -> Option<u32> {
        self.peak
    }

    /// Number of currently marked bytes.
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Maximal runs of marked bytes as `(address, size)`, ascending.
    pub fn ranges(&self) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        let mut start = None;
        for a in 0..self.capacity {
            match (self.is_set(a), start) {
                (true, None) => start = Some(a),
                (false, Some(s)) => {
                    out.push((s, a - s));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            out.push((s, self.capacity - s));
        }
        out
    }

    fn check(&self, address: u32, size: u32) -> Result<(), TrackerError> {
        if u64::from(address) + u64::from(size) > u64::from(self.capacity) {
            return Err(TrackerError::OutOfBounds {
                address,
                size,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn write(&mut self, address: u32, size: u32, value: bool) {
        for i in address as usize..(address + size) as usize {
            let mask = 1u64 << (i % Self::BITS_PER_WORD);
            let word = &mut self.words[i / Self::BITS_PER_WORD];
            if value {
                *word |= mask;
            } else {
                *word &= !mask;
            }
        }
    }
}
