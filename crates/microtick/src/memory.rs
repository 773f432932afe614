//! Flat RAM.

use crate::error::{CpuError, Result};

/// Fixed-size, bounds-checked byte array starting at address 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn out_of_bounds(&self, address: usize) -> CpuError {
        CpuError::MemoryBounds {
            address: address as u32,
            size: self.data.len(),
        }
    }

    pub fn read_byte(&self, address: usize) -> Result<u8> {
        self.data
            .get(address)
            .copied()
            .ok_or_else(|| self.out_of_bounds(address))
    }

    pub fn write_byte(&mut self, address: usize, value: u8) -> Result<()> {
        let size = self.data.len();
        let slot = self.data.get_mut(address).ok_or(CpuError::MemoryBounds {
            address: address as u32,
            size,
        })?;
        *slot = value;
        Ok(())
    }

    /// Borrow `len` bytes starting at `address`.
    pub fn read_bytes(&self, address: usize, len: usize) -> Result<&[u8]> {
        let end = address.checked_add(len).unwrap_or(usize::MAX);
        self.data
            .get(address..end)
            .ok_or_else(|| self.out_of_bounds(end.saturating_sub(1)))
    }

    /// Copy `bytes` in at `address`. Nothing is written unless all of it fits.
    pub fn load_bytes(&mut self, address: usize, bytes: &[u8]) -> Result<()> {
        let end = address.checked_add(bytes.len()).unwrap_or(usize::MAX);
        if end > self.data.len() {
            return Err(self.out_of_bounds(end.saturating_sub(1)));
        }
        self.data[address..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_writes_within_bounds() {
        let mut memory = Memory::new(16);
        memory.write_byte(15, 0xAB).unwrap();
        assert_eq!(memory.read_byte(15), Ok(0xAB));
        assert_eq!(
            memory.read_byte(16),
            Err(CpuError::MemoryBounds {
                address: 16,
                size: 16
            })
        );
    }

    #[test]
    fn load_is_all_or_nothing() {
        let mut memory = Memory::new(4);
        assert!(memory.load_bytes(2, &[1, 2, 3]).is_err());
        assert_eq!(memory.as_slice(), &[0, 0, 0, 0]);

        memory.load_bytes(1, &[1, 2, 3]).unwrap();
        assert_eq!(memory.read_bytes(1, 3).unwrap(), &[1, 2, 3]);
        assert!(memory.read_bytes(2, 3).is_err());
    }
}
