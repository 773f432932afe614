//! Memory-mapped I/O device interface.

/// A device mapped into the CPU's address space.
///
/// The bus routes accesses that fall inside the I/O window to the
/// attached device. Offsets are relative to the start of the window, so a
/// device never needs to know where it is mapped.
pub trait IoDevice {
    /// Read a byte at `offset` within the window. May have side effects
    /// (e.g. clearing a status latch).
    fn read(&mut self, offset: u16) -> u8;

    /// Write a byte at `offset` within the window.
    fn write(&mut self, offset: u16, value: u8);

    /// Read a byte without side effects, for inspection and dumps.
    fn peek(&self, offset: u16) -> u8;
}
