//! Address-width abstraction.
//!
//! The 8-bit and 16-bit builds share every line of execution logic. What
//! differs is the width of PC/SP, the number of bytes in an Address
//! operand, the number of bytes pushed for a return address, and where the
//! I/O window sits. All of that lives behind [`Arch`].

use std::fmt;
use std::hash::Hash;

use microtick_core::Value;

/// An address value: `u8` on the 8-bit build, `u16` on the 16-bit build.
pub trait Address:
    Copy + Eq + Ord + Hash + Default + fmt::Debug + fmt::UpperHex + Into<u32> + Into<Value> + 'static
{
    /// Bytes in one address, and in one Address operand.
    const BYTES: usize;

    /// Truncate a wider value to this width.
    fn wrap(value: u32) -> Self;

    /// Address as a memory index.
    fn index(self) -> usize {
        Into::<u32>::into(self) as usize
    }

    /// Zero-extended address.
    fn wide(self) -> u32 {
        self.into()
    }

    #[must_use]
    fn wrapping_inc(self) -> Self {
        Self::wrap(self.wide().wrapping_add(1))
    }

    /// Byte `n` of the address, little-endian (0 is the low byte).
    fn byte(self, n: usize) -> u8 {
        (self.wide() >> (8 * n)) as u8
    }

    /// Compose an address from little-endian operand bytes. The 8-bit
    /// build only looks at the first byte.
    fn from_le(bytes: [u8; 2]) -> Self {
        Self::wrap(u32::from(u16::from_le_bytes(bytes)))
    }
}

impl Address for u8 {
    const BYTES: usize = 1;

    fn wrap(value: u32) -> Self {
        value as u8
    }
}

impl Address for u16 {
    const BYTES: usize = 2;

    fn wrap(value: u32) -> Self {
        value as u16
    }
}

/// A build-time architecture variant.
pub trait Arch: fmt::Debug + Clone + Copy + Default + PartialEq + Eq + 'static {
    /// PC/SP/operand address type.
    type Addr: Address;

    /// Human-readable name, used in dumps.
    const NAME: &'static str;

    /// Size of the addressable space in bytes.
    const SPACE: usize;

    /// First address of the memory-mapped I/O window.
    const IO_BASE: u32;

    /// Largest I/O window that fits above `IO_BASE`.
    const IO_LEN: usize;
}

/// 8-bit address variant: 256-byte space, one-byte address operands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bits8;

impl Arch for Bits8 {
    type Addr = u8;
    const NAME: &'static str = "8-bit";
    const SPACE: usize = 0x100;
    const IO_BASE: u32 = 0xF0;
    const IO_LEN: usize = 0x10;
}

/// 16-bit address variant: 64 KiB space, two-byte little-endian address
/// operands, two-byte return addresses on the stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bits16;

impl Arch for Bits16 {
    type Addr = u16;
    const NAME: &'static str = "16-bit";
    const SPACE: usize = 0x1_0000;
    const IO_BASE: u32 = 0xFF00;
    const IO_LEN: usize = 0x100;
}

/// The architecture selected for this build.
#[cfg(feature = "wide")]
pub type Native = Bits16;

/// The architecture selected for this build.
#[cfg(not(feature = "wide"))]
pub type Native = Bits8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_addresses_wrap_at_256() {
        assert_eq!(0xFFu8.wrapping_inc(), 0x00);
        assert_eq!(<u8 as Address>::from_le([0x34, 0x12]), 0x34);
    }

    #[test]
    fn wide_addresses_compose_little_endian() {
        let addr = <u16 as Address>::from_le([0x34, 0x12]);
        assert_eq!(addr, 0x1234);
        assert_eq!(addr.byte(0), 0x34);
        assert_eq!(addr.byte(1), 0x12);
        assert_eq!(0xFFFFu16.wrapping_inc(), 0x0000);
    }
}
