//! Status flags.
//!
//! The CPU keeps Zero, Carry and Interrupt-disable as separate booleans.
//! They only become a byte when pushed by the interrupt sequence and
//! popped by RTI.

use std::fmt;

use serde::Serialize;

/// Carry - bit 0 of the packed byte.
pub const C: u8 = 0x01;

/// Zero - bit 1 of the packed byte.
pub const Z: u8 = 0x02;

/// Interrupt disable - bit 2 of the packed byte. While set, latched
/// interrupt requests wait.
pub const I: u8 = 0x04;

/// The Z, C and I flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Flags {
    pub zero: bool,
    pub carry: bool,
    pub interrupt_disable: bool,
}

impl Flags {
    /// Pack into the byte layout pushed by the interrupt sequence.
    #[must_use]
    pub const fn pack(self) -> u8 {
        let mut value = 0;
        if self.carry {
            value |= C;
        }
        if self.zero {
            value |= Z;
        }
        if self.interrupt_disable {
            value |= I;
        }
        value
    }

    /// Unpack a byte popped by RTI. Unused bits are ignored.
    #[must_use]
    pub const fn unpack(value: u8) -> Self {
        Self {
            zero: value & Z != 0,
            carry: value & C != 0,
            interrupt_disable: value & I != 0,
        }
    }
}

impl fmt::Display for Flags {
    /// Upper case when set: `ZCI`, `zci`, `Zci`...
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = |set: bool, c: char| if set { c.to_ascii_uppercase() } else { c };
        write!(
            f,
            "{}{}{}",
            letter(self.zero, 'z'),
            letter(self.carry, 'c'),
            letter(self.interrupt_disable, 'i')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_layout() {
        let flags = Flags {
            zero: true,
            carry: true,
            interrupt_disable: false,
        };
        assert_eq!(flags.pack(), 0b011);
        assert_eq!(Flags::unpack(0b011), flags);
        assert_eq!(Flags::unpack(0xF8), Flags::default());
    }

    #[test]
    fn display() {
        let flags = Flags {
            zero: true,
            carry: false,
            interrupt_disable: true,
        };
        assert_eq!(flags.to_string(), "ZcI");
    }
}
