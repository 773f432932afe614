//! CPU error kinds.

use thiserror::Error;

/// Everything that can stop a tick.
///
/// Every variant except [`CpuError::Halted`] is fatal for the access that
/// raised it; none of them leave partially applied state behind. `Halted`
/// is a control-flow signal raised by HLT.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CpuError {
    /// The byte at PC does not decode to any instruction, so the length of
    /// the instruction is unknowable.
    #[error("unknown opcode 0x{opcode:02X} at PC 0x{pc:04X}")]
    UnknownOpcode { opcode: u8, pc: u32 },

    /// An instruction names a register the CPU was not configured with.
    #[error("register R{index} does not exist ({count} configured)")]
    InvalidRegister { index: u8, count: usize },

    #[error("address 0x{address:04X} outside {size}-byte memory")]
    MemoryBounds { address: u32, size: usize },

    #[error("stack overflow at SP 0x{sp:04X}")]
    StackOverflow { sp: u32 },

    #[error("stack underflow at SP 0x{sp:04X}")]
    StackUnderflow { sp: u32 },

    #[error("program of {len} bytes does not fit in {size}-byte memory")]
    ProgramTooLarge { len: usize, size: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// HLT executed. PC still points at the HLT byte.
    #[error("halted at PC 0x{pc:04X}")]
    Halted { pc: u32 },
}

impl CpuError {
    /// True for the HLT signal, false for real faults.
    #[must_use]
    pub const fn is_halt(&self) -> bool {
        matches!(self, CpuError::Halted { .. })
    }
}

pub type Result<T> = std::result::Result<T, CpuError>;
