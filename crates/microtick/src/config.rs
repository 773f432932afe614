//! CPU configuration.
//!
//! Configuration is a plain struct with defaults for every field, so a
//! caller (or a JSON/TOML file through serde) only has to name what it
//! changes:
//!
//! ```json
//! { "memory_size": 1024, "vram_size": 8 }
//! ```

use serde::{Deserialize, Serialize};

use crate::arch::Arch;
use crate::error::{CpuError, Result};

/// Bytes reserved for the interrupt handler directly below the stack.
pub const IRQ_AREA: usize = 16;

/// Register indices are two bits wide in the instruction encoding.
pub const MAX_REGISTERS: usize = 4;

/// Sizes of the machine. Validated against an [`Arch`] before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    /// Bytes of RAM, starting at address 0.
    pub memory_size: usize,
    /// Bytes reserved for the stack at the top of RAM.
    pub stack_size: usize,
    /// Number of general registers (1..=4).
    pub register_count: usize,
    /// When set, a VRAM device of this many bytes is attached to the I/O
    /// window.
    pub vram_size: Option<usize>,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            memory_size: 256,
            stack_size: 16,
            register_count: 4,
            vram_size: None,
        }
    }
}

impl CpuConfig {
    /// Highest stack address; SP starts here.
    #[must_use]
    pub const fn stack_top(&self) -> usize {
        self.memory_size.saturating_sub(1)
    }

    /// Lowest address SP may reach.
    #[must_use]
    pub const fn stack_bottom(&self) -> usize {
        self.memory_size.saturating_sub(self.stack_size)
    }

    /// Address the CPU jumps to when servicing an interrupt.
    #[must_use]
    pub const fn irq_vector(&self) -> usize {
        self.memory_size
            .saturating_sub(self.stack_size)
            .saturating_sub(IRQ_AREA)
    }

    /// Check the configuration against the address space of `A`.
    pub fn validate<A: Arch>(&self) -> Result<()> {
        if self.register_count == 0 || self.register_count > MAX_REGISTERS {
            return Err(CpuError::InvalidConfig(format!(
                "register_count must be 1..={MAX_REGISTERS}, got {}",
                self.register_count
            )));
        }
        if self.memory_size > A::SPACE {
            return Err(CpuError::InvalidConfig(format!(
                "memory_size {} exceeds the {} address space ({} bytes)",
                self.memory_size,
                A::NAME,
                A::SPACE
            )));
        }
        if self.stack_size == 0 {
            return Err(CpuError::InvalidConfig("stack_size must be non-zero".into()));
        }
        if self
            .stack_size
            .checked_add(IRQ_AREA)
            .is_none_or(|need| self.memory_size < need)
        {
            return Err(CpuError::InvalidConfig(format!(
                "memory_size {} leaves no room for a {}-byte stack and the IRQ area",
                self.memory_size, self.stack_size
            )));
        }
        if let Some(vram) = self.vram_size {
            if vram == 0 || vram > A::IO_LEN {
                return Err(CpuError::InvalidConfig(format!(
                    "vram_size must be 1..={} on the {} build, got {vram}",
                    A::IO_LEN,
                    A::NAME
                )));
            }
        }
        Ok(())
    }
}
