//! Architectural register state.

use crate::arch::{Address, Arch};
use crate::error::{CpuError, Result};
use crate::flags::Flags;

/// PC, general registers and flags.
///
/// Fields are private so every mutation goes through a method; the tracer
/// relies on that to diff state across a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State<A: Arch> {
    pc: A::Addr,
    registers: Vec<u8>,
    flags: Flags,
}

impl<A: Arch> State<A> {
    #[must_use]
    pub fn new(register_count: usize) -> Self {
        Self {
            pc: A::Addr::default(),
            registers: vec![0; register_count],
            flags: Flags::default(),
        }
    }

    /// Zero PC, registers and flags.
    pub fn reset(&mut self) {
        self.pc = A::Addr::default();
        self.registers.fill(0);
        self.flags = Flags::default();
    }

    #[must_use]
    pub fn pc(&self) -> A::Addr {
        self.pc
    }

    pub fn set_pc(&mut self, pc: A::Addr) {
        self.pc = pc;
    }

    /// Move PC past the byte it points at.
    pub fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_inc();
    }

    #[must_use]
    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    #[must_use]
    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    pub fn register(&self, index: u8) -> Result<u8> {
        self.registers
            .get(usize::from(index))
            .copied()
            .ok_or(CpuError::InvalidRegister {
                index,
                count: self.registers.len(),
            })
    }

    pub fn set_register(&mut self, index: u8, value: u8) -> Result<()> {
        let count = self.registers.len();
        let slot = self
            .registers
            .get_mut(usize::from(index))
            .ok_or(CpuError::InvalidRegister { index, count })?;
        *slot = value;
        Ok(())
    }

    #[must_use]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    pub fn set_zero(&mut self, zero: bool) {
        self.flags.zero = zero;
    }

    pub fn set_carry(&mut self, carry: bool) {
        self.flags.carry = carry;
    }

    pub fn set_interrupt_disable(&mut self, disable: bool) {
        self.flags.interrupt_disable = disable;
    }
}
