//! Micro-phase definitions.
//!
//! Every instruction is a short list of steps. One step runs per tick and
//! reports itself as a [`MicroPhase`].

use serde::Serialize;

use crate::arch::{Address, Arch};

/// What a tick did, as seen from outside the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MicroPhase {
    /// Read the opcode byte at PC and decode it.
    FetchOpcode,
    /// Read a one-byte operand at PC.
    FetchOperand,
    /// Read the low byte of a two-byte address operand.
    FetchOperand16Low,
    /// Read the high byte of a two-byte address operand.
    FetchOperand16High,
    /// Data or stack read.
    MemoryRead,
    /// Data or stack write.
    MemoryWrite,
    /// Register or flag update with no bus traffic.
    AluOp,
    /// Indexed address computation.
    EffectiveAddrComputation,
    /// Compose fetched bytes into PC.
    ValueComposition,
    /// Load the interrupt vector into PC.
    JumpToInterrupt,
    /// Nothing left to run. Only ever reported as the next phase.
    Done,
}

/// Whether a phase touches the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PhaseClass {
    Bus,
    Internal,
}

impl MicroPhase {
    #[must_use]
    pub const fn class(self) -> PhaseClass {
        match self {
            Self::FetchOpcode
            | Self::FetchOperand
            | Self::FetchOperand16Low
            | Self::FetchOperand16High
            | Self::MemoryRead
            | Self::MemoryWrite => PhaseClass::Bus,
            Self::AluOp
            | Self::EffectiveAddrComputation
            | Self::ValueComposition
            | Self::JumpToInterrupt
            | Self::Done => PhaseClass::Internal,
        }
    }

    #[must_use]
    pub const fn is_bus(self) -> bool {
        matches!(self.class(), PhaseClass::Bus)
    }
}

/// One step of an instruction's phase list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Operand byte at PC into the scratch operand.
    FetchImmediate,
    /// Address operand byte `n` (little-endian) at PC.
    FetchAddress(u8),
    /// Base register plus displacement into the effective address.
    ComputeIndexed,
    /// Byte at the effective address.
    ReadMemory,
    /// Destination register to the effective address.
    WriteMemory,
    Alu,
    /// Byte `n` of the return address onto the stack.
    PushReturn(u8),
    /// Stack byte into return-address byte `n`.
    PopReturn(u8),
    PushFlags,
    PopFlags,
    PushRegister,
    PopRegister,
    PeekRegister,
    /// Fetched or popped address into PC.
    Commit,
    Vector,
}

impl Step {
    pub(crate) fn phase<A: Arch>(self) -> MicroPhase {
        match self {
            Self::FetchImmediate => MicroPhase::FetchOperand,
            Self::FetchAddress(_) if A::Addr::BYTES == 1 => MicroPhase::FetchOperand,
            Self::FetchAddress(0) => MicroPhase::FetchOperand16Low,
            Self::FetchAddress(_) => MicroPhase::FetchOperand16High,
            Self::ComputeIndexed => MicroPhase::EffectiveAddrComputation,
            Self::ReadMemory
            | Self::PopReturn(_)
            | Self::PopFlags
            | Self::PopRegister
            | Self::PeekRegister => MicroPhase::MemoryRead,
            Self::WriteMemory | Self::PushReturn(_) | Self::PushFlags | Self::PushRegister => {
                MicroPhase::MemoryWrite
            }
            Self::Alu => MicroPhase::AluOp,
            Self::Commit => MicroPhase::ValueComposition,
            Self::Vector => MicroPhase::JumpToInterrupt,
        }
    }
}

const CAPACITY: usize = 6;

/// Fixed-capacity step list. The longest sequence is a 16-bit CAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StepList {
    steps: [Step; CAPACITY],
    len: u8,
}

impl StepList {
    pub(crate) const fn new() -> Self {
        Self {
            steps: [Step::Alu; CAPACITY],
            len: 0,
        }
    }

    pub(crate) fn push(&mut self, step: Step) {
        debug_assert!((self.len as usize) < CAPACITY, "step list overflow");
        self.steps[self.len as usize] = step;
        self.len += 1;
    }

    /// Push the address-operand fetches for the current width.
    pub(crate) fn push_address_fetch<A: Arch>(&mut self) {
        for n in 0..A::Addr::BYTES {
            self.push(Step::FetchAddress(n as u8));
        }
    }

    #[must_use]
    pub(crate) fn get(&self, index: usize) -> Option<Step> {
        self.steps[..self.len as usize].get(index).copied()
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.len as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Bits16, Bits8};

    #[test]
    fn classification() {
        assert!(MicroPhase::FetchOperand16High.is_bus());
        assert!(MicroPhase::MemoryWrite.is_bus());
        assert!(!MicroPhase::EffectiveAddrComputation.is_bus());
        assert!(!MicroPhase::Done.is_bus());
    }

    #[test]
    fn address_fetch_phases_follow_width() {
        let mut narrow = StepList::new();
        narrow.push_address_fetch::<Bits8>();
        assert_eq!(narrow.len(), 1);
        assert_eq!(narrow.get(0).map(Step::phase::<Bits8>), Some(MicroPhase::FetchOperand));

        let mut wide = StepList::new();
        wide.push_address_fetch::<Bits16>();
        let phases: Vec<_> = (0..wide.len())
            .filter_map(|i| wide.get(i))
            .map(Step::phase::<Bits16>)
            .collect();
        assert_eq!(
            phases,
            [MicroPhase::FetchOperand16Low, MicroPhase::FetchOperand16High]
        );
        assert_eq!(wide.get(2), None);
    }
}
