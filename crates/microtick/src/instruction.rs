//! In-flight instructions.
//!
//! An [`Instruction`] is built from decoded metadata when its opcode is
//! fetched. It carries the register indices embedded in the opcode byte, a
//! step list chosen by the opcode's [`Family`], and scratch space for the
//! bytes its steps fetch. Operand bytes are fetched lazily, one per tick.

use std::fmt::Write as _;

use crate::alu::{self, AluResult};
use crate::arch::{Address, Arch};
use crate::error::{CpuError, Result};
use crate::flags::Flags;
use crate::machine::Machine;
use crate::microcode::{MicroPhase, Step, StepList};
use crate::opcodes::{self, FlagOp, Family, Mnemonic, OpcodeGroup, OpcodeMetadata, OperandType};

/// Bytes collected by earlier steps for later ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Scratch {
    /// Immediate or base/displacement byte.
    operand: u8,
    /// Fetched or popped address, little-endian.
    address: [u8; 2],
    /// Address the memory step targets.
    effective: u32,
    /// Memory byte for the ALU, or the popped flags byte.
    value: u8,
}

#[derive(Debug, Clone)]
pub struct Instruction<A: Arch> {
    meta: &'static OpcodeMetadata,
    opcode: u8,
    origin: A::Addr,
    dst: u8,
    src: u8,
    steps: StepList,
    scratch: Scratch,
}

impl<A: Arch> Instruction<A> {
    /// Build the instruction for `opcode`, fetched from `origin`.
    ///
    /// HLT never builds: it returns [`CpuError::Halted`]. Register indices
    /// are checked against `register_count` here.
    pub fn new(
        meta: &'static OpcodeMetadata,
        opcode: u8,
        origin: A::Addr,
        register_count: usize,
    ) -> Result<Self> {
        if meta.family == Family::Halt {
            return Err(CpuError::Halted { pc: origin.wide() });
        }

        let (dst, src) = match meta.group {
            OpcodeGroup::Implicit => (0, 0),
            OpcodeGroup::SingleRegister => (opcode & 0x03, 0),
            OpcodeGroup::RegisterPair => (opcode & 0x03, (opcode >> 2) & 0x03),
        };
        let used: &[u8] = match meta.registers {
            0 => &[],
            1 => &[dst],
            _ => &[dst, src],
        };
        if let Some(&index) = used.iter().find(|&&i| usize::from(i) >= register_count) {
            return Err(CpuError::InvalidRegister {
                index,
                count: register_count,
            });
        }

        Ok(Self {
            meta,
            opcode,
            origin,
            dst,
            src,
            steps: Self::steps_for(meta.family),
            scratch: Scratch::default(),
        })
    }

    /// The interrupt service sequence, entered at a fetch boundary with PC
    /// at `origin`.
    #[must_use]
    pub fn interrupt(origin: A::Addr) -> Self {
        Self {
            meta: &opcodes::INTERRUPT,
            opcode: 0,
            origin,
            dst: 0,
            src: 0,
            steps: Self::steps_for(Family::Interrupt),
            scratch: Scratch::default(),
        }
    }

    fn steps_for(family: Family) -> StepList {
        let mut steps = StepList::new();
        match family {
            Family::Nop | Family::Halt => {}
            Family::Flag(_) | Family::Unary(_) | Family::RegisterPair(_) => steps.push(Step::Alu),
            Family::Immediate(_) => {
                steps.push(Step::FetchImmediate);
                steps.push(Step::Alu);
            }
            Family::Jump(_) => {
                steps.push_address_fetch::<A>();
                steps.push(Step::Commit);
            }
            Family::Call => {
                steps.push_address_fetch::<A>();
                for n in (0..A::Addr::BYTES).rev() {
                    steps.push(Step::PushReturn(n as u8));
                }
                steps.push(Step::Commit);
            }
            Family::Return | Family::ReturnFromInterrupt => {
                for n in 0..A::Addr::BYTES {
                    steps.push(Step::PopReturn(n as u8));
                }
                if family == Family::ReturnFromInterrupt {
                    steps.push(Step::PopFlags);
                }
                steps.push(Step::Commit);
            }
            Family::Push => steps.push(Step::PushRegister),
            Family::Pop => steps.push(Step::PopRegister),
            Family::Peek => steps.push(Step::PeekRegister),
            Family::MemoryAlu(_) => {
                steps.push_address_fetch::<A>();
                steps.push(Step::ReadMemory);
                steps.push(Step::Alu);
            }
            Family::Load => {
                steps.push_address_fetch::<A>();
                steps.push(Step::ReadMemory);
            }
            Family::Store => {
                steps.push_address_fetch::<A>();
                steps.push(Step::WriteMemory);
            }
            Family::LoadIndexed | Family::StoreIndexed => {
                steps.push(Step::FetchImmediate);
                steps.push(Step::ComputeIndexed);
                steps.push(if family == Family::LoadIndexed {
                    Step::ReadMemory
                } else {
                    Step::WriteMemory
                });
            }
            Family::Interrupt => {
                steps.push(Step::PushFlags);
                for n in (0..A::Addr::BYTES).rev() {
                    steps.push(Step::PushReturn(n as u8));
                }
                steps.push(Step::Vector);
            }
        }
        steps
    }

    #[must_use]
    pub fn metadata(&self) -> &'static OpcodeMetadata {
        self.meta
    }

    #[must_use]
    pub fn mnemonic(&self) -> Mnemonic {
        self.meta.mnemonic
    }

    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Address the opcode was fetched from.
    #[must_use]
    pub fn origin(&self) -> A::Addr {
        self.origin
    }

    /// Number of phases after the opcode fetch.
    #[must_use]
    pub fn phase_count(&self) -> usize {
        self.steps.len()
    }

    /// Phase `index` will perform; `Done` past the end.
    #[must_use]
    pub fn phase_at(&self, index: usize) -> MicroPhase {
        self.steps
            .get(index)
            .map_or(MicroPhase::Done, Step::phase::<A>)
    }

    /// Run phase `index`. On error nothing observable has changed.
    pub fn tick(&mut self, index: usize, m: &mut Machine<A>) -> Result<MicroPhase> {
        let Some(step) = self.steps.get(index) else {
            return Ok(MicroPhase::Done);
        };

        match step {
            Step::FetchImmediate => {
                self.scratch.operand = m.bus.read(m.state.pc().wide())?;
                m.state.advance_pc();
            }
            Step::FetchAddress(n) => {
                let n = usize::from(n);
                self.scratch.address[n] = m.bus.read(m.state.pc().wide())?;
                m.state.advance_pc();
                if n + 1 == A::Addr::BYTES {
                    self.scratch.effective = A::Addr::from_le(self.scratch.address).wide();
                }
            }
            Step::ComputeIndexed => {
                let base = m.state.register(self.scratch.operand >> 6)?;
                let displacement = self.scratch.operand & 0x3F;
                self.scratch.effective =
                    A::Addr::wrap(u32::from(base) + u32::from(displacement)).wide();
            }
            Step::ReadMemory => {
                let value = m.bus.read(self.scratch.effective)?;
                if matches!(self.meta.family, Family::Load | Family::LoadIndexed) {
                    m.state.set_register(self.dst, value)?;
                } else {
                    self.scratch.value = value;
                }
            }
            Step::WriteMemory => {
                let value = m.state.register(self.dst)?;
                m.bus.write(self.scratch.effective, value)?;
            }
            Step::Alu => self.alu(m)?,
            Step::PushReturn(n) => {
                // First push of a call reserves room for the whole address.
                if self.meta.family == Family::Call && usize::from(n) + 1 == A::Addr::BYTES {
                    m.stack.ensure_room(A::Addr::BYTES)?;
                }
                let byte = m.state.pc().byte(usize::from(n));
                m.stack.push_byte(&mut m.bus, byte)?;
            }
            Step::PopReturn(n) => {
                if n == 0 {
                    let flags = usize::from(self.meta.family == Family::ReturnFromInterrupt);
                    m.stack.ensure_depth(A::Addr::BYTES + flags)?;
                }
                self.scratch.address[usize::from(n)] = m.stack.pop_byte(&mut m.bus)?;
            }
            Step::PushFlags => {
                m.stack.ensure_room(1 + A::Addr::BYTES)?;
                m.stack.push_byte(&mut m.bus, m.state.flags().pack())?;
            }
            Step::PopFlags => {
                self.scratch.value = m.stack.pop_byte(&mut m.bus)?;
            }
            Step::PushRegister => {
                let value = m.state.register(self.dst)?;
                m.stack.push_byte(&mut m.bus, value)?;
            }
            Step::PopRegister => {
                let value = m.stack.pop_byte(&mut m.bus)?;
                m.state.set_register(self.dst, value)?;
            }
            Step::PeekRegister => {
                let value = m.stack.peek_byte(&mut m.bus)?;
                m.state.set_register(self.dst, value)?;
            }
            Step::Commit => self.commit(m),
            Step::Vector => {
                m.state.set_interrupt_disable(true);
                m.state.set_pc(m.irq_vector);
            }
        }

        Ok(step.phase::<A>())
    }

    fn alu(&self, m: &mut Machine<A>) -> Result<()> {
        let carry = m.state.flags().carry;
        let result = match self.meta.family {
            Family::Flag(op) => {
                match op {
                    FlagOp::ClearCarry => m.state.set_carry(false),
                    FlagOp::SetCarry => m.state.set_carry(true),
                    FlagOp::ClearZero => m.state.set_zero(false),
                    FlagOp::SetZero => m.state.set_zero(true),
                    FlagOp::SetInterruptDisable => m.state.set_interrupt_disable(true),
                    FlagOp::ClearInterruptDisable => m.state.set_interrupt_disable(false),
                }
                return Ok(());
            }
            Family::Unary(op) => alu::unary(op, m.state.register(self.dst)?),
            Family::Immediate(op) => {
                alu::binary(op, m.state.register(self.dst)?, self.scratch.operand, carry)
            }
            Family::RegisterPair(op) => alu::binary(
                op,
                m.state.register(self.dst)?,
                m.state.register(self.src)?,
                carry,
            ),
            Family::MemoryAlu(op) => {
                alu::binary(op, m.state.register(self.dst)?, self.scratch.value, carry)
            }
            _ => AluResult::default(),
        };

        if let Some(value) = result.value {
            m.state.set_register(self.dst, value)?;
        }
        if let Some(zero) = result.zero {
            m.state.set_zero(zero);
        }
        if let Some(carry) = result.carry {
            m.state.set_carry(carry);
        }
        Ok(())
    }

    fn commit(&self, m: &mut Machine<A>) {
        let target = A::Addr::from_le(self.scratch.address);
        match self.meta.family {
            Family::Jump(condition) => {
                let flags = m.state.flags();
                if condition.holds(flags.zero, flags.carry) {
                    m.state.set_pc(target);
                }
            }
            Family::ReturnFromInterrupt => {
                m.state.set_flags(Flags::unpack(self.scratch.value));
                m.state.set_pc(target);
            }
            _ => m.state.set_pc(target),
        }
    }

    /// Assembly text. Operands not yet fetched render as zero.
    #[must_use]
    pub fn text(&self) -> String {
        let operands: &[u8] = match self.meta.operand {
            OperandType::None => &[],
            OperandType::Immediate | OperandType::RegisterAndImmediate => {
                std::slice::from_ref(&self.scratch.operand)
            }
            OperandType::Address => &self.scratch.address[..A::Addr::BYTES],
        };
        disassemble::<A>(self.meta, self.opcode, operands)
    }
}

/// Render one instruction as assembly text.
///
/// `operands` holds the bytes after the opcode, in memory order. Missing
/// bytes read as zero.
#[must_use]
pub fn disassemble<A: Arch>(meta: &OpcodeMetadata, opcode: u8, operands: &[u8]) -> String {
    let byte = |n: usize| operands.get(n).copied().unwrap_or(0);
    let dst = opcode & 0x03;
    let src = (opcode >> 2) & 0x03;

    let mut text = String::from(meta.mnemonic.name());
    let mut parts: Vec<String> = Vec::new();
    match meta.group {
        OpcodeGroup::Implicit => {}
        OpcodeGroup::SingleRegister => parts.push(format!("R{dst}")),
        OpcodeGroup::RegisterPair => {
            parts.push(format!("R{dst}"));
            parts.push(format!("R{src}"));
        }
    }
    match meta.operand {
        OperandType::None => {}
        OperandType::Immediate => parts.push(format!("#${:02X}", byte(0))),
        OperandType::Address => {
            let address = A::Addr::from_le([byte(0), byte(1)]).wide();
            parts.push(format!("${address:0width$X}", width = A::Addr::BYTES * 2));
        }
        OperandType::RegisterAndImmediate => {
            let operand = byte(0);
            parts.push(format!("[R{}+${:02X}]", operand >> 6, operand & 0x3F));
        }
    }
    if !parts.is_empty() {
        let _ = write!(text, " {}", parts.join(", "));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Bits16, Bits8};
    use crate::opcodes::decode;

    fn build(opcode: u8) -> Result<Instruction<Bits8>> {
        Instruction::new(decode(opcode).unwrap(), opcode, 0x00, 4)
    }

    fn phases<A: Arch>(instruction: &Instruction<A>) -> Vec<MicroPhase> {
        (0..=instruction.phase_count())
            .map(|i| instruction.phase_at(i))
            .collect()
    }

    #[test]
    fn halt_refuses_to_build() {
        assert_eq!(
            Instruction::<Bits8>::new(decode(0x01).unwrap(), 0x01, 0x42, 4).err(),
            Some(CpuError::Halted { pc: 0x42 })
        );
    }

    #[test]
    fn register_indices_are_checked() {
        // MOV R3, R2 with only two registers configured.
        let err = Instruction::<Bits8>::new(decode(0x6B).unwrap(), 0x6B, 0, 2).err();
        assert_eq!(err, Some(CpuError::InvalidRegister { index: 3, count: 2 }));
    }

    #[test]
    fn phase_lists() {
        use MicroPhase::*;
        assert_eq!(phases(&build(0x00).unwrap()), [Done]);
        assert_eq!(phases(&build(0x71).unwrap()), [AluOp, Done]);
        assert_eq!(phases(&build(0x34).unwrap()), [FetchOperand, AluOp, Done]);
        assert_eq!(
            phases(&build(0x58).unwrap()),
            [FetchOperand, EffectiveAddrComputation, MemoryRead, Done]
        );
        assert_eq!(
            phases(&build(0x0D).unwrap()),
            [FetchOperand, MemoryWrite, ValueComposition, Done]
        );

        let call = Instruction::<Bits16>::new(decode(0x0D).unwrap(), 0x0D, 0, 4).unwrap();
        assert_eq!(
            phases(&call),
            [
                FetchOperand16Low,
                FetchOperand16High,
                MemoryWrite,
                MemoryWrite,
                ValueComposition,
                Done
            ]
        );
        assert_eq!(
            phases(&Instruction::<Bits16>::interrupt(0)),
            [MemoryWrite, MemoryWrite, MemoryWrite, JumpToInterrupt, Done]
        );
    }

    #[test]
    fn text_rendering() {
        let text = |opcode: u8, operands: &[u8]| {
            disassemble::<Bits8>(decode(opcode).unwrap(), opcode, operands)
        };
        assert_eq!(text(0x71, &[]), "ADD R1, R0");
        assert_eq!(text(0x34, &[0xFF]), "LDI R0, #$FF");
        assert_eq!(text(0x08, &[0x10]), "JMP $10");
        assert_eq!(text(0x58, &[0x45]), "LDX R0, [R1+$05]");
        assert_eq!(text(0x00, &[]), "NOP");
        assert_eq!(
            disassemble::<Bits16>(decode(0x52).unwrap(), 0x52, &[0x34, 0x12]),
            "LDA R2, $1234"
        );
        assert_eq!(Instruction::<Bits8>::interrupt(0).text(), "IRQ");
    }
}
