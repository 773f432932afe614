//! Opcode registry and decoder.
//!
//! Decoding is two-level. The byte's range picks an [`OpcodeGroup`], whose
//! mask strips the embedded register bits to give the base code; the base
//! code indexes the static table. The full 256-entry lookup is built once.

use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;

use crate::alu::{AluOp, UnaryOp};
use crate::arch::{Address, Arch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mnemonic {
    Nop,
    Hlt,
    Clc,
    Sec,
    Clz,
    Sez,
    Sei,
    Cli,
    Jmp,
    Jcc,
    Jcs,
    Jzc,
    Jzs,
    Cal,
    Ret,
    Rti,
    Inc,
    Dec,
    Lsh,
    Rsh,
    Lrt,
    Rrt,
    Psh,
    Pop,
    Pek,
    Ldi,
    Adi,
    Sbi,
    Cpi,
    Ani,
    Ori,
    Xri,
    Lda,
    Sta,
    Ldx,
    Stx,
    Mov,
    Add,
    Sub,
    And,
    Or,
    Xor,
    Cmp,
    Bti,
    Ada,
    Sba,
    Cpa,
    Ana,
    Ora,
    Xra,
    Bta,
    /// Interrupt service sequence. Never decoded from a byte.
    Irq,
}

impl Mnemonic {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Hlt => "HLT",
            Self::Clc => "CLC",
            Self::Sec => "SEC",
            Self::Clz => "CLZ",
            Self::Sez => "SEZ",
            Self::Sei => "SEI",
            Self::Cli => "CLI",
            Self::Jmp => "JMP",
            Self::Jcc => "JCC",
            Self::Jcs => "JCS",
            Self::Jzc => "JZC",
            Self::Jzs => "JZS",
            Self::Cal => "CAL",
            Self::Ret => "RET",
            Self::Rti => "RTI",
            Self::Inc => "INC",
            Self::Dec => "DEC",
            Self::Lsh => "LSH",
            Self::Rsh => "RSH",
            Self::Lrt => "LRT",
            Self::Rrt => "RRT",
            Self::Psh => "PSH",
            Self::Pop => "POP",
            Self::Pek => "PEK",
            Self::Ldi => "LDI",
            Self::Adi => "ADI",
            Self::Sbi => "SBI",
            Self::Cpi => "CPI",
            Self::Ani => "ANI",
            Self::Ori => "ORI",
            Self::Xri => "XRI",
            Self::Lda => "LDA",
            Self::Sta => "STA",
            Self::Ldx => "LDX",
            Self::Stx => "STX",
            Self::Mov => "MOV",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Cmp => "CMP",
            Self::Bti => "BTI",
            Self::Ada => "ADA",
            Self::Sba => "SBA",
            Self::Cpa => "CPA",
            Self::Ana => "ANA",
            Self::Ora => "ORA",
            Self::Xra => "XRA",
            Self::Bta => "BTA",
            Self::Irq => "IRQ",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Coarse decode group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OpcodeGroup {
    /// `0x00..=0x0F`: no embedded registers.
    Implicit,
    /// `0x10..=0x5F` and `0xD0..=0xEF`: register index in bits 1..0.
    SingleRegister,
    /// `0x60..=0xCF`: destination in bits 1..0, source in bits 3..2.
    RegisterPair,
}

impl OpcodeGroup {
    /// Group for a raw byte, `None` for the reserved `0xF0..=0xFF` range.
    #[must_use]
    pub const fn of(byte: u8) -> Option<Self> {
        match byte {
            0x00..=0x0F => Some(Self::Implicit),
            0x10..=0x5F | 0xD0..=0xEF => Some(Self::SingleRegister),
            0x60..=0xCF => Some(Self::RegisterPair),
            0xF0..=0xFF => None,
        }
    }

    /// Mask that turns an opcode byte into its base code.
    #[must_use]
    pub const fn mask(self) -> u8 {
        match self {
            Self::Implicit => 0xFF,
            Self::SingleRegister => 0xFC,
            Self::RegisterPair => 0xF0,
        }
    }
}

/// What follows the opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperandType {
    None,
    /// One address, little-endian, address-width bytes.
    Address,
    /// One data byte.
    Immediate,
    /// Base register in bits 7..6, displacement in bits 5..0.
    RegisterAndImmediate,
}

impl OperandType {
    /// Instruction length in bytes, opcode included.
    #[must_use]
    pub const fn length<A: Arch>(self) -> usize {
        match self {
            Self::None => 1,
            Self::Immediate | Self::RegisterAndImmediate => 2,
            Self::Address => 1 + A::Addr::BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagOp {
    ClearCarry,
    SetCarry,
    ClearZero,
    SetZero,
    SetInterruptDisable,
    ClearInterruptDisable,
}

/// Jump condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Always,
    CarryClear,
    CarrySet,
    ZeroClear,
    ZeroSet,
}

impl Condition {
    #[must_use]
    pub const fn holds(self, zero: bool, carry: bool) -> bool {
        match self {
            Self::Always => true,
            Self::CarryClear => !carry,
            Self::CarrySet => carry,
            Self::ZeroClear => !zero,
            Self::ZeroSet => zero,
        }
    }
}

/// Behaviour family: selects the phase list an instruction is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Nop,
    Halt,
    Flag(FlagOp),
    Jump(Condition),
    Call,
    Return,
    ReturnFromInterrupt,
    Unary(UnaryOp),
    Push,
    Pop,
    Peek,
    Immediate(AluOp),
    RegisterPair(AluOp),
    MemoryAlu(AluOp),
    Load,
    Store,
    LoadIndexed,
    StoreIndexed,
    Interrupt,
}

/// Immutable description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpcodeMetadata {
    pub mnemonic: Mnemonic,
    pub base: u8,
    pub group: OpcodeGroup,
    /// Register indices embedded in the opcode byte (0, 1 or 2).
    pub registers: u8,
    pub operand: OperandType,
    pub family: Family,
}

impl OpcodeMetadata {
    const fn new(
        mnemonic: Mnemonic,
        base: u8,
        group: OpcodeGroup,
        operand: OperandType,
        family: Family,
    ) -> Self {
        let registers = match group {
            OpcodeGroup::Implicit => 0,
            OpcodeGroup::SingleRegister => 1,
            OpcodeGroup::RegisterPair => 2,
        };
        Self {
            mnemonic,
            base,
            group,
            registers,
            operand,
            family,
        }
    }

    #[must_use]
    pub const fn length<A: Arch>(&self) -> usize {
        self.operand.length::<A>()
    }
}

/// Metadata for the interrupt service sequence.
pub static INTERRUPT: OpcodeMetadata = OpcodeMetadata::new(
    Mnemonic::Irq,
    0x00,
    OpcodeGroup::Implicit,
    OperandType::None,
    Family::Interrupt,
);

const fn implicit(mnemonic: Mnemonic, base: u8, operand: OperandType, family: Family) -> OpcodeMetadata {
    OpcodeMetadata::new(mnemonic, base, OpcodeGroup::Implicit, operand, family)
}

const fn single(mnemonic: Mnemonic, base: u8, operand: OperandType, family: Family) -> OpcodeMetadata {
    OpcodeMetadata::new(mnemonic, base, OpcodeGroup::SingleRegister, operand, family)
}

const fn pair(mnemonic: Mnemonic, base: u8, op: AluOp) -> OpcodeMetadata {
    OpcodeMetadata::new(
        mnemonic,
        base,
        OpcodeGroup::RegisterPair,
        OperandType::None,
        Family::RegisterPair(op),
    )
}

use Mnemonic as M;
use OperandType as O;

static TABLE: [OpcodeMetadata; 51] = [
    implicit(M::Nop, 0x00, O::None, Family::Nop),
    implicit(M::Hlt, 0x01, O::None, Family::Halt),
    implicit(M::Clc, 0x02, O::None, Family::Flag(FlagOp::ClearCarry)),
    implicit(M::Sec, 0x03, O::None, Family::Flag(FlagOp::SetCarry)),
    implicit(M::Clz, 0x04, O::None, Family::Flag(FlagOp::ClearZero)),
    implicit(M::Sez, 0x05, O::None, Family::Flag(FlagOp::SetZero)),
    implicit(M::Sei, 0x06, O::None, Family::Flag(FlagOp::SetInterruptDisable)),
    implicit(M::Cli, 0x07, O::None, Family::Flag(FlagOp::ClearInterruptDisable)),
    implicit(M::Jmp, 0x08, O::Address, Family::Jump(Condition::Always)),
    implicit(M::Jcc, 0x09, O::Address, Family::Jump(Condition::CarryClear)),
    implicit(M::Jcs, 0x0A, O::Address, Family::Jump(Condition::CarrySet)),
    implicit(M::Jzc, 0x0B, O::Address, Family::Jump(Condition::ZeroClear)),
    implicit(M::Jzs, 0x0C, O::Address, Family::Jump(Condition::ZeroSet)),
    implicit(M::Cal, 0x0D, O::Address, Family::Call),
    implicit(M::Ret, 0x0E, O::None, Family::Return),
    implicit(M::Rti, 0x0F, O::None, Family::ReturnFromInterrupt),
    single(M::Inc, 0x10, O::None, Family::Unary(UnaryOp::Inc)),
    single(M::Dec, 0x14, O::None, Family::Unary(UnaryOp::Dec)),
    single(M::Lsh, 0x18, O::None, Family::Unary(UnaryOp::ShiftLeft)),
    single(M::Rsh, 0x1C, O::None, Family::Unary(UnaryOp::ShiftRight)),
    single(M::Lrt, 0x20, O::None, Family::Unary(UnaryOp::RotateLeft)),
    single(M::Rrt, 0x24, O::None, Family::Unary(UnaryOp::RotateRight)),
    single(M::Psh, 0x28, O::None, Family::Push),
    single(M::Pop, 0x2C, O::None, Family::Pop),
    single(M::Pek, 0x30, O::None, Family::Peek),
    single(M::Ldi, 0x34, O::Immediate, Family::Immediate(AluOp::Move)),
    single(M::Adi, 0x38, O::Immediate, Family::Immediate(AluOp::Add)),
    single(M::Sbi, 0x3C, O::Immediate, Family::Immediate(AluOp::Sub)),
    single(M::Cpi, 0x40, O::Immediate, Family::Immediate(AluOp::Compare)),
    single(M::Ani, 0x44, O::Immediate, Family::Immediate(AluOp::And)),
    single(M::Ori, 0x48, O::Immediate, Family::Immediate(AluOp::Or)),
    single(M::Xri, 0x4C, O::Immediate, Family::Immediate(AluOp::Xor)),
    single(M::Lda, 0x50, O::Address, Family::Load),
    single(M::Sta, 0x54, O::Address, Family::Store),
    single(M::Ldx, 0x58, O::RegisterAndImmediate, Family::LoadIndexed),
    single(M::Stx, 0x5C, O::RegisterAndImmediate, Family::StoreIndexed),
    pair(M::Mov, 0x60, AluOp::Move),
    pair(M::Add, 0x70, AluOp::Add),
    pair(M::Sub, 0x80, AluOp::Sub),
    pair(M::And, 0x90, AluOp::And),
    pair(M::Or, 0xA0, AluOp::Or),
    pair(M::Xor, 0xB0, AluOp::Xor),
    pair(M::Cmp, 0xC0, AluOp::Compare),
    single(M::Bti, 0xD0, O::Immediate, Family::Immediate(AluOp::BitTest)),
    single(M::Ada, 0xD4, O::Address, Family::MemoryAlu(AluOp::Add)),
    single(M::Sba, 0xD8, O::Address, Family::MemoryAlu(AluOp::Sub)),
    single(M::Cpa, 0xDC, O::Address, Family::MemoryAlu(AluOp::Compare)),
    single(M::Ana, 0xE0, O::Address, Family::MemoryAlu(AluOp::And)),
    single(M::Ora, 0xE4, O::Address, Family::MemoryAlu(AluOp::Or)),
    single(M::Xra, 0xE8, O::Address, Family::MemoryAlu(AluOp::Xor)),
    single(M::Bta, 0xEC, O::Address, Family::MemoryAlu(AluOp::BitTest)),
];

/// Every defined opcode, in base-code order.
#[must_use]
pub fn table() -> &'static [OpcodeMetadata] {
    &TABLE
}

fn registry() -> &'static [Option<&'static OpcodeMetadata>; 256] {
    static REGISTRY: OnceLock<[Option<&'static OpcodeMetadata>; 256]> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut entries = [None; 256];
        for (byte, entry) in (0..=u8::MAX).zip(entries.iter_mut()) {
            let Some(group) = OpcodeGroup::of(byte) else {
                continue;
            };
            let base = byte & group.mask();
            *entry = TABLE
                .iter()
                .find(|meta| meta.group == group && meta.base == base);
        }
        entries
    })
}

/// Resolve an opcode byte. Pure: the same byte always yields the same entry.
#[must_use]
pub fn decode(byte: u8) -> Option<&'static OpcodeMetadata> {
    registry()[usize::from(byte)]
}
