//! ALU operations.
//!
//! Each operation returns the value to write back (if any) and the flags it
//! affects. A `None` flag means "leave unchanged".

/// Two-operand operation. `a` is the destination register, `b` the source
/// (register, immediate or memory byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    Move,
    Add,
    Sub,
    Compare,
    And,
    Or,
    Xor,
    BitTest,
}

/// Single-register operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Inc,
    Dec,
    ShiftLeft,
    ShiftRight,
    RotateLeft,
    RotateRight,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AluResult {
    pub value: Option<u8>,
    pub zero: Option<bool>,
    pub carry: Option<bool>,
}

impl AluResult {
    const fn write(value: u8) -> Self {
        Self {
            value: Some(value),
            zero: None,
            carry: None,
        }
    }

    const fn with_zero(value: u8) -> Self {
        Self {
            value: Some(value),
            zero: Some(value == 0),
            carry: None,
        }
    }
}

/// Add with carry in. C is set on unsigned overflow.
#[must_use]
pub fn add(a: u8, b: u8, carry: bool) -> AluResult {
    let result = u16::from(a) + u16::from(b) + u16::from(carry);
    AluResult {
        value: Some(result as u8),
        zero: Some(result as u8 == 0),
        carry: Some(result > 0xFF),
    }
}

/// Subtract with borrow. Carry in set means "no borrow pending"; carry out
/// set means the result did not go negative.
#[must_use]
pub fn sub(a: u8, b: u8, carry: bool) -> AluResult {
    let result = i16::from(a) - i16::from(b) - i16::from(!carry);
    AluResult {
        value: Some(result as u8),
        zero: Some(result as u8 == 0),
        carry: Some(result >= 0),
    }
}

#[must_use]
pub fn compare(a: u8, b: u8) -> AluResult {
    AluResult {
        value: None,
        zero: Some(a == b),
        carry: Some(a >= b),
    }
}

/// Bit test. Z is set when any tested bit is set, the inverse of the usual
/// convention.
#[must_use]
pub fn bit_test(a: u8, b: u8) -> AluResult {
    AluResult {
        value: None,
        zero: Some(a & b != 0),
        carry: None,
    }
}

#[must_use]
pub fn binary(op: AluOp, a: u8, b: u8, carry: bool) -> AluResult {
    match op {
        AluOp::Move => AluResult::write(b),
        AluOp::Add => add(a, b, carry),
        AluOp::Sub => sub(a, b, carry),
        AluOp::Compare => compare(a, b),
        AluOp::And => AluResult::with_zero(a & b),
        AluOp::Or => AluResult::with_zero(a | b),
        AluOp::Xor => AluResult::with_zero(a ^ b),
        AluOp::BitTest => bit_test(a, b),
    }
}

#[must_use]
pub fn unary(op: UnaryOp, a: u8) -> AluResult {
    match op {
        UnaryOp::Inc => AluResult::with_zero(a.wrapping_add(1)),
        UnaryOp::Dec => AluResult::with_zero(a.wrapping_sub(1)),
        UnaryOp::ShiftLeft => AluResult {
            carry: Some(a & 0x80 != 0),
            ..AluResult::with_zero(a << 1)
        },
        UnaryOp::ShiftRight => AluResult {
            carry: Some(a & 0x01 != 0),
            ..AluResult::with_zero(a >> 1)
        },
        UnaryOp::RotateLeft => AluResult::with_zero(a.rotate_left(1)),
        UnaryOp::RotateRight => AluResult::with_zero(a.rotate_right(1)),
    }
}
