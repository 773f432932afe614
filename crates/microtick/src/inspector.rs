//! Read-only CPU snapshot.

use std::fmt;

use serde::Serialize;

use crate::flags::Flags;
use crate::microcode::MicroPhase;

/// Everything a debugger shows, copied out of the CPU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuInspector {
    pub architecture: &'static str,
    pub cycles: u64,
    pub pc: u32,
    pub sp: u32,
    pub registers: Vec<u8>,
    pub flags: Flags,
    pub halted: bool,
    pub irq_pending: bool,
    pub next_phase: MicroPhase,
    pub last_instruction: Option<String>,
    pub memory: Vec<u8>,
    /// Bytes currently on the stack, most recently pushed first.
    pub stack: Vec<u8>,
}

impl fmt::Display for CpuInspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} CPU  cycles {}  PC {:04X}  SP {:04X}  {}{}",
            self.architecture,
            self.cycles,
            self.pc,
            self.sp,
            self.flags,
            if self.halted { "  HALTED" } else { "" }
        )?;
        for (i, value) in self.registers.iter().enumerate() {
            write!(f, "R{i} {value:02X}  ")?;
        }
        writeln!(f)?;
        if let Some(text) = &self.last_instruction {
            writeln!(f, "last: {text}")?;
        }
        write!(f, "stack:")?;
        for value in &self.stack {
            write!(f, " {value:02X}")?;
        }
        writeln!(f)?;
        for (row, chunk) in self.memory.chunks(16).enumerate() {
            write!(f, "{:04X}:", row * 16)?;
            for value in chunk {
                write!(f, " {value:02X}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
