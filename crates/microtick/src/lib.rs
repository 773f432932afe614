//! Micro-op accurate emulator for a small custom CPU.
//!
//! Each call to [`Cpu::tick`] performs exactly one bus transaction or one
//! internal operation. The same execution core runs with 8-bit or 16-bit
//! addresses, selected by the [`Arch`] type parameter; the `wide` feature
//! picks which one [`Native`] names.
//!
//! ```
//! use microtick::{Bits8, Cpu, CpuConfig};
//!
//! let mut cpu = Cpu::<Bits8>::new(CpuConfig::default())?;
//! // LDI R0, #$29 ; INC R0 ; HLT
//! cpu.load_program(&[0x34, 0x29, 0x10, 0x01])?;
//! assert_eq!(cpu.run(100)?, 2);
//! assert_eq!(cpu.register(0)?, 0x2A);
//! # Ok::<(), microtick::CpuError>(())
//! ```

pub mod alu;
mod arch;
mod bus;
mod config;
mod cpu;
mod error;
pub mod flags;
mod inspector;
mod instruction;
mod machine;
mod memory;
mod microcode;
pub mod opcodes;
mod stack;
mod state;
mod tick;
mod trace;

pub use arch::{Address, Arch, Bits8, Bits16, Native};
pub use bus::{Bus, BusAccess, BusDirection, BusRecorder, BusType, VramDevice};
pub use config::{CpuConfig, IRQ_AREA, MAX_REGISTERS};
pub use cpu::Cpu;
pub use error::{CpuError, Result};
pub use flags::Flags;
pub use inspector::CpuInspector;
pub use instruction::{Instruction, disassemble};
pub use machine::Machine;
pub use memory::Memory;
pub use microcode::{MicroPhase, PhaseClass};
pub use opcodes::{Mnemonic, OpcodeMetadata, OperandType, decode};
pub use stack::Stack;
pub use state::State;
pub use tick::{MicrocodeTickResult, TickHandler};
pub use trace::{RegisterChange, Snapshot, TickTrace, TickTracer};

pub use microtick_core::{IoDevice, Observable, Ticks, Value};
