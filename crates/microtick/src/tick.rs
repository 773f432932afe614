//! Tick-level fetch/execute driver.

use microtick_core::Ticks;
use serde::Serialize;

use crate::arch::{Address, Arch};
use crate::error::{CpuError, Result};
use crate::instruction::Instruction;
use crate::machine::Machine;
use crate::microcode::MicroPhase;
use crate::opcodes::{self, Mnemonic};
use crate::trace::TickTrace;

/// Outcome of one successful tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MicrocodeTickResult {
    /// Ticks completed, this one included.
    pub tick: Ticks,
    pub executed_phase: MicroPhase,
    pub next_phase: MicroPhase,
    /// Instruction in flight after the tick.
    pub opcode: Option<Mnemonic>,
    /// True exactly when `next_phase` is `Done`.
    pub instruction_complete: bool,
    pub trace: Option<TickTrace>,
}

/// Owns the in-flight instruction and its phase cursor.
///
/// Between instructions the handler sits at a fetch boundary. The next
/// tick there either starts a latched interrupt (if interrupts are
/// enabled) or fetches and decodes the opcode at PC.
#[derive(Debug, Clone)]
pub struct TickHandler<A: Arch> {
    current: Option<Instruction<A>>,
    /// Index of the next phase of `current` to run.
    cursor: usize,
    irq_pending: bool,
    ticks: Ticks,
}

impl<A: Arch> Default for TickHandler<A> {
    fn default() -> Self {
        Self {
            current: None,
            cursor: 0,
            irq_pending: false,
            ticks: Ticks::ZERO,
        }
    }
}

impl<A: Arch> TickHandler<A> {
    /// Drop the in-flight instruction, any latched interrupt and the tick
    /// count.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn ticks(&self) -> Ticks {
        self.ticks
    }

    #[must_use]
    pub fn current(&self) -> Option<&Instruction<A>> {
        self.current.as_ref()
    }

    /// Phase the next tick will run, `Done` at a fetch boundary.
    #[must_use]
    pub fn next_phase(&self) -> MicroPhase {
        self.current
            .as_ref()
            .map_or(MicroPhase::Done, |i| i.phase_at(self.cursor))
    }

    /// True when the next tick begins a new instruction.
    #[must_use]
    pub fn at_boundary(&self) -> bool {
        self.next_phase() == MicroPhase::Done
    }

    /// Latch an interrupt request. It is serviced at the next fetch
    /// boundary where the I flag is clear.
    pub fn request_interrupt(&mut self) {
        self.irq_pending = true;
    }

    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    /// Run one micro-phase. On error nothing is counted and the cursor,
    /// in-flight instruction and latch are left as they were.
    pub fn tick(&mut self, m: &mut Machine<A>) -> Result<MicrocodeTickResult> {
        m.bus.recorder_mut().clear();

        let executed = if self.at_boundary() {
            self.begin_instruction(m)?
        } else {
            self.run_phase(m)?
        };

        self.ticks = self.ticks.next();
        let next_phase = self.next_phase();
        Ok(MicrocodeTickResult {
            tick: self.ticks,
            executed_phase: executed,
            next_phase,
            opcode: self.current.as_ref().map(Instruction::mnemonic),
            instruction_complete: next_phase == MicroPhase::Done,
            trace: None,
        })
    }

    fn run_phase(&mut self, m: &mut Machine<A>) -> Result<MicroPhase> {
        let Some(instruction) = self.current.as_mut() else {
            return Ok(MicroPhase::Done);
        };
        let phase = instruction.tick(self.cursor, m)?;
        log::trace!(
            "{} phase {} {:?}",
            instruction.mnemonic(),
            self.cursor,
            phase
        );
        self.cursor += 1;
        Ok(phase)
    }

    fn begin_instruction(&mut self, m: &mut Machine<A>) -> Result<MicroPhase> {
        let pc = m.state.pc();

        if self.irq_pending && !m.state.flags().interrupt_disable {
            let mut service = Instruction::interrupt(pc);
            let phase = service.tick(0, m)?;
            log::debug!(
                "servicing IRQ at PC {pc:#06X}, vector {:#06X}",
                m.irq_vector
            );
            self.irq_pending = false;
            self.current = Some(service);
            self.cursor = 1;
            return Ok(phase);
        }

        let opcode = m.bus.read(pc.wide())?;
        let meta = opcodes::decode(opcode).ok_or(CpuError::UnknownOpcode {
            opcode,
            pc: pc.wide(),
        })?;
        let instruction = Instruction::new(meta, opcode, pc, m.state.register_count())?;
        m.state.advance_pc();
        log::trace!("fetch {opcode:#04X} {} at {pc:#06X}", meta.mnemonic);

        self.current = Some(instruction);
        self.cursor = 0;
        Ok(MicroPhase::FetchOpcode)
    }
}
