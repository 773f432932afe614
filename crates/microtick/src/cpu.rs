//! CPU facade.

use microtick_core::{IoDevice, Observable, Ticks, Value};

use crate::arch::{Address, Arch, Native};
use crate::bus::{Bus, VramDevice};
use crate::config::CpuConfig;
use crate::error::{CpuError, Result};
use crate::flags::Flags;
use crate::inspector::CpuInspector;
use crate::instruction::{self, Instruction};
use crate::machine::Machine;
use crate::memory::Memory;
use crate::microcode::MicroPhase;
use crate::opcodes;
use crate::stack::Stack;
use crate::state::State;
use crate::tick::{MicrocodeTickResult, TickHandler};
use crate::trace::TickTracer;

/// A micro-op accurate CPU.
///
/// [`tick()`](Cpu::tick) runs exactly one phase: one bus transaction or one
/// internal operation. [`step()`](Cpu::step) ticks until the current
/// instruction completes.
#[derive(Debug)]
pub struct Cpu<A: Arch = Native> {
    config: CpuConfig,
    machine: Machine<A>,
    handler: TickHandler<A>,
    tracer: TickTracer,
    halted: bool,
    /// Text of the most recently completed instruction.
    last_instruction: Option<String>,
}

impl<A: Arch> Cpu<A> {
    /// Build a CPU from a validated configuration. Memory starts zeroed.
    pub fn new(config: CpuConfig) -> Result<Self> {
        config.validate::<A>()?;

        let mut bus = Bus::new(Memory::new(config.memory_size), A::IO_BASE);
        if let Some(size) = config.vram_size {
            bus.attach(Box::new(VramDevice::new(size)), size);
        }
        let machine = Machine::new(
            State::new(config.register_count),
            bus,
            Stack::new(config.stack_top(), config.stack_size),
            A::Addr::wrap(config.irq_vector() as u32),
        );

        log::debug!(
            "{} CPU: {} bytes RAM, {}-byte stack, {} registers, IRQ vector {:#06X}",
            A::NAME,
            config.memory_size,
            config.stack_size,
            config.register_count,
            config.irq_vector()
        );

        Ok(Self {
            config,
            machine,
            handler: TickHandler::default(),
            tracer: TickTracer::default(),
            halted: false,
            last_instruction: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &CpuConfig {
        &self.config
    }

    /// Run one micro-phase.
    ///
    /// HLT surfaces as [`CpuError::Halted`] with PC left on the HLT byte.
    /// Any error leaves the tick uncounted.
    pub fn tick(&mut self) -> Result<MicrocodeTickResult> {
        let before = self.tracer.begin(&self.machine);

        let mut result = match self.handler.tick(&mut self.machine) {
            Ok(result) => result,
            Err(err) => {
                if err.is_halt() {
                    if !self.halted {
                        log::debug!("{err}");
                    }
                    self.halted = true;
                } else {
                    log::debug!("tick failed: {err}");
                }
                return Err(err);
            }
        };

        self.halted = false;
        if result.instruction_complete {
            self.last_instruction = self.handler.current().map(Instruction::text);
        }
        if let Some(before) = before {
            let trace = TickTracer::finish(
                before,
                result.tick,
                result.executed_phase,
                result.next_phase,
                result.opcode,
                &self.machine,
            );
            log::trace!("{trace}");
            result.trace = Some(trace);
        }
        Ok(result)
    }

    /// Tick until the current instruction completes. At a fetch boundary
    /// this runs one whole instruction (or interrupt entry).
    pub fn step(&mut self) -> Result<Vec<MicrocodeTickResult>> {
        let mut results = Vec::new();
        loop {
            let result = self.tick()?;
            let complete = result.instruction_complete;
            results.push(result);
            if complete {
                return Ok(results);
            }
        }
    }

    /// Step up to `max_instructions` instructions. Stops early, without
    /// error, on HLT. Returns the number of instructions completed.
    pub fn run(&mut self, max_instructions: usize) -> Result<usize> {
        for completed in 0..max_instructions {
            match self.step() {
                Ok(_) => {}
                Err(err) if err.is_halt() => return Ok(completed),
                Err(err) => return Err(err),
            }
        }
        Ok(max_instructions)
    }

    /// Zero registers, flags, PC and tick count; empty the stack; drop any
    /// in-flight instruction and latched interrupt. Memory is kept.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.handler.reset();
        self.halted = false;
        self.last_instruction = None;
        log::debug!("reset");
    }

    /// Clear memory, copy `program` in at address 0 and reset.
    ///
    /// A program larger than memory is rejected and nothing changes.
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        let size = self.machine.bus.memory().size();
        if program.len() > size {
            return Err(CpuError::ProgramTooLarge {
                len: program.len(),
                size,
            });
        }
        let memory = self.machine.bus.memory_mut();
        memory.clear();
        memory.load_bytes(0, program)?;
        log::debug!("loaded {} byte program", program.len());
        self.reset();
        Ok(())
    }

    /// Latch an interrupt request.
    pub fn request_interrupt(&mut self) {
        self.handler.request_interrupt();
    }

    /// Map a device over the whole I/O window, replacing any current one.
    pub fn attach_device(&mut self, device: Box<dyn IoDevice>) {
        self.machine.bus.attach(device, A::IO_LEN);
    }

    pub fn detach_device(&mut self) -> Option<Box<dyn IoDevice>> {
        self.machine.bus.detach()
    }

    /// Traces are on by default.
    pub fn set_tracing(&mut self, enabled: bool) {
        self.tracer.set_enabled(enabled);
    }

    #[must_use]
    pub fn tracing(&self) -> bool {
        self.tracer.is_enabled()
    }

    // === Register access ===

    #[must_use]
    pub fn pc(&self) -> A::Addr {
        self.machine.state.pc()
    }

    pub fn set_pc(&mut self, pc: A::Addr) {
        self.machine.state.set_pc(pc);
    }

    #[must_use]
    pub fn sp(&self) -> A::Addr {
        self.machine.stack.sp()
    }

    pub fn register(&self, index: u8) -> Result<u8> {
        self.machine.state.register(index)
    }

    pub fn set_register(&mut self, index: u8, value: u8) -> Result<()> {
        self.machine.state.set_register(index, value)
    }

    #[must_use]
    pub fn registers(&self) -> &[u8] {
        self.machine.state.registers()
    }

    #[must_use]
    pub fn flags(&self) -> Flags {
        self.machine.state.flags()
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.machine.state.set_flags(flags);
    }

    // === Memory access ===

    /// Read through the bus decoder without side effects. Inside an
    /// attached I/O window this returns the device's byte, not the RAM
    /// that [`write_memory`](Cpu::write_memory) fills.
    pub fn read_memory(&self, address: usize) -> Result<u8> {
        self.machine.bus.peek(address as u32)
    }

    /// Write RAM directly. Not recorded, and the I/O window is bypassed.
    pub fn write_memory(&mut self, address: usize, value: u8) -> Result<()> {
        self.machine.bus.memory_mut().write_byte(address, value)
    }

    #[must_use]
    pub fn memory(&self) -> &[u8] {
        self.machine.bus.memory().as_slice()
    }

    // === Execution state ===

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Ticks completed since the last reset.
    #[must_use]
    pub fn cycles(&self) -> Ticks {
        self.handler.ticks()
    }

    /// True when the next tick fetches (or enters an interrupt).
    /// Breakpoints on PC should only match here.
    #[must_use]
    pub fn at_instruction_boundary(&self) -> bool {
        self.handler.at_boundary()
    }

    #[must_use]
    pub fn next_phase(&self) -> MicroPhase {
        self.handler.next_phase()
    }

    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.handler.irq_pending()
    }

    #[must_use]
    pub fn current_instruction(&self) -> Option<&Instruction<A>> {
        self.handler.current()
    }

    #[must_use]
    pub fn last_instruction(&self) -> Option<&str> {
        self.last_instruction.as_deref()
    }

    /// Disassemble the instruction at `address` without side effects.
    /// Returns its text and length, or `None` for an undecodable byte.
    #[must_use]
    pub fn disassemble(&self, address: usize) -> Option<(String, usize)> {
        let opcode = self.read_memory(address).ok()?;
        let meta = opcodes::decode(opcode)?;
        let len = meta.length::<A>();
        let operands: Vec<u8> = (1..len)
            .map(|n| self.read_memory(address + n).unwrap_or(0))
            .collect();
        Some((instruction::disassemble::<A>(meta, opcode, &operands), len))
    }

    /// Snapshot for debuggers and tests.
    #[must_use]
    pub fn inspect(&self) -> CpuInspector {
        let stack = &self.machine.stack;
        let memory = self.memory();
        CpuInspector {
            architecture: A::NAME,
            cycles: self.cycles().get(),
            pc: self.pc().wide(),
            sp: self.sp().wide(),
            registers: self.registers().to_vec(),
            flags: self.flags(),
            halted: self.halted,
            irq_pending: self.irq_pending(),
            next_phase: self.next_phase(),
            last_instruction: self.last_instruction.clone(),
            memory: memory.to_vec(),
            stack: memory
                .get(stack.sp().index() + 1..=stack.top())
                .map(<[u8]>::to_vec)
                .unwrap_or_default(),
        }
    }
}

impl<A: Arch> Observable for Cpu<A> {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.pc().into()),
            "sp" => Some(self.sp().into()),
            "flags.z" => Some(self.flags().zero.into()),
            "flags.c" => Some(self.flags().carry.into()),
            "flags.i" => Some(self.flags().interrupt_disable.into()),
            "cycles" => Some(self.cycles().get().into()),
            "halted" => Some(self.halted.into()),
            "irq_pending" => Some(self.irq_pending().into()),
            "opcode" => self
                .current_instruction()
                .map(|i| i.mnemonic().name().into()),
            "phase" => Some(format!("{:?}", self.next_phase()).into()),
            _ => {
                let index = path.strip_prefix('r')?.parse::<u8>().ok()?;
                self.register(index).ok().map(Value::from)
            }
        }
    }

    fn query_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = ["pc", "sp"].iter().map(ToString::to_string).collect();
        paths.extend((0..self.registers().len()).map(|i| format!("r{i}")));
        paths.extend(
            [
                "flags.z",
                "flags.c",
                "flags.i",
                "cycles",
                "halted",
                "irq_pending",
                "opcode",
                "phase",
            ]
            .iter()
            .map(ToString::to_string),
        );
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Bits16, Bits8};

    fn cpu(program: &[u8]) -> Cpu<Bits8> {
        let mut cpu = Cpu::new(CpuConfig::default()).unwrap();
        cpu.load_program(program).unwrap();
        cpu
    }

    #[test]
    fn rejects_invalid_config() {
        let config = CpuConfig {
            register_count: 0,
            ..CpuConfig::default()
        };
        assert!(matches!(
            Cpu::<Bits8>::new(config),
            Err(CpuError::InvalidConfig(_))
        ));
    }

    #[test]
    fn oversized_program_changes_nothing() {
        let mut cpu = cpu(&[0x34, 0x07]);
        cpu.step().unwrap();
        let err = cpu.load_program(&[0; 257]).unwrap_err();
        assert_eq!(err, CpuError::ProgramTooLarge { len: 257, size: 256 });
        assert_eq!(cpu.register(0), Ok(0x07));
        assert_eq!(cpu.read_memory(1), Ok(0x07));
    }

    #[test]
    fn observable_paths_all_resolve() {
        let mut cpu = cpu(&[0x00]);
        cpu.tick().unwrap();
        for path in cpu.query_paths() {
            assert!(cpu.query(&path).is_some(), "{path}");
        }
        assert_eq!(cpu.query("r4"), None);
        assert_eq!(cpu.query("pc"), Some(Value::U8(0)));
    }

    #[test]
    fn opcode_path_follows_current_instruction() {
        let mut cpu = cpu(&[0x71]);
        assert_eq!(cpu.query("opcode"), None);
        cpu.tick().unwrap();
        assert_eq!(cpu.query("opcode"), Some(Value::from("ADD")));
        assert_eq!(cpu.query("phase"), Some(Value::from("AluOp")));
    }

    #[test]
    fn wide_pc_is_sixteen_bits() {
        let cpu = Cpu::<Bits16>::new(CpuConfig::default()).unwrap();
        assert_eq!(cpu.query("pc"), Some(Value::U16(0)));
    }

    #[test]
    fn disassembles_from_memory() {
        let cpu = cpu(&[0x34, 0xFF, 0x08, 0x10]);
        assert_eq!(cpu.disassemble(0), Some(("LDI R0, #$FF".to_string(), 2)));
        assert_eq!(cpu.disassemble(2), Some(("JMP $10".to_string(), 2)));
    }

    #[test]
    fn run_stops_at_halt() {
        let mut cpu = cpu(&[0x00, 0x00, 0x01]);
        assert_eq!(cpu.run(10), Ok(2));
        assert!(cpu.is_halted());
        assert_eq!(cpu.pc(), 2);
        cpu.reset();
        assert!(!cpu.is_halted());
    }
}
