//! Per-tick execution traces.

use std::fmt;

use microtick_core::Ticks;
use serde::Serialize;

use crate::arch::{Address, Arch};
use crate::bus::BusAccess;
use crate::flags::Flags;
use crate::machine::Machine;
use crate::microcode::{MicroPhase, PhaseClass};
use crate::opcodes::Mnemonic;

/// A register whose value changed during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegisterChange {
    pub index: u8,
    pub old: u8,
    pub new: u8,
}

/// Everything one tick did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickTrace {
    pub tick: Ticks,
    pub phase: MicroPhase,
    pub next_phase: MicroPhase,
    pub class: PhaseClass,
    pub pc_before: u32,
    pub pc_after: u32,
    pub sp_before: u32,
    pub sp_after: u32,
    pub mnemonic: Option<Mnemonic>,
    /// Changed registers only, in index order.
    pub registers: Vec<RegisterChange>,
    pub flags_before: Flags,
    pub flags_after: Flags,
    /// Present exactly when `class` is [`PhaseClass::Bus`].
    pub bus: Option<BusAccess>,
}

impl fmt::Display for TickTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = format!("{:?}", self.phase);
        write!(f, "#{:<6} {phase:<24}", self.tick.get())?;
        match self.mnemonic {
            Some(m) => write!(f, " {m:<3}")?,
            None => write!(f, " ---")?,
        }
        write!(
            f,
            " PC {:04X}->{:04X} SP {:04X}->{:04X} {}->{}",
            self.pc_before,
            self.pc_after,
            self.sp_before,
            self.sp_after,
            self.flags_before,
            self.flags_after
        )?;
        for change in &self.registers {
            write!(f, " R{} {:02X}->{:02X}", change.index, change.old, change.new)?;
        }
        if let Some(access) = self.bus {
            write!(f, " | {access}")?;
        }
        Ok(())
    }
}

/// Architectural state captured before a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pc: u32,
    sp: u32,
    flags: Flags,
    registers: Vec<u8>,
}

impl Snapshot {
    #[must_use]
    pub fn capture<A: Arch>(m: &Machine<A>) -> Self {
        Self {
            pc: m.state.pc().wide(),
            sp: m.stack.sp().wide(),
            flags: m.state.flags(),
            registers: m.state.registers().to_vec(),
        }
    }
}

/// Builds [`TickTrace`]s from before/after snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTracer {
    enabled: bool,
}

impl Default for TickTracer {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl TickTracer {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Snapshot before a tick, or `None` while tracing is off.
    #[must_use]
    pub fn begin<A: Arch>(&self, m: &Machine<A>) -> Option<Snapshot> {
        self.enabled.then(|| Snapshot::capture(m))
    }

    /// Diff against the state after the tick.
    #[must_use]
    pub fn finish<A: Arch>(
        before: Snapshot,
        tick: Ticks,
        phase: MicroPhase,
        next_phase: MicroPhase,
        mnemonic: Option<Mnemonic>,
        m: &Machine<A>,
    ) -> TickTrace {
        let after = Snapshot::capture(m);
        let registers = before
            .registers
            .iter()
            .zip(&after.registers)
            .enumerate()
            .filter(|(_, (old, new))| old != new)
            .map(|(index, (&old, &new))| RegisterChange {
                index: index as u8,
                old,
                new,
            })
            .collect();
        let class = phase.class();
        TickTrace {
            tick,
            phase,
            next_phase,
            class,
            pc_before: before.pc,
            pc_after: after.pc,
            sp_before: before.sp,
            sp_after: after.sp,
            mnemonic,
            registers,
            flags_before: before.flags,
            flags_after: after.flags,
            bus: match class {
                PhaseClass::Bus => m.bus.recorder().last(),
                PhaseClass::Internal => None,
            },
        }
    }
}
