//! The parts of the CPU a phase may touch.

use crate::arch::Arch;
use crate::bus::Bus;
use crate::stack::Stack;
use crate::state::State;

/// Registers, bus and stack, borrowed together by the running phase.
#[derive(Debug)]
pub struct Machine<A: Arch> {
    pub(crate) state: State<A>,
    pub(crate) bus: Bus,
    pub(crate) stack: Stack<A>,
    pub(crate) irq_vector: A::Addr,
}

impl<A: Arch> Machine<A> {
    pub(crate) fn new(state: State<A>, bus: Bus, stack: Stack<A>, irq_vector: A::Addr) -> Self {
        Self {
            state,
            bus,
            stack,
            irq_vector,
        }
    }

    /// Zero registers and flags, empty the stack. Memory is untouched.
    pub(crate) fn reset(&mut self) {
        self.state.reset();
        self.stack.reset();
        self.bus.recorder_mut().clear();
    }

    #[must_use]
    pub fn state(&self) -> &State<A> {
        &self.state
    }

    #[must_use]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    #[must_use]
    pub fn stack(&self) -> &Stack<A> {
        &self.stack
    }

    #[must_use]
    pub fn irq_vector(&self) -> A::Addr {
        self.irq_vector
    }
}
