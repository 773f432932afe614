//! Hardware stack in the top bytes of RAM.

use std::marker::PhantomData;

use crate::arch::{Address, Arch};
use crate::bus::Bus;
use crate::error::{CpuError, Result};

/// Descending stack with SP pointing at the next free slot.
///
/// Push writes at SP then decrements; pop increments then reads. SP never
/// leaves `[bottom, top]`, so a stack of `size` bytes holds `size - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stack<A: Arch> {
    top: usize,
    size: usize,
    sp: usize,
    _arch: PhantomData<A>,
}

impl<A: Arch> Stack<A> {
    /// `size` bytes ending at `top`. Callers validate the layout first
    /// (see `CpuConfig::validate`).
    #[must_use]
    pub(crate) fn new(top: usize, size: usize) -> Self {
        debug_assert!((1..=top + 1).contains(&size), "stack {size} bytes below {top:#X}");
        Self {
            top,
            size,
            sp: top,
            _arch: PhantomData,
        }
    }

    pub fn reset(&mut self) {
        self.sp = self.top;
    }

    #[must_use]
    pub fn sp(&self) -> A::Addr {
        A::Addr::wrap(self.sp as u32)
    }

    #[must_use]
    pub fn top(&self) -> usize {
        self.top
    }

    #[must_use]
    pub fn bottom(&self) -> usize {
        self.top + 1 - self.size
    }

    /// Bytes currently on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.top - self.sp
    }

    /// Bytes that can still be pushed.
    #[must_use]
    pub fn free(&self) -> usize {
        self.sp - self.bottom()
    }

    fn overflow(&self) -> CpuError {
        CpuError::StackOverflow { sp: self.sp as u32 }
    }

    fn underflow(&self) -> CpuError {
        CpuError::StackUnderflow { sp: self.sp as u32 }
    }

    pub fn push_byte(&mut self, bus: &mut Bus, value: u8) -> Result<()> {
        if self.free() == 0 {
            return Err(self.overflow());
        }
        bus.write_stack(self.sp, value)?;
        self.sp -= 1;
        Ok(())
    }

    pub fn pop_byte(&mut self, bus: &mut Bus) -> Result<u8> {
        if self.depth() == 0 {
            return Err(self.underflow());
        }
        let value = bus.read_stack(self.sp + 1)?;
        self.sp += 1;
        Ok(value)
    }

    /// Read the most recently pushed byte without moving SP.
    pub fn peek_byte(&self, bus: &mut Bus) -> Result<u8> {
        if self.depth() == 0 {
            return Err(self.underflow());
        }
        bus.read_stack(self.sp + 1)
    }

    /// Fail unless `bytes` more can be pushed.
    pub fn ensure_room(&self, bytes: usize) -> Result<()> {
        if self.free() < bytes {
            return Err(self.overflow());
        }
        Ok(())
    }

    /// Fail unless `bytes` can be popped.
    pub fn ensure_depth(&self, bytes: usize) -> Result<()> {
        if self.depth() < bytes {
            return Err(self.underflow());
        }
        Ok(())
    }
}
