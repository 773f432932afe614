//! Bus decoder, access recorder and the VRAM device.
//!
//! Every byte the CPU moves goes through [`Bus`], which records it in a
//! single-slot [`BusRecorder`]. The recorder is cleared at the start of
//! each tick, so after a tick it holds the one transaction that tick made
//! (if any).

use std::fmt;

use microtick_core::IoDevice;
use serde::Serialize;

use crate::error::Result;
use crate::memory::Memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BusDirection {
    Read,
    Write,
}

/// Which path an access took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BusType {
    /// RAM through the bus decoder, including opcode and operand fetches.
    Memory,
    /// RAM through the stack pointer.
    Stack,
    /// The memory-mapped device window.
    Io,
}

/// One bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BusAccess {
    pub address: u32,
    pub data: u8,
    pub direction: BusDirection,
    pub bus_type: BusType,
}

impl BusAccess {
    #[must_use]
    pub const fn new(address: u32, data: u8, direction: BusDirection, bus_type: BusType) -> Self {
        Self {
            address,
            data,
            direction,
            bus_type,
        }
    }
}

impl fmt::Display for BusAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            BusDirection::Read => 'R',
            BusDirection::Write => 'W',
        };
        write!(
            f,
            "{dir} {:?} [{:#06X}] = {:#04X}",
            self.bus_type, self.address, self.data
        )
    }
}

/// Holds the most recent bus access only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusRecorder {
    last: Option<BusAccess>,
}

impl BusRecorder {
    pub fn clear(&mut self) {
        self.last = None;
    }

    /// Record an access. A phase performs at most one transaction, so a
    /// second record within one tick is a microcode bug.
    pub fn record(&mut self, access: BusAccess) {
        debug_assert!(
            self.last.is_none(),
            "second bus transaction in one tick: {:?} then {access:?}",
            self.last
        );
        self.last = Some(access);
    }

    #[must_use]
    pub fn last(&self) -> Option<BusAccess> {
        self.last
    }
}

/// Byte-buffer device for the I/O window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VramDevice {
    data: Vec<u8>,
}

impl VramDevice {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl IoDevice for VramDevice {
    fn read(&mut self, offset: u16) -> u8 {
        self.peek(offset)
    }

    fn write(&mut self, offset: u16, value: u8) {
        if let Some(slot) = self.data.get_mut(usize::from(offset)) {
            *slot = value;
        }
    }

    fn peek(&self, offset: u16) -> u8 {
        self.data.get(usize::from(offset)).copied().unwrap_or(0)
    }
}

/// RAM plus an optional I/O window, with access recording.
///
/// Addresses in `[io_base, io_base + io_len)` go to the attached device
/// while one is attached; everything else goes to RAM. Stack accesses
/// bypass the window.
pub struct Bus {
    memory: Memory,
    device: Option<Box<dyn IoDevice>>,
    io_base: u32,
    io_len: usize,
    recorder: BusRecorder,
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("memory_size", &self.memory.size())
            .field("device", &self.device.is_some())
            .field("io_base", &self.io_base)
            .field("io_len", &self.io_len)
            .field("recorder", &self.recorder)
            .finish()
    }
}

impl Bus {
    #[must_use]
    pub fn new(memory: Memory, io_base: u32) -> Self {
        Self {
            memory,
            device: None,
            io_base,
            io_len: 0,
            recorder: BusRecorder::default(),
        }
    }

    /// Map `device` over `len` bytes of the I/O window, replacing any
    /// previous device.
    pub fn attach(&mut self, device: Box<dyn IoDevice>, len: usize) {
        self.device = Some(device);
        self.io_len = len;
    }

    pub fn detach(&mut self) -> Option<Box<dyn IoDevice>> {
        self.io_len = 0;
        self.device.take()
    }

    #[must_use]
    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    fn io_offset(&self, address: u32) -> Option<u16> {
        self.device.as_ref()?;
        let offset = address.checked_sub(self.io_base)?;
        (offset < self.io_len as u32).then_some(offset as u16)
    }

    /// Decoded read. Used for fetches and data loads.
    pub fn read(&mut self, address: u32) -> Result<u8> {
        if let Some(offset) = self.io_offset(address) {
            if let Some(device) = self.device.as_mut() {
                let data = device.read(offset);
                self.recorder.record(BusAccess::new(
                    address,
                    data,
                    BusDirection::Read,
                    BusType::Io,
                ));
                return Ok(data);
            }
        }
        let data = self.memory.read_byte(address as usize)?;
        self.recorder.record(BusAccess::new(
            address,
            data,
            BusDirection::Read,
            BusType::Memory,
        ));
        Ok(data)
    }

    /// Decoded write.
    pub fn write(&mut self, address: u32, value: u8) -> Result<()> {
        if let Some(offset) = self.io_offset(address) {
            if let Some(device) = self.device.as_mut() {
                device.write(offset, value);
                self.recorder.record(BusAccess::new(
                    address,
                    value,
                    BusDirection::Write,
                    BusType::Io,
                ));
                return Ok(());
            }
        }
        self.memory.write_byte(address as usize, value)?;
        self.recorder.record(BusAccess::new(
            address,
            value,
            BusDirection::Write,
            BusType::Memory,
        ));
        Ok(())
    }

    /// Stack read, straight to RAM.
    pub fn read_stack(&mut self, address: usize) -> Result<u8> {
        let data = self.memory.read_byte(address)?;
        self.recorder.record(BusAccess::new(
            address as u32,
            data,
            BusDirection::Read,
            BusType::Stack,
        ));
        Ok(data)
    }

    /// Stack write, straight to RAM.
    pub fn write_stack(&mut self, address: usize, value: u8) -> Result<()> {
        self.memory.write_byte(address, value)?;
        self.recorder.record(BusAccess::new(
            address as u32,
            value,
            BusDirection::Write,
            BusType::Stack,
        ));
        Ok(())
    }

    /// Decoded read with no side effects and no recording.
    pub fn peek(&self, address: u32) -> Result<u8> {
        match (self.io_offset(address), self.device.as_ref()) {
            (Some(offset), Some(device)) => Ok(device.peek(offset)),
            _ => self.memory.read_byte(address as usize),
        }
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    #[must_use]
    pub fn recorder(&self) -> &BusRecorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut BusRecorder {
        &mut self.recorder
    }
}
