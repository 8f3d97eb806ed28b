//! Boundary between the nucleus and the emulated machine.
//!
//! Everything the nucleus needs from the hardware — the time-of-day clock,
//! the two timers, the bus, and the device registers — sits behind the
//! [`Machine`] trait. The non-returning hardware operations (load a state,
//! load a context, wait, halt, panic) are expressed as a [`Control`] value
//! that each nucleus entry point resolves to; the platform shim that owns
//! the real vectors performs the operation.

use strum::FromRepr;

use crate::state::{ProcessorState, SupportContext};

/// Device status: no device installed on this line/unit.
pub const DEVICE_UNINSTALLED: u32 = 0;
/// Device status: operation complete, device idle.
pub const DEVICE_READY: u32 = 1;
/// Device status: operation in flight.
pub const DEVICE_BUSY: u32 = 3;

/// Interrupt lines wired to peripheral devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
#[repr(u32)]
pub enum DeviceLine {
    Disk = 3,
    Flash = 4,
    Network = 5,
    Printer = 6,
    Terminal = 7,
}

/// The two sub-devices of a terminal unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TerminalHalf {
    Receive = 0,
    Transmit = 1,
}

/// Hardware services consumed by the nucleus.
///
/// Times are microseconds of time-of-day clock. Bus reads and writes move
/// raw bytes; the nucleus only uses them for `Pod` state images, so an
/// implementation backed by a sparse page map is sufficient.
pub trait Machine {
    /// Current time-of-day clock value.
    fn now(&self) -> u64;

    /// Reloads the processor local timer (the quantum timer).
    fn set_quantum_timer(&mut self, us: u32);

    /// Reloads the interval timer (the pseudo-clock source).
    fn load_interval_timer(&mut self, us: u32);

    fn read_bytes(&self, addr: u32, buf: &mut [u8]);

    fn write_bytes(&mut self, addr: u32, bytes: &[u8]);

    /// Interrupting-devices bitmap for a line, one bit per unit, bit 0 =
    /// unit 0.
    fn pending_devices(&self, line: DeviceLine) -> u8;

    /// Status register of a non-terminal device.
    fn device_status(&self, line: DeviceLine, unit: usize) -> u32;

    /// Writes the acknowledge command to a non-terminal device, clearing
    /// its interrupt.
    fn ack_device(&mut self, line: DeviceLine, unit: usize);

    /// Status register of one half of a terminal unit.
    fn terminal_status(&self, unit: usize, half: TerminalHalf) -> u32;

    /// Acknowledges one half of a terminal unit.
    fn ack_terminal(&mut self, unit: usize, half: TerminalHalf);
}

/// What the platform shim must do next.
///
/// Each variant stands for a hardware operation that does not return to the
/// nucleus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Control {
    /// Load this processor state and resume it.
    Load(ProcessorState),
    /// Load a support-level context (stack pointer, status, PC).
    LoadContext(SupportContext),
    /// Set the given status word and wait for an interrupt.
    Wait { status: u32 },
    /// All processes have finished; stop the machine.
    Halt,
    /// Unrecoverable condition.
    Panic(&'static str),
}
