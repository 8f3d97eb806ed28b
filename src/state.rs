//! Processor state and control-register views.
//!
//! The layouts here are bit-compatible with the machine's exception-save
//! area, so a state can be copied through the bus as raw bytes and handed
//! back to a single load-state instruction.

use bitflags::bitflags;
use dataview::{Pod, PodMethods as _};
use strum::FromRepr;

use crate::machine::Machine;

/// Saved register file of one process.
///
/// Field order matches the machine save layout: the four control registers,
/// then the 31 general registers in save order, then HI/LO.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod)]
pub struct ProcessorState {
    pub entry_hi: u32,
    pub cause: u32,
    pub status: u32,
    pub pc: u32,
    pub at: u32,
    pub v0: u32,
    pub v1: u32,
    pub a0: u32,
    pub a1: u32,
    pub a2: u32,
    pub a3: u32,
    pub t0: u32,
    pub t1: u32,
    pub t2: u32,
    pub t3: u32,
    pub t4: u32,
    pub t5: u32,
    pub t6: u32,
    pub t7: u32,
    pub s0: u32,
    pub s1: u32,
    pub s2: u32,
    pub s3: u32,
    pub s4: u32,
    pub s5: u32,
    pub s6: u32,
    pub s7: u32,
    pub t8: u32,
    pub t9: u32,
    pub gp: u32,
    pub sp: u32,
    pub fp: u32,
    pub ra: u32,
    pub hi: u32,
    pub lo: u32,
}

/// One MIPS instruction, for advancing the saved PC past a SYSCALL.
pub const INSTRUCTION_LEN: u32 = 4;

impl ProcessorState {
    pub fn new() -> Self {
        Self::zeroed()
    }

    /// Reads a state image from machine memory at `addr`.
    pub fn read_from(machine: &impl Machine, addr: u32) -> Self {
        let mut state = Self::zeroed();
        machine.read_bytes(addr, state.as_bytes_mut());
        state
    }

    /// Writes this state image to machine memory at `addr`.
    pub fn write_to(&self, machine: &mut impl Machine, addr: u32) {
        machine.write_bytes(addr, self.as_bytes());
    }

    pub fn cause(&self) -> Cause {
        Cause(self.cause)
    }

    /// Whether the state was saved out of user mode (previous KU bit).
    pub fn from_user_mode(&self) -> bool {
        Status::from_bits_retain(self.status).contains(Status::KU_PREVIOUS)
    }
}

impl Default for ProcessorState {
    fn default() -> Self {
        Self::zeroed()
    }
}

bitflags! {
    /// Status register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct Status: u32 {
        /// Current interrupt enable.
        const IE_CURRENT = 1 << 0;
        /// Current kernel(0)/user(1) mode.
        const KU_CURRENT = 1 << 1;
        /// Previous interrupt enable (pushed on exception entry).
        const IE_PREVIOUS = 1 << 2;
        /// Previous kernel/user mode (pushed on exception entry).
        const KU_PREVIOUS = 1 << 3;
        /// Unmask every interrupt line (bits 8..=15).
        const INT_MASK_ALL = 0xFF00;
        /// Processor local timer enable.
        const TIMER_ENABLE = 1 << 27;
    }
}

/// Cause register view: exception code in bits 2..=6, pending-interrupt
/// bitmap in bits 8..=15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cause(pub u32);

impl Cause {
    const EXC_CODE_MASK: u32 = 0x7C;
    const EXC_CODE_SHIFT: u32 = 2;
    const IP_MASK: u32 = 0xFF00;
    const IP_SHIFT: u32 = 8;

    pub fn raw_exc_code(self) -> u32 {
        (self.0 & Self::EXC_CODE_MASK) >> Self::EXC_CODE_SHIFT
    }

    pub fn exc_code(self) -> Option<ExcCode> {
        ExcCode::from_repr(self.raw_exc_code())
    }

    /// Interrupt lines with a pending request, one bit per line.
    pub fn pending_lines(self) -> u8 {
        ((self.0 & Self::IP_MASK) >> Self::IP_SHIFT) as u8
    }

    /// Returns the register value with the exception code replaced.
    pub fn with_exc_code(self, code: ExcCode) -> u32 {
        (self.0 & !Self::EXC_CODE_MASK) | ((code as u32) << Self::EXC_CODE_SHIFT)
    }
}

/// Exception codes delivered in the cause register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum ExcCode {
    Interrupt = 0,
    TlbModification = 1,
    TlbInvalidLoad = 2,
    TlbInvalidStore = 3,
    AddressErrorLoad = 4,
    AddressErrorStore = 5,
    BusErrorFetch = 6,
    BusErrorData = 7,
    Syscall = 8,
    Breakpoint = 9,
    ReservedInstruction = 10,
    CoprocessorUnusable = 11,
    ArithmeticOverflow = 12,
}

impl ExcCode {
    pub fn is_tlb(self) -> bool {
        matches!(
            self,
            Self::TlbModification | Self::TlbInvalidLoad | Self::TlbInvalidStore
        )
    }
}

/// Execution context loaded when escalating an exception to a process's
/// support level.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod)]
pub struct SupportContext {
    pub stack_ptr: u32,
    pub status: u32,
    pub pc: u32,
}

impl SupportContext {
    /// Reads a context image from machine memory at `addr`.
    pub fn read_from(machine: &impl Machine, addr: u32) -> Self {
        let mut ctx = Self::zeroed();
        machine.read_bytes(addr, ctx.as_bytes_mut());
        ctx
    }
}

/// Escalation kinds, doubling as indices into the support structure's
/// state/context pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum PassUpKind {
    PageFault = 0,
    General = 1,
}

/// Byte layout of the support structure the nucleus escalates into.
///
/// `asid` word, then one saved-state slot per kind, then one context per
/// kind.
pub mod support_layout {
    use core::mem::size_of;

    use super::{PassUpKind, ProcessorState, SupportContext};

    const STATE_BASE: u32 = 4;
    const CONTEXT_BASE: u32 = STATE_BASE + 2 * size_of::<ProcessorState>() as u32;

    pub fn except_state(support: u32, kind: PassUpKind) -> u32 {
        support + STATE_BASE + kind as u32 * size_of::<ProcessorState>() as u32
    }

    pub fn except_context(support: u32, kind: PassUpKind) -> u32 {
        support + CONTEXT_BASE + kind as u32 * size_of::<SupportContext>() as u32
    }
}
