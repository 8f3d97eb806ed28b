//! Nucleus of a small educational operating system for an emulated MIPS
//! machine.
//!
//! The nucleus provides processes, counting semaphores, and synchronous I/O
//! on top of the bare hardware: a fixed pool of process control blocks with
//! round-robin dispatch, an Active Semaphore List mapping semaphores to
//! wait queues, eight system-call services, device-interrupt acknowledgment
//! with waiter wake-up, and escalation of unresolved exceptions to a
//! per-process support level.
//!
//! The hardware itself — timers, the bus, device registers, and the
//! non-returning state-load operations — is the embedder's side of the
//! [`Machine`] trait. The embedder wires the machine's exception vector to
//! [`Nucleus::handle_exception`] and performs whatever [`Control`] it
//! returns.

#![cfg_attr(not(test), no_std)]

mod error;
mod interrupt;
mod machine;
mod nucleus;
mod param;
mod proc;
mod sem;
mod state;
mod syscall;
mod trap;

pub use self::{
    error::NucleusError,
    machine::{
        Control, DeviceLine, Machine, TerminalHalf, DEVICE_BUSY, DEVICE_READY,
        DEVICE_UNINSTALLED,
    },
    nucleus::Nucleus,
    param::{
        BIOS_DATA_PAGE, CLOCK_INTERVAL, DEV_PER_LINE, MAX_PROC, MAX_USER_SEM, QUANTUM,
        SEM_DEVICE_SLOTS, SEM_SLOTS,
    },
    proc::Pid,
    sem::SemId,
    state::{
        support_layout, Cause, ExcCode, PassUpKind, ProcessorState, Status, SupportContext,
        INSTRUCTION_LEN,
    },
    syscall::SyscallCode,
};
