//! SYSCALL decode and dispatch.
//!
//! The service number arrives in `a0`, arguments in `a1..a3`, results in
//! `v0`. The saved PC is advanced past the SYSCALL instruction before
//! dispatch, so every outcome — plain return, block, termination, pass-up —
//! leaves the process resuming after the call site.

use strum::FromRepr;

use crate::{
    machine::{Control, Machine},
    nucleus::Nucleus,
    state::{ExcCode, PassUpKind, ProcessorState, INSTRUCTION_LEN},
};

mod proc;
mod sync;
mod system;

/// The eight nucleus services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum SyscallCode {
    CreateProcess = 1,
    TerminateProcess = 2,
    Passeren = 3,
    Verhogen = 4,
    WaitIo = 5,
    GetCpuTime = 6,
    WaitClock = 7,
    GetSupportPtr = 8,
}

pub(crate) fn handle<M: Machine>(n: &mut Nucleus<M>, mut saved: ProcessorState) -> Control {
    let number = saved.a0;
    saved.pc += INSTRUCTION_LEN;

    let Some(code) = SyscallCode::from_repr(number) else {
        log::trace!("syscall {number} not a nucleus service, passing up");
        return n.pass_up_or_die(saved, PassUpKind::General);
    };

    if saved.from_user_mode() {
        // nucleus services are privileged; a user-mode attempt is treated
        // as a reserved instruction
        log::warn!("user-mode attempt at privileged syscall {number}");
        saved.cause = saved.cause().with_exc_code(ExcCode::ReservedInstruction);
        return n.pass_up_or_die(saved, PassUpKind::General);
    }

    match code {
        SyscallCode::CreateProcess => proc::create_process(n, saved),
        SyscallCode::TerminateProcess => proc::terminate_process(n),
        SyscallCode::Passeren => sync::passeren(n, saved),
        SyscallCode::Verhogen => sync::verhogen(n, saved),
        SyscallCode::WaitIo => sync::wait_io(n, saved),
        SyscallCode::GetCpuTime => system::get_cpu_time(n, saved),
        SyscallCode::WaitClock => sync::wait_clock(n, saved),
        SyscallCode::GetSupportPtr => system::get_support_ptr(n, saved),
    }
}
