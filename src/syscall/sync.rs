//! Semaphore and synchronous-I/O services.

use crate::{
    machine::{Control, DeviceLine, Machine, TerminalHalf},
    nucleus::Nucleus,
    param::DEV_PER_LINE,
    sem::SemId,
    state::{PassUpKind, ProcessorState},
};

/// Passeren: decrement the counter in `a1`; block when it drops below zero.
pub(super) fn passeren<M: Machine>(n: &mut Nucleus<M>, saved: ProcessorState) -> Control {
    let sem = match SemId::from_raw(saved.a1) {
        Ok(sem) => sem,
        Err(_) => return n.pass_up_or_die(saved, PassUpKind::General),
    };

    n.sems[sem] -= 1;
    if n.sems[sem] < 0 {
        return block_on(n, saved, sem);
    }
    Control::Load(saved)
}

/// Verhogen: increment the counter in `a1`; wake the head waiter when the
/// result is still non-positive.
pub(super) fn verhogen<M: Machine>(n: &mut Nucleus<M>, saved: ProcessorState) -> Control {
    let sem = match SemId::from_raw(saved.a1) {
        Ok(sem) => sem,
        Err(_) => return n.pass_up_or_die(saved, PassUpKind::General),
    };

    n.sems[sem] += 1;
    if n.sems[sem] <= 0 {
        if let Some(p) = n.asl.remove_blocked(&mut n.pcbs, sem) {
            n.ready_unblocked(p, sem);
        }
    }
    Control::Load(saved)
}

/// WaitIO: P on the device semaphore selected by `a1` (line), `a2` (unit)
/// and `a3` (terminal sub-device). The matching interrupt's V delivers the
/// device status in `v0`.
pub(super) fn wait_io<M: Machine>(n: &mut Nucleus<M>, mut saved: ProcessorState) -> Control {
    let line = DeviceLine::from_repr(saved.a1);
    let unit = saved.a2 as usize;
    let sem = match line {
        Some(line) if unit < DEV_PER_LINE => match line {
            DeviceLine::Terminal => {
                let half = if saved.a3 != 0 {
                    TerminalHalf::Transmit
                } else {
                    TerminalHalf::Receive
                };
                SemId::terminal(unit, half)
            }
            _ => SemId::device(line, unit),
        },
        _ => {
            log::warn!("wait-io with bad device coordinates ({}, {unit})", saved.a1);
            return n.pass_up_or_die(saved, PassUpKind::General);
        }
    };

    n.sems[sem] -= 1;
    if n.sems[sem] < 0 {
        return block_on(n, saved, sem);
    }

    // a completion was already signaled and its status discarded
    saved.v0 = 0;
    Control::Load(saved)
}

/// WaitClock: P on the pseudo-clock semaphore; the next interval-timer tick
/// wakes every waiter at once.
pub(super) fn wait_clock<M: Machine>(n: &mut Nucleus<M>, saved: ProcessorState) -> Control {
    let sem = SemId::PSEUDO_CLOCK;
    n.sems[sem] -= 1;
    block_on(n, saved, sem)
}

/// Parks the current process on `sem`. A process blocked on a device or
/// pseudo-clock semaphore is soft-blocked, whichever service brought it
/// here.
fn block_on<M: Machine>(n: &mut Nucleus<M>, saved: ProcessorState, sem: SemId) -> Control {
    match n.block_current(&saved, sem) {
        Ok(()) => {
            if sem.is_soft() {
                n.soft_block_count += 1;
            }
            n.schedule()
        }
        Err(err) => {
            // descriptor exhaustion cannot happen with the pool sized to
            // the process table, but the process dies rather than the
            // nucleus panicking
            log::error!("failed to block on semaphore {sem}: {err}");
            n.die_current()
        }
    }
}
