//! Interrupt handling.
//!
//! The cause word's pending field names the interrupt lines with a request;
//! the lowest line wins, and on a device line the lowest interrupting unit
//! wins. One entry services exactly one event; anything still pending is
//! delivered on the next vector entry.

use crate::{
    machine::{Control, DeviceLine, Machine, TerminalHalf, DEVICE_READY},
    nucleus::Nucleus,
    param::{CLOCK_INTERVAL, QUANTUM},
    sem::SemId,
    state::ProcessorState,
};

pub(crate) fn handle<M: Machine>(n: &mut Nucleus<M>, saved: ProcessorState) -> Control {
    let pending = saved.cause().pending_lines();
    if pending == 0 {
        return resume(n, saved);
    }

    let line = pending.trailing_zeros();
    match line {
        // inter-processor interrupts do not occur on this machine
        0 => resume(n, saved),
        1 => quantum_expired(n, saved),
        2 => interval_tick(n, saved),
        _ => match DeviceLine::from_repr(line) {
            Some(line) => device_completion(n, line, saved),
            None => resume(n, saved),
        },
    }
}

/// Hands control back to the interrupted process, or to the scheduler when
/// the interrupt arrived while idle.
fn resume<M: Machine>(n: &mut Nucleus<M>, saved: ProcessorState) -> Control {
    if n.current.is_some() {
        Control::Load(saved)
    } else {
        n.schedule()
    }
}

/// Processor local timer: the current process's quantum is up.
fn quantum_expired<M: Machine>(n: &mut Nucleus<M>, saved: ProcessorState) -> Control {
    // reloading the timer acknowledges the interrupt
    n.machine.set_quantum_timer(QUANTUM);

    let Some(p) = n.current.take() else {
        return n.schedule();
    };
    let now = n.machine.now();
    let pcb = &mut n.pcbs[p];
    pcb.time += now - pcb.start_tod;
    pcb.state = saved;
    n.ready.push(&mut n.pcbs, p);
    n.schedule()
}

/// Interval timer: wake every pseudo-clock waiter and rearm the tick.
///
/// The pseudo-clock is a broadcast, not a counting semaphore: after the
/// sweep its counter goes back to zero no matter how many P operations
/// accumulated.
fn interval_tick<M: Machine>(n: &mut Nucleus<M>, saved: ProcessorState) -> Control {
    n.machine.load_interval_timer(CLOCK_INTERVAL);

    let sem = SemId::PSEUDO_CLOCK;
    while let Some(p) = n.asl.remove_blocked(&mut n.pcbs, sem) {
        n.ready_unblocked(p, sem);
    }
    n.sems[sem] = 0;

    resume(n, saved)
}

/// Device completion: latch the status, acknowledge the interrupt, and V
/// the device semaphore; the woken waiter receives the status in `v0`.
fn device_completion<M: Machine>(
    n: &mut Nucleus<M>,
    line: DeviceLine,
    saved: ProcessorState,
) -> Control {
    let bitmap = n.machine.pending_devices(line);
    if bitmap == 0 {
        return resume(n, saved);
    }
    let unit = bitmap.trailing_zeros() as usize;

    let (status, sem) = if line == DeviceLine::Terminal {
        // transmit completions take precedence: the transmitter reports
        // non-ready exactly when it has something to acknowledge
        let transmit = n.machine.terminal_status(unit, TerminalHalf::Transmit);
        if transmit & 0xFF != DEVICE_READY {
            n.machine.ack_terminal(unit, TerminalHalf::Transmit);
            (transmit, SemId::terminal(unit, TerminalHalf::Transmit))
        } else {
            let receive = n.machine.terminal_status(unit, TerminalHalf::Receive);
            n.machine.ack_terminal(unit, TerminalHalf::Receive);
            (receive, SemId::terminal(unit, TerminalHalf::Receive))
        }
    } else {
        let status = n.machine.device_status(line, unit);
        n.machine.ack_device(line, unit);
        (status, SemId::device(line, unit))
    };

    n.sems[sem] += 1;
    if n.sems[sem] <= 0 {
        if let Some(p) = n.asl.remove_blocked(&mut n.pcbs, sem) {
            n.pcbs[p].state.v0 = status;
            n.ready_unblocked(p, sem);
        }
    } else {
        log::trace!("completion on {line:?} unit {unit} found no waiter");
    }

    resume(n, saved)
}
