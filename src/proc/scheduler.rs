//! Round-robin dispatcher.
//!
//! `schedule` never hands control back to nucleus code by ordinary means:
//! its `Control` value is a state load, a wait, a halt, or a panic, and the
//! platform shim performs it.

use crate::{
    machine::{Control, Machine},
    nucleus::Nucleus,
    param::QUANTUM,
    state::Status,
};

impl<M: Machine> Nucleus<M> {
    /// Dispatches the head of the ready queue with a fresh quantum.
    ///
    /// With nothing ready the outcome depends on the counters: no live
    /// processes means an orderly halt, soft-blocked processes mean waiting
    /// for an interrupt, and anything else is a deadlock.
    pub fn schedule(&mut self) -> Control {
        if let Some(p) = self.ready.pop(&mut self.pcbs) {
            self.current = Some(p);
            self.machine.set_quantum_timer(QUANTUM);
            self.pcbs[p].start_tod = self.machine.now();
            return Control::Load(self.pcbs[p].state);
        }

        if self.process_count == 0 {
            log::debug!("no processes left, halting");
            Control::Halt
        } else if self.soft_block_count > 0 {
            // interrupts unmasked, quantum timer quiet until the next
            // dispatch
            let status = Status::IE_CURRENT | Status::INT_MASK_ALL;
            Control::Wait {
                status: status.bits(),
            }
        } else {
            log::error!(
                "deadlock: {} processes, none ready, none soft-blocked",
                self.process_count
            );
            Control::Panic("deadlock")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        nucleus::test_machine::TestMachine,
        sem::SemId,
        state::ProcessorState,
    };

    fn nucleus() -> Nucleus<TestMachine> {
        Nucleus::new(TestMachine::default())
    }

    #[test]
    fn dispatch_arms_quantum_and_records_tod() {
        let mut n = nucleus();
        let mut state = ProcessorState::new();
        state.pc = 0x2000_1234;
        let p = n.boot_process(state).unwrap();

        n.machine_mut().now = 400;
        let control = n.schedule();
        assert_eq!(control, Control::Load(state));
        assert_eq!(n.current(), Some(p));
        assert_eq!(n.machine().quantum_loads, vec![QUANTUM]);
        assert_eq!(n.pcbs[p].start_tod, 400);
    }

    #[test]
    fn empty_system_halts() {
        let mut n = nucleus();
        assert_eq!(n.schedule(), Control::Halt);
    }

    #[test]
    fn soft_blocked_system_waits_with_timer_masked() {
        let mut n = nucleus();
        let p = n.boot_process(ProcessorState::new()).unwrap();
        n.schedule();
        assert_eq!(n.current(), Some(p));

        // park the only process on a device semaphore
        let sem = SemId::PSEUDO_CLOCK;
        n.sems[sem] -= 1;
        n.block_current(&ProcessorState::new(), sem).unwrap();
        n.soft_block_count += 1;

        match n.schedule() {
            Control::Wait { status } => {
                let status = Status::from_bits_retain(status);
                assert!(status.contains(Status::IE_CURRENT));
                assert!(status.contains(Status::INT_MASK_ALL));
                assert!(!status.contains(Status::TIMER_ENABLE));
            }
            other => panic!("expected wait, got {other:?}"),
        }
    }

    #[test]
    fn blocked_without_soft_blocks_is_deadlock() {
        let mut n = nucleus();
        n.boot_process(ProcessorState::new()).unwrap();
        n.schedule();

        let sem = SemId::from_raw(SemId::PSEUDO_CLOCK.raw() + 3).unwrap();
        n.sems[sem] -= 1;
        n.block_current(&ProcessorState::new(), sem).unwrap();

        assert_eq!(n.schedule(), Control::Panic("deadlock"));
    }

    #[test]
    fn round_robin_order() {
        let mut n = nucleus();
        let a = n.boot_process(ProcessorState::new()).unwrap();
        let b = n.boot_process(ProcessorState::new()).unwrap();

        n.schedule();
        assert_eq!(n.current(), Some(a));

        // quantum expiry puts a at the tail; b runs next
        let expired = n.current.take().unwrap();
        n.ready.push(&mut n.pcbs, expired);
        n.schedule();
        assert_eq!(n.current(), Some(b));
    }
}
