//! Nucleus state and initialization.
//!
//! The globals of the system — ready queue, current process, the two
//! counters, and the semaphore table — live in a single [`Nucleus`] value
//! threaded through every handler. The machine is single-CPU and exception
//! entry runs with interrupts disabled, so exclusive access needs no
//! locking.

use core::num::NonZeroU32;

use arrayvec::ArrayVec;

use crate::{
    error::NucleusError,
    machine::{Control, Machine},
    param::{CLOCK_INTERVAL, MAX_PROC},
    proc::{queue::ProcQueue, PcbPool, Pid},
    sem::{ActiveSemList, SemId, SemTable},
    state::ProcessorState,
};

pub struct Nucleus<M> {
    pub(crate) machine: M,
    pub(crate) pcbs: PcbPool,
    pub(crate) asl: ActiveSemList,
    pub(crate) sems: SemTable,
    pub(crate) ready: ProcQueue,
    pub(crate) current: Option<Pid>,
    pub(crate) process_count: usize,
    pub(crate) soft_block_count: usize,
}

impl<M: Machine> Nucleus<M> {
    /// Initializes the nucleus: empty pools, zeroed semaphores, and the
    /// interval timer armed for the first pseudo-clock tick.
    pub fn new(mut machine: M) -> Self {
        machine.load_interval_timer(CLOCK_INTERVAL);
        log::debug!("nucleus initialized, interval timer armed");
        Self {
            machine,
            pcbs: PcbPool::new(),
            asl: ActiveSemList::new(),
            sems: SemTable::new(),
            ready: ProcQueue::new(),
            current: None,
            process_count: 0,
            soft_block_count: 0,
        }
    }

    /// Installs the first process with the given entry state.
    ///
    /// The state is taken as a value rather than read through the bus: at
    /// boot there is no requesting process whose registers could carry an
    /// address.
    pub fn boot_process(&mut self, state: ProcessorState) -> Result<Pid, NucleusError> {
        let p = self.pcbs.allocate().ok_or(NucleusError::NoFreePcb)?;
        self.pcbs[p].state = state;
        self.process_count += 1;
        self.ready.push(&mut self.pcbs, p);
        Ok(p)
    }

    pub fn process_count(&self) -> usize {
        self.process_count
    }

    pub fn soft_block_count(&self) -> usize {
        self.soft_block_count
    }

    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    /// Creates a process as a child of the current one.
    ///
    /// `state_addr` points at the entry state image in machine memory;
    /// `support` is the opaque support-structure address (0 for none).
    pub(crate) fn spawn(&mut self, state_addr: u32, support: u32) -> Result<Pid, NucleusError> {
        let p = self.pcbs.allocate().ok_or(NucleusError::NoFreePcb)?;
        self.pcbs[p].state = ProcessorState::read_from(&self.machine, state_addr);
        self.pcbs[p].support = NonZeroU32::new(support);
        if let Some(parent) = self.current {
            self.pcbs.insert_child(parent, p);
        }
        self.process_count += 1;
        self.ready.push(&mut self.pcbs, p);
        Ok(p)
    }

    /// Charges the elapsed slice to the current process, saves `saved` as
    /// its resume state, blocks it on `sem`, and clears `current`.
    pub(crate) fn block_current(
        &mut self,
        saved: &ProcessorState,
        sem: SemId,
    ) -> Result<(), NucleusError> {
        let p = self.current.ok_or(NucleusError::NoSuchProcess)?;
        self.asl.insert_blocked(&mut self.pcbs, sem, p)?;
        let now = self.machine.now();
        let pcb = &mut self.pcbs[p];
        pcb.time += now - pcb.start_tod;
        pcb.state = *saved;
        self.current = None;
        Ok(())
    }

    /// Moves a PCB coming off a semaphore wait queue to the ready queue,
    /// maintaining the soft-block counter.
    pub(crate) fn ready_unblocked(&mut self, p: Pid, sem: SemId) {
        if sem.is_soft() {
            self.soft_block_count -= 1;
        }
        self.ready.push(&mut self.pcbs, p);
    }

    /// Terminates the current process and everything below it, then picks
    /// the next process.
    pub(crate) fn die_current(&mut self) -> Control {
        if let Some(p) = self.current.take() {
            self.terminate_subtree(p);
        }
        self.schedule()
    }

    /// Frees `root` and all of its descendants.
    ///
    /// Each victim is pulled out of whatever queue holds it. A victim
    /// blocked on a user semaphore gets the counter re-incremented to undo
    /// its P; device and pseudo-clock counters are left alone, since the
    /// completion that would have woken it is simply discarded later.
    pub(crate) fn terminate_subtree(&mut self, root: Pid) {
        self.pcbs.detach(root);

        let mut worklist = ArrayVec::<Pid, MAX_PROC>::new();
        worklist.push(root);
        while let Some(p) = worklist.pop() {
            while let Some(child) = self.pcbs.remove_first_child(p) {
                worklist.push(child);
            }
            debug_assert!(!self.pcbs.has_children(p));

            if self.current == Some(p) {
                self.current = None;
            } else if let Some(sem) = self.pcbs[p].sem {
                if self.asl.out_blocked(&mut self.pcbs, p).is_some() {
                    if sem.is_soft() {
                        self.soft_block_count -= 1;
                    } else {
                        self.sems[sem] += 1;
                    }
                }
            } else {
                self.ready.remove(&mut self.pcbs, p);
            }

            self.pcbs.free(p);
            self.process_count -= 1;
            log::trace!("terminated process {p}");
        }
    }

    /// Logs one line per live process at debug level.
    pub fn dump(&self) {
        log::debug!(
            "{} live, {} soft-blocked, {} free",
            self.process_count,
            self.soft_block_count,
            self.pcbs.free_count()
        );
        for i in 0..MAX_PROC {
            let p = Pid::new(i);
            if self.pcbs.is_free(p) {
                continue;
            }
            let pcb = &self.pcbs[p];
            let disposition = if self.current == Some(p) {
                "run"
            } else if pcb.sem.is_some() {
                "blocked"
            } else {
                "ready"
            };
            match pcb.sem {
                Some(sem) => log::debug!("{p:3} {disposition:<8} sem={sem} time={}", pcb.time),
                None => log::debug!("{p:3} {disposition:<8} time={}", pcb.time),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{test_machine::TestMachine, *};
    use crate::state::Status;

    fn booted() -> Nucleus<TestMachine> {
        let mut n = Nucleus::new(TestMachine::default());
        let mut state = ProcessorState::new();
        state.pc = 0x8000_0000;
        state.status = (Status::IE_PREVIOUS | Status::TIMER_ENABLE).bits();
        n.boot_process(state).unwrap();
        n
    }

    #[test]
    fn boot_arms_interval_timer() {
        let n = booted();
        assert_eq!(n.machine().interval_loads, vec![CLOCK_INTERVAL]);
        assert_eq!(n.process_count(), 1);
        assert_eq!(n.soft_block_count(), 0);
    }

    #[test]
    fn spawn_links_child_under_current() {
        let mut n = booted();
        let parent = n.ready.pop(&mut n.pcbs).unwrap();
        n.current = Some(parent);

        let child = n.spawn(0x1000, 0).unwrap();
        assert_eq!(n.pcbs[child].parent, Some(parent));
        assert_eq!(n.process_count(), 2);
        assert!(n.pcbs[child].support.is_none());
    }

    #[test]
    fn terminate_subtree_frees_every_descendant() {
        let mut n = booted();
        let root = n.ready.pop(&mut n.pcbs).unwrap();
        n.current = Some(root);
        let a = n.spawn(0, 0).unwrap();
        let b = n.spawn(0, 0).unwrap();
        n.current = Some(a);
        n.ready.remove(&mut n.pcbs, a).unwrap();
        let c = n.spawn(0, 0).unwrap();
        n.current = Some(root);
        assert_eq!(n.process_count(), 4);

        // block one grandchild on a user semaphore to exercise the undo
        let sem = SemId::from_raw(SemId::PSEUDO_CLOCK.raw() + 1).unwrap();
        n.sems[sem] = -1;
        n.ready.remove(&mut n.pcbs, c).unwrap();
        n.asl.insert_blocked(&mut n.pcbs, sem, c).unwrap();

        n.current = Some(root);
        let control = n.die_current();
        assert_eq!(n.process_count(), 0);
        assert_eq!(n.pcbs.free_count(), MAX_PROC);
        assert_eq!(n.sems[sem], 0);
        assert_eq!(control, Control::Halt);
        let _ = (a, b);
    }
}
