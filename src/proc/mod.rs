//! Process control blocks.
//!
//! All PCBs live in a fixed pool and are referred to by [`Pid`] indices;
//! queue and tree links are index values, never owning handles. A PCB is in
//! exactly one of: the free list, the ready queue, one semaphore's wait
//! queue, or running as the current process.

use core::{fmt, num::NonZeroU32};

use crate::{param::MAX_PROC, sem::SemId, state::ProcessorState};

pub mod queue;
pub mod scheduler;

/// Index of a PCB in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Pid(u8);

impl Pid {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u8)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One process control block.
#[derive(Debug, Clone)]
pub(crate) struct Pcb {
    /// Saved register file, restored on dispatch.
    pub(crate) state: ProcessorState,
    /// Accumulated CPU time in microseconds.
    pub(crate) time: u64,
    /// Time-of-day clock value at the last dispatch.
    pub(crate) start_tod: u64,
    /// Semaphore this process is blocked on, if any.
    pub(crate) sem: Option<SemId>,
    /// Support-level structure address, consumed only by pass-up.
    pub(crate) support: Option<NonZeroU32>,
    /// Queue neighbors (free list reuses `next`).
    pub(crate) next: Option<Pid>,
    pub(crate) prev: Option<Pid>,
    /// Process tree links.
    pub(crate) parent: Option<Pid>,
    pub(crate) child: Option<Pid>,
    pub(crate) sib_left: Option<Pid>,
    pub(crate) sib_right: Option<Pid>,
}

impl Pcb {
    fn cleared() -> Self {
        Self {
            state: ProcessorState::new(),
            time: 0,
            start_tod: 0,
            sem: None,
            support: None,
            next: None,
            prev: None,
            parent: None,
            child: None,
            sib_left: None,
            sib_right: None,
        }
    }
}

/// Fixed-capacity PCB allocator plus the process tree operations.
pub(crate) struct PcbPool {
    table: [Pcb; MAX_PROC],
    free_head: Option<Pid>,
}

impl PcbPool {
    /// Builds the pool with every PCB on the free list.
    pub(crate) fn new() -> Self {
        let mut pool = Self {
            table: core::array::from_fn(|_| Pcb::cleared()),
            free_head: Some(Pid::new(0)),
        };
        for i in 0..MAX_PROC - 1 {
            pool.table[i].next = Some(Pid::new(i + 1));
        }
        pool
    }

    /// Takes a PCB off the free list with every field cleared.
    ///
    /// Returns `None` when the pool is exhausted; callers surface this to
    /// the requesting process.
    pub(crate) fn allocate(&mut self) -> Option<Pid> {
        let p = self.free_head?;
        self.free_head = self.table[p.index()].next;
        self.table[p.index()] = Pcb::cleared();
        Some(p)
    }

    /// Returns a PCB to the head of the free list.
    pub(crate) fn free(&mut self, p: Pid) {
        self.table[p.index()].next = self.free_head;
        self.free_head = Some(p);
    }

    /// Number of PCBs currently on the free list.
    pub(crate) fn free_count(&self) -> usize {
        let mut count = 0;
        let mut cur = self.free_head;
        while let Some(p) = cur {
            count += 1;
            cur = self.table[p.index()].next;
        }
        count
    }

    /// Whether `p` sits on the free list.
    pub(crate) fn is_free(&self, p: Pid) -> bool {
        let mut cur = self.free_head;
        while let Some(q) = cur {
            if q == p {
                return true;
            }
            cur = self.table[q.index()].next;
        }
        false
    }

    /// Prepends `p` to `parent`'s child list.
    pub(crate) fn insert_child(&mut self, parent: Pid, p: Pid) {
        let first = self[parent].child;
        self[parent].child = Some(p);
        self[p].parent = Some(parent);
        self[p].sib_left = None;
        self[p].sib_right = first;
        if let Some(first) = first {
            self[first].sib_left = Some(p);
        }
    }

    pub(crate) fn has_children(&self, p: Pid) -> bool {
        self[p].child.is_some()
    }

    /// Detaches and returns the head of `parent`'s child list.
    pub(crate) fn remove_first_child(&mut self, parent: Pid) -> Option<Pid> {
        let child = self[parent].child?;
        self.detach(child)
    }

    /// Removes `p` from its parent's child list. Returns `None` if `p` has
    /// no parent.
    pub(crate) fn detach(&mut self, p: Pid) -> Option<Pid> {
        let parent = self[p].parent?;
        if self[parent].child == Some(p) {
            self[parent].child = self[p].sib_right;
        }
        if let Some(left) = self[p].sib_left {
            self[left].sib_right = self[p].sib_right;
        }
        if let Some(right) = self[p].sib_right {
            self[right].sib_left = self[p].sib_left;
        }
        self[p].parent = None;
        self[p].sib_left = None;
        self[p].sib_right = None;
        Some(p)
    }
}

impl core::ops::Index<Pid> for PcbPool {
    type Output = Pcb;

    fn index(&self, p: Pid) -> &Pcb {
        &self.table[p.index()]
    }
}

impl core::ops::IndexMut<Pid> for PcbPool {
    fn index_mut(&mut self, p: Pid) -> &mut Pcb {
        &mut self.table[p.index()]
    }
}
