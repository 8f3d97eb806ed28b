//! Semaphore identities, counters, and the Active Semaphore List.
//!
//! A semaphore is a typed slot index into a nucleus-owned table of signed
//! counters. Slots `0..SEM_DEVICE_SLOTS` back the peripheral devices, the
//! next slot is the pseudo-clock, and the remainder are general-purpose
//! counters for supervisor-level code.
//!
//! The ASL maps each semaphore with a non-empty wait queue to a descriptor.
//! Descriptors form a singly-linked list sorted strictly ascending by slot
//! id, bracketed by two sentinel nodes (keys 0 and `u32::MAX`) so insertion
//! never special-cases an empty list or a head insert.

use core::fmt;

use crate::{
    error::NucleusError,
    machine::{DeviceLine, TerminalHalf},
    param::{DEV_PER_LINE, MAX_PROC, SEM_DEVICE_SLOTS, SEM_SLOTS},
    proc::{queue::ProcQueue, PcbPool, Pid},
};

/// Typed index of a semaphore slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SemId(u32);

impl SemId {
    /// The broadcast semaphore ticked by the interval timer.
    pub const PSEUDO_CLOCK: Self = Self(SEM_DEVICE_SLOTS as u32);

    /// Validates a raw slot id out of a syscall argument register.
    pub fn from_raw(raw: u32) -> Result<Self, NucleusError> {
        if (raw as usize) < SEM_SLOTS {
            Ok(Self(raw))
        } else {
            Err(NucleusError::BadSemaphore(raw))
        }
    }

    /// Slot of a non-terminal device.
    pub fn device(line: DeviceLine, unit: usize) -> Self {
        debug_assert!(line != DeviceLine::Terminal && unit < DEV_PER_LINE);
        Self((line as u32 - DeviceLine::Disk as u32) * DEV_PER_LINE as u32 + unit as u32)
    }

    /// Slot of one half of a terminal unit: the two halves of each unit are
    /// adjacent, transmit after receive.
    pub fn terminal(unit: usize, half: TerminalHalf) -> Self {
        debug_assert!(unit < DEV_PER_LINE);
        let base = (DeviceLine::Terminal as u32 - DeviceLine::Disk as u32) * DEV_PER_LINE as u32;
        Self(base + unit as u32 * 2 + half as u32)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Whether a process blocked here counts as soft-blocked (device or
    /// pseudo-clock).
    pub fn is_soft(self) -> bool {
        self.0 <= SEM_DEVICE_SLOTS as u32
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The signed counters, one per slot, all zero at boot.
pub(crate) struct SemTable {
    counters: [i32; SEM_SLOTS],
}

impl SemTable {
    pub(crate) const fn new() -> Self {
        Self {
            counters: [0; SEM_SLOTS],
        }
    }
}

impl core::ops::Index<SemId> for SemTable {
    type Output = i32;

    fn index(&self, id: SemId) -> &i32 {
        &self.counters[id.index()]
    }
}

impl core::ops::IndexMut<SemId> for SemTable {
    fn index_mut(&mut self, id: SemId) -> &mut i32 {
        &mut self.counters[id.index()]
    }
}

/// Descriptor pool slots: one per possible blocked process plus the two
/// sentinels.
const SEMD_SLOTS: usize = MAX_PROC + 2;
const HEAD: usize = 0;
const TAIL: usize = 1;

#[derive(Debug, Clone, Copy)]
struct Semd {
    key: u32,
    queue: ProcQueue,
    next: Option<usize>,
}

/// Sorted list of semaphores with a non-empty wait queue.
pub(crate) struct ActiveSemList {
    table: [Semd; SEMD_SLOTS],
    free_head: Option<usize>,
}

impl ActiveSemList {
    pub(crate) fn new() -> Self {
        let mut table = [Semd {
            key: 0,
            queue: ProcQueue::new(),
            next: None,
        }; SEMD_SLOTS];

        table[HEAD].next = Some(TAIL);
        table[TAIL].key = u32::MAX;

        for i in 2..SEMD_SLOTS - 1 {
            table[i].next = Some(i + 1);
        }

        Self {
            table,
            free_head: Some(2),
        }
    }

    /// Descriptor holding `key`, if it is on the list.
    fn find(&self, key: u32) -> Option<usize> {
        let mut cur = self.table[HEAD].next;
        while let Some(i) = cur {
            if self.table[i].key >= key {
                return (self.table[i].key == key).then_some(i);
            }
            cur = self.table[i].next;
        }
        None
    }

    /// Unlinks `idx` and returns it to the free pool once its queue drained.
    fn release_if_empty(&mut self, idx: usize) {
        if !self.table[idx].queue.is_empty() {
            return;
        }
        let mut prev = HEAD;
        while let Some(next) = self.table[prev].next {
            if next == idx {
                self.table[prev].next = self.table[idx].next;
                break;
            }
            prev = next;
        }
        self.table[idx].next = self.free_head;
        self.free_head = Some(idx);
    }

    /// Blocks `p` at the tail of `sem`'s wait queue, activating a descriptor
    /// if the semaphore had no waiters.
    pub(crate) fn insert_blocked(
        &mut self,
        pool: &mut PcbPool,
        sem: SemId,
        p: Pid,
    ) -> Result<(), NucleusError> {
        let key = sem.raw();
        let idx = match self.find(key) {
            Some(idx) => idx,
            None => {
                let idx = self.free_head.ok_or(NucleusError::NoFreeSemd)?;
                self.free_head = self.table[idx].next;
                self.table[idx].key = key;
                self.table[idx].queue = ProcQueue::new();

                // splice into the sorted list; the sentinels guarantee a
                // predecessor and a strictly greater successor exist
                let mut prev = HEAD;
                while let Some(next) = self.table[prev].next {
                    if self.table[next].key >= key {
                        break;
                    }
                    prev = next;
                }
                self.table[idx].next = self.table[prev].next;
                self.table[prev].next = Some(idx);
                idx
            }
        };

        self.table[idx].queue.push(pool, p);
        pool[p].sem = Some(sem);
        Ok(())
    }

    /// Unblocks the head waiter of `sem`, clearing its semaphore link.
    pub(crate) fn remove_blocked(&mut self, pool: &mut PcbPool, sem: SemId) -> Option<Pid> {
        let idx = self.find(sem.raw())?;
        let p = self.table[idx].queue.pop(pool)?;
        pool[p].sem = None;
        self.release_if_empty(idx);
        Some(p)
    }

    /// Removes the specific PCB `p` from the wait queue it is blocked on.
    ///
    /// Leaves `p`'s semaphore link in place; the termination path reads it
    /// for counter bookkeeping.
    pub(crate) fn out_blocked(&mut self, pool: &mut PcbPool, p: Pid) -> Option<Pid> {
        let sem = pool[p].sem?;
        let idx = self.find(sem.raw())?;
        self.table[idx].queue.remove(pool, p)?;
        self.release_if_empty(idx);
        Some(p)
    }

    /// Head waiter of `sem` without unblocking it.
    pub(crate) fn head_blocked(&self, pool: &PcbPool, sem: SemId) -> Option<Pid> {
        let idx = self.find(sem.raw())?;
        self.table[idx].queue.head(pool)
    }

    /// Checks the list is strictly sorted and every descriptor has waiters;
    /// test support.
    #[cfg(test)]
    pub(crate) fn is_well_formed(&self, pool: &PcbPool) -> bool {
        let mut prev_key = None;
        let mut cur = self.table[HEAD].next;
        while let Some(i) = cur {
            if i != TAIL {
                if self.table[i].queue.head(pool).is_none() {
                    return false;
                }
                if prev_key.is_some_and(|k| k >= self.table[i].key) {
                    return false;
                }
                prev_key = Some(self.table[i].key);
            }
            cur = self.table[i].next;
        }
        true
    }
}
