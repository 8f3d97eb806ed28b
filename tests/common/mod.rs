//! Scripted machine model shared by the end-to-end tests.

use std::collections::HashMap;

use dataview::PodMethods as _;
use emips_nucleus::{
    Cause, Control, DeviceLine, ExcCode, Machine, Nucleus, ProcessorState, SyscallCode,
    TerminalHalf, BIOS_DATA_PAGE,
};

/// In-memory machine: sparse byte-addressed RAM, a hand-advanced TOD clock,
/// per-device pending bits and status registers, and a record of every
/// timer load and acknowledge the nucleus performs.
#[derive(Debug, Default)]
pub struct MockMachine {
    pub now: u64,
    pub mem: HashMap<u32, u8>,
    pub quantum_loads: Vec<u32>,
    pub interval_loads: Vec<u32>,
    pub pending: HashMap<DeviceLine, u8>,
    pub device_statuses: HashMap<(DeviceLine, usize), u32>,
    pub terminal_statuses: HashMap<(usize, TerminalHalf), u32>,
    pub device_acks: Vec<(DeviceLine, usize)>,
    pub terminal_acks: Vec<(usize, TerminalHalf)>,
}

impl Machine for MockMachine {
    fn now(&self) -> u64 {
        self.now
    }

    fn set_quantum_timer(&mut self, us: u32) {
        self.quantum_loads.push(us);
    }

    fn load_interval_timer(&mut self, us: u32) {
        self.interval_loads.push(us);
    }

    fn read_bytes(&self, addr: u32, buf: &mut [u8]) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.mem.get(&(addr + i as u32)).copied().unwrap_or(0);
        }
    }

    fn write_bytes(&mut self, addr: u32, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.mem.insert(addr + i as u32, *b);
        }
    }

    fn pending_devices(&self, line: DeviceLine) -> u8 {
        self.pending.get(&line).copied().unwrap_or(0)
    }

    fn device_status(&self, line: DeviceLine, unit: usize) -> u32 {
        self.device_statuses.get(&(line, unit)).copied().unwrap_or(0)
    }

    fn ack_device(&mut self, line: DeviceLine, unit: usize) {
        self.device_acks.push((line, unit));
        if let Some(bits) = self.pending.get_mut(&line) {
            *bits &= !(1 << unit);
        }
    }

    fn terminal_status(&self, unit: usize, half: TerminalHalf) -> u32 {
        self.terminal_statuses
            .get(&(unit, half))
            .copied()
            .unwrap_or(emips_nucleus::DEVICE_READY)
    }

    fn ack_terminal(&mut self, unit: usize, half: TerminalHalf) {
        self.terminal_acks.push((unit, half));
        if let Some(bits) = self.pending.get_mut(&DeviceLine::Terminal) {
            *bits &= !(1 << unit);
        }
    }
}

/// Places the interrupted state on the BIOS data page and enters the
/// exception vector, exactly as the hardware would.
pub fn deliver(n: &mut Nucleus<MockMachine>, saved: &ProcessorState) -> Control {
    n.machine_mut().write_bytes(BIOS_DATA_PAGE, saved.as_bytes());
    n.handle_exception()
}

/// A saved state representing a kernel-mode SYSCALL with the given number
/// and arguments.
pub fn syscall(code: SyscallCode, a1: u32, a2: u32, a3: u32) -> ProcessorState {
    let mut s = ProcessorState::new();
    s.pc = 0x2000_1000;
    s.cause = Cause(0).with_exc_code(ExcCode::Syscall);
    s.a0 = code as u32;
    s.a1 = a1;
    s.a2 = a2;
    s.a3 = a3;
    s
}

/// A saved state carrying a pending interrupt on `line`.
pub fn interrupt(line: u32) -> ProcessorState {
    let mut s = ProcessorState::new();
    s.pc = 0x2000_2000;
    s.cause = Cause(0).with_exc_code(ExcCode::Interrupt) | (1 << (8 + line));
    s
}

/// Unwraps a `Control::Load`, panicking on anything else.
pub fn loaded(control: Control) -> ProcessorState {
    match control {
        Control::Load(state) => state,
        other => panic!("expected a state load, got {other:?}"),
    }
}
