/// Maximum number of concurrent processes.
pub const MAX_PROC: usize = 20;

/// Processor quantum in microseconds.
pub const QUANTUM: u32 = 5_000;
/// Pseudo-clock tick period in microseconds.
pub const CLOCK_INTERVAL: u32 = 100_000;

/// Peripheral devices per interrupt line.
pub const DEV_PER_LINE: usize = 8;
/// Interrupt lines wired to peripheral devices (disk, flash, network,
/// printer, terminal).
pub const DEV_LINES: usize = 5;

/// Semaphore slots backing the device array: one per non-terminal device,
/// two per terminal (receive and transmit).
pub const SEM_DEVICE_SLOTS: usize = (DEV_LINES - 1) * DEV_PER_LINE + 2 * DEV_PER_LINE;
/// General-purpose counter slots available to supervisor-level code.
pub const MAX_USER_SEM: usize = 40;
/// Total semaphore slots: devices, pseudo-clock, user counters.
pub const SEM_SLOTS: usize = SEM_DEVICE_SLOTS + 1 + MAX_USER_SEM;

/// Page where the hardware deposits the interrupted processor state.
pub const BIOS_DATA_PAGE: u32 = 0x0FFF_F000;
