/// Failures surfaced by nucleus operations.
///
/// Exhaustion of a fixed pool is a recoverable condition reported to the
/// caller; the nucleus itself never panics over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NucleusError {
    #[error("process table exhausted")]
    NoFreePcb,
    #[error("semaphore descriptor pool exhausted")]
    NoFreeSemd,
    #[error("semaphore id out of range: {0}")]
    BadSemaphore(u32),
    #[error("no such process")]
    NoSuchProcess,
}
