//! Process creation and termination services.

use crate::{
    machine::{Control, Machine},
    nucleus::Nucleus,
    state::ProcessorState,
};

/// CreateProcess: `a1` points at the child's entry state, `a2` carries the
/// optional support-structure address. Returns 0 in `v0`, or -1 when the
/// process table is exhausted.
pub(super) fn create_process<M: Machine>(
    n: &mut Nucleus<M>,
    mut saved: ProcessorState,
) -> Control {
    saved.v0 = match n.spawn(saved.a1, saved.a2) {
        Ok(_) => 0,
        Err(err) => {
            log::trace!("create process failed: {err}");
            -1_i32 as u32
        }
    };
    Control::Load(saved)
}

/// TerminateProcess: the caller and its whole subtree disappear.
pub(super) fn terminate_process<M: Machine>(n: &mut Nucleus<M>) -> Control {
    n.die_current()
}
