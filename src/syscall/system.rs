//! Introspection services: CPU time and the support-structure pointer.

use crate::{
    machine::{Control, Machine},
    nucleus::Nucleus,
    state::ProcessorState,
};

/// GetCpuTime: accumulated CPU time of the caller, including the slice in
/// progress, in `v0`.
pub(super) fn get_cpu_time<M: Machine>(n: &mut Nucleus<M>, mut saved: ProcessorState) -> Control {
    let Some(p) = n.current else {
        return n.schedule();
    };
    let pcb = &n.pcbs[p];
    let elapsed = n.machine.now() - pcb.start_tod;
    saved.v0 = (pcb.time + elapsed) as u32;
    Control::Load(saved)
}

/// GetSupportPtr: the support-structure address registered at creation, or
/// 0 when the process has none.
pub(super) fn get_support_ptr<M: Machine>(
    n: &mut Nucleus<M>,
    mut saved: ProcessorState,
) -> Control {
    let Some(p) = n.current else {
        return n.schedule();
    };
    saved.v0 = n.pcbs[p].support.map_or(0, |s| s.get());
    Control::Load(saved)
}
