//! Exception dispatch and Pass-Up-or-Die.
//!
//! The single vector installed at boot lands here. The hardware has already
//! deposited the interrupted state on the BIOS data page; the cause word's
//! exception code selects the handler.

use crate::{
    interrupt,
    machine::{Control, Machine},
    nucleus::Nucleus,
    param::BIOS_DATA_PAGE,
    state::{support_layout, ExcCode, PassUpKind, ProcessorState, SupportContext},
    syscall,
};

impl<M: Machine> Nucleus<M> {
    /// Entry point for every exception and interrupt.
    pub fn handle_exception(&mut self) -> Control {
        let saved = ProcessorState::read_from(&self.machine, BIOS_DATA_PAGE);
        match saved.cause().exc_code() {
            Some(ExcCode::Interrupt) => interrupt::handle(self, saved),
            Some(code) if code.is_tlb() => self.pass_up_or_die(saved, PassUpKind::PageFault),
            Some(ExcCode::Syscall) => syscall::handle(self, saved),
            Some(_) => self.pass_up_or_die(saved, PassUpKind::General),
            None => {
                log::warn!(
                    "undefined exception code {}, terminating current process",
                    saved.cause().raw_exc_code()
                );
                self.die_current()
            }
        }
    }

    /// Escalates an exception the nucleus does not resolve.
    ///
    /// With a registered support structure the saved state is stored into
    /// its exception-state slot for `kind` and the matching support context
    /// becomes the continuation of the same process. Without one, the
    /// process dies.
    pub(crate) fn pass_up_or_die(
        &mut self,
        saved: ProcessorState,
        kind: PassUpKind,
    ) -> Control {
        let support = self.current.and_then(|p| self.pcbs[p].support);
        match support {
            Some(support) => {
                let support = support.get();
                saved.write_to(&mut self.machine, support_layout::except_state(support, kind));
                let ctx = SupportContext::read_from(
                    &self.machine,
                    support_layout::except_context(support, kind),
                );
                Control::LoadContext(ctx)
            }
            None => {
                log::trace!("pass-up with no support structure, process dies");
                self.die_current()
            }
        }
    }
}
