//! The session aggregate threaded through every FSM handler.
//!
//! `Session` is the single owner of the connectivity facts the engine
//! reasons about: whether the stack is attached, whether a join is in
//! progress, the coordinator's address, registration progress, the
//! report interval and testing mode.  It is only mutated from the main
//! loop, so no locking is needed.

use core::net::Ipv6Addr;

use crate::app::registration::RegistrationTracker;
use crate::app::report::ReportInterval;
use crate::app::work::{Work, WorkQueue};

pub struct Session {
    // -- Inputs (written by the service before stepping the FSM) --
    /// Last role notification classified as attached.
    pub attached: bool,
    /// A join session is in progress.
    pub join_active: bool,

    // -- Owned state --
    /// Coordinator address learned through provisioning.
    pub peer: Option<Ipv6Addr>,
    pub registration: RegistrationTracker,
    pub report_interval: ReportInterval,
    pub testing_mode: bool,

    // -- Outputs --
    /// Side effects requested by state actions.
    pub work: WorkQueue,
}

impl Session {
    pub fn new(report_interval: ReportInterval) -> Self {
        Self {
            attached: false,
            join_active: false,
            peer: None,
            registration: RegistrationTracker::new(),
            report_interval,
            testing_mode: false,
            work: WorkQueue::new(),
        }
    }

    pub fn submit(&mut self, work: Work) {
        self.work.submit(work);
    }

    /// Forget everything tied to the current connection episode.
    pub fn end_episode(&mut self) {
        self.peer = None;
        self.registration.reset();
        self.testing_mode = false;
    }
}
