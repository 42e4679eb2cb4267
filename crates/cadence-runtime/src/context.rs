//! Context handed to lifecycle hooks

use crate::participant::ParticipantHandle;
use crate::phase::Phase;
use crate::scheduler::LifeCycleScheduler;

/// Timing for the current frame, as last provided by the host
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Time since the previous frame in seconds
    pub delta_time: f64,
    /// Length of one fixed step in seconds
    pub fixed_delta_time: f64,
    /// Total elapsed time in seconds
    pub total_time: f64,
}

/// What a hook can see and do while it runs.
///
/// Registering and unregistering through the context is the same as calling
/// the scheduler directly and is safe at any point of any phase.
pub struct LifeCycleContext<'a> {
    scheduler: &'a LifeCycleScheduler,
    participant: &'a ParticipantHandle,
}

impl<'a> LifeCycleContext<'a> {
    pub(crate) fn new(scheduler: &'a LifeCycleScheduler, participant: &'a ParticipantHandle) -> Self {
        Self {
            scheduler,
            participant,
        }
    }

    pub fn scheduler(&self) -> &'a LifeCycleScheduler {
        self.scheduler
    }

    /// The instance whose hook is running
    pub fn participant(&self) -> &'a ParticipantHandle {
        self.participant
    }

    pub fn phase(&self) -> Phase {
        self.scheduler.phase()
    }

    pub fn frame(&self) -> u64 {
        self.scheduler.frame()
    }

    pub fn time(&self) -> FrameTime {
        self.scheduler.time()
    }

    pub fn register(&self, participant: &ParticipantHandle) {
        self.scheduler.register(participant);
    }

    pub fn unregister(&self, participant: &ParticipantHandle) {
        self.scheduler.unregister(participant);
    }

    /// Unregister the running instance; it gets no phase calls from the next frame on
    pub fn unregister_self(&self) {
        self.scheduler.unregister(self.participant);
    }

    pub fn destroy_self(&self) {
        self.scheduler.destroy(self.participant);
    }
}
