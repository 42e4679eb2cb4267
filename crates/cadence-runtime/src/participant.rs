//! Participant instances and the lifecycle hook contract

use crate::context::LifeCycleContext;
use cadence_core::{CadenceError, ExecutionRank, InstanceId, Result};
use cadence_order::ExecutionOrder;
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Hooks a component implements to take part in the frame lifecycle.
///
/// Every hook defaults to a no-op. A hook that returns an error is logged
/// by the scheduler and the rest of the pass continues.
pub trait LifeCycle {
    /// Called once, before the first `on_enabled`
    fn on_wake(&mut self, _cx: &LifeCycleContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called each time the instance becomes active
    fn on_enabled(&mut self, _cx: &LifeCycleContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called once, after the first `on_enabled` and before any update
    fn on_start(&mut self, _cx: &LifeCycleContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_fixed_update(&mut self, _cx: &LifeCycleContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_update(&mut self, _cx: &LifeCycleContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_late_update(&mut self, _cx: &LifeCycleContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_post_late_update(&mut self, _cx: &LifeCycleContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called each time the instance is unregistered while enabled
    fn on_disabled(&mut self, _cx: &LifeCycleContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called once when an instance that was woken is destroyed
    fn on_destroy(&mut self, _cx: &LifeCycleContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Which hook to deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hook {
    Wake,
    Enabled,
    Start,
    FixedUpdate,
    Update,
    LateUpdate,
    PostLateUpdate,
    Disabled,
    Destroy,
}

impl Hook {
    pub(crate) fn invoke(self, behaviour: &mut dyn LifeCycle, cx: &LifeCycleContext<'_>) -> Result<()> {
        match self {
            Hook::Wake => behaviour.on_wake(cx),
            Hook::Enabled => behaviour.on_enabled(cx),
            Hook::Start => behaviour.on_start(cx),
            Hook::FixedUpdate => behaviour.on_fixed_update(cx),
            Hook::Update => behaviour.on_update(cx),
            Hook::LateUpdate => behaviour.on_late_update(cx),
            Hook::PostLateUpdate => behaviour.on_post_late_update(cx),
            Hook::Disabled => behaviour.on_disabled(cx),
            Hook::Destroy => behaviour.on_destroy(cx),
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Hook::Wake => "on_wake",
            Hook::Enabled => "on_enabled",
            Hook::Start => "on_start",
            Hook::FixedUpdate => "on_fixed_update",
            Hook::Update => "on_update",
            Hook::LateUpdate => "on_late_update",
            Hook::PostLateUpdate => "on_post_late_update",
            Hook::Disabled => "on_disabled",
            Hook::Destroy => "on_destroy",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Flags {
    pub awake: bool,
    pub enabled: bool,
    pub started: bool,
    pub registered: bool,
    pub destroyed: bool,
}

/// Shared handle to a participant; the scheduler's registry and snapshot hold clones
pub type ParticipantHandle = Rc<Participant>;

/// One component instance known to the scheduler.
///
/// Carries the constant rank of its type, the identity used for same-rank
/// tie-breaks, and the lifecycle flags. The flags only move forward until
/// the instance is destroyed, except `enabled` which follows registration.
pub struct Participant {
    id: InstanceId,
    type_name: String,
    path: String,
    rank: ExecutionRank,
    flags: Cell<Flags>,
    behaviour: RefCell<Box<dyn LifeCycle>>,
}

impl Participant {
    pub fn new(
        type_name: &str,
        path: &str,
        rank: ExecutionRank,
        behaviour: impl LifeCycle + 'static,
    ) -> ParticipantHandle {
        Rc::new(Self {
            id: InstanceId::new(),
            type_name: type_name.to_string(),
            path: path.to_string(),
            rank,
            flags: Cell::new(Flags::default()),
            behaviour: RefCell::new(Box::new(behaviour)),
        })
    }

    /// Create an instance of a resolved type, taking its rank from `order`
    pub fn from_order(
        order: &ExecutionOrder,
        type_name: &str,
        path: &str,
        behaviour: impl LifeCycle + 'static,
    ) -> Result<ParticipantHandle> {
        let rank = order
            .rank_of(type_name)
            .ok_or_else(|| CadenceError::UnknownParticipantType(type_name.to_string()))?;
        Ok(Self::new(type_name, path, rank, behaviour))
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Per-instance path, the second same-rank tie-break
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn execution_rank(&self) -> ExecutionRank {
        self.rank
    }

    pub fn is_awake(&self) -> bool {
        self.flags.get().awake
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.get().enabled
    }

    pub fn is_started(&self) -> bool {
        self.flags.get().started
    }

    pub fn is_registered(&self) -> bool {
        self.flags.get().registered
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags.get().destroyed
    }

    /// Snapshot order: rank, then type name, then path, then id
    pub fn execution_cmp(&self, other: &Participant) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.type_name.cmp(&other.type_name))
            .then_with(|| self.path.cmp(&other.path))
            .then_with(|| self.id.cmp(&other.id))
    }

    pub(crate) fn flags(&self) -> Flags {
        self.flags.get()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut Flags)) {
        let mut flags = self.flags.get();
        f(&mut flags);
        self.flags.set(flags);
    }

    /// True while one of this instance's hooks is running
    pub(crate) fn is_busy(&self) -> bool {
        self.behaviour.try_borrow_mut().is_err()
    }

    pub(crate) fn behaviour(&self) -> &RefCell<Box<dyn LifeCycle>> {
        &self.behaviour
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("path", &self.path)
            .field("rank", &self.rank)
            .field("flags", &self.flags.get())
            .finish()
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.type_name, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;
    impl LifeCycle for Inert {}

    #[test]
    fn test_new_participant_is_inactive() {
        let participant = Participant::new("Logger", "/root/logger", ExecutionRank(0), Inert);
        assert!(!participant.is_awake());
        assert!(!participant.is_enabled());
        assert!(!participant.is_started());
        assert!(!participant.is_registered());
        assert!(!participant.is_destroyed());
        assert_eq!(participant.to_string(), "Logger (/root/logger)");
    }

    #[test]
    fn test_from_order() {
        let mut order = ExecutionOrder::new();
        order.insert("Pool", ExecutionRank(1));

        let pool = Participant::from_order(&order, "Pool", "/pool", Inert).unwrap();
        assert_eq!(pool.execution_rank(), ExecutionRank(1));

        let missing = Participant::from_order(&order, "Factory", "/factory", Inert);
        assert!(matches!(missing, Err(CadenceError::UnknownParticipantType(_))));
    }

    #[test]
    fn test_execution_cmp_tie_breaks() {
        let a = Participant::new("Audio", "/b", ExecutionRank(1), Inert);
        let b = Participant::new("Audio", "/c", ExecutionRank(1), Inert);
        let c = Participant::new("Pool", "/a", ExecutionRank(1), Inert);
        let d = Participant::new("Zed", "/a", ExecutionRank(0), Inert);

        assert_eq!(a.execution_cmp(&b), Ordering::Less);
        assert_eq!(b.execution_cmp(&c), Ordering::Less);
        assert_eq!(d.execution_cmp(&a), Ordering::Less);
        assert_eq!(a.execution_cmp(&a), Ordering::Equal);
    }
}
