//! Lifecycle scheduler
//!
//! The registry (rank → instances) is the source of truth. Passes iterate a
//! flat snapshot derived from it, so instances may register or unregister
//! from inside any hook without disturbing the pass in flight:
//! - registration during bring-up or between frames rebuilds the snapshot at
//!   once; a running bring-up pass picks the newcomer up at its rank
//! - registration during a frame phase catches the instance up immediately
//!   and lets it into the snapshot at the next frame boundary
//! - unregistration never rebuilds; the snapshot refreshes on the next frame

use crate::context::{FrameTime, LifeCycleContext};
use crate::participant::{Flags, Hook, Participant, ParticipantHandle};
use crate::phase::Phase;
use cadence_core::{CadenceError, ExecutionRank};
use log::{debug, error, trace, warn};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::Rc;

struct SchedulerState {
    phase: Phase,
    /// Bring-up finished and no shut down since
    active: bool,
    /// Rank the current bring-up pass is visiting
    processing: ExecutionRank,
    registry: BTreeMap<ExecutionRank, Vec<ParticipantHandle>>,
    snapshot: Rc<[ParticipantHandle]>,
    dirty: bool,
    /// Frame at whose first fixed update or update the snapshot is rebuilt
    refresh_at: Option<u64>,
    frame: u64,
    /// A frame phase of the current frame has run and post-late update has not
    in_frame: bool,
}

impl SchedulerState {
    fn new() -> Self {
        Self {
            phase: Phase::None,
            active: false,
            processing: ExecutionRank::ZERO,
            registry: BTreeMap::new(),
            snapshot: Rc::from(Vec::new()),
            dirty: false,
            refresh_at: None,
            frame: 0,
            in_frame: false,
        }
    }

    fn insert(&mut self, participant: &ParticipantHandle) {
        let bucket = self
            .registry
            .entry(participant.execution_rank())
            .or_default();
        let index =
            bucket.partition_point(|p| p.execution_cmp(participant) == Ordering::Less);
        bucket.insert(index, participant.clone());
    }

    fn remove(&mut self, participant: &Participant) -> bool {
        let rank = participant.execution_rank();
        let Some(bucket) = self.registry.get_mut(&rank) else {
            return false;
        };
        let Some(index) = bucket.iter().position(|p| p.id() == participant.id()) else {
            return false;
        };
        bucket.remove(index);
        if bucket.is_empty() {
            self.registry.remove(&rank);
        }
        true
    }

    fn rebuild(&mut self) {
        self.snapshot = self.registry.values().flatten().cloned().collect();
        self.dirty = false;
        self.refresh_at = None;
        trace!("snapshot rebuilt with {} participants", self.snapshot.len());
    }

    /// Rebuild at the start of the next frame: the following one if a frame
    /// is in flight, otherwise the one about to begin
    fn request_refresh(&mut self) {
        self.dirty = true;
        let target = if self.in_frame {
            self.frame + 1
        } else {
            self.frame
        };
        self.refresh_at = Some(self.refresh_at.map_or(target, |at| at.min(target)));
    }

    fn refresh_due(&self) -> bool {
        matches!(self.refresh_at, Some(at) if self.frame >= at)
    }

    fn len(&self) -> usize {
        self.registry.values().map(Vec::len).sum()
    }
}

/// Drives registered participants through bring-up and the per-frame phases.
///
/// Single-threaded and re-entrant: every method takes `&self`, and hooks
/// receive the scheduler back through their [`LifeCycleContext`].
pub struct LifeCycleScheduler {
    state: RefCell<SchedulerState>,
    /// Hooks addressed to an instance while it was inside another of its hooks
    deferred: RefCell<Vec<(ParticipantHandle, Hook)>>,
    time: Cell<FrameTime>,
}

impl Default for LifeCycleScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl LifeCycleScheduler {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(SchedulerState::new()),
            deferred: RefCell::new(Vec::new()),
            time: Cell::new(FrameTime::default()),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    /// Number of completed frames (incremented after post-late update)
    pub fn frame(&self) -> u64 {
        self.state.borrow().frame
    }

    /// Whether bring-up has completed and the scheduler has not been shut down
    pub fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    pub fn time(&self) -> FrameTime {
        self.time.get()
    }

    /// Timing exposed to hooks until the next call
    pub fn set_time(&self, time: FrameTime) {
        self.time.set(time);
    }

    /// Number of registered participants
    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_registered(&self, participant: &Participant) -> bool {
        let state = self.state.borrow();
        state
            .registry
            .get(&participant.execution_rank())
            .map(|bucket| bucket.iter().any(|p| p.id() == participant.id()))
            .unwrap_or(false)
    }

    /// The iteration snapshot passes currently use; may lag the registry by a frame
    pub fn snapshot(&self) -> Rc<[ParticipantHandle]> {
        self.state.borrow().snapshot.clone()
    }

    /// Registered participants in execution order, straight from the registry
    pub fn registered(&self) -> Vec<ParticipantHandle> {
        self.state
            .borrow()
            .registry
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    /// Add an instance and catch it up to the current phase.
    ///
    /// Registering an instance that is already registered does nothing.
    pub fn register(&self, participant: &ParticipantHandle) {
        if participant.is_destroyed() {
            warn!(
                "{}",
                CadenceError::InvalidInstance(format!("cannot register destroyed {}", participant))
            );
            return;
        }
        if participant.is_registered() {
            trace!("{} is already registered", participant);
            return;
        }

        {
            let mut state = self.state.borrow_mut();
            state.insert(participant);
            participant.update(|f| f.registered = true);
            if state.in_frame {
                state.request_refresh();
            } else {
                state.rebuild();
            }
            debug!(
                "registered {} at rank {} during {}",
                participant,
                participant.execution_rank(),
                state.phase
            );
        }

        self.catch_up(participant);
    }

    /// Remove an instance, disabling it if it was enabled.
    ///
    /// The pass in flight keeps its snapshot; the instance leaves the snapshot
    /// on the next frame. Safe to call from the instance's own hooks.
    pub fn unregister(&self, participant: &ParticipantHandle) {
        if participant.is_destroyed() {
            warn!(
                "{}",
                CadenceError::InvalidInstance(format!(
                    "cannot unregister destroyed {}",
                    participant
                ))
            );
            return;
        }
        if !participant.is_registered() {
            trace!("{} is not registered", participant);
            return;
        }

        {
            let mut state = self.state.borrow_mut();
            state.remove(participant);
            state.request_refresh();
            participant.update(|f| f.registered = false);
            debug!("unregistered {} during {}", participant, state.phase);
        }

        if participant.is_enabled() {
            participant.update(|f| f.enabled = false);
            self.dispatch(participant, Hook::Disabled);
        }
    }

    /// Tear an instance down for good.
    ///
    /// Unregisters it, calls `on_destroy` if it was ever woken and resets its
    /// state. Any later register or unregister of it is rejected.
    pub fn destroy(&self, participant: &ParticipantHandle) {
        if participant.is_destroyed() {
            warn!(
                "{}",
                CadenceError::InvalidInstance(format!("{} is already destroyed", participant))
            );
            return;
        }

        self.unregister(participant);
        let was_awake = participant.is_awake();
        participant.update(|f| {
            *f = Flags {
                destroyed: true,
                ..Flags::default()
            }
        });
        if was_awake {
            self.dispatch(participant, Hook::Destroy);
        }
    }

    /// Wake, enable and start everything registered, as three full passes
    pub fn bring_up(&self) {
        {
            let state = self.state.borrow();
            if state.active || state.phase.is_bring_up() {
                warn!("bring_up ignored: scheduler is already running");
                return;
            }
        }

        self.run_bring_up_pass(Phase::Awake);
        self.run_bring_up_pass(Phase::Enable);
        self.run_bring_up_pass(Phase::Start);

        self.state.borrow_mut().active = true;
        debug!("bring-up complete with {} participants", self.len());
    }

    /// Call once per fixed step; zero or more times per frame
    pub fn enter_fixed_update(&self) {
        self.run_frame_phase(Phase::FixedUpdate, Hook::FixedUpdate);
    }

    pub fn enter_update(&self) {
        self.run_frame_phase(Phase::Update, Hook::Update);
    }

    pub fn enter_late_update(&self) {
        self.run_frame_phase(Phase::LateUpdate, Hook::LateUpdate);
    }

    /// Last phase of a frame; advances the frame counter
    pub fn enter_post_late_update(&self) {
        self.run_frame_phase(Phase::PostLateUpdate, Hook::PostLateUpdate);
        let mut state = self.state.borrow_mut();
        if state.active {
            state.frame += 1;
            state.in_frame = false;
        }
    }

    /// Disable every enabled instance in reverse execution order.
    ///
    /// Instances stay registered; a later `bring_up` enables them again
    /// without waking or starting them a second time.
    pub fn shut_down(&self) {
        let participants: Vec<ParticipantHandle> = {
            let mut state = self.state.borrow_mut();
            if !state.active {
                return;
            }
            state.active = false;
            state.in_frame = false;
            state.phase = Phase::Disable;
            state.processing = ExecutionRank::ZERO;
            state.rebuild();
            state.snapshot.iter().rev().cloned().collect()
        };

        for participant in &participants {
            if participant.is_enabled() {
                participant.update(|f| f.enabled = false);
                self.dispatch(participant, Hook::Disabled);
            }
        }
        debug!("shut down {} participants", participants.len());
    }

    fn run_bring_up_pass(&self, phase: Phase) {
        {
            let mut state = self.state.borrow_mut();
            state.phase = phase;
            state.processing = ExecutionRank::ZERO;
            if state.dirty {
                state.rebuild();
            }
        }

        let mut last: Option<ParticipantHandle> = None;
        while let Some(participant) = self.next_after(last.as_deref()) {
            self.state.borrow_mut().processing = participant.execution_rank();
            match phase {
                Phase::Awake if participant.is_registered() => self.wake(&participant),
                Phase::Enable if participant.is_awake() => self.enable(&participant),
                Phase::Start => self.start(&participant),
                _ => {}
            }
            last = Some(participant);
        }

        // Past every rank: anything registering from here on is caught up at once.
        self.state.borrow_mut().processing = ExecutionRank::MAX;
    }

    /// First snapshot entry ordered after `last`; re-read each step so
    /// instances registered mid-pass at a higher rank are still visited
    fn next_after(&self, last: Option<&Participant>) -> Option<ParticipantHandle> {
        let state = self.state.borrow();
        let index = match last {
            Some(last) => state
                .snapshot
                .partition_point(|p| p.execution_cmp(last) != Ordering::Greater),
            None => 0,
        };
        state.snapshot.get(index).cloned()
    }

    fn run_frame_phase(&self, phase: Phase, hook: Hook) {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            if !state.active {
                trace!("{} skipped: scheduler is not running", phase);
                return;
            }
            state.phase = phase;
            state.in_frame = true;
            if matches!(phase, Phase::FixedUpdate | Phase::Update) && state.refresh_due() {
                state.rebuild();
            }
            state.snapshot.clone()
        };

        for participant in snapshot.iter() {
            if participant.is_started() && participant.is_enabled() {
                self.dispatch(participant, hook);
            }
        }
    }

    fn catch_up(&self, participant: &ParticipantHandle) {
        let (phase, processing) = {
            let state = self.state.borrow();
            (state.phase, state.processing)
        };
        // An instance at or below the rank being visited has been passed
        // over already and must be served now.
        let passed = participant.execution_rank() <= processing;

        match phase {
            Phase::None | Phase::Disable => {}
            Phase::Awake => {
                if passed {
                    self.wake(participant);
                }
            }
            Phase::Enable => {
                self.wake(participant);
                if passed {
                    self.enable(participant);
                }
            }
            Phase::Start => {
                self.enable(participant);
                if passed {
                    self.start(participant);
                }
            }
            Phase::FixedUpdate | Phase::Update | Phase::LateUpdate | Phase::PostLateUpdate => {
                self.enable(participant);
                self.start(participant);
            }
        }
    }

    fn wake(&self, participant: &ParticipantHandle) {
        let flags = participant.flags();
        if flags.awake || flags.destroyed {
            return;
        }
        participant.update(|f| f.awake = true);
        self.dispatch(participant, Hook::Wake);
    }

    fn enable(&self, participant: &ParticipantHandle) {
        self.wake(participant);
        let flags = participant.flags();
        if flags.enabled || !flags.awake || !flags.registered {
            return;
        }
        participant.update(|f| f.enabled = true);
        self.dispatch(participant, Hook::Enabled);
    }

    fn start(&self, participant: &ParticipantHandle) {
        let flags = participant.flags();
        if flags.started || !flags.enabled {
            return;
        }
        participant.update(|f| f.started = true);
        self.dispatch(participant, Hook::Start);
    }

    fn dispatch(&self, participant: &ParticipantHandle, hook: Hook) {
        let result = match participant.behaviour().try_borrow_mut() {
            Ok(mut behaviour) => {
                let cx = LifeCycleContext::new(self, participant);
                hook.invoke(&mut **behaviour, &cx)
            }
            Err(_) => {
                // Inside one of its own hooks; delivered once that hook returns.
                trace!("{} for {} deferred", hook.name(), participant);
                self.deferred
                    .borrow_mut()
                    .push((participant.clone(), hook));
                return;
            }
        };

        if let Err(err) = result {
            error!("{} failed for {}: {}", hook.name(), participant, err);
        }
        self.flush_deferred();
    }

    fn flush_deferred(&self) {
        loop {
            let (participant, hook) = {
                let mut deferred = self.deferred.borrow_mut();
                match deferred.iter().position(|(p, _)| !p.is_busy()) {
                    Some(index) => deferred.remove(index),
                    None => return,
                }
            };
            self.dispatch(&participant, hook);
        }
    }
}
