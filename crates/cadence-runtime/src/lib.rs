//! Cadence Runtime - Lifecycle scheduling for frame-driven hosts
//!
//! Drives participant instances through their lifecycle in execution rank order:
//! - `LifeCycle` - hook trait implemented by component behaviour
//! - `Participant` - one registered instance with its awake/enabled/started state
//! - `LifeCycleScheduler` - rank-ordered registry, bring-up passes and per-frame phases
//! - `GameClock` / `FrameLoop` - fixed-timestep driver calling the phases in host order
//! - `LoopConfig` - frame loop settings loaded from TOML

mod clock;
mod config;
mod context;
mod frame_loop;
mod participant;
mod phase;
mod scheduler;

pub use clock::GameClock;
pub use config::LoopConfig;
pub use context::{FrameTime, LifeCycleContext};
pub use frame_loop::FrameLoop;
pub use participant::{LifeCycle, Participant, ParticipantHandle};
pub use phase::Phase;
pub use scheduler::LifeCycleScheduler;
