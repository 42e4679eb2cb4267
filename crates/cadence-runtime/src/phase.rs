//! Scheduler phases

use std::fmt;

/// The phase the scheduler is currently driving.
///
/// Bring-up walks `Awake`, `Enable` and `Start` once; every frame after that
/// walks `FixedUpdate` (zero or more times), `Update`, `LateUpdate` and
/// `PostLateUpdate`. `Disable` is entered when the scheduler shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    None,
    Awake,
    Enable,
    Start,
    FixedUpdate,
    Update,
    LateUpdate,
    PostLateUpdate,
    Disable,
}

impl Phase {
    /// One of the three bring-up passes
    pub fn is_bring_up(self) -> bool {
        matches!(self, Phase::Awake | Phase::Enable | Phase::Start)
    }

    /// One of the phases the host calls every frame
    pub fn is_per_frame(self) -> bool {
        matches!(
            self,
            Phase::FixedUpdate | Phase::Update | Phase::LateUpdate | Phase::PostLateUpdate
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::None => "none",
            Phase::Awake => "awake",
            Phase::Enable => "enable",
            Phase::Start => "start",
            Phase::FixedUpdate => "fixed_update",
            Phase::Update => "update",
            Phase::LateUpdate => "late_update",
            Phase::PostLateUpdate => "post_late_update",
            Phase::Disable => "disable",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
