//! Frame clock with fixed-timestep accumulator

use crate::config::LoopConfig;
use crate::context::FrameTime;
use std::time::{Duration, Instant};

/// Tracks frame time and hands out fixed steps from an accumulator
pub struct GameClock {
    /// Total elapsed time in seconds
    pub total_time: f64,
    /// Time since last frame in seconds, after clamping
    pub delta_time: f64,
    /// Fixed step length in seconds (default: 1/60 second)
    pub fixed_timestep: f64,
    /// Longest frame the clock will account for; anything beyond is dropped
    pub max_frame_time: f64,
    accumulator: f64,
    last_instant: Instant,
    first_tick: bool,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            fixed_timestep: 1.0 / 60.0,
            max_frame_time: 0.25,
            accumulator: 0.0,
            last_instant: Instant::now(),
            first_tick: true,
        }
    }
}

impl GameClock {
    /// Create a clock with a 60Hz fixed step
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixed_timestep(hz: f64) -> Self {
        Self {
            fixed_timestep: 1.0 / hz,
            ..Self::default()
        }
    }

    pub fn from_config(config: &LoopConfig) -> Self {
        Self {
            fixed_timestep: config.fixed_timestep(),
            max_frame_time: config.max_frame_time,
            ..Self::default()
        }
    }

    /// Advance by wall-clock time. Call once per frame; the first call yields zero delta.
    pub fn tick(&mut self) {
        let now = Instant::now();

        if self.first_tick {
            self.first_tick = false;
            self.last_instant = now;
            self.delta_time = 0.0;
            return;
        }

        let elapsed = now.duration_since(self.last_instant);
        self.last_instant = now;
        self.advance(elapsed);
    }

    /// Advance by an explicit amount of time
    pub fn advance(&mut self, elapsed: Duration) {
        self.first_tick = false;
        // Clamp so one long stall cannot demand an unbounded number of fixed steps.
        self.delta_time = elapsed.as_secs_f64().min(self.max_frame_time);
        self.total_time += self.delta_time;
        self.accumulator += self.delta_time;
    }

    /// True if there's enough accumulated time for one fixed step
    pub fn should_fixed_update(&self) -> bool {
        self.accumulator >= self.fixed_timestep
    }

    pub fn consume_fixed_step(&mut self) {
        self.accumulator -= self.fixed_timestep;
    }

    /// Drop whole fixed steps still owed, keeping the fractional remainder
    pub fn discard_backlog(&mut self) {
        self.accumulator %= self.fixed_timestep;
    }

    /// Fraction of a fixed step accumulated but not yet consumed
    pub fn interpolation_alpha(&self) -> f64 {
        self.accumulator / self.fixed_timestep
    }

    pub fn frame_time(&self) -> FrameTime {
        FrameTime {
            delta_time: self.delta_time,
            fixed_delta_time: self.fixed_timestep,
            total_time: self.total_time,
        }
    }
}
