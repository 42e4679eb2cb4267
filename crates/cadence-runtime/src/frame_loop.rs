//! Host-side frame driver

use crate::clock::GameClock;
use crate::config::LoopConfig;
use crate::scheduler::LifeCycleScheduler;
use log::debug;
use std::time::Duration;

/// Owns a scheduler and calls its entry points in frame order:
/// fixed update as many times as the clock allows, then update, late update
/// and post-late update.
pub struct FrameLoop {
    scheduler: LifeCycleScheduler,
    clock: GameClock,
    config: LoopConfig,
}

impl FrameLoop {
    pub fn new(scheduler: LifeCycleScheduler, config: LoopConfig) -> Self {
        Self {
            scheduler,
            clock: GameClock::from_config(&config),
            config,
        }
    }

    pub fn scheduler(&self) -> &LifeCycleScheduler {
        &self.scheduler
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Run bring-up for everything registered so far
    pub fn start(&mut self) {
        self.scheduler.set_time(self.clock.frame_time());
        self.scheduler.bring_up();
    }

    /// Run one frame against wall-clock time; returns the fixed steps taken
    pub fn tick(&mut self) -> u32 {
        self.clock.tick();
        self.run_frame()
    }

    /// Run one frame as if `elapsed` had passed
    pub fn step(&mut self, elapsed: Duration) -> u32 {
        self.clock.advance(elapsed);
        self.run_frame()
    }

    pub fn stop(&mut self) {
        self.scheduler.shut_down();
    }

    fn run_frame(&mut self) -> u32 {
        self.scheduler.set_time(self.clock.frame_time());

        let mut steps = 0;
        while self.clock.should_fixed_update() {
            if steps == self.config.max_fixed_steps_per_frame {
                debug!("dropping fixed-step backlog after {} steps", steps);
                self.clock.discard_backlog();
                break;
            }
            self.scheduler.enter_fixed_update();
            self.clock.consume_fixed_step();
            steps += 1;
        }

        self.scheduler.enter_update();
        self.scheduler.enter_late_update();
        self.scheduler.enter_post_late_update();
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LifeCycleContext;
    use crate::participant::{LifeCycle, Participant};
    use cadence_core::{ExecutionRank, Result};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counts {
        fixed: u32,
        update: u32,
        post: u32,
        fixed_delta: f64,
    }

    struct Counter(Rc<RefCell<Counts>>);

    impl LifeCycle for Counter {
        fn on_fixed_update(&mut self, cx: &LifeCycleContext<'_>) -> Result<()> {
            let mut counts = self.0.borrow_mut();
            counts.fixed += 1;
            counts.fixed_delta = cx.time().fixed_delta_time;
            Ok(())
        }

        fn on_update(&mut self, _cx: &LifeCycleContext<'_>) -> Result<()> {
            self.0.borrow_mut().update += 1;
            Ok(())
        }

        fn on_post_late_update(&mut self, _cx: &LifeCycleContext<'_>) -> Result<()> {
            self.0.borrow_mut().post += 1;
            Ok(())
        }
    }

    fn frame_loop(config: LoopConfig) -> (FrameLoop, Rc<RefCell<Counts>>) {
        let counts = Rc::new(RefCell::new(Counts::default()));
        let scheduler = LifeCycleScheduler::new();
        scheduler.register(&Participant::new(
            "Counter",
            "counter",
            ExecutionRank::ZERO,
            Counter(counts.clone()),
        ));
        let mut frame_loop = FrameLoop::new(scheduler, config);
        frame_loop.start();
        (frame_loop, counts)
    }

    #[test]
    fn test_step_runs_fixed_steps_then_frame_phases() {
        let config = LoopConfig {
            fixed_timestep_hz: 50.0,
            ..LoopConfig::default()
        };
        let (mut frame_loop, counts) = frame_loop(config);

        assert_eq!(frame_loop.step(Duration::from_millis(50)), 2);
        assert_eq!(frame_loop.step(Duration::from_millis(5)), 0);

        let counts = counts.borrow();
        assert_eq!(counts.fixed, 2);
        assert_eq!(counts.update, 2);
        assert_eq!(counts.post, 2);
        assert!((counts.fixed_delta - 0.02).abs() < 1e-10);
        assert_eq!(frame_loop.scheduler().frame(), 2);
    }

    #[test]
    fn test_fixed_steps_are_capped_per_frame() {
        let config = LoopConfig {
            fixed_timestep_hz: 100.0,
            max_frame_time: 1.0,
            max_fixed_steps_per_frame: 3,
        };
        let (mut frame_loop, counts) = frame_loop(config);

        assert_eq!(frame_loop.step(Duration::from_millis(500)), 3);
        assert!(!frame_loop.clock().should_fixed_update());
        assert_eq!(counts.borrow().fixed, 3);
    }

    #[test]
    fn test_stop_ends_frame_calls() {
        let (mut frame_loop, counts) = frame_loop(LoopConfig::default());
        frame_loop.stop();
        frame_loop.step(Duration::from_millis(100));
        assert_eq!(counts.borrow().update, 0);
        assert!(!frame_loop.scheduler().is_active());
    }
}
