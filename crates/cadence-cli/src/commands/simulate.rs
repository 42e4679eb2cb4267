//! Lifecycle simulation command

use super::resolve;
use anyhow::{Context, Result};
use cadence_core::Result as HookResult;
use cadence_runtime::{
    FrameLoop, LifeCycle, LifeCycleContext, LifeCycleScheduler, LoopConfig, Participant,
};
use std::path::Path;
use std::time::Duration;

pub struct SimulateArgs {
    pub path: String,
    pub frames: u32,
    pub config: Option<String>,
    pub frame_time: Option<f64>,
}

/// Prints every hook it receives
struct Tracer;

impl Tracer {
    fn trace(&self, cx: &LifeCycleContext<'_>, hook: &str) -> HookResult<()> {
        let participant = cx.participant();
        println!(
            "  frame {:<4} {:<16} {:<20} rank {:<3} {}",
            cx.frame(),
            cx.phase().name(),
            hook,
            participant.execution_rank().value(),
            participant
        );
        Ok(())
    }
}

impl LifeCycle for Tracer {
    fn on_wake(&mut self, cx: &LifeCycleContext<'_>) -> HookResult<()> {
        self.trace(cx, "on_wake")
    }

    fn on_enabled(&mut self, cx: &LifeCycleContext<'_>) -> HookResult<()> {
        self.trace(cx, "on_enabled")
    }

    fn on_start(&mut self, cx: &LifeCycleContext<'_>) -> HookResult<()> {
        self.trace(cx, "on_start")
    }

    fn on_fixed_update(&mut self, cx: &LifeCycleContext<'_>) -> HookResult<()> {
        self.trace(cx, "on_fixed_update")
    }

    fn on_update(&mut self, cx: &LifeCycleContext<'_>) -> HookResult<()> {
        self.trace(cx, "on_update")
    }

    fn on_late_update(&mut self, cx: &LifeCycleContext<'_>) -> HookResult<()> {
        self.trace(cx, "on_late_update")
    }

    fn on_post_late_update(&mut self, cx: &LifeCycleContext<'_>) -> HookResult<()> {
        self.trace(cx, "on_post_late_update")
    }

    fn on_disabled(&mut self, cx: &LifeCycleContext<'_>) -> HookResult<()> {
        self.trace(cx, "on_disabled")
    }
}

pub fn run(args: SimulateArgs) -> Result<()> {
    let (assigner, order) = resolve(&args.path)?;
    if assigner.has_errors() {
        for error in assigner.errors() {
            eprintln!("  [ERROR] {}", error);
        }
        eprintln!("Simulating with fallback ranks for the types above.");
    }

    let config = match &args.config {
        Some(path) => LoopConfig::load_file(Path::new(path))
            .with_context(|| format!("Failed to load loop config {}", path))?,
        None => LoopConfig::default(),
    };
    let frame_time = frame_duration(args.frame_time.unwrap_or_else(|| config.fixed_timestep()))?;

    let scheduler = LifeCycleScheduler::new();
    for (type_name, _) in order.sorted() {
        let path = format!("/{}", type_name.to_lowercase());
        let participant = Participant::from_order(&order, type_name, &path, Tracer)?;
        scheduler.register(&participant);
    }
    log::info!("simulating {} participants for {} frame(s)", scheduler.len(), args.frames);

    let mut frame_loop = FrameLoop::new(scheduler, config);
    println!("bring-up");
    frame_loop.start();

    for frame in 0..args.frames {
        println!("frame {}", frame);
        frame_loop.step(frame_time);
    }

    println!("shut down");
    frame_loop.stop();
    Ok(())
}

fn frame_duration(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|e| {
        anyhow::anyhow!(
            "--frame-time must be a non-negative number of seconds, got {}: {}",
            seconds,
            e
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration() {
        assert_eq!(frame_duration(0.5).unwrap(), Duration::from_millis(500));
        assert_eq!(frame_duration(0.0).unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_frame_duration_rejects_out_of_range() {
        assert!(frame_duration(-1.0).is_err());
        assert!(frame_duration(f64::NAN).is_err());
        assert!(frame_duration(f64::INFINITY).is_err());
        assert!(frame_duration(1e30).is_err());
    }
}
