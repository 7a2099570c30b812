use std::time::Duration;

use tracing::{info, warn};

use super::input::{InputAction, InputSnapshot};
use super::rendering::{RenderSink, Viewport};
use super::world::GameWorld;

/// Input collaborator: directional intent, polled once per simulation tick.
pub trait InputSource {
    fn poll(&mut self) -> InputSnapshot;
}

/// Replays a fixed list of per-tick snapshots, then reports no input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    steps: Vec<InputSnapshot>,
    cursor: usize,
}

impl ScriptedInput {
    pub fn new(steps: Vec<InputSnapshot>) -> Self {
        Self { steps, cursor: 0 }
    }

    pub fn hold(mut self, action: InputAction, ticks: usize) -> Self {
        let snapshot = InputSnapshot::empty().with_action_down(action, true);
        self.steps.extend(std::iter::repeat(snapshot).take(ticks));
        self
    }

    pub fn idle(mut self, ticks: usize) -> Self {
        self.steps
            .extend(std::iter::repeat(InputSnapshot::empty()).take(ticks));
        self
    }

    pub fn remaining(&self) -> usize {
        self.steps.len().saturating_sub(self.cursor)
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> InputSnapshot {
        let snapshot = self.steps.get(self.cursor).copied().unwrap_or_default();
        self.cursor = self.cursor.saturating_add(1);
        snapshot
    }
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub fixed_dt: Duration,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub viewport: Viewport,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fixed_dt: Duration::from_millis(16),
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            viewport: Viewport::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub ticks: u64,
    pub dropped_backlog: Duration,
}

/// Drives `world` with a fixed-step accumulator over the given frame times,
/// rendering once per frame.
pub fn run_headless(
    world: &mut GameWorld,
    config: &LoopConfig,
    frame_deltas: impl IntoIterator<Item = Duration>,
    input: &mut dyn InputSource,
    sink: &mut dyn RenderSink,
) -> LoopSummary {
    let fixed_dt = normalize_non_zero_duration(config.fixed_dt, Duration::from_millis(16));
    let tick_ms = fixed_dt.as_millis() as u64;
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let mut accumulator = Duration::ZERO;
    let mut summary = LoopSummary::default();

    info!(
        tick_ms,
        max_frame_delta_ms = config.max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        "headless_loop_started"
    );

    for raw_frame_dt in frame_deltas {
        accumulator =
            accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, config.max_frame_delta));
        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            let snapshot = input.poll();
            world.run_tick(tick_ms, &snapshot);
            summary.ticks += 1;
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
            summary.dropped_backlog = summary
                .dropped_backlog
                .saturating_add(step_plan.dropped_backlog);
        }

        world.render(sink, config.viewport);
        summary.frames += 1;
    }

    info!(
        frames = summary.frames,
        ticks = summary.ticks,
        dropped_backlog_ms = summary.dropped_backlog.as_millis() as u64,
        playtime_ms = world.playtime_ms(),
        "headless_loop_finished"
    );
    summary
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::SimConfig;
    use crate::app::object::{FrameSet, ObjectSpec};
    use crate::app::rendering::RecordingSink;
    use crate::app::types::MapPos;
    use crate::content::{MapData, MemoryAssets};

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(48), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn scripted_input_runs_dry_into_empty_snapshots() {
        let mut input = ScriptedInput::default()
            .hold(InputAction::MoveUp, 1)
            .idle(1);
        assert!(input.poll().is_down(InputAction::MoveUp));
        assert_eq!(input.poll().direction(), None);
        assert_eq!(input.remaining(), 0);
        assert_eq!(input.poll().direction(), None);
    }

    #[test]
    fn headless_run_ticks_renders_and_moves_player() {
        let assets = MemoryAssets::new().with_map(
            "level",
            MapData::from_ascii(&["....", "...."], MapPos::new(0, 0)),
        );
        let mut world = GameWorld::new(
            SimConfig::default(),
            vec!["level".to_string()],
            Box::new(assets),
        );
        world.load_map(0, false).expect("map");
        let player = world
            .spawn_object(ObjectSpec::player(MapPos::new(0, 0), FrameSet::single("hero")))
            .expect("player");

        let mut input = ScriptedInput::default().hold(InputAction::MoveDown, 1);
        let mut sink = RecordingSink::default();
        let summary = run_headless(
            &mut world,
            &LoopConfig::default(),
            vec![Duration::from_millis(32); 10],
            &mut input,
            &mut sink,
        );

        assert_eq!(summary.frames, 10);
        assert_eq!(summary.ticks, 20);
        assert_eq!(summary.dropped_backlog, Duration::ZERO);
        assert_eq!(world.playtime_ms(), 320);
        let player = world.object(player).expect("player");
        assert_eq!(player.map_pos(), MapPos::new(1, 0));
        assert!(!player.is_moving());
        assert_eq!(sink.draws_of("hero").count(), 10);
    }

    #[test]
    fn stalled_frame_drops_backlog() {
        let assets = MemoryAssets::new()
            .with_map("level", MapData::from_ascii(&["."], MapPos::new(0, 0)));
        let mut world = GameWorld::new(
            SimConfig::default(),
            vec!["level".to_string()],
            Box::new(assets),
        );
        world.load_map(0, false).expect("map");
        let mut sink = RecordingSink::default();
        let summary = run_headless(
            &mut world,
            &LoopConfig::default(),
            [Duration::from_secs(2)],
            &mut ScriptedInput::default(),
            &mut sink,
        );
        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.dropped_backlog, Duration::from_millis(170));
    }
}
