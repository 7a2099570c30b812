use crate::SimError;

use super::config::SimConfig;
use super::types::{MapPos, ScreenPos};

/// Result of advancing a [`Walker`] by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkStep {
    pub position: ScreenPos,
    /// Animation frames the owner should advance this tick.
    pub frames_advanced: u32,
    /// Destination tile, set on the tick the walk completes.
    pub arrived: Option<MapPos>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Motion {
    destination: MapPos,
    start: ScreenPos,
    target: ScreenPos,
    elapsed_ms: u64,
    movement_deadline_ms: u64,
    animation_deadline_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkerState {
    Idle,
    Moving(Motion),
}

/// Time-driven pixel interpolation between two tiles.
///
/// Movement takes `ms_per_pixel` per pixel of distance; an animation frame is
/// due every `frame_time_ms`. Elapsed time is clamped to the movement deadline,
/// so the final state depends only on the total time fed in, not on how it was
/// split across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Walker {
    ms_per_pixel: u64,
    frame_time_ms: u64,
    state: WalkerState,
}

impl Walker {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            ms_per_pixel: config.ms_per_pixel(),
            frame_time_ms: config.frame_time_ms(),
            state: WalkerState::Idle,
        }
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.state, WalkerState::Moving(_))
    }

    pub fn destination(&self) -> Option<MapPos> {
        match self.state {
            WalkerState::Moving(motion) => Some(motion.destination),
            WalkerState::Idle => None,
        }
    }

    pub fn movement_deadline_ms(&self) -> Option<u64> {
        match self.state {
            WalkerState::Moving(motion) => Some(motion.movement_deadline_ms),
            WalkerState::Idle => None,
        }
    }

    /// Starts (or restarts) a walk from pixel `start` to pixel `target`.
    ///
    /// Any progress of a walk already in flight is discarded.
    pub fn set_destination(&mut self, destination: MapPos, start: ScreenPos, target: ScreenPos) {
        let distance_px = pixel_distance(start, target);
        self.state = WalkerState::Moving(Motion {
            destination,
            start,
            target,
            elapsed_ms: 0,
            movement_deadline_ms: distance_px.saturating_mul(self.ms_per_pixel),
            animation_deadline_ms: self.frame_time_ms,
        });
    }

    pub fn run_tick(&mut self, delta_ms: u64) -> Result<WalkStep, SimError> {
        let WalkerState::Moving(motion) = &mut self.state else {
            return Err(SimError::InvalidState {
                operation: "walker_run_tick",
                reason: "walker has no destination",
            });
        };

        motion.elapsed_ms = motion
            .elapsed_ms
            .saturating_add(delta_ms)
            .min(motion.movement_deadline_ms);

        let mut frames_advanced = 0u32;
        while motion.elapsed_ms >= motion.animation_deadline_ms {
            frames_advanced = frames_advanced.saturating_add(1);
            motion.animation_deadline_ms =
                motion.animation_deadline_ms.saturating_add(self.frame_time_ms);
        }

        if motion.elapsed_ms >= motion.movement_deadline_ms {
            let step = WalkStep {
                position: motion.target,
                frames_advanced,
                arrived: Some(motion.destination),
            };
            self.state = WalkerState::Idle;
            return Ok(step);
        }

        Ok(WalkStep {
            position: interpolate(
                motion.start,
                motion.target,
                motion.elapsed_ms,
                motion.movement_deadline_ms,
            ),
            frames_advanced,
            arrived: None,
        })
    }
}

fn pixel_distance(from: ScreenPos, to: ScreenPos) -> u64 {
    let dx = i64::from(to.x) - i64::from(from.x);
    let dy = i64::from(to.y) - i64::from(from.y);
    ((dx * dx + dy * dy) as f64).sqrt().ceil() as u64
}

fn interpolate(
    start: ScreenPos,
    target: ScreenPos,
    elapsed_ms: u64,
    deadline_ms: u64,
) -> ScreenPos {
    if deadline_ms == 0 {
        return target;
    }
    let lerp = |from: i32, to: i32| -> i32 {
        let span = i64::from(to) - i64::from(from);
        let progressed = span * elapsed_ms as i64 / deadline_ms as i64;
        (i64::from(from) + progressed) as i32
    };
    ScreenPos {
        x: lerp(start.x, target.x),
        y: lerp(start.y, target.y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walker() -> Walker {
        Walker::new(&SimConfig::default())
    }

    #[test]
    fn idle_walker_rejects_ticks() {
        let mut walker = walker();
        let err = walker.run_tick(16).expect_err("idle");
        assert!(matches!(err, SimError::InvalidState { .. }));
    }

    #[test]
    fn deadline_is_distance_times_speed() {
        let mut walker = walker();
        walker.set_destination(MapPos::new(0, 1), ScreenPos::new(0, 0), ScreenPos::new(32, 0));
        assert_eq!(walker.movement_deadline_ms(), Some(160));

        walker.set_destination(MapPos::new(1, 1), ScreenPos::new(0, 0), ScreenPos::new(32, 32));
        // ceil(sqrt(2048)) = 46 px
        assert_eq!(walker.movement_deadline_ms(), Some(230));
    }

    #[test]
    fn halfway_tick_interpolates_position() {
        let mut walker = walker();
        walker.set_destination(MapPos::new(0, 1), ScreenPos::new(0, 0), ScreenPos::new(32, 0));
        let step = walker.run_tick(80).expect("tick");
        assert_eq!(step.position, ScreenPos::new(16, 0));
        assert_eq!(step.arrived, None);
        assert_eq!(step.frames_advanced, 1);
        assert!(walker.is_moving());
    }

    #[test]
    fn completion_snaps_to_target_without_overshoot() {
        let mut walker = walker();
        walker.set_destination(MapPos::new(0, 1), ScreenPos::new(0, 0), ScreenPos::new(32, 0));
        let step = walker.run_tick(10_000).expect("tick");
        assert_eq!(step.position, ScreenPos::new(32, 0));
        assert_eq!(step.arrived, Some(MapPos::new(0, 1)));
        // 160 ms at 50 ms/frame
        assert_eq!(step.frames_advanced, 3);
        assert!(!walker.is_moving());
    }

    #[test]
    fn chunking_does_not_change_outcome() {
        let mut single = walker();
        single.set_destination(MapPos::new(2, 0), ScreenPos::new(0, 0), ScreenPos::new(0, 64));
        let deadline = single.movement_deadline_ms().expect("moving");
        let one_shot = single.run_tick(deadline).expect("tick");

        let mut chunked = walker();
        chunked.set_destination(MapPos::new(2, 0), ScreenPos::new(0, 0), ScreenPos::new(0, 64));
        let mut frames = 0;
        let mut last = None;
        let mut remaining = deadline;
        for chunk in [1, 7, 16, 33, 49, 3].into_iter().cycle() {
            let delta = chunk.min(remaining);
            let step = chunked.run_tick(delta).expect("tick");
            frames += step.frames_advanced;
            remaining -= delta;
            if remaining == 0 {
                last = Some(step);
                break;
            }
            assert_eq!(step.arrived, None);
        }

        let last = last.expect("arrived");
        assert_eq!(last.position, one_shot.position);
        assert_eq!(last.arrived, one_shot.arrived);
        assert_eq!(frames, one_shot.frames_advanced);
        assert!(!chunked.is_moving());
    }

    #[test]
    fn restart_discards_previous_progress() {
        let mut walker = walker();
        walker.set_destination(MapPos::new(0, 1), ScreenPos::new(0, 0), ScreenPos::new(32, 0));
        walker.run_tick(100).expect("tick");

        walker.set_destination(MapPos::new(1, 0), ScreenPos::new(20, 0), ScreenPos::new(0, 32));
        assert_eq!(walker.destination(), Some(MapPos::new(1, 0)));
        let step = walker.run_tick(0).expect("tick");
        assert_eq!(step.position, ScreenPos::new(20, 0));
        assert_eq!(step.frames_advanced, 0);
    }

    #[test]
    fn zero_distance_walk_arrives_on_next_tick() {
        let mut walker = walker();
        walker.set_destination(MapPos::new(0, 0), ScreenPos::new(0, 0), ScreenPos::new(0, 0));
        let step = walker.run_tick(0).expect("tick");
        assert_eq!(step.arrived, Some(MapPos::new(0, 0)));
        assert_eq!(step.frames_advanced, 0);
    }
}
