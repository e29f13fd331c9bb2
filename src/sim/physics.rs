//! Target kinematics
//!
//! Targets drift in straight lines and bounce off the viewport edges. There is
//! no target-target collision and no spin; a bounce just flips one axis.

use glam::Vec2;

use super::state::Target;
use crate::Viewport;
use crate::consts::{MAX_FRAME_MS, NOMINAL_FRAME_MS};

/// Which walls a target bounced off during a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounce {
    pub x: bool,
    pub y: bool,
}

/// Advance one coordinate, reflecting off `[min, max]`
///
/// Returns (position, velocity, bounced).
#[inline]
fn step_axis(pos: f32, vel: f32, scale: f32, min: f32, max: f32) -> (f32, f32, bool) {
    // Axis smaller than the target: pin to the middle
    if max < min {
        return ((min + max) / 2.0, vel, false);
    }

    let next = pos + vel * scale;
    if next < min || next > max {
        (next.clamp(min, max), -vel, true)
    } else {
        (next, vel, false)
    }
}

/// Move a single target by `elapsed_ms` worth of nominal frames
pub fn step_target(target: &mut Target, viewport: Viewport, elapsed_ms: f64) -> Bounce {
    let scale = (elapsed_ms.clamp(0.0, MAX_FRAME_MS) / NOMINAL_FRAME_MS) as f32;
    let r = target.radius;

    let (x, vx, bx) = step_axis(target.pos.x, target.vel.x, scale, r, viewport.width - r);
    let (y, vy, by) = step_axis(target.pos.y, target.vel.y, scale, r, viewport.height - r);

    target.pos = Vec2::new(x, y);
    target.vel = Vec2::new(vx, vy);
    Bounce { x: bx, y: by }
}

/// Advance every target. Call once per frame while playing.
pub fn step_targets(targets: &mut [Target], viewport: Viewport, elapsed_ms: f64) {
    for target in targets.iter_mut() {
        step_target(target, viewport, elapsed_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn target(pos: Vec2, vel: Vec2) -> Target {
        Target {
            id: 1,
            value: 7,
            pos,
            vel,
            radius: 40.0,
            is_correct: false,
            is_shot: false,
        }
    }

    #[test]
    fn test_straight_line_motion_scales_with_elapsed() {
        let viewport = Viewport::new(800.0, 600.0);
        let mut t = target(Vec2::new(400.0, 300.0), Vec2::new(1.0, -0.5));

        step_target(&mut t, viewport, 32.0);
        assert_eq!(t.pos, Vec2::new(402.0, 299.0));
        assert_eq!(t.vel, Vec2::new(1.0, -0.5));
    }

    #[test]
    fn test_bounce_right_wall() {
        let viewport = Viewport::new(800.0, 600.0);
        let mut t = target(Vec2::new(759.5, 300.0), Vec2::new(1.0, 0.0));

        let bounce = step_target(&mut t, viewport, NOMINAL_FRAME_MS);
        assert!(bounce.x && !bounce.y);
        assert_eq!(t.pos.x, 760.0);
        assert_eq!(t.vel.x, -1.0);

        // Next step moves back inward without flipping again
        let bounce = step_target(&mut t, viewport, NOMINAL_FRAME_MS);
        assert_eq!(bounce, Bounce::default());
        assert_eq!(t.pos.x, 759.0);
    }

    #[test]
    fn test_bounce_top_left_corner() {
        let viewport = Viewport::new(800.0, 600.0);
        let mut t = target(Vec2::new(40.5, 40.5), Vec2::new(-1.0, -1.0));

        let bounce = step_target(&mut t, viewport, NOMINAL_FRAME_MS);
        assert!(bounce.x && bounce.y);
        assert_eq!(t.pos, Vec2::new(40.0, 40.0));
        assert_eq!(t.vel, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_long_frame_is_capped() {
        let viewport = Viewport::new(10_000.0, 600.0);
        let mut t = target(Vec2::new(100.0, 300.0), Vec2::new(1.0, 0.0));

        // A 5 s stall moves no further than MAX_FRAME_MS would
        step_target(&mut t, viewport, 5000.0);
        let expected = 100.0 + (MAX_FRAME_MS / NOMINAL_FRAME_MS) as f32;
        assert!((t.pos.x - expected).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn prop_targets_stay_in_bounds(
            x in 40.0f32..760.0,
            y in 40.0f32..560.0,
            vx in -3.0f32..3.0,
            vy in -3.0f32..3.0,
            frames in proptest::collection::vec(1.0f64..50.0, 1..200),
        ) {
            let viewport = Viewport::new(800.0, 600.0);
            let mut t = target(Vec2::new(x, y), Vec2::new(vx, vy));

            for elapsed in frames {
                let before = t.vel;
                let bounce = step_target(&mut t, viewport, elapsed);

                prop_assert!(t.pos.x >= t.radius && t.pos.x <= viewport.width - t.radius);
                prop_assert!(t.pos.y >= t.radius && t.pos.y <= viewport.height - t.radius);
                // Velocity flips exactly when a wall was crossed
                prop_assert_eq!(bounce.x, t.vel.x != before.x);
                prop_assert_eq!(bounce.y, t.vel.y != before.y);
            }
        }
    }
}
