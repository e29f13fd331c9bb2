//! Shot-versus-target hit testing
//!
//! A shot is a point. It hits a target when it lands inside the target's
//! circle grown by a fixed tolerance, so near misses on small screens still
//! count.

use glam::Vec2;

use super::state::Target;

/// Result of resolving one shot against the target list
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShotResult {
    /// The shot landed on the target at this index
    Hit { index: usize, target_id: u32, correct: bool },
    Miss,
}

/// Signed distance from a point to a circle's edge (negative inside)
#[inline]
pub fn sd_circle(p: Vec2, center: Vec2, radius: f32) -> f32 {
    (p - center).length() - radius
}

/// Whether a shot at `point` hits `target`
#[inline]
pub fn shot_hits(point: Vec2, target: &Target, tolerance: f32) -> bool {
    sd_circle(point, target.pos, target.radius) < tolerance
}

/// Find the first target (in list order) under `point`
///
/// At most one target is hit per shot, even where targets overlap.
pub fn resolve_shot(targets: &[Target], point: Vec2, tolerance: f32) -> ShotResult {
    targets
        .iter()
        .position(|t| shot_hits(point, t, tolerance))
        .map_or(ShotResult::Miss, |index| ShotResult::Hit {
            index,
            target_id: targets[index].id,
            correct: targets[index].is_correct,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::HIT_TOLERANCE;

    fn target(id: u32, pos: Vec2, correct: bool) -> Target {
        Target {
            id,
            value: id as i64,
            pos,
            vel: Vec2::ZERO,
            radius: 40.0,
            is_correct: correct,
            is_shot: false,
        }
    }

    #[test]
    fn test_center_hit() {
        let targets = [target(1, Vec2::new(100.0, 100.0), true)];
        assert_eq!(
            resolve_shot(&targets, Vec2::new(100.0, 100.0), HIT_TOLERANCE),
            ShotResult::Hit {
                index: 0,
                target_id: 1,
                correct: true
            }
        );
    }

    #[test]
    fn test_tolerance_edge() {
        let targets = [target(1, Vec2::new(100.0, 100.0), false)];

        // Just inside radius + tolerance
        let near = Vec2::new(100.0 + 40.0 + HIT_TOLERANCE - 0.5, 100.0);
        assert!(matches!(
            resolve_shot(&targets, near, HIT_TOLERANCE),
            ShotResult::Hit { .. }
        ));

        // Exactly at radius + tolerance is a miss (strict)
        let edge = Vec2::new(100.0 + 40.0 + HIT_TOLERANCE, 100.0);
        assert_eq!(resolve_shot(&targets, edge, HIT_TOLERANCE), ShotResult::Miss);

        let far = Vec2::new(300.0, 300.0);
        assert_eq!(resolve_shot(&targets, far, HIT_TOLERANCE), ShotResult::Miss);
    }

    #[test]
    fn test_overlap_first_in_list_wins() {
        let targets = [
            target(1, Vec2::new(100.0, 100.0), false),
            target(2, Vec2::new(110.0, 100.0), true),
        ];
        let result = resolve_shot(&targets, Vec2::new(108.0, 100.0), HIT_TOLERANCE);
        assert!(matches!(result, ShotResult::Hit { target_id: 1, .. }));
    }

    #[test]
    fn test_empty_targets_miss() {
        assert_eq!(resolve_shot(&[], Vec2::ZERO, HIT_TOLERANCE), ShotResult::Miss);
    }
}
