//! Path-goal parameters for a smart goto.

/// Vertical distance (blocks) at or below which Y precision is dropped.
pub const IGNORE_Y_MAX_DELTA: i32 = 5;
/// Stand-off distance used for safe-mode or hazardous destinations.
pub const CAUTIOUS_APPROACH_RADIUS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GotoDecision {
    pub ignore_y: bool,
    pub approach_radius: u32,
}

/// Decide how to hand a goto target to the planner.
///
/// `start_y` is `None` when the player position is unknown; only the hint
/// can then request ignoring Y.
pub fn decide(
    ignore_y_hint: bool,
    start_y: Option<i32>,
    target_y: i32,
    safe_mode: bool,
    hazardous_target: bool,
) -> GotoDecision {
    let near_level = start_y.is_some_and(|y| {
        (i64::from(target_y) - i64::from(y)).abs() <= i64::from(IGNORE_Y_MAX_DELTA)
    });
    let approach_radius = if safe_mode || hazardous_target {
        CAUTIOUS_APPROACH_RADIUS
    } else {
        0
    };
    GotoDecision {
        ignore_y: ignore_y_hint || near_level,
        approach_radius,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_y_hint_forces_ignore_y() {
        assert!(decide(true, Some(100), 200, false, false).ignore_y);
        assert!(decide(true, None, 200, false, false).ignore_y);
    }

    #[test]
    fn small_y_delta_implies_ignore_y() {
        assert!(decide(false, Some(64), 67, false, false).ignore_y);
        assert!(decide(false, Some(64), 64 - IGNORE_Y_MAX_DELTA, false, false).ignore_y);
    }

    #[test]
    fn large_y_delta_does_not_ignore_y() {
        assert!(!decide(false, Some(64), 80, false, false).ignore_y);
        assert!(!decide(false, Some(64), 64 + IGNORE_Y_MAX_DELTA + 1, false, false).ignore_y);
    }

    #[test]
    fn unknown_start_y_keeps_y() {
        assert!(!decide(false, None, 64, false, false).ignore_y);
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        assert!(!decide(false, Some(i32::MIN), i32::MAX, false, false).ignore_y);
    }

    #[test]
    fn safe_mode_enables_approach_radius() {
        assert_eq!(decide(false, Some(64), 80, true, false).approach_radius, 2);
    }

    #[test]
    fn hazardous_target_enables_approach_radius() {
        assert_eq!(decide(false, Some(64), 80, false, true).approach_radius, 2);
    }

    #[test]
    fn normal_conditions_have_no_approach_radius() {
        assert_eq!(decide(false, Some(64), 80, false, false).approach_radius, 0);
    }
}
