//! Goal arrival predicates, pluggable alongside the critics.

use crate::types::{shortest_angular_distance, Pose2, Twist2};

pub trait GoalChecker {
    /// True once `pose` (and, for stricter checkers, `velocity`) counts
    /// as having reached `goal`.
    fn is_goal_reached(&mut self, pose: Pose2, goal: Pose2, velocity: Twist2) -> bool;

    /// Forget any latched state when a new goal is set.
    fn reset(&mut self) {}
}

/// Position within `xy_goal_tolerance` and heading within
/// `yaw_goal_tolerance`. Once the position check has passed it stays
/// passed, so a robot rotating in place at the goal cannot drift out of
/// tolerance and start translating again.
pub struct SimpleGoalChecker {
    pub xy_goal_tolerance: f32,
    pub yaw_goal_tolerance: f32,
    /// Latch the position check after its first success.
    pub stateful: bool,
    check_xy: bool,
}

impl SimpleGoalChecker {
    pub fn new(xy_goal_tolerance: f32, yaw_goal_tolerance: f32) -> Self {
        Self {
            xy_goal_tolerance,
            yaw_goal_tolerance,
            stateful: true,
            check_xy: true,
        }
    }
}

impl Default for SimpleGoalChecker {
    fn default() -> Self {
        Self::new(0.25, 0.25)
    }
}

impl GoalChecker for SimpleGoalChecker {
    fn is_goal_reached(&mut self, pose: Pose2, goal: Pose2, _velocity: Twist2) -> bool {
        if self.check_xy {
            let tol_sq = self.xy_goal_tolerance * self.xy_goal_tolerance;
            if pose.distance_sq(&goal) > tol_sq {
                return false;
            }
            if self.stateful {
                self.check_xy = false;
            }
        }
        shortest_angular_distance(pose.yaw, goal.yaw).abs() <= self.yaw_goal_tolerance
    }

    fn reset(&mut self) {
        self.check_xy = true;
    }
}

/// [`SimpleGoalChecker`] plus a requirement that the robot has actually
/// stopped moving.
pub struct StoppedGoalChecker {
    inner: SimpleGoalChecker,
    pub rot_stopped_velocity: f32,
    pub trans_stopped_velocity: f32,
}

impl StoppedGoalChecker {
    pub fn new(xy_goal_tolerance: f32, yaw_goal_tolerance: f32) -> Self {
        Self {
            inner: SimpleGoalChecker::new(xy_goal_tolerance, yaw_goal_tolerance),
            rot_stopped_velocity: 0.25,
            trans_stopped_velocity: 0.25,
        }
    }
}

impl Default for StoppedGoalChecker {
    fn default() -> Self {
        Self::new(0.25, 0.25)
    }
}

impl GoalChecker for StoppedGoalChecker {
    fn is_goal_reached(&mut self, pose: Pose2, goal: Pose2, velocity: Twist2) -> bool {
        if !self.inner.is_goal_reached(pose, goal, velocity) {
            return false;
        }
        velocity.theta.abs() <= self.rot_stopped_velocity
            && velocity.speed_xy() <= self.trans_stopped_velocity
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn simple_checker_latches_position() {
        let mut checker = SimpleGoalChecker::default();
        let goal = Pose2::new(Vec2::ZERO, 1.0);

        // In position but not yet rotated.
        assert!(!checker.is_goal_reached(Pose2::new(Vec2::new(0.1, 0.0), 0.0), goal, Twist2::ZERO));
        // Rotation nudged the base out of xy tolerance; position stays latched.
        assert!(checker.is_goal_reached(Pose2::new(Vec2::new(0.3, 0.0), 0.9), goal, Twist2::ZERO));

        checker.reset();
        assert!(!checker.is_goal_reached(Pose2::new(Vec2::new(0.3, 0.0), 0.9), goal, Twist2::ZERO));
    }

    #[test]
    fn stopped_checker_requires_standstill() {
        let mut checker = StoppedGoalChecker::default();
        let goal = Pose2::new(Vec2::ZERO, 0.0);
        let at_goal = Pose2::new(Vec2::new(0.05, 0.0), 0.1);

        assert!(!checker.is_goal_reached(at_goal, goal, Twist2::new(0.4, 0.0, 0.0)));
        assert!(checker.is_goal_reached(at_goal, goal, Twist2::new(0.1, 0.0, 0.1)));
    }
}
