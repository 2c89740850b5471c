//! Once the robot is within the goal position tolerance, only pure
//! rotations are legal and they are scored by remaining heading error.

use crate::critics::{CriticContext, CriticVeto, TrajectoryCritic};
use crate::grid::Grid2d;
use crate::traj::Trajectory;
use crate::types::shortest_angular_distance;

pub struct RotateToGoalCritic {
    name: String,
    scale: f32,
    xy_goal_tolerance_sq: f32,
    in_window: bool,
    goal_yaw: f32,
}

impl RotateToGoalCritic {
    pub fn new(name: &str, scale: f32, xy_goal_tolerance: f32) -> Self {
        Self {
            name: name.to_string(),
            scale,
            xy_goal_tolerance_sq: xy_goal_tolerance * xy_goal_tolerance,
            in_window: false,
            goal_yaw: 0.0,
        }
    }
}

impl TrajectoryCritic for RotateToGoalCritic {
    fn name(&self) -> &str {
        &self.name
    }

    fn scale(&self) -> f32 {
        self.scale
    }

    fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    fn prepare(&mut self, ctx: &CriticContext<'_>) -> bool {
        self.in_window = ctx.pose.distance_sq(&ctx.goal) <= self.xy_goal_tolerance_sq;
        self.goal_yaw = ctx.goal.yaw;
        true
    }

    fn score_trajectory(
        &self,
        traj: &Trajectory,
        _costmap: &Grid2d<u8>,
    ) -> Result<f32, CriticVeto> {
        // Outside the window any twist is fine.
        if !self.in_window {
            return Ok(0.0);
        }

        if traj.velocity.x.abs() > 0.0 || traj.velocity.y.abs() > 0.0 {
            return Err(CriticVeto::new(&self.name, "Nonrotation command near goal"));
        }
        let last = traj
            .poses
            .last()
            .ok_or_else(|| CriticVeto::new(&self.name, "Empty trajectory"))?;

        Ok(shortest_angular_distance(last.pose.yaw, self.goal_yaw).abs())
    }

    fn reset(&mut self) {
        self.in_window = false;
    }
}
