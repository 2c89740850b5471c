//! Penalizes reverse and strafing motion so the robot leads with the
//! side its sensors face.

use crate::critics::{CriticVeto, TrajectoryCritic};
use crate::grid::Grid2d;
use crate::traj::Trajectory;

pub struct PreferForwardCritic {
    name: String,
    scale: f32,
    pub penalty: f32,
    pub strafe_x: f32,
    pub strafe_theta: f32,
    pub theta_scale: f32,
}

impl PreferForwardCritic {
    pub fn new(name: &str, scale: f32) -> Self {
        Self {
            name: name.to_string(),
            scale,
            penalty: 1.0,
            strafe_x: 0.1,
            strafe_theta: 0.2,
            theta_scale: 10.0,
        }
    }
}

impl TrajectoryCritic for PreferForwardCritic {
    fn name(&self) -> &str {
        &self.name
    }

    fn scale(&self) -> f32 {
        self.scale
    }

    fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    fn score_trajectory(
        &self,
        traj: &Trajectory,
        _costmap: &Grid2d<u8>,
    ) -> Result<f32, CriticVeto> {
        if traj.velocity.x < 0.0 {
            return Ok(self.penalty);
        }
        // Slow forward motion that is mostly sideways drift counts as a
        // strafe, not a turn.
        if traj.velocity.x < self.strafe_x && traj.velocity.theta.abs() < self.strafe_theta {
            return Ok(self.penalty);
        }
        Ok(traj.velocity.theta.abs() * self.theta_scale)
    }
}
