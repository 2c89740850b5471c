//! Penalizes spinning: score is the magnitude of the angular velocity.
//! Mostly useful for holonomic bases that could otherwise weave.

use crate::critics::{CriticVeto, TrajectoryCritic};
use crate::grid::Grid2d;
use crate::traj::Trajectory;

pub struct TwirlingCritic {
    name: String,
    scale: f32,
}

impl TwirlingCritic {
    pub fn new(name: &str, scale: f32) -> Self {
        Self {
            name: name.to_string(),
            scale,
        }
    }
}

impl TrajectoryCritic for TwirlingCritic {
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
        Ok(traj.velocity.theta.abs())
    }
}
