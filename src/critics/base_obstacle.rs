//! Vetoes trajectories that touch lethal, inscribed, or unknown cells
//! and otherwise scores them by the cost under the trajectory.

use crate::critics::{CriticVeto, TrajectoryCritic};
use crate::grid::Grid2d;
use crate::traj::Trajectory;
use crate::types::{Pose2, COST_INSCRIBED, COST_LETHAL, COST_UNKNOWN};

pub struct BaseObstacleCritic {
    name: String,
    scale: f32,
    /// Sum the cost under every pose instead of taking the last one.
    pub sum_scores: bool,
}

impl BaseObstacleCritic {
    pub fn new(name: &str, scale: f32) -> Self {
        Self {
            name: name.to_string(),
            scale,
            sum_scores: false,
        }
    }

    fn score_pose(&self, pose: &Pose2, costmap: &Grid2d<u8>) -> Result<f32, CriticVeto> {
        let cell = costmap
            .world_to_map(pose.position)
            .ok_or_else(|| CriticVeto::new(&self.name, "Trajectory goes off grid"))?;
        let cost = costmap.data()[costmap.index(cell)];
        if !is_valid_cost(cost) {
            return Err(CriticVeto::new(&self.name, "Trajectory hits obstacle"));
        }
        Ok(cost as f32)
    }
}

fn is_valid_cost(cost: u8) -> bool {
    cost != COST_LETHAL && cost != COST_INSCRIBED && cost != COST_UNKNOWN
}

impl TrajectoryCritic for BaseObstacleCritic {
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
        costmap: &Grid2d<u8>,
    ) -> Result<f32, CriticVeto> {
        let mut score = 0.0;
        for timed in &traj.poses {
            let pose_score = self.score_pose(&timed.pose, costmap)?;
            score = if self.sum_scores {
                score + pose_score
            } else {
                pose_score
            };
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traj::TimedPose;
    use crate::types::{MapInfo, Twist2, COST_FREE};
    use glam::{UVec2, Vec2};

    fn costmap() -> Grid2d<u8> {
        // 10x10 at 0.1 m, origin at (0, 0)
        let info = MapInfo::square(10, 0.1);
        let mut grid = Grid2d::new_with_value(info, COST_FREE);
        grid.set(UVec2::new(5, 5), COST_LETHAL).unwrap();
        grid.set(UVec2::new(2, 2), 40).unwrap();
        grid
    }

    fn traj_through(points: &[Vec2]) -> Trajectory {
        Trajectory {
            velocity: Twist2::ZERO,
            duration: 1.0,
            poses: points
                .iter()
                .enumerate()
                .map(|(i, p)| TimedPose {
                    pose: Pose2::new(*p, 0.0),
                    time: i as f32 * 0.1,
                })
                .collect(),
        }
    }

    #[test]
    fn lethal_cell_vetoes() {
        let critic = BaseObstacleCritic::new("BaseObstacle", 1.0);
        let traj = traj_through(&[Vec2::new(0.15, 0.15), Vec2::new(0.55, 0.55)]);
        let err = critic.score_trajectory(&traj, &costmap()).unwrap_err();
        assert_eq!(err.reason, "Trajectory hits obstacle");
    }

    #[test]
    fn off_grid_vetoes() {
        let critic = BaseObstacleCritic::new("BaseObstacle", 1.0);
        let traj = traj_through(&[Vec2::new(0.15, 0.15), Vec2::new(5.0, 5.0)]);
        let err = critic.score_trajectory(&traj, &costmap()).unwrap_err();
        assert_eq!(err.reason, "Trajectory goes off grid");
    }

    #[test]
    fn last_pose_cost_wins_by_default() {
        let critic = BaseObstacleCritic::new("BaseObstacle", 1.0);
        let traj = traj_through(&[Vec2::new(0.25, 0.25), Vec2::new(0.85, 0.85)]);
        assert_eq!(critic.score_trajectory(&traj, &costmap()).unwrap(), 0.0);

        let mut summing = BaseObstacleCritic::new("BaseObstacle", 1.0);
        summing.sum_scores = true;
        assert_eq!(summing.score_trajectory(&traj, &costmap()).unwrap(), 40.0);
    }
}
