//! Grid-distance critics: a breadth-first wavefront seeded from the plan
//! (or its endpoint) spreads hop distances across the costmap, and
//! trajectories are scored by the distance value under their poses.
//! Covers the path-distance, goal-distance, and the two forward-point
//! alignment variants.

use std::collections::VecDeque;

use glam::{UVec2, Vec2};

use crate::critics::{CriticContext, CriticVeto, TrajectoryCritic};
use crate::grid::Grid2d;
use crate::traj::Trajectory;
use crate::types::{Pose2, COST_INSCRIBED, COST_LETHAL, COST_UNKNOWN};

/// How per-pose distances combine into a trajectory score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Score of the final pose only.
    Last,
    Sum,
    Product,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeedMode {
    /// Every plan pose that maps onto the grid.
    Path,
    /// The last plan pose that maps onto the grid.
    Goal,
}

pub struct MapGridCritic {
    name: String,
    scale: f32,
    seed: SeedMode,
    aggregation: Aggregation,
    /// Veto on the first unscorable pose instead of skipping it.
    stop_on_failure: bool,
    /// When positive, score the point this far ahead of each pose along
    /// its heading instead of the pose itself.
    forward_point_distance: f32,
    /// Alignment stops mattering once the robot is within the forward
    /// point distance of the goal; the scale collapses to zero for the
    /// cycle instead.
    zero_scale_near_goal: bool,
    zero_scale: bool,
    values: Option<Grid2d<f32>>,
    obstacle_score: f32,
}

impl MapGridCritic {
    fn new(name: &str, scale: f32, seed: SeedMode) -> Self {
        Self {
            name: name.to_string(),
            scale,
            seed,
            aggregation: Aggregation::Last,
            stop_on_failure: true,
            forward_point_distance: 0.0,
            zero_scale_near_goal: false,
            zero_scale: false,
            values: None,
            obstacle_score: 0.0,
        }
    }

    /// Distance to the nearest plan pose.
    pub fn path_dist(name: &str, scale: f32) -> Self {
        Self::new(name, scale, SeedMode::Path)
    }

    /// Distance to the plan endpoint.
    pub fn goal_dist(name: &str, scale: f32) -> Self {
        Self::new(name, scale, SeedMode::Goal)
    }

    /// Path distance of a point `forward_point_distance` ahead of the
    /// robot, rewarding headings that line up with the plan.
    pub fn path_align(name: &str, scale: f32, forward_point_distance: f32) -> Self {
        let mut critic = Self::new(name, scale, SeedMode::Path);
        critic.forward_point_distance = forward_point_distance;
        critic.stop_on_failure = false;
        critic.zero_scale_near_goal = true;
        critic
    }

    /// Goal distance of the forward point.
    pub fn goal_align(name: &str, scale: f32, forward_point_distance: f32) -> Self {
        let mut critic = Self::new(name, scale, SeedMode::Goal);
        critic.forward_point_distance = forward_point_distance;
        critic.stop_on_failure = false;
        critic
    }

    pub fn set_aggregation(&mut self, aggregation: Aggregation) {
        self.aggregation = aggregation;
    }

    fn seed_cell(
        values: &mut Grid2d<f32>,
        queue: &mut VecDeque<UVec2>,
        costmap: &Grid2d<u8>,
        cell: UVec2,
        obstacle_score: f32,
    ) {
        let index = values.index(cell);
        if values.data()[index] <= obstacle_score {
            return;
        }
        if traversable(costmap.data()[index]) {
            values.data_mut()[index] = 0.0;
            queue.push_back(cell);
        } else {
            values.data_mut()[index] = obstacle_score;
        }
    }

    /// Multi-source BFS: hop distance from the seed set, obstacles pinned
    /// at `obstacle_score` and never expanded. First visit wins.
    fn propagate(
        values: &mut Grid2d<f32>,
        queue: &mut VecDeque<UVec2>,
        costmap: &Grid2d<u8>,
        obstacle_score: f32,
    ) {
        let unreachable = obstacle_score + 1.0;
        let (width, height) = (values.width(), values.height());
        while let Some(cell) = queue.pop_front() {
            let dist = values.data()[values.index(cell)];
            let mut neighbors = [None; 4];
            if cell.x > 0 {
                neighbors[0] = Some(UVec2::new(cell.x - 1, cell.y));
            }
            if cell.x + 1 < width {
                neighbors[1] = Some(UVec2::new(cell.x + 1, cell.y));
            }
            if cell.y > 0 {
                neighbors[2] = Some(UVec2::new(cell.x, cell.y - 1));
            }
            if cell.y + 1 < height {
                neighbors[3] = Some(UVec2::new(cell.x, cell.y + 1));
            }
            for next in neighbors.into_iter().flatten() {
                let index = values.index(next);
                if values.data()[index] != unreachable {
                    continue;
                }
                if traversable(costmap.data()[index]) {
                    values.data_mut()[index] = dist + 1.0;
                    queue.push_back(next);
                } else {
                    values.data_mut()[index] = obstacle_score;
                }
            }
        }
    }

    fn score_pose(&self, pose: &Pose2) -> Result<f32, CriticVeto> {
        let Some(values) = self.values.as_ref() else {
            return Ok(0.0);
        };
        let mut point = pose.position;
        if self.forward_point_distance > 0.0 {
            let (sin, cos) = pose.yaw.sin_cos();
            point += Vec2::new(cos, sin) * self.forward_point_distance;
        }
        let cell = values
            .world_to_map(point)
            .ok_or_else(|| CriticVeto::new(&self.name, "Trajectory goes off grid"))?;
        let score = values.data()[values.index(cell)];
        if score >= self.obstacle_score {
            return Err(CriticVeto::new(&self.name, "Trajectory hits obstacle"));
        }
        Ok(score)
    }
}

fn traversable(cost: u8) -> bool {
    cost != COST_LETHAL && cost != COST_INSCRIBED && cost != COST_UNKNOWN
}

impl TrajectoryCritic for MapGridCritic {
    fn name(&self) -> &str {
        &self.name
    }

    fn scale(&self) -> f32 {
        if self.zero_scale {
            0.0
        } else {
            self.scale
        }
    }

    fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    fn prepare(&mut self, ctx: &CriticContext<'_>) -> bool {
        self.zero_scale = false;
        if self.zero_scale_near_goal {
            let fpd_sq = self.forward_point_distance * self.forward_point_distance;
            if ctx.pose.distance_sq(&ctx.goal) <= fpd_sq {
                self.zero_scale = true;
                return true;
            }
        }

        let info = ctx.costmap.info().clone();
        self.obstacle_score = (info.width as f32) * (info.height as f32);
        let unreachable = self.obstacle_score + 1.0;
        let mut values = Grid2d::new_with_value(info, unreachable);
        let mut queue = VecDeque::new();

        match self.seed {
            SeedMode::Path => {
                for pose in &ctx.plan.poses {
                    if let Some(cell) = ctx.costmap.world_to_map(pose.position) {
                        Self::seed_cell(
                            &mut values,
                            &mut queue,
                            ctx.costmap,
                            cell,
                            self.obstacle_score,
                        );
                    }
                }
            }
            SeedMode::Goal => {
                let last_on_grid = ctx
                    .plan
                    .poses
                    .iter()
                    .rev()
                    .find_map(|p| ctx.costmap.world_to_map(p.position));
                if let Some(cell) = last_on_grid {
                    Self::seed_cell(
                        &mut values,
                        &mut queue,
                        ctx.costmap,
                        cell,
                        self.obstacle_score,
                    );
                }
            }
        }

        if queue.is_empty() {
            // No reachable plan pose inside the costmap window.
            self.values = None;
            return false;
        }

        Self::propagate(&mut values, &mut queue, ctx.costmap, self.obstacle_score);
        self.values = Some(values);
        true
    }

    fn score_trajectory(
        &self,
        traj: &Trajectory,
        _costmap: &Grid2d<u8>,
    ) -> Result<f32, CriticVeto> {
        if self.zero_scale {
            return Ok(0.0);
        }

        let mut score = match self.aggregation {
            Aggregation::Product => 1.0,
            _ => 0.0,
        };
        let start = if self.aggregation == Aggregation::Last && !self.stop_on_failure {
            traj.poses.len().saturating_sub(1)
        } else {
            0
        };
        for timed in &traj.poses[start..] {
            let dist = match self.score_pose(&timed.pose) {
                Ok(d) => d,
                Err(veto) => {
                    if self.stop_on_failure {
                        return Err(veto);
                    }
                    continue;
                }
            };
            match self.aggregation {
                Aggregation::Last => score = dist,
                Aggregation::Sum => score += dist,
                Aggregation::Product => {
                    if score > 0.0 {
                        score *= dist;
                    }
                }
            }
        }
        Ok(score)
    }

    fn reset(&mut self) {
        self.values = None;
        self.zero_scale = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traj::TimedPose;
    use crate::types::{MapInfo, Path2, Twist2, COST_FREE};

    fn context<'a>(plan: &'a Path2, costmap: &'a Grid2d<u8>) -> CriticContext<'a> {
        CriticContext {
            pose: Pose2::default(),
            velocity: Twist2::ZERO,
            goal: plan.last().copied().unwrap_or_default(),
            plan,
            costmap,
        }
    }

    fn single_pose_traj(position: Vec2) -> Trajectory {
        Trajectory {
            velocity: Twist2::ZERO,
            duration: 1.0,
            poses: vec![TimedPose {
                pose: Pose2::new(position, 0.0),
                time: 0.0,
            }],
        }
    }

    // 10x10 grid at 1 m resolution, plan along row y=5.
    fn straight_plan() -> Path2 {
        Path2::new(
            (0..10)
                .map(|x| Pose2::new(Vec2::new(x as f32 + 0.5, 5.5), 0.0))
                .collect(),
        )
    }

    #[test]
    fn path_distance_grows_away_from_plan() {
        let costmap = Grid2d::new_with_value(MapInfo::square(10, 1.0), COST_FREE);
        let plan = straight_plan();
        let mut critic = MapGridCritic::path_dist("PathDist", 1.0);
        assert!(critic.prepare(&context(&plan, &costmap)));

        let on_path = critic
            .score_trajectory(&single_pose_traj(Vec2::new(3.5, 5.5)), &costmap)
            .unwrap();
        let two_off = critic
            .score_trajectory(&single_pose_traj(Vec2::new(3.5, 7.5)), &costmap)
            .unwrap();
        assert_eq!(on_path, 0.0);
        assert_eq!(two_off, 2.0);
    }

    #[test]
    fn goal_distance_measures_from_plan_end() {
        let costmap = Grid2d::new_with_value(MapInfo::square(10, 1.0), COST_FREE);
        let plan = straight_plan();
        let mut critic = MapGridCritic::goal_dist("GoalDist", 1.0);
        assert!(critic.prepare(&context(&plan, &costmap)));

        // Plan end is cell (9, 5); Manhattan distance from (3, 5) is 6.
        let score = critic
            .score_trajectory(&single_pose_traj(Vec2::new(3.5, 5.5)), &costmap)
            .unwrap();
        assert_eq!(score, 6.0);
    }

    #[test]
    fn obstacles_block_propagation() {
        let mut costmap = Grid2d::new_with_value(MapInfo::square(10, 1.0), COST_FREE);
        // Wall across x=4 except the top row.
        for y in 0..9 {
            costmap.set(UVec2::new(4, y), COST_LETHAL).unwrap();
        }
        let plan = Path2::new(vec![Pose2::new(Vec2::new(9.5, 5.5), 0.0)]);
        let mut critic = MapGridCritic::goal_dist("GoalDist", 1.0);
        assert!(critic.prepare(&context(&plan, &costmap)));

        // On the wall: veto.
        assert!(critic
            .score_trajectory(&single_pose_traj(Vec2::new(4.5, 5.5)), &costmap)
            .is_err());
        // Behind the wall: reachable only around the top, so the distance
        // is longer than the straight-line hop count.
        let behind = critic
            .score_trajectory(&single_pose_traj(Vec2::new(3.5, 5.5)), &costmap)
            .unwrap();
        assert!(behind > 6.0);
    }

    #[test]
    fn prepare_fails_with_plan_off_grid() {
        let costmap = Grid2d::new_with_value(MapInfo::square(10, 1.0), COST_FREE);
        let plan = Path2::new(vec![Pose2::new(Vec2::new(50.0, 50.0), 0.0)]);
        let mut critic = MapGridCritic::path_dist("PathDist", 1.0);
        assert!(!critic.prepare(&context(&plan, &costmap)));
    }

    #[test]
    fn alignment_scale_collapses_near_goal() {
        let costmap = Grid2d::new_with_value(MapInfo::square(10, 1.0), COST_FREE);
        let plan = Path2::new(vec![Pose2::new(Vec2::new(0.6, 0.6), 0.0)]);
        let mut critic = MapGridCritic::path_align("PathAlign", 3.0, 0.325);
        let mut ctx = context(&plan, &costmap);
        ctx.pose = Pose2::new(Vec2::new(0.5, 0.5), 0.0);
        assert!(critic.prepare(&ctx));
        assert_eq!(critic.scale(), 0.0);

        ctx.pose = Pose2::new(Vec2::new(5.0, 5.0), 0.0);
        assert!(critic.prepare(&ctx));
        assert_eq!(critic.scale(), 3.0);
    }

    #[test]
    fn forward_point_shifts_the_scored_cell() {
        let costmap = Grid2d::new_with_value(MapInfo::square(10, 1.0), COST_FREE);
        let plan = straight_plan();
        let mut critic = MapGridCritic::path_align("PathAlign", 1.0, 1.0);
        let mut ctx = context(&plan, &costmap);
        ctx.pose = Pose2::new(Vec2::new(2.5, 2.5), 0.0);
        assert!(critic.prepare(&ctx));

        // Heading +y from one cell below the plan: the forward point lands
        // on the plan row, heading +x stays two cells off.
        let toward = Trajectory {
            velocity: Twist2::ZERO,
            duration: 1.0,
            poses: vec![TimedPose {
                pose: Pose2::new(Vec2::new(3.5, 4.5), std::f32::consts::FRAC_PI_2),
                time: 0.0,
            }],
        };
        let along = single_pose_traj(Vec2::new(3.5, 3.5));
        let toward_score = critic.score_trajectory(&toward, &costmap).unwrap();
        let along_score = critic.score_trajectory(&along, &costmap).unwrap();
        assert!(toward_score < along_score);
    }
}
