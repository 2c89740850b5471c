//! The per-cycle planning loop: window the plan, prepare the critics,
//! sample and simulate candidate twists, score them, pick the cheapest.

mod tracker;

pub use tracker::IllegalTrajectoryTracker;

use tracing::{debug, error, warn};

use crate::critics::{CriticContext, CriticScore, CriticVeto, TrajectoryCritic};
use crate::goal_checker::GoalChecker;
use crate::grid::Grid2d;
use crate::traj::{Trajectory, TrajectoryGenerator};
use crate::types::{Path2, PlannerError, Pose2, Twist2};

/// One candidate's full scoring breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryScore {
    pub trajectory: Trajectory,
    pub scores: Vec<CriticScore>,
    /// Sum of `raw_score * scale` over the critics, or -1.0 for a vetoed
    /// candidate.
    pub total: f32,
}

/// Optional per-cycle record of every evaluated candidate, for
/// diagnostics and visualization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalPlanEvaluation {
    pub twists: Vec<TrajectoryScore>,
    pub best_index: Option<usize>,
    pub worst_index: Option<usize>,
}

pub struct LocalPlanner {
    generator: Box<dyn TrajectoryGenerator>,
    critics: Vec<Box<dyn TrajectoryCritic>>,
    goal_checker: Box<dyn GoalChecker>,
    global_plan: Path2,
    pub prune_plan: bool,
    pub prune_distance: f32,
}

impl LocalPlanner {
    pub fn new(
        generator: Box<dyn TrajectoryGenerator>,
        critics: Vec<Box<dyn TrajectoryCritic>>,
        goal_checker: Box<dyn GoalChecker>,
    ) -> Self {
        Self {
            generator,
            critics,
            goal_checker,
            global_plan: Path2::default(),
            prune_plan: true,
            prune_distance: 1.0,
        }
    }

    /// Replace the plan wholesale and drop all cross-cycle critic state.
    pub fn set_plan(&mut self, plan: Path2) -> Result<(), PlannerError> {
        if plan.is_empty() {
            return Err(PlannerError::EmptyPlan);
        }
        for critic in &mut self.critics {
            critic.reset();
        }
        self.goal_checker.reset();
        self.global_plan = plan;
        Ok(())
    }

    /// The plan as it stands after any pruning this component has done.
    pub fn global_plan(&self) -> &Path2 {
        &self.global_plan
    }

    pub fn is_goal_reached(&mut self, pose: Pose2, velocity: Twist2) -> bool {
        let Some(goal) = self.global_plan.last().copied() else {
            return false;
        };
        self.goal_checker.is_goal_reached(pose, goal, velocity)
    }

    /// Run one planning cycle. Returns the chosen velocity command and,
    /// when `record` is set, the full evaluation of every candidate.
    ///
    /// A failed cycle leaves the critics debriefed with a zero velocity
    /// so stateful ones still see the stop.
    pub fn compute_velocity_commands(
        &mut self,
        pose: Pose2,
        velocity: Twist2,
        costmap: &Grid2d<u8>,
        record: bool,
    ) -> Result<(Twist2, Option<LocalPlanEvaluation>), PlannerError> {
        let transformed_plan = self.transform_global_plan(pose, costmap)?;
        // The goal stays the true end of the plan even when the window
        // stops short of it.
        let goal = self
            .global_plan
            .last()
            .copied()
            .ok_or(PlannerError::EmptyPlan)?;

        let ctx = CriticContext {
            pose,
            velocity,
            goal,
            plan: &transformed_plan,
            costmap,
        };
        let mut prepared = Vec::with_capacity(self.critics.len());
        for critic in &mut self.critics {
            let ok = critic.prepare(&ctx);
            if !ok {
                warn!(critic = critic.name(), "scoring function failed to prepare");
            }
            prepared.push(ok);
        }

        match self.core_scoring_algorithm(pose, velocity, costmap, &prepared, record) {
            Ok((best, results)) => {
                let cmd_vel = best.trajectory.velocity;
                for critic in &mut self.critics {
                    critic.debrief(cmd_vel);
                }
                debug!(
                    vx = cmd_vel.x,
                    vy = cmd_vel.y,
                    vtheta = cmd_vel.theta,
                    total = best.total,
                    "selected trajectory"
                );
                Ok((cmd_vel, results))
            }
            Err(err) => {
                for critic in &mut self.critics {
                    critic.debrief(Twist2::ZERO);
                }
                Err(err)
            }
        }
    }

    fn core_scoring_algorithm(
        &mut self,
        pose: Pose2,
        velocity: Twist2,
        costmap: &Grid2d<u8>,
        prepared: &[bool],
        record: bool,
    ) -> Result<(TrajectoryScore, Option<LocalPlanEvaluation>), PlannerError> {
        let mut best: Option<TrajectoryScore> = None;
        let mut worst_total = -1.0_f32;
        let mut tracker = IllegalTrajectoryTracker::new();
        let mut results = record.then(LocalPlanEvaluation::default);

        self.generator.start_new_iteration(velocity);
        while self.generator.has_more_twists() {
            let twist = self.generator.next_twist();
            let traj = self.generator.generate_trajectory(pose, velocity, twist);

            let best_total = best.as_ref().map_or(-1.0, |b| b.total);
            match score_trajectory(&self.critics, prepared, &traj, costmap, best_total) {
                Ok(score) => {
                    tracker.add_legal_trajectory();
                    let total = score.total;
                    if let Some(results) = results.as_mut() {
                        results.twists.push(score.clone());
                        if best_total < 0.0 || total < best_total {
                            results.best_index = Some(results.twists.len() - 1);
                        }
                        if worst_total < 0.0 || total > worst_total {
                            results.worst_index = Some(results.twists.len() - 1);
                        }
                    }
                    if best_total < 0.0 || total < best_total {
                        best = Some(score);
                    }
                    if worst_total < 0.0 || total > worst_total {
                        worst_total = total;
                    }
                }
                Err(veto) => {
                    if let Some(results) = results.as_mut() {
                        results.twists.push(TrajectoryScore {
                            trajectory: traj,
                            scores: vec![CriticScore {
                                name: veto.critic.clone(),
                                raw_score: -1.0,
                                scale: 0.0,
                            }],
                            total: -1.0,
                        });
                    }
                    tracker.add_illegal_trajectory(&veto);
                }
            }
        }

        match best {
            Some(best) => Ok((best, results)),
            None => {
                let summary = tracker.get_message();
                error!(%summary, "no legal trajectories found");
                Err(PlannerError::NoLegalTrajectories { summary })
            }
        }
    }

    /// Window the plan to the costmap neighborhood of the robot and, when
    /// pruning is enabled, drop the poses the robot has already passed.
    /// Matches the windowing rules of a grid-centered local planner: the
    /// window never extends past half the costmap extent, and pruning
    /// further tightens it to `prune_distance`.
    fn transform_global_plan(
        &mut self,
        pose: Pose2,
        costmap: &Grid2d<u8>,
    ) -> Result<Path2, PlannerError> {
        if self.global_plan.is_empty() {
            return Err(PlannerError::EmptyPlan);
        }

        let info = costmap.info();
        let dist_threshold =
            (info.width.max(info.height) as f32) * info.resolution / 2.0;
        let sq_dist_threshold = dist_threshold * dist_threshold;
        let sq_prune_dist = self.prune_distance * self.prune_distance;

        let sq_start_threshold = if self.prune_plan {
            sq_dist_threshold.min(sq_prune_dist)
        } else {
            sq_dist_threshold
        };
        // Hand the critics only the nearby stretch of the plan, so the
        // planner is pushed toward rejoining it rather than shortcutting
        // to the goal.
        let sq_end_threshold = sq_dist_threshold.min(sq_prune_dist);

        let poses = &self.global_plan.poses;
        let begin = poses
            .iter()
            .position(|p| pose.distance_sq(p) < sq_start_threshold)
            .unwrap_or(poses.len());
        let end = poses[begin..]
            .iter()
            .position(|p| pose.distance_sq(p) > sq_end_threshold)
            .map_or(poses.len(), |i| begin + i);

        let transformed = Path2::new(poses[begin..end].to_vec());

        if self.prune_plan {
            self.global_plan.poses.drain(..begin);
        }

        if transformed.is_empty() {
            return Err(PlannerError::NoPosesInWindow);
        }
        Ok(transformed)
    }
}

/// Score one candidate against the critics in configured order.
///
/// `best_total` enables the early exit: contributions are non-negative,
/// so once the running total exceeds the best the candidate cannot win
/// and the remaining critics are skipped.
fn score_trajectory(
    critics: &[Box<dyn TrajectoryCritic>],
    prepared: &[bool],
    traj: &Trajectory,
    costmap: &Grid2d<u8>,
    best_total: f32,
) -> Result<TrajectoryScore, CriticVeto> {
    let mut score = TrajectoryScore {
        trajectory: traj.clone(),
        scores: Vec::with_capacity(critics.len()),
        total: 0.0,
    };

    for (critic, &ok) in critics.iter().zip(prepared) {
        let scale = critic.scale();
        if scale == 0.0 || !ok {
            // Unprepared critics count as neutral for the cycle.
            score.scores.push(CriticScore {
                name: critic.name().to_string(),
                raw_score: 0.0,
                scale,
            });
            continue;
        }

        let raw_score = critic.score_trajectory(traj, costmap)?;
        score.scores.push(CriticScore {
            name: critic.name().to_string(),
            raw_score,
            scale,
        });
        score.total += raw_score * scale;
        if best_total > 0.0 && score.total > best_total {
            break;
        }
    }

    Ok(score)
}
