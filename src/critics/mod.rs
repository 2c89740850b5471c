//! Pluggable trajectory scoring functions.
//!
//! Each critic scores one aspect of a candidate trajectory (obstacle
//! proximity, path alignment, goal progress, ...). The planner sums
//! `raw_score * scale` across critics in configured order and picks the
//! minimum total, so raw scores are costs: lower is better, and every
//! critic must return a non-negative value. That non-negativity is a
//! precondition on critic authors, not something the planner detects;
//! the early-exit pruning in the scoring loop is unsound without it.

mod base_obstacle;
mod map_grid;
mod oscillation;
mod prefer_forward;
mod rotate_to_goal;
mod twirling;

pub use base_obstacle::BaseObstacleCritic;
pub use map_grid::{Aggregation, MapGridCritic};
pub use oscillation::OscillationCritic;
pub use prefer_forward::PreferForwardCritic;
pub use rotate_to_goal::RotateToGoalCritic;
pub use twirling::TwirlingCritic;

use crate::grid::Grid2d;
use crate::traj::Trajectory;
use crate::types::{Path2, Pose2, Twist2};

/// Cycle state handed to every critic's `prepare` before scoring starts.
/// The plan has already been windowed and pruned to the costmap extent.
pub struct CriticContext<'a> {
    pub pose: Pose2,
    pub velocity: Twist2,
    pub goal: Pose2,
    pub plan: &'a Path2,
    pub costmap: &'a Grid2d<u8>,
}

/// A critic's rejection of one candidate trajectory. Not an error:
/// vetoed candidates are tallied and excluded from selection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CriticVeto {
    pub critic: String,
    pub reason: String,
}

impl CriticVeto {
    pub fn new(critic: &str, reason: &str) -> Self {
        Self {
            critic: critic.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// One critic's contribution to a trajectory's total.
#[derive(Debug, Clone, PartialEq)]
pub struct CriticScore {
    pub name: String,
    pub raw_score: f32,
    pub scale: f32,
}

/// A trajectory scoring function. Mutable state may only change in
/// `prepare`, `debrief`, and `reset`; `score_trajectory` takes `&self`
/// so independent candidates could in principle be scored concurrently.
pub trait TrajectoryCritic {
    fn name(&self) -> &str;

    fn scale(&self) -> f32;

    fn set_scale(&mut self, scale: f32);

    /// Per-cycle setup. Returning false means this cycle's scores from
    /// this critic are meaningless; the planner logs it and treats the
    /// critic as neutral for the cycle.
    fn prepare(&mut self, _ctx: &CriticContext<'_>) -> bool {
        true
    }

    /// Score one candidate. Must be non-negative; `Err` vetoes the
    /// candidate outright.
    fn score_trajectory(
        &self,
        traj: &Trajectory,
        costmap: &Grid2d<u8>,
    ) -> Result<f32, CriticVeto>;

    /// Called once per cycle with the chosen velocity (zero if no legal
    /// candidate was found) so stateful critics can update.
    fn debrief(&mut self, _cmd_vel: Twist2) {}

    /// Drop all state accumulated across cycles (new plan, new goal).
    fn reset(&mut self) {}
}
