//! Detects back-and-forth command flapping. Once a velocity axis flips
//! sign, further commands in the old direction are vetoed until the robot
//! has moved far enough (or turned far enough) to call the flip resolved.

use glam::Vec2;

use crate::critics::{CriticContext, CriticVeto, TrajectoryCritic};
use crate::grid::Grid2d;
use crate::traj::Trajectory;
use crate::types::{shortest_angular_distance, Pose2, Twist2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Sign {
    #[default]
    Zero,
    Positive,
    Negative,
}

/// Sign history of one velocity axis.
#[derive(Debug, Default)]
struct CommandTrend {
    sign: Sign,
    positive_only: bool,
    negative_only: bool,
}

impl CommandTrend {
    /// Record a commanded value; returns true when a sign flip was just
    /// detected.
    fn update(&mut self, velocity: f32) -> bool {
        let mut flipped = false;
        if velocity < 0.0 {
            if self.sign == Sign::Positive {
                self.negative_only = true;
                flipped = true;
            }
            self.sign = Sign::Negative;
        } else if velocity > 0.0 {
            if self.sign == Sign::Negative {
                self.positive_only = true;
                flipped = true;
            }
            self.sign = Sign::Positive;
        }
        flipped
    }

    fn is_oscillating(&self, velocity: f32) -> bool {
        (self.positive_only && velocity < 0.0) || (self.negative_only && velocity > 0.0)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

pub struct OscillationCritic {
    name: String,
    scale: f32,
    /// Distance travelled after a flip before the flags clear; negative
    /// disables the distance reset.
    pub oscillation_reset_dist: f32,
    /// Same for accumulated heading change.
    pub oscillation_reset_angle: f32,
    /// y/theta trends only count while |vx| is at or below this; negative
    /// means always.
    pub x_only_threshold: f32,
    pose: Pose2,
    prev_stationary_pose: Option<Pose2>,
    x_trend: CommandTrend,
    y_trend: CommandTrend,
    theta_trend: CommandTrend,
}

impl OscillationCritic {
    pub fn new(name: &str, scale: f32) -> Self {
        Self {
            name: name.to_string(),
            scale,
            oscillation_reset_dist: 0.05,
            oscillation_reset_angle: 0.2,
            x_only_threshold: 0.05,
            pose: Pose2::new(Vec2::ZERO, 0.0),
            prev_stationary_pose: None,
            x_trend: CommandTrend::default(),
            y_trend: CommandTrend::default(),
            theta_trend: CommandTrend::default(),
        }
    }

    fn set_oscillation_flags(&mut self, cmd_vel: Twist2) -> bool {
        let mut flag_set = self.x_trend.update(cmd_vel.x);
        if self.x_only_threshold < 0.0 || cmd_vel.x.abs() <= self.x_only_threshold {
            flag_set |= self.y_trend.update(cmd_vel.y);
            flag_set |= self.theta_trend.update(cmd_vel.theta);
        }
        flag_set
    }

    fn reset_available(&self) -> bool {
        let Some(prev) = self.prev_stationary_pose else {
            return false;
        };
        if self.oscillation_reset_dist >= 0.0 {
            let reset_dist_sq = self.oscillation_reset_dist * self.oscillation_reset_dist;
            if self.pose.distance_sq(&prev) > reset_dist_sq {
                return true;
            }
        }
        if self.oscillation_reset_angle >= 0.0
            && shortest_angular_distance(prev.yaw, self.pose.yaw).abs()
                > self.oscillation_reset_angle
        {
            return true;
        }
        false
    }
}

impl TrajectoryCritic for OscillationCritic {
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
        self.pose = ctx.pose;
        true
    }

    fn score_trajectory(
        &self,
        traj: &Trajectory,
        _costmap: &Grid2d<u8>,
    ) -> Result<f32, CriticVeto> {
        if self.x_trend.is_oscillating(traj.velocity.x)
            || self.y_trend.is_oscillating(traj.velocity.y)
            || self.theta_trend.is_oscillating(traj.velocity.theta)
        {
            return Err(CriticVeto::new(&self.name, "Trajectory is oscillating"));
        }
        Ok(0.0)
    }

    fn debrief(&mut self, cmd_vel: Twist2) {
        if self.set_oscillation_flags(cmd_vel) {
            self.prev_stationary_pose = Some(self.pose);
        }
        if self.reset_available() {
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.x_trend.reset();
        self.y_trend.reset();
        self.theta_trend.reset();
        self.prev_stationary_pose = None;
    }
}
