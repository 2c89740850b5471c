pub mod generator;
pub mod iterator;

pub use generator::{
    LimitedAccelGenerator, SamplingConfig, StandardTrajectoryGenerator, TrajectoryGenerator,
};
pub use iterator::{project_velocity, OneDVelocityIterator, XyThetaIterator};

use crate::types::{Pose2, Twist2};

/// One simulated pose and its time offset from the start of the
/// trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPose {
    pub pose: Pose2,
    pub time: f32,
}

/// A short forward-simulated trajectory: the commanded twist, the total
/// simulated duration, and the discretized pose sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub velocity: Twist2,
    pub duration: f32,
    pub poses: Vec<TimedPose>,
}

impl Trajectory {
    pub fn last_pose(&self) -> Option<&Pose2> {
        self.poses.last().map(|tp| &tp.pose)
    }
}
