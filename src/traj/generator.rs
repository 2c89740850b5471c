//! Trajectory generators: sample candidate twists and forward-simulate
//! them into short pose sequences.

use glam::Vec2;
use serde::Deserialize;

use crate::kinematics::KinematicLimits;
use crate::traj::iterator::{project_velocity, XyThetaIterator};
use crate::traj::{TimedPose, Trajectory};
use crate::types::{ConfigError, Pose2, Twist2};

/// Sampling and simulation parameters shared by the generators.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingConfig {
    /// Simulation horizon in seconds.
    pub sim_time: f32,
    /// When true, poses are spaced `time_granularity` apart; otherwise
    /// spacing is derived from the linear/angular granularities.
    pub discretize_by_time: bool,
    pub time_granularity: f32,
    pub linear_granularity: f32,
    pub angular_granularity: f32,
    pub vx_samples: usize,
    pub vy_samples: usize,
    pub vtheta_samples: usize,
    /// Control period bounding the dynamic window of the
    /// acceleration-limited generator.
    pub sim_period: f32,
    /// Legacy mode flag. `Some(true)` selects the acceleration-limited
    /// generator, `Some(false)` the standard one; constructing the other
    /// generator with the flag set is a configuration error.
    pub use_dwa: Option<bool>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sim_time: 1.7,
            discretize_by_time: false,
            time_granularity: 0.5,
            linear_granularity: 0.5,
            angular_granularity: 0.025,
            vx_samples: 20,
            vy_samples: 5,
            vtheta_samples: 20,
            sim_period: 0.05,
            use_dwa: None,
        }
    }
}

/// Candidate-twist source plus forward simulator. One `start_new_iteration`
/// begins a finite lazy sequence consumed via `has_more_twists` /
/// `next_twist`; the sequence restarts only via `start_new_iteration`.
pub trait TrajectoryGenerator {
    fn start_new_iteration(&mut self, current_velocity: Twist2);

    fn has_more_twists(&self) -> bool;

    fn next_twist(&mut self) -> Twist2;

    /// Forward-simulate `cmd_vel` from `start_pose`/`start_vel` into a
    /// discretized trajectory. Deterministic: identical inputs yield
    /// identical pose sequences.
    fn generate_trajectory(
        &self,
        start_pose: Pose2,
        start_vel: Twist2,
        cmd_vel: Twist2,
    ) -> Trajectory;

    /// Collect every candidate of one iteration. Mostly for tests.
    fn get_twists(&mut self, current_velocity: Twist2) -> Vec<Twist2> {
        self.start_new_iteration(current_velocity);
        let mut twists = Vec::new();
        while self.has_more_twists() {
            twists.push(self.next_twist());
        }
        twists
    }
}

/// Samples across the whole velocity envelope reachable within the
/// simulation horizon; simulated velocity ramps from the start velocity
/// toward the command under acceleration/deceleration limits.
pub struct StandardTrajectoryGenerator {
    kinematics: KinematicLimits,
    iterator: XyThetaIterator,
    config: SamplingConfig,
}

impl StandardTrajectoryGenerator {
    pub fn new(kinematics: KinematicLimits, config: SamplingConfig) -> Result<Self, ConfigError> {
        if config.use_dwa == Some(true) {
            return Err(ConfigError::ConflictingMode(
                "use_dwa is set but the standard trajectory generator was selected; \
                 use the acceleration-limited generator instead"
                    .into(),
            ));
        }
        Self::new_unchecked(kinematics, config)
    }

    fn new_unchecked(
        kinematics: KinematicLimits,
        config: SamplingConfig,
    ) -> Result<Self, ConfigError> {
        kinematics.validate()?;
        if config.sim_time <= 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "sim_time must be positive, got {}",
                config.sim_time
            )));
        }
        // Zero granularities would ask for an unbounded number of steps.
        if config.discretize_by_time && config.time_granularity <= 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "time_granularity must be positive, got {}",
                config.time_granularity
            )));
        }
        if config.linear_granularity <= 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "linear_granularity must be positive, got {}",
                config.linear_granularity
            )));
        }
        if config.angular_granularity <= 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "angular_granularity must be positive, got {}",
                config.angular_granularity
            )));
        }
        let iterator = XyThetaIterator::new(
            kinematics,
            config.vx_samples,
            config.vy_samples,
            config.vtheta_samples,
        );
        Ok(Self {
            kinematics,
            iterator,
            config,
        })
    }

    fn start_with_window(&mut self, current_velocity: Twist2, dt: f32) {
        self.iterator.start_new_iteration(current_velocity, dt);
    }

    /// Time deltas between trajectory points for the given command.
    /// Uniform spacing; the step count comes from the time granularity,
    /// or from whichever of the linear/angular granularities demands more
    /// steps. At least one step.
    fn time_steps(&self, cmd_vel: Twist2) -> Vec<f32> {
        let cfg = &self.config;
        let num_steps = if cfg.discretize_by_time {
            (cfg.sim_time / cfg.time_granularity).ceil() as usize
        } else {
            let linear = cmd_vel.speed_xy() * cfg.sim_time / cfg.linear_granularity;
            let angular = cmd_vel.theta.abs() * cfg.sim_time / cfg.angular_granularity;
            linear.max(angular).ceil() as usize
        };
        let num_steps = num_steps.max(1);
        vec![cfg.sim_time / num_steps as f32; num_steps]
    }

    /// Velocity after `dt` seconds of chasing `cmd_vel` from `vel` under
    /// the acceleration/deceleration limits.
    fn compute_new_velocity(&self, cmd_vel: Twist2, vel: Twist2, dt: f32) -> Twist2 {
        let k = &self.kinematics;
        Twist2::new(
            project_velocity(vel.x, k.acc_lim_x, k.decel_lim_x, dt, cmd_vel.x),
            project_velocity(vel.y, k.acc_lim_y, k.decel_lim_y, dt, cmd_vel.y),
            project_velocity(vel.theta, k.acc_lim_theta, k.decel_lim_theta, dt, cmd_vel.theta),
        )
    }

    fn simulate(&self, start_pose: Pose2, mut vel: Twist2, cmd_vel: Twist2, ramp: bool) -> Trajectory {
        let steps = self.time_steps(cmd_vel);
        let mut poses = Vec::with_capacity(steps.len() + 1);
        poses.push(TimedPose {
            pose: start_pose,
            time: 0.0,
        });

        let mut pose = start_pose;
        let mut time = 0.0;
        for dt in steps {
            if ramp {
                vel = self.compute_new_velocity(cmd_vel, vel, dt);
            } else {
                vel = cmd_vel;
            }
            pose = compute_new_position(pose, vel, dt);
            time += dt;
            poses.push(TimedPose { pose, time });
        }

        Trajectory {
            velocity: cmd_vel,
            duration: self.config.sim_time,
            poses,
        }
    }
}

impl TrajectoryGenerator for StandardTrajectoryGenerator {
    fn start_new_iteration(&mut self, current_velocity: Twist2) {
        // The whole horizon is available to accelerate into the sample.
        let dt = self.config.sim_time;
        self.start_with_window(current_velocity, dt);
    }

    fn has_more_twists(&self) -> bool {
        self.iterator.has_more_twists()
    }

    fn next_twist(&mut self) -> Twist2 {
        self.iterator.next_twist()
    }

    fn generate_trajectory(
        &self,
        start_pose: Pose2,
        start_vel: Twist2,
        cmd_vel: Twist2,
    ) -> Trajectory {
        self.simulate(start_pose, start_vel, cmd_vel, true)
    }
}

/// Dynamic-window generator: the search space is limited to velocities
/// reachable within one control period, and the command is applied for
/// the whole simulation (no ramping).
pub struct LimitedAccelGenerator {
    inner: StandardTrajectoryGenerator,
    acceleration_time: f32,
}

impl LimitedAccelGenerator {
    pub fn new(kinematics: KinematicLimits, config: SamplingConfig) -> Result<Self, ConfigError> {
        if config.use_dwa == Some(false) {
            return Err(ConfigError::ConflictingMode(
                "use_dwa is disabled but the acceleration-limited generator was selected; \
                 use the standard trajectory generator instead"
                    .into(),
            ));
        }
        if config.sim_period <= 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "sim_period must be positive, got {}",
                config.sim_period
            )));
        }
        let acceleration_time = config.sim_period;
        Ok(Self {
            inner: StandardTrajectoryGenerator::new_unchecked(kinematics, config)?,
            acceleration_time,
        })
    }
}

impl TrajectoryGenerator for LimitedAccelGenerator {
    fn start_new_iteration(&mut self, current_velocity: Twist2) {
        self.inner
            .start_with_window(current_velocity, self.acceleration_time);
    }

    fn has_more_twists(&self) -> bool {
        self.inner.has_more_twists()
    }

    fn next_twist(&mut self) -> Twist2 {
        self.inner.next_twist()
    }

    fn generate_trajectory(
        &self,
        start_pose: Pose2,
        _start_vel: Twist2,
        cmd_vel: Twist2,
    ) -> Trajectory {
        // Candidates were already limited to the dynamic window, so the
        // command holds for the whole horizon.
        self.inner.simulate(start_pose, cmd_vel, cmd_vel, false)
    }
}

/// Advance a holonomic pose by one step: body-frame velocity rotated into
/// the world frame, then independent integration per axis.
fn compute_new_position(pose: Pose2, vel: Twist2, dt: f32) -> Pose2 {
    let (sin, cos) = pose.yaw.sin_cos();
    Pose2 {
        position: pose.position
            + Vec2::new(
                (vel.x * cos - vel.y * sin) * dt,
                (vel.x * sin + vel.y * cos) * dt,
            ),
        yaw: pose.yaw + vel.theta * dt,
    }
}
