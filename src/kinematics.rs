//! Velocity and acceleration bounds for the sampled velocity space.

use serde::Deserialize;

use crate::types::ConfigError;

/// Per-axis velocity/acceleration bounds plus combined-speed thresholds.
///
/// Setting `max_speed_xy`, `min_speed_xy`, or `min_speed_theta` negative
/// disables that bound. Deceleration limits are negative (they are added
/// when slowing down). Set once at configuration, read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KinematicLimits {
    pub min_vel_x: f32,
    pub max_vel_x: f32,
    pub min_vel_y: f32,
    pub max_vel_y: f32,
    pub max_vel_theta: f32,
    pub min_speed_xy: f32,
    pub max_speed_xy: f32,
    pub min_speed_theta: f32,
    pub acc_lim_x: f32,
    pub acc_lim_y: f32,
    pub acc_lim_theta: f32,
    pub decel_lim_x: f32,
    pub decel_lim_y: f32,
    pub decel_lim_theta: f32,
}

impl Default for KinematicLimits {
    fn default() -> Self {
        Self {
            min_vel_x: 0.0,
            max_vel_x: 0.0,
            min_vel_y: 0.0,
            max_vel_y: 0.0,
            max_vel_theta: 0.0,
            min_speed_xy: 0.0,
            max_speed_xy: 0.0,
            min_speed_theta: 0.0,
            acc_lim_x: 0.0,
            acc_lim_y: 0.0,
            acc_lim_theta: 0.0,
            decel_lim_x: 0.0,
            decel_lim_y: 0.0,
            decel_lim_theta: 0.0,
        }
    }
}

impl KinematicLimits {
    /// Angular velocity range is symmetric around zero.
    #[inline]
    pub fn min_vel_theta(&self) -> f32 {
        -self.max_vel_theta
    }

    /// Check that a candidate velocity respects the combined-speed
    /// thresholds. A twist is valid iff its linear magnitude does not
    /// exceed `max_speed_xy`, it is not simultaneously below both minimum
    /// thresholds, and it is not the all-zero command. Boundary values
    /// are valid; only strictly smaller/larger values are rejected.
    pub fn is_valid_speed(&self, x: f32, y: f32, theta: f32) -> bool {
        let vmag_sq = x * x + y * y;
        if self.max_speed_xy >= 0.0 && vmag_sq > self.max_speed_xy * self.max_speed_xy {
            return false;
        }
        if self.min_speed_xy >= 0.0
            && vmag_sq < self.min_speed_xy * self.min_speed_xy
            && self.min_speed_theta >= 0.0
            && theta.abs() < self.min_speed_theta
        {
            return false;
        }
        if vmag_sq == 0.0 && theta == 0.0 {
            return false;
        }
        true
    }

    /// Setup-time sanity check: min must not exceed max on any axis.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_vel_x > self.max_vel_x {
            return Err(ConfigError::InvalidLimit(format!(
                "min_vel_x {} > max_vel_x {}",
                self.min_vel_x, self.max_vel_x
            )));
        }
        if self.min_vel_y > self.max_vel_y {
            return Err(ConfigError::InvalidLimit(format!(
                "min_vel_y {} > max_vel_y {}",
                self.min_vel_y, self.max_vel_y
            )));
        }
        if self.max_vel_theta < 0.0 {
            return Err(ConfigError::InvalidLimit(format!(
                "max_vel_theta {} must be non-negative",
                self.max_vel_theta
            )));
        }
        Ok(())
    }
}
