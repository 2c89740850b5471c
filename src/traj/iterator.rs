//! Velocity-space iteration.
//!
//! A candidate twist is one sample from the cartesian product of three
//! per-axis ranges. Each range runs between the velocities reachable
//! within the search window given acceleration and deceleration limits,
//! and explicitly revisits zero when the sampled grid straddles it, so
//! straight-line (and pure-rotation) candidates are always represented.

use crate::kinematics::KinematicLimits;
use crate::types::Twist2;

const EPSILON: f32 = 1e-5;

/// Velocity reachable from `v0` after `dt` seconds when chasing `target`
/// under an acceleration limit (speeding up) or a deceleration limit
/// (slowing down; `decel` is negative).
#[inline]
pub fn project_velocity(v0: f32, accel: f32, decel: f32, dt: f32, target: f32) -> f32 {
    if v0 <= target {
        (v0 + accel * dt).min(target)
    } else {
        (v0 + decel * dt).max(target)
    }
}

/// Discretized sweep over one velocity axis.
///
/// Yields `num_samples` evenly spaced velocities between the reachable
/// minimum and maximum, plus an extra exact zero when the grid crosses
/// zero without landing on it.
#[derive(Debug, Clone)]
pub struct OneDVelocityIterator {
    min_vel: f32,
    max_vel: f32,
    increment: f32,
    current: f32,
    return_zero: bool,
    return_zero_now: bool,
}

impl OneDVelocityIterator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        current: f32,
        min: f32,
        max: f32,
        acc_limit: f32,
        decel_limit: f32,
        acc_time: f32,
        num_samples: usize,
    ) -> Self {
        let current = current.clamp(min, max);
        let max_vel = project_velocity(current, acc_limit, decel_limit, acc_time, max);
        let min_vel = project_velocity(current, acc_limit, decel_limit, acc_time, min);
        let num_samples = num_samples.max(2);
        let increment = (max_vel - min_vel) / (num_samples - 1) as f32;
        Self {
            min_vel,
            max_vel,
            increment,
            current: min_vel,
            return_zero: true,
            return_zero_now: false,
        }
    }

    pub fn velocity(&self) -> f32 {
        if self.return_zero_now { 0.0 } else { self.current }
    }

    pub fn advance(&mut self) {
        if self.increment <= 0.0 {
            // Collapsed window: a single sample.
            self.current = self.max_vel + 2.0 * EPSILON;
            self.return_zero_now = false;
            return;
        }
        if self.return_zero
            && self.current < 0.0
            && self.current + self.increment > 0.0
            && self.current + self.increment <= self.max_vel + EPSILON
        {
            self.return_zero_now = true;
            self.return_zero = false;
        } else {
            self.current += self.increment;
            self.return_zero_now = false;
        }
    }

    pub fn reset(&mut self) {
        self.current = self.min_vel;
        self.return_zero = true;
        self.return_zero_now = false;
    }

    pub fn is_finished(&self) -> bool {
        self.current > self.max_vel + EPSILON
    }
}

/// Lazy, finite, restartable sweep over the (x, y, theta) velocity
/// product, filtered through [`KinematicLimits::is_valid_speed`].
#[derive(Debug, Clone)]
pub struct XyThetaIterator {
    kinematics: KinematicLimits,
    vx_samples: usize,
    vy_samples: usize,
    vtheta_samples: usize,
    axes: Option<Axes>,
}

#[derive(Debug, Clone)]
struct Axes {
    x: OneDVelocityIterator,
    y: OneDVelocityIterator,
    theta: OneDVelocityIterator,
}

impl XyThetaIterator {
    pub fn new(
        kinematics: KinematicLimits,
        vx_samples: usize,
        vy_samples: usize,
        vtheta_samples: usize,
    ) -> Self {
        Self {
            kinematics,
            vx_samples,
            vy_samples,
            vtheta_samples,
            axes: None,
        }
    }

    /// Reset the cursor for a new planning cycle. `dt` is the window over
    /// which acceleration limits constrain the reachable velocities.
    pub fn start_new_iteration(&mut self, current_velocity: Twist2, dt: f32) {
        let k = &self.kinematics;
        self.axes = Some(Axes {
            x: OneDVelocityIterator::new(
                current_velocity.x,
                k.min_vel_x,
                k.max_vel_x,
                k.acc_lim_x,
                k.decel_lim_x,
                dt,
                self.vx_samples,
            ),
            y: OneDVelocityIterator::new(
                current_velocity.y,
                k.min_vel_y,
                k.max_vel_y,
                k.acc_lim_y,
                k.decel_lim_y,
                dt,
                self.vy_samples,
            ),
            theta: OneDVelocityIterator::new(
                current_velocity.theta,
                k.min_vel_theta(),
                k.max_vel_theta,
                k.acc_lim_theta,
                k.decel_lim_theta,
                dt,
                self.vtheta_samples,
            ),
        });
        if !self.is_valid_velocity() {
            self.iterate_to_valid_velocity();
        }
    }

    fn is_valid_velocity(&self) -> bool {
        let Some(axes) = &self.axes else { return false };
        self.kinematics.is_valid_speed(
            axes.x.velocity(),
            axes.y.velocity(),
            axes.theta.velocity(),
        )
    }

    pub fn has_more_twists(&self) -> bool {
        self.axes.as_ref().is_some_and(|a| !a.x.is_finished())
    }

    /// Yield the twist at the cursor and advance to the next valid one.
    pub fn next_twist(&mut self) -> Twist2 {
        let twist = {
            let axes = self.axes.as_ref().expect("start_new_iteration not called");
            Twist2::new(axes.x.velocity(), axes.y.velocity(), axes.theta.velocity())
        };
        self.iterate_to_valid_velocity();
        twist
    }

    fn iterate_to_valid_velocity(&mut self) {
        loop {
            {
                let Some(axes) = self.axes.as_mut() else { return };
                if axes.x.is_finished() {
                    return;
                }
                axes.theta.advance();
                if axes.theta.is_finished() {
                    axes.theta.reset();
                    axes.y.advance();
                    if axes.y.is_finished() {
                        axes.y.reset();
                        axes.x.advance();
                    }
                }
            }
            if !self.has_more_twists() || self.is_valid_velocity() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_velocity_clamps_to_target() {
        assert_eq!(project_velocity(0.0, 1.0, -1.0, 0.5, 2.0), 0.5);
        assert_eq!(project_velocity(0.0, 1.0, -1.0, 5.0, 2.0), 2.0);
        assert_eq!(project_velocity(2.0, 1.0, -1.0, 0.5, 0.0), 1.5);
        assert_eq!(project_velocity(2.0, 1.0, -1.0, 5.0, 0.0), 0.0);
    }

    fn collect(it: &mut OneDVelocityIterator) -> Vec<f32> {
        let mut out = Vec::new();
        while !it.is_finished() {
            out.push(it.velocity());
            it.advance();
        }
        out
    }

    #[test]
    fn one_d_covers_range() {
        let mut it = OneDVelocityIterator::new(0.0, 0.0, 1.0, 100.0, -100.0, 1.0, 5);
        let v = collect(&mut it);
        assert_eq!(v, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn one_d_inserts_zero_when_grid_skips_it() {
        // -1..1 in 4 samples: grid {-1, -1/3, 1/3, 1} skips zero.
        let mut it = OneDVelocityIterator::new(0.0, -1.0, 1.0, 100.0, -100.0, 1.0, 4);
        let v = collect(&mut it);
        assert_eq!(v.len(), 5);
        assert!(v.contains(&0.0));
    }

    #[test]
    fn one_d_no_duplicate_zero_when_grid_hits_it() {
        let mut it = OneDVelocityIterator::new(0.0, -0.1, 0.1, 100.0, -100.0, 1.0, 5);
        let v = collect(&mut it);
        assert_eq!(v.len(), 5);
        assert_eq!(v.iter().filter(|&&x| x == 0.0).count(), 1);
    }

    #[test]
    fn one_d_restricted_by_acceleration() {
        let mut it = OneDVelocityIterator::new(0.0, -1.0, 1.0, 0.5, -0.5, 1.0, 3);
        let v = collect(&mut it);
        assert_eq!(*v.first().unwrap(), -0.5);
        assert_eq!(*v.last().unwrap(), 0.5);
    }

    #[test]
    fn xy_theta_filters_invalid() {
        let kinematics = KinematicLimits {
            min_vel_x: 0.0,
            max_vel_x: 1.0,
            max_vel_theta: 1.0,
            max_speed_xy: -1.0,
            min_speed_xy: -1.0,
            min_speed_theta: -1.0,
            acc_lim_x: 100.0,
            decel_lim_x: -100.0,
            acc_lim_theta: 100.0,
            decel_lim_theta: -100.0,
            ..Default::default()
        };
        let mut it = XyThetaIterator::new(kinematics, 2, 2, 3);
        it.start_new_iteration(Twist2::ZERO, 1.0);
        let mut twists = Vec::new();
        while it.has_more_twists() {
            twists.push(it.next_twist());
        }
        assert!(!twists.is_empty());
        assert!(!twists.contains(&Twist2::ZERO));
        for t in &twists {
            assert!(kinematics.is_valid_speed(t.x, t.y, t.theta));
        }
    }

    #[test]
    fn restart_replays_the_sequence() {
        let kinematics = KinematicLimits {
            max_vel_x: 0.5,
            max_vel_theta: 1.0,
            max_speed_xy: -1.0,
            min_speed_xy: -1.0,
            min_speed_theta: -1.0,
            acc_lim_x: 100.0,
            decel_lim_x: -100.0,
            acc_lim_theta: 100.0,
            decel_lim_theta: -100.0,
            ..Default::default()
        };
        let mut it = XyThetaIterator::new(kinematics, 3, 2, 3);
        it.start_new_iteration(Twist2::ZERO, 1.0);
        let mut first = Vec::new();
        while it.has_more_twists() {
            first.push(it.next_twist());
        }
        it.start_new_iteration(Twist2::ZERO, 1.0);
        let mut second = Vec::new();
        while it.has_more_twists() {
            second.push(it.next_twist());
        }
        assert_eq!(first, second);
    }
}
