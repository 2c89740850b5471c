//! Geometric and spatial types used across the grid and planner APIs.

use glam::{UVec2, Vec2};

/// Robot pose in world coordinates (meters).
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Pose2 {
    pub position: Vec2,
    pub yaw: f32,
}

impl Pose2 {
    pub fn new(position: Vec2, yaw: f32) -> Self {
        Self { position, yaw }
    }

    /// Squared planar distance to another pose (yaw ignored).
    #[inline]
    pub fn distance_sq(&self, other: &Pose2) -> f32 {
        self.position.distance_squared(other.position)
    }
}

/// A 2-D velocity command: linear x/y rates and angular rate (rad/s).
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Twist2 {
    pub x: f32,
    pub y: f32,
    pub theta: f32,
}

impl Twist2 {
    pub const ZERO: Twist2 = Twist2 {
        x: 0.0,
        y: 0.0,
        theta: 0.0,
    };

    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self { x, y, theta }
    }

    /// Combined linear speed magnitude.
    #[inline]
    pub fn speed_xy(&self) -> f32 {
        self.x.hypot(self.y)
    }
}

/// Ordered sequence of 2-D poses, progressively consumed as the robot
/// advances along it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path2 {
    pub poses: Vec<Pose2>,
}

impl Path2 {
    pub fn new(poses: Vec<Pose2>) -> Self {
        Self { poses }
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn last(&self) -> Option<&Pose2> {
        self.poses.last()
    }
}

/// World-axis-aligned rectangle in meters.
/// Convention: [min.x, max.x) x [min.y, max.y) in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// Create bounds that represent "no region" (empty). Use this as the initial
    /// value before layers expand it; layers should only expand, never shrink.
    pub fn empty() -> Self {
        Self {
            min: Vec2::new(f32::INFINITY, f32::INFINITY),
            max: Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Bounds covering everything; forces a full-grid update.
    pub fn unbounded() -> Self {
        Self {
            min: Vec2::new(f32::MIN, f32::MIN),
            max: Vec2::new(f32::MAX, f32::MAX),
        }
    }

    /// Returns true if no layer has expanded the bounds (min > max in either axis).
    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    /// Expand this bounds to include the point (in place).
    pub fn expand_to_include(&mut self, p: Vec2) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Expand to cover another bounds (in place).
    pub fn expand_to_cover(&mut self, other: &Bounds) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
    }

    /// Expand by a margin in meters in all directions (e.g. for inflation halo).
    pub fn expand_by(&mut self, margin: f32) {
        self.min.x -= margin;
        self.min.y -= margin;
        self.max.x += margin;
        self.max.y += margin;
    }
}

/// Update window in cell indices. Region is [min.x, max.x) x [min.y, max.y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellRegion {
    pub min: UVec2,
    pub max: UVec2,
}

impl CellRegion {
    pub fn width(&self) -> u32 {
        self.max.x.saturating_sub(self.min.x)
    }

    pub fn height(&self) -> u32 {
        self.max.y.saturating_sub(self.min.y)
    }
}

/// Footprint polygon in world coordinates (meters) plus its inscribed
/// radius, supplied on footprint-change events.
#[derive(Debug, Clone, Default)]
pub struct Footprint {
    pub points: Vec<Vec2>,
    pub inscribed_radius: f32,
}

/// Smallest signed angle from `from` to `to`, in (-PI, PI].
#[inline]
pub fn shortest_angular_distance(from: f32, to: f32) -> f32 {
    use std::f32::consts::PI;
    let mut d = (to - from) % (2.0 * PI);
    if d > PI {
        d -= 2.0 * PI;
    } else if d <= -PI {
        d += 2.0 * PI;
    }
    d
}
