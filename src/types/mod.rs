pub mod constants;
pub mod error;
pub mod geometry;
pub mod info;

pub use constants::*;
pub use error::{ConfigError, GridError, PlannerError};
pub use geometry::{
    shortest_angular_distance, Bounds, CellRegion, Footprint, Path2, Pose2, Twist2,
};
pub use info::MapInfo;
