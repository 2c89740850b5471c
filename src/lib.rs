pub mod config;
pub mod critics;
pub mod goal_checker;
pub mod grid;
pub mod kinematics;
pub mod layers;
pub mod planner;
pub mod plugin;
pub mod traj;
pub mod types;

pub use config::PlannerConfig;
pub use grid::{Grid2d, Layer, LayeredGrid2d};
pub use kinematics::KinematicLimits;
pub use layers::{InflationConfig, InflationLayer};
pub use planner::{LocalPlanEvaluation, LocalPlanner};
pub use types::{MapInfo, Path2, PlannerError, Pose2, Twist2};
