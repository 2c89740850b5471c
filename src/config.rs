//! Planner configuration: plain-data structs deserialized from YAML,
//! validated and turned into a ready [`LocalPlanner`] at build time.
//! Configuration problems surface here as [`ConfigError`], never
//! mid-cycle.

use serde::Deserialize;

use crate::kinematics::KinematicLimits;
use crate::layers::{InflationConfig, InflationLayer};
use crate::planner::LocalPlanner;
use crate::plugin::{
    default_critic_registry, default_generator_registry, default_goal_checker_registry,
    CriticParams,
};
use crate::traj::SamplingConfig;
use crate::types::ConfigError;

/// One entry of the ordered critic list. `class` defaults to the
/// instance name, so `name: PathDist` alone loads the path-distance
/// critic.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriticSpec {
    pub name: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default = "default_scale")]
    pub scale: f32,
}

fn default_scale() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    pub kinematics: KinematicLimits,
    pub sampling: SamplingConfig,
    pub inflation: InflationConfig,
    /// Critics in scoring order. Empty means the stock set.
    pub critics: Vec<CriticSpec>,
    pub trajectory_generator_name: String,
    pub goal_checker_name: String,
    pub prune_plan: bool,
    pub prune_distance: f32,
    pub xy_goal_tolerance: f32,
    pub yaw_goal_tolerance: f32,
    pub forward_point_distance: f32,
    /// Record the full candidate evaluation every cycle.
    pub debug_trajectory_details: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            kinematics: KinematicLimits::default(),
            sampling: SamplingConfig::default(),
            inflation: InflationConfig::default(),
            critics: Vec::new(),
            trajectory_generator_name: "StandardTrajectoryGenerator".to_string(),
            goal_checker_name: "SimpleGoalChecker".to_string(),
            prune_plan: true,
            prune_distance: 1.0,
            xy_goal_tolerance: 0.25,
            yaw_goal_tolerance: 0.25,
            forward_point_distance: 0.325,
            debug_trajectory_details: false,
        }
    }
}

/// Stock critic ordering, applied when the config lists none.
const DEFAULT_CRITIC_NAMES: [&str; 7] = [
    "RotateToGoal",
    "Oscillation",
    "BaseObstacle",
    "GoalAlign",
    "PathAlign",
    "PathDist",
    "GoalDist",
];

impl PlannerConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.kinematics.validate()?;
        if self.prune_distance <= 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "prune_distance must be positive, got {}",
                self.prune_distance
            )));
        }
        for critic in &self.critics {
            if critic.name.is_empty() {
                return Err(ConfigError::InvalidParameter(
                    "critic entry with empty name".to_string(),
                ));
            }
            if critic.scale < 0.0 {
                return Err(ConfigError::InvalidParameter(format!(
                    "critic {} has negative scale {}",
                    critic.name, critic.scale
                )));
            }
        }
        Ok(())
    }

    /// Resolve every plugin name and assemble the planner. All
    /// registry misses and mode conflicts surface here.
    pub fn build(&self) -> Result<LocalPlanner, ConfigError> {
        self.validate()?;

        let generators = default_generator_registry();
        let generator = generators.resolve(&self.trajectory_generator_name)?(
            self.kinematics,
            self.sampling.clone(),
        )?;

        let critic_registry = default_critic_registry();
        let specs: Vec<CriticSpec> = if self.critics.is_empty() {
            DEFAULT_CRITIC_NAMES
                .iter()
                .map(|name| CriticSpec {
                    name: name.to_string(),
                    class: None,
                    scale: 1.0,
                })
                .collect()
        } else {
            self.critics.clone()
        };
        let mut critics = Vec::with_capacity(specs.len());
        for spec in &specs {
            let class = spec.class.as_deref().unwrap_or(&spec.name);
            let factory = critic_registry.resolve(class)?;
            critics.push(factory(&CriticParams {
                name: spec.name.clone(),
                scale: spec.scale,
                xy_goal_tolerance: self.xy_goal_tolerance,
                forward_point_distance: self.forward_point_distance,
            }));
        }

        let goal_checkers = default_goal_checker_registry();
        let goal_checker = goal_checkers.resolve(&self.goal_checker_name)?(
            self.xy_goal_tolerance,
            self.yaw_goal_tolerance,
        );

        let mut planner = LocalPlanner::new(generator, critics, goal_checker);
        planner.prune_plan = self.prune_plan;
        planner.prune_distance = self.prune_distance;
        Ok(planner)
    }

    /// Inflation layer matching this configuration, ready to add to a
    /// [`LayeredGrid2d`](crate::grid::LayeredGrid2d).
    pub fn build_inflation_layer(&self) -> InflationLayer {
        InflationLayer::new(self.inflation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_roundtrip_with_overrides() {
        let yaml = r"
kinematics:
  max_vel_x: 0.55
  max_vel_theta: 1.0
  acc_lim_x: 2.5
  decel_lim_x: -2.5
sampling:
  vx_samples: 10
  vtheta_samples: 10
critics:
  - name: BaseObstacle
    scale: 0.5
  - name: ShortPath
    class: PathDist
prune_distance: 2.0
";
        let config = PlannerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.kinematics.max_vel_x, 0.55);
        assert_eq!(config.sampling.vx_samples, 10);
        assert_eq!(config.critics.len(), 2);
        assert_eq!(config.critics[0].scale, 0.5);
        assert_eq!(config.critics[1].class.as_deref(), Some("PathDist"));
        assert_eq!(config.prune_distance, 2.0);
        assert!(config.build().is_ok());
    }

    #[test]
    fn empty_critic_list_gets_the_stock_set() {
        let mut config = PlannerConfig::default();
        config.kinematics.max_vel_x = 0.5;
        config.kinematics.max_vel_theta = 1.0;
        assert!(config.build().is_ok());
    }

    #[test]
    fn unknown_critic_class_fails_build() {
        let mut config = PlannerConfig::default();
        config.kinematics.max_vel_x = 0.5;
        config.kinematics.max_vel_theta = 1.0;
        config.critics.push(CriticSpec {
            name: "Teleport".to_string(),
            class: None,
            scale: 1.0,
        });
        assert!(matches!(
            config.build(),
            Err(ConfigError::UnknownPlugin { .. })
        ));
    }

    #[test]
    fn invalid_yaml_is_a_config_error() {
        assert!(matches!(
            PlannerConfig::from_yaml_str("critics: 12"),
            Err(ConfigError::Yaml(_))
        ));
        assert!(PlannerConfig::from_yaml_str("prune_distance: -1.0").is_err());
    }

    #[test]
    fn negative_scale_rejected() {
        let yaml = "critics:\n  - name: PathDist\n    scale: -2.0\n";
        assert!(PlannerConfig::from_yaml_str(yaml).is_err());
    }
}
