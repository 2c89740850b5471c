//! Name-to-factory registries for the pluggable pieces: critics,
//! trajectory generators, and goal checkers. Configuration refers to
//! plugins by class name; resolution happens once at build time and
//! unknown names are a hard [`ConfigError`].

use std::collections::HashMap;

use crate::critics::{
    BaseObstacleCritic, MapGridCritic, OscillationCritic, PreferForwardCritic, RotateToGoalCritic,
    TrajectoryCritic, TwirlingCritic,
};
use crate::goal_checker::{GoalChecker, SimpleGoalChecker, StoppedGoalChecker};
use crate::kinematics::KinematicLimits;
use crate::traj::{
    LimitedAccelGenerator, SamplingConfig, StandardTrajectoryGenerator, TrajectoryGenerator,
};
use crate::types::ConfigError;

/// Maps class names to factories. An optional suffix lets short names
/// resolve to their canonical class ("PathDist" -> "PathDistCritic").
pub struct Registry<F> {
    kind: &'static str,
    suffix: Option<&'static str>,
    factories: HashMap<String, F>,
}

impl<F> Registry<F> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            suffix: None,
            factories: HashMap::new(),
        }
    }

    pub fn with_suffix(kind: &'static str, suffix: &'static str) -> Self {
        Self {
            kind,
            suffix: Some(suffix),
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, class_name: &str, factory: F) {
        self.factories.insert(class_name.to_string(), factory);
    }

    pub fn resolve(&self, class_name: &str) -> Result<&F, ConfigError> {
        if let Some(factory) = self.factories.get(class_name) {
            return Ok(factory);
        }
        if let Some(suffix) = self.suffix {
            if !class_name.ends_with(suffix) {
                if let Some(factory) = self.factories.get(&format!("{class_name}{suffix}")) {
                    return Ok(factory);
                }
            }
        }
        Err(ConfigError::UnknownPlugin {
            kind: self.kind,
            name: class_name.to_string(),
        })
    }
}

/// Per-critic construction parameters the factories may draw on.
pub struct CriticParams {
    /// Instance name used in scores, vetoes, and logs.
    pub name: String,
    pub scale: f32,
    pub xy_goal_tolerance: f32,
    pub forward_point_distance: f32,
}

pub type CriticFactory = fn(&CriticParams) -> Box<dyn TrajectoryCritic>;

pub type GeneratorFactory =
    fn(KinematicLimits, SamplingConfig) -> Result<Box<dyn TrajectoryGenerator>, ConfigError>;

/// (xy tolerance, yaw tolerance) -> checker.
pub type GoalCheckerFactory = fn(f32, f32) -> Box<dyn GoalChecker>;

pub fn default_critic_registry() -> Registry<CriticFactory> {
    let mut registry: Registry<CriticFactory> = Registry::with_suffix("critic", "Critic");
    registry.register("BaseObstacleCritic", |p| {
        Box::new(BaseObstacleCritic::new(&p.name, p.scale))
    });
    registry.register("PathDistCritic", |p| {
        Box::new(MapGridCritic::path_dist(&p.name, p.scale))
    });
    registry.register("GoalDistCritic", |p| {
        Box::new(MapGridCritic::goal_dist(&p.name, p.scale))
    });
    registry.register("PathAlignCritic", |p| {
        Box::new(MapGridCritic::path_align(
            &p.name,
            p.scale,
            p.forward_point_distance,
        ))
    });
    registry.register("GoalAlignCritic", |p| {
        Box::new(MapGridCritic::goal_align(
            &p.name,
            p.scale,
            p.forward_point_distance,
        ))
    });
    registry.register("RotateToGoalCritic", |p| {
        Box::new(RotateToGoalCritic::new(
            &p.name,
            p.scale,
            p.xy_goal_tolerance,
        ))
    });
    registry.register("OscillationCritic", |p| {
        Box::new(OscillationCritic::new(&p.name, p.scale))
    });
    registry.register("PreferForwardCritic", |p| {
        Box::new(PreferForwardCritic::new(&p.name, p.scale))
    });
    registry.register("TwirlingCritic", |p| {
        Box::new(TwirlingCritic::new(&p.name, p.scale))
    });
    registry
}

pub fn default_generator_registry() -> Registry<GeneratorFactory> {
    let mut registry: Registry<GeneratorFactory> = Registry::new("trajectory generator");
    registry.register("StandardTrajectoryGenerator", |kinematics, sampling| {
        let generator = StandardTrajectoryGenerator::new(kinematics, sampling)?;
        Ok(Box::new(generator))
    });
    registry.register("LimitedAccelGenerator", |kinematics, sampling| {
        let generator = LimitedAccelGenerator::new(kinematics, sampling)?;
        Ok(Box::new(generator))
    });
    registry
}

pub fn default_goal_checker_registry() -> Registry<GoalCheckerFactory> {
    let mut registry: Registry<GoalCheckerFactory> = Registry::new("goal checker");
    registry.register("SimpleGoalChecker", |xy, yaw| {
        Box::new(SimpleGoalChecker::new(xy, yaw))
    });
    registry.register("StoppedGoalChecker", |xy, yaw| {
        Box::new(StoppedGoalChecker::new(xy, yaw))
    });
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_critic_names_resolve_with_suffix() {
        let registry = default_critic_registry();
        let params = CriticParams {
            name: "PathDist".to_string(),
            scale: 1.0,
            xy_goal_tolerance: 0.25,
            forward_point_distance: 0.325,
        };
        let critic = registry.resolve("PathDist").unwrap()(&params);
        assert_eq!(critic.name(), "PathDist");
        assert!(registry.resolve("PathDistCritic").is_ok());
    }

    #[test]
    fn unknown_plugin_is_a_config_error() {
        let registry = default_critic_registry();
        let err = registry.resolve("Teleport").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlugin { .. }));
    }

    #[test]
    fn goal_checker_registry_builds_both_checkers() {
        use crate::types::{Pose2, Twist2};
        use glam::Vec2;

        let registry = default_goal_checker_registry();
        let goal = Pose2::new(Vec2::ZERO, 0.0);
        let at_goal = Pose2::new(Vec2::new(0.05, 0.0), 0.0);
        for name in ["SimpleGoalChecker", "StoppedGoalChecker"] {
            let mut checker = registry.resolve(name).unwrap()(0.25, 0.25);
            assert!(checker.is_goal_reached(at_goal, goal, Twist2::ZERO));
        }
    }

    #[test]
    fn generator_registry_builds_both_modes() {
        let registry = default_generator_registry();
        let kinematics = KinematicLimits {
            max_vel_x: 0.5,
            max_vel_theta: 1.0,
            ..Default::default()
        };
        for name in ["StandardTrajectoryGenerator", "LimitedAccelGenerator"] {
            let generator =
                registry.resolve(name).unwrap()(kinematics, SamplingConfig::default());
            assert!(generator.is_ok());
        }
    }
}
