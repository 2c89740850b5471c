//! Layered costmap: container of layers that write into a master grid.
//!
//! The update loop aggregates bounds from all layers, resets the master
//! region to the default value, then calls each layer's `update_costs` in
//! order. The master grid is mutated in place and must not be read while
//! an update pass is running; readers see the whole pass as atomic.

use glam::{UVec2, Vec2};
use tracing::debug;

use crate::grid::Grid2d;
use crate::types::{Bounds, CellRegion, Footprint, MapInfo, Pose2};

/// Layer plugin interface. Layers are called in order: each may expand
/// bounds, then each writes into the master grid within the computed
/// region.
pub trait Layer {
    /// Reset the layer to its initial state.
    fn reset(&mut self);

    /// Whether global "clear costmap" should call reset on this layer.
    fn is_clearable(&self) -> bool;

    /// Expand the world bounds that this layer needs to update.
    /// Called once per update; layers only expand bounds, never shrink.
    fn update_bounds(&mut self, robot: Pose2, bounds: &mut Bounds);

    /// Write into the master grid only within `region`.
    fn update_costs(&mut self, master: &mut Grid2d<u8>, region: CellRegion);

    /// Called when the robot footprint changes. Default: no-op.
    fn on_footprint_changed(&mut self, _footprint: &Footprint) {}

    /// Called when the master grid is resized. Default: no-op.
    fn match_size(&mut self, _info: &MapInfo) {}
}

/// Container of layers and a master costmap. Runs update_bounds then
/// update_costs in order each time `update_map` is called.
pub struct LayeredGrid2d {
    master: Grid2d<u8>,
    default_value: u8,
    layers: Vec<Box<dyn Layer>>,
    rolling_window: bool,
    footprint: Footprint,
    updated_region: Option<CellRegion>,
}

impl LayeredGrid2d {
    pub fn new(info: MapInfo, default_value: u8, rolling_window: bool) -> Self {
        Self {
            master: Grid2d::new_with_value(info, default_value),
            default_value,
            layers: Vec::new(),
            rolling_window,
            footprint: Footprint::default(),
            updated_region: None,
        }
    }

    /// Add a layer. Order matters: layers are updated in insertion order.
    /// The layer is sized to the master grid on insertion.
    pub fn add_layer(&mut self, mut layer: Box<dyn Layer>) {
        layer.match_size(self.master.info());
        self.layers.push(layer);
    }

    pub fn master(&self) -> &Grid2d<u8> {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut Grid2d<u8> {
        &mut self.master
    }

    pub fn is_rolling_window(&self) -> bool {
        self.rolling_window
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// Cell region written by the last `update_map` call, if any.
    pub fn updated_region(&self) -> Option<CellRegion> {
        self.updated_region
    }

    /// Replace the robot footprint and notify every layer.
    pub fn set_footprint(&mut self, footprint: Footprint) {
        self.footprint = footprint;
        for layer in &mut self.layers {
            layer.on_footprint_changed(&self.footprint);
        }
    }

    /// Reset all clearable layers.
    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            if layer.is_clearable() {
                layer.reset();
            }
        }
    }

    /// Run the update loop: optionally move origin, aggregate bounds from
    /// all layers, reset the master in that region, then call each layer's
    /// update_costs.
    pub fn update_map(&mut self, robot: Pose2) {
        if self.rolling_window {
            let info = self.master.info();
            let half = Vec2::new(info.world_width(), info.world_height()) * 0.5;
            let new_origin = robot.position - half;
            self.master.update_origin(new_origin, self.default_value);
        }

        let mut bounds = Bounds::empty();
        for layer in &mut self.layers {
            layer.update_bounds(robot, &mut bounds);
        }

        if bounds.is_empty() {
            self.updated_region = None;
            return;
        }

        // Clamp the world window onto the grid; deliberately unbounded
        // bounds (e.g. a forced reinflation) collapse to the full grid.
        let min = self.master.world_to_map_clamped(bounds.min);
        let max_cell = self.master.world_to_map_clamped(bounds.max);
        let max = UVec2::new(
            (max_cell.x + 1).min(self.master.width()),
            (max_cell.y + 1).min(self.master.height()),
        );

        if min.x >= max.x || min.y >= max.y {
            self.updated_region = None;
            return;
        }

        let region = CellRegion { min, max };
        debug!(?region, "costmap update");

        self.master.fill_region(region.min, region.max, self.default_value);

        for layer in &mut self.layers {
            layer.update_costs(&mut self.master, region);
        }

        self.updated_region = Some(region);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::COST_LETHAL;

    fn default_info() -> MapInfo {
        MapInfo {
            width: 10,
            height: 10,
            resolution: 0.1,
            ..Default::default()
        }
    }

    struct BoundsLayer {
        margin: f32,
    }

    impl Layer for BoundsLayer {
        fn reset(&mut self) {}
        fn is_clearable(&self) -> bool {
            true
        }
        fn update_bounds(&mut self, robot: Pose2, bounds: &mut Bounds) {
            bounds.expand_to_include(robot.position);
            bounds.expand_by(self.margin);
        }
        fn update_costs(&mut self, master: &mut Grid2d<u8>, region: CellRegion) {
            let _ = master.set(region.min, COST_LETHAL);
        }
    }

    #[test]
    fn update_map_aggregates_bounds() {
        let mut layered = LayeredGrid2d::new(default_info(), 0, false);
        layered.add_layer(Box::new(BoundsLayer { margin: 0.15 }));
        layered.update_map(Pose2::new(Vec2::new(0.5, 0.5), 0.0));

        let region = layered.updated_region().unwrap();
        assert_eq!(region.min, UVec2::new(3, 3));
        assert_eq!(region.max, UVec2::new(7, 7));
        assert_eq!(
            layered.master().get(UVec2::new(3, 3)).copied(),
            Some(COST_LETHAL)
        );
    }

    #[test]
    fn no_layers_means_no_region() {
        let mut layered = LayeredGrid2d::new(default_info(), 0, false);
        layered.update_map(Pose2::default());
        assert!(layered.updated_region().is_none());
    }

    #[test]
    fn footprint_change_reaches_layers() {
        struct FootprintLayer {
            seen_inscribed: f32,
        }
        impl Layer for FootprintLayer {
            fn reset(&mut self) {}
            fn is_clearable(&self) -> bool {
                false
            }
            fn update_bounds(&mut self, _robot: Pose2, _bounds: &mut Bounds) {}
            fn update_costs(&mut self, _master: &mut Grid2d<u8>, _region: CellRegion) {}
            fn on_footprint_changed(&mut self, footprint: &Footprint) {
                self.seen_inscribed = footprint.inscribed_radius;
            }
        }

        let mut layered = LayeredGrid2d::new(default_info(), 0, false);
        layered.add_layer(Box::new(FootprintLayer { seen_inscribed: 0.0 }));
        layered.set_footprint(Footprint {
            points: vec![],
            inscribed_radius: 0.3,
        });
        assert_eq!(layered.footprint().inscribed_radius, 0.3);
    }

    #[test]
    fn rolling_window_recenters_on_robot() {
        let mut layered = LayeredGrid2d::new(default_info(), 0, true);
        layered.update_map(Pose2::new(Vec2::new(2.0, 2.0), 0.0));
        let origin = layered.master().info().origin;
        assert_eq!(origin, Vec2::new(1.5, 1.5));
    }
}
