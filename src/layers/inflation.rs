//! Obstacle inflation layer.
//!
//! Spreads cost outward from lethal cells with a bounded multi-source
//! wavefront, so planners keep clearance from obstacles. Cells are
//! processed in increasing obstacle distance; the distance and cost for
//! every reachable (dx, dy) offset come from a precomputed cache.
//!
//! The pending-cell queue is a bucket array indexed by distance rank
//! rather than a heap: cells are only ever inserted at their exact cached
//! distance, and a nearer path to a cell discovered later still wins
//! because earlier buckets drain first and the first visit marks the
//! cell seen.

use glam::UVec2;
use serde::Deserialize;
use tracing::warn;

use crate::grid::{Grid2d, Layer};
use crate::types::{
    Bounds, CellRegion, Footprint, MapInfo, Pose2, COST_FREE, COST_INSCRIBED, COST_LETHAL,
    COST_UNKNOWN,
};

/// Convert an inflation radius in world units (meters) to a cell count.
///
/// Returns `ceil(radius / resolution)`. If resolution is zero or negative,
/// or if the result would be non-positive, returns 0.
#[inline]
pub fn inflation_radius_to_cells(radius_m: f32, resolution: f32) -> u32 {
    if resolution <= 0.0 || radius_m <= 0.0 {
        return 0;
    }
    (radius_m / resolution).ceil() as u32
}

/// Configuration for the inflation layer.
///
/// Groups parameters that control inflation behaviour.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InflationConfig {
    pub enabled: bool,
    /// Inflation radius in meters.
    pub inflation_radius: f32,
    /// Cost scaling factor for the exponential decay (world units).
    pub cost_scaling_factor: f32,
    /// When true, allow overwriting unknown cells with any inflation cost
    /// above FREE; otherwise unknown is only overwritten at or above the
    /// inscribed threshold.
    pub inflate_unknown: bool,
}

impl Default for InflationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            inflation_radius: 0.55,
            cost_scaling_factor: 10.0,
            inflate_unknown: false,
        }
    }
}

/// Precomputed distance-to-cost lookup for every (dx, dy) offset up to the
/// inflation radius plus one cell.
///
/// Distances are rebuilt only when the cell radius changes; costs are
/// recomputed whenever the scaling or inscribed parameters change,
/// reusing the distance table. Each offset also carries the rank of its
/// distance among all distinct offset distances, used as the wavefront
/// bucket index.
#[derive(Debug, Default)]
pub struct CostCache {
    cell_radius: u32,
    side: usize,
    distances: Vec<f32>,
    costs: Vec<u8>,
    levels: Vec<u16>,
    num_levels: usize,
}

impl CostCache {
    /// Recompute the cache for the given parameters. Distances (and
    /// bucket levels) survive across calls with an unchanged radius.
    pub fn compute(
        &mut self,
        cell_radius: u32,
        resolution: f32,
        inscribed_radius: f32,
        cost_scaling_factor: f32,
    ) {
        if cell_radius == 0 {
            *self = CostCache::default();
            return;
        }

        if cell_radius != self.cell_radius {
            let side = (cell_radius + 2) as usize;
            self.cell_radius = cell_radius;
            self.side = side;
            self.distances = (0..side * side)
                .map(|k| {
                    let i = (k / side) as f32;
                    let j = (k % side) as f32;
                    i.hypot(j)
                })
                .collect();
            self.compute_levels();
        }

        self.costs = self
            .distances
            .iter()
            .map(|&d| compute_cost(d, resolution, inscribed_radius, cost_scaling_factor))
            .collect();
    }

    /// Rank every offset distance among the sorted distinct squared
    /// distances. Squared distances are exact integers, so ranking is
    /// exact too.
    fn compute_levels(&mut self) {
        let side = self.side;
        let mut sq: Vec<u32> = (0..side * side)
            .map(|k| {
                let i = (k / side) as u32;
                let j = (k % side) as u32;
                i * i + j * j
            })
            .collect();
        let offsets_sq = sq.clone();
        sq.sort_unstable();
        sq.dedup();
        self.num_levels = sq.len();
        self.levels = offsets_sq
            .iter()
            .map(|v| sq.binary_search(v).unwrap() as u16)
            .collect();
    }

    pub fn cell_radius(&self) -> u32 {
        self.cell_radius
    }

    /// Number of distinct distance buckets.
    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Euclidean distance in cells for the offset (dx, dy). Both must be
    /// at most `cell_radius + 1`.
    #[inline]
    pub fn distance(&self, dx: u32, dy: u32) -> f32 {
        self.distances[dx as usize * self.side + dy as usize]
    }

    /// Inflation cost for the offset (dx, dy).
    #[inline]
    pub fn cost(&self, dx: u32, dy: u32) -> u8 {
        self.costs[dx as usize * self.side + dy as usize]
    }

    /// Distance bucket for the offset (dx, dy).
    #[inline]
    pub fn level(&self, dx: u32, dy: u32) -> usize {
        self.levels[dx as usize * self.side + dy as usize] as usize
    }
}

/// Cost curve for a cell at `distance` cells from the nearest obstacle:
/// lethal at the obstacle itself, inscribed inside the inscribed radius,
/// then exponential decay floored at 1 so inflated cells never read as
/// free.
fn compute_cost(distance: f32, resolution: f32, inscribed_radius: f32, scaling: f32) -> u8 {
    if distance == 0.0 {
        return COST_LETHAL;
    }
    let world = distance * resolution;
    if world <= inscribed_radius {
        return COST_INSCRIBED;
    }
    let cost = ((COST_INSCRIBED - 1) as f32 * (-scaling * (world - inscribed_radius)).exp()) as u8;
    cost.max(1)
}

/// Transient unit of inflation work: a discovered cell and the obstacle
/// it was discovered from.
#[derive(Debug, Clone, Copy)]
struct CellData {
    index: usize,
    cell: UVec2,
    src: UVec2,
}

/// Layer that inflates lethal obstacles within the update region using a
/// distance-ordered wavefront.
pub struct InflationLayer {
    config: InflationConfig,
    resolution: f32,
    inscribed_radius: f32,
    cell_radius: u32,
    cache: CostCache,
    seen: Vec<bool>,
    /// Pending cells bucketed by distance rank. Must be fully drained at
    /// the end of every pass.
    bins: Vec<Vec<CellData>>,
    last_bounds: Bounds,
    need_reinflation: bool,
}

impl InflationLayer {
    pub fn new(config: InflationConfig) -> Self {
        Self {
            config,
            resolution: 0.0,
            inscribed_radius: 0.0,
            cell_radius: 0,
            cache: CostCache::default(),
            seen: Vec::new(),
            bins: Vec::new(),
            last_bounds: Bounds::empty(),
            // The first pass has no previous state to be incremental
            // against, so it covers the whole grid.
            need_reinflation: true,
        }
    }

    pub fn config(&self) -> &InflationConfig {
        &self.config
    }

    /// Replace the configuration. Cached distance/cost relationships may
    /// have shifted, so the next update requests a full-grid recompute.
    pub fn set_config(&mut self, config: InflationConfig) {
        self.config = config;
        self.recompute_caches();
        self.need_reinflation = true;
    }

    fn recompute_caches(&mut self) {
        self.cell_radius = inflation_radius_to_cells(self.config.inflation_radius, self.resolution);
        self.cache.compute(
            self.cell_radius,
            self.resolution,
            self.inscribed_radius,
            self.config.cost_scaling_factor,
        );
        self.bins = vec![Vec::new(); self.cache.num_levels()];
    }

    fn enqueue(&mut self, index: usize, cell: UVec2, src: UVec2) {
        if self.seen[index] {
            return;
        }
        let dx = cell.x.abs_diff(src.x);
        let dy = cell.y.abs_diff(src.y);

        // The distance table extends one cell past the radius exactly so
        // this check can be a lookup.
        let distance = self.cache.distance(dx, dy);
        if distance > self.cell_radius as f32 {
            return;
        }

        let level = self.cache.level(dx, dy);
        self.bins[level].push(CellData { index, cell, src });
    }
}

impl Layer for InflationLayer {
    fn reset(&mut self) {
        self.need_reinflation = true;
    }

    fn is_clearable(&self) -> bool {
        false
    }

    fn update_bounds(&mut self, _robot: Pose2, bounds: &mut Bounds) {
        if self.need_reinflation {
            // Footprint or parameter changes invalidate previously
            // inflated costs everywhere, so request the entire grid once.
            self.last_bounds = *bounds;
            *bounds = Bounds::unbounded();
            self.need_reinflation = false;
        } else {
            let prev = self.last_bounds;
            self.last_bounds = *bounds;
            bounds.expand_to_cover(&prev);
            bounds.expand_by(self.config.inflation_radius);
        }
    }

    fn update_costs(&mut self, master: &mut Grid2d<u8>, region: CellRegion) {
        if !self.config.enabled || self.cell_radius == 0 {
            return;
        }

        // A non-empty queue here means a previous pass was interrupted or
        // the layer is being reentered. Programming error.
        assert!(
            self.bins.iter().all(|bin| bin.is_empty()),
            "inflation queue must be empty at the start of a pass"
        );

        let size_x = master.width();
        let size_y = master.height();
        let cells = (size_x as usize) * (size_y as usize);
        if self.seen.len() != cells {
            warn!(
                expected = cells,
                actual = self.seen.len(),
                "inflation visited-set size mismatch; resizing"
            );
            self.seen = vec![false; cells];
        }
        self.seen.fill(false);

        // Grow the box outward by the inflation radius: cells up to that
        // distance outside it can still influence cells inside it.
        let r = self.cell_radius as i64;
        let min_x = (region.min.x as i64 - r).max(0) as u32;
        let min_y = (region.min.y as i64 - r).max(0) as u32;
        let max_x = ((region.max.x as i64 + r) as u64).min(size_x as u64) as u32;
        let max_y = ((region.max.y as i64 + r) as u64).min(size_y as u64) as u32;

        // Seed: every lethal cell starts a wavefront at distance zero.
        for y in min_y..max_y {
            for x in min_x..max_x {
                let cell = UVec2::new(x, y);
                let index = master.index(cell);
                if master.data()[index] == COST_LETHAL {
                    self.bins[0].push(CellData {
                        index,
                        cell,
                        src: cell,
                    });
                }
            }
        }

        // Drain buckets in increasing distance order. Appends may land in
        // the bucket currently being drained (equal distance from another
        // source) and are picked up by the growing-index scan.
        for level in 0..self.bins.len() {
            let mut i = 0;
            while i < self.bins[level].len() {
                let cell = self.bins[level][i];
                i += 1;

                // First visit wins: the smallest distance reaches a cell
                // first, so the nearest obstacle dominates.
                if self.seen[cell.index] {
                    continue;
                }
                self.seen[cell.index] = true;

                let dx = cell.cell.x.abs_diff(cell.src.x);
                let dy = cell.cell.y.abs_diff(cell.src.y);
                let cost = self.cache.cost(dx, dy);

                let old = master.data()[cell.index];
                let new = if old == COST_UNKNOWN {
                    let overwrite = if self.config.inflate_unknown {
                        cost > COST_FREE
                    } else {
                        cost >= COST_INSCRIBED
                    };
                    if overwrite { cost } else { old }
                } else {
                    // Inflation never lowers a cost.
                    old.max(cost)
                };
                master.data_mut()[cell.index] = new;

                let UVec2 { x, y } = cell.cell;
                if x > 0 {
                    self.enqueue(cell.index - 1, UVec2::new(x - 1, y), cell.src);
                }
                if y > 0 {
                    self.enqueue(cell.index - size_x as usize, UVec2::new(x, y - 1), cell.src);
                }
                if x < size_x - 1 {
                    self.enqueue(cell.index + 1, UVec2::new(x + 1, y), cell.src);
                }
                if y < size_y - 1 {
                    self.enqueue(cell.index + size_x as usize, UVec2::new(x, y + 1), cell.src);
                }
            }
        }

        for bin in &mut self.bins {
            bin.clear();
        }
    }

    fn on_footprint_changed(&mut self, footprint: &Footprint) {
        self.inscribed_radius = footprint.inscribed_radius;
        self.recompute_caches();
        self.need_reinflation = true;
    }

    fn match_size(&mut self, info: &MapInfo) {
        self.resolution = info.resolution;
        self.recompute_caches();
        self.seen = vec![false; (info.width as usize) * (info.height as usize)];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_for(info: &MapInfo, config: InflationConfig) -> InflationLayer {
        let mut layer = InflationLayer::new(config);
        layer.match_size(info);
        layer
    }

    fn full_region(info: &MapInfo) -> CellRegion {
        CellRegion {
            min: UVec2::ZERO,
            max: UVec2::new(info.width, info.height),
        }
    }

    #[test]
    fn radius_to_cells_basic() {
        assert_eq!(inflation_radius_to_cells(0.5, 0.1), 5);
        assert_eq!(inflation_radius_to_cells(0.05, 0.1), 1);
        assert_eq!(inflation_radius_to_cells(0.15, 0.1), 2);
        assert_eq!(inflation_radius_to_cells(0.0, 0.1), 0);
        assert_eq!(inflation_radius_to_cells(1.0, 0.0), 0);
        assert_eq!(inflation_radius_to_cells(-1.0, 0.1), 0);
    }

    #[test]
    fn cost_curve_thresholds() {
        assert_eq!(compute_cost(0.0, 1.0, 2.0, 3.0), COST_LETHAL);
        assert_eq!(compute_cost(1.0, 1.0, 2.0, 3.0), COST_INSCRIBED);
        assert_eq!(compute_cost(2.0, 1.0, 2.0, 3.0), COST_INSCRIBED);
        let decayed = compute_cost(3.0, 1.0, 1.0, 1.0);
        assert!(decayed < COST_INSCRIBED && decayed >= 1);
    }

    #[test]
    fn cost_curve_never_reaches_free() {
        // Far outside the decay the cost clamps to 1, not 0.
        assert_eq!(compute_cost(50.0, 1.0, 0.0, 10.0), 1);
    }

    #[test]
    fn cache_tables_match_hypot() {
        let mut cache = CostCache::default();
        cache.compute(5, 1.0, 0.0, 1.0);
        assert_eq!(cache.distance(0, 0), 0.0);
        assert_eq!(cache.distance(3, 4), 5.0);
        assert_eq!(cache.cost(0, 0), COST_LETHAL);
        assert_eq!(cache.level(0, 0), 0);
        assert!(cache.level(1, 0) < cache.level(1, 1));
        assert!(cache.level(1, 1) < cache.level(2, 0));
    }

    #[test]
    fn cache_cost_recompute_keeps_distances() {
        let mut cache = CostCache::default();
        cache.compute(4, 0.1, 0.0, 10.0);
        let loose = cache.cost(2, 0);
        cache.compute(4, 0.1, 0.0, 1.0);
        assert_eq!(cache.distance(2, 0), 2.0);
        assert!(cache.cost(2, 0) > loose, "weaker decay must raise cost");
    }

    #[test]
    fn single_lethal_cell_matches_cache() {
        let info = MapInfo::square(11, 1.0);
        let config = InflationConfig {
            inflation_radius: 3.0,
            cost_scaling_factor: 1.0,
            ..Default::default()
        };
        let mut layer = layer_for(&info, config);
        let mut grid = Grid2d::new_with_value(info.clone(), COST_FREE);
        grid.set(UVec2::new(5, 5), COST_LETHAL).unwrap();

        layer.update_costs(&mut grid, full_region(&info));

        assert_eq!(grid.get(UVec2::new(5, 5)).copied(), Some(COST_LETHAL));
        let mut cache = CostCache::default();
        cache.compute(3, 1.0, 0.0, 1.0);
        for (dx, dy) in [(1u32, 0u32), (0, 2), (2, 1), (1, 2), (3, 0)] {
            assert_eq!(
                grid.get(UVec2::new(5 + dx, 5 + dy)).copied(),
                Some(cache.cost(dx, dy)),
                "offset ({dx}, {dy})"
            );
        }
        // Beyond the radius nothing changes.
        assert_eq!(grid.get(UVec2::new(9, 5)).copied(), Some(COST_FREE));
        assert_eq!(grid.get(UVec2::new(5, 9)).copied(), Some(COST_FREE));
    }

    #[test]
    fn inflating_twice_is_idempotent() {
        let info = MapInfo::square(16, 1.0);
        let config = InflationConfig {
            inflation_radius: 4.0,
            cost_scaling_factor: 2.0,
            ..Default::default()
        };
        let mut layer = layer_for(&info, config);
        let mut grid = Grid2d::new_with_value(info.clone(), COST_FREE);
        grid.set(UVec2::new(3, 3), COST_LETHAL).unwrap();
        grid.set(UVec2::new(12, 10), COST_LETHAL).unwrap();

        layer.update_costs(&mut grid, full_region(&info));
        let first = grid.clone();
        layer.update_costs(&mut grid, full_region(&info));
        assert_eq!(grid, first);
    }

    #[test]
    fn nearest_obstacle_dominates() {
        let info = MapInfo::square(12, 1.0);
        let config = InflationConfig {
            inflation_radius: 5.0,
            cost_scaling_factor: 1.0,
            ..Default::default()
        };
        let mut layer = layer_for(&info, config);
        let mut grid = Grid2d::new_with_value(info.clone(), COST_FREE);
        grid.set(UVec2::new(2, 6), COST_LETHAL).unwrap();
        grid.set(UVec2::new(9, 6), COST_LETHAL).unwrap();

        layer.update_costs(&mut grid, full_region(&info));

        let mut cache = CostCache::default();
        cache.compute(5, 1.0, 0.0, 1.0);
        // Cell (4, 6) is 2 from the left obstacle, 5 from the right one.
        assert_eq!(grid.get(UVec2::new(4, 6)).copied(), Some(cache.cost(2, 0)));
    }

    #[test]
    fn unknown_cells_only_overwritten_at_inscribed() {
        let info = MapInfo::square(9, 1.0);
        let config = InflationConfig {
            inflation_radius: 3.0,
            cost_scaling_factor: 0.1,
            inflate_unknown: false,
            ..Default::default()
        };
        let mut layer = layer_for(&info, config);
        layer.on_footprint_changed(&Footprint {
            points: vec![],
            inscribed_radius: 1.0,
        });
        let mut grid = Grid2d::new_with_value(info.clone(), COST_UNKNOWN);
        grid.set(UVec2::new(4, 4), COST_LETHAL).unwrap();

        layer.update_costs(&mut grid, full_region(&info));

        // Adjacent cell is within the inscribed radius: overwritten.
        assert_eq!(
            grid.get(UVec2::new(5, 4)).copied(),
            Some(COST_INSCRIBED)
        );
        // Two cells out the decayed cost is below inscribed: stays unknown.
        assert_eq!(grid.get(UVec2::new(6, 4)).copied(), Some(COST_UNKNOWN));
    }

    #[test]
    fn inflate_unknown_overwrites_any_nonfree() {
        let info = MapInfo::square(9, 1.0);
        let config = InflationConfig {
            inflation_radius: 3.0,
            cost_scaling_factor: 0.1,
            inflate_unknown: true,
            ..Default::default()
        };
        let mut layer = layer_for(&info, config);
        let mut grid = Grid2d::new_with_value(info.clone(), COST_UNKNOWN);
        grid.set(UVec2::new(4, 4), COST_LETHAL).unwrap();

        layer.update_costs(&mut grid, full_region(&info));
        assert!(grid.get(UVec2::new(6, 4)).copied().unwrap() > COST_FREE);
    }

    #[test]
    fn disabled_or_zero_radius_is_noop() {
        let info = MapInfo::square(5, 1.0);
        let mut grid = Grid2d::new_with_value(info.clone(), COST_FREE);
        grid.set(UVec2::new(2, 2), COST_LETHAL).unwrap();
        let before = grid.clone();

        let mut layer = layer_for(
            &info,
            InflationConfig {
                enabled: false,
                ..Default::default()
            },
        );
        layer.update_costs(&mut grid, full_region(&info));
        assert_eq!(grid, before);

        let mut layer = layer_for(
            &info,
            InflationConfig {
                inflation_radius: 0.0,
                ..Default::default()
            },
        );
        layer.update_costs(&mut grid, full_region(&info));
        assert_eq!(grid, before);
    }

    #[test]
    fn footprint_change_forces_one_full_update() {
        let info = MapInfo::square(10, 0.1);
        let mut layer = layer_for(&info, InflationConfig::default());
        layer.on_footprint_changed(&Footprint {
            points: vec![],
            inscribed_radius: 0.2,
        });

        let mut bounds = Bounds::empty();
        layer.update_bounds(Pose2::default(), &mut bounds);
        assert_eq!(bounds.min.x, f32::MIN);
        assert_eq!(bounds.max.y, f32::MAX);

        // The next pass reverts to incremental expansion.
        let mut bounds = Bounds {
            min: glam::Vec2::new(0.2, 0.2),
            max: glam::Vec2::new(0.4, 0.4),
        };
        layer.update_bounds(Pose2::default(), &mut bounds);
        assert!(bounds.min.x < 0.2 && bounds.max.x > 0.4);
    }
}
