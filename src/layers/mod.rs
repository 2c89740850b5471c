pub mod inflation;

pub use inflation::{inflation_radius_to_cells, CostCache, InflationConfig, InflationLayer};
