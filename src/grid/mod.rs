pub mod grid2d;
pub mod layered;

pub use grid2d::Grid2d;
pub use layered::{Layer, LayeredGrid2d};
