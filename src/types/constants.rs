//! Cost-domain constants.
//!
//! Cell costs form a fixed ordinal domain: `COST_FREE`, a graded scale
//! 1..=252 produced by inflation decay, `COST_INSCRIBED`, `COST_LETHAL`,
//! and `COST_UNKNOWN` for cells with no information.

/// Cost of a cell known to be traversable.
pub const COST_FREE: u8 = 0;

/// Cost threshold below which the robot's inscribed circle still collides.
pub const COST_INSCRIBED: u8 = 253;

/// Cost signifying certain collision.
pub const COST_LETHAL: u8 = 254;

/// Sentinel for cells with no information.
pub const COST_UNKNOWN: u8 = 255;
