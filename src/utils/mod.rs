//! Utility helpers: spatial algebra, math extensions and logging.

pub mod logging;
pub mod math;
pub mod spatial;

pub use spatial::{Plucker, SpatialInertia, SpatialMat, SpatialVec};
