//! Core orbit and geocoding modules

pub mod point;
pub mod ellipsoid;
pub mod poly;
pub mod slc_image;
pub mod orbit;
pub mod baseline;

// Re-export main types
pub use point::Point;
pub use ellipsoid::{Ellipsoid, GRS80, WGS84};
pub use slc_image::{ImageWindow, SlcImage};
pub use orbit::{
    Orbit, OrbitBuilder, SolverConfig, CRITERION_POSITION, CRITERION_TIME, MAX_ITERATIONS,
};
pub use baseline::{Baseline, BaselineComponents, BaselineConfig, BaselineQuantity};
