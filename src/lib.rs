//! insardine: satellite orbit and SAR geocoding geometry
//!
//! This library interpolates satellite orbits from discrete state vectors and
//! solves the range-Doppler imaging equations to convert between ground
//! coordinates and radar line/pixel/time coordinates. On top of that it models
//! the interferometric baseline of a master/slave image pair.
//!
//! ```no_run
//! use insardine::{Baseline, Orbit, SlcImage, StateVector};
//!
//! # fn run(
//! #     master: SlcImage,
//! #     slave: SlcImage,
//! #     m: Vec<StateVector>,
//! #     s: Vec<StateVector>,
//! # ) -> insardine::SarResult<()> {
//! let master_orbit = Orbit::new(m, 4)?;
//! let slave_orbit = Orbit::new(s, 4)?;
//!
//! let ground = master_orbit.lp2xyz(1000.0, 2000.0, &master)?.into_result()?;
//! let radar = master_orbit.xyz2lp(&ground, &master)?.value();
//!
//! let baseline = Baseline::model(&master, &slave, &master_orbit, &slave_orbit)?;
//! println!("Bperp at ({}, {}): {:.2} m", radar.y, radar.x, baseline.get_bperp(radar.y, radar.x));
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    Geodetic, OrbitData, OrbitRecord, RadarTime, SarError, SarResult, Solved, StateVector, SOL,
};

pub use crate::core::{
    Baseline, BaselineComponents, BaselineConfig, BaselineQuantity, Ellipsoid, ImageWindow, Orbit,
    OrbitBuilder, Point, SlcImage, SolverConfig, GRS80, WGS84,
};
