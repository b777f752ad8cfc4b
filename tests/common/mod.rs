//! Synthetic acquisition shared by the integration tests: a circular polar
//! orbit 700 km above the equator and C-band image timing.

#![allow(dead_code)]

use insardine::{Geodetic, ImageWindow, Orbit, Point, SlcImage, StateVector};

pub const ORBIT_RADIUS: f64 = 6_378_137.0 + 700_000.0;
pub const ORBIT_SPEED: f64 = 7_500.0;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Position on the circular orbit at `t`, shifted by `offset`
pub fn orbit_position(t: f64, offset: Point) -> Point {
    let w = ORBIT_SPEED / ORBIT_RADIUS;
    Point::new(ORBIT_RADIUS * (w * t).cos(), 0.0, ORBIT_RADIUS * (w * t).sin()) + offset
}

/// Seven state vectors, 10 s apart, centred on t = 0
pub fn state_vectors(offset: Point) -> Vec<StateVector> {
    (-3..=3)
        .map(|i| {
            let t = 10.0 * i as f64;
            StateVector::new(t, orbit_position(t, offset))
        })
        .collect()
}

pub fn master_orbit() -> Orbit {
    Orbit::new(state_vectors(Point::default()), 4).expect("master orbit fit")
}

pub fn slave_orbit(offset: Point) -> Orbit {
    Orbit::new(state_vectors(offset), 4).expect("slave orbit fit")
}

/// 20 s of azimuth at 1 kHz; scene centre near line 13278, pixel 14489
pub fn test_image() -> SlcImage {
    SlcImage {
        range_time1: 5.0e-3,
        range_sampling_rate: 64.0e6,
        azimuth_time1: -10.0,
        prf: 1000.0,
        wavelength: 0.0555,
        azimuth_bandwidth: 800.0,
        azimuth_looks: 1,
        window: ImageWindow::new(1, 20001, 1, 25000),
        scene_centre: Geodetic::from_degrees(0.2, 3.0, 0.0),
    }
}
