//! Reference ellipsoid and geodetic <-> geocentric (ECEF) conversion.

use crate::core::Point;
use crate::types::Geodetic;
use serde::{Deserialize, Serialize};

/// Maximum number of Bowring iterations in `xyz2ell`
pub const XYZ2ELL_MAX_ITERATIONS: usize = 5;

/// Latitude change (rad) below which `xyz2ell` stops iterating
pub const XYZ2ELL_TOLERANCE: f64 = 1e-12;

/// Reference ellipsoid parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    /// Semi-major axis (meters)
    pub a: f64,
    /// Flattening
    pub f: f64,
    /// Semi-minor axis: a * (1 - f)
    pub b: f64,
    /// First eccentricity squared: 2f - f^2
    pub e2: f64,
    /// Second eccentricity squared: (a^2 - b^2) / b^2
    pub ep2: f64,
}

pub const WGS84: Ellipsoid = Ellipsoid::new(6_378_137.0, 1.0 / 298.257_223_563);
pub const GRS80: Ellipsoid = Ellipsoid::new(6_378_137.0, 1.0 / 298.257_222_101);

impl Default for Ellipsoid {
    fn default() -> Self {
        WGS84
    }
}

impl Ellipsoid {
    pub const fn new(a: f64, f: f64) -> Self {
        let b = a * (1.0 - f);
        let e2 = 2.0 * f - f * f;
        let ep2 = (a * a - b * b) / (b * b);
        Self { a, f, b, e2, ep2 }
    }

    pub fn semi_minor_axis(&self) -> f64 {
        self.b
    }

    pub fn second_eccentricity_squared(&self) -> f64 {
        self.ep2
    }

    /// Prime vertical radius of curvature at geodetic latitude `phi`
    pub fn prime_vertical_radius(&self, phi: f64) -> f64 {
        self.a / (1.0 - self.e2 * phi.sin().powi(2)).sqrt()
    }

    /// Geodetic (phi, lambda, height) to ECEF x, y, z
    pub fn ell2xyz(&self, geo: &Geodetic) -> Point {
        let n = self.prime_vertical_radius(geo.phi);
        let (sin_phi, cos_phi) = geo.phi.sin_cos();
        let (sin_lam, cos_lam) = geo.lambda.sin_cos();

        Point::new(
            (n + geo.height) * cos_phi * cos_lam,
            (n + geo.height) * cos_phi * sin_lam,
            (n * (1.0 - self.e2) + geo.height) * sin_phi,
        )
    }

    /// ECEF x, y, z to geodetic (phi, lambda, height).
    ///
    /// Bowring's method: starting from the parametric latitude of the point,
    /// alternate the closed-form latitude update with a parametric latitude
    /// refresh. Stops after `XYZ2ELL_MAX_ITERATIONS` or once the latitude
    /// change drops below `XYZ2ELL_TOLERANCE`; the last estimate is returned
    /// either way. One iteration is already sub-millimeter for terrestrial
    /// heights.
    pub fn xyz2ell(&self, xyz: &Point) -> Geodetic {
        let r = xyz.x.hypot(xyz.y);
        let lambda = xyz.y.atan2(xyz.x);

        let mut beta = (xyz.z * self.a).atan2(r * self.b);
        let mut phi = f64::NAN;

        for _ in 0..XYZ2ELL_MAX_ITERATIONS {
            let (sin_b, cos_b) = beta.sin_cos();
            let phi_new = (xyz.z + self.ep2 * self.b * sin_b.powi(3))
                .atan2(r - self.e2 * self.a * cos_b.powi(3));

            let delta = (phi_new - phi).abs();
            phi = phi_new;
            if delta < XYZ2ELL_TOLERANCE {
                break;
            }
            beta = (self.b * phi.sin()).atan2(self.a * phi.cos());
        }

        let (sin_phi, cos_phi) = phi.sin_cos();
        let height = r * cos_phi + xyz.z * sin_phi
            - self.a * (1.0 - self.e2 * sin_phi * sin_phi).sqrt();

        Geodetic::new(phi, lambda, height)
    }

    /// Residual of `(x^2 + y^2)/(a+h)^2 + z^2/(b+h)^2 - 1`, zero on the ellipsoid
    /// inflated by `height`
    pub fn residual(&self, xyz: &Point, height: f64) -> f64 {
        (xyz.x * xyz.x + xyz.y * xyz.y) / (self.a + height).powi(2)
            + (xyz.z / (self.b + height)).powi(2)
            - 1.0
    }
}
